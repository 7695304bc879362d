use crate::error::{RegistryError, Result};
use crate::models::{PollId, PollSnapshot, VoterId};
use crate::store::PollStore;
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sqlx::{migrate::MigrateDatabase, sqlite::{SqlitePool, SqlitePoolOptions}, Row, Sqlite};

/// SQLite-backed poll store.
pub struct Database {
    pool: SqlitePool,
}

// Ids and indexes are stored as INTEGER; anything past i64::MAX cannot exist.
fn poll_key(poll_id: PollId) -> Result<i64> {
    i64::try_from(poll_id).map_err(|_| RegistryError::PollDoesNotExist)
}

impl Database {
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        // Create database if it doesn't exist
        if !db_url.contains(":memory:") && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating database {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS polls (
                id INTEGER PRIMARY KEY,
                question TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_options (
                poll_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                label TEXT NOT NULL,
                vote_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (poll_id, position),
                FOREIGN KEY (poll_id) REFERENCES polls(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_voters (
                poll_id INTEGER NOT NULL,
                voter TEXT NOT NULL,
                position INTEGER NOT NULL,
                voted_at TEXT NOT NULL,
                PRIMARY KEY (poll_id, voter),
                FOREIGN KEY (poll_id) REFERENCES polls(id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PollStore for Database {
    async fn insert_poll(&self, question: &str, options: &[String]) -> Result<PollId> {
        let mut tx = self.pool.begin().await?;

        // Ids are dense, so the next id is the current count.
        let id: i64 = sqlx::query("SELECT COUNT(*) FROM polls")
            .fetch_one(&mut *tx)
            .await?
            .get(0);

        sqlx::query("INSERT INTO polls (id, question, created_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(question)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        for (position, label) in options.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO poll_options (poll_id, position, label, vote_count)
                VALUES (?, ?, ?, 0)
                "#,
            )
            .bind(id)
            .bind(position as i64)
            .bind(label)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id as PollId)
    }

    async fn record_vote(&self, poll_id: PollId, option_index: usize, voter: &VoterId) -> Result<()> {
        let key = poll_key(poll_id)?;
        let mut tx = self.pool.begin().await?;

        let poll_exists = sqlx::query("SELECT 1 FROM polls WHERE id = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !poll_exists {
            return Err(RegistryError::PollDoesNotExist);
        }

        // The (poll_id, voter) key decides duplicates, before the option range
        // is looked at. Every early return drops `tx` and rolls this back.
        let position = i64::try_from(option_index).unwrap_or(i64::MAX);
        let inserted = sqlx::query(
            r#"
            INSERT INTO poll_voters (poll_id, voter, position, voted_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(key)
        .bind(voter.as_str())
        .bind(position)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(RegistryError::AlreadyVoted);
            }
            Err(e) => return Err(e.into()),
        }

        let option_count: i64 = sqlx::query("SELECT COUNT(*) FROM poll_options WHERE poll_id = ?")
            .bind(key)
            .fetch_one(&mut *tx)
            .await?
            .get(0);
        if position >= option_count {
            return Err(RegistryError::InvalidOption);
        }

        sqlx::query(
            r#"
            UPDATE poll_options
            SET vote_count = vote_count + 1
            WHERE poll_id = ? AND position = ?
            "#,
        )
        .bind(key)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_poll(&self, poll_id: PollId) -> Result<PollSnapshot> {
        let key = poll_key(poll_id)?;
        // One transaction so question and tallies come from the same state.
        let mut tx = self.pool.begin().await?;

        let question: String = sqlx::query("SELECT question FROM polls WHERE id = ?")
            .bind(key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RegistryError::PollDoesNotExist)?
            .get("question");

        let rows = sqlx::query(
            r#"
            SELECT label, vote_count
            FROM poll_options
            WHERE poll_id = ?
            ORDER BY position
            "#,
        )
        .bind(key)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let (options, vote_counts): (Vec<String>, Vec<u64>) = rows
            .into_iter()
            .map(|row| {
                (
                    row.get::<String, _>("label"),
                    row.get::<i64, _>("vote_count") as u64,
                )
            })
            .unzip();

        Ok(PollSnapshot {
            question,
            options,
            vote_counts,
        })
    }

    async fn total_polls(&self) -> Result<u64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM polls")
            .fetch_one(&self.pool)
            .await?
            .get(0);
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PollRegistry;
    use std::sync::Arc;

    async fn registry() -> PollRegistry {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        PollRegistry::with_store(Arc::new(db))
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn assigns_sequential_ids() {
        let registry = registry().await;
        for expected in 0..3u64 {
            let id = registry.create_poll("Q?", &labels(&["A", "B"])).await.unwrap();
            assert_eq!(id, expected);
            assert_eq!(registry.total_polls().await.unwrap(), expected + 1);
        }
    }

    #[tokio::test]
    async fn round_trips_question_and_options() {
        let registry = registry().await;
        let options: Vec<String> = (1..=100).map(|i| format!("Option {}", i)).collect();
        let id = registry.create_poll("Large Poll Test?", &options).await.unwrap();

        let poll = registry.get_poll(id).await.unwrap();
        assert_eq!(poll.question, "Large Poll Test?");
        assert_eq!(poll.options, options);
        assert_eq!(poll.vote_counts, vec![0; 100]);
    }

    #[tokio::test]
    async fn records_votes_and_rejects_duplicates() {
        let registry = registry().await;
        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        let alice = VoterId::new("alice");
        let bob = VoterId::new("bob");

        registry.vote(0, 1, &alice).await.unwrap();
        let err = registry.vote(0, 0, &alice).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyVoted));
        registry.vote(0, 0, &bob).await.unwrap();

        let poll = registry.get_poll(0).await.unwrap();
        assert_eq!(poll.vote_counts, vec![1, 1]);
    }

    #[tokio::test]
    async fn rejects_missing_poll_and_bad_option() {
        let registry = registry().await;
        let voter = VoterId::new("alice");

        let err = registry.vote(999, 0, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::PollDoesNotExist));

        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        let err = registry.vote(0, 5, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption));
        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![0, 0]);

        let err = registry.get_poll(1).await.unwrap_err();
        assert!(matches!(err, RegistryError::PollDoesNotExist));
    }

    #[tokio::test]
    async fn validation_failures_do_not_write() {
        let registry = registry().await;
        assert!(matches!(
            registry.create_poll("", &labels(&["A", "B"])).await,
            Err(RegistryError::EmptyQuestion)
        ));
        assert!(matches!(
            registry.create_poll("Q", &labels(&["Only"])).await,
            Err(RegistryError::TooFewOptions)
        ));
        assert_eq!(registry.total_polls().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn already_voted_wins_over_bad_option() {
        let registry = registry().await;
        let voter = VoterId::new("alice");
        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        registry.vote(0, 0, &voter).await.unwrap();

        let err = registry.vote(0, 9, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyVoted));
        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![1, 0]);
    }

    #[tokio::test]
    async fn rejected_vote_leaves_no_voter_record() {
        let registry = registry().await;
        let voter = VoterId::new("alice");
        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();

        let err = registry.vote(0, 7, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption));

        registry.vote(0, 1, &voter).await.unwrap();
        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![0, 1]);
    }

    #[tokio::test]
    async fn second_handle_on_same_file_sees_existing_vote() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("polls.db").display());
        let first = Database::connect(&url, 1).await.unwrap();
        let second = Database::connect(&url, 1).await.unwrap();
        let voter = VoterId::new("alice");

        first.insert_poll("Q", &labels(&["A", "B"])).await.unwrap();
        first.record_vote(0, 0, &voter).await.unwrap();

        let err = second.record_vote(0, 1, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyVoted));
        assert_eq!(second.get_poll(0).await.unwrap().vote_counts, vec![1, 0]);
        assert_eq!(first.get_poll(0).await.unwrap().vote_counts, vec![1, 0]);
    }
}

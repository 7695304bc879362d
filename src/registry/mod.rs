use crate::error::{RegistryError, Result};
use crate::models::{PollId, PollSnapshot, VoteCast, VoterId};
use crate::store::{MemoryStore, PollStore};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const EVENT_CAPACITY: usize = 256;

/// The shared poll registry.
///
/// Writes are applied one at a time: `create_poll` and `vote` hold `writes`
/// across validation, the store mutation and the notification, so observers
/// see `VoteCast` events in commit order. Reads go straight to the store.
pub struct PollRegistry {
    store: Arc<dyn PollStore>,
    writes: Mutex<()>,
    events: broadcast::Sender<VoteCast>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn PollStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            writes: Mutex::new(()),
            events,
        }
    }

    pub async fn create_poll(&self, question: &str, options: &[String]) -> Result<PollId> {
        if question.is_empty() {
            return Err(RegistryError::EmptyQuestion);
        }
        if options.len() < 2 {
            return Err(RegistryError::TooFewOptions);
        }

        let _guard = self.writes.lock().await;
        let id = self.store.insert_poll(question, options).await?;
        info!("Created poll {} with {} options: {}", id, options.len(), question);
        Ok(id)
    }

    pub async fn vote(&self, poll_id: PollId, option_index: usize, voter: &VoterId) -> Result<()> {
        let _guard = self.writes.lock().await;
        self.store.record_vote(poll_id, option_index, voter).await?;
        info!("Recorded vote: poll_id={}, option_index={}, voter={}", poll_id, option_index, voter);

        let event = VoteCast {
            poll_id,
            option_index,
            voter: voter.clone(),
            cast_at: Utc::now(),
        };
        if self.events.send(event).is_err() {
            debug!("No subscribers for vote on poll {}", poll_id);
        }
        Ok(())
    }

    pub async fn get_poll(&self, poll_id: PollId) -> Result<PollSnapshot> {
        self.store.get_poll(poll_id).await
    }

    pub async fn total_polls(&self) -> Result<u64> {
        self.store.total_polls().await
    }

    /// Receive a `VoteCast` for every vote recorded after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<VoteCast> {
        self.events.subscribe()
    }
}

impl Default for PollRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn create_poll_returns_sequential_ids() {
        let registry = PollRegistry::new();
        for expected in 0..5u64 {
            let before = registry.total_polls().await.unwrap();
            let id = registry.create_poll("Test Question?", &labels(&["Option 1", "Option 2"])).await.unwrap();
            assert_eq!(id, expected);
            assert_eq!(registry.total_polls().await.unwrap(), before + 1);
        }
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let registry = PollRegistry::new();
        let err = registry.create_poll("", &labels(&["A", "B"])).await.unwrap_err();
        assert!(matches!(err, RegistryError::EmptyQuestion));
        assert_eq!(err.to_string(), "question cannot be empty");
        assert_eq!(registry.total_polls().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn fewer_than_two_options_is_rejected() {
        let registry = PollRegistry::new();
        for options in [labels(&["OnlyOne"]), Vec::new()] {
            let err = registry.create_poll("Q", &options).await.unwrap_err();
            assert!(matches!(err, RegistryError::TooFewOptions));
            assert_eq!(err.to_string(), "at least 2 options required");
        }
        assert_eq!(registry.total_polls().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn vote_increments_counter_and_notifies() {
        let registry = PollRegistry::new();
        let mut events = registry.subscribe();
        let voter = VoterId::new("0xdeployer");

        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        registry.vote(0, 1, &voter).await.unwrap();

        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![0, 1]);
        let event = events.try_recv().unwrap();
        assert_eq!((event.poll_id, event.option_index, event.voter), (0, 1, voter));
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn second_vote_from_same_voter_fails() {
        let registry = PollRegistry::new();
        let mut events = registry.subscribe();
        let voter = VoterId::new("alice");

        registry.create_poll("No Double Vote?", &labels(&["A", "B"])).await.unwrap();
        registry.vote(0, 0, &voter).await.unwrap();
        let err = registry.vote(0, 1, &voter).await.unwrap_err();

        assert!(matches!(err, RegistryError::AlreadyVoted));
        assert_eq!(err.to_string(), "already voted");
        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![1, 0]);
        events.try_recv().unwrap();
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn distinct_voters_both_count() {
        let registry = PollRegistry::new();
        registry.create_poll("Multi-user Test?", &labels(&["Option A", "Option B"])).await.unwrap();

        registry.vote(0, 0, &VoterId::new("alice")).await.unwrap();
        registry.vote(0, 1, &VoterId::new("bob")).await.unwrap();

        let poll = registry.get_poll(0).await.unwrap();
        assert_eq!(poll.vote_counts, vec![1, 1]);
        assert_eq!(poll.total_votes(), 2);
    }

    #[tokio::test]
    async fn vote_on_missing_poll_fails() {
        let registry = PollRegistry::new();
        let err = registry.vote(999, 0, &VoterId::new("alice")).await.unwrap_err();
        assert!(matches!(err, RegistryError::PollDoesNotExist));
        assert_eq!(err.to_string(), "poll does not exist");
    }

    #[tokio::test]
    async fn vote_on_out_of_range_option_fails() {
        let registry = PollRegistry::new();
        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        let err = registry.vote(0, 5, &VoterId::new("alice")).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidOption));
        assert_eq!(err.to_string(), "invalid option");
        assert_eq!(registry.get_poll(0).await.unwrap().vote_counts, vec![0, 0]);
    }

    #[tokio::test]
    async fn vote_checks_run_in_order() {
        let registry = PollRegistry::new();
        let voter = VoterId::new("alice");

        // Missing poll wins over a bad option.
        let err = registry.vote(3, 9, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::PollDoesNotExist));

        // Already voted wins over a bad option.
        registry.create_poll("Q", &labels(&["A", "B"])).await.unwrap();
        registry.vote(0, 0, &voter).await.unwrap();
        let err = registry.vote(0, 9, &voter).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyVoted));
    }

    #[tokio::test]
    async fn hundred_options_round_trip_in_order() {
        let registry = PollRegistry::new();
        let options: Vec<String> = (1..=100).map(|i| format!("Option {}", i)).collect();
        let id = registry.create_poll("Large Poll Test?", &options).await.unwrap();

        let poll = registry.get_poll(id).await.unwrap();
        assert_eq!(poll.question, "Large Poll Test?");
        assert_eq!(poll.options, options);
        assert_eq!(poll.vote_counts, vec![0; 100]);
    }

    #[tokio::test]
    async fn get_poll_returns_exact_inputs() {
        let registry = PollRegistry::new();
        let options = labels(&["Option 1", "Option 2"]);
        let id = registry.create_poll("Poll Data Test?", &options).await.unwrap();

        let poll = registry.get_poll(id).await.unwrap();
        assert_eq!(
            poll,
            PollSnapshot {
                question: "Poll Data Test?".to_string(),
                options,
                vote_counts: vec![0, 0],
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_votes_count_once() {
        let registry = Arc::new(PollRegistry::new());
        registry.create_poll("Race?", &labels(&["A", "B"])).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.vote(0, i % 2, &VoterId::new("same-voter")).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => accepted += 1,
                Err(RegistryError::AlreadyVoted) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted, 1);
        assert_eq!(registry.get_poll(0).await.unwrap().total_votes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn events_follow_commit_order() {
        let registry = Arc::new(PollRegistry::new());
        let mut events = registry.subscribe();
        registry.create_poll("Order?", &labels(&["A", "B", "C"])).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..30usize {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.vote(0, i % 3, &VoterId::new(format!("voter-{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Replaying the events reproduces the final tally.
        let mut replayed = vec![0u64; 3];
        while let Ok(event) = events.try_recv() {
            replayed[event.option_index] += 1;
        }
        let poll = registry.get_poll(0).await.unwrap();
        assert_eq!(poll.vote_counts, replayed);
        assert_eq!(poll.total_votes(), 30);
    }
}

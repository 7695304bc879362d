use crate::error::{RegistryError, Result};
use crate::models::{Poll, PollId, PollSnapshot, VoterId};
use crate::store::PollStore;
use async_trait::async_trait;
use log::debug;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    polls: RwLock<Vec<Poll>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn index_of(poll_id: PollId) -> Result<usize> {
    usize::try_from(poll_id).map_err(|_| RegistryError::PollDoesNotExist)
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, question: &str, options: &[String]) -> Result<PollId> {
        let mut polls = self.polls.write().await;
        let poll = Poll::new(polls.len() as PollId, question.to_string(), options.to_vec());
        let id = poll.id;
        debug!("Storing poll {} in memory", id);
        polls.push(poll);
        Ok(id)
    }

    async fn record_vote(&self, poll_id: PollId, option_index: usize, voter: &VoterId) -> Result<()> {
        let mut polls = self.polls.write().await;
        let poll = polls
            .get_mut(index_of(poll_id)?)
            .ok_or(RegistryError::PollDoesNotExist)?;

        if poll.voters.contains(voter) {
            return Err(RegistryError::AlreadyVoted);
        }
        if option_index >= poll.options.len() {
            return Err(RegistryError::InvalidOption);
        }

        poll.vote_counts[option_index] += 1;
        poll.voters.insert(voter.clone());
        Ok(())
    }

    async fn get_poll(&self, poll_id: PollId) -> Result<PollSnapshot> {
        let polls = self.polls.read().await;
        polls
            .get(index_of(poll_id)?)
            .map(Poll::snapshot)
            .ok_or(RegistryError::PollDoesNotExist)
    }

    async fn total_polls(&self) -> Result<u64> {
        Ok(self.polls.read().await.len() as u64)
    }
}

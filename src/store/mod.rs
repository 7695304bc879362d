mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::models::{PollId, PollSnapshot, VoterId};
use async_trait::async_trait;

/// Backing state of the registry.
///
/// `record_vote` must check, in order, that the poll exists, that the voter
/// has not voted in it yet and that the option is in range, and must apply
/// the counter increment and the voter record together or not at all.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(&self, question: &str, options: &[String]) -> Result<PollId>;

    async fn record_vote(&self, poll_id: PollId, option_index: usize, voter: &VoterId) -> Result<()>;

    async fn get_poll(&self, poll_id: PollId) -> Result<PollSnapshot>;

    async fn total_polls(&self) -> Result<u64>;
}

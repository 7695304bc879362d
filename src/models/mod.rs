use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type PollId = u64;

/// Identity of the caller casting a vote. One vote per identity per poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoterId(pub String);

impl VoterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub options: Vec<String>,
    pub vote_counts: Vec<u64>,
    pub voters: HashSet<VoterId>,
}

impl Poll {
    pub fn new(id: PollId, question: String, options: Vec<String>) -> Self {
        let vote_counts = vec![0; options.len()];
        Self {
            id,
            question,
            options,
            vote_counts,
            voters: HashSet::new(),
        }
    }

    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            question: self.question.clone(),
            options: self.options.clone(),
            vote_counts: self.vote_counts.clone(),
        }
    }
}

/// Read-only view of a poll. Carries no voter identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub question: String,
    pub options: Vec<String>,
    pub vote_counts: Vec<u64>,
}

impl PollSnapshot {
    pub fn total_votes(&self) -> u64 {
        self.vote_counts.iter().sum()
    }
}

/// Emitted after a vote has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCast {
    pub poll_id: PollId,
    pub option_index: usize,
    pub voter: VoterId,
    pub cast_at: DateTime<Utc>,
}

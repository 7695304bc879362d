use crate::models::PollSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub index: usize,
    pub label: String,
    pub count: u64,
    pub percent: u64,
    pub is_winner: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollTally {
    pub question: String,
    pub total_votes: u64,
    pub options: Vec<OptionTally>,
}

/// `count / total` as a whole percentage, halves rounded up.
pub fn percent_of(count: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (count * 200 + total) / (2 * total)
}

impl PollTally {
    pub fn from_snapshot(poll: &PollSnapshot) -> Self {
        let total_votes = poll.total_votes();
        let max_votes = poll.vote_counts.iter().copied().max().unwrap_or(0);

        let options = poll
            .options
            .iter()
            .zip(&poll.vote_counts)
            .enumerate()
            .map(|(index, (label, &count))| OptionTally {
                index,
                label: label.clone(),
                count,
                percent: percent_of(count, total_votes),
                is_winner: total_votes > 0 && count == max_votes,
            })
            .collect();

        Self {
            question: poll.question.clone(),
            total_votes,
            options,
        }
    }

    pub fn winners(&self) -> Vec<&OptionTally> {
        self.options.iter().filter(|option| option.is_winner).collect()
    }

    pub fn raw_results(&self) -> String {
        serde_json::to_string(&self.options).unwrap_or_default()
    }
}

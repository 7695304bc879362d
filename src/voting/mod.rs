pub mod tally;

pub use tally::PollTally;

pub mod tally_refresher;

pub use tally_refresher::{PollDisplays, TrackedCard};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error("at least 2 options required")]
    TooFewOptions,
    #[error("poll does not exist")]
    PollDoesNotExist,
    #[error("already voted")]
    AlreadyVoted,
    #[error("invalid option")]
    InvalidOption,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = core::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

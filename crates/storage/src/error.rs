use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be read back.
    #[error("corrupt event row: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, Error>;

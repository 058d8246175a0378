use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A caller asked for a negative number of results.
    #[error("top_k must be >= 0, got {0}")]
    InvalidTopK(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

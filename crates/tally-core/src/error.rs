//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("duplicate reward code in catalog: {0:?}")]
  DuplicateRewardCode(String),

  #[error("empty reward code in catalog")]
  EmptyRewardCode,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

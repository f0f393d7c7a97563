//! Error types for `timetable-core`.

use thiserror::Error;

use crate::schedule::WeekId;

#[derive(Debug, Error)]
pub enum Error {
  /// Either remote call of the fetch chain failed. Authentication and data
  /// failures are deliberately not told apart.
  #[error("fetch failed: {0}")]
  Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("week not found: {0}")]
  WeekNotFound(WeekId),

  #[error("cell out of range: period {period}, day {day}")]
  CellOutOfRange { period: usize, day: usize },

  #[error("no schedule loaded")]
  NotLoaded,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub(crate) fn fetch<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Fetch(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

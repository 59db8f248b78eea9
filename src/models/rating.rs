use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

/// A single self-rating event. Immutable once recorded; everything
/// downstream (aggregates, trends, triggers) is derived from these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RatingEntry {
  pub id: String,
  pub value: i64,
  pub recorded_at: DateTime<Utc>,
  pub note: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RatingError {
  #[error("Rating value {0} outside valid range {MIN_RATING}-{MAX_RATING}")]
  OutOfRange(i64),
}

impl RatingEntry {
  /// Construct a validated entry. Values outside 1-10 are rejected here
  /// so the aggregation math never sees them.
  pub fn new(id: String, value: i64, recorded_at: DateTime<Utc>) -> Result<Self, RatingError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
      return Err(RatingError::OutOfRange(value));
    }
    Ok(Self {
      id,
      value,
      recorded_at,
      note: None,
    })
  }
}

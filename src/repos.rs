//! Repository seams for injected persistence
//!
//! The analytics core performs no I/O of its own; everything it reads or
//! writes goes through these traits. `store::SqliteStore` implements all
//! of them; tests substitute small in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::friendship::{Friend, FriendshipScore};
use crate::models::rating::RatingEntry;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Invalid stored value: {0}")]
  InvalidValue(String),
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
  /// Ratings recorded at or after `since`. Order is not guaranteed;
  /// consumers sort as needed.
  async fn ratings_since(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
  ) -> Result<Vec<RatingEntry>, StoreError>;
}

#[async_trait]
pub trait FriendsRepository: Send + Sync {
  async fn friends_of(&self, user_id: &str) -> Result<Vec<Friend>, StoreError>;
}

#[async_trait]
pub trait FriendshipScoreCache: Send + Sync {
  /// Sparse friend-id to score map; friends without a computed score are
  /// simply absent.
  async fn scores_for(
    &self,
    user_id: &str,
  ) -> Result<HashMap<String, FriendshipScore>, StoreError>;
}

#[async_trait]
pub trait BadgeRepository: Send + Sync {
  /// Current streak length in days, zero when the user has no streak.
  async fn current_streak(&self, user_id: &str) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait CooldownStore: Send + Sync {
  async fn last_triggered_at(
    &self,
    user_id: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError>;

  async fn set_last_triggered_at(
    &self,
    user_id: &str,
    at: DateTime<Utc>,
  ) -> Result<(), StoreError>;
}

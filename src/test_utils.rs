//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Mock data factories
//! - Seed helpers
//! - Helper assertions

use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};
use crate::models::rating::RatingEntry;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  // Run migrations
  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// Seed the database with one rating per day, newest first.
/// Values cycle 1..=10. Returns the created rating ids.
pub async fn seed_ratings(pool: &SqlitePool, user_id: &str, count: usize) -> Vec<String> {
  let mut ids = Vec::new();

  for i in 0..count {
    let id = format!("seed-{}", i);
    let value = (i % 10 + 1) as i64;
    let recorded_at = Utc::now() - Duration::days(i as i64);

    sqlx::query(
      r#"
      INSERT INTO ratings (id, user_id, value, recorded_at)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(value)
    .bind(recorded_at.to_rfc3339())
    .execute(pool)
    .await
    .expect("Failed to seed rating");

    ids.push(id);
  }

  ids
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// Create a mock rating recorded N days ago
pub fn mock_rating(id: &str, value: i64, days_ago: i64) -> RatingEntry {
  RatingEntry {
    id: id.to_string(),
    value,
    recorded_at: Utc::now() - Duration::days(days_ago),
    note: None,
  }
}

/// Create a mock friend for testing
pub fn mock_friend(id: &str, display_name: &str) -> Friend {
  Friend {
    id: id.to_string(),
    display_name: display_name.to_string(),
    avatar_url: None,
  }
}

/// Create a mock friendship score for testing
pub fn mock_score(friend_id: &str, score: i64, level: FriendshipLevel) -> FriendshipScore {
  FriendshipScore {
    friend_id: friend_id.to_string(),
    score,
    level,
    total_interactions: score / 2,
    friendship_weeks: 4,
    updated_at: Utc::now(),
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// Create a DateTime N hours ago from now
pub fn datetime_hours_ago(hours: i64) -> DateTime<Utc> {
  Utc::now() - Duration::hours(hours)
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    // Verify key tables exist
    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('ratings', 'friends', 'friendship_scores', 'streak_state', 'checkin_state')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert!(tables.len() >= 5, "Expected at least 5 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_ratings_returns_correct_count() {
    let pool = setup_test_db().await;

    let ids = seed_ratings(&pool, "user-1", 5).await;
    assert_eq!(ids.len(), 5);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE user_id = 'user-1'")
      .fetch_one(&pool)
      .await
      .expect("Failed to count ratings");

    assert_eq!(count, 5);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_mock_factories_create_valid_data() {
    let rating = mock_rating("r1", 7, 2);
    assert_eq!(rating.value, 7);
    assert!(rating.note.is_none());

    let friend = mock_friend("f1", "Ana");
    assert_eq!(friend.display_name, "Ana");

    let score = mock_score("f1", 100, FriendshipLevel::Friend);
    assert_eq!(score.score, 100);
    assert_eq!(score.total_interactions, 50);
  }

  #[test]
  fn test_datetime_helpers_produce_correct_dates() {
    let now = Utc::now();
    let past = datetime_days_ago(7);

    let diff = now - past;
    // Allow for slight timing differences (6-8 days is acceptable)
    assert!(diff.num_days() >= 6 && diff.num_days() <= 8,
            "Expected ~7 days difference, got {}", diff.num_days());

    let hour_past = datetime_hours_ago(3);
    assert!((now - hour_past).num_hours() >= 2);
  }
}

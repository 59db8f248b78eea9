//! SQLite-backed persistence
//!
//! Implements every repository seam over one shared pool. Timestamps are
//! stored as RFC 3339 TEXT and enums as their string form, so rows stay
//! readable in any sqlite shell.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::db::DbPool;
use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};
use crate::models::rating::RatingEntry;
use crate::repos::{
  BadgeRepository, CooldownStore, FriendsRepository, FriendshipScoreCache, RatingRepository,
  StoreError,
};

#[derive(Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  /// ---------------------------------------------------------------------------
  /// Write Path (used by sync)
  /// ---------------------------------------------------------------------------

  /// Insert or update ratings by id. Returns the number of rows written.
  pub async fn upsert_ratings(
    &self,
    user_id: &str,
    entries: &[RatingEntry],
  ) -> Result<u64, StoreError> {
    let mut written = 0;
    for entry in entries {
      let result = sqlx::query(
        r#"
        INSERT INTO ratings (id, user_id, value, recorded_at, note)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
          value = excluded.value,
          recorded_at = excluded.recorded_at,
          note = excluded.note
        "#,
      )
      .bind(&entry.id)
      .bind(user_id)
      .bind(entry.value)
      .bind(entry.recorded_at.to_rfc3339())
      .bind(&entry.note)
      .execute(&self.pool)
      .await?;
      written += result.rows_affected();
    }
    Ok(written)
  }

  /// Swap the cached roster for the backend's current one.
  pub async fn replace_friends(&self, user_id: &str, friends: &[Friend]) -> Result<(), StoreError> {
    let mut tx = self.pool.begin().await?;

    sqlx::query("DELETE FROM friends WHERE user_id = ?")
      .bind(user_id)
      .execute(&mut *tx)
      .await?;

    for friend in friends {
      sqlx::query(
        r#"
        INSERT INTO friends (id, user_id, display_name, avatar_url)
        VALUES (?1, ?2, ?3, ?4)
        "#,
      )
      .bind(&friend.id)
      .bind(user_id)
      .bind(&friend.display_name)
      .bind(&friend.avatar_url)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  pub async fn upsert_scores(
    &self,
    user_id: &str,
    scores: &[FriendshipScore],
  ) -> Result<(), StoreError> {
    for score in scores {
      sqlx::query(
        r#"
        INSERT INTO friendship_scores
          (user_id, friend_id, score, level, total_interactions, friendship_weeks, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(user_id, friend_id) DO UPDATE SET
          score = excluded.score,
          level = excluded.level,
          total_interactions = excluded.total_interactions,
          friendship_weeks = excluded.friendship_weeks,
          updated_at = excluded.updated_at
        "#,
      )
      .bind(user_id)
      .bind(&score.friend_id)
      .bind(score.score)
      .bind(score.level.to_string())
      .bind(score.total_interactions)
      .bind(score.friendship_weeks)
      .bind(score.updated_at.to_rfc3339())
      .execute(&self.pool)
      .await?;
    }
    Ok(())
  }

  pub async fn set_streak(&self, user_id: &str, days: i64) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO streak_state (user_id, current_streak, updated_at)
      VALUES (?1, ?2, ?3)
      ON CONFLICT(user_id) DO UPDATE SET
        current_streak = excluded.current_streak,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(user_id)
    .bind(days)
    .bind(Utc::now().to_rfc3339())
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  /// ---------------------------------------------------------------------------
  /// Sync Bookkeeping
  /// ---------------------------------------------------------------------------

  pub async fn last_synced_at(
    &self,
    user_id: &str,
    source: &str,
  ) -> Result<Option<DateTime<Utc>>, StoreError> {
    let row = sqlx::query("SELECT last_synced_at FROM sync_state WHERE user_id = ? AND source = ?")
      .bind(user_id)
      .bind(source)
      .fetch_optional(&self.pool)
      .await?;

    match row {
      Some(row) => {
        let raw: String = row.get("last_synced_at");
        Ok(Some(parse_timestamp("sync_state.last_synced_at", &raw)?))
      }
      None => Ok(None),
    }
  }

  pub async fn set_last_synced_at(
    &self,
    user_id: &str,
    source: &str,
    at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO sync_state (user_id, source, last_synced_at)
      VALUES (?1, ?2, ?3)
      ON CONFLICT(user_id, source) DO UPDATE SET
        last_synced_at = excluded.last_synced_at
      "#,
    )
    .bind(user_id)
    .bind(source)
    .bind(at.to_rfc3339())
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
  DateTime::parse_from_rfc3339(raw)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| StoreError::InvalidValue(format!("{}: {}", column, e)))
}

/// ---------------------------------------------------------------------------
/// Repository Implementations
/// ---------------------------------------------------------------------------

#[async_trait]
impl RatingRepository for SqliteStore {
  async fn ratings_since(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
  ) -> Result<Vec<RatingEntry>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT id, value, recorded_at, note
      FROM ratings
      WHERE user_id = ? AND recorded_at >= ?
      ORDER BY recorded_at DESC
      "#,
    )
    .bind(user_id)
    .bind(since.to_rfc3339())
    .fetch_all(&self.pool)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
      let raw: String = row.get("recorded_at");
      entries.push(RatingEntry {
        id: row.get("id"),
        value: row.get("value"),
        recorded_at: parse_timestamp("ratings.recorded_at", &raw)?,
        note: row.get("note"),
      });
    }
    Ok(entries)
  }
}

#[async_trait]
impl FriendsRepository for SqliteStore {
  async fn friends_of(&self, user_id: &str) -> Result<Vec<Friend>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT id, display_name, avatar_url
      FROM friends
      WHERE user_id = ?
      ORDER BY display_name
      "#,
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|row| Friend {
          id: row.get("id"),
          display_name: row.get("display_name"),
          avatar_url: row.get("avatar_url"),
        })
        .collect(),
    )
  }
}

#[async_trait]
impl FriendshipScoreCache for SqliteStore {
  async fn scores_for(
    &self,
    user_id: &str,
  ) -> Result<HashMap<String, FriendshipScore>, StoreError> {
    let rows = sqlx::query(
      r#"
      SELECT friend_id, score, level, total_interactions, friendship_weeks, updated_at
      FROM friendship_scores
      WHERE user_id = ?
      "#,
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    let mut scores = HashMap::with_capacity(rows.len());
    for row in rows {
      let level_raw: String = row.get("level");
      let level: FriendshipLevel = level_raw.parse().map_err(StoreError::InvalidValue)?;
      let updated_raw: String = row.get("updated_at");
      let friend_id: String = row.get("friend_id");

      scores.insert(
        friend_id.clone(),
        FriendshipScore {
          friend_id,
          score: row.get("score"),
          level,
          total_interactions: row.get("total_interactions"),
          friendship_weeks: row.get("friendship_weeks"),
          updated_at: parse_timestamp("friendship_scores.updated_at", &updated_raw)?,
        },
      );
    }
    Ok(scores)
  }
}

#[async_trait]
impl BadgeRepository for SqliteStore {
  async fn current_streak(&self, user_id: &str) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT current_streak FROM streak_state WHERE user_id = ?")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;

    Ok(row.map(|r| r.get("current_streak")).unwrap_or(0))
  }
}

#[async_trait]
impl CooldownStore for SqliteStore {
  async fn last_triggered_at(&self, user_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    let row = sqlx::query("SELECT last_triggered_at FROM checkin_state WHERE user_id = ?")
      .bind(user_id)
      .fetch_optional(&self.pool)
      .await?;

    let raw: Option<String> = match row {
      Some(row) => row.get("last_triggered_at"),
      None => None,
    };

    match raw {
      Some(raw) => Ok(Some(parse_timestamp("checkin_state.last_triggered_at", &raw)?)),
      None => Ok(None),
    }
  }

  async fn set_last_triggered_at(&self, user_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO checkin_state (user_id, last_triggered_at)
      VALUES (?1, ?2)
      ON CONFLICT(user_id) DO UPDATE SET
        last_triggered_at = excluded.last_triggered_at
      "#,
    )
    .bind(user_id)
    .bind(at.to_rfc3339())
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

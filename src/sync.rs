//! Backend sync for ratings and social data
//!
//! The backend owns canonical data; this module pulls the four datasets
//! the insight engine reads (ratings, friends, friendship scores, streak)
//! into the local store. Pull only, nothing is pushed back.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::config::Config;
use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};
use crate::models::rating::RatingEntry;
use crate::repos::StoreError;
use crate::store::SqliteStore;

const SOURCE_RATINGS: &str = "ratings";
const SOURCE_FRIENDS: &str = "friends";
const SOURCE_SCORES: &str = "friendship_scores";
const SOURCE_STREAK: &str = "streak";

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SyncError {
  #[error("Invalid backend URL: {0}")]
  InvalidUrl(String),

  #[error("HTTP request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Database error: {0}")]
  Database(String),
}

impl From<reqwest::Error> for SyncError {
  fn from(e: reqwest::Error) -> Self {
    SyncError::Request(e.to_string())
  }
}

impl From<StoreError> for SyncError {
  fn from(e: StoreError) -> Self {
    SyncError::Database(e.to_string())
  }
}

/// ---------------------------------------------------------------------------
/// Backend API Data Structures
/// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RatingsResponse {
  pub data: Vec<RatingDto>,
}

#[derive(Debug, Deserialize)]
pub struct RatingDto {
  pub id: String,
  pub value: i64,
  pub recorded_at: DateTime<Utc>,
  #[serde(default)]
  pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FriendsResponse {
  pub data: Vec<FriendDto>,
}

#[derive(Debug, Deserialize)]
pub struct FriendDto {
  pub id: String,
  pub display_name: String,
  #[serde(default)]
  pub avatar_url: Option<String>,
}

impl From<FriendDto> for Friend {
  fn from(dto: FriendDto) -> Self {
    Self {
      id: dto.id,
      display_name: dto.display_name,
      avatar_url: dto.avatar_url,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ScoresResponse {
  pub data: Vec<ScoreDto>,
}

#[derive(Debug, Deserialize)]
pub struct ScoreDto {
  pub friend_id: String,
  pub score: i64,
  pub level: FriendshipLevel,
  #[serde(default)]
  pub total_interactions: i64,
  #[serde(default)]
  pub friendship_weeks: i64,
  pub updated_at: DateTime<Utc>,
}

impl From<ScoreDto> for FriendshipScore {
  fn from(dto: ScoreDto) -> Self {
    Self {
      friend_id: dto.friend_id,
      score: dto.score,
      level: dto.level,
      total_interactions: dto.total_interactions,
      friendship_weeks: dto.friendship_weeks,
      updated_at: dto.updated_at,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct StreakResponse {
  #[serde(default)]
  pub current_streak: i64,
}

/// ---------------------------------------------------------------------------
/// Backend Client
/// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct BackendClient {
  http: Client,
  base_url: Url,
  token: String,
}

impl BackendClient {
  pub fn new(base_url: &str, token: &str) -> Result<Self, SyncError> {
    let base_url = Url::parse(base_url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
    Ok(Self {
      http: Client::new(),
      base_url,
      token: token.to_string(),
    })
  }

  pub fn from_config(config: &Config) -> Result<Self, SyncError> {
    Self::new(&config.backend_url, &config.api_token)
  }

  fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
    self
      .base_url
      .join(path)
      .map_err(|e| SyncError::InvalidUrl(e.to_string()))
  }

  /// Fetch ratings for a user, optionally only those recorded after `since`.
  pub async fn fetch_ratings(
    &self,
    user_id: &str,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<RatingDto>, SyncError> {
    let mut url = self.endpoint(&format!("/v1/users/{}/ratings", user_id))?;
    if let Some(since) = since {
      url.query_pairs_mut().append_pair("since", &since.to_rfc3339());
    }

    let response = self.http.get(url).bearer_auth(&self.token).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SyncError::Api(format!(
        "Ratings API error {}: {}",
        status, error_text
      )));
    }

    let body: RatingsResponse = response.json().await?;
    Ok(body.data)
  }

  pub async fn fetch_friends(&self, user_id: &str) -> Result<Vec<FriendDto>, SyncError> {
    let url = self.endpoint(&format!("/v1/users/{}/friends", user_id))?;

    let response = self.http.get(url).bearer_auth(&self.token).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SyncError::Api(format!(
        "Friends API error {}: {}",
        status, error_text
      )));
    }

    let body: FriendsResponse = response.json().await?;
    Ok(body.data)
  }

  pub async fn fetch_scores(&self, user_id: &str) -> Result<Vec<ScoreDto>, SyncError> {
    let url = self.endpoint(&format!("/v1/users/{}/friendship-scores", user_id))?;

    let response = self.http.get(url).bearer_auth(&self.token).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SyncError::Api(format!(
        "Friendship scores API error {}: {}",
        status, error_text
      )));
    }

    let body: ScoresResponse = response.json().await?;
    Ok(body.data)
  }

  pub async fn fetch_streak(&self, user_id: &str) -> Result<StreakResponse, SyncError> {
    let url = self.endpoint(&format!("/v1/users/{}/streak", user_id))?;

    let response = self.http.get(url).bearer_auth(&self.token).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response.text().await.unwrap_or_default();
      return Err(SyncError::Api(format!(
        "Streak API error {}: {}",
        status, error_text
      )));
    }

    Ok(response.json().await?)
  }
}

/// ---------------------------------------------------------------------------
/// Sync Orchestration
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
  pub ratings_upserted: u64,
  pub ratings_skipped: usize,
  pub friends: usize,
  pub scores: usize,
  pub streak_days: i64,
}

/// Pull all four datasets for one user into the local store. Ratings that
/// fail validation are skipped, not fatal; the backend occasionally replays
/// rows from before value clamping existed.
pub async fn sync_user(
  client: &BackendClient,
  store: &SqliteStore,
  user_id: &str,
) -> Result<SyncSummary, SyncError> {
  let now = Utc::now();

  let since = store.last_synced_at(user_id, SOURCE_RATINGS).await?;
  let dtos = client.fetch_ratings(user_id, since).await?;

  let mut entries = Vec::with_capacity(dtos.len());
  let mut skipped = 0;
  for dto in dtos {
    match RatingEntry::new(dto.id, dto.value, dto.recorded_at) {
      Ok(mut entry) => {
        entry.note = dto.note;
        entries.push(entry);
      }
      Err(e) => {
        warn!(user_id, error = %e, "skipping invalid rating from backend");
        skipped += 1;
      }
    }
  }
  let upserted = store.upsert_ratings(user_id, &entries).await?;
  store.set_last_synced_at(user_id, SOURCE_RATINGS, now).await?;

  let friends: Vec<Friend> = client
    .fetch_friends(user_id)
    .await?
    .into_iter()
    .map(Friend::from)
    .collect();
  store.replace_friends(user_id, &friends).await?;
  store.set_last_synced_at(user_id, SOURCE_FRIENDS, now).await?;

  let scores: Vec<FriendshipScore> = client
    .fetch_scores(user_id)
    .await?
    .into_iter()
    .map(FriendshipScore::from)
    .collect();
  store.upsert_scores(user_id, &scores).await?;
  store.set_last_synced_at(user_id, SOURCE_SCORES, now).await?;

  let streak_days = client.fetch_streak(user_id).await?.current_streak.max(0);
  store.set_streak(user_id, streak_days).await?;
  store.set_last_synced_at(user_id, SOURCE_STREAK, now).await?;

  info!(
    user_id,
    ratings = entries.len(),
    skipped,
    friends = friends.len(),
    scores = scores.len(),
    streak_days,
    "sync complete"
  );

  Ok(SyncSummary {
    ratings_upserted: upserted,
    ratings_skipped: skipped,
    friends: friends.len(),
    scores: scores.len(),
    streak_days,
  })
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use crate::repos::{BadgeRepository, FriendsRepository, FriendshipScoreCache};
  use crate::test_utils::{setup_test_db, teardown_test_db};
  use chrono::TimeZone;

  fn ratings_body() -> String {
    serde_json::json!({
      "data": [
        { "id": "r1", "value": 7, "recorded_at": "2025-03-15T09:00:00Z" },
        { "id": "r2", "value": 12, "recorded_at": "2025-03-15T10:00:00Z" },
        { "id": "r3", "value": 4, "recorded_at": "2025-03-14T21:30:00Z", "note": "long day" }
      ]
    })
    .to_string()
  }

  #[tokio::test]
  async fn test_fetch_ratings_parses_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/v1/users/user-1/ratings")
      .match_header("authorization", "Bearer test-token")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(ratings_body())
      .create_async()
      .await;

    let client = BackendClient::new(&server.url(), "test-token").unwrap();
    let ratings = client.fetch_ratings("user-1", None).await.unwrap();

    mock.assert_async().await;
    assert_eq!(ratings.len(), 3);
    assert_eq!(ratings[0].id, "r1");
    assert_eq!(ratings[2].note.as_deref(), Some("long day"));
  }

  #[tokio::test]
  async fn test_fetch_ratings_sends_since_param() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/v1/users/user-1/ratings")
      .match_query(mockito::Matcher::UrlEncoded(
        "since".into(),
        "2025-03-01T00:00:00+00:00".into(),
      ))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{ "data": [] }"#)
      .create_async()
      .await;

    let client = BackendClient::new(&server.url(), "test-token").unwrap();
    let since = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let ratings = client.fetch_ratings("user-1", Some(since)).await.unwrap();

    mock.assert_async().await;
    assert!(ratings.is_empty());
  }

  #[tokio::test]
  async fn test_server_error_surfaces_as_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/v1/users/user-1/streak")
      .with_status(500)
      .with_body("boom")
      .create_async()
      .await;

    let client = BackendClient::new(&server.url(), "test-token").unwrap();
    let err = client.fetch_streak("user-1").await.unwrap_err();

    assert!(matches!(err, SyncError::Api(_)));
  }

  #[tokio::test]
  async fn test_invalid_base_url_is_rejected() {
    let err = BackendClient::new("not a url", "token").unwrap_err();
    assert!(matches!(err, SyncError::InvalidUrl(_)));
  }

  #[tokio::test]
  async fn test_sync_user_pulls_all_datasets() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/v1/users/user-1/ratings")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(ratings_body())
      .create_async()
      .await;
    server
      .mock("GET", "/v1/users/user-1/friends")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        r#"{ "data": [
          { "id": "f1", "display_name": "Ana", "avatar_url": "https://cdn.example/avatar.png" },
          { "id": "f2", "display_name": "Ben" }
        ] }"#,
      )
      .create_async()
      .await;
    server
      .mock("GET", "/v1/users/user-1/friendship-scores")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        r#"{ "data": [
          {
            "friend_id": "f1",
            "score": 180,
            "level": "best_friend",
            "total_interactions": 90,
            "friendship_weeks": 12,
            "updated_at": "2025-03-15T08:00:00Z"
          }
        ] }"#,
      )
      .create_async()
      .await;
    server
      .mock("GET", "/v1/users/user-1/streak")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{ "current_streak": 6 }"#)
      .create_async()
      .await;

    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let client = BackendClient::new(&server.url(), "test-token").unwrap();

    let summary = sync_user(&client, &store, "user-1").await.unwrap();

    // r2 carries an out-of-range value and must be dropped, not stored
    assert_eq!(summary.ratings_upserted, 2);
    assert_eq!(summary.ratings_skipped, 1);
    assert_eq!(summary.friends, 2);
    assert_eq!(summary.scores, 1);
    assert_eq!(summary.streak_days, 6);

    let roster = store.friends_of("user-1").await.unwrap();
    assert_eq!(roster.len(), 2);
    let scores = store.scores_for("user-1").await.unwrap();
    assert_eq!(scores.get("f1").unwrap().level, FriendshipLevel::BestFriend);
    assert_eq!(store.current_streak("user-1").await.unwrap(), 6);
    assert!(store
      .last_synced_at("user-1", "ratings")
      .await
      .unwrap()
      .is_some());

    teardown_test_db(pool).await;
  }
}

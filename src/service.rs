//! Service facade over the analytics core
//!
//! One entry point per read the app makes. Wires the repositories, the
//! check-in engine, and the clock together; every calculation underneath
//! stays pure and separately tested.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::{aggregate_days, DayAggregate, DEFAULT_LOOKBACK_DAYS};
use crate::checkin::{CheckInError, CheckInTriggerEngine, CompletedCheckIn};
use crate::clock::Clock;
use crate::insights::{synthesize, Insight, InsightContext};
use crate::models::checkin::CheckInSession;
use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};
use crate::momentum::friendship_momentum;
use crate::repos::{
  BadgeRepository, CooldownStore, FriendsRepository, FriendshipScoreCache, RatingRepository,
  StoreError,
};
use crate::store::SqliteStore;
use crate::trend::analyze_trend;
use crate::weekday::analyze_weekdays;

/// How far back the service reads rating history for analytics. Weekday
/// patterns and trends are count-based, so the bound is a query guard,
/// not a semantic window.
const RATING_HISTORY_DAYS: i64 = 365;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
  #[error("Store error: {0}")]
  Store(#[from] StoreError),

  #[error("Check-in error: {0}")]
  CheckIn(#[from] CheckInError),
}

/// Everything the home screen renders in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightFeed {
  pub generated_for: NaiveDate,
  pub days: Vec<DayAggregate>,
  pub insights: Vec<Insight>,
}

pub struct InsightService {
  ratings: Arc<dyn RatingRepository>,
  friends: Arc<dyn FriendsRepository>,
  scores: Arc<dyn FriendshipScoreCache>,
  badges: Arc<dyn BadgeRepository>,
  engine: CheckInTriggerEngine,
  clock: Arc<dyn Clock>,
}

impl InsightService {
  pub fn new(
    ratings: Arc<dyn RatingRepository>,
    friends: Arc<dyn FriendsRepository>,
    scores: Arc<dyn FriendshipScoreCache>,
    badges: Arc<dyn BadgeRepository>,
    cooldowns: Arc<dyn CooldownStore>,
    clock: Arc<dyn Clock>,
  ) -> Self {
    Self {
      ratings,
      friends,
      scores,
      badges,
      engine: CheckInTriggerEngine::new(cooldowns, Arc::clone(&clock)),
      clock,
    }
  }

  /// Wire every seam to the same SQLite store.
  pub fn with_store(store: Arc<SqliteStore>, clock: Arc<dyn Clock>) -> Self {
    Self::new(
      store.clone(),
      store.clone(),
      store.clone(),
      store.clone(),
      store,
      clock,
    )
  }

  /// ---------------------------------------------------------------------------
  /// Reads
  /// ---------------------------------------------------------------------------

  /// Assemble the full home-screen payload: the 10-day series plus the
  /// synthesized insight slots.
  pub async fn insight_feed(&self, user_id: &str) -> Result<InsightFeed, ServiceError> {
    let now = self.clock.now_utc();
    let offset = self.clock.local_offset();
    let today = self.clock.today();

    let since = now - Duration::days(RATING_HISTORY_DAYS);
    let entries = self.ratings.ratings_since(user_id, since).await?;
    let friends = self.friends.friends_of(user_id).await?;
    let scores = self.scores.scores_for(user_id).await?;
    let streak_days = self.badges.current_streak(user_id).await?;

    let aggregates = aggregate_days(&entries, now, offset, DEFAULT_LOOKBACK_DAYS);
    let trend = analyze_trend(&entries);
    let pattern = analyze_weekdays(&entries, offset);
    let momentum = friendship_momentum(&friends, &scores);

    let ctx = InsightContext {
      aggregates: &aggregates,
      trend: trend.as_ref(),
      pattern: &pattern,
      momentum: &momentum,
      friends: &friends,
      scores: &scores,
      streak_days,
      today,
    };
    let insights: Vec<Insight> = synthesize(&ctx);

    debug!(user_id, slots = insights.len(), "insight feed assembled");

    Ok(InsightFeed {
      generated_for: today,
      days: aggregates,
      insights,
    })
  }

  /// The 10-day aggregate series on its own, for the chart view.
  pub async fn day_aggregates(&self, user_id: &str) -> Result<Vec<DayAggregate>, ServiceError> {
    let now = self.clock.now_utc();
    let offset = self.clock.local_offset();

    // one extra day of margin so offset shifts never clip the window
    let since = now - Duration::days(DEFAULT_LOOKBACK_DAYS as i64 + 1);
    let entries = self.ratings.ratings_since(user_id, since).await?;

    Ok(aggregate_days(&entries, now, offset, DEFAULT_LOOKBACK_DAYS))
  }

  /// ---------------------------------------------------------------------------
  /// Check-In Flow
  /// ---------------------------------------------------------------------------

  /// Fail-closed wrapper over the trigger engine: any store problem means
  /// no prompt, never a spurious one.
  pub async fn should_prompt_check_in(&self, user_id: &str) -> bool {
    let since = self.clock.now_utc() - Duration::days(RATING_HISTORY_DAYS);
    let ratings = match self.ratings.ratings_since(user_id, since).await {
      Ok(ratings) => ratings,
      Err(e) => {
        warn!(user_id, error = %e, "check-in gate: ratings read failed, staying quiet");
        return false;
      }
    };

    match self.engine.evaluate(user_id, &ratings).await {
      Ok(decision) => decision,
      Err(e) => {
        warn!(user_id, error = %e, "check-in gate: evaluation failed, staying quiet");
        false
      }
    }
  }

  /// Open a session, deriving best-friend facts from the score cache so
  /// the flow knows whether to offer the friend-notice step.
  pub async fn start_check_in(&self, user_id: &str) -> Result<CheckInSession, ServiceError> {
    let friends = self.friends.friends_of(user_id).await?;
    let scores = self.scores.scores_for(user_id).await?;

    let best_friend_name = best_friend_of(&friends, &scores);
    let has_best_friend = best_friend_name.is_some();

    Ok(
      self
        .engine
        .start_check_in(user_id, has_best_friend, best_friend_name)
        .await?,
    )
  }

  pub fn skip_check_in(&self, session: CheckInSession) {
    self.engine.skip_check_in(session)
  }

  pub fn complete_check_in(
    &self,
    session: CheckInSession,
  ) -> Result<CompletedCheckIn, ServiceError> {
    Ok(self.engine.complete_check_in(session)?)
  }
}

/// Highest-scoring friend at the best-friend level; ties go to the
/// lexically smallest friend id, same as the momentum pick.
fn best_friend_of(
  friends: &[Friend],
  scores: &HashMap<String, FriendshipScore>,
) -> Option<String> {
  let mut best: Option<(&Friend, &FriendshipScore)> = None;

  for friend in friends {
    let score = match scores.get(&friend.id) {
      Some(score) => score,
      None => continue,
    };
    if score.level != FriendshipLevel::BestFriend {
      continue;
    }

    best = match best {
      Some((_, bs)) if score.score > bs.score => Some((friend, score)),
      Some((bf, bs)) if score.score == bs.score && friend.id < bf.id => Some((friend, score)),
      None => Some((friend, score)),
      keep => keep,
    };
  }

  best.map(|(friend, _)| friend.display_name.clone())
}

//! Check-In Trigger Engine
//!
//! Watches the rating stream for rough stretches and decides when to offer
//! a guided check-in conversation. Two trigger rules:
//! - sustained low mood: the newest ratings (up to 3) average below 5
//! - sharp drop: the newest rating sits 4+ points below the previous one
//!
//! Triggering is rate-limited by a persisted 24-hour cooldown per user.
//! Starting a check-in consumes the cooldown immediately, even if the user
//! skips the session right away: at most one prompt per day.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::models::checkin::{CheckInSession, CheckInStep};
use crate::models::rating::RatingEntry;
use crate::repos::{CooldownStore, StoreError};

pub const COOLDOWN_HOURS: i64 = 24;

/// Rule A: how many of the newest ratings feed the low-mood mean.
const LOW_WINDOW: usize = 3;
const LOW_MEAN: f64 = 5.0;

/// Rule B: minimum drop from the previous rating to the newest.
const SHARP_DROP: i64 = 4;

// ---------------------------------------------------------------------------
/// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("Cooldown state unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Check-in session is at step {0}, expected {1}")]
    InvalidStep(CheckInStep, CheckInStep),
}

// ---------------------------------------------------------------------------
/// Trigger Rules (pure)
// ---------------------------------------------------------------------------

/// Apply the rating rules alone, ignoring cooldown. Newest-first ordering
/// is established internally; callers pass ratings in any order.
pub fn should_trigger(ratings: &[RatingEntry]) -> bool {
    let mut sorted: Vec<&RatingEntry> = ratings.iter().collect();
    sorted.sort_by_key(|e| std::cmp::Reverse(e.recorded_at));

    // Rule A: sustained low mood
    let recent = &sorted[..sorted.len().min(LOW_WINDOW)];
    if recent.len() >= 2 {
        let mean = recent.iter().map(|e| e.value).sum::<i64>() as f64 / recent.len() as f64;
        if mean < LOW_MEAN {
            return true;
        }
    }

    // Rule B: sharp single-day drop, independent of the mean
    if sorted.len() >= 2 && sorted[1].value - sorted[0].value >= SHARP_DROP {
        return true;
    }

    false
}

// ---------------------------------------------------------------------------
/// Completed Check-In: handoff payload once a session finishes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CompletedCheckIn {
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub notify_friend: bool,
    pub best_friend_name: Option<String>,
    pub reflection_response: Option<String>,
    pub gratitude_response: Option<String>,
}

// ---------------------------------------------------------------------------
/// Trigger Engine
// ---------------------------------------------------------------------------

/// Stateful engine owning the persisted cooldown. Per-user async locks
/// serialize `evaluate` against `start_check_in` so two racing calls cannot
/// both trigger inside the same instant.
pub struct CheckInTriggerEngine {
    store: Arc<dyn CooldownStore>,
    clock: Arc<dyn Clock>,
    user_locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CheckInTriggerEngine {
    pub fn new(store: Arc<dyn CooldownStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            user_locks: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id.to_string()).or_default().clone()
    }

    /// Decide whether the check-in prompt should be offered right now.
    /// Read-only. Errors from the cooldown store surface to the caller,
    /// which is expected to fail closed (no prompt).
    pub async fn evaluate(
        &self,
        user_id: &str,
        ratings: &[RatingEntry],
    ) -> Result<bool, CheckInError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        if ratings.is_empty() {
            return Ok(false);
        }

        if let Some(last) = self.store.last_triggered_at(user_id).await? {
            let elapsed = self.clock.now_utc() - last;
            if elapsed < Duration::hours(COOLDOWN_HOURS) {
                debug!("check-in suppressed by cooldown for {}", user_id);
                return Ok(false);
            }
        }

        Ok(should_trigger(ratings))
    }

    /// Create a session and consume the cooldown window in the same
    /// critical section. The consumption sticks even if the session is
    /// skipped immediately afterward.
    pub async fn start_check_in(
        &self,
        user_id: &str,
        has_best_friend: bool,
        best_friend_name: Option<String>,
    ) -> Result<CheckInSession, CheckInError> {
        let lock = self.user_lock(user_id).await;
        let _guard = lock.lock().await;

        let now = self.clock.now_utc();
        self.store.set_last_triggered_at(user_id, now).await?;
        debug!("check-in started for {}", user_id);

        Ok(CheckInSession::new(
            user_id.to_string(),
            now,
            has_best_friend,
            best_friend_name,
        ))
    }

    /// Discard a session from any step. The already-consumed cooldown is
    /// not refunded.
    pub fn skip_check_in(&self, session: CheckInSession) {
        debug!(
            "check-in skipped at step {} for {}",
            session.current_step, session.user_id
        );
    }

    /// Finish a session that has reached the terminal step, producing the
    /// handoff payload for the host app.
    pub fn complete_check_in(
        &self,
        session: CheckInSession,
    ) -> Result<CompletedCheckIn, CheckInError> {
        if !session.is_complete() {
            return Err(CheckInError::InvalidStep(
                session.current_step,
                CheckInStep::Complete,
            ));
        }

        Ok(CompletedCheckIn {
            user_id: session.user_id,
            started_at: session.started_at,
            notify_friend: session.notify_friend && session.has_best_friend,
            best_friend_name: session.best_friend_name,
            reflection_response: session.reflection_response,
            gratitude_response: session.gratitude_response,
        })
    }
}

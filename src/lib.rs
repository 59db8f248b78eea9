//! Rating analytics and check-in engine
//!
//! Turns a user's 1-10 daily ratings and their social graph into the
//! home-screen feed: weighted day aggregates, week-over-week trend,
//! weekday patterns, friendship momentum, and a cooldown-gated wellness
//! check-in flow. Presentation stays in the app; this crate owns the
//! numbers and the state machines.

pub mod aggregate;
pub mod checkin;
pub mod clock;
pub mod config;
pub mod db;
pub mod insights;
pub mod models;
pub mod momentum;
pub mod repos;
pub mod service;
pub mod store;
pub mod sync;
pub mod trend;
pub mod weekday;

#[cfg(test)]
mod test_utils;

pub use aggregate::{aggregate_days, DayAggregate, DEFAULT_LOOKBACK_DAYS};
pub use checkin::{should_trigger, CheckInError, CheckInTriggerEngine, CompletedCheckIn};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, ConfigError};
pub use db::{initialize_db, DbPool};
pub use insights::{synthesize, Insight, InsightContext, InsightSlot};
pub use models::{
  CheckInSession, CheckInStep, Friend, FriendshipLevel, FriendshipScore, RatingEntry,
};
pub use momentum::{friendship_momentum, MomentumNarrative, MomentumOutcome};
pub use repos::{
  BadgeRepository, CooldownStore, FriendsRepository, FriendshipScoreCache, RatingRepository,
  StoreError,
};
pub use service::{InsightFeed, InsightService, ServiceError};
pub use store::SqliteStore;
pub use sync::{sync_user, BackendClient, SyncError, SyncSummary};
pub use trend::{analyze_trend, TrendDirection, TrendSnapshot};
pub use weekday::{analyze_weekdays, PatternStrength, WeekdayPattern, WeekdaySummary};

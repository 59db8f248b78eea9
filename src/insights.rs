//! Insight synthesis
//!
//! Folds the analytics signals into the five-slot feed the home screen
//! renders: trend, friends activity, coach, weekday pattern, friendship
//! momentum. Slots without enough data degrade to a deterministic empty
//! state instead of disappearing; only the momentum slot is omitted
//! outright, and only when the user has no friends at all.
//!
//! Insights carry semantic payload only. Colors, icons, and animation are
//! presentation concerns and stay out of this layer.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::DayAggregate;
use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};
use crate::momentum::MomentumOutcome;
use crate::trend::{TrendDirection, TrendSnapshot};
use crate::weekday::{PatternStrength, WeekdayPattern, UNLOCK_COUNT};

/// Streak lengths celebrated as milestones.
pub const STREAK_MILESTONES: [i64; 4] = [7, 30, 100, 365];

/// How close (in days) a milestone has to be before the coach teases it.
const MILESTONE_APPROACH_DAYS: i64 = 3;

/// Streaks this long get acknowledged even between milestones.
const ONGOING_STREAK_MIN: i64 = 2;

const ROUGH_WEEK_AVG: f64 = 5.0;
const GREAT_WEEK_AVG: f64 = 8.0;
/// Ratings needed in the week window before mood summaries apply.
const WEEK_MIN_RATINGS: usize = 3;
const WEEK_WINDOW_DAYS: usize = 7;

const STEADY_MESSAGES: [&str; 4] = [
  "Holding steady. Consistency counts for a lot.",
  "Same vibe as last week, and that's okay.",
  "Steady as she goes. Small days add up.",
  "No big swings this week. Stability is underrated.",
];

const ENCOURAGEMENT_MESSAGES: [&str; 5] = [
  "Every check-in is a little act of self-respect.",
  "Showing up for yourself today counts.",
  "One rating a day keeps the fog away.",
  "Small habits, big picture. Keep going.",
  "Your future self will thank you for logging today.",
];

/// ---------------------------------------------------------------------------
/// Insight Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightSlot {
  Trend,
  FriendsActivity,
  Coach,
  Pattern,
  Momentum,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekTrendInsight {
  pub headline: String,
  pub detail: String,
  pub direction: TrendDirection,
  pub current_average: f64,
  pub previous_average: f64,
  pub change_percent: f64,
  pub best_week: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendsActivityInsight {
  pub headline: String,
  pub detail: String,
  pub scored_friends: usize,
  pub total_interactions: i64,
  pub most_active_friend: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoachTheme {
  MilestoneApproaching,
  MilestoneReached,
  StreakOngoing,
  RoughWeek,
  GreatWeek,
  Encouragement,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachInsight {
  pub theme: CoachTheme,
  pub headline: String,
  pub detail: String,
  pub streak_days: i64,
  pub milestone: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPatternInsight {
  pub headline: String,
  pub detail: String,
  pub best_weekday: u32,
  pub worst_weekday: u32,
  pub difference: f64,
  pub strength: PatternStrength,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumInsight {
  pub headline: String,
  pub detail: String,
  pub friend_name: String,
  pub level: FriendshipLevel,
  pub score: i64,
  pub previous_score: i64,
}

/// Deterministic placeholder for a slot without enough data; distinct from
/// an error. `progress` is set only for the locked weekday pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyStateInsight {
  pub slot: InsightSlot,
  pub headline: String,
  pub detail: String,
  pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Insight {
  WeekTrend(WeekTrendInsight),
  FriendsActivity(FriendsActivityInsight),
  AiCoach(CoachInsight),
  RatingPattern(RatingPatternInsight),
  FriendshipMomentum(MomentumInsight),
  EmptyState(EmptyStateInsight),
}

impl Insight {
  pub fn slot(&self) -> InsightSlot {
    match self {
      Insight::WeekTrend(_) => InsightSlot::Trend,
      Insight::FriendsActivity(_) => InsightSlot::FriendsActivity,
      Insight::AiCoach(_) => InsightSlot::Coach,
      Insight::RatingPattern(_) => InsightSlot::Pattern,
      Insight::FriendshipMomentum(_) => InsightSlot::Momentum,
      Insight::EmptyState(e) => e.slot,
    }
  }
}

/// ---------------------------------------------------------------------------
/// Synthesis Context
/// ---------------------------------------------------------------------------

/// Everything the synthesizer reads, precomputed by the caller. Borrowed so
/// synthesis stays pure and cheap.
pub struct InsightContext<'a> {
  pub aggregates: &'a [DayAggregate],
  pub trend: Option<&'a TrendSnapshot>,
  pub pattern: &'a WeekdayPattern,
  pub momentum: &'a MomentumOutcome,
  pub friends: &'a [Friend],
  pub scores: &'a HashMap<String, FriendshipScore>,
  pub streak_days: i64,
  pub today: NaiveDate,
}

/// ---------------------------------------------------------------------------
/// Synthesis
/// ---------------------------------------------------------------------------

/// Build the ordered feed. Five slots normally; four when the momentum
/// slot is omitted for a user with no friends.
pub fn synthesize(ctx: &InsightContext) -> Vec<Insight> {
  let mut insights = Vec::with_capacity(5);
  insights.push(trend_slot(ctx));
  insights.push(friends_activity_slot(ctx));
  insights.push(coach_slot(ctx));
  insights.push(pattern_slot(ctx));
  if let Some(momentum) = momentum_slot(ctx) {
    insights.push(momentum);
  } else {
    debug!("momentum slot omitted: no friends");
  }
  insights
}

fn trend_slot(ctx: &InsightContext) -> Insight {
  let snapshot = match ctx.trend {
    Some(s) => s,
    None => {
      return Insight::EmptyState(EmptyStateInsight {
        slot: InsightSlot::Trend,
        headline: "Your week at a glance".to_string(),
        detail: "Log a couple more days to see your trend.".to_string(),
        progress: None,
      })
    }
  };

  let (headline, detail) = match snapshot.direction {
    TrendDirection::Improving if snapshot.best_week => (
      "Best week yet!".to_string(),
      format!(
        "Your vibe is up {:.0}% over last week. Keep doing whatever this is.",
        snapshot.change_percent
      ),
    ),
    TrendDirection::Improving => (
      "Trending up".to_string(),
      format!(
        "Averaging {:.1}, up from {:.1} last week.",
        snapshot.current_average, snapshot.previous_average
      ),
    ),
    TrendDirection::Declining => (
      "A heavier week".to_string(),
      format!(
        "Averaging {:.1}, down from {:.1}. Be kind to yourself.",
        snapshot.current_average, snapshot.previous_average
      ),
    ),
    TrendDirection::Steady if !snapshot.compared => (
      "Holding steady".to_string(),
      "Keep logging daily to unlock a week-over-week comparison.".to_string(),
    ),
    TrendDirection::Steady => (
      "Holding steady".to_string(),
      rotated(&STEADY_MESSAGES, ctx.today).to_string(),
    ),
  };

  Insight::WeekTrend(WeekTrendInsight {
    headline,
    detail,
    direction: snapshot.direction,
    current_average: snapshot.current_average,
    previous_average: snapshot.previous_average,
    change_percent: snapshot.change_percent,
    best_week: snapshot.best_week,
  })
}

fn friends_activity_slot(ctx: &InsightContext) -> Insight {
  if ctx.friends.is_empty() {
    return Insight::EmptyState(EmptyStateInsight {
      slot: InsightSlot::FriendsActivity,
      headline: "Find your people".to_string(),
      detail: "Add friends to see what your circle is up to.".to_string(),
      progress: None,
    });
  }

  let mut scored: Vec<(&Friend, &FriendshipScore)> = ctx
    .friends
    .iter()
    .filter_map(|f| ctx.scores.get(&f.id).map(|s| (f, s)))
    .collect();

  if scored.is_empty() {
    return Insight::EmptyState(EmptyStateInsight {
      slot: InsightSlot::FriendsActivity,
      headline: "No activity yet".to_string(),
      detail: "Interact with your friends to light this up.".to_string(),
      progress: None,
    });
  }

  // Most interactions wins; ties go to the lexically smallest friend id,
  // the same pinned rule the momentum pick uses.
  scored.sort_by(|(fa, sa), (fb, sb)| {
    sb.total_interactions
      .cmp(&sa.total_interactions)
      .then_with(|| fa.id.cmp(&fb.id))
  });

  let total_interactions: i64 = scored.iter().map(|(_, s)| s.total_interactions).sum();
  let (top_friend, _) = scored[0];

  let headline = if scored.len() == 1 {
    "1 friend in the mix".to_string()
  } else {
    format!("{} friends in the mix", scored.len())
  };

  Insight::FriendsActivity(FriendsActivityInsight {
    detail: format!(
      "{} interactions across your circle. {} is leading the charge.",
      total_interactions, top_friend.display_name
    ),
    headline,
    scored_friends: scored.len(),
    total_interactions,
    most_active_friend: top_friend.display_name.clone(),
  })
}

fn coach_slot(ctx: &InsightContext) -> Insight {
  let streak = ctx.streak_days;

  if streak > 0 {
    for milestone in STREAK_MILESTONES {
      let remaining = milestone - streak;
      if (1..=MILESTONE_APPROACH_DAYS).contains(&remaining) {
        return Insight::AiCoach(CoachInsight {
          theme: CoachTheme::MilestoneApproaching,
          headline: format!("{} days from a milestone", remaining),
          detail: format!(
            "Check in {} more days to hit your {}-day streak.",
            remaining, milestone
          ),
          streak_days: streak,
          milestone: Some(milestone),
        });
      }
    }

    if STREAK_MILESTONES.contains(&streak) {
      return Insight::AiCoach(CoachInsight {
        theme: CoachTheme::MilestoneReached,
        headline: format!("{}-day streak!", streak),
        detail: "That's a milestone. Your consistency is paying off.".to_string(),
        streak_days: streak,
        milestone: Some(streak),
      });
    }

    if streak >= ONGOING_STREAK_MIN {
      return Insight::AiCoach(CoachInsight {
        theme: CoachTheme::StreakOngoing,
        headline: format!("{} days strong", streak),
        detail: "Your streak is alive. Keep the check-ins coming.".to_string(),
        streak_days: streak,
        milestone: None,
      });
    }
  }

  let week_values = recent_week_values(ctx.aggregates);
  if week_values.len() >= WEEK_MIN_RATINGS {
    let avg = week_values.iter().sum::<i64>() as f64 / week_values.len() as f64;
    if avg < ROUGH_WEEK_AVG {
      return Insight::AiCoach(CoachInsight {
        theme: CoachTheme::RoughWeek,
        headline: "This week's been a lot".to_string(),
        detail: "Rough stretches pass. A check-in or a friend ping can help.".to_string(),
        streak_days: streak,
        milestone: None,
      });
    }
    if avg >= GREAT_WEEK_AVG {
      return Insight::AiCoach(CoachInsight {
        theme: CoachTheme::GreatWeek,
        headline: "You're glowing".to_string(),
        detail: format!(
          "Averaging {:.1} this week. Whatever you're doing, it's working.",
          avg
        ),
        streak_days: streak,
        milestone: None,
      });
    }
  }

  Insight::AiCoach(CoachInsight {
    theme: CoachTheme::Encouragement,
    headline: "A little nudge".to_string(),
    detail: rotated(&ENCOURAGEMENT_MESSAGES, ctx.today).to_string(),
    streak_days: streak,
    milestone: None,
  })
}

fn pattern_slot(ctx: &InsightContext) -> Insight {
  match ctx.pattern {
    WeekdayPattern::Locked { progress } => {
      let detail = if *progress >= 1.0 {
        "Keep logging across different days of the week to unlock this.".to_string()
      } else {
        let remaining = (UNLOCK_COUNT as f64 * (1.0 - progress)).ceil() as i64;
        let unit = if remaining == 1 { "day" } else { "days" };
        format!("Log {} more {} to unlock your weekday patterns.", remaining, unit)
      };
      Insight::EmptyState(EmptyStateInsight {
        slot: InsightSlot::Pattern,
        headline: "Pattern analysis locked".to_string(),
        detail,
        progress: Some(*progress),
      })
    }
    WeekdayPattern::Ready {
      best,
      worst,
      difference,
      strength,
      ..
    } => {
      let (headline, detail) = match strength {
        PatternStrength::Strong => (
          format!("{}s are your power day", weekday_name(best.weekday)),
          format!(
            "You average {:.1} on {}s but {:.1} on {}s. Plan accordingly.",
            best.average,
            weekday_name(best.weekday),
            worst.average,
            weekday_name(worst.weekday)
          ),
        ),
        PatternStrength::Moderate => (
          format!("{}s treat you well", weekday_name(best.weekday)),
          format!(
            "A bit brighter on {}s, a bit flatter on {}s.",
            weekday_name(best.weekday),
            weekday_name(worst.weekday)
          ),
        ),
        PatternStrength::Balanced => (
          "Every day's about the same".to_string(),
          "No big swings between weekdays. Consistency looks good on you.".to_string(),
        ),
      };
      Insight::RatingPattern(RatingPatternInsight {
        headline,
        detail,
        best_weekday: best.weekday,
        worst_weekday: worst.weekday,
        difference: *difference,
        strength: *strength,
      })
    }
  }
}

fn momentum_slot(ctx: &InsightContext) -> Option<Insight> {
  match ctx.momentum {
    MomentumOutcome::NoFriends => None,
    MomentumOutcome::NotScoredYet => Some(Insight::EmptyState(EmptyStateInsight {
      slot: InsightSlot::Momentum,
      headline: "Friendship momentum".to_string(),
      detail: "Start interacting with your friends to build momentum.".to_string(),
      progress: None,
    })),
    MomentumOutcome::Ready(narrative) => Some(Insight::FriendshipMomentum(MomentumInsight {
      headline: narrative.headline.clone(),
      detail: narrative.detail.clone(),
      friend_name: narrative.friend_name.clone(),
      level: narrative.level,
      score: narrative.score,
      previous_score: narrative.previous_score,
    })),
  }
}

/// ---------------------------------------------------------------------------
/// Helpers
/// ---------------------------------------------------------------------------

/// Raw rating values across the 7 most recent aggregate days.
fn recent_week_values(aggregates: &[DayAggregate]) -> Vec<i64> {
  aggregates
    .iter()
    .rev()
    .take(WEEK_WINDOW_DAYS)
    .flat_map(|day| day.entries.iter().map(|e| e.value))
    .collect()
}

/// Rotate copy by day of year. Deterministic for a pinned clock; never
/// affects classification.
fn rotated<'a>(messages: &'a [&'a str], today: NaiveDate) -> &'a str {
  messages[today.ordinal0() as usize % messages.len()]
}

fn weekday_name(weekday: u32) -> &'static str {
  match weekday {
    1 => "Sunday",
    2 => "Monday",
    3 => "Tuesday",
    4 => "Wednesday",
    5 => "Thursday",
    6 => "Friday",
    _ => "Saturday",
  }
}

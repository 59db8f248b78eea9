//! Day-of-week pattern detection
//!
//! Ratings grouped by weekday reveal a best and worst day once enough
//! history exists. Weekday numbering is fixed at 1=Sunday .. 7=Saturday.
//! Ties resolve to the earlier weekday in that order; a weekday needs at
//! least two samples before it can compete.

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde::Serialize;

use crate::models::rating::RatingEntry;

/// Total ratings required before the pattern unlocks.
pub const UNLOCK_COUNT: usize = 10;

/// Distinct weekdays with enough samples required for a comparison.
pub const MIN_ELIGIBLE_WEEKDAYS: usize = 3;

/// Samples a weekday needs to be eligible for best/worst.
pub const MIN_SAMPLES_PER_WEEKDAY: usize = 2;

const STRONG_DIFFERENCE: f64 = 2.0;
const MODERATE_DIFFERENCE: f64 = 1.0;

/// ---------------------------------------------------------------------------
/// Weekday Pattern
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdaySummary {
  /// 1=Sunday .. 7=Saturday
  pub weekday: u32,
  pub average: f64,
  pub sample_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStrength {
  Strong,
  Moderate,
  Balanced,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WeekdayPattern {
  /// Not enough history yet; progress is the fraction of the unlock
  /// requirement reached, capped at 1.0.
  Locked { progress: f64 },
  Ready {
    best: WeekdaySummary,
    worst: WeekdaySummary,
    difference: f64,
    strength: PatternStrength,
    /// Every weekday with at least one sample, ascending weekday order.
    /// Single-sample weekdays appear here but never as best/worst.
    summaries: Vec<WeekdaySummary>,
  },
}

/// ---------------------------------------------------------------------------
/// Analysis
/// ---------------------------------------------------------------------------

pub fn analyze_weekdays(entries: &[RatingEntry], offset: FixedOffset) -> WeekdayPattern {
  let progress = (entries.len() as f64 / UNLOCK_COUNT as f64).min(1.0);
  if entries.len() < UNLOCK_COUNT {
    return WeekdayPattern::Locked { progress };
  }

  let mut sums = [0i64; 7];
  let mut counts = [0usize; 7];
  for entry in entries {
    let weekday = local_weekday(entry.recorded_at, offset);
    sums[weekday as usize - 1] += entry.value;
    counts[weekday as usize - 1] += 1;
  }

  let summaries: Vec<WeekdaySummary> = (1..=7u32)
    .filter(|&wd| counts[wd as usize - 1] > 0)
    .map(|wd| WeekdaySummary {
      weekday: wd,
      average: sums[wd as usize - 1] as f64 / counts[wd as usize - 1] as f64,
      sample_count: counts[wd as usize - 1],
    })
    .collect();

  let eligible: Vec<&WeekdaySummary> = summaries
    .iter()
    .filter(|s| s.sample_count >= MIN_SAMPLES_PER_WEEKDAY)
    .collect();

  if eligible.len() < MIN_ELIGIBLE_WEEKDAYS {
    return WeekdayPattern::Locked { progress };
  }

  // Ascending weekday order with strict comparisons keeps ties on the
  // earliest weekday.
  let mut best = eligible[0];
  let mut worst = eligible[0];
  for summary in &eligible[1..] {
    if summary.average > best.average {
      best = summary;
    }
    if summary.average < worst.average {
      worst = summary;
    }
  }

  let difference = best.average - worst.average;
  let strength = if difference >= STRONG_DIFFERENCE {
    PatternStrength::Strong
  } else if difference >= MODERATE_DIFFERENCE {
    PatternStrength::Moderate
  } else {
    PatternStrength::Balanced
  };

  WeekdayPattern::Ready {
    best: *best,
    worst: *worst,
    difference,
    strength,
    summaries,
  }
}

/// 1=Sunday .. 7=Saturday in the viewer's calendar.
fn local_weekday(at: DateTime<Utc>, offset: FixedOffset) -> u32 {
  at.with_timezone(&offset)
    .date_naive()
    .weekday()
    .number_from_sunday()
}

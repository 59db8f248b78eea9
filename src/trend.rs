//! Week-over-week trend detection
//!
//! Compares the average of the most recent ratings against the block of
//! ratings just before them and classifies the movement. Windows are
//! count-based rather than strict calendar weeks: the current window is the
//! 7 newest ratings, the previous window the up-to-4 ratings older than
//! those.

use serde::{Deserialize, Serialize};

use crate::models::rating::RatingEntry;

/// Newest ratings forming the "current" average.
pub const CURRENT_WINDOW: usize = 7;

/// Ratings older than the current window forming the comparison baseline.
pub const PREVIOUS_WINDOW: usize = 4;

/// Movement smaller than this (on the 1-10 scale) reads as steady.
const CHANGE_THRESHOLD: f64 = 0.3;

/// Relative improvement that upgrades "improving" to best-week framing.
const BEST_WEEK_PERCENT: f64 = 20.0;

/// ---------------------------------------------------------------------------
/// Trend Snapshot
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
  Improving,
  Declining,
  Steady,
}

impl TrendDirection {
  pub fn as_str(&self) -> &'static str {
    match self {
      TrendDirection::Improving => "improving",
      TrendDirection::Declining => "declining",
      TrendDirection::Steady => "steady",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSnapshot {
  pub current_average: f64,
  pub previous_average: f64,
  pub change: f64,
  pub change_percent: f64,
  pub direction: TrendDirection,
  /// Improving by a margin worth celebrating (relative change >= 20%).
  pub best_week: bool,
  /// False when there were no ratings older than the current window, in
  /// which case the baseline falls back to the current average and the
  /// trend reads steady.
  pub compared: bool,
}

/// ---------------------------------------------------------------------------
/// Analysis
/// ---------------------------------------------------------------------------

/// Classify the rating trend. Returns None with fewer than 2 total ratings;
/// callers render that as an empty state, not an error.
pub fn analyze_trend(entries: &[RatingEntry]) -> Option<TrendSnapshot> {
  if entries.len() < 2 {
    return None;
  }

  let mut sorted: Vec<&RatingEntry> = entries.iter().collect();
  sorted.sort_by_key(|e| std::cmp::Reverse(e.recorded_at));

  let current_count = sorted.len().min(CURRENT_WINDOW);
  let current_average = mean(&sorted[..current_count]);

  let previous_slice =
    &sorted[current_count..sorted.len().min(CURRENT_WINDOW + PREVIOUS_WINDOW)];
  let compared = !previous_slice.is_empty();
  let previous_average = if compared {
    mean(previous_slice)
  } else {
    current_average
  };

  let change = current_average - previous_average;
  let change_percent = change.abs() / previous_average.max(1.0) * 100.0;

  let direction = if change > CHANGE_THRESHOLD {
    TrendDirection::Improving
  } else if change < -CHANGE_THRESHOLD {
    TrendDirection::Declining
  } else {
    TrendDirection::Steady
  };

  Some(TrendSnapshot {
    current_average,
    previous_average,
    change,
    change_percent,
    direction,
    best_week: direction == TrendDirection::Improving && change_percent >= BEST_WEEK_PERCENT,
    compared,
  })
}

fn mean(entries: &[&RatingEntry]) -> f64 {
  let sum: i64 = entries.iter().map(|e| e.value).sum();
  sum as f64 / entries.len() as f64
}

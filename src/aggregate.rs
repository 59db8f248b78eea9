//! Daily aggregation of raw ratings
//!
//! Turns an unordered rating stream into one weighted average per calendar
//! day. A rating "holds" until the next rating that day (or until midnight),
//! so a late-evening entry describing the whole day outweighs a brief
//! morning one. Today is special-cased to the latest raw value, a live
//! reading rather than an average.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::models::rating::RatingEntry;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 10;

/// Floor for per-entry weights. Identical or out-of-order timestamps
/// (clock skew) would otherwise contribute zero or negative hours.
const MIN_WEIGHT_HOURS: f64 = 1.0;

/// ---------------------------------------------------------------------------
/// Day Aggregate
/// ---------------------------------------------------------------------------

/// One calendar day of ratings. `weighted_average` is None iff the day has
/// no entries; when present it stays within the 1-10 rating scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayAggregate {
  pub date: NaiveDate,
  pub weighted_average: Option<f64>,
  pub entries: Vec<RatingEntry>,
}

/// ---------------------------------------------------------------------------
/// Aggregation
/// ---------------------------------------------------------------------------

/// Bucket `entries` into the `lookback_days` calendar days ending today in
/// the viewer's local calendar. Returns one aggregate per day, oldest first.
pub fn aggregate_days(
  entries: &[RatingEntry],
  now: DateTime<Utc>,
  offset: FixedOffset,
  lookback_days: u32,
) -> Vec<DayAggregate> {
  let today = now.with_timezone(&offset).date_naive();
  let window = lookback_days.max(1) as i64;

  (0..window)
    .map(|i| {
      let date = today - Duration::days(window - 1 - i);
      let mut day_entries: Vec<RatingEntry> = entries
        .iter()
        .filter(|e| e.recorded_at.with_timezone(&offset).date_naive() == date)
        .cloned()
        .collect();
      day_entries.sort_by_key(|e| e.recorded_at);

      let weighted_average = if day_entries.is_empty() {
        None
      } else if date == today {
        // Live reading: the most recent value stands for "right now"
        day_entries.last().map(|e| e.value as f64)
      } else {
        Some(weighted_day_average(&day_entries, offset, date))
      };

      DayAggregate {
        date,
        weighted_average,
        entries: day_entries,
      }
    })
    .collect()
}

/// Time-weighted mean for a completed day. Entries must be sorted
/// ascending; each weight is the hours until the next entry (or midnight),
/// floored at one hour.
fn weighted_day_average(day_entries: &[RatingEntry], offset: FixedOffset, date: NaiveDate) -> f64 {
  let end_of_day = day_end(date);

  let mut weighted_sum = 0.0;
  let mut weight_total = 0.0;

  for (i, entry) in day_entries.iter().enumerate() {
    let local = entry.recorded_at.with_timezone(&offset).naive_local();
    let until = day_entries
      .get(i + 1)
      .map(|next| next.recorded_at.with_timezone(&offset).naive_local())
      .unwrap_or(end_of_day);

    let hours = (until - local).num_seconds() as f64 / 3600.0;
    let weight = hours.max(MIN_WEIGHT_HOURS);

    weighted_sum += entry.value as f64 * weight;
    weight_total += weight;
  }

  weighted_sum / weight_total
}

fn day_end(date: NaiveDate) -> NaiveDateTime {
  date
    .succ_opt()
    .map(|next| next.and_time(NaiveTime::MIN))
    .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::assert_approx_eq;
  use chrono::TimeZone;

  fn entry(id: &str, value: i64, ts: DateTime<Utc>) -> RatingEntry {
    RatingEntry::new(id.to_string(), value, ts).unwrap()
  }

  fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
  }

  fn utc_offset() -> FixedOffset {
    chrono::Offset::fix(&Utc)
  }

  #[test]
  fn test_window_covers_ten_days_oldest_first() {
    let now = utc(2025, 3, 15, 12, 0);
    let days = aggregate_days(&[], now, utc_offset(), DEFAULT_LOOKBACK_DAYS);

    assert_eq!(days.len(), 10);
    assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2025, 3, 6).unwrap());
    assert_eq!(days[9].date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    assert!(days.iter().all(|d| d.weighted_average.is_none()));
  }

  #[test]
  fn test_today_uses_last_value_not_average() {
    let now = utc(2025, 3, 15, 21, 0);
    let entries = vec![
      entry("a", 2, utc(2025, 3, 15, 8, 0)),
      entry("b", 9, utc(2025, 3, 15, 20, 0)),
      entry("c", 6, utc(2025, 3, 15, 14, 0)),
    ];

    let days = aggregate_days(&entries, now, utc_offset(), 10);
    let today = days.last().unwrap();

    // chronologically last is "b" at 20:00, not the input-order last
    assert_eq!(today.weighted_average, Some(9.0));
    assert_eq!(today.entries.len(), 3);
  }

  #[test]
  fn test_past_day_weights_by_hours_in_effect() {
    let now = utc(2025, 3, 16, 12, 0);
    // 08:00 value 2 holds 12h, 20:00 value 8 holds 4h until midnight
    let entries = vec![
      entry("a", 2, utc(2025, 3, 15, 8, 0)),
      entry("b", 8, utc(2025, 3, 15, 20, 0)),
    ];

    let days = aggregate_days(&entries, now, utc_offset(), 10);
    let yesterday = &days[8];

    assert_eq!(yesterday.date, NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
    let avg = yesterday.weighted_average.unwrap();
    assert_approx_eq!(avg, (2.0 * 12.0 + 8.0 * 4.0) / 16.0, 1e-9);
  }

  #[test]
  fn test_weighted_average_stays_in_rating_range() {
    let now = utc(2025, 3, 16, 12, 0);
    let entries = vec![
      entry("a", 1, utc(2025, 3, 15, 0, 30)),
      entry("b", 10, utc(2025, 3, 15, 23, 45)),
      entry("c", 5, utc(2025, 3, 15, 12, 0)),
    ];

    let days = aggregate_days(&entries, now, utc_offset(), 10);
    let avg = days[8].weighted_average.unwrap();

    assert!((1.0..=10.0).contains(&avg), "average {} out of range", avg);
  }

  #[test]
  fn test_identical_timestamps_floored_to_one_hour() {
    let now = utc(2025, 3, 16, 12, 0);
    let ts = utc(2025, 3, 15, 22, 0);
    let entries = vec![entry("a", 2, ts), entry("b", 10, ts)];

    let days = aggregate_days(&entries, now, utc_offset(), 10);
    let avg = days[8].weighted_average.unwrap();

    // first entry's gap is zero, floored to 1h; second holds 2h to midnight
    assert_approx_eq!(avg, (2.0 * 1.0 + 10.0 * 2.0) / 3.0, 1e-9);
    assert!((1.0..=10.0).contains(&avg));
  }

  #[test]
  fn test_entries_outside_window_excluded() {
    let now = utc(2025, 3, 15, 12, 0);
    let entries = vec![
      entry("old", 3, utc(2025, 3, 1, 10, 0)),
      entry("recent", 7, utc(2025, 3, 10, 10, 0)),
    ];

    let days = aggregate_days(&entries, now, utc_offset(), 10);
    let populated: Vec<&DayAggregate> =
      days.iter().filter(|d| !d.entries.is_empty()).collect();

    assert_eq!(populated.len(), 1);
    assert_eq!(populated[0].date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
  }

  #[test]
  fn test_viewer_offset_shifts_day_buckets() {
    // 01:30 UTC on Mar 10 is the evening of Mar 9 for a UTC-5 viewer
    let now = utc(2025, 3, 10, 15, 0);
    let west = FixedOffset::west_opt(5 * 3600).unwrap();
    let entries = vec![entry("a", 6, utc(2025, 3, 10, 1, 30))];

    let days = aggregate_days(&entries, now, west, 10);
    let populated = days.iter().find(|d| !d.entries.is_empty()).unwrap();

    assert_eq!(populated.date, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
  }

  #[test]
  fn test_aggregation_is_idempotent() {
    let now = utc(2025, 3, 15, 12, 0);
    let entries = vec![
      entry("a", 4, utc(2025, 3, 13, 9, 0)),
      entry("b", 8, utc(2025, 3, 13, 18, 0)),
      entry("c", 6, utc(2025, 3, 15, 10, 0)),
    ];

    let first = aggregate_days(&entries, now, utc_offset(), 10);
    let second = aggregate_days(&entries, now, utc_offset(), 10);

    assert_eq!(first, second);
  }
}

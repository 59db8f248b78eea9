//! Injected time source
//!
//! Day bucketing, "today" detection, cooldown arithmetic, and message
//! rotation all read time through this trait so tests can pin the clock
//! and behavior is reproducible across timezones.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

pub trait Clock: Send + Sync {
  fn now_utc(&self) -> DateTime<Utc>;

  /// Fixed UTC offset of the viewer's local calendar.
  fn local_offset(&self) -> FixedOffset;

  /// Today in the viewer's local calendar.
  fn today(&self) -> NaiveDate {
    self
      .now_utc()
      .with_timezone(&self.local_offset())
      .date_naive()
  }
}

/// Wall clock with a configured viewer offset (default UTC).
#[derive(Debug, Clone)]
pub struct SystemClock {
  offset: FixedOffset,
}

impl SystemClock {
  pub fn new(offset: FixedOffset) -> Self {
    Self { offset }
  }

  pub fn utc() -> Self {
    Self { offset: Utc.fix() }
  }
}

impl Default for SystemClock {
  fn default() -> Self {
    Self::utc()
  }
}

impl Clock for SystemClock {
  fn now_utc(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn local_offset(&self) -> FixedOffset {
    self.offset
  }
}

/// Clock pinned to one instant, for deterministic tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
  now: DateTime<Utc>,
  offset: FixedOffset,
}

impl FixedClock {
  pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
    Self { now, offset }
  }

  pub fn at_utc(now: DateTime<Utc>) -> Self {
    Self {
      now,
      offset: Utc.fix(),
    }
  }
}

impl Clock for FixedClock {
  fn now_utc(&self) -> DateTime<Utc> {
    self.now
  }

  fn local_offset(&self) -> FixedOffset {
    self.offset
  }
}

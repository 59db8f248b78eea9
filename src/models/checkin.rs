use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ---------------------------------------------------------------------------
/// Check-In Step: strictly ordered conversation flow
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInStep {
  Welcome,
  Acknowledgment,
  FriendNotice,
  Reflection,
  Gratitude,
  Closing,
  Complete,
}

impl std::fmt::Display for CheckInStep {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Welcome => write!(f, "welcome"),
      Self::Acknowledgment => write!(f, "acknowledgment"),
      Self::FriendNotice => write!(f, "friend_notice"),
      Self::Reflection => write!(f, "reflection"),
      Self::Gratitude => write!(f, "gratitude"),
      Self::Closing => write!(f, "closing"),
      Self::Complete => write!(f, "complete"),
    }
  }
}

impl CheckInStep {
  /// Next step in the flow. The friend-notice step only exists when the
  /// user has a best friend to loop in.
  pub fn next(self, has_best_friend: bool) -> Self {
    match self {
      Self::Welcome => Self::Acknowledgment,
      Self::Acknowledgment => {
        if has_best_friend {
          Self::FriendNotice
        } else {
          Self::Reflection
        }
      }
      Self::FriendNotice => Self::Reflection,
      Self::Reflection => Self::Gratitude,
      Self::Gratitude => Self::Closing,
      Self::Closing => Self::Complete,
      Self::Complete => Self::Complete,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Complete)
  }
}

/// ---------------------------------------------------------------------------
/// Check-In Session: ephemeral, one per accepted trigger
/// ---------------------------------------------------------------------------

/// Created by the trigger engine when a check-in starts; lives only as long
/// as the conversation. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInSession {
  pub id: String,
  pub user_id: String,
  pub started_at: DateTime<Utc>,
  pub current_step: CheckInStep,
  pub has_best_friend: bool,
  pub best_friend_name: Option<String>,
  pub notify_friend: bool,
  pub reflection_response: Option<String>,
  pub gratitude_response: Option<String>,
}

impl CheckInSession {
  pub fn new(
    user_id: String,
    started_at: DateTime<Utc>,
    has_best_friend: bool,
    best_friend_name: Option<String>,
  ) -> Self {
    Self {
      id: format!("checkin-{}-{}", user_id, started_at.timestamp_millis()),
      user_id,
      started_at,
      current_step: CheckInStep::Welcome,
      has_best_friend,
      best_friend_name,
      notify_friend: false,
      reflection_response: None,
      gratitude_response: None,
    }
  }

  /// Advance to the next step, skipping friend-notice for users without a
  /// best friend.
  pub fn advance(&mut self) -> CheckInStep {
    self.current_step = self.current_step.next(self.has_best_friend);
    self.current_step
  }

  pub fn record_reflection(&mut self, response: String) {
    self.reflection_response = Some(response);
  }

  pub fn record_gratitude(&mut self, response: String) {
    self.gratitude_response = Some(response);
  }

  pub fn set_notify_friend(&mut self, notify: bool) {
    self.notify_friend = notify;
  }

  pub fn is_complete(&self) -> bool {
    self.current_step.is_terminal()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session(has_best_friend: bool) -> CheckInSession {
    CheckInSession::new(
      "user-1".to_string(),
      Utc::now(),
      has_best_friend,
      has_best_friend.then(|| "Sam".to_string()),
    )
  }

  #[test]
  fn test_steps_in_order_with_best_friend() {
    let mut s = session(true);
    assert_eq!(s.current_step, CheckInStep::Welcome);
    assert_eq!(s.advance(), CheckInStep::Acknowledgment);
    assert_eq!(s.advance(), CheckInStep::FriendNotice);
    assert_eq!(s.advance(), CheckInStep::Reflection);
    assert_eq!(s.advance(), CheckInStep::Gratitude);
    assert_eq!(s.advance(), CheckInStep::Closing);
    assert_eq!(s.advance(), CheckInStep::Complete);
    assert!(s.is_complete());
  }

  #[test]
  fn test_friend_notice_skipped_without_best_friend() {
    let mut s = session(false);
    s.advance(); // acknowledgment
    assert_eq!(s.advance(), CheckInStep::Reflection);
  }

  #[test]
  fn test_complete_is_absorbing() {
    let mut s = session(false);
    for _ in 0..10 {
      s.advance();
    }
    assert_eq!(s.current_step, CheckInStep::Complete);
  }

  #[test]
  fn test_responses_recorded_on_session() {
    let mut s = session(true);
    s.record_reflection("long day at work".to_string());
    s.record_gratitude("my dog".to_string());
    s.set_notify_friend(true);
    assert_eq!(s.reflection_response.as_deref(), Some("long day at work"));
    assert_eq!(s.gratitude_response.as_deref(), Some("my dog"));
    assert!(s.notify_friend);
  }
}

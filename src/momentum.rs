//! Friendship momentum narrative
//!
//! Picks the user's top-scored friend and turns the backend-computed
//! friendship score into a short narrative. Scores are consumed as-is;
//! nothing here feeds back into scoring.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::friendship::{Friend, FriendshipLevel, FriendshipScore};

/// Score at which the backend promotes a friendship to best-friend level.
/// Used only to phrase the "points to go" message for close friends.
pub const BEST_FRIEND_THRESHOLD: i64 = 150;

/// ---------------------------------------------------------------------------
/// Momentum Outcome
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumNarrative {
  pub friend_id: String,
  pub friend_name: String,
  pub level: FriendshipLevel,
  pub score: i64,
  /// Rough last-week score estimate for the momentum visual only; no
  /// decision logic reads it.
  pub previous_score: i64,
  pub headline: String,
  pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MomentumOutcome {
  /// No friends at all: the feed omits the momentum slot entirely.
  NoFriends,
  /// Friends exist but none are scored yet: rendered as a "start
  /// interacting" empty state, distinct from having no friends.
  NotScoredYet,
  Ready(MomentumNarrative),
}

/// ---------------------------------------------------------------------------
/// Analysis
/// ---------------------------------------------------------------------------

/// Build the momentum narrative from the friend list and the sparse
/// friend-id to score map. Scores for ids outside the friend list are
/// ignored. Equal top scores resolve to the lexically smallest friend id
/// so the pick is stable across runs.
pub fn friendship_momentum(
  friends: &[Friend],
  scores: &HashMap<String, FriendshipScore>,
) -> MomentumOutcome {
  if friends.is_empty() {
    return MomentumOutcome::NoFriends;
  }

  let mut top: Option<(&Friend, &FriendshipScore)> = None;
  for friend in friends {
    let score = match scores.get(&friend.id) {
      Some(s) => s,
      None => continue,
    };
    top = match top {
      None => Some((friend, score)),
      Some((best_friend, best_score)) => {
        if score.score > best_score.score
          || (score.score == best_score.score && friend.id < best_friend.id)
        {
          Some((friend, score))
        } else {
          Some((best_friend, best_score))
        }
      }
    };
  }

  let (friend, score) = match top {
    Some(pair) => pair,
    None => return MomentumOutcome::NotScoredYet,
  };

  let weekly_pace = score.total_interactions / score.friendship_weeks.max(1);
  let previous_score = (score.score - weekly_pace).max(0);
  let (headline, detail) = narrative(friend, score);

  MomentumOutcome::Ready(MomentumNarrative {
    friend_id: friend.id.clone(),
    friend_name: friend.display_name.clone(),
    level: score.level,
    score: score.score,
    previous_score,
    headline,
    detail,
  })
}

fn narrative(friend: &Friend, score: &FriendshipScore) -> (String, String) {
  let name = friend.display_name.as_str();
  match score.level {
    FriendshipLevel::BestFriend => (
      format!("{} is your #1", name),
      format!(
        "Best friends, {} interactions and counting. Keep it rolling!",
        score.total_interactions
      ),
    ),
    FriendshipLevel::CloseFriend => {
      let remaining = (BEST_FRIEND_THRESHOLD - score.score).max(0);
      (
        format!("Almost best friends with {}", name),
        format!("{} points to go until best-friend status.", remaining),
      )
    }
    FriendshipLevel::Friend => (
      format!("You and {} are on a roll", name),
      "Solid friendship. A few more vibes keep the momentum going.".to_string(),
    ),
    FriendshipLevel::Acquaintance => (
      format!("Getting to know {}", name),
      "Say hi more often to level this friendship up.".to_string(),
    ),
    FriendshipLevel::NewFriend => (
      format!("{} just joined your circle", name),
      "Send a vibe to get things rolling.".to_string(),
    ),
  }
}

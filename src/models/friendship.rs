use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Friend {
  pub id: String,
  pub display_name: String,
  pub avatar_url: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Friendship Level: ordered closeness tiers assigned by the backend scorer
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipLevel {
  NewFriend,
  Acquaintance,
  Friend,
  CloseFriend,
  BestFriend,
}

impl std::fmt::Display for FriendshipLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NewFriend => write!(f, "new_friend"),
      Self::Acquaintance => write!(f, "acquaintance"),
      Self::Friend => write!(f, "friend"),
      Self::CloseFriend => write!(f, "close_friend"),
      Self::BestFriend => write!(f, "best_friend"),
    }
  }
}

impl std::str::FromStr for FriendshipLevel {
  type Err = String;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "new_friend" => Ok(Self::NewFriend),
      "acquaintance" => Ok(Self::Acquaintance),
      "friend" => Ok(Self::Friend),
      "close_friend" => Ok(Self::CloseFriend),
      "best_friend" => Ok(Self::BestFriend),
      _ => Err(format!("Unknown friendship level: {}", s)),
    }
  }
}

/// Interaction-based closeness measure, computed by the backend from chat
/// and interaction logs. This core only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendshipScore {
  pub friend_id: String,
  pub score: i64,
  pub level: FriendshipLevel,
  pub total_interactions: i64,
  pub friendship_weeks: i64,
  pub updated_at: DateTime<Utc>,
}

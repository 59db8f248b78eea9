pub mod rating;
pub mod friendship;
pub mod checkin;

pub use rating::RatingEntry;
pub use friendship::{Friend, FriendshipLevel, FriendshipScore};
pub use checkin::{CheckInSession, CheckInStep};

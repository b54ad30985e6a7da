//! Transcript data models

mod notice;
mod rating;
mod turn;

pub use notice::Notice;
pub use rating::{Rating, RatingAnnotation};
pub use turn::{Bubble, ChatTurn, Role, TurnId};

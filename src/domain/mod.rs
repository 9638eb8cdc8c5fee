//! Domain layer: the game event and its routing classification.

pub mod game_event;

pub use game_event::{EventKind, GameEvent};

//! The game event flowing from the queue into storage.
//!
//! A [`GameEvent`] is decoded once from a queue payload and never mutated
//! afterwards; its fields are private and exposed through accessors.
//! Routing goes through [`EventKind`], a closed variant with an explicit
//! [`EventKind::Unrecognized`] arm, instead of comparing strings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DecodeError;

/// `event_type` value of an appended move.
pub const MOVE_EVENT: &str = "move";

/// `event_type` value that wipes a game's history.
pub const DELETE_EVENT: &str = "delete";

/// How the sink treats an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Append the event as a new row.
    Move,
    /// Remove every stored row of the game.
    Delete,
    /// Any other `event_type`; dropped without touching storage.
    Unrecognized,
}

impl EventKind {
    /// Classifies a raw `event_type` string. Matching is exact.
    #[must_use]
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            MOVE_EVENT => Self::Move,
            DELETE_EVENT => Self::Delete,
            _ => Self::Unrecognized,
        }
    }
}

/// One chess game event, as produced upstream and as stored.
///
/// Serialized with the producer's field names (`game_id`, `event_type`,
/// `fen`, `move_from`, `move_to`, `timestamp`). Has no identity beyond the
/// storage row id, so duplicate deliveries become duplicate rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GameEvent {
    /// Opaque game identifier, never empty.
    game_id: String,
    /// Event discriminator (`"move"`, `"delete"`, or anything else).
    event_type: String,
    /// Board position after the move, in FEN.
    #[serde(default)]
    fen: Option<String>,
    /// Origin square of the move.
    #[serde(default)]
    move_from: Option<String>,
    /// Destination square of the move.
    #[serde(default)]
    move_to: Option<String>,
    /// Producer-assigned timestamp; not validated or reordered.
    timestamp: i64,
}

impl GameEvent {
    /// Builds a move event.
    #[must_use]
    pub fn new_move(
        game_id: impl Into<String>,
        fen: impl Into<String>,
        move_from: impl Into<String>,
        move_to: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            event_type: MOVE_EVENT.to_string(),
            fen: Some(fen.into()),
            move_from: Some(move_from.into()),
            move_to: Some(move_to.into()),
            timestamp,
        }
    }

    /// Builds a delete event for a whole game.
    #[must_use]
    pub fn new_delete(game_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            game_id: game_id.into(),
            event_type: DELETE_EVENT.to_string(),
            fen: None,
            move_from: None,
            move_to: None,
            timestamp,
        }
    }

    /// Reassembles an event from stored column values.
    #[must_use]
    pub fn from_parts(
        game_id: String,
        event_type: String,
        fen: Option<String>,
        move_from: Option<String>,
        move_to: Option<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            game_id,
            event_type,
            fen,
            move_from,
            move_to,
            timestamp,
        }
    }

    /// Decodes a queue payload.
    ///
    /// Unknown JSON fields are ignored; `fen`, `move_from` and `move_to`
    /// may be absent or `null`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Malformed`] for invalid JSON or missing
    /// required fields and [`DecodeError::EmptyGameId`] when `game_id` is
    /// blank.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let event: Self = serde_json::from_slice(payload)?;
        if event.game_id.trim().is_empty() {
            return Err(DecodeError::EmptyGameId);
        }
        Ok(event)
    }

    /// Routing class of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        EventKind::classify(&self.event_type)
    }

    /// Game identifier.
    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Raw `event_type` as received.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Board position, if any.
    #[must_use]
    pub fn fen(&self) -> Option<&str> {
        self.fen.as_deref()
    }

    /// Origin square, if any.
    #[must_use]
    pub fn move_from(&self) -> Option<&str> {
        self.move_from.as_deref()
    }

    /// Destination square, if any.
    #[must_use]
    pub fn move_to(&self) -> Option<&str> {
        self.move_to.as_deref()
    }

    /// Producer timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

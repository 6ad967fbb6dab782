//! Render boundary consumed by an external UI layer.
//!
//! The controller never touches a widget tree; it emits [`RenderFrame`]
//! descriptors and [`Notice`] alerts, and the UI projects them however it
//! likes.

use crate::model::{GameId, GameSummary};
use crate::protocol::{Action, ApiError};
use derive_getters::Getters;
use derive_new::new;

/// Classification of one board cell for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellView {
    /// Empty and, when it is the local player's turn, playable.
    Open,
    /// Occupied by the given player.
    Filled(u32),
    /// Occupied by the given player and part of a winning line.
    Winning(u32),
}

/// One player slot in the game header.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct PlayerSlot {
    /// Player name, or `None` for an open slot.
    name: Option<String>,
    /// Whether it is this player's turn.
    is_current: bool,
    /// Whether this slot is the local player.
    is_you: bool,
}

/// Everything the UI needs to draw the game screen.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct GameView {
    /// Human-readable summary of the game state.
    status_line: String,
    /// Player slots, in player-number order.
    players: Vec<PlayerSlot>,
    /// Cell classifications, indexed `[x][y]`.
    cells: Vec<Vec<CellView>>,
    /// Whether the join action is enabled.
    can_join: bool,
    /// Whether the leave action is enabled.
    can_leave: bool,
    /// Whether adding a computer player is enabled.
    can_add_cpu: bool,
    /// Whether the local player may place a stone right now.
    can_move: bool,
}

/// A state update pushed to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderFrame {
    /// Lobby listing.
    Lobby {
        /// Games relevant to the local player.
        games: Vec<GameSummary>,
    },
    /// A game screen is active but no snapshot has arrived yet.
    Loading,
    /// Full game screen.
    Game(GameView),
    /// The local player's profile was fetched or updated.
    Profile(crate::model::PlayerProfile),
}

/// A user-visible alert.
///
/// Notices are terminal for the call that produced them; nothing is retried
/// once a notice has been raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The transport failed repeatedly and the call was abandoned.
    TransportFailure {
        /// Action that could not be delivered.
        action: Action,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The service reported an error no caller was prepared to handle.
    ApplicationError {
        /// Action that failed.
        action: Action,
        /// Error type and message as reported by the service.
        error: ApiError,
    },
    /// The service replied with a status this client does not understand.
    UnknownStatus {
        /// Action that produced the reply.
        action: Action,
        /// The unrecognized status value.
        status: String,
    },
    /// A success payload did not match the expected shape.
    MalformedResponse {
        /// Action that produced the payload.
        action: Action,
        /// Decoder diagnostic.
        detail: String,
    },
    /// Leaving the game needs an explicit confirmation first.
    ConfirmLeave {
        /// The game that would be abandoned.
        game: GameId,
    },
}

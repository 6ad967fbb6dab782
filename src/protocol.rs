//! Wire protocol for the remote game service.
//!
//! Every request is a named action plus a flat parameter mapping; every
//! response is a JSON envelope of the form `{status, response}`.

use derive_more::{Display, Error};
use serde::Deserialize;
use serde_json::Value;

/// Remote actions exposed by the game service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Adds a computer-controlled player to a game.
    AddCpuPlayer,
    /// Changes the local player's nickname.
    ChangeNickname,
    /// Creates a new game for the given rule set.
    CreateGame,
    /// Creates a new rule set.
    CreateRuleSet,
    /// Creates a game played entirely by computer players.
    CpuBattle,
    /// Fetches the status of a single game.
    GetGameStatus,
    /// Lists games relevant to the local player.
    GetGames,
    /// Fetches the local player's profile.
    GetPlayerInfo,
    /// Fetches the rule-set catalog.
    GetRuleSets,
    /// Joins an existing game.
    JoinGame,
    /// Leaves a game.
    LeaveGame,
    /// Places a stone at grid coordinates.
    PutTile,
}

impl Action {
    /// Returns the action name as it appears on the wire.
    pub fn wire_name(self) -> &'static str {
        self.into()
    }
}

/// Flat parameter mapping sent with a request, in insertion order.
///
/// Each value is JSON-encoded individually by the transport; the server
/// decodes parameters one by one.
pub type Params = Vec<(&'static str, Value)>;

/// Status field of a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResponseStatus {
    /// The call succeeded; `response` holds the payload.
    Success,
    /// The call failed; `response` holds the error type and message.
    Error,
    /// Action introspection listing. Never expected by this client.
    List,
    /// Any status value this client does not recognize.
    Unknown,
}

impl<'de> Deserialize<'de> for ResponseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Unrecognized statuses must decode, not fail: the gateway turns
        // them into a protocol-violation notice.
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "list" => Self::List,
            _ => Self::Unknown,
        })
    }
}

/// Response envelope returned by the game service.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Outcome classification for the call.
    pub status: ResponseStatus,
    /// Payload; shape depends on the action and status.
    #[serde(default)]
    pub response: Value,
}

impl Envelope {
    /// Builds a success envelope. Handy for scripted transports in tests.
    pub fn success(response: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            response,
        }
    }

    /// Builds an error envelope carrying the given error type and message.
    pub fn error(kind: &str, message: &str) -> Self {
        Self {
            status: ResponseStatus::Error,
            response: serde_json::json!({ "type": kind, "message": message }),
        }
    }
}

/// Application-level error reported by the game service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Display, Error)]
#[display("{kind}: {message}")]
pub struct ApiError {
    /// Server-side error class, e.g. `MoveError` or `ValueError`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ApiError {
    /// Decodes an error payload, falling back to a generic error when the
    /// payload does not match the documented `{type, message}` shape.
    pub fn from_payload(payload: Value) -> Self {
        serde_json::from_value(payload.clone()).unwrap_or_else(|_| Self {
            kind: "UnknownError".to_string(),
            message: payload.to_string(),
        })
    }
}

//! Domain types mirrored from the game service payloads.

use derive_getters::Getters;
use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Identifier of a game on the remote service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
pub struct GameId(pub i64);

/// Identifier of a rule set on the remote service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
pub struct RuleSetId(pub i64);

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    /// Waiting for enough players to join.
    Waiting,
    /// In play.
    Playing,
    /// Abandoned before completion.
    Aborted,
    /// Finished with a full board and no winner.
    Draw,
    /// Finished with a winner.
    Win,
}

impl LifecycleState {
    /// True for terminal states. A finished game never transitions again.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Aborted | Self::Draw | Self::Win)
    }
}

/// Filter for the games listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ListMode {
    /// Games the player is in or can join.
    Play,
    /// Games other players are playing.
    View,
    /// Recently finished games the player took part in.
    Past,
}

/// Immutable parameters of an m,n,k,p,q game variant.
///
/// Fetched once per session and cached by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, new)]
pub struct RuleSet {
    /// Rule-set identifier.
    id: RuleSetId,
    /// Display name.
    name: String,
    /// Number of players (2..=9).
    num_players: u32,
    /// Whether a win requires exactly `k` in a row rather than `k` or more.
    exact: bool,
    /// Board width.
    m: usize,
    /// Board height.
    n: usize,
    /// Consecutive stones needed to win.
    k: usize,
    /// Stones placed per turn after the first.
    p: u32,
    /// Stones placed on the opening turn.
    q: u32,
    /// Number of games played under this rule set.
    #[serde(default)]
    #[new(default)]
    num_games: u32,
}

impl RuleSet {
    /// Determines whose turn it is for a zero-based turn index.
    ///
    /// Player 1 places the first `q` stones; after that each player places
    /// `p` stones per turn in rotation.
    pub fn whose_turn(&self, turn: i64) -> u32 {
        if turn < i64::from(self.q) {
            return 1;
        }
        let rotation = (turn - i64::from(self.q)) / i64::from(self.p) + 1;
        (rotation % i64::from(self.num_players) + 1) as u32
    }
}

/// Session-scoped cache of rule sets, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct RuleSetCache {
    sets: HashMap<RuleSetId, RuleSet>,
}

impl RuleSetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache contents with a freshly fetched catalog.
    pub fn fill(&mut self, sets: Vec<RuleSet>) {
        self.sets = sets.into_iter().map(|rs| (*rs.id(), rs)).collect();
    }

    /// Looks up a rule set by id.
    pub fn get(&self, id: RuleSetId) -> Option<&RuleSet> {
        self.sets.get(&id)
    }

    /// True once a catalog has been stored.
    pub fn is_filled(&self) -> bool {
        !self.sets.is_empty()
    }
}

/// Board grid, indexed `[x][y]` with `x` in `0..m` and `y` in `0..n`.
///
/// A cell value of 0 means empty; otherwise it is the 1-based number of the
/// player occupying the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    columns: Vec<Vec<u8>>,
}

impl Board {
    /// Creates an empty board of the given dimensions.
    pub fn empty(m: usize, n: usize) -> Self {
        Self {
            columns: vec![vec![0; n]; m],
        }
    }

    /// Board width.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Board height.
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Returns the cell value at `(x, y)`, or `None` when out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        self.columns.get(x).and_then(|col| col.get(y)).copied()
    }

    /// Sets the cell value at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if let Some(cell) = self.columns.get_mut(x).and_then(|col| col.get_mut(y)) {
            *cell = value;
        }
    }

    /// Checks that the grid is rectangular and matches the rule set's
    /// dimensions, and that every non-empty cell names a valid player.
    pub fn conforms_to(&self, rules: &RuleSet) -> bool {
        if self.width() != *rules.m() {
            return false;
        }
        let n = *rules.n();
        let max_player = *rules.num_players() as u8;
        self.columns
            .iter()
            .all(|col| col.len() == n && col.iter().all(|&v| v <= max_player))
    }
}

/// Full state of one game as fetched from the service.
///
/// Snapshots are replaced wholesale; there is no partial mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameSnapshot {
    /// Names of joined players; slot index = player number − 1.
    players: Vec<String>,
    /// Current board contents.
    board: Board,
    /// The local player's 1-based player number, or 0 when spectating.
    playing_as: u32,
    /// The 1-based number of the player whose turn it is.
    current_player: u32,
    /// Lifecycle state.
    state: LifecycleState,
    /// Monotonically increasing turn counter (−1 while waiting).
    turn: i64,
    /// Rule set the game is played under.
    rule_set_id: RuleSetId,
}

impl GameSnapshot {
    /// The winning player for a won game: the player who placed the last
    /// stone. `None` unless `state` is [`LifecycleState::Win`].
    pub fn winner(&self, rules: &RuleSet) -> Option<u32> {
        if self.state != LifecycleState::Win {
            return None;
        }
        // The turn counter was advanced once after the winning placement.
        Some(rules.whose_turn(self.turn - 1))
    }
}

/// Reply to a status fetch: either a fresh snapshot, or a signal that the
/// game has not advanced past the turn the client already knows.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReply {
    /// The game is still at the turn supplied with the request.
    Unchanged,
    /// A fresh snapshot.
    Snapshot(GameSnapshot),
}

impl<'de> Deserialize<'de> for StatusReply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The service returns literal `false` for an unchanged game.
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Bool(false) => Ok(Self::Unchanged),
            other => GameSnapshot::deserialize(other)
                .map(Self::Snapshot)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// One entry in the games listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct GameSummary {
    /// Game identifier.
    id: GameId,
    /// Names of joined players.
    players: Vec<String>,
    /// The 1-based number of the player whose turn it is.
    current_player: u32,
    /// The local player's player number, or 0.
    playing_as: u32,
    /// Rule set the game is played under.
    rule_set_id: RuleSetId,
    /// Lifecycle state.
    state: LifecycleState,
}

/// The local player's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct PlayerProfile {
    /// Display nickname.
    nickname: String,
    /// Whether the player is browsing anonymously.
    anonymous: bool,
    /// Login URL for anonymous players, logout URL otherwise.
    log_url: String,
    /// Lifetime win count.
    #[serde(default)]
    wins: u32,
    /// Lifetime loss count.
    #[serde(default)]
    losses: u32,
    /// Lifetime draw count.
    #[serde(default)]
    draws: u32,
}

/// Logs and rejects a snapshot whose turn counter moved backwards.
///
/// The service guarantees `turn` is non-decreasing for a given game; a
/// violation means the reply is stale and must not replace newer state.
pub fn turn_regressed(known: Option<i64>, incoming: i64) -> bool {
    match known {
        Some(known) if incoming < known => {
            warn!(known, incoming, "Turn counter regressed; rejecting snapshot");
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tic_tac_toe() -> RuleSet {
        RuleSet::new(RuleSetId(1), "Tic-tac-toe".to_string(), 2, false, 3, 3, 3, 1, 1)
    }

    #[test]
    fn whose_turn_alternates_for_two_players() {
        let rules = tic_tac_toe();
        assert_eq!(rules.whose_turn(0), 1);
        assert_eq!(rules.whose_turn(1), 2);
        assert_eq!(rules.whose_turn(2), 1);
        assert_eq!(rules.whose_turn(3), 2);
    }

    #[test]
    fn whose_turn_honors_opening_and_per_turn_counts() {
        // Connect6: q = 1 opening stone, then p = 2 stones per turn.
        let connect6 =
            RuleSet::new(RuleSetId(2), "Connect6".to_string(), 2, false, 19, 19, 6, 2, 1);
        let schedule: Vec<u32> = (0..7).map(|t| connect6.whose_turn(t)).collect();
        assert_eq!(schedule, vec![1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn board_decodes_column_major_grid() {
        let board: Board = serde_json::from_str("[[1,0,0],[0,2,0],[0,0,1]]").unwrap();
        assert_eq!(board.width(), 3);
        assert_eq!(board.height(), 3);
        assert_eq!(board.get(0, 0), Some(1));
        assert_eq!(board.get(1, 1), Some(2));
        assert_eq!(board.get(3, 0), None);
    }

    #[test]
    fn board_conformance_checks_dimensions_and_values() {
        let rules = tic_tac_toe();
        let mut board = Board::empty(3, 3);
        assert!(board.conforms_to(&rules));
        board.set(0, 0, 2);
        assert!(board.conforms_to(&rules));
        board.set(1, 1, 3); // no player 3 in a two-player rule set
        assert!(!board.conforms_to(&rules));
        assert!(!Board::empty(3, 4).conforms_to(&rules));
    }

    #[test]
    fn status_reply_decodes_unchanged_signal() {
        let reply: StatusReply = serde_json::from_str("false").unwrap();
        assert_eq!(reply, StatusReply::Unchanged);
    }

    #[test]
    fn status_reply_decodes_snapshot() {
        let raw = serde_json::json!({
            "players": ["alice", "bob"],
            "board": [[1, 0, 0], [0, 2, 0], [0, 0, 0]],
            "playing_as": 1,
            "current_player": 1,
            "state": "playing",
            "turn": 2,
            "rule_set_id": 1
        });
        let reply: StatusReply = serde_json::from_value(raw).unwrap();
        let StatusReply::Snapshot(snapshot) = reply else {
            panic!("expected a snapshot");
        };
        assert_eq!(*snapshot.state(), LifecycleState::Playing);
        assert_eq!(*snapshot.turn(), 2);
    }

    #[test]
    fn winner_is_the_last_mover() {
        let rules = tic_tac_toe();
        let snapshot = GameSnapshot {
            players: vec!["alice".to_string(), "bob".to_string()],
            board: Board::empty(3, 3),
            playing_as: 1,
            current_player: 0,
            state: LifecycleState::Win,
            // Turn 4 was player 1's move; the counter then advanced to 5.
            turn: 5,
            rule_set_id: RuleSetId(1),
        };
        assert_eq!(snapshot.winner(&rules), Some(1));
    }

    #[test]
    fn turn_regression_is_detected() {
        assert!(turn_regressed(Some(5), 4));
        assert!(!turn_regressed(Some(5), 5));
        assert!(!turn_regressed(None, 0));
    }
}

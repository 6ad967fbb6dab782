//! Client-side state machine and render projection.
//!
//! [`ClientState`] owns everything the controller knows: the active mode,
//! the current game snapshot, and the session rule-set cache. It is pure —
//! no timers, no I/O — so every transition and projection is directly
//! testable. The async shell around it lives in [`crate::controller`].

use crate::model::{
    GameId, GameSnapshot, LifecycleState, RuleSet, RuleSetCache, RuleSetId, turn_regressed,
};
use crate::render::{CellView, GameView, PlayerSlot, RenderFrame};
use crate::win::winning_cells;
use derive_getters::Getters;
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Poll delay while listing games in the lobby.
pub const LOBBY_POLL: Duration = Duration::from_secs(5);
/// Poll delay while a game screen is open but no snapshot has arrived.
pub const GAME_LOADING_POLL: Duration = Duration::from_millis(2500);
/// Poll delay for a game still waiting for players.
pub const WAITING_POLL: Duration = Duration::from_secs(5);
/// Poll delay for a game in active play.
pub const PLAYING_POLL: Duration = Duration::from_secs(2);

/// Top-level client mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Mode {
    /// Browsing the games listing.
    Lobby,
    /// Following a single game.
    Game,
}

/// The controller's mutable state.
#[derive(Debug, Getters)]
pub struct ClientState {
    /// Active mode.
    mode: Mode,
    /// Identifier of the game being followed, in [`Mode::Game`] only.
    game_id: Option<GameId>,
    /// Last-known turn counter for the followed game.
    turn: Option<i64>,
    /// Last applied snapshot.
    snapshot: Option<GameSnapshot>,
    /// Session rule-set cache.
    rule_sets: RuleSetCache,
    /// Bumped on every mode transition; snapshots captured under an older
    /// generation are stale and must not be applied.
    generation: u64,
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientState {
    /// Creates a fresh state in lobby mode.
    pub fn new() -> Self {
        Self {
            mode: Mode::Lobby,
            game_id: None,
            turn: None,
            snapshot: None,
            rule_sets: RuleSetCache::new(),
            generation: 0,
        }
    }

    /// Switches to lobby mode, releasing all per-game state.
    #[instrument(skip(self))]
    pub fn enter_lobby(&mut self) {
        info!("Entering lobby");
        self.mode = Mode::Lobby;
        self.game_id = None;
        self.turn = None;
        self.snapshot = None;
        self.generation += 1;
    }

    /// Switches to game mode for the given game.
    ///
    /// Clears any cached snapshot so the next status reply rebuilds the
    /// board from scratch.
    #[instrument(skip(self), fields(game = %game))]
    pub fn enter_game(&mut self, game: GameId) {
        info!("Entering game");
        self.mode = Mode::Game;
        self.game_id = Some(game);
        self.turn = None;
        self.snapshot = None;
        self.generation += 1;
    }

    /// Stores the rule-set catalog for the rest of the session.
    pub fn cache_rule_sets(&mut self, sets: Vec<RuleSet>) {
        debug!(count = sets.len(), "Caching rule sets");
        self.rule_sets.fill(sets);
    }

    /// Looks up a cached rule set.
    pub fn rule_set(&self, id: RuleSetId) -> Option<&RuleSet> {
        self.rule_sets.get(id)
    }

    /// Applies a freshly fetched snapshot, replacing the previous one
    /// wholesale. Returns whether the snapshot was accepted.
    ///
    /// Rejects snapshots that were requested under an older generation
    /// (mode changed while the call was in flight), whose turn counter
    /// moved backwards, or whose board does not match the rule set.
    #[instrument(skip(self, snapshot), fields(turn = *snapshot.turn(), state = %snapshot.state()))]
    pub fn apply_snapshot(&mut self, generation: u64, snapshot: GameSnapshot) -> bool {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                "Dropping snapshot from a previous mode"
            );
            return false;
        }
        if self.mode != Mode::Game {
            debug!("Not in game mode; ignoring snapshot");
            return false;
        }
        if turn_regressed(self.turn, *snapshot.turn()) {
            return false;
        }
        if let Some(rules) = self.rule_sets.get(*snapshot.rule_set_id())
            && !snapshot.board().conforms_to(rules)
        {
            warn!(
                rule_set = %rules.id(),
                "Board does not match rule-set dimensions; rejecting snapshot"
            );
            return false;
        }

        self.turn = Some(*snapshot.turn());
        self.snapshot = Some(snapshot);
        true
    }

    /// Delay before the next poll, or `None` when polling should stop.
    ///
    /// Active play refreshes near-real-time; waiting and lobby screens are
    /// lazier; finished games are never polled again.
    pub fn poll_delay(&self) -> Option<Duration> {
        match self.mode {
            Mode::Lobby => Some(LOBBY_POLL),
            Mode::Game => match &self.snapshot {
                None => Some(GAME_LOADING_POLL),
                Some(snapshot) => match snapshot.state() {
                    LifecycleState::Waiting => Some(WAITING_POLL),
                    LifecycleState::Playing => Some(PLAYING_POLL),
                    LifecycleState::Aborted | LifecycleState::Draw | LifecycleState::Win => None,
                },
            },
        }
    }

    /// Projects the current game state into a render frame.
    ///
    /// Pure: the same state always projects to the same frame.
    pub fn render_game(&self) -> RenderFrame {
        match &self.snapshot {
            None => RenderFrame::Loading,
            Some(snapshot) => RenderFrame::Game(self.project(snapshot)),
        }
    }

    fn project(&self, snapshot: &GameSnapshot) -> GameView {
        let rules = self.rule_sets.get(*snapshot.rule_set_id());
        let players = snapshot.players();
        let playing_as = *snapshot.playing_as();
        let current = *snapshot.current_player();
        let state = *snapshot.state();

        let winner = match (state, rules) {
            (LifecycleState::Win, Some(rules)) => snapshot.winner(rules),
            (LifecycleState::Win, None) => {
                warn!("Rule set not cached; cannot highlight the winning line");
                None
            }
            _ => None,
        };
        let winning = match (winner, rules) {
            (Some(winner), Some(rules)) => winning_cells(snapshot.board(), rules, winner),
            _ => Default::default(),
        };

        let board = snapshot.board();
        let cells = (0..board.width())
            .map(|x| {
                (0..board.height())
                    .map(|y| match board.get(x, y).unwrap_or(0) {
                        0 => CellView::Open,
                        v if winning.contains(&(x, y)) => CellView::Winning(u32::from(v)),
                        v => CellView::Filled(u32::from(v)),
                    })
                    .collect()
            })
            .collect();

        let slot_count = rules
            .map(|r| *r.num_players() as usize)
            .unwrap_or(players.len());
        let slots = (0..slot_count)
            .map(|i| {
                let number = (i + 1) as u32;
                PlayerSlot::new(
                    players.get(i).cloned(),
                    state == LifecycleState::Playing && number == current,
                    playing_as != 0 && number == playing_as,
                )
            })
            .collect();

        let has_open_slot = players.len() < slot_count || rules.is_none();
        let waiting = state == LifecycleState::Waiting;

        GameView::new(
            status_line(snapshot, winner),
            slots,
            cells,
            waiting && playing_as == 0 && has_open_slot,
            playing_as != 0 && !state.is_finished(),
            waiting && playing_as != 0,
            state == LifecycleState::Playing && playing_as != 0 && playing_as == current,
        )
    }
}

/// Human-readable one-line summary of a snapshot.
fn status_line(snapshot: &GameSnapshot, winner: Option<u32>) -> String {
    let name_of = |number: u32| -> String {
        snapshot
            .players()
            .get(number.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_else(|| format!("player {number}"))
    };

    match snapshot.state() {
        LifecycleState::Waiting => {
            format!("Waiting for players ({} joined)...", snapshot.players().len())
        }
        LifecycleState::Playing => {
            let current = *snapshot.current_player();
            if current != 0 && current == *snapshot.playing_as() {
                "Your turn.".to_string()
            } else {
                format!("Waiting for {}...", name_of(current))
            }
        }
        LifecycleState::Win => match winner {
            Some(w) if w == *snapshot.playing_as() && w != 0 => "You win!".to_string(),
            Some(w) => format!("{} wins!", name_of(w)),
            None => "The game has been won.".to_string(),
        },
        LifecycleState::Draw => "The game ended in a draw.".to_string(),
        LifecycleState::Aborted => "The game was aborted.".to_string(),
    }
}

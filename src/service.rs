//! Typed operations on the game service.
//!
//! Each method maps its arguments onto a gateway call and decodes the
//! success payload; no further logic lives here. Methods enqueue the call
//! synchronously, so the order methods are invoked in is the order the
//! gateway dispatches them, even when the returned futures are awaited
//! later.

use crate::gateway::{CallError, GatewayHandle};
use crate::model::{
    GameId, GameSnapshot, GameSummary, ListMode, PlayerProfile, RuleSet, RuleSetId, StatusReply,
};
use crate::protocol::{Action, Params};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::future::Future;

/// Thin typed wrapper binding the gateway to named remote operations.
#[derive(Debug, Clone)]
pub struct GameService {
    gateway: GatewayHandle,
}

impl GameService {
    /// Creates a service over the given gateway.
    pub fn new(gateway: GatewayHandle) -> Self {
        Self { gateway }
    }

    fn request<T>(
        &self,
        action: Action,
        params: Params,
    ) -> impl Future<Output = Result<T, CallError>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let ticket = self.gateway.call(action, params);
        async move {
            let value = ticket.outcome().await?;
            serde_json::from_value(value).map_err(CallError::from)
        }
    }

    /// Creates a new game under the given rule set; returns the game id.
    pub fn create_game(
        &self,
        rule_set: RuleSetId,
    ) -> impl Future<Output = Result<GameId, CallError>> + Send + 'static {
        self.request(Action::CreateGame, vec![("rule_set", json!(rule_set))])
    }

    /// Fetches a game's status. Supplying the last-known `turn` lets the
    /// backend short-circuit with [`StatusReply::Unchanged`].
    pub fn get_game_status(
        &self,
        game: GameId,
        turn: Option<i64>,
    ) -> impl Future<Output = Result<StatusReply, CallError>> + Send + 'static {
        let mut params: Params = vec![("game", json!(game))];
        if let Some(turn) = turn {
            params.push(("turn", json!(turn)));
        }
        self.request(Action::GetGameStatus, params)
    }

    /// Fetches the rule-set catalog.
    pub fn get_rule_sets(
        &self,
    ) -> impl Future<Output = Result<Vec<RuleSet>, CallError>> + Send + 'static {
        self.request(Action::GetRuleSets, Vec::new())
    }

    /// Fetches the local player's profile.
    pub fn get_player_info(
        &self,
    ) -> impl Future<Output = Result<PlayerProfile, CallError>> + Send + 'static {
        self.request(Action::GetPlayerInfo, Vec::new())
    }

    /// Joins a game; returns the resulting snapshot.
    pub fn join_game(
        &self,
        game: GameId,
    ) -> impl Future<Output = Result<GameSnapshot, CallError>> + Send + 'static {
        self.request(Action::JoinGame, vec![("game", json!(game))])
    }

    /// Leaves a game.
    pub fn leave_game(
        &self,
        game: GameId,
    ) -> impl Future<Output = Result<(), CallError>> + Send + 'static {
        self.request(Action::LeaveGame, vec![("game", json!(game))])
    }

    /// Lists games relevant to the local player.
    pub fn get_games(
        &self,
        mode: Option<ListMode>,
    ) -> impl Future<Output = Result<Vec<GameSummary>, CallError>> + Send + 'static {
        let mut params: Params = Vec::new();
        if let Some(mode) = mode {
            params.push(("mode", json!(mode)));
        }
        self.request(Action::GetGames, params)
    }

    /// Places a stone at `(x, y)`; returns the updated snapshot.
    pub fn put_tile(
        &self,
        game: GameId,
        x: usize,
        y: usize,
    ) -> impl Future<Output = Result<GameSnapshot, CallError>> + Send + 'static {
        self.request(
            Action::PutTile,
            vec![("game", json!(game)), ("x", json!(x)), ("y", json!(y))],
        )
    }

    /// Adds a computer-controlled player; returns the updated snapshot.
    pub fn add_cpu_player(
        &self,
        game: GameId,
    ) -> impl Future<Output = Result<GameSnapshot, CallError>> + Send + 'static {
        self.request(Action::AddCpuPlayer, vec![("game", json!(game))])
    }

    /// Changes the local player's nickname; returns the updated profile.
    pub fn change_nickname(
        &self,
        nickname: &str,
    ) -> impl Future<Output = Result<PlayerProfile, CallError>> + Send + 'static {
        self.request(Action::ChangeNickname, vec![("nickname", json!(nickname))])
    }

    /// Creates a new rule set; returns its id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_rule_set(
        &self,
        name: &str,
        m: usize,
        n: usize,
        k: usize,
        p: u32,
        q: u32,
        num_players: u32,
    ) -> impl Future<Output = Result<RuleSetId, CallError>> + Send + 'static {
        self.request(
            Action::CreateRuleSet,
            vec![
                ("name", json!(name)),
                ("m", json!(m)),
                ("n", json!(n)),
                ("k", json!(k)),
                ("p", json!(p)),
                ("q", json!(q)),
                ("num_players", json!(num_players)),
            ],
        )
    }

    /// Starts a game played entirely by computer players; returns its id.
    pub fn cpu_battle(
        &self,
        rule_set: RuleSetId,
    ) -> impl Future<Output = Result<GameId, CallError>> + Send + 'static {
        self.request(Action::CpuBattle, vec![("rule_set", json!(rule_set))])
    }
}

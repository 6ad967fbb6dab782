//! Top-level client controller.
//!
//! Owns the [`ClientState`], the polling timer, and the command loop.
//! Everything the controller learns from the service flows through
//! [`ClientState`] and out to the UI as [`RenderFrame`]s; failures surface
//! as [`Notice`]s. The controller never retries anything itself — that is
//! the gateway's job.

use crate::gateway::{CallError, RequestGateway};
use crate::model::{GameId, LifecycleState, ListMode, RuleSetId, StatusReply};
use crate::protocol::Action;
use crate::render::{Notice, RenderFrame};
use crate::service::GameService;
use crate::state::{ClientState, Mode};
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, instrument, warn};

/// Player actions forwarded to the controller by the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Open the game screen for an existing game.
    OpenGame(GameId),
    /// Go back to the lobby.
    ReturnToLobby,
    /// Create a game under the given rule set and open it.
    CreateGame(RuleSetId),
    /// Join a game and open it.
    JoinGame(GameId),
    /// Leave the current game. Leaving a game in play requires
    /// `confirmed`; an unconfirmed request raises [`Notice::ConfirmLeave`]
    /// and does nothing else.
    LeaveGame {
        /// Whether the player has confirmed abandoning a game in play.
        confirmed: bool,
    },
    /// Place a stone at grid coordinates.
    PlaceStone {
        /// Column.
        x: usize,
        /// Row.
        y: usize,
    },
    /// Add a computer player to the current game.
    AddCpuPlayer,
    /// Fetch the local player's profile.
    FetchProfile,
    /// Change the local player's nickname.
    ChangeNickname(String),
    /// Stop the controller loop.
    Shutdown,
}

/// Channel ends handed to the embedding UI.
pub struct ClientHandles {
    /// Send player actions here.
    pub commands: mpsc::UnboundedSender<Command>,
    /// Render frames arrive here.
    pub frames: mpsc::UnboundedReceiver<RenderFrame>,
    /// User-visible alerts arrive here.
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

/// What woke the controller loop up.
enum Step {
    Command(Option<Command>),
    Poll,
}

/// The client controller. Drive it with [`ClientController::run`].
pub struct ClientController {
    service: GameService,
    state: ClientState,
    commands: mpsc::UnboundedReceiver<Command>,
    frames: mpsc::UnboundedSender<RenderFrame>,
    notices: mpsc::UnboundedSender<Notice>,
    next_poll: Option<Instant>,
}

impl ClientController {
    /// Creates a controller over the given transport, spawning the gateway
    /// task. Returns the controller and the UI-facing channel ends.
    pub fn new(transport: Arc<dyn Transport>) -> (Self, ClientHandles) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let gateway = RequestGateway::spawn(transport, notice_tx.clone());
        Self::with_service(GameService::new(gateway), notice_tx, notice_rx)
    }

    /// Creates a controller over an already-built service.
    fn with_service(
        service: GameService,
        notice_tx: mpsc::UnboundedSender<Notice>,
        notice_rx: mpsc::UnboundedReceiver<Notice>,
    ) -> (Self, ClientHandles) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let controller = Self {
            service,
            state: ClientState::new(),
            commands: command_rx,
            frames: frame_tx,
            notices: notice_tx,
            next_poll: None,
        };
        let handles = ClientHandles {
            commands: command_tx,
            frames: frame_rx,
            notices: notice_rx,
        };
        (controller, handles)
    }

    /// Runs the controller loop until shutdown.
    ///
    /// Fetches the rule-set catalog once, performs the initial lobby
    /// refresh, then alternates between player commands and the poll timer.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("Controller starting");

        match self.service.get_rule_sets().await {
            Ok(sets) => self.state.cache_rule_sets(sets),
            Err(e) => self.report(Action::GetRuleSets, e),
        }
        self.refresh().await;

        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                _ = wait_for(self.next_poll), if self.next_poll.is_some() => Step::Poll,
            };
            match step {
                Step::Command(None) | Step::Command(Some(Command::Shutdown)) => {
                    info!("Controller shutting down");
                    return Ok(());
                }
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Poll => {
                    self.next_poll = None;
                    self.refresh().await;
                }
            }
        }
    }

    #[instrument(skip(self))]
    async fn handle_command(&mut self, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::OpenGame(game) => {
                self.state.enter_game(game);
                self.emit(RenderFrame::Loading);
                self.refresh().await;
            }
            Command::ReturnToLobby => {
                self.state.enter_lobby();
                self.refresh().await;
            }
            Command::CreateGame(rule_set) => match self.service.create_game(rule_set).await {
                Ok(game) => {
                    info!(%game, "Game created");
                    self.state.enter_game(game);
                    self.emit(RenderFrame::Loading);
                    self.refresh().await;
                }
                Err(e) => self.report(Action::CreateGame, e),
            },
            Command::JoinGame(game) => match self.service.join_game(game).await {
                Ok(snapshot) => {
                    // The reply is already a fresh snapshot; enter the game
                    // without triggering a redundant fetch.
                    self.state.enter_game(game);
                    self.emit(RenderFrame::Loading);
                    let generation = *self.state.generation();
                    self.apply_status(generation, StatusReply::Snapshot(snapshot));
                }
                Err(e) => self.report(Action::JoinGame, e),
            },
            Command::LeaveGame { confirmed } => self.leave_game(confirmed).await,
            Command::PlaceStone { x, y } => self.place_stone(x, y).await,
            Command::AddCpuPlayer => {
                let Some(game) = *self.state.game_id() else {
                    warn!("No active game to add a computer player to");
                    return;
                };
                let generation = *self.state.generation();
                match self.service.add_cpu_player(game).await {
                    Ok(snapshot) => self.apply_status(generation, StatusReply::Snapshot(snapshot)),
                    Err(e) => self.report(Action::AddCpuPlayer, e),
                }
            }
            Command::FetchProfile => match self.service.get_player_info().await {
                Ok(profile) => self.emit(RenderFrame::Profile(profile)),
                Err(e) => self.report(Action::GetPlayerInfo, e),
            },
            Command::ChangeNickname(nickname) => {
                match self.service.change_nickname(&nickname).await {
                    Ok(profile) => self.emit(RenderFrame::Profile(profile)),
                    Err(e) => self.report(Action::ChangeNickname, e),
                }
            }
            Command::Shutdown => debug!("Shutdown is handled by the run loop"),
        }
    }

    /// Submits a stone placement. Accepted only in game mode; the reply
    /// feeds the same snapshot path as polling.
    #[instrument(skip(self))]
    async fn place_stone(&mut self, x: usize, y: usize) {
        if *self.state.mode() != Mode::Game {
            warn!("Ignoring move outside game mode");
            return;
        }
        let Some(game) = *self.state.game_id() else {
            warn!("No active game to move in");
            return;
        };
        let generation = *self.state.generation();
        match self.service.put_tile(game, x, y).await {
            Ok(snapshot) => self.apply_status(generation, StatusReply::Snapshot(snapshot)),
            Err(e) => self.report(Action::PutTile, e),
        }
    }

    /// Leaves the current game, asking for confirmation first when the game
    /// is still in play.
    #[instrument(skip(self))]
    async fn leave_game(&mut self, confirmed: bool) {
        let Some(game) = *self.state.game_id() else {
            warn!("No active game to leave");
            return;
        };
        let in_play = self
            .state
            .snapshot()
            .as_ref()
            .is_some_and(|s| *s.state() == LifecycleState::Playing);
        if in_play && !confirmed {
            debug!(%game, "Leave needs confirmation");
            let _ = self.notices.send(Notice::ConfirmLeave { game });
            return;
        }
        match self.service.leave_game(game).await {
            Ok(()) => {
                info!(%game, "Left game");
                self.state.enter_lobby();
                self.refresh().await;
            }
            Err(e) => self.report(Action::LeaveGame, e),
        }
    }

    /// Cancels any pending poll and fetches whatever the current mode needs:
    /// the games listing in the lobby, the game status in a game.
    #[instrument(skip(self), fields(mode = %self.state.mode()))]
    async fn refresh(&mut self) {
        self.next_poll = None;
        match self.state.mode() {
            Mode::Lobby => match self.service.get_games(Some(ListMode::Play)).await {
                Ok(games) => {
                    self.emit(RenderFrame::Lobby { games });
                    self.reschedule();
                }
                Err(e) => self.report(Action::GetGames, e),
            },
            Mode::Game => {
                let Some(game) = *self.state.game_id() else {
                    debug!("Game mode without a game id; nothing to refresh");
                    return;
                };
                let generation = *self.state.generation();
                let turn = *self.state.turn();
                match self.service.get_game_status(game, turn).await {
                    Ok(reply) => self.apply_status(generation, reply),
                    Err(e) => self.report(Action::GetGameStatus, e),
                }
            }
        }
    }

    /// Feeds a status reply into the state machine and schedules the next
    /// poll. Shared by polling, move submission, joining, and CPU addition.
    fn apply_status(&mut self, generation: u64, reply: StatusReply) {
        if generation != *self.state.generation() {
            debug!("Stale status reply; mode changed while it was in flight");
            return;
        }
        match reply {
            StatusReply::Unchanged => debug!("Game unchanged since last fetch"),
            StatusReply::Snapshot(snapshot) => {
                if self.state.apply_snapshot(generation, snapshot) {
                    self.emit(self.state.render_game());
                }
            }
        }
        self.reschedule();
    }

    /// Replaces the pending poll timer with whatever the current state
    /// calls for. A finished game schedules nothing.
    fn reschedule(&mut self) {
        match self.state.poll_delay() {
            Some(delay) => self.schedule(delay),
            None => {
                debug!("Polling stopped for current state");
                self.next_poll = None;
            }
        }
    }

    fn schedule(&mut self, delay: Duration) {
        debug!(delay_ms = delay.as_millis() as u64, "Scheduling next poll");
        self.next_poll = Some(Instant::now() + delay);
    }

    fn emit(&self, frame: RenderFrame) {
        if self.frames.send(frame).is_err() {
            debug!("Render target gone; frame dropped");
        }
    }

    fn report(&self, action: Action, error: CallError) {
        match error {
            CallError::Api(error) => {
                warn!(%action, %error, "Service call failed");
                let _ = self.notices.send(Notice::ApplicationError { action, error });
            }
            CallError::Dropped => {
                // The gateway already raised the user-visible notice.
                debug!(%action, "Call abandoned");
            }
            CallError::Decode(e) => {
                warn!(%action, error = %e, "Could not decode success payload");
                let _ = self.notices.send(Notice::MalformedResponse {
                    action,
                    detail: e.to_string(),
                });
            }
        }
    }
}

/// Sleeps until the deadline; pends forever when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

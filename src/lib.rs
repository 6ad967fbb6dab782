//! Polling client for turn-based m,n,k,p,q board games.
//!
//! An m,n,k,p,q-game is played on an m×n grid; a player wins with k stones
//! in a row, placing q stones on the opening move and p stones per turn
//! afterwards (tic-tac-toe is 3,3,3; free-style gomoku is 19,19,5). The
//! remote service owns the rules; this crate is the client: it serializes
//! and retries calls to the service, tracks lobby/game state, polls at a
//! cadence matched to the game's lifecycle, and projects snapshots into
//! render descriptors for an external UI.
//!
//! # Architecture
//!
//! - **Gateway**: single-flight, retrying call serializer ([`RequestGateway`])
//! - **Service**: typed remote operations ([`GameService`])
//! - **State**: mode machine and render projection ([`ClientState`])
//! - **Controller**: command loop and adaptive polling ([`ClientController`])
//! - **Win detection**: pure k-in-a-row scan ([`winning_cells`])
//!
//! # Example
//!
//! ```no_run
//! use mnk_client::{ClientController, Command, HttpTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = Arc::new(HttpTransport::new("https://example.org/game"));
//! let (controller, mut handles) = ClientController::new(transport);
//! tokio::spawn(controller.run());
//!
//! // Forward player actions; consume render frames.
//! handles.commands.send(Command::OpenGame(mnk_client::GameId(42)))?;
//! while let Some(frame) = handles.frames.recv().await {
//!     // hand the frame to the UI layer
//!     let _ = frame;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod controller;
mod gateway;
mod model;
mod protocol;
mod render;
mod service;
mod state;
mod transport;
mod win;

// Crate-level exports - Gateway
pub use gateway::{CallError, CallTicket, GatewayHandle, MAX_ATTEMPTS, RETRY_DELAY, RequestGateway};

// Crate-level exports - Wire protocol
pub use protocol::{Action, ApiError, Envelope, Params, ResponseStatus};

// Crate-level exports - Transport
pub use transport::{HttpTransport, Transport, TransportError};

// Crate-level exports - Domain model
pub use model::{
    Board, GameId, GameSnapshot, GameSummary, LifecycleState, ListMode, PlayerProfile, RuleSet,
    RuleSetCache, RuleSetId, StatusReply,
};

// Crate-level exports - Service operations
pub use service::GameService;

// Crate-level exports - Client state machine
pub use state::{ClientState, GAME_LOADING_POLL, LOBBY_POLL, Mode, PLAYING_POLL, WAITING_POLL};

// Crate-level exports - Controller
pub use controller::{ClientController, ClientHandles, Command};

// Crate-level exports - Render boundary
pub use render::{CellView, GameView, Notice, PlayerSlot, RenderFrame};

// Crate-level exports - Win detection
pub use win::winning_cells;

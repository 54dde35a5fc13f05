//! Connect N - a two-player disc-dropping game served over WebSockets
//!
//! Two participants join over persistent connections and take turns dropping
//! discs into a grid; the first to line up `win_length` discs wins.
//!
//! # Architecture
//!
//! - **Games**: the grid, move legality and win/draw detection ([`GameEngine`])
//! - **Session**: joining, turn order and resets ([`GameSession`], [`SessionRegistry`])
//! - **Protocol**: JSON frames exchanged with clients ([`ClientMessage`], [`ServerMessage`])
//! - **Hub**: per-connection outbound queues and broadcast ([`Hub`])
//! - **Server**: axum WebSocket endpoint ([`GameServer`])
//!
//! # Example
//!
//! ```no_run
//! use connect_n::{GameServer, Settings};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = Settings::default();
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! GameServer::new(&settings)
//!     .serve(listener, async {
//!         tokio::signal::ctrl_c().await.ok();
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod games;
mod hub;
mod protocol;
mod server;
mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, GameConfig, ServerConfig, Settings, SettingsOverrides};

// Crate-level exports - Game types (connect-N)
pub use games::connect_n::{
    EMPTY, GameEngine, GameStatus, Grid, GridError, MoveError, ParticipantId, RejectionKind,
};
pub use games::connect_n::rules;

// Crate-level exports - Session management
pub use session::{
    DISCONNECT_NOTICE, GameSession, Membership, PLAYER_ONE, PLAYER_TWO, Participant, Role,
    SessionId, SessionRegistry,
};

// Crate-level exports - Wire protocol
pub use protocol::{
    ClientMessage, IllegalMove, Outbound, Outbox, ServerMessage, SessionSnapshot, deliver,
};

// Crate-level exports - Server types
pub use hub::{ConnectionId, ConnectionOutbox, Hub};
pub use server::GameServer;

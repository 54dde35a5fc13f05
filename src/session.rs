//! Game session management.
//!
//! A [`GameSession`] is one game from the first join until it is reset. The
//! [`SessionRegistry`] owns the active session, runs every event against it
//! under a single lock, and replaces it with a fresh one on reset.

use crate::config::GameConfig;
use crate::games::connect_n::{GameEngine, GameStatus, MoveError, ParticipantId};
use crate::protocol::{IllegalMove, Outbound, Outbox, ServerMessage, SessionSnapshot, deliver};
use derive_more::Display;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, instrument, warn};

/// Id of the first participant to join; moves first.
pub const PLAYER_ONE: ParticipantId = 1;

/// Id of the second participant to join.
pub const PLAYER_TWO: ParticipantId = 2;

/// Notice broadcast when a player leaves mid-game.
pub const DISCONNECT_NOTICE: &str = "The other player has disconnected. Game over.";

/// Unique identifier for a game session. Every reset issues a new one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub u64);

/// Someone who joined a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Participant {
    /// Display name.
    pub name: String,
    /// Sequential id, starting at 1.
    pub id: ParticipantId,
}

impl Participant {
    /// The role this participant's id grants.
    pub fn role(&self) -> Role {
        match self.id {
            PLAYER_ONE | PLAYER_TWO => Role::Player,
            _ => Role::Spectator,
        }
    }

    /// True for the two seated players.
    pub fn is_player(&self) -> bool {
        self.role() == Role::Player
    }
}

/// What a participant may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Ids 1 and 2: take turns moving.
    Player,
    /// Ids 3 and up: watch only, never get the turn.
    Spectator,
}

/// A participant's seat in a particular session.
///
/// Connections hold on to this so that a request arriving after a reset is
/// recognised as belonging to a game that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Membership {
    /// Session joined.
    pub session_id: SessionId,
    /// Participant record handed out on join.
    pub participant: Participant,
}

/// A two-player game session.
#[derive(Debug, Clone)]
pub struct GameSession {
    id: SessionId,
    engine: GameEngine,
    participant_one: Option<Participant>,
    participant_two: Option<Participant>,
    next_participant_id: ParticipantId,
    player_to_move: Option<Participant>,
}

impl GameSession {
    /// Creates a new game session.
    #[instrument(skip(config))]
    pub fn new(id: SessionId, config: &GameConfig) -> Self {
        info!(session_id = %id, "Creating new game session");
        Self {
            id,
            engine: GameEngine::new(config),
            participant_one: None,
            participant_two: None,
            next_participant_id: PLAYER_ONE,
            player_to_move: None,
        }
    }

    /// Session ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The game engine.
    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// First player, once joined.
    pub fn participant_one(&self) -> Option<&Participant> {
        self.participant_one.as_ref()
    }

    /// Second player, once joined.
    pub fn participant_two(&self) -> Option<&Participant> {
        self.participant_two.as_ref()
    }

    /// Whose turn it is. After a win, the winner.
    pub fn player_to_move(&self) -> Option<&Participant> {
        self.player_to_move.as_ref()
    }

    /// True once anyone has joined.
    pub fn is_started(&self) -> bool {
        self.participant_one.is_some()
    }

    /// True once both players have joined.
    pub fn is_ready(&self) -> bool {
        self.participant_one.is_some() && self.participant_two.is_some()
    }

    /// True once the game is won or drawn.
    pub fn is_finished(&self) -> bool {
        self.engine.status().is_terminal()
    }

    /// Current state as sent to clients.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            grid: self.engine.grid().clone(),
            status: self.engine.status(),
            player_to_move: self.player_to_move.clone(),
            win_length: self.engine.win_length(),
        }
    }

    /// Registers a participant under the next free id.
    ///
    /// The first joiner becomes player one and gets the first move. The
    /// second becomes player two, and the initial state is broadcast after
    /// the reply to the joiner. Anyone later is a spectator.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn join(&mut self, name: String) -> (Participant, Vec<Outbound>) {
        let participant = Participant::new(name, self.next_participant_id);
        self.next_participant_id += 1;

        let mut outbound = vec![Outbound::Reply(ServerMessage::Joined(participant.clone()))];
        match participant.id {
            PLAYER_ONE => {
                info!(participant_id = participant.id, "Registering player one");
                self.participant_one = Some(participant.clone());
                self.player_to_move = Some(participant.clone());
            }
            PLAYER_TWO => {
                info!(participant_id = participant.id, "Registering player two, game starts");
                self.participant_two = Some(participant.clone());
                outbound.push(Outbound::Broadcast(ServerMessage::State(self.snapshot())));
            }
            id => {
                info!(participant_id = id, "Session already has 2 players, joining as spectator");
                if self.is_ready() {
                    outbound.push(Outbound::Reply(ServerMessage::State(self.snapshot())));
                }
            }
        }

        (participant, outbound)
    }

    /// Plays a move for `requester`.
    ///
    /// On success the new state is broadcast and, unless the game just
    /// ended, the turn passes to the other player. On failure only the
    /// requester hears about it and nothing changes.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn make_move(&mut self, requester: ParticipantId, column: i64) -> Vec<Outbound> {
        let mover = match self.check_turn(requester) {
            Ok(mover) => mover,
            Err(e) => return reject(requester, &e),
        };

        match self.engine.add_disc(column, mover.id) {
            Ok(GameStatus::InProgress) => {
                self.player_to_move = self.other_player(mover.id);
                debug!(
                    next = ?self.player_to_move.as_ref().map(|p| p.id),
                    "Turn passed"
                );
            }
            Ok(status) => {
                info!(participant_id = mover.id, %status, "Game finished");
            }
            Err(e) => return reject(requester, &e),
        }

        vec![Outbound::Broadcast(ServerMessage::State(self.snapshot()))]
    }

    fn check_turn(&self, requester: ParticipantId) -> Result<Participant, MoveError> {
        if !self.is_ready() {
            return Err(MoveError::NotStarted);
        }
        if self.is_finished() {
            return Err(MoveError::GameOver);
        }
        match &self.player_to_move {
            Some(mover) if mover.id == requester => Ok(mover.clone()),
            Some(mover) => {
                warn!(
                    requester,
                    expected = mover.id,
                    "Participant tried to move out of turn"
                );
                Err(MoveError::NotYourTurn {
                    waiting_for: mover.name.clone(),
                })
            }
            None => Err(MoveError::NotStarted),
        }
    }

    fn other_player(&self, current: ParticipantId) -> Option<Participant> {
        if current == PLAYER_ONE {
            self.participant_two.clone()
        } else {
            self.participant_one.clone()
        }
    }
}

fn reject(requester: ParticipantId, error: &MoveError) -> Vec<Outbound> {
    debug!(requester, kind = %error.kind(), error = %error, "Illegal move");
    vec![Outbound::Reply(ServerMessage::IllegalMove(IllegalMove::new(
        error, requester,
    )))]
}

#[derive(Debug)]
struct RegistryState {
    active: GameSession,
    next_session_id: u64,
}

impl RegistryState {
    fn new(config: &GameConfig) -> Self {
        Self {
            active: GameSession::new(SessionId(1), config),
            next_session_id: 2,
        }
    }

    /// Replaces the active session with an empty one.
    fn reset(&mut self, config: &GameConfig) {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        info!(previous = %self.active.id(), next = %id, "Resetting game");
        self.active = GameSession::new(id, config);
    }

    /// Resets and returns the notice telling everyone the game is over.
    fn terminate(&mut self, config: &GameConfig, notice: String) -> Vec<Outbound> {
        self.reset(config);
        vec![Outbound::Broadcast(ServerMessage::Terminated { message: notice })]
    }
}

/// Owns the active game session and serializes access to it.
///
/// Cloning is cheap and every clone shares the same session. Each operation
/// holds the lock for the whole event, including handing its messages to the
/// [`Outbox`], so every client observes events in the order they happened.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    state: Arc<Mutex<RegistryState>>,
    config: GameConfig,
}

impl SessionRegistry {
    /// Creates a registry with one empty session.
    #[instrument]
    pub fn new(config: GameConfig) -> Self {
        info!("Creating session registry");
        Self {
            state: Arc::new(Mutex::new(RegistryState::new(&config))),
            config,
        }
    }

    /// Game rules every session is created with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Id of the session currently accepting joins.
    pub fn active_session_id(&self) -> SessionId {
        self.read(|session| session.id())
    }

    /// State of the active session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(GameSession::snapshot)
    }

    /// Joins the active session.
    ///
    /// A finished game is replaced by a fresh one first, so the joiner
    /// starts a new game as player one. Returns `None` only if handling the
    /// join hit an internal fault.
    #[instrument(skip(self, outbox))]
    pub fn join(&self, name: String, outbox: &impl Outbox) -> Option<Membership> {
        self.join_with_seat(name, None, outbox)
    }

    /// Joins on behalf of a connection that may already hold `seat`.
    ///
    /// A seat in the active, unfinished game is kept: the requester gets an
    /// error and `seat` is returned unchanged. A seat in a finished or reset
    /// game does not count, so its holder can start the next game.
    #[instrument(skip(self, seat, outbox))]
    pub fn join_with_seat(
        &self,
        name: String,
        seat: Option<&Membership>,
        outbox: &impl Outbox,
    ) -> Option<Membership> {
        let config = self.config;
        self.with_state("join", outbox, move |state| {
            let active = &state.active;
            if let Some(member) =
                seat.filter(|m| m.session_id == active.id() && !active.is_finished())
            {
                debug!(participant_id = member.participant.id, "Already seated, join ignored");
                let notice = ServerMessage::error(format!(
                    "Already joined as participant {}",
                    member.participant.id
                ));
                return (member.clone(), vec![Outbound::Reply(notice)]);
            }
            if state.active.is_finished() {
                info!(session_id = %state.active.id(), "Previous game finished, starting a new one");
                state.reset(&config);
            }
            let (participant, outbound) = state.active.join(name);
            (Membership::new(state.active.id(), participant), outbound)
        })
    }

    /// Plays a move on behalf of `member`.
    #[instrument(
        skip(self, member, outbox),
        fields(session_id = %member.session_id, participant_id = member.participant.id)
    )]
    pub fn make_move(&self, member: &Membership, column: i64, outbox: &impl Outbox) {
        self.with_state("move", outbox, |state| {
            let outbound = if member.session_id == state.active.id() {
                state.active.make_move(member.participant.id, column)
            } else {
                reject(member.participant.id, &MoveError::SessionEnded)
            };
            ((), outbound)
        });
    }

    /// Handles a connection going away.
    ///
    /// Ends the game only when one of the two players of the active session
    /// leaves. Spectators, connections that never joined, and players of an
    /// earlier session are ignored. Returns whether the session was reset.
    #[instrument(skip(self, outbox))]
    pub fn disconnect(&self, departed: Option<&Membership>, outbox: &impl Outbox) -> bool {
        let config = self.config;
        self.with_state("disconnect", outbox, |state| {
            let session = &state.active;
            let actionable = session.is_started()
                && departed.is_some_and(|member| {
                    member.session_id == session.id() && member.participant.is_player()
                });
            if !actionable {
                debug!("Disconnect does not affect the active game");
                return (false, Vec::new());
            }
            info!(session_id = %session.id(), "A player has disconnected");
            (true, state.terminate(&config, DISCONNECT_NOTICE.to_string()))
        })
        .unwrap_or(true)
    }

    /// Ends the active game because of an internal error.
    #[instrument(skip(self, outbox))]
    pub fn fault(&self, reason: &str, outbox: &impl Outbox) {
        let mut state = self.lock(outbox);
        error!(session_id = %state.active.id(), reason, "There was an internal server error");
        let outbound = state.terminate(&self.config, internal_error_notice(reason));
        deliver(outbox, outbound);
    }

    /// Runs one event under the lock and delivers what it produced.
    ///
    /// A panic inside `event` is contained here: the half-updated session is
    /// discarded, everyone is told the game ended, and `None` is returned.
    fn with_state<T>(
        &self,
        name: &'static str,
        outbox: &impl Outbox,
        event: impl FnOnce(&mut RegistryState) -> (T, Vec<Outbound>),
    ) -> Option<T> {
        let mut state = self.lock(outbox);
        match panic::catch_unwind(AssertUnwindSafe(|| event(&mut *state))) {
            Ok((value, outbound)) => {
                deliver(outbox, outbound);
                Some(value)
            }
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                error!(event = name, reason = %reason, "There was an internal server error");
                let outbound = state.terminate(&self.config, internal_error_notice(&reason));
                deliver(outbox, outbound);
                None
            }
        }
    }

    fn lock(&self, outbox: &impl Outbox) -> MutexGuard<'_, RegistryState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => {
                warn!("Session lock poisoned, discarding session");
                self.state.clear_poison();
                let mut state = poisoned.into_inner();
                let outbound = state.terminate(
                    &self.config,
                    internal_error_notice("session state was poisoned"),
                );
                deliver(outbox, outbound);
                state
            }
        }
    }

    fn read<T>(&self, f: impl FnOnce(&GameSession) -> T) -> T {
        let state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&state.active)
    }
}

fn internal_error_notice(reason: &str) -> String {
    format!("There was an internal server error: {}", reason)
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

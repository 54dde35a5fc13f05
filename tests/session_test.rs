//! Tests for session coordination: joining, turn order, resets.

use connect_n::{
    DISCONNECT_NOTICE, GameConfig, GameSession, GameStatus, Membership, Outbound, Outbox,
    PLAYER_ONE, PLAYER_TWO, RejectionKind, ServerMessage, SessionId, SessionRegistry,
};
use std::cell::RefCell;
use std::num::NonZeroUsize;

/// Records everything an event sends, in order.
#[derive(Default)]
struct Recorder(RefCell<Vec<Outbound>>);

impl Outbox for Recorder {
    fn reply(&self, message: ServerMessage) {
        self.0.borrow_mut().push(Outbound::Reply(message));
    }

    fn broadcast(&self, message: ServerMessage) {
        self.0.borrow_mut().push(Outbound::Broadcast(message));
    }
}

impl Recorder {
    fn take(&self) -> Vec<Outbound> {
        self.0.take()
    }
}

fn config(rows: usize, columns: usize, win_length: usize) -> GameConfig {
    GameConfig::new(
        NonZeroUsize::new(rows).unwrap(),
        NonZeroUsize::new(columns).unwrap(),
        NonZeroUsize::new(win_length).unwrap(),
    )
}

/// Registry with two seated players and the join traffic discarded.
fn started(config: GameConfig) -> (SessionRegistry, Recorder, Membership, Membership) {
    let registry = SessionRegistry::new(config);
    let outbox = Recorder::default();
    let one = registry.join("Alice".to_string(), &outbox).unwrap();
    let two = registry.join("Bob".to_string(), &outbox).unwrap();
    outbox.take();
    (registry, outbox, one, two)
}

fn single_illegal_move(outbound: Vec<Outbound>) -> connect_n::IllegalMove {
    match outbound.as_slice() {
        [Outbound::Reply(ServerMessage::IllegalMove(illegal))] => illegal.clone(),
        other => panic!("expected a single illegal move reply, got {:?}", other),
    }
}

fn single_state(outbound: Vec<Outbound>) -> connect_n::SessionSnapshot {
    match outbound.as_slice() {
        [Outbound::Broadcast(ServerMessage::State(state))] => state.clone(),
        other => panic!("expected a single state broadcast, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────
// Joining
// ─────────────────────────────────────────────────────────────

#[test]
fn test_first_join_replies_only() {
    let registry = SessionRegistry::new(config(6, 9, 5));
    let outbox = Recorder::default();

    let member = registry.join("Alice".to_string(), &outbox).unwrap();

    assert_eq!(member.participant.id, PLAYER_ONE);
    assert_eq!(member.session_id, registry.active_session_id());
    assert_eq!(
        outbox.take(),
        vec![Outbound::Reply(ServerMessage::Joined(member.participant))]
    );
}

#[test]
fn test_second_join_reply_precedes_state_broadcast() {
    let registry = SessionRegistry::new(config(6, 9, 5));
    let outbox = Recorder::default();
    registry.join("Alice".to_string(), &outbox);
    outbox.take();

    let member = registry.join("Bob".to_string(), &outbox).unwrap();
    assert_eq!(member.participant.id, PLAYER_TWO);

    let outbound = outbox.take();
    assert_eq!(outbound.len(), 2);
    assert_eq!(
        outbound[0],
        Outbound::Reply(ServerMessage::Joined(member.participant.clone()))
    );
    match &outbound[1] {
        Outbound::Broadcast(ServerMessage::State(state)) => {
            assert_eq!(state.status, GameStatus::InProgress);
            assert_eq!(state.player_to_move.as_ref().map(|p| p.id), Some(PLAYER_ONE));
            assert_eq!(
                state.player_to_move.as_ref().map(|p| p.name.as_str()),
                Some("Alice")
            );
            assert!(state.grid.as_rows().iter().flatten().all(|&cell| cell == 0));
        }
        other => panic!("expected state broadcast, got {:?}", other),
    }
}

#[test]
fn test_spectator_gets_state_but_no_turn() {
    let (registry, outbox, _one, _two) = started(config(3, 3, 3));

    let spectator = registry.join("Carol".to_string(), &outbox).unwrap();
    assert_eq!(spectator.participant.id, 3);
    assert!(!spectator.participant.is_player());
    assert!(matches!(
        outbox.take().as_slice(),
        [
            Outbound::Reply(ServerMessage::Joined(_)),
            Outbound::Reply(ServerMessage::State(_))
        ]
    ));

    registry.make_move(&spectator, 1, &outbox);
    let illegal = single_illegal_move(outbox.take());
    assert_eq!(illegal.kind, RejectionKind::NotYourTurn);
    assert_eq!(illegal.player_id, 3);
}

// ─────────────────────────────────────────────────────────────
// Moves
// ─────────────────────────────────────────────────────────────

#[test]
fn test_out_of_range_rejected_without_broadcast() {
    let (registry, outbox, one, _two) = started(config(3, 3, 3));
    let before = registry.snapshot();

    registry.make_move(&one, 0, &outbox);

    let illegal = single_illegal_move(outbox.take());
    assert_eq!(illegal.message, "Column 0 is out of range of (1-3)");
    assert_eq!(illegal.player_id, PLAYER_ONE);
    assert_eq!(illegal.kind, RejectionKind::OutOfRange);
    assert_eq!(registry.snapshot(), before);
}

#[test]
fn test_turn_passes_after_legal_move() {
    let (registry, outbox, one, two) = started(config(3, 3, 3));

    registry.make_move(&one, 2, &outbox);
    let state = single_state(outbox.take());
    assert_eq!(state.grid.get(0, 1), Some(PLAYER_ONE));
    assert_eq!(state.player_to_move.map(|p| p.id), Some(PLAYER_TWO));

    registry.make_move(&two, 2, &outbox);
    let state = single_state(outbox.take());
    assert_eq!(state.grid.get(1, 1), Some(PLAYER_TWO));
    assert_eq!(state.player_to_move.map(|p| p.id), Some(PLAYER_ONE));
}

#[test]
fn test_out_of_turn_rejected() {
    let (registry, outbox, _one, two) = started(config(3, 3, 3));

    registry.make_move(&two, 1, &outbox);

    let illegal = single_illegal_move(outbox.take());
    assert_eq!(illegal.kind, RejectionKind::NotYourTurn);
    assert!(illegal.message.contains("Alice"));
    assert_eq!(registry.snapshot().grid.get(0, 0), Some(0));
}

#[test]
fn test_move_before_opponent_joins() {
    let registry = SessionRegistry::new(config(3, 3, 3));
    let outbox = Recorder::default();
    let one = registry.join("Alice".to_string(), &outbox).unwrap();
    outbox.take();

    registry.make_move(&one, 1, &outbox);

    assert_eq!(
        single_illegal_move(outbox.take()).kind,
        RejectionKind::NotStarted
    );
}

#[test]
fn test_full_column_rejected() {
    let (registry, outbox, one, two) = started(config(2, 3, 3));
    registry.make_move(&one, 1, &outbox);
    registry.make_move(&two, 1, &outbox);
    outbox.take();

    registry.make_move(&one, 1, &outbox);

    let illegal = single_illegal_move(outbox.take());
    assert_eq!(
        illegal.message,
        "No more discs may be added to column 1 because it is full"
    );
    let state = registry.snapshot();
    assert_eq!(state.player_to_move.map(|p| p.id), Some(PLAYER_ONE));
}

#[test]
fn test_win_keeps_winner_as_player_to_move() {
    let (registry, outbox, one, two) = started(config(3, 3, 3));
    for (member, column) in [(&one, 1), (&two, 2), (&one, 1), (&two, 2)] {
        registry.make_move(member, column, &outbox);
    }
    outbox.take();

    registry.make_move(&one, 1, &outbox);

    let state = single_state(outbox.take());
    assert_eq!(state.status, GameStatus::Won);
    assert_eq!(state.player_to_move.map(|p| p.id), Some(PLAYER_ONE));

    registry.make_move(&two, 3, &outbox);
    assert_eq!(
        single_illegal_move(outbox.take()).kind,
        RejectionKind::GameOver
    );
}

#[test]
fn test_join_while_seated_keeps_seat() {
    let (registry, outbox, one, _two) = started(config(3, 3, 3));

    let kept = registry
        .join_with_seat("Alice".to_string(), Some(&one), &outbox)
        .unwrap();

    assert_eq!(kept, one);
    assert_eq!(
        outbox.take(),
        vec![Outbound::Reply(ServerMessage::error(
            "Already joined as participant 1"
        ))]
    );
    assert_eq!(registry.active_session_id(), one.session_id);
}

#[test]
fn test_winner_rejoin_starts_new_session() {
    let (registry, outbox, one, two) = started(config(3, 3, 3));
    for (member, column) in [(&one, 1), (&two, 2), (&one, 1), (&two, 2), (&one, 1)] {
        registry.make_move(member, column, &outbox);
    }
    outbox.take();

    let fresh = registry
        .join_with_seat("Alice".to_string(), Some(&one), &outbox)
        .unwrap();

    assert_eq!(fresh.participant.id, PLAYER_ONE);
    assert_ne!(fresh.session_id, one.session_id);
    let messages: Vec<&str> = outbox
        .take()
        .iter()
        .map(|item| item.message().label())
        .collect();
    assert_eq!(messages, vec!["joined"]);
}

#[test]
fn test_join_after_finished_game_starts_new_session() {
    let (registry, outbox, one, two) = started(config(3, 3, 3));
    for (member, column) in [(&one, 1), (&two, 2), (&one, 1), (&two, 2), (&one, 1)] {
        registry.make_move(member, column, &outbox);
    }
    let finished = registry.active_session_id();
    outbox.take();

    let fresh = registry.join("Dave".to_string(), &outbox).unwrap();

    assert_eq!(fresh.participant.id, PLAYER_ONE);
    assert_ne!(fresh.session_id, finished);
    assert_eq!(registry.snapshot().status, GameStatus::InProgress);

    registry.make_move(&one, 3, &outbox);
    assert_eq!(
        single_illegal_move(outbox.take()).kind,
        RejectionKind::SessionEnded
    );
}

// ─────────────────────────────────────────────────────────────
// Disconnects
// ─────────────────────────────────────────────────────────────

#[test]
fn test_player_disconnect_resets_session() {
    let (registry, outbox, one, _two) = started(config(3, 3, 3));
    registry.make_move(&one, 1, &outbox);
    let before = registry.active_session_id();
    outbox.take();

    assert!(registry.disconnect(Some(&one), &outbox));

    assert_eq!(
        outbox.take(),
        vec![Outbound::Broadcast(ServerMessage::terminated(
            DISCONNECT_NOTICE
        ))]
    );
    assert_ne!(registry.active_session_id(), before);
    let state = registry.snapshot();
    assert!(state.grid.as_rows().iter().flatten().all(|&cell| cell == 0));
    assert!(state.player_to_move.is_none());

    let next = registry.join("Eve".to_string(), &outbox).unwrap();
    assert_eq!(next.participant.id, PLAYER_ONE);
}

#[test]
fn test_lone_player_disconnect_resets_session() {
    let registry = SessionRegistry::new(config(3, 3, 3));
    let outbox = Recorder::default();
    let one = registry.join("Alice".to_string(), &outbox).unwrap();
    outbox.take();

    assert!(registry.disconnect(Some(&one), &outbox));
    let outbound = outbox.take();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].message().label(), "terminated");
}

#[test]
fn test_disconnect_without_join_is_ignored() {
    let registry = SessionRegistry::new(config(3, 3, 3));
    let outbox = Recorder::default();
    let before = registry.active_session_id();

    assert!(!registry.disconnect(None, &outbox));

    assert!(outbox.take().is_empty());
    assert_eq!(registry.active_session_id(), before);
}

#[test]
fn test_spectator_disconnect_is_ignored() {
    let (registry, outbox, _one, _two) = started(config(3, 3, 3));
    let spectator = registry.join("Carol".to_string(), &outbox).unwrap();
    outbox.take();

    assert!(!registry.disconnect(Some(&spectator), &outbox));

    assert!(outbox.take().is_empty());
    assert_eq!(registry.active_session_id(), spectator.session_id);
}

#[test]
fn test_fault_terminates_with_reason() {
    let (registry, outbox, _one, _two) = started(config(3, 3, 3));

    registry.fault("disk on fire", &outbox);

    assert_eq!(
        outbox.take(),
        vec![Outbound::Broadcast(ServerMessage::terminated(
            "There was an internal server error: disk on fire"
        ))]
    );
    assert!(registry.snapshot().player_to_move.is_none());
}

// ─────────────────────────────────────────────────────────────
// GameSession on its own
// ─────────────────────────────────────────────────────────────

#[test]
fn test_session_flags() {
    let mut session = GameSession::new(SessionId(7), &config(3, 3, 3));
    assert!(!session.is_started());
    assert!(!session.is_ready());

    session.join("Alice".to_string());
    assert!(session.is_started());
    assert!(!session.is_ready());
    assert_eq!(session.participant_one().map(|p| p.name.as_str()), Some("Alice"));

    session.join("Bob".to_string());
    assert!(session.is_ready());
    assert!(!session.is_finished());
    assert_eq!(session.snapshot().session_id, SessionId(7));
}

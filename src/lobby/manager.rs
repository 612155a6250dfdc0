use crate::Millis;
use crate::NAME_MAX_CHARS;
use crate::NAME_MIN_CHARS;
use crate::Unique;
use crate::engine::Effect;
use crate::events::ActionError;
use crate::events::ErrorCode;
use crate::events::GameStateView;
use crate::events::GameSummary;
use crate::events::LeaveReason;
use crate::events::PlayerPublic;
use crate::events::ServerMessage;
use crate::state::ConnId;
use crate::state::Player;
use crate::state::PlayerId;
use crate::state::RoomState;
use crate::state::Session;
use crate::state::SessionId;
use crate::store::Sessions;

/// Collapses inner whitespace and enforces the 3–20 letters, digits
/// and spaces rule.
pub fn normalize_name(raw: &str) -> Result<String, ActionError> {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars = name.chars().count();
    let legal = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ');
    if chars < NAME_MIN_CHARS || chars > NAME_MAX_CHARS || !legal {
        return Err(ActionError::new(
            ErrorCode::InvalidName,
            "display names are 3-20 letters, digits, and spaces",
        ));
    }
    Ok(name)
}

/// Enforces the host invariant: the seated player with the lowest
/// join time among those connected, falling back to the lowest join
/// time overall. Returns the elected host, if any.
pub fn elect_host(rs: &mut RoomState) -> Option<PlayerId> {
    let mut seated: Vec<(PlayerId, Millis, bool)> = rs
        .room
        .seated()
        .iter()
        .filter_map(|id| rs.players.get(id))
        .map(|p| (p.id(), p.joined_at(), p.is_connected()))
        .collect();
    seated.sort_by_key(|(_, joined, _)| *joined);
    let host = seated
        .iter()
        .find(|(_, _, connected)| *connected)
        .or_else(|| seated.first())
        .map(|(id, _, _)| *id);
    for player in rs.players.values_mut() {
        player.set_host(Some(player.id()) == host);
    }
    host
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub player: PlayerId,
    pub session: SessionId,
    pub effects: Vec<Effect>,
}

/// Seats (or spectates) a new player and mints their session.
pub fn join(
    rs: &mut RoomState,
    sessions: &mut Sessions,
    raw_name: &str,
    spectator: bool,
    conn: ConnId,
    now: Millis,
) -> Result<JoinOutcome, ActionError> {
    let name = normalize_name(raw_name)?;
    if !spectator && rs.room.is_full() {
        return Err(ActionError::new(ErrorCode::RoomFull, "room is full"));
    }
    if !spectator && rs.room.is_playing() {
        return Err(ActionError::new(
            ErrorCode::RoomInProgress,
            "a game is in progress; join as a spectator",
        ));
    }
    let taken = rs
        .players
        .values()
        .any(|p| p.display_name().eq_ignore_ascii_case(&name));
    if taken {
        return Err(ActionError::new(
            ErrorCode::NameTaken,
            "that name is already in use in this room",
        ));
    }
    let lives = rs.room.settings().starting_lives;
    let player = Player::new(name, rs.room.id().clone(), conn, lives, spectator, now);
    let id = player.id();
    if spectator {
        rs.room.spectate(id);
    } else {
        rs.room.seat(id);
    }
    rs.room.touch(now);
    rs.players.insert(id, player);
    elect_host(rs);
    let session = sessions.create(Session::new(id, rs.room.id().clone()));
    log::info!(
        "[room {}] {} joined as {}",
        rs.room.id(),
        rs.display_name(id),
        if spectator { "spectator" } else { "player" }
    );
    let public = PlayerPublic::from(rs.player(id).expect("player just inserted"));
    let announce = if spectator {
        ServerMessage::SpectatorJoined { player: public }
    } else {
        ServerMessage::PlayerJoined { player: public }
    };
    let effects = vec![
        Effect::Unicast(id, room_joined(rs, id, session)),
        Effect::Broadcast(announce),
    ];
    Ok(JoinOutcome {
        player: id,
        session,
        effects,
    })
}

/// Transport dropped: start the grace window and keep the seat.
pub fn disconnect(
    rs: &mut RoomState,
    sessions: &mut Sessions,
    player: PlayerId,
    now: Millis,
) -> Vec<Effect> {
    if let Some(session) = sessions.find_by_player(player) {
        if let Some(session) = sessions.get_mut(session) {
            session.disconnect(now);
        }
    }
    if let Some(p) = rs.player_mut(player) {
        p.disconnect(now);
        log::info!("[room {}] {} disconnected", rs.room.id(), player);
    }
    elect_host(rs);
    Vec::new()
}

/// How a reconnect attempt resolved. An expired session removes the
/// player as a side effect, so that arm carries room notifications.
pub enum Reconnection {
    Resumed {
        player: PlayerId,
        effects: Vec<Effect>,
    },
    Expired {
        error: ActionError,
        effects: Vec<Effect>,
    },
    Unknown {
        error: ActionError,
    },
}

/// Rebinds a session to a fresh transport within the grace window.
pub fn reconnect(
    rs: &mut RoomState,
    sessions: &mut Sessions,
    session_id: SessionId,
    conn: ConnId,
    now: Millis,
) -> Reconnection {
    let session = match sessions.get(session_id) {
        Some(session) => session,
        None => {
            return Reconnection::Unknown {
                error: ActionError::new(ErrorCode::SessionNotFound, "unknown session"),
            };
        }
    };
    let player = session.player();
    if session.is_expired(now) {
        let effects = remove_player(rs, sessions, player, LeaveReason::Disconnected, now);
        return Reconnection::Expired {
            error: ActionError::new(ErrorCode::SessionExpired, "session expired"),
            effects,
        };
    }
    if rs.player(player).is_none() {
        // session outlived its player somehow; treat as invalid
        sessions.remove(session_id);
        return Reconnection::Unknown {
            error: ActionError::new(ErrorCode::SessionInvalidState, "session has no player"),
        };
    }
    sessions
        .get_mut(session_id)
        .expect("session checked above")
        .reconnect();
    let spectator = {
        let p = rs.player_mut(player).expect("player checked above");
        p.reconnect(conn, now);
        p.is_spectator()
    };
    elect_host(rs);
    log::info!("[room {}] {} reconnected", rs.room.id(), player);
    let mut effects = vec![
        Effect::Unicast(player, ServerMessage::reconnected()),
        Effect::Unicast(player, room_joined(rs, player, session_id)),
    ];
    if let Some(game) = rs.game.as_ref().filter(|g| !g.is_completed()) {
        effects.push(Effect::Unicast(
            player,
            ServerMessage::GameStateUpdate {
                game_state: GameStateView::redacted(game, now),
                your_player_id: player,
                last_update_time: now,
            },
        ));
        if !spectator {
            if let Some((deadline, duration)) = game.turn_deadline {
                if let Some(current) = game.current_player() {
                    effects.push(Effect::Unicast(
                        player,
                        ServerMessage::TurnTimerUpdate {
                            room_id: rs.room.id().clone(),
                            game_id: game.id(),
                            player_id: current,
                            phase: game.phase,
                            deadline,
                            duration,
                        },
                    ));
                }
            }
            if let Some(deal) = rs.cards_dealt_for(player) {
                effects.push(Effect::Unicast(player, deal));
            }
        }
    }
    if let Some(cached) = rs.sync.take_fresh(player, now) {
        effects.push(Effect::Unicast(
            player,
            ServerMessage::ActionSync {
                action: cached.action,
                payload: cached.payload,
                metadata: serde_json::json!({ "auto": cached.auto }),
                status: "applied".to_string(),
                recorded_at: cached.recorded_at,
            },
        ));
    }
    Reconnection::Resumed { player, effects }
}

/// Voluntary leave: seat and session are gone immediately.
pub fn leave(
    rs: &mut RoomState,
    sessions: &mut Sessions,
    player: PlayerId,
    now: Millis,
) -> Vec<Effect> {
    let mut effects = vec![Effect::Unicast(player, ServerMessage::RoomLeft)];
    effects.extend(remove_player(rs, sessions, player, LeaveReason::Left, now));
    effects
}

/// Removes players whose sessions lapsed. Runs both on the periodic
/// sweep and at every mutation entry point.
pub fn sweep(rs: &mut RoomState, sessions: &mut Sessions, now: Millis) -> Vec<Effect> {
    let mut effects = Vec::new();
    for session_id in sessions.expired_in_room(rs.room.id(), now) {
        if let Some(session) = sessions.get(session_id) {
            let player = session.player();
            log::info!("[room {}] session {} expired", rs.room.id(), session_id);
            effects.extend(remove_player(
                rs,
                sessions,
                player,
                LeaveReason::Disconnected,
                now,
            ));
        }
    }
    effects
}

/// Shared removal path for leave, expiry, and failed reconnects.
fn remove_player(
    rs: &mut RoomState,
    sessions: &mut Sessions,
    player: PlayerId,
    reason: LeaveReason,
    now: Millis,
) -> Vec<Effect> {
    if let Some(session) = sessions.find_by_player(player) {
        sessions.remove(session);
    }
    let removed = match rs.players.remove(&player) {
        Some(p) => p,
        None => return Vec::new(),
    };
    let spectator = removed.is_spectator();
    rs.room.evict(player);
    rs.room.touch(now);
    elect_host(rs);
    log::info!(
        "[room {}] {} left ({:?})",
        rs.room.id(),
        removed.display_name(),
        reason
    );
    let mut effects = vec![Effect::Broadcast(if spectator {
        ServerMessage::SpectatorLeft {
            player_id: player,
            display_name: removed.display_name().to_string(),
        }
    } else {
        ServerMessage::PlayerLeft {
            player_id: player,
            display_name: removed.display_name().to_string(),
            reason,
        }
    })];
    effects.extend(rs.handle_departure(player, now));
    effects
}

/// The private join/reconnect confirmation with the full room picture.
fn room_joined(rs: &RoomState, player: PlayerId, session: SessionId) -> ServerMessage {
    let me = rs.player(player);
    ServerMessage::RoomJoined {
        room_id: rs.room.id().clone(),
        player_id: player,
        session_id: session,
        is_host: me.map(|p| p.is_host()).unwrap_or(false),
        is_spectator: me.map(|p| p.is_spectator()).unwrap_or(false),
        current_players: rs
            .room
            .seated()
            .iter()
            .filter_map(|id| rs.players.get(id))
            .map(PlayerPublic::from)
            .collect(),
        spectators: rs
            .room
            .spectators()
            .iter()
            .filter_map(|id| rs.players.get(id))
            .map(PlayerPublic::from)
            .collect(),
        host_settings: rs.room.settings().clone(),
        chat_messages: rs.room.chat().entries().cloned().collect(),
        game_state: rs
            .game
            .as_ref()
            .filter(|g| !g.is_completed())
            .map(GameSummary::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SESSION_GRACE_MS;
    use crate::state::Phase;
    use crate::state::Room;
    use crate::state::RoomId;

    fn fresh_room() -> RoomState {
        RoomState::new(Room::new(RoomId::from("itajuba"), "Itajubá".into(), 0))
    }

    fn join_ok(
        rs: &mut RoomState,
        sessions: &mut Sessions,
        name: &str,
        at: Millis,
    ) -> JoinOutcome {
        join(rs, sessions, name, false, ConnId::default(), at).expect("join")
    }

    #[test]
    fn names_collapse_and_validate() {
        assert_eq!(normalize_name("  Ana   Clara  ").expect("ok"), "Ana Clara");
        assert!(normalize_name("ab").is_err());
        assert!(normalize_name(&"x".repeat(21)).is_err());
        assert!(normalize_name("bad<name>").is_err());
        assert!(normalize_name("açaí").is_err());
    }

    #[test]
    fn join_enforces_capacity_name_and_status() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        join_ok(&mut rs, &mut sessions, "Ana", 1);
        let err = join(&mut rs, &mut sessions, "ana", false, ConnId::default(), 2)
            .expect_err("case-insensitive collision");
        assert_eq!(err.code, ErrorCode::NameTaken);
        for i in 0..9 {
            join_ok(&mut rs, &mut sessions, &format!("Player {}", i), 3 + i);
        }
        let err = join(&mut rs, &mut sessions, "Overflow", false, ConnId::default(), 20)
            .expect_err("room full");
        assert_eq!(err.code, ErrorCode::RoomFull);
        // spectators are unbounded
        let outcome = join(&mut rs, &mut sessions, "Watcher", true, ConnId::default(), 21)
            .expect("spectator");
        assert!(rs.players[&outcome.player].is_spectator());
    }

    #[test]
    fn playing_rooms_admit_only_spectators() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        join_ok(&mut rs, &mut sessions, "Ana", 1);
        rs.room.set_status(crate::state::RoomStatus::Playing);
        let err = join(&mut rs, &mut sessions, "Late Guy", false, ConnId::default(), 22)
            .expect_err("in progress");
        assert_eq!(err.code, ErrorCode::RoomInProgress);
        assert!(join(&mut rs, &mut sessions, "Late Guy", true, ConnId::default(), 23).is_ok());
    }

    #[test]
    fn host_follows_join_order_and_connectivity() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let first = join_ok(&mut rs, &mut sessions, "First", 1).player;
        let second = join_ok(&mut rs, &mut sessions, "Second", 2).player;
        assert!(rs.players[&first].is_host());
        assert!(!rs.players[&second].is_host());
        // host drops: earliest-joined connected player takes over
        disconnect(&mut rs, &mut sessions, first, 10);
        assert!(rs.players[&second].is_host());
        // host returns: seniority wins again
        let session = sessions.find_by_player(first).expect("session");
        match reconnect(&mut rs, &mut sessions, session, ConnId::default(), 20) {
            Reconnection::Resumed { player, .. } => assert_eq!(player, first),
            _ => panic!("expected resume"),
        }
        assert!(rs.players[&first].is_host());
        assert!(!rs.players[&second].is_host());
    }

    #[test]
    fn disconnect_preserves_seat_and_session() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let outcome = join_ok(&mut rs, &mut sessions, "Ana", 1);
        disconnect(&mut rs, &mut sessions, outcome.player, 5);
        assert!(rs.room.seated().contains(&outcome.player));
        assert!(!rs.players[&outcome.player].is_connected());
        let session = sessions.get(outcome.session).expect("kept");
        assert_eq!(session.expires_at(), Some(5 + SESSION_GRACE_MS));
    }

    #[test]
    fn sweep_removes_lapsed_sessions() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let gone = join_ok(&mut rs, &mut sessions, "Gone", 1);
        let kept = join_ok(&mut rs, &mut sessions, "Kept", 2);
        disconnect(&mut rs, &mut sessions, gone.player, 10);
        let effects = sweep(&mut rs, &mut sessions, 10 + SESSION_GRACE_MS);
        assert!(rs.players.get(&gone.player).is_none());
        assert!(sessions.get(gone.session).is_none());
        assert!(rs.players.get(&kept.player).is_some());
        let left = effects
            .iter()
            .filter_map(Effect::as_broadcast)
            .find_map(|m| match m {
                ServerMessage::PlayerLeft {
                    player_id, reason, ..
                } => Some((*player_id, *reason)),
                _ => None,
            })
            .expect("player_left");
        assert_eq!(left.0, gone.player);
        assert!(matches!(left.1, LeaveReason::Disconnected));
    }

    #[test]
    fn reconnect_unknown_and_expired() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        match reconnect(
            &mut rs,
            &mut sessions,
            crate::state::SessionId::default(),
            ConnId::default(),
            1,
        ) {
            Reconnection::Unknown { error } => {
                assert_eq!(error.code, ErrorCode::SessionNotFound)
            }
            _ => panic!("expected unknown"),
        }
        let outcome = join_ok(&mut rs, &mut sessions, "Ana", 1);
        disconnect(&mut rs, &mut sessions, outcome.player, 10);
        match reconnect(
            &mut rs,
            &mut sessions,
            outcome.session,
            ConnId::default(),
            10 + SESSION_GRACE_MS,
        ) {
            Reconnection::Expired { error, effects } => {
                assert_eq!(error.code, ErrorCode::SessionExpired);
                assert!(effects
                    .iter()
                    .filter_map(Effect::as_broadcast)
                    .any(|m| matches!(m, ServerMessage::PlayerLeft { .. })));
            }
            _ => panic!("expected expiry"),
        }
        assert!(rs.players.get(&outcome.player).is_none());
    }

    /// Reconnect mid-bid: the player gets status, the room picture, a
    /// redacted game snapshot, the live turn deadline, and their hand.
    #[test]
    fn reconnect_mid_bid_replays_game_context() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let a = join_ok(&mut rs, &mut sessions, "Ana", 1);
        let b = join_ok(&mut rs, &mut sessions, "Bia", 2);
        rs.start_game(a.player, None, 100).expect("start");
        rs.submit_bid(a.player, 0, 200).expect("ana bids");
        disconnect(&mut rs, &mut sessions, b.player, 300);
        let effects = match reconnect(&mut rs, &mut sessions, b.session, ConnId::default(), 400)
        {
            Reconnection::Resumed { effects, .. } => effects,
            _ => panic!("expected resume"),
        };
        let mine: Vec<&ServerMessage> = effects
            .iter()
            .filter_map(Effect::as_unicast)
            .filter(|(to, _)| *to == b.player)
            .map(|(_, m)| m)
            .collect();
        assert!(matches!(mine[0], ServerMessage::ConnectionStatus { .. }));
        assert!(matches!(mine[1], ServerMessage::RoomJoined { .. }));
        let view = mine
            .iter()
            .find_map(|m| match m {
                ServerMessage::GameStateUpdate { game_state, .. } => Some(game_state),
                _ => None,
            })
            .expect("game_state_update");
        assert_eq!(view.phase, Phase::Bidding);
        assert_eq!(view.current_player, Some(b.player));
        assert!(mine
            .iter()
            .any(|m| matches!(m, ServerMessage::TurnTimerUpdate { .. })));
        assert!(mine
            .iter()
            .any(|m| matches!(m, ServerMessage::CardsDealt { .. })));
    }

    #[test]
    fn action_sync_replays_once_within_ttl() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let a = join_ok(&mut rs, &mut sessions, "Ana", 1);
        let b = join_ok(&mut rs, &mut sessions, "Bia", 2);
        rs.start_game(a.player, None, 100).expect("start");
        rs.submit_bid(a.player, 0, 200).expect("ana bids");
        disconnect(&mut rs, &mut sessions, a.player, 300);
        let effects = match reconnect(&mut rs, &mut sessions, a.session, ConnId::default(), 500)
        {
            Reconnection::Resumed { effects, .. } => effects,
            _ => panic!("expected resume"),
        };
        let replay = effects
            .iter()
            .filter_map(Effect::as_unicast)
            .find_map(|(_, m)| match m {
                ServerMessage::ActionSync {
                    action,
                    recorded_at,
                    ..
                } => Some((action.clone(), *recorded_at)),
                _ => None,
            })
            .expect("action_sync");
        assert_eq!(replay.0, "submit_bid");
        assert_eq!(replay.1, 200);
        // cache cleared: a second reconnect replays nothing
        disconnect(&mut rs, &mut sessions, a.player, 600);
        let effects = match reconnect(&mut rs, &mut sessions, a.session, ConnId::default(), 700)
        {
            Reconnection::Resumed { effects, .. } => effects,
            _ => panic!("expected resume"),
        };
        assert!(!effects
            .iter()
            .filter_map(Effect::as_unicast)
            .any(|(_, m)| matches!(m, ServerMessage::ActionSync { .. })));
        let _ = b;
    }

    #[test]
    fn voluntary_leave_mid_game_completes_it() {
        let mut rs = fresh_room();
        let mut sessions = Sessions::default();
        let a = join_ok(&mut rs, &mut sessions, "Ana", 1);
        let b = join_ok(&mut rs, &mut sessions, "Bia", 2);
        rs.start_game(a.player, None, 100).expect("start");
        let effects = leave(&mut rs, &mut sessions, b.player, 200);
        assert!(matches!(
            effects[0],
            Effect::Unicast(to, ServerMessage::RoomLeft) if to == b.player
        ));
        assert!(rs.players.get(&b.player).is_none());
        assert!(sessions.find_by_player(b.player).is_none());
        assert!(effects
            .iter()
            .filter_map(Effect::as_broadcast)
            .any(|m| matches!(m, ServerMessage::GameCompleted { .. })));
        assert!(!rs.room.is_playing());
    }
}

use crate::GAME_TICK_MS;
use crate::Millis;
use crate::STARTING_LIVES_MAX;
use crate::TURN_TIMER_MAX_SECS;
use crate::TURN_TIMER_MIN_SECS;
use crate::config::Config;
use crate::engine::Effect;
use crate::events::ActionError;
use crate::events::ClientMessage;
use crate::events::ErrorCode;
use crate::events::Fanout;
use crate::events::ServerMessage;
use crate::lobby;
use crate::lobby::Reconnection;
use crate::now_ms;
use crate::state::ChatEntry;
use crate::state::ChatKind;
use crate::state::ChatMessageId;
use crate::state::ConnId;
use crate::state::PlayerId;
use crate::state::Room;
use crate::state::RoomId;
use crate::state::RoomState;
use crate::state::SessionId;
use crate::state::sanitize;
use crate::store::Sessions;
use crate::store::SnapshotDoc;
use crate::store::SnapshotWriter;
use crate::timers::TimerHandles;
use crate::Unique;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Everything one room owns, behind a single lock.
#[derive(Debug)]
pub struct RoomCell {
    pub state: RoomState,
    pub fanout: Fanout,
    pub timers: TimerHandles,
}

impl RoomCell {
    fn new(state: RoomState) -> Self {
        Self {
            state,
            fanout: Fanout::default(),
            timers: TimerHandles::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    room: RoomId,
    player: PlayerId,
    session: SessionId,
}

#[derive(Debug)]
struct ConnEntry {
    tx: UnboundedSender<String>,
    binding: Option<Binding>,
}

/// Timer callbacks re-enter the engine through these.
enum TimerFire {
    Turn(u64),
    TrickGap(u64),
    RoundGap(u64),
    GameDeadline,
    GameTick,
}

/// The process-wide world: the fixed room set, the session
/// side-table, live connections, and the snapshot writer. Holds a
/// weak self-reference so scheduled tasks can re-enter the dispatch
/// layer without keeping the world alive on their own.
pub struct World {
    me: std::sync::Weak<World>,
    rooms: HashMap<RoomId, Arc<Mutex<RoomCell>>>,
    sessions: Mutex<Sessions>,
    conns: StdMutex<HashMap<ConnId, ConnEntry>>,
    snapshots: SnapshotWriter,
    config: Config,
    started_at: Millis,
}

impl World {
    /// Builds the fixed room set and restores the snapshot unless
    /// running ephemeral.
    pub fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let now = now_ms();
        let mut rooms = HashMap::new();
        for id in config.rooms.iter() {
            let room_id = RoomId::from(id.as_str());
            let room = Room::new(
                room_id.clone(),
                Config::room_display_name(id),
                now,
            );
            rooms.insert(
                room_id,
                Arc::new(Mutex::new(RoomCell::new(RoomState::new(room)))),
            );
        }
        let world = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            rooms,
            sessions: Mutex::new(Sessions::default()),
            conns: StdMutex::new(HashMap::new()),
            snapshots: SnapshotWriter::new(config.snapshot_path.clone()),
            config,
            started_at: now,
        });
        if !world.config.ephemeral {
            if let Some(doc) = SnapshotWriter::load(&world.config.snapshot_path)? {
                world.restore(doc, now);
            }
        }
        Ok(world)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn started_at(&self) -> Millis {
        self.started_at
    }

    pub fn rooms(&self) -> &HashMap<RoomId, Arc<Mutex<RoomCell>>> {
        &self.rooms
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Rehydrates entities from a snapshot. Transports are gone, so
    /// every restored player and session starts its grace window now;
    /// game timers stay unarmed until the first intent touches the
    /// room.
    fn restore(&self, doc: SnapshotDoc, now: Millis) {
        log::info!(
            "restoring snapshot from {} ({} players, {} sessions)",
            doc.saved_at,
            doc.players.len(),
            doc.sessions.len()
        );
        for room in doc.rooms {
            if let Some(cell) = self.rooms.get(room.id()) {
                cell.try_lock().expect("exclusive at startup").state.room = room;
            }
        }
        for mut player in doc.players {
            if let Some(cell) = self.rooms.get(player.room()) {
                player.disconnect(now);
                cell.try_lock()
                    .expect("exclusive at startup")
                    .state
                    .players
                    .insert(player.id(), player);
            }
        }
        for game in doc.games {
            if let Some(cell) = self.rooms.get(game.room()) {
                cell.try_lock().expect("exclusive at startup").state.game = Some(game);
            }
        }
        let mut sessions = self.sessions.try_lock().expect("exclusive at startup");
        for mut session in doc.sessions {
            if self.rooms.contains_key(session.room()) {
                if session.expires_at().is_none() {
                    session.disconnect(now);
                }
                sessions.restore(vec![session]);
            }
        }
    }

    /// Serializes the world and writes it atomically. Room locks are
    /// held only while cloning entities, not across the file write.
    pub async fn persist(&self, reason: &str) -> anyhow::Result<()> {
        if self.config.ephemeral {
            return Ok(());
        }
        let mut doc = SnapshotDoc::new(reason, now_ms());
        for cell in self.rooms.values() {
            let cell = cell.lock().await;
            doc.rooms.push(cell.state.room.clone());
            doc.players.extend(cell.state.players.values().cloned());
            if let Some(game) = cell.state.game.as_ref() {
                doc.games.push(game.clone());
            }
        }
        doc.sessions = self.sessions.lock().await.list().cloned().collect();
        self.snapshots.persist(&doc).await
    }

    /// Periodic expiry sweep across every room.
    pub async fn sweep_all(&self) {
        let now = now_ms();
        for (room_id, cell) in self.rooms.iter() {
            let mut cell = cell.lock().await;
            let mut sessions = self.sessions.lock().await;
            let effects = lobby::sweep(&mut cell.state, &mut sessions, now);
            drop(sessions);
            self.interpret(room_id, &mut cell, effects);
        }
    }
}

impl World {
    /// A socket opened. Registers the outbox and either resumes the
    /// carried session or greets a fresh connection.
    pub async fn handle_connect(
        &self,
        conn: ConnId,
        resume: Option<SessionId>,
        tx: UnboundedSender<String>,
    ) {
        self.conns.lock().expect("conns lock").insert(
            conn,
            ConnEntry {
                tx: tx.clone(),
                binding: None,
            },
        );
        let session_id = match resume {
            Some(session_id) => session_id,
            None => {
                let _ = tx.send(ServerMessage::connected().to_json());
                return;
            }
        };
        let room_id = {
            let sessions = self.sessions.lock().await;
            sessions.get(session_id).map(|s| s.room().clone())
        };
        let Some(room_id) = room_id else {
            let _ = tx.send(
                ServerMessage::join_error(ActionError::new(
                    ErrorCode::SessionNotFound,
                    "unknown session",
                ))
                .to_json(),
            );
            return;
        };
        let Some(cell) = self.rooms.get(&room_id) else {
            return;
        };
        let now = now_ms();
        let mut cell = cell.lock().await;
        let mut sessions = self.sessions.lock().await;
        // reconnect first so a lapsed session still reports
        // session_expired rather than vanishing in the sweep
        let outcome = lobby::reconnect(&mut cell.state, &mut sessions, session_id, conn, now);
        let sweep_effects = lobby::sweep(&mut cell.state, &mut sessions, now);
        match outcome {
            Reconnection::Resumed { player, effects } => {
                drop(sessions);
                cell.fanout.attach(player, conn, tx);
                self.bind(conn, room_id.clone(), player, session_id);
                self.rearm_game_clock_if_needed(&room_id, &mut cell);
                self.interpret(&room_id, &mut cell, sweep_effects);
                self.interpret(&room_id, &mut cell, effects);
            }
            Reconnection::Expired { error, effects } => {
                drop(sessions);
                self.interpret(&room_id, &mut cell, sweep_effects);
                self.interpret(&room_id, &mut cell, effects);
                let _ = tx.send(ServerMessage::join_error(error).to_json());
            }
            Reconnection::Unknown { error } => {
                drop(sessions);
                self.interpret(&room_id, &mut cell, sweep_effects);
                let _ = tx.send(ServerMessage::join_error(error).to_json());
            }
        }
    }

    /// A raw frame arrived on a connection.
    pub async fn handle_message(&self, conn: ConnId, text: &str) {
        let intent: ClientMessage = match serde_json::from_str(text) {
            Ok(intent) => intent,
            Err(e) => {
                log::debug!("malformed intent from {}: {}", conn, e);
                self.send_to_conn(
                    conn,
                    ServerMessage::action_error(
                        "unknown",
                        ActionError::new(ErrorCode::InvalidMessage, "malformed payload"),
                    ),
                );
                return;
            }
        };
        match intent {
            ClientMessage::JoinRoom {
                room_id,
                display_name,
                spectator,
            } => self.join_room(conn, &room_id, &display_name, spectator).await,
            other => self.room_intent(conn, other).await,
        }
    }

    /// The transport dropped (close frame, error, or EOF).
    pub async fn handle_close(&self, conn: ConnId) {
        let binding = {
            let mut conns = self.conns.lock().expect("conns lock");
            conns.remove(&conn).and_then(|entry| entry.binding)
        };
        let Some(binding) = binding else { return };
        let Some(cell) = self.rooms.get(&binding.room) else {
            return;
        };
        let now = now_ms();
        let mut cell = cell.lock().await;
        cell.fanout.detach(binding.player, conn);
        // a newer transport may have superseded this one already
        let stale = cell
            .state
            .player(binding.player)
            .map(|p| p.transport() != Some(conn))
            .unwrap_or(true);
        if stale {
            return;
        }
        let mut sessions = self.sessions.lock().await;
        let effects = lobby::disconnect(&mut cell.state, &mut sessions, binding.player, now);
        drop(sessions);
        self.interpret(&binding.room, &mut cell, effects);
    }

    async fn join_room(
        &self,
        conn: ConnId,
        room_id: &str,
        display_name: &str,
        spectator: bool,
    ) {
        if self.binding_of(conn).is_some() {
            self.send_to_conn(
                conn,
                ServerMessage::join_error(ActionError::new(
                    ErrorCode::SessionInvalidState,
                    "already in a room",
                )),
            );
            return;
        }
        let Some(cell) = self.rooms.get(&RoomId::from(room_id)) else {
            self.send_to_conn(
                conn,
                ServerMessage::join_error(ActionError::new(
                    ErrorCode::RoomNotFound,
                    "no such room",
                )),
            );
            return;
        };
        let room_key = RoomId::from(room_id);
        let now = now_ms();
        let mut cell = cell.lock().await;
        let mut sessions = self.sessions.lock().await;
        let sweep_effects = lobby::sweep(&mut cell.state, &mut sessions, now);
        let outcome = lobby::join(&mut cell.state, &mut sessions, display_name, spectator, conn, now);
        drop(sessions);
        self.interpret(&room_key, &mut cell, sweep_effects);
        match outcome {
            Ok(outcome) => {
                let tx = {
                    let conns = self.conns.lock().expect("conns lock");
                    conns.get(&conn).map(|entry| entry.tx.clone())
                };
                if let Some(tx) = tx {
                    cell.fanout.attach(outcome.player, conn, tx);
                }
                self.bind(conn, room_key.clone(), outcome.player, outcome.session);
                self.rearm_game_clock_if_needed(&room_key, &mut cell);
                self.interpret(&room_key, &mut cell, outcome.effects);
            }
            Err(error) => self.send_to_conn(conn, ServerMessage::join_error(error)),
        }
    }

    /// Intents that require an established room binding.
    async fn room_intent(&self, conn: ConnId, intent: ClientMessage) {
        let action = intent.action();
        let Some(binding) = self.binding_of(conn) else {
            self.send_to_conn(
                conn,
                ServerMessage::action_error(
                    action,
                    ActionError::new(ErrorCode::RoomNotFound, "join a room first"),
                ),
            );
            return;
        };
        let Some(cell) = self.rooms.get(&binding.room) else {
            return;
        };
        let now = now_ms();
        let mut cell = cell.lock().await;
        let mut sessions = self.sessions.lock().await;
        let sweep_effects = lobby::sweep(&mut cell.state, &mut sessions, now);
        // the sweep may have removed the sender themselves
        if cell.state.player(binding.player).is_none() {
            drop(sessions);
            self.interpret(&binding.room, &mut cell, sweep_effects);
            self.unbind(conn);
            return;
        }
        self.rearm_game_clock_if_needed(&binding.room, &mut cell);
        let leaving = matches!(&intent, ClientMessage::LeaveRoom {});
        let result = match intent {
            ClientMessage::LeaveRoom {} => {
                let effects = lobby::leave(&mut cell.state, &mut sessions, binding.player, now);
                self.unbind(conn);
                Ok(effects)
            }
            ClientMessage::StartGame {} => cell.state.start_game(
                binding.player,
                Some(self.config.game_time_limit_ms),
                now,
            ),
            ClientMessage::SubmitBid { bid } => cell.state.submit_bid(binding.player, bid, now),
            ClientMessage::PlayCard { card } => match card.parse() {
                Some(card) => cell.state.play_card(binding.player, card, now),
                None => Err(ActionError::new(
                    ErrorCode::InvalidCard,
                    "unrecognized rank or suit",
                )),
            },
            ClientMessage::ChatMessage { message } => {
                Self::chat(&mut cell.state, binding.player, &message, now)
            }
            ClientMessage::UpdateHostSettings {
                allow_spectator_chat,
                turn_timer,
                starting_lives,
            } => Self::update_settings(
                &mut cell.state,
                binding.player,
                allow_spectator_chat,
                turn_timer,
                starting_lives,
                now,
            ),
            ClientMessage::JoinRoom { .. } => unreachable!("handled in handle_message"),
        };
        drop(sessions);
        self.interpret(&binding.room, &mut cell, sweep_effects);
        match result {
            Ok(effects) => {
                self.interpret(&binding.room, &mut cell, effects);
                if leaving {
                    cell.fanout.remove(binding.player);
                }
            }
            Err(error) => {
                cell.fanout
                    .unicast(binding.player, &ServerMessage::action_error(action, error));
            }
        }
    }
}

impl World {
    /// Room chat with throttle, sanitation, and the spectator toggle.
    fn chat(
        rs: &mut RoomState,
        sender: PlayerId,
        raw: &str,
        now: Millis,
    ) -> Result<Vec<Effect>, ActionError> {
        let (name, spectator) = match rs.player(sender) {
            Some(p) => (p.display_name().to_string(), p.is_spectator()),
            None => {
                return Err(ActionError::new(ErrorCode::InternalError, "sender unknown"));
            }
        };
        if spectator && !rs.room.settings().allow_spectator_chat {
            return Err(ActionError::new(
                ErrorCode::SpectatorChatDisabled,
                "spectator chat is disabled",
            ));
        }
        if rs.room.chat().throttled(sender, now) {
            return Err(ActionError::new(
                ErrorCode::InvalidMessage,
                "sending messages too quickly",
            ));
        }
        let message = sanitize(raw).ok_or_else(|| {
            ActionError::new(ErrorCode::InvalidMessage, "nothing to send")
        })?;
        let entry = ChatEntry {
            message_id: ChatMessageId::default(),
            player_id: Some(sender),
            display_name: name,
            message,
            timestamp: now,
            kind: if spectator {
                ChatKind::Spectator
            } else {
                ChatKind::Player
            },
            is_spectator: spectator,
        };
        rs.room.chat_mut().push(entry.clone());
        Ok(vec![Effect::Broadcast(ServerMessage::chat(entry))])
    }

    /// Host-only settings changes, allowed while the room waits.
    fn update_settings(
        rs: &mut RoomState,
        sender: PlayerId,
        allow_spectator_chat: Option<bool>,
        turn_timer: Option<i64>,
        starting_lives: Option<i64>,
        now: Millis,
    ) -> Result<Vec<Effect>, ActionError> {
        let host = rs
            .player(sender)
            .map(|p| p.is_host())
            .unwrap_or(false);
        if !host {
            return Err(ActionError::new(
                ErrorCode::NotHost,
                "only the host can change settings",
            ));
        }
        if rs.room.is_playing() {
            return Err(ActionError::new(
                ErrorCode::GameInProgress,
                "settings are locked while a game runs",
            ));
        }
        if let Some(timer) = turn_timer {
            if timer < TURN_TIMER_MIN_SECS as i64 || timer > TURN_TIMER_MAX_SECS as i64 {
                return Err(ActionError::new(
                    ErrorCode::OutOfRange,
                    format!(
                        "turn timer must be {}-{} seconds",
                        TURN_TIMER_MIN_SECS, TURN_TIMER_MAX_SECS
                    ),
                ));
            }
        }
        if let Some(lives) = starting_lives {
            if lives < 1 || lives > STARTING_LIVES_MAX as i64 {
                return Err(ActionError::new(
                    ErrorCode::OutOfRange,
                    format!("starting lives must be 1-{}", STARTING_LIVES_MAX),
                ));
            }
        }
        let mut effects = Vec::new();
        if let Some(allow) = allow_spectator_chat {
            let settings = rs.room.settings_mut();
            if settings.allow_spectator_chat != allow {
                settings.allow_spectator_chat = allow;
                let note = ChatEntry::system(
                    if allow {
                        "spectator chat enabled".to_string()
                    } else {
                        "spectator chat disabled".to_string()
                    },
                    now,
                );
                rs.room.chat_mut().push(note.clone());
                effects.push(Effect::Broadcast(ServerMessage::chat(note)));
            }
        }
        if let Some(timer) = turn_timer {
            rs.room.settings_mut().turn_timer_seconds = timer as u64;
        }
        if let Some(lives) = starting_lives {
            rs.room.settings_mut().starting_lives = lives as crate::Lives;
        }
        rs.room.touch(now);
        effects.push(Effect::Broadcast(ServerMessage::HostSettingsUpdated {
            room_id: rs.room.id().clone(),
            host_settings: rs.room.settings().clone(),
        }));
        Ok(effects)
    }
}

impl World {
    /// Applies the engine's effects: messages fan out immediately,
    /// timer effects become scheduled tasks that re-enter the engine.
    fn interpret(&self, room_id: &RoomId, cell: &mut RoomCell, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Broadcast(msg) => cell.fanout.broadcast(&msg),
                Effect::Unicast(player, msg) => cell.fanout.unicast(player, &msg),
                Effect::ArmTurn { serial, duration_ms } => {
                    cell.timers.set_turn(self.schedule(
                        room_id.clone(),
                        duration_ms,
                        TimerFire::Turn(serial),
                    ));
                }
                Effect::ArmTrickGap { serial } => {
                    cell.timers.set_trick_gap(self.schedule(
                        room_id.clone(),
                        self.config.trick_delay_ms,
                        TimerFire::TrickGap(serial),
                    ));
                }
                Effect::ArmRoundGap { serial, delay_ms } => {
                    cell.timers.set_round_gap(self.schedule(
                        room_id.clone(),
                        delay_ms,
                        TimerFire::RoundGap(serial),
                    ));
                }
                Effect::ArmGameClock => self.arm_game_clock(room_id, cell),
                Effect::CancelTimers => cell.timers.cancel_all(),
            }
        }
    }

    fn schedule(
        &self,
        room_id: RoomId,
        delay_ms: Millis,
        fire: TimerFire,
    ) -> tokio::task::JoinHandle<()> {
        let world = self.me.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            if let Some(world) = world.upgrade() {
                world.fire(room_id, fire).await;
            }
        })
    }

    async fn fire(&self, room_id: RoomId, fire: TimerFire) {
        let Some(cell) = self.rooms.get(&room_id) else {
            return;
        };
        let mut cell = cell.lock().await;
        let now = now_ms();
        let effects = match fire {
            TimerFire::Turn(serial) => cell.state.on_turn_timeout(serial, now),
            TimerFire::TrickGap(serial) => cell.state.open_next_trick(serial, now),
            TimerFire::RoundGap(serial) => cell.state.deal_next_round(serial, now),
            TimerFire::GameDeadline => cell.state.on_game_timeout(now),
            TimerFire::GameTick => cell.state.game_tick(now),
        };
        self.interpret(&room_id, &mut cell, effects);
    }

    fn arm_game_clock(&self, room_id: &RoomId, cell: &mut RoomCell) {
        let now = now_ms();
        let Some(game) = cell.state.game.as_ref().filter(|g| !g.is_completed()) else {
            return;
        };
        let remaining = game.remaining_ms(now);
        let deadline = self.schedule(room_id.clone(), remaining, TimerFire::GameDeadline);
        let world = self.me.clone();
        let room = room_id.clone();
        let tick = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_millis(GAME_TICK_MS));
            interval.tick().await; // first tick completes immediately
            loop {
                interval.tick().await;
                match world.upgrade() {
                    Some(world) => world.fire(room.clone(), TimerFire::GameTick).await,
                    None => break,
                }
            }
        });
        cell.timers.set_game_clock(deadline, tick);
    }

    /// Restored games come back with no scheduled tasks; the first
    /// intent that touches the room brings the game clock back.
    fn rearm_game_clock_if_needed(&self, room_id: &RoomId, cell: &mut RoomCell) {
        let active = cell
            .state
            .game
            .as_ref()
            .map(|g| !g.is_completed())
            .unwrap_or(false);
        if active && !cell.timers.game_clock_armed() {
            self.arm_game_clock(room_id, cell);
        }
    }
}

impl World {
    fn bind(&self, conn: ConnId, room: RoomId, player: PlayerId, session: SessionId) {
        if let Some(entry) = self.conns.lock().expect("conns lock").get_mut(&conn) {
            entry.binding = Some(Binding {
                room,
                player,
                session,
            });
        }
    }

    fn unbind(&self, conn: ConnId) {
        if let Some(entry) = self.conns.lock().expect("conns lock").get_mut(&conn) {
            entry.binding = None;
        }
    }

    fn binding_of(&self, conn: ConnId) -> Option<Binding> {
        self.conns
            .lock()
            .expect("conns lock")
            .get(&conn)
            .and_then(|entry| entry.binding.clone())
    }

    fn send_to_conn(&self, conn: ConnId, msg: ServerMessage) {
        if let Some(entry) = self.conns.lock().expect("conns lock").get(&conn) {
            let _ = entry.tx.send(msg.to_json());
        }
    }
}

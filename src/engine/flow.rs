use super::effect::Effect;
use crate::Bid;
use crate::Millis;
use crate::GAME_WARNING_MS;
use crate::MIN_PLAYERS_TO_START;
use crate::cards::Card;
use crate::cards::Deck;
use crate::events::ActionError;
use crate::events::AutoKind;
use crate::events::AutoReason;
use crate::events::BiddingMeta;
use crate::events::DealtCard;
use crate::events::ErrorCode;
use crate::events::GameClockStatus;
use crate::events::GameStats;
use crate::events::ServerMessage;
use crate::events::Standing;
use crate::events::VisibleCard;
use crate::rules;
use crate::state::EndReason;
use crate::state::GameRound;
use crate::state::GameSession;
use crate::state::Phase;
use crate::state::Play;
use crate::state::PlayerId;
use crate::state::RoomState;
use crate::state::RoomStatus;
use crate::state::RoundResult;
use crate::state::Trick;
use crate::Unique;
use std::collections::HashMap;

impl RoomState {
    /// Host starts a game from a waiting room with at least two
    /// connected seated players.
    pub fn start_game(
        &mut self,
        actor: PlayerId,
        time_limit_ms: Option<Millis>,
        now: Millis,
    ) -> Result<Vec<Effect>, ActionError> {
        let host = self
            .players
            .get(&actor)
            .map(|p| p.is_host())
            .unwrap_or(false);
        if !host {
            return Err(ActionError::new(
                ErrorCode::NotHost,
                "only the host can start the game",
            ));
        }
        if self.room.is_playing() {
            return Err(ActionError::new(
                ErrorCode::GameInProgress,
                "a game is already running in this room",
            ));
        }
        let order: Vec<PlayerId> = self
            .room
            .seated()
            .iter()
            .filter(|id| {
                self.players
                    .get(id)
                    .map(|p| p.is_connected() && !p.is_spectator())
                    .unwrap_or(false)
            })
            .copied()
            .collect();
        if order.len() < MIN_PLAYERS_TO_START {
            return Err(ActionError::new(
                ErrorCode::InsufficientPlayers,
                "need at least 2 connected players to start",
            ));
        }
        let game = GameSession::new(self.room.id().clone(), order.clone(), time_limit_ms, now);
        log::info!(
            "[room {}] game {} started with {} players",
            self.room.id(),
            game.id(),
            order.len()
        );
        let started = ServerMessage::GameStarted {
            game_id: game.id(),
            player_order: order,
            host_settings: self.room.settings().clone(),
        };
        self.game = Some(game);
        self.room.set_status(RoomStatus::Playing);
        self.room.touch(now);
        let mut effects = vec![Effect::Broadcast(started), Effect::ArmGameClock];
        effects.extend(self.deal_round(1, 1, now));
        Ok(effects)
    }

    /// A manual bid from the player at the turn cursor.
    pub fn submit_bid(
        &mut self,
        actor: PlayerId,
        bid: i64,
        now: Millis,
    ) -> Result<Vec<Effect>, ActionError> {
        let game = self
            .game
            .as_ref()
            .filter(|g| !g.is_completed())
            .ok_or_else(|| ActionError::new(ErrorCode::GameNotActive, "no active game"))?;
        if game.phase != Phase::Bidding {
            return Err(ActionError::new(
                ErrorCode::InvalidPhase,
                "bids are only accepted during the bidding phase",
            ));
        }
        if game.current_player() != Some(actor) {
            return Err(ActionError::new(
                ErrorCode::NotPlayersTurn,
                "it is not your turn to bid",
            ));
        }
        let round = game
            .current_round()
            .ok_or_else(|| ActionError::new(ErrorCode::InvalidRound, "no round in progress"))?;
        if round.bids.contains_key(&actor) {
            return Err(ActionError::new(ErrorCode::AlreadyBid, "bid already recorded"));
        }
        let options = rules::bid_options(
            round.card_count,
            &game.order,
            actor,
            &round.bids,
            round.blind,
        );
        if bid < 0 || bid > round.card_count as i64 {
            return Err(ActionError::new(
                ErrorCode::OutOfRange,
                format!("bid must be between 0 and {}", round.card_count),
            ));
        }
        let bid = bid as Bid;
        if !options.allows(bid) {
            return Err(ActionError::new(
                ErrorCode::LastBidderRestriction,
                "the last bidder may not make the bids add up to the card count",
            )
            .with_details(serde_json::json!({ "validBids": options.valid })));
        }
        Ok(self.apply_bid(actor, bid, false, now))
    }

    /// A manual play from the player at the turn cursor.
    pub fn play_card(
        &mut self,
        actor: PlayerId,
        card: Card,
        now: Millis,
    ) -> Result<Vec<Effect>, ActionError> {
        let game = self
            .game
            .as_ref()
            .filter(|g| !g.is_completed())
            .ok_or_else(|| ActionError::new(ErrorCode::GameNotActive, "no active game"))?;
        if game.phase != Phase::Playing {
            return Err(ActionError::new(
                ErrorCode::InvalidPhase,
                "cards are only accepted during the playing phase",
            ));
        }
        let trick = game
            .current_round()
            .and_then(|r| r.current_trick())
            .ok_or_else(|| ActionError::new(ErrorCode::InvalidRound, "no trick in progress"))?;
        if trick.is_closed() {
            return Err(ActionError::new(
                ErrorCode::InvalidPhase,
                "the next trick has not opened yet",
            ));
        }
        if game.current_player() != Some(actor) {
            return Err(ActionError::new(
                ErrorCode::NotPlayersTurn,
                "it is not your turn to play",
            ));
        }
        if trick.has_played(actor) {
            return Err(ActionError::new(
                ErrorCode::CardAlreadyPlayed,
                "you already played in this trick",
            ));
        }
        let holds = self
            .players
            .get(&actor)
            .map(|p| p.hand().contains(&card))
            .unwrap_or(false);
        if !holds {
            return Err(ActionError::new(
                ErrorCode::CardNotInHand,
                "that card is not in your hand",
            ));
        }
        Ok(self.apply_play(actor, card, false, now))
    }

    /// Timer callback: opens the next trick after the animation gap.
    /// Stale serials (or a phase that moved on) make this a no-op.
    pub fn open_next_trick(&mut self, serial: u64, now: Millis) -> Vec<Effect> {
        let game = match self.game.as_mut() {
            Some(g) if !g.is_completed() && g.turn_serial == serial && g.phase == Phase::Playing => g,
            _ => return Vec::new(),
        };
        let lead = match game.current_player() {
            Some(lead) => lead,
            None => return Vec::new(),
        };
        let number = match game.current_round() {
            Some(r) if r.current_trick().map(|t| t.is_closed()).unwrap_or(false)
                && r.tricks.len() < r.card_count =>
            {
                r.tricks.len() as u32 + 1
            }
            _ => return Vec::new(),
        };
        game.bump_serial();
        game.current_round_mut()
            .expect("round checked above")
            .tricks
            .push(Trick::open(number, lead));
        let mut effects = vec![Effect::Broadcast(ServerMessage::TrickStarted {
            trick_number: number,
            lead_player: lead,
        })];
        effects.extend(self.play_turn_effects(now));
        effects
    }

    /// Timer callback: deals the next round after the transition delay.
    pub fn deal_next_round(&mut self, serial: u64, now: Millis) -> Vec<Effect> {
        let (number, card_count) = match self.game.as_ref() {
            Some(g)
                if !g.is_completed() && g.turn_serial == serial && g.phase == Phase::Scoring =>
            {
                let prev = g.current_round().map(|r| r.card_count).unwrap_or(0);
                (
                    g.round + 1,
                    rules::next_card_count(prev, g.order.len()),
                )
            }
            _ => return Vec::new(),
        };
        self.deal_round(number, card_count, now)
    }

    /// Timer callback: the current turn ran out of time. Performs the
    /// automatic action on the player's behalf.
    pub fn on_turn_timeout(&mut self, serial: u64, now: Millis) -> Vec<Effect> {
        let game = match self.game.as_ref() {
            Some(g) if !g.is_completed() && g.turn_serial == serial => g,
            _ => return Vec::new(),
        };
        let actor = match game.current_player() {
            Some(actor) => actor,
            None => return Vec::new(),
        };
        match game.phase {
            Phase::Bidding => {
                let round = match game.current_round() {
                    Some(r) if !r.bids.contains_key(&actor) => r,
                    _ => return Vec::new(),
                };
                let options = rules::bid_options(
                    round.card_count,
                    &game.order,
                    actor,
                    &round.bids,
                    round.blind,
                );
                let bid = options.minimum();
                log::debug!("[room {}] auto-bid {} for {}", self.room.id(), bid, actor);
                let mut effects = vec![Effect::Broadcast(ServerMessage::AutoAction {
                    player_id: actor,
                    action: AutoKind::AutoBid,
                    value: serde_json::json!(bid),
                    reason: AutoReason::Timeout,
                })];
                effects.extend(self.apply_bid(actor, bid, true, now));
                effects
            }
            Phase::Playing => {
                let open = game
                    .current_round()
                    .and_then(|r| r.current_trick())
                    .map(|t| !t.is_closed() && !t.has_played(actor))
                    .unwrap_or(false);
                let card = match self.players.get(&actor).and_then(|p| p.hand().first()) {
                    Some(card) if open => *card,
                    _ => return Vec::new(),
                };
                log::debug!("[room {}] auto-play {} for {}", self.room.id(), card, actor);
                let mut effects = vec![Effect::Broadcast(ServerMessage::AutoAction {
                    player_id: actor,
                    action: AutoKind::AutoCard,
                    value: serde_json::to_value(card).expect("card serializes"),
                    reason: AutoReason::Timeout,
                })];
                effects.extend(self.apply_play(actor, card, true, now));
                effects
            }
            _ => Vec::new(),
        }
    }

    /// Periodic game-clock tick. Reports remaining time; completes
    /// the game if the deadline has already passed (covers clocks
    /// never rearmed after a restart).
    pub fn game_tick(&mut self, now: Millis) -> Vec<Effect> {
        let game = match self.game.as_ref() {
            Some(g) if !g.is_completed() => g,
            _ => return Vec::new(),
        };
        let remaining = game.remaining_ms(now);
        if remaining == 0 {
            return self.on_game_timeout(now);
        }
        let status = if remaining <= GAME_WARNING_MS {
            GameClockStatus::Warning
        } else {
            GameClockStatus::Running
        };
        vec![Effect::Broadcast(ServerMessage::GameTimerUpdate {
            remaining_ms: remaining,
            status,
        })]
    }

    /// The whole-game deadline fired.
    pub fn on_game_timeout(&mut self, now: Millis) -> Vec<Effect> {
        if !matches!(self.game.as_ref(), Some(g) if !g.is_completed()) {
            return Vec::new();
        }
        let mut effects = vec![Effect::Broadcast(ServerMessage::GameTimerUpdate {
            remaining_ms: 0,
            status: GameClockStatus::Expired,
        })];
        effects.extend(self.complete_game(EndReason::Timeout, now));
        effects
    }

    /// Idempotent game completion: cancels timers, fixes standings,
    /// reseats everyone, and returns the room to waiting.
    pub fn complete_game(&mut self, reason: EndReason, now: Millis) -> Vec<Effect> {
        let starting_lives = self.room.settings().starting_lives;
        let game = match self.game.as_mut() {
            Some(g) if !g.is_completed() => g,
            _ => return Vec::new(),
        };
        game.phase = Phase::Completed;
        game.ended_at = Some(now);
        game.reason = Some(reason);
        game.bump_serial();
        let remaining = game.remaining_ms(now);
        let participants = game.participants.clone();
        let mut standings: Vec<Standing> = participants
            .iter()
            .map(|id| Standing {
                player_id: *id,
                display_name: self
                    .players
                    .get(id)
                    .map(|p| p.display_name().to_string())
                    .unwrap_or_else(|| id.to_string()),
                lives_remaining: self.players.get(id).map(|p| p.lives()).unwrap_or(0),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.lives_remaining
                .cmp(&a.lives_remaining)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });
        let alive: Vec<&Standing> = standings.iter().filter(|s| s.lives_remaining > 0).collect();
        let winner = match (alive.as_slice(), reason) {
            (_, EndReason::Timeout) => None,
            ([only], _) => Some((*only).clone()),
            _ => None,
        };
        let game = self.game.as_mut().expect("game checked above");
        game.winner = winner.as_ref().map(|s| s.player_id);
        let stats = GameStats {
            rounds_played: game.round,
            duration_ms: now.saturating_sub(game.started_at),
        };
        log::info!(
            "[room {}] game {} completed ({:?})",
            self.room.id(),
            game.id(),
            reason
        );
        for id in participants.iter() {
            if let Some(player) = self.players.get_mut(id) {
                player.set_spectator(false);
                player.set_lives(starting_lives);
                player.deal(Vec::new());
                self.room.reseat(*id);
            }
        }
        self.room.set_status(RoomStatus::Waiting);
        self.room.touch(now);
        crate::lobby::elect_host(self);
        vec![
            Effect::CancelTimers,
            Effect::Broadcast(ServerMessage::GameCompleted {
                winner,
                final_standings: standings,
                game_stats: stats,
                reason,
            }),
            Effect::Broadcast(ServerMessage::GameTimerUpdate {
                remaining_ms: match reason {
                    EndReason::Timeout => 0,
                    _ => remaining,
                },
                status: GameClockStatus::Completed,
            }),
        ]
    }

    /// A player left the room (voluntarily or by session expiry)
    /// while a game may be running. Keeps the game coherent: drops
    /// them from the order, hands the turn onward, closes a trick
    /// they were the last holdout of, or completes the game when the
    /// table collapses.
    pub fn handle_departure(&mut self, player: PlayerId, now: Millis) -> Vec<Effect> {
        let game = match self.game.as_mut() {
            Some(g) if !g.is_completed() => g,
            _ => return Vec::new(),
        };
        if game.position_of(player).is_none() {
            return Vec::new();
        }
        game.drop_from_order(player);
        if game.order.len() <= 1 {
            return self.complete_game(EndReason::InsufficientPlayers, now);
        }
        // dropping from the order bumped the serial, so every pending
        // timer is now stale; each phase re-arms its own
        match game.phase {
            Phase::Bidding => {
                if game.all_bids_in() {
                    self.begin_playing(now)
                } else {
                    self.bidding_turn_effects(now)
                }
            }
            Phase::Playing => {
                let (closed, complete) = match game.current_round().and_then(|r| r.current_trick())
                {
                    Some(t) => (t.is_closed(), t.plays.len() >= game.order.len()),
                    None => return Vec::new(),
                };
                if closed {
                    let serial = game.turn_serial;
                    vec![Effect::ArmTrickGap { serial }]
                } else if complete {
                    self.close_trick(now)
                } else {
                    self.play_turn_effects(now)
                }
            }
            Phase::Scoring => {
                let serial = game.turn_serial;
                let delay_ms = self.room.settings().round_transition_delay_ms;
                vec![Effect::ArmRoundGap { serial, delay_ms }]
            }
            _ => Vec::new(),
        }
    }
}

impl RoomState {
    /// Shuffles, draws the vira, deals, and enters the bidding phase.
    fn deal_round(&mut self, number: u32, card_count: usize, now: Millis) -> Vec<Effect> {
        let game = self.game.as_mut().expect("deal_round requires a game");
        let mut deck = Deck::new();
        deck.shuffle();
        let (vira, manilha, mut stock) = deck.draw_vira();
        let hands = Deck::deal(&mut stock, game.order.len(), card_count);
        let mut round = GameRound::new(number, card_count, vira, manilha);
        for (id, hand) in game.order.iter().zip(hands.into_iter()) {
            round.hands.insert(*id, hand.clone());
            if let Some(player) = self.players.get_mut(id) {
                player.deal(hand);
            }
        }
        let blind = round.blind;
        game.rounds.push(round);
        game.round = number;
        game.phase = Phase::Bidding;
        game.cursor = 0;
        game.bump_serial();
        log::debug!(
            "[room {}] round {} dealt: {} cards, vira {}",
            self.room.id(),
            number,
            card_count,
            vira
        );
        let mut effects = vec![Effect::Broadcast(ServerMessage::RoundStarted {
            round_number: number,
            card_count,
            vira_card: vira,
            is_blind_round: blind,
        })];
        effects.extend(self.cards_dealt_effects());
        effects.extend(self.bidding_turn_effects(now));
        effects
    }

    /// Private deals for every player in the order.
    fn cards_dealt_effects(&self) -> Vec<Effect> {
        let order = match self.game.as_ref() {
            Some(g) => g.order.clone(),
            None => return Vec::new(),
        };
        order
            .iter()
            .filter_map(|id| {
                self.cards_dealt_for(*id)
                    .map(|msg| Effect::Unicast(*id, msg))
            })
            .collect()
    }

    /// The private deal for one player. In the blind round their own
    /// hand is masked and everyone else's cards ride along as visible
    /// cards; otherwise they see exactly their own hand. This is the
    /// only producer of private card payloads.
    pub fn cards_dealt_for(&self, id: PlayerId) -> Option<ServerMessage> {
        let game = self.game.as_ref().filter(|g| !g.is_completed())?;
        game.position_of(id)?;
        let round = game.current_round()?;
        let own = round.hands.get(&id).map(Vec::as_slice).unwrap_or(&[]);
        let (hand, visible) = if round.blind {
            let visible = game
                .order
                .iter()
                .filter(|other| **other != id)
                .flat_map(|other| {
                    let name = self.display_name(*other);
                    round
                        .hands
                        .get(other)
                        .map(Vec::as_slice)
                        .unwrap_or(&[])
                        .iter()
                        .map(move |card| VisibleCard {
                            owner_id: *other,
                            owner_display_name: name.clone(),
                            card: *card,
                        })
                })
                .collect();
            (own.iter().map(|_| DealtCard::hidden()).collect(), visible)
        } else {
            (
                own.iter().copied().map(DealtCard::shown).collect(),
                Vec::new(),
            )
        };
        Some(ServerMessage::CardsDealt {
            hand,
            visible_cards: visible,
        })
    }

    /// Announces the current bidder's options and arms their clock.
    fn bidding_turn_effects(&mut self, now: Millis) -> Vec<Effect> {
        let duration_ms = self.room.settings().turn_timer_clamped() * 1_000;
        let game = match self.game.as_mut() {
            Some(g) if g.phase == Phase::Bidding => g,
            _ => return Vec::new(),
        };
        let actor = match game.current_player() {
            Some(actor) => actor,
            None => return Vec::new(),
        };
        let (card_count, blind, options) = match game.current_round() {
            Some(r) => (
                r.card_count,
                r.blind,
                rules::bid_options(r.card_count, &game.order, actor, &r.bids, r.blind),
            ),
            None => return Vec::new(),
        };
        game.turn_deadline = Some((now + duration_ms, duration_ms));
        vec![
            Effect::Broadcast(ServerMessage::BiddingTurn {
                current_player: actor,
                valid_bids: options.valid,
                restricted_bid: options.forbidden,
                is_last_bidder: options.is_last_bidder,
                deadline: now + duration_ms,
                time_left: duration_ms,
                metadata: BiddingMeta {
                    is_blind_round: blind,
                    card_count,
                },
            }),
            Effect::ArmTurn {
                serial: game.turn_serial,
                duration_ms,
            },
        ]
    }

    /// Announces the current play turn's deadline and arms the clock.
    fn play_turn_effects(&mut self, now: Millis) -> Vec<Effect> {
        let duration_ms = self.room.settings().turn_timer_clamped() * 1_000;
        let room_id = self.room.id().clone();
        let game = match self.game.as_mut() {
            Some(g) if g.phase == Phase::Playing => g,
            _ => return Vec::new(),
        };
        let actor = match game.current_player() {
            Some(actor) => actor,
            None => return Vec::new(),
        };
        game.turn_deadline = Some((now + duration_ms, duration_ms));
        vec![
            Effect::Broadcast(ServerMessage::TurnTimerUpdate {
                room_id,
                game_id: game.id(),
                player_id: actor,
                phase: game.phase,
                deadline: now + duration_ms,
                duration: duration_ms,
            }),
            Effect::ArmTurn {
                serial: game.turn_serial,
                duration_ms,
            },
        ]
    }

    /// Records an accepted bid and either hands the turn onward or
    /// opens the first trick.
    fn apply_bid(&mut self, actor: PlayerId, bid: Bid, auto: bool, now: Millis) -> Vec<Effect> {
        let game = self.game.as_mut().expect("apply_bid requires a game");
        let round = game.current_round_mut().expect("round in progress");
        round.bids.insert(actor, bid);
        let all_bids = round.bids.clone();
        if let Some(player) = self.players.get_mut(&actor) {
            player.set_bid(bid);
        }
        self.sync
            .record(actor, "submit_bid", serde_json::json!({ "bid": bid }), auto, now);
        let game = self.game.as_mut().expect("game checked above");
        let mut effects = vec![Effect::Broadcast(ServerMessage::BidSubmitted {
            player_id: actor,
            bid,
            all_bids,
        })];
        if game.all_bids_in() {
            effects.extend(self.begin_playing(now));
        } else {
            game.advance_cursor();
            effects.extend(self.bidding_turn_effects(now));
        }
        effects
    }

    /// Transition bidding → playing: trick 1 opens with the first
    /// player in order as lead.
    fn begin_playing(&mut self, now: Millis) -> Vec<Effect> {
        let game = self.game.as_mut().expect("begin_playing requires a game");
        game.phase = Phase::Playing;
        game.cursor = 0;
        game.bump_serial();
        let lead = match game.current_player() {
            Some(lead) => lead,
            None => return Vec::new(),
        };
        game.current_round_mut()
            .expect("round in progress")
            .tricks
            .push(Trick::open(1, lead));
        let mut effects = vec![Effect::Broadcast(ServerMessage::TrickStarted {
            trick_number: 1,
            lead_player: lead,
        })];
        effects.extend(self.play_turn_effects(now));
        effects
    }

    /// Records an accepted play; advances the turn or closes the trick.
    fn apply_play(&mut self, actor: PlayerId, card: Card, auto: bool, now: Millis) -> Vec<Effect> {
        if let Some(player) = self.players.get_mut(&actor) {
            player.take_card(&card);
        }
        self.sync.record(
            actor,
            "play_card",
            serde_json::json!({ "card": card }),
            auto,
            now,
        );
        let game = self.game.as_mut().expect("apply_play requires a game");
        let order_len = game.order.len();
        let vira = game.current_round().expect("round in progress").vira.rank();
        let trick = game
            .current_round_mut()
            .and_then(|r| r.current_trick_mut())
            .expect("trick in progress");
        trick.plays.push(Play {
            player: actor,
            card,
            at: now,
        });
        let plays: Vec<(PlayerId, Card)> =
            trick.plays.iter().map(|p| (p.player, p.card)).collect();
        let complete = plays.len() >= order_len;
        let standing = rules::resolve(&plays, vira);
        if complete {
            let mut effects = vec![Effect::Broadcast(ServerMessage::CardPlayed {
                player_id: actor,
                card,
                next_player: None,
                current_leader: standing.winner,
                winning_card: standing.winning_card,
                cancelled_cards: standing.cancelled.clone(),
            })];
            effects.extend(self.close_trick(now));
            effects
        } else {
            let next = game.next_to_play();
            if let Some(next) = next {
                game.set_cursor_to(next);
            }
            let mut effects = vec![Effect::Broadcast(ServerMessage::CardPlayed {
                player_id: actor,
                card,
                next_player: next,
                current_leader: standing.winner,
                winning_card: standing.winning_card,
                cancelled_cards: standing.cancelled,
            })];
            effects.extend(self.play_turn_effects(now));
            effects
        }
    }

    /// Resolves the open trick, credits the winner, and either arms
    /// the trick gap or finalizes the round.
    fn close_trick(&mut self, now: Millis) -> Vec<Effect> {
        let game = self.game.as_mut().expect("close_trick requires a game");
        let vira = game.current_round().expect("round in progress").vira.rank();
        let card_count = game.current_round().expect("round in progress").card_count;
        let tricks_so_far = game.current_round().expect("round in progress").tricks.len();
        let trick = game
            .current_round_mut()
            .and_then(|r| r.current_trick_mut())
            .expect("trick in progress");
        let plays: Vec<(PlayerId, Card)> =
            trick.plays.iter().map(|p| (p.player, p.card)).collect();
        let outcome = rules::resolve(&plays, vira);
        trick.winner = outcome.winner;
        trick.cancelled = outcome.cancelled.clone();
        trick.completed_at = Some(now);
        let number = trick.number;
        let lead = trick.lead;
        let cards_played: HashMap<PlayerId, Card> = plays.iter().copied().collect();
        if let Some(winner) = outcome.winner {
            if let Some(player) = self.players.get_mut(&winner) {
                player.win_trick();
            }
        }
        let game = self.game.as_mut().expect("game checked above");
        game.set_cursor_to(outcome.winner.unwrap_or(lead));
        let more_tricks = tricks_so_far < card_count;
        let mut effects = vec![Effect::Broadcast(ServerMessage::TrickCompleted {
            trick_number: number,
            cards_played,
            winner: outcome.winner,
            cancelled_cards: outcome.cancelled,
            next_trick: more_tricks,
        })];
        if more_tricks {
            game.bump_serial();
            effects.push(Effect::ArmTrickGap {
                serial: game.turn_serial,
            });
        } else {
            effects.extend(self.finalize_round(now));
        }
        effects
    }

    /// Scores the round, applies life losses, eliminates the dead,
    /// and either schedules the next round or ends the game.
    fn finalize_round(&mut self, now: Millis) -> Vec<Effect> {
        let game = self.game.as_mut().expect("finalize_round requires a game");
        game.phase = Phase::Scoring;
        game.bump_serial();
        let order = game.order.clone();
        let round_number = game.round;
        let (bids, trick_winners): (HashMap<PlayerId, Bid>, Vec<Option<PlayerId>>) = {
            let round = game.current_round().expect("round in progress");
            (
                round.bids.clone(),
                round.tricks.iter().map(|t| t.winner).collect(),
            )
        };
        let mut results: HashMap<PlayerId, RoundResult> = HashMap::new();
        for id in order.iter() {
            let bid = bids.get(id).copied().unwrap_or(0);
            let actual = trick_winners.iter().filter(|w| **w == Some(*id)).count() as u8;
            let lost = rules::lives_lost(bid, actual);
            let remaining = match self.players.get_mut(id) {
                Some(player) => {
                    player.lose_lives(lost);
                    player.lives()
                }
                None => 0,
            };
            results.insert(
                *id,
                RoundResult {
                    bid,
                    actual,
                    lives_lost: lost,
                    lives_remaining: remaining,
                },
            );
        }
        let game = self.game.as_mut().expect("game checked above");
        game.current_round_mut()
            .expect("round in progress")
            .results = Some(results.clone());
        let eliminated: Vec<PlayerId> = order
            .iter()
            .filter(|id| results.get(id).map(|r| r.lives_remaining == 0).unwrap_or(false))
            .copied()
            .collect();
        for id in eliminated.iter() {
            self.room.unseat_to_spectator(*id);
            if let Some(player) = self.players.get_mut(id) {
                player.set_spectator(true);
            }
            self.game
                .as_mut()
                .expect("game checked above")
                .drop_from_order(*id);
            log::info!("[room {}] {} eliminated", self.room.id(), id);
        }
        crate::lobby::elect_host(self);
        let mut effects = vec![Effect::Broadcast(ServerMessage::RoundCompleted {
            round_number,
            results,
            eliminated_players: eliminated,
        })];
        let game = self.game.as_ref().expect("game checked above");
        match game.order.len() {
            0 => effects.extend(self.complete_game(EndReason::InsufficientPlayers, now)),
            1 => effects.extend(self.complete_game(EndReason::Victory, now)),
            _ => {
                let delay_ms = self.room.settings().round_transition_delay_ms;
                let game = self.game.as_mut().expect("game checked above");
                game.bump_serial();
                effects.push(Effect::ArmRoundGap {
                    serial: game.turn_serial,
                    delay_ms,
                });
            }
        }
        effects
    }
}

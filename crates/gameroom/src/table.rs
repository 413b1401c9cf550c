use super::*;
use rvb_cards::Card;
use rvb_cards::CommittedDeck;
use rvb_cards::Hole;
use rvb_cards::ShuffledDeck;
use rvb_core::*;
use rvb_gameplay::Action;
use rvb_gameplay::Game;
use rvb_gameplay::RuleViolation;
use rvb_gameplay::Seat;
use rvb_gameplay::Status;
use std::collections::HashMap;
use std::collections::HashSet;
use tokio::time::Instant;

/// Side effects the async shell performs after state is committed.
///
/// The core never suspends: wallet settlement, history appends, and
/// checkpoint writes all happen in the shell, after outbound events are
/// queued.
#[derive(Debug)]
pub enum Effect {
    /// Persist a checkpoint now (chips or phase changed).
    Checkpoint,
    /// Close a player's escrow, crediting their remaining stack.
    Settle {
        player: PlayerId,
        escrow: EscrowId,
        balance: Chips,
    },
    /// Refund an untouched escrow after a rejected join.
    Release { escrow: EscrowId },
    /// Append a completed hand to the history sink.
    Record { record: HandRecord },
    /// The table has been empty past quiescence; tear it down.
    Close,
}

/// Everything one processed message produced.
#[derive(Debug, Default)]
pub struct Step {
    pub outbound: Vec<Outbound>,
    pub effects: Vec<Effect>,
}

/// Durable actor state, as persisted and recovered.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Checkpoint {
    pub version: Version,
    pub hand_number: HandNumber,
    pub phase: Phase,
    pub paused: bool,
    pub game: Game,
    pub community: Vec<Card>,
    pub deck: Option<ShuffledDeck>,
    pub dedup: Dedup,
    pub escrows: Vec<(PlayerId, EscrowId)>,
    pub pending_sitout: Vec<PlayerId>,
    pub pending_leave: Vec<PlayerId>,
}

/// The single-writer core of one table.
///
/// [`handle`] consumes exactly one inbox message, mutates state, and
/// returns the outbound events plus the effects the shell must run.
/// Nothing else may touch this state; the async [`Actor`] owns the only
/// instance and serializes access by construction.
///
/// [`handle`]: Self::handle
/// [`Actor`]: super::actor::Actor
pub struct Table {
    id: TableId,
    config: TableConfig,
    game: Game,
    phase: Phase,
    hand_number: HandNumber,
    deck: Option<ShuffledDeck>,
    community: Vec<Card>,
    version: Version,
    dedup: Dedup,
    replay: Replay,
    deadlines: Deadlines,
    connected: HashMap<PlayerId, SessionId>,
    escrows: HashMap<PlayerId, EscrowId>,
    pending_sitout: HashSet<PlayerId>,
    pending_leave: HashSet<PlayerId>,
    paused: bool,
}

impl Unique<rvb_core::Table> for Table {
    fn id(&self) -> TableId {
        self.id
    }
}

impl Table {
    pub fn new(id: TableId, config: TableConfig) -> Self {
        let game = Game::new(config.small_blind, config.big_blind);
        Self {
            id,
            config,
            game,
            phase: Phase::Waiting,
            hand_number: 0,
            deck: None,
            community: Vec::new(),
            version: 0,
            dedup: Dedup::default(),
            replay: Replay::default(),
            deadlines: Deadlines::default(),
            connected: HashMap::new(),
            escrows: HashMap::new(),
            pending_sitout: HashSet::new(),
            pending_leave: HashSet::new(),
            paused: false,
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn version(&self) -> Version {
        self.version
    }
    pub fn game(&self) -> &Game {
        &self.game
    }
    pub fn is_empty(&self) -> bool {
        self.game.seats().is_empty()
    }
    pub fn is_paused(&self) -> bool {
        self.paused
    }
    /// Earliest armed deadline, for the shell's sleep.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.next()
    }
    /// Pause dealing new hands (persistence trouble or admin).
    pub fn pause(&mut self) {
        self.paused = true;
    }
    /// Timeout preference: auto-check instead of folding when legal.
    pub fn set_check_fold(&mut self, player: PlayerId, enabled: bool) {
        let position = self
            .game
            .seats()
            .iter()
            .find(|s| s.player == player)
            .map(|s| s.position);
        if let Some(position) = position {
            if let Some(seat) = self.game.seat_mut(position) {
                seat.check_fold = enabled;
            }
        }
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id,
            name: self.config.name.clone(),
            small_blind: self.config.small_blind,
            big_blind: self.config.big_blind,
            seated: self.game.seats().len(),
            max_seats: self.config.max_seats,
            phase: self.phase,
        }
    }

    /// Unmasked snapshot of observable state.
    pub fn view(&self) -> GameView {
        GameView {
            table: self.id,
            name: self.config.name.clone(),
            phase: self.phase,
            hand_number: self.hand_number,
            button: self.game.button(),
            pot: self.game.pot(),
            bet: self.game.bet(),
            min_raise: self.game.min_raise(),
            action_on: self.game.action_on(),
            community: self.community.clone(),
            pots: rvb_gameplay::layers(self.game.seats()),
            seats: self
                .game
                .seats()
                .iter()
                .map(|s| SeatView::of(s, self.connected.contains_key(&s.player)))
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // message dispatch
    // ------------------------------------------------------------------

    pub fn handle(&mut self, msg: Message, now: Instant) -> Step {
        let mut step = Step::default();
        match msg {
            Message::Join {
                player,
                name,
                seat,
                buy_in,
                escrow,
            } => self.join(player, name, seat, buy_in, escrow, now, &mut step),
            Message::Leave { player } => self.leave(player, now, &mut step),
            Message::Sit { player, out } => self.sit(player, out, now, &mut step),
            Message::Act {
                player,
                action,
                client_id,
            } => self.act(player, action, client_id, now, &mut step),
            Message::Chat { player, text } => self.chat(player, text, &mut step),
            Message::Connect { player, session } => self.connect(player, session, &mut step),
            Message::Disconnect { player, session } => {
                self.disconnect(player, session, now, &mut step)
            }
            Message::Reconnect {
                player,
                session,
                last_seen,
            } => self.reconnect(player, session, last_seen, &mut step),
            Message::Tick => self.tick(now, &mut step),
            Message::Admin(cmd) => self.admin(cmd, now, &mut step),
        }
        step
    }

    fn emit(&mut self, step: &mut Step, audience: Audience, event: Event) {
        self.version += 1;
        let outbound = Outbound {
            audience,
            version: Some(self.version),
            event,
        };
        if outbound.event.replayable() {
            self.replay.push(outbound.clone());
        }
        step.outbound.push(outbound);
    }
    /// Unversioned private reply; never replayed.
    fn reply(&self, step: &mut Step, player: PlayerId, event: Event) {
        step.outbound.push(Outbound {
            audience: Audience::Player(player),
            version: None,
            event,
        });
    }

    // ------------------------------------------------------------------
    // seating
    // ------------------------------------------------------------------

    fn join(
        &mut self,
        player: PlayerId,
        name: String,
        position: Position,
        buy_in: Chips,
        escrow: EscrowId,
        now: Instant,
        step: &mut Step,
    ) {
        let reject = |table: &Self, step: &mut Step, code: &str, msg: &str| {
            table.reply(step, player, Event::error(code, msg));
            step.effects.push(Effect::Release { escrow });
        };
        if self.game.seats().iter().any(|s| s.player == player) {
            return reject(self, step, "invalid_action", "already seated at this table");
        }
        if self.game.seats().len() >= self.config.max_seats {
            return reject(self, step, "table_full", "no open seats");
        }
        if position >= self.config.max_seats {
            return reject(self, step, "invalid_action", "no such seat");
        }
        if !self.config.accepts_buy_in(buy_in) {
            return reject(self, step, "invalid_action", "buy-in outside table range");
        }
        let seat = Seat::new(position, player, name, buy_in);
        if self.game.sit(seat).is_err() {
            return reject(self, step, "invalid_action", "seat is taken");
        }
        self.escrows.insert(player, escrow);
        self.deadlines.clear_empty();
        log::info!("[table {}] {} sat at {}", self.id, player, position);
        let view = SeatView::of(self.game.seat(position).expect("just sat"), false);
        self.emit(step, Audience::Table, Event::PlayerJoined { seat: view });
        step.effects.push(Effect::Checkpoint);
        self.maybe_start_hand(now, step);
    }

    fn leave(&mut self, player: PlayerId, now: Instant, step: &mut Step) {
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return self.reply(step, player, Event::error("not_at_table", "not seated here"));
        };
        let position = seat.position;
        // seats with chips in the live pot keep their spot (and their
        // commitment) until the hand settles
        if self.phase.in_hand() && (seat.in_hand() || seat.spent > 0) {
            self.fold_out(position, now, step);
            self.pending_leave.insert(player);
            return;
        }
        self.vacate(position, step);
        self.maybe_arm_empty(now);
        step.effects.push(Effect::Checkpoint);
    }

    /// Removes a seat and settles its escrow.
    fn vacate(&mut self, position: Position, step: &mut Step) {
        let Some(seat) = self.game.stand(position) else {
            return;
        };
        self.dedup.forget(seat.player);
        self.connected.remove(&seat.player);
        self.pending_sitout.remove(&seat.player);
        self.deadlines.clear_disconnect(seat.player);
        log::info!("[table {}] {} left seat {}", self.id, seat.player, position);
        if let Some(escrow) = self.escrows.remove(&seat.player) {
            step.effects.push(Effect::Settle {
                player: seat.player,
                escrow,
                balance: seat.stack,
            });
        }
        self.emit(
            step,
            Audience::Table,
            Event::PlayerLeft {
                position,
                player: seat.player,
            },
        );
    }

    fn sit(&mut self, player: PlayerId, out: bool, now: Instant, step: &mut Step) {
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return self.reply(step, player, Event::error("not_at_table", "not seated here"));
        };
        let position = seat.position;
        if out {
            if self.phase.in_hand() && seat.in_hand() {
                self.pending_sitout.insert(player);
            } else if let Some(seat) = self.game.seat_mut(position) {
                seat.status = Status::SittingOut;
            }
        } else {
            self.pending_sitout.remove(&player);
            if let Some(seat) = self.game.seat_mut(position) {
                if seat.status == Status::SittingOut {
                    seat.status = Status::Seated;
                }
            }
            self.maybe_start_hand(now, step);
        }
        step.effects.push(Effect::Checkpoint);
    }

    // ------------------------------------------------------------------
    // actions
    // ------------------------------------------------------------------

    fn act(
        &mut self,
        player: PlayerId,
        action: Action,
        client_id: String,
        now: Instant,
        step: &mut Step,
    ) {
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return self.reply(step, player, Event::error("not_at_table", "not seated here"));
        };
        let position = seat.position;
        if let Some(outcome) = self.dedup.seen(player, &client_id) {
            log::debug!("[table {}] duplicate {} from {}", self.id, client_id, player);
            let outcome = outcome.clone();
            return self.reply(step, player, outcome);
        }
        if !self.phase.betting() {
            return self.reply(
                step,
                player,
                Event::error(RuleViolation::WrongPhase.code(), "no active hand"),
            );
        }
        match self.game.apply(position, action) {
            Err(violation) => {
                self.reply(
                    step,
                    player,
                    Event::error(violation.code(), violation.to_string()),
                );
            }
            Ok(next) => {
                self.game = next;
                let seat = self.game.seat(position).expect("seat persists");
                let taken = Event::ActionTaken {
                    position,
                    player,
                    action: action.to_string(),
                    pot: self.game.pot(),
                    stack: seat.stack,
                };
                self.dedup.record(player, client_id, taken.clone());
                self.emit(step, Audience::Table, taken);
                step.effects.push(Effect::Checkpoint);
                self.continue_round(now, step);
            }
        }
    }

    /// Folds a seat regardless of turn order: through the engine when the
    /// action is on them, by direct status change otherwise.
    fn fold_out(&mut self, position: Position, now: Instant, step: &mut Step) {
        if !self.phase.in_hand() {
            return;
        }
        let Some(seat) = self.game.seat(position) else {
            return;
        };
        if !seat.in_hand() {
            return;
        }
        let player = seat.player;
        if self.game.action_on() == Some(position) {
            if let Ok(next) = self.game.apply(position, Action::Fold) {
                self.game = next;
            }
        } else if let Some(seat) = self.game.seat_mut(position) {
            seat.status = Status::Folded;
        }
        self.emit(
            step,
            Audience::Table,
            Event::ActionTaken {
                position,
                player,
                action: Action::Fold.to_string(),
                pot: self.game.pot(),
                stack: self.game.seat(position).map(|s| s.stack).unwrap_or(0),
            },
        );
        step.effects.push(Effect::Checkpoint);
        if self.phase.betting() {
            self.continue_round(now, step);
        }
    }

    /// Drives the hand forward after any accepted action: either the
    /// round continues with a new actor, or streets deal out until the
    /// next decision or showdown.
    fn continue_round(&mut self, now: Instant, step: &mut Step) {
        if !self.game.complete() {
            self.require_action(now, step);
            return;
        }
        self.deadlines.clear_action();
        if self.game.remaining() <= 1 {
            return self.settle_hand(now, step);
        }
        loop {
            match self.phase {
                Phase::PreFlop | Phase::Flop | Phase::Turn => {
                    self.phase = self.phase.next();
                    self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
                    let street = self.phase.street().expect("street phase");
                    if let Err(error) = self.deal_street(street, step) {
                        return self.void_hand(error, now, step);
                    }
                    self.game.next_street();
                    if !self.game.complete() {
                        self.require_action(now, step);
                        return;
                    }
                    // everyone is all-in: run the board out
                }
                Phase::River => {
                    return self.settle_hand(now, step);
                }
                _ => return,
            }
        }
    }

    fn require_action(&mut self, now: Instant, step: &mut Step) {
        let Some(position) = self.game.action_on() else {
            return;
        };
        let seat = self.game.seat(position).expect("action_on names a seat");
        let player = seat.player;
        let mut deadline = now + self.config.action_timeout;
        // a disconnected actor only gets the shorter of the two windows
        if let Some(grace) = self.deadlines.disconnect_deadline(player) {
            deadline = deadline.min(grace);
        }
        self.deadlines.arm_action(deadline);
        self.emit(
            step,
            Audience::Table,
            Event::ActionRequired {
                position,
                player,
                timeout: deadline.saturating_duration_since(now),
            },
        );
    }

    // ------------------------------------------------------------------
    // hand lifecycle
    // ------------------------------------------------------------------

    fn maybe_start_hand(&mut self, now: Instant, step: &mut Step) {
        if self.phase != Phase::Waiting || self.paused {
            return;
        }
        let dealable = self.game.seats().iter().filter(|s| s.dealable()).count();
        if dealable < 2 {
            return;
        }
        self.start_hand(now, step);
    }

    fn start_hand(&mut self, now: Instant, step: &mut Step) {
        self.hand_number += 1;
        self.community.clear();
        let button = self.advance_button();
        self.game.enter_hand(button);
        let deck = CommittedDeck::generate().shuffle();
        if let Err(error) = deck.verify() {
            self.deck = None;
            return self.void_hand(error.to_string(), now, step);
        }
        self.deck = Some(deck);
        log::info!(
            "[table {}] hand #{} starting, button at {}",
            self.id,
            self.hand_number,
            button
        );
        if let Err(error) = self.deal_holes(step) {
            return self.void_hand(error, now, step);
        }
        let stacks = self
            .game
            .seats()
            .iter()
            .filter(|s| s.in_hand())
            .map(|s| (s.position, s.stack + s.spent))
            .collect();
        self.emit(
            step,
            Audience::Table,
            Event::HandStarted {
                hand: self.hand_number,
                button,
                stacks,
            },
        );
        for (i, (position, amount)) in self.game.post_blinds().into_iter().enumerate() {
            let seat = self.game.seat(position).expect("blind seat");
            let blind = if i == 0 { "small blind" } else { "big blind" };
            self.emit(
                step,
                Audience::Table,
                Event::ActionTaken {
                    position,
                    player: seat.player,
                    action: format!("{} {}", blind, amount),
                    pot: self.game.pot(),
                    stack: seat.stack,
                },
            );
        }
        self.phase = Phase::PreFlop;
        self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
        step.effects.push(Effect::Checkpoint);
        self.continue_round(now, step);
    }

    /// Next button position under the table's button rule. The first
    /// hand of a table starts at the lowest dealable seat.
    fn advance_button(&mut self) -> Position {
        if self.hand_number <= 1 {
            return self
                .game
                .seats()
                .iter()
                .find(|s| s.dealable())
                .map(|s| s.position)
                .unwrap_or(0);
        }
        match self.config.button_rule {
            ButtonRule::Moving => self
                .game
                .clockwise(self.game.button())
                .into_iter()
                .find(|&p| self.game.seat(p).map(|s| s.dealable()).unwrap_or(false))
                .unwrap_or(self.game.button()),
            ButtonRule::Dead => (self.game.button() + 1) % self.config.max_seats,
        }
    }

    /// Two cards to every dealt-in seat, one at a time, starting left of
    /// the button. Private deals go only to their owners.
    fn deal_holes(&mut self, step: &mut Step) -> Result<(), String> {
        let dealt_in = |seat: &Seat| seat.status == Status::Active;
        let mut order: Vec<Position> = self
            .game
            .clockwise(self.game.button())
            .into_iter()
            .filter(|&p| self.game.seat(p).map(dealt_in).unwrap_or(false))
            .collect();
        if self
            .game
            .seat(self.game.button())
            .map(dealt_in)
            .unwrap_or(false)
        {
            order.push(self.game.button());
        }
        let deck = self.deck.as_mut().expect("deck dealt this hand");
        let mut rounds: Vec<Vec<Card>> = vec![Vec::new(), Vec::new()];
        for round in rounds.iter_mut() {
            for _ in &order {
                round.push(deck.draw().ok_or("deck exhausted during deal")?);
            }
        }
        let deals: Vec<(Position, Hole)> = order
            .iter()
            .enumerate()
            .map(|(i, &position)| (position, Hole::from((rounds[0][i], rounds[1][i]))))
            .collect();
        for (position, hole) in deals {
            let seat = self.game.seat_mut(position).expect("dealt seat");
            seat.hole = Some(hole);
            let player = seat.player;
            self.emit(
                step,
                Audience::Player(player),
                Event::HoleDealt {
                    position,
                    player,
                    hole,
                },
            );
        }
        Ok(())
    }

    /// Burn, then reveal the street's community cards.
    fn deal_street(&mut self, street: rvb_cards::Street, step: &mut Step) -> Result<(), String> {
        let deck = self.deck.as_mut().ok_or("no deck in play")?;
        deck.burn().ok_or("deck exhausted at burn")?;
        let mut cards = Vec::with_capacity(street.n_dealt());
        for _ in 0..street.n_dealt() {
            cards.push(deck.draw().ok_or("deck exhausted during street")?);
        }
        self.community.extend(&cards);
        self.emit(
            step,
            Audience::Table,
            Event::CommunityDealt {
                street,
                cards,
                board: self.community.clone(),
            },
        );
        Ok(())
    }

    /// Pays the pots out and parks the table in `Settling`.
    fn settle_hand(&mut self, now: Instant, step: &mut Step) {
        let fold_through = self.game.remaining() <= 1;
        if !fold_through && self.phase != Phase::Showdown {
            self.phase = Phase::Showdown;
            self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
        }
        let results =
            rvb_gameplay::settle(self.game.seats(), &self.community, self.game.button());
        for (position, chips) in rvb_gameplay::rewards(&results) {
            if let Some(seat) = self.game.seat_mut(position) {
                seat.stack += chips;
            }
        }
        let reveals = if fold_through {
            Vec::new()
        } else {
            self.reveal_order()
                .into_iter()
                .filter_map(|p| self.game.seat(p))
                .map(|s| Reveal {
                    position: s.position,
                    player: s.player,
                    hole: s.hole,
                })
                .collect()
        };
        self.emit(
            step,
            Audience::Table,
            Event::Showdown {
                reveals,
                pots: results.clone(),
            },
        );
        step.effects.push(Effect::Record {
            record: self.record(&results),
        });
        step.effects.push(Effect::Checkpoint);
        self.phase = Phase::Settling;
        self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
        self.deadlines.clear_action();
        self.deadlines.arm_settle(now + SETTLING_DELAY);
    }

    /// Showdown order: last aggressor first, then clockwise. Folded
    /// hands are never revealed.
    fn reveal_order(&self) -> Vec<Position> {
        let first = self
            .game
            .aggressor()
            .or_else(|| {
                self.game
                    .clockwise(self.game.button())
                    .into_iter()
                    .find(|&p| self.game.seat(p).map(|s| s.in_hand()).unwrap_or(false))
            })
            .unwrap_or(self.game.button());
        let mut order = vec![first];
        order.extend(
            self.game
                .clockwise(first)
                .into_iter()
                .filter(|&p| self.game.seat(p).map(|s| s.in_hand()).unwrap_or(false)),
        );
        order.retain(|&p| self.game.seat(p).map(|s| s.in_hand()).unwrap_or(false));
        order
    }

    fn record(&self, results: &[rvb_gameplay::PotResult]) -> HandRecord {
        let rewards = rvb_gameplay::rewards(results);
        HandRecord {
            id: HandId::fresh(),
            table: self.id,
            hand_number: self.hand_number,
            button: self.game.button(),
            board: self.community.clone(),
            participants: self
                .game
                .seats()
                .iter()
                .filter(|s| s.spent > 0)
                .map(|s| Participant {
                    position: s.position,
                    player: s.player,
                    hole: s.hole.filter(|_| s.in_hand()),
                    spent: s.spent,
                    reward: rewards
                        .iter()
                        .find(|(p, _)| *p == s.position)
                        .map(|(_, c)| *c)
                        .unwrap_or(0),
                })
                .collect(),
            pots: results.to_vec(),
        }
    }

    /// Integrity failure: refund every commitment, void the hand, and
    /// return to waiting. The incident reaches the log and the table.
    fn void_hand(&mut self, reason: impl std::fmt::Display, now: Instant, step: &mut Step) {
        let reason = reason.to_string();
        log::error!("[table {}] hand voided: {}", self.id, reason);
        let positions: Vec<Position> = self.game.seats().iter().map(|s| s.position).collect();
        for position in positions {
            if let Some(seat) = self.game.seat_mut(position) {
                seat.stack += seat.spent;
                seat.spent = 0;
                seat.bet = 0;
                seat.hole = None;
            }
        }
        self.deck = None;
        self.community.clear();
        self.phase = Phase::Waiting;
        self.deadlines.clear_action();
        self.emit(step, Audience::Table, Event::HandVoided { reason });
        self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
        step.effects.push(Effect::Checkpoint);
        // next tick may start a fresh hand; avoid an immediate retry loop
        self.deadlines.arm_settle(now + SETTLING_DELAY);
    }

    /// Settling is over: apply deferred seat changes and look for the
    /// next hand.
    fn finish_hand(&mut self, now: Instant, step: &mut Step) {
        self.phase = Phase::Waiting;
        self.deck = None;
        self.community.clear();
        self.emit(step, Audience::Table, Event::PhaseChanged { phase: self.phase });
        for player in std::mem::take(&mut self.pending_sitout) {
            let position = self
                .game
                .seats()
                .iter()
                .find(|s| s.player == player)
                .map(|s| s.position);
            if let Some(position) = position {
                if let Some(seat) = self.game.seat_mut(position) {
                    seat.status = Status::SittingOut;
                }
            }
        }
        for player in std::mem::take(&mut self.pending_leave) {
            if let Some(position) = self
                .game
                .seats()
                .iter()
                .find(|s| s.player == player)
                .map(|s| s.position)
            {
                self.vacate(position, step);
            }
        }
        self.maybe_arm_empty(now);
        step.effects.push(Effect::Checkpoint);
        self.maybe_start_hand(now, step);
    }

    // ------------------------------------------------------------------
    // connectivity
    // ------------------------------------------------------------------

    fn connect(&mut self, player: PlayerId, session: SessionId, step: &mut Step) {
        self.connected.insert(player, session);
        self.deadlines.clear_disconnect(player);
        let seated = self
            .game
            .seats()
            .iter()
            .find(|s| s.player == player)
            .map(|s| (s.position, s.status));
        if let Some((position, Status::Disconnected)) = seated {
            if let Some(seat) = self.game.seat_mut(position) {
                seat.status = Status::Active;
            }
            self.emit(step, Audience::Table, Event::PlayerReconnected { player });
        }
        // fresh connections always get a current snapshot
        step.outbound.push(Outbound {
            audience: Audience::Player(player),
            version: Some(self.version),
            event: Event::State { view: self.view() },
        });
    }

    fn disconnect(&mut self, player: PlayerId, session: SessionId, now: Instant, step: &mut Step) {
        // ignore drops of stale sessions after a newer connect
        if self.connected.get(&player) != Some(&session) {
            return;
        }
        self.connected.remove(&player);
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return;
        };
        let position = seat.position;
        if self.phase.in_hand() && seat.in_hand() {
            let grace = self.config.disconnect_grace;
            if let Some(seat) = self.game.seat_mut(position) {
                if seat.status == Status::Active {
                    seat.status = Status::Disconnected;
                }
            }
            self.deadlines.arm_disconnect(player, now + grace);
            // if they are on the clock, the clock shortens to the grace
            if self.game.action_on() == Some(position) {
                let deadline = self
                    .deadlines
                    .action_deadline()
                    .map(|d| d.min(now + grace))
                    .unwrap_or(now + grace);
                self.deadlines.arm_action(deadline);
            }
            self.emit(
                step,
                Audience::Table,
                Event::PlayerDisconnected { player, grace },
            );
        }
    }

    fn reconnect(
        &mut self,
        player: PlayerId,
        session: SessionId,
        last_seen: Version,
        step: &mut Step,
    ) {
        self.connect(player, session, step);
        match self.replay.since(last_seen) {
            Some(missed) => {
                log::debug!(
                    "[table {}] replaying {} events to {}",
                    self.id,
                    missed.len(),
                    player
                );
                let missed: Vec<Outbound> = missed
                    .into_iter()
                    .filter(|o| o.audience.includes(player))
                    .cloned()
                    .collect();
                for outbound in missed {
                    step.outbound.push(Outbound {
                        audience: Audience::Player(player),
                        version: outbound.version,
                        event: outbound.event,
                    });
                }
            }
            None => {
                // too far behind; a full snapshot supersedes replay
                step.outbound.push(Outbound {
                    audience: Audience::Player(player),
                    version: Some(self.version),
                    event: Event::State { view: self.view() },
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // chat, timers, admin
    // ------------------------------------------------------------------

    fn chat(&mut self, player: PlayerId, text: String, step: &mut Step) {
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return self.reply(step, player, Event::error("not_at_table", "not seated here"));
        };
        if text.len() > MAX_CHAT_LEN {
            return self.reply(
                step,
                player,
                Event::error("invalid_action", "chat message too long"),
            );
        }
        let name = seat.name.clone();
        self.emit(step, Audience::Table, Event::Chat { player, name, text });
    }

    fn tick(&mut self, now: Instant, step: &mut Step) {
        for player in self.deadlines.lapsed_disconnects(now) {
            self.deadlines.clear_disconnect(player);
            self.drop_player(player, now, step);
        }
        if self.deadlines.action_expired(now) {
            self.deadlines.clear_action();
            self.force_action(now, step);
        }
        if self.deadlines.settle_expired(now) {
            self.deadlines.clear_settle();
            if self.phase == Phase::Settling {
                self.finish_hand(now, step);
            } else {
                // post-void cool-off
                self.maybe_start_hand(now, step);
            }
        }
        if self.deadlines.empty_expired(now) {
            log::info!("[table {}] quiescent and empty, closing", self.id);
            step.effects.push(Effect::Close);
        }
    }

    /// The actor timed out: check when allowed and preferred, else fold.
    fn force_action(&mut self, now: Instant, step: &mut Step) {
        let Some(position) = self.game.action_on() else {
            return;
        };
        let Some(seat) = self.game.seat(position) else {
            return;
        };
        let player = seat.player;
        let check_ok = seat.check_fold && self.game.bet() == seat.bet;
        let action = if check_ok { Action::Check } else { Action::Fold };
        log::info!(
            "[table {}] {} timed out, auto {}",
            self.id,
            player,
            action
        );
        if let Ok(next) = self.game.apply(position, action) {
            self.game = next;
            self.emit(
                step,
                Audience::Table,
                Event::ActionTaken {
                    position,
                    player,
                    action: action.to_string(),
                    pot: self.game.pot(),
                    stack: self.game.seat(position).map(|s| s.stack).unwrap_or(0),
                },
            );
            step.effects.push(Effect::Checkpoint);
            self.continue_round(now, step);
        }
    }

    /// Grace lapsed without a reconnect: fold the hand and apply the
    /// table's timeout policy.
    fn drop_player(&mut self, player: PlayerId, now: Instant, step: &mut Step) {
        let Some(seat) = self.game.seats().iter().find(|s| s.player == player) else {
            return;
        };
        let position = seat.position;
        log::info!("[table {}] {} grace lapsed", self.id, player);
        self.fold_out(position, now, step);
        match self.config.timeout_policy {
            TimeoutPolicy::SitOut => {
                if self.phase.in_hand() {
                    self.pending_sitout.insert(player);
                } else if let Some(seat) = self.game.seat_mut(position) {
                    seat.status = Status::SittingOut;
                }
            }
            TimeoutPolicy::StandUp => {
                if self.phase.in_hand() {
                    self.pending_leave.insert(player);
                } else {
                    self.vacate(position, step);
                    self.maybe_arm_empty(now);
                }
            }
        }
    }

    fn admin(&mut self, cmd: AdminCommand, now: Instant, step: &mut Step) {
        match cmd {
            AdminCommand::Pause => {
                log::warn!("[table {}] paused by admin", self.id);
                self.paused = true;
            }
            AdminCommand::Resume => {
                self.paused = false;
                self.maybe_start_hand(now, step);
            }
            AdminCommand::Kick(player) => self.leave(player, now, step),
        }
    }

    fn maybe_arm_empty(&mut self, now: Instant) {
        if self.is_empty() {
            self.deadlines.arm_empty(now + QUIESCENCE);
        }
    }

    // ------------------------------------------------------------------
    // persistence
    // ------------------------------------------------------------------

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            version: self.version,
            hand_number: self.hand_number,
            phase: self.phase,
            paused: self.paused,
            game: self.game.clone(),
            community: self.community.clone(),
            deck: self.deck.clone(),
            dedup: self.dedup.clone(),
            escrows: self.escrows.iter().map(|(&p, &e)| (p, e)).collect(),
            pending_sitout: self.pending_sitout.iter().copied().collect(),
            pending_leave: self.pending_leave.iter().copied().collect(),
        }
    }

    /// Rebuilds a table from its latest checkpoint. Connections are
    /// gone; [`resume`](Self::resume) re-arms timers and re-broadcasts.
    pub fn restore(id: TableId, config: TableConfig, checkpoint: Checkpoint) -> Self {
        let mut table = Self::new(id, config);
        table.version = checkpoint.version;
        table.hand_number = checkpoint.hand_number;
        table.phase = checkpoint.phase;
        table.paused = checkpoint.paused;
        table.game = checkpoint.game;
        table.community = checkpoint.community;
        table.deck = checkpoint.deck;
        table.dedup = checkpoint.dedup;
        table.escrows = checkpoint.escrows.into_iter().collect();
        table.pending_sitout = checkpoint.pending_sitout.into_iter().collect();
        table.pending_leave = checkpoint.pending_leave.into_iter().collect();
        table
    }

    /// After a restart: everyone is disconnected, the emitted-version
    /// history is unknowable, so a full snapshot goes out and every
    /// in-hand seat gets a reconnect grace.
    pub fn resume(&mut self, now: Instant) -> Step {
        let mut step = Step::default();
        let players: Vec<(Position, PlayerId)> = self
            .game
            .seats()
            .iter()
            .filter(|s| s.in_hand())
            .map(|s| (s.position, s.player))
            .collect();
        for (position, player) in players {
            if let Some(seat) = self.game.seat_mut(position) {
                if seat.status == Status::Active {
                    seat.status = Status::Disconnected;
                }
            }
            self.deadlines
                .arm_disconnect(player, now + self.config.disconnect_grace);
        }
        if self.phase.betting() && self.game.action_on().is_some() {
            self.require_action(now, &mut step);
        }
        if self.phase == Phase::Settling {
            self.deadlines.arm_settle(now + SETTLING_DELAY);
        }
        let view = self.view();
        self.emit(&mut step, Audience::Table, Event::State { view });
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> TableConfig {
        TableConfig::standard("test", 10, 20)
    }

    fn shallow_config() -> TableConfig {
        let mut config = config();
        config.min_buy_in = 40;
        config
    }

    struct Harness {
        table: Table,
        now: Instant,
        players: Vec<PlayerId>,
        sessions: Vec<SessionId>,
    }

    /// Seats one player per position with the given stacks, then starts
    /// the first hand: button at 0, blinds clockwise from it.
    fn setup(config: TableConfig, stacks: &[Chips]) -> Harness {
        let mut table = Table::new(TableId::fresh(), config);
        let now = Instant::now();
        table.handle(Message::Admin(AdminCommand::Pause), now);
        let mut players = Vec::new();
        let mut sessions = Vec::new();
        for (i, &stack) in stacks.iter().enumerate() {
            let player = PlayerId::fresh();
            let session = SessionId::fresh();
            players.push(player);
            sessions.push(session);
            table.handle(
                Message::Join {
                    player,
                    name: format!("p{}", i),
                    seat: i,
                    buy_in: stack,
                    escrow: EscrowId::fresh(),
                },
                now,
            );
            table.handle(Message::Connect { player, session }, now);
        }
        table.handle(Message::Admin(AdminCommand::Resume), now);
        Harness {
            table,
            now,
            players,
            sessions,
        }
    }

    impl Harness {
        fn act(&mut self, i: usize, action: Action, id: &str) -> Step {
            self.table.handle(
                Message::Act {
                    player: self.players[i],
                    action,
                    client_id: id.to_string(),
                },
                self.now,
            )
        }
        fn stack(&self, position: Position) -> Chips {
            self.table.game().seat(position).unwrap().stack
        }
        fn tick_after(&mut self, delay: Duration) -> Step {
            self.now += delay;
            self.table.handle(Message::Tick, self.now)
        }
    }

    fn showdown_of(step: &Step) -> Option<(Vec<Reveal>, Vec<rvb_gameplay::PotResult>)> {
        step.outbound.iter().find_map(|o| match &o.event {
            Event::Showdown { reveals, pots } => Some((reveals.clone(), pots.clone())),
            _ => None,
        })
    }

    fn actions_of(step: &Step) -> Vec<String> {
        step.outbound
            .iter()
            .filter_map(|o| match &o.event {
                Event::ActionTaken { action, .. } => Some(action.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_hand_posts_blinds_and_opens_on_the_button_side() {
        let h = setup(config(), &[1000, 1000, 1000]);
        assert_eq!(h.table.phase(), Phase::PreFlop);
        assert_eq!(h.table.game().button(), 0);
        assert_eq!(h.table.game().seat(1).unwrap().bet, 10);
        assert_eq!(h.table.game().seat(2).unwrap().bet, 20);
        assert_eq!(h.table.game().action_on(), Some(0));
    }

    #[test]
    fn three_way_fold_through_pays_the_big_blind() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        h.act(0, Action::Fold, "a1");
        let step = h.act(1, Action::Fold, "b1");
        let (reveals, pots) = showdown_of(&step).expect("hand settles");
        assert!(reveals.is_empty());
        assert_eq!(pots.iter().map(|p| p.amount).sum::<Chips>(), 30);
        assert_eq!(h.table.phase(), Phase::Settling);
        assert_eq!(h.stack(0), 1000);
        assert_eq!(h.stack(1), 990);
        assert_eq!(h.stack(2), 1010);
        // settling elapses and the next hand deals
        h.tick_after(SETTLING_DELAY);
        assert_eq!(h.table.phase(), Phase::PreFlop);
        assert_eq!(h.table.game().pot(), 30);
    }

    #[test]
    fn heads_up_checked_to_showdown_conserves_chips() {
        let mut h = setup(config(), &[1000, 1000]);
        // button posts small and speaks first pre-flop
        assert_eq!(h.table.game().action_on(), Some(0));
        h.act(0, Action::Call, "a1");
        h.act(1, Action::Check, "b1");
        assert_eq!(h.table.phase(), Phase::Flop);
        // big blind speaks first on every later street
        assert_eq!(h.table.game().action_on(), Some(1));
        let mut last = None;
        for (street, ids) in [("f", 0), ("t", 2), ("r", 4)] {
            h.act(1, Action::Check, &format!("{}{}", street, ids));
            last = Some(h.act(0, Action::Check, &format!("{}{}", street, ids + 1)));
        }
        let (reveals, pots) = showdown_of(&last.expect("acted")).expect("showdown");
        assert_eq!(reveals.len(), 2);
        assert!(reveals.iter().all(|r| r.hole.is_some()));
        assert_eq!(pots.iter().map(|p| p.amount).sum::<Chips>(), 40);
        assert_eq!(h.stack(0) + h.stack(1), 2000);
        assert_eq!(h.table.phase(), Phase::Settling);
    }

    #[test]
    fn all_in_builds_main_and_side_pots() {
        let mut h = setup(shallow_config(), &[100, 500, 500]);
        h.act(0, Action::AllIn, "a1");
        h.act(1, Action::Call, "b1");
        h.act(2, Action::Call, "c1");
        assert_eq!(h.table.phase(), Phase::Flop);
        h.act(1, Action::Bet(200), "b2");
        let mut step = h.act(2, Action::Call, "c2");
        // board runs out with checks
        for street in ["t", "r"] {
            if h.table.phase() == Phase::Settling {
                break;
            }
            h.act(1, Action::Check, &format!("{}1", street));
            step = h.act(2, Action::Check, &format!("{}2", street));
        }
        let (_, pots) = showdown_of(&step).expect("showdown");
        assert_eq!(pots.len(), 2);
        assert_eq!(pots[0].amount, 300);
        assert_eq!(pots[0].eligible, vec![0, 1, 2]);
        assert_eq!(pots[1].amount, 400);
        assert_eq!(pots[1].eligible, vec![1, 2]);
        assert_eq!(h.stack(0) + h.stack(1) + h.stack(2), 1100);
    }

    #[test]
    fn duplicate_client_message_is_a_no_op() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        h.act(0, Action::Call, "M1");
        let version = h.table.version();
        let spent = h.table.game().seat(0).unwrap().spent;
        let step = h.act(0, Action::Call, "M1");
        assert_eq!(h.table.version(), version);
        assert_eq!(h.table.game().seat(0).unwrap().spent, spent);
        assert_eq!(step.outbound.len(), 1);
        let reply = &step.outbound[0];
        assert_eq!(reply.audience, Audience::Player(h.players[0]));
        assert_eq!(reply.version, None);
        assert!(matches!(&reply.event, Event::ActionTaken { action, .. } if action == "call"));
    }

    #[test]
    fn action_timer_folds_the_slow_actor() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        let timeout = h.table.config().action_timeout;
        let step = h.tick_after(timeout);
        assert_eq!(actions_of(&step), vec!["fold".to_string()]);
        assert_eq!(h.table.game().action_on(), Some(1));
    }

    #[test]
    fn timeout_checks_when_preferred_and_legal() {
        let mut h = setup(config(), &[1000, 1000]);
        h.act(0, Action::Call, "a1");
        h.act(1, Action::Check, "b1");
        assert_eq!(h.table.game().action_on(), Some(1));
        let player = h.players[1];
        h.table.set_check_fold(player, true);
        let timeout = h.table.config().action_timeout;
        let step = h.tick_after(timeout);
        assert_eq!(actions_of(&step), vec!["check".to_string()]);
    }

    #[test]
    fn disconnect_grace_folds_the_actor() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        let step = h.table.handle(
            Message::Disconnect {
                player: h.players[0],
                session: h.sessions[0],
            },
            h.now,
        );
        assert!(
            step.outbound
                .iter()
                .any(|o| matches!(o.event, Event::PlayerDisconnected { .. }))
        );
        // grace (15s) is shorter than the action timeout (30s)
        let grace = h.table.config().disconnect_grace;
        let step = h.tick_after(grace);
        assert_eq!(actions_of(&step), vec!["fold".to_string()]);
        assert_eq!(h.table.game().action_on(), Some(1));
        assert_eq!(h.table.game().seat(0).unwrap().status, Status::Folded);
    }

    #[test]
    fn reconnect_replays_missed_broadcasts() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        let last_seen = h.table.version();
        h.act(0, Action::Call, "a1");
        let step = h.table.handle(
            Message::Reconnect {
                player: h.players[1],
                session: h.sessions[1],
                last_seen,
            },
            h.now,
        );
        let replayed: Vec<&Outbound> = step
            .outbound
            .iter()
            .filter(|o| o.version.map(|v| v > last_seen).unwrap_or(false))
            .collect();
        assert!(!replayed.is_empty());
        assert!(
            replayed
                .iter()
                .all(|o| o.audience == Audience::Player(h.players[1]))
        );
        let versions: Vec<Version> = replayed.iter().filter_map(|o| o.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn leaving_mid_hand_folds_then_vacates_after_settling() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        let step = h.table.handle(
            Message::Leave {
                player: h.players[0],
            },
            h.now,
        );
        assert_eq!(actions_of(&step), vec!["fold".to_string()]);
        assert!(h.table.game().seat(0).is_some());
        // finish the hand; the seat empties at settling's end
        h.act(1, Action::Fold, "b1");
        let step = h.tick_after(SETTLING_DELAY);
        assert!(
            step.outbound
                .iter()
                .any(|o| matches!(o.event, Event::PlayerLeft { position: 0, .. }))
        );
        assert!(h.table.game().seat(0).is_none());
        assert!(
            step.effects
                .iter()
                .any(|e| matches!(e, Effect::Settle { balance: 1000, .. }))
        );
    }

    #[test]
    fn checkpoint_restores_observably_equal_state() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        h.act(0, Action::Raise(60), "a1");
        let encoded = serde_json::to_value(h.table.checkpoint()).unwrap();
        let decoded: Checkpoint = serde_json::from_value(encoded).unwrap();
        let mut restored = Table::restore(h.table.id(), config(), decoded);
        let mut before = h.table.view();
        for seat in before.seats.iter_mut() {
            seat.connected = false;
        }
        assert_eq!(before, restored.view());
        assert_eq!(h.table.version(), restored.version());
        // resume re-broadcasts a snapshot and keeps the hand on a clock
        let step = restored.resume(Instant::now());
        assert!(
            step.outbound
                .iter()
                .any(|o| matches!(o.event, Event::State { .. }))
        );
        assert!(restored.next_deadline().is_some());
    }

    #[test]
    fn wrong_phase_and_wrong_seat_answer_only_the_offender() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        // not seated
        let stranger = PlayerId::fresh();
        let step = h.table.handle(
            Message::Act {
                player: stranger,
                action: Action::Fold,
                client_id: "x1".into(),
            },
            h.now,
        );
        assert_eq!(step.outbound.len(), 1);
        assert!(matches!(&step.outbound[0].event, Event::Error { code, .. } if code == "not_at_table"));
        // out of turn
        let step = h.act(2, Action::Fold, "c1");
        assert_eq!(step.outbound.len(), 1);
        assert_eq!(step.outbound[0].audience, Audience::Player(h.players[2]));
        assert!(matches!(&step.outbound[0].event, Event::Error { code, .. } if code == "not_your_turn"));
        // state untouched
        assert_eq!(h.table.game().action_on(), Some(0));
    }

    #[test]
    fn chat_is_bounded_and_broadcast() {
        let mut h = setup(config(), &[1000, 1000]);
        let step = h.table.handle(
            Message::Chat {
                player: h.players[0],
                text: "gl".into(),
            },
            h.now,
        );
        assert!(
            step.outbound
                .iter()
                .any(|o| matches!(&o.event, Event::Chat { text, .. } if text == "gl"))
        );
        let step = h.table.handle(
            Message::Chat {
                player: h.players[0],
                text: "x".repeat(MAX_CHAT_LEN + 1),
            },
            h.now,
        );
        assert!(matches!(&step.outbound[0].event, Event::Error { .. }));
    }

    #[test]
    fn versions_strictly_increase_across_broadcasts() {
        let mut h = setup(config(), &[1000, 1000, 1000]);
        let mut step = h.act(0, Action::Call, "a1");
        let mut more = h.act(1, Action::Call, "b1");
        step.outbound.append(&mut more.outbound);
        let versions: Vec<Version> = step.outbound.iter().filter_map(|o| o.version).collect();
        assert!(!versions.is_empty());
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }
}

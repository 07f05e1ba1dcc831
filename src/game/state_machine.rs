//! Round state machine.
//!
//! `waiting -> starting -> voting -> choosing -> choosingbest -> voting ...`
//! until someone reaches the winning score and the game moves to `end`.
//! `end` resets scores, hands and pools so the same group can start over.
//!
//! The machine is synchronous and owns no clock. Timed transitions are
//! represented by at most one [`ArmedTimer`]; whoever drives the session
//! (see [`crate::session::SessionActor`]) waits for it and calls
//! [`Session::fire_timer`] with its token. Every transition that supersedes a
//! timer drops it, and a stale token fires into nothing.

use rand::Rng;
use std::time::Duration;

use super::{
    entities::{Participant, ParticipantId, Phase, SessionId, SessionSnapshot, Vote},
    errors::{SessionError, SessionResult},
    events::{EventBus, Listener, PhaseEvent, SubscriptionId},
    outbox::Outbox,
    pool::Decks,
    roster::{Departure, Roster},
};
use crate::config::{ConfigError, SessionConfig};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerKind {
    /// `starting -> voting`
    StartDelay,
    /// `voting -> choosing`
    VotingCountdown,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerToken(u64);

/// The one pending timed transition of a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArmedTimer {
    pub kind: TimerKind,
    pub token: TimerToken,
    pub delay: Duration,
}

/// Hooks run synchronously inside [`Session::disconnect`].
#[derive(Default)]
pub struct DisconnectCallbacks<'a> {
    on_session_end: Option<Box<dyn FnOnce() + 'a>>,
    on_disconnect: Option<Box<dyn FnOnce(bool) + 'a>>,
}

impl<'a> DisconnectCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when the last connected participant left
    pub fn on_session_end(mut self, f: impl FnOnce() + 'a) -> Self {
        self.on_session_end = Some(Box::new(f));
        self
    }

    /// Called with whether any connected participant remains
    pub fn on_disconnect(mut self, f: impl FnOnce(bool) + 'a) -> Self {
        self.on_disconnect = Some(Box::new(f));
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DisconnectOutcome {
    pub departure: Departure,
    /// The round couldn't go on and the game was reset to `end`
    pub game_ended: bool,
    /// Nobody is left; the session is closed for good
    pub session_ended: bool,
}

pub struct Session {
    id: SessionId,
    phase: Phase,
    prompt: Option<String>,
    votes: Vec<Vote>,
    roster: Roster,
    decks: Decks,
    bus: EventBus,
    timer: Option<ArmedTimer>,
    next_timer: u64,
    closed: bool,
    hand_size: usize,
    winning_score: u32,
    min_participants: usize,
    start_delay: Duration,
    voting_duration: Duration,
}

impl Session {
    /// Create a session in `waiting`
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration, validated here
    /// * `decks` - Prompt and response pools for this session
    pub fn new(config: &SessionConfig, decks: Decks) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: SessionId::generate(config.id_length),
            phase: Phase::Waiting,
            prompt: None,
            votes: Vec::new(),
            roster: Roster::new(config.id_length),
            decks,
            bus: EventBus::default(),
            timer: None,
            next_timer: 0,
            closed: false,
            hand_size: config.hand_size,
            winning_score: config.winning_score,
            min_participants: config.min_participants,
            start_delay: config.start_delay,
            voting_duration: config.voting_duration,
        })
    }

    // === Participants ===

    pub fn join(
        &mut self,
        outbox: Box<dyn Outbox>,
        username: String,
        avatar_id: u32,
        host: bool,
    ) -> SessionResult<Participant> {
        self.ensure_open()?;
        let participant = self.roster.join(outbox, username, avatar_id, host);

        // Latecomers get a hand right away so they can take part in this round
        if matches!(
            self.phase,
            Phase::Voting | Phase::Choosing | Phase::ChoosingBest
        ) {
            self.roster
                .top_up_hand(&participant.id, &mut self.decks.responses, self.hand_size)?;
        }

        log::info!(
            "Session {}: {} ({}) joined{}",
            self.id,
            participant.username,
            participant.id,
            if host { " as host" } else { "" }
        );
        Ok(participant)
    }

    pub fn reconnect(
        &mut self,
        id: &ParticipantId,
        outbox: Box<dyn Outbox>,
        avatar_id: u32,
    ) -> SessionResult<Participant> {
        self.ensure_open()?;
        let participant = self.roster.reconnect(id, outbox, avatar_id)?;
        log::info!("Session {}: {} reconnected", self.id, id);
        Ok(participant)
    }

    /// Take a participant out of play.
    ///
    /// Before the game starts they are removed outright; from then on they
    /// stay listed as disconnected so their score and seat survive a
    /// reconnect, until the next `end_game` prunes them. If nobody connected remains, the session is
    /// closed: the timer is dropped, `on_session_end` fires, then
    /// `on_disconnect(false)`.
    pub fn disconnect(
        &mut self,
        id: &ParticipantId,
        callbacks: DisconnectCallbacks<'_>,
    ) -> SessionResult<DisconnectOutcome> {
        self.ensure_open()?;
        let was_master = self.roster.get(id)?.master;
        let in_progress = self.phase.in_progress();

        let departure = self.roster.depart(id, self.phase == Phase::Waiting)?;
        log::info!(
            "Session {}: {} {} ({} connected)",
            self.id,
            id,
            if departure.removed { "left" } else { "disconnected" },
            departure.connected_remaining
        );

        if departure.connected_remaining == 0 {
            self.close();
            if let Some(f) = callbacks.on_session_end {
                f();
            }
            if let Some(f) = callbacks.on_disconnect {
                f(false);
            }
            return Ok(DisconnectOutcome {
                departure,
                game_ended: false,
                session_ended: true,
            });
        }

        if in_progress && was_master {
            let master = self.roster.rotate_master()?;
            log::debug!("Session {}: master handed to {}", self.id, master);
        }

        if let Some(f) = callbacks.on_disconnect {
            f(true);
        }

        let mut game_ended = false;
        if in_progress && departure.connected_remaining == 1 {
            self.end_game()?;
            game_ended = true;
        } else if self.phase == Phase::Voting && self.all_voted() {
            self.start_choosing()?;
        }

        Ok(DisconnectOutcome {
            departure,
            game_ended,
            session_ended: false,
        })
    }

    // === Transitions ===

    /// `waiting|end -> starting`, then `voting` once the start delay elapses
    pub fn start_game(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.ensure_phase("start game", &[Phase::Waiting, Phase::End])?;
        let connected = self.roster.connected_count();
        if connected < self.min_participants {
            return Err(SessionError::NotEnoughParticipants {
                required: self.min_participants,
                connected,
            });
        }

        self.phase = Phase::Starting;
        log::info!("Session {}: game starting with {} participants", self.id, connected);
        self.arm_timer(TimerKind::StartDelay, self.start_delay);
        self.emit(PhaseEvent::Starting);
        Ok(())
    }

    /// Begin a round: new master, new prompt, hands topped up, countdown armed
    pub fn start_voting(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.ensure_phase(
            "start voting",
            &[Phase::Starting, Phase::Voting, Phase::ChoosingBest],
        )?;

        let master = self.roster.rotate_master()?;
        self.votes.clear();
        self.roster.clear_votes();
        self.phase = Phase::Voting;
        self.prompt = Some(self.decks.prompts.draw());
        self.roster
            .top_up_hands(&mut self.decks.responses, self.hand_size);

        log::debug!("Session {}: voting, master is {}", self.id, master);
        self.arm_timer(TimerKind::VotingCountdown, self.voting_duration);
        self.emit(PhaseEvent::Voting);
        Ok(())
    }

    pub fn vote(&mut self, id: &ParticipantId, text: &str) -> SessionResult<()> {
        self.ensure_open()?;
        self.ensure_phase("vote", &[Phase::Voting])?;
        let participant = self.roster.get(id)?;
        if participant.master {
            return Err(SessionError::MasterCannotVote);
        }
        if participant.voted {
            return Err(SessionError::AlreadyVoted(id.clone()));
        }
        let hand = self.roster.hand_mut(id)?;
        let Some(idx) = hand.iter().position(|card| card == text) else {
            return Err(SessionError::CardNotInHand(text.to_string()));
        };

        let card = hand.swap_remove(idx);
        self.roster.get_mut(id)?.voted = true;
        self.votes.push(Vote::hidden(card, id.clone()));
        log::debug!("Session {}: {} voted", self.id, id);

        if self.all_voted() {
            self.start_choosing()?;
        }
        Ok(())
    }

    /// `voting -> choosing`. Anyone still owing a vote gets a random card
    /// from their hand submitted for them.
    pub fn start_choosing(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.ensure_phase("start choosing", &[Phase::Voting])?;

        let owing: Vec<ParticipantId> = self
            .roster
            .iter()
            .filter(|p| p.owes_vote())
            .map(|p| p.id.clone())
            .collect();
        for id in &owing {
            if self.roster.hand(id)?.is_empty() {
                log::error!("Session {}: {} has no card to auto-submit", self.id, id);
                return Err(SessionError::EmptyHand(id.clone()));
            }
        }

        self.cancel_timer();
        self.phase = Phase::Choosing;
        for id in owing {
            let hand = self.roster.hand_mut(&id)?;
            let idx = rand::rng().random_range(0..hand.len());
            let card = hand.swap_remove(idx);
            self.roster.get_mut(&id)?.voted = true;
            self.votes.push(Vote::hidden(card, id.clone()));
            log::debug!("Session {}: auto-submitted for {}", self.id, id);
        }

        self.emit(PhaseEvent::Choosing);
        Ok(())
    }

    /// Reveal the vote of `user_id`; once every vote is visible the master
    /// picks the best one.
    pub fn choose(&mut self, user_id: &ParticipantId) -> SessionResult<()> {
        self.ensure_open()?;
        self.ensure_phase("choose", &[Phase::Choosing])?;
        let vote = self
            .votes
            .iter_mut()
            .find(|vote| &vote.user_id == user_id)
            .ok_or_else(|| SessionError::NoVote(user_id.clone()))?;
        if vote.visible {
            return Err(SessionError::AlreadyRevealed(user_id.clone()));
        }

        vote.visible = true;
        log::debug!("Session {}: revealed vote of {}", self.id, user_id);

        if self.votes.iter().all(|vote| vote.visible) {
            self.phase = Phase::ChoosingBest;
            self.emit(PhaseEvent::ChoosingBest);
        }
        Ok(())
    }

    /// Award the round to `user_id`. Returns their new score.
    pub fn choose_best(&mut self, user_id: &ParticipantId) -> SessionResult<u32> {
        self.ensure_open()?;
        self.ensure_phase("choose best", &[Phase::ChoosingBest])?;
        self.roster.get(user_id)?;
        if !self.votes.iter().any(|vote| &vote.user_id == user_id) {
            return Err(SessionError::NoVote(user_id.clone()));
        }

        let winner = self.roster.get_mut(user_id)?;
        winner.score += 1;
        let score = winner.score;
        log::debug!("Session {}: round to {} (score {})", self.id, user_id, score);

        if score >= self.winning_score {
            log::info!("Session {}: {} won the game", self.id, user_id);
            self.end_game()?;
        } else {
            self.start_voting()?;
        }
        Ok(score)
    }

    /// Any phase `-> end`: pools refilled, disconnected participants pruned,
    /// everyone else back to zero.
    pub fn end_game(&mut self) -> SessionResult<()> {
        self.ensure_open()?;
        self.cancel_timer();
        self.phase = Phase::End;
        self.prompt = None;
        self.votes.clear();
        self.decks.reset();
        self.roster.reset_for_new_cycle();

        log::info!("Session {}: game ended", self.id);
        self.emit(PhaseEvent::End);
        Ok(())
    }

    // === Timers ===

    /// Run the transition behind `token`.
    ///
    /// Returns `false` without touching anything when the token no longer
    /// matches the armed timer, i.e. the timer was superseded.
    pub fn fire_timer(&mut self, token: TimerToken) -> SessionResult<bool> {
        let armed = self.timer;
        match armed {
            Some(timer) if timer.token == token && !self.closed => {
                self.timer = None;
                log::debug!("Session {}: {:?} timer fired", self.id, timer.kind);
                match (timer.kind, self.phase) {
                    (TimerKind::StartDelay, Phase::Starting) => self.start_voting()?,
                    (TimerKind::VotingCountdown, Phase::Voting) => self.start_choosing()?,
                    (kind, phase) => {
                        log::warn!(
                            "Session {}: {:?} timer fired while {}, ignoring",
                            self.id,
                            kind,
                            phase
                        );
                    }
                }
                Ok(true)
            }
            _ => {
                log::debug!("Session {}: stale timer {:?} ignored", self.id, token);
                Ok(false)
            }
        }
    }

    pub fn timer(&self) -> Option<&ArmedTimer> {
        self.timer.as_ref()
    }

    fn arm_timer(&mut self, kind: TimerKind, delay: Duration) {
        self.next_timer += 1;
        self.timer = Some(ArmedTimer {
            kind,
            token: TimerToken(self.next_timer),
            delay,
        });
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }

    // === Events ===

    pub fn subscribe(&mut self, event: PhaseEvent, listener: impl Listener) -> SubscriptionId {
        self.bus.subscribe(event, listener)
    }

    pub fn subscribe_all(&mut self, listener: impl Listener) -> SubscriptionId {
        self.bus.subscribe_all(listener)
    }

    pub fn subscribe_boxed(
        &mut self,
        filter: Option<PhaseEvent>,
        listener: Box<dyn Listener>,
    ) -> SubscriptionId {
        self.bus.subscribe_boxed(filter, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn emit(&mut self, event: PhaseEvent) {
        // Listeners only get `&Session`, so they can't subscribe mid-emit
        let mut bus = std::mem::take(&mut self.bus);
        bus.emit(event, self);
        self.bus = bus;
    }

    // === Queries ===

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.roster.iter()
    }

    pub fn participant(&self, id: &ParticipantId) -> SessionResult<&Participant> {
        self.roster.get(id)
    }

    pub fn master(&self) -> Option<&Participant> {
        self.roster.master()
    }

    pub fn hand(&self, id: &ParticipantId) -> SessionResult<&[String]> {
        self.roster.hand(id)
    }

    pub fn outbox(&self, id: &ParticipantId) -> SessionResult<&dyn Outbox> {
        self.roster.outbox(id)
    }

    pub fn decks(&self) -> &Decks {
        &self.decks
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            phase: self.phase,
            participants: self.roster.iter().cloned().collect(),
            prompt: self.prompt.clone(),
            votes: self.votes.clone(),
        }
    }

    // === Internals ===

    fn all_voted(&self) -> bool {
        self.roster.iter().all(|p| !p.owes_vote())
    }

    /// Tear down after total disconnect. No auto-fill, no events.
    fn close(&mut self) {
        self.cancel_timer();
        self.closed = true;
        self.phase = Phase::End;
        self.prompt = None;
        self.votes.clear();
        log::info!("Session {}: closed, no participants left", self.id);
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.closed {
            return Err(SessionError::SessionClosed);
        }
        Ok(())
    }

    fn ensure_phase(&self, operation: &'static str, allowed: &[Phase]) -> SessionResult<()> {
        if !allowed.contains(&self.phase) {
            return Err(SessionError::InvalidPhase {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outbox::NullOutbox;
    use std::cell::Cell;

    fn new_session() -> Session {
        let decks = Decks::new(
            (0..20).map(|i| format!("prompt {i}")).collect(),
            (0..200).map(|i| format!("response {i}")).collect(),
        )
        .unwrap();
        Session::new(&SessionConfig::default(), decks).unwrap()
    }

    fn session_with(n: usize) -> (Session, Vec<ParticipantId>) {
        let mut session = new_session();
        let ids = (0..n)
            .map(|i| {
                session
                    .join(Box::new(NullOutbox), format!("player{i}"), i as u32, i == 0)
                    .unwrap()
                    .id
            })
            .collect();
        (session, ids)
    }

    fn voting_session(n: usize) -> (Session, Vec<ParticipantId>) {
        let (mut session, ids) = session_with(n);
        session.start_game().unwrap();
        let token = session.timer().unwrap().token;
        session.fire_timer(token).unwrap();
        (session, ids)
    }

    fn first_card(session: &Session, id: &ParticipantId) -> String {
        session.hand(id).unwrap()[0].clone()
    }

    #[test]
    fn test_start_game_arms_start_delay() {
        let (mut session, _) = session_with(3);
        session.start_game().unwrap();
        assert_eq!(session.phase(), Phase::Starting);
        let timer = session.timer().unwrap();
        assert_eq!(timer.kind, TimerKind::StartDelay);
        assert_eq!(timer.delay, Duration::from_secs(3));
    }

    #[test]
    fn test_start_game_needs_two_connected() {
        let (mut session, _) = session_with(1);
        assert_eq!(
            session.start_game(),
            Err(SessionError::NotEnoughParticipants {
                required: 2,
                connected: 1
            })
        );
        assert_eq!(session.phase(), Phase::Waiting);
    }

    #[test]
    fn test_start_game_twice_is_invalid() {
        let (mut session, _) = session_with(2);
        session.start_game().unwrap();
        let err = session.start_game().unwrap_err();
        assert_eq!(err.kind(), crate::game::errors::ErrorKind::InvalidPhase);
    }

    #[test]
    fn test_start_voting_deals_and_rotates() {
        let (session, ids) = voting_session(3);
        assert_eq!(session.phase(), Phase::Voting);
        assert!(session.prompt().is_some());
        for id in &ids {
            assert_eq!(session.hand(id).unwrap().len(), 10);
        }
        assert_eq!(session.master().unwrap().id, ids[0]);
        assert_eq!(session.timer().unwrap().kind, TimerKind::VotingCountdown);
    }

    #[test]
    fn test_vote_validation() {
        let (mut session, ids) = voting_session(3);
        let card = first_card(&session, &ids[0]);
        assert_eq!(
            session.vote(&ids[0], &card),
            Err(SessionError::MasterCannotVote)
        );
        assert_eq!(
            session.vote(&ids[1], "not a card"),
            Err(SessionError::CardNotInHand("not a card".to_string()))
        );
        assert_eq!(
            session.vote(&"ghost".into(), "x"),
            Err(SessionError::UnknownParticipant("ghost".into()))
        );

        let card = first_card(&session, &ids[1]);
        session.vote(&ids[1], &card).unwrap();
        assert_eq!(session.hand(&ids[1]).unwrap().len(), 9);
        assert!(!session.hand(&ids[1]).unwrap().contains(&card));

        let card = first_card(&session, &ids[1]);
        assert_eq!(
            session.vote(&ids[1], &card),
            Err(SessionError::AlreadyVoted(ids[1].clone()))
        );
        assert_eq!(session.votes().len(), 1);
        assert!(!session.votes()[0].visible);
    }

    #[test]
    fn test_last_vote_short_circuits_timer() {
        let (mut session, ids) = voting_session(3);
        for id in &ids[1..] {
            let card = first_card(&session, id);
            session.vote(id, &card).unwrap();
        }
        assert_eq!(session.phase(), Phase::Choosing);
        assert!(session.timer().is_none());
    }

    #[test]
    fn test_countdown_auto_fills_missing_votes() {
        let (mut session, ids) = voting_session(4);
        let card = first_card(&session, &ids[1]);
        session.vote(&ids[1], &card).unwrap();

        let token = session.timer().unwrap().token;
        assert!(session.fire_timer(token).unwrap());

        assert_eq!(session.phase(), Phase::Choosing);
        assert_eq!(session.votes().len(), 3);
        for id in &ids[1..] {
            assert!(session.participant(id).unwrap().voted);
            assert_eq!(session.hand(id).unwrap().len(), 9);
            assert_eq!(
                session.votes().iter().filter(|v| &v.user_id == id).count(),
                1
            );
        }
    }

    #[test]
    fn test_stale_timer_is_noop() {
        let (mut session, ids) = voting_session(3);
        let stale = session.timer().unwrap().token;
        for id in &ids[1..] {
            let card = first_card(&session, id);
            session.vote(id, &card).unwrap();
        }
        assert!(!session.fire_timer(stale).unwrap());
        assert_eq!(session.phase(), Phase::Choosing);
        assert_eq!(session.votes().len(), 2);
    }

    #[test]
    fn test_choose_reveals_then_choosing_best() {
        let (mut session, ids) = voting_session(3);
        let token = session.timer().unwrap().token;
        session.fire_timer(token).unwrap();

        session.choose(&ids[1]).unwrap();
        assert_eq!(session.phase(), Phase::Choosing);
        assert_eq!(
            session.choose(&ids[1]),
            Err(SessionError::AlreadyRevealed(ids[1].clone()))
        );
        assert_eq!(
            session.choose(&ids[0]),
            Err(SessionError::NoVote(ids[0].clone()))
        );
        session.choose(&ids[2]).unwrap();
        assert_eq!(session.phase(), Phase::ChoosingBest);
    }

    #[test]
    fn test_choose_best_loops_into_next_round() {
        let (mut session, ids) = voting_session(3);
        let token = session.timer().unwrap().token;
        session.fire_timer(token).unwrap();
        session.choose(&ids[1]).unwrap();
        session.choose(&ids[2]).unwrap();

        assert_eq!(session.choose_best(&ids[2]).unwrap(), 1);
        assert_eq!(session.phase(), Phase::Voting);
        assert_eq!(session.master().unwrap().id, ids[1]);
        assert!(session.votes().is_empty());
        assert!(session.participants().all(|p| !p.voted));
        for id in &ids {
            assert_eq!(session.hand(id).unwrap().len(), 10);
        }
    }

    #[test]
    fn test_winning_score_ends_game() {
        let (mut session, ids) = voting_session(2);
        session.roster.get_mut(&ids[1]).unwrap().score = 9;
        let token = session.timer().unwrap().token;
        session.fire_timer(token).unwrap();
        session.choose(&ids[1]).unwrap();

        assert_eq!(session.choose_best(&ids[1]).unwrap(), 10);
        assert_eq!(session.phase(), Phase::End);
        assert!(session.prompt().is_none());
        assert!(session.timer().is_none());
        for id in &ids {
            assert_eq!(session.participant(id).unwrap().score, 0);
            assert!(session.hand(id).unwrap().is_empty());
        }
        assert_eq!(session.decks().prompts.remaining(), 20);
    }

    #[test]
    fn test_end_game_allows_restart() {
        let (mut session, _) = voting_session(2);
        session.end_game().unwrap();
        session.start_game().unwrap();
        assert_eq!(session.phase(), Phase::Starting);
    }

    #[test]
    fn test_disconnect_in_waiting_removes() {
        let (mut session, ids) = session_with(3);
        let outcome = session
            .disconnect(&ids[0], DisconnectCallbacks::new())
            .unwrap();
        assert!(outcome.departure.removed);
        assert_eq!(outcome.departure.promoted_host, Some(ids[1].clone()));
        assert_eq!(session.participants().count(), 2);
        assert!(session.participant(&ids[1]).unwrap().host);
    }

    #[test]
    fn test_master_disconnect_hands_role_over() {
        let (mut session, ids) = voting_session(3);
        session
            .disconnect(&ids[0], DisconnectCallbacks::new())
            .unwrap();
        let master = session.master().unwrap();
        assert_eq!(master.id, ids[1]);
        assert!(session.participant(&ids[0]).unwrap().disconnected);
    }

    #[test]
    fn test_disconnect_completing_votes_starts_choosing() {
        let (mut session, ids) = voting_session(3);
        let card = first_card(&session, &ids[1]);
        session.vote(&ids[1], &card).unwrap();
        session
            .disconnect(&ids[2], DisconnectCallbacks::new())
            .unwrap();
        assert_eq!(session.phase(), Phase::Choosing);
        assert_eq!(session.votes().len(), 1);
    }

    #[test]
    fn test_disconnect_down_to_one_ends_game() {
        let (mut session, ids) = voting_session(2);
        let any_left = Cell::new(None);
        let outcome = session
            .disconnect(
                &ids[1],
                DisconnectCallbacks::new().on_disconnect(|any| any_left.set(Some(any))),
            )
            .unwrap();
        assert!(outcome.game_ended);
        assert_eq!(any_left.get(), Some(true));
        assert_eq!(session.phase(), Phase::End);
        assert_eq!(session.participants().count(), 1);
    }

    #[test]
    fn test_total_disconnect_closes_session() {
        let (mut session, ids) = session_with(1);
        let ended = Cell::new(false);
        let any_left = Cell::new(None);
        let outcome = session
            .disconnect(
                &ids[0],
                DisconnectCallbacks::new()
                    .on_session_end(|| ended.set(true))
                    .on_disconnect(|any| any_left.set(Some(any))),
            )
            .unwrap();
        assert!(outcome.session_ended);
        assert!(ended.get());
        assert_eq!(any_left.get(), Some(false));
        assert!(session.is_closed());
        assert_eq!(
            session
                .join(Box::new(NullOutbox), "late".to_string(), 0, true)
                .unwrap_err(),
            SessionError::SessionClosed
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let decks = Decks::new(vec!["p".to_string()], vec!["r".to_string()]).unwrap();
        let config = SessionConfig {
            hand_size: 0,
            ..SessionConfig::default()
        };
        assert!(Session::new(&config, decks).is_err());
    }

    #[test]
    fn test_disconnect_in_end_keeps_slot_until_next_end() {
        let (mut session, ids) = voting_session(3);
        session.end_game().unwrap();

        let outcome = session
            .disconnect(&ids[2], DisconnectCallbacks::new())
            .unwrap();
        assert!(!outcome.departure.removed);
        assert!(!outcome.game_ended);
        assert_eq!(session.phase(), Phase::End);
        assert!(session.participant(&ids[2]).unwrap().disconnected);

        let back = session
            .reconnect(&ids[2], Box::new(NullOutbox), 4)
            .unwrap();
        assert!(!back.disconnected);

        // Still disconnected at the next end_game, so pruned there
        session
            .disconnect(&ids[2], DisconnectCallbacks::new())
            .unwrap();
        session.start_game().unwrap();
        assert_eq!(session.participants().count(), 3);
        session.end_game().unwrap();
        assert_eq!(session.participants().count(), 2);
        assert!(session.participant(&ids[2]).is_err());
    }

    #[test]
    fn test_auto_fill_without_cards_is_rejected() {
        let (mut session, ids) = voting_session(3);
        session.roster.hand_mut(&ids[2]).unwrap().clear();

        assert_eq!(
            session.start_choosing(),
            Err(SessionError::EmptyHand(ids[2].clone()))
        );
        assert_eq!(session.phase(), Phase::Voting);
        assert!(session.votes().is_empty());
        assert!(session.timer().is_some());
        assert!(!session.participant(&ids[1]).unwrap().voted);
    }

    #[test]
    fn test_latecomer_gets_hand_mid_round() {
        let (mut session, _) = voting_session(2);
        let late = session
            .join(Box::new(NullOutbox), "late".to_string(), 3, false)
            .unwrap();
        assert_eq!(session.hand(&late.id).unwrap().len(), 10);
    }

    #[test]
    fn test_errors_leave_state_unchanged() {
        let (mut session, ids) = voting_session(3);
        let before = session.snapshot();
        assert!(session.choose(&ids[1]).is_err());
        assert!(session.choose_best(&ids[1]).is_err());
        assert!(session.vote(&ids[1], "nope").is_err());
        assert_eq!(session.snapshot(), before);
    }
}

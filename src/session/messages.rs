//! Session actor message types.

use tokio::sync::oneshot;

use crate::game::{
    DisconnectOutcome, Listener, Outbox, Participant, ParticipantId, PhaseEvent, SessionResult,
    SessionSnapshot, SubscriptionId,
};

/// Messages that can be sent to a SessionActor
pub enum SessionMessage {
    /// New participant
    Join {
        outbox: Box<dyn Outbox>,
        username: String,
        avatar_id: u32,
        host: bool,
        response: oneshot::Sender<SessionResult<Participant>>,
    },

    /// Known participant is back on a new connection
    Reconnect {
        id: ParticipantId,
        outbox: Box<dyn Outbox>,
        avatar_id: u32,
        response: oneshot::Sender<SessionResult<Participant>>,
    },

    /// Participant's connection went away
    Disconnect {
        id: ParticipantId,
        response: oneshot::Sender<SessionResult<DisconnectOutcome>>,
    },

    /// Host starts the game
    StartGame {
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Submit a response card
    Vote {
        id: ParticipantId,
        text: String,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Master reveals one vote
    Choose {
        user_id: ParticipantId,
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Master picks the round winner
    ChooseBest {
        user_id: ParticipantId,
        response: oneshot::Sender<SessionResult<u32>>,
    },

    /// Reset the game to `end`
    EndGame {
        response: oneshot::Sender<SessionResult<()>>,
    },

    /// Current public state
    GetSnapshot {
        response: oneshot::Sender<SessionSnapshot>,
    },

    /// One participant's private hand
    GetHand {
        id: ParticipantId,
        response: oneshot::Sender<SessionResult<Vec<String>>>,
    },

    /// Subscribe to phase events (`filter == None` for all of them)
    Subscribe {
        filter: Option<PhaseEvent>,
        listener: Box<dyn Listener>,
        response: oneshot::Sender<SubscriptionId>,
    },

    /// Drop a subscription
    Unsubscribe { id: SubscriptionId },
}

impl SessionMessage {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Reconnect { .. } => "reconnect",
            Self::Disconnect { .. } => "disconnect",
            Self::StartGame { .. } => "start_game",
            Self::Vote { .. } => "vote",
            Self::Choose { .. } => "choose",
            Self::ChooseBest { .. } => "choose_best",
            Self::EndGame { .. } => "end_game",
            Self::GetSnapshot { .. } => "get_snapshot",
            Self::GetHand { .. } => "get_hand",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

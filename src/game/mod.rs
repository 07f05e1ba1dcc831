//! Game engine - round state machine and its building blocks.
//!
//! This module provides the synchronous core of a session:
//! - Shuffle-and-draw card pools for prompts and responses
//! - Participant registry with private hands and outboxes
//! - The phase state machine with master rotation, votes and scoring
//! - Phase-change notifications for transport listeners

pub mod entities;
pub mod errors;
pub mod events;
pub mod outbox;
pub mod pool;
pub mod roster;
pub mod state_machine;

pub use entities::{Participant, ParticipantId, Phase, SessionId, SessionSnapshot, Vote};
pub use errors::{ErrorKind, SessionError, SessionResult};
pub use events::{BroadcastListener, EventBus, Listener, PhaseEvent, SubscriptionId};
pub use outbox::{NullOutbox, Outbound, Outbox};
pub use pool::{CardPool, Decks};
pub use roster::{Departure, Roster};
pub use state_machine::{
    ArmedTimer, DisconnectCallbacks, DisconnectOutcome, Session, TimerKind, TimerToken,
};

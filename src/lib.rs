//! # Kado
//!
//! A real-time session engine for round-based party card games.
//!
//! A small group joins a session, one participant per round acts as the
//! *master* who draws a prompt card, everyone else answers with a card from
//! their private hand, and the master reveals the answers and picks the best
//! one. The winner scores a point; first to the winning score ends the game.
//!
//! ## Architecture
//!
//! The session moves through six phases:
//!
//! - **Waiting**: Participants gather, the host can start
//! - **Starting**: Short delay before the first round
//! - **Voting**: Non-masters submit a response card, bounded by a countdown
//! - **Choosing**: The master reveals the submitted cards one by one
//! - **ChoosingBest**: The master picks the round winner
//! - **End**: Game over; scores, hands and pools are reset for another game
//!
//! ## Core Modules
//!
//! - [`game`]: Card pools, participant registry, state machine and events
//! - [`session`]: Async actor serializing access to one session
//! - [`config`]: Session tunables and environment loading
//!
//! ## Example
//!
//! ```
//! use kado::{Decks, NullOutbox, Phase, Session, SessionConfig};
//!
//! let decks = Decks::new(
//!     vec!["Worst superpower: ____.".to_string()],
//!     (0..30).map(|i| format!("card {i}")).collect(),
//! )
//! .unwrap();
//! let mut session = Session::new(&SessionConfig::default(), decks).unwrap();
//!
//! session.join(Box::new(NullOutbox), "alice".to_string(), 0, true).unwrap();
//! session.join(Box::new(NullOutbox), "bob".to_string(), 1, false).unwrap();
//! session.start_game().unwrap();
//! assert_eq!(session.phase(), Phase::Starting);
//! ```

/// Session configuration.
pub mod config;
pub use config::{ConfigError, SessionConfig};

/// Core game logic, entities, and state machine.
pub mod game;
pub use game::{
    BroadcastListener, CardPool, Decks, DisconnectCallbacks, DisconnectOutcome, ErrorKind,
    Listener, NullOutbox, Outbound, Outbox, Participant, ParticipantId, Phase, PhaseEvent,
    Session, SessionError, SessionId, SessionResult, SessionSnapshot, SubscriptionId, Vote,
};

/// Async session actor.
pub mod session;
pub use session::{SessionActor, SessionHandle};

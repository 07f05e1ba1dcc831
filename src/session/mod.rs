//! Session module running one game session behind an async actor.
//!
//! This module implements:
//! - SessionActor: Tokio task owning a [`Session`](crate::game::Session) and its timer
//! - SessionHandle: Cloneable handle turning calls into messages
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each session runs in its own Tokio task with an mpsc message inbox.
//! Operations and timer expiries are handled one at a time, so every
//! transition sees the session exactly as the previous one left it.
//!
//! ## Example
//!
//! ```no_run
//! use kado::{Decks, Outbound, SessionActor, SessionConfig};
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let decks = Decks::new(
//!     vec!["Best way to spend a Sunday: ____.".to_string()],
//!     vec!["A nap".to_string(), "Tax returns".to_string()],
//! )?;
//! let handle = SessionActor::spawn(&SessionConfig::default(), decks)?;
//!
//! let (outbox, _inbox) = mpsc::unbounded_channel::<Outbound>();
//! let host = handle.join(outbox, "alice", 0, true).await?;
//! println!("{} joined session {}", host.username, handle.session_id());
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod messages;

pub use actor::{SessionActor, SessionHandle};
pub use messages::SessionMessage;

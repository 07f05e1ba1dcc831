//! Outbound delivery to a single participant.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{entities::SessionSnapshot, events::PhaseEvent};

/// Payload pushed to a participant after a phase change.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Outbound {
    pub event: PhaseEvent,
    pub snapshot: SessionSnapshot,
    /// The receiving participant's own hand; never anyone else's
    pub hand: Vec<String>,
}

/// Send capability for one participant's connection.
///
/// Delivery is fire-and-forget: the session never waits on it and never
/// learns whether the payload arrived.
pub trait Outbox: Send + 'static {
    fn send(&self, payload: Outbound);
}

impl Outbox for mpsc::Sender<Outbound> {
    fn send(&self, payload: Outbound) {
        match self.try_send(payload) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(payload)) => {
                log::warn!("Outbox full, dropping {} payload", payload.event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Outbox closed, dropping payload");
            }
        }
    }
}

impl Outbox for mpsc::UnboundedSender<Outbound> {
    fn send(&self, payload: Outbound) {
        if mpsc::UnboundedSender::send(self, payload).is_err() {
            log::debug!("Outbox closed, dropping payload");
        }
    }
}

/// JSON text frames, for transports that forward strings straight to a socket.
impl Outbox for mpsc::Sender<String> {
    fn send(&self, payload: Outbound) {
        let text = match serde_json::to_string(&payload) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to serialize outbound payload: {}", e);
                return;
            }
        };
        match self.try_send(text) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!("Outbox full, dropping {} payload", payload.event);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!("Outbox closed, dropping payload");
            }
        }
    }
}

/// Outbox that drops everything, for participants driven without a transport.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullOutbox;

impl Outbox for NullOutbox {
    fn send(&self, _payload: Outbound) {}
}

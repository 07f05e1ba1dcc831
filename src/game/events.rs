//! Phase-change notifications.
//!
//! Listeners subscribe to one [`PhaseEvent`] (or all of them) and are called
//! synchronously, in subscription order, with a read-only view of the session
//! right after the transition. A failing or panicking listener is logged and
//! skipped; the remaining listeners still run.

use serde::{Deserialize, Serialize};
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

use super::{outbox::Outbound, state_machine::Session};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseEvent {
    Starting,
    Voting,
    Choosing,
    ChoosingBest,
    End,
}

impl fmt::Display for PhaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Starting => "starting",
            Self::Voting => "voting",
            Self::Choosing => "choosing",
            Self::ChoosingBest => "choosingbest",
            Self::End => "end",
        };
        write!(f, "{repr}")
    }
}

pub trait Listener: Send + 'static {
    fn on_event(&mut self, event: PhaseEvent, session: &Session) -> anyhow::Result<()>;
}

impl<F> Listener for F
where
    F: FnMut(PhaseEvent, &Session) -> anyhow::Result<()> + Send + 'static,
{
    fn on_event(&mut self, event: PhaseEvent, session: &Session) -> anyhow::Result<()> {
        self(event, session)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` listens to every event
    filter: Option<PhaseEvent>,
    listener: Box<dyn Listener>,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EventBus {
    pub fn subscribe(&mut self, event: PhaseEvent, listener: impl Listener) -> SubscriptionId {
        self.subscribe_boxed(Some(event), Box::new(listener))
    }

    pub fn subscribe_all(&mut self, listener: impl Listener) -> SubscriptionId {
        self.subscribe_boxed(None, Box::new(listener))
    }

    /// `filter == None` subscribes to every event
    pub fn subscribe_boxed(
        &mut self,
        filter: Option<PhaseEvent>,
        listener: Box<dyn Listener>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            filter,
            listener,
        });
        id
    }

    /// Returns whether the subscription existed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn emit(&mut self, event: PhaseEvent, session: &Session) {
        for subscription in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.filter.is_none_or(|filter| filter == event))
        {
            let listener = &mut subscription.listener;
            match catch_unwind(AssertUnwindSafe(|| listener.on_event(event, session))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!(
                        "Session {}: listener {:?} failed on {}: {:#}",
                        session.id(),
                        subscription.id,
                        event,
                        e
                    );
                }
                Err(_) => {
                    log::error!(
                        "Session {}: listener {:?} panicked on {}",
                        session.id(),
                        subscription.id,
                        event
                    );
                }
            }
        }
    }
}

/// Pushes every connected participant the redacted snapshot plus their own
/// hand through their outbox.
#[derive(Clone, Copy, Debug, Default)]
pub struct BroadcastListener;

impl Listener for BroadcastListener {
    fn on_event(&mut self, event: PhaseEvent, session: &Session) -> anyhow::Result<()> {
        let snapshot = session.snapshot().redacted();
        for participant in session.participants().filter(|p| !p.disconnected) {
            let hand = session.hand(&participant.id)?.to_vec();
            session.outbox(&participant.id)?.send(Outbound {
                event,
                snapshot: snapshot.clone(),
                hand,
            });
        }
        Ok(())
    }
}

//! Session actor implementation with async message handling.

use std::future;
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Instant},
};

use super::messages::SessionMessage;
use crate::{
    config::{ConfigError, SessionConfig},
    game::{
        Decks, DisconnectCallbacks, DisconnectOutcome, Listener, Outbox, Participant,
        ParticipantId, PhaseEvent, Session, SessionError, SessionId, SessionResult,
        SessionSnapshot, SubscriptionId, TimerToken,
    },
};

/// Session actor handle for sending messages
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    session_id: SessionId,
}

impl SessionHandle {
    /// Create a new session handle
    pub fn new(sender: mpsc::Sender<SessionMessage>, session_id: SessionId) -> Self {
        Self { sender, session_id }
    }

    /// Get session ID
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message and wait for the reply
    async fn request<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> SessionResult<T> {
        let (response, reply) = oneshot::channel();
        self.sender
            .send(message(response))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        reply.await.map_err(|_| SessionError::SessionClosed)
    }

    pub async fn join(
        &self,
        outbox: impl Outbox,
        username: impl Into<String>,
        avatar_id: u32,
        host: bool,
    ) -> SessionResult<Participant> {
        let username = username.into();
        self.request(|response| SessionMessage::Join {
            outbox: Box::new(outbox),
            username,
            avatar_id,
            host,
            response,
        })
        .await?
    }

    pub async fn reconnect(
        &self,
        id: ParticipantId,
        outbox: impl Outbox,
        avatar_id: u32,
    ) -> SessionResult<Participant> {
        self.request(|response| SessionMessage::Reconnect {
            id,
            outbox: Box::new(outbox),
            avatar_id,
            response,
        })
        .await?
    }

    pub async fn disconnect(&self, id: ParticipantId) -> SessionResult<DisconnectOutcome> {
        self.request(|response| SessionMessage::Disconnect { id, response })
            .await?
    }

    pub async fn start_game(&self) -> SessionResult<()> {
        self.request(|response| SessionMessage::StartGame { response })
            .await?
    }

    pub async fn vote(&self, id: ParticipantId, text: impl Into<String>) -> SessionResult<()> {
        let text = text.into();
        self.request(|response| SessionMessage::Vote { id, text, response })
            .await?
    }

    pub async fn choose(&self, user_id: ParticipantId) -> SessionResult<()> {
        self.request(|response| SessionMessage::Choose { user_id, response })
            .await?
    }

    pub async fn choose_best(&self, user_id: ParticipantId) -> SessionResult<u32> {
        self.request(|response| SessionMessage::ChooseBest { user_id, response })
            .await?
    }

    pub async fn end_game(&self) -> SessionResult<()> {
        self.request(|response| SessionMessage::EndGame { response })
            .await?
    }

    pub async fn snapshot(&self) -> SessionResult<SessionSnapshot> {
        self.request(|response| SessionMessage::GetSnapshot { response })
            .await
    }

    pub async fn hand(&self, id: ParticipantId) -> SessionResult<Vec<String>> {
        self.request(|response| SessionMessage::GetHand { id, response })
            .await?
    }

    pub async fn subscribe(
        &self,
        event: PhaseEvent,
        listener: impl Listener,
    ) -> SessionResult<SubscriptionId> {
        self.request(|response| SessionMessage::Subscribe {
            filter: Some(event),
            listener: Box::new(listener),
            response,
        })
        .await
    }

    pub async fn subscribe_all(&self, listener: impl Listener) -> SessionResult<SubscriptionId> {
        self.request(|response| SessionMessage::Subscribe {
            filter: None,
            listener: Box::new(listener),
            response,
        })
        .await
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> SessionResult<()> {
        self.sender
            .send(SessionMessage::Unsubscribe { id })
            .await
            .map_err(|_| SessionError::SessionClosed)
    }
}

/// Session actor owning one game session and its timer.
///
/// Every operation, including timer expiry, runs to completion inside the
/// actor's loop, so no two of them ever interleave on the same session.
pub struct SessionActor {
    /// Round state machine
    session: Session,

    /// Message inbox
    inbox: mpsc::Receiver<SessionMessage>,

    /// Deadline of the timer the session currently has armed
    armed: Option<(TimerToken, Instant)>,
}

impl SessionActor {
    /// Create a new session actor
    ///
    /// # Arguments
    ///
    /// * `config` - Session configuration
    /// * `decks` - Prompt and response pools for this session
    ///
    /// # Returns
    ///
    /// * `(SessionActor, SessionHandle)` - Actor and handle for sending messages
    pub fn new(config: &SessionConfig, decks: Decks) -> Result<(Self, SessionHandle), ConfigError> {
        let session = Session::new(config, decks)?;
        let (sender, inbox) = mpsc::channel(config.mailbox_capacity);
        let handle = SessionHandle::new(sender, session.id().clone());

        let actor = Self {
            session,
            inbox,
            armed: None,
        };

        Ok((actor, handle))
    }

    /// Create the actor and run it on the current Tokio runtime
    pub fn spawn(config: &SessionConfig, decks: Decks) -> Result<SessionHandle, ConfigError> {
        let (actor, handle) = Self::new(config, decks)?;
        tokio::spawn(actor.run());
        Ok(handle)
    }

    /// Run the session actor event loop
    ///
    /// Stops when every handle is dropped or when the last connected
    /// participant disconnects.
    pub async fn run(mut self) {
        log::info!("Session {} starting", self.session.id());

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        log::debug!("Session {}: all handles dropped", self.session.id());
                        break;
                    };
                    self.handle_message(message);
                }

                Some(token) = wait_for(self.armed) => {
                    self.armed = None;
                    if let Err(e) = self.session.fire_timer(token) {
                        log::error!("Session {}: timer transition failed: {}", self.session.id(), e);
                    }
                }
            }

            if self.session.is_closed() {
                break;
            }
            self.sync_timer();
        }

        self.armed = None;
        log::info!("Session {} closed", self.session.id());
    }

    /// Handle a session message
    fn handle_message(&mut self, message: SessionMessage) {
        log::trace!("Session {}: {}", self.session.id(), message.name());

        match message {
            SessionMessage::Join {
                outbox,
                username,
                avatar_id,
                host,
                response,
            } => {
                let result = self.session.join(outbox, username, avatar_id, host);
                let _ = response.send(result);
            }

            SessionMessage::Reconnect {
                id,
                outbox,
                avatar_id,
                response,
            } => {
                let result = self.session.reconnect(&id, outbox, avatar_id);
                let _ = response.send(result);
            }

            SessionMessage::Disconnect { id, response } => {
                let session_id = self.session.id().clone();
                let callbacks = DisconnectCallbacks::new().on_session_end(|| {
                    log::info!("Session {}: last participant left, shutting down", session_id);
                });
                let result = self.session.disconnect(&id, callbacks);
                let _ = response.send(result);
            }

            SessionMessage::StartGame { response } => {
                let _ = response.send(self.session.start_game());
            }

            SessionMessage::Vote { id, text, response } => {
                let _ = response.send(self.session.vote(&id, &text));
            }

            SessionMessage::Choose { user_id, response } => {
                let _ = response.send(self.session.choose(&user_id));
            }

            SessionMessage::ChooseBest { user_id, response } => {
                let _ = response.send(self.session.choose_best(&user_id));
            }

            SessionMessage::EndGame { response } => {
                let _ = response.send(self.session.end_game());
            }

            SessionMessage::GetSnapshot { response } => {
                let _ = response.send(self.session.snapshot());
            }

            SessionMessage::GetHand { id, response } => {
                let result = self.session.hand(&id).map(<[String]>::to_vec);
                let _ = response.send(result);
            }

            SessionMessage::Subscribe {
                filter,
                listener,
                response,
            } => {
                let id = self.session.subscribe_boxed(filter, listener);
                let _ = response.send(id);
            }

            SessionMessage::Unsubscribe { id } => {
                self.session.unsubscribe(id);
            }
        }
    }

    /// Follow the session's armed timer: a new token gets a fresh deadline,
    /// a dropped timer drops ours.
    fn sync_timer(&mut self) {
        match (self.session.timer(), self.armed) {
            (Some(timer), Some((token, _))) if timer.token == token => {}
            (Some(timer), _) => {
                log::debug!(
                    "Session {}: {:?} timer armed for {:?}",
                    self.session.id(),
                    timer.kind,
                    timer.delay
                );
                self.armed = Some((timer.token, Instant::now() + timer.delay));
            }
            (None, Some(_)) => {
                log::debug!("Session {}: timer cancelled", self.session.id());
                self.armed = None;
            }
            (None, None) => {}
        }
    }
}

/// Resolves with the token once its deadline passes; never resolves when
/// nothing is armed.
async fn wait_for(armed: Option<(TimerToken, Instant)>) -> Option<TimerToken> {
    match armed {
        Some((token, deadline)) => {
            time::sleep_until(deadline).await;
            Some(token)
        }
        None => future::pending().await,
    }
}

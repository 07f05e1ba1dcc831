//! Session error types.

use thiserror::Error;

use super::entities::{ParticipantId, Phase};

/// Broad category of a [`SessionError`].
///
/// Callers that only need to know whether to report, retry after a phase
/// change, or treat the failure as a bug can match on this instead of the
/// individual variants.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The operation referenced a participant (or vote) the session doesn't track.
    UnknownParticipant,
    /// The participant already did what the operation asks for this round.
    AlreadyActed,
    /// The operation isn't valid in the current phase.
    InvalidPhase,
    /// An internal invariant or construction precondition doesn't hold.
    Precondition,
}

/// Errors returned by session operations
///
/// Every operation validates all of its preconditions before it mutates
/// anything, so an error always leaves the session unchanged.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    /// Participant is not part of this session
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    /// Participant has no vote in the current round
    #[error("participant {0} did not vote")]
    NoVote(ParticipantId),

    /// Participant already voted this round
    #[error("participant {0} already voted")]
    AlreadyVoted(ParticipantId),

    /// Vote was already revealed
    #[error("vote of {0} already revealed")]
    AlreadyRevealed(ParticipantId),

    /// Operation attempted outside of its valid phases
    #[error("can't {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: Phase,
    },

    /// The master reveals votes, it doesn't submit one
    #[error("master can't vote")]
    MasterCannotVote,

    /// Not enough connected participants to start
    #[error("need {required}+ connected participants, have {connected}")]
    NotEnoughParticipants { required: usize, connected: usize },

    /// Every participant left and the session was torn down
    #[error("session is closed")]
    SessionClosed,

    /// Submitted card isn't in the voter's hand
    #[error("card {0:?} is not in hand")]
    CardNotInHand(String),

    /// A pool was built from an empty source set
    #[error("{0} pool has no cards")]
    EmptyPool(&'static str),

    /// Rotation couldn't find a connected participant to promote
    #[error("no connected participant can be master")]
    NoEligibleMaster,

    /// Participant owes a vote but holds no card to submit for them
    #[error("participant {0} has no card to submit")]
    EmptyHand(ParticipantId),
}

impl SessionError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownParticipant(_) | Self::NoVote(_) => ErrorKind::UnknownParticipant,
            Self::AlreadyVoted(_) | Self::AlreadyRevealed(_) => ErrorKind::AlreadyActed,
            Self::InvalidPhase { .. }
            | Self::MasterCannotVote
            | Self::NotEnoughParticipants { .. }
            | Self::SessionClosed => ErrorKind::InvalidPhase,
            Self::CardNotInHand(_)
            | Self::EmptyPool(_)
            | Self::NoEligibleMaster
            | Self::EmptyHand(_) => ErrorKind::Precondition,
        }
    }
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

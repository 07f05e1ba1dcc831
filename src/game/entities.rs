use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// Generates a short random alphanumeric token.
pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn generate(len: usize) -> Self {
        Self(random_token(len))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ParticipantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParticipantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate(len: usize) -> Self {
        Self(random_token(len))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Phases of a round. `Voting -> Choosing -> ChoosingBest` repeats until
/// someone reaches the winning score.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Waiting,
    Starting,
    Voting,
    Choosing,
    ChoosingBest,
    End,
}

impl Phase {
    /// Whether a round cycle is underway (participants keep their slot on
    /// disconnect instead of being removed).
    pub fn in_progress(&self) -> bool {
        !matches!(self, Self::Waiting | Self::End)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Starting => "starting",
            Self::Voting => "voting",
            Self::Choosing => "choosing",
            Self::ChoosingBest => "choosingbest",
            Self::End => "end",
        };
        write!(f, "{repr}")
    }
}

/// Public state of one participant. Hands and send channels are private
/// and live in the roster.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub username: String,
    pub avatar_id: u32,
    pub score: u32,
    pub host: bool,
    pub master: bool,
    pub voted: bool,
    pub disconnected: bool,
}

impl Participant {
    pub fn new(id: ParticipantId, username: String, avatar_id: u32, host: bool) -> Self {
        Self {
            id,
            username,
            avatar_id,
            score: 0,
            host,
            master: false,
            voted: false,
            disconnected: false,
        }
    }

    /// Connected, not master, hasn't voted yet.
    pub fn owes_vote(&self) -> bool {
        !self.master && !self.voted && !self.disconnected
    }
}

/// A response card submitted for the current round.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Vote {
    pub text: String,
    pub user_id: ParticipantId,
    pub visible: bool,
}

impl Vote {
    pub fn hidden(text: String, user_id: ParticipantId) -> Self {
        Self {
            text,
            user_id,
            visible: false,
        }
    }
}

/// Point-in-time copy of the public session state, handed to listeners.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub phase: Phase,
    pub participants: Vec<Participant>,
    pub prompt: Option<String>,
    pub votes: Vec<Vote>,
}

impl SessionSnapshot {
    /// Copy with the text of hidden votes blanked, safe to show the group.
    pub fn redacted(&self) -> Self {
        let mut snapshot = self.clone();
        for vote in snapshot.votes.iter_mut().filter(|vote| !vote.visible) {
            vote.text.clear();
        }
        snapshot
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }
}

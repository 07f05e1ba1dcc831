//! Participant registry: public participant state, private hands and
//! outboxes, host promotion and master rotation.

use std::collections::HashMap;

use super::{
    entities::{Participant, ParticipantId},
    errors::{SessionError, SessionResult},
    outbox::Outbox,
    pool::CardPool,
};

/// Private per-participant data, keyed by participant ID and dropped in the
/// same call that removes the participant.
struct PrivateData {
    outbox: Box<dyn Outbox>,
    hand: Vec<String>,
}

/// Result of taking a participant out of play
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Departure {
    pub participant: Participant,
    /// Removed outright rather than flagged as disconnected
    pub removed: bool,
    pub connected_remaining: usize,
    pub promoted_host: Option<ParticipantId>,
}

pub struct Roster {
    /// Stable seating order; rotation walks this list
    participants: Vec<Participant>,
    private: HashMap<ParticipantId, PrivateData>,
    /// Where the next master search starts
    master_index: usize,
    id_length: usize,
}

impl Roster {
    pub fn new(id_length: usize) -> Self {
        Self {
            participants: Vec::new(),
            private: HashMap::new(),
            master_index: 0,
            id_length,
        }
    }

    /// Add a participant with a fresh ID, zero score and an empty hand
    pub fn join(
        &mut self,
        outbox: Box<dyn Outbox>,
        username: String,
        avatar_id: u32,
        host: bool,
    ) -> Participant {
        let mut id = ParticipantId::generate(self.id_length);
        while self.private.contains_key(&id) {
            id = ParticipantId::generate(self.id_length);
        }

        let participant = Participant::new(id.clone(), username, avatar_id, host);
        self.participants.push(participant.clone());
        self.private.insert(
            id,
            PrivateData {
                outbox,
                hand: Vec::new(),
            },
        );
        participant
    }

    /// Rebind the outbox of a known participant and mark them connected
    pub fn reconnect(
        &mut self,
        id: &ParticipantId,
        outbox: Box<dyn Outbox>,
        avatar_id: u32,
    ) -> SessionResult<Participant> {
        let idx = self.index_of(id)?;
        let data = self
            .private
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))?;
        data.outbox = outbox;

        let participant = &mut self.participants[idx];
        participant.disconnected = false;
        participant.avatar_id = avatar_id;
        Ok(participant.clone())
    }

    /// Remove the participant (`remove == true`) or flag them disconnected,
    /// then hand the host role to the first connected participant if needed.
    pub fn depart(&mut self, id: &ParticipantId, remove: bool) -> SessionResult<Departure> {
        let idx = self.index_of(id)?;

        let participant = if remove {
            self.private.remove(id);
            let participant = self.participants.remove(idx);
            self.clamp_rotation_after_removal(idx);
            participant
        } else {
            let participant = &mut self.participants[idx];
            participant.disconnected = true;
            participant.clone()
        };

        let connected_remaining = self.connected_count();
        let mut promoted_host = None;
        if participant.host && connected_remaining > 0 && !self.connected().any(|p| p.host) {
            if !remove {
                self.participants[idx].host = false;
            }
            if let Some(next) = self.participants.iter_mut().find(|p| !p.disconnected) {
                next.host = true;
                promoted_host = Some(next.id.clone());
            }
        }

        Ok(Departure {
            participant,
            removed: remove,
            connected_remaining,
            promoted_host,
        })
    }

    /// Keep the rotation pointer aimed at the same participant after the
    /// entry at `removed_idx` is gone, wrapping to the start if it fell off
    /// the end.
    fn clamp_rotation_after_removal(&mut self, removed_idx: usize) {
        if removed_idx < self.master_index {
            self.master_index -= 1;
        }
        if self.master_index >= self.participants.len() {
            self.master_index = 0;
        }
    }

    /// Move the master flag to the next connected participant.
    ///
    /// The search starts at the rotation pointer and skips disconnected
    /// participants; the pointer then moves one past the new master.
    pub fn rotate_master(&mut self) -> SessionResult<ParticipantId> {
        if self.participants.is_empty() {
            return Err(SessionError::NoEligibleMaster);
        }

        let start = if self.master_index < self.participants.len() {
            self.master_index
        } else {
            0
        };
        let chosen = if self.participants[start].disconnected {
            self.next_connected_after(start)
                .ok_or(SessionError::NoEligibleMaster)?
        } else {
            start
        };
        let next = self
            .next_connected_after(chosen)
            .ok_or(SessionError::NoEligibleMaster)?;

        for participant in self.participants.iter_mut() {
            participant.master = false;
        }
        let master = &mut self.participants[chosen];
        master.master = true;
        self.master_index = next;
        Ok(master.id.clone())
    }

    fn next_connected_after(&self, from: usize) -> Option<usize> {
        let len = self.participants.len();
        (1..=len)
            .map(|step| (from + step) % len)
            .find(|&idx| !self.participants[idx].disconnected)
    }

    /// Fill every hand up to `hand_size`; hands already that large are left alone
    pub fn top_up_hands(&mut self, responses: &mut CardPool, hand_size: usize) {
        for data in self.private.values_mut() {
            Self::top_up(data, responses, hand_size);
        }
    }

    pub fn top_up_hand(
        &mut self,
        id: &ParticipantId,
        responses: &mut CardPool,
        hand_size: usize,
    ) -> SessionResult<()> {
        let data = self
            .private
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))?;
        Self::top_up(data, responses, hand_size);
        Ok(())
    }

    fn top_up(data: &mut PrivateData, responses: &mut CardPool, hand_size: usize) {
        let deficit = hand_size.saturating_sub(data.hand.len());
        data.hand.extend(responses.draw_many(deficit));
    }

    /// Drop disconnected participants and reset everyone else to a fresh
    /// state: no score, no hand, no roles except host.
    pub fn reset_for_new_cycle(&mut self) {
        let private = &mut self.private;
        self.participants.retain(|p| {
            if p.disconnected {
                private.remove(&p.id);
            }
            !p.disconnected
        });
        for participant in self.participants.iter_mut() {
            participant.master = false;
            participant.voted = false;
            participant.score = 0;
        }
        for data in self.private.values_mut() {
            data.hand.clear();
        }
        self.master_index = 0;
    }

    pub fn clear_votes(&mut self) {
        for participant in self.participants.iter_mut() {
            participant.voted = false;
        }
    }

    fn index_of(&self, id: &ParticipantId) -> SessionResult<usize> {
        self.participants
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))
    }

    pub fn get(&self, id: &ParticipantId) -> SessionResult<&Participant> {
        let idx = self.index_of(id)?;
        Ok(&self.participants[idx])
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> SessionResult<&mut Participant> {
        let idx = self.index_of(id)?;
        Ok(&mut self.participants[idx])
    }

    pub fn hand(&self, id: &ParticipantId) -> SessionResult<&[String]> {
        self.private
            .get(id)
            .map(|data| data.hand.as_slice())
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))
    }

    pub fn hand_mut(&mut self, id: &ParticipantId) -> SessionResult<&mut Vec<String>> {
        self.private
            .get_mut(id)
            .map(|data| &mut data.hand)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))
    }

    pub fn outbox(&self, id: &ParticipantId) -> SessionResult<&dyn Outbox> {
        self.private
            .get(id)
            .map(|data| data.outbox.as_ref())
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn connected(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.disconnected)
    }

    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    pub fn master(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.master)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn master_index(&self) -> usize {
        self.master_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::outbox::NullOutbox;

    fn roster_with(names: &[&str]) -> (Roster, Vec<ParticipantId>) {
        let mut roster = Roster::new(5);
        let ids = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                roster
                    .join(Box::new(NullOutbox), name.to_string(), i as u32, i == 0)
                    .id
            })
            .collect();
        (roster, ids)
    }

    #[test]
    fn test_join_initial_state() {
        let (roster, ids) = roster_with(&["alice", "bob"]);
        let alice = roster.get(&ids[0]).unwrap();
        assert!(alice.host);
        assert_eq!(alice.score, 0);
        assert!(!alice.master && !alice.voted && !alice.disconnected);
        assert!(roster.hand(&ids[0]).unwrap().is_empty());
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_reconnect_unknown_participant() {
        let (mut roster, _) = roster_with(&["alice"]);
        let err = roster
            .reconnect(&"nope".into(), Box::new(NullOutbox), 0)
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownParticipant("nope".into()));
    }

    #[test]
    fn test_reconnect_clears_disconnected() {
        let (mut roster, ids) = roster_with(&["alice", "bob"]);
        roster.depart(&ids[1], false).unwrap();
        let bob = roster.reconnect(&ids[1], Box::new(NullOutbox), 7).unwrap();
        assert!(!bob.disconnected);
        assert_eq!(bob.avatar_id, 7);
    }

    #[test]
    fn test_remove_drops_private_data() {
        let (mut roster, ids) = roster_with(&["alice", "bob"]);
        let departure = roster.depart(&ids[1], true).unwrap();
        assert!(departure.removed);
        assert_eq!(roster.len(), 1);
        assert!(roster.hand(&ids[1]).is_err());
    }

    #[test]
    fn test_host_promoted_once() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        let departure = roster.depart(&ids[0], false).unwrap();
        assert_eq!(departure.promoted_host, Some(ids[1].clone()));
        assert!(!roster.get(&ids[0]).unwrap().host);
        assert!(roster.get(&ids[1]).unwrap().host);
        assert!(!roster.get(&ids[2]).unwrap().host);
        assert_eq!(departure.connected_remaining, 2);
    }

    #[test]
    fn test_no_promotion_when_nobody_left() {
        let (mut roster, ids) = roster_with(&["alice"]);
        let departure = roster.depart(&ids[0], false).unwrap();
        assert_eq!(departure.promoted_host, None);
        assert_eq!(departure.connected_remaining, 0);
    }

    #[test]
    fn test_rotation_order_and_wrap() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        assert_eq!(roster.rotate_master().unwrap(), ids[0]);
        assert_eq!(roster.rotate_master().unwrap(), ids[1]);
        assert_eq!(roster.rotate_master().unwrap(), ids[2]);
        assert_eq!(roster.rotate_master().unwrap(), ids[0]);
        assert_eq!(roster.iter().filter(|p| p.master).count(), 1);
    }

    #[test]
    fn test_rotation_skips_disconnected() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        roster.rotate_master().unwrap();
        roster.depart(&ids[1], false).unwrap();
        assert_eq!(roster.rotate_master().unwrap(), ids[2]);
        assert_eq!(roster.rotate_master().unwrap(), ids[0]);
    }

    #[test]
    fn test_rotation_without_connected_participants() {
        let (mut roster, ids) = roster_with(&["alice"]);
        roster.depart(&ids[0], false).unwrap();
        assert_eq!(roster.rotate_master(), Err(SessionError::NoEligibleMaster));
    }

    #[test]
    fn test_removal_before_pointer_shifts_it() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        roster.rotate_master().unwrap();
        roster.rotate_master().unwrap();
        // pointer now at carol (index 2)
        assert_eq!(roster.master_index(), 2);
        roster.depart(&ids[0], true).unwrap();
        assert_eq!(roster.master_index(), 1);
        assert_eq!(roster.rotate_master().unwrap(), ids[2]);
    }

    #[test]
    fn test_removal_at_end_wraps_pointer() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        roster.rotate_master().unwrap();
        roster.rotate_master().unwrap();
        roster.depart(&ids[2], true).unwrap();
        assert_eq!(roster.master_index(), 0);
        assert_eq!(roster.rotate_master().unwrap(), ids[0]);
    }

    #[test]
    fn test_top_up_never_shrinks() {
        let (mut roster, ids) = roster_with(&["alice", "bob"]);
        let mut pool = CardPool::new(
            "response",
            (0..100).map(|i| i.to_string()).collect(),
        )
        .unwrap();
        roster.top_up_hands(&mut pool, 10);
        roster.hand_mut(&ids[0]).unwrap().truncate(7);
        roster.hand_mut(&ids[1]).unwrap().extend(["x".to_string(), "y".to_string()]);
        roster.top_up_hands(&mut pool, 10);
        assert_eq!(roster.hand(&ids[0]).unwrap().len(), 10);
        assert_eq!(roster.hand(&ids[1]).unwrap().len(), 12);
    }

    #[test]
    fn test_reset_prunes_and_clears() {
        let (mut roster, ids) = roster_with(&["alice", "bob", "carol"]);
        let mut pool = CardPool::new("response", vec!["card".to_string()]).unwrap();
        roster.top_up_hands(&mut pool, 3);
        roster.rotate_master().unwrap();
        roster.get_mut(&ids[1]).unwrap().score = 4;
        roster.depart(&ids[2], false).unwrap();

        roster.reset_for_new_cycle();

        assert_eq!(roster.len(), 2);
        assert!(roster.get(&ids[2]).is_err());
        assert!(roster.hand(&ids[2]).is_err());
        assert!(roster.iter().all(|p| p.score == 0 && !p.master && !p.voted));
        assert!(roster.hand(&ids[0]).unwrap().is_empty());
        assert_eq!(roster.master_index(), 0);
    }
}

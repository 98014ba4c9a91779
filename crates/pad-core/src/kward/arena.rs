//! Proto-group arena for the K-ward merge loop.
//!
//! Slots are append-only. A merge never mutates its inputs: it reads two
//! open slots, pushes a new slot holding their union and retires both.
//! Slot ids therefore grow monotonically and double as merge timestamps.

use super::RepMode;

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SlotState {
    /// Smaller than k; still a merge candidate.
    Open,
    /// At least k members; final unless it absorbs leftovers.
    Closed,
    /// Consumed by a merge.
    Retired,
}

#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub members: Vec<usize>,
    pub rep: Vec<f64>,
    pub state: SlotState,
}

#[derive(Debug, Default)]
pub(super) struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, members: Vec<usize>, rep: Vec<f64>, k: usize) -> usize {
        let state = if members.len() >= k {
            SlotState::Closed
        } else {
            SlotState::Open
        };
        self.slots.push(Slot {
            members,
            rep,
            state,
        });
        self.slots.len() - 1
    }

    pub fn get(&self, id: usize) -> &Slot {
        &self.slots[id]
    }

    pub fn get_mut(&mut self, id: usize) -> &mut Slot {
        &mut self.slots[id]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_open(&self, id: usize) -> bool {
        self.slots[id].state == SlotState::Open
    }

    /// Ids of slots in `state`, ascending.
    pub fn ids_in(&self, state: SlotState) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.state == state)
            .map(|(id, _)| id)
            .collect()
    }

    /// Total number of records held by open slots.
    pub fn open_population(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Open)
            .map(|s| s.members.len())
            .sum()
    }

    /// Merge two open slots into a new one and retire both.
    pub fn merge<V: AsRef<[f64]>>(
        &mut self,
        a: usize,
        b: usize,
        vectors: &[V],
        rep_mode: RepMode,
        k: usize,
    ) -> usize {
        let mut members = Vec::with_capacity(self.slots[a].members.len() + self.slots[b].members.len());
        members.extend_from_slice(&self.slots[a].members);
        members.extend_from_slice(&self.slots[b].members);
        members.sort_unstable();

        let rep = rep_mode.aggregate(vectors, &members);
        self.slots[a].state = SlotState::Retired;
        self.slots[b].state = SlotState::Retired;
        self.push(members, rep, k)
    }

    /// Closed slots, consumed.
    pub fn into_closed(self) -> impl Iterator<Item = Slot> {
        self.slots
            .into_iter()
            .filter(|s| s.state == SlotState::Closed)
    }
}

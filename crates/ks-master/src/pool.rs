//! VisorPool: fixed set of reusable visors with an index free list.

use ks_engine::ChannelVisor;

/// Identifier for a visor slot in the pool.
pub type VisorId = usize;

/// Maximum number of visors a session can hold.
pub const MAX_VISORS: usize = 64;

pub struct VisorPool {
    slots: Vec<ChannelVisor>,
    in_use: Vec<bool>,
    /// Free slot ids; the next allocation pops from the end
    free: Vec<VisorId>,
}

impl VisorPool {
    /// Create `capacity` idle visors (clamped to `MAX_VISORS`), each with
    /// room for `reserve` buffered ranges.
    pub fn new(capacity: usize, reserve: usize) -> Self {
        let capacity = capacity.min(MAX_VISORS);
        Self {
            slots: (0..capacity).map(|_| ChannelVisor::with_reserve(reserve)).collect(),
            in_use: vec![false; capacity],
            free: (0..capacity).rev().collect(),
        }
    }

    /// Claim an idle visor. Returns `None` when every slot is in use.
    pub fn allocate(&mut self) -> Option<VisorId> {
        let id = self.free.pop()?;
        self.in_use[id] = true;
        Some(id)
    }

    pub fn get(&self, id: VisorId) -> Option<&ChannelVisor> {
        match self.in_use.get(id) {
            Some(true) => self.slots.get(id),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: VisorId) -> Option<&mut ChannelVisor> {
        match self.in_use.get(id) {
            Some(true) => self.slots.get_mut(id),
            _ => None,
        }
    }

    /// Reset a visor and return its slot. Returns false if it was not in use.
    pub fn release(&mut self, id: VisorId) -> bool {
        match self.in_use.get_mut(id) {
            Some(used) if *used => {
                *used = false;
                self.slots[id].reset();
                self.free.push(id);
                true
            }
            _ => false,
        }
    }

    /// Ids of visors currently in use, lowest first.
    pub fn active_ids(&self) -> impl Iterator<Item = VisorId> + '_ {
        self.in_use
            .iter()
            .enumerate()
            .filter_map(|(id, used)| used.then_some(id))
    }

    pub fn active_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

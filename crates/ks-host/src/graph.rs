//! Bus tree for mixing-graph routing.

use ks_ir::BusKey;
use slotmap::SlotMap;

use crate::error::HostError;

/// Upper bound on ancestor walks, so a corrupted tree cannot spin forever.
pub const MAX_BUS_DEPTH: usize = 64;

/// A mixing bus (channel group).
#[derive(Clone, Debug)]
pub struct Bus {
    /// Parent bus (None = top of the tree)
    pub parent: Option<BusKey>,
    /// Pitch factor applied to everything routed through this bus
    pub pitch: f32,
    /// Paused buses hold every channel below them
    pub paused: bool,
}

impl Bus {
    fn new(parent: Option<BusKey>) -> Self {
        Self {
            parent,
            pitch: 1.0,
            paused: false,
        }
    }
}

/// The bus hierarchy, rooted at a master bus.
#[derive(Clone, Debug)]
pub struct BusGraph {
    buses: SlotMap<BusKey, Bus>,
    master: BusKey,
}

impl Default for BusGraph {
    fn default() -> Self {
        Self::with_master()
    }
}

impl BusGraph {
    /// Create a graph with just a master bus.
    pub fn with_master() -> Self {
        let mut buses = SlotMap::with_key();
        let master = buses.insert(Bus::new(None));
        Self { buses, master }
    }

    pub fn master(&self) -> BusKey {
        self.master
    }

    /// Add a bus under `parent` and return its key.
    pub fn add_bus(&mut self, parent: BusKey) -> Result<BusKey, HostError> {
        if !self.buses.contains_key(parent) {
            return Err(HostError::UnknownBus(parent));
        }
        Ok(self.buses.insert(Bus::new(Some(parent))))
    }

    /// Remove a bus. Children keep their (now stale) parent key.
    pub fn remove_bus(&mut self, bus: BusKey) -> Result<(), HostError> {
        if bus == self.master {
            return Err(HostError::MasterBus);
        }
        self.buses
            .remove(bus)
            .map(|_| ())
            .ok_or(HostError::UnknownBus(bus))
    }

    /// Get a bus by key.
    pub fn bus(&self, key: BusKey) -> Option<&Bus> {
        self.buses.get(key)
    }

    /// Get a mutable reference to a bus by key.
    pub fn bus_mut(&mut self, key: BusKey) -> Result<&mut Bus, HostError> {
        self.buses.get_mut(key).ok_or(HostError::UnknownBus(key))
    }

    /// Walk from `start` up to the top of the tree.
    ///
    /// Stops at the first stale key or after [`MAX_BUS_DEPTH`] steps.
    pub fn ancestors(&self, start: Option<BusKey>) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: start,
            depth: 0,
        }
    }

    /// Product of bus pitches from `start` to the top.
    pub fn pitch_product(&self, start: Option<BusKey>) -> f32 {
        self.ancestors(start).map(|(_, bus)| bus.pitch).product()
    }

    /// Returns true if `start` or any bus above it is paused.
    pub fn is_held(&self, start: Option<BusKey>) -> bool {
        self.ancestors(start).any(|(_, bus)| bus.paused)
    }

    /// Returns true if `bus` lies on the path from `start` to the top.
    pub fn routes_through(&self, start: Option<BusKey>, bus: BusKey) -> bool {
        self.ancestors(start).any(|(key, _)| key == bus)
    }
}

/// Iterator over a bus and its ancestors.
pub struct Ancestors<'a> {
    graph: &'a BusGraph,
    next: Option<BusKey>,
    depth: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (BusKey, &'a Bus);

    fn next(&mut self) -> Option<Self::Item> {
        if self.depth >= MAX_BUS_DEPTH {
            return None;
        }
        let key = self.next?;
        let bus = self.graph.buses.get(key)?;
        self.next = bus.parent;
        self.depth += 1;
        Some((key, bus))
    }
}

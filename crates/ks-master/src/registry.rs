//! Routing of engine callbacks to the visors that track each channel.

use ks_ir::ChannelKey;
use slotmap::SecondaryMap;

use crate::mailbox::{MailboxSender, Notice};
use crate::pool::VisorId;

/// Handle given to the host engine so it can report channel ends.
///
/// Safe to call from the engine's callback thread; it only posts a notice.
#[derive(Clone)]
pub struct EngineCallbacks {
    sender: MailboxSender,
}

impl EngineCallbacks {
    pub fn channel_ended(&self, channel: ChannelKey) {
        if self.sender.post(Notice::ChannelEnded(channel)) {
            log::trace!("engine reported end of {:?}", channel);
        }
    }
}

/// Which visor observes each engine channel. Owned by one session.
pub struct CallbackRegistry {
    routes: SecondaryMap<ChannelKey, VisorId>,
    sender: MailboxSender,
}

impl CallbackRegistry {
    pub fn new(sender: MailboxSender) -> Self {
        Self {
            routes: SecondaryMap::new(),
            sender,
        }
    }

    pub fn callbacks(&self) -> EngineCallbacks {
        EngineCallbacks {
            sender: self.sender.clone(),
        }
    }

    pub fn register(&mut self, channel: ChannelKey, visor: VisorId) {
        if let Some(previous) = self.routes.insert(channel, visor) {
            if previous != visor {
                log::debug!("{:?} rerouted from visor {} to {}", channel, previous, visor);
            }
        }
    }

    /// Remove the route for `channel`, returning the visor it pointed at.
    pub fn unregister(&mut self, channel: ChannelKey) -> Option<VisorId> {
        self.routes.remove(channel)
    }

    pub fn lookup(&self, channel: ChannelKey) -> Option<VisorId> {
        self.routes.get(channel).copied()
    }

    /// Drop every route pointing at `visor`.
    pub fn clear_visor(&mut self, visor: VisorId) {
        self.routes.retain(|_, v| *v != visor);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::mailbox;
    use slotmap::SlotMap;

    fn setup() -> (CallbackRegistry, crate::mailbox::Mailbox, Vec<ChannelKey>) {
        let (tx, rx) = mailbox(8);
        let mut map: SlotMap<ChannelKey, ()> = SlotMap::with_key();
        let keys = (0..3).map(|_| map.insert(())).collect();
        (CallbackRegistry::new(tx), rx, keys)
    }

    #[test]
    fn routes_channel_to_visor() {
        let (mut reg, _rx, k) = setup();
        reg.register(k[0], 2);
        assert_eq!(reg.lookup(k[0]), Some(2));
        assert_eq!(reg.lookup(k[1]), None);
        assert_eq!(reg.unregister(k[0]), Some(2));
        assert!(reg.is_empty());
    }

    #[test]
    fn clear_visor_drops_all_its_routes() {
        let (mut reg, _rx, k) = setup();
        reg.register(k[0], 1);
        reg.register(k[1], 1);
        reg.register(k[2], 0);
        reg.clear_visor(1);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup(k[2]), Some(0));
    }

    #[test]
    fn callbacks_post_to_the_session_mailbox() {
        let (reg, mut rx, k) = setup();
        let callbacks = reg.callbacks();
        callbacks.clone().channel_ended(k[1]);
        assert_eq!(rx.pop(), Some(Notice::ChannelEnded(k[1])));
    }
}

//! Bounded mailbox carrying engine-thread notices to the update thread.
//!
//! Only scalar notices cross the thread boundary. Every state change they
//! imply is applied by the session on its own thread.

use std::sync::{Arc, Mutex};

use ks_ir::ChannelKey;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Something the engine reported from its callback thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The channel stopped or was destroyed.
    ChannelEnded(ChannelKey),
}

/// Sending half, shared by every engine callback handle.
#[derive(Clone)]
pub struct MailboxSender {
    producer: Arc<Mutex<HeapProd<Notice>>>,
}

/// Receiving half, owned by the session.
pub struct Mailbox {
    consumer: HeapCons<Notice>,
}

/// Create a mailbox holding up to `capacity` undelivered notices.
pub fn mailbox(capacity: usize) -> (MailboxSender, Mailbox) {
    let (producer, consumer) = HeapRb::<Notice>::new(capacity.max(1)).split();
    (
        MailboxSender {
            producer: Arc::new(Mutex::new(producer)),
        },
        Mailbox { consumer },
    )
}

impl MailboxSender {
    /// Post a notice. Returns false if it was dropped because the mailbox is full.
    pub fn post(&self, notice: Notice) -> bool {
        let mut producer = match self.producer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("mailbox lock poisoned; recovering");
                poisoned.into_inner()
            }
        };
        if producer.try_push(notice).is_err() {
            log::warn!("mailbox full, dropping {:?}", notice);
            return false;
        }
        true
    }
}

impl Mailbox {
    /// Take the oldest notice.
    pub fn pop(&mut self) -> Option<Notice> {
        self.consumer.try_pop()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }
}

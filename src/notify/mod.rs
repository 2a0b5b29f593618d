//! Change fan-out to subscribed observers.
//!
//! ```text
//! writers (remote batch, device callbacks):
//!   set path -> ChangeSink::publish() -> try_send(change queue) [non-blocking]
//!                                               ↓
//! poll cycle (single consumer):
//!   NotificationRouter::drain() -> collapse per characteristic
//!                               -> group per observer -> render payloads
//! ```
//!
//! Changes to the same characteristic within one cycle collapse to the last
//! value. The observer who authored that last value is not notified of it.


use std::collections::hash_map::Entry;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::TrySendError;
use dashmap::DashSet;
use serde::Serialize;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use crate::Characteristic;
use crate::NotificationConfig;
use crate::RegistrationError;
use crate::Result;
use crate::Value;

/// Handle of one controller connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// One applied value change
#[derive(Clone)]
pub struct Change {
    pub(crate) characteristic: Arc<Characteristic>,
    pub(crate) value: Value,
    /// Remote writer of the value; `None` for local sets
    pub(crate) origin: Option<ObserverId>,
}

impl Change {
    pub(crate) fn new(
        characteristic: Arc<Characteristic>,
        value: Value,
        origin: Option<ObserverId>,
    ) -> Self {
        Self {
            characteristic,
            value,
            origin,
        }
    }
}

impl fmt::Debug for Change {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Change")
            .field("aid", &self.characteristic.aid)
            .field("iid", &self.characteristic.iid)
            .field("value", &self.value)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Producer side of the change queue. Cheap to clone; safe from any thread.
#[derive(Clone)]
pub struct ChangeSink {
    sender: Sender<Change>,
}

impl ChangeSink {
    pub(crate) fn publish(
        &self,
        change: Change,
    ) {
        match self.sender.try_send(change) {
            Ok(()) => {}
            Err(TrySendError::Full(change)) => {
                warn!(
                    aid = change.characteristic.aid,
                    iid = change.characteristic.iid,
                    "Change queue full, dropping change"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("Change queue closed");
            }
        }
    }
}

impl fmt::Debug for ChangeSink {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ChangeSink")
            .field("queued", &self.sender.len())
            .finish()
    }
}

#[derive(Serialize)]
struct EventItem {
    aid: u32,
    iid: u32,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct EventBody {
    characteristics: Vec<EventItem>,
}

pub struct NotificationRouter {
    sender: Sender<Change>,
    receiver: Receiver<Change>,
    /// Currently open observers
    observers: DashSet<ObserverId>,
    next_id: AtomicU64,
    max_observers: usize,
}

impl fmt::Debug for NotificationRouter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NotificationRouter")
            .field("observers", &self.observers.len())
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl NotificationRouter {
    pub fn new(config: &NotificationConfig) -> Self {
        let (sender, receiver) = match config.change_queue_size {
            0 => unbounded(),
            capacity => bounded(capacity),
        };
        Self {
            sender,
            receiver,
            observers: DashSet::new(),
            next_id: AtomicU64::new(1),
            max_observers: config.max_observers,
        }
    }

    pub fn sink(&self) -> ChangeSink {
        ChangeSink {
            sender: self.sender.clone(),
        }
    }

    pub fn open_observer(&self) -> Result<ObserverId> {
        if self.observers.len() >= self.max_observers {
            return Err(RegistrationError::OutOfResource {
                what: "observers",
                limit: self.max_observers as u64,
            }
            .into());
        }
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.insert(id);
        debug!(%id, "Observer opened");
        Ok(id)
    }

    /// Marks the observer closed. Its remaining subscriptions are dropped
    /// lazily by the next drain that touches them.
    pub fn close_observer(
        &self,
        id: ObserverId,
    ) -> bool {
        let closed = self.observers.remove(&id).is_some();
        if closed {
            debug!(%id, "Observer closed");
        }
        closed
    }

    pub fn is_open(
        &self,
        id: ObserverId,
    ) -> bool {
        self.observers.contains(&id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Idempotent; returns whether a new subscription was recorded.
    pub fn subscribe(
        &self,
        characteristic: &Characteristic,
        observer: ObserverId,
    ) -> bool {
        if !self.is_open(observer) {
            return false;
        }
        let added = characteristic.subscribe(observer);
        trace!(
            aid = characteristic.aid,
            iid = characteristic.iid,
            %observer,
            added,
            "subscribe"
        );
        added
    }

    /// Idempotent; returns whether a subscription was removed.
    pub fn unsubscribe(
        &self,
        characteristic: &Characteristic,
        observer: ObserverId,
    ) -> bool {
        characteristic.unsubscribe(observer)
    }

    /// Changes queued and not yet drained
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Drains the change queue and renders one payload per observer that has
    /// at least one subscribed, changed characteristic.
    pub fn drain(&self) -> BTreeMap<ObserverId, Vec<u8>> {
        let mut collapsed: Vec<Change> = Vec::new();
        let mut slots: HashMap<(u32, u32), usize> = HashMap::new();
        for change in self.receiver.try_iter() {
            if change.characteristic.is_retired() {
                continue;
            }
            let key = (change.characteristic.aid, change.characteristic.iid);
            match slots.entry(key) {
                Entry::Occupied(slot) => collapsed[*slot.get()] = change,
                Entry::Vacant(slot) => {
                    slot.insert(collapsed.len());
                    collapsed.push(change);
                }
            }
        }

        let mut events: BTreeMap<ObserverId, Vec<EventItem>> = BTreeMap::new();
        for change in &collapsed {
            let c = &change.characteristic;
            let mut stale = Vec::new();
            for entry in c.subscribers.iter() {
                let observer = *entry;
                if !self.observers.contains(&observer) {
                    stale.push(observer);
                } else if change.origin != Some(observer) {
                    events.entry(observer).or_default().push(EventItem {
                        aid: c.aid,
                        iid: c.iid,
                        value: change.value.to_json(),
                    });
                }
            }
            for observer in stale {
                c.unsubscribe(observer);
                trace!(aid = c.aid, iid = c.iid, %observer, "Dropped stale subscription");
            }
        }

        let mut payloads = BTreeMap::new();
        for (observer, characteristics) in events {
            match serde_json::to_vec(&EventBody { characteristics }) {
                Ok(bytes) => {
                    payloads.insert(observer, bytes);
                }
                Err(e) => error!(%observer, "Failed to render event payload: {}", e),
            }
        }
        if !payloads.is_empty() {
            debug!(
                changes = collapsed.len(),
                observers = payloads.len(),
                "Drained notifications"
            );
        }
        payloads
    }
}

//! In-process publish/subscribe bus
//!
//! Decouples the propagation stages and the miner. Every subscriber gets a
//! dedicated delivery worker, so a stalled consumer delays only its own
//! deliveries and never the publisher or its sibling subscribers.

use crate::core::{Block, Transaction, TransactionId};
use crate::error::Result;
use crate::utils::current_timestamp_millis;
use log::debug;
use std::collections::HashMap;
use std::sync::mpsc::{channel, sync_channel, Receiver, Sender};
use std::sync::RwLock;
use std::thread;
use uuid::Uuid;

/// Routing key. Subscribers register for exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransactionSend,
    TransactionSent,
    BlockAdded,
}

/// What happened, with the data a consumer needs to react. A closed enum:
/// adding a stage means adding a variant, not inventing a routing string.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// A transaction was accepted and must be sent to peers.
    TransactionSend(Transaction),
    /// A transaction was delivered to at least one peer.
    TransactionSent(TransactionId),
    /// A block was committed to the local chain.
    BlockAdded(Block),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::TransactionSend(_) => EventKind::TransactionSend,
            EventPayload::TransactionSent(_) => EventKind::TransactionSent,
            EventPayload::BlockAdded(_) => EventKind::BlockAdded,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    id: Uuid,
    timestamp_millis: i64,
    payload: EventPayload,
}

impl Event {
    fn new(payload: EventPayload) -> Result<Event> {
        Ok(Event {
            id: Uuid::new_v4(),
            timestamp_millis: current_timestamp_millis()?,
            payload,
        })
    }

    pub fn get_id(&self) -> Uuid {
        self.id
    }

    pub fn get_timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn get_payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn into_payload(self) -> EventPayload {
        self.payload
    }
}

/// The publishing half of the bus, what the handlers and the miner depend
/// on.
pub trait Publisher: Send + Sync {
    fn publish(&self, payload: EventPayload) -> Result<()>;
}

pub struct Broker {
    subscribers: RwLock<HashMap<EventKind, Vec<Sender<Event>>>>,
}

impl Broker {
    pub fn new() -> Broker {
        Broker {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register for one event kind. Events arrive on the returned receiver
    /// in publish order. Delivery runs on a dedicated worker thread that
    /// hands each event over on a rendezvous channel; the worker exits once
    /// the receiver is dropped.
    pub fn subscribe(&self, kind: EventKind) -> Receiver<Event> {
        let (delivery_tx, delivery_rx) = sync_channel::<Event>(0);
        let (queue_tx, queue_rx) = channel::<Event>();

        thread::spawn(move || {
            for event in queue_rx {
                if delivery_tx.send(event).is_err() {
                    break;
                }
            }
        });

        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.entry(kind).or_default().push(queue_tx);
        delivery_rx
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher for Broker {
    /// Enqueue the event for every subscriber of its kind. Never blocks on
    /// a slow consumer; a gone subscriber is skipped.
    fn publish(&self, payload: EventPayload) -> Result<()> {
        let kind = payload.kind();
        let event = Event::new(payload)?;

        let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        if let Some(queues) = subscribers.get(&kind) {
            for queue in queues {
                if queue.send(event.clone()).is_err() {
                    debug!("dropping event {:?} for a gone subscriber", kind);
                }
            }
        }
        Ok(())
    }
}

//! Transaction propagation state machine
//!
//! A transaction moves Unknown → InFlight → Sent → Seen; any validation
//! failure is terminal for that submission. The three phases are decoupled
//! through the event bus so a slow peer set never blocks the accept path,
//! and a transaction is never marked seen before propagation was attempted.

use crate::core::validate::validate_transaction;
use crate::core::{Transaction, TransactionId, UnspentOutputRepository};
use crate::error::{NodeError, Result};
use crate::event::{EventPayload, Publisher};
use crate::node::broadcast::{send_to_all_peers, MessageSender};
use crate::node::peers::PeersRepository;
use crate::storage::{InFlightStore, MemoryPool, SeenStore};
use log::info;
use std::sync::Arc;

/// Phase one: a client or peer submits a transaction. Resubmission of a
/// seen id is refused; an accepted transaction is validated against the
/// current UTXO set, pooled for mining, tracked in-flight and handed to the
/// send phase.
pub struct AcceptClientMessageHandler {
    seen: Arc<SeenStore>,
    in_flight: Arc<InFlightStore>,
    pool: Arc<MemoryPool>,
    unspent: Arc<dyn UnspentOutputRepository>,
    publisher: Arc<dyn Publisher>,
}

impl AcceptClientMessageHandler {
    pub fn new(
        seen: Arc<SeenStore>,
        in_flight: Arc<InFlightStore>,
        pool: Arc<MemoryPool>,
        unspent: Arc<dyn UnspentOutputRepository>,
        publisher: Arc<dyn Publisher>,
    ) -> AcceptClientMessageHandler {
        AcceptClientMessageHandler {
            seen,
            in_flight,
            pool,
            unspent,
            publisher,
        }
    }

    pub fn handle(&self, transaction: Transaction) -> Result<()> {
        let id = transaction.get_id().clone();
        if self.seen.is_seen(&id) {
            return Err(NodeError::AlreadySeen(id.to_string()));
        }

        validate_transaction(&transaction, self.unspent.as_ref())?;

        self.pool.add(transaction.clone());
        self.in_flight.save(transaction.clone());
        self.publisher
            .publish(EventPayload::TransactionSend(transaction))?;

        info!("accepted transaction {}", id);
        Ok(())
    }
}

/// Phase two: deliver an in-flight transaction to the current peer set.
/// Partial peer failure still counts as sent; total failure leaves the
/// transaction in-flight and unseen, so a later submission retries it.
pub struct SendMessageHandler {
    seen: Arc<SeenStore>,
    in_flight: Arc<InFlightStore>,
    peers: Arc<dyn PeersRepository>,
    sender: Arc<dyn MessageSender>,
    publisher: Arc<dyn Publisher>,
}

impl SendMessageHandler {
    pub fn new(
        seen: Arc<SeenStore>,
        in_flight: Arc<InFlightStore>,
        peers: Arc<dyn PeersRepository>,
        sender: Arc<dyn MessageSender>,
        publisher: Arc<dyn Publisher>,
    ) -> SendMessageHandler {
        SendMessageHandler {
            seen,
            in_flight,
            peers,
            sender,
            publisher,
        }
    }

    pub fn handle(&self, id: &TransactionId) -> Result<()> {
        if self.seen.is_seen(id) {
            return Err(NodeError::AlreadySeen(id.to_string()));
        }
        let transaction = self
            .in_flight
            .get(id)
            .ok_or_else(|| NodeError::TransactionNotFound(id.to_string()))?;

        let peers = self.peers.get()?;
        send_to_all_peers(self.sender.as_ref(), &transaction, &peers)?;

        self.publisher
            .publish(EventPayload::TransactionSent(id.clone()))?;
        info!("sent transaction {} to {} peer(s)", id, peers.len());
        Ok(())
    }
}

/// Phase three: the transaction has been propagated; mark it seen and drop
/// the in-flight entry. From here on, resubmission of the id is rejected.
pub struct PersistMessageHandler {
    seen: Arc<SeenStore>,
    in_flight: Arc<InFlightStore>,
}

impl PersistMessageHandler {
    pub fn new(seen: Arc<SeenStore>, in_flight: Arc<InFlightStore>) -> PersistMessageHandler {
        PersistMessageHandler { seen, in_flight }
    }

    pub fn handle(&self, id: &TransactionId) {
        self.seen.mark_seen(id.clone());
        self.in_flight.discard(id);
        info!("transaction {} is now seen", id);
    }
}

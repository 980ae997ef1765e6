//! Process wiring
//!
//! Owns the shared repositories, subscribes the propagation handlers to the
//! event bus and runs the long-lived loops (mining, periodic persistence)
//! on their own threads.

pub mod broadcast;
pub mod miner;
pub mod peers;
pub mod propagation;

pub use broadcast::{
    broadcast_to_all_peers, send_to_all_peers, BlockBroadcaster, MessageSender, NoOpSender,
};
pub use miner::{MineOutcome, Miner};
pub use peers::{Peer, PeerStatus, PeersRepository, StaticPeers};
pub use propagation::{AcceptClientMessageHandler, PersistMessageHandler, SendMessageHandler};

use crate::config::Config;
use crate::core::{Block, Transaction, TransactionId, UnspentOutputRepository};
use crate::error::Result;
use crate::event::{Broker, EventKind, EventPayload, Publisher};
use crate::storage::{persistence, ChainStore, InFlightStore, MemoryPool, SeenStore, UtxoStore};
use log::{error, info, warn};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct Node {
    config: Config,
    chain: Arc<ChainStore>,
    pool: Arc<MemoryPool>,
    unspent: Arc<UtxoStore>,
    seen: Arc<SeenStore>,
    in_flight: Arc<InFlightStore>,
    peers: Arc<StaticPeers>,
    broker: Arc<Broker>,
    sender: Arc<dyn MessageSender>,
    broadcaster: Arc<dyn BlockBroadcaster>,
    miner_interrupt: Mutex<Option<Sender<()>>>,
}

impl Node {
    /// Build a node from configuration: load (or create) the persisted
    /// chain, derive the UTXO set from it and wire up the shared state.
    pub fn new(
        config: Config,
        sender: Arc<dyn MessageSender>,
        broadcaster: Arc<dyn BlockBroadcaster>,
    ) -> Result<Node> {
        let chain = persistence::load_or_create(&config.persistence.chain_path)?;
        info!("chain loaded with {} block(s)", chain.len());

        let unspent = Arc::new(UtxoStore::new());
        unspent.rebuild_from_chain(&chain)?;

        Ok(Node {
            peers: Arc::new(StaticPeers::from_hosts(&config.peers.hosts)),
            config,
            chain: Arc::new(ChainStore::from_chain(chain)),
            pool: Arc::new(MemoryPool::new()),
            unspent,
            seen: Arc::new(SeenStore::new()),
            in_flight: Arc::new(InFlightStore::new()),
            broker: Arc::new(Broker::new()),
            sender,
            broadcaster,
            miner_interrupt: Mutex::new(None),
        })
    }

    /// Spawn the subscriber workers and the background loops. Mining starts
    /// only when enabled in config and a reward address is available.
    pub fn start(&self, reward_address: Option<String>) -> Result<()> {
        self.spawn_send_worker();
        self.spawn_persist_worker();
        self.spawn_block_broadcast_worker();
        self.spawn_persistence_loop();

        match reward_address {
            Some(address) if self.config.mining.enabled => self.spawn_miner(address),
            _ => info!("mining disabled"),
        }
        Ok(())
    }

    /// Client/peer submission entry point, the accept phase of propagation.
    pub fn accept_transaction(&self, transaction: Transaction) -> Result<()> {
        let handler = AcceptClientMessageHandler::new(
            self.seen.clone(),
            self.in_flight.clone(),
            self.pool.clone(),
            self.unspent.clone(),
            self.broker.clone(),
        );
        handler.handle(transaction)
    }

    /// A block received from a peer. On success the miner is interrupted so
    /// it stops working against a stale predecessor.
    pub fn accept_block(&self, block: Block) -> Result<()> {
        self.chain.add_block(block.clone())?;
        self.reconcile()?;
        self.interrupt_miner();
        self.broker.publish(EventPayload::BlockAdded(block))
    }

    /// Full-chain sync offer from a peer; adopted only when strictly
    /// heavier. Returns whether the local chain was replaced.
    pub fn sync_chain(&self, remote_blocks: Vec<Block>) -> Result<bool> {
        let replaced = self.chain.replace_if_heavier(remote_blocks)?;
        if replaced {
            info!("adopted a heavier chain of {} block(s)", self.chain.len());
            self.reconcile()?;
            self.interrupt_miner();
        }
        Ok(replaced)
    }

    /// Sum of the unspent outputs locked to an address.
    pub fn balance(&self, address: &str) -> Result<u64> {
        let outputs = self.unspent.get_by_address(address)?;
        Ok(outputs.iter().map(|u| u.get_amount()).sum())
    }

    pub fn is_seen(&self, id: &TransactionId) -> bool {
        self.seen.is_seen(id)
    }

    pub fn get_chain(&self) -> Arc<ChainStore> {
        self.chain.clone()
    }

    pub fn get_pool(&self) -> Arc<MemoryPool> {
        self.pool.clone()
    }

    fn reconcile(&self) -> Result<()> {
        self.unspent.rebuild_from_chain(&self.chain.get_chain())?;
        self.pool.update(&self.unspent.get_all()?);
        Ok(())
    }

    fn interrupt_miner(&self) {
        let interrupt = self.miner_interrupt.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = interrupt.as_ref() {
            // The miner may have exited; a dead channel is fine
            let _ = tx.send(());
        }
    }

    fn spawn_send_worker(&self) {
        let handler = SendMessageHandler::new(
            self.seen.clone(),
            self.in_flight.clone(),
            self.peers.clone(),
            self.sender.clone(),
            self.broker.clone(),
        );
        let events = self.broker.subscribe(EventKind::TransactionSend);
        thread::spawn(move || {
            for event in events {
                if let EventPayload::TransactionSend(transaction) = event.into_payload() {
                    if let Err(e) = handler.handle(transaction.get_id()) {
                        warn!("send phase failed for {}: {e}", transaction.get_id());
                    }
                }
            }
        });
    }

    fn spawn_persist_worker(&self) {
        let handler = PersistMessageHandler::new(self.seen.clone(), self.in_flight.clone());
        let events = self.broker.subscribe(EventKind::TransactionSent);
        thread::spawn(move || {
            for event in events {
                if let EventPayload::TransactionSent(id) = event.into_payload() {
                    handler.handle(&id);
                }
            }
        });
    }

    fn spawn_block_broadcast_worker(&self) {
        let broadcaster = self.broadcaster.clone();
        let peers = self.peers.clone();
        let events = self.broker.subscribe(EventKind::BlockAdded);
        thread::spawn(move || {
            for event in events {
                if let EventPayload::BlockAdded(block) = event.into_payload() {
                    let peer_list = match peers.get() {
                        Ok(peer_list) => peer_list,
                        Err(e) => {
                            warn!("peer list unavailable: {e}");
                            continue;
                        }
                    };
                    if peer_list.is_empty() {
                        continue;
                    }
                    if let Err(e) =
                        broadcast_to_all_peers(broadcaster.as_ref(), &block, &peer_list)
                    {
                        warn!("block {} broadcast failed: {e}", block.get_index());
                    }
                }
            }
        });
    }

    // Writes the chain to disk on a fixed tick; a failed write is retried
    // on the next one.
    fn spawn_persistence_loop(&self) {
        let chain = self.chain.clone();
        let path = self.config.persistence.chain_path.clone();
        let interval = Duration::from_millis(self.config.persistence.interval_millis);
        thread::spawn(move || loop {
            thread::sleep(interval);
            if let Err(e) = persistence::save_chain(&path, &chain.get_chain()) {
                error!("failed to persist chain to {}: {e}", path.display());
            }
        });
    }

    fn spawn_miner(&self, reward_address: String) {
        let (interrupt_tx, interrupt_rx) = channel();
        {
            let mut interrupt = self
                .miner_interrupt
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            *interrupt = Some(interrupt_tx);
        }

        let miner = Miner::new(
            self.chain.clone(),
            self.pool.clone(),
            self.unspent.clone(),
            self.broker.clone(),
            &reward_address,
            self.config.mining.time_cap_millis,
            interrupt_rx,
        );
        thread::spawn(move || miner.run());
    }
}

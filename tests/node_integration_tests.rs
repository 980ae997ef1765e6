//! End-to-end scenarios across the propagation machine, the miner and the
//! node wiring.

use ferrocoin::config::Config;
use ferrocoin::core::{
    Block, BlockChain, Challenge, Transaction, TransactionId, UnspentOutput,
    UnspentOutputRepository,
};
use ferrocoin::error::{NodeError, Result};
use ferrocoin::event::{Broker, EventKind, EventPayload};
use ferrocoin::node::{
    AcceptClientMessageHandler, MessageSender, Node, NoOpSender, Peer, PersistMessageHandler,
    SendMessageHandler, StaticPeers,
};
use ferrocoin::storage::{InFlightStore, MemoryPool, SeenStore, UtxoStore};
use ferrocoin::wallet::{Signer, Wallet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct RecordingSender {
    deliveries: Mutex<Vec<(TransactionId, String)>>,
}

impl RecordingSender {
    fn new() -> RecordingSender {
        RecordingSender {
            deliveries: Mutex::new(Vec::new()),
        }
    }

    fn delivered_to(&self) -> Vec<(TransactionId, String)> {
        self.deliveries.lock().unwrap().clone()
    }
}

impl MessageSender for RecordingSender {
    fn send_transaction(&self, transaction: &Transaction, peer: &Peer) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((transaction.get_id().clone(), peer.get_host().to_string()));
        Ok(())
    }
}

struct Machine {
    seen: Arc<SeenStore>,
    in_flight: Arc<InFlightStore>,
    pool: Arc<MemoryPool>,
    unspent: Arc<UtxoStore>,
    broker: Arc<Broker>,
    sender: Arc<RecordingSender>,
    wallet: Wallet,
}

impl Machine {
    fn new() -> Machine {
        let wallet = Wallet::new().unwrap();
        let unspent = Arc::new(UtxoStore::new());
        unspent
            .set(vec![UnspentOutput::new(
                TransactionId::from("funding"),
                0,
                500,
                &wallet.address(),
            )])
            .unwrap();
        Machine {
            seen: Arc::new(SeenStore::new()),
            in_flight: Arc::new(InFlightStore::new()),
            pool: Arc::new(MemoryPool::new()),
            unspent,
            broker: Arc::new(Broker::new()),
            sender: Arc::new(RecordingSender::new()),
            wallet,
        }
    }

    fn accept_handler(&self) -> AcceptClientMessageHandler {
        AcceptClientMessageHandler::new(
            self.seen.clone(),
            self.in_flight.clone(),
            self.pool.clone(),
            self.unspent.clone(),
            self.broker.clone(),
        )
    }

    fn send_handler(&self, hosts: &[&str]) -> SendMessageHandler {
        let hosts: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
        SendMessageHandler::new(
            self.seen.clone(),
            self.in_flight.clone(),
            Arc::new(StaticPeers::from_hosts(&hosts)),
            self.sender.clone(),
            self.broker.clone(),
        )
    }

    fn persist_handler(&self) -> PersistMessageHandler {
        PersistMessageHandler::new(self.seen.clone(), self.in_flight.clone())
    }

    fn signed_spend(&self, amount: u64) -> Transaction {
        Transaction::new(
            "receiver",
            &self.wallet.address(),
            amount,
            &self.wallet,
            self.unspent.as_ref(),
        )
        .unwrap()
    }
}

// Mines a valid successor through the public API at trivial difficulty.
fn mine_block(chain: &BlockChain, transactions: Vec<Transaction>) -> Block {
    let previous = chain.get_last();
    let timestamp = previous.get_timestamp_millis() + 6_000;
    let mut challenge = Challenge::new(2, 0).unwrap();
    challenge
        .roll_until_matches_difficulty(previous, &transactions, timestamp)
        .unwrap();
    chain.new_block(timestamp, transactions, challenge).unwrap()
}

#[test]
fn test_transaction_propagates_accept_send_persist() {
    let machine = Machine::new();
    let send_events = machine.broker.subscribe(EventKind::TransactionSend);
    let sent_events = machine.broker.subscribe(EventKind::TransactionSent);

    let tx = machine.signed_spend(100);
    let id = tx.get_id().clone();

    // Accept: pooled, tracked in-flight, one "send" event
    machine.accept_handler().handle(tx.clone()).unwrap();
    assert!(machine.pool.exists(&id));
    assert!(machine.in_flight.get(&id).is_some());
    let event = send_events.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(event.get_payload(), &EventPayload::TransactionSend(tx));

    // Send: delivered to every configured peer, one "sent" event
    machine
        .send_handler(&["peer-a:9000", "peer-b:9000"])
        .handle(&id)
        .unwrap();
    let delivered = machine.sender.delivered_to();
    assert_eq!(
        delivered,
        vec![
            (id.clone(), "peer-a:9000".to_string()),
            (id.clone(), "peer-b:9000".to_string()),
        ]
    );
    let event = sent_events.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(event.get_payload(), &EventPayload::TransactionSent(id.clone()));
    assert!(!machine.seen.is_seen(&id));

    // Persist: seen from now on, in-flight entry gone
    machine.persist_handler().handle(&id);
    assert!(machine.seen.is_seen(&id));
    assert!(machine.in_flight.get(&id).is_none());

    // Resubmission of the same id is refused
    let resubmission = machine.signed_spend(100);
    assert_eq!(resubmission.get_id(), &id);
    let err = machine.accept_handler().handle(resubmission).unwrap_err();
    assert!(matches!(err, NodeError::AlreadySeen(_)));
}

#[test]
fn test_event_driven_machine_reaches_seen() {
    let machine = Machine::new();

    // Wire the send and persist phases to the bus the way the node does
    let send_handler = machine.send_handler(&["peer-a:9000"]);
    let send_events = machine.broker.subscribe(EventKind::TransactionSend);
    std::thread::spawn(move || {
        for event in send_events {
            if let EventPayload::TransactionSend(transaction) = event.into_payload() {
                send_handler.handle(transaction.get_id()).unwrap();
            }
        }
    });

    let persist_handler = machine.persist_handler();
    let sent_events = machine.broker.subscribe(EventKind::TransactionSent);
    std::thread::spawn(move || {
        for event in sent_events {
            if let EventPayload::TransactionSent(id) = event.into_payload() {
                persist_handler.handle(&id);
            }
        }
    });

    let tx = machine.signed_spend(50);
    let id = tx.get_id().clone();
    machine.accept_handler().handle(tx).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !machine.seen.is_seen(&id) {
        assert!(Instant::now() < deadline, "transaction never became seen");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(machine.in_flight.get(&id).is_none());
    assert_eq!(machine.sender.delivered_to().len(), 1);
}

#[test]
fn test_node_accepts_peer_blocks_and_tracks_balances() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.persistence.chain_path = dir.path().join("chain.json");
    config.mining.enabled = false;

    let sender = Arc::new(NoOpSender);
    let node = Node::new(config, sender.clone(), sender).unwrap();
    node.start(None).unwrap();

    // A peer mined a block paying "miner"; the node adopts it
    let chain = node.get_chain().get_chain();
    let block = mine_block(&chain, vec![Transaction::new_coinbase("miner", 1)]);
    node.accept_block(block.clone()).unwrap();

    assert_eq!(node.get_chain().len(), 2);
    assert_eq!(node.balance("miner").unwrap(), 10);

    // The same block again breaks linkage and is refused
    let err = node.accept_block(block).unwrap_err();
    assert!(matches!(err, NodeError::BlockNotValid(_)));
}

#[test]
fn test_node_adopts_only_heavier_chains() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.persistence.chain_path = dir.path().join("chain.json");
    config.mining.enabled = false;

    let sender = Arc::new(NoOpSender);
    let node = Node::new(config, sender.clone(), sender).unwrap();
    node.start(None).unwrap();

    // Local chain advances by one block
    let block = mine_block(&node.get_chain().get_chain(), vec![]);
    node.accept_block(block).unwrap();

    // A remote genesis-only chain is lighter and refused
    let lighter = BlockChain::new();
    assert!(!node.sync_chain(lighter.get_blocks().to_vec()).unwrap());
    assert_eq!(node.get_chain().len(), 2);

    // A remote three-block chain is heavier and adopted
    let mut remote = BlockChain::new();
    for height in 1..=3usize {
        let block = mine_block(&remote, vec![Transaction::new_coinbase("remote", height)]);
        remote.add_block(block).unwrap();
    }
    assert!(node.sync_chain(remote.get_blocks().to_vec()).unwrap());
    assert_eq!(node.get_chain().len(), 4);
    assert_eq!(node.balance("remote").unwrap(), 30);
}

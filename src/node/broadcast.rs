use crate::core::{Block, Transaction};
use crate::error::{NodeError, Result};
use crate::node::peers::Peer;
use log::{info, warn};

/// Per-peer transaction delivery. The HTTP implementation lives outside
/// this crate; implementations are expected to bound their own timeouts.
pub trait MessageSender: Send + Sync {
    fn send_transaction(&self, transaction: &Transaction, peer: &Peer) -> Result<()>;
}

/// Per-peer block delivery, used after a local commit.
pub trait BlockBroadcaster: Send + Sync {
    fn broadcast_block(&self, block: &Block, peer: &Peer) -> Result<()>;
}

/// Sender that delivers nowhere. A single node with no transport still runs
/// the full propagation machine against it.
pub struct NoOpSender;

impl MessageSender for NoOpSender {
    fn send_transaction(&self, transaction: &Transaction, peer: &Peer) -> Result<()> {
        info!(
            "no-op send of transaction {} to {}",
            transaction.get_id(),
            peer.get_host()
        );
        Ok(())
    }
}

impl BlockBroadcaster for NoOpSender {
    fn broadcast_block(&self, block: &Block, peer: &Peer) -> Result<()> {
        info!(
            "no-op broadcast of block {} to {}",
            block.get_index(),
            peer.get_host()
        );
        Ok(())
    }
}

/// Best-effort fan-out of a transaction. An unreachable peer is a logged
/// warning; the call fails only when no peer is configured or every peer
/// failed.
pub fn send_to_all_peers(
    sender: &dyn MessageSender,
    transaction: &Transaction,
    peers: &[Peer],
) -> Result<()> {
    if peers.is_empty() {
        return Err(NodeError::NoPeers);
    }

    let mut failures = 0;
    for peer in peers {
        if let Err(e) = sender.send_transaction(transaction, peer) {
            warn!(
                "failed to send transaction {} to {}: {}",
                transaction.get_id(),
                peer.get_host(),
                e
            );
            failures += 1;
        }
    }

    if failures == peers.len() {
        return Err(NodeError::AllPeersFailed);
    }
    Ok(())
}

/// Same fan-out policy for a freshly committed block.
pub fn broadcast_to_all_peers(
    broadcaster: &dyn BlockBroadcaster,
    block: &Block,
    peers: &[Peer],
) -> Result<()> {
    if peers.is_empty() {
        return Err(NodeError::NoPeers);
    }

    let mut failures = 0;
    for peer in peers {
        if let Err(e) = broadcaster.broadcast_block(block, peer) {
            warn!(
                "failed to broadcast block {} to {}: {}",
                block.get_index(),
                peer.get_host(),
                e
            );
            failures += 1;
        }
    }

    if failures == peers.len() {
        return Err(NodeError::AllPeersFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Output, Transaction};
    use std::sync::Mutex;

    // Records deliveries and fails for the hosts it is told to.
    pub(crate) struct RecordingSender {
        pub failing_hosts: Vec<String>,
        pub deliveries: Mutex<Vec<String>>,
    }

    impl RecordingSender {
        pub(crate) fn new(failing_hosts: &[&str]) -> RecordingSender {
            RecordingSender {
                failing_hosts: failing_hosts.iter().map(|h| h.to_string()).collect(),
                deliveries: Mutex::new(Vec::new()),
            }
        }
    }

    impl MessageSender for RecordingSender {
        fn send_transaction(&self, _transaction: &Transaction, peer: &Peer) -> Result<()> {
            if self.failing_hosts.iter().any(|h| h == peer.get_host()) {
                return Err(NodeError::Network(format!("{} unreachable", peer.get_host())));
            }
            self.deliveries
                .lock()
                .unwrap()
                .push(peer.get_host().to_string());
            Ok(())
        }
    }

    fn sample_transaction() -> Transaction {
        Transaction::new_from(vec![], vec![Output::new(5, "receiver")])
    }

    #[test]
    fn test_send_succeeds_when_some_peers_fail() {
        let sender = RecordingSender::new(&["down:9000"]);
        let peers = vec![Peer::new("down:9000"), Peer::new("up:9000")];

        send_to_all_peers(&sender, &sample_transaction(), &peers).unwrap();
        assert_eq!(*sender.deliveries.lock().unwrap(), vec!["up:9000"]);
    }

    #[test]
    fn test_send_fails_when_all_peers_fail() {
        let sender = RecordingSender::new(&["a:9000", "b:9000"]);
        let peers = vec![Peer::new("a:9000"), Peer::new("b:9000")];

        let err = send_to_all_peers(&sender, &sample_transaction(), &peers).unwrap_err();
        assert!(matches!(err, NodeError::AllPeersFailed));
    }

    #[test]
    fn test_send_fails_without_peers() {
        let sender = RecordingSender::new(&[]);
        let err = send_to_all_peers(&sender, &sample_transaction(), &[]).unwrap_err();
        assert!(matches!(err, NodeError::NoPeers));
    }
}

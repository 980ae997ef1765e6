use crate::error::Result;
use std::sync::RwLock;

/// Health as last observed by the ping layer. Broadcast does not filter on
/// it; an Unhealthy peer just fails fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Peer {
    host: String,
    status: PeerStatus,
}

impl Peer {
    pub fn new(host: &str) -> Peer {
        Peer {
            host: host.to_string(),
            status: PeerStatus::Unknown,
        }
    }

    pub fn get_host(&self) -> &str {
        self.host.as_str()
    }

    pub fn get_status(&self) -> PeerStatus {
        self.status
    }

    pub fn with_status(mut self, status: PeerStatus) -> Peer {
        self.status = status;
        self
    }
}

/// Source of the current peer set. The remote-discovery implementation
/// lives outside this crate; `StaticPeers` serves a configured list.
pub trait PeersRepository: Send + Sync {
    fn get(&self) -> Result<Vec<Peer>>;
}

pub struct StaticPeers {
    peers: RwLock<Vec<Peer>>,
}

impl StaticPeers {
    pub fn from_hosts(hosts: &[String]) -> StaticPeers {
        StaticPeers {
            peers: RwLock::new(hosts.iter().map(|h| Peer::new(h)).collect()),
        }
    }

    pub fn set_status(&self, host: &str, status: PeerStatus) {
        let mut peers = self.peers.write().unwrap_or_else(|e| e.into_inner());
        for peer in peers.iter_mut() {
            if peer.host == host {
                peer.status = status;
            }
        }
    }
}

impl PeersRepository for StaticPeers {
    fn get(&self) -> Result<Vec<Peer>> {
        let peers = self.peers.read().unwrap_or_else(|e| e.into_inner());
        Ok(peers.clone())
    }
}

use crate::core::{Block, BlockChain, TransactionId};
use crate::error::Result;
use std::sync::RwLock;

/// Shared ownership of the one chain a node maintains. Readers take cheap
/// snapshots; writers revalidate through the chain's own rules, so a stale
/// snapshot can never smuggle in an invalid block.
pub struct ChainStore {
    chain: RwLock<BlockChain>,
}

impl ChainStore {
    pub fn new() -> ChainStore {
        ChainStore {
            chain: RwLock::new(BlockChain::new()),
        }
    }

    pub fn from_chain(chain: BlockChain) -> ChainStore {
        ChainStore {
            chain: RwLock::new(chain),
        }
    }

    /// Full snapshot. Callers work on the copy and come back through
    /// `add_block`, which revalidates against the then-current state.
    pub fn get_chain(&self) -> BlockChain {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.clone()
    }

    pub fn get_last(&self) -> Block {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.get_last().clone()
    }

    pub fn len(&self) -> usize {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add_block(&self, block: Block) -> Result<()> {
        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        chain.add_block(block)
    }

    pub fn contains_transaction(&self, id: &TransactionId) -> bool {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.contains_transaction(id)
    }

    pub fn cumulative_difficulty(&self) -> u128 {
        let chain = self.chain.read().unwrap_or_else(|e| e.into_inner());
        chain.cumulative_difficulty()
    }

    /// Fork choice. The remote block list must validate as a whole chain;
    /// it then wins only on strictly higher cumulative difficulty, never on
    /// length. Returns whether the local chain was swapped out.
    pub fn replace_if_heavier(&self, remote_blocks: Vec<Block>) -> Result<bool> {
        let candidate = BlockChain::import(remote_blocks)?;

        let mut chain = self.chain.write().unwrap_or_else(|e| e.into_inner());
        if candidate.cumulative_difficulty() > chain.cumulative_difficulty() {
            *chain = candidate;
            return Ok(true);
        }
        Ok(false)
    }
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

use crate::core::{BlockChain, TransactionId, UnspentOutput, UnspentOutputRepository};
use crate::error::Result;
use std::sync::RwLock;

/// In-memory UTXO set behind a read-write lock. The stored order is the
/// chain commitment order, which is what makes greedy spend selection
/// deterministic across nodes.
pub struct UtxoStore {
    unspent: RwLock<Vec<UnspentOutput>>,
}

impl UtxoStore {
    pub fn new() -> UtxoStore {
        UtxoStore {
            unspent: RwLock::new(Vec::new()),
        }
    }

    /// Recompute the whole set from a committed chain.
    pub fn rebuild_from_chain(&self, chain: &BlockChain) -> Result<()> {
        self.set(unspent_outputs_from_chain(chain))
    }
}

impl Default for UtxoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UnspentOutputRepository for UtxoStore {
    fn get_all(&self) -> Result<Vec<UnspentOutput>> {
        let unspent = self.unspent.read().unwrap_or_else(|e| e.into_inner());
        Ok(unspent.clone())
    }

    fn get_by_address(&self, address: &str) -> Result<Vec<UnspentOutput>> {
        let unspent = self.unspent.read().unwrap_or_else(|e| e.into_inner());
        Ok(unspent
            .iter()
            .filter(|u| u.get_address() == address)
            .cloned()
            .collect())
    }

    fn get_by_output_id_and_index(
        &self,
        output_id: &TransactionId,
        output_index: usize,
    ) -> Result<Option<UnspentOutput>> {
        let unspent = self.unspent.read().unwrap_or_else(|e| e.into_inner());
        Ok(unspent
            .iter()
            .find(|u| u.get_output_id() == output_id && u.get_output_index() == output_index)
            .cloned())
    }

    fn set(&self, new_unspent: Vec<UnspentOutput>) -> Result<()> {
        let mut unspent = self.unspent.write().unwrap_or_else(|e| e.into_inner());
        *unspent = new_unspent;
        Ok(())
    }
}

/// Walk the chain in order: every transaction output becomes unspent, every
/// input consumes the output it references. Inputs that spend nothing (the
/// coinbase marker) are skipped.
pub fn unspent_outputs_from_chain(chain: &BlockChain) -> Vec<UnspentOutput> {
    let mut unspent: Vec<UnspentOutput> = Vec::new();
    for block in chain.get_blocks() {
        for transaction in block.get_transactions() {
            for input in transaction.get_inputs() {
                if input.get_output_id().is_empty() {
                    continue;
                }
                unspent.retain(|u| {
                    u.get_output_id() != input.get_output_id()
                        || u.get_output_index() != input.get_output_index()
                });
            }
            for (output_index, output) in transaction.get_outputs().iter().enumerate() {
                unspent.push(UnspentOutput::new(
                    transaction.get_id().clone(),
                    output_index,
                    output.get_amount(),
                    output.get_address(),
                ));
            }
        }
    }
    unspent
}

use crate::core::{Transaction, TransactionId, UnspentOutput};
use std::collections::HashMap;
use std::sync::RwLock;

/// Pending transactions not yet committed to a block, keyed by id.
/// Concurrency-safe; the mining loop and the propagation handlers share one
/// instance.
pub struct MemoryPool {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            transactions: RwLock::new(HashMap::new()),
        }
    }

    pub fn add(&self, transaction: Transaction) {
        let mut transactions = self.transactions.write().unwrap_or_else(|e| e.into_inner());
        transactions.insert(transaction.get_id().clone(), transaction);
    }

    pub fn exists(&self, id: &TransactionId) -> bool {
        let transactions = self.transactions.read().unwrap_or_else(|e| e.into_inner());
        transactions.contains_key(id)
    }

    pub fn remove(&self, ids: &[TransactionId]) {
        let mut transactions = self.transactions.write().unwrap_or_else(|e| e.into_inner());
        for id in ids {
            transactions.remove(id);
        }
    }

    pub fn get_all(&self) -> Vec<Transaction> {
        let transactions = self.transactions.read().unwrap_or_else(|e| e.into_inner());
        transactions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let transactions = self.transactions.read().unwrap_or_else(|e| e.into_inner());
        transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retroactive double-spend resolution: a pooled transaction whose
    /// inputs no longer all resolve in the current UTXO set was overtaken by
    /// a committed block and is dropped. Nothing is detected proactively;
    /// the pool just follows the chain.
    pub fn update(&self, current_unspent: &[UnspentOutput]) {
        let mut transactions = self.transactions.write().unwrap_or_else(|e| e.into_inner());
        transactions.retain(|_, transaction| {
            transaction.get_inputs().iter().all(|input| {
                current_unspent.iter().any(|u| {
                    u.get_output_id() == input.get_output_id()
                        && u.get_output_index() == input.get_output_index()
                })
            })
        });
    }
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Input, Output};

    fn spend_of(output_id: &str, output_index: usize) -> Transaction {
        Transaction::new_from(
            vec![Input::new(TransactionId::from(output_id), output_index, String::new())],
            vec![Output::new(5, "receiver")],
        )
    }

    #[test]
    fn test_add_exists_remove() {
        let pool = MemoryPool::new();
        assert!(pool.is_empty());

        let tx = spend_of("a", 0);
        let id = tx.get_id().clone();
        pool.add(tx);

        assert!(pool.exists(&id));
        assert_eq!(pool.len(), 1);

        pool.remove(&[id.clone()]);
        assert!(!pool.exists(&id));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_add_is_idempotent_per_id() {
        let pool = MemoryPool::new();
        pool.add(spend_of("a", 0));
        pool.add(spend_of("a", 0));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_update_drops_transactions_with_any_spent_input() {
        let pool = MemoryPool::new();

        let healthy = spend_of("live", 0);
        let healthy_id = healthy.get_id().clone();
        pool.add(healthy);

        // One input resolves, the other was spent by a committed block
        let stale = Transaction::new_from(
            vec![
                Input::new(TransactionId::from("live"), 0, String::new()),
                Input::new(TransactionId::from("gone"), 0, String::new()),
            ],
            vec![Output::new(5, "receiver")],
        );
        let stale_id = stale.get_id().clone();
        pool.add(stale);

        let current = vec![UnspentOutput::new(TransactionId::from("live"), 0, 10, "owner")];
        pool.update(&current);

        assert!(pool.exists(&healthy_id));
        assert!(!pool.exists(&stale_id));
    }
}

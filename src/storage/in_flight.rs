// Propagation bookkeeping. A transaction is in-flight from acceptance until
// it has been broadcast and persisted, and seen forever after; resubmission
// of a seen id is refused upstream.

use crate::core::{Transaction, TransactionId};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

pub struct InFlightStore {
    transactions: RwLock<HashMap<TransactionId, Transaction>>,
}

impl InFlightStore {
    pub fn new() -> InFlightStore {
        InFlightStore {
            transactions: RwLock::new(HashMap::new()),
        }
    }

    pub fn save(&self, transaction: Transaction) {
        let mut transactions = self.transactions.write().unwrap_or_else(|e| e.into_inner());
        transactions.insert(transaction.get_id().clone(), transaction);
    }

    pub fn get(&self, id: &TransactionId) -> Option<Transaction> {
        let transactions = self.transactions.read().unwrap_or_else(|e| e.into_inner());
        transactions.get(id).cloned()
    }

    pub fn discard(&self, id: &TransactionId) {
        let mut transactions = self.transactions.write().unwrap_or_else(|e| e.into_inner());
        transactions.remove(id);
    }

    pub fn len(&self) -> usize {
        let transactions = self.transactions.read().unwrap_or_else(|e| e.into_inner());
        transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InFlightStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SeenStore {
    seen: RwLock<HashSet<TransactionId>>,
}

impl SeenStore {
    pub fn new() -> SeenStore {
        SeenStore {
            seen: RwLock::new(HashSet::new()),
        }
    }

    pub fn mark_seen(&self, id: TransactionId) {
        let mut seen = self.seen.write().unwrap_or_else(|e| e.into_inner());
        seen.insert(id);
    }

    pub fn is_seen(&self, id: &TransactionId) -> bool {
        let seen = self.seen.read().unwrap_or_else(|e| e.into_inner());
        seen.contains(id)
    }
}

impl Default for SeenStore {
    fn default() -> Self {
        Self::new()
    }
}

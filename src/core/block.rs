use crate::core::challenge::Challenge;
use crate::core::transaction::Transaction;
use crate::core::{GENESIS_TIMESTAMP_MILLIS, INITIAL_DIFFICULTY};
use crate::error::Result;
use crate::utils::{serialize, sha256_digest};
use data_encoding::BASE64;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// One link in the chain. `content_hash` commits to every other field, and
/// the next block's `prev_hash` repeats it, so rewriting history invalidates
/// everything downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp_millis: i64,
    content_hash: String,
    prev_hash: String,
    transactions: Vec<Transaction>,
    challenge: Challenge,
}

impl Block {
    /// Build the successor of `previous`, stamping the content hash last so
    /// it covers the final state of every field.
    pub fn new(
        previous: &Block,
        timestamp_millis: i64,
        transactions: Vec<Transaction>,
        challenge: Challenge,
    ) -> Result<Block> {
        let mut block = Block {
            index: previous.index + 1,
            timestamp_millis,
            content_hash: String::new(),
            prev_hash: previous.content_hash.clone(),
            transactions,
            challenge,
        };
        block.content_hash = block.calculate_content_hash()?;
        Ok(block)
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn get_content_hash(&self) -> &str {
        self.content_hash.as_str()
    }

    pub fn get_prev_hash(&self) -> &str {
        self.prev_hash.as_str()
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Digest of the block with its own hash field blanked, so the stored
    /// hash never feeds back into itself.
    pub fn calculate_content_hash(&self) -> Result<String> {
        let mut unhashed = self.clone();
        unhashed.content_hash = String::new();
        let bytes = serialize(&unhashed)?;
        Ok(BASE64.encode(sha256_digest(bytes.as_slice()).as_slice()))
    }

    /// True when the stored content hash matches a fresh computation.
    pub fn has_valid_content_hash(&self) -> bool {
        match self.calculate_content_hash() {
            Ok(hash) => hash == self.content_hash,
            Err(_) => false,
        }
    }
}

static GENESIS_BLOCK: Lazy<Block> = Lazy::new(|| {
    let mut block = Block {
        index: 0,
        timestamp_millis: GENESIS_TIMESTAMP_MILLIS,
        content_hash: String::new(),
        prev_hash: String::new(),
        transactions: vec![Transaction::new_genesis()],
        challenge: Challenge::genesis(INITIAL_DIFFICULTY),
    };
    // Serialization of the fixed genesis content cannot fail.
    block.content_hash = block.calculate_content_hash().unwrap_or_default();
    block
});

/// Block 0. Fixed timestamp, fixed transaction, unrolled challenge; byte for
/// byte identical on every node, which is what lets independently started
/// nodes converge at all.
pub fn genesis_block() -> Block {
    GENESIS_BLOCK.clone()
}

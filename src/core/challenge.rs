// The proof-of-work ticket. A challenge is solved by rolling random nonces
// until the target hash carries enough leading zero bits. The target hash
// binds the nonce to the exact predecessor block, timestamp and candidate
// transaction set, so a solved challenge cannot be replayed against a
// different predecessor.

use crate::core::{Block, Transaction};
use crate::error::{NodeError, Result};
use crate::utils::{serialize, sha256_digest};
use data_encoding::BASE64;
use serde::{Deserialize, Serialize};

/// Lowest difficulty a challenge may carry.
pub const MIN_DIFFICULTY: u32 = 2;
/// Highest difficulty a challenge may carry (a SHA-256 digest has 256 bits).
pub const MAX_DIFFICULTY: u32 = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Challenge {
    difficulty: u32,
    nonce: u32,
    hash_value: String,
    time_cap_millis: i64,
}

impl Challenge {
    pub fn new(difficulty: u32, time_cap_millis: i64) -> Result<Challenge> {
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(NodeError::InvalidDifficulty(difficulty));
        }
        Ok(Challenge {
            difficulty,
            nonce: 0,
            hash_value: String::new(),
            time_cap_millis,
        })
    }

    /// The unsolved challenge embedded in the genesis block. Never subject
    /// to difficulty checks; it only seeds the initial difficulty.
    pub(crate) fn genesis(difficulty: u32) -> Challenge {
        Challenge {
            difficulty,
            nonce: 0,
            hash_value: String::new(),
            time_cap_millis: 0,
        }
    }

    pub fn get_difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn get_nonce(&self) -> u32 {
        self.nonce
    }

    pub fn get_hash_value(&self) -> &str {
        self.hash_value.as_str()
    }

    pub fn get_time_cap_millis(&self) -> i64 {
        self.time_cap_millis
    }

    /// Draw a fresh random nonce and recompute the target hash for it.
    pub fn roll_nonce(
        &mut self,
        previous: &Block,
        transactions: &[Transaction],
        timestamp_millis: i64,
    ) -> Result<()> {
        let new_nonce: u32 = rand::random();
        let target = calculate_target_hash(previous, transactions, timestamp_millis, new_nonce)?;
        self.hash_value = target;
        self.nonce = new_nonce;
        Ok(())
    }

    /// True iff the stored hash carries at least `difficulty` leading zero
    /// bits. Checked bit-wise, since the difficulty need not be byte aligned.
    pub fn matches_difficulty(&self) -> bool {
        let bytes = match BASE64.decode(self.hash_value.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };
        if bytes.is_empty() {
            return false;
        }
        leading_zero_bits(&bytes) >= self.difficulty
    }

    pub fn roll_until_matches_difficulty(
        &mut self,
        previous: &Block,
        transactions: &[Transaction],
        timestamp_millis: i64,
    ) -> Result<()> {
        while !self.matches_difficulty() {
            self.roll_nonce(previous, transactions, timestamp_millis)?;
        }
        Ok(())
    }

    /// Bounded variant for tests and cooperative backoff. Returns whether a
    /// matching nonce was found within `max_iterations` rolls.
    pub fn roll_until_matches_difficulty_capped(
        &mut self,
        max_iterations: usize,
        previous: &Block,
        transactions: &[Transaction],
        timestamp_millis: i64,
    ) -> Result<bool> {
        for _ in 0..max_iterations {
            if self.matches_difficulty() {
                return Ok(true);
            }
            self.roll_nonce(previous, transactions, timestamp_millis)?;
        }
        Ok(self.matches_difficulty())
    }

    /// Recompute the target hash independently and compare it to the claimed
    /// one. Chain validation uses this so a peer cannot forge a challenge
    /// without redoing the work.
    pub fn verify(
        previous: &Block,
        timestamp_millis: i64,
        nonce: u32,
        hash_value: &str,
        transactions: &[Transaction],
    ) -> bool {
        match calculate_target_hash(previous, transactions, timestamp_millis, nonce) {
            Ok(expected) => expected == hash_value,
            Err(_) => false,
        }
    }
}

// Each field gets its own fixed-width little-endian slot before hashing, so
// no two inputs can collide by overlapping encodings.
fn calculate_target_hash(
    previous: &Block,
    transactions: &[Transaction],
    timestamp_millis: i64,
    nonce: u32,
) -> Result<String> {
    let next_index = previous.get_index() + 1;

    let mut all_bytes = Vec::new();
    all_bytes.extend(nonce.to_le_bytes());
    all_bytes.extend(next_index.to_le_bytes());
    all_bytes.extend(previous.get_content_hash().as_bytes());
    all_bytes.extend(timestamp_millis.to_le_bytes());
    all_bytes.extend(serialize(&transactions.to_vec())?);

    Ok(BASE64.encode(sha256_digest(all_bytes.as_slice()).as_slice()))
}

fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0;
    for byte in bytes {
        count += byte.leading_zeros();
        if *byte != 0 {
            break;
        }
    }
    count
}

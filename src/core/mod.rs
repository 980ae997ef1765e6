pub mod block;
pub mod blockchain;
pub mod challenge;
pub mod difficulty;
pub mod transaction;
pub mod validate;

pub use block::{genesis_block, Block};
pub use blockchain::BlockChain;
pub use challenge::{Challenge, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use difficulty::{
    get_difficulty, BLOCK_GENERATION_INTERVAL_MILLIS, DIFFICULTY_ADJUSTMENT_INTERVAL,
};
pub use transaction::{
    calculate_unspent_for_amount, Input, Output, Transaction, TransactionId, UnspentOutput,
    UnspentOutputRepository,
};

/// Reward minted by each block's coinbase transaction.
pub const COINBASE_AMOUNT: u64 = 10;

/// Amount carried by the single genesis output.
pub const GENESIS_AMOUNT: u64 = 1_000;

/// Owner of the genesis output. Hex encoding of an uncompressed P-256 public
/// key whose private half was discarded after the network was seeded.
pub const GENESIS_ADDRESS: &str = "04f3d68fc8c3533cb8e3aa96e4cbfe79b29d2e5394258147a2a78071c07adc0ced0f037f61de72d38e628dbaba651031befc2d6808e4bd3443e1a1c5b967dd0087";

/// 2024-11-16T20:23:00Z. Fixed so every node derives the same genesis block.
pub const GENESIS_TIMESTAMP_MILLIS: i64 = 1_731_788_580_000;

/// Difficulty recorded in the genesis challenge; the retargeting rule takes
/// over from there.
pub const INITIAL_DIFFICULTY: u32 = 8;

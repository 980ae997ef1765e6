use crate::core::blockchain::BlockChain;
use crate::core::challenge::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Target pace of the network.
pub const BLOCK_GENERATION_INTERVAL_MILLIS: i64 = 6_000;
/// Difficulty is reconsidered once per this many blocks.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// The difficulty the next block must satisfy. Between adjustment points the
/// latest block's difficulty carries over; at an adjustment point the elapsed
/// time of the last interval is compared against the expected pace, and the
/// difficulty moves by at most one step in either direction.
pub fn get_difficulty(chain: &BlockChain) -> u32 {
    let latest = chain.get_last();
    let current = latest.get_challenge().get_difficulty();

    if latest.get_index() == 0 || latest.get_index() % DIFFICULTY_ADJUSTMENT_INTERVAL != 0 {
        return current;
    }

    let interval_start = match chain.get_block(latest.get_index() - DIFFICULTY_ADJUSTMENT_INTERVAL)
    {
        Ok(block) => block,
        Err(_) => return current,
    };

    let time_expected = BLOCK_GENERATION_INTERVAL_MILLIS * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
    let time_taken = latest.get_timestamp_millis() - interval_start.get_timestamp_millis();

    if time_taken < time_expected / 2 {
        (current + 1).min(MAX_DIFFICULTY)
    } else if time_taken > time_expected * 2 {
        current.saturating_sub(1).max(MIN_DIFFICULTY)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::block::genesis_block;
    use crate::core::challenge::Challenge;
    use crate::core::Block;

    // Builds a chain of `len` post-genesis blocks spaced `spacing_millis`
    // apart, all at `difficulty`, bypassing proof-of-work checks.
    fn chain_with_spacing(len: u64, spacing_millis: i64, difficulty: u32) -> BlockChain {
        let mut blocks = vec![genesis_block()];
        for _ in 0..len {
            let previous = &blocks[blocks.len() - 1];
            let mut challenge = Challenge::new(difficulty, 0).unwrap();
            challenge
                .roll_nonce(previous, &[], previous.get_timestamp_millis() + spacing_millis)
                .unwrap();
            let block = Block::new(
                previous,
                previous.get_timestamp_millis() + spacing_millis,
                vec![],
                challenge,
            )
            .unwrap();
            blocks.push(block);
        }
        // Blocks are structurally linked but not proof-of-work solved, so
        // assemble the chain directly rather than through import.
        BlockChain::from_blocks_unchecked(blocks)
    }

    #[test]
    fn test_difficulty_carries_over_between_adjustment_points() {
        let chain = chain_with_spacing(5, 100, 8);
        assert_eq!(get_difficulty(&chain), 8);
    }

    #[test]
    fn test_difficulty_rises_when_blocks_come_fast() {
        // 10 blocks in 1 second versus 60 expected
        let chain = chain_with_spacing(10, 100, 8);
        assert_eq!(get_difficulty(&chain), 9);
    }

    #[test]
    fn test_difficulty_drops_when_blocks_come_slow() {
        // 10 blocks in 200 seconds versus 60 expected
        let chain = chain_with_spacing(10, 20_000, 8);
        assert_eq!(get_difficulty(&chain), 7);
    }

    #[test]
    fn test_difficulty_holds_at_expected_pace() {
        let chain = chain_with_spacing(10, BLOCK_GENERATION_INTERVAL_MILLIS, 8);
        assert_eq!(get_difficulty(&chain), 8);
    }

    #[test]
    fn test_difficulty_stays_within_bounds() {
        let fast = chain_with_spacing(10, 100, MAX_DIFFICULTY);
        assert_eq!(get_difficulty(&fast), MAX_DIFFICULTY);

        let slow = chain_with_spacing(10, 20_000, MIN_DIFFICULTY);
        assert_eq!(get_difficulty(&slow), MIN_DIFFICULTY);
    }
}

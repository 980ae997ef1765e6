use crate::core::block::{genesis_block, Block};
use crate::core::challenge::Challenge;
use crate::core::transaction::{Transaction, TransactionId};
use crate::error::{NodeError, Result};

/// The ordered ledger. Index 0 is always the canonical genesis block; every
/// later block is appended only after full validation against its
/// predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockChain {
    blocks: Vec<Block>,
}

impl BlockChain {
    pub fn new() -> BlockChain {
        BlockChain {
            blocks: vec![genesis_block()],
        }
    }

    /// Rebuild a chain from an untrusted block list (disk or peer). The
    /// whole list is rejected on the first invalid block; a partially valid
    /// chain never gets through.
    pub fn import(blocks: Vec<Block>) -> Result<BlockChain> {
        let first = blocks
            .first()
            .ok_or_else(|| NodeError::ChainNotValid("chain is empty".to_string()))?;
        if *first != genesis_block() {
            return Err(NodeError::ChainNotValid(
                "block 0 is not the canonical genesis block".to_string(),
            ));
        }

        for window in blocks.windows(2) {
            is_valid_based_on_previous(&window[0], &window[1])
                .map_err(|e| NodeError::ChainNotValid(e.to_string()))?;
        }

        Ok(BlockChain { blocks })
    }

    /// Pure construction of the next block from a solved challenge. Does not
    /// mutate the chain.
    pub fn new_block(
        &self,
        timestamp_millis: i64,
        transactions: Vec<Transaction>,
        challenge: Challenge,
    ) -> Result<Block> {
        if !challenge.matches_difficulty() {
            return Err(NodeError::DifficultyNotMatched);
        }

        let previous = self.get_last();
        if timestamp_millis - previous.get_timestamp_millis() < challenge.get_time_cap_millis() {
            return Err(NodeError::TimeCapNotMet);
        }

        Block::new(previous, timestamp_millis, transactions, challenge)
    }

    /// Append after full revalidation. Anything a peer could have forged is
    /// rechecked here, whether the block was mined locally or received.
    pub fn add_block(&mut self, block: Block) -> Result<()> {
        is_valid_based_on_previous(self.get_last(), &block)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Drop every block from `index` on. Only fork resolution calls this.
    pub fn truncate_from(&mut self, index: u64) {
        if index == 0 {
            return;
        }
        self.blocks.truncate(index as usize);
    }

    pub fn get_block(&self, index: u64) -> Result<&Block> {
        self.blocks
            .get(index as usize)
            .ok_or(NodeError::BlockNotFound)
    }

    pub fn get_last(&self) -> &Block {
        // Invariant: never empty, genesis is always present.
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get_first(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn get_block_by_hash(&self, content_hash: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.get_content_hash() == content_hash)
    }

    pub fn get_block_by_transaction_id(&self, id: &TransactionId) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|b| b.get_transactions().iter().any(|t| t.get_id() == id))
    }

    pub fn contains_transaction(&self, id: &TransactionId) -> bool {
        self.get_block_by_transaction_id(id).is_some()
    }

    pub fn get_blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Test-only constructor that skips validation.
    #[cfg(test)]
    pub(crate) fn from_blocks_unchecked(blocks: Vec<Block>) -> BlockChain {
        BlockChain { blocks }
    }

    /// Fork choice weight: the sum of squared difficulties. Squaring makes a
    /// short chain of hard blocks outweigh a long chain of easy ones.
    pub fn cumulative_difficulty(&self) -> u128 {
        self.blocks
            .iter()
            .map(|b| {
                let d = b.get_challenge().get_difficulty() as u128;
                d * d
            })
            .sum()
    }
}

impl Default for BlockChain {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_based_on_previous(previous: &Block, block: &Block) -> Result<()> {
    if block.get_index() != previous.get_index() + 1 {
        return Err(NodeError::BlockNotValid(format!(
            "index {} does not follow {}",
            block.get_index(),
            previous.get_index()
        )));
    }
    if block.get_prev_hash() != previous.get_content_hash() {
        return Err(NodeError::BlockNotValid(
            "prev hash does not match the previous block".to_string(),
        ));
    }
    if !block.has_valid_content_hash() {
        return Err(NodeError::BlockNotValid(
            "content hash does not match the block content".to_string(),
        ));
    }

    let challenge = block.get_challenge();
    if !challenge.matches_difficulty() {
        return Err(NodeError::DifficultyNotMatched);
    }
    if !Challenge::verify(
        previous,
        block.get_timestamp_millis(),
        challenge.get_nonce(),
        challenge.get_hash_value(),
        block.get_transactions(),
    ) {
        return Err(NodeError::BlockNotValid(
            "challenge hash does not verify against the previous block".to_string(),
        ));
    }
    if block.get_timestamp_millis() - previous.get_timestamp_millis()
        < challenge.get_time_cap_millis()
    {
        return Err(NodeError::TimeCapNotMet);
    }

    Ok(())
}

/// Test helper: mines a valid successor at trivial difficulty.
#[cfg(test)]
pub(crate) fn mine_next(
    chain: &BlockChain,
    transactions: Vec<Transaction>,
    time_cap_millis: i64,
) -> Block {
    let previous = chain.get_last();
    let timestamp = previous.get_timestamp_millis() + 6_000;
    let mut challenge = Challenge::new(2, time_cap_millis).unwrap();
    challenge
        .roll_until_matches_difficulty(previous, &transactions, timestamp)
        .unwrap();
    chain.new_block(timestamp, transactions, challenge).unwrap()
}

//! Mining loop
//!
//! One long-running task per node. The loop is an explicit state machine
//! advanced by message passing: the only external signal is the interrupt
//! channel, fired when a block was committed out-of-band, which makes the
//! miner reseed instead of racing a peer who already solved.

use crate::core::validate::validate_block_transactions;
use crate::core::{get_difficulty, Block, Challenge, Transaction, UnspentOutputRepository};
use crate::error::Result;
use crate::event::{EventPayload, Publisher};
use crate::storage::{ChainStore, MemoryPool, UtxoStore};
use crate::utils::current_timestamp_millis;
use log::{info, warn};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

enum MinerState {
    Searching,
    Committing { block: Block },
    Interrupted,
}

/// What one seed-to-resolution pass produced.
#[derive(Debug, PartialEq)]
pub enum MineOutcome {
    Committed(Block),
    Interrupted,
}

pub struct Miner {
    chain: Arc<ChainStore>,
    pool: Arc<MemoryPool>,
    unspent: Arc<UtxoStore>,
    publisher: Arc<dyn Publisher>,
    reward_address: String,
    time_cap_millis: i64,
    interrupt: Receiver<()>,
}

impl Miner {
    pub fn new(
        chain: Arc<ChainStore>,
        pool: Arc<MemoryPool>,
        unspent: Arc<UtxoStore>,
        publisher: Arc<dyn Publisher>,
        reward_address: &str,
        time_cap_millis: i64,
        interrupt: Receiver<()>,
    ) -> Miner {
        Miner {
            chain,
            pool,
            unspent,
            publisher,
            reward_address: reward_address.to_string(),
            time_cap_millis,
            interrupt,
        }
    }

    /// Run forever. Transient errors are logged and the loop retries after
    /// a short pause; nothing here is fatal to the process.
    pub fn run(&self) {
        info!("miner started, rewards to {}", self.reward_address);
        loop {
            match self.mine_once() {
                Ok(MineOutcome::Committed(block)) => {
                    info!(
                        "mined block {} with {} transaction(s)",
                        block.get_index(),
                        block.get_transactions().len()
                    );
                }
                Ok(MineOutcome::Interrupted) => {
                    info!("mining interrupted, reseeding from the chain");
                }
                Err(e) => {
                    warn!("mining pass failed: {e}");
                    thread::sleep(Duration::from_millis(100));
                }
            }
        }
    }

    /// One full pass: seed from the current chain tip, search until the
    /// challenge matches or an interrupt arrives, then commit. The pool is
    /// re-read on every roll so freshly accepted transactions join the
    /// candidate block immediately.
    pub fn mine_once(&self) -> Result<MineOutcome> {
        let chain = self.chain.get_chain();
        let previous = chain.get_last().clone();
        let next_height = previous.get_index() + 1;
        let mut challenge = Challenge::new(get_difficulty(&chain), self.time_cap_millis)?;

        let mut state = MinerState::Searching;
        loop {
            state = match state {
                MinerState::Searching => {
                    if self.interrupt.try_recv().is_ok() {
                        MinerState::Interrupted
                    } else {
                        let mut transactions = vec![Transaction::new_coinbase(
                            &self.reward_address,
                            next_height as usize,
                        )];
                        transactions.extend(self.pool.get_all());

                        let timestamp = current_timestamp_millis()?;
                        challenge.roll_nonce(&previous, &transactions, timestamp)?;
                        if challenge.matches_difficulty() {
                            let block =
                                chain.new_block(timestamp, transactions, challenge.clone())?;
                            MinerState::Committing { block }
                        } else {
                            MinerState::Searching
                        }
                    }
                }
                MinerState::Committing { block } => {
                    validate_block_transactions(
                        block.get_transactions(),
                        self.unspent.as_ref(),
                        next_height as usize,
                    )?;
                    // add_block revalidates against the live chain, which may
                    // have moved past our snapshot in the meantime
                    self.chain.add_block(block.clone())?;
                    self.reconcile()?;
                    self.publisher
                        .publish(EventPayload::BlockAdded(block.clone()))?;
                    return Ok(MineOutcome::Committed(block));
                }
                MinerState::Interrupted => return Ok(MineOutcome::Interrupted),
            };
        }
    }

    // After a commit the UTXO set follows the chain and the pool drops
    // whatever the new block spent.
    fn reconcile(&self) -> Result<()> {
        let chain = self.chain.get_chain();
        self.unspent.rebuild_from_chain(&chain)?;
        self.pool.update(&self.unspent.get_all()?);
        Ok(())
    }
}

//! Shared state behind reader/writer locks
//!
//! Each structure guards itself; no lock is ever held across a call into
//! another structure or into I/O.

pub mod chain_store;
pub mod in_flight;
pub mod memory_pool;
pub mod persistence;
pub mod utxo_store;

pub use chain_store::ChainStore;
pub use in_flight::{InFlightStore, SeenStore};
pub use memory_pool::MemoryPool;
pub use utxo_store::{unspent_outputs_from_chain, UtxoStore};

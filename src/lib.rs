//! ferrocoin: a minimal proof-of-work cryptocurrency node
//!
//! Hash-chained ledger with a UTXO transaction model, an interruptible
//! mining loop and an event-driven transaction propagation machine.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod node;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use error::{NodeError, Result};

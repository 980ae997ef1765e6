//! Error handling for the node
//!
//! This module provides the error types for all ledger, pool and
//! propagation operations.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

/// Error types for node operations
#[derive(Debug, Clone)]
pub enum NodeError {
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Configuration errors
    Config(String),
    /// Network communication errors
    Network(String),
    /// Challenge difficulty outside the allowed bounds
    InvalidDifficulty(u32),
    /// Solved challenge does not meet its own difficulty
    DifficultyNotMatched,
    /// Block timestamp is too close to its predecessor
    TimeCapNotMet,
    /// Block failed validation against the chain
    BlockNotValid(String),
    /// Block lookup failed
    BlockNotFound,
    /// Imported chain failed validation
    ChainNotValid(String),
    /// Transaction validation errors
    Transaction(String),
    /// Transaction lookup failed
    TransactionNotFound(String),
    /// Invalid address format
    InvalidAddress(String),
    /// Insufficient funds for a spend
    InsufficientFunds { required: u64, available: u64 },
    /// Transaction was already propagated and committed
    AlreadySeen(String),
    /// No peers configured when a send was required
    NoPeers,
    /// Every peer in a broadcast failed
    AllPeersFailed,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            NodeError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            NodeError::Io(msg) => write!(f, "I/O error: {msg}"),
            NodeError::Config(msg) => write!(f, "Configuration error: {msg}"),
            NodeError::Network(msg) => write!(f, "Network error: {msg}"),
            NodeError::InvalidDifficulty(d) => {
                write!(f, "Difficulty {d} not valid: must be between 2 and 256")
            }
            NodeError::DifficultyNotMatched => {
                write!(f, "Challenge hash does not match its difficulty")
            }
            NodeError::TimeCapNotMet => {
                write!(f, "Block created before the challenge time cap elapsed")
            }
            NodeError::BlockNotValid(msg) => write!(f, "Block is not valid: {msg}"),
            NodeError::BlockNotFound => write!(f, "Block not found"),
            NodeError::ChainNotValid(msg) => write!(f, "Chain not valid: {msg}"),
            NodeError::Transaction(msg) => write!(f, "Transaction error: {msg}"),
            NodeError::TransactionNotFound(id) => write!(f, "Transaction not found: {id}"),
            NodeError::InvalidAddress(addr) => write!(f, "Invalid address: {addr}"),
            NodeError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            NodeError::AlreadySeen(id) => write!(f, "Transaction already seen: {id}"),
            NodeError::NoPeers => write!(f, "No peers configured"),
            NodeError::AllPeersFailed => write!(f, "All peers failed"),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Io(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for NodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for NodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(err: serde_json::Error) -> Self {
        NodeError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NodeError {
    fn from(err: toml::de::Error) -> Self {
        NodeError::Config(err.to_string())
    }
}

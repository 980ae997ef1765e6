//! Utility functions and helpers
//!
//! Cryptographic digests, deterministic serialization and timestamp
//! helpers used throughout the node.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp_millis, ecdsa_p256_sign, ecdsa_p256_verify, new_key_pair, sha256_digest,
};
pub use serialization::{deserialize, serialize};

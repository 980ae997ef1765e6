//! Wallet and signing
//!
//! ECDSA P-256 key management. An address is the lowercase hex encoding of
//! the raw public key, so validation can recover the key straight from the
//! address on an output.

use crate::error::{NodeError, Result};
use crate::utils::{ecdsa_p256_sign, new_key_pair};
use data_encoding::HEXLOWER;
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING};
use std::fs;
use std::path::Path;

/// Capability to sign bytes with a private key and expose the matching
/// public key. The transaction layer depends only on this trait.
pub trait Signer {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
    fn public_key(&self) -> &[u8];

    /// Address derived from the public key (lowercase hex).
    fn address(&self) -> String {
        HEXLOWER.encode(self.public_key())
    }
}

#[derive(Clone)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        Self::from_pkcs8(pkcs8)
    }

    pub fn from_pkcs8(pkcs8: Vec<u8>) -> Result<Wallet> {
        let rng = SystemRandom::new();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .map_err(|e| {
                    NodeError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
                })?;
        let public_key = key_pair.public_key().as_ref().to_vec();
        Ok(Wallet { pkcs8, public_key })
    }

    /// Load a wallet from a PKCS#8 key file.
    pub fn load(path: &Path) -> Result<Wallet> {
        let pkcs8 = fs::read(path)
            .map_err(|e| NodeError::Io(format!("Failed to read key file {}: {e}", path.display())))?;
        Self::from_pkcs8(pkcs8)
    }

    /// Write the PKCS#8 key material to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| NodeError::Io(format!("Failed to create {}: {e}", dir.display())))?;
        }
        fs::write(path, &self.pkcs8)
            .map_err(|e| NodeError::Io(format!("Failed to write key file {}: {e}", path.display())))
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

impl Signer for Wallet {
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        ecdsa_p256_sign(self.pkcs8.as_slice(), message)
    }

    fn public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }
}

/// Parse a hex address back into raw public key bytes.
pub fn decode_address(address: &str) -> Result<Vec<u8>> {
    HEXLOWER
        .decode(address.as_bytes())
        .map_err(|e| NodeError::InvalidAddress(format!("{address}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ecdsa_p256_verify;
    use tempfile::tempdir;

    #[test]
    fn test_address_round_trips_to_public_key() {
        let wallet = Wallet::new().unwrap();
        let decoded = decode_address(&wallet.address()).unwrap();
        assert_eq!(decoded, wallet.public_key());
    }

    #[test]
    fn test_signature_verifies_against_address_key() {
        let wallet = Wallet::new().unwrap();
        let signature = wallet.sign(b"spend").unwrap();
        let key = decode_address(&wallet.address()).unwrap();
        assert!(ecdsa_p256_verify(&key, &signature, b"spend"));
    }

    #[test]
    fn test_save_and_load_preserves_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.key");

        let wallet = Wallet::new().unwrap();
        wallet.save(&path).unwrap();

        let loaded = Wallet::load(&path).unwrap();
        assert_eq!(loaded.address(), wallet.address());
    }

    #[test]
    fn test_decode_address_rejects_garbage() {
        assert!(decode_address("not-hex!").is_err());
    }
}

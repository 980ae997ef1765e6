use crate::core::{Block, BlockChain};
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Write the chain to disk as a JSON block list. The JSON field names are
/// the wire contract shared with peers, so a persisted file is byte-for-byte
/// a valid `/chain` payload.
pub fn save_chain(path: &Path, chain: &BlockChain) -> Result<()> {
    let json = serde_json::to_string_pretty(chain.get_blocks())?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a chain back from disk. The block list goes through full import
/// validation; a file with any invalid block is rejected as a whole.
pub fn load_chain(path: &Path) -> Result<BlockChain> {
    let data = fs::read_to_string(path)?;
    let blocks: Vec<Block> = serde_json::from_str(&data)?;
    BlockChain::import(blocks)
}

/// Startup entry point: a missing file means a fresh node, anything else
/// must parse and validate.
pub fn load_or_create(path: &Path) -> Result<BlockChain> {
    if !path.exists() {
        return Ok(BlockChain::new());
    }
    load_chain(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blockchain::mine_next;
    use crate::core::Transaction;
    use crate::error::NodeError;

    fn sample_chain() -> BlockChain {
        let mut chain = BlockChain::new();
        for height in 1..=2usize {
            let block = mine_next(&chain, vec![Transaction::new_coinbase("miner", height)], 0);
            chain.add_block(block).unwrap();
        }
        chain
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");

        let chain = sample_chain();
        save_chain(&path, &chain).unwrap();
        let loaded = load_chain(&path).unwrap();
        assert_eq!(loaded, chain);
    }

    #[test]
    fn test_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        save_chain(&path, &sample_chain()).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        for field in [
            "\"index\"",
            "\"timestampMillis\"",
            "\"contentHash\"",
            "\"prevHash\"",
            "\"transactions\"",
            "\"challenge\"",
            "\"difficulty\"",
            "\"nonce\"",
            "\"hash_value\"",
            "\"time_cap_millis\"",
            "\"output_id\"",
            "\"output_index\"",
            "\"signature\"",
            "\"amount\"",
            "\"address\"",
        ] {
            assert!(json.contains(field), "missing field {field}");
        }
    }

    #[test]
    fn test_load_rejects_tampered_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        save_chain(&path, &sample_chain()).unwrap();

        let tampered = fs::read_to_string(&path)
            .unwrap()
            .replace("\"amount\": 10", "\"amount\": 9999");
        fs::write(&path, tampered).unwrap();

        let err = load_chain(&path).unwrap_err();
        assert!(matches!(err, NodeError::ChainNotValid(_)));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.json");
        fs::write(&path, "not json").unwrap();

        let err = load_chain(&path).unwrap_err();
        assert!(matches!(err, NodeError::Serialization(_)));
    }

    #[test]
    fn test_load_or_create_starts_fresh_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let chain = load_or_create(&path).unwrap();
        assert_eq!(chain, BlockChain::new());
    }
}

// Block-level transaction validation. Runs against the committed UTXO set,
// so a transaction is only as valid as the chain state it spends from.

use crate::core::transaction::{
    new_id, Input, Transaction, TransactionId, UnspentOutputRepository,
};
use crate::core::COINBASE_AMOUNT;
use crate::error::{NodeError, Result};
use crate::utils::ecdsa_p256_verify;
use crate::wallet::decode_address;
use data_encoding::HEXLOWER;
use std::collections::HashSet;

/// Validate the transaction list of a block at `block_height`: the first
/// transaction must be the coinbase for exactly that height, every other one
/// must spend existing unspent outputs with valid owner signatures, and no
/// output may be consumed twice within the block.
pub fn validate_block_transactions(
    transactions: &[Transaction],
    unspent_repository: &dyn UnspentOutputRepository,
    block_height: usize,
) -> Result<()> {
    let coinbase = transactions.first().ok_or_else(|| {
        NodeError::Transaction("block carries no coinbase transaction".to_string())
    })?;
    validate_coinbase(coinbase, block_height)?;

    // The repository only reflects committed blocks, so conflicting spends
    // inside this block must be caught here.
    let mut consumed: HashSet<(TransactionId, usize)> = HashSet::new();
    for transaction in &transactions[1..] {
        validate_transaction(transaction, unspent_repository)?;
        for input in transaction.get_inputs() {
            let reference = (input.get_output_id().clone(), input.get_output_index());
            if !consumed.insert(reference) {
                return Err(NodeError::Transaction(format!(
                    "output {}:{} is spent twice within the block",
                    input.get_output_id(),
                    input.get_output_index()
                )));
            }
        }
    }
    Ok(())
}

/// The coinbase has exactly one input spending nothing, with the block
/// height as its output index, and exactly one output of the fixed reward.
pub fn validate_coinbase(transaction: &Transaction, block_height: usize) -> Result<()> {
    if !transaction.is_coinbase() {
        return Err(NodeError::Transaction(
            "first transaction in a block must be a coinbase".to_string(),
        ));
    }
    let input = &transaction.get_inputs()[0];
    if input.get_output_index() != block_height {
        return Err(NodeError::Transaction(format!(
            "coinbase input index {} does not encode block height {}",
            input.get_output_index(),
            block_height
        )));
    }
    if transaction.get_outputs()[0].get_amount() != COINBASE_AMOUNT {
        return Err(NodeError::Transaction(format!(
            "coinbase amount {} is not the fixed reward {}",
            transaction.get_outputs()[0].get_amount(),
            COINBASE_AMOUNT
        )));
    }
    Ok(())
}

/// Validate a regular transaction: the id must match its content, and every
/// input must resolve to a live unspent output whose owner signed this id.
pub fn validate_transaction(
    transaction: &Transaction,
    unspent_repository: &dyn UnspentOutputRepository,
) -> Result<()> {
    let expected_id = new_id(transaction.get_inputs(), transaction.get_outputs());
    if expected_id != *transaction.get_id() {
        return Err(NodeError::Transaction(format!(
            "transaction id {} does not match its content",
            transaction.get_id()
        )));
    }

    for input in transaction.get_inputs() {
        let referenced = unspent_repository
            .get_by_output_id_and_index(input.get_output_id(), input.get_output_index())?
            .ok_or_else(|| {
                NodeError::TransactionNotFound(format!(
                    "{}:{}",
                    input.get_output_id(),
                    input.get_output_index()
                ))
            })?;
        validate_input_signature(input, transaction.get_id(), referenced.get_address())?;
    }
    Ok(())
}

// The referenced output's address is the owner's hex-encoded public key, so
// signature verification needs nothing beyond the UTXO itself.
fn validate_input_signature(
    input: &Input,
    transaction_id: &TransactionId,
    owner_address: &str,
) -> Result<()> {
    let public_key = decode_address(owner_address)?;
    let signature = HEXLOWER
        .decode(input.get_signature().as_bytes())
        .map_err(|_| {
            NodeError::Transaction("input signature is not valid hex".to_string())
        })?;

    if !ecdsa_p256_verify(
        public_key.as_slice(),
        signature.as_slice(),
        transaction_id.as_str().as_bytes(),
    ) {
        return Err(NodeError::Transaction(format!(
            "input signature does not verify for output {}:{}",
            input.get_output_id(),
            input.get_output_index()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::{Output, UnspentOutput};
    use crate::storage::UtxoStore;
    use crate::wallet::{Signer, Wallet};

    fn funded_store(owner: &Wallet, amount: u64) -> UtxoStore {
        let store = UtxoStore::new();
        store
            .set(vec![UnspentOutput::new(
                TransactionId::from("funding"),
                0,
                amount,
                &owner.address(),
            )])
            .unwrap();
        store
    }

    #[test]
    fn test_valid_spend_passes() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);
        let tx = Transaction::new("receiver", &owner.address(), 40, &owner, &store).unwrap();

        validate_transaction(&tx, &store).unwrap();
    }

    #[test]
    fn test_tampered_outputs_are_rejected() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);
        let tx = Transaction::new("receiver", &owner.address(), 40, &owner, &store).unwrap();

        // Redirect the payment while keeping the old id and signature
        let tampered = Transaction::new_from(
            tx.get_inputs().to_vec(),
            vec![Output::new(40, "attacker"), Output::new(60, &owner.address())],
        );
        let err = validate_transaction(&tampered, &store).unwrap_err();
        assert!(matches!(err, NodeError::Transaction(_)));
    }

    #[test]
    fn test_spend_of_missing_output_is_rejected() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);
        let tx = Transaction::new("receiver", &owner.address(), 40, &owner, &store).unwrap();

        // Empty the UTXO set: the input no longer resolves
        store.set(vec![]).unwrap();
        let err = validate_transaction(&tx, &store).unwrap_err();
        assert!(matches!(err, NodeError::TransactionNotFound(_)));
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);

        let inputs = vec![Input::new(
            TransactionId::from("funding"),
            0,
            "deadbeef".to_string(),
        )];
        let tx = Transaction::new_from(inputs, vec![Output::new(100, "receiver")]);
        let err = validate_transaction(&tx, &store).unwrap_err();
        assert!(matches!(err, NodeError::Transaction(_)));
    }

    #[test]
    fn test_coinbase_shape_is_enforced() {
        let coinbase = Transaction::new_coinbase("miner", 3);
        validate_coinbase(&coinbase, 3).unwrap();

        let err = validate_coinbase(&coinbase, 4).unwrap_err();
        assert!(matches!(err, NodeError::Transaction(_)));

        let not_coinbase = Transaction::new_from(vec![], vec![Output::new(10, "miner")]);
        assert!(validate_coinbase(&not_coinbase, 0).is_err());
    }

    #[test]
    fn test_block_transactions_require_leading_coinbase() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);
        let spend = Transaction::new("receiver", &owner.address(), 40, &owner, &store).unwrap();

        let err =
            validate_block_transactions(&[spend.clone()], &store, 1).unwrap_err();
        assert!(matches!(err, NodeError::Transaction(_)));

        let coinbase = Transaction::new_coinbase("miner", 1);
        validate_block_transactions(&[coinbase, spend], &store, 1).unwrap();
    }

    #[test]
    fn test_conflicting_spends_within_one_block_are_rejected() {
        let owner = Wallet::new().unwrap();
        let store = funded_store(&owner, 100);

        // Two individually valid spends of the same funding output
        let first = Transaction::new("alice", &owner.address(), 40, &owner, &store).unwrap();
        let second = Transaction::new("bob", &owner.address(), 60, &owner, &store).unwrap();
        let coinbase = Transaction::new_coinbase("miner", 1);

        let err = validate_block_transactions(&[coinbase.clone(), first.clone(), second], &store, 1)
            .unwrap_err();
        assert!(matches!(err, NodeError::Transaction(_)));
        assert!(err.to_string().contains("spent twice"));

        // A single spend of that output still passes
        validate_block_transactions(&[coinbase, first], &store, 1).unwrap();
    }
}

// This file implements the UTXO transaction model. Every transaction consumes
// previously-committed outputs and creates new ones; the transaction id is a
// pure function of its inputs and outputs, so identical spends always collide
// to the same id.

use crate::core::{COINBASE_AMOUNT, GENESIS_ADDRESS, GENESIS_AMOUNT};
use crate::error::{NodeError, Result};
use crate::utils::sha256_digest;
use crate::wallet::Signer;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable transaction identity: lowercase hex of a SHA-256 digest over the
/// transaction content.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(value: &str) -> Self {
        TransactionId(value.to_string())
    }
}

/// Reference to a prior output, plus the signature proving ownership of it.
#[derive(
    Debug, Clone, Default, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Input {
    output_id: TransactionId,
    output_index: usize,
    signature: String,
}

impl Input {
    pub fn new(output_id: TransactionId, output_index: usize, signature: String) -> Input {
        Input {
            output_id,
            output_index,
            signature,
        }
    }

    pub fn get_output_id(&self) -> &TransactionId {
        &self.output_id
    }

    pub fn get_output_index(&self) -> usize {
        self.output_index
    }

    pub fn get_signature(&self) -> &str {
        self.signature.as_str()
    }

    // Signing someone else's output is refused up front: the signer's derived
    // address must match the address on the referenced output.
    fn sign(
        &mut self,
        signer: &dyn Signer,
        id_to_sign: &TransactionId,
        referenced: &UnspentOutput,
    ) -> Result<()> {
        if signer.address() != referenced.get_address() {
            return Err(NodeError::Transaction(
                "output address does not match the signer address".to_string(),
            ));
        }

        let signature = signer.sign(id_to_sign.as_str().as_bytes())?;
        self.signature = HEXLOWER.encode(signature.as_slice());
        Ok(())
    }
}

/// A spendable amount locked to an address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Output {
    amount: u64,
    address: String,
}

impl Output {
    pub fn new(amount: u64, address: &str) -> Output {
        Output {
            amount,
            address: address.to_string(),
        }
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }
}

/// A materialized, currently-spendable output. Created when a transaction's
/// outputs are committed to the chain, destroyed when a later input consumes
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnspentOutput {
    output_id: TransactionId,
    output_index: usize,
    amount: u64,
    address: String,
}

impl UnspentOutput {
    pub fn new(
        output_id: TransactionId,
        output_index: usize,
        amount: u64,
        address: &str,
    ) -> UnspentOutput {
        UnspentOutput {
            output_id,
            output_index,
            amount,
            address: address.to_string(),
        }
    }

    pub fn get_output_id(&self) -> &TransactionId {
        &self.output_id
    }

    pub fn get_output_index(&self) -> usize {
        self.output_index
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_address(&self) -> &str {
        self.address.as_str()
    }

    pub fn as_input(&self) -> Input {
        Input::new(self.output_id.clone(), self.output_index, String::new())
    }
}

/// UTXO storage contract. The core treats the repository as authoritative
/// for validation and spend selection; one in-memory implementation lives in
/// `storage::UtxoStore`.
pub trait UnspentOutputRepository: Send + Sync {
    fn get_all(&self) -> Result<Vec<UnspentOutput>>;
    fn get_by_address(&self, address: &str) -> Result<Vec<UnspentOutput>>;
    fn get_by_output_id_and_index(
        &self,
        output_id: &TransactionId,
        output_index: usize,
    ) -> Result<Option<UnspentOutput>>;
    fn set(&self, unspent: Vec<UnspentOutput>) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: TransactionId,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

impl Transaction {
    /// Build and id a transaction from fully-formed inputs and outputs.
    /// Used for deserialization and for the fixed-shape transactions below.
    pub fn new_from(inputs: Vec<Input>, outputs: Vec<Output>) -> Transaction {
        let id = new_id(&inputs, &outputs);
        Transaction {
            id,
            inputs,
            outputs,
        }
    }

    /// Build a signed spend of `amount` from `sender_addr` to
    /// `receiver_addr`, selecting the sender's UTXOs greedily in repository
    /// order. Any leftover goes back to the sender as a change output.
    pub fn new(
        receiver_addr: &str,
        sender_addr: &str,
        amount: u64,
        signer: &dyn Signer,
        unspent_repository: &dyn UnspentOutputRepository,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(NodeError::Transaction(
                "Amount must be positive".to_string(),
            ));
        }

        let unspent_outputs = unspent_repository.get_by_address(sender_addr)?;
        let (leftover, included) = calculate_unspent_for_amount(&unspent_outputs, amount)?;

        let inputs: Vec<Input> = included.iter().map(|u| u.as_input()).collect();

        let mut outputs = vec![Output::new(amount, receiver_addr)];
        if leftover > 0 {
            outputs.push(Output::new(leftover, sender_addr));
        }

        let mut tx = Self::new_from(inputs, outputs);
        for (input, referenced) in tx.inputs.iter_mut().zip(included.iter()) {
            input.sign(signer, &tx.id, referenced)?;
        }
        Ok(tx)
    }

    /// The fixed transaction in block 0: no inputs, one well-known output.
    /// Identical bytes on every node.
    pub fn new_genesis() -> Transaction {
        Self::new_from(vec![], vec![Output::new(GENESIS_AMOUNT, GENESIS_ADDRESS)])
    }

    /// Miner reward. The single input spends nothing; its output index
    /// encodes the block height so each coinbase gets a distinct id.
    pub fn new_coinbase(receiver_addr: &str, block_height: usize) -> Transaction {
        let input = Input::new(TransactionId::default(), block_height, String::new());
        Self::new_from(vec![input], vec![Output::new(COINBASE_AMOUNT, receiver_addr)])
    }

    pub fn get_id(&self) -> &TransactionId {
        &self.id
    }

    pub fn get_inputs(&self) -> &[Input] {
        self.inputs.as_slice()
    }

    pub fn get_outputs(&self) -> &[Output] {
        self.outputs.as_slice()
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].output_id.is_empty() && self.outputs.len() == 1
    }
}

/// Digest over each input's `(output_id, output_index)` and each output's
/// `(amount, address)`, in sequence order. No randomness: equal content,
/// equal id.
pub fn new_id(inputs: &[Input], outputs: &[Output]) -> TransactionId {
    let mut content = String::new();
    for input in inputs {
        content.push_str(input.output_id.as_str());
        content.push_str(&input.output_index.to_string());
    }
    for output in outputs {
        content.push_str(&output.amount.to_string());
        content.push_str(&output.address);
    }

    TransactionId(HEXLOWER.encode(sha256_digest(content.as_bytes()).as_slice()))
}

/// Accumulate UTXOs in the given order until `amount` is covered. Returns
/// the leftover and the consumed outputs; no attempt is made to minimize
/// the UTXO count or the change.
pub fn calculate_unspent_for_amount(
    unspent_outputs: &[UnspentOutput],
    amount: u64,
) -> Result<(u64, Vec<UnspentOutput>)> {
    let mut current_amount = 0u64;
    let mut included = Vec::new();

    for unspent_output in unspent_outputs {
        if current_amount >= amount {
            break;
        }
        current_amount += unspent_output.amount;
        included.push(unspent_output.clone());
    }

    if current_amount < amount {
        return Err(NodeError::InsufficientFunds {
            required: amount,
            available: unspent_outputs.iter().map(|u| u.amount).sum(),
        });
    }

    Ok((current_amount - amount, included))
}

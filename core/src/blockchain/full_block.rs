use crate::blockchain::coin::Coin;
use crate::blockchain::proof_of_space::ProofOfSpace;
use crate::blockchain::sized_bytes::{Bytes32, Bytes96};
use crate::blockchain::sub_epoch_summary::SubEpochSummary;
use crate::blockchain::vdf::{VdfInfo, VdfProof};
use crate::utils::hash_256;
use serde::{Deserialize, Serialize};

/// Coin-set delta carried by a transaction block.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TransactionsData {
    pub removals: Vec<Bytes32>,
    pub additions: Vec<Coin>,
    pub fees: u64,
    pub cost: u64,
    pub aggregated_signature: Bytes96,
    pub timestamp: u64,
}

impl TransactionsData {
    #[must_use]
    pub fn get_hash(&self) -> Bytes32 {
        let mut to_hash: Vec<u8> = Vec::new();
        for removal in &self.removals {
            to_hash.extend(*removal);
        }
        for addition in &self.additions {
            to_hash.extend(addition.name());
        }
        to_hash.extend(self.fees.to_be_bytes());
        to_hash.extend(self.cost.to_be_bytes());
        to_hash.extend(self.aggregated_signature);
        to_hash.extend(self.timestamp.to_be_bytes());
        Bytes32::from(hash_256(to_hash))
    }
}

/// A candidate block as handed to `receive_block`. Wire framing is the
/// networking layer's concern; this is the validated in-memory form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct FullBlock {
    pub prev_hash: Bytes32,
    pub height: u32,
    pub weight: u128,
    pub total_iters: u128,
    pub signage_point_index: u8,
    pub num_finished_sub_slots: u32,
    pub proof_of_space: ProofOfSpace,
    pub required_iters: u64,
    pub cc_sp_vdf: Option<VdfInfo>,
    pub cc_sp_proof: Option<VdfProof>,
    pub cc_ip_vdf: VdfInfo,
    pub cc_ip_proof: VdfProof,
    pub pool_puzzle_hash: Bytes32,
    pub farmer_puzzle_hash: Bytes32,
    pub sub_epoch_summary: Option<SubEpochSummary>,
    pub transactions: Option<TransactionsData>,
}

impl FullBlock {
    #[must_use]
    pub fn header_hash(&self) -> Bytes32 {
        let mut to_hash: Vec<u8> = Vec::new();
        to_hash.extend(self.prev_hash);
        to_hash.extend(self.height.to_be_bytes());
        to_hash.extend(self.weight.to_be_bytes());
        to_hash.extend(self.total_iters.to_be_bytes());
        to_hash.push(self.signage_point_index);
        to_hash.extend(self.num_finished_sub_slots.to_be_bytes());
        to_hash.extend(self.proof_of_space.get_hash());
        to_hash.extend(self.required_iters.to_be_bytes());
        to_hash.extend(self.cc_ip_vdf.output.get_hash());
        to_hash.extend(self.pool_puzzle_hash);
        to_hash.extend(self.farmer_puzzle_hash);
        match &self.transactions {
            Some(txs) => to_hash.extend(txs.get_hash()),
            None => to_hash.push(0),
        }
        Bytes32::from(hash_256(to_hash))
    }

    #[must_use]
    pub fn is_transaction_block(&self) -> bool {
        self.transactions.is_some()
    }

    /// Hash of the challenge-chain signage point this block's proof was
    /// created for. At signage point index zero the challenge itself is used.
    #[must_use]
    pub fn signage_point_hash(&self) -> Bytes32 {
        match &self.cc_sp_vdf {
            Some(sp_vdf) => sp_vdf.output.get_hash(),
            None => self.proof_of_space.challenge,
        }
    }
}

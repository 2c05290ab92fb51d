use crate::blockchain::sized_bytes::Bytes32;
use crate::blockchain::sub_epoch_summary::SubEpochSummary;
use crate::consensus::constants::ConsensusConstants;
use serde::{Deserialize, Serialize};

/// Immutable per-block metadata, computed once on acceptance. All ancestry
/// links are hash keys resolved through the block index, never pointers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct BlockRecord {
    pub header_hash: Bytes32,
    pub prev_hash: Bytes32,
    pub height: u32,
    pub weight: u128,
    pub total_iters: u128,
    pub signage_point_index: u8,
    pub required_iters: u64,
    /// Iterations from the start of this block's sub-slot to its infusion.
    pub ip_iters: u64,
    pub sub_slot_iters: u64,
    pub deficit: u8,
    pub overflow: bool,
    pub pool_puzzle_hash: Bytes32,
    pub farmer_puzzle_hash: Bytes32,
    pub prev_transaction_block_height: u32,
    pub prev_transaction_block_hash: Option<Bytes32>,
    pub timestamp: Option<u64>,
    pub fees: Option<u64>,
    pub sub_epoch_summary_included: Option<SubEpochSummary>,
}

impl BlockRecord {
    #[must_use]
    pub fn is_transaction_block(&self) -> bool {
        self.timestamp.is_some()
    }
    #[must_use]
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
    /// Cumulative iterations at the start of this block's sub-slot.
    #[must_use]
    pub fn sub_slot_start_total_iters(&self) -> u128 {
        self.total_iters - u128::from(self.ip_iters)
    }
    /// Cumulative iterations at this block's signage point. Overflow blocks
    /// take their signage point from the previous sub-slot.
    #[must_use]
    pub fn signage_point_total_iters(&self, constants: &ConsensusConstants) -> u128 {
        let sp_interval = self.sub_slot_iters / u64::from(constants.num_sps_sub_slot);
        let sp_iters = sp_interval * u64::from(self.signage_point_index);
        let base = self.sub_slot_start_total_iters() + u128::from(sp_iters);
        if self.overflow {
            base.saturating_sub(u128::from(self.sub_slot_iters))
        } else {
            base
        }
    }
}

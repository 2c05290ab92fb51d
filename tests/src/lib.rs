use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::sync::Arc;
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::coin::Coin;
use verdant_core::blockchain::full_block::{FullBlock, TransactionsData};
use verdant_core::blockchain::proof_of_space::{ProofBytes, ProofOfSpace};
use verdant_core::blockchain::sized_bytes::{Bytes32, Bytes96, SizedBytes};
use verdant_core::blockchain::sub_epoch_summary::SubEpochSummary;
use verdant_core::blockchain::vdf::{VdfInfo, VdfOutput, VdfProof};
use verdant_core::consensus::constants::ConsensusConstants;
use verdant_core::consensus::pot_iterations::{calculate_ip_iters, calculate_iterations_quality};
use verdant_core::utils::hash_256;
use verdant_node::block_index::BlockIndex;
use verdant_node::chain::ChainStateMachine;
use verdant_node::difficulty::{
    can_finish_sub_and_full_epoch, get_next_difficulty, get_next_sub_slot_iters,
};
use verdant_node::stores::MemoryBlockStore;
use verdant_node::traits::EmulatedVerifier;
use verdant_node::validation::validate_header;

pub fn init_logging() {
    let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
}

/// Small-network parameters: two-block slots, four-block sub-epochs and
/// eight-block epochs, so boundary behavior shows up within a handful of
/// blocks. The tiny difficulty constant factor pins `required_iters` to 1
/// for every emulated proof.
pub fn test_constants() -> Arc<ConsensusConstants> {
    Arc::new(ConsensusConstants {
        slot_blocks_target: 2,
        min_blocks_per_challenge_block: 2,
        max_sub_slot_blocks: 3,
        num_sps_sub_slot: 8,
        sub_slot_iters_starting: 640,
        difficulty_constant_factor: 2u128.pow(20),
        difficulty_starting: 7,
        difficulty_change_max_factor: 3,
        sub_epoch_blocks: 4,
        epoch_blocks: 8,
        significant_bits: 8,
        sub_slot_time_target: 300,
        num_sp_intervals_extra: 1,
        coinbase_freeze_period: 2,
        ..Default::default()
    })
}

pub fn new_machine(constants: Arc<ConsensusConstants>) -> ChainStateMachine {
    let verifier = Arc::new(EmulatedVerifier);
    ChainStateMachine::new(
        constants,
        Arc::new(MemoryBlockStore::new()),
        verifier.clone(),
        verifier.clone(),
        verifier,
    )
}

pub fn machine_with_store(
    constants: Arc<ConsensusConstants>,
    store: Arc<MemoryBlockStore>,
) -> ChainStateMachine {
    let verifier = Arc::new(EmulatedVerifier);
    ChainStateMachine::new(constants, store, verifier.clone(), verifier.clone(), verifier)
}

/// Knobs for one generated block. Defaults give a transaction block in a
/// fresh sub-slot with no spends.
pub struct BlockSpec {
    pub plot_seed: u8,
    pub num_finished_sub_slots: u32,
    pub transaction: bool,
    pub timestamp: Option<u64>,
    pub removals: Vec<Bytes32>,
    pub additions: Vec<Coin>,
    pub fees: u64,
}

impl Default for BlockSpec {
    fn default() -> Self {
        Self {
            plot_seed: 1,
            num_finished_sub_slots: 1,
            transaction: true,
            timestamp: None,
            removals: vec![],
            additions: vec![],
            fees: 0,
        }
    }
}

impl BlockSpec {
    #[must_use]
    pub fn with_seed(plot_seed: u8) -> Self {
        Self {
            plot_seed,
            ..Self::default()
        }
    }
}

/// Builds header-valid blocks by running the same consensus arithmetic the
/// node validates with, tracking its own record index so forks can be grown
/// from any known block.
pub struct ChainBuilder {
    pub constants: Arc<ConsensusConstants>,
    index: BlockIndex,
}

impl ChainBuilder {
    #[must_use]
    pub fn new(constants: Arc<ConsensusConstants>) -> Self {
        Self {
            constants,
            index: BlockIndex::new(),
        }
    }

    #[must_use]
    pub fn record(&self, header_hash: &Bytes32) -> &BlockRecord {
        self.index
            .get(header_hash)
            .expect("block was not built by this builder")
    }

    pub fn make_genesis(&mut self) -> FullBlock {
        self.make_block(None, BlockSpec::default())
    }

    /// Grows a chain of `count` default blocks from `parent` (`None` starts
    /// at genesis), returning the blocks oldest first.
    pub fn make_chain(&mut self, parent: Option<Bytes32>, count: u32, seed: u8) -> Vec<FullBlock> {
        let mut blocks = Vec::with_capacity(count as usize);
        let mut parent = parent;
        for _ in 0..count {
            let block = self.make_block(parent, BlockSpec::with_seed(seed));
            parent = Some(block.header_hash());
            blocks.push(block);
        }
        blocks
    }

    fn prev_tx_timestamp(&self, parent: Option<&BlockRecord>) -> u64 {
        match parent {
            None => 900,
            Some(p) if p.is_transaction_block() => p.timestamp.unwrap_or(900),
            Some(p) => p
                .prev_transaction_block_hash
                .and_then(|h| self.index.get(&h))
                .and_then(|r| r.timestamp)
                .unwrap_or(900),
        }
    }

    pub fn make_block(&mut self, parent: Option<Bytes32>, spec: BlockSpec) -> FullBlock {
        let parent_record = parent.map(|hash| self.record(&hash).clone());
        let (height, challenge) = match &parent_record {
            None => (0, self.constants.genesis_challenge),
            Some(p) => (p.height + 1, p.header_hash),
        };
        let plot_id = Bytes32::from([spec.plot_seed; 32]);
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(plot_id.as_slice());
        buf.extend_from_slice(challenge.as_slice());
        let quality = Bytes32::from(hash_256(&buf));
        let new_slot = spec.num_finished_sub_slots > 0;

        let (difficulty, sub_slot_iters, ses) = match &parent_record {
            None => (
                self.constants.difficulty_starting,
                self.constants.sub_slot_iters_starting,
                None,
            ),
            Some(p) => {
                let current_difficulty = if p.is_genesis() {
                    self.constants.difficulty_starting
                } else {
                    let grandparent = self.index.get(&p.prev_hash).expect("ancestor known");
                    u64::try_from(p.weight - grandparent.weight).expect("difficulty fits u64")
                };
                let sp_total = p.signage_point_total_iters(&self.constants);
                let difficulty = get_next_difficulty(
                    &self.constants,
                    &self.index,
                    &p.header_hash,
                    p.height,
                    current_difficulty,
                    p.deficit,
                    new_slot,
                    sp_total,
                )
                .expect("difficulty computable");
                let sub_slot_iters = get_next_sub_slot_iters(
                    &self.constants,
                    &self.index,
                    &p.header_hash,
                    p.height,
                    p.sub_slot_iters,
                    p.deficit,
                    new_slot,
                    sp_total,
                )
                .expect("sub slot iters computable");
                let can_finish = can_finish_sub_and_full_epoch(
                    &self.constants,
                    &self.index,
                    p.height,
                    &p.prev_hash,
                    p.deficit,
                )
                .expect("epoch check computable");
                let ses = (new_slot && can_finish.0).then(|| SubEpochSummary {
                    prev_subepoch_summary_hash: Bytes32::default(),
                    reward_chain_hash: Bytes32::default(),
                    num_blocks_overflow: 0,
                    new_difficulty: (can_finish.1 && difficulty != current_difficulty)
                        .then_some(difficulty),
                    new_sub_slot_iters: (can_finish.1 && sub_slot_iters != p.sub_slot_iters)
                        .then_some(sub_slot_iters),
                });
                (difficulty, sub_slot_iters, ses)
            }
        };

        let required_iters = calculate_iterations_quality(
            self.constants.difficulty_constant_factor,
            &quality,
            32,
            difficulty,
            &challenge,
        );
        let ip_iters = calculate_ip_iters(&self.constants, sub_slot_iters, 0, required_iters)
            .expect("required iters below sp interval");
        let slot_start: u128 = match &parent_record {
            None => 0,
            Some(p) => {
                if spec.num_finished_sub_slots == 0 {
                    p.sub_slot_start_total_iters()
                } else {
                    p.sub_slot_start_total_iters()
                        + u128::from(p.sub_slot_iters)
                        + u128::from(spec.num_finished_sub_slots - 1) * u128::from(sub_slot_iters)
                }
            }
        };
        let total_iters = slot_start + u128::from(ip_iters);
        let weight =
            parent_record.as_ref().map_or(0, |p| p.weight) + u128::from(difficulty);
        let timestamp = spec
            .timestamp
            .unwrap_or_else(|| self.prev_tx_timestamp(parent_record.as_ref()) + 100);
        let transactions = spec.transaction.then(|| TransactionsData {
            removals: spec.removals,
            additions: spec.additions,
            fees: spec.fees,
            cost: 0,
            aggregated_signature: Bytes96::default(),
            timestamp,
        });

        let block = FullBlock {
            prev_hash: parent_record
                .as_ref()
                .map_or(self.constants.genesis_challenge, |p| p.header_hash),
            height,
            weight,
            total_iters,
            signage_point_index: 0,
            num_finished_sub_slots: spec.num_finished_sub_slots,
            proof_of_space: ProofOfSpace {
                challenge,
                plot_id,
                size: 32,
                proof: ProofBytes::from(vec![spec.plot_seed; 8]),
            },
            required_iters,
            cc_sp_vdf: None,
            cc_sp_proof: None,
            cc_ip_vdf: VdfInfo {
                challenge,
                output: VdfOutput {
                    data: ProofBytes::from(vec![spec.plot_seed; 16]),
                },
                number_of_iterations: ip_iters,
            },
            cc_ip_proof: VdfProof::default(),
            pool_puzzle_hash: self.constants.genesis_pre_farm_pool_puzzle_hash,
            farmer_puzzle_hash: self.constants.genesis_pre_farm_farmer_puzzle_hash,
            sub_epoch_summary: ses,
            transactions,
        };
        //Register through the same rules the node applies, so any drift in
        //the builder surfaces here rather than as a confusing rejection
        let record = validate_header(
            &self.constants,
            &self.index,
            &block,
            Some(quality),
            true,
            timestamp,
        )
        .unwrap_or_else(|e| panic!("builder produced an invalid header: {e:?}"));
        self.index.insert(record);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_grows_a_valid_chain() {
        let constants = test_constants();
        let mut builder = ChainBuilder::new(constants.clone());
        let blocks = builder.make_chain(None, 10, 1);
        assert_eq!(blocks.len(), 10);
        for (height, block) in blocks.iter().enumerate() {
            assert_eq!(block.height as usize, height);
            let record = builder.record(&block.header_hash());
            assert_eq!(record.weight, block.weight);
        }
        //Weight strictly increases along the chain
        for pair in blocks.windows(2) {
            assert!(pair[1].weight > pair[0].weight);
            assert!(pair[1].total_iters > pair[0].total_iters);
        }
    }

    #[test]
    fn test_builder_emits_sub_epoch_summaries_at_boundaries() {
        let constants = test_constants();
        let mut builder = ChainBuilder::new(constants.clone());
        let blocks = builder.make_chain(None, 10, 1);
        let with_ses: Vec<u32> = blocks
            .iter()
            .filter(|b| b.sub_epoch_summary.is_some())
            .map(|b| b.height)
            .collect();
        assert_eq!(with_ses, vec![4, 8]);
        //The epoch boundary carries the retarget values
        let epoch_ses = blocks[8].sub_epoch_summary.as_ref().unwrap();
        assert!(epoch_ses.new_difficulty.is_some() || epoch_ses.new_sub_slot_iters.is_some());
    }
}

use crate::block_index::BlockIndex;
use crate::error_code::ErrorCode;
use crate::ledger::{Ledger, LedgerDelta};
use crate::prevalidate::{pre_validate_block, PreValidationPool, PreValidationResult};
use crate::stores::BlockStore;
use crate::traits::{ProofOfSpaceVerifier, SignatureVerifier, VdfVerifier};
use crate::validation::{validate_body, validate_header, ValidationFailure};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::io::{Error, ErrorKind};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::coin_record::CoinRecord;
use verdant_core::blockchain::full_block::FullBlock;
use verdant_core::blockchain::sized_bytes::Bytes32;
use verdant_core::consensus::block_rewards::{calculate_base_farmer_reward, calculate_pool_reward};
use verdant_core::consensus::coinbase::{create_farmer_coin, create_pool_coin};
use verdant_core::consensus::constants::ConsensusConstants;

/// Outcome of handing one block to the chain. Invalid blocks carry their
/// verdict here rather than through `Err`; `Err` is reserved for local
/// failures (store I/O, inconsistent state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReceiveBlockResult {
    /// Accepted and now the heaviest tip. `fork_height` is the last height
    /// shared with the previous peak, clamped to zero for a full
    /// replacement.
    NewPeak { fork_height: u32 },
    /// Accepted onto a fork that does not outweigh the current peak.
    AddedAsOrphan,
    InvalidBlock(ErrorCode),
    AlreadyHaveBlock,
    /// Parent unknown; the caller should fetch ancestors and retry.
    DisconnectedBlock,
}

/// Read-model snapshot for callers that poll chain status.
#[derive(Clone, Debug)]
pub struct BlockchainState {
    pub peak: Option<BlockRecord>,
    pub difficulty: u64,
    pub sub_slot_iters: u64,
    pub block_count: usize,
}

struct ChainState {
    index: BlockIndex,
    ledger: Ledger,
    peak: Option<BlockRecord>,
}

/// The consensus engine: owns the block index, the coin ledger and the peak,
/// and drives all of them through `receive_block`. A single writer mutex
/// serializes block acceptance; readers go through the inner lock and only
/// ever observe fully applied transitions.
pub struct ChainStateMachine {
    constants: Arc<ConsensusConstants>,
    store: Arc<dyn BlockStore>,
    pos_verifier: Arc<dyn ProofOfSpaceVerifier>,
    vdf_verifier: Arc<dyn VdfVerifier>,
    signature_verifier: Arc<dyn SignatureVerifier>,
    pool: PreValidationPool,
    state: RwLock<ChainState>,
    writer: Mutex<()>,
}

fn unix_now() -> Result<u64, Error> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| Error::new(ErrorKind::Other, format!("System clock before epoch: {e}")))
}

fn inconsistent(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidData, msg.into())
}

/// Coin-set effect of a transaction block: its declared spends plus the two
/// reward coins minted at its height. The farmer reward absorbs the fees.
pub fn delta_for_block(constants: &ConsensusConstants, block: &FullBlock) -> Option<LedgerDelta> {
    let transactions = block.transactions.as_ref()?;
    let pool_coin = create_pool_coin(
        block.height,
        &block.pool_puzzle_hash,
        calculate_pool_reward(block.height),
        &constants.genesis_challenge,
    );
    let farmer_coin = create_farmer_coin(
        block.height,
        &block.farmer_puzzle_hash,
        calculate_base_farmer_reward(block.height) + transactions.fees,
        &constants.genesis_challenge,
    );
    Some(LedgerDelta {
        height: block.height,
        timestamp: transactions.timestamp,
        removals: transactions.removals.clone(),
        additions: transactions.additions.clone(),
        reward_coins: vec![pool_coin, farmer_coin],
    })
}

impl ChainStateMachine {
    #[must_use]
    pub fn new(
        constants: Arc<ConsensusConstants>,
        store: Arc<dyn BlockStore>,
        pos_verifier: Arc<dyn ProofOfSpaceVerifier>,
        vdf_verifier: Arc<dyn VdfVerifier>,
        signature_verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let freeze_period = constants.coinbase_freeze_period;
        Self {
            constants,
            store,
            pos_verifier: pos_verifier.clone(),
            vdf_verifier: vdf_verifier.clone(),
            signature_verifier,
            pool: PreValidationPool::new(pos_verifier, vdf_verifier),
            state: RwLock::new(ChainState {
                index: BlockIndex::new(),
                ledger: Ledger::new(freeze_period),
                peak: None,
            }),
            writer: Mutex::new(()),
        }
    }

    /// Rebuilds the in-memory state from the block store: every stored record
    /// goes into the index, the canonical path is re-walked from the stored
    /// peak, and the ledger is replayed from the canonical transaction
    /// blocks.
    pub async fn load(
        constants: Arc<ConsensusConstants>,
        store: Arc<dyn BlockStore>,
        pos_verifier: Arc<dyn ProofOfSpaceVerifier>,
        vdf_verifier: Arc<dyn VdfVerifier>,
        signature_verifier: Arc<dyn SignatureVerifier>,
    ) -> Result<Self, Error> {
        let machine = Self::new(
            constants.clone(),
            store.clone(),
            pos_verifier,
            vdf_verifier,
            signature_verifier,
        );
        let Some(peak_hash) = store.get_peak().await? else {
            return Ok(machine);
        };
        let all_records = store.get_block_records().await?;
        let mut canonical: Vec<BlockRecord> = Vec::new();
        let mut curr = store
            .get_block_record(&peak_hash)
            .await?
            .ok_or_else(|| inconsistent(format!("Stored peak {peak_hash} has no record")))?;
        loop {
            let prev_hash = curr.prev_hash;
            let at_genesis = curr.is_genesis();
            canonical.push(curr);
            if at_genesis {
                break;
            }
            curr = store.get_block_record(&prev_hash).await?.ok_or_else(|| {
                inconsistent(format!("Canonical ancestor {prev_hash} missing from store"))
            })?;
        }
        canonical.reverse();
        let mut deltas = Vec::new();
        for record in &canonical {
            if record.is_transaction_block() {
                let block = store
                    .get_full_block(&record.header_hash)
                    .await?
                    .ok_or_else(|| {
                        inconsistent(format!("Full block {} missing from store", record.header_hash))
                    })?;
                if let Some(delta) = delta_for_block(&constants, &block) {
                    deltas.push(delta);
                }
            }
        }
        {
            let mut guard = machine.state.write();
            let state = &mut *guard;
            for record in all_records {
                state.index.insert(record);
            }
            state
                .index
                .set_canonical_path(canonical.iter().map(|r| r.header_hash).collect());
            for delta in &deltas {
                state.ledger.confirm_block(delta)?;
            }
            state.peak = canonical.last().cloned();
        }
        info!(
            "Loaded chain state: peak {} at height {}",
            peak_hash,
            canonical.len().saturating_sub(1)
        );
        Ok(machine)
    }

    pub async fn receive_block(&self, block: &FullBlock) -> Result<ReceiveBlockResult, Error> {
        let pre = pre_validate_block(self.pos_verifier.as_ref(), self.vdf_verifier.as_ref(), block);
        self.receive_pre_validated(block, &pre).await
    }

    /// Batch acceptance: proofs are checked across the verifier pool, then
    /// the blocks are applied in order.
    pub async fn receive_blocks(
        &self,
        blocks: &[FullBlock],
    ) -> Result<Vec<ReceiveBlockResult>, Error> {
        let pre_results = self.pool.pre_validate_blocks(blocks).await?;
        let mut results = Vec::with_capacity(blocks.len());
        for (block, pre) in blocks.iter().zip(pre_results.iter()) {
            results.push(self.receive_pre_validated(block, pre).await?);
        }
        Ok(results)
    }

    async fn receive_pre_validated(
        &self,
        block: &FullBlock,
        pre: &PreValidationResult,
    ) -> Result<ReceiveBlockResult, Error> {
        let header_hash = pre.header_hash;
        let _writer = self.writer.lock().await;

        let (record, peak) = {
            let state = self.state.read();
            if state.index.contains(&header_hash) {
                return Ok(ReceiveBlockResult::AlreadyHaveBlock);
            }
            if block.height > 0 && !state.index.contains(&block.prev_hash) {
                return Ok(ReceiveBlockResult::DisconnectedBlock);
            }
            let record = match validate_header(
                &self.constants,
                &state.index,
                block,
                pre.quality,
                pre.vdfs_valid,
                unix_now()?,
            ) {
                Ok(record) => record,
                Err(ValidationFailure::Rejected(code)) => {
                    debug!("Rejected block {header_hash} at height {}: {code}", block.height);
                    return Ok(ReceiveBlockResult::InvalidBlock(code));
                }
                Err(ValidationFailure::Fatal(error)) => return Err(error),
            };
            (record, state.peak.clone())
        };

        let extends_peak = match &peak {
            None => block.height == 0,
            Some(p) => block.prev_hash == p.header_hash,
        };
        if extends_peak {
            return self.advance_peak(block, record, &peak).await;
        }
        let peak = peak.ok_or_else(|| inconsistent("Side chain block without a peak"))?;

        let fork_point = {
            let state = self.state.read();
            state.index.find_fork_point(&record, &peak)
        };
        let fork_height_i = fork_point.map_or(-1, i64::from);

        if record.weight > peak.weight {
            self.reorg_to(block, record, &peak, fork_height_i).await
        } else {
            self.add_orphan(block, record, fork_height_i).await
        }
    }

    /// Fast path: the block sits directly on the current peak, so its body
    /// is checked against the committed base and its delta folded straight
    /// in.
    async fn advance_peak(
        &self,
        block: &FullBlock,
        record: BlockRecord,
        peak: &Option<BlockRecord>,
    ) -> Result<ReceiveBlockResult, Error> {
        {
            let state = self.state.read();
            if let Err(failure) = validate_body(
                &self.constants,
                &state.ledger,
                None,
                None,
                block,
                self.signature_verifier.as_ref(),
            ) {
                return match failure {
                    ValidationFailure::Rejected(code) => {
                        Ok(ReceiveBlockResult::InvalidBlock(code))
                    }
                    ValidationFailure::Fatal(error) => Err(error),
                };
            }
        }
        self.store.add_block(block.clone(), record.clone()).await?;
        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            if let Some(delta) = delta_for_block(&self.constants, block) {
                state.ledger.confirm_block(&delta)?;
            }
            state.ledger.clear_diffs();
            state.index.insert(record.clone());
            state.index.extend_canonical(record.header_hash);
            state.peak = Some(record.clone());
        }
        self.store.set_peak(record.header_hash).await?;
        info!(
            "Peak advanced to {} at height {} weight {}",
            record.header_hash, record.height, record.weight
        );
        Ok(ReceiveBlockResult::NewPeak {
            fork_height: peak.as_ref().map_or(0, |p| p.height),
        })
    }

    /// The heavy path: the block outweighs the peak from a side chain. The
    /// base is rolled back to the fork point and the new chain replayed
    /// forward; a fork point of -1 means nothing survives.
    async fn reorg_to(
        &self,
        block: &FullBlock,
        record: BlockRecord,
        peak: &BlockRecord,
        fork_height_i: i64,
    ) -> Result<ReceiveBlockResult, Error> {
        //New canonical tail, oldest first, ending in the incoming block
        let new_chain = {
            let state = self.state.read();
            let mut chain = vec![record.clone()];
            let mut curr = record.clone();
            while i64::from(curr.height) > fork_height_i + 1 {
                curr = state
                    .index
                    .get(&curr.prev_hash)
                    .cloned()
                    .ok_or_else(|| {
                        inconsistent(format!("Reorg ancestor {} missing from index", curr.prev_hash))
                    })?;
                chain.push(curr.clone());
            }
            chain.reverse();
            chain
        };
        let mut full_blocks = Vec::with_capacity(new_chain.len());
        for chain_record in &new_chain {
            if chain_record.header_hash == record.header_hash {
                full_blocks.push(block.clone());
            } else {
                full_blocks.push(
                    self.store
                        .get_full_block(&chain_record.header_hash)
                        .await?
                        .ok_or_else(|| {
                            inconsistent(format!(
                                "Reorg block {} missing from store",
                                chain_record.header_hash
                            ))
                        })?,
                );
            }
        }

        //Body-check the incoming block against the fork's view before
        //touching the base
        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let prior_deltas: Vec<LedgerDelta> = full_blocks[..full_blocks.len() - 1]
                .iter()
                .filter_map(|b| delta_for_block(&self.constants, b))
                .collect();
            state
                .ledger
                .build_diff_for_head(block.prev_hash, &prior_deltas, Some(fork_height_i))?;
            if let Err(failure) = validate_body(
                &self.constants,
                &state.ledger,
                Some(&block.prev_hash),
                Some(fork_height_i),
                block,
                self.signature_verifier.as_ref(),
            ) {
                return match failure {
                    ValidationFailure::Rejected(code) => {
                        Ok(ReceiveBlockResult::InvalidBlock(code))
                    }
                    ValidationFailure::Fatal(error) => Err(error),
                };
            }
        }
        self.store.add_block(block.clone(), record.clone()).await?;
        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            state.ledger.clear_diffs();
            state.ledger.rollback_base_to(fork_height_i);
            let mut path: Vec<Bytes32> = Vec::with_capacity(
                usize::try_from(fork_height_i + 1).unwrap_or(0) + new_chain.len(),
            );
            if fork_height_i >= 0 {
                for height in 0..=u32::try_from(fork_height_i).unwrap_or(0) {
                    path.push(state.index.height_to_hash(height).ok_or_else(|| {
                        inconsistent(format!("Canonical path has no hash at height {height}"))
                    })?);
                }
            }
            for (chain_record, full_block) in new_chain.iter().zip(full_blocks.iter()) {
                if let Some(delta) = delta_for_block(&self.constants, full_block) {
                    state.ledger.confirm_block(&delta)?;
                }
                state.index.insert(chain_record.clone());
                path.push(chain_record.header_hash);
            }
            state.index.set_canonical_path(path);
            state.peak = Some(record.clone());
        }
        self.store.set_peak(record.header_hash).await?;
        warn!(
            "Reorg: new peak {} at height {} weight {} (old peak {} weight {}), fork height {}",
            record.header_hash,
            record.height,
            record.weight,
            peak.header_hash,
            peak.weight,
            fork_height_i
        );
        Ok(ReceiveBlockResult::NewPeak {
            fork_height: u32::try_from(fork_height_i.max(0)).unwrap_or(0),
        })
    }

    /// A valid block that does not outweigh the peak: tracked in the index
    /// and layered into the ledger so a later extension can win cheaply.
    /// Equal weight lands here too; the first-seen peak is kept.
    async fn add_orphan(
        &self,
        block: &FullBlock,
        record: BlockRecord,
        fork_height_i: i64,
    ) -> Result<ReceiveBlockResult, Error> {
        //Rebuild the parent's diff layer if it has been dropped
        let rebuild_hashes: Vec<Bytes32> = {
            let state = self.state.read();
            let parent_canonical = block.height > 0
                && state.index.height_to_hash(block.height - 1) == Some(block.prev_hash);
            if block.height == 0
                || parent_canonical
                || state.ledger.has_diff_for(&block.prev_hash)
            {
                Vec::new()
            } else {
                let mut hashes = Vec::new();
                let mut curr = state
                    .index
                    .get(&block.prev_hash)
                    .cloned()
                    .ok_or_else(|| inconsistent("Orphan parent missing from index"))?;
                while i64::from(curr.height) > fork_height_i {
                    hashes.push(curr.header_hash);
                    if curr.height == 0 {
                        break;
                    }
                    curr = state.index.get(&curr.prev_hash).cloned().ok_or_else(|| {
                        inconsistent(format!("Fork ancestor {} missing from index", curr.prev_hash))
                    })?;
                }
                hashes.reverse();
                hashes
            }
        };
        let mut rebuild_deltas = Vec::new();
        for hash in &rebuild_hashes {
            let fork_block = self
                .store
                .get_full_block(hash)
                .await?
                .ok_or_else(|| inconsistent(format!("Fork block {hash} missing from store")))?;
            if let Some(delta) = delta_for_block(&self.constants, &fork_block) {
                rebuild_deltas.push(delta);
            }
        }

        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            if !rebuild_hashes.is_empty() {
                state
                    .ledger
                    .build_diff_for_head(block.prev_hash, &rebuild_deltas, Some(fork_height_i))?;
            }
            if let Err(failure) = validate_body(
                &self.constants,
                &state.ledger,
                Some(&block.prev_hash),
                Some(fork_height_i),
                block,
                self.signature_verifier.as_ref(),
            ) {
                return match failure {
                    ValidationFailure::Rejected(code) => {
                        Ok(ReceiveBlockResult::InvalidBlock(code))
                    }
                    ValidationFailure::Fatal(error) => Err(error),
                };
            }
        }
        self.store.add_block(block.clone(), record.clone()).await?;
        {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let delta = delta_for_block(&self.constants, block);
            state.ledger.extend_diff_for_head(
                &block.prev_hash,
                record.header_hash,
                delta.as_ref(),
                Some(fork_height_i),
            )?;
            state.index.insert(record.clone());
        }
        debug!(
            "Added orphan {} at height {} weight {}",
            record.header_hash, record.height, record.weight
        );
        Ok(ReceiveBlockResult::AddedAsOrphan)
    }

    #[must_use]
    pub fn get_peak(&self) -> Option<BlockRecord> {
        self.state.read().peak.clone()
    }

    #[must_use]
    pub fn block_record(&self, header_hash: &Bytes32) -> Option<BlockRecord> {
        self.state.read().index.get(header_hash).cloned()
    }

    #[must_use]
    pub fn height_to_hash(&self, height: u32) -> Option<Bytes32> {
        self.state.read().index.height_to_hash(height)
    }

    #[must_use]
    pub fn block_record_by_height(&self, height: u32) -> Option<BlockRecord> {
        let state = self.state.read();
        let hash = state.index.height_to_hash(height)?;
        state.index.get(&hash).cloned()
    }

    /// Coin lookup against the canonical view, or against a fork head's
    /// layered view when `head` names one. Fork-head queries mask the base
    /// to the fork's horizon so canonical activity above the fork point
    /// stays invisible.
    #[must_use]
    pub fn get_coin_record(
        &self,
        coin_name: &Bytes32,
        head: Option<&Bytes32>,
    ) -> Option<CoinRecord> {
        let state = self.state.read();
        let horizon = head.and_then(|h| Self::fork_horizon(&state, h));
        state.ledger.lookup_visible(coin_name, head, horizon)
    }

    #[must_use]
    pub fn get_coin_records_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        head: Option<&Bytes32>,
    ) -> Vec<CoinRecord> {
        let state = self.state.read();
        let horizon = head.and_then(|h| Self::fork_horizon(&state, h));
        state.ledger.lookup_by_puzzle_hash(puzzle_hash, head, horizon)
    }

    /// Base-visibility horizon for a fork head: the fork point with the
    /// current peak, or unrestricted when the head lies on the canonical
    /// path (or is unknown).
    fn fork_horizon(state: &ChainState, head: &Bytes32) -> Option<i64> {
        let head_record = state.index.get(head)?;
        if state.index.height_to_hash(head_record.height) == Some(*head) {
            return None;
        }
        let peak = state.peak.as_ref()?;
        Some(state.index.find_fork_point(head_record, peak).map_or(-1, i64::from))
    }

    #[must_use]
    pub fn get_state(&self) -> BlockchainState {
        let state = self.state.read();
        let difficulty = match &state.peak {
            None => self.constants.difficulty_starting,
            Some(peak) if peak.is_genesis() => self.constants.difficulty_starting,
            Some(peak) => state
                .index
                .get(&peak.prev_hash)
                .map_or(self.constants.difficulty_starting, |prev| {
                    u64::try_from(peak.weight - prev.weight).unwrap_or(u64::MAX)
                }),
        };
        BlockchainState {
            peak: state.peak.clone(),
            difficulty,
            sub_slot_iters: state
                .peak
                .as_ref()
                .map_or(self.constants.sub_slot_iters_starting, |p| p.sub_slot_iters),
            block_count: state.index.len(),
        }
    }

    #[must_use]
    pub fn constants(&self) -> &ConsensusConstants {
        &self.constants
    }
}

use crate::block_index::BlockIndex;
use crate::difficulty::{
    can_finish_sub_and_full_epoch, get_next_difficulty, get_next_sub_slot_iters,
};
use crate::error_code::ErrorCode;
use crate::ledger::Ledger;
use crate::traits::SignatureVerifier;
use std::collections::HashSet;
use std::io::{Error, ErrorKind};
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::full_block::FullBlock;
use verdant_core::blockchain::sized_bytes::Bytes32;
use verdant_core::consensus::constants::ConsensusConstants;
use verdant_core::consensus::pot_iterations::{
    calculate_ip_iters, calculate_iterations_quality, calculate_sp_iters, is_overflow_block,
};

/// How a block failed validation. `Rejected` means the block itself is bad
/// and the caller reports the code to the peer; `Fatal` means local state is
/// inconsistent and the whole operation must abort.
#[derive(Debug)]
pub enum ValidationFailure {
    Rejected(ErrorCode),
    Fatal(Error),
}

impl From<Error> for ValidationFailure {
    fn from(error: Error) -> Self {
        Self::Fatal(error)
    }
}

impl From<ErrorCode> for ValidationFailure {
    fn from(code: ErrorCode) -> Self {
        Self::Rejected(code)
    }
}

fn missing_record(header_hash: &Bytes32) -> Error {
    Error::new(
        ErrorKind::NotFound,
        format!("Block record {header_hash} missing from index during validation"),
    )
}

/// Challenge-block countdown for the candidate, derived from its parent.
/// Reaching zero is what arms sub-epoch closure.
pub fn calculate_deficit(
    constants: &ConsensusConstants,
    height: u32,
    prev_deficit: u8,
    overflow: bool,
    num_finished_sub_slots: u32,
) -> u8 {
    if height == 0 {
        return constants.min_blocks_per_challenge_block - 1;
    }
    if prev_deficit == constants.min_blocks_per_challenge_block {
        //Parent was the challenge block itself
        if overflow && num_finished_sub_slots == 0 {
            prev_deficit
        } else {
            prev_deficit - 1
        }
    } else if prev_deficit == 0 {
        match num_finished_sub_slots {
            0 => 0,
            1 if overflow => constants.min_blocks_per_challenge_block,
            _ => constants.min_blocks_per_challenge_block - 1,
        }
    } else {
        prev_deficit - 1
    }
}

/// Checks every header rule against the chain the block claims to extend and
/// returns the immutable record for it. The proof of space and VDF proofs are
/// verified by the caller beforehand; this function receives the outcome.
/// The parent must already be in the index.
pub fn validate_header(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    block: &FullBlock,
    quality: Option<Bytes32>,
    vdfs_valid: bool,
    now: u64,
) -> Result<BlockRecord, ValidationFailure> {
    if u32::from(block.signage_point_index) >= constants.num_sps_sub_slot {
        return Err(ErrorCode::InvalidSignagePoint.into());
    }
    if block.proof_of_space.size < constants.min_plot_size
        || block.proof_of_space.size > constants.max_plot_size
    {
        return Err(ErrorCode::InvalidProofOfSpace.into());
    }
    let Some(quality) = quality else {
        return Err(ErrorCode::InvalidProofOfSpace.into());
    };
    if !vdfs_valid {
        return Err(ErrorCode::InvalidVdf.into());
    }
    let overflow = is_overflow_block(constants, block.signage_point_index)?;
    let new_slot = block.num_finished_sub_slots > 0;

    let prev_record = if block.height == 0 {
        None
    } else {
        Some(
            index
                .get(&block.prev_hash)
                .ok_or_else(|| missing_record(&block.prev_hash))?,
        )
    };

    let (expected_difficulty, expected_ssi, deficit) = match prev_record {
        None => {
            if block.prev_hash != constants.genesis_challenge {
                return Err(ErrorCode::InvalidGenesis.into());
            }
            if !block.is_transaction_block() {
                return Err(ErrorCode::InvalidGenesis.into());
            }
            (
                constants.difficulty_starting,
                constants.sub_slot_iters_starting,
                calculate_deficit(constants, 0, 0, overflow, block.num_finished_sub_slots),
            )
        }
        Some(prev) => {
            if block.height != prev.height + 1 {
                return Err(ErrorCode::InvalidHeight.into());
            }
            let current_difficulty = if prev.is_genesis() {
                constants.difficulty_starting
            } else {
                let grandparent = index
                    .get(&prev.prev_hash)
                    .ok_or_else(|| missing_record(&prev.prev_hash))?;
                u64::try_from(prev.weight - grandparent.weight)
                    .map_err(|_| Error::new(ErrorKind::InvalidData, "Difficulty exceeds u64"))?
            };
            let sp_total = prev.signage_point_total_iters(constants);
            let difficulty = get_next_difficulty(
                constants,
                index,
                &prev.header_hash,
                prev.height,
                current_difficulty,
                prev.deficit,
                new_slot,
                sp_total,
            )?;
            let ssi = get_next_sub_slot_iters(
                constants,
                index,
                &prev.header_hash,
                prev.height,
                prev.sub_slot_iters,
                prev.deficit,
                new_slot,
                sp_total,
            )?;
            let deficit = calculate_deficit(
                constants,
                block.height,
                prev.deficit,
                overflow,
                block.num_finished_sub_slots,
            );
            (difficulty, ssi, deficit)
        }
    };

    let expected_required = calculate_iterations_quality(
        constants.difficulty_constant_factor,
        &quality,
        block.proof_of_space.size,
        expected_difficulty,
        &block.signage_point_hash(),
    );
    if block.required_iters != expected_required {
        return Err(ErrorCode::InvalidRequiredIters.into());
    }
    let ip_iters = calculate_ip_iters(
        constants,
        expected_ssi,
        block.signage_point_index,
        block.required_iters,
    )
    .map_err(|_| ErrorCode::InvalidRequiredIters)?;
    let sp_iters = calculate_sp_iters(constants, expected_ssi, block.signage_point_index)
        .map_err(|_| ErrorCode::InvalidSubSlotIters)?;

    //Signage point VDF is present exactly when the index is nonzero, and its
    //iteration count is fixed by the index.
    match (&block.cc_sp_vdf, block.signage_point_index) {
        (None, 0) => {}
        (Some(sp_vdf), index_nonzero) if index_nonzero > 0 => {
            if sp_vdf.number_of_iterations != sp_iters {
                return Err(ErrorCode::InvalidSignagePoint.into());
            }
        }
        _ => return Err(ErrorCode::InvalidSignagePoint.into()),
    }
    if block.cc_ip_vdf.number_of_iterations != ip_iters {
        return Err(ErrorCode::InvalidVdf.into());
    }

    let slot_start: u128 = match prev_record {
        None => 0,
        Some(prev) => {
            if block.num_finished_sub_slots == 0 {
                prev.sub_slot_start_total_iters()
            } else {
                prev.sub_slot_start_total_iters()
                    + u128::from(prev.sub_slot_iters)
                    + u128::from(block.num_finished_sub_slots - 1) * u128::from(expected_ssi)
            }
        }
    };
    let expected_total = slot_start + u128::from(ip_iters);
    if block.total_iters != expected_total {
        return Err(ErrorCode::InvalidTotalIters.into());
    }
    if let Some(prev) = prev_record {
        if block.total_iters <= prev.total_iters {
            return Err(ErrorCode::InvalidTotalIters.into());
        }
    }

    let expected_weight = prev_record.map_or(0, |prev| prev.weight) + u128::from(expected_difficulty);
    if block.weight != expected_weight {
        return Err(ErrorCode::InvalidWeight.into());
    }

    //Sub-epoch summary is forced exactly at an armed boundary crossing
    let can_finish = match prev_record {
        None => (false, false),
        Some(prev) => can_finish_sub_and_full_epoch(
            constants,
            index,
            prev.height,
            &prev.prev_hash,
            prev.deficit,
        )?,
    };
    let expects_ses = new_slot && can_finish.0;
    match (&block.sub_epoch_summary, expects_ses) {
        (None, false) => {}
        (Some(ses), true) => {
            if can_finish.1 {
                let prev = prev_record.ok_or_else(|| missing_record(&block.prev_hash))?;
                let carried = u64::try_from(
                    prev.weight
                        - index
                            .get(&prev.prev_hash)
                            .map_or(0, |gp| gp.weight),
                )
                .unwrap_or(u64::MAX);
                let expect_new_diff =
                    (expected_difficulty != carried).then_some(expected_difficulty);
                let expect_new_ssi =
                    (expected_ssi != prev.sub_slot_iters).then_some(expected_ssi);
                if ses.new_difficulty != expect_new_diff || ses.new_sub_slot_iters != expect_new_ssi
                {
                    return Err(ErrorCode::InvalidSubEpochSummary.into());
                }
            } else if ses.new_difficulty.is_some() || ses.new_sub_slot_iters.is_some() {
                return Err(ErrorCode::InvalidSubEpochSummary.into());
            }
        }
        _ => return Err(ErrorCode::InvalidSubEpochSummary.into()),
    }

    //Timestamp rules apply only to transaction blocks
    let (prev_tx_height, prev_tx_hash) = match prev_record {
        None => (0, None),
        Some(prev) if prev.is_transaction_block() => (prev.height, Some(prev.header_hash)),
        Some(prev) => (
            prev.prev_transaction_block_height,
            prev.prev_transaction_block_hash,
        ),
    };
    if let Some(transactions) = &block.transactions {
        if transactions.timestamp > now + constants.max_future_time {
            return Err(ErrorCode::TimestampTooFarInFuture.into());
        }
        let prev_tx_timestamp = match (prev_record, prev_tx_hash) {
            (None, _) => None,
            (Some(prev), _) if prev.is_transaction_block() => prev.timestamp,
            (Some(_), Some(hash)) => index
                .get(&hash)
                .ok_or_else(|| missing_record(&hash))?
                .timestamp,
            (Some(_), None) => None,
        };
        if let Some(prev_ts) = prev_tx_timestamp {
            if transactions.timestamp <= prev_ts {
                return Err(ErrorCode::TimestampTooFarInPast.into());
            }
        }
    }

    Ok(BlockRecord {
        header_hash: block.header_hash(),
        prev_hash: block.prev_hash,
        height: block.height,
        weight: block.weight,
        total_iters: block.total_iters,
        signage_point_index: block.signage_point_index,
        required_iters: block.required_iters,
        ip_iters,
        sub_slot_iters: expected_ssi,
        deficit,
        overflow,
        pool_puzzle_hash: block.pool_puzzle_hash,
        farmer_puzzle_hash: block.farmer_puzzle_hash,
        prev_transaction_block_height: prev_tx_height,
        prev_transaction_block_hash: prev_tx_hash,
        timestamp: block.transactions.as_ref().map(|t| t.timestamp),
        fees: block.transactions.as_ref().map(|t| t.fees),
        sub_epoch_summary_included: block.sub_epoch_summary.clone(),
    })
}

/// Coin-set rules for a transaction block, checked against the ledger view
/// named by `head` (the committed base when `None`), with base visibility
/// cut off at `horizon` for blocks on a fork. Non-transaction blocks pass
/// trivially.
pub fn validate_body(
    constants: &ConsensusConstants,
    ledger: &Ledger,
    head: Option<&Bytes32>,
    horizon: Option<i64>,
    block: &FullBlock,
    signature_verifier: &dyn SignatureVerifier,
) -> Result<(), ValidationFailure> {
    let Some(transactions) = &block.transactions else {
        return Ok(());
    };
    if transactions.cost > constants.max_block_cost {
        return Err(ErrorCode::BlockCostExceedsMax.into());
    }
    if !signature_verifier.is_valid(&transactions.aggregated_signature, &transactions.get_hash()) {
        return Err(ErrorCode::BadAggregateSignature.into());
    }

    let mut addition_amounts: std::collections::HashMap<Bytes32, u64> =
        std::collections::HashMap::new();
    let mut additions_total: u128 = 0;
    for coin in &transactions.additions {
        if coin.amount > constants.max_coin_amount {
            return Err(ErrorCode::CoinAmountExceedsMaximum.into());
        }
        let name = coin.name();
        if addition_amounts.insert(name, coin.amount).is_some()
            || ledger.lookup_visible(&name, head, horizon).is_some()
        {
            return Err(ErrorCode::DuplicateOutput.into());
        }
        additions_total += u128::from(coin.amount);
    }

    let mut seen_removals: HashSet<Bytes32> = HashSet::new();
    let mut removals_total: u128 = 0;
    for name in &transactions.removals {
        if !seen_removals.insert(*name) {
            return Err(ErrorCode::DoubleSpend.into());
        }
        //Ephemeral spends of this block's own additions are allowed
        if let Some(amount) = addition_amounts.get(name) {
            removals_total += u128::from(*amount);
            continue;
        }
        let record = ledger
            .lookup_visible(name, head, horizon)
            .ok_or(ErrorCode::UnknownUnspent)?;
        if record.spent {
            return Err(ErrorCode::DoubleSpend.into());
        }
        if record.coinbase
            && block.height
                < record
                    .confirmed_block_index
                    .saturating_add(constants.coinbase_freeze_period)
        {
            return Err(ErrorCode::CoinbaseNotYetSpendable.into());
        }
        removals_total += u128::from(record.coin.amount);
    }

    let spend_total = additions_total + u128::from(transactions.fees);
    if spend_total > removals_total {
        return Err(ErrorCode::MintingCoin.into());
    }
    if spend_total < removals_total {
        return Err(ErrorCode::InvalidBlockFeeAmount.into());
    }
    Ok(())
}

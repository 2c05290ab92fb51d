use crate::block_index::BlockIndex;
use std::io::{Error, ErrorKind};
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::sized_bytes::Bytes32;
use verdant_core::consensus::constants::ConsensusConstants;
use verdant_core::consensus::numeric::{count_significant_bits, truncate_to_significant_bits};

/*
Retargeting only happens at epoch boundaries, offset so the new target is
computed from blocks that are already final. Off the boundary these functions
return the carried-forward value, which is what lets the node avoid
recomputation on every block.
*/

fn unknown_ancestor(header_hash: &Bytes32) -> Error {
    Error::new(
        ErrorKind::NotFound,
        format!("Unknown ancestor {header_hash} in block index"),
    )
}

/// Whether the block after `height` may close the current sub-epoch, and
/// whether it additionally closes a full epoch. A sub-epoch can only close
/// once enough challenge blocks have appeared (`deficit == 0`), the next
/// height sits within one slot's worth of blocks of the boundary, and no
/// summary has already been included since the boundary.
pub fn can_finish_sub_and_full_epoch(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    height: u32,
    prev_hash: &Bytes32,
    deficit: u8,
) -> Result<(bool, bool), Error> {
    if height < constants.sub_epoch_blocks - 1 {
        return Ok((false, false));
    }
    if deficit > 0 {
        return Ok((false, false));
    }
    let next_height = height + 1;
    if next_height % constants.sub_epoch_blocks > constants.max_sub_slot_blocks {
        return Ok((false, false));
    }
    if next_height % constants.sub_epoch_blocks > 1 {
        //A summary may already have been included since the boundary
        let mut curr = index.get(prev_hash).ok_or_else(|| unknown_ancestor(prev_hash))?;
        while curr.height % constants.sub_epoch_blocks > 0 {
            if curr.sub_epoch_summary_included.is_some() {
                return Ok((false, false));
            }
            curr = index
                .get(&curr.prev_hash)
                .ok_or_else(|| unknown_ancestor(&curr.prev_hash))?;
        }
        if curr.sub_epoch_summary_included.is_some() {
            return Ok((false, false));
        }
    }
    Ok((true, next_height % constants.epoch_blocks < constants.max_sub_slot_blocks))
}

/// Last transaction block whose infusion sits at or before the given
/// signage-point total iterations, walking back from `start`. Genesis counts
/// as a transaction block.
fn last_transaction_block_before(
    index: &BlockIndex,
    start: &BlockRecord,
    signage_point_total_iters: u128,
) -> Result<BlockRecord, Error> {
    let mut curr = start;
    while curr.height > 0
        && (curr.total_iters > signage_point_total_iters || !curr.is_transaction_block())
    {
        curr = index
            .get(&curr.prev_hash)
            .ok_or_else(|| unknown_ancestor(&curr.prev_hash))?;
    }
    Ok(curr.clone())
}

/// Last transaction block of the epoch before the one `prev_record` closes.
fn last_transaction_block_in_prev_epoch(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    prev_record: &BlockRecord,
) -> Result<BlockRecord, Error> {
    let next_height = prev_record.height + 1;
    let next_epoch_start = next_height - (next_height % constants.epoch_blocks);
    let epoch_start = next_epoch_start.saturating_sub(constants.epoch_blocks);
    let mut curr = prev_record;
    while curr.height >= epoch_start && curr.height > 0 {
        curr = index
            .get(&curr.prev_hash)
            .ok_or_else(|| unknown_ancestor(&curr.prev_hash))?;
    }
    while curr.height > 0 && !curr.is_transaction_block() {
        curr = index
            .get(&curr.prev_hash)
            .ok_or_else(|| unknown_ancestor(&curr.prev_hash))?;
    }
    Ok(curr.clone())
}

struct EpochSpan {
    weight_delta: u128,
    iters_delta: u128,
    elapsed_seconds: u64,
}

fn epoch_span(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    prev_record: &BlockRecord,
    signage_point_total_iters: u128,
) -> Result<EpochSpan, Error> {
    let last_curr = last_transaction_block_before(index, prev_record, signage_point_total_iters)?;
    let last_prev = last_transaction_block_in_prev_epoch(constants, index, prev_record)?;
    let (Some(curr_ts), Some(prev_ts)) = (last_curr.timestamp, last_prev.timestamp) else {
        return Err(Error::new(
            ErrorKind::InvalidData,
            "Transaction block without timestamp in epoch span",
        ));
    };
    Ok(EpochSpan {
        weight_delta: last_curr.weight - last_prev.weight,
        iters_delta: last_curr.total_iters - last_prev.total_iters,
        elapsed_seconds: curr_ts.saturating_sub(prev_ts).max(1),
    })
}

/// Difficulty in force for the block following `prev_hash`. Off an epoch
/// boundary this is `current_difficulty` unchanged. A `prev_hash` that is not
/// in the index fails fast: a missing ancestor must never leak a default
/// difficulty into consensus.
#[allow(clippy::too_many_arguments)]
pub fn get_next_difficulty(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    prev_hash: &Bytes32,
    height: u32,
    current_difficulty: u64,
    deficit: u8,
    new_slot: bool,
    signage_point_total_iters: u128,
) -> Result<u64, Error> {
    let next_height = height + 1;
    if next_height < constants.epoch_blocks - constants.max_sub_slot_blocks {
        //Still in the first epoch
        return Ok(constants.difficulty_starting);
    }
    let prev_record = index.get(prev_hash).ok_or_else(|| unknown_ancestor(prev_hash))?;
    let (_, can_finish_epoch) =
        can_finish_sub_and_full_epoch(constants, index, height, &prev_record.prev_hash, deficit)?;
    if !new_slot || !can_finish_epoch {
        return Ok(current_difficulty);
    }
    let span = epoch_span(constants, index, prev_record, signage_point_total_iters)?;
    let new_difficulty_precise = span.weight_delta * u128::from(constants.sub_slot_time_target)
        / (u128::from(constants.slot_blocks_target) * u128::from(span.elapsed_seconds));
    let new_difficulty =
        truncate_to_significant_bits(new_difficulty_precise, constants.significant_bits);
    let max_diff = u128::from(current_difficulty) * u128::from(constants.difficulty_change_max_factor);
    let min_diff =
        (u128::from(current_difficulty) / u128::from(constants.difficulty_change_max_factor)).max(1);
    let clamped = if new_difficulty >= max_diff {
        truncate_to_significant_bits(max_diff, constants.significant_bits)
    } else if new_difficulty <= min_diff {
        truncate_to_significant_bits(min_diff, constants.significant_bits).max(1)
    } else {
        new_difficulty
    };
    debug_assert!(count_significant_bits(clamped) <= constants.significant_bits);
    Ok(u64::try_from(clamped).unwrap_or(u64::MAX))
}

/// Sub-slot iteration target for the block following `prev_hash`; the VDF
/// speed analogue of `get_next_difficulty`. The result is always a multiple
/// of the signage points per sub-slot.
#[allow(clippy::too_many_arguments)]
pub fn get_next_sub_slot_iters(
    constants: &ConsensusConstants,
    index: &BlockIndex,
    prev_hash: &Bytes32,
    height: u32,
    current_sub_slot_iters: u64,
    deficit: u8,
    new_slot: bool,
    signage_point_total_iters: u128,
) -> Result<u64, Error> {
    let next_height = height + 1;
    if next_height < constants.epoch_blocks - constants.max_sub_slot_blocks {
        return Ok(constants.sub_slot_iters_starting);
    }
    let prev_record = index.get(prev_hash).ok_or_else(|| unknown_ancestor(prev_hash))?;
    let (_, can_finish_epoch) =
        can_finish_sub_and_full_epoch(constants, index, height, &prev_record.prev_hash, deficit)?;
    if !new_slot || !can_finish_epoch {
        return Ok(current_sub_slot_iters);
    }
    let span = epoch_span(constants, index, prev_record, signage_point_total_iters)?;
    //Iterations per second over the last epoch, times the slot time target
    let new_ssi_precise = u128::from(constants.sub_slot_time_target) * span.iters_delta
        / u128::from(span.elapsed_seconds);
    let max_ssi = u128::from(current_sub_slot_iters)
        * u128::from(constants.difficulty_change_max_factor);
    let min_ssi = (u128::from(current_sub_slot_iters)
        / u128::from(constants.difficulty_change_max_factor))
    .max(u128::from(constants.num_sps_sub_slot));
    let clamped = new_ssi_precise.clamp(min_ssi, max_ssi);
    let mut new_ssi = truncate_to_significant_bits(clamped, constants.significant_bits);
    //Must divide evenly into signage point intervals
    new_ssi -= new_ssi % u128::from(constants.num_sps_sub_slot);
    let new_ssi = u64::try_from(new_ssi.max(u128::from(constants.num_sps_sub_slot)))
        .unwrap_or(u64::MAX - u64::MAX % u64::from(constants.num_sps_sub_slot));
    debug_assert_eq!(new_ssi % u64::from(constants.num_sps_sub_slot), 0);
    Ok(new_ssi)
}

use std::fmt;

/// Terminal validation verdicts. A block rejected with one of these codes is
/// permanently invalid and is never retried; the codes travel inside
/// `ReceiveBlockResult::InvalidBlock`, not inside `Err`. Structural outcomes
/// (already known, disconnected) are ordinary results, not codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    //Header validation
    InvalidGenesis,
    InvalidPrevBlockHash,
    InvalidHeight,
    InvalidWeight,
    InvalidTotalIters,
    InvalidRequiredIters,
    InvalidProofOfSpace,
    InvalidVdf,
    InvalidSignagePoint,
    InvalidSubSlotIters,
    InvalidSubEpochSummary,
    TimestampTooFarInPast,
    TimestampTooFarInFuture,
    //Body validation
    DoubleSpend,
    UnknownUnspent,
    CoinbaseNotYetSpendable,
    MintingCoin,
    InvalidBlockFeeAmount,
    BlockCostExceedsMax,
    BadAggregateSignature,
    CoinAmountExceedsMaximum,
    DuplicateOutput,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::InvalidGenesis => "INVALID_GENESIS",
            ErrorCode::InvalidPrevBlockHash => "INVALID_PREV_BLOCK_HASH",
            ErrorCode::InvalidHeight => "INVALID_HEIGHT",
            ErrorCode::InvalidWeight => "INVALID_WEIGHT",
            ErrorCode::InvalidTotalIters => "INVALID_TOTAL_ITERS",
            ErrorCode::InvalidRequiredIters => "INVALID_REQUIRED_ITERS",
            ErrorCode::InvalidProofOfSpace => "INVALID_PROOF_OF_SPACE",
            ErrorCode::InvalidVdf => "INVALID_VDF",
            ErrorCode::InvalidSignagePoint => "INVALID_SIGNAGE_POINT",
            ErrorCode::InvalidSubSlotIters => "INVALID_SUB_SLOT_ITERS",
            ErrorCode::InvalidSubEpochSummary => "INVALID_SUB_EPOCH_SUMMARY",
            ErrorCode::TimestampTooFarInPast => "TIMESTAMP_TOO_FAR_IN_PAST",
            ErrorCode::TimestampTooFarInFuture => "TIMESTAMP_TOO_FAR_IN_FUTURE",
            ErrorCode::DoubleSpend => "DOUBLE_SPEND",
            ErrorCode::UnknownUnspent => "UNKNOWN_UNSPENT",
            ErrorCode::CoinbaseNotYetSpendable => "COINBASE_NOT_YET_SPENDABLE",
            ErrorCode::MintingCoin => "MINTING_COIN",
            ErrorCode::InvalidBlockFeeAmount => "INVALID_BLOCK_FEE_AMOUNT",
            ErrorCode::BlockCostExceedsMax => "BLOCK_COST_EXCEEDS_MAX",
            ErrorCode::BadAggregateSignature => "BAD_AGGREGATE_SIGNATURE",
            ErrorCode::CoinAmountExceedsMaximum => "COIN_AMOUNT_EXCEEDS_MAXIMUM",
            ErrorCode::DuplicateOutput => "DUPLICATE_OUTPUT",
        };
        f.write_str(name)
    }
}

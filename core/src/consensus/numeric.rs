/// Keep only the top `num_significant_bits` of `value`, zeroing the rest.
/// Retargeted difficulty and iteration values pass through this so that every
/// node reaches the bit-identical result regardless of how the intermediate
/// division rounded.
#[must_use]
pub const fn truncate_to_significant_bits(value: u128, num_significant_bits: u64) -> u128 {
    if value == 0 {
        return 0;
    }
    let bit_length = 128 - value.leading_zeros() as u64;
    if bit_length <= num_significant_bits {
        value
    } else {
        let shift = bit_length - num_significant_bits;
        (value >> shift) << shift
    }
}

/// Number of bits between the highest and lowest set bit, inclusive. Used in
/// assertions that retargeted values respect `significant_bits`.
#[must_use]
pub const fn count_significant_bits(value: u128) -> u64 {
    if value == 0 {
        return 0;
    }
    128 - value.leading_zeros() as u64 - value.trailing_zeros() as u64
}

pub const MOTE_PER_VDT: u64 = 1_000_000_000_000;
pub const BLOCKS_PER_YEAR: u32 = 1_681_920;
const PRE_FARM_FACTOR: u64 = 10_000_000;

/*
The pool earns 7/8 of the reward in each block. If the farmer is solo farming,
they act as the pool and earn the entire block reward. Halving events will not
be hit at the exact 4-year marks due to difficulty fluctuations.
*/
pub const fn calculate_pool_reward(height: u32) -> u64 {
    if height == 0 {
        (7 * MOTE_PER_VDT / 8) * PRE_FARM_FACTOR
    } else if height < 4 * BLOCKS_PER_YEAR {
        7 * MOTE_PER_VDT / 4
    } else if height < 8 * BLOCKS_PER_YEAR {
        7 * MOTE_PER_VDT / 8
    } else if height < 12 * BLOCKS_PER_YEAR {
        7 * MOTE_PER_VDT / 16
    } else if height < 16 * BLOCKS_PER_YEAR {
        7 * MOTE_PER_VDT / 32
    } else {
        7 * MOTE_PER_VDT / 64
    }
}

/*
The base farmer reward is 1/8 of the total block reward; transaction fees are
paid on top of it.
*/
pub const fn calculate_base_farmer_reward(height: u32) -> u64 {
    if height == 0 {
        (MOTE_PER_VDT / 8) * PRE_FARM_FACTOR
    } else if height < 4 * BLOCKS_PER_YEAR {
        MOTE_PER_VDT / 4
    } else if height < 8 * BLOCKS_PER_YEAR {
        MOTE_PER_VDT / 8
    } else if height < 12 * BLOCKS_PER_YEAR {
        MOTE_PER_VDT / 16
    } else if height < 16 * BLOCKS_PER_YEAR {
        MOTE_PER_VDT / 32
    } else {
        MOTE_PER_VDT / 64
    }
}

#[test]
fn test_reward_heights() {
    //Pool Rewards
    assert_eq!(calculate_pool_reward(1), 1_750_000_000_000);
    assert_eq!(calculate_pool_reward(4 * BLOCKS_PER_YEAR), 875_000_000_000);
    assert_eq!(calculate_pool_reward(8 * BLOCKS_PER_YEAR), 437_500_000_000);
    assert_eq!(calculate_pool_reward(12 * BLOCKS_PER_YEAR), 218_750_000_000);
    assert_eq!(calculate_pool_reward(16 * BLOCKS_PER_YEAR), 109_375_000_000);
    //Farmer Rewards
    assert_eq!(calculate_base_farmer_reward(1), 250_000_000_000);
    assert_eq!(
        calculate_base_farmer_reward(4 * BLOCKS_PER_YEAR),
        125_000_000_000
    );
    assert_eq!(
        calculate_base_farmer_reward(16 * BLOCKS_PER_YEAR),
        15_625_000_000
    );
    //Added together are the full block reward at every halving boundary
    for year in [1u32, 4, 8, 12, 16, 20] {
        let height = year * BLOCKS_PER_YEAR;
        let total = calculate_pool_reward(height) + calculate_base_farmer_reward(height);
        assert_eq!(total % (MOTE_PER_VDT / 32), 0);
    }
    //Pre-farm
    assert_eq!(
        calculate_pool_reward(0) + calculate_base_farmer_reward(0),
        MOTE_PER_VDT * PRE_FARM_FACTOR
    );
}

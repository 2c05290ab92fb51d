use crate::blockchain::sized_bytes::Bytes32;
use lazy_static::lazy_static;

/// Network parameters, fixed at node startup and passed by reference into
/// every consensus computation. Never mutated afterwards.
#[derive(Clone, Debug)]
pub struct ConsensusConstants {
    pub slot_blocks_target: u32, //How many blocks to target per sub-slot
    pub min_blocks_per_challenge_block: u8, //How many blocks must be created per slot (to make a challenge block)
    //Max number of blocks that can be infused into a sub-slot.
    //Note: this must be less than sub_epoch_blocks/2, and > slot_blocks_target
    pub max_sub_slot_blocks: u32,
    pub num_sps_sub_slot: u32, //The number of signage points per sub-slot (including the 0th sp at the sub-slot start)

    pub sub_slot_iters_starting: u64, //The sub_slot_iters for the first epoch
    pub difficulty_constant_factor: u128, //Multiplied by the difficulty to get iterations
    pub difficulty_starting: u64,     //The difficulty for the first epoch
    //The maximum factor by which difficulty and sub_slot_iters can change per epoch
    pub difficulty_change_max_factor: u32,
    pub sub_epoch_blocks: u32, //The number of blocks per sub-epoch
    pub epoch_blocks: u32, //The number of blocks per epoch, must be a multiple of sub_epoch_blocks

    pub significant_bits: u64, //The number of bits to look at in difficulty and min iters. The rest are zeroed
    pub sub_slot_time_target: u64, //The target number of seconds per sub-slot
    pub num_sp_intervals_extra: u64, //The difference between signage point and infusion point (plus required_iters)
    pub max_future_time: u64, //The next block can have a timestamp of at most these many seconds in the future

    pub min_plot_size: u8,
    pub max_plot_size: u8,

    //Used as the initial challenge, as well as the genesis back pointer
    pub genesis_challenge: Bytes32,
    pub genesis_pre_farm_pool_puzzle_hash: Bytes32, //The genesis block must pay out to this pool puzzle hash
    pub genesis_pre_farm_farmer_puzzle_hash: Bytes32, //The genesis block must pay out to this farmer puzzle hash

    //Reward coins cannot be spent until this many blocks after their creation
    pub coinbase_freeze_period: u32,
    //Max coin amount, fits in 64 bits
    pub max_coin_amount: u64,
    //Max block cost in cost units
    pub max_block_cost: u64,

    //This is NOT standard, but makes some things easier
    pub bech32_prefix: String,
    pub is_testnet: bool,
}
impl Default for ConsensusConstants {
    fn default() -> Self {
        MAINNET.clone()
    }
}
lazy_static! {
    pub static ref MAINNET: ConsensusConstants = ConsensusConstants {
        slot_blocks_target: 32,
        min_blocks_per_challenge_block: 16,
        max_sub_slot_blocks: 128,
        num_sps_sub_slot: 64,
        sub_slot_iters_starting: 2u64.pow(27),
        difficulty_constant_factor: 2u128.pow(67),
        difficulty_starting: 7,
        difficulty_change_max_factor: 3,
        sub_epoch_blocks: 384,
        epoch_blocks: 4608,
        significant_bits: 8,
        sub_slot_time_target: 600,
        num_sp_intervals_extra: 3,
        max_future_time: 5 * 60,
        min_plot_size: 32,
        max_plot_size: 50,
        genesis_challenge: Bytes32::from(
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        ),
        genesis_pre_farm_pool_puzzle_hash: Bytes32::from(
            "d23da14695a188ae5708dd152263c4db883eb27edeb936178d4d988b8f3ce5fc"
        ),
        genesis_pre_farm_farmer_puzzle_hash: Bytes32::from(
            "3d8765d3a597ec1d99663f6c9816d915b9f68613ac94009884c4addaefcce6af"
        ),
        coinbase_freeze_period: 100,
        max_coin_amount: u64::MAX,
        max_block_cost: 11_000_000_000,
        bech32_prefix: String::from("vdt"),
        is_testnet: false
    };
    pub static ref TESTNET_0: ConsensusConstants = ConsensusConstants {
        difficulty_constant_factor: 2u128.pow(64),
        genesis_challenge: Bytes32::from(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        ),
        min_plot_size: 18,
        coinbase_freeze_period: 10,
        bech32_prefix: String::from("tvdt"),
        is_testnet: true,
        ..Default::default()
    };
}

use verdant_core::blockchain::coin::Coin;
use verdant_core::blockchain::sized_bytes::Bytes32;
use verdant_core::consensus::block_rewards::calculate_pool_reward;
use verdant_core::consensus::coinbase::create_pool_coin;
use verdant_node::chain::{ChainStateMachine, ReceiveBlockResult};
use verdant_node::error_code::ErrorCode;
use verdant_tests::{new_machine, test_constants, BlockSpec, ChainBuilder};

async fn assert_rejected(
    machine: &ChainStateMachine,
    block: &verdant_core::blockchain::full_block::FullBlock,
    code: ErrorCode,
) {
    let peak_before = machine.get_peak().map(|p| p.header_hash);
    assert_eq!(
        machine.receive_block(block).await.unwrap(),
        ReceiveBlockResult::InvalidBlock(code)
    );
    //A rejected block never moves the peak and never enters the index
    assert_eq!(machine.get_peak().map(|p| p.header_hash), peak_before);
    assert!(machine.block_record(&block.header_hash()).is_none());
}

#[tokio::test]
async fn test_tampered_header_fields_rejected() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants);
    let genesis = builder.make_genesis();
    machine.receive_block(&genesis).await.unwrap();
    let good = builder.make_block(Some(genesis.header_hash()), BlockSpec::default());

    let mut wrong_weight = good.clone();
    wrong_weight.weight += 1;
    assert_rejected(&machine, &wrong_weight, ErrorCode::InvalidWeight).await;

    let mut wrong_iters = good.clone();
    wrong_iters.total_iters += 1;
    assert_rejected(&machine, &wrong_iters, ErrorCode::InvalidTotalIters).await;

    let mut wrong_required = good.clone();
    wrong_required.required_iters += 4;
    assert_rejected(&machine, &wrong_required, ErrorCode::InvalidRequiredIters).await;

    let mut wrong_height = good.clone();
    wrong_height.height += 1;
    assert_rejected(&machine, &wrong_height, ErrorCode::InvalidHeight).await;

    //The untampered block is still good afterwards
    assert_eq!(
        machine.receive_block(&good).await.unwrap(),
        ReceiveBlockResult::NewPeak { fork_height: 0 }
    );
}

#[tokio::test]
async fn test_timestamp_rules() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants);
    let genesis = builder.make_genesis();
    machine.receive_block(&genesis).await.unwrap();
    let good = builder.make_block(Some(genesis.header_hash()), BlockSpec::default());

    let mut stale = good.clone();
    stale.transactions.as_mut().unwrap().timestamp = genesis.transactions.as_ref().unwrap().timestamp;
    assert_rejected(&machine, &stale, ErrorCode::TimestampTooFarInPast).await;

    let mut future = good.clone();
    future.transactions.as_mut().unwrap().timestamp = u64::MAX / 2;
    assert_rejected(&machine, &future, ErrorCode::TimestampTooFarInFuture).await;
}

#[tokio::test]
async fn test_body_spend_rules() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants.clone());
    let genesis = builder.make_genesis();
    machine.receive_block(&genesis).await.unwrap();
    let pool_coin = create_pool_coin(
        0,
        &constants.genesis_pre_farm_pool_puzzle_hash,
        calculate_pool_reward(0),
        &constants.genesis_challenge,
    );

    //Reward coin is frozen for 2 blocks; height 1 is too early
    let early_spend = builder.make_block(
        Some(genesis.header_hash()),
        BlockSpec {
            removals: vec![pool_coin.name()],
            fees: pool_coin.amount,
            ..BlockSpec::default()
        },
    );
    assert_rejected(&machine, &early_spend, ErrorCode::CoinbaseNotYetSpendable).await;

    //Spending a coin that does not exist
    let unknown = builder.make_block(
        Some(genesis.header_hash()),
        BlockSpec {
            plot_seed: 2,
            removals: vec![Bytes32::from([0xdeu8; 32])],
            ..BlockSpec::default()
        },
    );
    assert_rejected(&machine, &unknown, ErrorCode::UnknownUnspent).await;

    //Creating value out of nothing
    let minted = builder.make_block(
        Some(genesis.header_hash()),
        BlockSpec {
            plot_seed: 3,
            additions: vec![Coin {
                parent_coin_info: Bytes32::from([1u8; 32]),
                puzzle_hash: Bytes32::from([2u8; 32]),
                amount: 1000,
            }],
            ..BlockSpec::default()
        },
    );
    assert_rejected(&machine, &minted, ErrorCode::MintingCoin).await;

    //Advance past the freeze period, then double-spend in one block
    let b1 = builder.make_block(Some(genesis.header_hash()), BlockSpec::with_seed(4));
    machine.receive_block(&b1).await.unwrap();
    let double = builder.make_block(
        Some(b1.header_hash()),
        BlockSpec {
            removals: vec![pool_coin.name(), pool_coin.name()],
            fees: pool_coin.amount * 2,
            ..BlockSpec::default()
        },
    );
    assert_rejected(&machine, &double, ErrorCode::DoubleSpend).await;

    //A clean spend at the same height still works
    let clean = builder.make_block(
        Some(b1.header_hash()),
        BlockSpec {
            plot_seed: 5,
            removals: vec![pool_coin.name()],
            fees: pool_coin.amount,
            ..BlockSpec::default()
        },
    );
    assert_eq!(
        machine.receive_block(&clean).await.unwrap(),
        ReceiveBlockResult::NewPeak { fork_height: 1 }
    );
}

#[tokio::test]
async fn test_spent_coin_cannot_be_spent_again_later() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants.clone());
    let genesis = builder.make_genesis();
    machine.receive_block(&genesis).await.unwrap();
    let b1 = builder.make_block(Some(genesis.header_hash()), BlockSpec::default());
    machine.receive_block(&b1).await.unwrap();
    let pool_coin = create_pool_coin(
        0,
        &constants.genesis_pre_farm_pool_puzzle_hash,
        calculate_pool_reward(0),
        &constants.genesis_challenge,
    );
    let spend = builder.make_block(
        Some(b1.header_hash()),
        BlockSpec {
            removals: vec![pool_coin.name()],
            fees: pool_coin.amount,
            ..BlockSpec::default()
        },
    );
    machine.receive_block(&spend).await.unwrap();
    let respend = builder.make_block(
        Some(spend.header_hash()),
        BlockSpec {
            removals: vec![pool_coin.name()],
            fees: pool_coin.amount,
            ..BlockSpec::default()
        },
    );
    assert_rejected(&machine, &respend, ErrorCode::DoubleSpend).await;
}

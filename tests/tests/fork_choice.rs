use verdant_node::chain::ReceiveBlockResult;
use verdant_tests::{new_machine, test_constants, BlockSpec, ChainBuilder};

#[tokio::test]
async fn test_equal_weight_keeps_first_seen_peak() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants);
    let blocks = builder.make_chain(None, 3, 1);
    for block in &blocks {
        machine.receive_block(block).await.unwrap();
    }
    let peak_before = machine.get_peak().unwrap();
    //A sibling of the peak with identical weight must not displace it; it
    //spends the genesis pool reward so the two views diverge
    let pool_coin = verdant_core::consensus::coinbase::create_pool_coin(
        0,
        &machine.constants().genesis_pre_farm_pool_puzzle_hash,
        verdant_core::consensus::block_rewards::calculate_pool_reward(0),
        &machine.constants().genesis_challenge,
    );
    let sibling = builder.make_block(
        Some(blocks[1].header_hash()),
        BlockSpec {
            plot_seed: 2,
            removals: vec![pool_coin.name()],
            fees: pool_coin.amount,
            ..BlockSpec::default()
        },
    );
    assert_eq!(sibling.weight, peak_before.weight);
    assert_eq!(
        machine.receive_block(&sibling).await.unwrap(),
        ReceiveBlockResult::AddedAsOrphan
    );
    assert_eq!(machine.get_peak().unwrap().header_hash, peak_before.header_hash);
    //The orphan is still resolvable by hash
    assert!(machine.block_record(&sibling.header_hash()).is_some());
    //The spend is visible through the fork head's view, not the canonical one
    let sibling_hash = sibling.header_hash();
    assert!(machine
        .get_coin_record(&pool_coin.name(), Some(&sibling_hash))
        .unwrap()
        .spent);
    assert!(!machine.get_coin_record(&pool_coin.name(), None).unwrap().spent);
}

#[tokio::test]
async fn test_heavier_fork_triggers_reorg() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants);
    let canonical = builder.make_chain(None, 4, 1);
    for block in &canonical {
        machine.receive_block(block).await.unwrap();
    }
    //Fork from height 1, one block longer than the canonical chain
    let fork = builder.make_chain(Some(canonical[1].header_hash()), 3, 2);
    assert_eq!(
        machine.receive_block(&fork[0]).await.unwrap(),
        ReceiveBlockResult::AddedAsOrphan
    );
    assert_eq!(
        machine.receive_block(&fork[1]).await.unwrap(),
        ReceiveBlockResult::AddedAsOrphan
    );
    assert_eq!(
        machine.receive_block(&fork[2]).await.unwrap(),
        ReceiveBlockResult::NewPeak { fork_height: 1 }
    );
    //Shared prefix survives, fork tail is canonical now
    assert_eq!(machine.height_to_hash(0), Some(canonical[0].header_hash()));
    assert_eq!(machine.height_to_hash(1), Some(canonical[1].header_hash()));
    assert_eq!(machine.height_to_hash(2), Some(fork[0].header_hash()));
    assert_eq!(machine.height_to_hash(3), Some(fork[1].header_hash()));
    assert_eq!(machine.height_to_hash(4), Some(fork[2].header_hash()));
    assert_eq!(machine.get_peak().unwrap().height, 4);
    //The displaced blocks remain in the index as orphans
    assert!(machine.block_record(&canonical[2].header_hash()).is_some());
    assert!(machine.block_record(&canonical[3].header_hash()).is_some());
}

#[tokio::test]
async fn test_disjoint_chain_full_replacement() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants);
    let first_genesis = builder.make_genesis();
    machine.receive_block(&first_genesis).await.unwrap();
    //A competing genesis ties on weight and waits as an orphan
    let second_genesis = builder.make_block(None, BlockSpec::with_seed(2));
    assert_eq!(
        machine.receive_block(&second_genesis).await.unwrap(),
        ReceiveBlockResult::AddedAsOrphan
    );
    //Its child outweighs the whole existing chain; nothing is shared, so
    //the replacement reports fork height zero
    let child = builder.make_block(Some(second_genesis.header_hash()), BlockSpec::with_seed(2));
    assert_eq!(
        machine.receive_block(&child).await.unwrap(),
        ReceiveBlockResult::NewPeak { fork_height: 0 }
    );
    assert_eq!(machine.height_to_hash(0), Some(second_genesis.header_hash()));
    assert_eq!(machine.height_to_hash(1), Some(child.header_hash()));
    assert_eq!(machine.get_peak().unwrap().height, 1);
}

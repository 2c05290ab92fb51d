use verdant_tests::{init_logging, new_machine, test_constants, ChainBuilder};

#[tokio::test]
async fn test_epoch_retarget_applies_on_chain() {
    init_logging();
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants.clone());
    //Ten blocks with 100 second spacing against a 300 second per-slot
    //target: the chain is too fast, so difficulty and sub-slot iterations
    //rise at the height 8 epoch boundary
    let blocks = builder.make_chain(None, 10, 1);
    for block in &blocks {
        machine.receive_block(block).await.unwrap();
    }
    let state = machine.get_state();
    assert_eq!(state.peak.as_ref().unwrap().height, 9);
    assert_eq!(state.difficulty, 10);
    assert_eq!(state.sub_slot_iters, 1920);

    //Pre-boundary records carry the starting values
    for height in 0..8 {
        let record = machine.block_record_by_height(height).unwrap();
        assert_eq!(record.sub_slot_iters, 640);
        if height > 0 {
            let prev = machine.block_record_by_height(height - 1).unwrap();
            assert_eq!(record.weight - prev.weight, 7);
        }
    }
    //Post-boundary records carry the retargeted values
    for height in 8..10 {
        let record = machine.block_record_by_height(height).unwrap();
        assert_eq!(record.sub_slot_iters, 1920);
        let prev = machine.block_record_by_height(height - 1).unwrap();
        assert_eq!(record.weight - prev.weight, 10);
    }
}

#[tokio::test]
async fn test_sub_epoch_summaries_recorded() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants.clone());
    let blocks = builder.make_chain(None, 10, 1);
    for block in &blocks {
        machine.receive_block(block).await.unwrap();
    }
    for height in 0..10 {
        let record = machine.block_record_by_height(height).unwrap();
        if height == 4 || height == 8 {
            assert!(record.sub_epoch_summary_included.is_some());
        } else {
            assert!(record.sub_epoch_summary_included.is_none());
        }
    }
    //The epoch summary at height 8 announces both new values
    let epoch = machine.block_record_by_height(8).unwrap();
    let ses = epoch.sub_epoch_summary_included.unwrap();
    assert_eq!(ses.new_difficulty, Some(10));
    assert_eq!(ses.new_sub_slot_iters, Some(1920));
}

#[tokio::test]
async fn test_sub_slot_iters_always_aligned() {
    let constants = test_constants();
    let machine = new_machine(constants.clone());
    let mut builder = ChainBuilder::new(constants.clone());
    for block in builder.make_chain(None, 12, 1) {
        machine.receive_block(&block).await.unwrap();
    }
    for height in 0..12 {
        let record = machine.block_record_by_height(height).unwrap();
        assert_eq!(
            record.sub_slot_iters % u64::from(constants.num_sps_sub_slot),
            0
        );
        assert!(record.total_iters > u128::from(record.ip_iters).saturating_sub(1));
    }
}

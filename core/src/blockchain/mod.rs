pub mod block_record;
pub mod coin;
pub mod coin_record;
pub mod full_block;
pub mod proof_of_space;
pub mod sized_bytes;
pub mod sub_epoch_summary;
pub mod vdf;

pub mod block_rewards;
pub mod coinbase;
pub mod constants;
pub mod numeric;
pub mod pot_iterations;

use crate::blockchain::coin::Coin;
use crate::blockchain::sized_bytes::Bytes32;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct CoinRecord {
    pub coin: Coin,
    pub confirmed_block_index: u32,
    pub spent_block_index: u32,
    pub timestamp: u64,
    pub coinbase: bool,
    pub spent: bool,
}
impl CoinRecord {
    #[must_use]
    pub fn name(&self) -> Bytes32 {
        self.coin.name()
    }
    /// Reward coins are frozen for `freeze_period` blocks after confirmation.
    #[must_use]
    pub fn is_spendable_at(&self, height: u32, freeze_period: u32) -> bool {
        if self.spent {
            return false;
        }
        if self.coinbase {
            height >= self.confirmed_block_index.saturating_add(freeze_period)
        } else {
            true
        }
    }
}

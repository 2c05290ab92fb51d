use log::{debug, info};
use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use verdant_core::blockchain::coin::Coin;
use verdant_core::blockchain::coin_record::CoinRecord;
use verdant_core::blockchain::sized_bytes::Bytes32;

/// The coin-set effect of one transaction block, in replay-ready form.
/// Reward coins are kept separate from body additions because they carry the
/// coinbase maturity rule.
#[derive(Clone, Debug)]
pub struct LedgerDelta {
    pub height: u32,
    pub timestamp: u64,
    pub removals: Vec<Bytes32>,
    pub additions: Vec<Coin>,
    pub reward_coins: Vec<Coin>,
}

/// Spendable-coin store: a committed base holding every coin confirmed on the
/// canonical path, plus one transient diff layer per uncommitted fork head.
/// Lookups check the named head's diff layer first, then the base. Diff
/// layers are destroyed whenever the peak moves.
pub struct Ledger {
    freeze_period: u32,
    base: HashMap<Bytes32, CoinRecord>,
    diffs: HashMap<Bytes32, HashMap<Bytes32, CoinRecord>>,
}

impl Ledger {
    #[must_use]
    pub fn new(freeze_period: u32) -> Self {
        Self {
            freeze_period,
            base: HashMap::new(),
            diffs: HashMap::new(),
        }
    }

    #[must_use]
    pub fn base_len(&self) -> usize {
        self.base.len()
    }

    /// Applies one block's delta directly to the committed base. Only valid
    /// while extending the canonical path; fork blocks go through diff
    /// layers. A removal naming a coin that is neither in the base nor among
    /// the delta's own additions is a double-spend or unknown-coin condition
    /// and is surfaced, never swallowed.
    pub fn confirm_block(&mut self, delta: &LedgerDelta) -> Result<(), Error> {
        Self::apply_delta(&mut self.base, delta, self.freeze_period, false)?;
        debug!(
            "Ledger confirmed block at height {}: {} removals, {} additions, {} reward coins",
            delta.height,
            delta.removals.len(),
            delta.additions.len(),
            delta.reward_coins.len()
        );
        Ok(())
    }

    /// Builds the diff layer for `head` from scratch out of the cumulative
    /// effect of a run of not-yet-committed blocks. The base is not touched;
    /// removals of base coins are copied into the layer as spent shadows,
    /// masked against `horizon` so the layer holds the fork's view of the
    /// base rather than the canonical one.
    pub fn build_diff_for_head(
        &mut self,
        head: Bytes32,
        deltas: &[LedgerDelta],
        horizon: Option<i64>,
    ) -> Result<(), Error> {
        let mut layer = HashMap::new();
        for delta in deltas {
            self.apply_delta_to_layer(&mut layer, delta, horizon)?;
        }
        self.diffs.insert(head, layer);
        Ok(())
    }

    /// Re-keys the diff layer of `prev_head` under `head` with one more
    /// block's delta applied. Used when an orphan fork grows by one block.
    pub fn extend_diff_for_head(
        &mut self,
        prev_head: &Bytes32,
        head: Bytes32,
        delta: Option<&LedgerDelta>,
        horizon: Option<i64>,
    ) -> Result<(), Error> {
        let mut layer = self.diffs.remove(prev_head).unwrap_or_default();
        if let Some(delta) = delta {
            self.apply_delta_to_layer(&mut layer, delta, horizon)?;
        }
        self.diffs.insert(head, layer);
        Ok(())
    }

    fn apply_delta_to_layer(
        &self,
        layer: &mut HashMap<Bytes32, CoinRecord>,
        delta: &LedgerDelta,
        horizon: Option<i64>,
    ) -> Result<(), Error> {
        //Shadow base coins into the layer so removals mutate the copy. A
        //canonical spend above the horizon is the other side of a spend
        //race; the shadow enters the layer unspent.
        for name in &delta.removals {
            if !layer.contains_key(name) {
                if let Some(record) = self.lookup_visible(name, None, horizon) {
                    layer.insert(*name, record);
                }
            }
        }
        Self::apply_delta(layer, delta, self.freeze_period, true)
    }

    fn apply_delta(
        target: &mut HashMap<Bytes32, CoinRecord>,
        delta: &LedgerDelta,
        freeze_period: u32,
        is_layer: bool,
    ) -> Result<(), Error> {
        for (coins, coinbase) in [(&delta.additions, false), (&delta.reward_coins, true)] {
            for coin in coins.iter() {
                let name = coin.name();
                if target.contains_key(&name) {
                    return Err(Error::new(
                        ErrorKind::AlreadyExists,
                        format!("Duplicate coin {name} at height {}", delta.height),
                    ));
                }
                target.insert(
                    name,
                    CoinRecord {
                        coin: *coin,
                        confirmed_block_index: delta.height,
                        spent_block_index: 0,
                        timestamp: delta.timestamp,
                        coinbase,
                        spent: false,
                    },
                );
            }
        }
        for name in &delta.removals {
            let record = target.get_mut(name).ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!(
                        "Removal of unknown coin {name} at height {}{}",
                        delta.height,
                        if is_layer { " (diff layer)" } else { "" }
                    ),
                )
            })?;
            if record.spent {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("Double spend of {name} at height {}", delta.height),
                ));
            }
            if record.coinbase
                && delta.height < record.confirmed_block_index.saturating_add(freeze_period)
            {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("Reward coin {name} spent before maturity at height {}", delta.height),
                ));
            }
            record.spent = true;
            record.spent_block_index = delta.height;
        }
        Ok(())
    }

    /// Point lookup: the named fork's diff layer first, then the base.
    #[must_use]
    pub fn lookup(&self, coin_name: &Bytes32, head: Option<&Bytes32>) -> Option<CoinRecord> {
        self.lookup_visible(coin_name, head, None)
    }

    /// Lookup with a visibility horizon on the base. A fork rooted below the
    /// peak must not see canonical coins confirmed above its fork point, and
    /// canonical spends above it count as unspent. Diff-layer hits are
    /// fork-local and never masked. `None` means the whole base is visible.
    #[must_use]
    pub fn lookup_visible(
        &self,
        coin_name: &Bytes32,
        head: Option<&Bytes32>,
        horizon: Option<i64>,
    ) -> Option<CoinRecord> {
        if let Some(head) = head {
            if let Some(layer) = self.diffs.get(head) {
                if let Some(record) = layer.get(coin_name) {
                    return Some(*record);
                }
            }
        }
        let record = self.base.get(coin_name).copied()?;
        Self::mask_base_record(record, horizon)
    }

    fn mask_base_record(mut record: CoinRecord, horizon: Option<i64>) -> Option<CoinRecord> {
        if let Some(h) = horizon {
            if i64::from(record.confirmed_block_index) > h {
                return None;
            }
            if record.spent && i64::from(record.spent_block_index) > h {
                record.spent = false;
                record.spent_block_index = 0;
            }
        }
        Some(record)
    }

    #[must_use]
    pub fn lookup_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        head: Option<&Bytes32>,
        horizon: Option<i64>,
    ) -> Vec<CoinRecord> {
        let mut by_name: HashMap<Bytes32, CoinRecord> = self
            .base
            .iter()
            .filter(|(_, r)| r.coin.puzzle_hash == *puzzle_hash)
            .filter_map(|(n, r)| Self::mask_base_record(*r, horizon).map(|r| (*n, r)))
            .collect();
        if let Some(head) = head {
            if let Some(layer) = self.diffs.get(head) {
                for (name, record) in layer {
                    if record.coin.puzzle_hash == *puzzle_hash {
                        by_name.insert(*name, *record);
                    }
                }
            }
        }
        let mut records: Vec<CoinRecord> = by_name.into_values().collect();
        records.sort_by_key(|r| (r.confirmed_block_index, r.name()));
        records
    }

    /// Reorg support: removes every record confirmed above `fork_height` and
    /// un-spends every record spent above it. Staged onto a fresh map and
    /// swapped in at the end, so a failure part-way can never leave the base
    /// matching no real chain. A `fork_height` of -1 rolls back everything.
    pub fn rollback_base_to(&mut self, fork_height: i64) {
        let mut rolled: HashMap<Bytes32, CoinRecord> = HashMap::with_capacity(self.base.len());
        let mut dropped = 0usize;
        let mut unspent = 0usize;
        for (name, record) in &self.base {
            if i64::from(record.confirmed_block_index) > fork_height {
                dropped += 1;
                continue;
            }
            let mut record = *record;
            if record.spent && i64::from(record.spent_block_index) > fork_height {
                record.spent = false;
                record.spent_block_index = 0;
                unspent += 1;
            }
            rolled.insert(*name, record);
        }
        self.base = rolled;
        info!(
            "Ledger rolled back to height {fork_height}: {dropped} coins dropped, {unspent} re-marked unspent"
        );
    }

    /// Folds the winning fork's diff layer into the base and discards every
    /// other layer. After this, the new peak's effects are visible directly
    /// from the base.
    pub fn commit_diff_to_base(&mut self, head: &Bytes32) -> Result<(), Error> {
        let layer = self.diffs.remove(head).ok_or_else(|| {
            Error::new(
                ErrorKind::NotFound,
                format!("No diff layer for head {head}"),
            )
        })?;
        for (name, record) in layer {
            self.base.insert(name, record);
        }
        self.diffs.clear();
        Ok(())
    }

    pub fn clear_diffs(&mut self) {
        self.diffs.clear();
    }

    #[must_use]
    pub fn has_diff_for(&self, head: &Bytes32) -> bool {
        self.diffs.contains_key(head)
    }
}

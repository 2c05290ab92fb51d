use std::collections::HashMap;
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::sized_bytes::Bytes32;

/// In-memory map of every observed block record, keyed by header hash, plus
/// a height-to-hash projection restricted to the current canonical path. The
/// record map holds the full observed DAG; orphaned forks stay resolvable
/// until pruned by a caller.
#[derive(Default)]
pub struct BlockIndex {
    records: HashMap<Bytes32, BlockRecord>,
    canonical_path: Vec<Bytes32>,
}

impl BlockIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, header_hash: &Bytes32) -> Option<&BlockRecord> {
        self.records.get(header_hash)
    }

    #[must_use]
    pub fn contains(&self, header_hash: &Bytes32) -> bool {
        self.records.contains_key(header_hash)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a record to the observed set. Does not touch the canonical
    /// projection; that changes only through `set_canonical_path`.
    pub fn insert(&mut self, record: BlockRecord) {
        self.records.insert(record.header_hash, record);
    }

    /// Defined only for heights on the current canonical path.
    #[must_use]
    pub fn height_to_hash(&self, height: u32) -> Option<Bytes32> {
        self.canonical_path.get(height as usize).copied()
    }

    #[must_use]
    pub fn peak_height(&self) -> Option<u32> {
        if self.canonical_path.is_empty() {
            None
        } else {
            Some(self.canonical_path.len() as u32 - 1)
        }
    }

    /// Replaces the height-to-hash projection wholesale. `new_path[h]` must be
    /// the canonical hash at height `h`; callers swap the entire path so
    /// concurrent readers never observe a partially updated projection.
    pub fn set_canonical_path(&mut self, new_path: Vec<Bytes32>) {
        self.canonical_path = new_path;
    }

    /// Appends one hash to the canonical projection; the fast path when the
    /// peak simply advances.
    pub fn extend_canonical(&mut self, header_hash: Bytes32) {
        self.canonical_path.push(header_hash);
    }

    /// Walks both records back height-by-height (taller side first) until the
    /// hashes coincide. Returns the height of the common ancestor, or `None`
    /// if the two share no ancestor in this index. Callers must treat `None`
    /// as a disconnected input, never as a fork at genesis.
    #[must_use]
    pub fn find_fork_point(&self, a: &BlockRecord, b: &BlockRecord) -> Option<u32> {
        let mut a = a.clone();
        let mut b = b.clone();
        while a.height > b.height {
            a = self.get(&a.prev_hash)?.clone();
        }
        while b.height > a.height {
            b = self.get(&b.prev_hash)?.clone();
        }
        loop {
            if a.header_hash == b.header_hash {
                return Some(a.height);
            }
            if a.height == 0 {
                return None;
            }
            a = self.get(&a.prev_hash)?.clone();
            b = self.get(&b.prev_hash)?.clone();
        }
    }
}

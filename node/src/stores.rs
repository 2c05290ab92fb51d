use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Error;
use tokio::sync::RwLock;
use verdant_core::blockchain::block_record::BlockRecord;
use verdant_core::blockchain::full_block::FullBlock;
use verdant_core::blockchain::sized_bytes::Bytes32;

/// Durable block storage behind the in-memory index. Full blocks are kept
/// for every accepted block, canonical or not, so forks can be replayed
/// after a restart.
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn add_block(&self, block: FullBlock, record: BlockRecord) -> Result<(), Error>;
    async fn get_full_block(&self, header_hash: &Bytes32) -> Result<Option<FullBlock>, Error>;
    async fn get_block_record(&self, header_hash: &Bytes32) -> Result<Option<BlockRecord>, Error>;
    async fn get_block_records(&self) -> Result<Vec<BlockRecord>, Error>;
    async fn set_peak(&self, header_hash: Bytes32) -> Result<(), Error>;
    async fn get_peak(&self) -> Result<Option<Bytes32>, Error>;
}

#[derive(Default)]
struct MemoryStoreInner {
    blocks: HashMap<Bytes32, (FullBlock, BlockRecord)>,
    peak: Option<Bytes32>,
}

#[derive(Default)]
pub struct MemoryBlockStore {
    inner: RwLock<MemoryStoreInner>,
}

impl MemoryBlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn add_block(&self, block: FullBlock, record: BlockRecord) -> Result<(), Error> {
        self.inner
            .write()
            .await
            .blocks
            .insert(record.header_hash, (block, record));
        Ok(())
    }

    async fn get_full_block(&self, header_hash: &Bytes32) -> Result<Option<FullBlock>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .blocks
            .get(header_hash)
            .map(|(block, _)| block.clone()))
    }

    async fn get_block_record(&self, header_hash: &Bytes32) -> Result<Option<BlockRecord>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .blocks
            .get(header_hash)
            .map(|(_, record)| record.clone()))
    }

    async fn get_block_records(&self) -> Result<Vec<BlockRecord>, Error> {
        Ok(self
            .inner
            .read()
            .await
            .blocks
            .values()
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn set_peak(&self, header_hash: Bytes32) -> Result<(), Error> {
        self.inner.write().await.peak = Some(header_hash);
        Ok(())
    }

    async fn get_peak(&self) -> Result<Option<Bytes32>, Error> {
        Ok(self.inner.read().await.peak)
    }
}

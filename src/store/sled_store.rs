use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::traits::TransferStore;
use crate::transfer::{TransferId, TransferRecord};

const TRANSFERS_TREE: &str = "transfers";

/// Durable store on an embedded sled database.
///
/// Records are JSON under their transfer id. Every save is flushed before it
/// returns.
#[derive(Debug, Clone)]
pub struct SledTransferStore {
    tree: sled::Tree,
}

impl SledTransferStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// A database deleted when the last handle drops.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    pub fn from_db(db: sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree(TRANSFERS_TREE)?,
        })
    }
}

#[async_trait]
impl TransferStore for SledTransferStore {
    async fn load(&self, id: TransferId) -> Result<Option<TransferRecord>> {
        self.tree
            .get(id.to_string())?
            .map(|bytes| serde_json::from_slice(&bytes).map_err(Into::into))
            .transpose()
    }

    async fn save(&self, record: &TransferRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        let key = record.id().to_string();
        let tree = self.tree.clone();

        // Insert and fsync block; keep them off the async workers.
        tokio::task::spawn_blocking(move || -> Result<()> {
            tree.insert(key, bytes)?;
            tree.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| TransferError::Storage(format!("store task failed: {e}")))??;

        debug!(
            transfer_id = %record.id(),
            state = %record.state(),
            event = "transfer_record_saved"
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        self.tree
            .iter()
            .values()
            .map(|bytes| Ok(serde_json::from_slice(&bytes?)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{Timestamp, TransferRequest};
    use alloy_chains::NamedChain;
    use alloy_primitives::U256;

    fn record() -> TransferRecord {
        let request = TransferRequest::builder()
            .source_network(NamedChain::Mainnet)
            .destination_network(NamedChain::Base)
            .amount(U256::from(1_000_000u64))
            .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .build();
        let now = Timestamp::from_unix_millis(1_700_000_000_000);
        TransferRecord::new(TransferId::new(), request, now, now)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_saves_are_all_durable() {
        let store = SledTransferStore::temporary().unwrap();
        let (first, second) = (record(), record());

        let (a, b) = tokio::join!(store.save(&first), store.save(&second));
        a.unwrap();
        b.unwrap();

        assert_eq!(store.load(first.id()).await.unwrap(), Some(first));
        assert_eq!(store.load(second.id()).await.unwrap(), Some(second));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }
}

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::TransferStore;
use crate::transfer::{TransferId, TransferRecord};

/// Volatile store. Clones share the same map, so a test can hand one clone
/// to an orchestrator and build a second orchestrator over another to
/// simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransferStore {
    records: Arc<RwLock<HashMap<TransferId, TransferRecord>>>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn load(&self, id: TransferId) -> Result<Option<TransferRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn save(&self, record: &TransferRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id(), record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<TransferRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

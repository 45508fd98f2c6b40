//! [`TransferStore`](crate::traits::TransferStore) implementations.

mod memory;
mod sled_store;

pub use self::memory::InMemoryTransferStore;
pub use self::sled_store::SledTransferStore;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TransferStore;
    use crate::transfer::{Timestamp, TransferId, TransferRecord, TransferRequest};
    use alloy_chains::NamedChain;
    use alloy_primitives::U256;

    fn record() -> TransferRecord {
        let request = TransferRequest::builder()
            .source_network(NamedChain::Mainnet)
            .destination_network(NamedChain::Base)
            .amount(U256::from(5u64))
            .recipient("0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d")
            .build();
        TransferRecord::new(
            TransferId::new(),
            request,
            Timestamp::from_unix_millis(0),
            Timestamp::from_unix_millis(1),
        )
    }

    async fn exercise(store: impl TransferStore) {
        let first = record();
        let second = record();

        assert_eq!(store.load(first.id()).await.unwrap(), None);

        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        store.save(&first).await.unwrap();

        assert_eq!(store.load(first.id()).await.unwrap(), Some(first.clone()));
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        exercise(InMemoryTransferStore::new()).await;
    }

    #[tokio::test]
    async fn test_sled_store() {
        exercise(SledTransferStore::temporary().unwrap()).await;
    }

    #[tokio::test]
    async fn test_sled_store_survives_reopen() {
        let db = ::sled::Config::new().temporary(true).open().unwrap();
        let record = record();

        SledTransferStore::from_db(db.clone())
            .unwrap()
            .save(&record)
            .await
            .unwrap();

        let reopened = SledTransferStore::from_db(db).unwrap();
        assert_eq!(reopened.load(record.id()).await.unwrap(), Some(record));
    }
}

//! IngestionService - 先持久化，后广播
//!
//! 一个批次的持久化完整结束 (commit 返回成功) 之后才会进入 `publish`。
//! 不同请求的批次之间可以并发，互不排序。

use std::time::Instant;

use broadcaster::Broadcaster;
use contracts::{ClassifiedReading, ContractError, PersistedRecord, ProcessedReading, RecordStore};
use observability::record_batch_persisted;
use tracing::{debug, error, instrument};

/// 批次写入服务
pub struct IngestionService<S> {
    store: S,
    broadcaster: Broadcaster,
}

impl<S: RecordStore + Sync> IngestionService<S> {
    /// 由调用方注入存储与广播器
    pub fn new(store: S, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// 原子写入一个批次，成功后广播
    ///
    /// 返回的记录与输入同序。失败时没有任何记录被存储，也没有任何广播；
    /// 服务内部不重试 (重复提交会产生新 id 的重复行)。
    #[instrument(name = "ingest_batch", skip(self, batch), fields(batch_size = batch.len()))]
    pub async fn ingest(
        &self,
        batch: &[ProcessedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let persisted = match self.store.insert_batch(batch).await {
            Ok(persisted) => persisted,
            Err(e) => {
                record_batch_persisted(false, 0, elapsed_ms(start));
                error!(error = %e, "Batch persist failed");
                return Err(e);
            }
        };
        record_batch_persisted(true, persisted.len(), elapsed_ms(start));

        let report = self.broadcaster.publish(&persisted);
        debug!(
            records = persisted.len(),
            delivered = report.delivered,
            dropped = report.dropped_subscribers.len(),
            "Batch persisted and published"
        );

        Ok(persisted)
    }

    /// 以分类读数为输入的 `ingest` (停车数据不落库)
    pub async fn ingest_classified(
        &self,
        batch: &[ClassifiedReading],
    ) -> Result<Vec<PersistedRecord>, ContractError> {
        let readings: Vec<ProcessedReading> = batch.iter().map(ProcessedReading::from).collect();
        self.ingest(&readings).await
    }

    // ===== 管理接口 (不广播) =====

    pub async fn list(&self) -> Result<Vec<PersistedRecord>, ContractError> {
        self.store.list().await
    }

    pub async fn get(&self, id: i64) -> Result<PersistedRecord, ContractError> {
        self.store.get(id).await
    }

    pub async fn update(
        &self,
        id: i64,
        reading: &ProcessedReading,
    ) -> Result<PersistedRecord, ContractError> {
        self.store.update(id, reading).await
    }

    pub async fn delete(&self, id: i64) -> Result<PersistedRecord, ContractError> {
        self.store.delete(id).await
    }

    pub async fn count(&self) -> Result<u64, ContractError> {
        self.store.count().await
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;
    use crate::SqliteRecordStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 每次提交都失败的存储
    struct FailingStore {
        attempts: AtomicUsize,
    }

    impl RecordStore for FailingStore {
        async fn insert_batch(
            &self,
            _batch: &[ProcessedReading],
        ) -> Result<Vec<PersistedRecord>, ContractError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ContractError::persist("connection lost"))
        }

        async fn list(&self) -> Result<Vec<PersistedRecord>, ContractError> {
            Ok(Vec::new())
        }

        async fn get(&self, id: i64) -> Result<PersistedRecord, ContractError> {
            Err(ContractError::NotFound { id })
        }

        async fn update(
            &self,
            id: i64,
            _reading: &ProcessedReading,
        ) -> Result<PersistedRecord, ContractError> {
            Err(ContractError::NotFound { id })
        }

        async fn delete(&self, id: i64) -> Result<PersistedRecord, ContractError> {
            Err(ContractError::NotFound { id })
        }

        async fn count(&self) -> Result<u64, ContractError> {
            Ok(0)
        }
    }

    async fn memory_service() -> IngestionService<SqliteRecordStore> {
        IngestionService::new(
            SqliteRecordStore::in_memory().await.unwrap(),
            Broadcaster::new(16),
        )
    }

    #[tokio::test]
    async fn test_ingest_returns_ids_in_order_and_publishes() {
        let service = memory_service().await;
        let mut sub = service.broadcaster().subscribe();

        let persisted = service
            .ingest(&[reading(10.0, 0), reading(10.1, 1)])
            .await
            .unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted[0].id < persisted[1].id);

        assert_eq!(sub.recv().await, Some(persisted[0]));
        assert_eq!(sub.recv().await, Some(persisted[1]));
    }

    #[tokio::test]
    async fn test_empty_batch_touches_nothing() {
        let store = FailingStore {
            attempts: AtomicUsize::new(0),
        };
        let service = IngestionService::new(store, Broadcaster::new(4));

        assert!(service.ingest(&[]).await.unwrap().is_empty());
        assert_eq!(service.store().attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_persist_failure_publishes_nothing() {
        let service = IngestionService::new(
            FailingStore {
                attempts: AtomicUsize::new(0),
            },
            Broadcaster::new(4),
        );
        let mut sub = service.broadcaster().subscribe();

        let err = service.ingest(&[reading(10.0, 0)]).await.unwrap_err();
        assert!(matches!(err, ContractError::Persist { .. }));
        assert!(sub.try_recv().is_err());
        assert_eq!(service.broadcaster().metrics().published(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_storage_empty_and_feed_silent() {
        let service = memory_service().await;
        fail_after_two_inserts(service.store()).await;
        let mut sub = service.broadcaster().subscribe();

        let batch: Vec<_> = (0..4).map(|m| reading(10.0, m)).collect();
        assert!(service.ingest(&batch).await.is_err());

        assert_eq!(service.count().await.unwrap(), 0);
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_never_sees_uncommitted_ids() {
        let service = Arc::new(memory_service().await);
        let mut sub = service.broadcaster().subscribe();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let service = service.clone();
                tokio::spawn(async move {
                    for m in 0..5 {
                        service.ingest(&[reading(10.0 + w as f64, m)]).await.unwrap();
                    }
                })
            })
            .collect();

        let mut seen = 0;
        while seen < 20 {
            let record = sub.recv().await.unwrap();
            // 收到的记录必须已经可以从存储中读到
            assert_eq!(service.get(record.id).await.unwrap(), record);
            seen += 1;
        }
        for writer in writers {
            writer.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_admin_operations_do_not_broadcast() {
        let service = memory_service().await;
        let persisted = service.ingest(&[reading(10.0, 0)]).await.unwrap();
        let mut sub = service.broadcaster().subscribe();

        service
            .update(persisted[0].id, &reading(11.0, 1))
            .await
            .unwrap();
        service.delete(persisted[0].id).await.unwrap();

        assert!(sub.try_recv().is_err());
        assert!(service.list().await.unwrap().is_empty());
    }
}

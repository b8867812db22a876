//! 记录存储服务 - 业务能力层
//!
//! 批处理只通过 [`RecordSink`] 把终态记录交出去，具体存到哪里由实现决定。
//! 存储失败只记日志，不影响记录本身。

use crate::models::InvoiceRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// 记录存储接口
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn store(&self, record: &InvoiceRecord) -> Result<()>;
}

/// 内存存储，按到达顺序保存记录副本
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<InvoiceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存记录的快照
    pub fn snapshot(&self) -> Vec<InvoiceRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn store(&self, record: &InvoiceRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("内存存储锁已损坏"))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        tokio_test::block_on(async {
            sink.store(&InvoiceRecord::pending("a.png")).await.unwrap();
            sink.store(&InvoiceRecord::failed("b.png", "x", Local::now()))
                .await
                .unwrap();
        });

        let stored = sink.snapshot();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].source_file_name, "a.png");
        assert!(stored[1].is_error());
    }
}

//! 批量发票协调器 - 编排层
//!
//! ## 职责
//!
//! 把一批图片逐张交给 [`InvoiceFlow`]，按提交顺序累积结果。
//!
//! ## 核心规则
//!
//! 1. **逐张处理**：同一时间只有一张发票在提取中，顺序与输入一致
//! 2. **失败隔离**：单张失败只体现在它自己的记录里，批次继续
//! 3. **进度可见**：每张完成后、下一张开始前，已累积的结果对观察者可见
//! 4. **一一对应**：结果长度等于输入长度，位置不变
//!
//! 队列是显式的：[`BatchRun::step`] 每次只取一张，调用方可以在两步之间检查
//! 取消之类的信号。

use std::collections::VecDeque;

use tracing::info;

use crate::models::{BatchItem, BatchResult, InvoiceRecord};
use crate::utils::logging::{log_batch_start, log_item_complete, log_item_start, print_final_stats};
use crate::workflow::{InvoiceFlow, ItemCtx};

/// 单张发票的处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Processing,
    Success,
    Error,
}

/// 进度快照
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 已完成的记录，按输入顺序
    pub records: &'a [InvoiceRecord],
    /// 正在提取的那一张（从 0 开始）
    pub processing: Option<usize>,
}

impl BatchProgress<'_> {
    pub fn is_finished(&self) -> bool {
        self.completed == self.total
    }

    /// 第 `index` 张（从 0 开始）的状态
    pub fn state(&self, index: usize) -> Option<ItemState> {
        if index >= self.total {
            return None;
        }
        let state = match self.records.get(index) {
            Some(record) if record.is_success() => ItemState::Success,
            Some(_) => ItemState::Error,
            None if self.processing == Some(index) => ItemState::Processing,
            None => ItemState::Pending,
        };
        Some(state)
    }
}

/// 处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl ProcessingStats {
    pub fn from_result(result: &BatchResult) -> Self {
        Self {
            total: result.len(),
            success: result.success_count(),
            failed: result.error_count(),
        }
    }
}

/// 一次进行中的批处理
pub struct BatchRun<'a> {
    flow: &'a InvoiceFlow,
    total: usize,
    queue: VecDeque<(usize, BatchItem)>,
    completed: Vec<InvoiceRecord>,
    in_flight: Option<usize>,
}

impl<'a> BatchRun<'a> {
    fn new(flow: &'a InvoiceFlow, items: Vec<BatchItem>) -> Self {
        let total = items.len();
        Self {
            flow,
            total,
            queue: items.into_iter().enumerate().collect(),
            completed: Vec::with_capacity(total),
            in_flight: None,
        }
    }

    /// 处理队首的一张；队列为空时返回 false
    pub async fn step(&mut self) -> bool {
        self.step_with(|_| {}).await
    }

    /// 同 [`step`](Self::step)，提取开始前把进度交给 `on_start`
    ///
    /// 此时该张的状态是 [`ItemState::Processing`]。
    pub async fn step_with<F>(&mut self, on_start: F) -> bool
    where
        F: FnOnce(&BatchProgress<'_>),
    {
        let Some((index, item)) = self.queue.pop_front() else {
            return false;
        };

        let ctx = ItemCtx::new(index + 1, self.total, item.file_name.clone());
        log_item_start(ctx.position, ctx.total, &ctx.file_name);

        self.in_flight = Some(index);
        on_start(&self.progress());
        let record = self.flow.run(&item, &ctx).await;
        self.in_flight = None;

        log_item_complete(ctx.position, ctx.total, record.is_success(), &record.to_string());
        self.completed.push(record);
        true
    }

    /// 第 `index` 张（从 0 开始）的当前状态
    pub fn state(&self, index: usize) -> Option<ItemState> {
        self.progress().state(index)
    }

    pub fn progress(&self) -> BatchProgress<'_> {
        let succeeded = self.completed.iter().filter(|r| r.is_success()).count();
        BatchProgress {
            total: self.total,
            completed: self.completed.len(),
            succeeded,
            failed: self.completed.len() - succeeded,
            records: &self.completed,
            processing: self.in_flight,
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// 处理完剩余的所有发票，返回完整结果
    pub async fn finish(mut self) -> BatchResult {
        while self.step().await {}
        BatchResult::new(self.completed)
    }
}

/// 批量发票协调器
pub struct BatchCoordinator {
    flow: InvoiceFlow,
}

impl BatchCoordinator {
    pub fn new(flow: InvoiceFlow) -> Self {
        Self { flow }
    }

    /// 开始一次批处理，由调用方逐步驱动
    pub fn start(&self, items: Vec<BatchItem>) -> BatchRun<'_> {
        BatchRun::new(&self.flow, items)
    }

    /// 处理整批发票
    ///
    /// 每张完成后调用一次 `on_progress`。
    pub async fn run<F>(&self, items: Vec<BatchItem>, mut on_progress: F) -> BatchResult
    where
        F: FnMut(&BatchProgress<'_>),
    {
        log_batch_start(items.len());

        let mut run = self.start(items);
        while run.step().await {
            on_progress(&run.progress());
        }
        let result = run.finish().await;

        let stats = ProcessingStats::from_result(&result);
        print_final_stats(stats.success, stats.failed, stats.total);
        if stats.total > 0 && stats.success == 0 {
            info!("⚠️ 本批没有成功提取的发票");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ExtractionError;
    use crate::services::Extractor;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// 文件名以 "bad" 开头的失败，其余返回带文件名的 JSON
    struct NameExtractor {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Extractor for NameExtractor {
        async fn extract(&self, item: &BatchItem) -> Result<String, ExtractionError> {
            self.calls.lock().unwrap().push(item.file_name.clone());
            if item.file_name.starts_with("bad") {
                Err(ExtractionError::upstream("503"))
            } else {
                Ok(format!(r#"{{"emisor":"{}"}}"#, item.file_name))
            }
        }
    }

    fn coordinator() -> (BatchCoordinator, Arc<NameExtractor>) {
        let extractor = Arc::new(NameExtractor {
            calls: Mutex::new(Vec::new()),
        });
        let flow = InvoiceFlow::new(extractor.clone(), &Config::default());
        (BatchCoordinator::new(flow), extractor)
    }

    fn items(names: &[&str]) -> Vec<BatchItem> {
        names
            .iter()
            .map(|n| BatchItem::new(*n, "image/png", vec![0]))
            .collect()
    }

    #[tokio::test]
    async fn test_order_and_length_preserved() {
        let (coordinator, extractor) = coordinator();
        let names = ["a.png", "bad1.png", "c.png", "bad2.png"];
        let result = coordinator.run(items(&names), |_| {}).await;

        assert_eq!(result.len(), 4);
        let files: Vec<&str> = result
            .records()
            .iter()
            .map(|r| r.source_file_name.as_str())
            .collect();
        assert_eq!(files, names.to_vec());
        assert!(result.get(0).unwrap().is_success());
        assert!(result.get(1).unwrap().is_error());
        assert!(result.get(2).unwrap().is_success());
        assert_eq!(*extractor.calls.lock().unwrap(), names.to_vec());
    }

    #[tokio::test]
    async fn test_progress_after_each_item() {
        let (coordinator, _) = coordinator();
        let mut seen = Vec::new();
        coordinator
            .run(items(&["a.png", "bad.png", "c.png"]), |p| {
                seen.push((p.completed, p.succeeded, p.failed, p.records.len()));
            })
            .await;

        assert_eq!(seen, vec![(1, 1, 0, 1), (2, 1, 1, 2), (3, 2, 1, 3)]);
    }

    #[tokio::test]
    async fn test_step_states() {
        let (coordinator, _) = coordinator();
        let mut run = coordinator.start(items(&["a.png", "bad.png"]));

        assert_eq!(run.state(0), Some(ItemState::Pending));
        assert!(run.step().await);
        assert_eq!(run.state(0), Some(ItemState::Success));
        assert_eq!(run.state(1), Some(ItemState::Pending));
        assert_eq!(run.remaining(), 1);

        assert!(run.step().await);
        assert_eq!(run.state(1), Some(ItemState::Error));
        assert!(run.progress().is_finished());
        assert!(!run.step().await);
        assert_eq!(run.state(2), None);

        assert_eq!(run.finish().await.len(), 2);
    }

    #[tokio::test]
    async fn test_processing_state_visible_at_start() {
        let (coordinator, _) = coordinator();
        let mut run = coordinator.start(items(&["a.png", "bad.png"]));

        let mut seen = None;
        assert!(run
            .step_with(|p| seen = Some((p.state(0), p.state(1), p.completed)))
            .await);
        assert_eq!(
            seen,
            Some((Some(ItemState::Processing), Some(ItemState::Pending), 0))
        );

        assert!(run
            .step_with(|p| seen = Some((p.state(0), p.state(1), p.completed)))
            .await);
        assert_eq!(
            seen,
            Some((Some(ItemState::Success), Some(ItemState::Processing), 1))
        );
        assert_eq!(run.progress().processing, None);
        assert_eq!(run.state(1), Some(ItemState::Error));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (coordinator, _) = coordinator();
        let result = coordinator.run(Vec::new(), |_| panic!("no progress expected")).await;
        assert!(result.is_empty());
    }

    #[test]
    fn test_stats() {
        let (coordinator, _) = coordinator();
        let result = tokio_test::block_on(coordinator.start(items(&["a.png", "bad.png"])).finish());
        assert_eq!(
            ProcessingStats::from_result(&result),
            ProcessingStats {
                total: 2,
                success: 1,
                failed: 1
            }
        );
    }
}

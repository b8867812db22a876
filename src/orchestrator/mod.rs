//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度和统计，不做具体业务判断。
//!
//! ## 层次关系
//!
//! ```text
//! batch_coordinator (处理 Vec<BatchItem>)
//!     ↓
//! workflow::InvoiceFlow (处理单张发票)
//!     ↓
//! services (能力层：extraction / normalizer / aggregation / record_sink)
//! ```
//!
//! 导出（export）不在这条链上：它只读取已经完成的 `BatchResult`。

pub mod batch_coordinator;

pub use batch_coordinator::{BatchCoordinator, BatchProgress, BatchRun, ItemState, ProcessingStats};

//! # Invoice Batch Report
//!
//! 把拍照/扫描的发票批量整理成结构化记录，并生成格式化的 xlsx 报表
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 数据模型（Models）
//! - `models/` - `InvoiceRecord`、`BatchItem`、`BatchResult` 以及提取结果的原始结构
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单张发票
//! - `Extractor` - 调用视觉模型提取发票内容
//! - `normalizer` - 把不可信的提取结果规范化为记录
//! - `AggregationEngine` - 明细小计、发票合计、批次总计
//! - `RecordSink` - 记录存储
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张发票"的完整处理流程
//! - `ItemCtx` - 上下文封装（位置 + 文件名）
//! - `InvoiceFlow` - 流程编排（extract → normalize → 核对 → 存储）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_coordinator` - 逐张处理、累积结果、汇报进度
//!
//! ### ⑤ 报表（Layout / Export）
//! - `layout/` - 记录 → 内存工作表（单元格、样式 id、合并区域）
//! - `export/` - 单张 / 分开 / 合并三种产物，序列化为 xlsx
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod export;
pub mod layout;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult, ConfigError, ExportError, ExtractionError};
pub use export::{Artifact, ExportComposer, SeparateExport};
pub use layout::{build_invoice_sheet, build_summary_sheet, LayoutConfig, Sheet};
pub use models::{BatchItem, BatchResult, InvoiceRecord, LineItem, RecordStatus};
pub use orchestrator::{BatchCoordinator, BatchProgress, ProcessingStats};
pub use services::{AggregationEngine, Extractor, OpenAiExtractor, RecordSink};
pub use workflow::{InvoiceFlow, ItemCtx};

//! 发票处理流程 - 流程层
//!
//! 核心职责：定义"一张发票"的完整处理流程
//!
//! 流程顺序：
//! 1. 调用提取服务拿到原始文本
//! 2. normalizer 规范化为 InvoiceRecord
//! 3. 核对声明合计与计算合计（只记日志）
//! 4. 交给记录存储（可选，失败只记日志）
//!
//! 任何一步失败都编码在返回的记录里，`run` 本身不返回错误。

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{BatchItem, InvoiceRecord};
use crate::services::aggregation::{format_money, AggregationEngine};
use crate::services::normalizer;
use crate::services::{Extractor, RecordSink};
use crate::utils::logging::truncate_text;
use crate::workflow::item_ctx::ItemCtx;

/// 声明合计与计算合计允许的误差
pub const TOTAL_TOLERANCE: f64 = 0.005;

/// 发票处理流程
///
/// - 编排单张发票的处理流程
/// - 只依赖业务能力（services），不关心批次
pub struct InvoiceFlow {
    extractor: Arc<dyn Extractor>,
    sink: Option<Arc<dyn RecordSink>>,
    aggregation: AggregationEngine,
    verbose_logging: bool,
}

impl InvoiceFlow {
    /// 创建新的发票处理流程
    pub fn new(extractor: Arc<dyn Extractor>, config: &Config) -> Self {
        Self {
            extractor,
            sink: None,
            aggregation: AggregationEngine::from_config(config),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 设置记录存储
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub async fn run(&self, item: &BatchItem, ctx: &ItemCtx) -> InvoiceRecord {
        debug!("{} 🔍 调用提取服务...", ctx);

        let record = match self.extractor.extract(item).await {
            Ok(raw) => {
                if self.verbose_logging {
                    debug!("{} 提取结果: {}", ctx, truncate_text(&raw, 200));
                }
                normalizer::normalize(&raw, &item.file_name)
            }
            Err(e) => {
                warn!("{} ❌ 提取失败: {}", ctx, e);
                InvoiceRecord::failed(&item.file_name, e.to_string(), Local::now())
            }
        };

        if record.is_success() {
            self.check_totals(&record, ctx);
        }

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.store(&record).await {
                warn!("{} ⚠️ 记录存储失败（已忽略）: {}", ctx, e);
            }
        }

        record
    }

    /// 声明合计与计算合计不一致时记录警告，不修改记录
    fn check_totals(&self, record: &InvoiceRecord, ctx: &ItemCtx) {
        let totals = self.aggregation.invoice_totals(record);
        match totals.discrepancy() {
            Some(diff) if diff.abs() > TOTAL_TOLERANCE => {
                warn!(
                    "{} ⚠️ 合计不一致: 声明 {}，计算 {}（差额 {}）",
                    ctx,
                    totals.declared_total.map(format_money).unwrap_or_default(),
                    totals.computed_total.map(format_money).unwrap_or_default(),
                    format_money(diff)
                );
            }
            Some(_) => debug!("{} ✓ 合计核对一致", ctx),
            None => info!("{} 合计无法核对（缺少声明值或计算值）", ctx),
        }
    }
}

//! 金额汇总服务 - 业务能力层
//!
//! 负责明细行小计、单张发票合计和批次总计。
//! 内部计算保持完整精度，只有写单元格或格式化文本时才保留两位小数。

use crate::config::Config;
use crate::models::{InvoiceRecord, LineItem};

/// 明细行小计：数量 × 单价 − 折扣
///
/// 不截断到 0：折扣大于行金额时结果为负。
pub fn line_subtotal(item: &LineItem) -> f64 {
    item.quantity * item.unit_price - item.discount
}

/// 四舍五入到分
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 金额显示文本，如 `$1234.50`
pub fn format_money(value: f64) -> String {
    format!("${:.2}", round_to_cents(value))
}

/// 单张发票的合计
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    /// 明细合计；没有明细时取记录里的 subtotal
    pub subtotal: Option<f64>,
    /// 记录里的 IVA；没有时按默认税率从 subtotal 推算
    pub tax: Option<f64>,
    /// IVA 是否由税率推算得到
    pub tax_derived: bool,
    /// subtotal + tax
    pub computed_total: Option<f64>,
    /// 记录里声明的 total，原样保留
    pub declared_total: Option<f64>,
}

impl InvoiceTotals {
    /// 展示用合计：优先使用声明值
    pub fn display_total(&self) -> Option<f64> {
        self.declared_total.or(self.computed_total)
    }

    /// 声明值与计算值之差（两者都存在时）
    pub fn discrepancy(&self) -> Option<f64> {
        match (self.declared_total, self.computed_total) {
            (Some(declared), Some(computed)) => Some(declared - computed),
            _ => None,
        }
    }
}

/// 批次总计（只统计成功的记录）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchTotals {
    pub invoice_count: usize,
    pub subtotal: f64,
    pub tax: f64,
    /// 始终等于 subtotal + tax
    pub total: f64,
    /// 各发票声明的 total 之和（未声明的按 0）
    pub declared_total: f64,
}

/// 金额汇总服务
///
/// 持有唯一的默认税率，单张报表和批次汇总都经由这里计算。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationEngine {
    tax_rate: f64,
}

impl AggregationEngine {
    pub fn new(tax_rate: f64) -> Self {
        Self { tax_rate }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_tax_rate)
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate
    }

    /// 计算单张发票的合计
    pub fn invoice_totals(&self, record: &InvoiceRecord) -> InvoiceTotals {
        let subtotal = if record.line_items.is_empty() {
            record.subtotal
        } else {
            Some(record.line_items.iter().map(line_subtotal).sum())
        };

        let (tax, tax_derived) = match record.tax {
            Some(tax) => (Some(tax), false),
            None => (subtotal.map(|s| s * self.tax_rate), subtotal.is_some()),
        };

        let computed_total = match (subtotal, tax) {
            (Some(s), Some(t)) => Some(s + t),
            _ => None,
        };

        InvoiceTotals {
            subtotal,
            tax,
            tax_derived,
            computed_total,
            declared_total: record.total,
        }
    }

    /// 计算批次总计
    ///
    /// 未指定的金额按 0 计入；`total` 由 subtotal 与 tax 的总和得出，
    /// 声明的合计单独累加到 `declared_total`。
    pub fn batch_totals<'a, I>(&self, records: I) -> BatchTotals
    where
        I: IntoIterator<Item = &'a InvoiceRecord>,
    {
        let mut acc = records
            .into_iter()
            .filter(|r| r.is_success())
            .fold(BatchTotals::default(), |mut acc, record| {
                let totals = self.invoice_totals(record);
                acc.invoice_count += 1;
                acc.subtotal += totals.subtotal.unwrap_or(0.0);
                acc.tax += totals.tax.unwrap_or(0.0);
                acc.declared_total += totals.declared_total.unwrap_or(0.0);
                acc
            });
        acc.total = acc.subtotal + acc.tax;
        acc
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TAX_RATE)
    }
}

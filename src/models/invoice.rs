use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 缺失字符串字段的统一占位文本
pub const UNSPECIFIED: &str = "No especificado";

/// 发票明细行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub code: String,
    pub description: String,
    /// 数量（>= 0）
    pub quantity: f64,
    /// 单价（>= 0）
    pub unit_price: f64,
    /// 折扣金额（>= 0）
    pub discount: f64,
}

/// 记录状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Success,
    Error,
}

impl RecordStatus {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        !matches!(self, RecordStatus::Pending)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Success => "success",
            RecordStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// 规范化后的发票记录
///
/// 每次提取尝试生成一条新记录；状态离开 `Pending` 后不再修改。
/// 金额字段为 `None` 表示"未指定"，在报表中显示为 [`UNSPECIFIED`]。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub source_file_name: String,

    // --- 发票基本信息 ---
    pub issuer: String,
    pub issue_date: String,
    pub invoice_number: String,
    pub concept: String,
    pub currency: String,

    // --- 开票方 ---
    pub issuer_tax_id: String,
    pub issuer_address: String,
    pub issuer_phone: String,
    pub tax_condition: String,

    // --- 客户 ---
    pub client_name: String,
    pub client_tax_id: String,
    pub client_address: String,

    // --- 付款信息 ---
    pub payment_terms: String,
    pub due_date: String,
    pub notes: String,

    pub line_items: Vec<LineItem>,

    pub subtotal: Option<f64>,
    pub tax: Option<f64>,
    pub other_taxes: Option<f64>,
    pub total: Option<f64>,

    pub status: RecordStatus,
    /// 仅当 `status == Error` 时存在
    pub error_message: Option<String>,

    /// 规范化时间，比较两条记录时应排除此字段
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Local>>,
}

impl InvoiceRecord {
    /// 创建一条处理中的占位记录，所有字段均为未指定
    pub fn pending(source_file_name: impl Into<String>) -> Self {
        let unspecified = || UNSPECIFIED.to_string();
        Self {
            source_file_name: source_file_name.into(),
            issuer: unspecified(),
            issue_date: unspecified(),
            invoice_number: unspecified(),
            concept: unspecified(),
            currency: unspecified(),
            issuer_tax_id: unspecified(),
            issuer_address: unspecified(),
            issuer_phone: unspecified(),
            tax_condition: unspecified(),
            client_name: unspecified(),
            client_tax_id: unspecified(),
            client_address: unspecified(),
            payment_terms: unspecified(),
            due_date: unspecified(),
            notes: unspecified(),
            line_items: Vec::new(),
            subtotal: None,
            tax: None,
            other_taxes: None,
            total: None,
            status: RecordStatus::Pending,
            error_message: None,
            processed_at: None,
        }
    }

    /// 创建一条失败记录
    pub fn failed(
        source_file_name: impl Into<String>,
        error_message: impl Into<String>,
        processed_at: DateTime<Local>,
    ) -> Self {
        Self {
            status: RecordStatus::Error,
            error_message: Some(error_message.into()),
            processed_at: Some(processed_at),
            ..Self::pending(source_file_name)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RecordStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == RecordStatus::Error
    }

    /// 去掉时间戳后的副本，用于幂等性比较
    pub fn without_timestamp(&self) -> Self {
        Self {
            processed_at: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for InvoiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            RecordStatus::Error => write!(
                f,
                "{} [错误: {}]",
                self.source_file_name,
                self.error_message.as_deref().unwrap_or("unknown")
            ),
            _ => write!(
                f,
                "{} [{} | {} | {} 行明细]",
                self.source_file_name,
                self.issuer,
                self.invoice_number,
                self.line_items.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_carries_message() {
        let record = InvoiceRecord::failed("a.png", "Malformed payload", Local::now());
        assert!(record.is_error());
        assert_eq!(record.error_message.as_deref(), Some("Malformed payload"));
        assert_eq!(record.issuer, UNSPECIFIED);
        assert!(record.status.is_terminal());
    }

    #[test]
    fn test_pending_has_no_error_message() {
        let record = InvoiceRecord::pending("a.png");
        assert_eq!(record.status, RecordStatus::Pending);
        assert!(record.error_message.is_none());
        assert!(!record.status.is_terminal());
    }

    #[test]
    fn test_display_error_record() {
        let record = InvoiceRecord::failed("b.jpg", "Upstream unavailable: timeout", Local::now());
        assert_eq!(record.to_string(), "b.jpg [错误: Upstream unavailable: timeout]");
    }
}

use crate::models::invoice::{InvoiceRecord, RecordStatus};
use std::path::Path;

/// 待提取的一张发票图片
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// 原始文件名
    pub file_name: String,
    /// MIME 类型，如 `image/png`
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl BatchItem {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// 从磁盘读取图片，按扩展名推断 MIME 类型
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let mime_type = mime_from_extension(path).to_string();
        Ok(Self {
            file_name,
            mime_type,
            bytes,
        })
    }
}

fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// 批处理结果
///
/// 与输入一一对应：长度等于输入数量，顺序与提交顺序一致。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    records: Vec<InvoiceRecord>,
}

impl BatchResult {
    pub fn new(records: Vec<InvoiceRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[InvoiceRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&InvoiceRecord> {
        self.records.get(index)
    }

    /// 成功的记录及其在批次中的位置（从 1 开始）
    pub fn successes(&self) -> impl Iterator<Item = (usize, &InvoiceRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_success())
            .map(|(i, r)| (i + 1, r))
    }

    pub fn success_count(&self) -> usize {
        self.count(RecordStatus::Success)
    }

    pub fn error_count(&self) -> usize {
        self.count(RecordStatus::Error)
    }

    fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    pub fn into_records(self) -> Vec<InvoiceRecord> {
        self.records
    }
}

//! 导出组装
//!
//! 三种产物形态：
//! - 单张：一个工作簿，一张 `FACTURA_DETALLADA`
//! - 分开：每条成功记录一个工作簿，互不影响
//! - 合并：`RESUMEN_GENERAL` + 每条成功记录一张 `FACTURA_{位置}`
//!
//! 所有形态都先在内存中生成完整的工作表，再序列化。

use crate::config::Config;
use crate::error::{AppResult, ExportError};
use crate::export::artifact::{sanitize_file_stem, Artifact};
use crate::export::xlsx::{serialize_workbook, NamedSheet};
use crate::layout::{build_invoice_sheet, build_summary_sheet, LayoutConfig};
use crate::models::{BatchResult, InvoiceRecord, RecordStatus, UNSPECIFIED};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SINGLE_SHEET_NAME: &str = "FACTURA_DETALLADA";
pub const SUMMARY_SHEET_NAME: &str = "RESUMEN_GENERAL";

/// 合并导出中第 `position` 条记录的工作表名
pub fn detail_sheet_name(position: usize) -> String {
    format!("FACTURA_{}", position)
}

/// 分开导出中失败的一项
#[derive(Debug)]
pub struct ExportFailure {
    /// 记录在批次中的位置（从 1 开始）
    pub position: usize,
    pub file_name: String,
    pub error: ExportError,
}

/// 分开导出的结果：成功的产物和失败项并列返回
#[derive(Debug, Default)]
pub struct SeparateExport {
    pub artifacts: Vec<Artifact>,
    pub failures: Vec<ExportFailure>,
}

/// 导出组装器
#[derive(Debug, Clone)]
pub struct ExportComposer {
    layout: LayoutConfig,
    author: String,
}

impl ExportComposer {
    pub fn new(config: &Config) -> Self {
        Self::with_layout(LayoutConfig::from_config(config), config.workbook_author.clone())
    }

    pub fn with_layout(layout: LayoutConfig, author: impl Into<String>) -> Self {
        Self {
            layout,
            author: author.into(),
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// 单张导出的工作表结构
    pub fn compose_single(&self, record: &InvoiceRecord) -> Result<Vec<NamedSheet>, ExportError> {
        ensure_exportable(record)?;
        Ok(vec![NamedSheet::new(
            SINGLE_SHEET_NAME,
            build_invoice_sheet(record, &self.layout),
        )])
    }

    /// 合并导出的工作表结构
    pub fn compose_combined(&self, batch: &BatchResult) -> Result<Vec<NamedSheet>, ExportError> {
        if batch.success_count() == 0 {
            return Err(ExportError::NoSuccessfulRecords);
        }

        let mut sheets = vec![NamedSheet::new(
            SUMMARY_SHEET_NAME,
            build_summary_sheet(batch, &self.layout),
        )];
        sheets.extend(batch.successes().map(|(position, record)| {
            NamedSheet::new(
                detail_sheet_name(position),
                build_invoice_sheet(record, &self.layout),
            )
        }));
        Ok(sheets)
    }

    /// 导出单张发票
    pub fn export_single(&self, record: &InvoiceRecord) -> Result<Artifact, ExportError> {
        let sheets = self.compose_single(record)?;
        let file_name = format!("factura_detallada_{}.xlsx", self.file_stem(record));
        let artifact = self.serialize(file_name, &sheets)?;
        info!("📄 单张导出完成: {}", artifact.file_name);
        Ok(artifact)
    }

    /// 每条成功记录各导出一个工作簿
    ///
    /// 某一项失败不影响其他项；失败项收集在 `failures` 中。
    pub fn export_batch_separate(&self, batch: &BatchResult) -> SeparateExport {
        let mut result = SeparateExport::default();

        for (position, record) in batch.successes() {
            let file_name = format!(
                "factura_detallada_{}_{}.xlsx",
                self.file_stem(record),
                position
            );
            match self
                .compose_single(record)
                .and_then(|sheets| self.serialize(file_name, &sheets))
            {
                Ok(artifact) => result.artifacts.push(artifact),
                Err(error) => {
                    warn!(
                        "⚠️ 第 {} 张发票导出失败 ({}): {}",
                        position, record.source_file_name, error
                    );
                    result.failures.push(ExportFailure {
                        position,
                        file_name: record.source_file_name.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            "📦 分开导出完成: {} 个文件, {} 个失败",
            result.artifacts.len(),
            result.failures.len()
        );
        result
    }

    /// 导出汇总 + 明细的合并工作簿
    pub fn export_batch_combined(&self, batch: &BatchResult) -> Result<Artifact, ExportError> {
        let sheets = self.compose_combined(batch)?;
        let file_name = format!(
            "facturas_completas_{}.xlsx",
            self.layout.generated_at.format("%Y-%m-%d")
        );
        let artifact = self.serialize(file_name, &sheets)?;
        info!(
            "📚 合并导出完成: {} ({} 张表)",
            artifact.file_name,
            artifact.sheet_names.len()
        );
        Ok(artifact)
    }

    /// 合并导出并写入目录，返回文件路径
    pub async fn save_batch_combined(&self, batch: &BatchResult, dir: &Path) -> AppResult<PathBuf> {
        let artifact = self.export_batch_combined(batch)?;
        Ok(artifact.write_to_dir(dir).await?)
    }

    fn serialize(&self, file_name: String, sheets: &[NamedSheet]) -> Result<Artifact, ExportError> {
        let bytes = serialize_workbook(sheets, &self.author, &self.layout.generated_at)?;
        debug!("{}: {} 字节", file_name, bytes.len());
        Ok(Artifact {
            file_name,
            sheet_names: sheets.iter().map(|s| s.name.clone()).collect(),
            bytes,
        })
    }

    /// 文件名主体：发票号 → 开票日期 → 时间戳
    fn file_stem(&self, record: &InvoiceRecord) -> String {
        [&record.invoice_number, &record.issue_date]
            .into_iter()
            .filter(|s| s.as_str() != UNSPECIFIED)
            .map(|s| sanitize_file_stem(s))
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| {
                record
                    .processed_at
                    .unwrap_or(self.layout.generated_at)
                    .timestamp_millis()
                    .to_string()
            })
    }
}

fn ensure_exportable(record: &InvoiceRecord) -> Result<(), ExportError> {
    if record.status == RecordStatus::Success {
        Ok(())
    } else {
        Err(ExportError::RecordNotExportable {
            file_name: record.source_file_name.clone(),
            status: record.status.to_string(),
        })
    }
}

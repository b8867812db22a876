//! 批次汇总表
//!
//! 只列出成功的记录，N° 列是记录在批次中的位置（从 1 开始）。

use crate::layout::invoice_sheet::money_or_unspecified;
use crate::layout::palette::StyleId;
use crate::layout::sheet::{CellValue, Sheet};
use crate::layout::{LayoutConfig, RowCursor, HEADER_ROW_HEIGHT};
use crate::models::BatchResult;
use crate::services::aggregation::AggregationEngine;

pub const SUMMARY_TITLE: &str = "RESUMEN GENERAL DE FACTURAS";
pub const TOTALS_LABEL: &str = "TOTALES GENERALES";
pub const PROCESSED_STATUS: &str = "✅ PROCESADA";

pub const SUMMARY_COLUMNS: [&str; 9] = [
    "N°",
    "Archivo",
    "Emisor",
    "N° Factura",
    "Fecha",
    "Subtotal",
    "IVA",
    "Total",
    "Estado",
];

const SUMMARY_WIDTHS: [f64; 9] = [6.0, 25.0, 25.0, 15.0, 12.0, 12.0, 12.0, 12.0, 15.0];

/// 生成批次汇总表
pub fn build_summary_sheet(batch: &BatchResult, config: &LayoutConfig) -> Sheet {
    let engine = AggregationEngine::new(config.tax_rate);
    let mut sheet = Sheet::new();
    let mut cursor = RowCursor::new(config.block_gap);

    let last_col = (SUMMARY_COLUMNS.len() - 1) as u16;
    let title_row = cursor.block(1);
    sheet.set_merged(title_row, 0, last_col, SUMMARY_TITLE, StyleId::Title);
    sheet.set_row_height(title_row, HEADER_ROW_HEIGHT);

    let data_rows = u32::try_from(batch.success_count()).unwrap_or(u32::MAX);
    let header_row = cursor.block(data_rows.saturating_add(1));
    for (col, label) in SUMMARY_COLUMNS.iter().enumerate() {
        sheet.set(header_row, col as u16, *label, StyleId::Header);
    }
    sheet.set_row_height(header_row, HEADER_ROW_HEIGHT);

    for (offset, (position, record)) in batch.successes().enumerate() {
        let row = header_row + 1 + offset as u32;
        let totals = engine.invoice_totals(record);

        sheet.set(row, 0, CellValue::Number(position as f64), StyleId::Value);
        sheet.set(row, 1, record.source_file_name.as_str(), StyleId::Value);
        sheet.set(row, 2, record.issuer.as_str(), StyleId::Value);
        sheet.set(row, 3, record.invoice_number.as_str(), StyleId::Value);
        sheet.set(row, 4, record.issue_date.as_str(), StyleId::Value);
        sheet.set(row, 5, money_or_unspecified(totals.subtotal), StyleId::Value);
        sheet.set(row, 6, money_or_unspecified(totals.tax), StyleId::Value);
        sheet.set(row, 7, money_or_unspecified(totals.display_total()), StyleId::Value);
        sheet.set(row, 8, PROCESSED_STATUS, StyleId::Value);
    }

    let batch_totals = engine.batch_totals(batch.records());
    let totals_row = cursor.block(1);
    sheet.set(totals_row, 0, TOTALS_LABEL, StyleId::Label);
    sheet.set(totals_row, 5, CellValue::Money(batch_totals.subtotal), StyleId::Total);
    sheet.set(totals_row, 6, CellValue::Money(batch_totals.tax), StyleId::Total);
    sheet.set(totals_row, 7, CellValue::Money(batch_totals.total), StyleId::Total);

    for (col, width) in SUMMARY_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width);
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvoiceRecord, RecordStatus};
    use chrono::Local;

    fn success(name: &str, subtotal: f64, tax: f64) -> InvoiceRecord {
        InvoiceRecord {
            issuer: format!("Emisor {}", name),
            subtotal: Some(subtotal),
            tax: Some(tax),
            status: RecordStatus::Success,
            ..InvoiceRecord::pending(name)
        }
    }

    fn config() -> LayoutConfig {
        LayoutConfig::new(1, 0.21, Local::now())
    }

    #[test]
    fn test_only_successes_listed_with_batch_positions() {
        let batch = BatchResult::new(vec![
            success("a.png", 100.0, 21.0),
            InvoiceRecord::failed("b.png", "Malformed payload", Local::now()),
            success("c.png", 50.0, 10.5),
        ]);
        let sheet = build_summary_sheet(&batch, &config());

        assert_eq!(sheet.text(0, 0), Some(SUMMARY_TITLE));
        assert_eq!(sheet.text(2, 0), Some("N°"));
        assert_eq!(sheet.text(2, 8), Some("Estado"));

        assert_eq!(sheet.get(3, 0).and_then(|c| c.value.as_number()), Some(1.0));
        assert_eq!(sheet.text(3, 1), Some("a.png"));
        assert_eq!(sheet.get(4, 0).and_then(|c| c.value.as_number()), Some(3.0));
        assert_eq!(sheet.text(4, 1), Some("c.png"));
        assert_eq!(sheet.text(4, 8), Some(PROCESSED_STATUS));
        assert!(sheet.find_text("b.png").is_none());

        assert_eq!(sheet.text(6, 0), Some(TOTALS_LABEL));
    }

    #[test]
    fn test_totals_row_uses_batch_totals() {
        let mut declared = success("a.png", 100.0, 21.0);
        declared.total = Some(125.0);
        let batch = BatchResult::new(vec![declared, success("b.png", 50.0, 10.5)]);
        let sheet = build_summary_sheet(&batch, &config());

        let row = sheet.find_text(TOTALS_LABEL).unwrap().row;
        let amount = |col| sheet.get(row, col).and_then(|c| c.value.as_number()).unwrap();
        assert!((amount(5) - 150.0).abs() < 1e-9);
        assert!((amount(6) - 31.5).abs() < 1e-9);
        assert!((amount(7) - 181.5).abs() < 1e-9);
        assert!((amount(7) - (amount(5) + amount(6))).abs() < 1e-9);
        assert_eq!(sheet.get(row, 7).map(|c| c.style), Some(StyleId::Total));
    }

    #[test]
    fn test_unspecified_amounts_in_rows() {
        let record = InvoiceRecord {
            status: RecordStatus::Success,
            ..InvoiceRecord::pending("x.png")
        };
        let sheet = build_summary_sheet(&BatchResult::new(vec![record]), &config());
        assert_eq!(sheet.text(3, 5), Some("No especificado"));
        assert_eq!(sheet.text(3, 7), Some("No especificado"));
    }

    #[test]
    fn test_empty_batch_still_has_header_and_totals() {
        let sheet = build_summary_sheet(&BatchResult::default(), &config());
        assert_eq!(sheet.text(2, 0), Some("N°"));
        assert_eq!(sheet.text(4, 0), Some(TOTALS_LABEL));
        assert_eq!(sheet.get(4, 7).and_then(|c| c.value.as_number()), Some(0.0));
    }
}

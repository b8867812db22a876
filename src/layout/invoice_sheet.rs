//! 单张发票明细表
//!
//! 区块顺序固定：标题 → 开票方 → 客户 → 明细 → 金额汇总 → 附加信息。
//! 8 列（A..H），每个区块标题横跨全部列。

use crate::layout::palette::StyleId;
use crate::layout::sheet::{CellValue, PageSetup, Sheet};
use crate::layout::{LayoutConfig, RowCursor, HEADER_ROW_HEIGHT};
use crate::models::{InvoiceRecord, UNSPECIFIED};
use crate::services::aggregation::{line_subtotal, AggregationEngine};

pub const TITLE: &str = "FACTURA COMERCIAL DETALLADA";
pub const ISSUER_HEADER: &str = "INFORMACIÓN DEL EMISOR";
pub const CLIENT_HEADER: &str = "INFORMACIÓN DEL CLIENTE";
pub const DETAIL_HEADER: &str = "DETALLE DE PRODUCTOS/SERVICIOS";
pub const FINANCIAL_HEADER: &str = "RESUMEN FINANCIERO";
pub const FOOTNOTE_HEADER: &str = "INFORMACIÓN ADICIONAL";

pub const DETAIL_COLUMNS: [&str; 6] = [
    "Código",
    "Descripción",
    "Cantidad",
    "Precio Unitario",
    "Descuento",
    "Subtotal",
];

/// A..H 的列宽
pub const COLUMN_WIDTHS: [f64; 8] = [12.0, 25.0, 10.0, 15.0, 12.0, 12.0, 15.0, 15.0];

const LAST_COL: u16 = 7;

/// 生成一张发票的明细表
pub fn build_invoice_sheet(record: &InvoiceRecord, config: &LayoutConfig) -> Sheet {
    let mut sheet = Sheet::new();
    let mut cursor = RowCursor::new(config.block_gap);

    let title_row = cursor.block(1);
    sheet.set_merged(title_row, 0, LAST_COL, TITLE, StyleId::Title);
    sheet.set_row_height(title_row, HEADER_ROW_HEIGHT);

    write_issuer_block(&mut sheet, cursor.block(5), record);
    write_client_block(&mut sheet, cursor.block(4), record);

    let item_rows = u32::try_from(record.line_items.len()).unwrap_or(u32::MAX);
    let detail_rows = item_rows.saturating_add(2);
    write_detail_block(&mut sheet, cursor.block(detail_rows), record);

    write_financial_block(&mut sheet, cursor.block(5), record, config);
    write_footnote_block(&mut sheet, cursor.block(5), record, config);

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width);
    }
    sheet.set_page_setup(PageSetup::a4_portrait());

    sheet
}

fn section_header(sheet: &mut Sheet, row: u32, text: &str) {
    sheet.set_merged(row, 0, LAST_COL, text, StyleId::Header);
    sheet.set_row_height(row, HEADER_ROW_HEIGHT);
}

/// 开票方：每行两组"标签 | 值"，值分别合并 B:C 和 E:F
fn write_issuer_block(sheet: &mut Sheet, start: u32, record: &InvoiceRecord) {
    section_header(sheet, start, ISSUER_HEADER);

    let rows = [
        ("Razón Social:", &record.issuer, "N° Factura:", &record.invoice_number),
        ("RFC/CUIT:", &record.issuer_tax_id, "Fecha Emisión:", &record.issue_date),
        ("Dirección:", &record.issuer_address, "Moneda:", &record.currency),
        ("Teléfono:", &record.issuer_phone, "Condición IVA:", &record.tax_condition),
    ];

    for (offset, (left_label, left_value, right_label, right_value)) in rows.iter().enumerate() {
        let row = start + 1 + offset as u32;
        sheet.set(row, 0, *left_label, StyleId::Label);
        sheet.set_merged(row, 1, 2, left_value.as_str(), StyleId::Value);
        sheet.set(row, 3, *right_label, StyleId::Label);
        sheet.set_merged(row, 4, 5, right_value.as_str(), StyleId::Value);
    }
}

fn write_client_block(sheet: &mut Sheet, start: u32, record: &InvoiceRecord) {
    section_header(sheet, start, CLIENT_HEADER);

    let rows = [
        ("Cliente:", &record.client_name),
        ("RFC/CUIT Cliente:", &record.client_tax_id),
        ("Dirección Cliente:", &record.client_address),
    ];

    for (offset, (label, value)) in rows.iter().enumerate() {
        let row = start + 1 + offset as u32;
        sheet.set_merged(row, 0, LAST_COL, format!("{} {}", label, value), StyleId::Value);
    }
}

/// 明细：列标题 + 每个明细行一行；没有明细时只有列标题
fn write_detail_block(sheet: &mut Sheet, start: u32, record: &InvoiceRecord) {
    section_header(sheet, start, DETAIL_HEADER);

    let label_row = start + 1;
    for (col, label) in DETAIL_COLUMNS.iter().enumerate() {
        sheet.set(label_row, col as u16, *label, StyleId::Label);
    }

    for (offset, item) in record.line_items.iter().enumerate() {
        let row = label_row + 1 + offset as u32;
        sheet.set(row, 0, item.code.as_str(), StyleId::Value);
        sheet.set(row, 1, item.description.as_str(), StyleId::Value);
        sheet.set(row, 2, CellValue::Number(item.quantity), StyleId::Value);
        sheet.set(row, 3, CellValue::Money(item.unit_price), StyleId::Value);
        sheet.set(row, 4, CellValue::Money(item.discount), StyleId::Value);
        sheet.set(row, 5, CellValue::Money(line_subtotal(item)), StyleId::Value);
    }
}

/// 金额汇总：标签合并 A:G，金额在 H
fn write_financial_block(
    sheet: &mut Sheet,
    start: u32,
    record: &InvoiceRecord,
    config: &LayoutConfig,
) {
    section_header(sheet, start, FINANCIAL_HEADER);

    let totals = AggregationEngine::new(config.tax_rate).invoice_totals(record);
    let tax_label = if totals.tax_derived {
        format!("IVA ({}%):", format_percent(config.tax_rate))
    } else {
        "IVA:".to_string()
    };

    let rows = [
        ("Subtotal Productos:".to_string(), totals.subtotal, StyleId::Subtotal),
        (tax_label, totals.tax, StyleId::Label),
        ("Otros Impuestos:".to_string(), record.other_taxes, StyleId::Label),
        ("TOTAL:".to_string(), totals.display_total(), StyleId::Total),
    ];

    for (offset, (label, amount, style)) in rows.into_iter().enumerate() {
        let row = start + 1 + offset as u32;
        sheet.set_merged(row, 0, LAST_COL - 1, label, style);
        sheet.set(row, LAST_COL, money_or_unspecified(amount), style);
    }
}

fn write_footnote_block(
    sheet: &mut Sheet,
    start: u32,
    record: &InvoiceRecord,
    config: &LayoutConfig,
) {
    section_header(sheet, start, FOOTNOTE_HEADER);

    let processed_at = record.processed_at.unwrap_or(config.generated_at);
    let lines = [
        format!(
            "Factura procesada automáticamente el {}",
            processed_at.format("%d/%m/%Y")
        ),
        format!("Forma de pago: {}", record.payment_terms),
        format!("Vencimiento: {}", record.due_date),
        format!("Observaciones: {}", record.notes),
    ];

    for (offset, line) in lines.into_iter().enumerate() {
        let row = start + 1 + offset as u32;
        sheet.set_merged(row, 0, LAST_COL, line, StyleId::Note);
    }
}

pub(crate) fn money_or_unspecified(amount: Option<f64>) -> CellValue {
    match amount {
        Some(v) => CellValue::Money(v),
        None => CellValue::Text(UNSPECIFIED.to_string()),
    }
}

/// 0.21 → "21"，0.105 → "10.5"
fn format_percent(rate: f64) -> String {
    let pct = (rate * 10_000.0).round() / 100.0;
    if pct.fract() == 0.0 {
        format!("{:.0}", pct)
    } else {
        pct.to_string()
    }
}

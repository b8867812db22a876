//! 记录规范化服务 - 业务能力层
//!
//! 只负责"把一次提取结果变成一条 InvoiceRecord"，不关心批次和流程。
//!
//! 规则：
//! 1. 去掉首尾的 Markdown 代码围栏
//! 2. 解析 JSON，失败（或不是对象）时返回错误记录 "Malformed payload"
//! 3. 金额字段转换为 `Option<f64>`，明细行的数值字段缺失时为 0
//! 4. 缺失的字符串字段统一填 [`UNSPECIFIED`]
//!
//! 所有错误都编码在返回的记录里，不会向外抛出。

use crate::error::ExtractionError;
use crate::models::{InvoiceRecord, LineItem, RawInvoice, RawLineItem, RecordStatus, UNSPECIFIED};
use crate::utils::logging::truncate_text;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// 单张发票保留的明细行上限，超出部分丢弃
pub const MAX_LINE_ITEMS: usize = 1000;

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("fence pattern is valid"));

/// 规范化一次提取结果（使用当前时间作为处理时间）
pub fn normalize(raw: &str, file_name: &str) -> InvoiceRecord {
    normalize_at(raw, file_name, Local::now())
}

/// 规范化一次提取结果
///
/// 除 `processed_at` 外，输出只取决于 `raw` 和 `file_name`。
pub fn normalize_at(raw: &str, file_name: &str, at: DateTime<Local>) -> InvoiceRecord {
    let cleaned = strip_code_fence(raw);

    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => normalize_value_at(value, file_name, at),
        Err(e) => {
            warn!(
                "[{}] 提取结果不是合法 JSON: {} | 内容: {}",
                file_name,
                e,
                truncate_text(cleaned, 80)
            );
            malformed(file_name, at)
        }
    }
}

/// 规范化一个已经解析好的 JSON 值
pub fn normalize_value(value: Value, file_name: &str) -> InvoiceRecord {
    normalize_value_at(value, file_name, Local::now())
}

fn normalize_value_at(value: Value, file_name: &str, at: DateTime<Local>) -> InvoiceRecord {
    let Value::Object(map) = value else {
        warn!("[{}] 提取结果不是 JSON 对象", file_name);
        return malformed(file_name, at);
    };

    match RawInvoice::from_object(map) {
        Ok(raw) => {
            let record = apply_defaults(raw, file_name, at);
            debug!("[{}] 规范化完成: {}", file_name, record);
            record
        }
        Err(e) => {
            warn!("[{}] 提取结果字段结构异常: {}", file_name, e);
            malformed(file_name, at)
        }
    }
}

fn malformed(file_name: &str, at: DateTime<Local>) -> InvoiceRecord {
    InvoiceRecord::failed(file_name, ExtractionError::MalformedPayload.to_string(), at)
}

/// 去掉首尾的代码围栏（```json ... ```）
///
/// 只处理包裹在最外层的围栏，正文中的反引号保持不变；
/// 没有开头围栏时，结尾的 ``` 也保留。
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(open) = OPENING_FENCE.find(text) else {
        return text;
    };

    let inner = &text[open.end()..];
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// 唯一的默认值函数：原始字段 → 严格的记录
fn apply_defaults(raw: RawInvoice, file_name: &str, at: DateTime<Local>) -> InvoiceRecord {
    let issuer = text_or_unspecified(&raw.emisor);
    let client_name = coerce_text(&raw.cliente).unwrap_or_else(|| issuer.clone());

    let line_items = match raw.productos {
        Some(Value::Array(items)) => {
            if items.len() > MAX_LINE_ITEMS {
                warn!(
                    "[{}] 明细行过多 ({})，只保留前 {} 行",
                    file_name,
                    items.len(),
                    MAX_LINE_ITEMS
                );
            }
            items
                .into_iter()
                .enumerate()
                .filter_map(|(idx, item)| coerce_line_item(item, file_name, idx))
                .take(MAX_LINE_ITEMS)
                .collect()
        }
        Some(other) => {
            warn!("[{}] productos 不是数组，已忽略: {}", file_name, other);
            Vec::new()
        }
        None => Vec::new(),
    };

    InvoiceRecord {
        source_file_name: file_name.to_string(),
        issuer,
        issue_date: text_or_unspecified(&raw.fecha_emision),
        invoice_number: text_or_unspecified(&raw.numero_factura),
        concept: text_or_unspecified(&raw.concepto),
        currency: text_or_unspecified(&raw.moneda),
        issuer_tax_id: text_or_unspecified(&raw.rfc),
        issuer_address: text_or_unspecified(&raw.direccion),
        issuer_phone: text_or_unspecified(&raw.telefono),
        tax_condition: text_or_unspecified(&raw.condicion_iva),
        client_name,
        client_tax_id: text_or_unspecified(&raw.rfc_cliente),
        client_address: text_or_unspecified(&raw.direccion_cliente),
        payment_terms: text_or_unspecified(&raw.forma_pago),
        due_date: text_or_unspecified(&raw.vencimiento),
        notes: text_or_unspecified(&raw.observaciones),
        line_items,
        subtotal: coerce_amount(&raw.subtotal),
        tax: coerce_amount(&raw.iva),
        other_taxes: coerce_amount(&raw.otros_impuestos),
        total: coerce_amount(&raw.total),
        status: RecordStatus::Success,
        error_message: None,
        processed_at: Some(at),
    }
}

fn coerce_line_item(value: Value, file_name: &str, idx: usize) -> Option<LineItem> {
    let Value::Object(map) = value else {
        warn!("[{}] 第 {} 行明细不是对象，已跳过", file_name, idx + 1);
        return None;
    };
    let raw = match RawLineItem::from_object(map) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("[{}] 第 {} 行明细结构异常，已跳过: {}", file_name, idx + 1, e);
            return None;
        }
    };

    Some(LineItem {
        code: text_or_unspecified(&raw.codigo),
        description: text_or_unspecified(&raw.descripcion),
        quantity: non_negative(&raw.cantidad),
        unit_price: non_negative(&raw.precio),
        discount: non_negative(&raw.descuento),
    })
}

fn text_or_unspecified(value: &Option<Value>) -> String {
    coerce_text(value).unwrap_or_else(|| UNSPECIFIED.to_string())
}

/// 字符串或数字 → 非空文本
pub fn coerce_text(value: &Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// 数字或数字字符串 → 有限的 f64
///
/// 接受前导货币符号（`$`、`€`）、千位空格，以及只有逗号时的小数逗号（`100,5`）。
pub fn coerce_amount(value: &Option<Value>) -> Option<f64> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_amount_text(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn parse_amount_text(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches(&['$', '€'][..])
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(v) = cleaned.parse::<f64>() {
        return Some(v);
    }
    if cleaned.contains(',') && !cleaned.contains('.') {
        return cleaned.replace(',', ".").parse::<f64>().ok();
    }
    None
}

/// 明细行数值：缺失、无法解析或为负时取 0
fn non_negative(value: &Option<Value>) -> f64 {
    match coerce_amount(value) {
        Some(v) if v >= 0.0 => v,
        Some(v) => {
            debug!("明细行数值为负 ({})，按 0 处理", v);
            0.0
        }
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_payload_with_string_total() {
        let raw = "```json\n{\"emisor\":\"ACME\",\"total\":\"100.5\"}\n```";
        let record = normalize(raw, "acme.png");

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.issuer, "ACME");
        assert_eq!(record.total, Some(100.5));
        assert_eq!(record.subtotal, None);
        assert!(record.error_message.is_none());
        assert_eq!(record.source_file_name, "acme.png");
    }

    #[test]
    fn test_plain_text_is_malformed() {
        let record = normalize("not json", "x.png");
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("Malformed payload"));
    }

    #[test]
    fn test_json_string_literal_is_malformed() {
        let record = normalize("\"not json\"", "x.png");
        assert_eq!(record.status, RecordStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("Malformed payload"));
    }

    #[test]
    fn test_idempotent_apart_from_timestamp() {
        let raw = r#"{"emisor":"ACME","productos":[{"codigo":1,"cantidad":"2","precio":3.5}]}"#;
        let first = normalize(raw, "a.png");
        let second = normalize(raw, "a.png");
        assert_eq!(first.without_timestamp(), second.without_timestamp());

        let at = Local::now();
        assert_eq!(normalize_at(raw, "a.png", at), normalize_at(raw, "a.png", at));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  ```JSON {} ```  "), "{}");
        assert_eq!(strip_code_fence("{\"a\":\"`x`\"}"), "{\"a\":\"`x`\"}");
        assert_eq!(strip_code_fence("{}"), "{}");
        assert_eq!(strip_code_fence("```json\n{}"), "{}");
    }

    #[test]
    fn test_closing_fence_kept_without_opening() {
        assert_eq!(strip_code_fence("{}\n```"), "{}\n```");
        let record = normalize("{\"emisor\":\"ACME\"}\n```", "a.png");
        assert_eq!(record.status, RecordStatus::Error);
    }

    #[test]
    fn test_spanish_and_english_keys_together() {
        let record = normalize(r#"{"emisor":"ACME","issuer":"ACME","total":10}"#, "a.png");
        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.issuer, "ACME");
        assert_eq!(record.total, Some(10.0));

        let record = normalize(
            r#"{"productos":[{"cantidad":2,"quantity":5,"precio":"1","unitPrice":"9"}]}"#,
            "a.png",
        );
        assert_eq!(record.line_items.len(), 1);
        assert_eq!(record.line_items[0].quantity, 2.0);
        assert_eq!(record.line_items[0].unit_price, 1.0);
    }

    #[test]
    fn test_missing_strings_default_to_sentinel() {
        let record = normalize("{}", "empty.png");
        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.issuer, UNSPECIFIED);
        assert_eq!(record.invoice_number, UNSPECIFIED);
        assert_eq!(record.payment_terms, UNSPECIFIED);
        assert!(record.line_items.is_empty());
        assert_eq!(record.tax, None);
    }

    #[test]
    fn test_client_falls_back_to_issuer() {
        let record = normalize(r#"{"emisor":"ACME"}"#, "a.png");
        assert_eq!(record.client_name, "ACME");

        let record = normalize(r#"{"emisor":"ACME","cliente":"Globex"}"#, "a.png");
        assert_eq!(record.client_name, "Globex");
    }

    #[test]
    fn test_line_items_coerced() {
        let raw = json!({
            "productos": [
                {"codigo": 7, "descripcion": "Tornillos", "cantidad": "3", "precio": "$2,5", "descuento": null},
                {"descripcion": "Sin precio", "cantidad": "abc"},
                "basura",
                {"cantidad": -4, "precio": 10}
            ]
        });
        let record = normalize_value(raw, "a.png");

        assert_eq!(record.line_items.len(), 3);
        let first = &record.line_items[0];
        assert_eq!(first.code, "7");
        assert_eq!(first.quantity, 3.0);
        assert_eq!(first.unit_price, 2.5);
        assert_eq!(first.discount, 0.0);

        let second = &record.line_items[1];
        assert_eq!(second.code, UNSPECIFIED);
        assert_eq!(second.quantity, 0.0);
        assert_eq!(second.unit_price, 0.0);

        assert_eq!(record.line_items[2].quantity, 0.0);
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(&Some(json!(12))), Some(12.0));
        assert_eq!(coerce_amount(&Some(json!(" 12.40 "))), Some(12.4));
        assert_eq!(coerce_amount(&Some(json!("€ 1 250.5"))), Some(1250.5));
        assert_eq!(coerce_amount(&Some(json!("100,5"))), Some(100.5));
        assert_eq!(coerce_amount(&Some(json!("N/A"))), None);
        assert_eq!(coerce_amount(&Some(json!(""))), None);
        assert_eq!(coerce_amount(&Some(json!(true))), None);
        assert_eq!(coerce_amount(&None), None);
    }

    #[test]
    fn test_zero_amount_is_kept() {
        let record = normalize(r#"{"iva": 0, "subtotal": "0"}"#, "a.png");
        assert_eq!(record.tax, Some(0.0));
        assert_eq!(record.subtotal, Some(0.0));
    }

    #[test]
    fn test_line_items_capped() {
        let items: Vec<Value> = (0..MAX_LINE_ITEMS + 5)
            .map(|i| json!({"codigo": i, "cantidad": 1, "precio": 1}))
            .collect();
        let record = normalize_value(json!({ "productos": items }), "a.png");

        assert_eq!(record.status, RecordStatus::Success);
        assert_eq!(record.line_items.len(), MAX_LINE_ITEMS);
        assert_eq!(record.line_items[0].code, "0");
    }

    #[test]
    fn test_productos_not_array_is_ignored() {
        let record = normalize(r#"{"productos": {"codigo": "x"}}"#, "a.png");
        assert_eq!(record.status, RecordStatus::Success);
        assert!(record.line_items.is_empty());
    }
}

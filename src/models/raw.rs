//! 提取服务返回的原始发票结构
//!
//! 所有字段都是可选的 `serde_json::Value`：提取结果来自 LLM，
//! 同一个字段可能是字符串、数字、null 或者干脆不存在。
//! 类型转换和默认值统一在 `services::normalizer` 中处理。

use serde::Deserialize;
use serde_json::{Map, Value};

/// 发票字段的英文别名：(西语键, 英文键)
pub const INVOICE_KEY_ALIASES: &[(&str, &str)] = &[
    ("emisor", "issuer"),
    ("fechaEmision", "issueDate"),
    ("numeroFactura", "invoiceNumber"),
    ("concepto", "concept"),
    ("moneda", "currency"),
    ("rfc", "issuerTaxId"),
    ("direccion", "issuerAddress"),
    ("telefono", "issuerPhone"),
    ("condicionIva", "taxCondition"),
    ("cliente", "clientName"),
    ("rfcCliente", "clientTaxId"),
    ("direccionCliente", "clientAddress"),
    ("formaPago", "paymentTerms"),
    ("vencimiento", "dueDate"),
    ("observaciones", "notes"),
    ("iva", "tax"),
    ("otrosImpuestos", "otherTaxes"),
    ("productos", "lineItems"),
];

/// 明细行字段的别名
pub const LINE_ITEM_KEY_ALIASES: &[(&str, &str)] = &[
    ("codigo", "code"),
    ("descripcion", "description"),
    ("cantidad", "quantity"),
    ("precio", "unitPrice"),
    ("precio", "precioUnitario"),
    ("descuento", "discount"),
];

/// 把别名键并入西语键
///
/// 西语键缺失或为 null 时取别名的值；别名键总是移除，
/// 所以同一对象里两种写法同时出现也能正常反序列化。
pub fn merge_key_aliases(map: &mut Map<String, Value>, aliases: &[(&str, &str)]) {
    for (key, alias) in aliases {
        let Some(value) = map.remove(*alias) else {
            continue;
        };
        let missing = map.get(*key).map_or(true, Value::is_null);
        if missing {
            map.insert((*key).to_string(), value);
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInvoice {
    pub emisor: Option<Value>,
    #[serde(rename = "fechaEmision")]
    pub fecha_emision: Option<Value>,
    #[serde(rename = "numeroFactura")]
    pub numero_factura: Option<Value>,
    pub concepto: Option<Value>,
    pub moneda: Option<Value>,

    pub rfc: Option<Value>,
    pub direccion: Option<Value>,
    pub telefono: Option<Value>,
    #[serde(rename = "condicionIva")]
    pub condicion_iva: Option<Value>,

    pub cliente: Option<Value>,
    #[serde(rename = "rfcCliente")]
    pub rfc_cliente: Option<Value>,
    #[serde(rename = "direccionCliente")]
    pub direccion_cliente: Option<Value>,

    #[serde(rename = "formaPago")]
    pub forma_pago: Option<Value>,
    pub vencimiento: Option<Value>,
    pub observaciones: Option<Value>,

    pub subtotal: Option<Value>,
    pub iva: Option<Value>,
    #[serde(rename = "otrosImpuestos")]
    pub otros_impuestos: Option<Value>,
    pub total: Option<Value>,

    pub productos: Option<Value>,
}

impl RawInvoice {
    /// 从 JSON 对象读取，接受英文别名
    pub fn from_object(mut map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        merge_key_aliases(&mut map, INVOICE_KEY_ALIASES);
        serde_json::from_value(Value::Object(map))
    }
}

/// 原始明细行
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLineItem {
    pub codigo: Option<Value>,
    pub descripcion: Option<Value>,
    pub cantidad: Option<Value>,
    pub precio: Option<Value>,
    pub descuento: Option<Value>,
}

impl RawLineItem {
    pub fn from_object(mut map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        merge_key_aliases(&mut map, LINE_ITEM_KEY_ALIASES);
        serde_json::from_value(Value::Object(map))
    }
}

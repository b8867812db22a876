//! 发票提取服务 - 业务能力层
//!
//! 只负责"把一张发票图片交给视觉模型，拿回原始文本"，不解析、不关心流程。
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（自定义 API 端点和模型）
//! - 图片以 base64 data URL 的形式随提示词一起发送

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, ExtractionError};
use crate::models::BatchItem;

/// 允许提交给提取服务的图片类型
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/jpg"];

/// 提取提示词
///
/// 要求模型只返回 JSON；字段名与 `models::raw::RawInvoice` 对应。
pub const EXTRACTION_PROMPT: &str = "Extrae toda la información de esta factura y devuélvela como un objeto JSON válido con los siguientes campos:
    - emisor (string)
    - fechaEmision (string en formato YYYY-MM-DD)
    - numeroFactura (string)
    - concepto (string)
    - subtotal (number)
    - iva (number)
    - total (number)
    - moneda (string)
    - rfc, direccion, telefono, condicionIva (string, datos del emisor)
    - cliente, rfcCliente, direccionCliente (string)
    - formaPago, vencimiento, observaciones (string)
    - otrosImpuestos (number)
    - productos (array de objetos con codigo, descripcion, cantidad, precio, descuento)

    Si algún campo no está presente en la factura, devuélvelo como null.
    Devuelve ÚNICAMENTE el JSON sin texto adicional.";

/// 提取服务接口
///
/// 给定一张图片，返回描述发票字段的原始文本（通常是 JSON，可能带代码围栏，
/// 也可能完全不合法），或者返回错误。
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, item: &BatchItem) -> Result<String, ExtractionError>;
}

/// 提交前的图片校验
pub fn validate_image(item: &BatchItem, max_bytes: usize) -> Result<(), ExtractionError> {
    let mime = item.mime_type.to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
        return Err(ExtractionError::invalid_image(format!(
            "unsupported type '{}' (JPEG, PNG and JPG only)",
            item.mime_type
        )));
    }
    if item.bytes.is_empty() {
        return Err(ExtractionError::invalid_image("empty file"));
    }
    if item.bytes.len() > max_bytes {
        return Err(ExtractionError::invalid_image(format!(
            "file too large ({} bytes, limit {} bytes)",
            item.bytes.len(),
            max_bytes
        )));
    }
    Ok(())
}

/// 构造 `data:<mime>;base64,<...>` 形式的图片 URL
pub fn to_data_url(item: &BatchItem) -> String {
    format!("data:{};base64,{}", item.mime_type, STANDARD.encode(&item.bytes))
}

/// 基于 OpenAI 兼容接口的提取服务
///
/// 职责：
/// - 校验图片类型和大小
/// - 调用视觉模型，返回模型的原始文本
/// - 不解析 JSON（由 normalizer 负责）
pub struct OpenAiExtractor {
    client: Client<OpenAIConfig>,
    model_name: String,
    max_image_bytes: usize,
}

impl OpenAiExtractor {
    /// 创建新的提取服务；未配置 API Key 时返回错误
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::invalid("llm_api_key", "未配置 OPENAI_API_KEY"));
        }

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            max_image_bytes: config.max_image_bytes,
        })
    }

    fn build_messages(&self, item: &BatchItem) -> Result<Vec<ChatCompletionRequestMessage>, ExtractionError> {
        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: EXTRACTION_PROMPT.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: to_data_url(item),
                        detail: Some(ImageDetail::Auto),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()
            .map_err(|e| ExtractionError::upstream(format!("request build failed: {}", e)))?;

        Ok(vec![ChatCompletionRequestMessage::User(user_msg)])
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(&self, item: &BatchItem) -> Result<String, ExtractionError> {
        validate_image(item, self.max_image_bytes)?;

        debug!(
            "调用视觉模型，模型: {}，文件: {} ({} 字节)",
            self.model_name,
            item.file_name,
            item.bytes.len()
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(self.build_messages(item)?)
            .temperature(0.1)
            .max_tokens(2000u32)
            .build()
            .map_err(|e| ExtractionError::upstream(format!("request build failed: {}", e)))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("视觉模型调用失败 ({}): {}", item.file_name, e);
            ExtractionError::upstream(e.to_string())
        })?;

        debug!("视觉模型调用成功: {}", item.file_name);

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ExtractionError::upstream("empty response content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mime: &str, len: usize) -> BatchItem {
        BatchItem::new("f.png", mime, vec![7u8; len])
    }

    #[test]
    fn test_validate_image_accepts_allowed_types() {
        assert!(validate_image(&image("image/png", 10), 100).is_ok());
        assert!(validate_image(&image("IMAGE/JPEG", 10), 100).is_ok());
        assert!(validate_image(&image("image/jpg", 100), 100).is_ok());
    }

    #[test]
    fn test_validate_image_rejects_type_size_and_empty() {
        assert!(matches!(
            validate_image(&image("application/pdf", 10), 100),
            Err(ExtractionError::InvalidImage { .. })
        ));
        assert!(matches!(
            validate_image(&image("image/png", 101), 100),
            Err(ExtractionError::InvalidImage { .. })
        ));
        assert!(matches!(
            validate_image(&image("image/png", 0), 100),
            Err(ExtractionError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_data_url() {
        let item = BatchItem::new("f.png", "image/png", b"hi".to_vec());
        assert_eq!(to_data_url(&item), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = Config::default();
        assert!(OpenAiExtractor::new(&config).is_err());

        let config = Config {
            llm_api_key: "sk-test".to_string(),
            ..Config::default()
        };
        assert!(OpenAiExtractor::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_image_before_calling_api() {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_api_base_url: "http://127.0.0.1:9".to_string(),
            ..Config::default()
        };
        let extractor = OpenAiExtractor::new(&config).unwrap();
        let err = extractor.extract(&image("image/gif", 3)).await.unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidImage { .. }));
    }
}

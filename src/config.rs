use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// 默认税率（IVA）
///
/// 单张导出和批量导出共用这一份，不要在别处再写死税率。
pub const DEFAULT_TAX_RATE: f64 = 0.21;

/// 单张图片的默认大小上限（5 MiB）
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 未提供 IVA 时使用的税率
    pub default_tax_rate: f64,
    /// 报表中各区块之间的空行数
    pub block_gap: u32,
    /// 工作簿属性中的作者
    pub workbook_author: String,
    /// 提取前允许的最大图片字节数
    pub max_image_bytes: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_tax_rate: DEFAULT_TAX_RATE,
            block_gap: 1,
            workbook_author: "Sistema de Facturas".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，缺失的项使用默认值
    ///
    /// 数值型变量解析失败时返回错误，而不是悄悄回退到默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            default_tax_rate: env_parsed("DEFAULT_TAX_RATE", "f64")?
                .unwrap_or(default.default_tax_rate),
            block_gap: env_parsed("REPORT_BLOCK_GAP", "u32")?.unwrap_or(default.block_gap),
            workbook_author: std::env::var("WORKBOOK_AUTHOR").unwrap_or(default.workbook_author),
            max_image_bytes: env_parsed("MAX_IMAGE_BYTES", "usize")?
                .unwrap_or(default.max_image_bytes),
            verbose_logging: env_parsed("VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        };
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParseFailed { source, .. } => ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        tracing::debug!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: String::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_tax_rate.is_finite() || !(0.0..=1.0).contains(&self.default_tax_rate) {
            return Err(ConfigError::invalid(
                "default_tax_rate",
                format!("{} 不在 [0, 1] 范围内", self.default_tax_rate),
            ));
        }
        if self.block_gap > 10 {
            return Err(ConfigError::invalid(
                "block_gap",
                format!("{} 超过最大值 10", self.block_gap),
            ));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::invalid("max_image_bytes", "必须大于 0"));
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

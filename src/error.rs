use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 提取相关错误（单张发票）
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 导出相关错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 单张发票的提取错误
///
/// 这些错误不会越过批处理边界，而是以 `error_message` 的形式写进
/// 对应的 `InvoiceRecord`，所以 Display 文本就是记录里看到的内容。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// 去掉代码围栏后仍然不是合法的 JSON 对象
    #[error("Malformed payload")]
    MalformedPayload,
    /// 提取服务调用失败（网络 / 服务端错误）
    #[error("Upstream unavailable: {message}")]
    UpstreamUnavailable { message: String },
    /// 图片在发送前就被拒绝（类型或大小不符合要求）
    #[error("Invalid image: {reason}")]
    InvalidImage { reason: String },
}

impl ExtractionError {
    /// 创建提取服务不可用错误
    pub fn upstream(message: impl Into<String>) -> Self {
        ExtractionError::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// 创建图片无效错误
    pub fn invalid_image(reason: impl Into<String>) -> Self {
        ExtractionError::InvalidImage {
            reason: reason.into(),
        }
    }
}

/// 导出错误，直接返回给导出操作的调用方
#[derive(Debug, Error)]
pub enum ExportError {
    /// 单张导出时记录不是成功状态
    #[error("record '{file_name}' is not exportable (status: {status})")]
    RecordNotExportable { file_name: String, status: String },
    /// 批量导出时没有任何成功的记录
    #[error("batch contains no successful records")]
    NoSuccessfulRecords,
    /// 工作簿序列化失败
    #[error("xlsx serialization failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置项 {key} 不合法: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    /// 创建配置值不合法错误
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

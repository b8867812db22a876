//! 导出产物
//!
//! 一个产物就是一个完整的 xlsx 文件（内存中的字节）。

use std::path::{Path, PathBuf};
use tracing::info;

/// xlsx 的 MIME 类型
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// 导出产物
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    /// 工作表名称，按工作簿中的顺序
    pub sheet_names: Vec<String>,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn mime_type(&self) -> &'static str {
        XLSX_MIME
    }

    /// 写入目录，返回最终路径
    ///
    /// 先写临时文件再重命名，目标路径上不会出现写了一半的文件。
    pub async fn write_to_dir(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let target = dir.join(&self.file_name);
        let temp = dir.join(format!(".{}.tmp", self.file_name));

        tokio::fs::write(&temp, &self.bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }

        info!("💾 已保存: {} ({} 字节)", target.display(), self.bytes.len());
        Ok(target)
    }
}

/// 把任意文本变成安全的文件名片段
pub fn sanitize_file_stem(text: &str) -> String {
    let cleaned: String = text
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("F-001"), "F-001");
        assert_eq!(sanitize_file_stem("A/12 34"), "A_12_34");
        assert_eq!(sanitize_file_stem("2024-03-05"), "2024-03-05");
        assert_eq!(sanitize_file_stem("..x.."), "x");
    }

    #[tokio::test]
    async fn test_write_to_dir_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            file_name: "factura.xlsx".to_string(),
            sheet_names: vec!["FACTURA_DETALLADA".to_string()],
            bytes: b"PK\x03\x04".to_vec(),
        };

        let path = artifact.write_to_dir(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("factura.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), artifact.bytes);

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            file_name: "a.xlsx".to_string(),
            sheet_names: Vec::new(),
            bytes: vec![1, 2, 3],
        };
        assert!(artifact.write_to_dir(&dir.path().join("missing")).await.is_err());
    }
}

//! 发票处理上下文
//!
//! 封装"我正在处理批次中的第几张发票"这一信息

use std::fmt::Display;

/// 发票处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 在批次中的位置（从1开始）
    pub position: usize,

    /// 批次总数
    pub total: usize,

    /// 原始文件名
    pub file_name: String,
}

impl ItemCtx {
    /// 创建新的发票上下文
    pub fn new(position: usize, total: usize, file_name: impl Into<String>) -> Self {
        Self {
            position,
            total,
            file_name: file_name.into(),
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[发票 {}/{} {}]",
            self.position, self.total, self.file_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = ItemCtx::new(2, 5, "b.png");
        assert_eq!(ctx.to_string(), "[发票 2/5 b.png]");
    }
}

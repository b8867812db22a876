//! 报表布局层
//!
//! 纯函数：记录（或批次）+ 配置 → 内存中的 [`Sheet`]。
//! 行号只取决于记录的形状和区块间隔，不读取当前时间；
//! 唯一的例外是脚注中的"处理日期"，它来自记录的 `processed_at`
//! 或 [`LayoutConfig::generated_at`]。

pub mod invoice_sheet;
pub mod palette;
pub mod sheet;
pub mod summary_sheet;

pub use invoice_sheet::build_invoice_sheet;
pub use palette::{StyleDef, StyleId, StylePalette};
pub use sheet::{CellCoord, CellContent, CellValue, MergeRegion, PageSetup, Sheet};
pub use summary_sheet::build_summary_sheet;

use crate::config::Config;
use chrono::{DateTime, Local};

/// 标题行和区块标题行的行高
pub const HEADER_ROW_HEIGHT: f64 = 25.0;

/// 布局参数
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// 区块之间的空行数
    pub block_gap: u32,
    /// 未提供 IVA 时的税率
    pub tax_rate: f64,
    /// 记录没有处理时间时使用的生成时间
    pub generated_at: DateTime<Local>,
}

impl LayoutConfig {
    pub fn new(block_gap: u32, tax_rate: f64, generated_at: DateTime<Local>) -> Self {
        Self {
            block_gap,
            tax_rate,
            generated_at,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.block_gap, config.default_tax_rate, Local::now())
    }
}

/// 按区块分配行号
///
/// 每个区块从上一个区块结束后空 `gap` 行处开始。
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowCursor {
    next: u32,
    gap: u32,
}

impl RowCursor {
    pub(crate) fn new(gap: u32) -> Self {
        Self { next: 0, gap }
    }

    /// 为占 `rows` 行的区块分配起始行
    pub(crate) fn block(&mut self, rows: u32) -> u32 {
        let start = self.next;
        self.next = start.saturating_add(rows).saturating_add(self.gap);
        start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_cursor() {
        let mut cursor = RowCursor::new(1);
        assert_eq!(cursor.block(1), 0);
        assert_eq!(cursor.block(5), 2);
        assert_eq!(cursor.block(4), 8);

        let mut tight = RowCursor::new(0);
        assert_eq!(tight.block(1), 0);
        assert_eq!(tight.block(3), 1);
    }

    #[test]
    fn test_row_cursor_saturates() {
        let mut cursor = RowCursor::new(1);
        assert_eq!(cursor.block(u32::MAX), 0);
        assert_eq!(cursor.block(1), u32::MAX);
    }
}

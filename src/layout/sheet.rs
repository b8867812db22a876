//! 工作表网格模型
//!
//! 坐标全部是从 0 开始的整数 (row, col)，只有序列化时才转换成 `A1` 形式。

use crate::layout::palette::StyleId;
use std::collections::BTreeMap;

/// 单元格坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoord {
    pub row: u32,
    pub col: u16,
}

impl CellCoord {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }
}

/// 单元格的值
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// 金额，序列化时保留两位小数并带货币格式
    Money(f64),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) | CellValue::Money(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// 单元格内容：值 + 样式 id
#[derive(Debug, Clone, PartialEq)]
pub struct CellContent {
    pub value: CellValue,
    pub style: StyleId,
}

/// 合并区域（首尾均包含）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRegion {
    pub first: CellCoord,
    pub last: CellCoord,
}

impl MergeRegion {
    pub fn contains(&self, coord: CellCoord) -> bool {
        (self.first.row..=self.last.row).contains(&coord.row)
            && (self.first.col..=self.last.col).contains(&coord.col)
    }

    pub fn overlaps(&self, other: &MergeRegion) -> bool {
        self.first.row <= other.last.row
            && other.first.row <= self.last.row
            && self.first.col <= other.last.col
            && other.first.col <= self.last.col
    }
}

/// 页边距（英寸）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
    pub header: f64,
    pub footer: f64,
}

/// 打印设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    /// Excel 纸张编号，9 = A4
    pub paper_size: u8,
    pub portrait: bool,
    pub margins: Margins,
}

impl PageSetup {
    /// A4 纵向，发票明细表使用
    pub fn a4_portrait() -> Self {
        Self {
            paper_size: 9,
            portrait: true,
            margins: Margins {
                left: 0.5,
                right: 0.5,
                top: 0.75,
                bottom: 0.75,
                header: 0.3,
                footer: 0.3,
            },
        }
    }
}

/// 一张工作表的完整内存结构
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    cells: BTreeMap<CellCoord, CellContent>,
    merges: Vec<MergeRegion>,
    row_heights: BTreeMap<u32, f64>,
    column_widths: BTreeMap<u16, f64>,
    page_setup: Option<PageSetup>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入单元格（覆盖已有内容）
    pub fn set(&mut self, row: u32, col: u16, value: impl Into<CellValue>, style: StyleId) {
        self.cells.insert(
            CellCoord::new(row, col),
            CellContent {
                value: value.into(),
                style,
            },
        );
    }

    /// 合并区域；内容写在区域左上角
    pub fn merge(&mut self, row: u32, first_col: u16, last_row: u32, last_col: u16) {
        self.merges.push(MergeRegion {
            first: CellCoord::new(row, first_col),
            last: CellCoord::new(last_row, last_col),
        });
    }

    /// 写入一行内的合并单元格
    pub fn set_merged(
        &mut self,
        row: u32,
        first_col: u16,
        last_col: u16,
        value: impl Into<CellValue>,
        style: StyleId,
    ) {
        self.merge(row, first_col, row, last_col);
        self.set(row, first_col, value, style);
    }

    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    pub fn set_page_setup(&mut self, setup: PageSetup) {
        self.page_setup = Some(setup);
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellContent> {
        self.cells.get(&CellCoord::new(row, col))
    }

    /// 单元格文本（非文本单元格返回 None）
    pub fn text(&self, row: u32, col: u16) -> Option<&str> {
        self.get(row, col).and_then(|c| c.value.as_text())
    }

    /// 按行优先顺序遍历所有单元格
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &CellContent)> {
        self.cells.iter().map(|(coord, content)| (*coord, content))
    }

    pub fn merges(&self) -> &[MergeRegion] {
        &self.merges
    }

    pub fn row_heights(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.row_heights.iter().map(|(r, h)| (*r, *h))
    }

    pub fn column_widths(&self) -> impl Iterator<Item = (u16, f64)> + '_ {
        self.column_widths.iter().map(|(c, w)| (*c, *w))
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn page_setup(&self) -> Option<&PageSetup> {
        self.page_setup.as_ref()
    }

    /// 最后一个有内容的行
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().map(|c| c.row).max()
    }

    /// 查找第一个文本完全相同的单元格
    pub fn find_text(&self, needle: &str) -> Option<CellCoord> {
        self.cells
            .iter()
            .find(|(_, content)| content.value.as_text() == Some(needle))
            .map(|(coord, _)| *coord)
    }

    /// 某一行的所有单元格（按列排序）
    pub fn row(&self, row: u32) -> Vec<(u16, &CellContent)> {
        self.cells
            .range(CellCoord::new(row, 0)..=CellCoord::new(row, u16::MAX))
            .map(|(coord, content)| (coord.col, content))
            .collect()
    }

    /// 是否存在互相重叠的合并区域
    pub fn has_overlapping_merges(&self) -> bool {
        self.merges.iter().enumerate().any(|(i, a)| {
            self.merges[i + 1..].iter().any(|b| a.overlaps(b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_back() {
        let mut sheet = Sheet::new();
        sheet.set(2, 1, "hola", StyleId::Value);
        sheet.set(2, 0, CellValue::Money(3.5), StyleId::Total);

        assert_eq!(sheet.text(2, 1), Some("hola"));
        assert_eq!(sheet.get(2, 0).and_then(|c| c.value.as_number()), Some(3.5));
        let row: Vec<u16> = sheet.row(2).into_iter().map(|(c, _)| c).collect();
        assert_eq!(row, vec![0, 1]);
        assert_eq!(sheet.last_row(), Some(2));
    }

    #[test]
    fn test_merge_overlap_detection() {
        let mut sheet = Sheet::new();
        sheet.set_merged(0, 0, 7, "T", StyleId::Title);
        sheet.set_merged(1, 1, 2, "x", StyleId::Value);
        sheet.set_merged(1, 4, 5, "y", StyleId::Value);
        assert!(!sheet.has_overlapping_merges());

        sheet.merge(1, 2, 1, 3);
        assert!(sheet.has_overlapping_merges());
    }

    #[test]
    fn test_merge_region_contains() {
        let region = MergeRegion {
            first: CellCoord::new(3, 0),
            last: CellCoord::new(3, 6),
        };
        assert!(region.contains(CellCoord::new(3, 6)));
        assert!(!region.contains(CellCoord::new(3, 7)));
        assert!(!region.contains(CellCoord::new(4, 0)));
    }
}

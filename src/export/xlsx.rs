//! OOXML 序列化
//!
//! 把内存中的 [`Sheet`] 写成 xlsx 字节。这里是唯一接触 `rust_xlsxwriter`
//! 和 `A1` 地址的地方。

use crate::error::ExportError;
use crate::layout::palette::{HAlign, StyleDef, StyleId, StylePalette};
use crate::layout::sheet::{CellCoord, CellValue, Sheet};
use crate::services::aggregation::round_to_cents;
use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// 金额单元格的数字格式
pub const MONEY_FORMAT: &str = "$#,##0.00";

/// 带名字的工作表
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSheet {
    pub name: String,
    pub sheet: Sheet,
}

impl NamedSheet {
    pub fn new(name: impl Into<String>, sheet: Sheet) -> Self {
        Self {
            name: name.into(),
            sheet,
        }
    }
}

/// 每种样式对应的两个 Format：普通 / 金额
struct FormatTable {
    plain: HashMap<StyleId, Format>,
    money: HashMap<StyleId, Format>,
}

impl FormatTable {
    fn new(palette: &StylePalette) -> Self {
        let mut plain = HashMap::new();
        let mut money = HashMap::new();
        for id in StyleId::ALL {
            let format = build_format(palette.get(id));
            money.insert(id, format.clone().set_num_format(MONEY_FORMAT));
            plain.insert(id, format);
        }
        Self { plain, money }
    }

    fn get(&self, id: StyleId, is_money: bool) -> Format {
        let table = if is_money { &self.money } else { &self.plain };
        table.get(&id).cloned().unwrap_or_else(Format::new)
    }
}

fn build_format(style: &StyleDef) -> Format {
    let mut format = Format::new().set_font_size(style.font_size);

    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if let Some(rgb) = style.font_color {
        format = format.set_font_color(Color::RGB(rgb));
    }
    if let Some(rgb) = style.fill {
        format = format.set_background_color(Color::RGB(rgb));
    }
    if style.border {
        format = format.set_border(FormatBorder::Thin);
    }
    format = match style.align {
        Some(HAlign::Left) => format.set_align(FormatAlign::Left),
        Some(HAlign::Center) => format.set_align(FormatAlign::Center),
        None => format,
    };
    if style.vertical_center {
        format = format.set_align(FormatAlign::VerticalCenter);
    }

    format
}

/// 把若干工作表写成一个 xlsx 工作簿
///
/// 工作表按给定顺序排列，名称必须唯一。
/// 文档属性里的创建时间取 `created_at`（精确到秒），相同输入得到相同字节。
pub fn serialize_workbook<Tz: TimeZone>(
    sheets: &[NamedSheet],
    author: &str,
    created_at: &DateTime<Tz>,
) -> Result<Vec<u8>, ExportError> {
    let formats = FormatTable::new(StylePalette::standard());
    let mut workbook = Workbook::new();

    let created = ExcelDateTime::from_timestamp(created_at.timestamp())?;
    let properties = DocProperties::new()
        .set_author(author)
        .set_creation_datetime(&created);
    workbook.set_properties(&properties);

    for named in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&named.name)?;
        write_sheet(worksheet, &named.sheet, &formats)?;
        debug!(
            "工作表 {} 写入完成: {} 个合并区域",
            named.name,
            named.sheet.merges().len()
        );
    }

    let bytes = workbook.save_to_buffer()?;
    debug!("工作簿序列化完成: {} 张表, {} 字节", sheets.len(), bytes.len());
    Ok(bytes)
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet, formats: &FormatTable) -> Result<(), ExportError> {
    // 先合并：merge_range 会在整个区域写入空白，再由下面的单元格覆盖左上角
    for merge in sheet.merges() {
        let style = sheet
            .get(merge.first.row, merge.first.col)
            .map(|c| c.style)
            .unwrap_or(StyleId::Value);
        worksheet.merge_range(
            merge.first.row,
            merge.first.col,
            merge.last.row,
            merge.last.col,
            "",
            &formats.get(style, false),
        )?;
        trace!(
            "合并 {}:{}",
            cell_address(merge.first),
            cell_address(merge.last)
        );
    }

    for (coord, content) in sheet.cells() {
        match &content.value {
            CellValue::Text(text) => {
                worksheet.write_string_with_format(
                    coord.row,
                    coord.col,
                    text,
                    &formats.get(content.style, false),
                )?;
            }
            CellValue::Number(n) => {
                worksheet.write_number_with_format(
                    coord.row,
                    coord.col,
                    *n,
                    &formats.get(content.style, false),
                )?;
            }
            CellValue::Money(n) => {
                worksheet.write_number_with_format(
                    coord.row,
                    coord.col,
                    round_to_cents(*n),
                    &formats.get(content.style, true),
                )?;
            }
        }
    }

    for (col, width) in sheet.column_widths() {
        worksheet.set_column_width(col, width)?;
    }
    for (row, height) in sheet.row_heights() {
        worksheet.set_row_height(row, height)?;
    }

    if let Some(setup) = sheet.page_setup() {
        worksheet.set_paper_size(setup.paper_size);
        if setup.portrait {
            worksheet.set_portrait();
        } else {
            worksheet.set_landscape();
        }
        let m = setup.margins;
        worksheet.set_margins(m.left, m.right, m.top, m.bottom, m.header, m.footer);
    }

    Ok(())
}

/// 列号转字母（0 = A, 25 = Z, 26 = AA）
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as usize;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// 坐标转 `A1` 地址
pub fn cell_address(coord: CellCoord) -> String {
    format!("{}{}", col_to_letter(coord.col), coord.row + 1)
}

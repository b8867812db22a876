//! 报表样式表
//!
//! 所有样式在编译期定义，单元格只保存 [`StyleId`]，序列化时再查表。

/// 样式 id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StyleId {
    Title,
    Header,
    Label,
    Value,
    Total,
    Subtotal,
    Note,
}

impl StyleId {
    pub const ALL: [StyleId; 7] = [
        StyleId::Title,
        StyleId::Header,
        StyleId::Label,
        StyleId::Value,
        StyleId::Total,
        StyleId::Subtotal,
        StyleId::Note,
    ];
}

/// 水平对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
}

/// 一种样式的定义，颜色为 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleDef {
    pub bold: bool,
    pub italic: bool,
    pub font_size: f64,
    pub font_color: Option<u32>,
    pub fill: Option<u32>,
    /// 四边细边框
    pub border: bool,
    pub align: Option<HAlign>,
    pub vertical_center: bool,
}

const BASE: StyleDef = StyleDef {
    bold: false,
    italic: false,
    font_size: 11.0,
    font_color: None,
    fill: None,
    border: false,
    align: None,
    vertical_center: false,
};

/// 不可变样式表
#[derive(Debug, PartialEq)]
pub struct StylePalette {
    title: StyleDef,
    header: StyleDef,
    label: StyleDef,
    value: StyleDef,
    total: StyleDef,
    subtotal: StyleDef,
    note: StyleDef,
}

static STANDARD: StylePalette = StylePalette {
    title: StyleDef {
        bold: true,
        font_size: 16.0,
        font_color: Some(0x2F75B5),
        align: Some(HAlign::Center),
        vertical_center: true,
        ..BASE
    },
    header: StyleDef {
        bold: true,
        font_size: 14.0,
        font_color: Some(0xFFFFFF),
        fill: Some(0x2F75B5),
        border: true,
        align: Some(HAlign::Center),
        vertical_center: true,
        ..BASE
    },
    label: StyleDef {
        bold: true,
        font_color: Some(0x2F75B5),
        fill: Some(0xDDEBF7),
        border: true,
        ..BASE
    },
    value: StyleDef {
        border: true,
        ..BASE
    },
    total: StyleDef {
        bold: true,
        font_size: 12.0,
        font_color: Some(0xFF0000),
        fill: Some(0xFCE4D6),
        border: true,
        ..BASE
    },
    subtotal: StyleDef {
        bold: true,
        font_color: Some(0x2E7D32),
        fill: Some(0xC8E6C9),
        border: true,
        ..BASE
    },
    note: StyleDef {
        italic: true,
        font_size: 10.0,
        font_color: Some(0x666666),
        align: Some(HAlign::Left),
        ..BASE
    },
};

impl StylePalette {
    /// 报表统一使用的样式表
    pub fn standard() -> &'static StylePalette {
        &STANDARD
    }

    pub fn get(&self, id: StyleId) -> &StyleDef {
        match id {
            StyleId::Title => &self.title,
            StyleId::Header => &self.header,
            StyleId::Label => &self.label,
            StyleId::Value => &self.value,
            StyleId::Total => &self.total,
            StyleId::Subtotal => &self.subtotal,
            StyleId::Note => &self.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_is_shared() {
        assert!(std::ptr::eq(StylePalette::standard(), StylePalette::standard()));
    }

    #[test]
    fn test_style_values() {
        let palette = StylePalette::standard();
        let header = palette.get(StyleId::Header);
        assert!(header.bold);
        assert_eq!(header.fill, Some(0x2F75B5));
        assert_eq!(header.font_color, Some(0xFFFFFF));

        let total = palette.get(StyleId::Total);
        assert_eq!(total.font_color, Some(0xFF0000));
        assert_eq!(total.font_size, 12.0);

        let note = palette.get(StyleId::Note);
        assert!(note.italic && !note.border);
    }
}

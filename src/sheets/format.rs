use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        red: 0.0,
        green: 0.0,
        blue: 0.0,
    };

    pub fn grey(level: f32) -> Self {
        Self {
            red: level,
            green: level,
            blue: level,
        }
    }

    pub fn rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
        }
    }
}

/// 实线黑色边框的线宽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Borders {
    pub top: u8,
    pub bottom: u8,
    pub left: u8,
    pub right: u8,
}

impl Borders {
    pub fn thin() -> Self {
        Self {
            top: 1,
            bottom: 1,
            left: 1,
            right: 1,
        }
    }

    /// 上下加粗, 用于汇总行
    pub fn thick_horizontal() -> Self {
        Self {
            top: 2,
            bottom: 2,
            left: 1,
            right: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellFormat {
    pub number_format: Option<String>,
    pub bold: bool,
    pub font_size: Option<u32>,
    pub centered: bool,
    pub background: Option<Color>,
    pub borders: Option<Borders>,
}

pub const NUMBER_PATTERN: &str = "#,##0";

impl CellFormat {
    /// 数字格式 + 细边框
    pub fn bordered() -> Self {
        Self {
            number_format: Some(NUMBER_PATTERN.to_string()),
            borders: Some(Borders::thin()),
            ..Self::default()
        }
    }

    /// 居中加粗表头
    pub fn header(font_size: u32) -> Self {
        Self {
            bold: true,
            font_size: Some(font_size),
            centered: true,
            ..Self::bordered()
        }
    }

    pub fn shaded(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = Some(borders);
        self
    }
}

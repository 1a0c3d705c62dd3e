//! 表格读写的外部协作方
//!
//! 核心逻辑只依赖 [`SheetBackend`] 与 [`RowSource`] 两个 trait, 具体传输
//! (Sheets REST API、CSV 导出、内存实现) 可以替换。每个操作独立成败, 没有事务。

pub mod csv_source;
pub mod format;
pub mod google;
pub mod memory;

pub use crate::models::CellValue;
pub use csv_source::CsvExportSource;
pub use format::{Borders, CellFormat, Color};
pub use google::GoogleSheets;
pub use memory::MemorySheets;

use crate::error::{ReportError, Result};
use crate::service::column::column_letter;
use futures::future::BoxFuture;

/// 已解析的目标工作表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRef {
    pub spreadsheet_id: String,
    pub sheet_id: i64,
    pub title: String,
}

impl SheetRef {
    /// A1 记法的范围, 工作表名加引号
    pub fn a1(&self, range: &GridRange) -> String {
        format!("'{}'!{}", self.title.replace('\'', "''"), range.a1())
    }
}

/// 从 0 开始, 结束位置不包含
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl GridRange {
    pub fn new(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    pub fn a1(&self) -> String {
        format!(
            "{}{}:{}{}",
            column_letter(self.start_col),
            self.start_row + 1,
            column_letter(self.end_col.saturating_sub(1).max(self.start_col)),
            self.end_row.max(self.start_row + 1)
        )
    }
}

/// 一块待写入的值, 从 (start_row, start_col) 开始
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRange {
    pub start_row: usize,
    pub start_col: usize,
    pub values: Vec<Vec<CellValue>>,
}

impl ValueRange {
    pub fn new(start_row: usize, start_col: usize, values: Vec<Vec<CellValue>>) -> Self {
        Self {
            start_row,
            start_col,
            values,
        }
    }

    pub fn grid_range(&self) -> GridRange {
        let width = self.values.iter().map(Vec::len).max().unwrap_or(0).max(1);
        GridRange::new(
            self.start_row,
            self.start_row + self.values.len(),
            self.start_col,
            self.start_col + width,
        )
    }
}

/// 报表表格后端
pub trait SheetBackend: Send + Sync {
    /// 根据表格 URL 找到工作表 (gid 缺省时取第一个)
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SheetRef>>;

    fn read_values<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>>;

    fn write_values<'a>(&'a self, sheet: &'a SheetRef, data: ValueRange) -> BoxFuture<'a, Result<()>>;

    fn batch_write<'a>(&'a self, sheet: &'a SheetRef, data: Vec<ValueRange>) -> BoxFuture<'a, Result<()>>;

    /// 只增不减
    fn resize<'a>(&'a self, sheet: &'a SheetRef, min_rows: usize, min_cols: usize) -> BoxFuture<'a, Result<()>>;

    fn merge_cells<'a>(&'a self, sheet: &'a SheetRef, range: GridRange) -> BoxFuture<'a, Result<()>>;

    fn format_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        range: GridRange,
        format: &'a CellFormat,
    ) -> BoxFuture<'a, Result<()>>;

    fn auto_fit_columns<'a>(&'a self, sheet: &'a SheetRef, start_col: usize, end_col: usize) -> BoxFuture<'a, Result<()>>;

    /// 折叠分组 [start_row, end_row)
    fn add_row_group<'a>(&'a self, sheet: &'a SheetRef, start_row: usize, end_row: usize) -> BoxFuture<'a, Result<()>>;
}

/// 原始数据源
pub trait RowSource: Send + Sync {
    fn read_rows<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>>;
}

/// 表格 URL 中的 id 与 gid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetUrl {
    pub spreadsheet_id: String,
    pub gid: Option<i64>,
}

/// 解析 `.../spreadsheets/d/<id>/edit#gid=<n>`
pub fn parse_sheet_url(url: &str) -> Result<SheetUrl> {
    let spreadsheet_id = extract_sheet_id(url).ok_or_else(|| ReportError::InvalidUrl(url.to_string()))?;
    Ok(SheetUrl {
        spreadsheet_id,
        gid: extract_gid(url),
    })
}

pub fn extract_sheet_id(url: &str) -> Option<String> {
    let (_, rest) = url.split_once("/spreadsheets/d/")?;
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

pub fn extract_gid(url: &str) -> Option<i64> {
    let (_, rest) = url.split_once("gid=")?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

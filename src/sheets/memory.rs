use crate::error::{ReportError, Result};
use crate::models::CellValue;
use crate::sheets::{parse_sheet_url, CellFormat, GridRange, RowSource, SheetBackend, SheetRef, ValueRange};
use dashmap::{DashMap, DashSet};
use futures::future::{self, BoxFuture, FutureExt};

/// 进程内表格, 用于测试和无凭据时的试运行
#[derive(Debug, Default)]
pub struct MemorySheets {
    books: DashMap<String, Vec<MemorySheet>>,
    sources: DashMap<String, Vec<Vec<CellValue>>>,
    failing: DashSet<&'static str>,
}

/// 单个工作表的全部状态
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    pub sheet_id: i64,
    pub title: String,
    pub cells: Vec<Vec<CellValue>>,
    pub row_count: usize,
    pub column_count: usize,
    pub merges: Vec<GridRange>,
    pub formats: Vec<(GridRange, CellFormat)>,
    pub row_groups: Vec<(usize, usize)>,
    pub auto_fits: Vec<(usize, usize)>,
}

impl MemorySheet {
    fn new(sheet_id: i64, title: &str) -> Self {
        Self {
            sheet_id,
            title: title.to_string(),
            row_count: 1000,
            column_count: 26,
            ..Self::default()
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> CellValue {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or_default()
    }

    fn put(&mut self, data: &ValueRange) {
        for (r, row) in data.values.iter().enumerate() {
            let target_row = data.start_row + r;
            if self.cells.len() <= target_row {
                self.cells.resize(target_row + 1, Vec::new());
            }
            let cells = &mut self.cells[target_row];
            for (c, value) in row.iter().enumerate() {
                let target_col = data.start_col + c;
                if cells.len() <= target_col {
                    cells.resize(target_col + 1, CellValue::Empty);
                }
                cells[target_col] = value.clone();
            }
        }
        let range = data.grid_range();
        self.row_count = self.row_count.max(range.end_row);
        self.column_count = self.column_count.max(range.end_col);
    }
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先创建一个工作表
    pub fn add_sheet(&self, spreadsheet_id: &str, sheet_id: i64, title: &str) {
        let mut book = self.books.entry(spreadsheet_id.to_string()).or_default();
        if !book.iter().any(|s| s.sheet_id == sheet_id) {
            book.push(MemorySheet::new(sheet_id, title));
        }
    }

    /// 注册一个数据源 URL 的原始行
    pub fn set_source(&self, url: &str, rows: Vec<Vec<CellValue>>) {
        self.sources.insert(url.to_string(), rows);
    }

    /// 让某类操作失败: read / write / resize / merge / format / autofit / group / source
    pub fn fail(&self, operation: &'static str) {
        self.failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.remove(operation);
    }

    /// 取工作表当前状态的副本
    pub fn sheet(&self, spreadsheet_id: &str, sheet_id: i64) -> Option<MemorySheet> {
        self.books
            .get(spreadsheet_id)?
            .iter()
            .find(|s| s.sheet_id == sheet_id)
            .cloned()
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(ReportError::Backend(format!("simulated {} failure", operation)));
        }
        Ok(())
    }

    fn with_sheet<T>(
        &self,
        sheet: &SheetRef,
        operation: &'static str,
        f: impl FnOnce(&mut MemorySheet) -> T,
    ) -> Result<T> {
        self.check(operation)?;
        let mut book = self
            .books
            .get_mut(&sheet.spreadsheet_id)
            .ok_or_else(|| ReportError::Backend(format!("spreadsheet {} not found", sheet.spreadsheet_id)))?;
        let target = book
            .iter_mut()
            .find(|s| s.sheet_id == sheet.sheet_id)
            .ok_or_else(|| ReportError::Backend(format!("sheet {} not found", sheet.sheet_id)))?;
        Ok(f(target))
    }

    fn resolve_sync(&self, url: &str) -> Result<SheetRef> {
        let parsed = parse_sheet_url(url)?;
        let mut book = self.books.entry(parsed.spreadsheet_id.clone()).or_default();

        let found = match parsed.gid {
            Some(gid) => book.iter().find(|s| s.sheet_id == gid),
            None => book.first(),
        }
        .map(|s| (s.sheet_id, s.title.clone()));

        let (sheet_id, title) = match found {
            Some(found) => found,
            None => {
                let sheet_id = parsed.gid.unwrap_or(0);
                book.push(MemorySheet::new(sheet_id, "Sheet1"));
                (sheet_id, "Sheet1".to_string())
            }
        };

        Ok(SheetRef {
            spreadsheet_id: parsed.spreadsheet_id,
            sheet_id,
            title,
        })
    }
}

impl SheetBackend for MemorySheets {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SheetRef>> {
        future::ready(self.resolve_sync(url)).boxed()
    }

    fn read_values<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>> {
        future::ready(self.with_sheet(sheet, "read", |s| s.cells.clone())).boxed()
    }

    fn write_values<'a>(&'a self, sheet: &'a SheetRef, data: ValueRange) -> BoxFuture<'a, Result<()>> {
        future::ready(self.with_sheet(sheet, "write", |s| s.put(&data))).boxed()
    }

    fn batch_write<'a>(&'a self, sheet: &'a SheetRef, data: Vec<ValueRange>) -> BoxFuture<'a, Result<()>> {
        let result = self.with_sheet(sheet, "write", |s| {
            for range in &data {
                s.put(range);
            }
        });
        future::ready(result).boxed()
    }

    fn resize<'a>(&'a self, sheet: &'a SheetRef, min_rows: usize, min_cols: usize) -> BoxFuture<'a, Result<()>> {
        let result = self.with_sheet(sheet, "resize", |s| {
            s.row_count = s.row_count.max(min_rows);
            s.column_count = s.column_count.max(min_cols);
        });
        future::ready(result).boxed()
    }

    fn merge_cells<'a>(&'a self, sheet: &'a SheetRef, range: GridRange) -> BoxFuture<'a, Result<()>> {
        future::ready(self.with_sheet(sheet, "merge", |s| s.merges.push(range))).boxed()
    }

    fn format_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        range: GridRange,
        format: &'a CellFormat,
    ) -> BoxFuture<'a, Result<()>> {
        let result = self.with_sheet(sheet, "format", |s| s.formats.push((range, format.clone())));
        future::ready(result).boxed()
    }

    fn auto_fit_columns<'a>(&'a self, sheet: &'a SheetRef, start_col: usize, end_col: usize) -> BoxFuture<'a, Result<()>> {
        let result = self.with_sheet(sheet, "autofit", |s| s.auto_fits.push((start_col, end_col)));
        future::ready(result).boxed()
    }

    fn add_row_group<'a>(&'a self, sheet: &'a SheetRef, start_row: usize, end_row: usize) -> BoxFuture<'a, Result<()>> {
        let result = self.with_sheet(sheet, "group", |s| s.row_groups.push((start_row, end_row)));
        future::ready(result).boxed()
    }
}

impl RowSource for MemorySheets {
    fn read_rows<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>> {
        let result = self.check("source").and_then(|_| {
            self.sources
                .get(url)
                .map(|rows| rows.value().clone())
                .ok_or_else(|| ReportError::Source(format!("no data published at {}", url)))
        });
        future::ready(result).boxed()
    }
}

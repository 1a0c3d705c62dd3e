use crate::error::Result;
use crate::models::{
    CellValue, ChangedEntity, EntityTotals, MetricTotals, PairReport, PairSnapshot,
};
use crate::service::allocator::{self, SheetDimensions, BLOCK_WIDTH, FIRST_BLOCK_COLUMN};
use crate::service::change::detect_change;
use crate::service::column::column_letter;
use crate::service::number::parse_number;
use crate::sheets::{Borders, CellFormat, Color, GridRange, SheetBackend, SheetRef, ValueRange};
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::future::Future;

/// A 列汇总行标签
pub const SUMMARY_LABEL: &str = "TỔNG";
/// 旧版报表中的汇总行标签, 读名单时同样排除
pub const LEGACY_SUMMARY_LABEL: &str = "TỔNG CỘNG";
/// B–E 累计区的标题
pub const ALL_TIME_LABEL: &str = "Tổng";

pub const BLOCK_HEADERS: [&str; BLOCK_WIDTH] = [
    "Số Tiền Chạy(VNĐ)",
    "Click",
    "CĐ",
    "Tiền Hoa Hồng ($)",
    "Trạng thái",
    "Người chạy",
];

/// 第 1 行日期, 第 2 行表头, 第 3 行汇总, 第 4 行起是名单
pub const SUMMARY_ROW: usize = 2;
pub const ROSTER_START_ROW: usize = 3;

const ALL_TIME_COLUMN: usize = 1;
const METRIC_COUNT: usize = 4;

/// 从已有报表中读出的信息
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExistingReport {
    /// A 列已有店铺 (保持原顺序)
    pub roster: Vec<String>,
    /// 每个店铺在各历史块中的累计值
    pub history: HashMap<String, MetricTotals>,
}

impl ExistingReport {
    /// `skip_block` 为本次要写入的块, 不计入历史 (写入后会被覆盖)
    pub fn parse(values: &[Vec<CellValue>], skip_block: usize) -> Self {
        let mut roster: IndexSet<String> = IndexSet::new();
        for row in values.iter().skip(SUMMARY_ROW) {
            let name = row.first().map(|c| c.to_string()).unwrap_or_default();
            if name.is_empty() || name == SUMMARY_LABEL || name == LEGACY_SUMMARY_LABEL {
                continue;
            }
            roster.insert(name);
        }

        let mut history = HashMap::new();
        for row in values.iter().skip(ROSTER_START_ROW) {
            let name = row.first().map(|c| c.to_string()).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let mut totals = MetricTotals::default();
            let mut col = FIRST_BLOCK_COLUMN;
            while col < row.len() {
                if col != skip_block {
                    let cell = |offset: usize| row.get(col + offset).map(parse_number).unwrap_or(0.0);
                    totals.add(&MetricTotals::new(cell(0), cell(1), cell(2), cell(3)));
                }
                col += BLOCK_WIDTH;
            }
            history.insert(name, totals);
        }

        Self {
            roster: roster.into_iter().collect(),
            history,
        }
    }
}

/// 一次写入的完整布局 (纯计算, 不含 I/O)
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub start_col: usize,
    pub roster: Vec<String>,
    pub dimensions: SheetDimensions,
    pub roster_column: ValueRange,
    pub block: ValueRange,
    pub all_time: ValueRange,
    pub changed: Vec<ChangedEntity>,
    pub totals: MetricTotals,
}

impl ReportLayout {
    pub fn end_col(&self) -> usize {
        self.start_col + BLOCK_WIDTH
    }

    /// 计算名单、变更标记、本块数值和累计区
    pub fn build(
        existing: &[Vec<CellValue>],
        current: &IndexMap<String, EntityTotals>,
        previous: Option<&PairSnapshot>,
        target_date: NaiveDate,
    ) -> Self {
        let start_col = allocator::next_block_start(existing);
        let report = ExistingReport::parse(existing, start_col);

        // 名单只增不减: 表中已有 -> 快照中已知 -> 本次新出现
        let mut roster: IndexSet<String> = report.roster.iter().cloned().collect();
        if let Some(prev) = previous {
            roster.extend(prev.roster.iter().cloned());
        }
        roster.extend(current.keys().cloned());
        let roster: Vec<String> = roster.into_iter().collect();

        let mut changed = Vec::new();
        let mut entity_rows = Vec::with_capacity(roster.len());
        for name in &roster {
            let Some(store) = current.get(name) else {
                entity_rows.push(vec![CellValue::blank(); BLOCK_WIDTH]);
                continue;
            };

            let prev_totals = previous.and_then(|p| p.entity(name)).map(|e| &e.totals);
            let indicator = detect_change(&store.totals, prev_totals);
            if indicator.is_change() {
                changed.push(ChangedEntity {
                    store_name: name.clone(),
                    totals: store.totals,
                    change_indicator: indicator,
                    runner: store.runner.clone(),
                });
            }

            let mut row = store.totals.to_cells();
            row.push(CellValue::text(indicator.as_str()));
            row.push(CellValue::text(store.runner.as_str()));
            entity_rows.push(row);
        }

        let totals: MetricTotals = changed.iter().map(|c| &c.totals).sum();

        let mut block = Vec::with_capacity(entity_rows.len() + ROSTER_START_ROW);
        let mut date_row = vec![CellValue::text(target_date.format("%Y-%m-%d").to_string())];
        date_row.resize(BLOCK_WIDTH, CellValue::blank());
        block.push(date_row);
        block.push(BLOCK_HEADERS.iter().map(|h| CellValue::text(*h)).collect());
        let mut summary_row = totals.to_cells();
        summary_row.extend([CellValue::blank(), CellValue::blank()]);
        block.push(summary_row);
        block.extend(entity_rows);

        let mut names = vec![
            vec![CellValue::blank()],
            vec![CellValue::blank()],
            vec![CellValue::text(SUMMARY_LABEL)],
        ];
        names.extend(roster.iter().map(|n| vec![CellValue::text(n.as_str())]));

        let all_time = all_time_rows(&roster, &report.history, current);

        Self {
            start_col,
            dimensions: allocator::required_dimensions(roster.len(), start_col),
            roster,
            roster_column: ValueRange::new(0, 0, names),
            block: ValueRange::new(0, start_col, block),
            all_time: ValueRange::new(0, ALL_TIME_COLUMN, all_time),
            changed,
            totals,
        }
    }
}

/// B–E 累计区: 历史块合计 + 本次数值, 与 A 列名单逐行对齐
fn all_time_rows(
    roster: &[String],
    history: &HashMap<String, MetricTotals>,
    current: &IndexMap<String, EntityTotals>,
) -> Vec<Vec<CellValue>> {
    let per_entity: Vec<MetricTotals> = roster
        .iter()
        .map(|name| {
            let mut totals = history.get(name).copied().unwrap_or_default();
            if let Some(store) = current.get(name) {
                totals.add(&store.totals);
            }
            totals
        })
        .collect();
    let grand: MetricTotals = per_entity.iter().sum();

    let mut title = vec![CellValue::text(ALL_TIME_LABEL)];
    title.resize(METRIC_COUNT, CellValue::blank());

    let mut rows = vec![
        title,
        BLOCK_HEADERS[..METRIC_COUNT]
            .iter()
            .map(|h| CellValue::text(*h))
            .collect(),
        grand.to_cells(),
    ];
    rows.extend(per_entity.iter().map(MetricTotals::to_cells));
    rows
}

/// 外观类操作失败只记警告, 不影响数据写入
pub(crate) async fn best_effort<F>(what: &str, operation: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = operation.await {
        tracing::warn!("Warning: Could not {}: {}", what, e);
    }
}

/// 单个报表表格的写入器
pub struct ReportWriter<'a> {
    sheets: &'a dyn SheetBackend,
}

impl<'a> ReportWriter<'a> {
    pub fn new(sheets: &'a dyn SheetBackend) -> Self {
        Self { sheets }
    }

    /// 追加本次的报表块并刷新名单与累计区
    pub async fn write_pair(
        &self,
        sheet: &SheetRef,
        current: &IndexMap<String, EntityTotals>,
        previous: Option<&PairSnapshot>,
        target_date: NaiveDate,
    ) -> Result<PairReport> {
        tracing::info!(
            "Writing report for {} to sheet {} ({} stores)",
            target_date,
            sheet.title,
            current.len()
        );

        let existing = match self.sheets.read_values(sheet).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!("Warning: Could not read existing data, starting fresh: {}", e);
                Vec::new()
            }
        };

        let layout = ReportLayout::build(&existing, current, previous, target_date);
        let start_letter = column_letter(layout.start_col);
        let end_letter = column_letter(layout.end_col() - 1);
        tracing::info!("Next available column for writing: {}", start_letter);
        tracing::info!(
            "Required dimensions: {} rows, {} columns",
            layout.dimensions.rows,
            layout.dimensions.columns
        );

        best_effort(
            "ensure sheet size",
            self.sheets
                .resize(sheet, layout.dimensions.rows, layout.dimensions.columns),
        )
        .await;

        let block_range = layout.block.grid_range();
        let names_range = layout.roster_column.grid_range();
        self.sheets
            .batch_write(
                sheet,
                vec![
                    layout.roster_column.clone(),
                    layout.all_time.clone(),
                    layout.block.clone(),
                ],
            )
            .await?;
        tracing::info!("Writing data to range: {}", sheet.a1(&block_range));

        self.apply_formatting(sheet, &layout, block_range, names_range)
            .await;

        tracing::info!(
            "Successfully wrote report data to sheet starting at column {}",
            start_letter
        );

        Ok(PairReport {
            start_column: start_letter,
            end_column: end_letter,
            stores: layout.roster.len(),
            roster: layout.roster,
            changes_tracked: previous.is_some(),
            changed_stores_data: layout.changed,
            totals: layout.totals,
        })
    }

    async fn apply_formatting(
        &self,
        sheet: &SheetRef,
        layout: &ReportLayout,
        block_range: GridRange,
        names_range: GridRange,
    ) {
        let start = layout.start_col;
        let end = layout.end_col();
        let bordered = CellFormat::bordered();
        let header = CellFormat::header(11);
        let summary = CellFormat::header(11)
            .shaded(Color::grey(0.9))
            .with_borders(Borders::thick_horizontal());

        best_effort(
            "apply borders to report block",
            self.sheets.format_cells(sheet, block_range, &bordered),
        )
        .await;
        best_effort(
            "apply borders to store names",
            self.sheets.format_cells(
                sheet,
                GridRange::new(0, names_range.end_row, 0, end),
                &bordered,
            ),
        )
        .await;
        best_effort(
            "merge cells for date header",
            self.sheets.merge_cells(sheet, GridRange::new(0, 1, start, end)),
        )
        .await;
        best_effort(
            "merge all-time header",
            self.sheets.merge_cells(
                sheet,
                GridRange::new(0, 1, ALL_TIME_COLUMN, ALL_TIME_COLUMN + METRIC_COUNT),
            ),
        )
        .await;
        best_effort(
            "format header rows",
            self.sheets.format_cells(
                sheet,
                GridRange::new(0, ROSTER_START_ROW, ALL_TIME_COLUMN, end),
                &header,
            ),
        )
        .await;
        best_effort(
            "format summary row",
            self.sheets.format_cells(
                sheet,
                GridRange::new(SUMMARY_ROW, SUMMARY_ROW + 1, ALL_TIME_COLUMN, end),
                &summary,
            ),
        )
        .await;
        best_effort("auto-fit columns", self.sheets.auto_fit_columns(sheet, 0, end)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeIndicator;
    use crate::sheets::MemorySheets;
    use std::collections::BTreeMap;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn store(name: &str, spend: f64, clicks: f64) -> (String, EntityTotals) {
        let mut e = EntityTotals::new(name);
        e.totals = MetricTotals::new(spend, clicks, 0.0, 0.0);
        (name.to_string(), e)
    }

    fn snapshot_of(current: &IndexMap<String, EntityTotals>, roster: &[String]) -> PairSnapshot {
        PairSnapshot {
            pair_index: 0,
            data_url: String::new(),
            report_url: String::new(),
            roster: roster.to_vec(),
            entities: current.clone(),
        }
    }

    fn text(s: &str) -> CellValue {
        CellValue::text(s)
    }

    #[test]
    fn first_run_layout() {
        let current: IndexMap<_, _> = [store("A", 100.0, 10.0)].into_iter().collect();
        let layout = ReportLayout::build(&[], &current, None, date(1));

        assert_eq!(layout.start_col, 5);
        assert_eq!(layout.roster, vec!["A"]);
        assert_eq!(layout.changed.len(), 1);
        assert_eq!(layout.changed[0].change_indicator, ChangeIndicator::New);
        assert_eq!(layout.totals, MetricTotals::new(100.0, 10.0, 0.0, 0.0));
        assert_eq!(layout.dimensions, SheetDimensions { rows: 10, columns: 17 });

        let block = &layout.block.values;
        assert_eq!(block[0][0], text("2025-03-01"));
        assert_eq!(block[1][5], text("Người chạy"));
        assert_eq!(block[2][0], CellValue::Number(100.0));
        assert_eq!(block[3][4], text("Mới"));
        assert_eq!(layout.roster_column.values[2][0], text(SUMMARY_LABEL));
        assert_eq!(layout.roster_column.values[3][0], text("A"));
        assert_eq!(layout.all_time.values[0][0], text(ALL_TIME_LABEL));
        assert_eq!(layout.all_time.values[2][0], CellValue::Number(100.0));
    }

    #[test]
    fn absent_entities_get_blank_cells() {
        let existing = vec![
            vec![],
            vec![],
            vec![text(SUMMARY_LABEL)],
            vec![text("Old"), CellValue::Number(5.0)],
        ];
        let current: IndexMap<_, _> = [store("A", 1.0, 1.0)].into_iter().collect();
        let layout = ReportLayout::build(&existing, &current, None, date(2));

        assert_eq!(layout.roster, vec!["Old", "A"]);
        assert_eq!(layout.block.values[3], vec![CellValue::blank(); BLOCK_WIDTH]);
        assert_eq!(layout.block.values[4][0], CellValue::Number(1.0));
    }

    #[test]
    fn unchanged_entities_are_excluded_from_totals() {
        let current: IndexMap<_, _> = [store("A", 100.0, 10.0), store("B", 5.0, 1.0)]
            .into_iter()
            .collect();
        let previous = snapshot_of(&current, &["A".to_string(), "B".to_string()]);
        let mut next = current.clone();
        next.get_mut("B").unwrap().totals.total_spend = 6.0;

        let layout = ReportLayout::build(&[], &next, Some(&previous), date(2));
        assert_eq!(layout.block.values[3][4], text(""));
        assert_eq!(layout.block.values[4][4], text("Thay Đổi"));
        assert_eq!(layout.totals, MetricTotals::new(6.0, 1.0, 0.0, 0.0));
    }

    #[test]
    fn history_sums_every_block_except_the_target() {
        let mut row = vec![text("A"), CellValue::blank(), CellValue::blank(), CellValue::blank(), CellValue::blank()];
        row.extend([text("1.000"), text("2"), text("0"), text("1"), text("Mới"), text("Lan")]);
        row.extend([CellValue::Number(500.0), CellValue::Number(3.0), CellValue::blank(), CellValue::blank(), text(""), text("")]);
        let values = vec![vec![], vec![], vec![text(SUMMARY_LABEL)], row];

        let all = ExistingReport::parse(&values, 999);
        assert_eq!(all.history["A"], MetricTotals::new(1500.0, 5.0, 0.0, 1.0));

        let without_second = ExistingReport::parse(&values, 11);
        assert_eq!(without_second.history["A"], MetricTotals::new(1000.0, 2.0, 0.0, 1.0));
    }

    #[tokio::test]
    async fn two_runs_append_blocks() {
        let sheets = MemorySheets::new();
        let sheet = sheets
            .resolve("https://docs.google.com/spreadsheets/d/report/edit#gid=0")
            .await
            .unwrap();
        let writer = ReportWriter::new(&sheets);

        let run1: IndexMap<_, _> = [store("A", 100.0, 10.0)].into_iter().collect();
        let first = writer.write_pair(&sheet, &run1, None, date(1)).await.unwrap();
        assert_eq!(first.start_column, "F");
        assert_eq!(first.end_column, "K");
        assert!(!first.changes_tracked);

        let mut pairs = BTreeMap::new();
        pairs.insert(0, snapshot_of(&run1, &first.roster));
        let previous = pairs.get(&0);

        let run2: IndexMap<_, _> = [store("A", 150.0, 10.0), store("B", 20.0, 2.0)]
            .into_iter()
            .collect();
        let second = writer.write_pair(&sheet, &run2, previous, date(2)).await.unwrap();
        assert_eq!(second.start_column, "L");
        assert_eq!(second.roster, vec!["A", "B"]);
        assert_eq!(second.totals.total_spend, 170.0);
        assert_eq!(second.totals.total_clicks, 12.0);

        let state = sheets.sheet("report", 0).unwrap();
        assert_eq!(state.cell(3, 0), text("A"));
        assert_eq!(state.cell(4, 0), text("B"));
        assert_eq!(state.cell(0, 11), text("2025-03-02"));
        assert_eq!(state.cell(3, 15), text("Thay Đổi"));
        assert_eq!(state.cell(4, 15), text("Mới"));
        // B 在第一块没有数据, 留空而不是 0
        assert!(state.cell(4, 5).is_blank());
        // 累计区 = 两个块之和
        assert_eq!(state.cell(3, 1), CellValue::Number(250.0));
        assert_eq!(state.cell(4, 1), CellValue::Number(20.0));
        assert_eq!(state.cell(2, 1), CellValue::Number(270.0));
        assert!(state.merges.contains(&GridRange::new(0, 1, 11, 17)));
        assert!(state.column_count >= 23);
    }

    #[tokio::test]
    async fn cosmetic_failures_do_not_abort() {
        let sheets = MemorySheets::new();
        let sheet = sheets
            .resolve("https://docs.google.com/spreadsheets/d/report/edit")
            .await
            .unwrap();
        for op in ["read", "resize", "merge", "format", "autofit"] {
            sheets.fail(op);
        }

        let current: IndexMap<_, _> = [store("A", 1.0, 1.0)].into_iter().collect();
        let report = ReportWriter::new(&sheets)
            .write_pair(&sheet, &current, None, date(1))
            .await
            .unwrap();
        assert_eq!(report.start_column, "F");
        let state = sheets.sheet("report", 0).unwrap();
        assert_eq!(state.cell(3, 5), CellValue::Number(1.0));
        assert!(state.merges.is_empty());
    }

    #[tokio::test]
    async fn data_write_failure_propagates() {
        let sheets = MemorySheets::new();
        let sheet = sheets
            .resolve("https://docs.google.com/spreadsheets/d/report/edit")
            .await
            .unwrap();
        sheets.fail("write");
        let current: IndexMap<_, _> = [store("A", 1.0, 1.0)].into_iter().collect();
        assert!(ReportWriter::new(&sheets)
            .write_pair(&sheet, &current, None, date(1))
            .await
            .is_err());
    }
}

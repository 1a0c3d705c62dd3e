use crate::error::Result;
use crate::models::{CellValue, MetricTotals, PairTotals, SummaryOutcome};
use crate::service::number::parse_number;
use crate::service::report_writer::best_effort;
use crate::sheets::{CellFormat, Color, GridRange, SheetBackend, SheetRef, ValueRange};
use chrono::NaiveDate;

/// 累计总行 (全表唯一, 原地更新)
pub const GRAND_TOTAL_LABEL: &str = "TỔNG TẤT CẢ";
/// 每个日期的合计行
pub const DATE_TOTAL_LABEL: &str = "TỔNG";

/// 汇总表只使用 A–G 七列
pub const SUMMARY_WIDTH: usize = 7;

const LABEL_COLUMN: usize = 1;
const FIRST_METRIC_COLUMN: usize = 2;

pub fn summary_header(exchange_rate: f64) -> Vec<CellValue> {
    [
        "Ngày".to_string(),
        "Tên Sheet".to_string(),
        "Số tiền chạy (VNĐ)".to_string(),
        "Tổng Click".to_string(),
        "Tổng CĐ".to_string(),
        "Tổng hoa hồng ($)".to_string(),
        format!("Lợi nhuận (VNĐ) - Tỷ giá: {} VNĐ", exchange_rate),
    ]
    .into_iter()
    .map(CellValue::from)
    .collect()
}

fn total_row(date: &str, label: &str, totals: &MetricTotals, exchange_rate: f64) -> Vec<CellValue> {
    let mut row = vec![CellValue::text(date), CellValue::text(label)];
    row.extend(totals.to_cells());
    row.push(CellValue::Number(totals.profit(exchange_rate)));
    row
}

/// 已有汇总表的扫描结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExistingSummary {
    pub row_count: usize,
    /// 累计总行的 0 基行号
    pub grand_total_row: Option<usize>,
    /// 所有带日期的 `TỔNG` 行之和 (不含累计总行)
    pub historical: MetricTotals,
    pub dates: Vec<String>,
}

impl ExistingSummary {
    pub fn parse(values: &[Vec<CellValue>]) -> Self {
        let mut summary = Self {
            row_count: values.len(),
            ..Self::default()
        };

        // 第 1 行是表头
        for (index, row) in values.iter().enumerate().skip(1) {
            let row = &row[..row.len().min(SUMMARY_WIDTH)];
            let label = row.get(LABEL_COLUMN).map(|c| c.to_string()).unwrap_or_default();
            let date = row.first().map(|c| c.to_string()).unwrap_or_default();

            if label == GRAND_TOTAL_LABEL {
                summary.grand_total_row = Some(index);
                continue;
            }
            if label == DATE_TOTAL_LABEL && !date.is_empty() {
                let cell = |offset: usize| {
                    row.get(FIRST_METRIC_COLUMN + offset)
                        .map(parse_number)
                        .unwrap_or(0.0)
                };
                summary
                    .historical
                    .add(&MetricTotals::new(cell(0), cell(1), cell(2), cell(3)));
                summary.dates.push(date);
            }
        }
        summary
    }
}

/// 跨 pair 的汇总表写入器
pub struct SummaryWriter<'a> {
    sheets: &'a dyn SheetBackend,
}

impl<'a> SummaryWriter<'a> {
    pub fn new(sheets: &'a dyn SheetBackend) -> Self {
        Self { sheets }
    }

    pub async fn write_summary(
        &self,
        sheet: &SheetRef,
        pairs: &[PairTotals],
        target_date: NaiveDate,
        exchange_rate: f64,
    ) -> Result<SummaryOutcome> {
        let existing = self.sheets.read_values(sheet).await?;
        let scan = ExistingSummary::parse(&existing);
        let is_empty = scan.row_count == 0;
        let date = target_date.format("%Y-%m-%d").to_string();

        if scan.dates.contains(&date) {
            tracing::info!(
                "Summary already has rows for {}, appending another block",
                date
            );
        }

        let overall: MetricTotals = pairs.iter().map(|p| &p.totals).sum();
        let mut grand = scan.historical;
        grand.add(&overall);
        tracing::info!(
            "Grand total across all dates: spend {}, clicks {}, commission {}, benefit {}",
            grand.total_spend,
            grand.total_clicks,
            grand.total_commission,
            grand.total_benefit
        );

        let sentinel = total_row("", GRAND_TOTAL_LABEL, &grand, exchange_rate);
        let mut writes = Vec::new();
        let mut rows = Vec::new();

        if is_empty {
            rows.push(summary_header(exchange_rate));
        }
        match scan.grand_total_row {
            Some(index) => writes.push(ValueRange::new(index, 0, vec![sentinel])),
            None => rows.push(sentinel),
        }

        let date_row = scan.row_count + rows.len();
        rows.push(total_row(&date, DATE_TOTAL_LABEL, &overall, exchange_rate));
        for (i, pair) in pairs.iter().enumerate() {
            let name = if pair.sheet_name.is_empty() {
                format!("Sheet {}", i + 1)
            } else {
                pair.sheet_name.clone()
            };
            rows.push(total_row("", &name, &pair.totals, exchange_rate));
        }

        let start_row = scan.row_count;
        writes.push(ValueRange::new(start_row, 0, rows));
        self.sheets.batch_write(sheet, writes).await?;
        tracing::info!(
            "Summary written starting at row {} ({} pairs)",
            start_row + 1,
            pairs.len()
        );

        if is_empty {
            best_effort(
                "format summary header",
                self.sheets.format_cells(
                    sheet,
                    GridRange::new(0, 1, 0, SUMMARY_WIDTH),
                    &CellFormat::header(12).shaded(Color::rgb8(223, 228, 236)),
                ),
            )
            .await;
            best_effort(
                "format grand total row",
                self.sheets.format_cells(
                    sheet,
                    GridRange::new(1, 2, 0, SUMMARY_WIDTH),
                    &CellFormat::header(10),
                ),
            )
            .await;
        }

        if !pairs.is_empty() {
            best_effort(
                "apply borders to summary block",
                self.sheets.format_cells(
                    sheet,
                    GridRange::new(date_row, date_row + pairs.len() + 1, 0, SUMMARY_WIDTH),
                    &CellFormat::bordered(),
                ),
            )
            .await;
            best_effort(
                "group summary rows",
                self.sheets
                    .add_row_group(sheet, date_row + 1, date_row + 1 + pairs.len()),
            )
            .await;
        }

        best_effort(
            "auto-fit summary columns",
            self.sheets.auto_fit_columns(sheet, 0, SUMMARY_WIDTH),
        )
        .await;

        Ok(SummaryOutcome {
            date: target_date,
            total_pairs: pairs.len(),
            exchange_rate,
            overall_totals: overall,
            grand_totals: grand,
            grand_total_updated_in_place: scan.grand_total_row.is_some(),
            start_row: start_row + 1,
        })
    }
}

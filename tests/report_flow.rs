use chrono::NaiveDate;
use sheet_report_sync::db::{JsonFileSnapshotStore, SnapshotStore};
use sheet_report_sync::models::{CellValue, GenerateRequest, UrlPair};
use sheet_report_sync::service::{FixedRate, ReportGenerator};
use sheet_report_sync::sheets::MemorySheets;
use std::sync::Arc;

const DATA: &str = "https://docs.google.com/spreadsheets/d/data/edit#gid=0";
const REPORT: &str = "https://docs.google.com/spreadsheets/d/report/edit#gid=0";
const SUMMARY: &str = "https://docs.google.com/spreadsheets/d/summary/edit#gid=0";

fn data_row(name: &str, runner: &str, spend: &str, clicks: &str) -> Vec<CellValue> {
    let mut row = vec![CellValue::blank(); 18];
    row[3] = CellValue::text(name);
    row[12] = CellValue::text(runner);
    row[14] = CellValue::text(spend);
    row[15] = CellValue::text(clicks);
    row[16] = CellValue::text("0");
    row[17] = CellValue::text("0");
    row
}

fn publish(sheets: &MemorySheets, rows: Vec<Vec<CellValue>>) {
    let mut all = vec![
        vec![CellValue::text("Báo cáo")],
        vec![CellValue::text("Ngày"), CellValue::text("Shop")],
    ];
    all.extend(rows);
    sheets.set_source(DATA, all);
}

fn request(day: u32) -> GenerateRequest {
    GenerateRequest {
        pairs: vec![UrlPair {
            data_url: DATA.to_string(),
            report_url: REPORT.to_string(),
            data_sheet_id: Some("data".to_string()),
            report_sheet_id: Some("report".to_string()),
        }],
        summary_report_url: Some(SUMMARY.to_string()),
        target_date: NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
    }
}

fn text(s: &str) -> CellValue {
    CellValue::text(s)
}

#[tokio::test]
async fn two_runs_append_blocks_and_track_changes() {
    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::new());
    let snapshots = Arc::new(JsonFileSnapshotStore::in_dir(dir.path()));
    let generator = ReportGenerator::new(
        sheets.clone(),
        sheets.clone(),
        snapshots.clone(),
        Arc::new(FixedRate(26000.0)),
    );

    // 第一次: A 花费 100, 点击 10 (分两行)
    publish(
        &sheets,
        vec![
            data_row("A", "Lan", "60", "4"),
            data_row("A", "", "40", "6"),
            data_row("", "Lan", "999", "9"),
        ],
    );
    let first = generator.generate(request(1)).await.unwrap();
    assert!(first.success);
    let pair = &first.results[0];
    assert_eq!(pair.start_column.as_deref(), Some("F"));
    assert_eq!(pair.changed_stores, 1);
    assert_eq!(pair.totals.total_spend, 100.0);
    assert_eq!(pair.totals.total_clicks, 10.0);
    assert_eq!(first.total_records, 2);

    let report = sheets.sheet("report", 0).unwrap();
    assert_eq!(report.cell(3, 0), text("A"));
    assert_eq!(report.cell(3, 9), text("Mới"));
    assert_eq!(report.cell(3, 10), text("Lan"));

    // 第二次: A 变为 150, 新增 B
    publish(
        &sheets,
        vec![
            data_row("A", "Lan", "150", "10"),
            data_row("B", "Minh", "1.000,5đ", "2"),
        ],
    );
    let second = generator.generate(request(2)).await.unwrap();
    let pair = &second.results[0];
    assert_eq!(pair.start_column.as_deref(), Some("L"));
    assert_eq!(pair.end_column.as_deref(), Some("Q"));
    assert_eq!(pair.changed_stores, 2);
    assert_eq!(pair.totals.total_spend, 1150.5);
    assert_eq!(pair.totals.total_clicks, 12.0);

    let report = sheets.sheet("report", 0).unwrap();
    assert_eq!(report.cell(2, 0), text("TỔNG"));
    assert_eq!(report.cell(3, 0), text("A"));
    assert_eq!(report.cell(4, 0), text("B"));
    assert_eq!(report.cell(3, 15), text("Thay Đổi"));
    assert_eq!(report.cell(4, 15), text("Mới"));
    assert_eq!(report.cell(2, 11), CellValue::Number(1150.5));
    // B–E 累计
    assert_eq!(report.cell(3, 1), CellValue::Number(250.0));
    assert_eq!(report.cell(4, 1), CellValue::Number(1000.5));
    assert_eq!(report.cell(2, 2), CellValue::Number(22.0));

    // 第三次: 数据不变, 没有变化的店铺不计入汇总行
    let third = generator.generate(request(3)).await.unwrap();
    let pair = &third.results[0];
    assert_eq!(pair.start_column.as_deref(), Some("R"));
    assert_eq!(pair.changed_stores, 0);
    assert_eq!(pair.totals.total_spend, 0.0);
    let report = sheets.sheet("report", 0).unwrap();
    assert_eq!(report.cell(3, 21), text(""));
    assert_eq!(report.cell(3, 1), CellValue::Number(400.0));

    let saved = snapshots.load_last().await.unwrap().unwrap();
    assert_eq!(saved.pair(0).unwrap().roster, vec!["A", "B"]);
    assert!(dir.path().join("lastReport.json").exists());
}

#[tokio::test]
async fn summary_sentinel_stays_unique() {
    let dir = tempfile::tempdir().unwrap();
    let sheets = Arc::new(MemorySheets::new());
    let generator = ReportGenerator::new(
        sheets.clone(),
        sheets.clone(),
        Arc::new(JsonFileSnapshotStore::in_dir(dir.path())),
        Arc::new(FixedRate(26000.0)),
    );

    publish(&sheets, vec![data_row("A", "Lan", "100", "10")]);
    generator.generate(request(1)).await.unwrap();
    publish(&sheets, vec![data_row("A", "Lan", "130", "10")]);
    let second = generator.generate(request(2)).await.unwrap();

    let summary = second.summary.unwrap();
    assert!(summary.grand_total_updated_in_place);
    assert_eq!(summary.grand_totals.total_spend, 230.0);

    let sheet = sheets.sheet("summary", 0).unwrap();
    let sentinels: Vec<usize> = sheet
        .cells
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(1) == Some(&text("TỔNG TẤT CẢ")))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(sentinels, vec![1]);
    assert_eq!(sheet.cell(1, 2), CellValue::Number(230.0));
    // 利润 = 0 × 26000 - 230
    assert_eq!(sheet.cell(1, 6), CellValue::Number(-230.0));
    assert_eq!(sheet.cell(4, 0), text("2025-08-02"));
    assert_eq!(sheet.cell(4, 2), CellValue::Number(130.0));
}

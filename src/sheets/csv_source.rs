use crate::error::{ReportError, Result};
use crate::models::CellValue;
use crate::sheets::{parse_sheet_url, RowSource};
use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;

/// 通过"发布为 CSV"的导出地址读取数据源
#[derive(Clone)]
pub struct CsvExportSource {
    http: reqwest::Client,
    export_base: String,
}

impl CsvExportSource {
    pub fn new(export_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("sheet-report-sync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            http,
            export_base: export_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// 编辑地址 -> CSV 导出地址
    pub fn export_url(&self, url: &str) -> Result<String> {
        let parsed = parse_sheet_url(url)?;
        Ok(format!(
            "{}/{}/export?format=csv&gid={}",
            self.export_base,
            parsed.spreadsheet_id,
            parsed.gid.unwrap_or(0)
        ))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<Vec<CellValue>>> {
        let csv_url = self.export_url(url)?;
        tracing::info!("Fetching report data from CSV URL: {}", csv_url);

        let response = self
            .http
            .get(&csv_url)
            .send()
            .await
            .map_err(|e| ReportError::Source(format!("Failed to fetch report data: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Source(format!(
                "Failed to fetch report data: HTTP {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReportError::Source(format!("Failed to read report data: {}", e)))?;
        let rows = parse_csv(&body)?;
        tracing::info!("Successfully fetched {} rows of report data", rows.len());
        Ok(rows)
    }
}

impl RowSource for CsvExportSource {
    fn read_rows<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>> {
        self.fetch(url).boxed()
    }
}

/// 不带表头、允许行宽不一致
pub fn parse_csv(body: &str) -> Result<Vec<Vec<CellValue>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(rows)
}

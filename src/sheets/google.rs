use crate::error::{ReportError, Result};
use crate::models::CellValue;
use crate::sheets::{parse_sheet_url, CellFormat, Color, GridRange, SheetBackend, SheetRef, ValueRange};
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Method, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Google Sheets v4 REST 后端 (bearer token 由外部提供)
#[derive(Clone)]
pub struct GoogleSheets {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetInfo>,
}

#[derive(Debug, Deserialize)]
struct SheetInfo {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<CellValue>>,
}

impl GoogleSheets {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("sheet-report-sync/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base).map_err(|e| ReportError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ReportError::InvalidUrl(self.api_base.clone()))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
        let mut request = self.http.request(method, url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(ReportError::Backend(match status {
            StatusCode::FORBIDDEN => format!(
                "Access denied to spreadsheet. Please ensure the service account has editor access to the sheet. ({})",
                text
            ),
            StatusCode::BAD_REQUEST => format!("Invalid range or request: {}", text),
            _ => format!("HTTP {}: {}", status, text),
        }))
    }

    async fn spreadsheet_info(&self, spreadsheet_id: &str) -> Result<SpreadsheetInfo> {
        let mut url = self.url(&[spreadsheet_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let value = self.send(Method::GET, url, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn batch_update(&self, sheet: &SheetRef, requests: Vec<Value>) -> Result<()> {
        let url = self.url(&[format!("{}:batchUpdate", sheet.spreadsheet_id).as_str()])?;
        self.send(Method::POST, url, Some(json!({ "requests": requests })))
            .await
            .map(|_| ())
    }

    async fn fetch_resolve(&self, url: &str) -> Result<SheetRef> {
        let parsed = parse_sheet_url(url)?;
        let info = self.spreadsheet_info(&parsed.spreadsheet_id).await?;

        let properties = match parsed.gid {
            Some(gid) => info.sheets.into_iter().find(|s| s.properties.sheet_id == gid),
            None => info.sheets.into_iter().next(),
        }
        .map(|s| s.properties);

        Ok(match properties {
            Some(p) => SheetRef {
                spreadsheet_id: parsed.spreadsheet_id,
                sheet_id: p.sheet_id,
                title: p.title,
            },
            None => SheetRef {
                spreadsheet_id: parsed.spreadsheet_id,
                sheet_id: parsed.gid.unwrap_or(0),
                title: "Sheet1".to_string(),
            },
        })
    }

    async fn fetch_values(&self, sheet: &SheetRef) -> Result<Vec<Vec<CellValue>>> {
        let range = format!("'{}'", sheet.title.replace('\'', "''"));
        let mut url = self.url(&[sheet.spreadsheet_id.as_str(), "values", range.as_str()])?;
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");
        let value = self.send(Method::GET, url, None).await?;
        let response: ValuesResponse = serde_json::from_value(value)?;
        Ok(response.values)
    }

    async fn put_values(&self, sheet: &SheetRef, data: ValueRange) -> Result<()> {
        let range = sheet.a1(&data.grid_range());
        let mut url = self.url(&[sheet.spreadsheet_id.as_str(), "values", range.as_str()])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send(Method::PUT, url, Some(json!({ "values": data.values })))
            .await?;
        tracing::info!("Successfully wrote {} rows to range {}", data.values.len(), range);
        Ok(())
    }

    async fn put_batch(&self, sheet: &SheetRef, data: Vec<ValueRange>) -> Result<()> {
        let url = self.url(&[sheet.spreadsheet_id.as_str(), "values:batchUpdate"])?;
        let ranges: Vec<Value> = data
            .iter()
            .map(|d| json!({ "range": sheet.a1(&d.grid_range()), "values": d.values }))
            .collect();
        self.send(
            Method::POST,
            url,
            Some(json!({ "valueInputOption": "RAW", "data": ranges })),
        )
        .await
        .map(|_| ())
    }

    async fn grow(&self, sheet: &SheetRef, min_rows: usize, min_cols: usize) -> Result<()> {
        let info = self.spreadsheet_info(&sheet.spreadsheet_id).await?;
        let grid = info
            .sheets
            .into_iter()
            .find(|s| s.properties.sheet_id == sheet.sheet_id)
            .map(|s| s.properties.grid_properties)
            .unwrap_or_default();

        let mut requests = Vec::new();
        if grid.row_count < min_rows {
            requests.push(append_dimension(sheet.sheet_id, "ROWS", min_rows - grid.row_count));
        }
        if grid.column_count < min_cols {
            requests.push(append_dimension(
                sheet.sheet_id,
                "COLUMNS",
                min_cols - grid.column_count,
            ));
        }
        if requests.is_empty() {
            return Ok(());
        }
        tracing::info!(
            "Expanding sheet {} from {}x{} to at least {}x{}",
            sheet.title, grid.row_count, grid.column_count, min_rows, min_cols
        );
        self.batch_update(sheet, requests).await
    }
}

fn grid_range_json(sheet_id: i64, range: &GridRange) -> Value {
    json!({
        "sheetId": sheet_id,
        "startRowIndex": range.start_row,
        "endRowIndex": range.end_row,
        "startColumnIndex": range.start_col,
        "endColumnIndex": range.end_col,
    })
}

fn append_dimension(sheet_id: i64, dimension: &str, length: usize) -> Value {
    json!({
        "appendDimension": {
            "sheetId": sheet_id,
            "dimension": dimension,
            "length": length,
        }
    })
}

/// CellFormat -> userEnteredFormat
pub fn format_json(format: &CellFormat) -> Value {
    let mut out = serde_json::Map::new();
    if let Some(pattern) = &format.number_format {
        out.insert("numberFormat".into(), json!({ "type": "NUMBER", "pattern": pattern }));
    }
    if format.bold || format.font_size.is_some() {
        let mut text = serde_json::Map::new();
        text.insert("bold".into(), json!(format.bold));
        if let Some(size) = format.font_size {
            text.insert("fontSize".into(), json!(size));
        }
        out.insert("textFormat".into(), Value::Object(text));
    }
    if format.centered {
        out.insert("horizontalAlignment".into(), json!("CENTER"));
        out.insert("verticalAlignment".into(), json!("MIDDLE"));
    }
    if let Some(color) = &format.background {
        out.insert("backgroundColor".into(), json!(color));
    }
    if let Some(b) = &format.borders {
        let side = |width: u8| json!({ "style": "SOLID", "width": width, "color": Color::BLACK });
        out.insert(
            "borders".into(),
            json!({
                "top": side(b.top),
                "bottom": side(b.bottom),
                "left": side(b.left),
                "right": side(b.right),
            }),
        );
    }
    Value::Object(out)
}

impl SheetBackend for GoogleSheets {
    fn resolve<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SheetRef>> {
        self.fetch_resolve(url).boxed()
    }

    fn read_values<'a>(&'a self, sheet: &'a SheetRef) -> BoxFuture<'a, Result<Vec<Vec<CellValue>>>> {
        self.fetch_values(sheet).boxed()
    }

    fn write_values<'a>(&'a self, sheet: &'a SheetRef, data: ValueRange) -> BoxFuture<'a, Result<()>> {
        self.put_values(sheet, data).boxed()
    }

    fn batch_write<'a>(&'a self, sheet: &'a SheetRef, data: Vec<ValueRange>) -> BoxFuture<'a, Result<()>> {
        self.put_batch(sheet, data).boxed()
    }

    fn resize<'a>(&'a self, sheet: &'a SheetRef, min_rows: usize, min_cols: usize) -> BoxFuture<'a, Result<()>> {
        self.grow(sheet, min_rows, min_cols).boxed()
    }

    fn merge_cells<'a>(&'a self, sheet: &'a SheetRef, range: GridRange) -> BoxFuture<'a, Result<()>> {
        let request = json!({
            "mergeCells": {
                "range": grid_range_json(sheet.sheet_id, &range),
                "mergeType": "MERGE_ALL",
            }
        });
        self.batch_update(sheet, vec![request]).boxed()
    }

    fn format_cells<'a>(
        &'a self,
        sheet: &'a SheetRef,
        range: GridRange,
        format: &'a CellFormat,
    ) -> BoxFuture<'a, Result<()>> {
        let request = json!({
            "repeatCell": {
                "range": grid_range_json(sheet.sheet_id, &range),
                "cell": { "userEnteredFormat": format_json(format) },
                "fields": "userEnteredFormat",
            }
        });
        self.batch_update(sheet, vec![request]).boxed()
    }

    fn auto_fit_columns<'a>(&'a self, sheet: &'a SheetRef, start_col: usize, end_col: usize) -> BoxFuture<'a, Result<()>> {
        let request = json!({
            "autoResizeDimensions": {
                "dimensions": {
                    "sheetId": sheet.sheet_id,
                    "dimension": "COLUMNS",
                    "startIndex": start_col,
                    "endIndex": end_col,
                }
            }
        });
        self.batch_update(sheet, vec![request]).boxed()
    }

    fn add_row_group<'a>(&'a self, sheet: &'a SheetRef, start_row: usize, end_row: usize) -> BoxFuture<'a, Result<()>> {
        let request = json!({
            "addDimensionGroup": {
                "range": {
                    "sheetId": sheet.sheet_id,
                    "dimension": "ROWS",
                    "startIndex": start_row,
                    "endIndex": end_row,
                }
            }
        });
        self.batch_update(sheet, vec![request]).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::Borders;

    #[test]
    fn summary_row_format_payload() {
        let format = CellFormat::header(11)
            .shaded(Color::grey(0.9))
            .with_borders(Borders::thick_horizontal());
        let json = format_json(&format);
        assert_eq!(json["numberFormat"]["pattern"], "#,##0");
        assert_eq!(json["textFormat"]["bold"], true);
        assert_eq!(json["textFormat"]["fontSize"], 11);
        assert_eq!(json["horizontalAlignment"], "CENTER");
        assert_eq!(json["borders"]["top"]["width"], 2);
        assert_eq!(json["borders"]["left"]["width"], 1);
        assert!((json["backgroundColor"]["red"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn bordered_format_has_no_text_style() {
        let json = format_json(&CellFormat::bordered());
        assert!(json.get("textFormat").is_none());
        assert!(json.get("backgroundColor").is_none());
        assert_eq!(json["borders"]["bottom"]["style"], "SOLID");
    }

    #[test]
    fn urls_encode_ranges() {
        let sheets = GoogleSheets::new("https://sheets.googleapis.com/v4/spreadsheets", "t").unwrap();
        let url = sheets.url(&["abc", "values", "'My Sheet'!A1:B2"]).unwrap();
        assert!(url.as_str().starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/"));
        assert!(!url.as_str().contains(' '));
    }
}

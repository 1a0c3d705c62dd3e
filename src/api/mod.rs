pub mod handlers;

pub use handlers::*;

use crate::db::SettingsStore;
use crate::service::ReportGenerator;
use axum::{
    routing::{get, post},
    Router,
};
use chrono::FixedOffset;
use std::sync::Arc;

/// 共享状态: 生成器 + 配置存储
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<ReportGenerator>,
    pub settings: SettingsStore,
    /// 缺省日期按此时区取"今天"
    pub offset: FixedOffset,
}

pub fn router(state: AppState) -> Router {
    let reports = Router::new()
        .route("/config", get(get_config).post(save_config))
        .route("/generate", post(generate))
        .route("/stores", get(list_stores))
        .route("/test-data-connection", post(test_data_connection));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/reports", reports)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemorySnapshotStore;
    use crate::models::CellValue;
    use crate::service::FixedRate;
    use crate::sheets::MemorySheets;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const DATA: &str = "https://docs.google.com/spreadsheets/d/data/edit#gid=0";
    const REPORT: &str = "https://docs.google.com/spreadsheets/d/report/edit#gid=0";

    fn app(dir: &std::path::Path, sheets: Arc<MemorySheets>) -> Router {
        let generator = ReportGenerator::new(
            sheets.clone(),
            sheets,
            Arc::new(MemorySnapshotStore::new()),
            Arc::new(FixedRate(26000.0)),
        );
        router(AppState {
            generator: Arc::new(generator),
            settings: SettingsStore::in_dir(dir),
            offset: FixedOffset::east_opt(7 * 3600).unwrap(),
        })
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn data_row(name: &str, spend: &str) -> Vec<CellValue> {
        let mut row = vec![CellValue::blank(); 18];
        row[3] = CellValue::text(name);
        row[14] = CellValue::text(spend);
        row
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path(), Arc::new(MemorySheets::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_invalid_urls() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(MemorySheets::new()));

        let (status, _) = call(app.clone(), "POST", "/api/reports/config", Some(json!({"urlPairs": []}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            app,
            "POST",
            "/api/reports/config",
            Some(json!({"urlPairs": [{"dataUrl": "https://example.com", "reportUrl": REPORT}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid Google Sheets URLs");
    }

    #[tokio::test]
    async fn corrupt_config_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"storeSheetUrl": "keep-me", "#).unwrap();
        let app = app(dir.path(), Arc::new(MemorySheets::new()));

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/reports/config",
            Some(json!({"urlPairs": [{"dataUrl": DATA, "reportUrl": REPORT}]})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"storeSheetUrl": "keep-me", "#);

        let (status, _) = call(app, "GET", "/api/reports/config", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn config_generate_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let sheets = Arc::new(MemorySheets::new());
        sheets.set_source(
            DATA,
            vec![
                vec![],
                vec![],
                data_row("Shop B", "10"),
                data_row("Shop A", "20"),
                data_row("Shop B", "5"),
            ],
        );
        let app = app(dir.path(), sheets.clone());

        let (status, _) = call(app.clone(), "POST", "/api/reports/generate", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/reports/config",
            Some(json!({"urlPairs": [{"dataUrl": DATA, "reportUrl": REPORT}], "summaryReportUrl": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["urlPairsCount"], 1);
        assert_eq!(body["hasSummaryReport"], false);

        let (_, body) = call(app.clone(), "GET", "/api/reports/config", None).await;
        assert_eq!(body["configured"], true);
        assert_eq!(body["urlPairs"][0]["reportSheetId"], "report");

        let (status, body) = call(
            app.clone(),
            "POST",
            "/api/reports/generate",
            Some(json!({"date": "2025-07-01"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Report generated successfully for 2025-07-01");
        assert_eq!(body["totalStoresProcessed"], 2);
        assert_eq!(body["totalRecords"], 3);

        let (_, body) = call(app.clone(), "GET", "/api/reports/stores", None).await;
        assert_eq!(body["stores"], json!(["Shop A", "Shop B"]));

        let (status, body) = call(app, "POST", "/api/reports/test-data-connection", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalRows"], 5);
        assert_eq!(body["results"][0]["sampleData"].as_array().unwrap().len(), 5);
    }
}

use crate::api::AppState;
use crate::error::ReportError;
use crate::models::{CellValue, GenerateRequest, RawRow, ReportSettings, UrlPair};
use crate::sheets::extract_sheet_id;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let response = MessageResponse {
        success: false,
        message: message.into(),
    };
    (status, Json(response)).into_response()
}

// 配置文件读不出来时直接报 500, 不能当成空配置继续
async fn load_settings(state: &AppState) -> Result<ReportSettings, Response> {
    state.settings.load().await.map_err(|e| {
        tracing::error!("Error loading report configuration: {}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
    })
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub success: bool,
    pub url_pairs: Vec<UrlPair>,
    pub summary_report_url: String,
    pub configured: bool,
}

/// 读取当前报表配置
pub async fn get_config(State(state): State<AppState>) -> Response {
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    let response = ConfigResponse {
        success: true,
        configured: settings.is_configured(),
        summary_report_url: settings.summary_report_url.clone().unwrap_or_default(),
        url_pairs: settings.url_pairs,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPairInput {
    #[serde(default)]
    pub data_url: String,
    #[serde(default)]
    pub report_url: String,
}

/// 请求体: pair 列表 + 可选汇总表
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigRequest {
    #[serde(default)]
    pub url_pairs: Vec<UrlPairInput>,
    #[serde(default)]
    pub summary_report_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigResponse {
    pub success: bool,
    pub message: String,
    pub url_pairs_count: usize,
    pub has_summary_report: bool,
}

fn validate_pairs(inputs: &[UrlPairInput]) -> Result<Vec<UrlPair>, String> {
    if inputs.is_empty() {
        return Err("At least one pair of data URL and report URL is required".to_string());
    }

    inputs
        .iter()
        .map(|input| {
            if input.data_url.trim().is_empty() || input.report_url.trim().is_empty() {
                return Err("Both data URL and report URL are required for each pair".to_string());
            }
            match (
                extract_sheet_id(&input.data_url),
                extract_sheet_id(&input.report_url),
            ) {
                (Some(data_id), Some(report_id)) => Ok(UrlPair {
                    data_url: input.data_url.clone(),
                    report_url: input.report_url.clone(),
                    data_sheet_id: Some(data_id),
                    report_sheet_id: Some(report_id),
                }),
                _ => Err("Invalid Google Sheets URLs".to_string()),
            }
        })
        .collect()
}

/// 保存报表配置 (其它未识别的键保留)
pub async fn save_config(
    State(state): State<AppState>,
    Json(req): Json<SaveConfigRequest>,
) -> Response {
    let pairs = match validate_pairs(&req.url_pairs) {
        Ok(pairs) => pairs,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let summary_url = req.summary_report_url.filter(|url| !url.trim().is_empty());
    let summary_sheet_id = match summary_url.as_deref() {
        Some(url) => match extract_sheet_id(url) {
            Some(id) => Some(id),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "Invalid summary report Google Sheets URL",
                )
            }
        },
        None => None,
    };

    let mut settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    let now = Utc::now();
    settings.url_pairs = pairs;
    settings.summary_report_url = summary_url;
    settings.summary_sheet_id = summary_sheet_id;
    settings.report_configured_at = Some(now);
    settings.last_updated = Some(now);

    if let Err(e) = state.settings.save(&settings).await {
        tracing::error!("Report configuration error: {}", e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e));
    }

    let has_summary_report = settings.summary_url().is_some();
    tracing::info!(
        "Report configuration saved: {} url pairs, summary report: {}",
        settings.url_pairs.len(),
        has_summary_report
    );

    let response = SaveConfigResponse {
        success: true,
        message: "Report configuration saved successfully".to_string(),
        url_pairs_count: settings.url_pairs.len(),
        has_summary_report,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 请求体: 目标日期, 缺省为配置时区的今天
#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// 生成报表
pub async fn generate(State(state): State<AppState>, Json(body): Json<GenerateBody>) -> Response {
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    if !settings.is_configured() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Report URLs not configured. Please configure data and report URLs first.",
        );
    }

    let target_date = body
        .date
        .unwrap_or_else(|| Utc::now().with_timezone(&state.offset).date_naive());
    let request = GenerateRequest {
        pairs: settings.url_pairs.clone(),
        summary_report_url: settings.summary_url().map(str::to_string),
        target_date,
    };

    match state.generator.generate(request).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(ReportError::RunInProgress) => error_response(
            StatusCode::CONFLICT,
            "A report generation is already in progress",
        ),
        Err(e) => {
            tracing::error!("Error generating report: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoresResponse {
    pub success: bool,
    pub stores: Vec<String>,
    pub total_stores: usize,
}

/// 第一个数据源中出现过的店铺名 (去重, 排序)
pub async fn list_stores(State(state): State<AppState>) -> Response {
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    let Some(first) = settings.url_pairs.first() else {
        return error_response(StatusCode::BAD_REQUEST, "No data URLs configured");
    };

    match state.generator.sources().read_rows(&first.data_url).await {
        Ok(rows) => {
            // 前两行是表头
            let stores: BTreeSet<String> = rows
                .iter()
                .skip(2)
                .map(|cells| RawRow::name_of(cells))
                .filter(|name| !name.is_empty())
                .collect();
            let response = StoresResponse {
                success: true,
                total_stores: stores.len(),
                stores: stores.into_iter().collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Error getting stores: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResult {
    pub pair_index: usize,
    pub data_url: String,
    pub report_url: String,
    pub success: bool,
    pub total_rows: usize,
    pub sample_data: Vec<Vec<CellValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub success: bool,
    pub total_pairs: usize,
    pub successful_pairs: usize,
    pub failed_pairs: usize,
    pub total_rows: usize,
    pub results: Vec<ConnectionResult>,
    pub sample_data: Vec<Vec<CellValue>>,
}

const SAMPLE_ROWS: usize = 5;

/// 逐个测试数据源, 返回行数和前 5 行样例
pub async fn test_data_connection(State(state): State<AppState>) -> Response {
    let settings = match load_settings(&state).await {
        Ok(settings) => settings,
        Err(response) => return response,
    };
    if !settings.is_configured() {
        return error_response(StatusCode::BAD_REQUEST, "No data URLs configured");
    }

    let mut results = Vec::with_capacity(settings.url_pairs.len());
    for (index, pair) in settings.url_pairs.iter().enumerate() {
        tracing::info!(
            "Testing data connection for pair {}/{}",
            index + 1,
            settings.url_pairs.len()
        );
        let mut result = ConnectionResult {
            pair_index: index,
            data_url: pair.data_url.clone(),
            report_url: pair.report_url.clone(),
            success: false,
            total_rows: 0,
            sample_data: Vec::new(),
            error: None,
        };
        match state.generator.sources().read_rows(&pair.data_url).await {
            Ok(rows) => {
                result.success = true;
                result.total_rows = rows.len();
                result.sample_data = rows.into_iter().take(SAMPLE_ROWS).collect();
            }
            Err(e) => {
                tracing::error!("Error testing pair {}: {}", index + 1, e);
                result.error = Some(e.to_string());
            }
        }
        results.push(result);
    }

    let successful_pairs = results.iter().filter(|r| r.success).count();
    let response = ConnectionResponse {
        success: successful_pairs > 0,
        total_pairs: results.len(),
        successful_pairs,
        failed_pairs: results.len() - successful_pairs,
        total_rows: results.iter().map(|r| r.total_rows).sum(),
        sample_data: results
            .iter()
            .find(|r| r.success && !r.sample_data.is_empty())
            .map(|r| r.sample_data.clone())
            .unwrap_or_default(),
        results,
    };

    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response)).into_response()
}

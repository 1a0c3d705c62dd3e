use crate::models::MetricTotals;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 变更标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeIndicator {
    #[serde(rename = "Mới")]
    New,
    #[serde(rename = "Thay Đổi")]
    Changed,
    #[serde(rename = "")]
    Unchanged,
}

impl ChangeIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeIndicator::New => "Mới",
            ChangeIndicator::Changed => "Thay Đổi",
            ChangeIndicator::Unchanged => "",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, ChangeIndicator::Unchanged)
    }
}

/// 数据源 → 报表 的一组配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlPair {
    pub data_url: String,
    pub report_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_sheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_sheet_id: Option<String>,
}

/// 一次报表生成请求
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub pairs: Vec<UrlPair>,
    pub summary_report_url: Option<String>,
    pub target_date: NaiveDate,
}

/// 本次有变化 (新增/变更) 的店铺
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedEntity {
    pub store_name: String,
    #[serde(flatten)]
    pub totals: MetricTotals,
    pub change_indicator: ChangeIndicator,
    pub runner: String,
}

/// 单个报表表格的写入结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub start_column: String,
    pub end_column: String,
    pub stores: usize,
    pub roster: Vec<String>,
    pub changes_tracked: bool,
    pub changed_stores_data: Vec<ChangedEntity>,
    /// 仅统计有变化的店铺
    #[serde(flatten)]
    pub totals: MetricTotals,
}

/// 单个 pair 的处理结果 (失败不影响其它 pair)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResult {
    pub pair_index: usize,
    pub data_url: String,
    pub report_url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sheet_name: String,
    pub stores_processed: usize,
    pub changed_stores: usize,
    pub total_records: usize,
    #[serde(flatten)]
    pub totals: MetricTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_column: Option<String>,
}

/// 汇总表的一行输入
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairTotals {
    pub sheet_name: String,
    #[serde(flatten)]
    pub totals: MetricTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    pub date: NaiveDate,
    pub total_pairs: usize,
    pub exchange_rate: f64,
    pub overall_totals: MetricTotals,
    pub grand_totals: MetricTotals,
    pub grand_total_updated_in_place: bool,
    pub start_row: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutcome {
    pub success: bool,
    pub message: String,
    pub date: NaiveDate,
    pub results: Vec<PairResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryOutcome>,
    pub total_pairs_processed: usize,
    pub total_stores_processed: usize,
    pub total_records: usize,
}

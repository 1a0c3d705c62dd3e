use crate::models::UrlPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化的报表配置 (config.json), 未识别的键原样保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSettings {
    #[serde(default)]
    pub url_pairs: Vec<UrlPair>,
    #[serde(default)]
    pub summary_report_url: Option<String>,
    #[serde(default)]
    pub summary_sheet_id: Option<String>,
    #[serde(default)]
    pub report_configured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ReportSettings {
    pub fn is_configured(&self) -> bool {
        !self.url_pairs.is_empty()
    }

    pub fn summary_url(&self) -> Option<&str> {
        self.summary_report_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }
}

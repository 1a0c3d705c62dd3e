use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub google: GoogleConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 设置 url 时快照改存 Postgres, 否则写本地 JSON 文件
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub api_base: String,
    pub export_base: String,
    /// OAuth 流程不在本服务内, 由外部注入 access token
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub exchange_rate_url: String,
    pub fallback_exchange_rate: f64,
    pub base_currency: String,
    pub quote_currency: String,
    pub schedule_enabled: bool,
    pub schedule_hour: u32,
    pub utc_offset_hours: i32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
            },
            storage: StorageConfig {
                data_dir: "data".to_string(),
            },
            google: GoogleConfig {
                api_base: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
                export_base: "https://docs.google.com/spreadsheets/d".to_string(),
                access_token: None,
            },
            report: ReportConfig {
                exchange_rate_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
                fallback_exchange_rate: 26000.0,
                base_currency: "USD".to_string(),
                quote_currency: "VND".to_string(),
                schedule_enabled: true,
                schedule_hour: 2,
                utc_offset_hours: 7,
            },
        }
    }
}

const REDACTED: &str = "<redacted>";

// 连接串通常带密码, 日志里只标记是否已配置
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| REDACTED))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("api_base", &self.api_base)
            .field("export_base", &self.export_base)
            .field("access_token", &self.access_token.as_ref().map(|_| REDACTED))
            .finish()
    }
}

impl AppConfig {
    /// 加载配置: 默认值 < config 文件 < 环境变量 (SHEET_REPORT__SERVER__PORT 等)
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&AppConfig::default())?;

        config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("SHEET_REPORT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// 报表日期所在时区 (默认 UTC+7)
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.report.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_layering() {
        let config = AppConfig::load().unwrap();
        assert_eq!(config.report.fallback_exchange_rate, 26000.0);
        assert_eq!(config.report.utc_offset_hours, 7);
        assert!(config.database.url.is_none());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut config = AppConfig::default();
        config.google.access_token = Some("ya29.secret-token".to_string());
        config.database.url = Some("postgres://report:hunter2@db/report".to_string());

        let printed = format!("{:?}", config);
        assert!(!printed.contains("ya29.secret-token"));
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
        assert!(printed.contains("sheets.googleapis.com"));
    }

    #[test]
    fn utc_offset_follows_hours() {
        let config = AppConfig::default();
        assert_eq!(config.utc_offset().local_minus_utc(), 7 * 3600);
    }
}

use thiserror::Error;

/// 报表同步错误
#[derive(Debug, Error)]
pub enum ReportError {
    /// 数据源无法读取 (单个 pair 失败, 其余继续)
    #[error("source unreachable: {0}")]
    Source(String),

    /// 原始行宽度不足, 无法按固定列读取
    #[error("schema mismatch at row {row}: expected at least {expected} columns, got {actual}")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid sheet url: {0}")]
    InvalidUrl(String),

    /// 写入数据本身失败 (格式化失败不走这里)
    #[error("sheet backend error: {0}")]
    Backend(String),

    #[error("snapshot store error: {0}")]
    Snapshot(String),

    #[error("report urls not configured")]
    NotConfigured,

    #[error("report generation already in progress")]
    RunInProgress,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

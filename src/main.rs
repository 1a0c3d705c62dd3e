use sheet_report_sync::db::{JsonFileSnapshotStore, PgSnapshotStore, SettingsStore, SnapshotStore};
use sheet_report_sync::service::{spawn_daily, DailySchedule, HttpExchangeRate};
use sheet_report_sync::sheets::{CsvExportSource, GoogleSheets, MemorySheets, SheetBackend};
use sheet_report_sync::{api, create_pool, AppConfig, ReportGenerator};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 表格后端: 没有 token 时只在内存里试运行
    let sheets: Arc<dyn SheetBackend> = match config.google.access_token.as_deref() {
        Some(token) if !token.is_empty() => {
            Arc::new(GoogleSheets::new(config.google.api_base.clone(), token)?)
        }
        _ => {
            warn!("No Google access token configured, report writes go to an in-memory sheet");
            Arc::new(MemorySheets::new())
        }
    };
    let sources = Arc::new(CsvExportSource::new(config.google.export_base.clone())?);

    // 快照存储: 配了数据库就用 Postgres
    let snapshots: Arc<dyn SnapshotStore> = match config.database.url.as_deref() {
        Some(url) => {
            let pool = create_pool(url, config.database.max_connections).await?;
            info!("Database pool created");
            Arc::new(PgSnapshotStore::connect(pool).await?)
        }
        None => {
            let store = JsonFileSnapshotStore::in_dir(&config.storage.data_dir);
            info!("Storing report snapshots in {}", store.path().display());
            Arc::new(store)
        }
    };

    let rates = Arc::new(HttpExchangeRate::new(
        config.report.exchange_rate_url.clone(),
        config.report.fallback_exchange_rate,
    )?);

    let generator = Arc::new(
        ReportGenerator::new(sheets, sources, snapshots, rates)
            .with_currencies(&config.report.base_currency, &config.report.quote_currency),
    );
    let settings = SettingsStore::in_dir(&config.storage.data_dir);
    let offset = config.utc_offset();

    if config.report.schedule_enabled {
        spawn_daily(
            generator.clone(),
            settings.clone(),
            DailySchedule::new(config.report.schedule_hour, offset),
        );
        info!(
            "Daily report scheduled at {:02}:00 (UTC{:+})",
            config.report.schedule_hour, config.report.utc_offset_hours
        );
    }

    let app = api::router(api::AppState {
        generator,
        settings,
        offset,
    })
    .layer(ServiceBuilder::new());

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/reports/config               - current report configuration");
    info!("  POST /api/reports/config               - save url pairs");
    info!("  POST /api/reports/generate             - generate report");
    info!("  GET  /api/reports/stores               - stores in the first data source");
    info!("  POST /api/reports/test-data-connection - check data sources");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use crate::db::SettingsStore;
use crate::error::ReportError;
use crate::models::GenerateRequest;
use crate::service::generator::ReportGenerator;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 每天固定本地时刻触发一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    hour: u32,
    offset: FixedOffset,
}

impl DailySchedule {
    pub fn new(hour: u32, offset: FixedOffset) -> Self {
        Self {
            hour: hour % 24,
            offset,
        }
    }

    /// 严格晚于 `now` 的下一次触发时间
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let at = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut candidate = local.date_naive().and_time(at);
        if candidate <= local.naive_local() {
            candidate += Duration::days(1);
        }
        let utc = candidate - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc, Utc)
    }

    /// 触发时刻对应的本地日期
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }
}

/// 启动后台定时任务, 每次从持久化配置读取 pair 列表
pub fn spawn_daily(
    generator: Arc<ReportGenerator>,
    settings: SettingsStore,
    schedule: DailySchedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = schedule.next_run_after(now);
            tracing::info!("Next scheduled report run at {}", next.with_timezone(&schedule.offset));

            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            run_scheduled(&generator, &settings, schedule.local_date(next)).await;
        }
    })
}

async fn run_scheduled(generator: &ReportGenerator, settings: &SettingsStore, date: NaiveDate) {
    let config = match settings.load().await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Scheduled report for {} skipped: {}", date, e);
            return;
        }
    };
    if !config.is_configured() {
        tracing::info!("Scheduled report skipped: report URLs not configured");
        return;
    }

    let request = GenerateRequest {
        pairs: config.url_pairs.clone(),
        summary_report_url: config.summary_url().map(str::to_string),
        target_date: date,
    };

    match generator.generate(request).await {
        Ok(outcome) => tracing::info!(
            "Scheduled report for {} finished: {} pairs, {} stores",
            date,
            outcome.total_pairs_processed,
            outcome.total_stores_processed
        ),
        Err(ReportError::RunInProgress) => {
            tracing::warn!("Scheduled report for {} skipped: another run is in progress", date)
        }
        Err(e) => tracing::error!("Scheduled report for {} failed: {}", date, e),
    }
}

use crate::db::SnapshotStore;
use crate::error::{ReportError, Result};
use crate::models::{
    GenerateOutcome, GenerateRequest, MetricTotals, PairResult, PairSnapshot, PairTotals,
    Snapshot, SummaryOutcome, UrlPair,
};
use crate::service::aggregator::{aggregate_by_store, total_records};
use crate::service::exchange_rate::ExchangeRateProvider;
use crate::service::report_writer::ReportWriter;
use crate::service::summary_writer::SummaryWriter;
use crate::sheets::{RowSource, SheetBackend};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// 报表生成编排: 逐个 pair 写报表, 再写汇总表, 最后保存快照
pub struct ReportGenerator {
    sheets: Arc<dyn SheetBackend>,
    sources: Arc<dyn RowSource>,
    snapshots: Arc<dyn SnapshotStore>,
    rates: Arc<dyn ExchangeRateProvider>,
    base_currency: String,
    quote_currency: String,
    /// 同一时间只允许一次生成 (HTTP 与定时任务共用)
    run_lock: Mutex<()>,
}

/// 单个 pair 成功处理后的产物
struct PairOutput {
    result: PairResult,
    snapshot: PairSnapshot,
}

impl ReportGenerator {
    pub fn new(
        sheets: Arc<dyn SheetBackend>,
        sources: Arc<dyn RowSource>,
        snapshots: Arc<dyn SnapshotStore>,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> Self {
        Self {
            sheets,
            sources,
            snapshots,
            rates,
            base_currency: "USD".to_string(),
            quote_currency: "VND".to_string(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_currencies(mut self, base: impl Into<String>, quote: impl Into<String>) -> Self {
        self.base_currency = base.into();
        self.quote_currency = quote.into();
        self
    }

    pub fn sources(&self) -> &dyn RowSource {
        self.sources.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateOutcome> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ReportError::RunInProgress)?;

        if request.pairs.is_empty() {
            return Err(ReportError::NotConfigured);
        }

        let date = request.target_date;
        tracing::info!("Generating report for date: {}", date);

        let last = match self.snapshots.load_last().await {
            Ok(last) => last,
            Err(e) => {
                tracing::warn!("Warning: Could not load last report, treating all stores as new: {}", e);
                None
            }
        };

        // 快照整体重建: 只有本次失败的 pair 沿用上次的记录
        let mut next_pairs: BTreeMap<usize, PairSnapshot> = BTreeMap::new();
        let mut results = Vec::with_capacity(request.pairs.len());
        let mut summary_rows = Vec::new();

        for (index, pair) in request.pairs.iter().enumerate() {
            tracing::info!("Processing URL pair {}/{}", index + 1, request.pairs.len());
            let previous = last.as_ref().and_then(|s| s.pair(index));

            match self.process_pair(index, pair, previous, date).await {
                Ok(output) => {
                    summary_rows.push(PairTotals {
                        sheet_name: output.result.sheet_name.clone(),
                        totals: output.result.totals,
                    });
                    next_pairs.insert(index, output.snapshot);
                    results.push(output.result);
                }
                Err(e) => {
                    tracing::error!("Error processing pair {}: {}", index + 1, e);
                    if let Some(previous) = previous {
                        next_pairs.insert(index, previous.clone());
                    }
                    results.push(failed_result(index, pair, &e));
                }
            }
        }

        let summary = match request
            .summary_report_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        {
            Some(url) => match self.write_summary(url, &summary_rows, date).await {
                Ok(outcome) => {
                    tracing::info!("Summary report generated successfully");
                    Some(outcome)
                }
                Err(e) => {
                    tracing::error!("Error generating summary report: {}", e);
                    None
                }
            },
            None => None,
        };

        match self.snapshots.save_all(&Snapshot::new(next_pairs)).await {
            Ok(()) => tracing::info!("Successfully saved all pairs report data for future comparison"),
            Err(e) => tracing::warn!("Warning: Could not save report data: {}", e),
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let success = succeeded > 0;
        let message = if success {
            format!("Report generated successfully for {}", date)
        } else {
            format!("Report generation failed for every pair on {}", date)
        };

        Ok(GenerateOutcome {
            success,
            message,
            date,
            total_pairs_processed: results.len(),
            total_stores_processed: results.iter().map(|r| r.stores_processed).sum(),
            total_records: results.iter().map(|r| r.total_records).sum(),
            results,
            summary,
        })
    }

    async fn process_pair(
        &self,
        index: usize,
        pair: &UrlPair,
        previous: Option<&PairSnapshot>,
        date: NaiveDate,
    ) -> Result<PairOutput> {
        let rows = self.sources.read_rows(&pair.data_url).await?;
        let current = aggregate_by_store(&rows, date)?;

        let report_sheet = self.sheets.resolve(&pair.report_url).await?;
        let report = ReportWriter::new(self.sheets.as_ref())
            .write_pair(&report_sheet, &current, previous, date)
            .await?;

        let sheet_name = match self.sheets.resolve(&pair.data_url).await {
            Ok(sheet) if !sheet.title.is_empty() => sheet.title,
            Ok(_) => DEFAULT_SHEET_NAME.to_string(),
            Err(e) => {
                tracing::warn!(
                    "Warning: Could not get sheet name for pair {}, using default: {}",
                    index + 1,
                    e
                );
                DEFAULT_SHEET_NAME.to_string()
            }
        };

        let result = PairResult {
            pair_index: index,
            data_url: pair.data_url.clone(),
            report_url: pair.report_url.clone(),
            success: true,
            error: None,
            sheet_name,
            stores_processed: current.len(),
            changed_stores: report.changed_stores_data.len(),
            total_records: total_records(&current),
            totals: report.totals,
            start_column: Some(report.start_column),
            end_column: Some(report.end_column),
        };

        let snapshot = PairSnapshot {
            pair_index: index,
            data_url: pair.data_url.clone(),
            report_url: pair.report_url.clone(),
            roster: report.roster,
            entities: current,
        };

        Ok(PairOutput { result, snapshot })
    }

    async fn write_summary(
        &self,
        url: &str,
        rows: &[PairTotals],
        date: NaiveDate,
    ) -> Result<SummaryOutcome> {
        let rate = self
            .rates
            .rate(&self.base_currency, &self.quote_currency)
            .await;
        let sheet = self.sheets.resolve(url).await?;
        SummaryWriter::new(self.sheets.as_ref())
            .write_summary(&sheet, rows, date, rate)
            .await
    }
}

fn failed_result(index: usize, pair: &UrlPair, error: &ReportError) -> PairResult {
    PairResult {
        pair_index: index,
        data_url: pair.data_url.clone(),
        report_url: pair.report_url.clone(),
        success: false,
        error: Some(error.to_string()),
        sheet_name: String::new(),
        stores_processed: 0,
        changed_stores: 0,
        total_records: 0,
        totals: MetricTotals::default(),
        start_column: None,
        end_column: None,
    }
}

use crate::models::{ChangeIndicator, MetricTotals};

/// 与上次快照比较四项指标
pub fn detect_change(current: &MetricTotals, previous: Option<&MetricTotals>) -> ChangeIndicator {
    let Some(prev) = previous else {
        return ChangeIndicator::New;
    };

    if current.total_spend != prev.total_spend
        || current.total_clicks != prev.total_clicks
        || current.total_commission != prev.total_commission
        || current.total_benefit != prev.total_benefit
    {
        ChangeIndicator::Changed
    } else {
        ChangeIndicator::Unchanged
    }
}

use crate::error::Result;
use crate::models::{CellValue, EntityTotals, RawRow};
use chrono::NaiveDate;
use indexmap::IndexMap;

/// 按店铺名汇总原始数据行
///
/// 前两行是表头, 店铺名为空的行跳过; 四项指标全为 0 的店铺不进入结果。
/// `target_date` 目前只记录日志, 不参与过滤: 数据源里的所有行都会被汇总。
pub fn aggregate_by_store(
    rows: &[Vec<CellValue>],
    target_date: NaiveDate,
) -> Result<IndexMap<String, EntityTotals>> {
    tracing::debug!(
        "Aggregating {} raw rows (target date {} is not used for filtering)",
        rows.len(),
        target_date
    );

    let mut stores: IndexMap<String, EntityTotals> = IndexMap::new();

    for (index, cells) in rows.iter().enumerate() {
        if index <= 1 {
            continue;
        }
        let name = RawRow::name_of(cells);
        if name.is_empty() {
            continue;
        }

        let row = RawRow::from_cells(index, cells)?;
        let entry = stores
            .entry(name)
            .or_insert_with_key(|key| EntityTotals::new(key.clone()));

        entry.totals.add_row(&row);
        if entry.runner.is_empty() && !row.runner.is_empty() {
            entry.runner = row.runner.clone();
        }
        entry.records.push(row);
    }

    stores.retain(|name, store| {
        let keep = !store.totals.is_zero();
        if !keep {
            tracing::debug!("Dropping store {} with all-zero totals", name);
        }
        keep
    });

    Ok(stores)
}

/// 参与汇总的原始记录数
pub fn total_records(stores: &IndexMap<String, EntityTotals>) -> usize {
    stores.values().map(|s| s.records.len()).sum()
}

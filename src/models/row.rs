use crate::error::{ReportError, Result};
use crate::models::CellValue;
use crate::service::number::parse_number;
use serde::{Deserialize, Serialize};

/// 数据表固定列位置
pub mod columns {
    pub const STORE_NAME: usize = 3;
    pub const RUNNER: usize = 12;
    pub const SPEND: usize = 14;
    pub const CLICKS: usize = 15;
    pub const COMMISSION: usize = 16;
    pub const BENEFIT: usize = 17;
}

/// 原始数据行 (按固定列解析后的记录)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    pub row_index: usize,
    pub name: String,
    pub runner: String,
    pub spend: f64,
    pub clicks: f64,
    pub commission: f64,
    pub benefit: f64,
}

impl RawRow {
    /// 数据行至少要覆盖到 benefit 列
    pub const MIN_WIDTH: usize = columns::BENEFIT + 1;

    /// 读取某行的店铺名 (越界视为空)
    pub fn name_of(cells: &[CellValue]) -> String {
        cells
            .get(columns::STORE_NAME)
            .map(|c| c.to_string())
            .unwrap_or_default()
    }

    pub fn from_cells(row_index: usize, cells: &[CellValue]) -> Result<Self> {
        if cells.len() < Self::MIN_WIDTH {
            return Err(ReportError::SchemaMismatch {
                row: row_index,
                expected: Self::MIN_WIDTH,
                actual: cells.len(),
            });
        }

        Ok(Self {
            row_index,
            name: Self::name_of(cells),
            runner: cells[columns::RUNNER].to_string(),
            spend: parse_number(&cells[columns::SPEND]),
            clicks: parse_number(&cells[columns::CLICKS]),
            commission: parse_number(&cells[columns::COMMISSION]),
            benefit: parse_number(&cells[columns::BENEFIT]),
        })
    }
}

/// 四项指标合计
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricTotals {
    pub total_spend: f64,
    pub total_clicks: f64,
    pub total_commission: f64,
    pub total_benefit: f64,
}

impl MetricTotals {
    pub fn new(spend: f64, clicks: f64, commission: f64, benefit: f64) -> Self {
        Self {
            total_spend: spend,
            total_clicks: clicks,
            total_commission: commission,
            total_benefit: benefit,
        }
    }

    pub fn add(&mut self, other: &MetricTotals) {
        self.total_spend += other.total_spend;
        self.total_clicks += other.total_clicks;
        self.total_commission += other.total_commission;
        self.total_benefit += other.total_benefit;
    }

    pub fn add_row(&mut self, row: &RawRow) {
        self.total_spend += row.spend;
        self.total_clicks += row.clicks;
        self.total_commission += row.commission;
        self.total_benefit += row.benefit;
    }

    pub fn is_zero(&self) -> bool {
        self.total_spend == 0.0
            && self.total_clicks == 0.0
            && self.total_commission == 0.0
            && self.total_benefit == 0.0
    }

    /// 利润 = 佣金(外币) × 汇率 - 花费
    pub fn profit(&self, exchange_rate: f64) -> f64 {
        self.total_benefit * exchange_rate - self.total_spend
    }

    pub fn to_cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Number(self.total_spend),
            CellValue::Number(self.total_clicks),
            CellValue::Number(self.total_commission),
            CellValue::Number(self.total_benefit),
        ]
    }
}

impl<'a> std::iter::Sum<&'a MetricTotals> for MetricTotals {
    fn sum<I: Iterator<Item = &'a MetricTotals>>(iter: I) -> Self {
        iter.fold(MetricTotals::default(), |mut acc, t| {
            acc.add(t);
            acc
        })
    }
}

/// 单个店铺在一次运行中的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTotals {
    pub name: String,
    #[serde(flatten)]
    pub totals: MetricTotals,
    #[serde(default)]
    pub runner: String,
    /// 仅用于追溯, 不写入快照
    #[serde(skip)]
    pub records: Vec<RawRow>,
}

impl EntityTotals {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            totals: MetricTotals::default(),
            runner: String::new(),
            records: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[(usize, &str)]) -> Vec<CellValue> {
        let mut row = vec![CellValue::blank(); RawRow::MIN_WIDTH];
        for (idx, v) in values {
            row[*idx] = CellValue::text(*v);
        }
        row
    }

    #[test]
    fn reads_fixed_columns() {
        let row = RawRow::from_cells(
            5,
            &cells(&[(3, "Shop A"), (12, "Lan"), (14, "1.000"), (15, "7"), (16, "2,5"), (17, "3")]),
        )
        .unwrap();
        assert_eq!(row.name, "Shop A");
        assert_eq!(row.runner, "Lan");
        assert_eq!(row.spend, 1000.0);
        assert_eq!(row.clicks, 7.0);
        assert_eq!(row.commission, 2.5);
        assert_eq!(row.benefit, 3.0);
    }

    #[test]
    fn narrow_row_is_schema_mismatch() {
        let err = RawRow::from_cells(4, &[CellValue::blank(), CellValue::text("x")]).unwrap_err();
        assert!(matches!(
            err,
            ReportError::SchemaMismatch { row: 4, expected: 18, actual: 2 }
        ));
    }

    #[test]
    fn entity_totals_serialize_flat() {
        let mut e = EntityTotals::new("A");
        e.totals = MetricTotals::new(100.0, 10.0, 0.0, 1.0);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["totalSpend"], 100.0);
        assert_eq!(json["name"], "A");
        assert!(json.get("records").is_none());
    }
}

use crate::models::EntityTotals;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 上一次运行的完整快照 (每次运行整体覆盖)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub pairs: BTreeMap<usize, PairSnapshot>,
}

impl Snapshot {
    pub fn new(pairs: BTreeMap<usize, PairSnapshot>) -> Self {
        Self {
            timestamp: Utc::now(),
            pairs,
        }
    }

    pub fn pair(&self, pair_index: usize) -> Option<&PairSnapshot> {
        self.pairs.get(&pair_index)
    }
}

/// 单个 pair 的快照: 店铺名单 + 本次各店铺汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSnapshot {
    pub pair_index: usize,
    pub data_url: String,
    pub report_url: String,
    #[serde(default)]
    pub roster: Vec<String>,
    pub entities: IndexMap<String, EntityTotals>,
}

impl PairSnapshot {
    pub fn entity(&self, name: &str) -> Option<&EntityTotals> {
        self.entities.get(name)
    }
}

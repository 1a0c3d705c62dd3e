pub mod cell;
pub mod report;
pub mod row;
pub mod settings;
pub mod snapshot;

pub use cell::CellValue;
pub use report::{
    ChangeIndicator, ChangedEntity, GenerateOutcome, GenerateRequest, PairReport, PairResult,
    PairTotals, SummaryOutcome, UrlPair,
};
pub use row::{EntityTotals, MetricTotals, RawRow};
pub use settings::ReportSettings;
pub use snapshot::{PairSnapshot, Snapshot};

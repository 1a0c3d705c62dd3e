pub mod aggregator;
pub mod allocator;
pub mod change;
pub mod column;
pub mod exchange_rate;
pub mod generator;
pub mod number;
pub mod report_writer;
pub mod scheduler;
pub mod summary_writer;

pub use exchange_rate::{ExchangeRateProvider, FixedRate, HttpExchangeRate};
pub use generator::ReportGenerator;
pub use report_writer::ReportWriter;
pub use scheduler::{spawn_daily, DailySchedule};
pub use summary_writer::SummaryWriter;

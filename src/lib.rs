pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod sheets;

pub use config::AppConfig;
pub use db::create_pool;
pub use error::{ReportError, Result};
pub use service::ReportGenerator;

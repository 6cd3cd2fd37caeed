//! Shared error type, configuration and logging setup for benchviz

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    load_config, ChartSettings, ConfigSource, ConvergenceFieldConfig, DashboardConfig,
    PageConfig, PageKind, ReportConfig,
};
pub use error::{BenchVizError, Result};

//! Benchmark history charts
//!
//! Turns Google Benchmark JSON history into Chart.js configurations, builds
//! the checkbox/radio controls for a page and filters cached charts when the
//! controls change. Pages are written as static HTML by [`ReportGenerator`]
//! or served live by the [`dashboard`] router.

pub mod chart;
pub mod controls;
pub mod convergence;
pub mod dashboard;
pub mod field;
pub mod filter;
pub mod history;
pub mod html_report;
pub mod metadata;
pub mod name;
pub mod page;
pub mod palette;

pub use chart::{construct_graph, ChartConfig, ChartData, ChartKind, Dataset, GraphOptions, SeriesAxis};
pub use controls::{build_controls, ControlGroup, ControlPanel, ExtraControl, LayoutRenamer, Renamer};
pub use convergence::{convergence_charts, ConvergenceDocument};
pub use field::MeasuredField;
pub use filter::{FilterHook, FilterState, FormState, GraphCache, LayoutFilter};
pub use history::{append_run, load_history, BenchmarkRecord, DataSource, History, HistorySnapshot};
pub use html_report::{PageMode, ReportGenerator};
pub use metadata::{extract_metadata, MetadataEntry};
pub use name::BenchmarkName;
pub use page::{load_pages, Page, PageData, PageSummary};
pub use palette::{Color, Palette};

//! benchviz: benchmark history reports
//!
//! Re-exports the shared configuration layer and the report library so the
//! reporter binary and downstream tools have one import path.

pub use benchviz_common as common;
pub use benchviz_report as report;

/// Commonly used types
pub mod prelude {
    pub use benchviz_common::{BenchVizError, PageConfig, PageKind, ReportConfig, Result};
    pub use benchviz_report::{
        ChartConfig, ControlPanel, FormState, History, MeasuredField, Page, PageMode,
        ReportGenerator,
    };
}

//! Configuration management for benchviz reports

use crate::error::{BenchVizError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of page rendered for a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    /// One bar series per history run, one chart per size
    Bar,
    /// One line series per test across history runs, one chart per size
    Line,
    /// Solver convergence series, one chart per size
    Convergence,
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageKind::Bar => write!(f, "bar"),
            PageKind::Line => write!(f, "line"),
            PageKind::Convergence => write!(f, "convergence"),
        }
    }
}

/// A selectable convergence series and the factor applied to its values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceFieldConfig {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

/// One report page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Identifier used in URLs and output file names
    pub id: String,
    /// Display name, also the prefix of dataset labels
    pub name: String,
    /// Path or http(s) URL of the JSON document
    pub source: String,
    pub kind: PageKind,
    /// Measured field plotted initially (`real_time`, `cpu_time` or a counter)
    #[serde(default = "default_field")]
    pub field: String,
    /// Extra fields offered in the field radio group; empty hides the group
    #[serde(default)]
    pub field_choices: Vec<String>,
    /// Layout tokens embedded in test names, e.g. `Dense`, `Sparse`
    #[serde(default)]
    pub layouts: Vec<String>,
    /// Convergence series offered in the field radio group
    #[serde(default)]
    pub convergence_fields: Vec<ConvergenceFieldConfig>,
    /// Leading convergence points to skip
    #[serde(default)]
    pub offset: usize,
}

fn default_field() -> String {
    "real_time".to_string()
}

impl PageConfig {
    pub fn bar<S: Into<String>>(id: S, name: S, source: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source: source.into(),
            kind: PageKind::Bar,
            field: default_field(),
            field_choices: Vec::new(),
            layouts: Vec::new(),
            convergence_fields: Vec::new(),
            offset: 0,
        }
    }

    /// Output file name for the static report
    pub fn file_name(&self) -> String {
        format!("{}.html", self.id)
    }
}

/// Canvas settings shared by every chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSettings {
    pub width: u32,
    pub height: u32,
    pub begin_at_zero: bool,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: 500,
            height: 300,
            begin_at_zero: true,
        }
    }
}

/// Dashboard configuration for web interface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl DashboardConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Top-level report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: String,
    pub output_dir: PathBuf,
    /// Seed for the color palette; a fixed seed keeps test colors stable
    pub palette_seed: u64,
    /// Drop `run_type = "aggregate"` records (mean/median/stddev rows)
    pub skip_aggregates: bool,
    #[serde(default)]
    pub chart: ChartSettings,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let sparse_vector = PageConfig::bar(
            "sparse_vector",
            "Sparse Vector",
            "./data/sparse_vector.benchmarks.json",
        );

        let mut linear_solvers = PageConfig::bar(
            "linear_solvers",
            "Linear system solvers",
            "./data/linear_solvers_benchmarks.json",
        );
        linear_solvers.layouts = vec!["Dense".to_string(), "Sparse".to_string()];
        linear_solvers.field_choices = vec![
            "real_time".to_string(),
            "cpu_time".to_string(),
            "lns_iterations".to_string(),
        ];

        let convergence = PageConfig {
            id: "convergence".to_string(),
            name: "Linear solver convergence".to_string(),
            source: "./data/linear_solver_convergence.json".to_string(),
            kind: PageKind::Convergence,
            field: "error".to_string(),
            field_choices: Vec::new(),
            layouts: Vec::new(),
            convergence_fields: vec![
                ConvergenceFieldConfig { name: "error".to_string(), scale: 1.0 },
                ConvergenceFieldConfig { name: "iterationsUsed".to_string(), scale: 1.0 },
                ConvergenceFieldConfig { name: "time".to_string(), scale: 1.0 },
            ],
            offset: 0,
        };

        Self {
            title: "Benchmark History".to_string(),
            output_dir: PathBuf::from("./benchmark_reports"),
            palette_seed: 1 << 20,
            skip_aggregates: true,
            chart: ChartSettings::default(),
            dashboard: DashboardConfig::default(),
            pages: vec![sparse_vector, linear_solvers, convergence],
        }
    }
}

impl ReportConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!("Loaded {} pages from {}", config.pages.len(), path.display());
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Find a page by id
    pub fn find_page(&self, id: &str) -> Option<&PageConfig> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Apply `BENCHVIZ_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(title) = std::env::var("BENCHVIZ_TITLE") {
            self.title = title;
        }

        if let Ok(dir) = std::env::var("BENCHVIZ_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Ok(seed) = std::env::var("BENCHVIZ_PALETTE_SEED") {
            match seed.parse() {
                Ok(seed) => self.palette_seed = seed,
                Err(_) => warn!("Ignoring BENCHVIZ_PALETTE_SEED={:?}, not an integer", seed),
            }
        }

        if let Ok(field) = std::env::var("BENCHVIZ_FIELD") {
            for page in self.pages.iter_mut().filter(|p| p.kind != PageKind::Convergence) {
                page.field = field.clone();
            }
        }
    }

    /// Reject duplicate page ids and convergence pages without fields
    pub fn validate(&self) -> Result<()> {
        for (i, page) in self.pages.iter().enumerate() {
            if page.id.is_empty() {
                return Err(BenchVizError::Config(format!("page {} has an empty id", i)));
            }
            if self.pages[..i].iter().any(|p| p.id == page.id) {
                return Err(BenchVizError::Config(format!("duplicate page id {}", page.id)));
            }
            if page.kind == PageKind::Convergence && page.convergence_fields.is_empty() {
                return Err(BenchVizError::Config(format!(
                    "convergence page {} declares no convergence_fields",
                    page.id
                )));
            }
        }
        Ok(())
    }
}

/// Configuration source for loading report settings
pub enum ConfigSource {
    File(PathBuf),
    Default,
    Environment,
}

/// Load report configuration from various sources
pub fn load_config(source: ConfigSource) -> Result<ReportConfig> {
    match source {
        ConfigSource::File(path) => ReportConfig::from_file(&path),
        ConfigSource::Default => Ok(ReportConfig::default()),
        ConfigSource::Environment => {
            let mut config = ReportConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
    }
}

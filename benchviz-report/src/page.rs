//! A loaded report page: its data, controls and chart cache

use crate::chart::{construct_graph, ChartConfig, ChartKind, GraphOptions};
use crate::controls::{
    build_controls, field_control, layout_control, ControlPanel, ExtraControl, IdentityRenamer,
    LayoutRenamer, Renamer, FIELD,
};
use crate::convergence::{convergence_charts, ConvergenceDocument};
use crate::field::MeasuredField;
use crate::filter::{FilterHook, FilterState, FormState, GraphCache, LayoutFilter};
use crate::history::{load_history, DataSource, History};
use crate::metadata::{extract_metadata, MetadataEntry};
use crate::palette::Palette;
use benchviz_common::{BenchVizError, PageConfig, PageKind, ReportConfig, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// The document a page charts
#[derive(Debug, Clone)]
pub enum PageData {
    History(History),
    Convergence(ConvergenceDocument),
}

/// Short description served by the page listing
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub name: String,
    pub kind: PageKind,
    pub field: String,
    pub runs: usize,
    pub charts: usize,
}

pub struct Page {
    config: PageConfig,
    data: PageData,
    metadata: Vec<MetadataEntry>,
    panel: ControlPanel,
    hook: Option<Box<dyn FilterHook>>,
    cache: GraphCache,
    begin_at_zero: bool,
}

impl Page {
    /// Fetch the page's source, resolving relative paths against `base`
    pub async fn load(config: &PageConfig, report: &ReportConfig, base: &Path) -> Result<Self> {
        let source = DataSource::parse(&config.source).relative_to(base);
        match config.kind {
            PageKind::Convergence => {
                let document: ConvergenceDocument = source.load_json().await?;
                info!("Loaded {} convergence sizes from {}", document.sizes.len(), source);
                Self::from_convergence(config.clone(), document, report)
            }
            PageKind::Bar | PageKind::Line => {
                let history = load_history(&source, report.skip_aggregates).await?;
                Self::from_history(config.clone(), history, report)
            }
        }
    }

    pub fn from_history(config: PageConfig, history: History, report: &ReportConfig) -> Result<Self> {
        let first = history.first()?;
        let mut palette = Palette::new(report.palette_seed);
        let metadata = extract_metadata(&first.benchmarks, &mut palette)?;

        let mut extra = Vec::new();
        let mut hook: Option<Box<dyn FilterHook>> = None;
        let renamer: Box<dyn Renamer> = if config.layouts.is_empty() {
            Box::new(IdentityRenamer)
        } else {
            extra.push(ExtraControl {
                position: 2,
                group: layout_control(&config.layouts),
            });
            hook = Some(Box::new(LayoutFilter));
            Box::new(LayoutRenamer::new(&config.layouts))
        };
        if !config.field_choices.is_empty() {
            extra.push(ExtraControl {
                position: usize::MAX,
                group: field_control(&config.field_choices, &config.field),
            });
        }

        let panel = build_controls(&metadata, history.len(), renamer.as_ref(), extra);
        let mut page = Self {
            cache: GraphCache::default(),
            config,
            data: PageData::History(history),
            metadata,
            panel,
            hook,
            begin_at_zero: report.chart.begin_at_zero,
        };
        let field = page.config.field.clone();
        page.rebuild(&field)?;
        Ok(page)
    }

    pub fn from_convergence(
        config: PageConfig,
        document: ConvergenceDocument,
        report: &ReportConfig,
    ) -> Result<Self> {
        let names: Vec<&str> = config
            .convergence_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let panel = ControlPanel {
            groups: vec![field_control(&names, &config.field)],
            solver_of_test: Vec::new(),
        };

        let mut page = Self {
            cache: GraphCache::default(),
            config,
            data: PageData::Convergence(document),
            metadata: Vec::new(),
            panel,
            hook: None,
            begin_at_zero: report.chart.begin_at_zero,
        };
        let field = page.config.field.clone();
        page.rebuild(&field)?;
        Ok(page)
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn data(&self) -> &PageData {
        &self.data
    }

    pub fn panel(&self) -> &ControlPanel {
        &self.panel
    }

    pub fn metadata(&self) -> &[MetadataEntry] {
        &self.metadata
    }

    /// Field the cache currently holds charts for
    pub fn cached_field(&self) -> &str {
        &self.cache.field
    }

    /// Unfiltered charts for the cached field
    pub fn cached_charts(&self) -> &[ChartConfig] {
        &self.cache.configs
    }

    pub fn summary(&self) -> PageSummary {
        let runs = match &self.data {
            PageData::History(history) => history.len(),
            PageData::Convergence(_) => 1,
        };
        PageSummary {
            id: self.config.id.clone(),
            name: self.config.name.clone(),
            kind: self.config.kind,
            field: self.cache.field.clone(),
            runs,
            charts: self.cache.configs.len(),
        }
    }

    /// Field a form asks for, falling back to the cached one
    pub fn requested_field(&self, form: &FormState) -> String {
        match form.selected(FIELD) {
            Some(field) if self.panel.group(FIELD).is_some() => field.to_string(),
            _ => self.cache.field.clone(),
        }
    }

    /// Rebuild the cache for `field`
    pub fn rebuild(&mut self, field: &str) -> Result<()> {
        let configs = match &self.data {
            PageData::History(history) => {
                let measured = MeasuredField::from(field.to_string());
                if let MeasuredField::Custom(name) = &measured {
                    if !history.counter_names().contains(name) {
                        return Err(BenchVizError::UnknownField(name.clone()));
                    }
                }
                let kind = match self.config.kind {
                    PageKind::Line => ChartKind::Line,
                    _ => ChartKind::Bar,
                };
                let mut options = GraphOptions::new(self.config.name.as_str(), measured, kind);
                options.begin_at_zero = self.begin_at_zero;
                construct_graph(&self.metadata, history, &options)
            }
            PageData::Convergence(document) => {
                let selected = self
                    .config
                    .convergence_fields
                    .iter()
                    .find(|f| f.name == field)
                    .ok_or_else(|| BenchVizError::UnknownField(field.to_string()))?;
                convergence_charts(document, selected, self.config.offset)?
            }
        };

        debug!("Built {} charts for {} ({})", configs.len(), self.config.id, field);
        self.cache = GraphCache::new(field, configs);
        Ok(())
    }

    /// Filtered charts for `form`; the form's field must match the cache
    pub fn filtered(&self, form: &FormState) -> Result<Vec<ChartConfig>> {
        let filter = FilterState::from_form(&self.panel, form)?;
        let field = self.requested_field(form);
        if field != self.cache.field {
            return Err(BenchVizError::Other(format!(
                "charts for {} are cached for {}, not {}",
                self.config.id, self.cache.field, field
            )));
        }
        Ok(self.cache.filtered(&self.panel, &filter, self.hook.as_deref()))
    }

    /// Rebuild on a field change, then filter
    pub fn charts(&mut self, form: &FormState) -> Result<Vec<ChartConfig>> {
        FilterState::from_form(&self.panel, form)?;
        let field = self.requested_field(form);
        if field != self.cache.field {
            info!("Field of {} changed to {}", self.config.id, field);
            self.rebuild(&field)?;
        }
        self.filtered(form)
    }

    /// The panel with `form`'s checked state applied
    pub fn panel_for(&self, form: &FormState) -> ControlPanel {
        let mut panel = self.panel.clone();
        form.apply_to(&mut panel);
        panel
    }
}

/// Load every configured page, skipping the ones that fail
pub async fn load_pages(report: &ReportConfig, base: &Path) -> Vec<Page> {
    let mut pages = Vec::with_capacity(report.pages.len());
    for config in &report.pages {
        match Page::load(config, report, base).await {
            Ok(page) => pages.push(page),
            Err(e) => warn!("Skipping page {}: {}", config.id, e),
        }
    }
    pages
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("id", &self.config.id)
            .field("kind", &self.config.kind)
            .field("field", &self.cache.field)
            .field("charts", &self.cache.configs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::{HISTORY, LAYOUT, SOLVER};

    const SOLVERS: &str = r#"[
        {"benchmarks": [
            {"name": "LS/jacobiDense/16", "real_time": 1.0, "cpu_time": 0.9, "time_unit": "us", "lns_iterations": 40},
            {"name": "LS/jacobiSparse/16", "real_time": 2.0, "cpu_time": 1.9, "time_unit": "us", "lns_iterations": 41},
            {"name": "LS/cgDense/16", "real_time": 3.0, "cpu_time": 2.9, "time_unit": "us", "lns_iterations": 8}
        ]},
        {"benchmarks": [
            {"name": "LS/jacobiDense/16", "real_time": 1.1, "cpu_time": 1.0, "time_unit": "us", "lns_iterations": 39}
        ]}
    ]"#;

    fn solver_page() -> Page {
        let report = ReportConfig::default();
        let config = report.find_page("linear_solvers").unwrap().clone();
        Page::from_history(config, History::from_json_str(SOLVERS).unwrap(), &report).unwrap()
    }

    #[test]
    fn test_solver_page_controls() {
        let page = solver_page();
        let names: Vec<&str> = page.panel().groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec![HISTORY, "size", LAYOUT, SOLVER, FIELD]);
        assert_eq!(page.cached_field(), "real_time");
        assert_eq!(page.cached_charts().len(), 1);
        assert_eq!(page.summary().runs, 2);
    }

    #[test]
    fn test_field_change_rebuilds_cache() {
        let mut page = solver_page();
        let mut form = FormState::all_checked(page.panel());
        form.checked.insert(FIELD.into(), vec!["lns_iterations".into()]);

        assert!(page.filtered(&form).is_err());
        let charts = page.charts(&form).unwrap();
        assert_eq!(page.cached_field(), "lns_iterations");
        assert_eq!(charts[0].data.labels, vec!["jacobiDense", "jacobiSparse", "cgDense"]);
        assert_eq!(charts[0].data.datasets[0].data, vec![Some(40.0), Some(41.0), Some(8.0)]);
        assert!(page.filtered(&form).is_ok());
    }

    #[test]
    fn test_unknown_counter() {
        let mut page = solver_page();
        assert!(matches!(
            page.rebuild("residual"),
            Err(BenchVizError::UnknownField(_))
        ));
        assert_eq!(page.cached_field(), "real_time");
    }

    #[test]
    fn test_layout_and_solver_filters() {
        let mut page = solver_page();
        let mut form = FormState::all_checked(page.panel());
        form.uncheck(LAYOUT, "Sparse").unwrap();
        let charts = page.charts(&form).unwrap();
        assert_eq!(charts[0].data.labels, vec!["jacobiDense (us)", "cgDense (us)"]);

        let mut form = FormState::all_checked(page.panel());
        form.uncheck(SOLVER, "0").unwrap();
        let charts = page.charts(&form).unwrap();
        assert_eq!(charts[0].data.labels, vec!["cgDense (us)"]);

        let panel = page.panel_for(&form);
        assert!(!panel.group(SOLVER).unwrap().options[0].checked);
        assert!(page.panel().group(SOLVER).unwrap().options[0].checked);
    }

    #[test]
    fn test_convergence_page() {
        let report = ReportConfig::default();
        let config = report.find_page("convergence").unwrap().clone();
        let document = ConvergenceDocument::from_json_str(
            r#"{"8": [{"solver": "Jacobi", "error": [1.0, 0.5], "iterationsUsed": [1, 2], "time": [3.0, 4.0]}]}"#,
        )
        .unwrap();
        let mut page = Page::from_convergence(config, document, &report).unwrap();
        assert_eq!(page.panel().groups.len(), 1);
        assert_eq!(page.cached_field(), "error");

        let mut form = FormState::default();
        form.checked.insert(FIELD.into(), vec!["time".into()]);
        let charts = page.charts(&form).unwrap();
        assert_eq!(charts[0].data.datasets[0].data, vec![Some(3.0), Some(4.0)]);
        assert_eq!(page.cached_field(), "time");
    }
}

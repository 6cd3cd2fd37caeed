//! HTML pages, the page index and static report generation
//!
//! Pages are plain HTML with a Chart.js CDN include. Charts are embedded as
//! JSON and drawn by `assets/js/benchviz.js`; live pages post the form back
//! to the dashboard on every change.

use crate::chart::ChartConfig;
use crate::filter::FormState;
use crate::page::Page;
use crate::controls::escape_html;
use benchviz_common::{PageConfig, ReportConfig, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CHART_JS_CDN: &str = "https://cdn.jsdelivr.net/npm/chart.js";

/// How a page is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// Written to disk with a baked filter and frozen controls
    Static,
    /// Served by the dashboard, re-filtered on every form change
    Live,
}

impl PageMode {
    fn asset_prefix(self) -> &'static str {
        match self {
            PageMode::Static => "assets/",
            PageMode::Live => "/assets/",
        }
    }

    fn page_href(self, page: &PageConfig) -> String {
        match self {
            PageMode::Static => page.file_name(),
            PageMode::Live => format!("/pages/{}", page.id),
        }
    }

    fn index_href(self) -> &'static str {
        match self {
            PageMode::Static => "index.html",
            PageMode::Live => "/",
        }
    }
}

/// Settings handed to `initPage` in the browser
#[derive(Serialize)]
struct PageScript<'a> {
    page: &'a str,
    mode: PageMode,
    api: String,
    width: u32,
    height: u32,
    charts: &'a [ChartConfig],
}

/// Serialize for a `<script>` body; `</` would end the element early
fn script_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn html_head(title: &str, report: &ReportConfig, mode: PageMode) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - {}</title>
    <script src="{}"></script>
    <link href="{}css/style.css" rel="stylesheet">
</head>
"#,
        escape_html(title),
        escape_html(&report.title),
        CHART_JS_CDN,
        mode.asset_prefix()
    )
}

fn navigation(pages: &[&PageConfig], current: Option<&str>, mode: PageMode) -> String {
    let mut html = format!(r#"<nav><a href="{}">Index</a>"#, mode.index_href());
    for page in pages {
        let class = if Some(page.id.as_str()) == current {
            r#" class="active""#
        } else {
            ""
        };
        html.push_str(&format!(
            r#"<a href="{}"{}>{}</a>"#,
            escape_html(&mode.page_href(page)),
            class,
            escape_html(&page.name)
        ));
    }
    html.push_str("</nav>");
    html
}

fn footer() -> String {
    format!(
        r#"<footer>Generated {}</footer>"#,
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Render one chart page.
///
/// `charts` are drawn as given; `form` only decides which controls show as
/// checked. Static pages render their inputs disabled.
pub fn render_page(
    page: &Page,
    charts: &[ChartConfig],
    form: &FormState,
    report: &ReportConfig,
    pages: &[&PageConfig],
    mode: PageMode,
) -> Result<String> {
    let config = page.config();
    let script = PageScript {
        page: &config.id,
        mode,
        api: format!("/api/pages/{}/charts", config.id),
        width: report.chart.width,
        height: report.chart.height,
        charts,
    };

    let mut html = html_head(&config.name, report, mode);
    html.push_str("<body>\n");
    html.push_str(&navigation(pages, Some(&config.id), mode));
    html.push_str(&format!(
        "\n<h1>{}</h1>\n<div class=\"controls\"><main>{}</main></div>\n<div class=\"graph\"></div>\n",
        escape_html(&config.name),
        page.panel_for(form).render_html(mode == PageMode::Static)
    ));
    html.push_str(&footer());
    html.push_str(&format!(
        "\n<script src=\"{}js/benchviz.js\"></script>\n<script>initPage({});</script>\n</body>\n</html>\n",
        mode.asset_prefix(),
        script_json(&script)?
    ));
    Ok(html)
}

/// Render the page index
pub fn render_index(report: &ReportConfig, pages: &[&PageConfig], mode: PageMode) -> String {
    let mut html = html_head("Index", report, mode);
    html.push_str("<body>\n");
    html.push_str(&navigation(pages, None, mode));
    html.push_str(&format!("\n<h1>{}</h1>\n<ul class=\"pages\">\n", escape_html(&report.title)));
    for page in pages {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <span class=\"kind\">{}</span></li>\n",
            escape_html(&mode.page_href(page)),
            escape_html(&page.name),
            page.kind
        ));
    }
    html.push_str("</ul>\n");
    html.push_str(&footer());
    html.push_str("\n</body>\n</html>\n");
    html
}

pub fn generate_css() -> &'static str {
    r#"/* benchviz report styles */
body {
    font-family: system-ui, sans-serif;
    margin: 0 auto;
    max-width: 1100px;
    padding: 0 1rem;
}

nav a {
    margin-right: 1rem;
}

nav a.active {
    font-weight: bold;
}

.controls main form {
    display: flex;
    flex-wrap: wrap;
    gap: 0.5rem;
}

.controls fieldset {
    border: 1px solid #ccc;
    border-radius: 4px;
}

.controls legend {
    font-weight: bold;
}

.graph {
    display: flex;
    flex-wrap: wrap;
}

.graph > div {
    width: 500px;
}

footer {
    color: #888;
    font-size: 0.8rem;
    margin: 2rem 0 1rem;
}
"#
}

pub fn generate_js() -> &'static str {
    r#"// benchviz page glue: draws embedded charts, posts form changes when live
const benchvizCharts = [];

function renderCharts(configs, page) {
    const graph = document.querySelector('.graph');
    benchvizCharts.forEach(chart => chart.destroy());
    benchvizCharts.length = 0;
    graph.innerHTML = '';

    for (const config of configs) {
        const div = document.createElement('div');
        div.innerHTML = `<canvas width='${page.width}' height='${page.height}'></canvas>`;
        graph.appendChild(div);
        benchvizCharts.push(new Chart(div.querySelector('canvas'), config));
    }
}

function formState(form) {
    const checked = {};
    for (const input of form.querySelectorAll('input')) {
        checked[input.name] ??= [];
        if (input.checked) {
            checked[input.name].push(input.value);
        }
    }
    return { checked };
}

async function refresh(page, form) {
    const response = await fetch(page.api, {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify(formState(form)),
    });
    const body = await response.json();
    if (body.success) {
        renderCharts(body.data, page);
    } else {
        console.error('benchviz:', body.error);
    }
}

function initPage(page) {
    renderCharts(page.charts, page);
    if (page.mode === 'live') {
        const form = document.querySelector('.controls main form');
        form.addEventListener('change', () => refresh(page, form));
    }
}
"#
}

/// Writes the static report: an index, one file per page and the assets
pub struct ReportGenerator {
    config: ReportConfig,
}

impl ReportGenerator {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Render every page with `exclusions` (group, value) unchecked.
    ///
    /// An exclusion naming a group a page lacks is ignored for that page.
    pub fn generate(&self, pages: &mut [Page], exclusions: &[(String, String)]) -> Result<Vec<PathBuf>> {
        let output_dir = &self.config.output_dir;
        fs::create_dir_all(output_dir)?;

        let configs: Vec<PageConfig> = pages.iter().map(|p| p.config().clone()).collect();
        let nav: Vec<&PageConfig> = configs.iter().collect();

        let mut written = Vec::new();
        for page in pages.iter_mut() {
            let mut form = FormState::all_checked(page.panel());
            for (group, value) in exclusions {
                if !form.checked.contains_key(group) {
                    debug!("Page {} has no {} control", page.id(), group);
                    continue;
                }
                form.uncheck(group, value)?;
            }

            let charts = page.charts(&form)?;
            let html = render_page(page, &charts, &form, &self.config, &nav, PageMode::Static)?;
            let path = output_dir.join(page.config().file_name());
            fs::write(&path, html)?;
            info!("Wrote {} ({} charts)", path.display(), charts.len());
            written.push(path);
        }

        if written.is_empty() {
            warn!("No pages rendered");
        }

        let index = output_dir.join("index.html");
        fs::write(&index, render_index(&self.config, &nav, PageMode::Static))?;
        written.push(index);

        self.copy_static_assets()?;
        Ok(written)
    }

    fn copy_static_assets(&self) -> Result<()> {
        let assets_dir = self.config.output_dir.join("assets");
        let css_dir = assets_dir.join("css");
        let js_dir = assets_dir.join("js");
        fs::create_dir_all(&css_dir)?;
        fs::create_dir_all(&js_dir)?;

        fs::write(css_dir.join("style.css"), generate_css())?;
        fs::write(js_dir.join("benchviz.js"), generate_js())?;
        Ok(())
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::SIZE;
    use crate::history::History;

    const VECTORS: &str = r#"{"benchmarks": [
        {"name": "SV/dot<&>/32", "real_time": 1.0, "cpu_time": 1.0, "time_unit": "ns"},
        {"name": "SV/axpy/32", "real_time": 2.0, "cpu_time": 2.0, "time_unit": "ns"},
        {"name": "SV/axpy/64", "real_time": 4.0, "cpu_time": 4.0, "time_unit": "ns"}
    ]}"#;

    fn report(dir: &Path) -> ReportConfig {
        let mut report = ReportConfig::default();
        report.output_dir = dir.to_path_buf();
        report.pages.truncate(1);
        report
    }

    fn vector_page(report: &ReportConfig) -> Page {
        let history = History::from_json_str(VECTORS).unwrap();
        Page::from_history(report.pages[0].clone(), history, report).unwrap()
    }

    #[test]
    fn test_render_live_page() {
        let report = ReportConfig::default();
        let page = vector_page(&report);
        let nav: Vec<&PageConfig> = report.pages.iter().collect();
        let form = FormState::all_checked(page.panel());
        let html = render_page(&page, page.cached_charts(), &form, &report, &nav, PageMode::Live).unwrap();

        assert!(html.contains(CHART_JS_CDN));
        assert!(html.contains(r#"<div class="controls"><main><form>"#));
        assert!(html.contains(r#"<div class="graph"></div>"#));
        assert!(html.contains(r#"<script src="/assets/js/benchviz.js"></script>"#));
        assert!(html.contains(r#""mode":"live""#));
        assert!(html.contains(r#"href="/pages/linear_solvers""#));
        assert!(html.contains("dot&lt;&amp;&gt;"));
        assert_eq!(html.matches("</script>").count(), 3);
        assert!(!html.contains(" disabled"));
    }

    #[test]
    fn test_script_json_cannot_close_element() {
        let json = script_json(&vec!["</script><script>alert(1)"]).unwrap();
        assert!(!json.contains("</"));
        assert!(json.contains(r"<\/script>"));
    }

    #[test]
    fn test_render_index() {
        let report = ReportConfig::default();
        let nav: Vec<&PageConfig> = report.pages.iter().collect();
        let html = render_index(&report, &nav, PageMode::Static);
        assert!(html.contains(r#"<a href="sparse_vector.html">Sparse Vector</a>"#));
        assert!(html.contains("<h1>Benchmark History</h1>"));
    }

    #[test]
    fn test_generate_static_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(dir.path());
        let mut pages = vec![vector_page(&report)];

        let generator = ReportGenerator::new(report);
        let written = generator
            .generate(&mut pages, &[(SIZE.to_string(), "1".to_string())])
            .unwrap();
        assert_eq!(written.len(), 2);

        let html = fs::read_to_string(dir.path().join("sparse_vector.html")).unwrap();
        assert!(html.contains(" disabled"));
        assert!(html.contains(r#""mode":"static""#));
        assert!(html.contains("Sparse Vector 32 run(0)"));
        assert!(!html.contains("Sparse Vector 64 run(0)"));

        assert!(dir.path().join("index.html").exists());
        assert!(dir.path().join("assets/css/style.css").exists());
        assert!(dir.path().join("assets/js/benchviz.js").exists());
    }

    #[test]
    fn test_generate_rejects_unknown_value() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(dir.path());
        let mut pages = vec![vector_page(&report)];
        let generator = ReportGenerator::new(report);
        assert!(generator
            .generate(&mut pages, &[(SIZE.to_string(), "9".to_string())])
            .is_err());
        // groups the page lacks are skipped
        assert!(generator
            .generate(&mut pages, &[("layout".to_string(), "Dense".to_string())])
            .is_ok());
    }
}

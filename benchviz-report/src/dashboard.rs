//! Live dashboard: serves the pages and filters charts per form change

use crate::chart::ChartConfig;
use crate::filter::FormState;
use crate::html_report::{generate_css, generate_js, render_index, render_page, PageMode};
use crate::page::{load_pages, Page, PageSummary};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use benchviz_common::{BenchVizError, PageConfig, ReportConfig};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    report: Arc<ReportConfig>,
    /// Directory relative page sources resolve against
    base: Arc<PathBuf>,
    pages: Arc<IndexMap<String, Arc<RwLock<Page>>>>,
}

impl AppState {
    pub fn new(report: ReportConfig, base: PathBuf, pages: Vec<Page>) -> Self {
        let pages = pages
            .into_iter()
            .map(|page| (page.id().to_string(), Arc::new(RwLock::new(page))))
            .collect();
        Self {
            report: Arc::new(report),
            base: Arc::new(base),
            pages: Arc::new(pages),
        }
    }

    /// Load every configured page; pages that fail are logged and left out
    pub async fn load(report: ReportConfig, base: PathBuf) -> Self {
        let pages = load_pages(&report, &base).await;
        info!("Loaded {} of {} pages", pages.len(), report.pages.len());
        Self::new(report, base, pages)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, id: &str) -> Result<&Arc<RwLock<Page>>, ApiError> {
        self.pages
            .get(id)
            .ok_or_else(|| ApiError(BenchVizError::UnknownPage(id.to_string())))
    }

    fn nav(&self) -> Vec<&PageConfig> {
        self.report
            .pages
            .iter()
            .filter(|p| self.pages.contains_key(&p.id))
            .collect()
    }
}

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Handler error, rendered as a failed [`ApiResponse`]
#[derive(Debug)]
pub struct ApiError(pub BenchVizError);

impl From<BenchVizError> for ApiError {
    fn from(error: BenchVizError) -> Self {
        Self(error)
    }
}

fn status_for(error: &BenchVizError) -> StatusCode {
    match error {
        BenchVizError::UnknownPage(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        warn!("Request failed ({}): {}", status, self.0);
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/pages/:id", get(live_page))
        .route("/assets/css/style.css", get(stylesheet))
        .route("/assets/js/benchviz.js", get(script))
        .route("/api/health", get(health_check))
        .route("/api/pages", get(list_pages))
        .route("/api/pages/:id/charts", get(page_charts).post(filter_charts))
        .route("/api/pages/:id/reload", axum::routing::post(reload_page))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.report, &state.nav(), PageMode::Live))
}

async fn live_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let page = state.page(&id)?.read().await;
    let form = FormState::all_checked(page.panel());
    let html = render_page(
        &page,
        page.cached_charts(),
        &form,
        &state.report,
        &state.nav(),
        PageMode::Live,
    )?;
    Ok(Html(html))
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], generate_css())
}

async fn script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/javascript")], generate_js())
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HashMap<String, String>>> {
    let mut status = HashMap::new();
    status.insert("status".to_string(), "healthy".to_string());
    status.insert("service".to_string(), "benchviz-dashboard".to_string());
    status.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    status.insert("pages".to_string(), state.page_count().to_string());

    Json(ApiResponse::success(status))
}

async fn list_pages(State(state): State<AppState>) -> Json<ApiResponse<Vec<PageSummary>>> {
    let mut summaries = Vec::with_capacity(state.pages.len());
    for page in state.pages.values() {
        summaries.push(page.read().await.summary());
    }
    Json(ApiResponse::success(summaries))
}

async fn page_charts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ChartConfig>> {
    let page = state.page(&id)?.read().await;
    Ok(Json(ApiResponse::success(page.cached_charts().to_vec())))
}

async fn filter_charts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<FormState>,
) -> ApiResult<Vec<ChartConfig>> {
    let entry = state.page(&id)?;

    {
        let page = entry.read().await;
        if page.requested_field(&form) == page.cached_field() {
            return Ok(Json(ApiResponse::success(page.filtered(&form)?)));
        }
    }

    // field changed: the cache is rebuilt under the write lock
    let mut page = entry.write().await;
    let charts = page.charts(&form)?;
    Ok(Json(ApiResponse::success(charts)))
}

async fn reload_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PageSummary> {
    let entry = state.page(&id)?;
    let config = entry.read().await.config().clone();

    let fresh = Page::load(&config, &state.report, &state.base).await?;
    let mut page = entry.write().await;
    *page = fresh;
    info!("Reloaded page {}", id);
    Ok(Json(ApiResponse::success(page.summary())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SOLVERS: &str = r#"[
        {"benchmarks": [
            {"name": "LS/gaussDense/16", "real_time": 1.0, "cpu_time": 0.9, "time_unit": "ns", "lns_iterations": 1},
            {"name": "LS/gaussSparse/16", "real_time": 2.0, "cpu_time": 1.9, "time_unit": "ns", "lns_iterations": 2}
        ]},
        {"benchmarks": [
            {"name": "LS/gaussDense/16", "real_time": 1.5, "cpu_time": 1.4, "time_unit": "ns", "lns_iterations": 1}
        ]}
    ]"#;

    fn state(base: PathBuf) -> AppState {
        let report = ReportConfig::default();
        let config = report.find_page("linear_solvers").unwrap().clone();
        let page = Page::from_history(config, History::from_json_str(SOLVERS).unwrap(), &report).unwrap();
        AppState::new(report, base, vec![page])
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_listing() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = send(app.clone(), get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["pages"], "1");

        let (_, body) = send(app, get_request("/api/pages")).await;
        assert_eq!(body["data"][0]["id"], "linear_solvers");
        assert_eq!(body["data"][0]["runs"], 2);
    }

    #[tokio::test]
    async fn test_filter_charts() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = send(
            app.clone(),
            post(
                "/api/pages/linear_solvers/charts",
                json!({"checked": {"layout": ["Dense"], "history": ["1"]}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let chart = &body["data"][0]["data"];
        assert_eq!(chart["labels"], json!(["gaussDense (ns)"]));
        assert_eq!(chart["datasets"].as_array().unwrap().len(), 1);
        assert_eq!(chart["datasets"][0]["data"], json!([1.5]));

        let (_, body) = send(app, get_request("/api/pages/linear_solvers/charts")).await;
        assert_eq!(body["data"][0]["data"]["labels"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_field_change_over_http() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = send(
            app.clone(),
            post(
                "/api/pages/linear_solvers/charts",
                json!({"checked": {"field": ["lns_iterations"]}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["data"]["labels"], json!(["gaussDense", "gaussSparse"]));

        let (_, body) = send(app, get_request("/api/pages")).await;
        assert_eq!(body["data"][0]["field"], "lns_iterations");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = router(state(PathBuf::from(".")));
        let (status, body) = send(app.clone(), get_request("/api/pages/missing/charts")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            app.clone(),
            post("/api/pages/linear_solvers/charts", json!({"checked": {"color": ["red"]}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // relative source does not exist under the base directory
        let (status, _) = send(app, post("/api/pages/linear_solvers/reload", json!({}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_reload_reads_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(
            dir.path().join("data/linear_solvers_benchmarks.json"),
            r#"{"benchmarks": [{"name": "LS/cgDense/16", "real_time": 5.0, "cpu_time": 5.0, "time_unit": "ns", "lns_iterations": 3}]}"#,
        )
        .unwrap();

        let app = router(state(dir.path().to_path_buf()));
        let (status, body) = send(app.clone(), post("/api/pages/linear_solvers/reload", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["runs"], 1);

        let (_, body) = send(app, get_request("/api/pages/linear_solvers/charts")).await;
        assert_eq!(body["data"][0]["data"]["labels"], json!(["cgDense (ns)"]));
    }

    #[tokio::test]
    async fn test_live_page_markup() {
        let app = router(state(PathBuf::from(".")));
        let response = app.oneshot(get_request("/pages/linear_solvers")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("<legend>layout</legend>"));
        assert!(html.contains(r#""api":"/api/pages/linear_solvers/charts""#));
    }
}

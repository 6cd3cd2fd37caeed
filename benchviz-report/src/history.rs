//! Benchmark history documents and the loader that fetches them
//!
//! A history document is a JSON array of snapshots, each one the output of a
//! single Google Benchmark run. A bare run object (not wrapped in an array)
//! is accepted as a history of one snapshot, so the harness output can be
//! charted directly.

use crate::name::BenchmarkName;
use benchviz_common::{BenchVizError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Unit of `real_time` / `cpu_time`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[default]
    Ns,
    Us,
    Ms,
    S,
}

impl TimeUnit {
    fn nanos(self) -> f64 {
        match self {
            TimeUnit::Ns => 1.0,
            TimeUnit::Us => 1e3,
            TimeUnit::Ms => 1e6,
            TimeUnit::S => 1e9,
        }
    }

    /// Convert `value` expressed in `self` into `target`
    pub fn convert(self, value: f64, target: TimeUnit) -> f64 {
        if self == target {
            value
        } else {
            value * self.nanos() / target.nanos()
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnit::Ns => write!(f, "ns"),
            TimeUnit::Us => write!(f, "us"),
            TimeUnit::Ms => write!(f, "ms"),
            TimeUnit::S => write!(f, "s"),
        }
    }
}

/// One benchmark measurement as emitted by the harness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    /// `group/test/size`, parsed positionally
    pub name: String,
    /// `iteration` or `aggregate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub real_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_time: Option<f64>,
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// User counters and any other members the harness adds
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BenchmarkRecord {
    pub fn parsed_name(&self) -> Result<BenchmarkName<'_>> {
        BenchmarkName::parse(&self.name)
    }

    /// Numeric user counter by name
    pub fn counter(&self, name: &str) -> Option<f64> {
        self.extra.get(name).and_then(|v| v.as_f64())
    }

    /// Names of the numeric members that can be charted as custom fields
    pub fn counter_names(&self) -> impl Iterator<Item = &str> {
        self.extra
            .iter()
            .filter(|(key, value)| value.is_number() && !NON_COUNTER_KEYS.contains(&key.as_str()))
            .map(|(key, _)| key.as_str())
    }

    pub fn is_aggregate(&self) -> bool {
        self.run_type.as_deref() == Some("aggregate")
    }

    fn convert_times(&mut self, target: TimeUnit) {
        let unit = self.time_unit;
        self.real_time = self.real_time.map(|v| unit.convert(v, target));
        self.cpu_time = self.cpu_time.map(|v| unit.convert(v, target));
        self.time_unit = target;
    }
}

/// Numeric harness bookkeeping members that are not measurements
const NON_COUNTER_KEYS: &[&str] = &[
    "family_index",
    "per_family_instance_index",
    "repetitions",
    "repetition_index",
    "threads",
];

/// One fetched benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Harness context (host, date, build type), kept verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    pub benchmarks: Vec<BenchmarkRecord>,
}

impl HistorySnapshot {
    /// `context.date` when the harness recorded one
    pub fn date(&self) -> Option<&str> {
        self.context.as_ref()?.get("date")?.as_str()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryDocument {
    Many(Vec<HistorySnapshot>),
    Single(HistorySnapshot),
}

/// Ordered list of snapshots, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    pub snapshots: Vec<HistorySnapshot>,
}

impl History {
    pub fn new(snapshots: Vec<HistorySnapshot>) -> Self {
        Self { snapshots }
    }

    /// Parse either a snapshot array or a single harness output object
    pub fn from_json_str(content: &str) -> Result<Self> {
        let snapshots = match serde_json::from_str::<HistoryDocument>(content) {
            Ok(HistoryDocument::Many(snapshots)) => snapshots,
            Ok(HistoryDocument::Single(snapshot)) => vec![snapshot],
            // Re-parse as the array form so the error names the real problem
            Err(_) => serde_json::from_str::<Vec<HistorySnapshot>>(content)?,
        };
        Ok(Self { snapshots })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The snapshot metadata is extracted from
    pub fn first(&self) -> Result<&HistorySnapshot> {
        self.snapshots.first().ok_or(BenchVizError::EmptyHistory)
    }

    pub fn push(&mut self, snapshot: HistorySnapshot) {
        self.snapshots.push(snapshot);
    }

    /// Drop mean/median/stddev rows produced by `--benchmark_repetitions`
    pub fn drop_aggregates(&mut self) {
        let mut dropped = 0;
        for snapshot in &mut self.snapshots {
            let before = snapshot.benchmarks.len();
            snapshot.benchmarks.retain(|record| !record.is_aggregate());
            dropped += before - snapshot.benchmarks.len();
        }
        if dropped > 0 {
            debug!("Dropped {} aggregate records", dropped);
        }
    }

    /// Express every test's times in the unit it had in the first snapshot,
    /// so bars from different runs share a scale.
    pub fn normalize_time_units(&mut self) {
        let Some((first, rest)) = self.snapshots.split_first_mut() else {
            return;
        };

        let units: HashMap<&str, TimeUnit> = first
            .benchmarks
            .iter()
            .map(|record| (record.name.as_str(), record.time_unit))
            .collect();

        for snapshot in rest {
            for record in &mut snapshot.benchmarks {
                if let Some(&unit) = units.get(record.name.as_str()) {
                    if unit != record.time_unit {
                        record.convert_times(unit);
                    }
                }
            }
        }
    }

    /// Names of custom counters present in the first snapshot, first-seen order
    pub fn counter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        if let Some(first) = self.snapshots.first() {
            for record in &first.benchmarks {
                for name in record.counter_names() {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the history as a snapshot array
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json_pretty()?).await?;
        info!("Saved {} snapshots to {}", self.len(), path.display());
        Ok(())
    }
}

/// Where a JSON document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Path(PathBuf),
    Url(String),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::Path(PathBuf::from(source))
        }
    }

    /// Resolve relative paths against `base`; URLs are left alone
    pub fn relative_to(self, base: &Path) -> Self {
        match self {
            DataSource::Path(path) if path.is_relative() => DataSource::Path(base.join(path)),
            other => other,
        }
    }

    /// Fetch the raw document body
    pub async fn fetch(&self) -> Result<String> {
        match self {
            DataSource::Path(path) => Ok(tokio::fs::read_to_string(path).await?),
            DataSource::Url(url) => {
                let response = reqwest::get(url)
                    .await
                    .map_err(|e| BenchVizError::Http(e.to_string()))?
                    .error_for_status()
                    .map_err(|e| BenchVizError::Http(e.to_string()))?;
                response
                    .text()
                    .await
                    .map_err(|e| BenchVizError::Http(e.to_string()))
            }
        }
    }

    /// Fetch and deserialize the document
    pub async fn load_json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.fetch().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Path(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Fetch a history document and prepare it for charting
pub async fn load_history(source: &DataSource, skip_aggregates: bool) -> Result<History> {
    let body = source.fetch().await?;
    let mut history = History::from_json_str(&body)?;

    if history.is_empty() {
        warn!("History at {} contains no snapshots", source);
        return Err(BenchVizError::EmptyHistory);
    }

    if skip_aggregates {
        history.drop_aggregates();
    }
    history.normalize_time_units();

    info!(
        "Loaded {} snapshots ({} benchmarks in the first) from {}",
        history.len(),
        history.snapshots[0].benchmarks.len(),
        source
    );
    Ok(history)
}

/// Append one harness output file to a history file, creating it if absent
pub async fn append_run(history_path: &Path, run_path: &Path) -> Result<History> {
    let mut history = if tokio::fs::try_exists(history_path).await? {
        let body = tokio::fs::read_to_string(history_path).await?;
        History::from_json_str(&body)?
    } else {
        History::default()
    };

    let run = History::from_json_str(&tokio::fs::read_to_string(run_path).await?)?;
    for snapshot in run.snapshots {
        history.push(snapshot);
    }

    history.save(history_path).await?;
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: &str = r#"{
        "context": {"date": "2024-03-01T10:00:00+01:00", "num_cpus": 8},
        "benchmarks": [
            {"name": "F/a/32", "run_type": "iteration", "iterations": 100,
             "real_time": 1.5, "cpu_time": 1.4, "time_unit": "us", "family_index": 0},
            {"name": "F/a/32_mean", "run_type": "aggregate",
             "real_time": 1.5, "cpu_time": 1.4, "time_unit": "us"},
            {"name": "F/b/32", "run_type": "iteration",
             "real_time": 3.0, "cpu_time": 2.9, "time_unit": "us", "lns_iterations": 17}
        ]
    }"#;

    #[test]
    fn test_single_run_document() {
        let history = History::from_json_str(RUN).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.snapshots[0].date(), Some("2024-03-01T10:00:00+01:00"));
        assert_eq!(history.snapshots[0].benchmarks.len(), 3);
    }

    #[test]
    fn test_array_document() {
        let doc = format!("[{}, {}]", RUN, RUN);
        let history = History::from_json_str(&doc).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_invalid_document() {
        assert!(History::from_json_str("{\"nope\": 1}").is_err());
        assert!(History::from_json_str("not json").is_err());
    }

    #[test]
    fn test_drop_aggregates() {
        let mut history = History::from_json_str(RUN).unwrap();
        history.drop_aggregates();
        assert_eq!(history.snapshots[0].benchmarks.len(), 2);
        assert!(history.snapshots[0].benchmarks.iter().all(|b| !b.is_aggregate()));
    }

    #[test]
    fn test_counter_names_skip_bookkeeping() {
        let history = History::from_json_str(RUN).unwrap();
        assert_eq!(history.counter_names(), vec!["lns_iterations".to_string()]);
    }

    #[test]
    fn test_time_unit_convert() {
        assert_eq!(TimeUnit::Us.convert(1.5, TimeUnit::Ns), 1500.0);
        assert_eq!(TimeUnit::Ms.convert(2.0, TimeUnit::Ms), 2.0);
        assert!((TimeUnit::Ns.convert(2500.0, TimeUnit::Us) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_time_units() {
        let later = RUN.replace("\"time_unit\": \"us\"", "\"time_unit\": \"ns\"")
            .replace("\"real_time\": 1.5", "\"real_time\": 1500.0");
        let doc = format!("[{}, {}]", RUN, later);
        let mut history = History::from_json_str(&doc).unwrap();
        history.normalize_time_units();

        let record = &history.snapshots[1].benchmarks[0];
        assert_eq!(record.time_unit, TimeUnit::Us);
        assert!((record.real_time.unwrap() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_record_roundtrip_keeps_counters() {
        let history = History::from_json_str(RUN).unwrap();
        let json = history.to_json_pretty().unwrap();
        let back = History::from_json_str(&json).unwrap();
        assert_eq!(back.snapshots[0].benchmarks[2].counter("lns_iterations"), Some(17.0));
    }

    #[test]
    fn test_data_source_parse() {
        assert_eq!(
            DataSource::parse("https://ci.example.com/bench.json"),
            DataSource::Url("https://ci.example.com/bench.json".to_string())
        );
        let source = DataSource::parse("data/bench.json").relative_to(Path::new("/srv"));
        assert_eq!(source, DataSource::Path(PathBuf::from("/srv/data/bench.json")));
    }

    #[tokio::test]
    async fn test_load_history_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, format!("[{}]", RUN)).unwrap();

        let history = load_history(&DataSource::Path(path), true).await.unwrap();
        assert_eq!(history.snapshots[0].benchmarks.len(), 2);
    }

    #[tokio::test]
    async fn test_load_empty_history_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[]").unwrap();

        let err = load_history(&DataSource::Path(path), true).await.unwrap_err();
        assert!(matches!(err, BenchVizError::EmptyHistory));
    }

    #[tokio::test]
    async fn test_append_run_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let history_path = dir.path().join("out").join("history.json");
        let run_path = dir.path().join("run.json");
        std::fs::write(&run_path, RUN).unwrap();

        let first = append_run(&history_path, &run_path).await.unwrap();
        assert_eq!(first.len(), 1);

        let second = append_run(&history_path, &run_path).await.unwrap();
        assert_eq!(second.len(), 2);

        let on_disk = std::fs::read_to_string(&history_path).unwrap();
        assert_eq!(History::from_json_str(&on_disk).unwrap().len(), 2);
    }
}

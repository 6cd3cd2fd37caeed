//! Solver convergence documents and their line charts
//!
//! The document maps a problem size to the runs of every solver at that size:
//! `{ "32": [ { "solver": "Jacobi", "error": [...], "iterationsUsed": [...], "time": [...] } ] }`.

use crate::chart::{ChartConfig, ChartData, ChartKind, ChartOptions, ColorSpec, Dataset, SeriesAxis};
use crate::palette::line_color;
use benchviz_common::{BenchVizError, ConvergenceFieldConfig, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One solver's series at one size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverRun {
    pub solver: String,
    #[serde(flatten)]
    pub series: IndexMap<String, serde_json::Value>,
}

impl SolverRun {
    /// Numeric values of `field`; non-numeric entries are dropped
    pub fn values(&self, field: &str) -> Option<Vec<f64>> {
        let array = self.series.get(field)?.as_array()?;
        Some(array.iter().filter_map(|v| v.as_f64()).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConvergenceDocument {
    pub sizes: IndexMap<String, Vec<SolverRun>>,
}

impl ConvergenceDocument {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Sizes in ascending numeric order; non-numeric keys follow in document order
    pub fn ordered(&self) -> Vec<(&str, &[SolverRun])> {
        let mut entries: Vec<(&str, &[SolverRun])> = self
            .sizes
            .iter()
            .map(|(size, runs)| (size.as_str(), runs.as_slice()))
            .collect();
        entries.sort_by_key(|(size, _)| size.parse::<u64>().unwrap_or(u64::MAX));
        entries
    }

    /// Field names present on any solver run, first-seen order
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for run in self.sizes.values().flatten() {
            for (key, value) in &run.series {
                if value.is_array() && !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
        names
    }
}

/// Build one line chart per size for `field`.
///
/// Labels run from `1 + offset` to the length of the longest series; each
/// solver's values are scaled and the first `offset` points skipped.
pub fn convergence_charts(
    document: &ConvergenceDocument,
    field: &ConvergenceFieldConfig,
    offset: usize,
) -> Result<Vec<ChartConfig>> {
    let mut charts = Vec::new();
    let mut found = false;

    for (size, runs) in document.ordered() {
        let series: Vec<(&str, Vec<f64>)> = runs
            .iter()
            .filter_map(|run| run.values(&field.name).map(|v| (run.solver.as_str(), v)))
            .collect();
        found |= !series.is_empty();

        let longest = series.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let labels: Vec<String> = ((1 + offset)..=longest).map(|i| i.to_string()).collect();

        let datasets = series
            .into_iter()
            .enumerate()
            .map(|(i, (solver, values))| {
                let mut data: Vec<Option<f64>> = values
                    .into_iter()
                    .skip(offset)
                    .map(|v| Some(v * field.scale))
                    .collect();
                data.resize(labels.len(), None);

                Dataset {
                    label: format!("{} ({})", solver, size),
                    data,
                    border_width: None,
                    background_color: None,
                    border_color: Some(ColorSpec::Single(line_color(i))),
                    fill: Some(false),
                    tension: Some(0.1),
                }
            })
            .collect();

        charts.push(ChartConfig {
            kind: ChartKind::Line,
            data: ChartData {
                labels,
                datasets,
                series: SeriesAxis::Tests,
            },
            options: ChartOptions::default().with_title(field.name.clone()),
        });
    }

    if !found && !document.sizes.is_empty() {
        return Err(BenchVizError::UnknownField(field.name.clone()));
    }
    Ok(charts)
}

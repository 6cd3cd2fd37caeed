//! Chart.js datasets built from benchmark history
//!
//! Every chart keeps its labels, each dataset's values and each dataset's
//! per-point colors positionally aligned. The only ways to drop points or
//! series are [`ChartData::retain_points`] and [`ChartData::retain_datasets`],
//! which edit all parallel arrays together.

use crate::field::MeasuredField;
use crate::history::History;
use crate::metadata::MetadataEntry;
use crate::palette::{run_alpha, Color, BAR_ALPHA};
use benchviz_common::ChartSettings;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Chart.js chart type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

/// Which axis the datasets of a chart enumerate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeriesAxis {
    /// One dataset per history run, labels are tests
    #[default]
    Runs,
    /// One dataset per test or solver, labels are runs or iterations
    Tests,
}

/// A single color or one color per point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Single(Color),
    PerPoint(Vec<Color>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    /// `None` serializes as `null`, which Chart.js draws as a gap
    pub data: Vec<Option<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<ColorSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<ColorSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

impl Dataset {
    fn empty(label: String, points: usize) -> Self {
        Self {
            label,
            data: vec![None; points],
            border_width: None,
            background_color: None,
            border_color: None,
            fill: None,
            tension: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    #[serde(skip)]
    pub series: SeriesAxis,
}

impl ChartData {
    /// Keep the points for which `keep(index, label)` holds, in every
    /// parallel array at once.
    pub fn retain_points<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &str) -> bool,
    {
        let mask: Vec<bool> = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| keep(i, label))
            .collect();

        retain_by_mask(&mut self.labels, &mask);
        for dataset in &mut self.datasets {
            retain_by_mask(&mut dataset.data, &mask);
            for colors in [&mut dataset.background_color, &mut dataset.border_color] {
                if let Some(ColorSpec::PerPoint(colors)) = colors {
                    retain_by_mask(colors, &mask);
                }
            }
        }
    }

    pub fn retain_datasets<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &Dataset) -> bool,
    {
        let mut index = 0;
        self.datasets.retain(|dataset| {
            let kept = keep(index, dataset);
            index += 1;
            kept
        });
    }

    /// Keep the runs for which `keep(run)` holds
    pub fn retain_runs<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        match self.series {
            SeriesAxis::Runs => self.retain_datasets(|i, _| keep(i)),
            SeriesAxis::Tests => self.retain_points(|i, _| keep(i)),
        }
    }

    /// Keep the tests for which `keep(test, label)` holds
    pub fn retain_tests<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &str) -> bool,
    {
        match self.series {
            SeriesAxis::Runs => self.retain_points(keep),
            SeriesAxis::Tests => self.retain_datasets(|i, dataset| keep(i, &dataset.label)),
        }
    }

    /// Labels of the tests currently in the chart
    pub fn test_labels(&self) -> Vec<&str> {
        match self.series {
            SeriesAxis::Runs => self.labels.iter().map(String::as_str).collect(),
            SeriesAxis::Tests => self.datasets.iter().map(|d| d.label.as_str()).collect(),
        }
    }

    /// Whether every parallel array has the length of `labels`
    pub fn is_aligned(&self) -> bool {
        let points = self.labels.len();
        self.datasets.iter().all(|dataset| {
            let colors_aligned = [&dataset.background_color, &dataset.border_color]
                .iter()
                .all(|spec| match spec {
                    Some(ColorSpec::PerPoint(colors)) => colors.len() == points,
                    _ => true,
                });
            dataset.data.len() == points && colors_aligned
        })
    }
}

fn retain_by_mask<T>(items: &mut Vec<T>, mask: &[bool]) {
    let mut index = 0;
    items.retain(|_| {
        let kept = mask.get(index).copied().unwrap_or(false);
        index += 1;
        kept
    });
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub display: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plugins {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub begin_at_zero: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scales {
    pub y: Axis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scales: Option<Scales>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Plugins>,
}

impl ChartOptions {
    pub fn with_title<S: Into<String>>(mut self, text: S) -> Self {
        self.plugins = Some(Plugins {
            title: Title {
                display: true,
                text: text.into(),
            },
        });
        self
    }
}

/// Complete Chart.js configuration for one canvas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

/// Settings for building history charts
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Page name, prefix of bar dataset labels
    pub name: String,
    pub field: MeasuredField,
    pub kind: ChartKind,
    pub begin_at_zero: bool,
}

impl GraphOptions {
    pub fn new<S: Into<String>>(name: S, field: MeasuredField, kind: ChartKind) -> Self {
        Self {
            name: name.into(),
            field,
            kind,
            begin_at_zero: ChartSettings::default().begin_at_zero,
        }
    }
}

/// Build one chart per metadata entry from every snapshot of `history`.
///
/// A record lands at the index of its test name, so a run missing a test
/// leaves a gap instead of shifting later values. Repeated names within one
/// run overwrite, the last one wins.
pub fn construct_graph(
    metadata: &[MetadataEntry],
    history: &History,
    options: &GraphOptions,
) -> Vec<ChartConfig> {
    let runs = history.len();
    let mut charts: Vec<ChartData> = metadata
        .iter()
        .map(|entry| match options.kind {
            ChartKind::Bar => bar_chart(entry, runs, options),
            ChartKind::Line => line_chart(entry, runs, options),
        })
        .collect();

    let size_index: HashMap<i64, usize> = metadata
        .iter()
        .enumerate()
        .map(|(i, entry)| (entry.size, i))
        .collect();

    for (run, snapshot) in history.snapshots.iter().enumerate() {
        for record in &snapshot.benchmarks {
            let Ok(name) = record.parsed_name() else {
                continue;
            };
            let Some(&chart_index) = size_index.get(&name.size) else {
                debug!("Run {} has size {} absent from the first run", run, name.size);
                continue;
            };
            let Some(test) = metadata[chart_index].index_of(name.test) else {
                continue;
            };

            let value = options.field.value(record);
            let chart = &mut charts[chart_index];
            match chart.series {
                SeriesAxis::Runs => chart.datasets[run].data[test] = value,
                SeriesAxis::Tests => chart.datasets[test].data[run] = value,
            }
        }
    }

    let scale_options = ChartOptions {
        scales: Some(Scales {
            y: Axis {
                begin_at_zero: options.begin_at_zero,
            },
        }),
        plugins: None,
    };

    charts
        .into_iter()
        .zip(metadata)
        .map(|(data, entry)| {
            let chart_options = match options.kind {
                ChartKind::Bar => scale_options.clone(),
                ChartKind::Line => scale_options
                    .clone()
                    .with_title(format!("{} {} ({})", options.name, entry.size, options.field)),
            };
            ChartConfig {
                kind: options.kind,
                data,
                options: chart_options,
            }
        })
        .collect()
}

fn bar_chart(entry: &MetadataEntry, runs: usize, options: &GraphOptions) -> ChartData {
    let labels = entry.labels(&options.field);
    let datasets = (0..runs)
        .map(|run| {
            let alpha = run_alpha(run, runs);
            let mut dataset = Dataset::empty(
                format!("{} {} run({})", options.name, entry.size, run),
                labels.len(),
            );
            dataset.border_width = Some(1);
            dataset.background_color = Some(ColorSpec::PerPoint(
                entry.colors.iter().map(|c| c.with_alpha(alpha)).collect(),
            ));
            dataset
        })
        .collect();

    ChartData {
        labels,
        datasets,
        series: SeriesAxis::Runs,
    }
}

fn line_chart(entry: &MetadataEntry, runs: usize, options: &GraphOptions) -> ChartData {
    let datasets = entry
        .labels(&options.field)
        .into_iter()
        .zip(&entry.colors)
        .map(|(label, color)| {
            let mut dataset = Dataset::empty(label, runs);
            dataset.border_color = Some(ColorSpec::Single(*color));
            dataset.background_color = Some(ColorSpec::Single(color.with_alpha(BAR_ALPHA)));
            dataset.fill = Some(false);
            dataset.tension = Some(0.1);
            dataset
        })
        .collect();

    ChartData {
        labels: (0..runs).map(|run| format!("run({})", run)).collect(),
        datasets,
        series: SeriesAxis::Tests,
    }
}

//! Size and test-name metadata extracted from a snapshot

use crate::field::MeasuredField;
use crate::history::{BenchmarkRecord, TimeUnit};
use crate::name::BenchmarkName;
use crate::palette::{Color, Palette};
use benchviz_common::{BenchVizError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::warn;

/// Metadata for one distinct size.
///
/// `names`, `time_units` and `colors` are parallel arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataEntry {
    pub size: i64,
    pub names: Vec<String>,
    pub time_units: Vec<TimeUnit>,
    pub colors: Vec<Color>,
}

impl MetadataEntry {
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Chart labels; time fields carry the unit, e.g. `addition (ns)`
    pub fn labels(&self, field: &MeasuredField) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.time_units)
            .map(|(name, unit)| {
                if field.is_time() {
                    format!("{} ({})", name, unit)
                } else {
                    name.clone()
                }
            })
            .collect()
    }
}

/// Derive per-size metadata from a flat record list.
///
/// Sizes keep first-seen order. Test names come from the records of the first
/// size only, deduplicated in first-seen order, and are shared by every size;
/// a size whose test set differs is reported and its missing cells become gaps
/// during chart construction. Each name gets one color from `palette`.
pub fn extract_metadata(
    records: &[BenchmarkRecord],
    palette: &mut Palette,
) -> Result<Vec<MetadataEntry>> {
    let parsed: Vec<(BenchmarkName<'_>, &BenchmarkRecord)> = records
        .iter()
        .filter_map(|record| match record.parsed_name() {
            Ok(name) => Some((name, record)),
            Err(e) => {
                warn!("Skipping record: {}", e);
                None
            }
        })
        .collect();

    let sizes: IndexSet<i64> = parsed.iter().map(|(name, _)| name.size).collect();
    let Some(&first_size) = sizes.first() else {
        return Err(BenchVizError::EmptySnapshot(0));
    };

    let mut tests: IndexMap<&str, TimeUnit> = IndexMap::new();
    for (name, record) in parsed.iter().filter(|(name, _)| name.size == first_size) {
        tests.entry(name.test).or_insert(record.time_unit);
    }

    for &size in sizes.iter().skip(1) {
        let at_size: IndexSet<&str> = parsed
            .iter()
            .filter(|(name, _)| name.size == size)
            .map(|(name, _)| name.test)
            .collect();
        let missing: Vec<&str> = tests.keys().filter(|t| !at_size.contains(*t)).copied().collect();
        let extra: Vec<&str> = at_size.iter().filter(|t| !tests.contains_key(*t)).copied().collect();
        if !missing.is_empty() || !extra.is_empty() {
            warn!(
                "Size {} differs from size {}: missing {:?}, not charted {:?}",
                size, first_size, missing, extra
            );
        }
    }

    let names: Vec<String> = tests.keys().map(|t| t.to_string()).collect();
    let colors = palette.take(names.len(), 1.0);

    Ok(sizes
        .into_iter()
        .map(|size| {
            // a test keeps the first size's unit where this size lacks it
            let time_units = tests
                .iter()
                .map(|(&test, &fallback)| {
                    parsed
                        .iter()
                        .find(|(name, _)| name.size == size && name.test == test)
                        .map_or(fallback, |(_, record)| record.time_unit)
                })
                .collect();
            MetadataEntry {
                size,
                names: names.clone(),
                time_units,
                colors: colors.clone(),
            }
        })
        .collect())
}

//! The measured quantity plotted from each benchmark record

use crate::history::BenchmarkRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which member of a benchmark record supplies the chart value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MeasuredField {
    #[default]
    RealTime,
    CpuTime,
    /// A user counter, e.g. `lns_iterations`
    Custom(String),
}

impl MeasuredField {
    /// Value of this field in `record`, if present and numeric
    pub fn value(&self, record: &BenchmarkRecord) -> Option<f64> {
        match self {
            MeasuredField::RealTime => record.real_time,
            MeasuredField::CpuTime => record.cpu_time,
            MeasuredField::Custom(name) => record.counter(name),
        }
    }

    /// Whether values carry the record's time unit
    pub fn is_time(&self) -> bool {
        !matches!(self, MeasuredField::Custom(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MeasuredField::RealTime => "real_time",
            MeasuredField::CpuTime => "cpu_time",
            MeasuredField::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for MeasuredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MeasuredField {
    fn from(value: String) -> Self {
        match value.as_str() {
            "real_time" => MeasuredField::RealTime,
            "cpu_time" => MeasuredField::CpuTime,
            _ => MeasuredField::Custom(value),
        }
    }
}

impl From<MeasuredField> for String {
    fn from(field: MeasuredField) -> Self {
        field.as_str().to_string()
    }
}

impl FromStr for MeasuredField {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MeasuredField::from(s.to_string()))
    }
}

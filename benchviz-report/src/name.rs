//! Positional parsing of benchmark names (`group/test/size[/...]`)

use benchviz_common::{BenchVizError, Result};

/// A benchmark name split into its positional parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkName<'a> {
    /// Fixture or family, e.g. `LinearSystemsFixture`
    pub group: &'a str,
    /// Test within the group, e.g. `jacobiSolverDenseMatrix`
    pub test: &'a str,
    /// Benchmark argument, usually the input length
    pub size: i64,
}

impl<'a> BenchmarkName<'a> {
    /// Parse `group/test/size`. Segments after the size (`real_time`,
    /// `iterations:10`, ...) are ignored.
    pub fn parse(name: &'a str) -> Result<Self> {
        let mut parts = name.split('/');
        let group = parts.next().unwrap_or_default();
        let (test, size) = match (parts.next(), parts.next()) {
            (Some(test), Some(size)) => (test, size),
            _ => {
                return Err(malformed(name, "expected group/test/size"));
            }
        };

        if test.is_empty() {
            return Err(malformed(name, "empty test segment"));
        }

        let size = parse_size(size).ok_or_else(|| {
            malformed(name, &format!("size segment {:?} is not a number", size))
        })?;

        Ok(Self { group, test, size })
    }
}

fn malformed(name: &str, reason: &str) -> BenchVizError {
    BenchVizError::MalformedName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Google Benchmark emits integral arguments; `1e3`-style values from other
/// harnesses are accepted when they are whole numbers.
fn parse_size(segment: &str) -> Option<i64> {
    let segment = segment.trim();
    if let Ok(value) = segment.parse::<i64>() {
        return Some(value);
    }
    let value = segment.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fixture_name() {
        let name = BenchmarkName::parse("LinearSystemsFixture/jacobiSolverDenseMatrix/64").unwrap();
        assert_eq!(name.group, "LinearSystemsFixture");
        assert_eq!(name.test, "jacobiSolverDenseMatrix");
        assert_eq!(name.size, 64);
    }

    #[test]
    fn test_trailing_segments_ignored() {
        let name = BenchmarkName::parse("SparseVectorFixture/addition/1024/real_time").unwrap();
        assert_eq!(name.test, "addition");
        assert_eq!(name.size, 1024);
    }

    #[test]
    fn test_float_size_coerced() {
        assert_eq!(BenchmarkName::parse("g/t/1e3").unwrap().size, 1000);
        assert!(BenchmarkName::parse("g/t/1.5").is_err());
    }

    #[test]
    fn test_malformed_names() {
        assert!(BenchmarkName::parse("BM_VectorSubtractNew").is_err());
        assert!(BenchmarkName::parse("group/test").is_err());
        assert!(BenchmarkName::parse("group//32").is_err());

        let err = BenchmarkName::parse("g/t/32_mean").unwrap_err();
        assert!(matches!(err, BenchVizError::MalformedName { .. }));
    }
}

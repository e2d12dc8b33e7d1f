//! Error types for the labeling and aggregation pipeline.

use thiserror::Error;

/// Result alias used by the library core.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Validation and I/O failures that abort a pipeline run.
///
/// Statistical gaps (missing numeric values) and join misses are not errors;
/// they are absorbed and reported through the diagnostics on the output.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{source_name}: missing required column `{column}`")]
    MissingColumn { source_name: String, column: String },

    #[error("{source_name}, line {line}: column `{column}` has indicator value {value:?}, expected 0 or 1")]
    InvalidIndicator {
        source_name: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("{source_name}, line {line}: column `{column}` has invalid value {value:?}")]
    InvalidValue {
        source_name: String,
        line: u64,
        column: String,
        value: String,
    },

    #[error("geographic identifier table lists `{name}` more than once")]
    DuplicateGeoId { name: String },

    #[error("census tract {tract} appears more than once in the food atlas")]
    DuplicateTract { tract: u64 },

    #[error("boundary feature {index}: missing or non-numeric property `{property}`")]
    InvalidFeature { index: usize, property: String },

    #[error("{source_name}: CSV error")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },

    #[error("{source_name}: I/O error")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}: JSON error")]
    Json {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An indicator value outside `{0, 1}`, before it is tied to a file and line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column `{column}` has indicator value {value:?}")]
pub struct IndicatorError {
    pub column: &'static str,
    pub value: String,
}

impl IndicatorError {
    pub fn at(self, source_name: &str, line: u64) -> PipelineError {
        PipelineError::InvalidIndicator {
            source_name: source_name.to_string(),
            line,
            column: self.column.to_string(),
            value: self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_error_names_column_and_file() {
        let err = IndicatorError {
            column: "LILATracts_Vehicle",
            value: "2".to_string(),
        }
        .at("atlas.csv", 7);

        let msg = err.to_string();
        assert!(msg.contains("atlas.csv"));
        assert!(msg.contains("line 7"));
        assert!(msg.contains("LILATracts_Vehicle"));
        assert!(msg.contains("\"2\""));
    }

    #[test]
    fn test_missing_column_message() {
        let err = PipelineError::MissingColumn {
            source_name: "census.csv".to_string(),
            column: "Walk".to_string(),
        };
        assert_eq!(err.to_string(), "census.csv: missing required column `Walk`");
    }
}

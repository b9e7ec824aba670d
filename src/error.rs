//! Error types for the analysis pipeline.
//!
//! Reference-data problems abort the run; chart and research-report
//! problems only degrade the output.

use thiserror::Error;

/// Fatal problems with the SNIES reference tables.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to download {table} from {url}")]
    Fetch {
        table: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {table} parquet data")]
    Decode {
        table: &'static str,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("{table} is missing required column {column}")]
    SchemaDrift {
        table: &'static str,
        column: &'static str,
    },
}

/// Non-fatal chart rendering failures. The affected chart key is simply
/// absent from the result bundle.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no data points for {0}")]
    EmptySeries(&'static str),

    #[error("failed to draw {chart}: {message}")]
    Draw { chart: &'static str, message: String },
}

/// Failures talking to the model host or interpreting its output.
///
/// A malformed final report is handled by the delegator itself (it
/// degrades to a placeholder report); these variants are the transport
/// problems that do bubble up.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("cannot connect to Ollama at {0}")]
    Connect(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("Ollama API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse Ollama response")]
    Response(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_drift_message() {
        let err = DataError::SchemaDrift {
            table: "MAESTRO",
            column: "CODIGO_SNIES",
        };
        assert_eq!(
            err.to_string(),
            "MAESTRO is missing required column CODIGO_SNIES"
        );
    }

    #[test]
    fn test_chart_error_message() {
        let err = ChartError::EmptySeries("por_dpto");
        assert!(err.to_string().contains("por_dpto"));
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`StoreGateway`](crate::gateway::StoreGateway).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(String),

    #[error("Unsupported parameter value: {0}")]
    Parameter(String),
}

impl From<neo4rs::Error> for GatewayError {
    fn from(e: neo4rs::Error) -> Self {
        GatewayError::Query(e.to_string())
    }
}

/// Settings that cannot be used to start a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON in {var}: {source}")]
    InvalidJson {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} must be greater than zero")]
    ZeroSize(&'static str),

    #[error("Failed to create directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Neo4j at {0} is not reachable")]
    Unreachable(String),
}

/// File-level and script-level failures. Batch and chunk failures never
/// surface here; they are collected into [`FileSummary`](crate::importer::FileSummary).
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("'{0}' does not yield a usable label or relationship type")]
    InvalidIdentifier(String),

    #[error("Statement {index} of script '{file}' failed: {source}")]
    Script {
        file: String,
        index: usize,
        #[source]
        source: GatewayError,
    },
}

//! Command-line and environment settings.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cypher::IterateOptions;
use crate::error::ConfigError;
use crate::gateway::Neo4jConfig;
use crate::schema::{DualLabelMap, RelLabelMap};

/// Neo4j CSV Loader
///
/// Replays Cypher init scripts, then loads `*_nodes.csv` and
/// `*_relationships.csv` files into Neo4j. Every flag can also be set
/// through the environment variable shown in `--help`.
#[derive(Parser, Debug, Clone)]
#[command(name = "neo4j-loader")]
#[command(about = "Load CSV files into Neo4j using APOC bulk mode")]
pub struct Args {
    /// Neo4j Bolt URI
    #[arg(long, env = "NEO4J_URI", default_value = "bolt://neo4j:7687")]
    pub uri: String,

    /// Neo4j username
    #[arg(long, env = "NEO4J_USER", default_value = "neo4j")]
    pub user: String,

    /// Neo4j password
    #[arg(long, env = "NEO4J_PASSWORD", default_value = "neo4j", hide_env_values = true)]
    pub password: String,

    /// Target database
    #[arg(long, env = "NEO4J_DATABASE", default_value = "neo4j")]
    pub database: String,

    /// Directory containing CSV files
    #[arg(long, env = "IMPORT_DIR", default_value = "/data/import")]
    pub import_dir: PathBuf,

    /// Directory containing `.cypher` init scripts
    #[arg(long, env = "CYPHER_DIR", default_value = "/data/cypher")]
    pub cypher_dir: PathBuf,

    /// Directory for run log files
    #[arg(long, env = "LOG_DIR", default_value = "/data/logs")]
    pub log_dir: PathBuf,

    /// JSON object: relationship type (lower-case) -> [start label, end label]
    #[arg(long, env = "REL_LABEL_MAP_JSON", default_value = "")]
    pub rel_label_map: String,

    /// JSON object: node label -> [primary label, secondary label]
    #[arg(long, env = "DUAL_LABELS_JSON", default_value = "")]
    pub dual_labels: String,

    /// Nodes per merge write
    #[arg(long, env = "BATCH_SIZE", default_value_t = 2000)]
    pub batch_size: usize,

    /// Relationships per apoc.periodic.iterate call
    #[arg(long, env = "APOC_CHUNK", default_value_t = 5000)]
    pub apoc_chunk: usize,

    /// Inner batchSize passed to apoc.periodic.iterate
    #[arg(long, env = "APOC_BATCH_SIZE", default_value_t = 10000)]
    pub apoc_batch_size: usize,

    /// Let APOC apply inner batches in parallel
    #[arg(long, env = "APOC_PARALLEL", default_value_t = true, action = clap::ArgAction::Set)]
    pub apoc_parallel: bool,

    /// Pause between relationship chunk submissions, in milliseconds
    #[arg(long, env = "CHUNK_DELAY_MS", default_value_t = 500)]
    pub chunk_delay_ms: u64,

    /// Report progress every N rows (0 reports only on file completion)
    #[arg(long, env = "PROGRESS_INTERVAL", default_value_t = 1000)]
    pub progress_interval: usize,
}

/// Settings for one run.
///
/// Fields are public so tests and embedders can build one directly.
/// `batch_size`, `apoc_chunk` and `iterate.batch_size` must be non-zero;
/// [`ImporterConfig::validate`] checks this and `Importer::new` calls it.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub neo4j: Neo4jConfig,
    pub import_dir: PathBuf,
    pub cypher_dir: PathBuf,
    pub log_dir: PathBuf,
    pub rel_label_map: RelLabelMap,
    pub dual_labels: DualLabelMap,
    pub batch_size: usize,
    pub apoc_chunk: usize,
    pub iterate: IterateOptions,
    pub chunk_delay: Duration,
    pub progress_interval: usize,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jConfig::default(),
            import_dir: PathBuf::from("/data/import"),
            cypher_dir: PathBuf::from("/data/cypher"),
            log_dir: PathBuf::from("/data/logs"),
            rel_label_map: RelLabelMap::new(),
            dual_labels: DualLabelMap::new(),
            batch_size: 2000,
            apoc_chunk: 5000,
            iterate: IterateOptions::default(),
            chunk_delay: Duration::from_millis(500),
            progress_interval: 1000,
        }
    }
}

impl TryFrom<Args> for ImporterConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let rel_label_map = parse_label_pairs("REL_LABEL_MAP_JSON", &args.rel_label_map)?
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        let dual_labels = parse_label_pairs("DUAL_LABELS_JSON", &args.dual_labels)?;

        let config = Self {
            neo4j: Neo4jConfig {
                uri: args.uri,
                user: args.user,
                password: args.password,
                database: args.database,
            },
            import_dir: args.import_dir,
            cypher_dir: args.cypher_dir,
            log_dir: args.log_dir,
            rel_label_map,
            dual_labels,
            batch_size: args.batch_size,
            apoc_chunk: args.apoc_chunk,
            iterate: IterateOptions {
                batch_size: args.apoc_batch_size,
                parallel: args.apoc_parallel,
            },
            chunk_delay: Duration::from_millis(args.chunk_delay_ms),
            progress_interval: args.progress_interval,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ImporterConfig {
    /// Reject zero batch or chunk sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroSize("batch_size"));
        }
        if self.apoc_chunk == 0 {
            return Err(ConfigError::ZeroSize("apoc_chunk"));
        }
        if self.iterate.batch_size == 0 {
            return Err(ConfigError::ZeroSize("apoc_batch_size"));
        }
        Ok(())
    }

    /// Create the import, script and log directories if they are missing.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for path in [&self.import_dir, &self.cypher_dir, &self.log_dir] {
            std::fs::create_dir_all(path).map_err(|source| ConfigError::Directory {
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Parse `{"key": ["a", "b"], ...}`. Blank input is an empty map; any other
/// shape is a configuration error.
pub fn parse_label_pairs(
    var: &'static str,
    raw: &str,
) -> Result<HashMap<String, (String, String)>, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw).map_err(|source| ConfigError::InvalidJson { var, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["neo4j-loader"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn label_pairs_parse() {
        let map = parse_label_pairs("DUAL_LABELS_JSON", r#"{"Person": ["Person", "Employee"]}"#).unwrap();
        assert_eq!(map["Person"], ("Person".to_string(), "Employee".to_string()));
        assert!(parse_label_pairs("DUAL_LABELS_JSON", "  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_label_pairs_are_rejected() {
        assert!(parse_label_pairs("X", "{not json").is_err());
        assert!(parse_label_pairs("X", r#"{"Person": ["Person"]}"#).is_err());
        assert!(parse_label_pairs("X", r#"{"Person": ["A", "B", "C"]}"#).is_err());
    }

    #[test]
    fn rel_map_keys_are_lowercased() {
        let cfg = ImporterConfig::try_from(args(&[
            "--rel-label-map",
            r#"{"Purchased": ["Customer", "Product"]}"#,
        ]))
        .unwrap();
        assert!(cfg.rel_label_map.contains_key("purchased"));
    }

    #[test]
    fn zero_sizes_are_rejected() {
        let err = ImporterConfig::try_from(args(&["--batch-size", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSize("batch_size")));
        let err = ImporterConfig::try_from(args(&["--apoc-chunk", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSize("apoc_chunk")));
        let err = ImporterConfig::try_from(args(&["--apoc-batch-size", "0"])).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroSize("apoc_batch_size")));
    }

    #[test]
    fn hand_built_config_is_validated() {
        assert!(ImporterConfig::default().validate().is_ok());

        let cfg = ImporterConfig {
            apoc_chunk: 0,
            ..ImporterConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroSize("apoc_chunk"))));
    }

    #[test]
    fn throttle_and_parallel_flags() {
        let cfg = ImporterConfig::try_from(args(&[
            "--chunk-delay-ms",
            "0",
            "--apoc-parallel",
            "false",
        ]))
        .unwrap();
        assert_eq!(cfg.chunk_delay, Duration::ZERO);
        assert!(!cfg.iterate.parallel);
    }
}

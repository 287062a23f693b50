//! Neo4j CSV loader.
//!
//! Replays Cypher init scripts and bulk-loads `*_nodes.csv` /
//! `*_relationships.csv` files through a [`StoreGateway`], merging nodes by
//! `id` and relationships through `apoc.periodic.iterate`.

pub mod batch;
pub mod config;
pub mod cypher;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod ident;
pub mod importer;
pub mod logging;
pub mod progress;
pub mod schema;

pub use config::{Args, ImporterConfig};
pub use cypher::Statement;
pub use error::{ConfigError, GatewayError, ImportError};
pub use gateway::{Neo4jConfig, Neo4jGateway, StoreGateway};
pub use importer::{BatchFailure, FileKind, FileSummary, ImportSummary, Importer, RunSummary};
pub use progress::RunContext;

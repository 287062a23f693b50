//! Import orchestration: script replay, node loading, relationship loading.
//!
//! Files, batches and chunks are submitted strictly one after another. A
//! failed batch or chunk is logged, recorded in the file's [`FileSummary`]
//! and skipped. A file whose label or type cannot be used in a query is
//! recorded as failed and skipped. Script failures and unreadable files stop
//! the run.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};
use serde::Serialize;

use crate::batch::partition;
use crate::config::ImporterConfig;
use crate::cypher::{self, Statement, Template};
use crate::error::{ConfigError, ImportError};
use crate::extract;
use crate::gateway::StoreGateway;
use crate::progress::RunContext;
use crate::schema::{self, LabelSpec};

pub const SCRIPT_EXTENSION: &str = ".cypher";
pub const NODE_FILE_SUFFIX: &str = "_nodes.csv";
pub const RELATIONSHIP_FILE_SUFFIX: &str = "_relationships.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Nodes,
    Relationships,
}

/// One batch or chunk the store rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub index: usize,
    pub rows: usize,
    pub reason: String,
}

/// Outcome of loading one CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub file: String,
    pub kind: FileKind,
    /// Label (nodes) or relationship type (relationships).
    pub target: String,
    /// Rows handed to the store, whether or not the write succeeded.
    pub rows_attempted: usize,
    /// Relationship rows dropped for a missing endpoint id.
    pub rows_skipped: usize,
    /// Node rows that received a generated id.
    pub ids_synthesized: usize,
    pub batches: usize,
    pub failures: Vec<BatchFailure>,
    /// Set when the whole file was skipped.
    pub error: Option<String>,
}

impl FileSummary {
    fn new(file: &str, kind: FileKind, target: &str) -> Self {
        Self {
            file: file.to_string(),
            kind,
            target: target.to_string(),
            rows_attempted: 0,
            rows_skipped: 0,
            ids_synthesized: 0,
            batches: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.batches - self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.error.is_none()
    }

    fn skip(mut self, e: ImportError) -> Self {
        error!("❌ Skipping '{}': {}", self.file, e);
        self.error = Some(e.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub nodes: Vec<FileSummary>,
    pub relationships: Vec<FileSummary>,
}

impl ImportSummary {
    pub fn files(&self) -> impl Iterator<Item = &FileSummary> {
        self.nodes.iter().chain(self.relationships.iter())
    }

    pub fn failed_batches(&self) -> usize {
        self.files().map(|f| f.failures.len()).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.files().filter(|f| f.error.is_some()).count()
    }

    pub fn skipped_rows(&self) -> usize {
        self.files().map(|f| f.rows_skipped).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub statements_executed: usize,
    pub import: ImportSummary,
}

/// CSV files found for one `import_csvs` call, each list sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportJob {
    pub node_files: Vec<PathBuf>,
    pub relationship_files: Vec<PathBuf>,
}

/// Drives a [`StoreGateway`] through one import run.
pub struct Importer<G> {
    gateway: G,
    config: ImporterConfig,
    ctx: RunContext,
}

impl<G: StoreGateway> Importer<G> {
    /// Fails if the batch or chunk sizes in `config` are zero.
    pub fn new(gateway: G, config: ImporterConfig, ctx: RunContext) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            gateway,
            config,
            ctx,
        })
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Connectivity check, script replay, then CSV import.
    pub async fn run(&self) -> Result<RunSummary, ImportError> {
        info!(
            "🚀 Importer started at {}.",
            self.ctx.started_at.format("%Y-%m-%d %H:%M:%S")
        );
        if let Some(path) = &self.ctx.log_file {
            info!("  Logging to {:?}", path);
        }

        if !self.gateway.connectivity_check().await {
            error!("❌ Cannot connect to Neo4j. Please ensure the database is running.");
            return Err(ConfigError::Unreachable(self.config.neo4j.uri.clone()).into());
        }

        info!("Executing initialization scripts...");
        let statements_executed = self.import_cypher_scripts().await?;

        info!("Importing CSV files using APOC bulk mode...");
        let import = self.import_csvs().await?;

        info!(
            "✅ Import complete in {:?}: {} node files, {} relationship files, {} skipped files, {} failed batches, {} skipped rows",
            self.ctx.elapsed(),
            import.nodes.len(),
            import.relationships.len(),
            import.failed_files(),
            import.failed_batches(),
            import.skipped_rows()
        );

        Ok(RunSummary {
            statements_executed,
            import,
        })
    }

    /// Replay every `.cypher` script in name order, one statement at a time.
    ///
    /// The first failing statement aborts the replay. Returns the number of
    /// statements executed.
    pub async fn import_cypher_scripts(&self) -> Result<usize, ImportError> {
        let files = list_files(&self.config.cypher_dir, |name| {
            name.ends_with(SCRIPT_EXTENSION)
        })?;
        if files.is_empty() {
            info!("No Cypher scripts found.");
            return Ok(0);
        }

        let mut executed = 0;
        for path in files {
            let name = file_name(&path);
            info!("Executing Cypher script: {}", name);
            let script = std::fs::read_to_string(&path).map_err(|source| ImportError::Io {
                path: path.clone(),
                source,
            })?;

            for (index, stmt) in cypher::split_script(&script).into_iter().enumerate() {
                self.gateway
                    .execute(&Statement::new(stmt))
                    .await
                    .map_err(|source| ImportError::Script {
                        file: name.clone(),
                        index,
                        source,
                    })?;
                executed += 1;
            }
        }

        info!("✅ Cypher scripts executed successfully.");
        Ok(executed)
    }

    /// Find the node and relationship files in the import directory.
    pub fn discover(&self) -> Result<ImportJob, ImportError> {
        let csv_files = list_files(&self.config.import_dir, |name| name.ends_with(".csv"))?;
        let (node_files, rest): (Vec<_>, Vec<_>) = csv_files
            .into_iter()
            .partition(|p| file_name(p).ends_with(NODE_FILE_SUFFIX));
        let relationship_files = rest
            .into_iter()
            .filter(|p| file_name(p).ends_with(RELATIONSHIP_FILE_SUFFIX))
            .collect();

        Ok(ImportJob {
            node_files,
            relationship_files,
        })
    }

    /// Load every node file, then every relationship file.
    pub async fn import_csvs(&self) -> Result<ImportSummary, ImportError> {
        let job = self.discover()?;
        let mut summary = ImportSummary::default();
        if job.node_files.is_empty() && job.relationship_files.is_empty() {
            info!("No CSV files found in import dir.");
            return Ok(summary);
        }

        info!(
            "Found {} node files and {} relationship files",
            job.node_files.len(),
            job.relationship_files.len()
        );

        info!("📥 Importing nodes...");
        for path in &job.node_files {
            summary.nodes.push(self.import_node_file(path).await?);
        }

        info!("🔗 Importing relationships (streamed batches)...");
        for path in &job.relationship_files {
            summary.relationships.push(self.import_relationship_file(path).await?);
        }

        info!("✅ CSV ingestion completed.");
        Ok(summary)
    }

    pub async fn import_node_file(&self, path: &Path) -> Result<FileSummary, ImportError> {
        let start_time = Instant::now();
        let name = file_name(path);
        let label = schema::label_from_filename(&name);
        let labels = schema::resolve_node_labels(&label, &self.config.dual_labels);
        let mut summary = FileSummary::new(&name, FileKind::Nodes, &label);
        let template = match cypher::node_merge(&labels) {
            Ok(template) => template,
            Err(e) => return Ok(summary.skip(e)),
        };

        let table = extract::read_csv(path)?;
        let extraction = extract::extract_nodes(&table, &name);
        summary.ids_synthesized = extraction.synthesized();
        let records = extraction.records;

        let total = records.len();
        info!("Ingesting {} nodes for '{}'...", total, label);
        if let LabelSpec::Dual { primary, secondary } = &labels {
            info!("  '{}' nodes get labels {}:{}", label, primary, secondary);
        }

        let mut progress = self.ctx.progress(format!("Nodes:{}", label), "rows", total);
        for (index, batch) in partition(&records, self.config.batch_size).enumerate() {
            if let Err(reason) = self.submit(&template, batch).await {
                error!("❌ Node batch {} failed ({}): {}", index, label, reason);
                summary.failures.push(BatchFailure {
                    index,
                    rows: batch.len(),
                    reason,
                });
            }
            summary.batches += 1;
            summary.rows_attempted += batch.len();
            progress.advance(batch.len());
        }

        log_file_done(&summary, start_time);
        Ok(summary)
    }

    pub async fn import_relationship_file(&self, path: &Path) -> Result<FileSummary, ImportError> {
        let start_time = Instant::now();
        let name = file_name(path);
        let rel_type = schema::rel_type_from_filename(&name);
        let spec = schema::resolve_relationship_type(&rel_type, &self.config.rel_label_map);
        let mut summary = FileSummary::new(&name, FileKind::Relationships, &rel_type);
        let template = match cypher::relationship_merge(
            &spec.rel_type,
            spec.endpoints
                .as_ref()
                .map(|(start, end)| (start.as_str(), end.as_str())),
            self.config.iterate,
        ) {
            Ok(template) => template,
            Err(e) => return Ok(summary.skip(e)),
        };

        let table = extract::read_csv(path)?;
        let (descriptors, skipped) = extract::extract_relationships(&table);
        summary.rows_skipped = skipped;

        if skipped > 0 {
            warn!("⚠️ Skipped {} malformed rows in '{}'.", skipped, name);
        }
        if descriptors.is_empty() {
            warn!("⚠️ No valid relationships found in '{}'.", name);
            return Ok(summary);
        }

        let total = descriptors.len();
        match &spec.endpoints {
            Some((start, end)) => info!(
                "Creating {} '{}' relationships ({} -> {}) via APOC (streamed)...",
                total, rel_type, start, end
            ),
            None => info!(
                "Creating {} '{}' relationships via APOC (streamed)...",
                total, rel_type
            ),
        }

        let mut progress = self.ctx.progress(format!("Rels:{}", rel_type), "rels", total);
        let chunk_count = total.div_ceil(self.config.apoc_chunk);
        for (index, chunk) in partition(&descriptors, self.config.apoc_chunk).enumerate() {
            if let Err(reason) = self.submit(&template, chunk).await {
                error!("❌ Error in APOC batch {} ({}): {}", index, rel_type, reason);
                summary.failures.push(BatchFailure {
                    index,
                    rows: chunk.len(),
                    reason,
                });
            }
            summary.batches += 1;
            summary.rows_attempted += chunk.len();
            progress.advance(chunk.len());

            if index + 1 < chunk_count && !self.config.chunk_delay.is_zero() {
                tokio::time::sleep(self.config.chunk_delay).await;
            }
        }

        log_file_done(&summary, start_time);
        Ok(summary)
    }

    /// One write for a batch or chunk; the error is the reason to record.
    async fn submit<T: Serialize>(&self, template: &Template, rows: &[T]) -> Result<(), String> {
        let rows = serde_json::to_value(rows).map_err(|e| e.to_string())?;
        self.gateway
            .execute(&template.bind(rows))
            .await
            .map_err(|e| e.to_string())
    }
}

fn log_file_done(summary: &FileSummary, start_time: Instant) {
    let what = match summary.kind {
        FileKind::Nodes => "node",
        FileKind::Relationships => "relationship",
    };
    if summary.is_clean() {
        info!(
            "✅ Completed {} import for '{}': {} rows in {} batches (Duration: {:?})",
            what,
            summary.target,
            summary.rows_attempted,
            summary.batches,
            start_time.elapsed()
        );
    } else {
        warn!(
            "⚠️ Completed {} import for '{}' with {} of {} batches failed (Duration: {:?})",
            what,
            summary.target,
            summary.failures.len(),
            summary.batches,
            start_time.elapsed()
        );
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Regular files in `dir` whose name passes `keep`, sorted by name. A missing
/// directory yields an empty list.
fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>, ImportError> {
    let io_err = |source: io::Error| ImportError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if keep(&name) {
            files.push(entry.path());
        }
    }
    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

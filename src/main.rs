use anyhow::Result;
use clap::Parser;
use log::{error, info};

use neo4j_loader::config::{Args, ImporterConfig};
use neo4j_loader::gateway::Neo4jGateway;
use neo4j_loader::importer::Importer;
use neo4j_loader::logging;
use neo4j_loader::progress::RunContext;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ImporterConfig::try_from(args)?;
    config.ensure_dirs()?;

    let log_file = logging::init(Some(logging::log_file_path(&config.log_dir)));
    let ctx = RunContext::new(log_file, config.progress_interval);

    let gateway = Neo4jGateway::connect(&config.neo4j).await?;
    info!("✅ Connected to Neo4j at {}", gateway.uri());

    let importer = Importer::new(gateway, config, ctx)?;
    match importer.run().await {
        Ok(summary) => {
            info!(
                "Executed {} script statements; {} files skipped; {} batches failed",
                summary.statements_executed,
                summary.import.failed_files(),
                summary.import.failed_batches()
            );
            for file in summary.import.files().filter(|f| !f.is_clean()) {
                if let Some(reason) = &file.error {
                    error!("  {} skipped: {}", file.file, reason);
                }
                for failure in &file.failures {
                    error!(
                        "  {} batch {} ({} rows) failed: {}",
                        file.file, failure.index, failure.rows, failure.reason
                    );
                }
            }
        }
        Err(e) => {
            error!("❌ Import failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

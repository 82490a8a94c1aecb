//! medindex: batch indexer for biomedical literature, clinical trials and meeting abstracts.
//! Entry point for the `medindex` binary.

mod config;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use medindex_common::SourceFormat;
use medindex_db::{DocumentGateway, DocumentStore, ElasticClient, InMemoryStore};
use medindex_ingestion::{extractor_for, IngestionJob, IngestionReport, IngestionScheduler};

#[derive(Debug, Parser)]
#[command(name = "medindex", version, about = "Index MEDLINE, clinical trial and abstract files into Elasticsearch")]
struct Cli {
    /// File or directory to ingest (searched recursively).
    #[arg(short = 'd', long)]
    root: PathBuf,

    /// Source format: literature, clinical-trials, supplementary-abstracts (or 1, 2, 3).
    #[arg(short = 'm', long)]
    format: String,

    /// Elasticsearch host, host:port or URL. Overrides `store.url`.
    #[arg(short = 'i', long, env = "MEDINDEX_HOST")]
    host: Option<String>,

    /// Number of concurrent workers. Overrides `ingestion.concurrency`.
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Configuration file (defaults to $MEDINDEX_CONFIG or ./medindex.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extract and count without contacting the store; documents are kept in memory.
    #[arg(long)]
    dry_run: bool,

    /// Debug logging for every target.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialise structured logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("medindex=debug,info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("medindex {}", env!("CARGO_PKG_VERSION"));

    let format: SourceFormat = cli.format.parse()?;

    let mut config = match cli.config {
        Some(ref path) => config::Config::load_from(path)?,
        None => config::Config::load()?,
    };
    if let Some(host) = cli.host {
        config.store.url = host;
    }
    if let Some(n) = cli.concurrency {
        config.ingestion.concurrency = n;
    }

    let store: Arc<dyn DocumentStore> = if cli.dry_run {
        info!("Dry run, documents are kept in memory");
        Arc::new(InMemoryStore::new())
    } else {
        let client = ElasticClient::new(&config.store.elastic_config())?;
        info!(url = client.base_url(), "Document store client ready");
        Arc::new(client)
    };

    let gateway = DocumentGateway::new(store, config.ingestion.retry_policy());
    let extractor = extractor_for(format, Arc::new(config.normaliser.build()));

    let mut job = IngestionJob::new(&cli.root, format)
        .with_collection(config.store.collection_for(format))
        .with_concurrency(config.ingestion.concurrency);
    job.queue_capacity = config.ingestion.queue_capacity;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping ingestion");
            let _ = cancel_tx.send(true);
        }
    });

    let report = IngestionScheduler::new(extractor, gateway)
        .with_cancellation(cancel_rx)
        .run(&job)
        .await
        .with_context(|| format!("Ingestion of {} aborted", cli.root.display()))?;

    print_report(&report)?;
    if report.has_failures() {
        warn!(
            files_failed = report.files_failed,
            records_failed = report.records_failed,
            "Some items could not be ingested; see the errors above"
        );
    }

    Ok(())
}

fn print_report(report: &IngestionReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

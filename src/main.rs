use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use shipping_elt::{
    config::{DownloadVia, PipelineConfig},
    fetch::{DatasetSource, KaggleCli, KaggleCredentials, KaggleHttp},
    flow,
    storage::GcsBucket,
    warehouse::BigQueryWarehouse,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "shipping-elt", version, about = "Shipping dataset ELT: portal → GCS → BigQuery")]
struct Cli {
    /// YAML file overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// GCP project that owns the dataset
    #[arg(long, global = true)]
    project: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the CSV from the data portal and upload it to the bucket
    CsvToGcs {
        /// How to reach the portal
        #[arg(long, value_enum)]
        download_via: Option<DownloadVia>,
    },
    /// Stage the CSV from the bucket and append it to the warehouse table
    EltToBq,
    /// Read a sample of the loaded table
    Query {
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn portal_source(via: DownloadVia) -> Result<Box<dyn DatasetSource>> {
    Ok(match via {
        DownloadVia::Cli => Box::new(KaggleCli::default()),
        DownloadVia::Http => Box::new(KaggleHttp::new(
            Client::new(),
            KaggleCredentials::discover()?,
        )?),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut cfg = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(project) = cli.project {
        cfg.project_id = project;
    }
    info!(project = %cfg.project_id, bucket = %cfg.bucket, table = %cfg.table(), "configuration");

    match cli.command {
        Command::CsvToGcs { download_via } => {
            let source = portal_source(download_via.unwrap_or(cfg.download_via))?;
            let bucket = GcsBucket::connect(&cfg.bucket).await?;
            let key = flow::csv_to_gcs(&cfg, source.as_ref(), &bucket).await?;
            info!("uploaded gs://{}/{}", cfg.bucket, key);
        }
        Command::EltToBq => {
            let bucket = GcsBucket::connect(&cfg.bucket).await?;
            let warehouse = BigQueryWarehouse::connect().await?;
            let report = flow::elt_to_bigquery(&cfg, &bucket, &warehouse).await?;
            info!(rows = report.rows_appended, "loaded into {}", report.table);
        }
        Command::Query { limit } => {
            if let Some(limit) = limit {
                cfg.query_limit = limit;
            }
            let warehouse = BigQueryWarehouse::connect().await?;
            flow::query_bigquery(&cfg, &warehouse).await?;
        }
    }
    Ok(())
}

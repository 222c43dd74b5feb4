use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use indicatif::HumanDuration;
use rdns::args::{Config, get_config};
use rdns::core::{ScanSettings, Scanner};
use rdns::dns::{ResolverSet, TrustDnsLookup, load_resolvers_file};
use rdns::error::SetupError;
use rdns::logger;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            logger::init(false);
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    logger::init(config.verbose);

    let config = match config.validate() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let resolvers = build_resolvers(&config).await?;
    info!(
        "Using {} resolvers with {} threads",
        resolvers.len(),
        config.threads
    );

    let output = open_output(config.output.as_deref()).await?;
    let input = open_input(config.list.as_deref()).await?;

    let settings = ScanSettings::from(&config);
    let lookup = Arc::new(TrustDnsLookup::new(&resolvers, settings.timeout));
    let scanner = Scanner::new(settings, resolvers, lookup);

    let summary = scanner.exec(input, output).await.context("scan aborted")?;

    info!(
        "Completed: {} total, {} resolved, {} failed in {}",
        summary.stats.total,
        summary.stats.resolved,
        summary.stats.failed,
        HumanDuration(summary.elapsed)
    );
    Ok(())
}

async fn build_resolvers(config: &Config) -> Result<ResolverSet, SetupError> {
    let file_entries = match &config.resolvers_file {
        Some(path) => load_resolvers_file(path)?,
        None => Vec::new(),
    };
    ResolverSet::build(
        &file_entries,
        config.resolver.as_deref(),
        config.use_default,
        config.port,
        config.protocol,
    )
    .await
}

async fn open_input(path: Option<&str>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>, SetupError> {
    match path {
        Some(path) => {
            let file = File::open(path).await.map_err(|source| SetupError::InputFile {
                path: path.to_string(),
                source,
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

async fn open_output(path: Option<&str>) -> Result<Box<dyn AsyncWrite + Unpin + Send>, SetupError> {
    match path {
        Some(path) => {
            let file = File::create(path).await.map_err(|source| SetupError::OutputFile {
                path: path.to_string(),
                source,
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

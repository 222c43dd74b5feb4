use std::io;
use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

/// Failures that abort the run before any address is scheduled.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to load config file '{path}': {reason}")]
    ConfigFile { path: String, reason: String },

    #[error("failed to read resolvers file '{path}': {source}")]
    ResolverFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open input file '{path}': {source}")]
    InputFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output file '{path}': {source}")]
    OutputFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("no DNS resolvers specified, use -r, -R, or -U")]
    NoResolvers,

    #[error("thread count must be at least 1")]
    NoThreads,
}

/// Why a single lookup attempt did not produce a hostname.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("no PTR records returned")]
    Empty,

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read input: {0}")]
    Input(#[source] io::Error),

    #[error("failed to flush output: {0}")]
    Output(#[source] io::Error),

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

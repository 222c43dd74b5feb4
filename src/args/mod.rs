use clap::Parser;

use crate::error::SetupError;

mod cli;
mod config;

pub use cli::Args;
pub use config::Config;

/// Parse the command line and build the effective configuration.
pub fn get_config() -> Result<Config, SetupError> {
    build_config(Args::parse())
}

/// Merge `args` over the config file (or defaults). Call [`Config::validate`]
/// on the result once logging is up.
pub fn build_config(args: Args) -> Result<Config, SetupError> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    if args.resolver.is_some() {
        config.resolver = args.resolver;
    }
    if args.resolvers_file.is_some() {
        config.resolvers_file = args.resolvers_file;
    }
    if args.use_default {
        config.use_default = true;
    }
    if let Some(protocol) = args.protocol {
        config.protocol = protocol;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.domain {
        config.domain = true;
    }
    if args.list.is_some() {
        config.list = args.list;
    }
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.verbose {
        config.verbose = true;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    if args.show_failed {
        config.show_failed = true;
    }
    if let Some(rate_limit) = args.rate_limit {
        config.rate_limit = rate_limit;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MAX_THREADS;
    use crate::dns::Transport;
    use std::io::Write;

    fn parse(argv: &[&str]) -> Result<Config, SetupError> {
        let mut full = vec!["rdns"];
        full.extend_from_slice(argv);
        build_config(Args::try_parse_from(full).unwrap()).and_then(Config::validate)
    }

    #[test]
    fn defaults_without_flags() {
        assert_eq!(parse(&[]).unwrap(), Config::default());
    }

    #[test]
    fn clamps_thread_count() {
        assert_eq!(parse(&["-t", "50000"]).unwrap().threads, MAX_THREADS);
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(matches!(parse(&["-t", "0"]), Err(SetupError::NoThreads)));
    }

    #[test]
    fn cli_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threads: 10\nprotocol: tcp\nport: 5353\nverbose: true").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path, "-t", "20"]).unwrap();
        assert_eq!(config.threads, 20);
        assert_eq!(config.protocol, Transport::Tcp);
        assert_eq!(config.port, 5353);
        assert!(config.verbose);
    }
}

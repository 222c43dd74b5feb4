use clap::Parser;

use crate::dns::Transport;

const EXAMPLES: &str = "\
Examples:
  rdns -l iprange.txt -t 5000 -U
  rdns -l ips.txt -t 1000 -r 8.8.8.8 -v
  echo '192.168.1.0/24' | rdns -t 500 -U -d";

#[derive(Parser, Debug)]
#[command(name = "rdns")]
#[command(about = "Bulk reverse DNS (PTR) resolver for IP lists and CIDR ranges")]
#[command(version)]
#[command(after_help = EXAMPLES)]
pub struct Args {
    /// Configuration file path. Note that CLI arguments override configuration file settings.
    #[arg(long = "config")]
    pub config: Option<String>,

    /// How many concurrent workers should be used (max 10000) [default: 100]
    #[arg(short = 't', long = "threads")]
    pub threads: Option<usize>,

    /// IP of the DNS resolver to use for lookups
    #[arg(short = 'r', long = "resolver")]
    pub resolver: Option<String>,

    /// File containing list of DNS resolvers to use for lookups
    #[arg(short = 'R', long = "resolvers-file")]
    pub resolvers_file: Option<String>,

    /// Use default resolvers for lookups
    #[arg(short = 'U', long = "use-default")]
    pub use_default: bool,

    /// Protocol to use for lookups [default: udp]
    #[arg(short = 'P', long = "protocol", value_enum)]
    pub protocol: Option<Transport>,

    /// Port to bother the specified DNS resolver on [default: 53]
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Output only domains
    #[arg(short = 'd', long = "domain")]
    pub domain: bool,

    /// File containing IP addresses or CIDR ranges (reads stdin when omitted)
    #[arg(short = 'l', long = "list")]
    pub list: Option<String>,

    /// DNS query timeout in seconds [default: 2]
    #[arg(short = 'T', long = "timeout")]
    pub timeout: Option<u64>,

    /// Number of retries per resolver [default: 1]
    #[arg(short = 'y', long = "retries")]
    pub retries: Option<u32>,

    /// Show progress and statistics
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Output file path (if omitted, prints to stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Show failed/unresolved IPs
    #[arg(short = 'f', long = "show-failed")]
    pub show_failed: bool,

    /// Rate limit in queries per second (0 = no limit) [default: 0]
    #[arg(short = 'L', long = "rate-limit")]
    pub rate_limit: Option<u32>,
}

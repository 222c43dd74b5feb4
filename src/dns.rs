use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::lookup_host;
use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;

use crate::error::{LookupError, SetupError};
use crate::utils::{clean_lines, valid_ip};

pub const DEFAULT_RESOLVERS: [&str; 20] = [
    "1.1.1.1",
    "1.0.0.1",
    "8.8.8.8",
    "8.8.4.4",
    "9.9.9.9",
    "149.112.112.112",
    "208.67.222.222",
    "208.67.220.220",
    "64.6.64.6",
    "64.6.65.6",
    "198.101.242.72",
    "23.253.163.53",
    "8.26.56.26",
    "8.20.247.20",
    "185.228.168.9",
    "185.228.169.9",
    "76.76.19.19",
    "76.223.122.150",
    "94.140.14.14",
    "94.140.15.15",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    #[default]
    Udp,
}

impl Transport {
    fn protocol(self) -> Protocol {
        match self {
            Transport::Tcp => Protocol::Tcp,
            Transport::Udp => Protocol::Udp,
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("tcp"),
            Transport::Udp => f.write_str("udp"),
        }
    }
}

/// A DNS server reachable at a given address, port and transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolverEndpoint {
    pub addr: IpAddr,
    pub port: u16,
    pub transport: Transport,
}

impl ResolverEndpoint {
    pub fn new(addr: IpAddr, port: u16, transport: Transport) -> Self {
        Self {
            addr,
            port,
            transport,
        }
    }

    /// Parse a resolver entry. A bare IP takes `default_port`, while a socket
    /// address such as `1.1.1.1:5353` keeps its own port.
    pub fn parse(entry: &str, default_port: u16, transport: Transport) -> Option<Self> {
        if valid_ip(entry) {
            let addr = entry.parse().ok()?;
            return Some(Self::new(addr, default_port, transport));
        }
        let socket: SocketAddr = entry.parse().ok()?;
        Some(Self::new(socket.ip(), socket.port(), transport))
    }

    /// Like [`ResolverEndpoint::parse`], but a hostname entry (`dns.google` or
    /// `dns.google:5353`) is resolved once through the system resolver.
    pub async fn resolve(entry: &str, default_port: u16, transport: Transport) -> Option<Self> {
        if let Some(endpoint) = Self::parse(entry, default_port, transport) {
            return Some(endpoint);
        }
        let (host, port) = match entry.rsplit_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (entry, default_port),
        };
        if host.is_empty() {
            return None;
        }
        let socket = lookup_host((host, port)).await.ok()?.next()?;
        debug!("Resolver {} resolved to {}", entry, socket);
        Some(Self::new(socket.ip(), socket.port(), transport))
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

impl fmt::Display for ResolverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.socket_addr())
    }
}

/// Ordered, immutable list of resolvers tried in turn for every address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSet {
    endpoints: Vec<ResolverEndpoint>,
}

impl ResolverSet {
    pub fn new(endpoints: Vec<ResolverEndpoint>) -> Result<Self, SetupError> {
        if endpoints.is_empty() {
            return Err(SetupError::NoResolvers);
        }
        Ok(Self { endpoints })
    }

    /// Merge resolvers in order: file entries, the single resolver, then the
    /// built-in defaults. Entries that neither parse nor resolve are skipped.
    pub async fn build(
        file_entries: &[String],
        single: Option<&str>,
        use_default: bool,
        port: u16,
        transport: Transport,
    ) -> Result<Self, SetupError> {
        let defaults: &[&str] = if use_default { &DEFAULT_RESOLVERS } else { &[] };

        let mut endpoints = Vec::new();
        let entries = file_entries
            .iter()
            .map(String::as_str)
            .chain(single)
            .chain(defaults.iter().copied());
        for entry in entries {
            match ResolverEndpoint::resolve(entry, port, transport).await {
                Some(endpoint) => endpoints.push(endpoint),
                None => warn!("Invalid resolver address: {}", entry),
            }
        }

        Self::new(endpoints)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResolverEndpoint> {
        self.endpoints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolverEndpoint> {
        self.endpoints.iter()
    }
}

/// Read resolver entries from a file, one per line
///
/// # Arguments
///
/// * `path` - Path to the resolver list
///
/// # Returns
///
/// A `Result` containing the cleaned entries in file order, or a setup error if the file cannot be read
pub fn load_resolvers_file(path: &str) -> Result<Vec<String>, SetupError> {
    let content = fs::read_to_string(path).map_err(|source| SetupError::ResolverFile {
        path: path.to_string(),
        source,
    })?;
    Ok(clean_lines(&content))
}

/// A single reverse lookup of `address` against one resolver.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub address: IpAddr,
    pub endpoint: &'a ResolverEndpoint,
    pub retry: u32,
    pub timeout: Duration,
}

/// Reverse resolution capability used by the worker pool.
///
/// Implementations return the PTR names exactly as the server sent them
/// (trailing root label included); output formatting strips it.
#[async_trait]
pub trait PtrLookup: Send + Sync {
    async fn lookup(&self, attempt: &Attempt<'_>) -> Result<Vec<String>, LookupError>;
}

/// [`PtrLookup`] backed by trust-dns, one async resolver per endpoint.
pub struct TrustDnsLookup {
    resolvers: HashMap<ResolverEndpoint, TokioAsyncResolver>,
}

impl TrustDnsLookup {
    pub fn new(set: &ResolverSet, timeout: Duration) -> Self {
        let resolvers = set
            .iter()
            .map(|endpoint| (*endpoint, Self::build_resolver(endpoint, timeout)))
            .collect();
        Self { resolvers }
    }

    fn build_resolver(endpoint: &ResolverEndpoint, timeout: Duration) -> TokioAsyncResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig {
            socket_addr: endpoint.socket_addr(),
            protocol: endpoint.transport.protocol(),
            tls_dns_name: None,
            trust_negative_responses: false,
            bind_addr: None,
        });

        TokioAsyncResolver::tokio(config, Self::resolver_opts(timeout))
    }

    /// Retries are driven by the worker, not by the resolver. Every attempt
    /// must reach the endpoint, so no response cache and no hosts file.
    fn resolver_opts(timeout: Duration) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;
        opts
    }
}

#[async_trait]
impl PtrLookup for TrustDnsLookup {
    async fn lookup(&self, attempt: &Attempt<'_>) -> Result<Vec<String>, LookupError> {
        let resolver = self
            .resolvers
            .get(attempt.endpoint)
            .ok_or_else(|| LookupError::Other(format!("unknown resolver {}", attempt.endpoint)))?;

        let timeout = attempt.timeout;
        let lookup = match tokio::time::timeout(timeout, resolver.reverse_lookup(attempt.address)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                return match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => Err(LookupError::Empty),
                    _ => Err(LookupError::Resolve(e)),
                };
            }
            Err(_) => return Err(LookupError::Timeout(timeout)),
        };

        let names: Vec<String> = lookup.iter().map(|name| name.to_string()).collect();
        if names.is_empty() {
            Err(LookupError::Empty)
        } else {
            Ok(names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::UdpSocket;
    use trust_dns_resolver::proto::op::{Message, MessageType, ResponseCode};

    #[test]
    fn parses_bare_ip_with_default_port() {
        let endpoint = ResolverEndpoint::parse("8.8.8.8", 53, Transport::Udp).unwrap();
        assert_eq!(endpoint.addr, IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)));
        assert_eq!(endpoint.port, 53);
        assert_eq!(endpoint.to_string(), "udp://8.8.8.8:53");
    }

    #[test]
    fn explicit_port_overrides_default() {
        let endpoint = ResolverEndpoint::parse("127.0.0.1:5353", 53, Transport::Tcp).unwrap();
        assert_eq!(endpoint.port, 5353);
        assert_eq!(endpoint.transport, Transport::Tcp);

        let v6 = ResolverEndpoint::parse("[2606:4700::1111]:853", 53, Transport::Udp).unwrap();
        assert_eq!(v6.port, 853);
        assert!(v6.addr.is_ipv6());
    }

    #[test]
    fn parse_accepts_only_literal_addresses() {
        assert!(ResolverEndpoint::parse("dns.google", 53, Transport::Udp).is_none());
    }

    #[tokio::test]
    async fn build_merges_in_order() {
        let file = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        let set = ResolverSet::build(&file, Some("10.0.0.3"), true, 53, Transport::Udp)
            .await
            .unwrap();

        let addrs: Vec<String> = set.iter().map(|e| e.addr.to_string()).collect();
        assert_eq!(addrs.len(), 3 + DEFAULT_RESOLVERS.len());
        assert_eq!(&addrs[..4], &["10.0.0.1", "10.0.0.2", "10.0.0.3", "1.1.1.1"]);
        assert_eq!(addrs.last().map(String::as_str), Some("94.140.15.15"));
    }

    #[tokio::test]
    async fn build_without_any_source_fails() {
        let err = ResolverSet::build(&[], None, false, 53, Transport::Udp).await.unwrap_err();
        assert!(matches!(err, SetupError::NoResolvers));
    }

    #[tokio::test]
    async fn build_with_only_invalid_entries_fails() {
        let file = vec!["10.0.0.1:notaport".to_string(), ":53".to_string()];
        let err = ResolverSet::build(&file, None, false, 53, Transport::Udp).await.unwrap_err();
        assert!(matches!(err, SetupError::NoResolvers));
    }

    #[tokio::test]
    async fn hostname_entries_are_resolved_once() {
        let set = ResolverSet::build(&["localhost:5353".to_string()], Some("localhost"), false, 53, Transport::Tcp)
            .await
            .unwrap();

        assert_eq!(set.len(), 2);
        let first = set.get(0).unwrap();
        assert!(first.addr.is_loopback());
        assert_eq!(first.port, 5353);
        assert_eq!(first.transport, Transport::Tcp);
        let second = set.get(1).unwrap();
        assert!(second.addr.is_loopback());
        assert_eq!(second.port, 53);
    }

    #[test]
    fn loads_resolvers_file_skipping_comments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# primary").unwrap();
        writeln!(file, "1.1.1.1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  9.9.9.9:5353 ").unwrap();

        let entries = load_resolvers_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(entries, vec!["1.1.1.1", "9.9.9.9:5353"]);
    }

    #[test]
    fn missing_resolvers_file_is_setup_error() {
        let err = load_resolvers_file("/nonexistent/resolvers.txt").unwrap_err();
        assert!(matches!(err, SetupError::ResolverFile { .. }));
    }

    #[tokio::test]
    async fn trust_dns_lookup_builds_one_resolver_per_endpoint() {
        let set = ResolverSet::build(&[], Some("127.0.0.1"), true, 53, Transport::Udp)
            .await
            .unwrap();
        let lookup = TrustDnsLookup::new(&set, Duration::from_secs(1));
        assert_eq!(lookup.resolvers.len(), set.len());
    }

    /// Local UDP server answering NXDOMAIN to every query. Returns its
    /// endpoint and the number of queries it has received.
    async fn nxdomain_server() -> (ResolverEndpoint, Arc<AtomicUsize>) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let Ok(query) = Message::from_vec(&buf[..len]) else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut reply = Message::new();
                reply
                    .set_id(query.id())
                    .set_message_type(MessageType::Response)
                    .set_op_code(query.op_code())
                    .set_recursion_desired(query.recursion_desired())
                    .set_recursion_available(true)
                    .set_response_code(ResponseCode::NXDomain);
                reply.add_queries(query.queries().to_vec());
                let _ = socket.send_to(&reply.to_vec().unwrap(), peer).await;
            }
        });
        (ResolverEndpoint::new(addr.ip(), addr.port(), Transport::Udp), hits)
    }

    #[tokio::test]
    async fn every_retry_reaches_the_server() {
        let (endpoint, hits) = nxdomain_server().await;
        let set = ResolverSet::new(vec![endpoint]).unwrap();
        let lookup = TrustDnsLookup::new(&set, Duration::from_secs(2));

        for retry in 0..3 {
            let attempt = Attempt {
                address: "192.0.2.1".parse().unwrap(),
                endpoint: &endpoint,
                retry,
                timeout: Duration::from_secs(2),
            };
            let result = lookup.lookup(&attempt).await;
            assert!(matches!(result, Err(LookupError::Empty)), "{result:?}");
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn resolver_answers_only_from_the_endpoint() {
        let opts = TrustDnsLookup::resolver_opts(Duration::from_secs(3));
        assert_eq!(opts.timeout, Duration::from_secs(3));
        assert_eq!(opts.attempts, 1);
        assert_eq!(opts.cache_size, 0);
        assert!(!opts.use_hosts_file);
    }
}

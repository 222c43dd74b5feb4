use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use ipnetwork::IpNetwork;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};

use crate::core::stats::Stats;
use crate::utils::clean_line;

/// One input line: a single address or a CIDR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Single(IpAddr),
    Block(IpNetwork),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("Invalid CIDR range: {0}")]
    Cidr(String),
    #[error("Invalid IP address: {0}")]
    Ip(String),
}

impl Target {
    pub fn parse(line: &str) -> Result<Self, TargetError> {
        if line.contains('/') {
            line.parse::<IpNetwork>()
                .map(Target::Block)
                .map_err(|_| TargetError::Cidr(line.to_string()))
        } else {
            line.parse::<IpAddr>()
                .map(Target::Single)
                .map_err(|_| TargetError::Ip(line.to_string()))
        }
    }

    /// Every address covered, in ascending order. Blocks start at the masked
    /// network address and run through the last address, both inclusive.
    pub fn addresses(&self) -> Box<dyn Iterator<Item = IpAddr> + Send> {
        match *self {
            Target::Single(ip) => Box::new(std::iter::once(ip)),
            Target::Block(IpNetwork::V4(net)) => {
                let mask = u32::from(net.mask());
                let start = u32::from(net.ip()) & mask;
                let end = start | !mask;
                Box::new((start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip))))
            }
            Target::Block(IpNetwork::V6(net)) => {
                let mask = u128::from(net.mask());
                let start = u128::from(net.ip()) & mask;
                let end = start | !mask;
                Box::new((start..=end).map(|ip| IpAddr::V6(Ipv6Addr::from(ip))))
            }
        }
    }
}

/// Producer side of the work queue. Dropping it closes the queue.
pub struct Expander {
    queue: Sender<IpAddr>,
    stats: Arc<Stats>,
}

impl Expander {
    pub fn new(queue: Sender<IpAddr>, stats: Arc<Stats>) -> Self {
        Self { queue, stats }
    }

    /// Read `input` to the end, enqueueing every address it describes.
    /// Returns the number of addresses enqueued. Lines that are not UTF-8 are
    /// malformed and skipped.
    pub async fn feed<R>(self, input: R) -> io::Result<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut produced = 0;
        let mut lines = input.split(b'\n');
        while let Some(raw) = lines.next_segment().await? {
            let Ok(line) = std::str::from_utf8(&raw) else {
                warn!("Invalid input line: {}", String::from_utf8_lossy(&raw).trim());
                continue;
            };
            let Some(line) = clean_line(line) else {
                continue;
            };
            match self.push_line(line).await {
                Some(count) => produced += count,
                None => {
                    debug!("work queue closed, stopping input");
                    break;
                }
            }
        }
        Ok(produced)
    }

    /// Enqueue the addresses of one cleaned line. Malformed lines are reported
    /// and count as zero. `None` means every worker has gone away.
    pub async fn push_line(&self, line: &str) -> Option<u64> {
        let target = match Target::parse(line) {
            Ok(target) => target,
            Err(e) => {
                warn!("{}", e);
                return Some(0);
            }
        };

        let mut count = 0;
        for ip in target.addresses() {
            let permit = self.queue.reserve().await.ok()?;
            self.stats.record_enqueued();
            permit.send(ip);
            count += 1;
        }
        Some(count)
    }
}

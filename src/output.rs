use std::io;
use std::net::IpAddr;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use crate::core::Resolution;

/// Serializes result lines from every worker into a single destination.
pub struct OutputHandler<W> {
    writer: Mutex<BufWriter<W>>,
    domain_only: bool,
    show_failed: bool,
}

impl<W> OutputHandler<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, domain_only: bool, show_failed: bool) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            domain_only,
            show_failed,
        }
    }

    /// Render the lines for one result; empty when nothing should be printed.
    pub fn format(&self, address: IpAddr, resolution: &Resolution) -> String {
        let mut out = String::new();
        match resolution {
            Resolution::Resolved(names) => {
                for name in names {
                    let name = name.trim_end_matches('.');
                    if self.domain_only {
                        out.push_str(name);
                    } else {
                        out.push_str(&format!("{}\t{}", address, name));
                    }
                    out.push('\n');
                }
            }
            Resolution::Failed if self.show_failed => {
                out.push_str(&format!("{}\tFAILED\n", address));
            }
            Resolution::Failed => {}
        }
        out
    }

    /// Format outside the lock, then append under it.
    pub async fn emit(&self, address: IpAddr, resolution: &Resolution) -> io::Result<()> {
        let lines = self.format(address, resolution);
        if lines.is_empty() {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(lines.as_bytes()).await
    }

    /// Flush buffered lines and hand back the destination.
    pub async fn finish(self) -> io::Result<W> {
        let mut writer = self.writer.into_inner();
        writer.flush().await?;
        Ok(writer.into_inner())
    }
}

use std::{fs, num::NonZeroUsize, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser};
use spreadping::SessionConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Opts {
    /// Host to ping (IPv4 address or resolvable name)
    #[arg(required_unless_present = "config")]
    pub dst_addr: Option<String>,
    #[command(flatten)]
    pub common_opts: CommonOpts,
    /// Interface to bind the raw sockets to
    #[arg(long, short)]
    pub iface: Option<String>,
    /// Print the report as JSON instead of text
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
    /// Read the session from a JSON file instead of the command line
    #[arg(
        long,
        conflicts_with_all = ["dst_addr", "interval", "count", "workers"]
    )]
    pub config: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct CommonOpts {
    /// interval between packets in seconds, also used as the reply timeout
    #[arg(long, default_value = "0.001")]
    pub interval: f64,
    /// number of packets to send in total
    #[arg(long, short, default_value = "100")]
    pub count: u64,
    /// number of concurrent workers (defaults to the available parallelism)
    #[arg(long, short)]
    pub workers: Option<usize>,
}

impl Opts {
    pub fn session_config(&self) -> Result<SessionConfig> {
        if let Some(path) = &self.config {
            let raw = fs::read_to_string(path).with_context(|| {
                format!("failed to read session file {}", path.display())
            })?;
            return serde_json::from_str(&raw).with_context(|| {
                format!("failed to parse session file {}", path.display())
            });
        }

        let dst_addr = self
            .dst_addr
            .clone()
            .ok_or(anyhow!("No destination address specified"))?;
        let workers = match self.common_opts.workers {
            Some(workers) => workers,
            None => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };
        Ok(SessionConfig::new(
            dst_addr,
            self.common_opts.interval,
            self.common_opts.count,
            workers,
        ))
    }
}

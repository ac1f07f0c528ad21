//! Session control: validate, split the work, run every worker, merge.

use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    partition::partition,
    report::{aggregate, AggregateReport},
    transport::{RawSocketFactory, TransportFactory},
    worker::ProbeWorker,
};

#[derive(Debug, Error)]
pub enum SessionError {
    /// Rejected before any worker was started.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// What to probe and how hard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// IPv4 literal or a name the OS resolver knows.
    pub target: String,
    /// Receive timeout and post-probe sleep, in seconds.
    pub interval_secs: f64,
    pub total_count: u64,
    pub workers: usize,
}

impl SessionConfig {
    pub fn new(
        target: impl Into<String>,
        interval_secs: f64,
        total_count: u64,
        workers: usize,
    ) -> Self {
        Self {
            target: target.into(),
            interval_secs,
            total_count,
            workers,
        }
    }

    /// Check the numeric fields and return the interval as a `Duration`.
    pub fn validate(&self) -> Result<Duration, SessionError> {
        if self.target.trim().is_empty() {
            return Err(invalid("target address is empty"));
        }
        if !self.interval_secs.is_finite() || self.interval_secs <= 0.0 {
            return Err(invalid(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval_secs
            )));
        }
        if self.total_count == 0 {
            return Err(invalid("count must be at least 1"));
        }
        if self.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }

        let interval = Duration::try_from_secs_f64(self.interval_secs)
            .map_err(|e| invalid(format!("interval out of range: {e}")))?;
        if interval.is_zero() {
            return Err(invalid("interval is below one nanosecond"));
        }
        Ok(interval)
    }
}

fn invalid(msg: impl Into<String>) -> SessionError {
    SessionError::InvalidConfig(msg.into())
}

/// Turn the configured target into an IPv4 address.
async fn resolve_target(host: &str) -> Result<Ipv4Addr, SessionError> {
    let host = host.trim();
    if let Ok(ip) = host.parse::<IpAddr>() {
        return match ip {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(_) => Err(invalid("IPv6 is not supported")),
        };
    }

    let addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| invalid(format!("cannot resolve `{host}`: {e}")))?;
    addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| invalid(format!("`{host}` has no IPv4 address")))
}

/// Run a full session over raw ICMP sockets.
pub async fn run_session(
    config: &SessionConfig,
) -> Result<AggregateReport, SessionError> {
    run_session_with(config, RawSocketFactory::default()).await
}

/// Run a full session, opening every worker's transport from `factory`.
///
/// Only configuration problems are returned as errors; network trouble ends
/// up inside the report as timeouts or permission-denied outcomes.
pub async fn run_session_with<F: TransportFactory>(
    config: &SessionConfig,
    factory: F,
) -> Result<AggregateReport, SessionError> {
    let interval = config.validate()?;
    let target = resolve_target(&config.target).await?;
    let shares = partition(config.total_count, config.workers);

    tracing::info!(
        dst = %target,
        interval_ms = interval.as_secs_f64() * 1000.0,
        count = config.total_count,
        workers = config.workers,
        ?shares,
        "Starting ping session"
    );

    let factory = Arc::new(factory);
    let handles: Vec<_> = shares
        .into_iter()
        .enumerate()
        .map(|(index, assigned)| {
            let mut worker = ProbeWorker::new(
                index,
                target,
                interval,
                assigned,
                factory.clone(),
            );
            tokio::spawn(async move { worker.run().await })
        })
        .collect();

    // Nothing is merged until every worker is done
    let mut results = Vec::with_capacity(handles.len());
    for joined in join_all(handles).await {
        results.push(joined?);
    }

    let report = aggregate(&results);
    tracing::info!(
        probes = report.probes,
        replies = report.successes,
        timeouts = report.timeouts,
        "Ping session finished"
    );
    Ok(report)
}

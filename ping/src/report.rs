//! Merging worker results into one report.

use std::{fmt, net::Ipv4Addr};

use common::Statistics;
use serde::Serialize;

use crate::outcome::{ProbeStatus, WorkerResult};

/// Per-worker tally, in worker order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub probes: usize,
    pub replies: usize,
    pub timeouts: usize,
    pub permission_denied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    /// Address the workers probed; `None` when no worker reported.
    pub target: Option<Ipv4Addr>,
    /// Reply times in ms, worker by worker, each in sequence order.
    pub all_successful_times: Vec<f64>,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Probes actually sent; a worker without a transport sends none.
    pub probes: usize,
    pub successes: usize,
    pub timeouts: usize,
    pub workers: Vec<WorkerSummary>,
    /// One line per outcome, same order as the times.
    pub raw_messages: Vec<String>,
}

/// Merge every worker's outcomes.
///
/// Results are walked in ascending worker index and, within a worker, in
/// sequence order. With no successful probe, min, max and mean are all zero.
pub fn aggregate(results: &[WorkerResult]) -> AggregateReport {
    let mut ordered: Vec<&WorkerResult> = results.iter().collect();
    ordered.sort_by_key(|result| result.worker);

    let mut stats = Statistics::new();
    let mut report = AggregateReport {
        target: ordered.first().map(|result| result.target),
        all_successful_times: Vec::new(),
        min: 0.0,
        max: 0.0,
        mean: 0.0,
        std_dev: 0.0,
        probes: 0,
        successes: 0,
        timeouts: 0,
        workers: Vec::with_capacity(ordered.len()),
        raw_messages: Vec::new(),
    };

    for result in ordered {
        let mut summary = WorkerSummary {
            worker: result.worker,
            probes: 0,
            replies: 0,
            timeouts: 0,
            permission_denied: false,
        };
        for outcome in &result.outcomes {
            match outcome.status {
                ProbeStatus::Success { round_trip_ms } => {
                    report.all_successful_times.push(round_trip_ms);
                    stats.update(round_trip_ms);
                    summary.probes += 1;
                    summary.replies += 1;
                }
                ProbeStatus::Timeout => {
                    summary.probes += 1;
                    summary.timeouts += 1;
                }
                ProbeStatus::PermissionDenied => {
                    summary.permission_denied = true;
                }
            }
            report
                .raw_messages
                .push(outcome.describe(result.target).to_string());
        }
        report.probes += summary.probes;
        report.successes += summary.replies;
        report.timeouts += summary.timeouts;
        report.workers.push(summary);
    }

    report.min = stats.min();
    report.max = stats.max();
    report.mean = stats.mean();
    report.std_dev = stats.standard_deviation();
    report
}

impl fmt::Display for AggregateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} probes sent, {} replies, {} timed out",
            self.probes, self.successes, self.timeouts
        )?;
        let denied = self
            .workers
            .iter()
            .filter(|worker| worker.permission_denied)
            .count();
        if denied > 0 {
            writeln!(
                f,
                "{} of {} workers could not open a raw socket",
                denied,
                self.workers.len()
            )?;
        }
        write!(
            f,
            "Minimum Time: {:.3} ms\nMaximum Time: {:.3} ms\nAverage Time: \
             {:.3} ms\nStandard Deviation: {:.3} ms",
            self.min, self.max, self.mean, self.std_dev
        )
    }
}

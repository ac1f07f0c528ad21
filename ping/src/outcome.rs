use std::{fmt, net::Ipv4Addr};

use serde::Serialize;

/// How a single probe resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    Success { round_trip_ms: f64 },
    Timeout,
    /// The worker could not open its raw transport and sent nothing.
    PermissionDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub sequence: u16,
    #[serde(flatten)]
    pub status: ProbeStatus,
}

impl ProbeOutcome {
    pub fn success(sequence: u16, round_trip_ms: f64) -> Self {
        Self {
            sequence,
            status: ProbeStatus::Success { round_trip_ms },
        }
    }

    pub fn timeout(sequence: u16) -> Self {
        Self {
            sequence,
            status: ProbeStatus::Timeout,
        }
    }

    pub fn permission_denied() -> Self {
        Self {
            sequence: 0,
            status: ProbeStatus::PermissionDenied,
        }
    }

    pub fn round_trip_ms(&self) -> Option<f64> {
        match self.status {
            ProbeStatus::Success { round_trip_ms } => Some(round_trip_ms),
            _ => None,
        }
    }

    /// Human readable line for this outcome against `target`.
    pub fn describe(&self, target: Ipv4Addr) -> OutcomeLine {
        OutcomeLine {
            outcome: *self,
            target,
        }
    }
}

pub struct OutcomeLine {
    outcome: ProbeOutcome,
    target: Ipv4Addr,
}

impl fmt::Display for OutcomeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome.status {
            ProbeStatus::Success { round_trip_ms } => {
                write!(
                    f,
                    "Reply from {}: time={:.3}ms",
                    self.target, round_trip_ms
                )
            }
            ProbeStatus::Timeout => {
                write!(f, "Request timed out for seq {}", self.outcome.sequence)
            }
            ProbeStatus::PermissionDenied => write!(
                f,
                "Permission denied: raw ICMP sockets require root or \
                 CAP_NET_RAW"
            ),
        }
    }
}

/// Everything one worker produced, in send order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResult {
    pub worker: usize,
    pub target: Ipv4Addr,
    pub outcomes: Vec<ProbeOutcome>,
}

impl WorkerResult {
    pub fn permission_denied(&self) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.status == ProbeStatus::PermissionDenied)
    }
}

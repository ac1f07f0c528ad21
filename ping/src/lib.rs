//! Round-trip latency measurement over ICMP echo, with the probes spread
//! across concurrent workers.
//!
//! [`run_session`] is the entry point: it validates a [`SessionConfig`],
//! splits the probe count across workers, runs them all to completion and
//! returns one [`AggregateReport`].
//!
//! ```rust,no_run
//! use spreadping::{run_session, SessionConfig};
//!
//! # async fn demo() -> Result<(), spreadping::SessionError> {
//! let config = SessionConfig::new("192.0.2.1", 0.2, 20, 4);
//! let report = run_session(&config).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod outcome;
pub mod packet;
pub mod partition;
pub mod report;
pub mod session;
pub mod transport;
pub mod worker;

#[cfg(test)]
mod testing;

pub use outcome::{ProbeOutcome, ProbeStatus, WorkerResult};
pub use partition::partition;
pub use report::{aggregate, AggregateReport, WorkerSummary};
pub use session::{run_session, run_session_with, SessionConfig, SessionError};
pub use transport::{RawSocketFactory, Transport, TransportFactory};
pub use worker::{ProbeWorker, WorkerState};

//! A single probing worker.
//!
//! Each worker opens its own transport, then sends its share of echo requests
//! at a fixed cadence: wait up to one interval for a reply, then sleep one
//! interval, whatever happened.

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use tokio::time::{sleep, timeout, Instant};

use crate::{
    outcome::{ProbeOutcome, WorkerResult},
    packet::{build_echo_request, ECHO_IDENTIFIER},
    transport::{Transport, TransportFactory},
};

/// Large enough for an IPv4 header plus our echo reply.
const RECV_BUF_LEN: usize = 1024;

/// Outcomes reserved up front; larger shares grow the vector as they go.
const MAX_PREALLOC: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Done,
    Failed,
}

pub struct ProbeWorker<F: TransportFactory> {
    index: usize,
    target: Ipv4Addr,
    interval: Duration,
    assigned: u64,
    factory: Arc<F>,
    state: WorkerState,
}

/// Sequence numbers restart at zero after 65535.
fn sequence_number(n: u64) -> u16 {
    n as u16
}

impl<F: TransportFactory> ProbeWorker<F> {
    pub fn new(
        index: usize,
        target: Ipv4Addr,
        interval: Duration,
        assigned: u64,
        factory: Arc<F>,
    ) -> Self {
        Self {
            index,
            target,
            interval,
            assigned,
            factory,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Probe until the assigned count is exhausted.
    ///
    /// Never fails: a transport that cannot be opened becomes a single
    /// permission-denied outcome, and every per-probe problem becomes a
    /// timeout.
    pub async fn run(&mut self) -> WorkerResult {
        self.state = WorkerState::Running;
        let mut transport = match self.factory.open() {
            Ok(transport) => transport,
            Err(err) => {
                tracing::error!(
                    worker = self.index,
                    error = %err,
                    "Failed to open raw ICMP transport"
                );
                self.state = WorkerState::Failed;
                return WorkerResult {
                    worker: self.index,
                    target: self.target,
                    outcomes: vec![ProbeOutcome::permission_denied()],
                };
            }
        };

        tracing::debug!(
            worker = self.index,
            assigned = self.assigned,
            "Worker started"
        );
        let mut buf = [0u8; RECV_BUF_LEN];
        let mut outcomes =
            Vec::with_capacity(self.assigned.min(MAX_PREALLOC) as usize);
        for n in 0..self.assigned {
            let outcome = self
                .probe(&mut transport, sequence_number(n), &mut buf)
                .await;
            outcomes.push(outcome);
            sleep(self.interval).await;
        }

        self.state = WorkerState::Done;
        tracing::debug!(worker = self.index, "Worker finished");
        WorkerResult {
            worker: self.index,
            target: self.target,
            outcomes,
        }
    }

    async fn probe(
        &self,
        transport: &mut F::Transport,
        sequence: u16,
        buf: &mut [u8],
    ) -> ProbeOutcome {
        let packet = build_echo_request(sequence, ECHO_IDENTIFIER);
        let start = Instant::now();
        if let Err(err) = transport.send_to(&packet, self.target).await {
            tracing::warn!(
                worker = self.index,
                seq = sequence,
                error = %err,
                "Send failed, counting probe as timed out"
            );
            return ProbeOutcome::timeout(sequence);
        }

        // Whatever arrives first counts as the reply
        match timeout(self.interval, transport.recv(buf)).await {
            Ok(Ok(_len)) => {
                let rtt = start.elapsed().as_secs_f64() * 1000.0;
                tracing::debug!(
                    worker = self.index,
                    seq = sequence,
                    rtt_ms = rtt,
                    "Reply received"
                );
                ProbeOutcome::success(sequence, rtt)
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    worker = self.index,
                    seq = sequence,
                    error = %err,
                    "Receive failed, counting probe as timed out"
                );
                ProbeOutcome::timeout(sequence)
            }
            Err(_) => {
                tracing::debug!(
                    worker = self.index,
                    seq = sequence,
                    "Request timed out"
                );
                ProbeOutcome::timeout(sequence)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        outcome::ProbeStatus,
        testing::{Behaviour, StubFactory},
    };

    const TARGET: Ipv4Addr = Ipv4Addr::LOCALHOST;
    const INTERVAL: Duration = Duration::from_millis(5);

    fn worker(
        factory: &StubFactory,
        assigned: u64,
    ) -> ProbeWorker<StubFactory> {
        let factory = Arc::new(factory.clone());
        ProbeWorker::new(2, TARGET, INTERVAL, assigned, factory)
    }

    #[tokio::test]
    async fn replies_become_successes_in_order() {
        let factory = StubFactory::new(Behaviour::Echo);
        let mut worker = worker(&factory, 6);
        assert_eq!(worker.state(), WorkerState::Idle);

        let result = worker.run().await;

        assert_eq!(worker.state(), WorkerState::Done);
        assert_eq!(result.worker, 2);
        assert_eq!(result.target, TARGET);
        assert_eq!(result.outcomes.len(), 6);
        for (n, outcome) in result.outcomes.iter().enumerate() {
            assert_eq!(outcome.sequence, n as u16);
            let rtt = outcome.round_trip_ms().expect("expected a reply");
            assert!(rtt >= 0.0);
        }
        assert_eq!(factory.sent(), 6);
    }

    #[tokio::test]
    async fn silence_becomes_timeouts() {
        let factory = StubFactory::new(Behaviour::Silent);
        let mut worker = worker(&factory, 4);

        let result = worker.run().await;

        assert_eq!(worker.state(), WorkerState::Done);
        let sequences: Vec<u16> =
            result.outcomes.iter().map(|o| o.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert!(result
            .outcomes
            .iter()
            .all(|o| o.status == ProbeStatus::Timeout));
    }

    #[tokio::test]
    async fn timeout_waits_for_the_interval() {
        let factory = StubFactory::new(Behaviour::Silent);
        let mut worker = worker(&factory, 2);

        let start = Instant::now();
        worker.run().await;

        // Two probes, each a full receive wait plus the cadence sleep
        assert!(start.elapsed() >= INTERVAL * 4);
    }

    #[tokio::test]
    async fn denied_transport_fails_without_probing() {
        let factory = StubFactory::denied();
        let mut worker = worker(&factory, 5);

        let result = worker.run().await;

        assert_eq!(worker.state(), WorkerState::Failed);
        assert_eq!(result.outcomes, vec![ProbeOutcome::permission_denied()]);
        assert!(result.permission_denied());
        assert_eq!(factory.sent(), 0);
    }

    #[tokio::test]
    async fn send_errors_count_as_timeouts() {
        let factory = StubFactory::new(Behaviour::SendFails);
        let mut worker = worker(&factory, 3);

        let result = worker.run().await;

        assert_eq!(worker.state(), WorkerState::Done);
        assert_eq!(
            result.outcomes,
            vec![
                ProbeOutcome::timeout(0),
                ProbeOutcome::timeout(1),
                ProbeOutcome::timeout(2)
            ]
        );
    }

    #[tokio::test]
    async fn mixed_replies_keep_sequence_order() {
        let factory = StubFactory::new(Behaviour::EveryOther);
        let mut worker = worker(&factory, 5);

        let result = worker.run().await;

        let replied: Vec<bool> = result
            .outcomes
            .iter()
            .map(|o| o.round_trip_ms().is_some())
            .collect();
        assert_eq!(replied, vec![true, false, true, false, true]);
    }

    #[tokio::test]
    async fn nothing_assigned_still_opens_and_finishes() {
        let factory = StubFactory::new(Behaviour::Echo);
        let mut worker = worker(&factory, 0);

        let result = worker.run().await;

        assert_eq!(worker.state(), WorkerState::Done);
        assert!(result.outcomes.is_empty());
        assert_eq!(factory.opened(), 1);
    }

    #[tokio::test]
    async fn huge_assignment_starts_sending() {
        let factory = StubFactory::new(Behaviour::Echo);
        let mut worker = worker(&factory, u64::MAX / 2);

        let handle = tokio::spawn(async move { worker.run().await });
        sleep(INTERVAL * 10).await;

        assert!(!handle.is_finished());
        handle.abort();
        assert!(factory.sent() > 0);
    }

    #[test]
    fn sequence_wraps() {
        assert_eq!(sequence_number(0), 0);
        assert_eq!(sequence_number(65535), 65535);
        assert_eq!(sequence_number(65536), 0);
        assert_eq!(sequence_number(65537), 1);
    }
}

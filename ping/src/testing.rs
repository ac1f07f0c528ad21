//! In-memory transports for exercising workers without raw sockets.

use std::{
    io,
    net::Ipv4Addr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;

use crate::transport::{Transport, TransportFactory};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behaviour {
    /// Every send is answered at once.
    Echo,
    /// Nothing ever arrives.
    Silent,
    /// Every send fails.
    SendFails,
    /// Replies arrive only for even sequence numbers.
    EveryOther,
}

pub struct StubTransport {
    behaviour: Behaviour,
    sent: Arc<AtomicUsize>,
    pending_reply: bool,
}

#[async_trait]
impl Transport for StubTransport {
    async fn send_to(
        &mut self,
        packet: &[u8],
        _dst: Ipv4Addr,
    ) -> io::Result<usize> {
        if self.behaviour == Behaviour::SendFails {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "network is unreachable",
            ));
        }
        let sequence = u16::from_le_bytes([packet[6], packet[7]]);
        self.pending_reply = match self.behaviour {
            Behaviour::Echo => true,
            Behaviour::EveryOther => sequence % 2 == 0,
            _ => false,
        };
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(packet.len())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if std::mem::take(&mut self.pending_reply) {
            buf[0] = 0;
            return Ok(1);
        }
        std::future::pending().await
    }
}

/// Hands out stub transports and counts what they did.
#[derive(Clone)]
pub struct StubFactory {
    behaviour: Behaviour,
    deny: bool,
    opened: Arc<AtomicUsize>,
    sent: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            deny: false,
            opened: Arc::new(AtomicUsize::new(0)),
            sent: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(Behaviour::Echo)
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

impl TransportFactory for StubFactory {
    type Transport = StubTransport;

    fn open(&self) -> io::Result<StubTransport> {
        if self.deny {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Operation not permitted",
            ));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StubTransport {
            behaviour: self.behaviour,
            sent: self.sent.clone(),
            pending_reply: false,
        })
    }
}

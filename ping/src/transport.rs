//! The raw network seam a probe worker talks through.

use std::{io, net::Ipv4Addr};

use async_trait::async_trait;
use common::{AsyncICMPSocket, ICMPSocket};

/// A datagram transport scoped to ICMP. Closed on drop.
#[async_trait]
pub trait Transport: Send {
    async fn send_to(&mut self, packet: &[u8], dst: Ipv4Addr)
        -> io::Result<usize>;

    /// Wait for the next inbound datagram of any kind.
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Hands every worker its own transport.
pub trait TransportFactory: Send + Sync + 'static {
    type Transport: Transport + 'static;

    fn open(&self) -> io::Result<Self::Transport>;
}

/// Raw ICMPv4 socket registered with the tokio reactor.
pub struct IcmpTransport {
    socket: AsyncICMPSocket,
}

#[async_trait]
impl Transport for IcmpTransport {
    async fn send_to(
        &mut self,
        packet: &[u8],
        dst: Ipv4Addr,
    ) -> io::Result<usize> {
        self.socket.send_to(packet, &dst).await
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buf).await
    }
}

/// Opens raw sockets, optionally bound to one interface.
#[derive(Debug, Clone, Default)]
pub struct RawSocketFactory {
    iface: Option<String>,
}

impl RawSocketFactory {
    pub fn new(iface: Option<String>) -> Self {
        Self { iface }
    }
}

impl TransportFactory for RawSocketFactory {
    type Transport = IcmpTransport;

    fn open(&self) -> io::Result<IcmpTransport> {
        let socket = ICMPSocket::new(self.iface.as_deref())?;
        Ok(IcmpTransport {
            socket: AsyncICMPSocket::new(socket)?,
        })
    }
}

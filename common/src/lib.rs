use std::{
    fmt,
    io::{self, Read},
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    os::unix::io::{AsRawFd, RawFd},
};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::io::unix::AsyncFd;

// Strong type for a raw IPv4 ICMP socket
pub struct ICMPSocket(Socket);

impl ICMPSocket {
    /// Open a non-blocking raw ICMPv4 socket, optionally bound to a device.
    ///
    /// Opening a raw socket needs root or `CAP_NET_RAW`; without it the error
    /// kind is `io::ErrorKind::PermissionDenied`.
    pub fn new(bind_interface: Option<&str>) -> io::Result<ICMPSocket> {
        let socket =
            Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
        socket.set_nonblocking(true)?;

        let socket = match bind_interface {
            Some(bi) => bind_to_device(socket, bi)?,
            None => socket,
        };

        Ok(ICMPSocket(socket))
    }
    pub fn get_ref(&self) -> &Socket {
        &self.0
    }
}

impl AsRawFd for ICMPSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

pub struct AsyncICMPSocket {
    inner: AsyncFd<ICMPSocket>,
}

impl AsyncICMPSocket {
    pub fn new(socket: ICMPSocket) -> io::Result<Self> {
        Ok(Self {
            inner: AsyncFd::new(socket)?,
        })
    }

    pub async fn send_to(
        &mut self,
        packet: &[u8],
        addr: &Ipv4Addr,
    ) -> io::Result<usize> {
        // Raw sockets ignore the port
        let addr = SockAddr::from(SocketAddr::V4(SocketAddrV4::new(*addr, 0)));
        loop {
            let mut guard = self.inner.writable().await?;
            let sent = guard.try_io(|inner| {
                inner.get_ref().get_ref().send_to(packet, &addr)
            });
            match sent {
                Ok(res) => return res,
                Err(_would_block) => continue,
            }
        }
    }

    /// Read one datagram, IPv4 header included.
    pub async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let mut guard = self.inner.readable().await?;
            match guard.try_io(|inner| {
                let mut socket = inner.get_ref().get_ref();
                socket.read(buf)
            }) {
                Ok(res) => return res,
                Err(_would_block) => continue,
            }
        }
    }
}

pub fn bind_to_device(
    socket: Socket,
    bind_interface: &str,
) -> Result<Socket, std::io::Error> {
    // Socket2 bind_device does not have nice error types, so we have to handle
    // the libc errors. In case, we get an error when binding, map it into a
    // more friendly std::io::Error
    if let Err(err) = socket.bind_device(Some(bind_interface.as_bytes())) {
        return match err.raw_os_error() {
            Some(libc::ENODEV) => {
                let error_msg = format!(
                    "error binding to device (`{}`): {}",
                    bind_interface, err
                );
                Err(io::Error::new(io::ErrorKind::NotFound, error_msg))
            }
            // Binding a device is privileged too, keep the kind intact
            Some(libc::EPERM) | Some(libc::EACCES) => Err(err),
            _ => {
                let error_msg =
                    format!("unexpected error binding device: {}", err);
                Err(io::Error::new(io::ErrorKind::Other, error_msg))
            }
        };
    }

    Ok(socket)
}

/// Running summary of a series of samples.
///
/// Min, max and mean are tracked incrementally; the variance uses Welford's
/// update. An empty series reports zero for every statistic.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    mean: f64,
    variance: f64,
    min: f64,
    max: f64,
    samples: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min: {:.3} max: {:.3} mean: {:.3} standard deviation: {:.3} \
             samples: {}",
            self.min(),
            self.max(),
            self.mean(),
            self.standard_deviation(),
            self.samples()
        )
    }
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }
    pub fn variance(&self) -> f64 {
        if self.samples == 0 {
            return 0.0;
        }
        self.variance / ((self.samples) as f64)
    }
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn update(&mut self, value: f64) {
        self.samples += 1;
        if self.samples == 1 {
            self.mean = value;
            self.variance = 0.0;
            self.min = value;
            self.max = value;
        } else {
            let old_mean = self.mean;
            self.mean = old_mean + (value - old_mean) / self.samples as f64;
            self.variance =
                self.variance + (value - old_mean) * (value - self.mean);
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
    }
}

impl Extend<f64> for Statistics {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.update(value);
        }
    }
}

use std::{
    io::{self, Write},
    net::{IpAddr, TcpStream, ToSocketAddrs},
};

use tracing::debug;

use crate::{
    config::{FaceConfig, LOCALHOP_COMMAND_PREFIX, LOCALHOST_COMMAND_PREFIX},
    face::Face,
    transport::{Channel, Connect, SocketId, TransportError, TransportReceiver, TransportSender},
};

use super::{nonblocking, read_stream, socket_id, MonotonicClock};

pub const DEFAULT_NDN_PORT: u16 = 6363;

pub struct TcpSender {
    stream: TcpStream,
}

pub struct TcpReceiver {
    stream: TcpStream,
}

impl TransportSender for TcpSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        nonblocking(self.stream.write(src))
    }
}

impl TransportReceiver for TcpReceiver {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        read_stream(&mut self.stream, dst)
    }

    fn socket_id(&self) -> Option<SocketId> {
        socket_id(&self.stream)
    }
}

pub fn tcp_transport(stream: TcpStream) -> Result<(TcpSender, TcpReceiver), io::Error> {
    stream.set_nonblocking(true)?;
    stream.set_nodelay(true)?;
    let sender = TcpSender {
        stream: stream.try_clone()?,
    };
    let receiver = TcpReceiver { stream };
    Ok((sender, receiver))
}

pub fn tcp_channel(stream: TcpStream) -> Result<Channel, io::Error> {
    let (sender, receiver) = tcp_transport(stream)?;
    Ok(Channel::new(sender, receiver))
}

/// Connects to a forwarder listening on `host:port`.
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Whether the forwarder runs on this machine, judged from the host alone.
    pub fn is_local(&self) -> bool {
        self.host.eq_ignore_ascii_case("localhost")
            || self
                .host
                .parse::<IpAddr>()
                .map_or(false, |addr| addr.is_loopback())
    }
}

impl Connect for TcpConnector {
    fn connect(&mut self) -> Result<Channel, TransportError> {
        let addrs = (self.host.as_str(), self.port).to_socket_addrs()?;
        let stream = TcpStream::connect(&addrs.collect::<Vec<_>>()[..])?;
        debug!(host = %self.host, port = self.port, "tcp connection established");
        Ok(tcp_channel(stream)?)
    }
}

impl Face {
    /// A face for the forwarder at `host:port`, connected on first use.
    ///
    /// Commands go to `/localhop/nfd` unless the host is this machine.
    pub fn tcp(host: impl Into<String>, port: u16) -> Face {
        let connector = TcpConnector::new(host, port);
        let command_prefix = if connector.is_local() {
            LOCALHOST_COMMAND_PREFIX
        } else {
            LOCALHOP_COMMAND_PREFIX
        };
        let config = FaceConfig::default().with_command_prefix(command_prefix);
        Face::with_config(connector, MonotonicClock::new(), config)
    }
}

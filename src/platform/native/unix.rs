use std::{
    io::{self, Write},
    os::unix::net::{UnixDatagram, UnixStream},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    face::Face,
    transport::{Channel, Connect, SocketId, TransportError, TransportReceiver, TransportSender},
};

use super::{nonblocking, read_stream, socket_id, DatagramBuffer, MonotonicClock};

pub const DEFAULT_UNIX_SOCKET_PATH: &str = "/var/run/nfd.sock";

pub struct UnixStreamSender {
    stream: UnixStream,
}

pub struct UnixStreamReceiver {
    stream: UnixStream,
}

impl TransportSender for UnixStreamSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        nonblocking(self.stream.write(src))
    }
}

impl TransportReceiver for UnixStreamReceiver {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        read_stream(&mut self.stream, dst)
    }

    fn socket_id(&self) -> Option<SocketId> {
        socket_id(&self.stream)
    }
}

pub fn unix_stream_transport(
    stream: UnixStream,
) -> Result<(UnixStreamSender, UnixStreamReceiver), io::Error> {
    stream.set_nonblocking(true)?;
    let sender = UnixStreamSender {
        stream: stream.try_clone()?,
    };
    let receiver = UnixStreamReceiver { stream };
    Ok((sender, receiver))
}

pub fn unix_stream_channel(stream: UnixStream) -> Result<Channel, io::Error> {
    let (sender, receiver) = unix_stream_transport(stream)?;
    Ok(Channel::new(sender, receiver))
}

pub struct UnixDatagramSender {
    socket: UnixDatagram,
    buffer: DatagramBuffer,
}

pub struct UnixDatagramReceiver {
    socket: UnixDatagram,
}

impl TransportSender for UnixDatagramSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        let socket = &self.socket;
        self.buffer.accept(src, |bytes| socket.send(bytes))
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let socket = &self.socket;
        self.buffer.flush(|bytes| socket.send(bytes))
    }
}

impl TransportReceiver for UnixDatagramReceiver {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        nonblocking(self.socket.recv(dst))
    }

    fn socket_id(&self) -> Option<SocketId> {
        socket_id(&self.socket)
    }
}

/// Datagram transport over a socket already connected to its peer.
pub fn unix_datagram_transport(
    socket: UnixDatagram,
) -> Result<(UnixDatagramSender, UnixDatagramReceiver), io::Error> {
    socket.set_nonblocking(true)?;
    let sender = UnixDatagramSender {
        socket: socket.try_clone()?,
        buffer: DatagramBuffer::default(),
    };
    let receiver = UnixDatagramReceiver { socket };
    Ok((sender, receiver))
}

pub fn unix_datagram_channel(socket: UnixDatagram) -> Result<Channel, io::Error> {
    let (sender, receiver) = unix_datagram_transport(socket)?;
    Ok(Channel::datagram(sender, receiver))
}

/// Connects to a forwarder's Unix stream socket.
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for UnixConnector {
    fn default() -> Self {
        Self::new(DEFAULT_UNIX_SOCKET_PATH)
    }
}

impl Connect for UnixConnector {
    fn connect(&mut self) -> Result<Channel, TransportError> {
        let stream = UnixStream::connect(&self.path)?;
        debug!(path = %self.path.display(), "unix connection established");
        Ok(unix_stream_channel(stream)?)
    }
}

impl Face {
    /// A face for the local forwarder behind the Unix socket at `path`.
    pub fn unix(path: impl AsRef<Path>) -> Face {
        Face::new(UnixConnector::new(path), MonotonicClock::new())
    }
}

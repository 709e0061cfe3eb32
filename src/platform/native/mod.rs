use std::io::{self, ErrorKind, Read};

use crate::transport::{SocketId, TransportError};

mod clock;
#[cfg(feature = "poller")]
mod pump;
pub mod tcp;
pub mod udp;
#[cfg(unix)]
pub mod unix;

pub use clock::MonotonicClock;
#[cfg(feature = "poller")]
pub use pump::EventPump;

// Non-blocking sockets report "try again" as an error; the transports
// report it as zero bytes moved.
fn nonblocking(result: io::Result<usize>) -> Result<usize, TransportError> {
    match result {
        Ok(count) => Ok(count),
        Err(e) => match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::Interrupted => Ok(0),
            ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::UnexpectedEof => Err(TransportError::Disconnected),
            _ => Err(TransportError::Io(e)),
        },
    }
}

// A stream read of zero bytes into a non-empty buffer is the peer hanging up.
fn read_stream(stream: &mut impl Read, dst: &mut [u8]) -> Result<usize, TransportError> {
    if dst.is_empty() {
        return Ok(0);
    }
    match stream.read(dst) {
        Ok(0) => Err(TransportError::Disconnected),
        other => nonblocking(other),
    }
}

#[cfg(any(unix, target_os = "hermit"))]
fn socket_id(socket: &impl std::os::fd::AsFd) -> Option<SocketId> {
    Some(SocketId(socket.as_fd().try_clone_to_owned().ok()?))
}

#[cfg(windows)]
fn socket_id(socket: &impl std::os::windows::io::AsSocket) -> Option<SocketId> {
    Some(SocketId(socket.as_socket().try_clone_to_owned().ok()?))
}

// Holds one outgoing datagram until the socket takes it whole.
#[derive(Default)]
struct DatagramBuffer {
    pending: Vec<u8>,
}

impl DatagramBuffer {
    fn accept(
        &mut self,
        src: &[u8],
        send: impl FnMut(&[u8]) -> io::Result<usize>,
    ) -> Result<usize, TransportError> {
        if !self.pending.is_empty() {
            self.flush(send)?;
            if !self.pending.is_empty() {
                return Ok(0);
            }
        }
        self.pending.extend_from_slice(src);
        Ok(src.len())
    }

    fn flush(
        &mut self,
        mut send: impl FnMut(&[u8]) -> io::Result<usize>,
    ) -> Result<(), TransportError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let len = self.pending.len();
        match nonblocking(send(&self.pending))? {
            0 => Ok(()),
            sent if sent == len => {
                self.pending.clear();
                Ok(())
            }
            // Datagrams are all or nothing
            _ => Err(TransportError::Io(io::Error::new(
                ErrorKind::WriteZero,
                "datagram was truncated",
            ))),
        }
    }
}

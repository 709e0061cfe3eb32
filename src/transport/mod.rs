mod buffered;
mod datagram;
pub mod local;
mod ringbuffer;

pub use buffered::*;
pub use datagram::*;

use std::collections::VecDeque;

use tracing::{debug, trace};

// A transport moves raw bytes to and from the forwarder.

// It is split into a sender and a receiver half, both non-blocking:
//  returning Ok(0) means "try again later". Byte-stream transports may
//  fragment arbitrarily, datagram transports return one whole datagram per
//  try_recv and keep one frame per datagram.

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("transport disconnected")]
    Disconnected,
    #[error("send queue is full")]
    SendQueueFull,
    #[error("received a frame of {0} bytes, larger than the receive buffer")]
    FrameTooLarge(usize),
    #[error("received bytes that are not a TLV frame")]
    Framing,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait TransportSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError>;

    // Called once a whole frame has been handed to try_send.
    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

pub trait TransportReceiver {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError>;

    // Socket-backed receivers expose their socket so a run loop can wait on it.
    fn socket_id(&self) -> Option<SocketId> {
        None
    }
}

impl<T: TransportSender + ?Sized> TransportSender for Box<T> {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        (**self).try_send(src)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}

impl<T: TransportReceiver + ?Sized> TransportReceiver for Box<T> {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        (**self).try_recv(dst)
    }

    fn socket_id(&self) -> Option<SocketId> {
        (**self).socket_id()
    }
}

pub struct SocketId(
    #[cfg(any(unix, target_os = "hermit"))] pub(crate) std::os::fd::OwnedFd,
    #[cfg(windows)] pub(crate) std::os::windows::io::OwnedSocket,
);

/// Opens the channel to a forwarder, once, when the face first needs it.
pub trait Connect {
    fn connect(&mut self) -> Result<Channel, TransportError>;
}

impl<F> Connect for F
where
    F: FnMut() -> Result<Channel, TransportError>,
{
    fn connect(&mut self) -> Result<Channel, TransportError> {
        self()
    }
}

pub const DEFAULT_MAX_QUEUE_BYTES: usize = 1 << 20;

enum Inbound {
    Stream(BufferedReceiver<Box<dyn TransportReceiver>>),
    Datagram(DatagramReceiver<Box<dyn TransportReceiver>>),
}

impl Inbound {
    fn inner(&self) -> &dyn TransportReceiver {
        match self {
            Inbound::Stream(receiver) => &**receiver.inner(),
            Inbound::Datagram(receiver) => &**receiver.inner(),
        }
    }
}

struct ChannelHalves {
    sender: Box<dyn TransportSender>,
    receiver: Inbound,
}

/// A framed, non-blocking connection: whole packets in, whole packets out.
///
/// Outgoing frames wait in a bounded queue until the sender accepts them.
/// A byte stream that loses framing is fatal to the channel, while a
/// malformed datagram is only dropped.
pub struct Channel {
    halves: Option<ChannelHalves>,
    queue: VecDeque<Vec<u8>>,
    // Bytes of the front frame already accepted by the sender
    offset: usize,
    queued_bytes: usize,
    max_queue_bytes: usize,
}

impl Channel {
    /// A channel over a byte stream, such as TCP or a Unix stream socket.
    pub fn new(
        sender: impl TransportSender + 'static,
        receiver: impl TransportReceiver + 'static,
    ) -> Self {
        let receiver: Box<dyn TransportReceiver> = Box::new(receiver);
        Self::from_halves(
            Box::new(sender),
            Inbound::Stream(BufferedReceiver::new(receiver)),
        )
    }

    /// A channel over a message-oriented transport, one packet per message.
    pub fn datagram(
        sender: impl TransportSender + 'static,
        receiver: impl TransportReceiver + 'static,
    ) -> Self {
        let receiver: Box<dyn TransportReceiver> = Box::new(receiver);
        Self::from_halves(
            Box::new(sender),
            Inbound::Datagram(DatagramReceiver::new(receiver)),
        )
    }

    fn from_halves(sender: Box<dyn TransportSender>, receiver: Inbound) -> Self {
        Self {
            halves: Some(ChannelHalves { sender, receiver }),
            queue: VecDeque::new(),
            offset: 0,
            queued_bytes: 0,
            max_queue_bytes: DEFAULT_MAX_QUEUE_BYTES,
        }
    }

    pub fn with_max_queue_bytes(mut self, max_queue_bytes: usize) -> Self {
        self.max_queue_bytes = max_queue_bytes;
        self
    }

    /// Sets the largest inbound frame the channel accepts.
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        if let Some(halves) = &mut self.halves {
            match &mut halves.receiver {
                Inbound::Stream(receiver) => receiver.set_capacity(max_frame_size),
                Inbound::Datagram(receiver) => receiver.set_capacity(max_frame_size),
            }
        }
        self
    }

    pub fn is_closed(&self) -> bool {
        self.halves.is_none()
    }

    /// Bytes queued but not yet taken by the transport.
    pub fn pending_bytes(&self) -> usize {
        self.queued_bytes - self.offset
    }

    pub fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        if self.halves.is_none() {
            return Err(TransportError::Disconnected);
        }
        if self.queued_bytes + frame.len() > self.max_queue_bytes {
            return Err(TransportError::SendQueueFull);
        }
        self.queued_bytes += frame.len();
        self.queue.push_back(frame);
        self.flush()
    }

    /// Hands queued frames to the transport until it would block.
    pub fn flush(&mut self) -> Result<(), TransportError> {
        let halves = self.halves.as_mut().ok_or(TransportError::Disconnected)?;
        halves.sender.flush()?;

        while let Some(frame) = self.queue.front() {
            let sent = halves.sender.try_send(&frame[self.offset..])?;
            if sent == 0 {
                break;
            }
            self.offset += sent;
            if self.offset == frame.len() {
                trace!(len = frame.len(), "frame handed to transport");
                self.queued_bytes -= frame.len();
                self.offset = 0;
                self.queue.pop_front();
                halves.sender.flush()?;
            }
        }
        Ok(())
    }

    /// Returns the next complete inbound frame, if one has arrived.
    pub fn poll(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let halves = self.halves.as_mut().ok_or(TransportError::Disconnected)?;
        let receiver = match &mut halves.receiver {
            Inbound::Stream(receiver) => receiver,
            Inbound::Datagram(receiver) => {
                return Ok(receiver.try_recv()?.map(|frame| frame.to_vec()))
            }
        };
        match receiver.try_recv() {
            Ok(frame) => Ok(Some(frame.to_vec())),
            Err(BufferedRecvError::NothingReceived) => Ok(None),
            Err(BufferedRecvError::TlvTooBig(len)) => Err(TransportError::FrameTooLarge(len)),
            Err(BufferedRecvError::DecodingError(e)) => {
                debug!(error = %e, "inbound stream lost framing");
                Err(TransportError::Framing)
            }
            Err(BufferedRecvError::TransportError(e)) => Err(e),
        }
    }

    /// Drops the transport; queued frames are discarded.
    pub fn close(&mut self) {
        if self.halves.take().is_some() {
            debug!(discarded = self.queue.len(), "channel closed");
        }
        self.queue.clear();
        self.queued_bytes = 0;
        self.offset = 0;
    }

    pub fn socket_id(&self) -> Option<SocketId> {
        self.halves
            .as_ref()
            .and_then(|halves| halves.receiver.inner().socket_id())
    }
}

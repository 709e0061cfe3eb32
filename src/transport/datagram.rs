use tracing::debug;

use crate::{packet::MAX_PACKET_SIZE, tlv::TLV};

use super::{TransportError, TransportReceiver};

/// Reads one datagram per call from a message-oriented receiver.
///
/// A datagram must hold exactly one top-level TLV. Anything else is
/// dropped on its own and the next datagram starts from a clean buffer.
pub struct DatagramReceiver<R: TransportReceiver> {
    receiver: R,
    // One byte more than the largest frame, so oversized datagrams show up
    // even when the socket truncates them
    buffer: Vec<u8>,
}

impl<R: TransportReceiver> DatagramReceiver<R> {
    pub fn new(receiver: R) -> Self {
        Self::with_capacity(receiver, MAX_PACKET_SIZE)
    }

    pub fn with_capacity(receiver: R, capacity: usize) -> Self {
        Self {
            receiver,
            buffer: vec![0; capacity + 1],
        }
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.buffer.resize(capacity + 1, 0);
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len() - 1
    }

    pub fn inner(&self) -> &R {
        &self.receiver
    }

    /// Returns the next well-formed datagram, skipping malformed ones.
    pub fn try_recv(&mut self) -> Result<Option<&[u8]>, TransportError> {
        loop {
            let received = self.receiver.try_recv(&mut self.buffer)?;
            if received == 0 {
                return Ok(None);
            }
            if received > self.capacity() {
                debug!(len = received, "dropping oversized datagram");
                continue;
            }

            let whole_tlv = match TLV::try_decode(&self.buffer[..received]) {
                Ok((_, len)) => len == received,
                Err(_) => false,
            };
            if whole_tlv {
                return Ok(Some(&self.buffer[..received]));
            }
            debug!(len = received, "dropping datagram that is not one TLV");
        }
    }
}

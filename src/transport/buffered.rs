use crate::{
    packet::MAX_PACKET_SIZE,
    tlv::{DecodingError, TLV},
};

use super::{TransportError, TransportReceiver};

#[derive(Debug)]
pub enum BufferedRecvError {
    NothingReceived,
    TlvTooBig(usize),
    DecodingError(DecodingError),
    TransportError(TransportError),
}

/// Collects bytes from a byte-stream receiver until they form a whole
/// top-level TLV.
pub struct BufferedReceiver<R: TransportReceiver> {
    receiver: R,
    buffer: Vec<u8>,
    cursor: usize,
    consumed: usize,
}

impl<R: TransportReceiver> BufferedReceiver<R> {
    pub fn new(receiver: R) -> Self {
        Self::with_capacity(receiver, MAX_PACKET_SIZE)
    }

    pub fn with_capacity(receiver: R, capacity: usize) -> Self {
        Self {
            receiver,
            buffer: vec![0; capacity],
            cursor: 0,
            consumed: 0,
        }
    }

    /// Changes the largest TLV that can be reassembled. Bytes already
    /// buffered are kept, so the buffer never shrinks below them.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.buffer.resize(capacity.max(self.cursor), 0);
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn inner(&self) -> &R {
        &self.receiver
    }

    /// Returns the bytes of the next complete TLV, valid until the next call.
    pub fn try_recv(&mut self) -> Result<&[u8], BufferedRecvError> {
        // Drop the TLV handed out last time
        if self.consumed > 0 {
            self.buffer.copy_within(self.consumed..self.cursor, 0);
            self.cursor -= self.consumed;
            self.consumed = 0;
        }

        // Only ask for more bytes when the buffered ones are not a whole TLV
        let mut available = self.complete_tlv_length()?;
        if available.is_none() {
            if self.cursor == self.capacity() {
                return Err(self.too_big());
            }
            let received = self
                .receiver
                .try_recv(&mut self.buffer[self.cursor..])
                .map_err(BufferedRecvError::TransportError)?;
            self.cursor += received;
            available = self.complete_tlv_length()?;
        }

        match available {
            Some(len) => {
                self.consumed = len;
                Ok(&self.buffer[..len])
            }
            None if self.cursor == self.capacity() => Err(self.too_big()),
            None => Err(BufferedRecvError::NothingReceived),
        }
    }

    fn complete_tlv_length(&self) -> Result<Option<usize>, BufferedRecvError> {
        match TLV::try_decode(&self.buffer[..self.cursor]) {
            Ok((_, len)) => Ok(Some(len)),
            Err(DecodingError::BufferTooShort) => Ok(None),
            Err(DecodingError::TruncatedValue { len, .. }) => {
                if len > self.capacity() {
                    Err(BufferedRecvError::TlvTooBig(len))
                } else {
                    Ok(None)
                }
            }
            Err(e) => Err(BufferedRecvError::DecodingError(e)),
        }
    }

    fn too_big(&self) -> BufferedRecvError {
        match TLV::try_decode(&self.buffer[..self.cursor]) {
            Err(DecodingError::TruncatedValue { len, .. }) => BufferedRecvError::TlvTooBig(len),
            _ => BufferedRecvError::TlvTooBig(self.cursor),
        }
    }
}

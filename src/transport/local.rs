use std::{cell::RefCell, rc::Rc};

use super::{ringbuffer::RingBuffer, Channel, TransportError, TransportReceiver, TransportSender};

pub struct LocalSender<const SIZE: usize> {
    inner: Rc<RefCell<RingBuffer<SIZE>>>,
}

pub struct LocalReceiver<const SIZE: usize> {
    inner: Rc<RefCell<RingBuffer<SIZE>>>,
}

/// One direction of an in-process link.
///
/// Once either half is dropped the other one reports `Disconnected`, the
/// receiver only after the buffered bytes were read.
pub fn local_pipe<const SIZE: usize>() -> (LocalSender<SIZE>, LocalReceiver<SIZE>) {
    let inner = Rc::new(RefCell::new(RingBuffer::new()));
    let sender = LocalSender {
        inner: Rc::clone(&inner),
    };
    let receiver = LocalReceiver { inner };
    (sender, receiver)
}

/// Two channels wired to each other, each direction buffering `SIZE` bytes.
pub fn local_link<const SIZE: usize>() -> (Channel, Channel) {
    let (a_sender, b_receiver) = local_pipe::<SIZE>();
    let (b_sender, a_receiver) = local_pipe::<SIZE>();
    (
        Channel::new(a_sender, a_receiver),
        Channel::new(b_sender, b_receiver),
    )
}

impl<const SIZE: usize> TransportSender for LocalSender<SIZE> {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        if Rc::strong_count(&self.inner) <= 1 {
            return Err(TransportError::Disconnected);
        }
        Ok(self.inner.borrow_mut().write(src))
    }
}

impl<const SIZE: usize> TransportReceiver for LocalReceiver<SIZE> {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        let bytes_read = self.inner.borrow_mut().read(dst);
        if bytes_read == 0 && !dst.is_empty() && Rc::strong_count(&self.inner) <= 1 {
            return Err(TransportError::Disconnected);
        }
        Ok(bytes_read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe() {
        let (mut sender, mut receiver) = local_pipe::<8>();
        let mut buffer = [0; 8];

        assert_eq!(receiver.try_recv(&mut buffer).unwrap(), 0);
        assert_eq!(sender.try_send(&[12]).unwrap(), 1);
        assert_eq!(receiver.try_recv(&mut buffer[..0]).unwrap(), 0);
        assert_eq!(receiver.try_recv(&mut buffer).unwrap(), 1);
        assert_eq!(buffer[0], 12);

        assert_eq!(sender.try_send(&[1, 2, 3, 4, 5]).unwrap(), 5);
        assert_eq!(sender.try_send(&[6, 7, 8, 9]).unwrap(), 3);
        assert_eq!(receiver.try_recv(&mut buffer).unwrap(), 8);
        assert_eq!(buffer, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_disconnect_after_drain() {
        let (mut sender, mut receiver) = local_pipe::<8>();
        sender.try_send(&[1, 2]).unwrap();
        drop(sender);

        let mut buffer = [0; 8];
        assert_eq!(receiver.try_recv(&mut buffer).unwrap(), 2);
        assert!(matches!(
            receiver.try_recv(&mut buffer),
            Err(TransportError::Disconnected)
        ));

        let (mut sender, receiver) = local_pipe::<8>();
        drop(receiver);
        assert!(matches!(
            sender.try_send(&[1]),
            Err(TransportError::Disconnected)
        ));
    }
}

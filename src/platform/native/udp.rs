use std::{
    io,
    net::{SocketAddr, UdpSocket},
};

use crate::transport::{Channel, SocketId, TransportError, TransportReceiver, TransportSender};

use super::{nonblocking, socket_id, DatagramBuffer};

pub struct UdpSender {
    socket: UdpSocket,
    buffer: DatagramBuffer,
}

pub struct UdpReceiver {
    socket: UdpSocket,
}

impl TransportSender for UdpSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        let socket = &self.socket;
        self.buffer.accept(src, |bytes| socket.send(bytes))
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        let socket = &self.socket;
        self.buffer.flush(|bytes| socket.send(bytes))
    }
}

impl TransportReceiver for UdpReceiver {
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        nonblocking(self.socket.recv(dst))
    }

    fn socket_id(&self) -> Option<SocketId> {
        socket_id(&self.socket)
    }
}

/// One packet per datagram, exchanged with `remote` only.
pub fn udp_transport(
    socket: UdpSocket,
    remote: SocketAddr,
) -> Result<(UdpSender, UdpReceiver), io::Error> {
    socket.connect(remote)?;
    socket.set_nonblocking(true)?;
    let sender = UdpSender {
        socket: socket.try_clone()?,
        buffer: DatagramBuffer::default(),
    };
    let receiver = UdpReceiver { socket };
    Ok((sender, receiver))
}

pub fn udp_channel(socket: UdpSocket, remote: SocketAddr) -> Result<Channel, io::Error> {
    let (sender, receiver) = udp_transport(socket, remote)?;
    Ok(Channel::datagram(sender, receiver))
}

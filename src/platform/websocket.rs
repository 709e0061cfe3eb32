use std::io;

use ewebsock::{Options, WsEvent, WsMessage, WsReceiver, WsSender};
use tracing::debug;

use crate::transport::{Channel, Connect, TransportError, TransportReceiver, TransportSender};

// Each binary WebSocket message carries exactly one packet.

pub struct WebSocketSender {
    sender: WsSender,
    frame: Vec<u8>,
}

pub struct WebSocketReceiver {
    receiver: WsReceiver,
    closed: bool,
}

impl TransportSender for WebSocketSender {
    fn try_send(&mut self, src: &[u8]) -> Result<usize, TransportError> {
        self.frame.extend_from_slice(src);
        Ok(src.len())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        if !self.frame.is_empty() {
            let frame = std::mem::take(&mut self.frame);
            self.sender.send(WsMessage::Binary(frame));
        }
        Ok(())
    }
}

impl TransportReceiver for WebSocketReceiver {
    // Copies one binary message; a message longer than `dst` is cut short.
    fn try_recv(&mut self, dst: &mut [u8]) -> Result<usize, TransportError> {
        while !self.closed {
            match self.receiver.try_recv() {
                Some(WsEvent::Message(WsMessage::Binary(bytes))) => {
                    let count = bytes.len().min(dst.len());
                    dst[..count].copy_from_slice(&bytes[..count]);
                    return Ok(count);
                }
                Some(WsEvent::Error(e)) => {
                    debug!(error = %e, "websocket error");
                    self.closed = true;
                }
                Some(WsEvent::Closed) => self.closed = true,
                // Text, pings and the open notification carry no packets
                Some(_) => continue,
                None => return Ok(0),
            }
        }
        Err(TransportError::Disconnected)
    }
}

pub fn websocket_transport(
    url: &str,
    wake_up: Option<Box<dyn Fn() + Send + Sync>>,
) -> Result<(WebSocketSender, WebSocketReceiver), TransportError> {
    let options = Options::default();
    let connected = match wake_up {
        Some(wake_up) => ewebsock::connect_with_wakeup(url, options, move || wake_up()),
        None => ewebsock::connect(url, options),
    };
    let (sender, receiver) =
        connected.map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
    Ok((
        WebSocketSender {
            sender,
            frame: Vec::new(),
        },
        WebSocketReceiver {
            receiver,
            closed: false,
        },
    ))
}

/// Connects to a forwarder's WebSocket endpoint, such as `ws://host:9696`.
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Connect for WebSocketConnector {
    fn connect(&mut self) -> Result<Channel, TransportError> {
        let (sender, receiver) = websocket_transport(&self.url, None)?;
        debug!(url = %self.url, "websocket opened");
        Ok(Channel::datagram(sender, receiver))
    }
}

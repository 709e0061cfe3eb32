use std::{
    io,
    time::{Duration, Instant},
};

use polling::{Event, Events, PollMode, Poller};
use tracing::trace;

use crate::{
    face::{Face, FaceError},
    transport::SocketId,
};

const KEY: usize = 0;

/// A run loop for one face that sleeps on its socket between ticks.
///
/// Waits are capped so Interest deadlines are noticed even when nothing
/// arrives. Faces without a socket are simply polled at that interval.
pub struct EventPump {
    poller: Poller,
    events: Events,
    registered: Option<SocketId>,
    should_re_add: bool,
    max_wait: Duration,
}

impl EventPump {
    pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(10);

    pub fn new() -> Result<Self, io::Error> {
        let poller = Poller::new()?;
        let should_re_add = !poller.supports_level();
        Ok(Self {
            poller,
            events: Events::new(),
            registered: None,
            should_re_add,
            max_wait: Self::DEFAULT_MAX_WAIT,
        })
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Drives `face` until `done` holds or `timeout` passes, returning
    /// whether `done` was reached. A lost connection ends the loop early.
    pub fn run_until(
        &mut self,
        face: &mut Face,
        timeout: Duration,
        mut done: impl FnMut(&Face) -> bool,
    ) -> Result<bool, FaceError> {
        let started = Instant::now();
        loop {
            while face.drive_once()? {}
            if done(face) {
                return Ok(true);
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Ok(false);
            }
            self.wait(face, timeout - elapsed);
        }
    }

    /// Blocks until the face's socket is readable, its next deadline
    /// arrives, or `limit` (at most the configured maximum) passes.
    pub fn wait(&mut self, face: &mut Face, limit: Duration) {
        let mut wait = limit.min(self.max_wait);
        if let Some(deadline) = face.next_deadline() {
            let until_deadline = deadline.difference(&face.now()).unwrap_or(0);
            wait = wait.min(Duration::from_millis(until_deadline));
        }

        self.sync_registration(face);
        if self.registered.is_none() {
            std::thread::sleep(wait);
            return;
        }

        self.events.clear();
        if self.poller.wait(&mut self.events, Some(wait)).is_err() {
            return;
        }
        let readable = self.events.iter().any(|event| event.readable);
        trace!(readable, "pump woke up");
        if readable && self.should_re_add {
            if let Some(socket) = &self.registered {
                let _ = self.poller.modify(socket.source(), Event::readable(KEY));
            }
        }
    }

    fn sync_registration(&mut self, face: &Face) {
        match (face.socket_id(), self.registered.is_some()) {
            (Some(socket), false) => {
                let mode = if self.should_re_add {
                    PollMode::Oneshot
                } else {
                    PollMode::Level
                };
                // The socket stays in `registered` until it is deleted again
                let added = unsafe {
                    self.poller
                        .add_with_mode(socket.raw_source(), Event::readable(KEY), mode)
                };
                if added.is_ok() {
                    self.registered = Some(socket);
                }
            }
            (None, true) => self.deregister(),
            _ => {}
        }
    }

    fn deregister(&mut self) {
        if let Some(socket) = self.registered.take() {
            let _ = self.poller.delete(socket.source());
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.deregister();
    }
}

#[cfg(any(unix, target_os = "hermit"))]
use std::os::fd::{BorrowedFd, RawFd};

#[cfg(any(unix, target_os = "hermit"))]
impl SocketId {
    fn raw_source(&self) -> RawFd {
        use std::os::fd::AsRawFd;
        self.0.as_raw_fd()
    }

    fn source(&self) -> BorrowedFd<'_> {
        use std::os::fd::AsFd;
        self.0.as_fd()
    }
}

#[cfg(windows)]
use std::os::windows::io::{BorrowedSocket, RawSocket};

#[cfg(windows)]
impl SocketId {
    fn raw_source(&self) -> RawSocket {
        use std::os::windows::io::AsRawSocket;
        self.0.as_raw_socket()
    }

    fn source(&self) -> BorrowedSocket<'_> {
        use std::os::windows::io::AsSocket;
        self.0.as_socket()
    }
}

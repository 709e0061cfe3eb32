#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use reto_face::{
    clock::{ManualClock, Timestamp},
    command::SignedCommand,
    config::FaceConfig,
    control::{ControlParameters, ControlResponse, RibCommand, STATUS_OK},
    face::Face,
    name::Name,
    packet::{Data, Interest, Packet},
    security::{sign_data, Sha256DigestSigner},
    transport::{local::local_link, Channel},
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RegisterMode {
    Accept,
    Reject(u64),
    Ignore,
}

/// A tiny forwarder: answers registration commands and routes Interests
/// to registered faces, Data back to whoever asked.
pub struct TestForwarder {
    faces: Vec<Channel>,
    routes: Vec<(Name, usize)>,
    pending: Vec<(Interest, usize)>,
    command_prefix: Name,
    pub mode: RegisterMode,
    pub command_timestamps: Vec<u64>,
    pub interests_seen: Vec<Interest>,
}

impl TestForwarder {
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            routes: Vec::new(),
            pending: Vec::new(),
            command_prefix: Name::from_uri("/localhost/nfd"),
            mode: RegisterMode::Accept,
            command_timestamps: Vec::new(),
            interests_seen: Vec::new(),
        }
    }

    pub fn add_channel(&mut self, channel: Channel) -> usize {
        self.faces.push(channel);
        self.faces.len() - 1
    }

    pub fn connect_face(&mut self, clock: &ManualClock) -> Face {
        let (ours, theirs) = local_link::<65536>();
        self.add_channel(theirs);
        Face::with_channel(ours, clock.clone(), FaceConfig::default())
    }

    /// Handles everything the faces have sent so far.
    pub fn step(&mut self) -> bool {
        let mut any = false;
        for index in 0..self.faces.len() {
            while let Ok(Some(frame)) = self.faces[index].poll() {
                any = true;
                match Packet::decode(&frame) {
                    Ok(Packet::Interest(interest)) => self.on_interest(index, interest),
                    Ok(Packet::Data(data)) => self.on_data(data),
                    _ => {}
                }
            }
        }
        any
    }

    fn on_interest(&mut self, from: usize, interest: Interest) {
        self.interests_seen.push(interest.clone());
        if self.command_prefix.is_prefix_of(&interest.name) {
            self.on_command(from, &interest);
            return;
        }

        let route = self
            .routes
            .iter()
            .filter(|(prefix, face)| *face != from && prefix.is_prefix_of(&interest.name))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, face)| *face);
        if let Some(to) = route {
            let _ = self.faces[to].send(interest.wire_encode().unwrap());
            self.pending.push((interest, from));
        }
    }

    fn on_command(&mut self, from: usize, interest: &Interest) {
        let signed = SignedCommand::parse(&interest.name).expect("not a signed command");
        assert!(signed.verify_sha256_digest(), "command signature does not verify");
        self.command_timestamps.push(signed.timestamp_ms);

        let base = self.command_prefix.len();
        let verb = signed.command.get(base + 1).unwrap().as_bytes();
        assert_eq!(RibCommand::from_verb(verb), Some(RibCommand::Register));
        let parameters =
            ControlParameters::decode(signed.command.get(base + 2).unwrap().as_bytes()).unwrap();

        let response = match self.mode {
            RegisterMode::Ignore => return,
            RegisterMode::Reject(code) => ControlResponse::new(code, "refused"),
            RegisterMode::Accept => {
                self.routes.push((parameters.name.clone().unwrap(), from));
                let mut response = ControlResponse::new(STATUS_OK, "OK");
                response.body = Some(parameters);
                response
            }
        };
        let data = signed_data(Data::new(interest.name.clone()).with_content(response.wire_encode()));
        let _ = self.faces[from].send(data.wire_encode().unwrap());
    }

    fn on_data(&mut self, data: Data) {
        let mut index = 0;
        while index < self.pending.len() {
            if self.pending[index].0.matches_data(&data) {
                let (_, to) = self.pending.remove(index);
                let _ = self.faces[to].send(data.wire_encode().unwrap());
            } else {
                index += 1;
            }
        }
    }
}

pub fn signed_data(mut data: Data) -> Data {
    sign_data(&mut data, &Sha256DigestSigner).unwrap();
    data
}

pub fn test_clock() -> ManualClock {
    ManualClock::new(Timestamp {
        ms_since_1970: 1_700_000_000_000,
    })
}

/// Alternates forwarder and face ticks until nothing moves.
pub fn settle(forwarder: &mut TestForwarder, faces: &mut [&mut Face]) {
    for _ in 0..100 {
        let mut any = forwarder.step();
        for face in faces.iter_mut() {
            while face.drive_once().unwrap() {
                any = true;
            }
        }
        if !any {
            return;
        }
    }
    panic!("faces and forwarder did not settle");
}

/// Counts callback invocations by label.
#[derive(Clone, Default)]
pub struct Events(Rc<RefCell<Vec<String>>>);

impl Events {
    pub fn record(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn all(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

//! A client-side face for Named Data Networking.
//!
//! A [`face::Face`] sends Interests to a forwarder and matches the Data
//! that comes back, registers name prefixes and dispatches the Interests
//! sent to them. It never spawns threads: the application drives it by
//! calling [`face::Face::drive_once`], directly or through
//! [`platform::EventPump`].

pub mod blob;
pub mod change_counter;
pub mod clock;
pub mod command;
pub mod config;
pub mod control;
pub mod exclude;
pub mod face;
pub mod hash;
pub mod io;
pub mod key_locator;
pub mod name;
pub mod packet;
pub mod platform;
pub mod security;
pub mod tables;
pub mod tlv;
pub mod transport;

pub use face::{Face, FaceError};
pub use name::{Name, NameComponent};
pub use packet::{Data, Interest, Packet};

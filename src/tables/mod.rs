mod pit;
mod registered;

pub use pit::*;
pub use registered::*;

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

// Shared by every face in the process, so an identifier is never reused
//  even across faces.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PendingInterestId(u64);

impl PendingInterestId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PendingInterestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pit#{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg#{}", self.0)
    }
}

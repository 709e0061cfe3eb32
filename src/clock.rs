use std::{cell::Cell, rc::Rc};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub ms_since_1970: u64,
}

impl Timestamp {
    pub fn adding(&self, ms: u64) -> Self {
        Self {
            ms_since_1970: self.ms_since_1970.saturating_add(ms),
        }
    }

    pub fn removing(&self, ms: u64) -> Self {
        Self {
            ms_since_1970: self.ms_since_1970.saturating_sub(ms),
        }
    }

    // How many milliseconds `self` is ahead of `other`, if it is.
    pub fn difference(&self, other: &Self) -> Option<u64> {
        self.ms_since_1970.checked_sub(other.ms_since_1970)
    }
}

pub trait Clock {
    fn now(&mut self) -> Timestamp;
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the face it drives.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    ms_since_1970: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            ms_since_1970: Rc::new(Cell::new(start.ms_since_1970)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.ms_since_1970
            .set(self.ms_since_1970.get().saturating_add(ms));
    }

    pub fn set(&self, now: Timestamp) {
        self.ms_since_1970.set(now.ms_since_1970);
    }

    pub fn current(&self) -> Timestamp {
        Timestamp {
            ms_since_1970: self.ms_since_1970.get(),
        }
    }
}

impl Clock for ManualClock {
    fn now(&mut self) -> Timestamp {
        self.current()
    }
}

/// Values that count their own mutations.
///
/// Composite values fold in changes of their children when asked, hence
/// the mutable receiver.
pub trait ChangeCount {
    fn change_count(&mut self) -> u64;
}

/// Owns a child value and remembers the child's change count as last seen
/// by the parent, so the parent can tell when the child was mutated
/// through [`ChangeCounter::get_mut`].
#[derive(Clone, Debug, Default)]
pub struct ChangeCounter<T: ChangeCount> {
    target: T,
    observed: u64,
}

impl<T: ChangeCount> ChangeCounter<T> {
    pub fn new(mut target: T) -> Self {
        let observed = target.change_count();
        Self { target, observed }
    }

    pub fn get(&self) -> &T {
        &self.target
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn set(&mut self, mut target: T) {
        self.observed = target.change_count();
        self.target = target;
    }

    /// Returns true once per batch of child mutations since the last check.
    pub fn check_changed(&mut self) -> bool {
        let current = self.target.change_count();
        if current != self.observed {
            self.observed = current;
            true
        } else {
            false
        }
    }
}

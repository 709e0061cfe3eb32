use sha2::{Digest, Sha256};

pub trait Hasher {
    type Digest;
    fn reset(&mut self);
    fn update(&mut self, input: &[u8]);
    fn finalize_reset(&mut self) -> Self::Digest;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sha256Digest(pub [u8; 32]);

#[derive(Clone, Default)]
pub struct Sha256Hasher {
    inner: Sha256,
}

impl Sha256Hasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    pub fn digest(input: &[u8]) -> Sha256Digest {
        let mut hasher = Self::new();
        hasher.update(input);
        hasher.finalize_reset()
    }
}

impl Hasher for Sha256Hasher {
    type Digest = Sha256Digest;

    fn reset(&mut self) {
        Digest::reset(&mut self.inner);
    }

    fn update(&mut self, input: &[u8]) {
        Digest::update(&mut self.inner, input);
    }

    fn finalize_reset(&mut self) -> Self::Digest {
        Sha256Digest(Digest::finalize_reset(&mut self.inner).into())
    }
}

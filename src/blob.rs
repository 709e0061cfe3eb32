use std::{fmt, rc::Rc};

/// An immutable, cheaply cloned byte buffer that may also be null.
///
/// Clones share storage, so a clone of a blob never observes a copy.
#[derive(Clone, Default)]
pub struct Blob(Option<Rc<[u8]>>);

impl Blob {
    pub fn null() -> Self {
        Self(None)
    }

    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Some(Rc::from(bytes.into().into_boxed_slice())))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The bytes, or an empty slice for a null blob.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn shares_storage_with(&self, other: &Blob) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a[..] == b[..],
            _ => false,
        }
    }
}

impl Eq for Blob {}

impl From<&[u8]> for Blob {
    fn from(value: &[u8]) -> Self {
        Blob::new(value)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(value: Vec<u8>) -> Self {
        Blob::new(value)
    }
}

impl From<&str> for Blob {
    fn from(value: &str) -> Self {
        Blob::new(value.as_bytes())
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "Blob(null)"),
            Some(bytes) => {
                write!(f, "Blob(")?;
                for b in bytes.iter() {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, ")")
            }
        }
    }
}

use crate::{
    blob::Blob,
    change_counter::{ChangeCount, ChangeCounter},
    io::Write,
    name::{Name, TLV_TYPE_NAME},
    tlv::{skip_unknown, DecodingError, TlvEncode, TlvReader, TypedBytes},
};

pub const TLV_TYPE_KEY_LOCATOR: u32 = 28;
pub const TLV_TYPE_KEY_DIGEST: u32 = 29;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyLocatorType {
    #[default]
    None,
    KeyName,
    KeyLocatorDigest,
}

/// Identifies the key behind a signature, by name or by digest.
///
/// Only the field selected by the type is meaningful. Cloning copies the
/// name and shares the digest blob.
#[derive(Clone, Debug, Default)]
pub struct KeyLocator {
    typ: KeyLocatorType,
    key_name: ChangeCounter<Name>,
    key_data: Blob,
    changes: u64,
}

impl KeyLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_name(key_name: Name) -> Self {
        let mut locator = Self::new();
        locator.set_type(KeyLocatorType::KeyName);
        locator.set_key_name(key_name);
        locator
    }

    pub fn with_key_digest(digest: Blob) -> Self {
        let mut locator = Self::new();
        locator.set_type(KeyLocatorType::KeyLocatorDigest);
        locator.set_key_data(digest);
        locator
    }

    pub fn get_type(&self) -> KeyLocatorType {
        self.typ
    }

    pub fn get_key_name(&self) -> &Name {
        self.key_name.get()
    }

    /// In-place edits are picked up by the next [`ChangeCount::change_count`].
    pub fn key_name_mut(&mut self) -> &mut Name {
        self.key_name.get_mut()
    }

    pub fn get_key_data(&self) -> &Blob {
        &self.key_data
    }

    pub fn set_type(&mut self, typ: KeyLocatorType) {
        self.typ = typ;
        self.changes += 1;
    }

    pub fn set_key_name(&mut self, key_name: Name) {
        self.key_name.set(key_name);
        self.changes += 1;
    }

    pub fn set_key_data(&mut self, key_data: Blob) {
        self.key_data = key_data;
        self.changes += 1;
    }

    pub fn clear(&mut self) {
        self.typ = KeyLocatorType::None;
        self.key_name.set(Name::new());
        self.key_data = Blob::null();
        self.changes += 1;
    }

    pub(crate) fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut locator = KeyLocator::new();
        for tlv in TlvReader::new(val) {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_NAME => {
                    locator.typ = KeyLocatorType::KeyName;
                    locator.key_name.set(Name::from_tlv_value(tlv.val)?);
                }
                TLV_TYPE_KEY_DIGEST => {
                    locator.typ = KeyLocatorType::KeyLocatorDigest;
                    locator.key_data = Blob::new(tlv.val);
                }
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(locator)
    }
}

impl ChangeCount for KeyLocator {
    fn change_count(&mut self) -> u64 {
        if self.key_name.check_changed() {
            self.changes += 1;
        }
        self.changes
    }
}

impl PartialEq for KeyLocator {
    fn eq(&self, other: &Self) -> bool {
        if self.typ != other.typ {
            return false;
        }
        match self.typ {
            KeyLocatorType::None => true,
            KeyLocatorType::KeyName => self.get_key_name() == other.get_key_name(),
            KeyLocatorType::KeyLocatorDigest => self.key_data == other.key_data,
        }
    }
}

impl TlvEncode for KeyLocator {
    const TLV_TYPE: u32 = TLV_TYPE_KEY_LOCATOR;

    fn inner_length(&self) -> usize {
        match self.typ {
            KeyLocatorType::None => 0,
            KeyLocatorType::KeyName => self.get_key_name().encoded_length(),
            KeyLocatorType::KeyLocatorDigest => TypedBytes::<TLV_TYPE_KEY_DIGEST> {
                bytes: self.key_data.as_slice(),
            }
            .encoded_length(),
        }
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        match self.typ {
            KeyLocatorType::None => Ok(()),
            KeyLocatorType::KeyName => self.get_key_name().encode(writer),
            KeyLocatorType::KeyLocatorDigest => TypedBytes::<TLV_TYPE_KEY_DIGEST> {
                bytes: self.key_data.as_slice(),
            }
            .encode(writer),
        }
    }
}

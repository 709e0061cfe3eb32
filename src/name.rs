use core::{cmp::Ordering, fmt, num::NonZeroU16};
use std::hash::{Hash, Hasher};

use crate::{
    blob::Blob,
    change_counter::ChangeCount,
    io::Write,
    tlv::{
        non_negative_length, tlv_length, write_non_negative, write_tlv, DecodingError, TlvEncode,
        TlvReader, TLV,
    },
};

pub const TLV_TYPE_NAME: u32 = 7;

const NAME_COMPONENT_TYPE_GENERIC: u16 = 8;
const NAME_COMPONENT_TYPE_IMPLICIT_SHA256: u16 = 1;

const GENERIC_TYPE: NonZeroU16 = match NonZeroU16::new(NAME_COMPONENT_TYPE_GENERIC) {
    Some(typ) => typ,
    None => panic!("component types are non-zero"),
};
const IMPLICIT_SHA256_TYPE: NonZeroU16 = match NonZeroU16::new(NAME_COMPONENT_TYPE_IMPLICIT_SHA256) {
    Some(typ) => typ,
    None => panic!("component types are non-zero"),
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NameComponentType {
    Generic,
    ImplicitSha256Digest,
    Other(NonZeroU16),
}

impl From<NonZeroU16> for NameComponentType {
    fn from(value: NonZeroU16) -> Self {
        match value.get() {
            NAME_COMPONENT_TYPE_GENERIC => NameComponentType::Generic,
            NAME_COMPONENT_TYPE_IMPLICIT_SHA256 => NameComponentType::ImplicitSha256Digest,
            _ => NameComponentType::Other(value),
        }
    }
}

impl From<NameComponentType> for NonZeroU16 {
    fn from(value: NameComponentType) -> Self {
        match value {
            NameComponentType::Generic => GENERIC_TYPE,
            NameComponentType::ImplicitSha256Digest => IMPLICIT_SHA256_TYPE,
            NameComponentType::Other(v) => v,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct NameComponent {
    pub typ: NonZeroU16,
    value: Blob,
}

impl NameComponent {
    pub fn new(typ: NameComponentType, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            typ: typ.into(),
            value: Blob::new(bytes),
        }
    }

    pub fn generic(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(NameComponentType::Generic, bytes)
    }

    pub fn from_blob(typ: NameComponentType, value: Blob) -> Self {
        Self {
            typ: typ.into(),
            value,
        }
    }

    /// A generic component holding the NonNegativeInteger encoding of `number`.
    pub fn from_number(number: u64) -> Self {
        let mut bytes = Vec::with_capacity(non_negative_length(number));
        match write_non_negative(&mut bytes, number) {
            Ok(()) => {}
            Err(never) => match never {},
        }
        Self::generic(bytes)
    }

    pub fn to_number(&self) -> Option<u64> {
        let tlv = TLV {
            typ: self.typ.into(),
            val: self.as_bytes(),
        };
        tlv.val_as_u64()
    }

    pub fn component_type(&self) -> NameComponentType {
        self.typ.into()
    }

    pub fn value(&self) -> &Blob {
        &self.value
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_slice()
    }

    pub(crate) fn encoded_length(&self) -> usize {
        tlv_length(self.typ.get() as u32, self.value.len())
    }

    pub(crate) fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        write_tlv(writer, self.typ.get() as u32, self.as_bytes())
    }

    pub(crate) fn from_tlv(tlv: &TLV<'_>) -> Result<Self, DecodingError> {
        let typ: u16 = tlv
            .typ
            .get()
            .try_into()
            .map_err(|_| DecodingError::Malformed("name component type"))?;
        let typ = NonZeroU16::new(typ).ok_or(DecodingError::InvalidType)?;
        Ok(Self {
            typ,
            value: Blob::new(tlv.val),
        })
    }

    /// Parses one URI path segment; `None` means the segment names no component.
    pub fn from_escaped(escaped: &str) -> Option<Self> {
        let bytes = unescape(escaped.trim());
        if !bytes.is_empty() && bytes.iter().all(|b| *b == b'.') {
            // "." and ".." are relative references, "..." and longer drop three periods
            if bytes.len() <= 2 {
                return None;
            }
            return Some(Self::generic(&bytes[3..]));
        }
        Some(Self::generic(bytes))
    }

    pub fn to_escaped(&self) -> String {
        let mut out = String::new();
        if self.component_type() == NameComponentType::ImplicitSha256Digest {
            out.push_str("sha256digest=");
            for b in self.as_bytes() {
                out.push_str(&format!("{:02x}", b));
            }
            return out;
        }

        let bytes = self.as_bytes();
        if bytes.iter().all(|b| *b == b'.') {
            out.push_str("...");
        }
        for &b in bytes {
            if b.is_ascii_alphanumeric() || b"+-._".contains(&b) {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{:02X}", b));
            }
        }
        out
    }
}

impl Ord for NameComponent {
    // Canonical order: type, then length, then the bytes themselves.
    fn cmp(&self, other: &Self) -> Ordering {
        self.typ
            .cmp(&other.typ)
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.as_bytes().cmp(other.as_bytes()))
    }
}

impl PartialOrd for NameComponent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for NameComponent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.typ.hash(state);
        self.as_bytes().hash(state);
    }
}

impl fmt::Debug for NameComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_escaped())
    }
}

fn unescape(escaped: &str) -> Vec<u8> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = core::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(b) = hex {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// An ordered sequence of name components.
///
/// Every mutation bumps the change count, which equality and ordering ignore.
#[derive(Clone, Default)]
pub struct Name {
    components: Vec<NameComponent>,
    changes: u64,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an NDN URI such as `ndn:/a/b%20c` or `/a/b`.
    pub fn from_uri(uri: &str) -> Self {
        let mut rest = uri.trim();
        if let Some(colon) = rest.find(':') {
            if !rest[..colon].contains('/') {
                rest = &rest[colon + 1..];
            }
        }
        if let Some(authority) = rest.strip_prefix("//") {
            rest = match authority.find('/') {
                Some(slash) => &authority[slash..],
                None => "",
            };
        }

        let components = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .filter_map(NameComponent::from_escaped)
            .collect();

        Self {
            components,
            changes: 0,
        }
    }

    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for component in &self.components {
            out.push('/');
            out.push_str(&component.to_escaped());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NameComponent> {
        self.components.get(index)
    }

    pub fn components(&self) -> impl Iterator<Item = &NameComponent> {
        self.components.iter()
    }

    pub fn append(&mut self, component: NameComponent) -> &mut Self {
        self.components.push(component);
        self.changes += 1;
        self
    }

    pub fn append_bytes(&mut self, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.append(NameComponent::generic(bytes))
    }

    pub fn append_number(&mut self, number: u64) -> &mut Self {
        self.append(NameComponent::from_number(number))
    }

    pub fn append_name(&mut self, other: &Name) -> &mut Self {
        self.components.extend(other.components.iter().cloned());
        self.changes += 1;
        self
    }

    pub fn adding(&self, component: NameComponent) -> Name {
        let mut name = self.clone();
        name.append(component);
        name
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.changes += 1;
    }

    /// The first `count` components, or the whole name if it is shorter.
    pub fn get_prefix(&self, count: usize) -> Name {
        Name {
            components: self.components.iter().take(count).cloned().collect(),
            changes: 0,
        }
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    pub(crate) fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut components = Vec::new();
        for tlv in TlvReader::new(val) {
            components.push(NameComponent::from_tlv(&tlv?)?);
        }
        Ok(Self {
            components,
            changes: 0,
        })
    }
}

impl ChangeCount for Name {
    fn change_count(&mut self) -> u64 {
        self.changes
    }
}

impl TlvEncode for Name {
    const TLV_TYPE: u32 = TLV_TYPE_NAME;

    fn inner_length(&self) -> usize {
        self.components.iter().map(|c| c.encoded_length()).sum()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        for component in &self.components {
            component.encode(writer)?;
        }
        Ok(())
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Name {}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::from_uri(value)
    }
}

impl FromIterator<NameComponent> for Name {
    fn from_iter<I: IntoIterator<Item = NameComponent>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
            changes: 0,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.to_uri())
    }
}

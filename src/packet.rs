use crate::{
    blob::Blob,
    change_counter::{ChangeCount, ChangeCounter},
    exclude::{Exclude, TLV_TYPE_EXCLUDE},
    io::Write,
    key_locator::{KeyLocator, KeyLocatorType, TLV_TYPE_KEY_LOCATOR},
    name::{Name, NameComponent, TLV_TYPE_NAME},
    tlv::{
        skip_unknown, tlv_length, to_vec, write_varint, DecodingError, EncodingError, TlvEncode,
        TlvReader, TypedBytes, TypedEmpty, TypedInteger, TLV,
    },
};

pub const MAX_PACKET_SIZE: usize = 8800;

pub const TLV_TYPE_INTEREST: u32 = 5;
pub const TLV_TYPE_DATA: u32 = 6;

const TLV_TYPE_SELECTORS: u32 = 9;
const TLV_TYPE_NONCE: u32 = 10;
const TLV_TYPE_INTEREST_LIFETIME: u32 = 12;
const TLV_TYPE_MIN_SUFFIX_COMPONENTS: u32 = 13;
const TLV_TYPE_MAX_SUFFIX_COMPONENTS: u32 = 14;
const TLV_TYPE_PUBLISHER_PUBLIC_KEY_LOCATOR: u32 = 15;
const TLV_TYPE_CHILD_SELECTOR: u32 = 17;
const TLV_TYPE_MUST_BE_FRESH: u32 = 18;
const TLV_TYPE_META_INFO: u32 = 20;
const TLV_TYPE_CONTENT: u32 = 21;
const TLV_TYPE_SIGNATURE_INFO: u32 = 22;
const TLV_TYPE_SIGNATURE_VALUE: u32 = 23;
const TLV_TYPE_CONTENT_TYPE: u32 = 24;
const TLV_TYPE_FRESHNESS_PERIOD: u32 = 25;
const TLV_TYPE_FINAL_BLOCK_ID: u32 = 26;
const TLV_TYPE_SIGNATURE_TYPE: u32 = 27;

fn check_size(size: usize, limit: usize) -> Result<(), EncodingError> {
    if size > limit {
        return Err(EncodingError::PacketTooLarge { size, limit });
    }
    Ok(())
}

fn integer(tlv: &TLV<'_>, what: &'static str) -> Result<u64, DecodingError> {
    tlv.val_as_u64().ok_or(DecodingError::Malformed(what))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selectors {
    pub min_suffix_components: Option<u64>,
    pub max_suffix_components: Option<u64>,
    pub publisher_public_key_locator: Option<KeyLocator>,
    pub exclude: Exclude,
    pub child_selector: Option<u64>,
    pub must_be_fresh: bool,
}

impl Selectors {
    pub fn is_empty(&self) -> bool {
        self.min_suffix_components.is_none()
            && self.max_suffix_components.is_none()
            && self.publisher_public_key_locator.is_none()
            && self.exclude.is_empty()
            && self.child_selector.is_none()
            && !self.must_be_fresh
    }

    fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut selectors = Selectors::default();
        for tlv in TlvReader::new(val) {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_MIN_SUFFIX_COMPONENTS => {
                    selectors.min_suffix_components = Some(integer(&tlv, "MinSuffixComponents")?)
                }
                TLV_TYPE_MAX_SUFFIX_COMPONENTS => {
                    selectors.max_suffix_components = Some(integer(&tlv, "MaxSuffixComponents")?)
                }
                TLV_TYPE_PUBLISHER_PUBLIC_KEY_LOCATOR => {
                    selectors.publisher_public_key_locator =
                        Some(KeyLocator::from_tlv_value(tlv.val)?)
                }
                TLV_TYPE_EXCLUDE => selectors.exclude = Exclude::from_tlv_value(tlv.val)?,
                TLV_TYPE_CHILD_SELECTOR => {
                    selectors.child_selector = Some(integer(&tlv, "ChildSelector")?)
                }
                TLV_TYPE_MUST_BE_FRESH => selectors.must_be_fresh = true,
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(selectors)
    }
}

impl TlvEncode for Selectors {
    const TLV_TYPE: u32 = TLV_TYPE_SELECTORS;

    fn inner_length(&self) -> usize {
        let mut len = 0;
        if let Some(val) = self.min_suffix_components {
            len += TypedInteger::<TLV_TYPE_MIN_SUFFIX_COMPONENTS> { val }.encoded_length();
        }
        if let Some(val) = self.max_suffix_components {
            len += TypedInteger::<TLV_TYPE_MAX_SUFFIX_COMPONENTS> { val }.encoded_length();
        }
        if let Some(locator) = &self.publisher_public_key_locator {
            len += tlv_length(TLV_TYPE_PUBLISHER_PUBLIC_KEY_LOCATOR, locator.inner_length());
        }
        if !self.exclude.is_empty() {
            len += self.exclude.encoded_length();
        }
        if let Some(val) = self.child_selector {
            len += TypedInteger::<TLV_TYPE_CHILD_SELECTOR> { val }.encoded_length();
        }
        if self.must_be_fresh {
            len += TypedEmpty::<TLV_TYPE_MUST_BE_FRESH>.encoded_length();
        }
        len
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        if let Some(val) = self.min_suffix_components {
            TypedInteger::<TLV_TYPE_MIN_SUFFIX_COMPONENTS> { val }.encode(writer)?;
        }
        if let Some(val) = self.max_suffix_components {
            TypedInteger::<TLV_TYPE_MAX_SUFFIX_COMPONENTS> { val }.encode(writer)?;
        }
        if let Some(locator) = &self.publisher_public_key_locator {
            write_varint(writer, TLV_TYPE_PUBLISHER_PUBLIC_KEY_LOCATOR as u64)?;
            write_varint(writer, locator.inner_length() as u64)?;
            locator.encode_inner(writer)?;
        }
        if !self.exclude.is_empty() {
            self.exclude.encode(writer)?;
        }
        if let Some(val) = self.child_selector {
            TypedInteger::<TLV_TYPE_CHILD_SELECTOR> { val }.encode(writer)?;
        }
        if self.must_be_fresh {
            TypedEmpty::<TLV_TYPE_MUST_BE_FRESH>.encode(writer)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interest {
    pub name: Name,
    pub selectors: Selectors,
    pub nonce: Option<[u8; 4]>,
    pub interest_lifetime_ms: Option<u64>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn with_lifetime_ms(mut self, lifetime_ms: u64) -> Self {
        self.interest_lifetime_ms = Some(lifetime_ms);
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.selectors.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_nonce(mut self, nonce: [u8; 4]) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Checks the name and the selectors that only look at names.
    pub fn matches_name(&self, name: &Name) -> bool {
        if !self.name.is_prefix_of(name) {
            return false;
        }

        // The implicit digest counts as one more component
        let suffix_components = (name.len() + 1 - self.name.len()) as u64;
        if let Some(min) = self.selectors.min_suffix_components {
            if suffix_components < min {
                return false;
            }
        }
        if let Some(max) = self.selectors.max_suffix_components {
            if suffix_components > max {
                return false;
            }
        }

        if !self.selectors.exclude.is_empty() {
            if let Some(next) = name.get(self.name.len()) {
                if self.selectors.exclude.matches(next) {
                    return false;
                }
            }
        }
        true
    }

    /// A Data arriving now satisfies this Interest.
    ///
    /// With MustBeFresh the Data needs a positive freshness period, an
    /// absent one counting as zero. The publisher key locator is not
    /// checked.
    pub fn matches_data(&self, data: &Data) -> bool {
        if !self.matches_name(&data.name) {
            return false;
        }
        if self.selectors.must_be_fresh && data.meta_info.freshness_period_ms.unwrap_or(0) == 0 {
            return false;
        }
        true
    }

    pub fn wire_encode(&self) -> Result<Vec<u8>, EncodingError> {
        self.wire_encode_with_limit(MAX_PACKET_SIZE)
    }

    pub fn wire_encode_with_limit(&self, limit: usize) -> Result<Vec<u8>, EncodingError> {
        check_size(self.encoded_length(), limit)?;
        Ok(to_vec(self))
    }

    fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut reader = TlvReader::new(val);
        let name = reader.read_expected(TLV_TYPE_NAME)?;
        let mut interest = Interest::new(Name::from_tlv_value(name.val)?);

        for tlv in reader {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_SELECTORS => interest.selectors = Selectors::from_tlv_value(tlv.val)?,
                TLV_TYPE_NONCE => {
                    let nonce: [u8; 4] = tlv
                        .val
                        .try_into()
                        .map_err(|_| DecodingError::Malformed("Nonce"))?;
                    interest.nonce = Some(nonce);
                }
                TLV_TYPE_INTEREST_LIFETIME => {
                    interest.interest_lifetime_ms = Some(integer(&tlv, "InterestLifetime")?)
                }
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(interest)
    }
}

impl TlvEncode for Interest {
    const TLV_TYPE: u32 = TLV_TYPE_INTEREST;

    fn inner_length(&self) -> usize {
        let mut len = self.name.encoded_length();
        if !self.selectors.is_empty() {
            len += self.selectors.encoded_length();
        }
        if let Some(nonce) = &self.nonce {
            len += TypedBytes::<TLV_TYPE_NONCE> { bytes: nonce }.encoded_length();
        }
        if let Some(val) = self.interest_lifetime_ms {
            len += TypedInteger::<TLV_TYPE_INTEREST_LIFETIME> { val }.encoded_length();
        }
        len
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        self.name.encode(writer)?;
        if !self.selectors.is_empty() {
            self.selectors.encode(writer)?;
        }
        if let Some(nonce) = &self.nonce {
            TypedBytes::<TLV_TYPE_NONCE> { bytes: nonce }.encode(writer)?;
        }
        if let Some(val) = self.interest_lifetime_ms {
            TypedInteger::<TLV_TYPE_INTEREST_LIFETIME> { val }.encode(writer)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Blob,
    Link,
    Key,
    Nack,
    Other(u64),
}

impl From<u64> for ContentType {
    fn from(value: u64) -> Self {
        match value {
            0 => ContentType::Blob,
            1 => ContentType::Link,
            2 => ContentType::Key,
            3 => ContentType::Nack,
            v => ContentType::Other(v),
        }
    }
}

impl From<ContentType> for u64 {
    fn from(value: ContentType) -> Self {
        match value {
            ContentType::Blob => 0,
            ContentType::Link => 1,
            ContentType::Key => 2,
            ContentType::Nack => 3,
            ContentType::Other(v) => v,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetaInfo {
    pub content_type: ContentType,
    pub freshness_period_ms: Option<u64>,
    pub final_block_id: Option<NameComponent>,
}

impl MetaInfo {
    fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut meta_info = MetaInfo::default();
        for tlv in TlvReader::new(val) {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_CONTENT_TYPE => {
                    meta_info.content_type = integer(&tlv, "ContentType")?.into()
                }
                TLV_TYPE_FRESHNESS_PERIOD => {
                    meta_info.freshness_period_ms = Some(integer(&tlv, "FreshnessPeriod")?)
                }
                TLV_TYPE_FINAL_BLOCK_ID => {
                    let (component, _) = TLV::try_decode(tlv.val)?;
                    meta_info.final_block_id = Some(NameComponent::from_tlv(&component)?);
                }
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(meta_info)
    }
}

impl TlvEncode for MetaInfo {
    const TLV_TYPE: u32 = TLV_TYPE_META_INFO;

    fn inner_length(&self) -> usize {
        let mut len = 0;
        if self.content_type != ContentType::Blob {
            len += TypedInteger::<TLV_TYPE_CONTENT_TYPE> {
                val: self.content_type.into(),
            }
            .encoded_length();
        }
        if let Some(val) = self.freshness_period_ms {
            len += TypedInteger::<TLV_TYPE_FRESHNESS_PERIOD> { val }.encoded_length();
        }
        if let Some(component) = &self.final_block_id {
            len += tlv_length(TLV_TYPE_FINAL_BLOCK_ID, component.encoded_length());
        }
        len
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        if self.content_type != ContentType::Blob {
            TypedInteger::<TLV_TYPE_CONTENT_TYPE> {
                val: self.content_type.into(),
            }
            .encode(writer)?;
        }
        if let Some(val) = self.freshness_period_ms {
            TypedInteger::<TLV_TYPE_FRESHNESS_PERIOD> { val }.encode(writer)?;
        }
        if let Some(component) = &self.final_block_id {
            write_varint(writer, TLV_TYPE_FINAL_BLOCK_ID as u64)?;
            write_varint(writer, component.encoded_length() as u64)?;
            component.encode(writer)?;
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SignatureType {
    #[default]
    DigestSha256,
    Sha256WithRsa,
    Sha256WithEcdsa,
    HmacWithSha256,
    Other(u64),
}

impl From<u64> for SignatureType {
    fn from(value: u64) -> Self {
        match value {
            0 => SignatureType::DigestSha256,
            1 => SignatureType::Sha256WithRsa,
            3 => SignatureType::Sha256WithEcdsa,
            4 => SignatureType::HmacWithSha256,
            v => SignatureType::Other(v),
        }
    }
}

impl From<SignatureType> for u64 {
    fn from(value: SignatureType) -> Self {
        match value {
            SignatureType::DigestSha256 => 0,
            SignatureType::Sha256WithRsa => 1,
            SignatureType::Sha256WithEcdsa => 3,
            SignatureType::HmacWithSha256 => 4,
            SignatureType::Other(v) => v,
        }
    }
}

/// SignatureInfo plus SignatureValue of a Data packet or command Interest.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub signature_type: SignatureType,
    key_locator: ChangeCounter<KeyLocator>,
    bits: Blob,
    changes: u64,
}

impl Signature {
    pub fn new(signature_type: SignatureType, key_locator: KeyLocator) -> Self {
        Self {
            signature_type,
            key_locator: ChangeCounter::new(key_locator),
            bits: Blob::null(),
            changes: 0,
        }
    }

    pub fn key_locator(&self) -> &KeyLocator {
        self.key_locator.get()
    }

    pub fn key_locator_mut(&mut self) -> &mut KeyLocator {
        self.key_locator.get_mut()
    }

    pub fn set_key_locator(&mut self, key_locator: KeyLocator) {
        self.key_locator.set(key_locator);
        self.changes += 1;
    }

    pub fn bits(&self) -> &Blob {
        &self.bits
    }

    pub fn set_bits(&mut self, bits: Blob) {
        self.bits = bits;
        self.changes += 1;
    }

    pub(crate) fn info(&self) -> SignatureInfo<'_> {
        SignatureInfo { signature: self }
    }

    pub(crate) fn value(&self) -> TypedBytes<'_, TLV_TYPE_SIGNATURE_VALUE> {
        TypedBytes {
            bytes: self.bits.as_slice(),
        }
    }

    pub(crate) fn from_info_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut reader = TlvReader::new(val);
        let typ = reader.read_expected(TLV_TYPE_SIGNATURE_TYPE)?;
        let mut signature = Signature::new(
            integer(&typ, "SignatureType")?.into(),
            KeyLocator::new(),
        );
        for tlv in reader {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_KEY_LOCATOR => {
                    signature
                        .key_locator
                        .set(KeyLocator::from_tlv_value(tlv.val)?);
                }
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(signature)
    }
}

impl ChangeCount for Signature {
    fn change_count(&mut self) -> u64 {
        if self.key_locator.check_changed() {
            self.changes += 1;
        }
        self.changes
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.signature_type == other.signature_type
            && self.key_locator() == other.key_locator()
            && self.bits == other.bits
    }
}

pub(crate) struct SignatureInfo<'a> {
    signature: &'a Signature,
}

impl<'a> TlvEncode for SignatureInfo<'a> {
    const TLV_TYPE: u32 = TLV_TYPE_SIGNATURE_INFO;

    fn inner_length(&self) -> usize {
        let mut len = TypedInteger::<TLV_TYPE_SIGNATURE_TYPE> {
            val: self.signature.signature_type.into(),
        }
        .encoded_length();
        if self.signature.key_locator().get_type() != KeyLocatorType::None {
            len += self.signature.key_locator().encoded_length();
        }
        len
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        TypedInteger::<TLV_TYPE_SIGNATURE_TYPE> {
            val: self.signature.signature_type.into(),
        }
        .encode(writer)?;
        if self.signature.key_locator().get_type() != KeyLocatorType::None {
            self.signature.key_locator().encode(writer)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Data {
    pub name: Name,
    pub meta_info: MetaInfo,
    pub content: Blob,
    pub signature: Signature,
}

impl Data {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Blob>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_freshness_period_ms(mut self, freshness_period_ms: u64) -> Self {
        self.meta_info.freshness_period_ms = Some(freshness_period_ms);
        self
    }

    /// The bytes a signature covers: everything from the Name through SignatureInfo.
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.signed_portion_length());
        match self.encode_signed_portion(&mut buffer) {
            Ok(()) => buffer,
            Err(never) => match never {},
        }
    }

    fn signed_portion_length(&self) -> usize {
        self.name.encoded_length()
            + self.meta_info.encoded_length()
            + TypedBytes::<TLV_TYPE_CONTENT> {
                bytes: self.content.as_slice(),
            }
            .encoded_length()
            + self.signature.info().encoded_length()
    }

    fn encode_signed_portion<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        self.name.encode(writer)?;
        self.meta_info.encode(writer)?;
        TypedBytes::<TLV_TYPE_CONTENT> {
            bytes: self.content.as_slice(),
        }
        .encode(writer)?;
        self.signature.info().encode(writer)
    }

    pub fn wire_encode(&self) -> Result<Vec<u8>, EncodingError> {
        self.wire_encode_with_limit(MAX_PACKET_SIZE)
    }

    pub fn wire_encode_with_limit(&self, limit: usize) -> Result<Vec<u8>, EncodingError> {
        check_size(self.encoded_length(), limit)?;
        Ok(to_vec(self))
    }

    fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut reader = TlvReader::new(val);
        let name = reader.read_expected(TLV_TYPE_NAME)?;
        let mut data = Data::new(Name::from_tlv_value(name.val)?);
        let mut has_signature_info = false;

        for tlv in reader {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_META_INFO => data.meta_info = MetaInfo::from_tlv_value(tlv.val)?,
                TLV_TYPE_CONTENT => data.content = Blob::new(tlv.val),
                TLV_TYPE_SIGNATURE_INFO => {
                    let bits = data.signature.bits.clone();
                    data.signature = Signature::from_info_value(tlv.val)?;
                    data.signature.bits = bits;
                    has_signature_info = true;
                }
                TLV_TYPE_SIGNATURE_VALUE => data.signature.bits = Blob::new(tlv.val),
                _ => skip_unknown(&tlv)?,
            }
        }

        if !has_signature_info {
            return Err(DecodingError::Malformed("Data without SignatureInfo"));
        }
        Ok(data)
    }
}

impl TlvEncode for Data {
    const TLV_TYPE: u32 = TLV_TYPE_DATA;

    fn inner_length(&self) -> usize {
        self.signed_portion_length() + self.signature.value().encoded_length()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        self.encode_signed_portion(writer)?;
        self.signature.value().encode(writer)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    Interest(Interest),
    Data(Data),
    /// A well-formed TLV of some other type, such as link-layer traffic.
    Unrecognized(u32),
}

impl Packet {
    /// Decodes exactly one top-level packet occupying all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Packet, DecodingError> {
        let (tlv, len) = TLV::try_decode(bytes)?;
        if len != bytes.len() {
            return Err(DecodingError::Malformed("trailing bytes after packet"));
        }
        match tlv.typ.get() {
            TLV_TYPE_INTEREST => Ok(Packet::Interest(Interest::from_tlv_value(tlv.val)?)),
            TLV_TYPE_DATA => Ok(Packet::Data(Data::from_tlv_value(tlv.val)?)),
            other => Ok(Packet::Unrecognized(other)),
        }
    }
}

use core::num::NonZeroU32;

use crate::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodingError {
    #[error("buffer too short to hold a TLV header")]
    BufferTooShort,
    #[error("TLV {typ} declares {len} value bytes but the buffer is shorter")]
    TruncatedValue { typ: u32, len: usize },
    #[error("non-minimal variable-length number")]
    NonMinimalVarint,
    #[error("invalid TLV type")]
    InvalidType,
    #[error("expected TLV type {expected}, found {found}")]
    UnexpectedType { expected: u32, found: u32 },
    #[error("unknown critical TLV type {0}")]
    CriticalUnknownType(u32),
    #[error("malformed {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("encoded packet is {size} bytes, the limit is {limit}")]
    PacketTooLarge { size: usize, limit: usize },
}

#[derive(Copy, Clone, Debug)]
pub struct TLV<'a> {
    pub typ: NonZeroU32,
    pub val: &'a [u8],
}

impl<'a> TLV<'a> {
    // This matters when the evolution of the protocol requires adding new types.
    // When an unknown type is critical we must signal error, otherwise we can ignore it.
    pub fn type_is_critical(&self) -> bool {
        let typ = self.typ.get();
        typ < 32 || typ & 1 == 1
    }

    pub fn val_as_u64(&self) -> Option<u64> {
        match self.val.len() {
            1 => Some(self.val[0] as u64),
            2 => Some(u16::from_be_bytes(self.val.try_into().ok()?) as u64),
            4 => Some(u32::from_be_bytes(self.val.try_into().ok()?) as u64),
            8 => Some(u64::from_be_bytes(self.val.try_into().ok()?)),
            _ => None,
        }
    }

    pub fn try_decode(bytes: &'a [u8]) -> Result<(TLV<'a>, usize), DecodingError> {
        let mut cursor = 0;
        let typ: u32 = parse_varint(bytes, &mut cursor)?
            .try_into()
            .map_err(|_| DecodingError::InvalidType)?;
        let typ = NonZeroU32::new(typ).ok_or(DecodingError::InvalidType)?;

        let len: usize = parse_varint(bytes, &mut cursor)?
            .try_into()
            .map_err(|_| DecodingError::TruncatedValue {
                typ: typ.get(),
                len: usize::MAX,
            })?;

        if bytes.len() - cursor < len {
            return Err(DecodingError::TruncatedValue {
                typ: typ.get(),
                len,
            });
        }

        let val = &bytes[cursor..(cursor + len)];
        Ok((TLV { typ, val }, cursor + len))
    }
}

fn parse_varint(bytes: &[u8], cursor: &mut usize) -> Result<u64, DecodingError> {
    let first = *bytes.get(*cursor).ok_or(DecodingError::BufferTooShort)?;
    *cursor += 1;

    let width = match first {
        0..=252 => return Ok(first as u64),
        253 => 2,
        254 => 4,
        255 => 8,
    };

    let next = bytes
        .get(*cursor..(*cursor + width))
        .ok_or(DecodingError::BufferTooShort)?;
    *cursor += width;

    let (val, minimum) = match width {
        2 => (u16::from_be_bytes([next[0], next[1]]) as u64, 253),
        4 => (
            u32::from_be_bytes([next[0], next[1], next[2], next[3]]) as u64,
            65536,
        ),
        _ => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(next);
            (u64::from_be_bytes(arr), 4294967296)
        }
    };

    if val < minimum {
        return Err(DecodingError::NonMinimalVarint);
    }
    Ok(val)
}

pub fn varint_length(val: u64) -> usize {
    if val <= 252 {
        1
    } else if val <= 65535 {
        3
    } else if val <= 4294967295 {
        5
    } else {
        9
    }
}

pub fn write_varint<W: Write + ?Sized>(writer: &mut W, val: u64) -> Result<(), W::Error> {
    if val <= 252 {
        writer.write(&[val as u8])
    } else if val <= 65535 {
        writer.write(&[253])?;
        writer.write(&(val as u16).to_be_bytes())
    } else if val <= 4294967295 {
        writer.write(&[254])?;
        writer.write(&(val as u32).to_be_bytes())
    } else {
        writer.write(&[255])?;
        writer.write(&val.to_be_bytes())
    }
}

// NonNegativeInteger values always use the shortest of 1, 2, 4 or 8 bytes.
pub fn non_negative_length(val: u64) -> usize {
    if val <= u8::MAX as u64 {
        1
    } else if val <= u16::MAX as u64 {
        2
    } else if val <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

pub fn write_non_negative<W: Write + ?Sized>(writer: &mut W, val: u64) -> Result<(), W::Error> {
    match non_negative_length(val) {
        1 => writer.write(&[val as u8]),
        2 => writer.write(&(val as u16).to_be_bytes()),
        4 => writer.write(&(val as u32).to_be_bytes()),
        _ => writer.write(&val.to_be_bytes()),
    }
}

pub fn tlv_length(typ: u32, inner_length: usize) -> usize {
    varint_length(typ as u64) + varint_length(inner_length as u64) + inner_length
}

pub fn write_tlv<W: Write + ?Sized>(writer: &mut W, typ: u32, val: &[u8]) -> Result<(), W::Error> {
    write_varint(writer, typ as u64)?;
    write_varint(writer, val.len() as u64)?;
    writer.write(val)
}

pub trait TlvEncode {
    const TLV_TYPE: u32;

    fn inner_length(&self) -> usize;

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error>;

    fn encoded_length(&self) -> usize {
        tlv_length(Self::TLV_TYPE, self.inner_length())
    }

    fn encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        write_varint(writer, Self::TLV_TYPE as u64)?;
        write_varint(writer, self.inner_length() as u64)?;
        self.encode_inner(writer)
    }
}

pub(crate) fn to_vec<T: TlvEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(value.encoded_length());
    match value.encode(&mut buffer) {
        Ok(()) => buffer,
        Err(never) => match never {},
    }
}

#[cfg(test)]
pub(crate) fn inner_to_vec<T: TlvEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(value.inner_length());
    let result: Result<(), core::convert::Infallible> = value.encode_inner(&mut buffer);
    match result {
        Ok(()) => buffer,
        Err(never) => match never {},
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TypedInteger<const TYPE: u32> {
    pub val: u64,
}

impl<const TYPE: u32> TlvEncode for TypedInteger<TYPE> {
    const TLV_TYPE: u32 = TYPE;

    fn inner_length(&self) -> usize {
        non_negative_length(self.val)
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        write_non_negative(writer, self.val)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TypedBytes<'a, const TYPE: u32> {
    pub bytes: &'a [u8],
}

impl<'a, const TYPE: u32> TlvEncode for TypedBytes<'a, TYPE> {
    const TLV_TYPE: u32 = TYPE;

    fn inner_length(&self) -> usize {
        self.bytes.len()
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        writer.write(self.bytes)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct TypedEmpty<const TYPE: u32>;

impl<const TYPE: u32> TlvEncode for TypedEmpty<TYPE> {
    const TLV_TYPE: u32 = TYPE;

    fn inner_length(&self) -> usize {
        0
    }

    fn encode_inner<W: Write + ?Sized>(&self, _writer: &mut W) -> Result<(), W::Error> {
        Ok(())
    }
}

// Walks a sequence of TLVs inside some parent value.
pub(crate) struct TlvReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    pub fn read(&mut self) -> Result<TLV<'a>, DecodingError> {
        let (tlv, len) = TLV::try_decode(&self.bytes[self.offset..])?;
        self.offset += len;
        Ok(tlv)
    }

    pub fn read_expected(&mut self, expected: u32) -> Result<TLV<'a>, DecodingError> {
        let tlv = self.read()?;
        if tlv.typ.get() != expected {
            return Err(DecodingError::UnexpectedType {
                expected,
                found: tlv.typ.get(),
            });
        }
        Ok(tlv)
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<TLV<'a>, DecodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let item = self.read();
        if item.is_err() {
            // Nothing after a broken element can be trusted
            self.offset = self.bytes.len();
        }
        Some(item)
    }
}

// Rejects unknown critical elements, otherwise lets the caller ignore them.
pub(crate) fn skip_unknown(tlv: &TLV<'_>) -> Result<(), DecodingError> {
    if tlv.type_is_critical() {
        Err(DecodingError::CriticalUnknownType(tlv.typ.get()))
    } else {
        Ok(())
    }
}

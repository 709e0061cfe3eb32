use crate::{
    io::Write,
    name::{Name, TLV_TYPE_NAME},
    tlv::{
        non_negative_length, skip_unknown, tlv_length, write_non_negative, write_varint,
        to_vec, DecodingError, TlvEncode, TlvReader, TypedBytes, TypedInteger, TLV,
    },
};

pub const TLV_TYPE_CONTROL_RESPONSE: u32 = 101;
pub const TLV_TYPE_CONTROL_PARAMETERS: u32 = 104;

const TLV_TYPE_STATUS_CODE: u32 = 102;
const TLV_TYPE_STATUS_TEXT: u32 = 103;
const TLV_TYPE_FACE_ID: u32 = 105;
const TLV_TYPE_COST: u32 = 106;
const TLV_TYPE_FLAGS: u32 = 108;
const TLV_TYPE_EXPIRATION_PERIOD: u32 = 109;
const TLV_TYPE_ORIGIN: u32 = 111;

pub const STATUS_OK: u64 = 200;

/// Route flags carried by a registration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ForwardingFlags {
    pub child_inherit: bool,
    pub capture: bool,
}

impl Default for ForwardingFlags {
    fn default() -> Self {
        Self {
            child_inherit: true,
            capture: false,
        }
    }
}

impl ForwardingFlags {
    const CHILD_INHERIT: u64 = 1;
    const CAPTURE: u64 = 2;

    pub fn bits(&self) -> u64 {
        let mut bits = 0;
        if self.child_inherit {
            bits |= Self::CHILD_INHERIT;
        }
        if self.capture {
            bits |= Self::CAPTURE;
        }
        bits
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            child_inherit: bits & Self::CHILD_INHERIT != 0,
            capture: bits & Self::CAPTURE != 0,
        }
    }
}

/// The routing-information-base verbs a forwarder understands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RibCommand {
    Register,
    Unregister,
}

impl RibCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            RibCommand::Register => "register",
            RibCommand::Unregister => "unregister",
        }
    }

    pub fn from_verb(verb: &[u8]) -> Option<Self> {
        match verb {
            b"register" => Some(RibCommand::Register),
            b"unregister" => Some(RibCommand::Unregister),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlParameters {
    pub name: Option<Name>,
    pub face_id: Option<u64>,
    pub origin: Option<u64>,
    pub cost: Option<u64>,
    pub flags: Option<u64>,
    pub expiration_period_ms: Option<u64>,
}

impl ControlParameters {
    pub fn for_prefix(prefix: &Name, flags: ForwardingFlags) -> Self {
        Self {
            name: Some(prefix.clone()),
            flags: Some(flags.bits()),
            ..Default::default()
        }
    }

    /// Decodes a complete ControlParameters TLV, as found in a command name component.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodingError> {
        let (tlv, len) = TLV::try_decode(bytes)?;
        if tlv.typ.get() != TLV_TYPE_CONTROL_PARAMETERS {
            return Err(DecodingError::UnexpectedType {
                expected: TLV_TYPE_CONTROL_PARAMETERS,
                found: tlv.typ.get(),
            });
        }
        if len != bytes.len() {
            return Err(DecodingError::Malformed("trailing bytes after ControlParameters"));
        }
        Self::from_tlv_value(tlv.val)
    }

    fn from_tlv_value(val: &[u8]) -> Result<Self, DecodingError> {
        let mut parameters = ControlParameters::default();
        for tlv in TlvReader::new(val) {
            let tlv = tlv?;
            let number = || tlv.val_as_u64().ok_or(DecodingError::Malformed("ControlParameters"));
            match tlv.typ.get() {
                TLV_TYPE_NAME => parameters.name = Some(Name::from_tlv_value(tlv.val)?),
                TLV_TYPE_FACE_ID => parameters.face_id = Some(number()?),
                TLV_TYPE_ORIGIN => parameters.origin = Some(number()?),
                TLV_TYPE_COST => parameters.cost = Some(number()?),
                TLV_TYPE_FLAGS => parameters.flags = Some(number()?),
                TLV_TYPE_EXPIRATION_PERIOD => parameters.expiration_period_ms = Some(number()?),
                _ => skip_unknown(&tlv)?,
            }
        }
        Ok(parameters)
    }

    fn integers(&self) -> [(u32, Option<u64>); 5] {
        [
            (TLV_TYPE_FACE_ID, self.face_id),
            (TLV_TYPE_ORIGIN, self.origin),
            (TLV_TYPE_COST, self.cost),
            (TLV_TYPE_FLAGS, self.flags),
            (TLV_TYPE_EXPIRATION_PERIOD, self.expiration_period_ms),
        ]
    }
}

fn integer_length(typ: u32, val: u64) -> usize {
    tlv_length(typ, non_negative_length(val))
}

impl TlvEncode for ControlParameters {
    const TLV_TYPE: u32 = TLV_TYPE_CONTROL_PARAMETERS;

    fn inner_length(&self) -> usize {
        let name = self.name.as_ref().map_or(0, |n| n.encoded_length());
        let integers: usize = self
            .integers()
            .iter()
            .filter_map(|(typ, val)| val.map(|v| integer_length(*typ, v)))
            .sum();
        name + integers
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        if let Some(name) = &self.name {
            name.encode(writer)?;
        }
        for (typ, val) in self.integers() {
            if let Some(val) = val {
                write_varint(writer, typ as u64)?;
                write_varint(writer, non_negative_length(val) as u64)?;
                write_non_negative(writer, val)?;
            }
        }
        Ok(())
    }
}

/// A forwarder's answer to a control command.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlResponse {
    pub status_code: u64,
    pub status_text: String,
    pub body: Option<ControlParameters>,
}

impl ControlResponse {
    pub fn new(status_code: u64, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    pub fn wire_encode(&self) -> Vec<u8> {
        to_vec(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodingError> {
        let (tlv, _) = TLV::try_decode(bytes)?;
        if tlv.typ.get() != TLV_TYPE_CONTROL_RESPONSE {
            return Err(DecodingError::UnexpectedType {
                expected: TLV_TYPE_CONTROL_RESPONSE,
                found: tlv.typ.get(),
            });
        }

        let mut reader = TlvReader::new(tlv.val);
        let code = reader.read_expected(TLV_TYPE_STATUS_CODE)?;
        let status_code = code
            .val_as_u64()
            .ok_or(DecodingError::Malformed("StatusCode"))?;
        let text = reader.read_expected(TLV_TYPE_STATUS_TEXT)?;
        let status_text = String::from_utf8_lossy(text.val).into_owned();

        let mut body = None;
        for tlv in reader {
            let tlv = tlv?;
            match tlv.typ.get() {
                TLV_TYPE_CONTROL_PARAMETERS => {
                    body = Some(ControlParameters::from_tlv_value(tlv.val)?)
                }
                _ => skip_unknown(&tlv)?,
            }
        }

        Ok(Self {
            status_code,
            status_text,
            body,
        })
    }
}

impl TlvEncode for ControlResponse {
    const TLV_TYPE: u32 = TLV_TYPE_CONTROL_RESPONSE;

    fn inner_length(&self) -> usize {
        TypedInteger::<TLV_TYPE_STATUS_CODE> {
            val: self.status_code,
        }
        .encoded_length()
            + TypedBytes::<TLV_TYPE_STATUS_TEXT> {
                bytes: self.status_text.as_bytes(),
            }
            .encoded_length()
            + self.body.as_ref().map_or(0, |b| b.encoded_length())
    }

    fn encode_inner<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), W::Error> {
        TypedInteger::<TLV_TYPE_STATUS_CODE> {
            val: self.status_code,
        }
        .encode(writer)?;
        TypedBytes::<TLV_TYPE_STATUS_TEXT> {
            bytes: self.status_text.as_bytes(),
        }
        .encode(writer)?;
        if let Some(body) = &self.body {
            body.encode(writer)?;
        }
        Ok(())
    }
}

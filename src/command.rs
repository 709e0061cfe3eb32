use crate::{
    clock::Timestamp,
    control::{ControlParameters, RibCommand},
    hash::Sha256Hasher,
    key_locator::{KeyLocator, KeyLocatorType},
    name::{Name, NameComponent},
    packet::{Interest, Signature, SignatureType},
    security::{SecurityError, Signer},
    tlv::{to_vec, TLV},
};

const TLV_TYPE_SIGNATURE_VALUE: u32 = 23;

// Components a signed command adds after the command name itself:
// timestamp, random value, SignatureInfo, SignatureValue.
pub const COMMAND_SUFFIX_COMPONENTS: usize = 4;

/// The name `<prefix>/rib/<verb>/<ControlParameters>` of an unsigned command.
pub fn make_command_name(
    command_prefix: &Name,
    command: RibCommand,
    parameters: &ControlParameters,
) -> Name {
    let mut name = command_prefix.clone();
    name.append_bytes("rib")
        .append_bytes(command.verb())
        .append_bytes(to_vec(parameters));
    name
}

/// Turns Interests into signed command Interests whose timestamps
/// strictly increase, even when the clock stalls or goes back.
#[derive(Debug, Default)]
pub struct CommandInterestGenerator {
    last_timestamp_ms: Option<u64>,
}

impl CommandInterestGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_timestamp_ms(&self) -> Option<u64> {
        self.last_timestamp_ms
    }

    fn next_timestamp_ms(&mut self, now: Timestamp) -> u64 {
        let timestamp = match self.last_timestamp_ms {
            Some(last) => now.ms_since_1970.max(last.saturating_add(1)),
            None => now.ms_since_1970,
        };
        self.last_timestamp_ms = Some(timestamp);
        timestamp
    }

    /// Appends timestamp, random value and signature components to the name.
    ///
    /// A signer without a key locator of its own is announced by
    /// `certificate_name`, when that is not empty.
    pub fn generate(
        &mut self,
        interest: &mut Interest,
        now: Timestamp,
        signer: &dyn Signer,
        certificate_name: &Name,
    ) -> Result<(), SecurityError> {
        let timestamp = self.next_timestamp_ms(now);

        let mut key_locator = signer.key_locator();
        if key_locator.get_type() == KeyLocatorType::None
            && signer.signature_type() != SignatureType::DigestSha256
            && !certificate_name.is_empty()
        {
            key_locator = KeyLocator::with_key_name(certificate_name.clone());
        }
        let mut signature = Signature::new(signer.signature_type(), key_locator);

        let name = &mut interest.name;
        name.append_number(timestamp)
            .append_bytes(rand::random::<[u8; 8]>().to_vec())
            .append_bytes(to_vec(&signature.info()));

        let bits = signer.sign(&signed_portion(name))?;
        signature.set_bits(bits);
        name.append_bytes(to_vec(&signature.value()));
        Ok(())
    }
}

// Every component of the name encoded back to back, outer Name TLV excluded.
fn signed_portion(name: &Name) -> Vec<u8> {
    let mut bytes = Vec::new();
    for component in name.components() {
        match component.encode(&mut bytes) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
    bytes
}

/// The pieces of a signed command name, split the way it was built.
pub struct SignedCommand<'a> {
    pub command: Name,
    pub timestamp_ms: u64,
    pub signature_info: &'a NameComponent,
    pub signature_value: &'a [u8],
    signed_portion: Vec<u8>,
}

impl<'a> SignedCommand<'a> {
    pub fn parse(name: &'a Name) -> Option<Self> {
        let count = name.len();
        if count < COMMAND_SUFFIX_COMPONENTS {
            return None;
        }
        let timestamp_ms = name.get(count - 4)?.to_number()?;
        let signature_info = name.get(count - 2)?;
        let value_bytes = name.get(count - 1)?.as_bytes();
        let (value, len) = TLV::try_decode(value_bytes).ok()?;
        if value.typ.get() != TLV_TYPE_SIGNATURE_VALUE || len != value_bytes.len() {
            return None;
        }
        Some(Self {
            command: name.get_prefix(count - COMMAND_SUFFIX_COMPONENTS),
            timestamp_ms,
            signature_info,
            signature_value: value.val,
            signed_portion: signed_portion(&name.get_prefix(count - 1)),
        })
    }

    pub fn verify_sha256_digest(&self) -> bool {
        let expected = Sha256Hasher::digest(&self.signed_portion);
        let info = to_vec(&Signature::new(SignatureType::DigestSha256, KeyLocator::new()).info());
        self.signature_info.as_bytes() == info.as_slice() && self.signature_value == expected.0.as_slice()
    }
}

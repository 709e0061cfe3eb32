use crate::{
    blob::Blob,
    hash::Sha256Hasher,
    key_locator::KeyLocator,
    packet::{Data, Signature, SignatureType},
};

use super::SecurityError;

pub trait Signer {
    fn signature_type(&self) -> SignatureType;

    fn key_locator(&self) -> KeyLocator;

    fn sign(&self, bytes: &[u8]) -> Result<Blob, SecurityError>;
}

/// Signs with a bare SHA-256 digest of the signed portion. Anyone can
/// produce it, so it only protects against corruption.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sha256DigestSigner;

impl Signer for Sha256DigestSigner {
    fn signature_type(&self) -> SignatureType {
        SignatureType::DigestSha256
    }

    fn key_locator(&self) -> KeyLocator {
        KeyLocator::new()
    }

    fn sign(&self, bytes: &[u8]) -> Result<Blob, SecurityError> {
        Ok(Blob::new(Sha256Hasher::digest(bytes).0))
    }
}

pub fn sign_data(data: &mut Data, signer: &dyn Signer) -> Result<(), SecurityError> {
    data.signature = Signature::new(signer.signature_type(), signer.key_locator());
    let bits = signer.sign(&data.signed_portion())?;
    data.signature.set_bits(bits);
    Ok(())
}

/// Recomputes a DigestSha256 signature over the Data's signed portion.
pub fn verify_sha256_digest(data: &Data) -> Result<bool, SecurityError> {
    match data.signature.signature_type {
        SignatureType::DigestSha256 => {
            let expected = Sha256Hasher::digest(&data.signed_portion());
            Ok(data.signature.bits().as_slice() == expected.0.as_slice())
        }
        other => Err(SecurityError::UnsupportedSignatureType(other.into())),
    }
}

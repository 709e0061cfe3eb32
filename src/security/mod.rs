mod policy;
mod signer;

pub use policy::*;
pub use signer::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    #[error("unsupported signature type {0}")]
    UnsupportedSignatureType(u64),
    #[error("signing policy does not allow {certificate} to sign {name}")]
    SigningPolicy { name: String, certificate: String },
}

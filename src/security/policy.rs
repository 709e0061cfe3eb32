use tracing::debug;

use crate::{
    face::{Face, OnVerified, OnVerifyFailed},
    name::Name,
    packet::{Data, Interest},
};

use super::verify_sha256_digest;

/// The next certificate a policy wants fetched before it can decide.
///
/// The face expresses `interest`; the Data it brings back is verified at
/// `step_count` with these callbacks. After `retry` timeouts the callback
/// `on_verify_failed` receives the Data that started the chain.
pub struct ValidationRequest {
    pub interest: Interest,
    pub on_verified: OnVerified,
    pub on_verify_failed: OnVerifyFailed,
    pub retry: u32,
    pub step_count: u32,
}

/// Decides which Data packets to trust and which names may be signed.
pub trait PolicyManager {
    fn skip_verify_and_trust(&self, data: &Data) -> bool;

    fn require_verify(&self, data: &Data) -> bool;

    /// Either reports the outcome through exactly one of the callbacks and
    /// returns `None`, or hands back the next certificate to fetch.
    fn check_verification_policy(
        &self,
        face: &mut Face,
        data: &Data,
        step_count: u32,
        on_verified: OnVerified,
        on_verify_failed: OnVerifyFailed,
    ) -> Option<ValidationRequest>;

    fn check_signing_policy(&self, data_name: &Name, certificate_name: &Name) -> bool;

    fn infer_signing_identity(&self, data_name: &Name) -> Name;
}

/// Trusts everything without looking at signatures.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoVerifyPolicyManager;

impl PolicyManager for NoVerifyPolicyManager {
    fn skip_verify_and_trust(&self, _data: &Data) -> bool {
        true
    }

    fn require_verify(&self, _data: &Data) -> bool {
        false
    }

    fn check_verification_policy(
        &self,
        face: &mut Face,
        data: &Data,
        _step_count: u32,
        on_verified: OnVerified,
        _on_verify_failed: OnVerifyFailed,
    ) -> Option<ValidationRequest> {
        on_verified(face, data.clone());
        None
    }

    fn check_signing_policy(&self, _data_name: &Name, _certificate_name: &Name) -> bool {
        true
    }

    fn infer_signing_identity(&self, _data_name: &Name) -> Name {
        Name::new()
    }
}

/// Accepts Data whose DigestSha256 signature matches its content.
#[derive(Copy, Clone, Debug, Default)]
pub struct Sha256DigestPolicyManager;

impl PolicyManager for Sha256DigestPolicyManager {
    fn skip_verify_and_trust(&self, _data: &Data) -> bool {
        false
    }

    fn require_verify(&self, _data: &Data) -> bool {
        true
    }

    fn check_verification_policy(
        &self,
        face: &mut Face,
        data: &Data,
        _step_count: u32,
        on_verified: OnVerified,
        on_verify_failed: OnVerifyFailed,
    ) -> Option<ValidationRequest> {
        match verify_sha256_digest(data) {
            Ok(true) => on_verified(face, data.clone()),
            Ok(false) => {
                debug!(name = %data.name, "digest does not match");
                on_verify_failed(face, data.clone())
            }
            Err(e) => {
                debug!(name = %data.name, error = %e, "cannot verify");
                on_verify_failed(face, data.clone())
            }
        }
        None
    }

    fn check_signing_policy(&self, _data_name: &Name, _certificate_name: &Name) -> bool {
        true
    }

    fn infer_signing_identity(&self, _data_name: &Name) -> Name {
        Name::new()
    }
}

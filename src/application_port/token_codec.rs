use crate::domain_model::TokenClaims;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token malformed: {0}")]
    Malformed(String),
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Signs and verifies token payloads. Stateless apart from the key material
/// it was constructed with.
pub trait TokenCodec: Send + Sync {
    fn sign(&self, claims: &TokenClaims) -> Result<String, CodecError>;

    /// Checks signature, then expiry against the current time, then the
    /// shape of the claims.
    fn verify(&self, token: &str) -> Result<TokenClaims, CodecError>;
}

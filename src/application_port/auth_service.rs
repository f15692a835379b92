use crate::application_port::CodecError;
use crate::domain_model::*;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credential")]
    InvalidCredential,
    #[error("token rejected: invalid")]
    RejectedInvalid,
    #[error("token rejected: expired")]
    RejectedExpired,
    #[error("token rejected: already redeemed")]
    RejectedReplayed,
    #[error("refresh token id collided with a live ledger entry")]
    IssuanceConflict,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// True for the three outcomes a caller must treat as "log in again".
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::RejectedInvalid | AuthError::RejectedExpired | AuthError::RejectedReplayed
        )
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidSignature | CodecError::Malformed(_) => AuthError::RejectedInvalid,
            CodecError::Expired => AuthError::RejectedExpired,
            CodecError::Signing(e) => AuthError::InternalError(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user_id: UserId,
    pub tokens: TokenPair,
}

/// Resolves a credential to the principal it belongs to.
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &LoginInput) -> Result<UserId, AuthError>;
}

/// The boundary the rest of the application talks to.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
    /// Best effort; never fails from the caller's point of view.
    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError>;
    async fn verify_access_token(&self, access_token: &str) -> Result<UserId, AuthError>;
}

use crate::application_port::*;
use crate::domain_model::UserId;

/// Password every fake account accepts.
pub const FAKE_PASSWORD: &str = "123456";

#[derive(Debug, Default)]
pub struct FakeCredentialVerifier;

impl FakeCredentialVerifier {
    pub fn new() -> Self {
        Self
    }
}

// Any non-empty username logs in with `FAKE_PASSWORD` and always maps to the
// same user id.
#[async_trait::async_trait]
impl CredentialVerifier for FakeCredentialVerifier {
    async fn verify(&self, credential: &LoginInput) -> Result<UserId, AuthError> {
        if credential.username.is_empty() || credential.password != FAKE_PASSWORD {
            return Err(AuthError::InvalidCredential);
        }
        Ok(fake_user_id(&credential.username))
    }
}

pub fn fake_user_id(username: &str) -> UserId {
    UserId(uuid::Uuid::new_v5(
        &uuid::Uuid::NAMESPACE_OID,
        username.as_bytes(),
    ))
}

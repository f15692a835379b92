use crate::application_port::*;
use crate::domain_model::UserId;
use crate::domain_port::AuthRepo;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use std::sync::Arc;

/// Checks a username/password pair against the credential table.
///
/// Unknown users, inactive accounts and wrong passwords all come back as
/// `InvalidCredential`.
pub struct RealCredentialVerifier {
    auth_repo: Arc<dyn AuthRepo>,
}

impl RealCredentialVerifier {
    pub fn new(auth_repo: Arc<dyn AuthRepo>) -> Self {
        Self { auth_repo }
    }

    fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| AuthError::InternalError(format!("invalid PHC hash: {}", e)))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InternalError(format!("verify error: {}", e))),
        }
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for RealCredentialVerifier {
    async fn verify(&self, credential: &LoginInput) -> Result<UserId, AuthError> {
        let rec = self
            .auth_repo
            .get_by_username(&credential.username)
            .await?
            .ok_or(AuthError::InvalidCredential)?;

        if !rec.is_active {
            return Err(AuthError::InvalidCredential);
        }

        // Argon2 is deliberately slow; keep it off the async workers.
        let password = credential.password.clone();
        let password_hash = rec.password_hash;
        let ok = tokio::task::spawn_blocking(move || {
            Self::verify_password(&password, &password_hash)
        })
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))??;

        if !ok {
            return Err(AuthError::InvalidCredential);
        }
        Ok(rec.user_id)
    }
}

use crate::application_impl::{RotationService, TokenIssuer};
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RealAuthService {
    credential_verifier: Arc<dyn CredentialVerifier>,
    token_codec: Arc<dyn TokenCodec>,
    ledger: Arc<dyn SingleUseLedger>,
    issuer: Arc<TokenIssuer>,
    rotation: RotationService,
}

impl RealAuthService {
    pub fn new(
        credential_verifier: Arc<dyn CredentialVerifier>,
        token_codec: Arc<dyn TokenCodec>,
        ledger: Arc<dyn SingleUseLedger>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        let rotation = RotationService::new(token_codec.clone(), ledger.clone(), issuer.clone());
        Self {
            credential_verifier,
            token_codec,
            ledger,
            issuer,
            rotation,
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn login(&self, request: LoginInput) -> Result<LoginResult, AuthError> {
        let user_id = match self.credential_verifier.verify(&request).await {
            Ok(user_id) => user_id,
            Err(e) => {
                debug!(username = %request.username, "login refused: {}", e);
                return Err(e);
            }
        };

        let tokens = self.issuer.issue(user_id).await?;
        info!(user_id = %user_id, "login succeeded");

        Ok(LoginResult { user_id, tokens })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.rotation
            .rotate(&RefreshToken(refresh_token.to_string()))
            .await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let claims = match self.token_codec.verify(refresh_token) {
            Ok(claims) if claims.kind == TokenKind::Refresh => claims,
            Ok(claims) => {
                debug!(kind = %claims.kind, "logout ignored non-refresh token");
                return Ok(());
            }
            Err(e) => {
                debug!("logout ignored unverifiable token: {}", e);
                return Ok(());
            }
        };

        match self.ledger.claim(&claims.jti).await {
            Ok(()) => info!(user_id = %claims.subject, jti = %claims.jti, "logged out"),
            Err(LedgerError::NotFound) => {
                debug!(user_id = %claims.subject, jti = %claims.jti, "logout of spent token");
            }
            Err(e) => {
                warn!(
                    user_id = %claims.subject,
                    jti = %claims.jti,
                    "logout claim failed: {}",
                    e
                );
            }
        }
        Ok(())
    }

    async fn verify_access_token(&self, access_token: &str) -> Result<UserId, AuthError> {
        let claims = self.token_codec.verify(access_token)?;
        if claims.kind != TokenKind::Access {
            return Err(AuthError::RejectedInvalid);
        }
        Ok(claims.subject)
    }
}

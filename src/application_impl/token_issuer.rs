use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct IssuerConfig {
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        IssuerConfig {
            access_ttl: chrono::Duration::minutes(15),
            refresh_ttl: chrono::Duration::days(7),
        }
    }
}

/// Mints access/refresh pairs. A pair only leaves this type once its refresh
/// token is registered in the ledger.
pub struct TokenIssuer {
    codec: Arc<dyn TokenCodec>,
    ledger: Arc<dyn SingleUseLedger>,
    cfg: IssuerConfig,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        ledger: Arc<dyn SingleUseLedger>,
        cfg: IssuerConfig,
    ) -> Self {
        Self { codec, ledger, cfg }
    }

    fn ttl_until(until: DateTime<Utc>) -> Duration {
        let secs = (until - Utc::now()).num_seconds();
        if secs <= 0 {
            Duration::from_secs(1)
        } else {
            Duration::from_secs(secs as u64)
        }
    }

    pub async fn issue(&self, subject: UserId) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access = TokenClaims::new(subject, TokenKind::Access, now, self.cfg.access_ttl);
        let refresh = TokenClaims::new(subject, TokenKind::Refresh, now, self.cfg.refresh_ttl);

        let access_token = self.codec.sign(&access)?;
        let refresh_token = self.codec.sign(&refresh)?;

        let ttl = Self::ttl_until(refresh.expires_at);
        match self.ledger.reserve(&refresh.jti, subject, ttl).await {
            Ok(()) => {}
            Err(LedgerError::AlreadyExists) => {
                error!(user_id = %subject, jti = %refresh.jti, "refresh jti already in ledger");
                return Err(AuthError::IssuanceConflict);
            }
            Err(LedgerError::Store(e)) => {
                error!(user_id = %subject, "ledger reserve failed: {}", e);
                return Err(AuthError::Store(e));
            }
            Err(e @ LedgerError::NotFound) => return Err(AuthError::InternalError(e.to_string())),
        }

        debug!(user_id = %subject, jti = %refresh.jti, "issued token pair");

        Ok(TokenPair {
            access_token: AccessToken(access_token),
            refresh_token: RefreshToken(refresh_token),
            access_token_expires_at: access.expires_at,
            refresh_token_expires_at: refresh.expires_at,
        })
    }
}

use crate::application_impl::TokenIssuer;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Progress of a single redemption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionStage {
    Received,
    Verified,
    Claimed,
    Reissued,
}

impl fmt::Display for RedemptionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RedemptionStage::Received => "received",
            RedemptionStage::Verified => "verified",
            RedemptionStage::Claimed => "claimed",
            RedemptionStage::Reissued => "reissued",
        };
        f.write_str(name)
    }
}

/// Redeems a refresh token for a new pair, at most once per token.
///
/// Signature and expiry are checked statelessly; "already used" lives only in
/// the ledger, and the ledger's atomic claim is what decides the winner when
/// the same token is presented concurrently. Once the claim succeeds the old
/// token is spent, even if reissuing fails or the caller goes away.
pub struct RotationService {
    codec: Arc<dyn TokenCodec>,
    ledger: Arc<dyn SingleUseLedger>,
    issuer: Arc<TokenIssuer>,
}

impl RotationService {
    pub fn new(
        codec: Arc<dyn TokenCodec>,
        ledger: Arc<dyn SingleUseLedger>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            codec,
            ledger,
            issuer,
        }
    }

    pub async fn rotate(&self, presented: &RefreshToken) -> Result<TokenPair, AuthError> {
        let claims = self.verify(presented)?;
        self.claim(&claims).await?;
        self.reissue(&claims).await
    }

    /// Received -> Verified
    fn verify(&self, presented: &RefreshToken) -> Result<TokenClaims, AuthError> {
        let claims = self.codec.verify(&presented.0).map_err(|e| {
            debug!(stage = %RedemptionStage::Received, "refresh token rejected: {}", e);
            AuthError::from(e)
        })?;

        if claims.kind != TokenKind::Refresh {
            debug!(
                stage = %RedemptionStage::Received,
                user_id = %claims.subject,
                kind = %claims.kind,
                "non-refresh token presented for rotation"
            );
            return Err(AuthError::RejectedInvalid);
        }

        Ok(claims)
    }

    /// Verified -> Claimed
    async fn claim(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        match self.ledger.claim(&claims.jti).await {
            Ok(()) => {
                debug!(
                    stage = %RedemptionStage::Claimed,
                    user_id = %claims.subject,
                    jti = %claims.jti,
                    "refresh token consumed"
                );
                Ok(())
            }
            Err(LedgerError::NotFound) => {
                warn!(
                    stage = %RedemptionStage::Verified,
                    user_id = %claims.subject,
                    jti = %claims.jti,
                    "refresh token replayed or unknown"
                );
                Err(AuthError::RejectedReplayed)
            }
            Err(LedgerError::Store(e)) => {
                error!(
                    stage = %RedemptionStage::Verified,
                    user_id = %claims.subject,
                    jti = %claims.jti,
                    "ledger claim failed: {}",
                    e
                );
                Err(AuthError::Store(e))
            }
            Err(e @ LedgerError::AlreadyExists) => Err(AuthError::InternalError(e.to_string())),
        }
    }

    /// Claimed -> Reissued
    async fn reissue(&self, claims: &TokenClaims) -> Result<TokenPair, AuthError> {
        let pair = self.issuer.issue(claims.subject).await.map_err(|e| {
            error!(
                stage = %RedemptionStage::Claimed,
                user_id = %claims.subject,
                jti = %claims.jti,
                "reissue failed after claim, subject must log in again: {}",
                e
            );
            e
        })?;

        debug!(
            stage = %RedemptionStage::Reissued,
            user_id = %claims.subject,
            "refresh token rotated"
        );
        Ok(pair)
    }
}

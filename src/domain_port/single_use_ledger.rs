use crate::domain_model::{Jti, UserId};
use std::time::Duration;

/// Shared record of refresh tokens that are still redeemable.
///
/// Both operations must be single indivisible steps against the backing
/// store. An implementation that reads an entry and then writes or deletes it
/// in a second step lets two concurrent redemptions of the same token succeed.
#[async_trait::async_trait]
pub trait SingleUseLedger: Send + Sync {
    /// Create the entry for `jti` only if it is absent, expiring after `ttl`.
    /// The subject is stored as the entry's marker.
    async fn reserve(&self, jti: &Jti, subject: UserId, ttl: Duration) -> Result<(), LedgerError>;

    /// Delete the entry for `jti` if present. Exactly one of any number of
    /// concurrent callers succeeds; every other caller gets `NotFound`,
    /// whether the entry never existed, expired, or was claimed first by
    /// someone else.
    async fn claim(&self, jti: &Jti) -> Result<(), LedgerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger entry already exists")]
    AlreadyExists,
    #[error("ledger entry not found")]
    NotFound,
    #[error("ledger store error: {0}")]
    Store(String),
}

use crate::domain_model::*;
use crate::domain_port::*;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    subject: UserId,
    expires_at: Instant,
}

impl LedgerEntry {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// In-process ledger for single-instance deployments and tests.
///
/// `reserve` and `claim` each run under the owning shard's write lock, so
/// they are atomic within this process. Entries do not leave the map on
/// expiry by themselves; expired ones are invisible to `claim` and are
/// removed by [`MemorySingleUseLedger::purge_expired`].
#[derive(Debug, Default)]
pub struct MemorySingleUseLedger {
    entries: DashMap<Jti, LedgerEntry>,
}

impl MemorySingleUseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `jti` has a live, unclaimed entry.
    pub fn contains(&self, jti: &Jti) -> bool {
        let now = Instant::now();
        self.entries
            .get(jti)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Subject recorded for a live entry.
    pub fn subject_of(&self, jti: &Jti) -> Option<UserId> {
        let now = Instant::now();
        self.entries
            .get(jti)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.subject)
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl SingleUseLedger for MemorySingleUseLedger {
    async fn reserve(&self, jti: &Jti, subject: UserId, ttl: Duration) -> Result<(), LedgerError> {
        let now = Instant::now();
        let fresh = LedgerEntry {
            subject,
            expires_at: now + ttl,
        };

        let mut reserved = false;
        self.entries
            .entry(*jti)
            .and_modify(|existing| {
                // An expired entry is as good as absent.
                if existing.is_expired(now) {
                    *existing = fresh;
                    reserved = true;
                }
            })
            .or_insert_with(|| {
                reserved = true;
                fresh
            });

        if reserved {
            Ok(())
        } else {
            Err(LedgerError::AlreadyExists)
        }
    }

    async fn claim(&self, jti: &Jti) -> Result<(), LedgerError> {
        let now = Instant::now();
        match self.entries.remove_if(jti, |_, entry| !entry.is_expired(now)) {
            Some(_) => Ok(()),
            None => Err(LedgerError::NotFound),
        }
    }
}

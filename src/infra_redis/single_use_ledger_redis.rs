use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisWrite, ToRedisArgs};
use std::time::Duration;

/// Ledger backed by Redis. Every operation is one command, so the atomicity
/// guarantee holds across any number of service instances sharing the store.
pub struct RedisSingleUseLedger {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSingleUseLedger {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSingleUseLedger {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, jti: &Jti) -> String {
        format!("{}:{}", self.prefix, jti)
    }

    #[inline]
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

impl ToRedisArgs for UserId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.to_string().as_bytes())
    }
}

#[async_trait::async_trait]
impl SingleUseLedger for RedisSingleUseLedger {
    async fn reserve(&self, jti: &Jti, subject: UserId, ttl: Duration) -> Result<(), LedgerError> {
        let key = self.key(jti);
        let mut conn = self.conn.clone();
        // SET NX replies OK when it wrote the key and nil when the key existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&subject)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        match reply {
            Some(_) => Ok(()),
            None => Err(LedgerError::AlreadyExists),
        }
    }

    async fn claim(&self, jti: &Jti) -> Result<(), LedgerError> {
        let key = self.key(jti);
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(&key)
            .await
            .map_err(|e| LedgerError::Store(e.to_string()))?;

        if removed == 1 {
            Ok(())
        } else {
            Err(LedgerError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_never_rounds_to_zero() {
        assert_eq!(RedisSingleUseLedger::ttl_secs(Duration::from_millis(300)), 1);
        assert_eq!(RedisSingleUseLedger::ttl_secs(Duration::from_secs(604_800)), 604_800);
    }

    #[test]
    fn test_user_id_written_as_uuid_text() {
        let user = UserId(uuid::Uuid::nil());
        let args = user.to_redis_args();
        assert_eq!(args, vec![b"00000000-0000-0000-0000-000000000000".to_vec()]);
    }

    // Needs a running Redis. Run with: cargo test -- --ignored
    async fn local_ledger() -> RedisSingleUseLedger {
        let dsn = std::env::var("TURNSTILE_TEST_REDIS")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let client = redis::Client::open(dsn).expect("redis client");
        let conn = client
            .get_connection_manager()
            .await
            .expect("redis connection");
        RedisSingleUseLedger::new(conn, "turnstile-test")
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_duplicate_reserve_is_already_exists() {
        let ledger = local_ledger().await;
        let jti = Jti::generate();
        let user = UserId(uuid::Uuid::new_v4());

        ledger
            .reserve(&jti, user, Duration::from_secs(60))
            .await
            .expect("first reserve");
        assert!(matches!(
            ledger.reserve(&jti, user, Duration::from_secs(60)).await,
            Err(LedgerError::AlreadyExists)
        ));

        ledger.claim(&jti).await.expect("cleanup");
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_claim_of_missing_key_is_not_found() {
        let ledger = local_ledger().await;
        let jti = Jti::generate();
        let user = UserId(uuid::Uuid::new_v4());

        assert!(matches!(
            ledger.claim(&jti).await,
            Err(LedgerError::NotFound)
        ));

        ledger
            .reserve(&jti, user, Duration::from_secs(60))
            .await
            .expect("reserve");
        ledger.claim(&jti).await.expect("first claim");
        assert!(matches!(
            ledger.claim(&jti).await,
            Err(LedgerError::NotFound)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires Redis"]
    async fn test_concurrent_claims_have_one_winner() {
        let ledger = std::sync::Arc::new(local_ledger().await);
        let jti = Jti::generate();
        ledger
            .reserve(&jti, UserId(uuid::Uuid::new_v4()), Duration::from_secs(60))
            .await
            .expect("reserve");

        let claims = (0..10).map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.claim(&jti).await })
        });
        let outcomes = futures_util::future::join_all(claims).await;

        let won = outcomes
            .iter()
            .filter(|r| matches!(r, Ok(Ok(()))))
            .count();
        let lost = outcomes
            .iter()
            .filter(|r| matches!(r, Ok(Err(LedgerError::NotFound))))
            .count();
        assert_eq!(won, 1);
        assert_eq!(lost, 9);
    }
}

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use turnstile::application_impl::*;
use turnstile::application_port::*;
use turnstile::domain_model::{Jti, UserId};
use turnstile::domain_port::{LedgerError, SingleUseLedger};
use turnstile::infra_memory::MemorySingleUseLedger;

pub const ISSUER: &str = "turnstile.test";
pub const AUDIENCE: &str = "turnstile-test-client";
pub const SIGNING_KEY: &[u8] = b"integration-test-secret-with-enough-bytes";

pub struct TestApp {
    pub codec: Arc<JwtHs256Codec>,
    pub ledger: Arc<MemorySingleUseLedger>,
    pub issuer: Arc<TokenIssuer>,
    pub auth_service: Arc<dyn AuthService>,
}

pub fn codec() -> Arc<JwtHs256Codec> {
    Arc::new(JwtHs256Codec::new(JwtConfig {
        issuer: ISSUER.to_string(),
        audience: AUDIENCE.to_string(),
        signing_key: SIGNING_KEY.to_vec(),
    }))
}

pub fn app() -> TestApp {
    app_with(IssuerConfig::default())
}

pub fn app_with(cfg: IssuerConfig) -> TestApp {
    let codec = codec();
    let ledger = Arc::new(MemorySingleUseLedger::new());
    let issuer = Arc::new(TokenIssuer::new(codec.clone(), ledger.clone(), cfg));
    let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
        Arc::new(FakeCredentialVerifier::new()),
        codec.clone(),
        ledger.clone(),
        issuer.clone(),
    ));
    TestApp {
        codec,
        ledger,
        issuer,
        auth_service,
    }
}

/// Same wiring as `app`, but over an arbitrary ledger.
pub fn service_over(ledger: Arc<dyn SingleUseLedger>) -> Arc<dyn AuthService> {
    let codec = codec();
    let issuer = Arc::new(TokenIssuer::new(
        codec.clone(),
        ledger.clone(),
        IssuerConfig::default(),
    ));
    Arc::new(RealAuthService::new(
        Arc::new(FakeCredentialVerifier::new()),
        codec,
        ledger,
        issuer,
    ))
}

pub fn credential(username: &str) -> LoginInput {
    LoginInput {
        username: username.to_string(),
        password: FAKE_PASSWORD.to_string(),
    }
}

/// Memory ledger that can be switched off to simulate a store outage.
pub struct FlakyLedger {
    pub inner: MemorySingleUseLedger,
    pub down: AtomicBool,
}

impl FlakyLedger {
    pub fn new() -> Self {
        FlakyLedger {
            inner: MemorySingleUseLedger::new(),
            down: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerError::Store("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SingleUseLedger for FlakyLedger {
    async fn reserve(&self, jti: &Jti, subject: UserId, ttl: Duration) -> Result<(), LedgerError> {
        self.check()?;
        self.inner.reserve(jti, subject, ttl).await
    }

    async fn claim(&self, jti: &Jti) -> Result<(), LedgerError> {
        self.check()?;
        self.inner.claim(jti).await
    }
}

use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::LedgerSweeper;
use crate::settings::{Settings, load_signing_key};
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();

        let signing_key = load_signing_key(&settings.auth)?;
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
            issuer: settings.auth.issuer.clone(),
            audience: settings.auth.audience.clone(),
            signing_key,
        }));

        let mut sweeper_handle = None;
        let ledger: Arc<dyn SingleUseLedger> = match settings.ledger.backend.as_str() {
            "memory" => {
                warn!("in-memory ledger: refresh tokens are single-use within this process only");
                let ledger = Arc::new(MemorySingleUseLedger::new());
                let sweeper = LedgerSweeper::new(
                    ledger.clone(),
                    Duration::from_secs(settings.ledger.sweep_interval_secs.max(1)),
                    cancel.clone(),
                );
                sweeper_handle = Some(tokio::spawn(async move { sweeper.run().await }));
                ledger
            }
            "redis" => {
                let dsn = settings.ledger.redis_dsn.as_deref().ok_or_else(|| {
                    anyhow!("ledger.redis_dsn is required for the redis backend")
                })?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSingleUseLedger::new(
                    redis_manager,
                    settings.ledger.prefix.clone(),
                ))
            }
            other => return Err(anyhow!("Unknown ledger backend: {}", other)),
        };

        let mut pool = None;
        let credential_verifier: Arc<dyn CredentialVerifier> =
            match settings.credential.backend.as_str() {
                "fake" => Arc::new(FakeCredentialVerifier::new()),
                "real" => {
                    let dsn = settings.credential.mysql_dsn.as_deref().ok_or_else(|| {
                        anyhow!("credential.mysql_dsn is required for the real backend")
                    })?;
                    let mysql = Pool::<MySql>::connect(dsn).await?;
                    let auth_repo: Arc<dyn AuthRepo> =
                        Arc::new(MySqlAuthRepo::new(mysql.clone()));
                    pool = Some(mysql);
                    Arc::new(RealCredentialVerifier::new(auth_repo))
                }
                other => return Err(anyhow!("Unknown credential backend: {}", other)),
            };

        let issuer_config = issuer_config(settings)?;
        debug!(?issuer_config);
        let issuer = Arc::new(TokenIssuer::new(
            token_codec.clone(),
            ledger.clone(),
            issuer_config,
        ));

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            credential_verifier,
            token_codec,
            ledger,
            issuer,
        ));

        info!("server started");

        Ok(Self {
            auth_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = match self.sweeper_handle.lock() {
            Ok(mut lock) => lock.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            let r = handle.await;
            info!("sweeper handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn issuer_config(settings: &Settings) -> anyhow::Result<IssuerConfig> {
    let access = settings.auth.access_ttl_secs;
    let refresh = settings.auth.refresh_ttl_secs;
    if access == 0 || refresh == 0 {
        return Err(anyhow!("token lifetimes must be positive"));
    }
    if access >= refresh {
        return Err(anyhow!(
            "access_ttl_secs ({}) must be shorter than refresh_ttl_secs ({})",
            access,
            refresh
        ));
    }
    Ok(IssuerConfig {
        access_ttl: chrono::Duration::seconds(i64::try_from(access)?),
        refresh_ttl: chrono::Duration::seconds(i64::try_from(refresh)?),
    })
}

use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;
use std::fmt;

/// Shortest HS256 key accepted at startup.
pub const MIN_SIGNING_KEY_LEN: usize = 32;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub credential: Credential,
    pub ledger: Ledger,
    pub http: Http,
    pub log: Log,
}

#[derive(Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub audience: String,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
    pub signing_key_env: String,
    // Fallback for local runs when the env var is unset. Never set in release.
    pub dev_signing_key: Option<String>,
}

#[derive(Deserialize)]
pub struct Credential {
    pub backend: String, // "fake" or "real"
    pub mysql_dsn: Option<String>,
}

#[derive(Deserialize)]
pub struct Ledger {
    pub backend: String, // "memory" or "redis"
    pub redis_dsn: Option<String>,
    pub prefix: String,
    pub sweep_interval_secs: u64,
}

fn redacted<T>(value: &Option<T>) -> &'static str {
    match value {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("signing_key_env", &self.signing_key_env)
            .field("dev_signing_key", &redacted(&self.dev_signing_key))
            .finish()
    }
}

// DSNs carry passwords.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("backend", &self.backend)
            .field("mysql_dsn", &redacted(&self.mysql_dsn))
            .finish()
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("backend", &self.backend)
            .field("redis_dsn", &redacted(&self.redis_dsn))
            .field("prefix", &self.prefix)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

/// Resolves the process-wide signing key. Called once at startup.
pub fn load_signing_key(auth: &Auth) -> Result<Vec<u8>> {
    let key = match std::env::var(&auth.signing_key_env) {
        Ok(key) => key,
        Err(_) => match &auth.dev_signing_key {
            Some(key) => {
                tracing::warn!(
                    "{} is unset, using dev_signing_key from settings",
                    auth.signing_key_env
                );
                key.clone()
            }
            None => return Err(anyhow!("{} is not set", auth.signing_key_env)),
        },
    };

    if key.len() < MIN_SIGNING_KEY_LEN {
        return Err(anyhow!(
            "signing key must be at least {} bytes, got {}",
            MIN_SIGNING_KEY_LEN,
            key.len()
        ));
    }
    Ok(key.into_bytes())
}

/// Fires several concurrent refreshes with the same refresh token and shows
/// that exactly one of them wins.
///
/// Runs entirely in-process (in-memory ledger, fake credentials):
///
/// $ cargo run --bin rotation_demo -- --attempts 16
use clap::Parser;
use futures_util::future::join_all;
use std::sync::Arc;
use turnstile::application_impl::*;
use turnstile::application_port::*;
use turnstile::domain_port::SingleUseLedger;
use turnstile::infra_memory::MemorySingleUseLedger;
use turnstile::logger::*;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value_t = 10)]
    attempts: usize,
    #[arg(long, default_value = "demo-user")]
    username: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "info,turnstile=debug".to_string(),
    })?;

    let codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(JwtConfig {
        issuer: "turnstile.demo".to_string(),
        audience: "turnstile-demo".to_string(),
        signing_key: b"rotation-demo-signing-key-0123456789".to_vec(),
    }));
    let ledger: Arc<dyn SingleUseLedger> = Arc::new(MemorySingleUseLedger::new());
    let issuer = Arc::new(TokenIssuer::new(
        codec.clone(),
        ledger.clone(),
        IssuerConfig::default(),
    ));
    let auth: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
        Arc::new(FakeCredentialVerifier::new()),
        codec,
        ledger,
        issuer,
    ));

    let login = auth
        .login(LoginInput {
            username: args.username.clone(),
            password: FAKE_PASSWORD.to_string(),
        })
        .await?;
    let refresh_token = login.tokens.refresh_token.0;
    info!(user_id = %login.user_id, attempts = args.attempts, "racing refreshes");

    let races = (0..args.attempts).map(|_| {
        let auth = auth.clone();
        let token = refresh_token.clone();
        tokio::spawn(async move { auth.refresh(&token).await })
    });

    let mut won = 0;
    let mut replayed = 0;
    for result in join_all(races).await {
        match result? {
            Ok(_) => won += 1,
            Err(AuthError::RejectedReplayed) => replayed += 1,
            Err(e) => warn!("unexpected outcome: {}", e),
        }
    }

    println!("attempts: {}", args.attempts);
    println!("reissued: {}", won);
    println!("replayed: {}", replayed);
    Ok(())
}

mod common;

use chrono::Utc;
use common::*;
use futures_util::future::join_all;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use turnstile::application_impl::IssuerConfig;
use turnstile::application_port::*;
use turnstile::domain_model::*;
use turnstile::domain_port::*;

struct CollidingLedger;

#[async_trait::async_trait]
impl SingleUseLedger for CollidingLedger {
    async fn reserve(&self, _: &Jti, _: UserId, _: Duration) -> Result<(), LedgerError> {
        Err(LedgerError::AlreadyExists)
    }

    async fn claim(&self, _: &Jti) -> Result<(), LedgerError> {
        Err(LedgerError::NotFound)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_refresh_has_exactly_one_winner() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");
    let presented = login.tokens.refresh_token.0.clone();

    let attempts = (0..10).map(|_| {
        let auth_service = app.auth_service.clone();
        let presented = presented.clone();
        tokio::spawn(async move { auth_service.refresh(&presented).await })
    });
    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task joined"))
        .collect();

    let winners: Vec<&TokenPair> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let replayed = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AuthError::RejectedReplayed)))
        .count();
    assert_eq!(winners.len(), 1);
    assert_eq!(replayed, 9);

    // The winner's refresh token has not been spent by anyone.
    let fresh = app
        .codec
        .verify(&winners[0].refresh_token.0)
        .expect("winner claims");
    assert!(app.ledger.contains(&fresh.jti));
    app.auth_service
        .refresh(&winners[0].refresh_token.0)
        .await
        .expect("winner's token redeems");
}

#[tokio::test]
async fn rotated_token_is_never_accepted_again() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");
    let r1 = login.tokens.refresh_token.0;

    app.auth_service.refresh(&r1).await.expect("first refresh");

    for _ in 0..3 {
        assert!(matches!(
            app.auth_service.refresh(&r1).await,
            Err(AuthError::RejectedReplayed)
        ));
    }
}

#[tokio::test]
async fn expired_refresh_token_is_rejected_while_ledgered() {
    let app = app();
    let subject = fake_user_id_for("alice");
    let issued_at = Utc::now() - chrono::Duration::hours(2);
    let claims = TokenClaims::new(
        subject,
        TokenKind::Refresh,
        issued_at,
        chrono::Duration::hours(1),
    );
    let token = app.codec.sign(&claims).expect("signed");
    app.ledger
        .reserve(&claims.jti, subject, Duration::from_secs(86_400))
        .await
        .expect("reserved");

    assert!(matches!(
        app.auth_service.refresh(&token).await,
        Err(AuthError::RejectedExpired)
    ));
    // Expiry is decided before the ledger is touched.
    assert!(app.ledger.contains(&claims.jti));
}

#[tokio::test]
async fn access_token_cannot_be_used_to_refresh() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");

    assert!(matches!(
        app.auth_service.refresh(&login.tokens.access_token.0).await,
        Err(AuthError::RejectedInvalid)
    ));
    app.auth_service
        .refresh(&login.tokens.refresh_token.0)
        .await
        .expect("refresh token still good");
}

#[tokio::test]
async fn logout_twice_succeeds_and_burns_the_token() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");
    let refresh = login.tokens.refresh_token.0;

    app.auth_service.logout(&refresh).await.expect("first logout");
    app.auth_service.logout(&refresh).await.expect("second logout");

    assert!(matches!(
        app.auth_service.refresh(&refresh).await,
        Err(AuthError::RejectedReplayed)
    ));
}

#[tokio::test]
async fn logout_ignores_garbage_and_access_tokens() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");

    app.auth_service.logout("not-a-token").await.expect("garbage");
    app.auth_service
        .logout(&login.tokens.access_token.0)
        .await
        .expect("access token");

    let refresh = app
        .codec
        .verify(&login.tokens.refresh_token.0)
        .expect("claims");
    assert!(app.ledger.contains(&refresh.jti));
}

#[tokio::test]
async fn every_issued_pair_is_ledgered() {
    let app = app();
    for username in ["alice", "bob", "carol"] {
        let pair = app
            .issuer
            .issue(fake_user_id_for(username))
            .await
            .expect("issued");
        let claims = app.codec.verify(&pair.refresh_token.0).expect("claims");
        assert_eq!(app.ledger.subject_of(&claims.jti), Some(claims.subject));
    }
    assert_eq!(app.ledger.len(), 3);
}

#[tokio::test]
async fn login_refresh_replay_refresh() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");
    let (a1, r1) = (login.tokens.access_token, login.tokens.refresh_token);

    let second = app.auth_service.refresh(&r1.0).await.expect("refresh r1");
    assert_ne!(second.refresh_token, r1);
    assert_ne!(second.access_token, a1);

    assert!(matches!(
        app.auth_service.refresh(&r1.0).await,
        Err(AuthError::RejectedReplayed)
    ));

    let third = app
        .auth_service
        .refresh(&second.refresh_token.0)
        .await
        .expect("refresh r2");
    let subject = app
        .auth_service
        .verify_access_token(&third.access_token.0)
        .await
        .expect("access token verifies");
    assert_eq!(subject, login.user_id);
}

#[tokio::test]
async fn rotated_expiry_counts_from_rotation_time() {
    let app = app_with(IssuerConfig {
        access_ttl: chrono::Duration::minutes(15),
        refresh_ttl: chrono::Duration::days(7),
    });
    let subject = fake_user_id_for("alice");

    // A token six days into its seven-day life.
    let claims = TokenClaims::new(
        subject,
        TokenKind::Refresh,
        Utc::now() - chrono::Duration::days(6),
        chrono::Duration::days(7),
    );
    let token = app.codec.sign(&claims).expect("signed");
    app.ledger
        .reserve(&claims.jti, subject, Duration::from_secs(86_400))
        .await
        .expect("reserved");

    let before = Utc::now();
    let rotated = app.auth_service.refresh(&token).await.expect("rotated");

    let lifetime = rotated.refresh_token_expires_at - before;
    assert!(lifetime >= chrono::Duration::days(7) - chrono::Duration::seconds(1));
    assert!(lifetime < chrono::Duration::days(7) + chrono::Duration::minutes(1));
    assert!(rotated.refresh_token_expires_at > claims.expires_at);
}

#[tokio::test]
async fn refresh_fails_closed_while_ledger_is_down() {
    let ledger = Arc::new(FlakyLedger::new());
    let auth_service = service_over(ledger.clone());
    let login = auth_service.login(credential("alice")).await.expect("login");
    let refresh = login.tokens.refresh_token.0;

    ledger.down.store(true, Ordering::SeqCst);
    let outage = auth_service.refresh(&refresh).await;
    assert!(matches!(outage, Err(AuthError::Store(_))));
    assert!(matches!(
        auth_service.login(credential("alice")).await,
        Err(AuthError::Store(_))
    ));

    // Nothing was claimed during the outage, so the token still redeems once.
    ledger.down.store(false, Ordering::SeqCst);
    auth_service.refresh(&refresh).await.expect("after recovery");
    assert!(matches!(
        auth_service.refresh(&refresh).await,
        Err(AuthError::RejectedReplayed)
    ));
}

#[tokio::test]
async fn login_surfaces_issuance_conflict() {
    let auth_service = service_over(Arc::new(CollidingLedger));
    assert!(matches!(
        auth_service.login(credential("alice")).await,
        Err(AuthError::IssuanceConflict)
    ));
}

#[tokio::test]
async fn wrong_password_is_invalid_credential() {
    let app = app();
    let attempt = LoginInput {
        username: "alice".to_string(),
        password: "hunter2".to_string(),
    };
    assert!(matches!(
        app.auth_service.login(attempt).await,
        Err(AuthError::InvalidCredential)
    ));
    assert!(app.ledger.is_empty());
}

#[tokio::test]
async fn verify_access_token_rejects_refresh_tokens() {
    let app = app();
    let login = app
        .auth_service
        .login(credential("alice"))
        .await
        .expect("login");

    assert!(matches!(
        app.auth_service
            .verify_access_token(&login.tokens.refresh_token.0)
            .await,
        Err(AuthError::RejectedInvalid)
    ));
}

fn fake_user_id_for(username: &str) -> UserId {
    turnstile::application_impl::fake_user_id(username)
}

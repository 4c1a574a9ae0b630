use base64::Engine;
use chrono::{Duration, Utc};

use domains::{DomainError, RoleId, SessionTokens, TokenError, UserId, ADMIN_ROLE_ID};
use integration_tests::{Forum, MEMBER_ROLE_ID, MODERATOR_ROLE_ID, PASSWORD};
use services::{Action, Decision, DenyReason};

fn payload(token: &str) -> serde_json::Value {
    let segment = token.split('.').nth(1).unwrap();
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(segment).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn token_carries_profile_and_ordered_roles_but_no_digest() {
    let forum = Forum::new();
    forum.add_user(7, "ada", &[MEMBER_ROLE_ID, MODERATOR_ROLE_ID]);

    let (token, claims) = forum.login("ada").await;

    assert_eq!(claims.user_id(), UserId(7));
    assert_eq!(claims.roles, vec![MODERATOR_ROLE_ID, MEMBER_ROLE_ID]);
    let raw = payload(&token);
    assert_eq!(raw["username"], "ada");
    assert_eq!(raw["email"], "ada@example.com");
    assert!(raw.get("password_hash").is_none());
    assert!(!raw.to_string().contains("$argon2"));
}

#[tokio::test]
async fn login_by_email_yields_the_same_identity() {
    let forum = Forum::new();
    forum.add_user(7, "ada", &[]);
    let (_, claims) = forum.login("ada@example.com").await;
    assert_eq!(claims.profile.username, "ada");
    assert!(claims.roles.is_empty());
}

#[tokio::test]
async fn every_credential_failure_looks_the_same() {
    let forum = Forum::new();
    forum.add_user(7, "ada", &[]);
    let inactive = forum.add_user(8, "ghost", &[]);
    let mut user = forum.store.user(inactive).unwrap();
    user.is_active = false;
    forum.store.add_user(user);

    let sessions = &forum.services.sessions;
    let wrong_password = sessions.login("ada", "not it").await.unwrap_err();
    let unknown_user = sessions.login("nobody", PASSWORD).await.unwrap_err();
    let deactivated = sessions.login("ghost", PASSWORD).await.unwrap_err();

    for err in [&wrong_password, &unknown_user, &deactivated] {
        assert!(matches!(err, DomainError::AuthenticationFailed));
        assert_eq!(err.to_string(), "invalid credentials");
    }
}

#[tokio::test]
async fn login_records_last_login() {
    let forum = Forum::new();
    let id = forum.add_user(7, "ada", &[]);
    assert!(forum.store.user(id).unwrap().last_login.is_none());
    forum.login("ada").await;
    assert!(forum.store.user(id).unwrap().last_login.is_some());
}

#[tokio::test]
async fn expired_and_foreign_tokens_are_unauthorized() {
    let forum = Forum::new();
    let id = forum.add_user(7, "ada", &[]);
    let profile = forum.store.user(id).unwrap().profile();

    let stale = forum.codec.issue(&profile, &[], Utc::now() - Duration::hours(25)).unwrap();
    assert_eq!(forum.codec.parse(&stale.token, Utc::now()), Err(TokenError::Expired));
    assert_eq!(
        forum.services.guard.authenticate(Some(&stale.token)).unwrap_err(),
        DenyReason::Unauthorized
    );

    let foreign = auth_adapters::JwtSessionCodec::new(b"some-other-secret-some-other-secret")
        .issue(&profile, &[ADMIN_ROLE_ID], Utc::now())
        .unwrap();
    assert_eq!(
        forum.services.guard.authenticate(Some(&foreign.token)).unwrap_err(),
        DenyReason::Unauthorized
    );
    assert_eq!(forum.services.guard.authenticate(None).unwrap_err(), DenyReason::Unauthorized);
}

#[tokio::test]
async fn roles_embedded_in_a_token_grant_nothing() {
    let forum = Forum::new();
    let id = forum.add_user(7, "ada", &[MEMBER_ROLE_ID]);
    let profile = forum.store.user(id).unwrap().profile();

    // Validly signed, but the admin role was never assigned in the directory.
    let inflated = forum.codec.issue(&profile, &[RoleId(1)], Utc::now()).unwrap();
    let claims = forum.services.guard.authenticate(Some(&inflated.token)).unwrap();

    let decision = forum
        .services
        .guard
        .authorize(Some(&claims), Action::DeletePost { author_id: UserId(99) })
        .await
        .unwrap();
    assert_eq!(decision, Decision::Denied(DenyReason::Forbidden));
}

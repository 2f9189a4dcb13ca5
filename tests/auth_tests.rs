//! Integration tests for the username/password authenticator.

use crm_users::config::{Config, SecurityConfig};
use crm_users::db::NewUser;
use crm_users::domain::{LoginStatus, Role};
use crm_users::services::{AuthContext, AuthError, Credentials, Passwords};
use crm_users::state::SharedState;

async fn spawn_state() -> SharedState {
    let db_path =
        std::env::temp_dir().join(format!("crm-users-auth-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;

    SharedState::new(config)
        .await
        .expect("Failed to create shared state")
}

async fn seed_user(state: &SharedState, email: &str, password: &str, active: bool) -> i32 {
    let password_hash = state.passwords.hash(password).unwrap();
    state
        .store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash,
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            role: Role::User,
            active,
            is_institution: false,
            institution_name: None,
            ext_id: None,
            source: "test".to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn statuses(state: &SharedState, email: &str) -> Vec<String> {
    state
        .store
        .list_login_attempts(email, 50)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.status)
        .collect()
}

#[tokio::test]
async fn test_successful_login_updates_sign_in_and_confirms() {
    let state = spawn_state().await;
    let id = seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let user = state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap();

    assert_eq!(user.id, id);
    assert!(user.confirmed_at.is_some());
    assert!(user.current_sign_in_at.is_some());
    assert!(user.last_sign_in_at.is_none());
    assert_eq!(statuses(&state, "jane@example.com").await, vec!["ok"]);

    // Second login shifts the previous sign-in into last_sign_in_at.
    let user = state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap();
    assert!(user.last_sign_in_at.is_some());
}

#[tokio::test]
async fn test_api_login_records_api_ok() {
    let state = spawn_state().await;
    seed_user(&state, "api@example.com", "secret-pass", true).await;

    state
        .authenticator
        .authenticate(
            Credentials::password("api@example.com", "secret-pass"),
            &AuthContext::api("ios"),
        )
        .await
        .unwrap();

    let attempts = state
        .store
        .list_login_attempts("api@example.com", 10)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, LoginStatus::ApiOk.as_str());
    assert_eq!(attempts[0].source, "ios");
}

#[tokio::test]
async fn test_unknown_email_is_identity_not_found() {
    let state = spawn_state().await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("ghost@example.com", "whatever"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::IdentityNotFound(_)));
    assert_eq!(
        statuses(&state, "ghost@example.com").await,
        vec!["not_found_email"]
    );
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credential() {
    let state = spawn_state().await;
    let id = seed_user(&state, "jane@example.com", "secret-pass", true).await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "nope"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredential(_)));
    assert_eq!(err.to_string(), "Wrong e-mail or password.");

    let attempts = state
        .store
        .list_login_attempts("jane@example.com", 10)
        .await
        .unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, "wrong_pass");
    assert_eq!(attempts[0].user_id, Some(id));

    let user = state.store.get_user(id).await.unwrap().unwrap();
    assert!(user.current_sign_in_at.is_none());
}

#[tokio::test]
async fn test_inactive_user_with_correct_password_is_identity_not_found() {
    let state = spawn_state().await;
    seed_user(&state, "sleepy@example.com", "secret-pass", false).await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("sleepy@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::IdentityNotFound(_)));
    assert_eq!(err.to_string(), "This account is not active.");
    assert_eq!(
        statuses(&state, "sleepy@example.com").await,
        vec!["inactive_user"]
    );
}

#[tokio::test]
async fn test_inactive_user_with_wrong_password_is_invalid_credential() {
    let state = spawn_state().await;
    seed_user(&state, "sleepy@example.com", "secret-pass", false).await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("sleepy@example.com", "nope"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredential(_)));
    assert_eq!(
        statuses(&state, "sleepy@example.com").await,
        vec!["wrong_pass"]
    );
}

#[tokio::test]
async fn test_stale_hash_is_upgraded_on_login() {
    let state = spawn_state().await;

    let legacy = Passwords::new(&SecurityConfig {
        argon2_memory_cost_kib: 2048,
        argon2_time_cost: 1,
        argon2_parallelism: 1,
        ..SecurityConfig::default()
    });
    let legacy_hash = legacy.hash("secret-pass").unwrap();
    let id = state
        .store
        .insert_user(NewUser {
            email: "legacy@example.com".to_string(),
            password_hash: legacy_hash.clone(),
            first_name: None,
            last_name: None,
            role: Role::User,
            active: true,
            is_institution: false,
            institution_name: None,
            ext_id: None,
            source: "test".to_string(),
        })
        .await
        .unwrap()
        .id;

    assert!(state.passwords.needs_rehash(&legacy_hash));

    let user = state
        .authenticator
        .authenticate(
            Credentials::password("legacy@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(user.id, id);

    let stored = state
        .store
        .user_repo()
        .get_password_hash(id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored, legacy_hash);
    assert!(!state.passwords.needs_rehash(&stored));
    assert!(Passwords::verify("secret-pass", &stored));
    assert_eq!(statuses(&state, "legacy@example.com").await, vec!["ok"]);
}

#[tokio::test]
async fn test_always_login_skips_password() {
    let state = spawn_state().await;
    let id = seed_user(&state, "new@example.com", "secret-pass", true).await;

    let user = state
        .authenticator
        .authenticate(
            Credentials::always_login("new@example.com"),
            &AuthContext::default(),
        )
        .await
        .unwrap();
    assert_eq!(user.id, id);
    assert_eq!(
        statuses(&state, "new@example.com").await,
        vec!["login_after_sign_up"]
    );

    let err = state
        .authenticator
        .authenticate(
            Credentials::always_login("missing@example.com"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IdentityNotFound(_)));
    assert_eq!(
        statuses(&state, "missing@example.com").await,
        vec!["login_after_sign_up"]
    );
}

#[tokio::test]
async fn test_every_attempt_leaves_exactly_one_row() {
    let state = spawn_state().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;

    for password in ["a", "secret-pass", "b"] {
        let _ = state
            .authenticator
            .authenticate(
                Credentials::password("jane@example.com", password),
                &AuthContext::default(),
            )
            .await;
    }

    assert_eq!(
        state
            .store
            .count_login_attempts("jane@example.com")
            .await
            .unwrap(),
        3
    );
    // Newest first.
    assert_eq!(
        statuses(&state, "jane@example.com").await,
        vec!["wrong_pass", "ok", "wrong_pass"]
    );
}

#[tokio::test]
async fn test_sign_in_events_are_persisted() {
    let state = spawn_state().await;
    let id = seed_user(&state, "jane@example.com", "secret-pass", true).await;

    state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap();

    // The log listener writes in the background.
    let mut event_types = Vec::new();
    for _ in 0..50 {
        event_types = state
            .store
            .list_logs_for_user(id)
            .await
            .unwrap()
            .into_iter()
            .map(|log| log.event_type)
            .collect::<Vec<_>>();
        if event_types.len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    assert!(event_types.contains(&"UserConfirmed".to_string()));
    assert!(event_types.contains(&"SignedIn".to_string()));
}

async fn break_audit_log(state: &SharedState) {
    use sea_orm::ConnectionTrait;

    state
        .store
        .conn
        .execute_unprepared("DROP TABLE login_attempts")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_audit_failure_keeps_rejection_error() {
    let state = spawn_state().await;
    seed_user(&state, "jane@example.com", "secret-pass", true).await;
    break_audit_log(&state).await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "wrong"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredential(_)));

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("ghost@example.com", "whatever"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::IdentityNotFound(_)));
}

#[tokio::test]
async fn test_audit_failure_fails_successful_login() {
    let state = spawn_state().await;
    let id = seed_user(&state, "jane@example.com", "secret-pass", true).await;
    break_audit_log(&state).await;

    let err = state
        .authenticator
        .authenticate(
            Credentials::password("jane@example.com", "secret-pass"),
            &AuthContext::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Internal(_)));

    let user = state.store.get_user(id).await.unwrap().unwrap();
    assert!(user.current_sign_in_at.is_none());
}

use super::*;
use crate::messages::{CSRF_INVALID, NETWORK_ERROR, SERVER_ERROR};
use crate::net::endpoints::PROFILE;
use crate::net::mock::{MockBackend, status};
use crate::net::{ApiError, ErrorBody};
use std::path::PathBuf;

fn temp_store() -> (PathBuf, IdentityStore) {
    let dir = std::env::temp_dir().join(format!("registrar-auth-{}", uuid::Uuid::new_v4()));
    let store = IdentityStore::new(&dir);
    (dir, store)
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials { username: username.to_owned(), password: password.to_owned() }
}

fn student(username: &str) -> Identity {
    Identity { username: username.to_owned(), is_admin: false, extra: serde_json::Map::new() }
}

// =============================================================================
// resolve_landing
// =============================================================================

#[tokio::test]
async fn admin_lands_on_admin_without_probe() {
    let backend = MockBackend::new();
    let admin = Identity { is_admin: true, ..student("root") };

    assert_eq!(resolve_landing(&backend, &admin).await, Landing::Admin);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn probe_with_sections_lands_on_instructor() {
    let backend = MockBackend::new();
    backend.respond(Method::GET, MY_PRESENTED_COURSES, Ok(json!([{ "id": "pc-1", "course": "CS101" }])));

    assert_eq!(resolve_landing(&backend, &student("turing")).await, Landing::Instructor);
    assert_eq!(backend.count(&Method::GET, MY_PRESENTED_COURSES), 1);
}

#[tokio::test]
async fn empty_probe_lands_on_student() {
    let backend = MockBackend::new();
    backend.respond(Method::GET, MY_PRESENTED_COURSES, Ok(json!([])));

    assert_eq!(resolve_landing(&backend, &student("sam")).await, Landing::Student);
}

#[tokio::test]
async fn failed_probe_lands_on_student() {
    for err in [status(403, ErrorBody::Empty), status(500, ErrorBody::Empty), ApiError::Transport("reset".into())] {
        let backend = MockBackend::new();
        backend.respond(Method::GET, MY_PRESENTED_COURSES, Err(err));
        assert_eq!(resolve_landing(&backend, &student("sam")).await, Landing::Student);
    }
}

#[tokio::test]
async fn non_array_probe_lands_on_student() {
    let backend = MockBackend::new();
    backend.respond(Method::GET, MY_PRESENTED_COURSES, Ok(json!({ "count": 3 })));

    assert_eq!(resolve_landing(&backend, &student("sam")).await, Landing::Student);
}

#[test]
fn landing_paths() {
    assert_eq!(Landing::Admin.path(), "/admin");
    assert_eq!(Landing::Instructor.path(), "/professor");
    assert_eq!(Landing::Student.path(), "/student");
}

// =============================================================================
// sign_in
// =============================================================================

#[tokio::test]
async fn sign_in_saves_identity_and_routes_admin() {
    let (dir, store) = temp_store();
    let backend = MockBackend::new();
    backend.respond(Method::POST, SIGN_IN, Ok(json!({ "username": "ada", "is_admin": true, "mid": 1 })));

    let signed_in = sign_in(&backend, &store, &credentials("ada", "pw")).await.unwrap();

    assert_eq!(signed_in.landing, Landing::Admin);
    assert!(signed_in.identity.is_admin);
    assert_eq!(store.load(), Some(signed_in.identity));
    assert_eq!(backend.count(&Method::GET, MY_PRESENTED_COURSES), 0);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn sign_in_sends_credentials() {
    let (dir, store) = temp_store();
    let backend = MockBackend::new();
    backend.respond(Method::POST, SIGN_IN, Ok(json!({ "is_admin": false })));

    sign_in(&backend, &store, &credentials("grace", "secret")).await.unwrap();

    let call = &backend.calls()[0];
    assert_eq!(call.path, SIGN_IN);
    assert_eq!(call.body, Some(json!({ "username": "grace", "password": "secret" })));
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn sign_in_probe_failure_is_not_a_sign_in_error() {
    let (dir, store) = temp_store();
    let backend = MockBackend::new();
    backend
        .respond(Method::POST, SIGN_IN, Ok(json!({ "username": "sam", "is_admin": false })))
        .respond(Method::GET, MY_PRESENTED_COURSES, Err(status(500, ErrorBody::Empty)));

    let signed_in = sign_in(&backend, &store, &credentials("sam", "pw")).await.unwrap();
    assert_eq!(signed_in.landing, Landing::Student);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn sign_in_validates_before_sending() {
    let (_, store) = temp_store();
    let backend = MockBackend::new();

    let err = sign_in(&backend, &store, &credentials("  ", "")).await.unwrap_err();
    assert_eq!(err, "Username required\nPassword required");
    let err = sign_in(&backend, &store, &credentials("ada", "")).await.unwrap_err();
    assert_eq!(err, "Password required");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn sign_in_failure_messages() {
    let cases = [
        (status(400, ErrorBody::Detail("Invalid username or password".into())), "Invalid username or password"),
        (status(403, ErrorBody::Empty), CSRF_INVALID),
        (status(500, ErrorBody::Empty), SERVER_ERROR),
        (ApiError::Transport("refused".into()), NETWORK_ERROR),
    ];
    for (err, expected) in cases {
        let (_, store) = temp_store();
        let backend = MockBackend::new();
        backend.respond(Method::POST, SIGN_IN, Err(err));

        let message = sign_in(&backend, &store, &credentials("ada", "pw")).await.unwrap_err();
        assert_eq!(message, expected);
        assert_eq!(store.load(), None);
        assert_eq!(backend.count(&Method::GET, MY_PRESENTED_COURSES), 0);
    }
}

// =============================================================================
// sign_out / sign_up
// =============================================================================

#[tokio::test]
async fn sign_out_clears_identity_even_when_server_fails() {
    let (dir, store) = temp_store();
    store.save(&student("sam")).unwrap();
    let backend = MockBackend::new();
    backend.respond(Method::POST, SIGN_OUT, Err(ApiError::Transport("reset".into())));

    let err = sign_out(&backend, &store).await.unwrap_err();
    assert_eq!(err, NETWORK_ERROR);
    assert_eq!(store.load(), None);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn sign_out_success_sends_no_body() {
    let (dir, store) = temp_store();
    store.save(&student("sam")).unwrap();
    let backend = MockBackend::new();
    backend.respond(Method::POST, SIGN_OUT, Ok(Value::Null));

    sign_out(&backend, &store).await.unwrap();
    assert_eq!(store.load(), None);
    assert_eq!(backend.calls()[0].body, None);
    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test]
async fn sign_up_requires_identity_fields() {
    let backend = MockBackend::new();
    let registration = json!({ "fname": "Ada", "lname": " ", "username": "ada" });
    let err = sign_up(&backend, registration.as_object().unwrap()).await.unwrap_err();
    assert_eq!(err, "Last name is required\nNational # is required");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn sign_up_posts_registration_and_reports_field_errors() {
    let backend = MockBackend::new();
    let registration = json!({ "fname": "Ada", "lname": "Lovelace", "national_id": 12345, "username": "ada" });
    backend
        .respond(Method::POST, SIGN_UP, Ok(json!({ "mid": 9 })))
        .respond(
            Method::POST,
            SIGN_UP,
            Err(status(
                400,
                ErrorBody::FieldErrors(vec![("username".into(), vec!["Username taken".into()])]),
            )),
        );

    let created = sign_up(&backend, registration.as_object().unwrap()).await.unwrap();
    assert_eq!(created, json!({ "mid": 9 }));
    assert_eq!(backend.calls()[0].body, Some(registration.clone()));

    let err = sign_up(&backend, registration.as_object().unwrap()).await.unwrap_err();
    assert_eq!(err, "Username taken");
}

// =============================================================================
// update_profile
// =============================================================================

#[tokio::test]
async fn update_profile_puts_to_own_or_named_member() {
    let backend = MockBackend::new();
    let profile = json!({ "fname": "Ada", "lname": "Byron" });
    backend
        .respond(Method::PUT, PROFILE, Ok(json!({ "mid": 1 })))
        .respond(Method::PUT, "profile?member_mid=42", Ok(Value::Null));

    let own = update_profile(&backend, profile.as_object().unwrap(), None).await.unwrap();
    assert_eq!(own, json!({ "mid": 1 }));
    update_profile(&backend, profile.as_object().unwrap(), Some("42")).await.unwrap();

    let calls = backend.calls();
    assert_eq!(calls[0].method, Method::PUT);
    assert_eq!(calls[0].body, Some(profile.clone()));
    assert_eq!(calls[1].path, "profile?member_mid=42");
}

#[tokio::test]
async fn update_profile_failure_messages() {
    let cases = [
        (status(400, ErrorBody::Detail("National # taken".into())), "National # taken"),
        (
            status(400, ErrorBody::FieldErrors(vec![("birthday".into(), vec!["Bad date".into()])])),
            "Bad date",
        ),
        (status(500, ErrorBody::Empty), UPDATE_FAILED),
        (ApiError::Transport("refused".into()), NETWORK_ERROR),
    ];
    for (err, expected) in cases {
        let backend = MockBackend::new();
        backend.respond(Method::PUT, PROFILE, Err(err));
        let message = update_profile(&backend, &Record::new(), None).await.unwrap_err();
        assert_eq!(message, expected);
    }
}

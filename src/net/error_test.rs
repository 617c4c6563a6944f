use super::*;
use serde_json::json;

#[test]
fn parse_detail_body() {
    let body = ErrorBody::parse(r#"{"detail":"Invalid credentials"}"#);
    assert_eq!(body, ErrorBody::Detail("Invalid credentials".to_owned()));
    assert_eq!(body.detail(), Some("Invalid credentials"));
    assert_eq!(body.field_messages(), None);
}

#[test]
fn parse_field_errors_keeps_server_order() {
    let body = ErrorBody::parse(r#"{"name":["This field is required."],"code":"Too long."}"#);
    assert_eq!(
        body,
        ErrorBody::FieldErrors(vec![
            ("name".to_owned(), vec!["This field is required.".to_owned()]),
            ("code".to_owned(), vec!["Too long.".to_owned()]),
        ])
    );
    assert_eq!(
        body.field_messages().as_deref(),
        Some("This field is required.\nToo long.")
    );
}

#[test]
fn parse_field_errors_flattens_multiple_messages() {
    let body = ErrorBody::from_value(&json!({ "password": ["Too short.", "Too common."] }));
    assert_eq!(body.field_messages().as_deref(), Some("Too short.\nToo common."));
}

#[test]
fn parse_non_json_is_empty() {
    assert_eq!(ErrorBody::parse("<html>Server Error</html>"), ErrorBody::Empty);
    assert_eq!(ErrorBody::parse(""), ErrorBody::Empty);
}

#[test]
fn parse_empty_object_and_blank_messages_are_empty() {
    assert_eq!(ErrorBody::parse("{}"), ErrorBody::Empty);
    assert_eq!(ErrorBody::from_value(&json!({ "name": [] , "code": "" })), ErrorBody::Empty);
}

#[test]
fn parse_array_body_is_empty() {
    assert_eq!(ErrorBody::from_value(&json!(["a", "b"])), ErrorBody::Empty);
}

#[test]
fn non_string_detail_is_treated_as_field_error() {
    let body = ErrorBody::from_value(&json!({ "detail": 42 }));
    assert_eq!(body.field_messages().as_deref(), Some("42"));
}

#[test]
fn status_accessors() {
    let err = ApiError::Status { status: 404, body: ErrorBody::Empty };
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.body(), Some(&ErrorBody::Empty));
    assert!(!err.is_transport());

    let err = ApiError::Transport("connection refused".to_owned());
    assert_eq!(err.status(), None);
    assert!(err.is_transport());
}

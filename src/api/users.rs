use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::authorization::AuthorizedData;
use super::{
    AccessDto, ApiError, AppState, DataDownloadResponse, FieldErrorDto, LoginRequest,
    LoginResponse, MessageResponse, PasswordResetRequest, UserDto,
};
use crate::constants::SOURCE_API;
use crate::domain::UserId;
use crate::services::{AuthContext, Credentials};

/// Keys of the user-info body that a token source may not shadow.
const RESERVED_INFO_KEYS: [&str; 3] = ["status", "user", "source"];

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    header(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| header(headers, "x-real-ip"))
}

/// Body of `GET /api/v1/user/info`.
///
/// A non-empty `source` adds `"source": <name>` and `<name>: <source_data>`.
pub fn user_info_body(data: &AuthorizedData) -> Option<Value> {
    let user = data.user.as_ref()?;

    let mut body = Map::new();
    body.insert("status".to_string(), json!("ok"));
    body.insert("user".to_string(), json!(UserDto::from(user)));

    if let Some(source) = data.source.as_deref().filter(|s| !s.is_empty()) {
        body.insert("source".to_string(), json!(source));
        if RESERVED_INFO_KEYS.contains(&source) {
            warn!(source, "Token source collides with a reserved key, payload omitted");
        } else {
            body.insert(
                source.to_string(),
                data.source_data.clone().unwrap_or(Value::Null),
            );
        }
    }

    Some(Value::Object(body))
}

/// GET /api/v1/user/info
pub async fn user_info(data: Option<Extension<AuthorizedData>>) -> Response {
    let data = data.map(|Extension(d)| d).unwrap_or_default();

    match user_info_body(&data) {
        Some(body) => (StatusCode::OK, Json(body)).into_response(),
        None => ApiError::cannot_authorize().into_response(),
    }
}

/// POST /api/v1/users/login
/// Authenticate with e-mail and password, returns an access token on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let context = AuthContext {
        source: payload
            .source
            .clone()
            .unwrap_or_else(|| SOURCE_API.to_string()),
        api: true,
        ip: client_ip(&headers),
        user_agent: header(&headers, "user-agent"),
    };

    let user = state
        .shared
        .authenticator
        .authenticate(
            Credentials::password(payload.email, payload.password),
            &context,
        )
        .await?;

    let token = state
        .store()
        .create_access_token(user.id, payload.source, payload.source_data)
        .await?;

    info!(user_id = user.id, source = %context.source, "Access token issued");

    Ok(Json(LoginResponse {
        status: "ok",
        user: UserDto::from(&user),
        access: AccessDto { token: token.token },
    }))
}

/// POST /api/v1/users/password-reset
pub async fn password_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let factory = state.shared.request_password_form_factory();
    let mut form = factory.create();
    form.fill(&HashMap::from([("email".to_string(), payload.email)]));

    if factory.submit(&mut form).await? {
        Ok(Json(MessageResponse::ok("Password reset requested")))
    } else {
        let errors = form
            .error_list()
            .into_iter()
            .map(|(field, message)| FieldErrorDto { field, message })
            .collect();
        Err(ApiError::FormErrors(errors))
    }
}

/// GET /api/v1/user/data-download
pub async fn data_download(
    State(state): State<Arc<AppState>>,
    data: Option<Extension<AuthorizedData>>,
) -> Result<Json<DataDownloadResponse>, ApiError> {
    let user = data
        .and_then(|Extension(d)| d.user)
        .ok_or_else(ApiError::cannot_authorize)?;

    let export = state
        .shared
        .user_data
        .download_all(UserId::new(user.id))
        .await?;

    Ok(Json(DataDownloadResponse {
        status: "ok",
        data: export,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::User;
    use crate::domain::Role;

    fn user() -> User {
        User {
            id: 9,
            email: "jane@example.com".into(),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            active: true,
            confirmed_at: None,
            role: Role::User,
            is_institution: false,
            institution_name: None,
            ext_id: None,
            source: "web".into(),
            current_sign_in_at: None,
            last_sign_in_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn no_user_means_no_body() {
        assert!(user_info_body(&AuthorizedData::default()).is_none());
    }

    #[test]
    fn plain_user_info() {
        let body = user_info_body(&AuthorizedData {
            user: Some(user()),
            ..AuthorizedData::default()
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "status": "ok",
                "user": {
                    "id": 9,
                    "email": "jane@example.com",
                    "first_name": "Jane",
                    "last_name": "Doe"
                }
            })
        );
    }

    #[test]
    fn source_data_is_passed_through() {
        let body = user_info_body(&AuthorizedData {
            user: Some(user()),
            source: Some("ios".into()),
            source_data: Some(json!({ "device": "iPhone", "build": 42 })),
        })
        .unwrap();

        assert_eq!(body["source"], "ios");
        assert_eq!(body["ios"], json!({ "device": "iPhone", "build": 42 }));
    }

    #[test]
    fn empty_source_is_ignored() {
        let body = user_info_body(&AuthorizedData {
            user: Some(user()),
            source: Some(String::new()),
            source_data: Some(json!(1)),
        })
        .unwrap();

        assert!(body.get("source").is_none());
    }

    #[test]
    fn reserved_source_cannot_replace_user() {
        let body = user_info_body(&AuthorizedData {
            user: Some(user()),
            source: Some("user".into()),
            source_data: Some(json!("spoofed")),
        })
        .unwrap();

        assert_eq!(body["source"], "user");
        assert_eq!(body["user"]["id"], 9);
    }

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.2"));

        headers.insert("x-forwarded-for", "203.0.113.5, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.5"));
    }
}

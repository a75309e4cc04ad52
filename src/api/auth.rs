use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use super::extract::JsonBody;
use super::{ApiError, AppState};
use crate::db::User;
use crate::domain::Role;
use crate::services::{IssuedCredentials, Subject, require_role};

pub const ACCESS_COOKIE: &str = "depot_access";
pub const REFRESH_COOKIE: &str = "depot_refresh";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Cookies
// ============================================================================

/// Reads the access and refresh credentials from the `Cookie` headers.
fn credentials_from(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let mut access = None;
    let mut refresh = None;

    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(raw).flatten() {
            match cookie.name() {
                ACCESS_COOKIE => access = Some(cookie.value().to_string()),
                REFRESH_COOKIE => refresh = Some(cookie.value().to_string()),
                _ => {}
            }
        }
    }

    (access, refresh)
}

fn build_cookie(name: &'static str, value: String, ttl: Duration, secure: bool) -> String {
    let max_age = time::Duration::seconds(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX));

    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
        .to_string()
}

fn append_cookie(headers: &mut HeaderMap, cookie: &str) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::internal(format!("Invalid cookie header: {e}")))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

fn set_credentials(
    headers: &mut HeaderMap,
    credentials: IssuedCredentials,
    secure: bool,
) -> Result<(), ApiError> {
    append_cookie(
        headers,
        &build_cookie(
            ACCESS_COOKIE,
            credentials.access,
            credentials.access_ttl,
            secure,
        ),
    )?;
    append_cookie(
        headers,
        &build_cookie(
            REFRESH_COOKIE,
            credentials.refresh,
            credentials.refresh_ttl,
            secure,
        ),
    )
}

fn clear_credentials(headers: &mut HeaderMap, secure: bool) -> Result<(), ApiError> {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        append_cookie(
            headers,
            &build_cookie(name, String::new(), Duration::ZERO, secure),
        )?;
    }
    Ok(())
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves the caller from the credential cookies and stores the
/// [`Subject`] in the request extensions. An expired access credential is
/// renewed from the refresh credential and the new pair is set on the
/// response.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (access, refresh) = credentials_from(request.headers());
    if access.is_none() && refresh.is_none() {
        return Err(ApiError::unauthorized());
    }

    let validated = state
        .identity()
        .validate(access.as_deref(), refresh.as_deref())
        .await?;

    tracing::Span::current().record("user_id", validated.subject.user_id);
    request.extensions_mut().insert(validated.subject);

    let mut response = next.run(request).await;

    if let Some(credentials) = validated.renewed {
        set_credentials(
            response.headers_mut(),
            credentials,
            state.config().server.secure_cookies,
        )?;
    }

    Ok(response)
}

/// Rejects callers without the admin role. Must run inside
/// [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let subject = request
        .extensions()
        .get::<Subject>()
        .ok_or_else(ApiError::unauthorized)?;
    require_role(subject, &[Role::Admin])?;

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let outcome = state
        .identity()
        .authenticate(&payload.username, &payload.password)
        .await?;

    let mut response = Json(outcome.user).into_response();
    set_credentials(
        response.headers_mut(),
        outcome.credentials,
        state.config().server.secure_cookies,
    )?;

    Ok(response)
}

/// POST /auth/logout
/// Revokes whatever credentials the caller presents and clears the cookies.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (access, refresh) = credentials_from(&headers);
    for credential in access.iter().chain(refresh.iter()) {
        state.identity().revoke(credential).await;
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    clear_credentials(response.headers_mut(), state.config().server.secure_cookies)?;

    Ok(response)
}

/// GET /api/user
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(subject): Extension<Subject>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.user_service().get(subject.user_id).await?))
}

/// GET /api/roles
pub async fn list_roles() -> Json<Vec<Role>> {
    Json(Role::ALL.to_vec())
}

//! Admin session middleware
//!
//! The admin session lives in a signed token carried by the
//! [`SESSION_COOKIE_NAME`] cookie. Admin routes are wrapped with
//! [`require_admin`], which validates the token and makes an
//! [`AdminSession`] available to handlers.

use axum::{
    extract::{State, Request},
    middleware::Next,
    response::Response,
    http::{header::COOKIE, HeaderMap},
};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use cookie::{Cookie, CookieJar};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{AppState, AppError};
use crate::handlers::auth::{Claims, ADMIN_SUBJECT};

pub const SESSION_COOKIE_NAME: &str = "nursery_admin";

/// Authenticated admin session extracted from the cookie
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub expires_at: DateTime<Utc>,
}

/// Middleware: Require a valid admin session cookie
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(req.headers()).ok_or(AppError::Unauthorized)?;

    let session = verify_session_token(&token, &state.config.session_secret)
        .map_err(|e| {
            tracing::debug!("Rejected admin session: {}", e);
            e
        })?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

/// Decode and validate a session token
pub fn verify_session_token(token: &str, secret: &str) -> Result<AdminSession, AppError> {
    let mut validation = Validation::default();
    validation.sub = Some(ADMIN_SUBJECT.to_string());

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?
    .claims;

    let expires_at = DateTime::from_timestamp(claims.exp as i64, 0).ok_or(AppError::TokenInvalid)?;

    Ok(AdminSession { expires_at })
}

/// Session token from the request cookies, if present
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookies(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Collect every `Cookie` header; later values win on duplicate names
fn parse_cookies(headers: &HeaderMap) -> CookieJar {
    let mut cookies = CookieJar::new();
    for header in headers.get_all(COOKIE) {
        let raw = match header.to_str() {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        for chunk in raw.split(';').map(str::trim) {
            if let Ok(cookie) = Cookie::parse(chunk) {
                cookies.add_original(cookie.into_owned());
            }
        }
    }
    cookies
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

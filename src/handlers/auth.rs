//! Admin authentication handlers

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    Json,
};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::{AppState, AppResult, AppError, AppJson};
use crate::middleware::auth::{session_token, verify_session_token, SESSION_COOKIE_NAME};

/// The single back-office account
pub const ADMIN_SUBJECT: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Always ADMIN_SUBJECT
    pub exp: usize,       // Expiration timestamp
    pub iat: usize,       // Issued at
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub authenticated: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    if !verify_admin_password(&state.config.admin_password_hash, &req.password) {
        tracing::warn!("Failed admin login attempt");
        return Err(AppError::InvalidCredentials);
    }

    let ttl_hours = state.config.session_ttl_hours;
    let (token, expires_at) = issue_session_token(&state.config.session_secret, ttl_hours)?;
    let cookie = session_cookie(token, ttl_hours, state.config.is_production());

    tracing::info!("Admin logged in, session expires at {}", expires_at);

    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(SessionInfo {
            authenticated: true,
            expires_at: Some(expires_at),
        }),
    ))
}

/// Logout endpoint; always clears the cookie
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut cookie = session_cookie(String::new(), 0, state.config.is_production());
    cookie.make_removal();

    (
        [(SET_COOKIE, cookie.to_string())],
        Json(SessionInfo {
            authenticated: false,
            expires_at: None,
        }),
    )
}

/// Report whether the caller holds a valid admin session
pub async fn session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionInfo> {
    let session = session_token(&headers)
        .and_then(|token| verify_session_token(&token, &state.config.session_secret).ok());

    Json(SessionInfo {
        authenticated: session.is_some(),
        expires_at: session.map(|s| s.expires_at),
    })
}

/// Check `password` against the configured argon2 PHC hash. A missing or
/// malformed hash rejects every password.
pub fn verify_admin_password(stored_hash: &str, password: &str) -> bool {
    if stored_hash.trim().is_empty() {
        tracing::warn!("ADMIN_PASSWORD_HASH is not set; admin login is disabled");
        return false;
    }

    let parsed_hash = match PasswordHash::new(stored_hash.trim()) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("ADMIN_PASSWORD_HASH is not a valid PHC string: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a signed session token valid for `ttl_hours`
pub fn issue_session_token(secret: &str, ttl_hours: u64) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let exp = now + Duration::hours(ttl_hours as i64);

    let claims = Claims {
        sub: ADMIN_SUBJECT.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes())
    ).map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok((token, exp))
}

fn session_cookie(token: String, ttl_hours: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::hours(ttl_hours as i64))
        .build()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use argon2::{Algorithm, Params, Version};

    /// Low-cost argon2id hash; parameters travel in the PHC string
    pub(crate) fn cheap_hash(password: &str) -> String {
        let params = Params::new(8, 1, 1, None).unwrap();
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn password_verification() {
        let hash = cheap_hash("bluebonnet");
        assert!(verify_admin_password(&hash, "bluebonnet"));
        assert!(!verify_admin_password(&hash, "Bluebonnet"));
        assert!(!verify_admin_password(&hash, ""));
    }

    #[test]
    fn unusable_hash_rejects_everything() {
        assert!(!verify_admin_password("", "anything"));
        assert!(!verify_admin_password("   ", ""));
        assert!(!verify_admin_password("$2a$12$not-an-argon2-hash", "anything"));
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("tok".into(), 8, true).to_string();
        assert!(cookie.starts_with("nursery_admin=tok"), "{cookie}");
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Strict"), "{cookie}");
        assert!(cookie.contains("Secure"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
        assert!(cookie.contains("Max-Age=28800"), "{cookie}");

        let dev = session_cookie("tok".into(), 8, false).to_string();
        assert!(!dev.contains("Secure"), "{dev}");
    }

    #[test]
    fn token_expiry_follows_ttl() {
        let before = Utc::now();
        let (_, expires_at) = issue_session_token("secret", 2).unwrap();
        let ttl = expires_at - before;
        assert!(ttl >= Duration::minutes(119) && ttl <= Duration::minutes(121));
    }
}

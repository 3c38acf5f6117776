use super::roles::Role;
use super::site::Site;
use crate::store::User;
use axum::Json;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{self, Cookie};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CookieConf {
    pub name: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

impl Default for CookieConf {
    fn default() -> Self {
        CookieConf {
            name: "".to_string(),
            path: "/".to_string(),
            http_only: true,
            secure: true,
            same_site: "Lax".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConf {
    /// Access token lifetime in seconds.
    pub access_ttl: i64,
    pub access_cookie: Option<CookieConf>,
    /// PBKDF2 rounds for new password hashes.
    pub password_iterations: u32,
}

impl Default for AuthConf {
    fn default() -> Self {
        AuthConf {
            access_ttl: 86_400,
            access_cookie: Some(CookieConf {
                name: "access_token".to_string(),
                ..Default::default()
            }),
            password_iterations: crate::passwords::DEFAULT_ITERATIONS,
        }
    }
}

fn extract_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(header::AUTHORIZATION)?;
    let value = header.as_bytes();
    if value.len() > 7 && value[..7].eq_ignore_ascii_case(b"Bearer ") {
        std::str::from_utf8(&value[7..]).ok().map(str::trim)
    } else {
        None
    }
}

fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Clone)]
pub struct Authenticator {
    access_ttl: i64,
    access_cookie_conf: Option<CookieConf>,
    access_cookie_same_site: cookie::SameSite,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("access_ttl", &self.access_ttl)
            .field("access_cookie_conf", &self.access_cookie_conf)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

fn get_cookie_same_site(cookie_conf: &Option<CookieConf>) -> cookie::SameSite {
    match cookie_conf.as_ref().map(|c| c.same_site.to_lowercase()).as_deref() {
        Some("strict") => cookie::SameSite::Strict,
        Some("none") => cookie::SameSite::None,
        _ => cookie::SameSite::Lax,
    }
}

impl Authenticator {
    pub fn new(conf: &AuthConf, secret_key: &str) -> Self {
        let secret_key = secret_key.as_bytes();
        let algorithm = Algorithm::HS256;
        let access_cookie_conf = conf.access_cookie.clone();

        Self {
            access_ttl: conf.access_ttl,
            access_cookie_same_site: get_cookie_same_site(&access_cookie_conf),
            access_cookie_conf,
            algorithm,
            encoding_key: EncodingKey::from_secret(secret_key),
            decoding_key: DecodingKey::from_secret(secret_key),
            validation: Validation::new(algorithm),
        }
    }

    pub fn encode(&self, item: &JWTClaim) -> Result<String, AuthError> {
        let header = jsonwebtoken::Header::new(self.algorithm);
        encode(&header, item, &self.encoding_key).map_err(|e| AuthError::from(&e))
    }

    pub fn decode(&self, token: &str) -> Result<JWTClaim, AuthError> {
        decode::<JWTClaim>(token, &self.decoding_key, &self.validation)
            .map(|o| o.claims)
            .map_err(|e| AuthError::from(&e))
    }

    /// Signs a fresh access token for `user`.
    pub fn issue_token(&self, user: &AuthUser) -> Result<String, AuthError> {
        self.encode(&JWTClaim::new(user, self.access_ttl))
    }

    /// Reads the bearer token, falling back to the access cookie.
    pub fn extract_claims(&self, parts: &Parts) -> Result<JWTClaim, AuthError> {
        let token = extract_token(parts)
            .map(|t| t.to_owned())
            .or_else(|| {
                self.access_cookie_conf
                    .as_ref()
                    .and_then(|c| {
                        CookieJar::from_headers(&parts.headers)
                            .get(&c.name)
                            .map(|c| c.value().to_owned())
                    })
            })
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.decode(&token)
    }

    pub fn extract_user(&self, parts: &Parts) -> Result<AuthUser, AuthError> {
        self.extract_claims(parts).map(JWTClaim::into_auth_user)
    }

    /// Attaches the access cookie, when one is configured.
    pub fn login(&self, token: &str, resp: &mut Response) {
        if let Some(conf) = &self.access_cookie_conf {
            let c = Cookie::build((conf.name.as_str(), token))
                .path(conf.path.as_str())
                .max_age(time::Duration::seconds(self.access_ttl))
                .http_only(conf.http_only)
                .same_site(self.access_cookie_same_site)
                .secure(conf.secure)
                .build();
            set_cookie(resp, c);
        }
    }

    pub fn logout(&self, resp: &mut Response) {
        if let Some(conf) = &self.access_cookie_conf {
            let c = Cookie::build((conf.name.as_str(), ""))
                .path(conf.path.as_str())
                .max_age(time::Duration::seconds(0))
                .build();
            set_cookie(resp, c);
        }
    }
}

fn set_cookie(resp: &mut Response, c: Cookie<'_>) {
    match c.to_string().parse() {
        Ok(hv) => {
            resp.headers_mut().append(header::SET_COOKIE, hv);
        }
        Err(err) => {
            tracing::error!(error = %err, "cookie is not a valid header value");
            *resp = AuthError::Internal(err.to_string()).into_response();
        }
    }
}

/// The acting user, as carried by the token. Trusted without a store lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JWTClaim {
    #[serde(default)]
    pub jti: String,
    #[serde(default)]
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(flatten)]
    pub user: AuthUser,
}

impl JWTClaim {
    pub fn new(user: &AuthUser, ttl: i64) -> Self {
        let now = unix_timestamp();
        Self {
            jti: Uuid::new_v4().to_string(),
            sub: user.id.to_string(),
            iat: now,
            exp: now + ttl,
            user: user.clone(),
        }
    }

    fn into_auth_user(self) -> AuthUser {
        self.user
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid or expired token")]
    ExpiredToken,
    #[error("Invalid or expired token")]
    InvalidSignature,
    #[error("Unauthorized access")]
    Forbidden,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::InvalidSignature
            | AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<&jsonwebtoken::errors::Error> for AuthError {
    fn from(err: &jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidToken,
            _ => AuthError::Internal(err.to_string()),
        }
    }
}

impl axum::extract::FromRequestParts<Site> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, site: &Site) -> Result<Self, Self::Rejection> {
        match site.authenticator().extract_user(parts) {
            Ok(user) => Ok(user),
            Err(err) => {
                tracing::debug!(error = %err, path = %parts.uri.path(), "authentication failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn authenticator(ttl: i64) -> Authenticator {
        let conf = AuthConf {
            access_ttl: ttl,
            ..Default::default()
        };
        Authenticator::new(&conf, "test-secret")
    }

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "admin@example.com".into(),
            role: Role::Admin,
        }
    }

    fn parts(name: header::HeaderName, value: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri("/api/forms")
            .header(name, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn bearer_token_round_trips_claims() {
        let auth = authenticator(60);
        let user = user();
        let token = auth.issue_token(&user).unwrap();

        let claims = auth
            .extract_claims(&parts(header::AUTHORIZATION, &format!("Bearer {token}")))
            .unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.exp - claims.iat, 60);
        assert_eq!(claims.user, user);
    }

    #[test]
    fn cookie_is_a_fallback() {
        let auth = authenticator(60);
        let token = auth.issue_token(&user()).unwrap();
        let found = auth
            .extract_user(&parts(header::COOKIE, &format!("access_token={token}")))
            .unwrap();
        assert_eq!(found.role, Role::Admin);
    }

    #[test]
    fn missing_and_bad_tokens() {
        let auth = authenticator(60);
        let err = auth.extract_user(&parts(header::ACCEPT, "*/*")).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = auth
            .extract_user(&parts(header::AUTHORIZATION, "Bearer not.a.token"))
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Invalid or expired token");

        let foreign = Authenticator::new(&AuthConf::default(), "other-secret")
            .issue_token(&user())
            .unwrap();
        let err = auth
            .extract_user(&parts(header::AUTHORIZATION, &format!("Bearer {foreign}")))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = authenticator(-3600);
        let token = auth.issue_token(&user()).unwrap();
        let err = auth
            .extract_user(&parts(header::AUTHORIZATION, &format!("Bearer {token}")))
            .unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));
    }

    #[test]
    fn login_and_logout_set_cookies() {
        let auth = authenticator(60);
        let mut resp = StatusCode::OK.into_response();
        auth.login("abc", &mut resp);
        auth.logout(&mut resp);

        let cookies: Vec<_> = resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("access_token=abc"));
        assert!(cookies[1].contains("Max-Age=0"));
    }
}

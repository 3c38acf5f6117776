use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};

use super::Body;
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult, StorageContext as _};
use crate::roles::Role;
use crate::site::Site;
use crate::store::NewUser;
use crate::validation::{Validate, ValidationReport};
use crate::validators;

pub fn router() -> Router<Site> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::empty();
        let email = normalize_email(&self.email);
        if report.check("email", "Email", validators::non_empty(&email)) {
            report.check("email", "Email", validators::email(&email));
        }
        report.check("password", "Password", validators::min_chars(6)(&self.password));
        report.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub user: AuthUser,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_response(site: &Site, user: AuthUser) -> ApiResult<Response> {
    let token = site.authenticator().issue_token(&user)?;
    let mut resp = Json(Session {
        user,
        token: token.clone(),
    })
    .into_response();
    site.authenticator().login(&token, &mut resp);
    Ok(resp)
}

async fn signup(site: Site, Body(req): Body<SignupRequest>) -> ApiResult<Response> {
    req.validate().map_err(ApiError::Validation)?;
    let email = normalize_email(&req.email);
    let role = req.role.unwrap_or_default();
    tracing::info!(%email, %role, "signup request received");

    let store = site.store();
    if store
        .find_user_by_email(&email)
        .await
        .or_fail("Failed to create account")?
        .is_some()
    {
        tracing::warn!(%email, "signup failed: email already registered");
        return Err(ApiError::EmailTaken);
    }

    let password_hash = site.hasher().hash_blocking(req.password).await?;
    let user = match store
        .create_user(NewUser {
            email,
            password_hash,
            role,
        })
        .await
    {
        Ok(user) => user,
        Err(err) if err.is_unique_violation() => return Err(ApiError::EmailTaken),
        Err(err) => return Err(err).or_fail("Failed to create account"),
    };

    tracing::info!(user_id = %user.id, email = %user.email, "user created");
    session_response(&site, AuthUser::from(&user))
}

async fn login(site: Site, Body(req): Body<LoginRequest>) -> ApiResult<Response> {
    let email = normalize_email(&req.email);
    tracing::info!(%email, "login request received");

    let Some(user) = site
        .store()
        .find_user_by_email(&email)
        .await
        .or_fail("Failed to log in")?
    else {
        tracing::warn!(%email, "login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    let valid = site
        .hasher()
        .verify_blocking(req.password, user.password_hash.clone())
        .await?;
    if !valid {
        tracing::warn!(%email, "login failed: invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "user logged in");
    session_response(&site, AuthUser::from(&user))
}

async fn me(site: Site, user: AuthUser) -> ApiResult<Json<AuthUser>> {
    let stored = site
        .store()
        .find_user(user.id)
        .await
        .or_fail("Failed to get user information")?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(AuthUser::from(&stored)))
}

async fn logout(site: Site) -> Response {
    let mut resp = (StatusCode::OK, Json(serde_json::json!({ "message": "Logged out" }))).into_response();
    site.authenticator().logout(&mut resp);
    resp
}

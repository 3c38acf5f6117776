//! HTTP surface: JSON routes under `/api` plus a health probe.

mod auth;
mod forms;

use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::errors::ApiError;
use crate::site::Site;

pub fn router() -> Router<Site> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::router())
        .nest("/api/forms", forms::router())
        .fallback(not_found)
}

async fn health(site: Site) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "uptime": site.uptime().as_secs_f64(),
    }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}

/// `Json<T>` whose rejections render as [`ApiError::BadRequest`].
pub struct Body<T>(pub T);

impl<S, T> FromRequest<S> for Body<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "rejected request body");
                Err(ApiError::from(rejection))
            }
        }
    }
}

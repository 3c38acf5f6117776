use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::Body;
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult, StorageContext as _};
use crate::forms::{RawField, normalize_all, validate_submission};
use crate::roles::AdminOnly;
use crate::site::Site;
use crate::store::{
    Form, FormFilter, FormSummary, FormUpdate, NewForm, NewSubmission, Submission,
    SubmissionEntry,
};

pub fn router() -> Router<Site> {
    Router::new()
        .route("/", get(list_forms).post(create_form))
        .route("/{id}", get(get_form).put(update_form).delete(delete_form))
        .route("/{id}/submit", axum::routing::post(submit_form))
        .route("/{id}/submissions", get(list_submissions))
}

#[derive(Debug, Deserialize)]
pub struct CreateFormRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFormRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub responses: Map<String, Value>,
}

fn form_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Form"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Loads a form and checks that `user` may see it: admins only see their own.
async fn visible_form(site: &Site, user: &AuthUser, raw_id: &str, failure: &'static str) -> ApiResult<Form> {
    let form = site
        .store()
        .get_form(form_id(raw_id)?)
        .await
        .or_fail(failure)?
        .ok_or(ApiError::NotFound("Form"))?;
    if user.is_admin() && form.creator_id != user.id {
        tracing::warn!(user_id = %user.id, form_id = %form.id, "form belongs to another admin");
        return Err(ApiError::Forbidden);
    }
    Ok(form)
}

async fn list_forms(site: Site, user: AuthUser) -> ApiResult<Json<Vec<FormSummary>>> {
    let filter = if user.is_admin() {
        FormFilter::CreatedBy(user.id)
    } else {
        FormFilter::All
    };
    let forms = site
        .store()
        .list_forms(filter)
        .await
        .or_fail("Failed to fetch forms")?;
    Ok(Json(forms))
}

async fn create_form(
    site: Site,
    admin: AdminOnly,
    Body(req): Body<CreateFormRequest>,
) -> ApiResult<(StatusCode, Json<Form>)> {
    let fields = normalize_all(&req.fields, &[])?;
    let form = site
        .store()
        .create_form(NewForm {
            title: req.title,
            description: non_empty(req.description),
            creator_id: admin.id,
            fields,
        })
        .await
        .or_fail("Failed to create form")?;
    tracing::info!(form_id = %form.id, creator_id = %admin.id, fields = form.fields.len(), "form created");
    Ok((StatusCode::CREATED, Json(form)))
}

async fn get_form(site: Site, user: AuthUser, Path(id): Path<String>) -> ApiResult<Json<Form>> {
    visible_form(&site, &user, &id, "Failed to fetch form").await.map(Json)
}

async fn update_form(
    site: Site,
    admin: AdminOnly,
    Path(id): Path<String>,
    Body(req): Body<UpdateFormRequest>,
) -> ApiResult<Json<Form>> {
    let existing = visible_form(&site, &admin, &id, "Failed to update form").await?;
    let fields = normalize_all(&req.fields, &existing.fields)?;

    let update = FormUpdate {
        title: req.title,
        description: req.description,
        fields,
    };
    let form = site
        .store()
        .replace_form(existing.id, update)
        .await
        .or_fail("Failed to update form")?
        .ok_or(ApiError::NotFound("Form"))?;
    tracing::info!(form_id = %form.id, fields = form.fields.len(), "form updated");
    Ok(Json(form))
}

async fn delete_form(site: Site, admin: AdminOnly, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let form = visible_form(&site, &admin, &id, "Failed to delete form").await?;
    site.store()
        .delete_form(form.id)
        .await
        .or_fail("Failed to delete form")?;
    tracing::info!(form_id = %form.id, "form deleted");
    Ok(Json(json!({ "message": "Form deleted successfully" })))
}

async fn submit_form(
    site: Site,
    user: AuthUser,
    Path(id): Path<String>,
    Body(req): Body<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let form = site
        .store()
        .get_form(form_id(&id)?)
        .await
        .or_fail("Failed to submit form")?
        .ok_or(ApiError::NotFound("Form"))?;

    let responses = validate_submission(&form.fields, &req.responses).map_err(|report| {
        tracing::info!(form_id = %form.id, errors = report.len(), "submission failed validation");
        ApiError::Validation(report)
    })?;

    let submission = site
        .store()
        .create_submission(NewSubmission {
            form_id: form.id,
            user_id: user.id,
            responses,
        })
        .await
        .or_fail("Failed to submit form")?;
    tracing::info!(form_id = %form.id, submission_id = %submission.id, "form submitted");
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn list_submissions(
    site: Site,
    admin: AdminOnly,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<SubmissionEntry>>> {
    let form = visible_form(&site, &admin, &id, "Failed to fetch submissions").await?;
    let entries = site
        .store()
        .list_submissions(form.id)
        .await
        .or_fail("Failed to fetch submissions")?;
    Ok(Json(entries))
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::forms::Field;
use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Ordered by `index`.
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submission_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFilter {
    All,
    CreatedBy(Uuid),
}

impl FormFilter {
    pub fn matches(&self, creator_id: Uuid) -> bool {
        match self {
            FormFilter::All => true,
            FormFilter::CreatedBy(id) => *id == creator_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewForm {
    pub title: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    pub fields: Vec<Field>,
}

/// Replacement for a form's metadata and its whole field set. `None`
/// metadata keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct FormUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub form_id: Uuid,
    pub user_id: Uuid,
    pub responses: Map<String, Value>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub form_id: Uuid,
    pub user_id: Uuid,
    pub responses: Map<String, Value>,
}

/// A submission as its form's owner sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub submitted_at: DateTime<Utc>,
    pub responses: Map<String, Value>,
}

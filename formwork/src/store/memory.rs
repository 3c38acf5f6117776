use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{
    DbError, Form, FormFilter, FormStore, FormSummary, FormUpdate, NewForm, NewSubmission,
    NewUser, Submission, SubmissionEntry, SubmissionStore, User, UserStore,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    // Insertion order doubles as creation order.
    forms: Vec<Form>,
    submissions: Vec<Submission>,
}

/// In-process store for tests and `serve --memory`. Data lives as long as
/// the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let state = self.state.read();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.email == user.email) {
            return Err(DbError::unique("users_email_key"));
        }
        let user = User {
            id: Uuid::now_v7(),
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl FormStore for MemoryStore {
    async fn list_forms(&self, filter: FormFilter) -> Result<Vec<FormSummary>, DbError> {
        let state = self.state.read();
        let summaries = state
            .forms
            .iter()
            .rev()
            .filter(|form| filter.matches(form.creator_id))
            .map(|form| FormSummary {
                id: form.id,
                title: form.title.clone(),
                description: form.description.clone(),
                created_at: form.created_at,
                submission_count: state
                    .submissions
                    .iter()
                    .filter(|s| s.form_id == form.id)
                    .count() as i64,
            })
            .collect();
        Ok(summaries)
    }

    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, DbError> {
        let state = self.state.read();
        Ok(state.forms.iter().find(|f| f.id == id).cloned())
    }

    async fn create_form(&self, form: NewForm) -> Result<Form, DbError> {
        if !self.state.read().users.contains_key(&form.creator_id) {
            return Err(DbError::Integrity {
                kind: super::IntegrityKind::ForeignKey,
                constraint: Some("forms_creator_id_fkey".into()),
            });
        }
        let mut fields = form.fields;
        fields.sort_by_key(|f| f.index);
        let form = Form {
            id: Uuid::now_v7(),
            title: form.title,
            description: form.description,
            creator_id: form.creator_id,
            created_at: Utc::now(),
            fields,
        };
        self.state.write().forms.push(form.clone());
        Ok(form)
    }

    async fn replace_form(&self, id: Uuid, update: FormUpdate) -> Result<Option<Form>, DbError> {
        let mut state = self.state.write();
        let Some(form) = state.forms.iter_mut().find(|f| f.id == id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            form.title = title;
        }
        if let Some(description) = update.description {
            form.description = Some(description);
        }
        form.fields = update.fields;
        form.fields.sort_by_key(|f| f.index);
        Ok(Some(form.clone()))
    }

    async fn delete_form(&self, id: Uuid) -> Result<bool, DbError> {
        let mut state = self.state.write();
        let before = state.forms.len();
        state.forms.retain(|f| f.id != id);
        let removed = state.forms.len() != before;
        if removed {
            state.submissions.retain(|s| s.form_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn create_submission(&self, submission: NewSubmission) -> Result<Submission, DbError> {
        let mut state = self.state.write();
        if !state.forms.iter().any(|f| f.id == submission.form_id) {
            return Err(DbError::Integrity {
                kind: super::IntegrityKind::ForeignKey,
                constraint: Some("form_submissions_form_id_fkey".into()),
            });
        }
        let submission = Submission {
            id: Uuid::now_v7(),
            form_id: submission.form_id,
            user_id: submission.user_id,
            responses: submission.responses,
            submitted_at: Utc::now(),
        };
        state.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn list_submissions(&self, form_id: Uuid) -> Result<Vec<SubmissionEntry>, DbError> {
        let state = self.state.read();
        let entries = state
            .submissions
            .iter()
            .rev()
            .filter(|s| s.form_id == form_id)
            .map(|s| SubmissionEntry {
                id: s.id,
                user_id: s.user_id,
                user_email: state
                    .users
                    .get(&s.user_id)
                    .map(|u| u.email.clone())
                    .unwrap_or_default(),
                submitted_at: s.submitted_at,
                responses: s.responses.clone(),
            })
            .collect();
        Ok(entries)
    }
}

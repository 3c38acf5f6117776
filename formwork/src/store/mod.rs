//! Persistence behind object-safe async traits, so handlers hold an
//! `Arc<dyn Store>` and never see the backend.

mod error;
mod memory;
mod models;
mod pg;

use async_trait::async_trait;
use uuid::Uuid;

pub use error::{DbError, IntegrityKind};
pub use memory::MemoryStore;
pub use models::{
    Form, FormFilter, FormSummary, FormUpdate, NewForm, NewSubmission, NewUser, Submission,
    SubmissionEntry, User,
};
pub use pg::PgStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Fails with a unique integrity error when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DbError>;
}

#[async_trait]
pub trait FormStore: Send + Sync {
    /// Newest first, with submission counts.
    async fn list_forms(&self, filter: FormFilter) -> Result<Vec<FormSummary>, DbError>;

    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, DbError>;

    async fn create_form(&self, form: NewForm) -> Result<Form, DbError>;

    /// Swaps metadata and the entire field set in one transaction and returns
    /// the stored result. `None` when the form does not exist.
    async fn replace_form(&self, id: Uuid, update: FormUpdate) -> Result<Option<Form>, DbError>;

    /// Removes the form with its fields and submissions.
    async fn delete_form(&self, id: Uuid) -> Result<bool, DbError>;
}

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_submission(&self, submission: NewSubmission) -> Result<Submission, DbError>;

    /// Newest first, joined with the submitter's email.
    async fn list_submissions(&self, form_id: Uuid) -> Result<Vec<SubmissionEntry>, DbError>;
}

pub trait Store: UserStore + FormStore + SubmissionStore {}

impl<T: UserStore + FormStore + SubmissionStore> Store for T {}

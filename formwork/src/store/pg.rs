use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    DbError, Form, FormFilter, FormStore, FormSummary, FormUpdate, NewForm, NewSubmission,
    NewUser, Submission, SubmissionEntry, SubmissionStore, User, UserStore,
};
use crate::forms::{Field, FieldOption, TableSchema, ValidationRules};
use crate::roles::Role;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects using `url`. The `max` and `min` query parameters size the
    /// pool (defaults 10 and 1).
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let parts = url
            .parse::<url::Url>()
            .map_err(|e| DbError::Fatal(sqlx::Error::Configuration(Box::new(e))))?;

        let mut query = HashMap::new();
        for (key, value) in parts.query_pairs() {
            query.insert(key.to_string(), value.to_string());
        }
        let max_connections = query
            .remove("max")
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let min_connections = query
            .remove("min")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let mut connect_url = parts.clone();
        connect_url.query_pairs_mut().clear().extend_pairs(query.iter());
        if query.is_empty() {
            connect_url.set_query(None);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(connect_url.as_str())
            .await?;
        tracing::info!(max_connections, min_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), DbError> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_fields<'e, E>(executor: E, form_id: Uuid) -> Result<Vec<Field>, DbError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, FieldRow>(
            "SELECT id, position, field_type, label, description, placeholder, required, \
             disabled, class_name, options, validation, table_data \
             FROM form_fields WHERE form_id = $1 ORDER BY position",
        )
        .bind(form_id)
        .fetch_all(executor)
        .await?;
        Ok(rows.into_iter().map(Field::from).collect())
    }

    async fn insert_fields(
        tx: &mut Transaction<'_, Postgres>,
        form_id: Uuid,
        fields: &[Field],
    ) -> Result<(), DbError> {
        for field in fields {
            sqlx::query(
                "INSERT INTO form_fields (form_id, id, position, field_type, label, description, \
                 placeholder, required, disabled, class_name, options, validation, table_data) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(form_id)
            .bind(&field.id)
            .bind(field.index as i32)
            .bind(&field.field_type)
            .bind(&field.label)
            .bind(&field.description)
            .bind(&field.placeholder)
            .bind(field.required)
            .bind(field.disabled)
            .bind(&field.class_name)
            .bind(field.options.as_ref().map(Json))
            .bind(field.validation.as_ref().map(Json))
            .bind(field.table_data.as_ref().map(Json))
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn fetch_form<'e, E>(executor: E, id: Uuid) -> Result<Option<FormRow>, DbError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        Ok(sqlx::query_as::<_, FormRow>(
            "SELECT id, title, description, creator_id, created_at FROM forms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?)
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, DbError> {
        let role = Role::from_str(&row.role)
            .map_err(|_| DbError::Decode(format!("unknown role {:?}", row.role)))?;
        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct FormRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    creator_id: Uuid,
    created_at: DateTime<Utc>,
}

impl FormRow {
    fn with_fields(self, fields: Vec<Field>) -> Form {
        Form {
            id: self.id,
            title: self.title,
            description: self.description,
            creator_id: self.creator_id,
            created_at: self.created_at,
            fields,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    submission_count: i64,
}

#[derive(FromRow)]
struct FieldRow {
    id: String,
    position: i32,
    field_type: String,
    label: String,
    description: Option<String>,
    placeholder: Option<String>,
    required: bool,
    disabled: bool,
    class_name: Option<String>,
    options: Option<Json<Vec<FieldOption>>>,
    validation: Option<Json<ValidationRules>>,
    table_data: Option<Json<TableSchema>>,
}

impl From<FieldRow> for Field {
    fn from(row: FieldRow) -> Self {
        Field {
            id: row.id,
            index: usize::try_from(row.position).unwrap_or_default(),
            field_type: row.field_type,
            label: row.label,
            description: row.description,
            placeholder: row.placeholder,
            required: row.required,
            disabled: row.disabled,
            class_name: row.class_name,
            options: row.options.map(|Json(o)| o),
            validation: row.validation.map(|Json(v)| v),
            table_data: row.table_data.map(|Json(t)| t),
        }
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: Uuid,
    form_id: Uuid,
    user_id: Uuid,
    responses: Json<Map<String, Value>>,
    submitted_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SubmissionEntryRow {
    id: Uuid,
    user_id: Uuid,
    user_email: String,
    submitted_at: DateTime<Utc>,
    responses: Json<Map<String, Value>>,
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, DbError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, password_hash, role) VALUES ($1, $2, $3, $4) \
             RETURNING id, email, password_hash, role, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_ref())
        .fetch_one(&self.pool)
        .await?;
        User::try_from(row)
    }
}

#[async_trait]
impl FormStore for PgStore {
    async fn list_forms(&self, filter: FormFilter) -> Result<Vec<FormSummary>, DbError> {
        let creator = match filter {
            FormFilter::All => None,
            FormFilter::CreatedBy(id) => Some(id),
        };
        let rows = sqlx::query_as::<_, SummaryRow>(
            "SELECT f.id, f.title, f.description, f.created_at, \
             (SELECT COUNT(*) FROM form_submissions s WHERE s.form_id = f.id) AS submission_count \
             FROM forms f WHERE $1::uuid IS NULL OR f.creator_id = $1 \
             ORDER BY f.created_at DESC",
        )
        .bind(creator)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FormSummary {
                id: row.id,
                title: row.title,
                description: row.description,
                created_at: row.created_at,
                submission_count: row.submission_count,
            })
            .collect())
    }

    async fn get_form(&self, id: Uuid) -> Result<Option<Form>, DbError> {
        let Some(row) = Self::fetch_form(&self.pool, id).await? else {
            return Ok(None);
        };
        let fields = Self::fetch_fields(&self.pool, id).await?;
        Ok(Some(row.with_fields(fields)))
    }

    async fn create_form(&self, form: NewForm) -> Result<Form, DbError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, FormRow>(
            "INSERT INTO forms (id, title, description, creator_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, description, creator_id, created_at",
        )
        .bind(Uuid::now_v7())
        .bind(&form.title)
        .bind(&form.description)
        .bind(form.creator_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_fields(&mut tx, row.id, &form.fields).await?;
        let fields = Self::fetch_fields(&mut *tx, row.id).await?;
        tx.commit().await?;

        tracing::debug!(form_id = %row.id, fields = fields.len(), "form created");
        Ok(row.with_fields(fields))
    }

    async fn replace_form(&self, id: Uuid, update: FormUpdate) -> Result<Option<Form>, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FormRow>(
            "UPDATE forms SET title = COALESCE($2, title), description = COALESCE($3, description) \
             WHERE id = $1 RETURNING id, title, description, creator_id, created_at",
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM form_fields WHERE form_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::insert_fields(&mut tx, id, &update.fields).await?;
        let fields = Self::fetch_fields(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::debug!(form_id = %id, fields = fields.len(), "form replaced");
        Ok(Some(row.with_fields(fields)))
    }

    async fn delete_form(&self, id: Uuid) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM forms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    async fn create_submission(&self, submission: NewSubmission) -> Result<Submission, DbError> {
        let row = sqlx::query_as::<_, SubmissionRow>(
            "INSERT INTO form_submissions (id, form_id, user_id, responses) VALUES ($1, $2, $3, $4) \
             RETURNING id, form_id, user_id, responses, submitted_at",
        )
        .bind(Uuid::now_v7())
        .bind(submission.form_id)
        .bind(submission.user_id)
        .bind(Json(&submission.responses))
        .fetch_one(&self.pool)
        .await?;

        Ok(Submission {
            id: row.id,
            form_id: row.form_id,
            user_id: row.user_id,
            responses: row.responses.0,
            submitted_at: row.submitted_at,
        })
    }

    async fn list_submissions(&self, form_id: Uuid) -> Result<Vec<SubmissionEntry>, DbError> {
        let rows = sqlx::query_as::<_, SubmissionEntryRow>(
            "SELECT s.id, s.user_id, u.email AS user_email, s.submitted_at, s.responses \
             FROM form_submissions s JOIN users u ON u.id = s.user_id \
             WHERE s.form_id = $1 ORDER BY s.submitted_at DESC",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SubmissionEntry {
                id: row.id,
                user_id: row.user_id,
                user_email: row.user_email,
                submitted_at: row.submitted_at,
                responses: row.responses.0,
            })
            .collect())
    }
}

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityKind {
    Unique,
    ForeignKey,
    Check,
    NotNull,
    Exclusion,
    Other(String),
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("integrity violation ({kind:?}) on {}", constraint.as_deref().unwrap_or("unknown constraint"))]
    Integrity {
        kind: IntegrityKind,
        constraint: Option<String>,
    },
    #[error("record not found")]
    DoesNotExist,
    #[error("temporary database failure")]
    Temporary,
    #[error("stored document is malformed: {0}")]
    Decode(String),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("unhandled db error: {0}")]
    Fatal(sqlx::Error),
}

impl DbError {
    pub fn unique(constraint: &str) -> Self {
        DbError::Integrity {
            kind: IntegrityKind::Unique,
            constraint: Some(constraint.to_string()),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Integrity {
                kind: IntegrityKind::Unique,
                ..
            }
        )
    }

    pub const fn code(&self) -> &'static str {
        match self {
            DbError::Integrity { .. } => "integrity_violation",
            DbError::DoesNotExist => "not_found",
            DbError::Temporary => "temporary_error",
            DbError::Decode(_) => "decode_error",
            DbError::Migrate(_) => "migration_error",
            DbError::Fatal(_) => "fatal_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            DbError::Integrity { .. } => StatusCode::CONFLICT,
            DbError::DoesNotExist => StatusCode::NOT_FOUND,
            DbError::Temporary => StatusCode::SERVICE_UNAVAILABLE,
            DbError::Decode(_) | DbError::Migrate(_) | DbError::Fatal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => DbError::DoesNotExist,
            sqlx::Error::Database(db) => {
                let kind = match db.code().as_deref() {
                    Some("23505") => IntegrityKind::Unique,
                    Some("23503") => IntegrityKind::ForeignKey,
                    Some("23514") => IntegrityKind::Check,
                    Some("23502") => IntegrityKind::NotNull,
                    Some("23P01") => IntegrityKind::Exclusion,
                    _ => return DbError::Fatal(e),
                };
                DbError::Integrity {
                    kind,
                    constraint: db.constraint().map(|s| s.to_owned()),
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => {
                DbError::Temporary
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DbError::Decode(e.to_string())
            }
            _ => DbError::Fatal(e),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Decode(e.to_string())
    }
}

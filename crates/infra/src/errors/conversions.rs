//! Conversions from external infrastructure errors into domain errors.

use herdsync_domain::HerdSyncError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub HerdSyncError);

impl From<InfraError> for HerdSyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<HerdSyncError> for InfraError {
    fn from(value: HerdSyncError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoHerdSyncError {
    fn into_herdsync(self) -> HerdSyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → HerdSyncError */
/* -------------------------------------------------------------------------- */

impl IntoHerdSyncError for SqlError {
    fn into_herdsync(self) -> HerdSyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => HerdSyncError::Database("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        HerdSyncError::Database("database is locked".into())
                    }
                    ErrorCode::DiskFull => HerdSyncError::Database("disk is full".into()),
                    ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt => {
                        HerdSyncError::StoreCorruption(format!("database file unreadable: {message}"))
                    }
                    _ => HerdSyncError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                HerdSyncError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                HerdSyncError::Database(format!("invalid column type: {ty}"))
            }
            RE::Utf8Error(..) => {
                HerdSyncError::Database("invalid UTF-8 returned from sqlite".into())
            }
            RE::InvalidPath(path) => HerdSyncError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => HerdSyncError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_herdsync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → HerdSyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(HerdSyncError::Database(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → HerdSyncError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(HerdSyncError::Internal(format!("JSON encoding failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* tokio::task::JoinError → HerdSyncError */
/* -------------------------------------------------------------------------- */

impl From<tokio::task::JoinError> for InfraError {
    fn from(value: tokio::task::JoinError) -> Self {
        InfraError(HerdSyncError::Internal(format!("blocking task failed: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → HerdSyncError */
/* -------------------------------------------------------------------------- */

impl IntoHerdSyncError for HttpError {
    fn into_herdsync(self) -> HerdSyncError {
        if self.is_timeout() {
            return HerdSyncError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return HerdSyncError::Transport("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                408 | 429 | 500..=599 => HerdSyncError::Transport(message),
                400..=499 => HerdSyncError::Server { status: code, message },
                _ => HerdSyncError::Transport(message),
            };
        }

        HerdSyncError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_herdsync())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

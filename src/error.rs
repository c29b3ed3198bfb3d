use axum::http::StatusCode;
use sqlx::error::ErrorKind as DbErrorKind;
use tracing::{error, warn};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse failure class callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Infrastructure,
}

/// Error returned by every repository operation.
///
/// `context` always names the attempted operation and the identifiers involved;
/// store failures stay reachable through `source()`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{context}: not found")]
    NotFound { context: String },

    #[error("{context}: {reason}")]
    Conflict {
        context: String,
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("{context}: {reason}")]
    Validation {
        context: String,
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("{context}")]
    Infrastructure {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn not_found(context: impl Into<String>) -> Self {
        Self::NotFound {
            context: context.into(),
        }
    }

    pub fn conflict(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            context: context.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub fn validation(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            context: context.into(),
            reason: reason.into(),
            source: None,
        }
    }

    pub fn infrastructure(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Infrastructure {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Infrastructure { .. } => ErrorKind::Infrastructure,
        }
    }

    /// Wraps a raw `sqlx` failure, classifying constraint violations.
    pub fn from_sqlx(context: impl Into<String>, err: sqlx::Error) -> Self {
        let context = context.into();
        let classified = match &err {
            sqlx::Error::RowNotFound => return Self::NotFound { context },
            sqlx::Error::Database(db) => classify_violation(db.kind(), db.constraint(), db.message()),
            _ => None,
        };

        match classified {
            Some((ErrorKind::Conflict, reason)) => Self::Conflict {
                context,
                reason,
                source: Some(err),
            },
            Some((ErrorKind::Validation, reason)) => Self::Validation {
                context,
                reason,
                source: Some(err),
            },
            _ => Self::Infrastructure {
                context,
                source: Box::new(err),
            },
        }
    }
}

/// Maps a database constraint violation to a domain kind and a readable reason.
fn classify_violation(
    kind: DbErrorKind,
    constraint: Option<&str>,
    message: &str,
) -> Option<(ErrorKind, String)> {
    match kind {
        DbErrorKind::UniqueViolation => {
            let reason = match constraint {
                Some("orders_one_active_per_user") => "user already has an active order".to_string(),
                Some("users_username_key") => "username is already taken".to_string(),
                Some("products_name_key") => "product name is already taken".to_string(),
                Some(other) => format!("duplicate value violates {other}"),
                None => "duplicate value".to_string(),
            };
            Some((ErrorKind::Conflict, reason))
        }
        DbErrorKind::ForeignKeyViolation => {
            let reason = match constraint {
                Some("orders_user_id_fkey") => "user does not exist or still owns orders".to_string(),
                Some("order_products_product_id_fkey") => {
                    "product does not exist or is referenced by an order".to_string()
                }
                Some("order_products_order_id_fkey") => "order does not exist".to_string(),
                Some(other) => format!("reference violates {other}"),
                None => "reference violation".to_string(),
            };
            Some((ErrorKind::Conflict, reason))
        }
        DbErrorKind::CheckViolation | DbErrorKind::NotNullViolation => {
            Some((ErrorKind::Validation, message.to_string()))
        }
        _ => None,
    }
}

/// `.context()`-style helper for `sqlx` results.
pub trait StoreContext<T> {
    fn store_context<F, C>(self, context: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> StoreContext<T> for Result<T, sqlx::Error> {
    fn store_context<F, C>(self, context: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| StoreError::from_sqlx(context(), e))
    }
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Turns a repository error into the handler rejection, logging on the way out.
pub fn reject(err: StoreError) -> (StatusCode, String) {
    let status = err.status();
    if status.is_server_error() {
        error!(error = %err, source = ?std::error::Error::source(&err), "store failure");
        (status, "internal error".into())
    } else {
        warn!(error = %err, kind = ?err.kind(), "request rejected");
        (status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn row_not_found_becomes_not_found() {
        let err = StoreError::from_sqlx("get order 7", sqlx::Error::RowNotFound);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "get order 7: not found");
    }

    #[test]
    fn pool_timeout_is_infrastructure_with_cause() {
        let err = StoreError::from_sqlx("list products", sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.source().is_some());
    }

    #[test]
    fn active_order_index_reads_as_conflict() {
        let (kind, reason) = classify_violation(
            DbErrorKind::UniqueViolation,
            Some("orders_one_active_per_user"),
            "duplicate key",
        )
        .expect("classified");
        assert_eq!(kind, ErrorKind::Conflict);
        assert_eq!(reason, "user already has an active order");
    }

    #[test]
    fn foreign_key_violation_is_conflict() {
        let (kind, _) = classify_violation(
            DbErrorKind::ForeignKeyViolation,
            Some("order_products_product_id_fkey"),
            "fk",
        )
        .expect("classified");
        assert_eq!(kind, ErrorKind::Conflict);
    }

    #[test]
    fn check_violation_is_validation() {
        let (kind, reason) =
            classify_violation(DbErrorKind::CheckViolation, None, "quantity must be positive")
                .expect("classified");
        assert_eq!(kind, ErrorKind::Validation);
        assert_eq!(reason, "quantity must be positive");
        assert!(classify_violation(DbErrorKind::Other, None, "x").is_none());
    }

    #[test]
    fn caller_built_validation_has_no_cause() {
        let err = StoreError::validation("create product \"\"", "name is required");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.source().is_none());
    }

    #[test]
    fn reject_hides_infrastructure_details() {
        let err = StoreError::infrastructure("complete order 3", sqlx::Error::PoolTimedOut);
        let (status, body) = reject(err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "internal error");

        let (status, body) = reject(StoreError::conflict("add product 2 to order 3", "order is completed"));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, "add product 2 to order 3: order is completed");
    }
}

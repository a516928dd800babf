//! Conversions from external infrastructure errors into domain errors.

use std::io;

use orderflow_domain::OrderFlowError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use tokio::task::JoinError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub OrderFlowError);

impl From<InfraError> for OrderFlowError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<OrderFlowError> for InfraError {
    fn from(value: OrderFlowError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoOrderFlowError {
    fn into_orderflow(self) -> OrderFlowError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → OrderFlowError */
/* -------------------------------------------------------------------------- */

impl IntoOrderFlowError for SqlError {
    fn into_orderflow(self) -> OrderFlowError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        OrderFlowError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        OrderFlowError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        OrderFlowError::Database("foreign key constraint violation".into())
                    }
                    (ErrorCode::DiskFull, _) => OrderFlowError::Database("disk is full".into()),
                    _ => OrderFlowError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => OrderFlowError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                OrderFlowError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                OrderFlowError::Database(format!("invalid column type for {name}: {ty}"))
            }
            RE::InvalidPath(path) => OrderFlowError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => OrderFlowError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_orderflow())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → OrderFlowError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(OrderFlowError::Database(format!("connection pool: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → OrderFlowError */
/* -------------------------------------------------------------------------- */

impl IntoOrderFlowError for HttpError {
    fn into_orderflow(self) -> OrderFlowError {
        if self.is_timeout() {
            return OrderFlowError::Timeout("HTTP request timed out".into());
        }

        if self.is_connect() {
            return OrderFlowError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_decode() {
            return OrderFlowError::Schema(format!("failed to decode response body: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => OrderFlowError::NotFound(message),
                429 => OrderFlowError::Throttled { retry_after_secs: None },
                _ => OrderFlowError::Api { status: code, message },
            };
        }

        OrderFlowError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_orderflow())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / io / join errors */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(OrderFlowError::Schema(value.to_string()))
    }
}

impl From<io::Error> for InfraError {
    fn from(value: io::Error) -> Self {
        let error = match value.kind() {
            io::ErrorKind::TimedOut => OrderFlowError::Timeout(value.to_string()),
            _ => OrderFlowError::Internal(format!("I/O error: {value}")),
        };
        InfraError(error)
    }
}

impl From<JoinError> for InfraError {
    fn from(value: JoinError) -> Self {
        if value.is_cancelled() {
            InfraError(OrderFlowError::Internal("blocking task cancelled".into()))
        } else {
            InfraError(OrderFlowError::Internal(format!("blocking task failed: {value}")))
        }
    }
}

/// Convert any supported infrastructure error into the domain error.
pub fn to_domain<E>(err: E) -> OrderFlowError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

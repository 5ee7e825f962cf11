use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::HttpError,
    models::{jobmodel::JobStatus, quotemodel::QuoteStatus},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job {0} not found")]
    JobNotFound(Uuid),

    #[error("Quote {0} not found")]
    QuoteNotFound(Uuid),

    #[error("Job cannot move from {0:?} to {1:?}")]
    InvalidJobTransition(JobStatus, JobStatus),

    #[error("Quote cannot move from {0:?} to {1:?}")]
    InvalidQuoteTransition(QuoteStatus, QuoteStatus),

    #[error("Job {0} is not in status {1:?}")]
    InvalidJobStatus(Uuid, JobStatus),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User {0} is not authorized to perform this action")]
    Unauthorized(Uuid),

    #[error("The record was modified by another user. Please reload and try again.")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    /// Maps the postgres unique-violation on quotes(job_id, tradie_id) to
    /// the same user-facing message the pre-check produces.
    pub fn from_quote_insert(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return ServiceError::Validation(
                    "You have already submitted a quote for this job".to_string(),
                );
            }
        }
        ServiceError::Database(err)
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::JobNotFound(_) | ServiceError::QuoteNotFound(_) => {
                HttpError::not_found(error.to_string())
            }

            ServiceError::InvalidJobTransition(_, _)
            | ServiceError::InvalidQuoteTransition(_, _)
            | ServiceError::InvalidJobStatus(_, _)
            | ServiceError::Validation(_) => HttpError::bad_request(error.to_string()),

            ServiceError::Unauthorized(_) => HttpError::unauthorized(error.to_string()),

            ServiceError::ConcurrencyConflict => HttpError::conflict(error.to_string()),

            ServiceError::Database(ref db) => {
                tracing::error!("Database failure: {db}");
                HttpError::server_error("Server error. Please try again later")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn not_found_maps_to_404() {
        let err: HttpError = ServiceError::JobNotFound(Uuid::new_v4()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn guard_failures_map_to_400() {
        let err: HttpError =
            ServiceError::InvalidJobTransition(JobStatus::Posted, JobStatus::Completed).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: HttpError = ServiceError::Validation("nope".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn concurrency_conflict_maps_to_409() {
        let err: HttpError = ServiceError::ConcurrencyConflict.into();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[test]
    fn database_errors_keep_details_out_of_the_response() {
        let err: HttpError = ServiceError::Database(sqlx::Error::PoolClosed).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("Pool"));
    }
}

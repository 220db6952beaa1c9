use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::NaiveDate;
use serde_json::json;

use crate::{models::BookingStatus, store::StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("booking is {from} and cannot become {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("{time} on {date} is no longer available")]
    SlotUnavailable { date: NaiveDate, time: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidTransition { .. } | AppError::SlotUnavailable { .. } => {
                StatusCode::CONFLICT
            }
            AppError::Store(StoreError::QuotaExceeded { .. }) => StatusCode::INSUFFICIENT_STORAGE,
            AppError::Store(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        HttpResponse::build(status).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(AppError::NotFound("booking").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::validation("name required").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let transition = AppError::InvalidTransition {
            from: BookingStatus::Cancelled,
            to: BookingStatus::Scheduled,
        };
        assert_eq!(transition.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            transition.to_string(),
            "booking is cancelled and cannot become scheduled"
        );
    }
}

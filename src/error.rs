//! Errors surfaced by the booking core and their HTTP rendering.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::store::StoreError;

/// Any failure of a catalog, availability or order operation.
#[derive(thiserror::Error, Debug)]
#[rustfmt::skip]
pub enum BookingError {
    // --------
    // --- Client errors
    // --------

    /// A referenced record does not exist.
    #[error("{resource} with id `{id}` not found")]
    NotFound {
        resource: &'static str,
        id: ObjectId,
    },
    /// The requested place lies outside the hall.
    #[error("row {row}, seat {seat} is outside the hall bounds (rows 1..={rows}, seats 1..={seats_in_row})")]
    SeatOutOfRange {
        row: u32,
        seat: u32,
        rows: u32,
        seats_in_row: u32,
    },
    /// The place was sold by an earlier order.
    #[error("row {row}, seat {seat} is already taken for session `{movie_session}`")]
    SeatTaken {
        movie_session: ObjectId,
        row: u32,
        seat: u32,
    },
    /// The same order lists one place twice.
    #[error("row {row}, seat {seat} of session `{movie_session}` is requested more than once")]
    DuplicateSeatInRequest {
        movie_session: ObjectId,
        row: u32,
        seat: u32,
    },
    /// The order lost a race against a concurrent writer; retrying may succeed.
    #[error("the order conflicted with a concurrent booking, please retry")]
    TransactionConflict,
    /// An order must contain at least one ticket.
    #[error("an order must contain at least one ticket")]
    EmptyOrder,
    /// The session already has sold tickets.
    #[error("session `{0}` already has sold tickets")]
    SessionHasTickets(ObjectId),
    #[error("{0}")]
    InvalidInput(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("staff permissions required")]
    Forbidden,

    // --------
    // --- Internal errors
    // --------

    #[error(transparent)]
    Store(StoreError),
    /// A broken invariant, never the caller's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn not_found(resource: &'static str, id: ObjectId) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::SeatOutOfRange { .. }
            | Self::DuplicateSeatInRequest { .. }
            | Self::EmptyOrder
            | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::SeatTaken { .. } | Self::TransactionConflict | Self::SessionHasTickets(_) => {
                StatusCode::CONFLICT
            }
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::SeatOutOfRange { .. } => "SEAT_OUT_OF_RANGE",
            Self::SeatTaken { .. } => "SEAT_TAKEN",
            Self::DuplicateSeatInRequest { .. } => "DUPLICATE_SEAT_IN_REQUEST",
            Self::TransactionConflict => "TRANSACTION_CONFLICT",
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::SessionHasTickets(_) => "SESSION_HAS_TICKETS",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict)
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { key: Some(key) } => Self::SeatTaken {
                movie_session: key.movie_session_id,
                row: key.row,
                seat: key.seat,
            },
            StoreError::UniqueViolation { key: None } | StoreError::WriteConflict => {
                Self::TransactionConflict
            }
            other => Self::Store(other),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    retryable: bool,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            // Driver details stay in the logs.
            "internal server error".to_owned()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            code: self.code(),
            message,
            retryable: self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

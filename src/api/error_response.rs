//! Turns domain errors into HTTP responses
//!
//! [`ToHttpStatus`] picks the status code and wire code; the [`ApiError`]
//! envelope carries them as the JSON body.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let envelope: ApiError = self.into();
        (status, Json(envelope)).into_response()
    }
}

impl IntoResponse for ApiError {
    // A bare ApiError has no domain error to derive a status from, so it
    // answers 500. Handlers that know better pair it with a status themselves.
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

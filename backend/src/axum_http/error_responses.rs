use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::usecases::subscriptions::SubscriptionError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message: message.into(),
    });

    (status, body).into_response()
}

impl IntoResponse for SubscriptionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            // Don't leak internal error detail to client
            SubscriptionError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        error_response(status, message)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error type.
//!
//! [`ApiError`] is the only place internal errors become HTTP statuses.
//! Every error body has the shape `{ "ok": false, "error": ..., "code": ... }`.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::blockchain::client::ClientError;
use crate::withdrawal::{ValidationError, WithdrawalError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub retry_after: Option<Duration>,
}

/// Error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    /// Stable machine-readable error code.
    pub code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn bad_gateway(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, code, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    /// Rejected by the admission gate.
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(
                StatusCode::CONFLICT,
                "rate_limited",
                "too many withdrawals; retry later",
            )
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.code(), err.to_string())
    }
}

impl From<WithdrawalError> for ApiError {
    fn from(err: WithdrawalError) -> Self {
        let status = match &err {
            WithdrawalError::Validation(_) => StatusCode::BAD_REQUEST,
            WithdrawalError::DuplicateReference { .. }
            | WithdrawalError::HashExpired { .. }
            | WithdrawalError::InsufficientFunds(_) => StatusCode::CONFLICT,
            WithdrawalError::Rejected { .. }
            | WithdrawalError::Remote { .. }
            | WithdrawalError::Network(_) => StatusCode::BAD_GATEWAY,
            WithdrawalError::Build(_) | WithdrawalError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match &err {
            ClientError::Remote { .. } => ApiError::bad_gateway("remote_error", err.to_string()),
            ClientError::Network(_)
            | ClientError::Indeterminate(_)
            | ClientError::InvalidResponse(_) => {
                ApiError::bad_gateway("network_error", err.to_string())
            }
            ClientError::Configuration(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            ok: false,
            error: self.message,
            code: self.code.to_string(),
        });
        let mut response = (self.status, body).into_response();
        if let Some(retry_after) = self.retry_after {
            // Whole seconds, rounded up so clients never retry early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::FailureKind;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.code, "not_found");
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("invalid_amount", "bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.code, "invalid_amount");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("invalid_recipient", "bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(
            body,
            r#"{"ok":false,"error":"bad data","code":"invalid_recipient"}"#
        );
    }

    #[tokio::test]
    async fn rate_limited_sets_retry_after() {
        let response = ApiError::rate_limited(Duration::from_millis(12_300)).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[header::RETRY_AFTER], "13");
    }

    #[test]
    fn withdrawal_errors_map_to_statuses() {
        let cases = [
            (
                WithdrawalError::Validation(ValidationError::MissingAmount),
                StatusCode::BAD_REQUEST,
            ),
            (
                WithdrawalError::HashExpired { attempts: 2 },
                StatusCode::CONFLICT,
            ),
            (
                WithdrawalError::InsufficientFunds("low".into()),
                StatusCode::CONFLICT,
            ),
            (
                WithdrawalError::DuplicateReference {
                    reference: "r".into(),
                    holder: uuid::Uuid::nil(),
                },
                StatusCode::CONFLICT,
            ),
            (
                WithdrawalError::Rejected {
                    kind: FailureKind::ProgramRejected,
                    reason: "no".into(),
                    signature: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                WithdrawalError::Network("down".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                WithdrawalError::Internal("join".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let code = err.code();
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }
}

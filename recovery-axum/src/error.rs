use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use recovery::{Error, ResetError};
use thiserror::Error;

use crate::types::MessageResponse;

pub(crate) const INVALID_OTP: &str = "Incorrect email or OTP code.";
const LOCKED: &str = "Too many incorrect attempts. Please request a new OTP.";
const COOLDOWN: &str = "Please wait before requesting a new OTP.";
const RATE_LIMITED: &str = "Too many attempts. Please try again later.";
const ACCOUNT_NOT_FOUND: &str = "Email has not existed.";

/// The reset endpoints. Each has its own message for internal failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    RequestOtp,
    VerifyOtp,
    ResetPassword,
}

impl Endpoint {
    fn unavailable_message(self) -> &'static str {
        match self {
            Endpoint::RequestOtp => "Unable to process request.",
            Endpoint::VerifyOtp => "Unable to verify OTP.",
            Endpoint::ResetPassword => "Unable to reset password.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    TooManyRequests {
        message: String,
        /// Seconds, sent as `Retry-After`
        retry_after: Option<u64>,
    },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a service error to the response for `endpoint`. Internal causes are
    /// logged here and never reach the client.
    pub fn from_service(endpoint: Endpoint, err: Error) -> Self {
        match err {
            Error::Validation(err) => ApiError::BadRequest(err.message().to_string()),
            Error::Reset(err) => Self::from_reset(err),
            other => {
                tracing::error!(endpoint = ?endpoint, error = %other, "Reset request failed");
                ApiError::Internal(endpoint.unavailable_message().to_string())
            }
        }
    }

    fn from_reset(err: ResetError) -> Self {
        match err {
            ResetError::AccountNotFound => ApiError::NotFound(ACCOUNT_NOT_FOUND.to_string()),
            ResetError::InvalidOtp {
                remaining: Some(remaining),
            } => ApiError::BadRequest(format!(
                "{INVALID_OTP} You have {remaining} attempts left."
            )),
            ResetError::InvalidOtp { remaining: None } => {
                ApiError::BadRequest(INVALID_OTP.to_string())
            }
            ResetError::Locked => ApiError::TooManyRequests {
                message: LOCKED.to_string(),
                retry_after: None,
            },
            ResetError::Cooldown => ApiError::TooManyRequests {
                message: COOLDOWN.to_string(),
                retry_after: None,
            },
            ResetError::RateLimited { retry_after } => ApiError::TooManyRequests {
                message: RATE_LIMITED.to_string(),
                retry_after: Some(retry_after.num_seconds().max(1) as u64),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            ApiError::TooManyRequests { retry_after, .. } => *retry_after,
            _ => None,
        };

        let mut response = (status, Json(MessageResponse::new(self.to_string()))).into_response();
        if let Some(seconds) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

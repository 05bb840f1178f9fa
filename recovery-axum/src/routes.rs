use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use recovery::{Recovery, RepositoryProvider};

use crate::{
    error::{ApiError, Endpoint, Result},
    extractors::LenientJson,
    types::*,
};

pub struct ResetState<R: RepositoryProvider> {
    pub recovery: Arc<Recovery<R>>,
}

impl<R: RepositoryProvider> Clone for ResetState<R> {
    fn clone(&self) -> Self {
        Self {
            recovery: self.recovery.clone(),
        }
    }
}

pub fn create_router<R>(recovery: Arc<Recovery<R>>) -> Router
where
    R: RepositoryProvider + 'static,
{
    let state = ResetState { recovery };

    Router::new()
        .route("/health", get(health_handler))
        .route("/request-otp", post(request_otp_handler))
        .route("/verify-otp", post(verify_otp_handler))
        .route("/reset-password", post(reset_password_handler))
        .with_state(state)
}

async fn health_handler<R>(State(state): State<ResetState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.recovery.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Health check failed");
        ApiError::Internal("Storage is unavailable.".to_string())
    })?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

async fn request_otp_handler<R>(
    State(state): State<ResetState<R>>,
    connection_info: ConnectionInfo,
    LenientJson(payload): LenientJson<RequestOtpRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .recovery
        .request_otp(&payload.email, connection_info.ip)
        .await
        .map_err(|e| ApiError::from_service(Endpoint::RequestOtp, e))?;

    Ok(Json(MessageResponse::new(
        "If the email exists in our system, an OTP has been sent.",
    )))
}

async fn verify_otp_handler<R>(
    State(state): State<ResetState<R>>,
    connection_info: ConnectionInfo,
    LenientJson(payload): LenientJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .recovery
        .verify_otp(&payload.email, &payload.otp, connection_info.ip)
        .await
        .map_err(|e| ApiError::from_service(Endpoint::VerifyOtp, e))?;

    Ok(Json(MessageResponse::new("OTP verified successfully.")))
}

async fn reset_password_handler<R>(
    State(state): State<ResetState<R>>,
    connection_info: ConnectionInfo,
    LenientJson(payload): LenientJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .recovery
        .reset_password(
            &payload.email,
            &payload.otp,
            &payload.password,
            connection_info.ip,
        )
        .await
        .map_err(|e| ApiError::from_service(Endpoint::ResetPassword, e))?;

    Ok(Json(MessageResponse::new(
        "Password has been reset successfully.",
    )))
}

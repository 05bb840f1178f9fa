//! # Recovery Axum Integration
//!
//! Axum routes for the OTP password-reset flow:
//!
//! | Method | Path              | Body                        |
//! | ------ | ----------------- | --------------------------- |
//! | POST   | `/request-otp`    | `{email}`                   |
//! | POST   | `/verify-otp`     | `{email, otp}`              |
//! | POST   | `/reset-password` | `{email, otp, password}`    |
//! | GET    | `/health`         |                             |
//!
//! Every reset response body is `{"message": "..."}`. Rate-limited responses
//! carry a `Retry-After` header.
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use axum::Router;
//! use recovery::RecoveryBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let recovery = RecoveryBuilder::new()
//!         .with_sqlite("sqlite://recovery.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let app = Router::new().nest("/api/auth", recovery_axum::routes(Arc::new(recovery)).build());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//!     Ok(())
//! }
//! ```
//!
//! The client IP used for rate limiting comes from axum's `ConnectInfo`, so the
//! router must be served with `into_make_service_with_connect_info`.

mod error;
mod extractors;
mod routes;
mod types;

pub use error::{ApiError, Endpoint, Result};
pub use extractors::LenientJson;
pub use routes::{ResetState, create_router};
pub use types::{
    ConnectionInfo, HealthResponse, MessageResponse, RequestOtpRequest, ResetPasswordRequest,
    VerifyOtpRequest,
};

use axum::{Router, http::HeaderValue};
use recovery::{Recovery, RepositoryProvider};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Create the reset routes for your Axum application.
///
/// The returned builder converts into a `Router` that can be nested at any path.
pub fn routes<R>(recovery: Arc<Recovery<R>>) -> ResetRouterBuilder<R>
where
    R: RepositoryProvider + 'static,
{
    ResetRouterBuilder {
        recovery,
        cors: None,
    }
}

/// Builder for configuring the reset routes
pub struct ResetRouterBuilder<R: RepositoryProvider> {
    recovery: Arc<Recovery<R>>,
    cors: Option<CorsLayer>,
}

impl<R: RepositoryProvider + 'static> ResetRouterBuilder<R> {
    /// Allow cross-origin requests from `origin`.
    pub fn with_cors_origin(mut self, origin: HeaderValue) -> Self {
        self.cors = Some(cors_layer(origin));
        self
    }

    /// Build the router with the configured options
    pub fn build(self) -> Router {
        let router = create_router(self.recovery);
        match self.cors {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }
}

impl<R: RepositoryProvider + 'static> From<ResetRouterBuilder<R>> for Router {
    fn from(builder: ResetRouterBuilder<R>) -> Self {
        builder.build()
    }
}

/// CORS for a single browser origin posting JSON.
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    use axum::http::{Method, header};

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

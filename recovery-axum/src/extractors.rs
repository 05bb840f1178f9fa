use std::{convert::Infallible, net::SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::types::ConnectionInfo;

impl<S> FromRequestParts<S> for ConnectionInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ConnectionInfo { ip })
    }
}

/// JSON body that never rejects: an empty, malformed or non-JSON body yields
/// `T::default()`, leaving field validation to the service.
#[derive(Debug)]
pub struct LenientJson<T>(pub T);

impl<S, T> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = match Bytes::from_request(req, state).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to read request body");
                return Ok(LenientJson(T::default()));
            }
        };

        if bytes.is_empty() {
            return Ok(LenientJson(T::default()));
        }

        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(LenientJson(value)),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed JSON body");
                Ok(LenientJson(T::default()))
            }
        }
    }
}

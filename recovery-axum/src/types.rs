use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Absent fields deserialize as empty strings so that validation, not the JSON
/// layer, reports what is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RequestOtpRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
}

/// Body of every reset endpoint response, success or failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Details about the calling client
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub ip: Option<IpAddr>,
}

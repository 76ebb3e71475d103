// src/utils.rs
use actix_web::error::JsonPayloadError;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{clock::DefaultClock, RateLimiter};
use log::{debug, warn};
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use crate::config::Config;
use crate::models::command::CommandResult;

pub type CommandRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestError {
    /// A required field was missing or empty. Never retried.
    #[error("{0}")]
    Validation(String),
    /// The console session could not be established or was lost.
    #[error("{0}")]
    Connection(String),
    /// The session was reachable but the command failed or timed out.
    #[error("{0}")]
    Command(String),
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Missing or invalid admin token")]
    Unauthorized,
}

impl RequestError {
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl ResponseError for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Connection(_) | Self::Command(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            Self::Connection(_) | Self::Command(_) => {
                HttpResponse::build(self.status_code()).json(CommandResult::failed(self.to_string()))
            }
            _ => HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() })),
        }
    }
}

/// Used as the `JsonConfig` error handler so malformed bodies get the same `{error}` shape.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected request body: {}", err);
    RequestError::Validation(format!("Invalid request body: {}", err)).into()
}

/// Trims a required textual field, rejecting absent or blank values.
pub fn require(value: Option<&str>, field: &str) -> Result<String, RequestError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(RequestError::Validation(format!("Missing required field: {}", field))),
    }
}

pub fn peer_ip(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub fn check_rate_limit(req: &HttpRequest, limiter: &CommandRateLimiter) -> Result<(), RequestError> {
    let ip = peer_ip(req);
    if limiter.check_key(&ip).is_err() {
        warn!("Rate limit exceeded for command from ip: {}", ip);
        return Err(RequestError::RateLimitExceeded);
    }
    Ok(())
}

/// Opt-in bearer check. Without `ADMIN_TOKEN` every caller is trusted.
pub fn authorize(req: &HttpRequest, config: &Config) -> Result<(), RequestError> {
    let Some(expected) = config.admin_token.as_deref() else {
        return Ok(());
    };

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if presented == Some(expected) {
        Ok(())
    } else {
        warn!("Rejected command from {}: bad admin token", peer_ip(req));
        Err(RequestError::Unauthorized)
    }
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

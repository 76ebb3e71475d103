// src/handlers/spark.rs
use actix_web::{web, HttpRequest, HttpResponse};

use super::commands::admit;
use crate::config::Config;
use crate::console::ConsoleManager;
use crate::gateway;
use crate::models::command::{ProfileRequest, TickMonitorRequest};
use crate::utils::{CommandRateLimiter, RequestError};

/// Without a body the profiler runs for the default duration.
pub async fn profile_cpu(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: Option<web::Json<ProfileRequest>>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let duration = body.and_then(|b| b.duration);
    Ok(HttpResponse::Ok().json(gateway::profile_cpu(&console, duration).await?))
}

pub async fn heap_summary(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    Ok(HttpResponse::Ok().json(gateway::heap_summary(&console, config.heap_top_n).await?))
}

/// Without a body the default threshold applies.
pub async fn tick_monitoring(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: Option<web::Json<TickMonitorRequest>>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let threshold = body.and_then(|b| b.threshold);
    Ok(HttpResponse::Ok().json(gateway::tick_monitor(&console, threshold).await?))
}

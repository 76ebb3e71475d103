// src/handlers/connection.rs
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::console::{ConnectionStatus, ConsoleManager};
use crate::monitor;
use crate::utils::{check_rate_limit, CommandRateLimiter, RequestError};

fn describe(status: ConnectionStatus, config: &Config) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "state": status.state,
        "last_error": status.last_error,
        "host": config.mc_host,
        "rcon_port": config.rcon_port,
    }))
}

pub async fn get_connection(console: web::Data<ConsoleManager>, config: web::Data<Config>) -> HttpResponse {
    describe(console.status(), &config)
}

pub async fn refresh_connection(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    check_rate_limit(&req, &limiter)?;
    let status = monitor::refresh(&console).await;
    Ok(describe(status, &config))
}

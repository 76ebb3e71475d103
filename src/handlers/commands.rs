// src/handlers/commands.rs
use actix_web::{web, HttpRequest, HttpResponse};

use crate::config::Config;
use crate::console::ConsoleManager;
use crate::gateway;
use crate::models::command::{BroadcastRequest, CommandRequest, PlayerRequest};
use crate::utils::{authorize, check_rate_limit, CommandRateLimiter, RequestError};

/// Admin token and rate limit, checked before anything reaches the console.
pub(crate) fn admit(
    req: &HttpRequest,
    config: &Config,
    limiter: &CommandRateLimiter,
) -> Result<(), RequestError> {
    authorize(req, config)?;
    check_rate_limit(req, limiter)
}

pub async fn run_command(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: web::Json<CommandRequest>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let result = gateway::run_command(&console, body.command.as_deref()).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn kick(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: web::Json<PlayerRequest>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let result = gateway::kick(&console, body.player.as_deref(), body.reason.as_deref()).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn ban(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: web::Json<PlayerRequest>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let result = gateway::ban(&console, body.player.as_deref(), body.reason.as_deref()).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn unban(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: web::Json<PlayerRequest>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let result = gateway::unban(&console, body.player.as_deref()).await?;
    Ok(HttpResponse::Ok().json(result))
}

pub async fn save(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    Ok(HttpResponse::Ok().json(gateway::save(&console).await?))
}

pub async fn stop(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    Ok(HttpResponse::Ok().json(gateway::stop(&console).await?))
}

pub async fn broadcast(
    req: HttpRequest,
    console: web::Data<ConsoleManager>,
    config: web::Data<Config>,
    limiter: web::Data<CommandRateLimiter>,
    body: web::Json<BroadcastRequest>,
) -> Result<HttpResponse, RequestError> {
    admit(&req, &config, &limiter)?;
    let result = gateway::broadcast(&console, body.message.as_deref()).await?;
    Ok(HttpResponse::Ok().json(result))
}

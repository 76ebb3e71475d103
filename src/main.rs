// src/main.rs
mod aggregator;
mod config;
mod console;
mod gateway;
mod handlers;
mod models;
mod monitor;
mod parsers;
mod utils;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use governor::RateLimiter;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::console::ConsoleManager;
use crate::monitor::StatusPoller;
use crate::utils::CommandRateLimiter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();
    let bind = config.bind();

    if config.rcon_password.is_none() {
        warn!("RCON_PASSWORD is not set; console-backed routes will fail until it is configured");
    }

    let console = Arc::new(ConsoleManager::from_config(&config));
    let poller = (config.status_poll_secs > 0)
        .then(|| StatusPoller::start(console.clone(), Duration::from_secs(config.status_poll_secs)));

    let console_data = web::Data::from(console.clone());
    let limiter: web::Data<CommandRateLimiter> = web::Data::new(RateLimiter::keyed(config.command_quota()));
    let prefix = config.api_prefix.clone();
    let config_data = web::Data::new(config);

    info!("Starting server on {} under {}", bind, prefix);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(console_data.clone())
            .app_data(config_data.clone())
            .app_data(limiter.clone())
            .service(web::scope(&prefix).configure(handlers::routes))
    })
    .bind(&bind)?
    .run()
    .await;

    if let Some(poller) = poller {
        poller.stop().await;
    }
    console.reset().await;
    info!("Server stopped");
    result
}

// src/handlers/health.rs
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::config::Config;
use crate::utils::now_rfc3339;

pub async fn health(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": now_rfc3339(),
        "server_config": {
            "host": config.mc_host,
            "port": config.mc_port,
            "rcon_port": config.rcon_port,
            "rcon_configured": config.rcon_password.is_some(),
        }
    }))
}

// src/handlers/status.rs
use actix_web::{web, HttpResponse, ResponseError};
use log::error;
use serde_json::json;

use crate::aggregator;
use crate::console::ConsoleManager;
use crate::utils::{now_rfc3339, RequestError};

fn query_failed(e: &RequestError) -> HttpResponse {
    HttpResponse::build(e.status_code()).json(json!({ "error": e.to_string() }))
}

pub async fn get_status(console: web::Data<ConsoleManager>) -> HttpResponse {
    HttpResponse::Ok().json(aggregator::server_status(&console).await)
}

pub async fn get_players(console: web::Data<ConsoleManager>) -> HttpResponse {
    match aggregator::player_list(&console).await {
        Ok(players) => HttpResponse::Ok().json(players),
        Err(e) => {
            error!("Failed to list players: {}", e);
            query_failed(&e)
        }
    }
}

pub async fn get_performance(console: web::Data<ConsoleManager>) -> HttpResponse {
    match aggregator::performance(&console).await {
        Ok(snapshot) => HttpResponse::Ok().json(snapshot),
        Err(e) => {
            error!("Failed to read performance: {}", e);
            HttpResponse::build(e.status_code()).json(json!({
                "error": e.to_string(),
                "tps": null,
                "timestamp": now_rfc3339(),
            }))
        }
    }
}

pub async fn get_overview(console: web::Data<ConsoleManager>) -> HttpResponse {
    match aggregator::overview(&console).await {
        Ok(overview) => HttpResponse::Ok().json(overview),
        Err(failure) => {
            error!("{}", failure);
            HttpResponse::InternalServerError().json(json!({
                "success": false,
                "error": failure.error.to_string(),
                "failed": failure.failed,
            }))
        }
    }
}

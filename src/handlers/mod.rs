// src/handlers/mod.rs
pub mod commands;
pub mod connection;
pub mod health;
pub mod spark;
pub mod status;

use actix_web::web;

use crate::utils::json_error_handler;

/// Every route, relative to the configured prefix.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .route("/health", web::get().to(health::health))
        .route("/status", web::get().to(status::get_status))
        .route("/players", web::get().to(status::get_players))
        .route("/performance", web::get().to(status::get_performance))
        .route("/overview", web::get().to(status::get_overview))
        .route("/connection", web::get().to(connection::get_connection))
        .route("/connection/refresh", web::post().to(connection::refresh_connection))
        .route("/command", web::post().to(commands::run_command))
        .route("/kick", web::post().to(commands::kick))
        .route("/ban", web::post().to(commands::ban))
        .route("/unban", web::post().to(commands::unban))
        .route("/save", web::post().to(commands::save))
        .route("/stop", web::post().to(commands::stop))
        .route("/broadcast", web::post().to(commands::broadcast))
        .route("/spark/profile-cpu", web::post().to(spark::profile_cpu))
        .route("/spark/heap-summary", web::post().to(spark::heap_summary))
        .route("/spark/tick-monitoring", web::post().to(spark::tick_monitoring));
}

// src/gateway.rs
//! One function per administrative action. Parameters are validated before the
//! console is touched; console failures come back as `RequestError`.
use log::info;
use serde::Serialize;

use crate::console::ConsoleManager;
use crate::models::command::CommandResult;
use crate::models::performance::HeapSummary;
use crate::parsers;
use crate::utils::{require, RequestError};

pub const DEFAULT_KICK_REASON: &str = "Kicked by an administrator";
pub const DEFAULT_BAN_REASON: &str = "Banned by an administrator";
pub const DEFAULT_PROFILE_SECS: u32 = 60;
pub const DEFAULT_TICK_THRESHOLD_MS: u32 = 50;

fn reason_or(reason: Option<&str>, default: &str) -> String {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Passes the caller's text to the console verbatim.
pub async fn run_command(console: &ConsoleManager, command: Option<&str>) -> Result<CommandResult, RequestError> {
    let command = require(command, "command")?;
    info!("Running console command: {}", command);
    let response = console.execute(&command).await?;
    let response = if response.trim().is_empty() {
        "Command executed successfully".to_string()
    } else {
        response
    };
    Ok(CommandResult::ok(response))
}

pub async fn kick(
    console: &ConsoleManager,
    player: Option<&str>,
    reason: Option<&str>,
) -> Result<CommandResult, RequestError> {
    let player = require(player, "player")?;
    let reason = reason_or(reason, DEFAULT_KICK_REASON);
    let response = console.execute(&format!("kick {} {}", player, reason)).await?;
    info!("Kicked {}: {}", player, reason);
    Ok(CommandResult::ok(response).with_message(format!("Player {} kicked", player)))
}

pub async fn ban(
    console: &ConsoleManager,
    player: Option<&str>,
    reason: Option<&str>,
) -> Result<CommandResult, RequestError> {
    let player = require(player, "player")?;
    let reason = reason_or(reason, DEFAULT_BAN_REASON);
    let response = console.execute(&format!("ban {} {}", player, reason)).await?;
    info!("Banned {}: {}", player, reason);
    Ok(CommandResult::ok(response).with_message(format!("Player {} banned", player)))
}

pub async fn unban(console: &ConsoleManager, player: Option<&str>) -> Result<CommandResult, RequestError> {
    let player = require(player, "player")?;
    let response = console.execute(&format!("pardon {}", player)).await?;
    info!("Unbanned {}", player);
    Ok(CommandResult::ok(response).with_message(format!("Player {} unbanned", player)))
}

pub async fn save(console: &ConsoleManager) -> Result<CommandResult, RequestError> {
    let response = console.execute("save-all").await?;
    Ok(CommandResult::ok(response).with_message("World saved"))
}

/// The server closes the console after `stop`, so the session is dropped right away.
pub async fn stop(console: &ConsoleManager) -> Result<CommandResult, RequestError> {
    let response = console.execute("stop").await?;
    info!("Stop command sent, closing console session");
    console.reset().await;
    Ok(CommandResult::ok(response).with_message("Server is stopping"))
}

pub async fn broadcast(console: &ConsoleManager, message: Option<&str>) -> Result<CommandResult, RequestError> {
    let message = require(message, "message")?;
    let response = console.execute(&format!("say {}", message)).await?;
    Ok(CommandResult::ok(response).with_message("Message sent"))
}

pub async fn profile_cpu(console: &ConsoleManager, duration: Option<u32>) -> Result<CommandResult, RequestError> {
    let duration = duration.unwrap_or(DEFAULT_PROFILE_SECS);
    let response = console.execute(&format!("spark profiler --timeout {}", duration)).await?;
    Ok(CommandResult::ok(response).with_message(format!("CPU profiling started for {} seconds", duration)))
}

pub async fn tick_monitor(console: &ConsoleManager, threshold: Option<u32>) -> Result<CommandResult, RequestError> {
    let threshold = threshold.unwrap_or(DEFAULT_TICK_THRESHOLD_MS);
    let response = console
        .execute(&format!("spark tickmonitor --threshold {} --without-gc", threshold))
        .await?;
    Ok(CommandResult::ok(response).with_message(format!("Tick monitoring started (threshold: {}ms)", threshold)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapReport {
    pub success: bool,
    pub heap_data: HeapSummary,
    pub raw_response: String,
}

pub async fn heap_summary(console: &ConsoleManager, top_n: usize) -> Result<HeapReport, RequestError> {
    let raw = console.execute("spark heapsummary").await?;
    let heap_data = HeapSummary::from_entries(parsers::parse_heap_summary(&raw), top_n);
    Ok(HeapReport { success: true, heap_data, raw_response: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::ScriptedConnector;
    use crate::console::ConnectionState;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    fn console(connector: &ScriptedConnector) -> ConsoleManager {
        ConsoleManager::new(Arc::new(connector.clone()), Duration::from_secs(1), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_validation_happens_before_connecting() {
        let connector = ScriptedConnector::builder().build();
        let console = console(&connector);

        assert!(matches!(kick(&console, None, None).await, Err(RequestError::Validation(_))));
        assert!(matches!(ban(&console, Some("  "), None).await, Err(RequestError::Validation(_))));
        assert!(matches!(unban(&console, None).await, Err(RequestError::Validation(_))));
        assert!(matches!(broadcast(&console, Some("")).await, Err(RequestError::Validation(_))));
        assert!(matches!(run_command(&console, None).await, Err(RequestError::Validation(_))));

        assert_eq!(connector.script.connects.load(Ordering::SeqCst), 0);
        assert!(connector.script.sent().is_empty());
    }

    #[tokio::test]
    async fn test_command_strings() {
        let connector = ScriptedConnector::builder().build();
        let console = console(&connector);

        kick(&console, Some("Steve"), None).await.unwrap();
        ban(&console, Some("Alex"), Some("griefing")).await.unwrap();
        unban(&console, Some("Alex")).await.unwrap();
        save(&console).await.unwrap();
        broadcast(&console, Some("restart in 5")).await.unwrap();
        profile_cpu(&console, None).await.unwrap();
        tick_monitor(&console, Some(80)).await.unwrap();
        run_command(&console, Some("time set day")).await.unwrap();

        assert_eq!(
            connector.script.sent(),
            vec![
                "kick Steve Kicked by an administrator",
                "ban Alex griefing",
                "pardon Alex",
                "save-all",
                "say restart in 5",
                "spark profiler --timeout 60",
                "spark tickmonitor --threshold 80 --without-gc",
                "time set day",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_reply_gets_default_text() {
        let connector = ScriptedConnector::builder().reply("weather clear", "").build();
        let result = run_command(&console(&connector), Some("weather clear")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.response, "Command executed successfully");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_connection_error_propagates() {
        let connector = ScriptedConnector::builder()
            .refuse(RequestError::Connection("RCON password is not configured".into()))
            .build();
        let err = save(&console(&connector)).await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_stop_drops_session() {
        let connector = ScriptedConnector::builder().reply("stop", "Stopping the server").build();
        let console = console(&connector);

        let result = stop(&console).await.unwrap();
        assert_eq!(result.response, "Stopping the server");
        assert_eq!(console.status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_heap_summary_truncates_listing() {
        let raw = "1 100 a.A\n2 300 b.B\nnot a record\n3 200 c.C";
        let connector = ScriptedConnector::builder().reply("spark heapsummary", raw).build();

        let report = heap_summary(&console(&connector), 2).await.unwrap();
        assert!(report.success);
        assert_eq!(report.raw_response, raw);
        let names: Vec<_> = report.heap_data.top_memory_usage.iter().map(|e| e.class_name.as_str()).collect();
        assert_eq!(names, vec!["b.B", "c.C"]);
        assert_eq!(report.heap_data.total_bytes, 600);
        assert_eq!(report.heap_data.total_instances, 6);
    }
}

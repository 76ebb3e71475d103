// src/aggregator.rs
use log::{debug, warn};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;

use crate::console::{ConnectOnce, ConsoleManager};
use crate::models::performance::{MemoryReading, PerformanceSnapshot, PerformanceSource, TpsReading};
use crate::models::server::{PlayerList, PlayersInfo, ServerStatus, StatusSource, DEFAULT_MAX_PLAYERS};
use crate::parsers;
use crate::utils::{now_rfc3339, RequestError};

const RCON_VERSION: &str = "Minecraft Server";
const UNKNOWN: &str = "unknown";

fn players_from_listing(raw: &str) -> PlayersInfo {
    let list = parsers::parse_player_list(raw);
    let (online, max) = match parsers::parse_player_counts(raw) {
        Some((online, max)) => (online.max(list.len() as u32), max),
        None => (list.len() as u32, DEFAULT_MAX_PLAYERS),
    };
    PlayersInfo { online, max, list }
}

fn fallback_status() -> ServerStatus {
    ServerStatus {
        online: true,
        players: PlayersInfo::empty(DEFAULT_MAX_PLAYERS),
        version: "Unknown".to_string(),
        source: StatusSource::Fallback,
        error: None,
    }
}

/// Server status, failing only when the console cannot be reached.
pub async fn try_server_status(console: &ConsoleManager) -> Result<ServerStatus, RequestError> {
    status_within(console, &ConnectOnce::new()).await
}

async fn status_within(console: &ConsoleManager, once: &ConnectOnce) -> Result<ServerStatus, RequestError> {
    match console.execute_once(once, "list").await {
        Ok(raw) if parsers::is_player_listing(&raw) => Ok(ServerStatus {
            online: true,
            players: players_from_listing(&raw),
            version: RCON_VERSION.to_string(),
            source: StatusSource::Rcon,
            error: None,
        }),
        Ok(raw) => {
            debug!("Unrecognized list reply: {:?}", raw);
            Ok(fallback_status())
        }
        Err(e) if e.is_connection() => Err(e),
        Err(e) => {
            debug!("List command failed, using fallback status: {}", e);
            Ok(fallback_status())
        }
    }
}

/// Server status for `GET /status`; connection failures become an offline record.
pub async fn server_status(console: &ConsoleManager) -> ServerStatus {
    try_server_status(console).await.unwrap_or_else(|e| ServerStatus {
        online: false,
        players: PlayersInfo::empty(0),
        version: UNKNOWN.to_string(),
        source: StatusSource::Error,
        error: Some(e.to_string()),
    })
}

pub async fn player_list(console: &ConsoleManager) -> Result<PlayerList, RequestError> {
    players_within(console, &ConnectOnce::new()).await
}

async fn players_within(console: &ConsoleManager, once: &ConnectOnce) -> Result<PlayerList, RequestError> {
    let raw = console.execute_once(once, "list").await?;
    Ok(players_from_listing(&raw).into())
}

/// Spark figures when the plugin answers, the plain `tps` command otherwise.
pub async fn performance(console: &ConsoleManager) -> Result<PerformanceSnapshot, RequestError> {
    performance_within(console, &ConnectOnce::new()).await
}

async fn performance_within(console: &ConsoleManager, once: &ConnectOnce) -> Result<PerformanceSnapshot, RequestError> {
    let (tps, gc) = tokio::join!(
        console.execute_once(once, "spark tps"),
        console.execute_once(once, "spark gc"),
    );
    let mut snapshot = PerformanceSnapshot::unknown(now_rfc3339());
    let mut failures = Vec::new();

    match tps {
        Ok(raw) => {
            if let Some(reading) = parsers::parse_spark_tps(&raw) {
                snapshot.ticks = reading;
                snapshot.source = PerformanceSource::Spark;
            }
        }
        Err(e) => failures.push(e),
    }

    match gc {
        Ok(raw) => {
            if let Some(reading) = parsers::parse_spark_memory(&raw) {
                snapshot.memory = reading;
            }
        }
        Err(e) => failures.push(e),
    }

    if snapshot.source != PerformanceSource::Unknown {
        return Ok(snapshot);
    }

    match console.execute_once(once, "tps").await {
        Ok(raw) => {
            snapshot.ticks.tps = Some(parsers::parse_fallback_tps(&raw));
            snapshot.source = PerformanceSource::Fallback;
            snapshot.raw_response = Some(raw);
        }
        Err(e) => {
            if e.is_connection() && failures.len() == 2 && failures.iter().all(RequestError::is_connection) {
                return Err(e);
            }
            warn!("Fallback TPS query failed: {}", e);
            snapshot.ticks.tps = None;
            snapshot.error = Some(format!("Failed to read TPS: {}", e));
        }
    }

    Ok(snapshot)
}

/// Status, performance and players merged into one record with placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub online: bool,
    pub version: String,
    pub status_source: StatusSource,
    pub players: PlayersInfo,
    #[serde(flatten)]
    pub ticks: TpsReading,
    #[serde(flatten)]
    pub memory: MemoryReading,
    pub performance_source: PerformanceSource,
    pub failed_branches: Vec<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("All {failed} status queries failed: {error}")]
pub struct AggregateFailure {
    pub failed: usize,
    pub error: RequestError,
}

fn settle<T>(
    branch: &str,
    result: Result<T, RequestError>,
    failed: &mut Vec<String>,
    errors: &mut Vec<RequestError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Overview branch '{}' failed: {}", branch, e);
            failed.push(branch.to_string());
            errors.push(e);
            None
        }
    }
}

/// Runs the three branches concurrently; a failed branch only blanks its own fields.
pub async fn merge<S, P, L>(status: S, performance: P, players: L) -> Result<Overview, AggregateFailure>
where
    S: Future<Output = Result<ServerStatus, RequestError>>,
    P: Future<Output = Result<PerformanceSnapshot, RequestError>>,
    L: Future<Output = Result<PlayerList, RequestError>>,
{
    let (status, performance, players) = tokio::join!(status, performance, players);

    let mut failed = Vec::new();
    let mut errors = Vec::new();
    let status = settle("status", status, &mut failed, &mut errors);
    let performance = settle("performance", performance, &mut failed, &mut errors);
    let players = settle("players", players, &mut failed, &mut errors);

    if status.is_none() && performance.is_none() && players.is_none() {
        let error = errors
            .pop()
            .unwrap_or_else(|| RequestError::Connection("No status source answered".to_string()));
        return Err(AggregateFailure { failed: failed.len(), error });
    }

    let (online, version, status_source) = match status {
        Some(s) => (s.online, s.version, s.source),
        None => (false, UNKNOWN.to_string(), StatusSource::Error),
    };

    let (ticks, memory, performance_source) = match performance {
        Some(p) => (p.ticks, p.memory, p.source),
        None => (TpsReading::default(), MemoryReading::default(), PerformanceSource::Unknown),
    };

    let players = players
        .map(|p| PlayersInfo { online: p.online, max: p.max, list: p.players })
        .unwrap_or_else(|| PlayersInfo::empty(0));

    Ok(Overview {
        online,
        version,
        status_source,
        players,
        ticks,
        memory,
        performance_source,
        failed_branches: failed,
        timestamp: now_rfc3339(),
    })
}

/// All branches share one connection attempt.
pub async fn overview(console: &ConsoleManager) -> Result<Overview, AggregateFailure> {
    let once = ConnectOnce::new();
    merge(
        status_within(console, &once),
        performance_within(console, &once),
        players_within(console, &once),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::testing::ScriptedConnector;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    const LIST: &str = "There are 2 of a max of 50 players online:\nname: Steve\nname: Alex";
    const SPARK_TPS: &str = "TPS from last 1m, 5m, 15m: 19.9, 19.8, 19.7\nMSPT: 12.5";
    const SPARK_GC: &str = "Memory usage: 512MB / 1024MB\nCollections: 7 times";

    fn console(connector: &ScriptedConnector) -> ConsoleManager {
        ConsoleManager::new(Arc::new(connector.clone()), Duration::from_secs(1), Duration::from_secs(1))
    }

    fn snapshot() -> PerformanceSnapshot {
        let mut snapshot = PerformanceSnapshot::unknown(now_rfc3339());
        snapshot.ticks.tps = Some(19.5);
        snapshot.source = PerformanceSource::Spark;
        snapshot
    }

    #[tokio::test]
    async fn status_from_rcon_listing() {
        let connector = ScriptedConnector::builder().reply("list", LIST).build();
        let status = server_status(&console(&connector)).await;
        assert_eq!(status.source, StatusSource::Rcon);
        assert!(status.online);
        assert_eq!(status.players.list, vec!["Steve", "Alex"]);
        assert_eq!(status.players.online, 2);
        assert_eq!(status.players.max, 50);
    }

    #[tokio::test]
    async fn status_with_nobody_online() {
        let connector = ScriptedConnector::builder()
            .reply("list", "There are 0 of a max of 20 players online:")
            .build();
        let status = server_status(&console(&connector)).await;
        assert_eq!(status.source, StatusSource::Rcon);
        assert!(status.players.list.is_empty());
        assert_eq!(status.players.online, 0);
    }

    #[tokio::test]
    async fn status_falls_back_on_unrecognized_reply() {
        let connector = ScriptedConnector::builder().reply("list", "huh?").build();
        let status = server_status(&console(&connector)).await;
        assert_eq!(status.source, StatusSource::Fallback);
        assert!(status.online);
        assert_eq!(status.players, PlayersInfo::empty(DEFAULT_MAX_PLAYERS));
    }

    #[tokio::test]
    async fn status_reports_connection_error() {
        let connector = ScriptedConnector::builder()
            .refuse(RequestError::Connection("refused".into()))
            .build();
        let status = server_status(&console(&connector)).await;
        assert_eq!(status.source, StatusSource::Error);
        assert!(!status.online);
        assert_eq!(status.error.as_deref(), Some("refused"));
    }

    #[tokio::test]
    async fn performance_from_spark() {
        let connector = ScriptedConnector::builder()
            .reply("spark tps", SPARK_TPS)
            .reply("spark gc", SPARK_GC)
            .build();
        let snapshot = performance(&console(&connector)).await.unwrap();
        assert_eq!(snapshot.source, PerformanceSource::Spark);
        assert_eq!(snapshot.ticks.tps_15m, Some(19.7));
        assert_eq!(snapshot.ticks.mspt, Some(12.5));
        assert_eq!(snapshot.memory.memory_percent, Some(50));
        assert_eq!(snapshot.memory.gc_collections, Some(7));
        assert!(!connector.script.sent().contains(&"tps".to_string()));
    }

    #[tokio::test]
    async fn performance_falls_back_without_spark() {
        let connector = ScriptedConnector::builder()
            .reply("spark tps", "Unknown or incomplete command")
            .reply("spark gc", "Unknown or incomplete command")
            .reply("tps", "Current rate: 19.98 (ok)")
            .build();
        let snapshot = performance(&console(&connector)).await.unwrap();
        assert_eq!(snapshot.source, PerformanceSource::Fallback);
        assert_eq!(snapshot.ticks.tps, Some(19.98));
        assert_eq!(snapshot.raw_response.as_deref(), Some("Current rate: 19.98 (ok)"));
    }

    #[tokio::test]
    async fn performance_reports_failed_fallback() {
        let connector = ScriptedConnector::builder()
            .fail("tps", RequestError::Command("timed out".into()))
            .build();
        let snapshot = performance(&console(&connector)).await.unwrap();
        assert_eq!(snapshot.source, PerformanceSource::Unknown);
        assert_eq!(snapshot.ticks.tps, None);
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn performance_fails_when_console_unreachable() {
        let connector = ScriptedConnector::builder()
            .refuse(RequestError::Connection("refused".into()))
            .build();
        let err = performance(&console(&connector)).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(connector.script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn overview_dials_once_when_console_unreachable() {
        let connector = ScriptedConnector::builder()
            .refuse(RequestError::Connection("refused".into()))
            .build();
        let failure = overview(&console(&connector)).await.unwrap_err();
        assert_eq!(failure.failed, 3);
        assert_eq!(failure.error, RequestError::Connection("refused".into()));
        assert_eq!(connector.script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn performance_fallback_reuses_session() {
        let connector = ScriptedConnector::builder()
            .reply("tps", "TPS: 19.5")
            .build();
        let snapshot = performance(&console(&connector)).await.unwrap();
        assert_eq!(snapshot.source, PerformanceSource::Fallback);
        assert_eq!(connector.script.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn merge_keeps_other_branches_when_players_fail() {
        let status = async {
            Ok::<_, RequestError>(ServerStatus {
                online: true,
                players: PlayersInfo::empty(20),
                version: RCON_VERSION.to_string(),
                source: StatusSource::Rcon,
                error: None,
            })
        };
        let perf = async { Ok::<_, RequestError>(snapshot()) };
        let players = async { Err::<PlayerList, _>(RequestError::Command("list failed".into())) };

        let overview = merge(status, perf, players).await.unwrap();
        assert!(overview.online);
        assert_eq!(overview.version, RCON_VERSION);
        assert_eq!(overview.ticks.tps, Some(19.5));
        assert_eq!(overview.performance_source, PerformanceSource::Spark);
        assert!(overview.players.list.is_empty());
        assert_eq!(overview.players.online, 0);
        assert_eq!(overview.players.max, 0);
        assert_eq!(overview.failed_branches, vec!["players"]);
    }

    #[tokio::test]
    async fn merge_uses_placeholders_for_failed_status_and_performance() {
        let status = async { Err::<ServerStatus, _>(RequestError::Connection("down".into())) };
        let perf = async { Err::<PerformanceSnapshot, _>(RequestError::Connection("down".into())) };
        let players = async {
            Ok::<_, RequestError>(PlayerList { online: 1, max: 20, players: vec!["Steve".to_string()] })
        };

        let overview = merge(status, perf, players).await.unwrap();
        assert!(!overview.online);
        assert_eq!(overview.version, "unknown");
        assert_eq!(overview.ticks, TpsReading::default());
        assert_eq!(overview.performance_source, PerformanceSource::Unknown);
        assert_eq!(overview.players.list, vec!["Steve"]);
        assert_eq!(overview.failed_branches, vec!["status", "performance"]);
    }

    #[tokio::test]
    async fn merge_fails_only_when_every_branch_fails() {
        let status = async { Err::<ServerStatus, _>(RequestError::Connection("down".into())) };
        let perf = async { Err::<PerformanceSnapshot, _>(RequestError::Connection("down".into())) };
        let players = async { Err::<PlayerList, _>(RequestError::Connection("down".into())) };

        let failure = merge(status, perf, players).await.unwrap_err();
        assert_eq!(failure.failed, 3);
        assert!(failure.error.is_connection());
    }

    #[tokio::test]
    async fn overview_through_console() {
        let connector = ScriptedConnector::builder()
            .reply("list", LIST)
            .reply("spark tps", SPARK_TPS)
            .reply("spark gc", SPARK_GC)
            .build();
        let overview = overview(&console(&connector)).await.unwrap();
        assert!(overview.failed_branches.is_empty());
        assert_eq!(overview.status_source, StatusSource::Rcon);
        assert_eq!(overview.players.list, vec!["Steve", "Alex"]);
        assert_eq!(overview.memory.memory_used, Some(512));
    }
}

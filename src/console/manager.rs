// src/console/manager.rs
use log::{debug, info, warn};
use parking_lot::{Mutex as SyncMutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;

use super::rcon::RconConnector;
use super::{ConsoleSession, Connector};
use crate::config::Config;
use crate::utils::RequestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub last_error: Option<String>,
}

type Slot = Option<Box<dyn ConsoleSession>>;

/// One connection attempt shared by every command of a single request.
///
/// After a connection error, later commands in the same request fail with
/// that error instead of dialing the console again.
#[derive(Debug, Default)]
pub struct ConnectOnce {
    failure: SyncMutex<Option<RequestError>>,
}

impl ConnectOnce {
    pub fn new() -> Self {
        Self::default()
    }

    fn failure(&self) -> Option<RequestError> {
        self.failure.lock().clone()
    }

    fn record(&self, error: &RequestError) {
        if error.is_connection() {
            self.failure.lock().get_or_insert_with(|| error.clone());
        }
    }
}

/// Owns the single console session shared by every request.
///
/// The session is opened lazily by the first [`ConsoleManager::acquire`] and kept
/// until it fails, times out or is reset. Nothing reconnects in the background;
/// the next acquire after a failure opens a fresh session.
pub struct ConsoleManager {
    connector: Arc<dyn Connector>,
    session: Mutex<Slot>,
    status: RwLock<ConnectionStatus>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

/// Exclusive use of the live session. Dropping the lease releases it.
pub struct Lease<'a> {
    manager: &'a ConsoleManager,
    slot: MutexGuard<'a, Slot>,
}

impl ConsoleManager {
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connector,
            session: Mutex::new(None),
            status: RwLock::new(ConnectionStatus {
                state: ConnectionState::Disconnected,
                last_error: None,
            }),
            connect_timeout,
            command_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let connector = RconConnector::new(config.mc_host.clone(), config.rcon_port, config.rcon_password.clone());
        Self::new(Arc::new(connector), config.connect_timeout(), config.command_timeout())
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.read().clone()
    }

    fn set_state(&self, state: ConnectionState, last_error: Option<String>) {
        let mut status = self.status.write();
        if status.state != state {
            debug!("Console state {:?} -> {:?}", status.state, state);
        }
        status.state = state;
        status.last_error = last_error;
    }

    fn mark_failed(&self, error: &RequestError) {
        self.set_state(ConnectionState::Disconnected, Some(error.to_string()));
    }

    /// Moves the presented state back to `connecting` ahead of an explicit refresh.
    pub fn begin_refresh(&self) {
        let last_error = self.status.read().last_error.clone();
        self.set_state(ConnectionState::Connecting, last_error);
    }

    /// Returns the live session, opening one first if needed.
    pub async fn acquire(&self) -> Result<Lease<'_>, RequestError> {
        self.acquire_within(None).await
    }

    async fn acquire_within(&self, once: Option<&ConnectOnce>) -> Result<Lease<'_>, RequestError> {
        let mut slot = self.session.lock().await;

        if let Some(session) = slot.as_mut() {
            if !session.is_alive().await {
                info!("Console session closed by {}", self.connector.describe());
                slot.take();
            }
        }

        if slot.is_none() {
            if let Some(error) = once.and_then(ConnectOnce::failure) {
                return Err(error);
            }
            self.set_state(ConnectionState::Connecting, None);
            debug!("Opening console session to {}", self.connector.describe());

            let session = match timeout(self.connect_timeout, self.connector.connect()).await {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => {
                    warn!("Console connection failed: {}", e);
                    self.mark_failed(&e);
                    return Err(e);
                }
                Err(_) => {
                    let e = RequestError::Connection(format!(
                        "Timed out connecting to {} after {} ms",
                        self.connector.describe(),
                        self.connect_timeout.as_millis()
                    ));
                    warn!("{}", e);
                    self.mark_failed(&e);
                    return Err(e);
                }
            };

            info!("Console session opened to {}", self.connector.describe());
            *slot = Some(session);
        }

        self.set_state(ConnectionState::Connected, None);
        Ok(Lease { manager: self, slot })
    }

    /// Acquire, send one command, release.
    pub async fn execute(&self, command: &str) -> Result<String, RequestError> {
        let mut lease = self.acquire().await?;
        lease.send(command).await
    }

    /// Like [`ConsoleManager::execute`], but never connects again once `once` saw a connection error.
    pub async fn execute_once(&self, once: &ConnectOnce, command: &str) -> Result<String, RequestError> {
        let result = match self.acquire_within(Some(once)).await {
            Ok(mut lease) => lease.send(command).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            once.record(e);
        }
        result
    }

    /// Drops the current session; the next acquire reconnects.
    pub async fn reset(&self) {
        let mut slot = self.session.lock().await;
        if let Some(mut session) = slot.take() {
            session.close().await;
            info!("Console session closed");
        }
        self.set_state(ConnectionState::Disconnected, None);
    }
}

impl Lease<'_> {
    pub async fn send(&mut self, command: &str) -> Result<String, RequestError> {
        let command_timeout = self.manager.command_timeout;
        let Some(session) = self.slot.as_mut() else {
            return Err(RequestError::Connection("Console session is not open".to_string()));
        };

        let outcome = timeout(command_timeout, session.execute(command)).await;
        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                if e.is_connection() {
                    warn!("Console session lost during '{}': {}", command, e);
                    self.slot.take();
                    self.manager.mark_failed(&e);
                }
                Err(e)
            }
            Err(_) => {
                // Framing is unknown after an abandoned read, so the session cannot be reused.
                let e = RequestError::Command(format!(
                    "Command '{}' timed out after {} ms",
                    command,
                    command_timeout.as_millis()
                ));
                warn!("{}", e);
                self.slot.take();
                self.manager.mark_failed(&e);
                Err(e)
            }
        }
    }
}

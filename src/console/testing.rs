//! Scripted console used by the unit tests of the layers above the wire protocol.
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{ConsoleSession, Connector};
use crate::utils::RequestError;

#[derive(Default)]
pub struct Script {
    replies: HashMap<String, Result<String, RequestError>>,
    pub connect_error: Option<RequestError>,
    pub delay: Duration,
    pub connects: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub sent: Mutex<Vec<String>>,
}

impl Script {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub script: Arc<Script>,
}

impl ScriptedConnector {
    pub fn builder() -> ScriptBuilder {
        ScriptBuilder { script: Script::default() }
    }
}

pub struct ScriptBuilder {
    script: Script,
}

impl ScriptBuilder {
    pub fn reply(mut self, command: &str, response: &str) -> Self {
        self.script.replies.insert(command.to_string(), Ok(response.to_string()));
        self
    }

    pub fn fail(mut self, command: &str, error: RequestError) -> Self {
        self.script.replies.insert(command.to_string(), Err(error));
        self
    }

    pub fn refuse(mut self, error: RequestError) -> Self {
        self.script.connect_error = Some(error);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.script.delay = delay;
        self
    }

    pub fn build(self) -> ScriptedConnector {
        ScriptedConnector { script: Arc::new(self.script) }
    }
}

struct ScriptedSession {
    script: Arc<Script>,
}

#[async_trait]
impl ConsoleSession for ScriptedSession {
    async fn execute(&mut self, command: &str) -> Result<String, RequestError> {
        let script = &self.script;
        let now = script.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        script.max_in_flight.fetch_max(now, Ordering::SeqCst);
        script.sent.lock().push(command.to_string());

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }

        script.in_flight.fetch_sub(1, Ordering::SeqCst);
        script
            .replies
            .get(command)
            .cloned()
            .unwrap_or_else(|| Ok(format!("Unknown command: {}", command)))
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn ConsoleSession>, RequestError> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.script.connect_error {
            return Err(error.clone());
        }
        Ok(Box::new(ScriptedSession { script: self.script.clone() }))
    }
}

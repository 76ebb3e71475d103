use serde::{Deserialize, Serialize};

/// Uniform envelope for every command-issuing operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub response: String,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResult {
    pub fn ok(response: impl Into<String>) -> Self {
        Self { success: true, response: response.into(), error: None, message: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, response: String::new(), error: Some(error.into()), message: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandRequest {
    pub command: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerRequest {
    pub player: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BroadcastRequest {
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub duration: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TickMonitorRequest {
    pub threshold: Option<u32>,
}

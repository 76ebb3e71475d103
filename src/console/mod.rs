pub mod manager;
pub mod rcon;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::utils::RequestError;

pub use manager::{ConnectOnce, ConnectionState, ConnectionStatus, ConsoleManager};

/// A live console session: one command in, one reply out.
#[async_trait]
pub trait ConsoleSession: Send {
    async fn execute(&mut self, command: &str) -> Result<String, RequestError>;

    /// False once the remote end has closed the session.
    async fn is_alive(&mut self) -> bool {
        true
    }

    async fn close(&mut self) {}
}

/// Opens and authenticates new console sessions.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ConsoleSession>, RequestError>;

    fn describe(&self) -> String {
        "console".to_string()
    }
}

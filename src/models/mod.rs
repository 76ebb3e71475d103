pub mod command;
pub mod performance;
pub mod server;

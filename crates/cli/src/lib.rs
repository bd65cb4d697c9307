//! Host process for the pagebridge session bridge: the extension WebSocket
//! endpoint, the NDJSON stdio front-end, configuration and logging.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod frontend;
pub mod logging;
pub mod relay;

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod gcp;
pub mod locator;
pub mod logger;
pub mod migrate;
pub mod poller;
pub mod types;

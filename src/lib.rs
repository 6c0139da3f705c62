pub mod buffer;
pub mod commands;
pub mod config;
pub mod cycler;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod tracker;

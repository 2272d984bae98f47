pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod runtime;
pub mod shared;
pub mod tui;
pub mod wizard;

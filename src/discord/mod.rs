//! Discord integration.
//!
//! Gateway plumbing, command parsing and the dispatcher that routes events
//! to the engines.

pub mod client;
pub mod commands;
pub mod events;
pub mod formatter;
pub mod handler;
pub mod interactions;
pub mod platform;

#[cfg(test)]
pub mod testing;

pub use client::DiscordBotBuilder;
pub use handler::Dispatcher;

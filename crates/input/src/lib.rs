//! Client intents: the commands a room accepts and the queue they wait in.
//!
//! # Invariants
//! - Commands are data; nothing here touches the world.
//! - A drain returns only what was queued when it started, so one tick never
//!   sees a half-delivered batch.

pub mod command;
pub mod queue;

pub use command::{Command, Envelope};
pub use queue::{CommandQueue, CommandSender};

/// Errors from decoding or queueing commands.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("command queue full")]
    QueueFull,
    #[error("command queue closed")]
    Disconnected,
}

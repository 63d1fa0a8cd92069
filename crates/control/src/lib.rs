//! Remote control channel for the shader viewer.
//!
//! A WebSocket listener runs on its own OS thread with a single-threaded tokio
//! runtime, so it never shares an execution context with the render loop:
//!
//! ```text
//!   client ──ws──▶ accept loop ──▶ connection task ──▶ apply_message()
//!                                                         │
//!                                                         ▼
//!                                               BlendStrength::set()
//! ```
//!
//! Messages are plain text of the form `<command>:<value>`. Nothing is ever
//! sent back. There is no authentication; anyone who can reach the port can
//! change parameters, so bind to a loopback host unless the channel is
//! wrapped by something that authenticates.

mod client;
mod command;
mod server;

pub use client::{send_message, send_message_blocking, ClientError};
pub use command::{
    apply_message, parse_command, CommandError, ControlCommand, MessageOutcome,
    CHANGE_BLEND_STRENGTH,
};
pub use server::{spawn, ControlConfig, ControlError, ControlHandle, DEFAULT_HOST, DEFAULT_PORT};

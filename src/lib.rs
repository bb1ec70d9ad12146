//! Presses power buttons by driving MCP23017 outputs for a timed hold.

pub mod cli;
pub mod config;
pub mod io;
pub mod logging;
pub mod mcp23017;
pub mod pusher;

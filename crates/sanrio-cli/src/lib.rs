//! Sanrio characters operator CLI library.
//!
//! Each subcommand lives in [`commands`]; `main.rs` only parses arguments and
//! dispatches.

pub mod commands;

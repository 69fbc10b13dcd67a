//! CLI tool for inspecting server addresses.
//!
//! Provides commands for:
//! - Rendering canonical labels
//! - Encoding and decoding the wire format
//! - Sorting and comparing addresses the way metadata tables do

pub mod commands;
pub mod config;

pub use commands::{Command, CommandResult};
pub use config::{CliConfig, ResolverKind};

//! CLI subcommands.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use anyhow::{bail, Context};
use clap::Subcommand;
use endpoint::{Resolver, ServerAddress};
use tracing::debug;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the canonical label of each address.
    Parse {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Print the wire encoding of an address as hex. "" encodes the empty
    /// address.
    Encode { address: String },
    /// Decode a hex wire frame and print its label.
    Decode { hex: String },
    /// Print labels in table order, one per distinct address.
    Sort {
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Compare two addresses.
    Compare { left: String, right: String },
}

/// Output of a command, rendered by `Display`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Addresses(Vec<ServerAddress>),
    Hex(String),
    Comparison { ordering: Ordering, same_hash: bool },
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandResult::Addresses(addrs) => {
                for (i, addr) in addrs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    if addr.is_empty() {
                        f.write_str("(empty)")?;
                    } else {
                        write!(f, "{addr}")?;
                    }
                }
                Ok(())
            }
            CommandResult::Hex(hex) => f.write_str(hex),
            CommandResult::Comparison {
                ordering,
                same_hash,
            } => {
                let symbol = match ordering {
                    Ordering::Less => "<",
                    Ordering::Equal => "=",
                    Ordering::Greater => ">",
                };
                let hashes = if *same_hash { "same" } else { "different" };
                write!(f, "{symbol} ({hashes} hash)")
            }
        }
    }
}

impl Command {
    pub fn execute(&self, resolver: &dyn Resolver) -> anyhow::Result<CommandResult> {
        match self {
            Command::Parse { addresses } => {
                let parsed = addresses
                    .iter()
                    .map(|s| parse_address(resolver, s))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(CommandResult::Addresses(parsed))
            }
            Command::Encode { address } => {
                let addr = parse_address(resolver, address)?;
                let frame = addr.encode().context("encoding address")?;
                Ok(CommandResult::Hex(hex::encode(&frame)))
            }
            Command::Decode { hex: frame_hex } => {
                let frame = hex::decode(frame_hex.trim()).context("frame is not valid hex")?;
                let mut rest = &frame[..];
                let addr = ServerAddress::decode_with(resolver, &mut rest)
                    .context("decoding address frame")?;
                if !rest.is_empty() {
                    bail!("{} trailing bytes after address frame", rest.len());
                }
                Ok(CommandResult::Addresses(vec![addr]))
            }
            Command::Sort { addresses } => {
                let sorted = addresses
                    .iter()
                    .map(|s| parse_address(resolver, s))
                    .collect::<anyhow::Result<BTreeSet<_>>>()?;
                debug!(input = addresses.len(), distinct = sorted.len(), "sorted addresses");
                Ok(CommandResult::Addresses(sorted.into_iter().collect()))
            }
            Command::Compare { left, right } => {
                let left = parse_address(resolver, left)?;
                let right = parse_address(resolver, right)?;
                Ok(CommandResult::Comparison {
                    ordering: left.cmp(&right),
                    same_hash: left.fingerprint() == right.fingerprint(),
                })
            }
        }
    }
}

fn parse_address(resolver: &dyn Resolver, input: &str) -> anyhow::Result<ServerAddress> {
    if input.is_empty() {
        return Ok(ServerAddress::new());
    }
    ServerAddress::parse_with(resolver, input)
        .with_context(|| format!("invalid server address `{input}`"))
}

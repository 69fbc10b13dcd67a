//! Command line configuration.

use clap::{ArgAction, Parser, ValueEnum};
use endpoint::{NumericResolver, Resolver, SystemResolver};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

/// Inspect, encode and order server addresses.
#[derive(Debug, Parser)]
#[command(name = "endpoint", version)]
pub struct CliConfig {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG`
    /// takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// How host names are turned into numeric addresses.
    #[arg(long, value_enum, default_value_t = ResolverKind::System, global = true)]
    pub resolver: ResolverKind,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolverKind {
    /// Operating system resolver.
    System,
    /// IP literals only; never performs a lookup.
    Numeric,
}

impl ResolverKind {
    pub fn resolver(self) -> Box<dyn Resolver> {
        match self {
            ResolverKind::System => Box::new(SystemResolver),
            ResolverKind::Numeric => Box::new(NumericResolver),
        }
    }
}

impl CliConfig {
    /// Installs logging, runs the selected command and prints its result.
    pub fn run(&self) -> anyhow::Result<()> {
        init_tracing(self.verbose);

        debug!(command = ?self.command, resolver = ?self.resolver, "dispatching");
        let resolver = self.resolver.resolver();
        let result = self.command.execute(resolver.as_ref())?;
        println!("{result}");
        Ok(())
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

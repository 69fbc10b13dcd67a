//! Server endpoint identity.
//!
//! This crate provides the value type used to name a server (host + port) in
//! cluster metadata such as member registries and region location tables:
//! - `ServerAddress`: canonical label, resolved address, wire encoding
//! - Hostname resolution behind the `Resolver` trait
//! - Modified UTF-8 / big-endian primitives for the wire format

pub mod address;
pub mod codec;
pub mod error;
pub mod resolver;

pub use address::{ServerAddress, ENCODED_EMPTY_LEN};
pub use error::{Error, Result};
pub use resolver::{NumericResolver, Resolver, StaticResolver, SystemResolver};

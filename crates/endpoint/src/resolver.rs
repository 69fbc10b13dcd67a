//! Hostname resolution.
//!
//! Resolution is the only place a [`ServerAddress`](crate::ServerAddress)
//! touches anything outside its own fields. It happens synchronously during
//! construction and decoding, through a [`Resolver`]. No caching, timeout or
//! retry policy lives here; a caller that wants one wraps a resolver.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, ToSocketAddrs};

use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Maps a host string to a numeric IP address.
///
/// Implementations must be deterministic for a stable environment: the same
/// host resolved twice should yield the same address, otherwise two copies of
/// one server address stop comparing equal.
pub trait Resolver: Send + Sync {
    /// Resolves `host` to a single numeric address.
    fn resolve(&self, host: &str) -> Result<IpAddr>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        (**self).resolve(host)
    }
}

/// Resolver backed by the operating system (`getaddrinfo` and friends).
///
/// IP literals are returned as-is without a system call. For names, the first
/// IPv4 address the system returns wins; an IPv6 address is used only when the
/// name has no IPv4 address.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }
        if host.is_empty() {
            return Err(Error::unresolved(
                host,
                io::Error::new(io::ErrorKind::InvalidInput, "empty host"),
            ));
        }

        trace!(host, "resolving host");
        let addrs = (host, 0u16)
            .to_socket_addrs()
            .map_err(|e| Error::unresolved(host, e))?;

        match prefer_ipv4(addrs.map(|addr| addr.ip())) {
            Some(ip) => {
                debug!(host, %ip, "resolved host");
                Ok(ip)
            }
            None => {
                debug!(host, "host resolved to no addresses");
                Err(Error::unresolved(
                    host,
                    io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
                ))
            }
        }
    }
}

/// First IPv4 address, else the first address of any family.
fn prefer_ipv4<I: IntoIterator<Item = IpAddr>>(addrs: I) -> Option<IpAddr> {
    let mut fallback = None;
    for ip in addrs {
        if ip.is_ipv4() {
            return Some(ip);
        }
        if fallback.is_none() {
            fallback = Some(ip);
        }
    }
    fallback
}

/// Resolver that only accepts IP literals. Never performs a lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericResolver;

impl Resolver for NumericResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        parse_literal(host)
    }
}

/// In-memory host table, falling back to IP literals.
///
/// Useful where resolution must be deterministic: tests, simulations, or a
/// process that pins cluster member names up front.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, IpAddr>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a host entry.
    pub fn with_host(mut self, host: impl Into<String>, ip: IpAddr) -> Self {
        self.insert(host, ip);
        self
    }

    pub fn insert(&mut self, host: impl Into<String>, ip: IpAddr) -> Option<IpAddr> {
        self.hosts.insert(host.into(), ip)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self, host: &str) -> Result<IpAddr> {
        match self.hosts.get(host) {
            Some(ip) => Ok(*ip),
            None => parse_literal(host),
        }
    }
}

fn parse_literal(host: &str) -> Result<IpAddr> {
    host.parse::<IpAddr>().map_err(|e| {
        Error::unresolved(host, io::Error::new(io::ErrorKind::NotFound, e))
    })
}

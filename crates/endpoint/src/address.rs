//! Server address: the identity of a network-reachable server.
//!
//! # Representations
//!
//! A [`ServerAddress`] is viewed three ways, and all three must agree:
//!
//! 1. **Canonical label**: `"<numeric-ip>:<port>"`, e.g. `"10.0.0.7:60020"`.
//!    This is what `Display` renders and the *only* input to equality,
//!    ordering and hashing.
//! 2. **Resolved address**: the [`SocketAddr`] obtained by resolving the host
//!    once, at construction.
//! 3. **Wire encoding**: `[len: u16 BE][host: modified UTF-8][port: i32 BE]`,
//!    compatible with records persisted by JVM `DataOutput` writers.
//!
//! The label is derived from the resolved address, never from the caller's
//! spelling of the host, so `"localhost:80"` and `"127.0.0.1:80"` become the
//! same value whenever `localhost` resolves to `127.0.0.1`.
//!
//! # Ordering
//!
//! Ordering is lexicographic on the label, not numeric on octets or port:
//! `"10.0.0.9:80" > "10.0.0.10:80"`. Sorted tables persisted elsewhere depend
//! on this order.
//!
//! # Empty address
//!
//! [`ServerAddress::default()`] holds nothing. It renders as `""`, encodes as
//! six zero bytes, compares equal to every other empty address and sorts
//! before any non-empty one.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use siphasher::sip::SipHasher13;

use crate::codec;
use crate::error::{Error, Result};
use crate::resolver::{Resolver, SystemResolver};

/// Length of the wire encoding of an empty address: `u16` length + `i32` port.
pub const ENCODED_EMPTY_LEN: usize = 6;

/// Identity of a server endpoint (host + port).
///
/// Immutable once built. Cheap to clone; a clone carries the same resolved
/// address and label. Use [`ServerAddress::reresolved`] for a copy that goes
/// back through resolution.
///
/// # Invariants
///
/// - Address and label are present together or absent together.
/// - When present, `label == format!("{}:{}", addr.ip(), addr.port())`.
/// - `a == b` iff `a.to_string() == b.to_string()`, and then
///   `a.fingerprint() == b.fingerprint()`.
///
/// # Example
///
/// ```rust
/// use endpoint::ServerAddress;
///
/// let a: ServerAddress = "10.0.0.9:80".parse().unwrap();
/// let b: ServerAddress = "10.0.0.10:80".parse().unwrap();
///
/// assert_eq!(a.to_string(), "10.0.0.9:80");
/// assert!(a > b); // lexicographic on the label
/// ```
#[derive(Clone, Default)]
pub struct ServerAddress {
    resolved: Option<Resolved>,
}

/// Address and label, always set together.
#[derive(Clone)]
struct Resolved {
    addr: SocketAddr,
    label: String,
}

impl Resolved {
    fn new(addr: SocketAddr) -> Self {
        let label = format!("{}:{}", addr.ip(), addr.port());
        Self { addr, label }
    }

    /// Numeric host: everything before the last colon of the label.
    fn host(&self) -> &str {
        let cut = self.label.rfind(':').unwrap_or(self.label.len());
        &self.label[..cut]
    }
}

impl ServerAddress {
    /// The empty address.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already-resolved socket address. Never fails.
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        Self {
            resolved: Some(Resolved::new(addr)),
        }
    }

    /// Parses `"host:port"`, resolving `host` with the system resolver.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedInput`] when there is no `:` or the port is not an
    ///   unsigned 16-bit number.
    /// - [`Error::Resolution`] when the host does not resolve.
    pub fn parse(host_and_port: &str) -> Result<Self> {
        Self::parse_with(&SystemResolver, host_and_port)
    }

    /// [`ServerAddress::parse`] with an explicit resolver.
    ///
    /// The input is split on the *first* colon, so bare IPv6 literals are not
    /// accepted in this form; build those with
    /// [`ServerAddress::from_socket_addr`].
    pub fn parse_with<R: Resolver + ?Sized>(resolver: &R, host_and_port: &str) -> Result<Self> {
        let (host, port) = host_and_port
            .split_once(':')
            .ok_or_else(|| Error::malformed(host_and_port, "not a host:port pair"))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::malformed(host_and_port, "invalid port"))?;

        Self::from_host_port_with(resolver, host, port)
    }

    /// Resolves `host` with the system resolver and pairs it with `port`.
    pub fn from_host_port(host: &str, port: u16) -> Result<Self> {
        Self::from_host_port_with(&SystemResolver, host, port)
    }

    /// [`ServerAddress::from_host_port`] with an explicit resolver.
    pub fn from_host_port_with<R: Resolver + ?Sized>(
        resolver: &R,
        host: &str,
        port: u16,
    ) -> Result<Self> {
        let ip = resolver.resolve(host)?;
        Ok(Self::from_socket_addr(SocketAddr::new(ip, port)))
    }

    /// Rebuilds an address from its canonical label, as produced by
    /// `Display`. No resolver is involved.
    ///
    /// The label is split on its *last* colon, so IPv6 labels such as
    /// `"::1:9000"` are accepted here even though [`ServerAddress::parse`]
    /// rejects them.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedInput`] when the text before the last colon is not
    /// an IP literal or the text after it is not a port.
    pub fn from_label(label: &str) -> Result<Self> {
        let (host, port) = label
            .rsplit_once(':')
            .ok_or_else(|| Error::malformed(label, "not an ip:port label"))?;
        let ip = host
            .parse::<IpAddr>()
            .map_err(|_| Error::malformed(label, "host is not a numeric address"))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| Error::malformed(label, "invalid port"))?;

        Ok(Self::from_socket_addr(SocketAddr::new(ip, port)))
    }

    /// Builds an independent copy by resolving this address's numeric host
    /// again. The copy has the same label as long as resolution is stable.
    ///
    /// The empty address copies to the empty address.
    pub fn reresolved(&self) -> Result<Self> {
        self.reresolved_with(&SystemResolver)
    }

    pub fn reresolved_with<R: Resolver + ?Sized>(&self, resolver: &R) -> Result<Self> {
        match &self.resolved {
            None => Ok(Self::new()),
            Some(r) => Self::from_host_port_with(resolver, r.host(), r.addr.port()),
        }
    }

    /// True for the empty address.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_none()
    }

    /// Numeric host string, e.g. `"10.0.0.7"`.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyIdentity`] on the empty address.
    pub fn host(&self) -> Result<&str> {
        self.inner().map(Resolved::host)
    }

    pub fn port(&self) -> Result<u16> {
        self.inner().map(|r| r.addr.port())
    }

    pub fn ip(&self) -> Result<IpAddr> {
        self.inner().map(|r| r.addr.ip())
    }

    /// The resolved socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.inner().map(|r| r.addr)
    }

    /// The resolved socket address, or `None` for the empty address.
    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        self.resolved.as_ref().map(|r| r.addr)
    }

    /// The canonical label, or `None` for the empty address.
    pub fn label(&self) -> Option<&str> {
        self.resolved.as_ref().map(|r| r.label.as_str())
    }

    /// The canonical label, `""` for the empty address.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.label().unwrap_or("")
    }

    /// Stable 64-bit hash: SipHash-1-3 of the resolved `(ip, port)` XOR
    /// SipHash-1-3 of the label. Zero for the empty address.
    ///
    /// Keys are fixed, so the value is the same across processes and may be
    /// persisted. [`Hash`] feeds this value to the hasher.
    pub fn fingerprint(&self) -> u64 {
        match &self.resolved {
            None => 0,
            Some(r) => sip(&(r.addr.ip(), r.addr.port())) ^ sip(r.label.as_str()),
        }
    }

    /// Size of [`ServerAddress::encode`]'s output.
    pub fn encoded_len(&self) -> usize {
        match &self.resolved {
            None => ENCODED_EMPTY_LEN,
            Some(r) => ENCODED_EMPTY_LEN + codec::modified_utf8_len(r.host()),
        }
    }

    /// Appends the wire encoding to `buf`.
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        match &self.resolved {
            None => {
                codec::put_modified_utf8(buf, "")?;
                buf.put_i32(0);
            }
            Some(r) => {
                codec::put_modified_utf8(buf, r.host())?;
                buf.put_i32(i32::from(r.addr.port()));
            }
        }
        Ok(())
    }

    /// Returns the wire encoding as a standalone frame.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_to(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Writes the wire encoding to a stream.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let frame = self.encode()?;
        codec::write_all(&mut writer, &frame)
    }

    /// Reads one encoded address from `buf`, resolving with the system
    /// resolver.
    ///
    /// An empty host yields the empty address whatever the port field holds.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] on truncated input or invalid modified UTF-8.
    /// - [`Error::MalformedInput`] when the port is outside `0..=65535`.
    /// - [`Error::Resolution`] when the host does not resolve.
    ///
    /// A frame that is cut short fails before anything is consumed, as long
    /// as the length prefix sits in `buf`'s first chunk (always the case for
    /// slices and `Bytes`). Errors found after the frame is read (bad
    /// modified UTF-8, port range, resolution) leave `buf` past the frame.
    pub fn decode<B: Buf>(buf: &mut B) -> Result<Self> {
        Self::decode_with(&SystemResolver, buf)
    }

    pub fn decode_with<R: Resolver + ?Sized, B: Buf>(resolver: &R, buf: &mut B) -> Result<Self> {
        codec::check_frame(&*buf)?;
        let host = codec::get_modified_utf8(buf)?;
        let port = codec::get_i32(buf)?;
        Self::from_wire(resolver, &host, port)
    }

    /// Reads one encoded address from a stream.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Self::read_from_with(&SystemResolver, reader)
    }

    pub fn read_from_with<S: Resolver + ?Sized, R: Read>(resolver: &S, mut reader: R) -> Result<Self> {
        let host = codec::read_modified_utf8(&mut reader)?;
        let port = codec::read_i32(&mut reader)?;
        Self::from_wire(resolver, &host, port)
    }

    fn from_wire<R: Resolver + ?Sized>(resolver: &R, host: &str, port: i32) -> Result<Self> {
        if host.is_empty() {
            return Ok(Self::new());
        }
        let port = u16::try_from(port)
            .map_err(|_| Error::MalformedInput(format!("port out of range: {port}")))?;
        Self::from_host_port_with(resolver, host, port)
    }

    #[inline]
    fn inner(&self) -> Result<&Resolved> {
        self.resolved.as_ref().ok_or(Error::EmptyIdentity)
    }
}

fn sip<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = SipHasher13::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for ServerAddress {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ServerAddress {}

impl PartialOrd for ServerAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Hash for ServerAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint());
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolved {
            None => f.write_str("ServerAddress(<empty>)"),
            Some(r) => write!(f, "ServerAddress({})", r.label),
        }
    }
}

impl FromStr for ServerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ServerAddress {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<SocketAddr> for ServerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::from_socket_addr(addr)
    }
}

impl From<(IpAddr, u16)> for ServerAddress {
    fn from((ip, port): (IpAddr, u16)) -> Self {
        Self::from_socket_addr(SocketAddr::new(ip, port))
    }
}

// Serde form is the label string; "" is the empty address. Reading it back
// goes through `from_label`, never through resolution.

impl Serialize for ServerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ServerAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        if label.is_empty() {
            return Ok(Self::new());
        }
        Self::from_label(&label).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StaticResolver;
    use std::collections::hash_map::DefaultHasher;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn std_hash(addr: &ServerAddress) -> u64 {
        let mut hasher = DefaultHasher::new();
        addr.hash(&mut hasher);
        hasher.finish()
    }

    fn hosts() -> StaticResolver {
        StaticResolver::new()
            .with_host("localhost", IpAddr::V4(Ipv4Addr::LOCALHOST))
            .with_host("rs1.example", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)))
    }

    #[test]
    fn test_label_uses_numeric_ip() {
        let addr = ServerAddress::parse_with(&hosts(), "rs1.example:60020").unwrap();
        assert_eq!(addr.to_string(), "10.0.0.9:60020");
        assert_eq!(addr.host().unwrap(), "10.0.0.9");
        assert_eq!(addr.port().unwrap(), 60020);
        assert_eq!(
            addr.socket_addr().unwrap(),
            SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)), 60020)
        );
    }

    #[test]
    fn test_spellings_normalize() {
        let resolver = hosts();
        let by_name = ServerAddress::parse_with(&resolver, "localhost:80").unwrap();
        let by_ip = ServerAddress::parse_with(&resolver, "127.0.0.1:80").unwrap();
        let by_pair = ServerAddress::from_host_port_with(&resolver, "localhost", 80).unwrap();

        assert_eq!(by_name, by_ip);
        assert_eq!(by_ip, by_pair);
        assert_eq!(by_name.fingerprint(), by_ip.fingerprint());
        assert_eq!(std_hash(&by_name), std_hash(&by_pair));
    }

    #[test]
    fn test_from_socket_addr_v6() {
        let addr = ServerAddress::from_socket_addr(SocketAddr::new(
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            9000,
        ));
        assert_eq!(addr.to_string(), "::1:9000");
        assert_eq!(addr.host().unwrap(), "::1");
        assert_eq!(addr.port().unwrap(), 9000);
    }

    #[test]
    fn test_malformed_inputs() {
        let resolver = hosts();
        for input in ["noport", "host:abc", "host:", "host:-1", "host:65536", ""] {
            let err = ServerAddress::parse_with(&resolver, input).unwrap_err();
            assert!(err.is_malformed(), "{input:?} should be malformed, got {err}");
        }
    }

    #[test]
    fn test_unknown_host_is_resolution_error() {
        let err = ServerAddress::parse_with(&hosts(), "rs2.example:80").unwrap_err();
        assert!(err.is_resolution());
    }

    #[test]
    fn test_empty_address() {
        let empty = ServerAddress::new();
        assert!(empty.is_empty());
        assert_eq!(empty.to_string(), "");
        assert_eq!(empty.label(), None);
        assert_eq!(empty.as_socket_addr(), None);
        assert!(matches!(empty.host(), Err(Error::EmptyIdentity)));
        assert!(matches!(empty.port(), Err(Error::EmptyIdentity)));
        assert!(matches!(empty.socket_addr(), Err(Error::EmptyIdentity)));
        assert_eq!(empty, ServerAddress::default());
        assert_eq!(empty.fingerprint(), 0);
        assert_eq!(format!("{empty:?}"), "ServerAddress(<empty>)");
    }

    #[test]
    fn test_empty_sorts_first() {
        let empty = ServerAddress::new();
        let addr = ServerAddress::parse_with(&hosts(), "0.0.0.0:0").unwrap();
        assert!(empty < addr);
    }

    #[test]
    fn test_lexicographic_order() {
        let resolver = hosts();
        let nine = ServerAddress::parse_with(&resolver, "10.0.0.9:80").unwrap();
        let ten = ServerAddress::parse_with(&resolver, "10.0.0.10:80").unwrap();
        assert_eq!(nine.cmp(&ten), Ordering::Greater);

        let low_port = ServerAddress::parse_with(&resolver, "10.0.0.1:9").unwrap();
        let high_port = ServerAddress::parse_with(&resolver, "10.0.0.1:10").unwrap();
        assert!(low_port > high_port);
    }

    #[test]
    fn test_reresolved_keeps_label() {
        let resolver = hosts();
        let original = ServerAddress::parse_with(&resolver, "localhost:16000").unwrap();
        let copy = original.reresolved_with(&resolver).unwrap();
        assert_eq!(copy.to_string(), original.to_string());
        assert_eq!(copy, original);

        assert!(ServerAddress::new().reresolved().unwrap().is_empty());
    }

    #[test]
    fn test_encode_layout() {
        let addr = ServerAddress::parse_with(&hosts(), "10.0.0.1:60020").unwrap();
        let bytes = addr.encode().unwrap();
        let mut expected = vec![0u8, 8];
        expected.extend_from_slice(b"10.0.0.1");
        expected.extend_from_slice(&60020i32.to_be_bytes());
        assert_eq!(&bytes[..], &expected[..]);
        assert_eq!(addr.encoded_len(), expected.len());
    }

    #[test]
    fn test_encode_empty() {
        let bytes = ServerAddress::new().encode().unwrap();
        assert_eq!(&bytes[..], &[0u8; ENCODED_EMPTY_LEN][..]);
    }

    #[test]
    fn test_decode_empty_ignores_port() {
        let frame = [0u8, 0, 0, 0, 0x1F, 0x90];
        let addr = ServerAddress::decode_with(&hosts(), &mut &frame[..]).unwrap();
        assert!(addr.is_empty());
        assert_eq!(addr, ServerAddress::new());
        assert_eq!(&addr.encode().unwrap()[..], &[0u8; 6][..]);
    }

    #[test]
    fn test_decode_port_out_of_range() {
        let mut frame = vec![0u8, 7];
        frame.extend_from_slice(b"1.2.3.4");
        frame.extend_from_slice(&70000i32.to_be_bytes());
        let err = ServerAddress::decode_with(&hosts(), &mut &frame[..]).unwrap_err();
        assert!(err.is_malformed());

        let mut frame = vec![0u8, 7];
        frame.extend_from_slice(b"1.2.3.4");
        frame.extend_from_slice(&(-1i32).to_be_bytes());
        let err = ServerAddress::decode_with(&hosts(), &mut &frame[..]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_decode_resolves_host_name() {
        let mut frame = vec![0u8, 9];
        frame.extend_from_slice(b"localhost");
        frame.extend_from_slice(&80i32.to_be_bytes());
        let addr = ServerAddress::decode_with(&hosts(), &mut &frame[..]).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:80");
    }

    #[test]
    fn test_from_label_accepts_ipv6() {
        let v6 = ServerAddress::from_socket_addr(SocketAddr::new(
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            9000,
        ));
        let back = ServerAddress::from_label(&v6.to_string()).unwrap();
        assert_eq!(back, v6);
        assert_eq!(back.ip().unwrap(), IpAddr::V6(Ipv6Addr::LOCALHOST));

        let v4 = ServerAddress::from_label("10.0.0.9:80").unwrap();
        assert_eq!(v4.port().unwrap(), 80);
    }

    #[test]
    fn test_from_label_rejects_names_and_bad_ports() {
        for label in ["localhost:80", "noport", "10.0.0.1:abc", "10.0.0.1:70000"] {
            let err = ServerAddress::from_label(label).unwrap_err();
            assert!(err.is_malformed(), "{label:?} should be malformed, got {err}");
        }
    }

    #[test]
    fn test_truncated_frame_leaves_buf_untouched() {
        let frame = ServerAddress::parse_with(&hosts(), "10.0.0.1:60020")
            .unwrap()
            .encode()
            .unwrap();
        for cut in [1, 5, frame.len() - 1] {
            let mut rest = &frame[..cut];
            let err = ServerAddress::decode_with(&hosts(), &mut rest).unwrap_err();
            assert!(matches!(err, Error::Io(_)));
            assert_eq!(rest.len(), cut, "cut at {cut} should consume nothing");
        }
    }

    #[test]
    fn test_stream_round_trip() {
        let addr = ServerAddress::parse_with(&hosts(), "192.168.7.3:2181").unwrap();
        let mut out = Vec::new();
        addr.write_to(&mut out).unwrap();
        let back = ServerAddress::read_from_with(&hosts(), &out[..]).unwrap();
        assert_eq!(back, addr);
        assert_eq!(back.to_string(), "192.168.7.3:2181");
    }

    #[test]
    fn test_debug_shows_label() {
        let addr = ServerAddress::from((IpAddr::V4(Ipv4Addr::new(10, 1, 1, 1)), 7000));
        assert_eq!(format!("{addr:?}"), "ServerAddress(10.1.1.1:7000)");
    }
}

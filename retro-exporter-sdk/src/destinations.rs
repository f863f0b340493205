//! Destination set for flushed datagrams.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{EmitterError, Result};

/// The only transport a destination may use.
pub const PROTOCOL_UDP: &str = "udp";

/// Set of unique UDP endpoints every flush is replicated to.
///
/// Add-only. Iteration follows insertion order. Readers take a cheap
/// snapshot (`Arc` clone) so a flush sees the set as it was when the flush
/// was triggered; endpoints added afterwards only receive later flushes.
#[derive(Debug, Clone, Default)]
pub struct Destinations {
    inner: Arc<RwLock<Arc<Vec<SocketAddr>>>>,
}

impl Destinations {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an endpoint. Returns `false` if it was already present.
    pub fn insert(&self, addr: SocketAddr) -> bool {
        let mut current = self.inner.write();
        if current.contains(&addr) {
            return false;
        }
        Arc::make_mut(&mut *current).push(addr);
        true
    }

    /// Check if an endpoint is registered.
    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.inner.read().contains(addr)
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if no endpoint is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Point-in-time view of the set.
    pub fn snapshot(&self) -> Arc<Vec<SocketAddr>> {
        self.inner.read().clone()
    }
}

/// Parse an `ip` + `port` pair into a destination endpoint.
///
/// Port 0 is not a valid destination.
pub fn parse_destination(ip: &str, port: u16) -> Result<SocketAddr> {
    if port == 0 {
        return Err(EmitterError::InvalidPort(0));
    }
    let ip: IpAddr = ip
        .trim()
        .parse()
        .map_err(|_| EmitterError::InvalidAddress(ip.to_string()))?;
    Ok(SocketAddr::new(ip, port))
}

/// Reject a destination the socket bound on `bind_ip` cannot send to.
///
/// An IPv4 socket cannot reach IPv6 endpoints and vice versa.
pub fn check_family(bind_ip: IpAddr, addr: SocketAddr) -> Result<()> {
    if bind_ip.is_ipv4() == addr.is_ipv4() {
        Ok(())
    } else {
        Err(EmitterError::InvalidAddress(format!(
            "{} (socket binds {})",
            addr, bind_ip
        )))
    }
}

/// Reject any transport other than UDP.
pub fn check_protocol(protocol: &str) -> Result<()> {
    if protocol.eq_ignore_ascii_case(PROTOCOL_UDP) {
        Ok(())
    } else {
        Err(EmitterError::UnsupportedProtocol(protocol.to_string()))
    }
}

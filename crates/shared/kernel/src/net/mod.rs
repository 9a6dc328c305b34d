use std::io;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Errors from querying the host network configuration.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// The host has no non-loopback IPv4 address a remote device could reach.
    #[error("no routable IPv4 address found on any local interface")]
    NoRoutableAddress,

    /// Interface enumeration itself failed.
    #[error("failed to enumerate network interfaces: {0}")]
    Enumerate(#[from] io::Error),
}

/// Detects the IPv4 address a device on the local network can reach this host at.
///
/// Enumerates every address bound to a local interface, keeps IPv4, drops
/// loopback, and returns the first remaining candidate.
///
/// # Errors
/// Returns [`NetError::NoRoutableAddress`] when only loopback or IPv6
/// addresses are present (e.g., on an isolated host).
pub fn detect_address() -> Result<Ipv4Addr, NetError> {
    let interfaces = if_addrs::get_if_addrs()?;
    debug!(count = interfaces.len(), "Enumerated local interfaces");

    first_routable(interfaces.into_iter().map(|iface| iface.ip()))
        .ok_or(NetError::NoRoutableAddress)
}

fn first_routable(mut addrs: impl Iterator<Item = IpAddr>) -> Option<Ipv4Addr> {
    addrs.find_map(|addr| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    })
}

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

/// Host part of the shareable URL: this machine's outbound IPv4 address,
/// or `"localhost"` when none qualifies.
pub(crate) fn share_host() -> String {
    match outbound_ipv4() {
        Some(ip) => ip.to_string(),
        None => "localhost".into(),
    }
}

/// The IPv4 address the OS routes outbound traffic through.
///
/// No packets are sent: `connect` on a UDP socket only selects a route
/// and with it the source address, which is the address other machines on
/// the network can reach us at.
fn outbound_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(("8.8.8.8", 80)).ok()?;
    let SocketAddr::V4(addr) = socket.local_addr().ok()? else {
        return None;
    };
    let ip = *addr.ip();
    if ip.is_loopback() || ip.is_link_local() {
        return None;
    }
    Some(ip)
}

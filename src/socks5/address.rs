use super::*;

/// Renders the raw DST.ADDR bytes as the host half of a `host:port` target.
///
/// IPv6 groups are upper-case and zero-padded, never compressed. Domain
/// bytes pass through as-is (invalid UTF-8 is replaced, not rejected).
pub fn format_host(address_type: AddressType, bytes: &[u8]) -> String {
    match address_type {
        AddressType::Ipv4 => bytes
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join("."),
        AddressType::Ipv6 => {
            let groups = bytes
                .chunks_exact(2)
                .map(|pair| format!("{:04X}", u16::from_be_bytes([pair[0], pair[1]])))
                .collect::<Vec<_>>();
            format!("[{}]", groups.join(":"))
        }
        AddressType::DomainName => String::from_utf8_lossy(bytes).into_owned(),
    }
}

pub fn encode_address(addr: SocketAddr) -> (AddressType, Vec<u8>, u16) {
    match addr.ip() {
        IpAddr::V4(ip) => (AddressType::Ipv4, ip.octets().to_vec(), addr.port()),
        IpAddr::V6(ip) => (AddressType::Ipv6, ip.octets().to_vec(), addr.port()),
    }
}

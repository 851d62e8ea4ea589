//! Classification of addresses into their enclosing reverse-DNS zones.
//!
//! Only internally-routable address space is accepted: the RFC1918 ranges for
//! IPv4, and the unique-local plus managed global-unicast prefixes for IPv6.
//! Anything else is a recoverable [`ReverseError`], never a panic.

use std::net::{Ipv4Addr, Ipv6Addr};

use thiserror::Error;

/// Reverse zone for unique-local IPv6 addresses (fd00::/8).
pub const IPV6_ULA_SUFFIX: &str = "d.f.ip6.arpa";
/// Reverse zone for the managed global-unicast IPv6 slice (2000::/4).
pub const IPV6_GLOBAL_SUFFIX: &str = "2.ip6.arpa";

#[derive(Debug, Error)]
pub enum ReverseError {
    #[error("not a valid {kind} address: {addr}")]
    InvalidAddress { kind: &'static str, addr: String },

    #[error("unsupported address space: {0}")]
    UnsupportedAddressSpace(String),

    #[error("record type {0} cannot produce a PTR record")]
    UnsupportedRecordType(String),
}

/// Map an address literal to the name of its enclosing reverse zone.
///
/// `rtype` selects the address family: `A` for IPv4, `AAAA` for IPv6.
pub fn reverse_zone_of(addr: &str, rtype: &str) -> Result<String, ReverseError> {
    match rtype {
        "A" => reverse_zone_v4(addr),
        "AAAA" => reverse_zone_v6(addr),
        other => Err(ReverseError::UnsupportedRecordType(other.to_string())),
    }
}

/// Build the fully-qualified PTR owner name for an address literal, e.g.
/// `10.1.2.3` becomes `3.2.1.10.in-addr.arpa.`.
pub fn ptr_host(addr: &str, rtype: &str) -> Result<String, ReverseError> {
    match rtype {
        "A" => {
            let ip = parse_v4(addr)?;
            Ok(format!("{}.in-addr.arpa.", reverse_ipv4_labels(ip)))
        }
        "AAAA" => {
            let ip = parse_v6(addr)?;
            Ok(format!("{}.ip6.arpa.", reverse_ipv6_nibbles(ip)))
        }
        other => Err(ReverseError::UnsupportedRecordType(other.to_string())),
    }
}

fn parse_v4(addr: &str) -> Result<Ipv4Addr, ReverseError> {
    addr.parse().map_err(|_| ReverseError::InvalidAddress {
        kind: "IPv4",
        addr: addr.to_string(),
    })
}

fn parse_v6(addr: &str) -> Result<Ipv6Addr, ReverseError> {
    addr.parse().map_err(|_| ReverseError::InvalidAddress {
        kind: "IPv6",
        addr: addr.to_string(),
    })
}

fn reverse_zone_v4(addr: &str) -> Result<String, ReverseError> {
    let ip = parse_v4(addr)?;
    let [a, b, _, _] = ip.octets();
    match (a, b) {
        (10, _) => Ok("10.in-addr.arpa".to_string()),
        (192, 168) => Ok("168.192.in-addr.arpa".to_string()),
        (172, 16..=31) => Ok(format!("{b}.172.in-addr.arpa")),
        _ => Err(ReverseError::UnsupportedAddressSpace(addr.to_string())),
    }
}

fn reverse_zone_v6(addr: &str) -> Result<String, ReverseError> {
    let ip = parse_v6(addr)?;
    let first = ip.segments()[0];
    if first >> 8 == 0xfd {
        Ok(IPV6_ULA_SUFFIX.to_string())
    } else if first >> 12 == 0x2 {
        Ok(IPV6_GLOBAL_SUFFIX.to_string())
    } else {
        Err(ReverseError::UnsupportedAddressSpace(addr.to_string()))
    }
}

/// Reverse a dot-separated label sequence. Applying it twice is the identity.
pub fn reverse_labels(labels: &str) -> String {
    labels.rsplit('.').collect::<Vec<_>>().join(".")
}

fn reverse_ipv4_labels(ip: Ipv4Addr) -> String {
    reverse_labels(&ip.to_string())
}

fn reverse_ipv6_nibbles(ip: Ipv6Addr) -> String {
    let nibbles: Vec<String> = ip
        .octets()
        .iter()
        .flat_map(|o| [o >> 4, o & 0x0f])
        .map(|n| format!("{n:x}"))
        .collect();
    nibbles
        .iter()
        .rev()
        .cloned()
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1918_ranges_map_to_their_reverse_zones() {
        assert_eq!(reverse_zone_of("10.1.2.3", "A").unwrap(), "10.in-addr.arpa");
        assert_eq!(
            reverse_zone_of("192.168.0.40", "A").unwrap(),
            "168.192.in-addr.arpa"
        );
        assert_eq!(
            reverse_zone_of("172.16.0.1", "A").unwrap(),
            "16.172.in-addr.arpa"
        );
        assert_eq!(
            reverse_zone_of("172.31.255.254", "A").unwrap(),
            "31.172.in-addr.arpa"
        );
    }

    #[test]
    fn public_and_near_miss_ipv4_are_rejected() {
        for addr in ["8.8.8.8", "192.169.0.1", "172.32.0.1", "172.15.0.1", "11.0.0.1"] {
            let err = reverse_zone_of(addr, "A").unwrap_err();
            assert!(
                matches!(err, ReverseError::UnsupportedAddressSpace(ref a) if a == addr),
                "expected unsupported address space for {addr}, got {err}"
            );
        }
    }

    #[test]
    fn malformed_literals_are_invalid_not_unsupported() {
        assert!(matches!(
            reverse_zone_of("10.1.2", "A").unwrap_err(),
            ReverseError::InvalidAddress { .. }
        ));
        assert!(matches!(
            reverse_zone_of("fd00::g", "AAAA").unwrap_err(),
            ReverseError::InvalidAddress { .. }
        ));
    }

    #[test]
    fn ipv6_prefixes_map_to_fixed_suffixes() {
        assert_eq!(
            reverse_zone_of("fd12:3456::1", "AAAA").unwrap(),
            IPV6_ULA_SUFFIX
        );
        assert_eq!(
            reverse_zone_of("2001:db8::1", "AAAA").unwrap(),
            IPV6_GLOBAL_SUFFIX
        );
        assert!(matches!(
            reverse_zone_of("fe80::1", "AAAA").unwrap_err(),
            ReverseError::UnsupportedAddressSpace(_)
        ));
        // fc00::/8 is unique-local but not the designated fd00::/8 slice
        assert!(matches!(
            reverse_zone_of("fc00::1", "AAAA").unwrap_err(),
            ReverseError::UnsupportedAddressSpace(_)
        ));
    }

    #[test]
    fn non_address_record_types_are_rejected() {
        assert!(matches!(
            reverse_zone_of("10.1.2.3", "CNAME").unwrap_err(),
            ReverseError::UnsupportedRecordType(_)
        ));
    }

    #[test]
    fn ptr_host_reverses_octets_and_nibbles() {
        assert_eq!(ptr_host("10.1.2.3", "A").unwrap(), "3.2.1.10.in-addr.arpa.");

        let host = ptr_host("fd00::1", "AAAA").unwrap();
        let nibbles = host.strip_suffix(".ip6.arpa.").unwrap();
        assert_eq!(nibbles.split('.').count(), 32);
        assert!(nibbles.starts_with("1.0.0.0."));
        assert!(nibbles.ends_with(".0.0.d.f"));
    }

    #[test]
    fn reversing_labels_twice_is_identity() {
        for s in ["3.2.1.10", "10.1.2.3", "a.b.c", "single"] {
            assert_eq!(reverse_labels(&reverse_labels(s)), s);
        }
    }
}

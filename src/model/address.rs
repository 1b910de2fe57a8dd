// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Component A: the address normalizer. Converts `(family, bytes, port)`
//! triples into a canonical [`DiscoveryAddress`]; every address that enters
//! the session registry passes through [`normalize`] first, since the
//! registry compares addresses byte-wise.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{DiscoveryError, Result};

/// A canonical, byte-exact address plus the target portal group tag it was
/// discovered (or configured) under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiscoveryAddress {
    ip: IpAddr,
    port: u16,
    tpgt: u16,
}

impl DiscoveryAddress {
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tpgt(&self) -> u16 {
        self.tpgt
    }

    /// Byte-exact comparison ignoring TPGT, used by the Static `del` match
    /// algebra which only cares about the active connection's base address.
    pub fn same_base(&self, other: &DiscoveryAddress) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

/// Normalizes a raw `(insize, raw_bytes, port)` triple into a canonical
/// address. `insize` must be 4 (IPv4) or 16 (IPv6); anything else is
/// [`DiscoveryError::BadAddress`]. `port` is interpreted as host-order and
/// stored in the canonical form; callers that received it in network byte
/// order must convert before calling.
pub fn normalize(raw: &[u8], port: u16, tpgt: u16) -> Result<DiscoveryAddress> {
    let ip = match raw.len() {
        4 => {
            let mut b = [0u8; 4];
            b.copy_from_slice(raw);
            IpAddr::V4(Ipv4Addr::from(b))
        },
        16 => {
            let mut b = [0u8; 16];
            b.copy_from_slice(raw);
            IpAddr::V6(Ipv6Addr::from(b))
        },
        other => return Err(DiscoveryError::BadAddress(other)),
    };

    Ok(DiscoveryAddress { ip, port, tpgt })
}

/// Builds a canonical address directly from a parsed [`IpAddr`], used by
/// collaborators (store, SendTargets client) that already hand back a typed
/// address rather than raw bytes.
pub fn from_ip(ip: IpAddr, port: u16, tpgt: u16) -> DiscoveryAddress {
    DiscoveryAddress { ip, port, tpgt }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn normalizes_v4() {
        let addr = normalize(&[10, 0, 0, 1], 3260, 1).expect("valid v4");
        assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(addr.port(), 3260);
        assert_eq!(addr.tpgt(), 1);
    }

    #[test]
    fn normalizes_v6() {
        let raw = [0u8; 16];
        let addr = normalize(&raw, 3260, 0).expect("valid v6");
        assert!(addr.ip().is_ipv6());
    }

    #[test]
    fn rejects_bad_length() {
        let err = normalize(&[1, 2, 3], 3260, 0).unwrap_err();
        assert!(matches!(err, DiscoveryError::BadAddress(3)));
    }

    #[test]
    fn same_base_ignores_tpgt() {
        let a = normalize(&[10, 0, 0, 1], 3260, 1).expect("valid");
        let b = normalize(&[10, 0, 0, 1], 3260, 2).expect("valid");
        assert!(a.same_base(&b));
    }
}

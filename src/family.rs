//! Address family tags and their POSIX-compatible numeric values.

use serde::{Deserialize, Serialize};

/// The address family of a stored or queried prefix.
///
/// The numeric discriminants match the POSIX `AF_INET`/`AF_INET6` values so
/// that a family tag round-trips through any host interface that expects
/// the standard socket constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Family {
    /// IPv4, `AF_INET` (2).
    V4 = 2,
    /// IPv6, `AF_INET6` (30).
    V6 = 30,
}

impl Family {
    /// Maximum number of significant bits a prefix of this family can carry.
    pub const fn maxbits(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }

    /// Number of address bytes this family occupies on the wire.
    pub const fn byte_len(self) -> usize {
        self.maxbits() as usize / 8
    }

    pub(crate) fn from_addr(addr: &std::net::IpAddr) -> Self {
        match addr {
            std::net::IpAddr::V4(_) => Family::V4,
            std::net::IpAddr::V6(_) => Family::V6,
        }
    }
}

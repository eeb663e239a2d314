//! Error kinds surfaced by the store (§7).
//!
//! Every fallible operation returns one of these; nothing is swallowed or
//! retried internally.

use std::fmt;

/// Errors returned by [`crate::PrefixMap`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixMapError {
    /// The key failed parsing, or violated the map's family/length
    /// constraints.
    BadKey,
    /// An exact lookup or deletion targeted a prefix that isn't stored.
    NotFound,
    /// The operation needs the trie in the opposite frozen/thawed state
    /// than it is currently in: a mutation was attempted on a frozen trie,
    /// or a frozen-only operation (serialization) was attempted on a
    /// thawed one.
    Frozen,
    /// Allocating a new node failed (arena index space exhausted).
    Capacity,
    /// A snapshot failed structural validation during restore: wrong blob
    /// size, a value list length mismatch, or a pointer outside the
    /// arena.
    CorruptState,
}

impl fmt::Display for PrefixMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixMapError::BadKey => {
                write!(f, "Error: the key could not be parsed into a prefix.")
            }
            PrefixMapError::NotFound => {
                write!(f, "Error: no exact match for the requested prefix.")
            }
            PrefixMapError::Frozen => write!(
                f,
                "Error: the trie's frozen/thawed state does not permit \
                 this operation."
            ),
            PrefixMapError::Capacity => write!(
                f,
                "Error: the node arena could not grow to satisfy the \
                 request."
            ),
            PrefixMapError::CorruptState => write!(
                f,
                "Error: the snapshot failed structural validation during \
                 restore."
            ),
        }
    }
}

impl std::error::Error for PrefixMapError {}

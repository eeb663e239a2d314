//! An in-memory Patricia trie for longest-prefix-match (LPM) lookup over
//! IPv4/IPv6 prefixes.
//!
//! [`PrefixMap`] is the public entry point: a map keyed on [`Prefix`]-like
//! things (text, raw bytes, host [`inetnum::addr::Prefix`] objects, ...)
//! that supports exact lookup, LPM lookup, parent/children queries, and a
//! freeze/thaw cycle for compacting a live trie into a single contiguous
//! arena suitable for serialization.

mod error;
mod family;
mod freeze;
mod key;
mod map;
mod node;
mod options;
mod prefix;
mod trie;
mod value;

pub use error::PrefixMapError;
pub use family::Family;
pub use key::{IntoPrefixKey, Key};
pub use map::{PrefixMap, Snapshot};
pub use options::PrefixMapOptions;
pub use prefix::Prefix;
pub use value::{NoopLifecycle, ValueLifecycle};

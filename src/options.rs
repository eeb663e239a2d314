//! Construction options (§6), validated once at construction time.

use crate::family::Family;

/// Options controlling how a [`crate::map::PrefixMap`] is built.
#[derive(Debug, Clone, Copy)]
pub struct PrefixMapOptions {
    /// Maximum bit length accepted by this map, `0..=family.maxbits()`.
    pub maxbits: u8,
    /// The address family this map accepts keys for.
    pub family: Family,
    /// Whether rendered keys come back as `"A.B.C.D/N"` text (`false`,
    /// the default) or `(bytes, bitlen)` tuples (`true`).
    pub raw_output: bool,
}

impl Default for PrefixMapOptions {
    fn default() -> Self {
        PrefixMapOptions {
            maxbits: 32,
            family: Family::V4,
            raw_output: false,
        }
    }
}

impl PrefixMapOptions {
    /// Panics if `maxbits` exceeds the family's natural width — this is a
    /// programmer error, not a runtime data error, so it is not part of
    /// [`crate::error::PrefixMapError`] (§4.7).
    pub(crate) fn validate(&self) {
        assert!(
            self.maxbits <= self.family.maxbits(),
            "maxbits {} exceeds {:?}'s width of {} bits",
            self.maxbits,
            self.family,
            self.family.maxbits()
        );
    }
}

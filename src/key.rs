//! Key adapter boundary (§4.4): turns whatever shape of key a caller hands
//! in into a validated [`Prefix`], and turns a stored [`Prefix`] back into
//! the caller-facing [`Key`] representation the `raw_output` option picks.

use std::fmt;
use std::str::FromStr;

use crate::error::PrefixMapError;
use crate::family::Family;
use crate::prefix::Prefix;

/// A rendered key, in whichever form [`crate::map::PrefixMapOptions::raw_output`]
/// selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// `"A.B.C.D/N"` or IPv6 canonical `"h:h::/N"`.
    Text(String),
    /// Raw address bytes (length 4 or 16) and the bit length.
    Raw(Vec<u8>, u8),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Text(s) => write!(f, "{s}"),
            Key::Raw(bytes, bitlen) => write!(f, "{bytes:?}/{bitlen}"),
        }
    }
}

pub(crate) fn render(prefix: &Prefix, raw_output: bool) -> Key {
    if raw_output {
        Key::Raw(prefix.as_bytes().to_vec(), prefix.bitlen())
    } else {
        let inet: inetnum::addr::Prefix = (*prefix).into();
        Key::Text(inet.to_string())
    }
}

/// Converts a caller-supplied key into a [`Prefix`] validated against the
/// map's configured `family`/`maxbits` (§4.4).
///
/// Implemented for the textual, integer, raw-byte, tuple, and host
/// network-object forms spec.md calls out; invalid inputs always yield
/// [`PrefixMapError::BadKey`] rather than a partially built `Prefix`.
pub trait IntoPrefixKey {
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError>;

    /// Like [`IntoPrefixKey::into_prefix_key`], but a caller-supplied bit
    /// length overrides whatever the key itself implied (insert's second
    /// arity, §6).
    ///
    /// Each implementation overrides this directly, re-deriving from its
    /// own unmasked source bytes rather than routing through
    /// [`IntoPrefixKey::into_prefix_key`] — that method's `Prefix::new`
    /// already masks trailing bits to the *original* parsed length, so
    /// chaining through it and re-masking at `len` would zero out real
    /// address bits whenever `len` widens past that original length (e.g.
    /// `"10.1.2.3/8"` overridden to `/24` must keep the `.2` octet, not
    /// re-derive it from a `10.0.0.0/8` already masked down to zero).
    ///
    /// This default is only reached by an implementor with no unmasked
    /// source left to recover — concretely, [`Prefix`] itself, which is
    /// already masked at its own `bitlen` by the time it reaches here, so
    /// there is nothing better to re-derive from.
    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError>
    where
        Self: Sized,
    {
        let p = self.into_prefix_key(family, maxbits)?;
        Prefix::new(p.family(), p.as_bytes(), len)
    }
}

fn check_family(
    actual: Family,
    expected: Family,
) -> Result<(), PrefixMapError> {
    if actual == expected {
        Ok(())
    } else {
        Err(PrefixMapError::BadKey)
    }
}

/// Parses just the address portion of a textual key (dropping any `/N`
/// suffix entirely), so a caller-supplied override length has unmasked
/// address bytes to apply itself to.
fn addr_only_bytes(
    s: &str,
) -> Result<(Family, Vec<u8>), PrefixMapError> {
    let addr_part = s.split('/').next().unwrap_or(s);
    let addr = addr_part
        .parse::<std::net::IpAddr>()
        .map_err(|_| PrefixMapError::BadKey)?;
    let (family, bytes) = match addr {
        std::net::IpAddr::V4(v4) => (Family::V4, v4.octets().to_vec()),
        std::net::IpAddr::V6(v6) => (Family::V6, v6.octets().to_vec()),
    };
    Ok((family, bytes))
}

impl IntoPrefixKey for &str {
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let inet = inetnum::addr::Prefix::from_str(self)
            .or_else(|_| {
                // Bare address, no "/N": inetnum parses addresses too, so
                // fall back to the address-only form with a full-width
                // prefix length.
                self.parse::<std::net::IpAddr>()
                    .map_err(|_| ())
                    .and_then(|addr| {
                        let len = match addr {
                            std::net::IpAddr::V4(_) => 32,
                            std::net::IpAddr::V6(_) => 128,
                        };
                        inetnum::addr::Prefix::new(addr, len).map_err(|_| ())
                    })
            })
            .map_err(|_| PrefixMapError::BadKey)?;
        let prefix: Prefix = inet.try_into()?;
        check_family(prefix.family(), family)?;
        if prefix.bitlen() > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Ok(prefix)
    }

    /// Re-parses just the address part (ignoring any `/N` the text itself
    /// carries) so widening `len` past the text's own parsed length keeps
    /// the real address bits instead of re-masking an already-masked
    /// `Prefix`.
    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let (parsed_family, bytes) = addr_only_bytes(self)?;
        check_family(parsed_family, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(parsed_family, &bytes, len)
    }
}

impl IntoPrefixKey for String {
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        self.as_str().into_prefix_key(family, maxbits)
    }

    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        self.as_str().into_prefix_key_with_len(family, maxbits, len)
    }
}

impl IntoPrefixKey for u32 {
    /// V4-only: the host-order integer's big-endian byte representation
    /// becomes a /32 address (§4.4).
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V4, family)?;
        if maxbits < 32 {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(Family::V4, &self.to_be_bytes(), 32)
    }

    /// The integer's bytes are already the raw, unmasked address, so the
    /// override length applies directly.
    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V4, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(Family::V4, &self.to_be_bytes(), len)
    }
}

impl IntoPrefixKey for [u8; 4] {
    fn into_prefix_key(
        self,
        family: Family,
        _maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V4, family)?;
        Prefix::new(Family::V4, &self, 32)
    }

    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V4, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(Family::V4, &self, len)
    }
}

impl IntoPrefixKey for [u8; 16] {
    fn into_prefix_key(
        self,
        family: Family,
        _maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V6, family)?;
        Prefix::new(Family::V6, &self, 128)
    }

    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(Family::V6, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(Family::V6, &self, len)
    }
}

impl IntoPrefixKey for (Vec<u8>, u8) {
    /// `(bytes, bitlen)`, bytes length 4 or 16; `bitlen` is clamped down
    /// to the family's maxbits if it overshoots (§4.4).
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let (bytes, bitlen) = self;
        let inferred = match bytes.len() {
            4 => Family::V4,
            16 => Family::V6,
            _ => return Err(PrefixMapError::BadKey),
        };
        check_family(inferred, family)?;
        let clamped = bitlen.min(maxbits);
        Prefix::new(inferred, &bytes, clamped)
    }

    /// The tuple's own `bitlen` is simply discarded in favor of the
    /// override; `bytes` is the raw address regardless.
    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let (bytes, _bitlen) = self;
        let inferred = match bytes.len() {
            4 => Family::V4,
            16 => Family::V6,
            _ => return Err(PrefixMapError::BadKey),
        };
        check_family(inferred, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Prefix::new(inferred, &bytes, len)
    }
}

impl IntoPrefixKey for inetnum::addr::Prefix {
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let prefix: Prefix = self.try_into()?;
        check_family(prefix.family(), family)?;
        if prefix.bitlen() > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Ok(prefix)
    }

    /// `addr()` is the full host address regardless of this prefix's own
    /// `len()`, so it is already the unmasked source the override needs.
    fn into_prefix_key_with_len(
        self,
        family: Family,
        maxbits: u8,
        len: u8,
    ) -> Result<Prefix, PrefixMapError> {
        let fam = Family::from_addr(&self.addr());
        check_family(fam, family)?;
        if len > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        let bytes: Vec<u8> = match self.addr() {
            std::net::IpAddr::V4(v4) => v4.octets().to_vec(),
            std::net::IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Prefix::new(fam, &bytes, len)
    }
}

impl IntoPrefixKey for Prefix {
    fn into_prefix_key(
        self,
        family: Family,
        maxbits: u8,
    ) -> Result<Prefix, PrefixMapError> {
        check_family(self.family(), family)?;
        if self.bitlen() > maxbits {
            return Err(PrefixMapError::BadKey);
        }
        Ok(self)
    }
}

//! Integer types used in blockchain models.

use crate::cell::{CellBuilder, CellSlice, Load, Store};
use crate::error::Error;
use crate::util::unlikely;

/// Variable-length 120-bit integer. Used for native currencies.
///
/// Stored as 4 bits of `len` (`0..=15`), followed by `len` bytes.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tokens(u128);

impl Tokens {
    /// The additive identity for this integer type, i.e. `0`.
    pub const ZERO: Self = Tokens(0);

    /// The multiplicative identity for this integer type, i.e. `1`.
    pub const ONE: Self = Tokens(1);

    /// The largest value that can be represented by this integer type.
    pub const MAX: Self = Tokens((1u128 << (Self::MAX_BYTES * 8)) - 1);

    /// The number of data bits that the length occupies.
    pub const LEN_BITS: u16 = 4;

    /// The maximum number of data bits that this struct occupies.
    pub const MAX_BITS: u16 = Self::LEN_BITS + Self::MAX_BYTES as u16 * 8;

    const MAX_BYTES: u32 = 15;

    /// Creates a new integer value from a primitive integer.
    #[inline]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Converts integer into an underlying primitive integer.
    #[inline]
    pub const fn into_inner(self) -> u128 {
        self.0
    }

    /// Returns `true` if an underlying primitive integer is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if an underlying primitive integer fits into the repr.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX.0
    }

    /// Returns number of data bits that this struct occupies.
    /// Returns `None` if an underlying primitive integer is too large.
    pub const fn bit_len(&self) -> Option<u16> {
        let bytes = 16 - self.0.leading_zeros() / 8;
        if unlikely(bytes > Self::MAX_BYTES) {
            None
        } else {
            Some(Self::LEN_BITS + bytes as u16 * 8)
        }
    }

    /// Returns number of data bits that this struct occupies.
    /// Returns [`MAX_BITS`] if an underlying primitive integer is too large.
    ///
    /// [`MAX_BITS`]: Self::MAX_BITS
    pub const fn unwrap_bit_len(&self) -> u16 {
        match self.bit_len() {
            Some(bit_len) => bit_len,
            None => Self::MAX_BITS,
        }
    }

    /// Checked integer addition. Computes `self + rhs`, returning `None` if overflow occurred.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(value) if value <= Self::MAX.0 => Some(Tokens(value)),
            _ => None,
        }
    }

    /// Checked integer subtraction. Computes `self - rhs`, returning `None` if overflow occurred.
    #[inline]
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(value) => Some(Tokens(value)),
            None => None,
        }
    }
}

impl From<u64> for Tokens {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl TryFrom<u128> for Tokens {
    type Error = Error;

    #[inline]
    fn try_from(value: u128) -> Result<Self, Self::Error> {
        let value = Self(value);
        if value.is_valid() {
            Ok(value)
        } else {
            Err(Error::IntOverflow)
        }
    }
}

impl std::fmt::Display for Tokens {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::str::FromStr for Tokens {
    type Err = std::num::ParseIntError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u128::from_str(s).map(Self)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Tokens {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(&self.0)
        } else {
            self.0.serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Tokens {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Unexpected, Visitor};

        struct Expected;

        impl serde::de::Expected for Expected {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("Tokens")
            }
        }

        struct TokensVisitor;

        impl Visitor<'_> for TokensVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a string with a number")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(v as u128)
            }
        }

        let res = Self::new(ok!(if deserializer.is_human_readable() {
            deserializer.deserialize_any(TokensVisitor)
        } else {
            u128::deserialize(deserializer)
        }));

        if res.is_valid() {
            Ok(res)
        } else {
            Err(D::Error::invalid_type(
                Unexpected::Other("big number"),
                &Expected,
            ))
        }
    }
}

impl Store for Tokens {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let bytes = (16 - self.0.leading_zeros() / 8) as u8;
        let bits = bytes as u16 * 8;

        if unlikely(
            bytes as u32 > Self::MAX_BYTES || !builder.has_capacity(Self::LEN_BITS + bits, 0),
        ) {
            return Err(Error::CellOverflow);
        }

        ok!(builder.store_small_uint(bytes, Self::LEN_BITS));
        store_u128(builder, self.0, bits)
    }
}

impl<'a> Load<'a> for Tokens {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let bytes = ok!(slice.load_small_uint(Self::LEN_BITS));
        match load_u128(slice, bytes) {
            Ok(value) => Ok(Self(value)),
            Err(e) => Err(e),
        }
    }
}

fn store_u128(builder: &mut CellBuilder, value: u128, bits: u16) -> Result<(), Error> {
    if let Some(high_bits) = bits.checked_sub(64) {
        ok!(builder.store_uint((value >> 64) as u64, high_bits));
    }
    builder.store_uint(value as u64, std::cmp::min(bits, 64))
}

fn load_u128(slice: &mut CellSlice<'_>, bytes: u8) -> Result<u128, Error> {
    let mut result: u128 = 0;
    if let Some(high_bytes) = bytes.checked_sub(8) {
        if high_bytes > 0 {
            result = (ok!(slice.load_uint(high_bytes as u16 * 8)) as u128) << 64;
        }
    }

    let low_bytes = std::cmp::min(bytes, 8);
    result |= ok!(slice.load_uint(low_bytes as u16 * 8)) as u128;
    Ok(result)
}

use rand::RngCore;

use crate::cell::*;
use crate::dict::DictKey;
use crate::error::{Error, TransferError};
use crate::util::read_be_uint;

/// Source of the current unix timestamp.
pub trait Clock {
    /// Returns the current unix timestamp in seconds.
    fn now_sec(&self) -> Result<u32, TransferError>;
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline]
    fn now_sec(&self) -> Result<u32, TransferError> {
        T::now_sec(self)
    }
}

/// System time clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_sec(&self) -> Result<u32, TransferError> {
        let Ok(now) = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH) else {
            return Err(TransferError::Clock);
        };
        u32::try_from(now.as_secs()).map_err(|_| TransferError::Clock)
    }
}

/// Clock which always returns the same timestamp.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    #[inline]
    fn now_sec(&self) -> Result<u32, TransferError> {
        Ok(self.0)
    }
}

/// Replay protection identifier of the highload wallet V2.
///
/// Upper 32 bits contain the expiration timestamp,
/// lower 32 bits contain a random nonce.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct QueryId(u64);

impl QueryId {
    /// The number of bits in a random nonce.
    pub const NONCE_BITS: u32 = 30;

    /// The largest allowed nonce.
    pub const MAX_NONCE: u32 = (1 << Self::NONCE_BITS) - 1;

    /// Creates a query id from its parts.
    #[inline]
    pub const fn new(expire_at: u32, nonce: u32) -> Self {
        Self(((expire_at as u64) << 32) | nonce as u64)
    }

    /// Wraps a raw query id.
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw query id.
    #[inline]
    pub const fn into_inner(self) -> u64 {
        self.0
    }

    /// Returns the expiration timestamp.
    #[inline]
    pub const fn expire_at(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the nonce part.
    #[inline]
    pub const fn nonce(&self) -> u32 {
        self.0 as u32
    }

    /// Returns `true` if the query has expired at the specified time.
    #[inline]
    pub const fn is_expired(&self, now: u32) -> bool {
        self.expire_at() <= now
    }

    /// Generates a new query id which expires after `timeout` seconds.
    ///
    /// Uses the specified nonce or a fresh random one.
    pub fn generate<C, R>(
        timeout: u32,
        nonce: Option<u32>,
        clock: &C,
        rng: &mut R,
    ) -> Result<Self, TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized,
    {
        let now = ok!(clock.now_sec());
        let Some(expire_at) = now.checked_add(timeout) else {
            return Err(TransferError::InvalidInputRange { field: "timeout" });
        };

        let nonce = match nonce {
            Some(nonce) if nonce > Self::MAX_NONCE => {
                return Err(TransferError::InvalidInputRange { field: "random_id" })
            }
            Some(nonce) => nonce,
            None => {
                let mut bytes = [0u8; 4];
                ok!(rng.try_fill_bytes(&mut bytes).map_err(TransferError::Random));
                u32::from_le_bytes(bytes) & Self::MAX_NONCE
            }
        };

        Ok(Self::new(expire_at, nonce))
    }
}

impl std::fmt::Display for QueryId {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<QueryId> for u64 {
    #[inline]
    fn from(value: QueryId) -> Self {
        value.0
    }
}

impl Store for QueryId {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u64(self.0)
    }
}

impl<'a> Load<'a> for QueryId {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_u64().map(Self)
    }
}

impl DictKey for QueryId {
    const BITS: u16 = 64;

    #[inline]
    fn from_raw_data(raw_data: &[u8; 128]) -> Option<Self> {
        Some(Self(read_be_uint(&raw_data[..8])))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for QueryId {
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
impl<'de> serde::Deserialize<'de> for QueryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        if deserializer.is_human_readable() {
            let s = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
            s.parse().map(Self).map_err(Error::custom)
        } else {
            u64::deserialize(deserializer).map(Self)
        }
    }
}

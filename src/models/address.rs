use std::str::FromStr;

use crate::cell::*;
use crate::error::{Error, ParseAddrError};

/// Standard internal address.
///
/// ```text
/// addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256 = MsgAddressInt;
/// ```
///
/// Anycast info is not supported, addresses with it are rejected on load.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StdAddr {
    /// Workchain id (one-byte range).
    pub workchain: i8,
    /// Account id.
    pub address: HashBytes,
}

impl StdAddr {
    /// The number of data bits that address without anycast occupies.
    ///
    /// - 2 bits id (`0b10`)
    /// - 1 bit Maybe None
    /// - 8 bits workchain
    /// - 256 bits address
    pub const BITS_WITHOUT_ANYCAST: u16 = 2 + 1 + 8 + 256;

    /// Constructs a new standard address.
    #[inline]
    pub const fn new(workchain: i8, address: HashBytes) -> Self {
        Self { workchain, address }
    }

    /// Returns `true` if this address is for a masterchain block.
    #[inline]
    pub const fn is_masterchain(&self) -> bool {
        self.workchain == -1
    }
}

impl std::fmt::Display for StdAddr {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}:{}", self.workchain, self.address))
    }
}

impl FromStr for StdAddr {
    type Err = ParseAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseAddrError::Empty);
        }

        let mut result = Self::default();

        let mut parts = s.split(':');
        match parts.next() {
            Some(part) => match part.parse() {
                Ok(workchain) => result.workchain = workchain,
                Err(_) => return Err(ParseAddrError::InvalidWorkchain),
            },
            None => return Err(ParseAddrError::Empty),
        }

        match parts.next() {
            Some(part) => match hex::decode_to_slice(part, &mut result.address.0) {
                Ok(()) => {}
                Err(_) => return Err(ParseAddrError::InvalidAccountId),
            },
            None => return Err(ParseAddrError::InvalidAccountId),
        }

        if parts.next().is_none() {
            Ok(result)
        } else {
            Err(ParseAddrError::UnexpectedPart)
        }
    }
}

impl Store for StdAddr {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(Self::BITS_WITHOUT_ANYCAST, 0) {
            return Err(Error::CellOverflow);
        }
        ok!(builder.store_small_uint(0b100, 3));
        ok!(builder.store_u8(self.workchain as u8));
        builder.store_u256(&self.address)
    }
}

impl<'a> Load<'a> for StdAddr {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_small_uint(2)) != 0b10 {
            return Err(Error::InvalidTag);
        }
        if ok!(slice.load_bit()) {
            // Anycast
            return Err(Error::InvalidData);
        }

        Ok(Self {
            workchain: ok!(slice.load_u8()) as i8,
            address: ok!(slice.load_u256()),
        })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StdAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            (self.workchain, &self.address).serialize(serializer)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StdAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct AddrVisitor;

        impl Visitor<'_> for AddrVisitor {
            type Value = StdAddr;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a raw address")
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Self::Value, E> {
                StdAddr::from_str(v).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(AddrVisitor)
        } else {
            <(i8, HashBytes)>::deserialize(deserializer)
                .map(|(workchain, address)| Self::new(workchain, address))
        }
    }
}

/// Stores an optional address as `addr_none$00` or `addr_std`.
pub(crate) fn store_opt_addr(builder: &mut CellBuilder, addr: &Option<StdAddr>) -> Result<(), Error> {
    match addr {
        Some(addr) => addr.store_into(builder),
        None => builder.store_zeros(2),
    }
}

/// Loads an optional address stored as `addr_none$00` or `addr_std`.
pub(crate) fn load_opt_addr(slice: &mut CellSlice<'_>) -> Result<Option<StdAddr>, Error> {
    match slice.get_small_uint(0, 2) {
        Some(0b00) => {
            ok!(slice.skip_first(2, 0));
            Ok(None)
        }
        Some(_) => StdAddr::load_from(slice).map(Some),
        None => Err(Error::CellUnderflow),
    }
}

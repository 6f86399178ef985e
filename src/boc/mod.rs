//! BOC (Bag Of Cells) implementation.

use crate::cell::Cell;

/// BOC decoder implementation.
pub mod de;
/// BOC encoder implementation.
pub mod ser;

#[cfg(test)]
mod tests;

/// BOC file magic number.
#[derive(Default, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Single root, cells index, no CRC32.
    Indexed,
    /// Single root, cells index, with CRC32.
    IndexedCrc32,
    /// Multiple roots, optional cells index, optional CRC32.
    #[default]
    Generic,
}

impl BocTag {
    const INDEXED: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const INDEXED_CRC32: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const GENERIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Tries to match bytes with BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::GENERIC => Some(Self::Generic),
            Self::INDEXED_CRC32 => Some(Self::IndexedCrc32),
            Self::INDEXED => Some(Self::Indexed),
            _ => None,
        }
    }

    /// Converts BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::INDEXED,
            Self::IndexedCrc32 => Self::INDEXED_CRC32,
            Self::Generic => Self::GENERIC,
        }
    }
}

/// BOC encoder and decoder.
pub struct Boc;

impl Boc {
    /// Encodes the specified cell tree as BOC and
    /// returns the `base64` encoded bytes as a string.
    #[cfg(any(feature = "base64", test))]
    pub fn encode_base64(cell: &Cell) -> String {
        crate::util::encode_base64(Self::encode(cell))
    }

    /// Encodes the specified cell tree as BOC.
    pub fn encode(cell: &Cell) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::with_root(cell).encode(&mut result);
        result
    }

    /// Encodes the specified cell tree as BOC with a CRC32C checksum.
    pub fn encode_with_crc(cell: &Cell) -> Vec<u8> {
        let mut result = Vec::new();
        ser::BocHeader::with_root(cell)
            .with_crc(true)
            .encode(&mut result);
        result
    }

    /// Encodes the specified cell tree with a checksum and
    /// returns the `base64` encoded bytes as a string.
    #[cfg(any(feature = "base64", test))]
    pub fn encode_base64_with_crc(cell: &Cell) -> String {
        crate::util::encode_base64(Self::encode_with_crc(cell))
    }

    /// Decodes a `base64` encoded BOC into a cell tree.
    #[cfg(any(feature = "base64", test))]
    #[inline]
    pub fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        fn decode_base64_impl(data: &[u8]) -> Result<Cell, de::Error> {
            match crate::util::decode_base64(data) {
                Ok(data) => Boc::decode(data),
                Err(_) => Err(de::Error::UnknownBocTag),
            }
        }
        decode_base64_impl(data.as_ref())
    }

    /// Decodes a cell tree from hex encoded bytes.
    pub fn decode_hex<T: AsRef<[u8]>>(data: T) -> Result<Cell, de::Error> {
        match hex::decode(data) {
            Ok(data) => Boc::decode(data),
            Err(_) => Err(de::Error::UnknownBocTag),
        }
    }

    /// Decodes a cell tree from BOC bytes with exactly one root.
    #[inline]
    pub fn decode<T>(data: T) -> Result<Cell, de::Error>
    where
        T: AsRef<[u8]>,
    {
        fn decode_impl(data: &[u8]) -> Result<Cell, de::Error> {
            let header = ok!(de::BocHeader::decode(data, &de::Options::exact(1)));

            if let Some(&root) = header.roots().first() {
                let cells = ok!(header.finalize());
                if let Some(root) = cells.get(root) {
                    return Ok(root);
                }
            }

            Err(de::Error::RootCellNotFound)
        }
        decode_impl(data.as_ref())
    }

    /// Serializes cell into an encoded BOC (as base64 for human readable serializers).
    #[cfg(feature = "serde")]
    pub fn serialize<S>(cell: &Cell, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&Self::encode_base64(cell))
        } else {
            serializer.serialize_bytes(&Self::encode(cell))
        }
    }

    /// Deserializes cell from an encoded BOC (from base64 for human readable deserializers).
    #[cfg(feature = "serde")]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Cell, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct BocVisitor;

        impl<'de> Visitor<'de> for BocVisitor {
            type Value = Cell;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a BOC encoded cell")
            }

            fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
                Boc::decode_base64(value).map_err(E::custom)
            }

            fn visit_bytes<E: Error>(self, value: &[u8]) -> Result<Self::Value, E> {
                Boc::decode(value).map_err(E::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(BocVisitor)
        } else {
            deserializer.deserialize_bytes(BocVisitor)
        }
    }
}

//! Cell tree implementation.

use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use sha2::Digest;
use smallvec::SmallVec;

use crate::error::{Error, ParseHashBytesError};
use crate::util::Bitstring;

pub use self::builder::CellBuilder;
pub use self::slice::CellSlice;

mod builder;
mod slice;

/// Maximum number of data bits in a cell.
pub const MAX_BIT_LEN: u16 = 1023;

/// Maximum number of child cells.
pub const MAX_REF_COUNT: usize = 4;

/// Maximum depth of a cell tree.
pub const MAX_DEPTH: u16 = 1024;

/// A data structure that can be serialized into cells.
pub trait Store {
    /// Tries to store itself into the cell builder.
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error>;
}

impl<T: Store + ?Sized> Store for &T {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self, builder)
    }
}

impl<T: Store + ?Sized> Store for Box<T> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        <T as Store>::store_into(self.as_ref(), builder)
    }
}

impl<T: Store> Store for Option<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Some(data) => {
                ok!(builder.store_bit_one());
                data.store_into(builder)
            }
            None => builder.store_bit_zero(),
        }
    }
}

impl Store for () {
    #[inline]
    fn store_into(&self, _: &mut CellBuilder) -> Result<(), Error> {
        Ok(())
    }
}

impl Store for Cell {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_reference(self.clone())
    }
}

impl Store for CellSlice<'_> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_slice(self)
    }
}

impl Store for HashBytes {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u256(self)
    }
}

macro_rules! impl_primitive_store {
    ($($type:ty => |$b:ident, $v:ident| $expr:expr),*$(,)?) => {
        $(impl Store for $type {
            #[inline]
            fn store_into(&self, $b: &mut CellBuilder) -> Result<(), Error> {
                let $v = self;
                $expr
            }
        })*
    };
}

impl_primitive_store! {
    bool => |b, v| b.store_bit(*v),
    u8 => |b, v| b.store_u8(*v),
    i8 => |b, v| b.store_u8(*v as u8),
    u16 => |b, v| b.store_u16(*v),
    i16 => |b, v| b.store_u16(*v as u16),
    u32 => |b, v| b.store_u32(*v),
    i32 => |b, v| b.store_u32(*v as u32),
    u64 => |b, v| b.store_u64(*v),
    i64 => |b, v| b.store_u64(*v as u64),
}

/// A data structure that can be deserialized from cells.
pub trait Load<'a>: Sized {
    /// Tries to load itself from a cell slice.
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error>;
}

impl<'a, T: Load<'a>> Load<'a> for Option<T> {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_bit()) {
            Ok(Some(ok!(T::load_from(slice))))
        } else {
            Ok(None)
        }
    }
}

impl<'a> Load<'a> for () {
    #[inline]
    fn load_from(_: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(())
    }
}

impl<'a> Load<'a> for Cell {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_reference_cloned()
    }
}

impl<'a> Load<'a> for CellSlice<'a> {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let result = *slice;
        ok!(slice.skip_first(result.remaining_bits(), result.remaining_refs()));
        Ok(result)
    }
}

impl<'a> Load<'a> for HashBytes {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        slice.load_u256()
    }
}

macro_rules! impl_primitive_load {
    ($($type:ty => |$s:ident| $expr:expr),*$(,)?) => {
        $(impl<'a> Load<'a> for $type {
            #[inline]
            fn load_from($s: &mut CellSlice<'a>) -> Result<Self, Error> {
                $expr
            }
        })*
    };
}

impl_primitive_load! {
    bool => |s| s.load_bit(),
    u8 => |s| s.load_u8(),
    i8 => |s| Ok(ok!(s.load_u8()) as i8),
    u16 => |s| s.load_u16(),
    i16 => |s| Ok(ok!(s.load_u16()) as i16),
    u32 => |s| s.load_u32(),
    i32 => |s| Ok(ok!(s.load_u32()) as i32),
    u64 => |s| s.load_u64(),
    i64 => |s| Ok(ok!(s.load_u64()) as i64),
}

/// Two descriptor bytes of a cell.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(C)]
pub struct CellDescriptor {
    /// First descriptor byte with a generic info about cell.
    pub d1: u8,
    /// Second descriptor byte with a packed data size.
    pub d2: u8,
}

impl CellDescriptor {
    /// Bit mask to store the number of references in the descriptor.
    pub const REF_COUNT_MASK: u8 = 0b0000_0111;
    /// Bit mask to store the `is_exotic` flag in the descriptor.
    pub const IS_EXOTIC_MASK: u8 = 0b0000_1000;
    /// Bit mask to store the `store_hashes` flag in the descriptor.
    pub const STORE_HASHES_MASK: u8 = 0b0001_0000;
    /// Bit mask to store the level mask in the descriptor.
    pub const LEVEL_MASK: u8 = 0b1110_0000;

    /// Computes d1 descriptor byte for an ordinary cell.
    #[inline(always)]
    pub const fn compute_d1(ref_count: u8) -> u8 {
        ref_count & Self::REF_COUNT_MASK
    }

    /// Computes d2 descriptor byte from the cell length in bits.
    #[inline(always)]
    pub const fn compute_d2(bit_len: u16) -> u8 {
        (((bit_len >> 2) as u8) & !0b1) | ((bit_len % 8 != 0) as u8)
    }

    /// Constructs cell descriptor from descriptor bytes.
    #[inline(always)]
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self {
            d1: bytes[0],
            d2: bytes[1],
        }
    }

    /// Returns the number of child cells.
    #[inline(always)]
    pub const fn reference_count(self) -> u8 {
        self.d1 & Self::REF_COUNT_MASK
    }

    /// Returns whether the cell is not [`Ordinary`].
    ///
    /// [`Ordinary`]: CellType::Ordinary
    #[inline(always)]
    pub const fn is_exotic(self) -> bool {
        self.d1 & Self::IS_EXOTIC_MASK != 0
    }

    /// Returns whether this cell should store hashes in data.
    #[inline(always)]
    pub const fn store_hashes(self) -> bool {
        self.d1 & Self::STORE_HASHES_MASK != 0
    }

    /// Returns the raw level mask bits.
    #[inline(always)]
    pub const fn level_mask(self) -> u8 {
        self.d1 >> 5
    }

    /// Returns whether this cell refers to some external data.
    #[inline(always)]
    pub const fn is_absent(self) -> bool {
        self.d1 == (Self::REF_COUNT_MASK | Self::IS_EXOTIC_MASK)
    }

    /// Returns whether this cell data is 8-bit aligned.
    #[inline(always)]
    pub const fn is_aligned(self) -> bool {
        self.d2 & 1 == 0
    }

    /// Returns this cell data length in bytes.
    #[inline(always)]
    pub const fn byte_len(self) -> u8 {
        (self.d2 & 1) + (self.d2 >> 1)
    }
}

/// Cell type.
///
/// Only ordinary cells can be constructed by this crate.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum CellType {
    /// Cell of this type just stores data and references.
    #[default]
    Ordinary,
}

/// Immutable node of a cell tree.
///
/// Cheap to clone, all hashes are computed once on construction.
#[derive(Clone)]
#[repr(transparent)]
pub struct Cell(Arc<CellInner>);

struct CellInner {
    descriptor: CellDescriptor,
    bit_len: u16,
    data: Box<[u8]>,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
    repr_hash: HashBytes,
    repr_depth: u16,
}

impl Cell {
    /// Returns a static empty cell.
    pub fn empty_cell() -> Cell {
        static EMPTY_CELL: OnceLock<Cell> = OnceLock::new();
        EMPTY_CELL
            .get_or_init(|| {
                Cell::new_unchecked(CellDescriptor::new([0, 0]), 0, &[], SmallVec::new(), 0)
            })
            .clone()
    }

    /// Returns a static cell with [`MAX_BIT_LEN`] zero bits.
    pub fn all_zeros_ref() -> &'static Cell {
        static ALL_ZEROS: OnceLock<Cell> = OnceLock::new();
        ALL_ZEROS.get_or_init(|| {
            let mut data = [0u8; 128];
            data[127] = 0x01;
            Cell::new_unchecked(CellDescriptor::new([0, 0xff]), MAX_BIT_LEN, &data, SmallVec::new(), 0)
        })
    }

    /// Returns a static cell with [`MAX_BIT_LEN`] one bits.
    pub fn all_ones_ref() -> &'static Cell {
        static ALL_ONES: OnceLock<Cell> = OnceLock::new();
        ALL_ONES.get_or_init(|| {
            let data = [0xffu8; 128];
            Cell::new_unchecked(CellDescriptor::new([0, 0xff]), MAX_BIT_LEN, &data, SmallVec::new(), 0)
        })
    }

    /// Assembles an ordinary cell and computes its hash.
    ///
    /// `data` must already contain the completion tag.
    pub(crate) fn from_parts(
        bit_len: u16,
        data: &[u8],
        references: SmallVec<[Cell; MAX_REF_COUNT]>,
    ) -> Result<Self, Error> {
        if bit_len > MAX_BIT_LEN || references.len() > MAX_REF_COUNT {
            return Err(Error::InvalidCell);
        }

        let descriptor = CellDescriptor {
            d1: CellDescriptor::compute_d1(references.len() as u8),
            d2: CellDescriptor::compute_d2(bit_len),
        };
        if data.len() != descriptor.byte_len() as usize {
            return Err(Error::InvalidCell);
        }

        let mut repr_depth = 0u16;
        for child in &references {
            repr_depth = std::cmp::max(repr_depth, child.repr_depth() + 1);
        }
        if repr_depth > MAX_DEPTH {
            return Err(Error::DepthOverflow);
        }

        Ok(Self::new_unchecked(
            descriptor, bit_len, data, references, repr_depth,
        ))
    }

    fn new_unchecked(
        descriptor: CellDescriptor,
        bit_len: u16,
        data: &[u8],
        references: SmallVec<[Cell; MAX_REF_COUNT]>,
        repr_depth: u16,
    ) -> Self {
        let mut hasher = sha2::Sha256::new();
        hasher.update([descriptor.d1, descriptor.d2]);
        hasher.update(data);
        for child in &references {
            hasher.update(child.repr_depth().to_be_bytes());
        }
        for child in &references {
            hasher.update(child.repr_hash().as_slice());
        }

        Self(Arc::new(CellInner {
            descriptor,
            bit_len,
            data: data.into(),
            references,
            repr_hash: HashBytes(hasher.finalize().into()),
            repr_depth,
        }))
    }

    /// Returns cell descriptor.
    #[inline]
    pub fn descriptor(&self) -> CellDescriptor {
        self.0.descriptor
    }

    /// Returns the cell type.
    #[inline]
    pub fn cell_type(&self) -> CellType {
        CellType::Ordinary
    }

    /// Returns the raw data of this cell (with the completion tag).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.0.data
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.0.bit_len
    }

    /// Returns the number of child cells.
    #[inline]
    pub fn reference_count(&self) -> u8 {
        self.0.references.len() as u8
    }

    /// Returns a reference to the Nth child cell.
    #[inline]
    pub fn reference(&self, index: u8) -> Option<&Cell> {
        self.0.references.get(index as usize)
    }

    /// Returns the Nth child cell.
    #[inline]
    pub fn reference_cloned(&self, index: u8) -> Option<Cell> {
        self.reference(index).cloned()
    }

    /// Returns all child cells.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.0.references
    }

    /// Returns the representation hash of the cell.
    #[inline]
    pub fn repr_hash(&self) -> &HashBytes {
        &self.0.repr_hash
    }

    /// Returns the representation depth of the cell.
    #[inline]
    pub fn repr_depth(&self) -> u16 {
        self.0.repr_depth
    }

    /// Returns `true` if the cell has no data bits and no references.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.bit_len == 0 && self.0.references.is_empty()
    }

    /// Creates a read-only view for the whole cell.
    #[inline]
    pub fn as_slice(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Tries to parse the whole cell as `T`.
    ///
    /// Fails if some data or references are left unread.
    pub fn parse<'a, T: Load<'a>>(&'a self) -> Result<T, Error> {
        let mut slice = self.as_slice();
        let value = ok!(T::load_from(&mut slice));
        if slice.is_data_empty() && slice.is_refs_empty() {
            Ok(value)
        } else {
            Err(Error::InvalidData)
        }
    }

    /// Returns an object that implements [`Display`] for printing only the root cell.
    ///
    /// [`Display`]: std::fmt::Display
    pub fn display_root(&self) -> DisplayCellRoot<'_> {
        DisplayCellRoot(self)
    }

    /// Returns an object that implements [`Display`] for printing the whole tree.
    ///
    /// [`Display`]: std::fmt::Display
    pub fn display_tree(&self) -> DisplayCellTree<'_> {
        DisplayCellTree(self)
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Cell::empty_cell()
    }
}

impl Eq for Cell {}

impl PartialEq for Cell {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.repr_hash() == other.repr_hash()
    }
}

impl std::hash::Hash for Cell {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.repr_hash().hash(state)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cell")
            .field("bit_len", &self.bit_len())
            .field("refs", &self.reference_count())
            .field("repr_hash", self.repr_hash())
            .finish()
    }
}

/// Helper struct to print only the root cell in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellRoot<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellRoot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = Bitstring {
            bytes: self.0.data(),
            bit_len: self.0.bit_len(),
        };
        f.write_fmt(format_args!(
            "{data}\nbits: {:>4}, refs: {}, hash: {}",
            self.0.bit_len(),
            self.0.reference_count(),
            self.0.repr_hash(),
        ))
    }
}

/// Helper struct to print all cells in the cell tree.
#[derive(Clone, Copy)]
pub struct DisplayCellTree<'a>(&'a Cell);

impl std::fmt::Display for DisplayCellTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![(0, self.0)];

        while let Some((level, cell)) = stack.pop() {
            ok!(f.write_fmt(format_args!("{:level$}{}\n", "", cell.display_root())));

            for child in cell.references().iter().rev() {
                stack.push((level + 1, child));
            }
        }

        Ok(())
    }
}

/// Type alias for a cell hash.
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct HashBytes(pub [u8; 32]);

impl HashBytes {
    /// Array of zero bytes.
    pub const ZERO: Self = Self([0; 32]);

    /// Converts slice to a hash bytes.
    ///
    /// # Panics
    ///
    /// Panics if the length of the slice is not 32 bytes.
    #[inline]
    pub fn from_slice(slice: &[u8]) -> Self {
        Self(slice.try_into().expect("slice with incorrect length"))
    }

    /// Returns a slice containing the entire array.
    #[inline]
    pub const fn as_slice(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Returns an internal array.
    #[inline]
    pub const fn as_array(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8; 32]> for HashBytes {
    #[inline]
    fn as_ref(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for HashBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl From<[u8; 32]> for HashBytes {
    #[inline]
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl From<HashBytes> for [u8; 32] {
    #[inline]
    fn from(value: HashBytes) -> Self {
        value.0
    }
}

impl From<ed25519_dalek::VerifyingKey> for HashBytes {
    #[inline]
    fn from(value: ed25519_dalek::VerifyingKey) -> Self {
        Self(value.to_bytes())
    }
}

impl FromStr for HashBytes {
    type Err = ParseHashBytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut result = Self::default();
        match s.len() {
            64 => hex::decode_to_slice(s, &mut result.0)?,
            66 => hex::decode_to_slice(&s[2..], &mut result.0)?,
            #[cfg(feature = "base64")]
            44 => crate::util::decode_base64_slice(s, &mut result.0)?,
            _ => return Err(ParseHashBytesError::UnexpectedStringLength),
        }
        Ok(result)
    }
}

impl std::fmt::Display for HashBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = [0u8; 64];
        // NOTE: output length is exactly twice as the input length
        if hex::encode_to_slice(self.0, &mut output).is_err() {
            return Err(std::fmt::Error);
        }

        // SAFETY: output was constructed from ascii hex chars
        let output = unsafe { std::str::from_utf8_unchecked(&output) };
        f.write_str(output)
    }
}

impl std::fmt::Debug for HashBytes {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HashBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.collect_str(self)
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HashBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{Error, Visitor};

        struct HashBytesVisitor;

        impl<'de> Visitor<'de> for HashBytesVisitor {
            type Value = HashBytes;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("hex-encoded byte array of size 32")
            }

            fn visit_str<E: Error>(self, value: &str) -> Result<Self::Value, E> {
                HashBytes::from_str(value).map_err(E::custom)
            }

            fn visit_bytes<E: Error>(self, value: &[u8]) -> Result<Self::Value, E> {
                match <[u8; 32]>::try_from(value) {
                    Ok(bytes) => Ok(HashBytes(bytes)),
                    Err(_) => Err(E::invalid_length(value.len(), &self)),
                }
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(HashBytesVisitor)
        } else {
            deserializer.deserialize_bytes(HashBytesVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cell_hash() {
        let cell = Cell::empty_cell();
        assert_eq!(cell.bit_len(), 0);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(
            cell.repr_hash().to_string(),
            "96a296d224f285c67bee93c30f8a309157f0daa35dc5b87e410b78630a09cfc7"
        );
        assert_eq!(CellBuilder::new().build().unwrap(), cell);
    }

    #[test]
    fn descriptor_bytes() {
        assert_eq!(CellDescriptor::compute_d2(0), 0);
        assert_eq!(CellDescriptor::compute_d2(1), 1);
        assert_eq!(CellDescriptor::compute_d2(8), 2);
        assert_eq!(CellDescriptor::compute_d2(9), 3);
        assert_eq!(CellDescriptor::compute_d2(1023), 255);

        let descriptor = CellDescriptor::new([2, 3]);
        assert_eq!(descriptor.reference_count(), 2);
        assert_eq!(descriptor.byte_len(), 2);
        assert!(!descriptor.is_aligned());
        assert!(!descriptor.is_exotic());
    }

    #[test]
    fn child_hashes_affect_parent() -> anyhow::Result<()> {
        let left = CellBuilder::build_from(0xdeadbeefu32)?;
        let right = CellBuilder::build_from(0xdeadbeeeu32)?;

        let mut builder = CellBuilder::new();
        builder.store_reference(left.clone())?;
        let with_left = builder.build()?;

        let mut builder = CellBuilder::new();
        builder.store_reference(right)?;
        let with_right = builder.build()?;

        assert_ne!(with_left.repr_hash(), with_right.repr_hash());
        assert_eq!(with_left.repr_depth(), 1);
        assert_eq!(with_left.reference(0), Some(&left));
        Ok(())
    }

    #[test]
    fn hash_bytes_from_str() {
        let hex = "37c0120beed92563cc8194d904ad8d870c8f4e28fe536f1a0b56899848b5f526";
        let hash = hex.parse::<HashBytes>().unwrap();
        assert_eq!(hash.to_string(), hex);

        let prefixed = format!("0x{hex}");
        assert_eq!(prefixed.parse::<HashBytes>().unwrap(), hash);

        assert!(matches!(
            "1234".parse::<HashBytes>(),
            Err(ParseHashBytesError::UnexpectedStringLength)
        ));
        assert!(matches!(
            "zz".repeat(32).parse::<HashBytes>(),
            Err(ParseHashBytesError::InvalidHex(_))
        ));

        #[cfg(feature = "base64")]
        {
            let encoded = crate::util::encode_base64(hash.as_slice());
            assert_eq!(encoded.len(), 44);
            assert_eq!(encoded.parse::<HashBytes>().unwrap(), hash);
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn hash_bytes_serde() {
        let hash = HashBytes([0x55; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "55".repeat(32)));
        assert_eq!(serde_json::from_str::<HashBytes>(&json).unwrap(), hash);
    }
}

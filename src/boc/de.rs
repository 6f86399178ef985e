use smallvec::SmallVec;

use super::BocTag;
use crate::cell::{Cell, CellBuilder, CellDescriptor, MAX_REF_COUNT};
use crate::util::{read_be_uint, unlikely};

/// BOC deserialization options.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// The minimum allowed root count.
    pub min_roots: Option<usize>,
    /// The maximum allowed root count.
    pub max_roots: Option<usize>,
}

impl Options {
    /// Constructs decoder options to expect exactly the specified number of roots.
    pub const fn exact(number: usize) -> Self {
        Self {
            min_roots: Some(number),
            max_roots: Some(number),
        }
    }
}

/// Parsed BOC header.
pub struct BocHeader<'a> {
    ref_size: usize,
    cells: SmallVec<[&'a [u8]; CELLS_ON_STACK]>,
    roots: SmallVec<[u32; ROOTS_ON_STACK]>,
}

impl<'a> BocHeader<'a> {
    /// Decodes boc info from the specified bytes.
    pub fn decode(data: &'a [u8], options: &Options) -> Result<Self, Error> {
        let mut reader = BocReader::new(data);

        // 4 bytes - tag
        // 1 byte - flags
        // 1 byte - offset size
        let Some(header) = reader.read_bytes(6) else {
            return Err(Error::UnexpectedEof);
        };
        let flags = header[4];
        let offset_size = header[5] as usize;

        let has_index;
        let has_crc;
        let has_cache_bits;
        let ref_size;
        let supports_multiple_roots;

        match BocTag::from_bytes([header[0], header[1], header[2], header[3]]) {
            Some(BocTag::Indexed) => {
                has_index = true;
                has_crc = false;
                has_cache_bits = false;
                ref_size = flags as usize;
                supports_multiple_roots = false;
            }
            Some(BocTag::IndexedCrc32) => {
                has_index = true;
                has_crc = true;
                has_cache_bits = false;
                ref_size = flags as usize;
                supports_multiple_roots = false;
            }
            Some(BocTag::Generic) => {
                has_index = flags & 0b1000_0000 != 0;
                has_crc = flags & 0b0100_0000 != 0;
                has_cache_bits = flags & 0b0010_0000 != 0;
                ref_size = (flags & 0b0000_0111) as usize;
                supports_multiple_roots = true;
            }
            None => return Err(Error::UnknownBocTag),
        }

        if unlikely(has_cache_bits && !has_index) {
            return Err(Error::InvalidHeader);
        }
        if unlikely(ref_size == 0 || ref_size > std::mem::size_of::<u32>()) {
            return Err(Error::InvalidRefSize);
        }
        if unlikely(offset_size == 0 || offset_size > std::mem::size_of::<u64>()) {
            return Err(Error::InvalidOffsetSize);
        }

        // {ref_size} bytes - cell count
        // {ref_size} bytes - root count
        // {ref_size} bytes - absent cell count
        // {offset_size} bytes - total cells size
        if unlikely(!reader.require(ref_size * 3 + offset_size)) {
            return Err(Error::InvalidHeader);
        }
        let cell_count = reader.read_be_uint(ref_size) as usize;
        let root_count = reader.read_be_uint(ref_size) as usize;
        let absent_count = reader.read_be_uint(ref_size) as usize;

        // Validate root or absent cells
        if unlikely(root_count == 0) {
            return Err(Error::RootCellNotFound);
        }
        if unlikely(!supports_multiple_roots && root_count > 1) {
            return Err(Error::UnexpectedMultipleRoots);
        }
        if unlikely(root_count.saturating_add(absent_count) > cell_count) {
            return Err(Error::TooManyRootCells);
        }
        if unlikely(absent_count > 0) {
            return Err(Error::AbsentCellsNotSupported);
        }
        if let Some(min_roots) = options.min_roots {
            if unlikely(root_count < min_roots) {
                return Err(Error::TooFewRootCells);
            }
        }
        if unlikely(root_count > options.max_roots.unwrap_or(MAX_ROOTS)) {
            return Err(Error::TooManyRootCells);
        }

        let total_cells_size = reader.read_be_uint(offset_size);

        const MIN_CELL_SIZE: u64 = 2; // [d1, d2]

        // NOTE: `root_count` <= `cell_count` so this expression doesn't overflow
        let min_total_cell_size = (cell_count as u64) * (MIN_CELL_SIZE + ref_size as u64)
            - (root_count * ref_size) as u64;
        if unlikely(total_cells_size < min_total_cell_size) {
            return Err(Error::InvalidTotalSize);
        }

        // 2 bytes - descriptor
        // 128 - max data length
        // 4*{ref_size} - max references
        let max_cell_size = 2 + 128 + (MAX_REF_COUNT as u64) * ref_size as u64;
        if unlikely(total_cells_size > (cell_count as u64) * max_cell_size) {
            return Err(Error::InvalidTotalSize);
        }

        if unlikely(!reader.require(root_count * ref_size)) {
            return Err(Error::UnexpectedEof);
        }

        let mut roots = SmallVec::with_capacity(root_count);
        if supports_multiple_roots {
            for _ in 0..root_count {
                let root_index = reader.read_be_uint(ref_size) as usize;
                if unlikely(root_index >= cell_count) {
                    return Err(Error::RootOutOfBounds);
                }
                roots.push(root_index as u32);
            }
        } else {
            roots.push(0);
        }

        let index_size = has_index as u64 * cell_count as u64 * offset_size as u64;
        if unlikely(!reader.require((index_size + total_cells_size + has_crc as u64 * 4) as usize))
        {
            return Err(Error::UnexpectedEof);
        }

        if has_index {
            reader.advance(cell_count * offset_size);
        }

        let cells_start_offset = reader.offset;

        let mut cells = SmallVec::with_capacity(cell_count);
        for _ in 0..cell_count {
            let Some(&[d1, d2]) = reader.peek_bytes(2) else {
                return Err(Error::UnexpectedEof);
            };
            let descriptor = CellDescriptor::new([d1, d2]);
            if unlikely(descriptor.is_absent()) {
                return Err(Error::AbsentCellsNotSupported);
            }
            if unlikely(descriptor.is_exotic() || descriptor.level_mask() != 0) {
                return Err(Error::InvalidCell);
            }
            if unlikely(descriptor.store_hashes()) {
                return Err(Error::UnnormalizedCell);
            }

            let data_len = descriptor.byte_len() as usize;
            let ref_count = descriptor.reference_count() as usize;
            if unlikely(ref_count > MAX_REF_COUNT) {
                return Err(Error::InvalidRef);
            }

            let total_len = 2 + data_len + ref_count * ref_size;
            let Some(cell) = reader.read_bytes(total_len) else {
                return Err(Error::UnexpectedEof);
            };

            if data_len > 0 && !descriptor.is_aligned() {
                let byte_with_tag = cell[2 + data_len - 1];
                if unlikely(byte_with_tag & 0x7f == 0) {
                    return Err(Error::UnnormalizedCell);
                }
            }
            cells.push(cell);
        }

        // Check that `total_cells_size` is correct
        if (cells_start_offset as u64).saturating_add(total_cells_size) != reader.offset as u64 {
            return Err(Error::InvalidTotalSize);
        }

        // Verify checksum if specified
        if has_crc {
            let crc_start = reader.offset;
            let Some(crc) = reader.read_bytes(4) else {
                return Err(Error::UnexpectedEof);
            };
            let parsed_crc = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
            if parsed_crc != crc32c::crc32c(&data[..crc_start]) {
                return Err(Error::InvalidChecksum);
            }
        }

        Ok(Self {
            ref_size,
            cells,
            roots,
        })
    }

    /// Assembles cell tree from slices.
    ///
    /// Cells are processed from the last to the first one so that
    /// every child is ready before its parent.
    pub fn finalize(&self) -> Result<ProcessedCells, Error> {
        let ref_size = self.ref_size;
        let cell_count = self.cells.len() as u32;

        let mut res = SmallVec::<[Cell; CELLS_ON_STACK]>::new();
        if res.try_reserve_exact(cell_count as usize).is_err() {
            return Err(Error::InvalidTotalSize);
        }

        for (index, cell) in self.cells.iter().enumerate().rev() {
            let descriptor = CellDescriptor::new([cell[0], cell[1]]);
            let byte_len = descriptor.byte_len() as usize;
            let data = &cell[2..2 + byte_len];

            let bit_len = if descriptor.is_aligned() {
                (byte_len * 8) as u16
            } else if let Some(last) = data.last() {
                byte_len as u16 * 8 - last.trailing_zeros() as u16 - 1
            } else {
                0
            };

            let mut builder = match CellBuilder::from_raw_data(data, bit_len) {
                Ok(builder) => builder,
                Err(_) => return Err(Error::InvalidCell),
            };

            let refs = &cell[2 + byte_len..];
            for child_index in refs.chunks_exact(ref_size) {
                let child_index = read_be_uint(child_index) as u32;
                if child_index >= cell_count {
                    return Err(Error::InvalidRef);
                }
                if child_index as usize <= index {
                    return Err(Error::InvalidRefOrder);
                }

                let child = match res.get((cell_count - child_index - 1) as usize) {
                    Some(child) => child.clone(),
                    None => return Err(Error::InvalidRefOrder),
                };
                if builder.store_reference(child).is_err() {
                    return Err(Error::InvalidRef);
                }
            }

            match builder.build() {
                Ok(cell) => res.push(cell),
                Err(_) => return Err(Error::InvalidCell),
            }
        }

        Ok(ProcessedCells(res))
    }

    /// Cell index size in bytes. Guaranteed to be 4 at max.
    pub fn ref_size(&self) -> usize {
        self.ref_size
    }

    /// Slices of the unique cells.
    pub fn cells(&self) -> &[&'a [u8]] {
        &self.cells
    }

    /// Root indices.
    pub fn roots(&self) -> &[u32] {
        &self.roots
    }
}

/// Array of processed cells.
pub struct ProcessedCells(SmallVec<[Cell; CELLS_ON_STACK]>);

impl ProcessedCells {
    /// Returns a processed cell by index.
    pub fn get(&self, index: u32) -> Option<Cell> {
        let rev_index = self.0.len().checked_sub(index as usize + 1)?;
        self.0.get(rev_index).cloned()
    }
}

/// Bounds-checked cursor over the input bytes.
struct BocReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BocReader<'a> {
    #[inline(always)]
    const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline(always)]
    fn require(&self, len: usize) -> bool {
        self.offset.saturating_add(len) <= self.data.len()
    }

    #[inline(always)]
    fn advance(&mut self, bytes: usize) {
        self.offset += bytes;
    }

    #[inline(always)]
    fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.offset..self.offset.checked_add(len)?)
    }

    #[inline(always)]
    fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.advance(len);
        Some(bytes)
    }

    /// Reads a big-endian integer of `size` bytes.
    ///
    /// The caller must check the remaining length with [`require`](Self::require).
    #[inline(always)]
    fn read_be_uint(&mut self, size: usize) -> u64 {
        match self.read_bytes(size) {
            Some(bytes) => read_be_uint(bytes),
            None => 0,
        }
    }
}

const CELLS_ON_STACK: usize = 16;
const ROOTS_ON_STACK: usize = 2;

const MAX_ROOTS: usize = 32;

/// Error type for BOC decoding related errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// EOF encountered during another operation.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// Invalid magic bytes.
    #[error("unknown BOC tag")]
    UnknownBocTag,
    /// Invalid BOC header.
    #[error("invalid header")]
    InvalidHeader,
    /// References size is greater than 4.
    #[error("ref index does not fit in `u32` type")]
    InvalidRefSize,
    /// Offset size is greater than 8.
    #[error("cell offset does not fit in `u64` type")]
    InvalidOffsetSize,
    /// Root cell not found.
    #[error("root cell not found")]
    RootCellNotFound,
    /// Specified BOC tag doesn't support multiple roots.
    #[error("unexpected multiple roots")]
    UnexpectedMultipleRoots,
    /// The number of roots in BOC is greater than expected.
    #[error("too many root cells")]
    TooManyRootCells,
    /// Absent cells are legacy therefore not supported.
    #[error("absent cells are not supported")]
    AbsentCellsNotSupported,
    /// The number of roots in BOC is less than expected.
    #[error("too few root cells")]
    TooFewRootCells,
    /// Total cells size mismatch.
    #[error("invalid total cells size")]
    InvalidTotalSize,
    /// Invalid root cell index.
    #[error("root index out of bounds")]
    RootOutOfBounds,
    /// Invalid child reference.
    #[error("cell ref count not in range 0..=4")]
    InvalidRef,
    /// Suboptimal cells are treated as error.
    #[error("unnormalized cell")]
    UnnormalizedCell,
    /// Possible graph loop detected.
    #[error("invalid children order")]
    InvalidRefOrder,
    /// Failed to parse cell.
    #[error("invalid cell")]
    InvalidCell,
    /// Crc mismatch.
    #[error("invalid checksum")]
    InvalidChecksum,
}

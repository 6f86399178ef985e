use crate::cell::{Cell, HashBytes};
use crate::error::Error;

/// A read-only view for a subcell of a cell.
#[derive(Debug, Clone, Copy)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bits_window_start: u16,
    bits_window_end: u16,
    refs_window_start: u8,
    refs_window_end: u8,
}

impl<'a> CellSlice<'a> {
    /// Constructs a new cell slice from the specified cell.
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            bits_window_start: 0,
            bits_window_end: cell.bit_len(),
            refs_window_start: 0,
            refs_window_end: cell.reference_count(),
            cell,
        }
    }

    /// Returns a reference to the underlying cell.
    #[inline]
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Returns whether there are no bits of data left.
    #[inline]
    pub fn is_data_empty(&self) -> bool {
        self.bits_window_start >= self.bits_window_end
    }

    /// Returns whether there are no references left.
    #[inline]
    pub fn is_refs_empty(&self) -> bool {
        self.refs_window_start >= self.refs_window_end
    }

    /// Returns the number of remaining references in the slice.
    #[inline]
    pub fn remaining_refs(&self) -> u8 {
        self.refs_window_end.saturating_sub(self.refs_window_start)
    }

    /// Returns the number of remaining bits of data in the slice.
    #[inline]
    pub fn remaining_bits(&self) -> u16 {
        self.bits_window_end.saturating_sub(self.bits_window_start)
    }

    /// Returns the start of the data window.
    #[inline]
    pub fn bits_offset(&self) -> u16 {
        self.bits_window_start
    }

    /// Returns the start of the references window.
    #[inline]
    pub fn refs_offset(&self) -> u8 {
        self.refs_window_start
    }

    /// Returns `true` if the slice contains at least `bits` and `refs`.
    #[inline]
    pub fn has_remaining(&self, bits: u16, refs: u8) -> bool {
        self.bits_window_start + bits <= self.bits_window_end
            && self.refs_window_start + refs <= self.refs_window_end
    }

    /// Tries to advance the start of data and refs windows,
    /// returns `false` if `bits` or `refs` are greater than the remainder.
    pub fn try_advance(&mut self, bits: u16, refs: u8) -> bool {
        if self.has_remaining(bits, refs) {
            self.bits_window_start += bits;
            self.refs_window_start += refs;
            true
        } else {
            false
        }
    }

    /// Tries to advance the start of data and refs windows.
    pub fn skip_first(&mut self, bits: u16, refs: u8) -> Result<(), Error> {
        if self.try_advance(bits, refs) {
            Ok(())
        } else {
            Err(Error::CellUnderflow)
        }
    }

    /// Returns a slice with the first `bits` and `refs` of this slice.
    pub fn get_prefix(&self, bits: u16, refs: u8) -> Self {
        Self {
            cell: self.cell,
            bits_window_start: self.bits_window_start,
            bits_window_end: std::cmp::min(self.bits_window_start + bits, self.bits_window_end),
            refs_window_start: self.refs_window_start,
            refs_window_end: std::cmp::min(self.refs_window_start + refs, self.refs_window_end),
        }
    }

    /// Checks whether all remaining bits are equal to the same value.
    ///
    /// Returns `None` for an empty slice.
    pub fn test_uniform(&self) -> Option<bool> {
        let first = self.get_bit(0)?;
        let mut offset = 1;
        while offset < self.remaining_bits() {
            let chunk = std::cmp::min(self.remaining_bits() - offset, 8);
            let expected = if first { ((1u16 << chunk) - 1) as u8 } else { 0 };
            if self.get_small_uint(offset, chunk)? != expected {
                return None;
            }
            offset += chunk;
        }
        Some(first)
    }

    /// Returns the length of the longest common data prefix with another slice.
    pub fn longest_common_data_prefix_len(&self, other: &Self) -> u16 {
        let max_len = std::cmp::min(self.remaining_bits(), other.remaining_bits());

        let mut offset = 0;
        while offset < max_len {
            let chunk = std::cmp::min(max_len - offset, 8);
            let (Some(left), Some(right)) = (
                self.get_small_uint(offset, chunk),
                other.get_small_uint(offset, chunk),
            ) else {
                break;
            };

            let diff = left ^ right;
            if diff != 0 {
                // Values are right aligned within `chunk` bits
                let equal = diff.leading_zeros() as u16 - (8 - chunk);
                return offset + equal;
            }
            offset += chunk;
        }
        offset
    }

    /// Advances the data window if it starts with the specified prefix.
    pub fn strip_data_prefix(&mut self, prefix: &CellSlice<'_>) -> bool {
        let prefix_len = prefix.remaining_bits();
        if prefix_len <= self.remaining_bits()
            && self.longest_common_data_prefix_len(prefix) == prefix_len
        {
            self.bits_window_start += prefix_len;
            true
        } else {
            false
        }
    }

    /// Tries to read the bit at the specified offset (relative to the current bits window).
    pub fn get_bit(&self, offset: u16) -> Option<bool> {
        if self.bits_window_start + offset < self.bits_window_end {
            let index = self.bits_window_start + offset;
            let byte = *self.cell.data().get((index / 8) as usize)?;
            Some((byte >> (7 - index % 8)) & 1 != 0)
        } else {
            None
        }
    }

    /// Tries to read the next bit, incrementing the bits window start.
    pub fn load_bit(&mut self) -> Result<bool, Error> {
        match self.get_bit(0) {
            Some(bit) => {
                self.bits_window_start += 1;
                Ok(bit)
            }
            None => Err(Error::CellUnderflow),
        }
    }

    /// Returns a small subset of `bits` (0..=8) starting from the `offset`.
    pub fn get_small_uint(&self, offset: u16, bits: u16) -> Option<u8> {
        if bits == 0 {
            return self.has_remaining(offset, 0).then_some(0);
        } else if bits > 8 || self.bits_window_start + offset + bits > self.bits_window_end {
            return None;
        }

        let index = self.bits_window_start + offset;
        let data = self.cell.data();

        let r = index % 8;
        let q = (index / 8) as usize;
        let byte = *data.get(q)?;

        if r == 0 {
            // xxx_____ -> _____xxx
            Some(byte >> (8 - bits))
        } else if bits <= (8 - r) {
            // __xxx___ -> _____xxx
            Some((byte >> (8 - r - bits)) & ((1u16 << bits) - 1) as u8)
        } else {
            // ______xx|y_______ -> _____xxy
            let mut res = (byte as u16) << 8;
            res |= *data.get(q + 1)? as u16;
            Some(((res << r) >> (16 - bits)) as u8)
        }
    }

    /// Tries to read the next small subset of `bits` (0..=8), incrementing the bits window start.
    pub fn load_small_uint(&mut self, bits: u16) -> Result<u8, Error> {
        match self.get_small_uint(0, bits) {
            Some(value) => {
                self.bits_window_start += bits;
                Ok(value)
            }
            None => Err(Error::CellUnderflow),
        }
    }

    /// Reads up to 64 `bits` as a big-endian integer starting from the `offset`.
    pub fn get_uint(&self, offset: u16, bits: u16) -> Option<u64> {
        if bits > 64 || !self.has_remaining(offset + bits, 0) {
            return None;
        }

        let mut result = 0u64;
        let mut read = 0;
        while read < bits {
            let chunk = std::cmp::min(bits - read, 8);
            let part = self.get_small_uint(offset + read, chunk)?;
            result = (result << chunk) | part as u64;
            read += chunk;
        }
        Some(result)
    }

    /// Tries to read the next `bits` (up to 64) as a big-endian integer.
    pub fn load_uint(&mut self, bits: u16) -> Result<u64, Error> {
        match self.get_uint(0, bits) {
            Some(value) => {
                self.bits_window_start += bits;
                Ok(value)
            }
            None if bits > 64 => Err(Error::IntOverflow),
            None => Err(Error::CellUnderflow),
        }
    }

    /// Tries to read the next `u8`, incrementing the bits window start.
    #[inline]
    pub fn load_u8(&mut self) -> Result<u8, Error> {
        self.load_small_uint(8)
    }

    /// Tries to read the next `u16`, incrementing the bits window start.
    #[inline]
    pub fn load_u16(&mut self) -> Result<u16, Error> {
        Ok(ok!(self.load_uint(16)) as u16)
    }

    /// Tries to read the next `u32`, incrementing the bits window start.
    #[inline]
    pub fn load_u32(&mut self) -> Result<u32, Error> {
        Ok(ok!(self.load_uint(32)) as u32)
    }

    /// Tries to read the next `u64`, incrementing the bits window start.
    #[inline]
    pub fn load_u64(&mut self) -> Result<u64, Error> {
        self.load_uint(64)
    }

    /// Tries to read the next 256 bits, incrementing the bits window start.
    pub fn load_u256(&mut self) -> Result<HashBytes, Error> {
        let mut result = HashBytes::ZERO;
        ok!(self.load_raw(&mut result.0, 256));
        Ok(result)
    }

    /// Reads the next `bits` into the target buffer, incrementing the bits window start.
    ///
    /// The unused tail of the last byte is zeroed.
    pub fn load_raw<'b>(&mut self, target: &'b mut [u8], bits: u16) -> Result<&'b [u8], Error> {
        let byte_len = ((bits + 7) / 8) as usize;
        if target.len() < byte_len {
            return Err(Error::CellOverflow);
        } else if !self.has_remaining(bits, 0) {
            return Err(Error::CellUnderflow);
        }

        let mut offset = 0;
        for byte in &mut target[..byte_len] {
            let chunk = std::cmp::min(bits - offset, 8);
            let Some(value) = self.get_small_uint(offset, chunk) else {
                return Err(Error::CellUnderflow);
            };
            *byte = value << (8 - chunk);
            offset += chunk;
        }
        self.bits_window_start += bits;
        Ok(&target[..byte_len])
    }

    /// Returns a reference to the Nth child cell (relative to this slice's refs window).
    pub fn get_reference(&self, index: u8) -> Option<&'a Cell> {
        if self.refs_window_start + index < self.refs_window_end {
            self.cell.reference(self.refs_window_start + index)
        } else {
            None
        }
    }

    /// Tries to get the next child, incrementing the refs window start.
    pub fn load_reference(&mut self) -> Result<&'a Cell, Error> {
        match self.get_reference(0) {
            Some(cell) => {
                self.refs_window_start += 1;
                Ok(cell)
            }
            None => Err(Error::CellUnderflow),
        }
    }

    /// Tries to get the next child and clone it, incrementing the refs window start.
    #[inline]
    pub fn load_reference_cloned(&mut self) -> Result<Cell, Error> {
        self.load_reference().cloned()
    }

    /// Loads a value using its [`Load`] implementation.
    ///
    /// [`Load`]: crate::cell::Load
    #[inline]
    pub fn load<T: crate::cell::Load<'a>>(&mut self) -> Result<T, Error> {
        T::load_from(self)
    }
}

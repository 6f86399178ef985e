use smallvec::SmallVec;

use crate::cell::{Cell, CellSlice, HashBytes, Store, MAX_BIT_LEN, MAX_REF_COUNT};
use crate::error::Error;

/// Builder for constructing cells with densely packed data.
#[derive(Clone)]
pub struct CellBuilder {
    data: [u8; 128],
    bit_len: u16,
    references: SmallVec<[Cell; MAX_REF_COUNT]>,
}

impl Default for CellBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CellBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = crate::util::Bitstring {
            bytes: &self.data,
            bit_len: self.bit_len,
        };
        f.debug_struct("CellBuilder")
            .field("data", &format_args!("{data}"))
            .field("bit_len", &self.bit_len)
            .field("references", &self.references)
            .finish()
    }
}

impl CellBuilder {
    /// Creates an empty cell builder.
    pub fn new() -> Self {
        Self {
            data: [0; 128],
            bit_len: 0,
            references: SmallVec::new(),
        }
    }

    /// Builds a new cell from the specified data using the default builder.
    pub fn build_from<T: Store>(data: T) -> Result<Cell, Error> {
        let mut builder = Self::new();
        ok!(data.store_into(&mut builder));
        builder.build()
    }

    /// Creates a builder with the first `bits` bits of `data`.
    ///
    /// Bits past `bits` (including a completion tag) are ignored.
    pub fn from_raw_data(data: &[u8], bits: u16) -> Result<Self, Error> {
        let mut builder = Self::new();
        ok!(builder.store_raw(data, bits));
        Ok(builder)
    }

    /// Returns the data size of this cell in bits.
    #[inline]
    pub fn bit_len(&self) -> u16 {
        self.bit_len
    }

    /// Returns the number of unused data bits.
    #[inline]
    pub fn spare_bits_capacity(&self) -> u16 {
        MAX_BIT_LEN - self.bit_len
    }

    /// Returns the number of unused reference slots.
    #[inline]
    pub fn spare_refs_capacity(&self) -> u8 {
        (MAX_REF_COUNT - self.references.len()) as u8
    }

    /// Returns whether the builder can store `bits` more data bits and `refs` more references.
    #[inline]
    pub fn has_capacity(&self, bits: u16, refs: u8) -> bool {
        self.bit_len + bits <= MAX_BIT_LEN && self.references.len() + refs as usize <= MAX_REF_COUNT
    }

    /// Returns a slice of child cells stored in the builder.
    #[inline]
    pub fn references(&self) -> &[Cell] {
        &self.references
    }

    /// Returns the underlying data buffer.
    ///
    /// All bits past [`bit_len`] are zero.
    ///
    /// [`bit_len`]: Self::bit_len
    #[inline]
    pub fn raw_data(&self) -> &[u8; 128] {
        &self.data
    }

    /// Tries to store the specified number of zero bits.
    pub fn store_zeros(&mut self, bits: u16) -> Result<(), Error> {
        if self.bit_len + bits <= MAX_BIT_LEN {
            self.bit_len += bits;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store one zero bit.
    pub fn store_bit_zero(&mut self) -> Result<(), Error> {
        self.store_zeros(1)
    }

    /// Tries to store one non-zero bit.
    pub fn store_bit_one(&mut self) -> Result<(), Error> {
        if self.bit_len < MAX_BIT_LEN {
            let q = (self.bit_len / 8) as usize;
            let r = self.bit_len % 8;
            self.data[q] |= 1 << (7 - r);
            self.bit_len += 1;
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store one bit.
    #[inline]
    pub fn store_bit(&mut self, bit: bool) -> Result<(), Error> {
        if bit {
            self.store_bit_one()
        } else {
            self.store_bit_zero()
        }
    }

    /// Tries to store `u8` in the cell, but only the specified number of bits (up to 8).
    pub fn store_small_uint(&mut self, value: u8, bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return Ok(());
        } else if bits > 8 {
            return Err(Error::IntOverflow);
        }
        self.store_raw(&[value << (8 - bits)], bits)
    }

    /// Tries to store `u8` in the cell.
    #[inline]
    pub fn store_u8(&mut self, value: u8) -> Result<(), Error> {
        self.store_raw(&[value], 8)
    }

    /// Tries to store `u16` in the cell.
    #[inline]
    pub fn store_u16(&mut self, value: u16) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 16)
    }

    /// Tries to store `u32` in the cell.
    #[inline]
    pub fn store_u32(&mut self, value: u32) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 32)
    }

    /// Tries to store `u64` in the cell.
    #[inline]
    pub fn store_u64(&mut self, value: u64) -> Result<(), Error> {
        self.store_raw(&value.to_be_bytes(), 64)
    }

    /// Tries to store `u64` in the cell, but only the specified number of bits.
    ///
    /// Values wider than 64 bits are padded with leading zeros.
    pub fn store_uint(&mut self, value: u64, mut bits: u16) -> Result<(), Error> {
        if bits == 0 {
            return Ok(());
        }
        if self.bit_len + bits > MAX_BIT_LEN {
            return Err(Error::CellOverflow);
        }
        if bits > 64 {
            ok!(self.store_zeros(bits - 64));
            bits = 64;
        } else if bits < 64 && value >> bits != 0 {
            return Err(Error::IntOverflow);
        }

        let value = value << (64 - bits);
        self.store_raw(&value.to_be_bytes(), bits)
    }

    /// Tries to store 32 bytes in the cell.
    #[inline]
    pub fn store_u256(&mut self, value: &HashBytes) -> Result<(), Error> {
        self.store_raw(value.as_slice(), 256)
    }

    /// Tries to store the first `bits` bits of `value`.
    ///
    /// Fails without modifying the builder if there is not enough capacity.
    pub fn store_raw(&mut self, value: &[u8], bits: u16) -> Result<(), Error> {
        if self.bit_len + bits > MAX_BIT_LEN {
            return Err(Error::CellOverflow);
        }

        let byte_len = ((bits + 7) / 8) as usize;
        let Some(value) = value.get(..byte_len) else {
            return Err(Error::CellUnderflow);
        };
        if bits == 0 {
            return Ok(());
        }

        let q = (self.bit_len / 8) as usize;
        let r = self.bit_len % 8;
        if r == 0 {
            self.data[q..q + byte_len].copy_from_slice(value);
        } else {
            for (i, byte) in value.iter().enumerate() {
                self.data[q + i] |= byte >> r;
                if let Some(next) = self.data.get_mut(q + i + 1) {
                    *next = byte << (8 - r);
                }
            }
        }
        self.bit_len += bits;

        // Keep all bits past the end zeroed
        let end = ((self.bit_len + 7) / 8) as usize;
        let rem = self.bit_len % 8;
        if rem != 0 {
            self.data[end - 1] &= 0xffu8 << (8 - rem);
        }
        let dirty_end = std::cmp::min(q + byte_len + 1, self.data.len());
        if end < dirty_end {
            self.data[end..dirty_end].fill(0);
        }

        Ok(())
    }

    /// Tries to store a child in the cell.
    pub fn store_reference(&mut self, cell: Cell) -> Result<(), Error> {
        if self.references.len() < MAX_REF_COUNT {
            self.references.push(cell);
            Ok(())
        } else {
            Err(Error::CellOverflow)
        }
    }

    /// Tries to store the remaining slice data in the cell.
    pub fn store_slice_data(&mut self, slice: &CellSlice<'_>) -> Result<(), Error> {
        let bits = slice.remaining_bits();
        if self.bit_len + bits > MAX_BIT_LEN {
            return Err(Error::CellOverflow);
        }

        let mut offset = 0;
        while offset < bits {
            let chunk = std::cmp::min(bits - offset, 8);
            let Some(value) = slice.get_small_uint(offset, chunk) else {
                return Err(Error::CellUnderflow);
            };
            ok!(self.store_small_uint(value, chunk));
            offset += chunk;
        }
        Ok(())
    }

    /// Tries to store the remaining slice data and references in the cell.
    pub fn store_slice(&mut self, slice: &CellSlice<'_>) -> Result<(), Error> {
        if !self.has_capacity(slice.remaining_bits(), slice.remaining_refs()) {
            return Err(Error::CellOverflow);
        }
        ok!(self.store_slice_data(slice));
        for index in 0..slice.remaining_refs() {
            if let Some(cell) = slice.get_reference(index) {
                ok!(self.store_reference(cell.clone()));
            }
        }
        Ok(())
    }

    /// Tries to append the data and references of another builder.
    pub fn store_builder(&mut self, builder: &CellBuilder) -> Result<(), Error> {
        if !self.has_capacity(builder.bit_len, builder.references.len() as u8) {
            return Err(Error::CellOverflow);
        }
        ok!(self.store_raw(&builder.data, builder.bit_len));
        for cell in &builder.references {
            ok!(self.store_reference(cell.clone()));
        }
        Ok(())
    }

    /// Appends the completion tag and computes the cell hash.
    pub fn build(self) -> Result<Cell, Error> {
        let mut data = self.data;
        let byte_len = ((self.bit_len + 7) / 8) as usize;
        let rem = self.bit_len % 8;
        if rem != 0 {
            data[byte_len - 1] |= 1 << (7 - rem);
        }
        Cell::from_parts(self.bit_len, &data[..byte_len], self.references)
    }
}

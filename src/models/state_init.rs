use crate::cell::*;
use crate::error::Error;
use crate::models::StdAddr;

/// Initial account state.
///
/// ```text
/// _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell)
///   library:(HashmapE 256 SimpleLib) = StateInit;
/// ```
///
/// Only the code and data parts are supported, `split_depth`, `special`
/// and libraries are always empty.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct StateInit {
    /// Optional contract code.
    pub code: Option<Cell>,
    /// Optional contract data.
    pub data: Option<Cell>,
}

impl StateInit {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        5
    }

    /// Returns the number of references that this struct occupies.
    pub const fn reference_count(&self) -> u8 {
        self.code.is_some() as u8 + self.data.is_some() as u8
    }

    /// Computes the address of an account with this initial state.
    pub fn compute_address(&self, workchain: i8) -> Result<StdAddr, Error> {
        let cell = ok!(CellBuilder::build_from(self));
        Ok(StdAddr::new(workchain, *cell.repr_hash()))
    }
}

impl Store for StateInit {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(self.bit_len(), self.reference_count()) {
            return Err(Error::CellOverflow);
        }
        // No split depth and special flags
        ok!(builder.store_zeros(2));
        ok!(self.code.store_into(builder));
        ok!(self.data.store_into(builder));
        // Empty libraries
        builder.store_bit_zero()
    }
}

impl<'a> Load<'a> for StateInit {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        if ok!(slice.load_small_uint(2)) != 0 {
            return Err(Error::InvalidData);
        }

        let code = ok!(Option::<Cell>::load_from(slice));
        let data = ok!(Option::<Cell>::load_from(slice));
        if ok!(slice.load_bit()) {
            return Err(Error::InvalidData);
        }

        Ok(Self { code, data })
    }
}

use bitflags::bitflags;

use crate::cell::*;
use crate::error::Error;
use crate::models::address::{load_opt_addr, store_opt_addr};
use crate::models::{StateInit, StdAddr};
use crate::num::Tokens;

bitflags! {
    /// Mode flags for an outbound message.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SendMode: u8 {
        /// The sender will pay transfer fees separately.
        const PAY_FEE_SEPARATELY = 1;
        /// Any errors arising while processing this message during
        /// the action phase should be ignored.
        const IGNORE_ERROR = 2;
        /// Causes bounce if action fails.
        const BOUNCE_ON_ERROR = 16;
        /// The current account must be destroyed if its resulting balance is zero.
        const DELETE_IF_EMPTY = 32;
        /// Message will carry all the remaining value of the inbound message
        /// in addition to the value initially indicated in the new message
        /// (if bit 0 is not set, the gas fees are deducted from this amount).
        const WITH_REMAINING_BALANCE = 64;
        /// Message will carry all the remaining balance of the current smart contract
        /// (instead of the value originally indicated in the message).
        const ALL_BALANCE = 128;
    }
}

impl Store for SendMode {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u8(self.bits())
    }
}

impl<'a> Load<'a> for SendMode {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self::from_bits_retain(ok!(slice.load_u8())))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SendMode {
    #[inline]
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SendMode {
    #[inline]
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_bits_retain)
    }
}

/// Outbound internal message parameters.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OutboundMessage {
    /// Destination address.
    pub dst: StdAddr,
    /// Attached amount of native currency.
    pub value: Tokens,
    /// Whether to bounce the message back on error.
    pub bounce: bool,
    /// Optional payload.
    pub body: Option<Cell>,
    /// Optional state init to deploy the destination.
    pub init: Option<StateInit>,
}

impl OutboundMessage {
    /// Returns a relaxed internal message with these parameters.
    pub fn as_message(&self) -> Message<'_> {
        Message {
            info: MsgInfo::Int(RelaxedIntMsgInfo {
                ihr_disabled: true,
                bounce: self.bounce,
                bounced: false,
                src: None,
                dst: self.dst.clone(),
                value: self.value,
                extra_currencies: None,
                ihr_fee: Tokens::ZERO,
                fwd_fee: Tokens::ZERO,
                created_lt: 0,
                created_at: 0,
            }),
            init: self.init.clone(),
            body: self.body.as_ref().map(Cell::as_slice),
            layout: None,
        }
    }
}

/// Message encoder which produces a single cell for each outbound message.
pub trait MessageEncoder {
    /// Encodes the message into a cell.
    fn encode(&self, message: &OutboundMessage) -> Result<Cell, Error>;
}

impl<F> MessageEncoder for F
where
    F: Fn(&OutboundMessage) -> Result<Cell, Error>,
{
    #[inline]
    fn encode(&self, message: &OutboundMessage) -> Result<Cell, Error> {
        self(message)
    }
}

/// Encodes outbound messages as relaxed internal messages
/// with the most compact layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelaxedMessageEncoder;

impl MessageEncoder for RelaxedMessageEncoder {
    fn encode(&self, message: &OutboundMessage) -> Result<Cell, Error> {
        CellBuilder::build_from(message.as_message())
    }
}

/// Blockchain message.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    /// Message info.
    pub info: MsgInfo,
    /// Optional state init.
    pub init: Option<StateInit>,
    /// Optional payload.
    pub body: Option<CellSlice<'a>>,
    /// Optional message layout.
    pub layout: Option<MessageLayout>,
}

impl Message<'_> {
    /// Converts an internal message back into outbound message parameters.
    pub fn to_outbound(&self) -> Result<OutboundMessage, Error> {
        let MsgInfo::Int(info) = &self.info else {
            return Err(Error::InvalidTag);
        };

        let body = match &self.body {
            Some(body) => Some(ok!(slice_to_cell(body))),
            None => None,
        };

        Ok(OutboundMessage {
            dst: info.dst.clone(),
            value: info.value,
            bounce: info.bounce,
            body,
            init: self.init.clone(),
        })
    }
}

impl Store for Message<'_> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let (layout, bits, refs) = match self.layout {
            Some(layout) => {
                let (bits, refs) = layout.compute_full_len(&self.info, &self.init, &self.body);
                (layout, bits, refs)
            }
            None => MessageLayout::compute(&self.info, &self.init, &self.body),
        };

        // Check capacity
        if !builder.has_capacity(bits, refs) {
            return Err(Error::CellOverflow);
        }

        // Try to store info
        ok!(self.info.store_into(builder));

        // Try to store init
        ok!(match &self.init {
            Some(value) => {
                ok!(builder.store_bit_one()); // just$1
                SliceOrCell {
                    to_cell: layout.init_to_cell,
                    value,
                }
                .store_into(builder)
            }
            None => builder.store_bit_zero(), // nothing$0
        });

        // Try to store body
        match &self.body {
            Some(value) => SliceOrCell {
                to_cell: layout.body_to_cell,
                value,
            }
            .store_into(builder),
            None => builder.store_bit_zero(),
        }
    }
}

impl<'a> Load<'a> for Message<'a> {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let info = ok!(MsgInfo::load_from(slice));
        let init = ok!(Option::<SliceOrCell<StateInit>>::load_from(slice));
        let body = ok!(SliceOrCell::<CellSlice<'a>>::load_from(slice));

        let (init, init_to_cell) = match init {
            Some(SliceOrCell { to_cell, value }) => (Some(value), to_cell),
            None => (None, false),
        };

        let layout = MessageLayout {
            init_to_cell,
            body_to_cell: body.to_cell,
        };

        let body = if body.value.is_data_empty() && body.value.is_refs_empty() {
            None
        } else {
            Some(body.value)
        };

        Ok(Self {
            info,
            init,
            body,
            layout: Some(layout),
        })
    }
}

struct SliceOrCell<T> {
    to_cell: bool,
    value: T,
}

impl<T: Store> Store for SliceOrCell<T> {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if self.to_cell {
            let cell = ok!(CellBuilder::build_from(&self.value));

            // right$1 ^Cell
            ok!(builder.store_bit_one());
            builder.store_reference(cell)
        } else {
            // left$0 X
            ok!(builder.store_bit_zero());
            self.value.store_into(builder)
        }
    }
}

impl<'a, T: Load<'a>> Load<'a> for SliceOrCell<T> {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let to_cell = ok!(slice.load_bit());

        let mut child_cell = if to_cell {
            Some(ok!(slice.load_reference()).as_slice())
        } else {
            None
        };

        let slice = match &mut child_cell {
            Some(slice) => slice,
            None => slice,
        };

        Ok(Self {
            to_cell,
            value: ok!(T::load_from(slice)),
        })
    }
}

/// Message payload layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MessageLayout {
    /// Whether to store state init in a child cell.
    pub init_to_cell: bool,
    /// Whether to store payload as a child cell.
    pub body_to_cell: bool,
}

impl MessageLayout {
    /// Returns a plain message layout (init and body stored in the root cell).
    #[inline]
    pub const fn plain() -> Self {
        Self {
            init_to_cell: false,
            body_to_cell: false,
        }
    }

    /// Computes the number of bits and refs for this layout for the root cell.
    pub fn compute_full_len(
        &self,
        info: &MsgInfo,
        init: &Option<StateInit>,
        body: &Option<CellSlice<'_>>,
    ) -> (u16, u8) {
        let l = DetailedMessageLayout::compute(info, init, body);

        let mut total_bits = l.info_bits;
        let mut total_refs = l.info_refs;

        // Append init bits and refs
        if self.init_to_cell {
            total_refs += 1;
        } else {
            total_bits += l.init_bits;
            total_refs += l.init_refs;
        }

        // Append body bits and refs
        if self.body_to_cell {
            total_refs += 1;
        } else {
            total_bits += l.body_bits;
            total_refs += l.body_refs;
        }

        (total_bits, total_refs)
    }

    /// Computes the most optimal layout of the message parts.
    /// Also returns the number of bits and refs for the root cell.
    pub fn compute(
        info: &MsgInfo,
        init: &Option<StateInit>,
        body: &Option<CellSlice<'_>>,
    ) -> (Self, u16, u8) {
        let l = DetailedMessageLayout::compute(info, init, body);

        // Try plain layout
        let total_bits = l.info_bits + l.init_bits + l.body_bits;
        let total_refs = l.info_refs + l.init_refs + l.body_refs;
        if total_bits <= MAX_BIT_LEN && total_refs <= MAX_REF_COUNT as u8 {
            return (Self::plain(), total_bits, total_refs);
        }

        // Try body to ref
        let total_bits = l.info_bits + l.init_bits;
        let total_refs = l.info_refs + l.init_refs;
        if total_bits <= MAX_BIT_LEN && total_refs < MAX_REF_COUNT as u8 {
            let layout = Self {
                init_to_cell: false,
                body_to_cell: true,
            };
            return (layout, total_bits, total_refs + 1);
        }

        // Try init to ref
        let total_bits = l.info_bits + l.body_bits;
        let total_refs = l.info_refs + l.body_refs;
        if total_bits <= MAX_BIT_LEN && total_refs < MAX_REF_COUNT as u8 {
            let layout = Self {
                init_to_cell: true,
                body_to_cell: false,
            };
            return (layout, total_bits, total_refs + 1);
        }

        // Fallback to init and body to ref
        let layout = Self {
            init_to_cell: true,
            body_to_cell: true,
        };
        (layout, l.info_bits, l.info_refs + 2)
    }
}

struct DetailedMessageLayout {
    info_bits: u16,
    info_refs: u8,
    init_bits: u16,
    init_refs: u8,
    body_bits: u16,
    body_refs: u8,
}

impl DetailedMessageLayout {
    fn compute(
        info: &MsgInfo,
        init: &Option<StateInit>,
        body: &Option<CellSlice<'_>>,
    ) -> Self {
        let mut info_bits = info.bit_len() + 2; // (Maybe X) (1bit) + (Either X) (1bit)
        let info_refs = info.has_references() as u8;

        let (init_bits, init_refs) = match init {
            Some(init) => {
                info_bits += 1; // (Either X) (1bit)
                (init.bit_len(), init.reference_count())
            }
            None => (0, 0),
        };

        let (body_bits, body_refs) = match body {
            Some(body) => (body.remaining_bits(), body.remaining_refs()),
            None => (0, 0),
        };

        Self {
            info_bits,
            info_refs,
            init_bits,
            init_refs,
            body_bits,
            body_refs,
        }
    }
}

/// Message info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MsgInfo {
    /// Internal message info with an optional source address.
    Int(RelaxedIntMsgInfo),
    /// External incoming message info.
    ExtIn(ExtInMsgInfo),
}

impl MsgInfo {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        match self {
            Self::Int(info) => info.bit_len(),
            Self::ExtIn(info) => info.bit_len(),
        }
    }

    const fn has_references(&self) -> bool {
        match self {
            Self::Int(info) => info.extra_currencies.is_some(),
            Self::ExtIn(_) => false,
        }
    }
}

impl Store for MsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::Int(info) => info.store_into(builder),
            Self::ExtIn(info) => info.store_into(builder),
        }
    }
}

impl<'a> Load<'a> for MsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match slice.get_small_uint(0, 2) {
            Some(0b00 | 0b01) => RelaxedIntMsgInfo::load_from(slice).map(Self::Int),
            Some(0b10) => ExtInMsgInfo::load_from(slice).map(Self::ExtIn),
            Some(_) => Err(Error::InvalidTag),
            None => Err(Error::CellUnderflow),
        }
    }
}

/// External incoming message info.
///
/// ```text
/// ext_in_msg_info$10 src:MsgAddressExt dest:MsgAddressInt
///   import_fee:Grams = CommonMsgInfo;
/// ```
///
/// Only `addr_none` is supported as a source address.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExtInMsgInfo {
    /// Internal destination address.
    pub dst: StdAddr,
    /// External message import fee.
    ///
    /// NOTE: currently unused and reserved for future use.
    pub import_fee: Tokens,
}

impl ExtInMsgInfo {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        2 + 2 + StdAddr::BITS_WITHOUT_ANYCAST + self.import_fee.unwrap_bit_len()
    }
}

impl Store for ExtInMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !self.import_fee.is_valid() {
            return Err(Error::InvalidData);
        }
        if !builder.has_capacity(self.bit_len(), 0) {
            return Err(Error::CellOverflow);
        }
        // ext_in_msg_info$10 + addr_none$00
        ok!(builder.store_small_uint(0b1000, 4));
        ok!(self.dst.store_into(builder));
        self.import_fee.store_into(builder)
    }
}

impl<'a> Load<'a> for ExtInMsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        match ok!(slice.load_small_uint(4)) {
            0b1000 => {}
            0b1001 => return Err(Error::InvalidData),
            _ => return Err(Error::InvalidTag),
        }

        Ok(Self {
            dst: ok!(StdAddr::load_from(slice)),
            import_fee: ok!(Tokens::load_from(slice)),
        })
    }
}

/// Builds an external incoming message with the specified payload.
pub fn build_external_message(
    dst: &StdAddr,
    init: Option<&StateInit>,
    body: &Cell,
) -> Result<Cell, Error> {
    CellBuilder::build_from(Message {
        info: MsgInfo::ExtIn(ExtInMsgInfo {
            dst: dst.clone(),
            import_fee: Tokens::ZERO,
        }),
        init: init.cloned(),
        body: Some(body.as_slice()),
        layout: None,
    })
}

/// Internal message info with an optional source address.
///
/// ```text
/// int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
///   src:MsgAddress dest:MsgAddressInt
///   value:CurrencyCollection ihr_fee:Grams fwd_fee:Grams
///   created_lt:uint64 created_at:uint32 = CommonMsgInfoRelaxed;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RelaxedIntMsgInfo {
    /// Whether IHR is disabled for the message.
    pub ihr_disabled: bool,
    /// Whether to bounce this message back if the destination transaction fails.
    pub bounce: bool,
    /// Whether this message is a bounced message from some failed transaction.
    pub bounced: bool,
    /// Optional internal source address.
    pub src: Option<StdAddr>,
    /// Internal destination address.
    pub dst: StdAddr,
    /// Attached amount of native currency.
    pub value: Tokens,
    /// Raw dictionary of attached extra currencies.
    pub extra_currencies: Option<Cell>,
    /// IHR fee.
    pub ihr_fee: Tokens,
    /// Forwarding fee paid for using the routing.
    pub fwd_fee: Tokens,
    /// Logical time when the message was created.
    pub created_lt: u64,
    /// Unix timestamp when the message was created.
    pub created_at: u32,
}

impl RelaxedIntMsgInfo {
    /// Returns the number of data bits that this struct occupies.
    pub const fn bit_len(&self) -> u16 {
        let src_bits = match &self.src {
            Some(_) => StdAddr::BITS_WITHOUT_ANYCAST,
            None => 2,
        };

        4 + src_bits
            + StdAddr::BITS_WITHOUT_ANYCAST
            + self.value.unwrap_bit_len()
            + 1
            + self.ihr_fee.unwrap_bit_len()
            + self.fwd_fee.unwrap_bit_len()
            + 64
            + 32
    }
}

impl Store for RelaxedIntMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let flags =
            ((self.ihr_disabled as u8) << 2) | ((self.bounce as u8) << 1) | self.bounced as u8;
        ok!(builder.store_small_uint(flags, 4)); // int_msg_info$0
        ok!(store_opt_addr(builder, &self.src));
        ok!(self.dst.store_into(builder));
        ok!(self.value.store_into(builder));
        ok!(self.extra_currencies.store_into(builder));
        ok!(self.ihr_fee.store_into(builder));
        ok!(self.fwd_fee.store_into(builder));
        ok!(builder.store_u64(self.created_lt));
        builder.store_u32(self.created_at)
    }
}

impl<'a> Load<'a> for RelaxedIntMsgInfo {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        let flags = ok!(slice.load_small_uint(4));
        if flags & 0b1000 != 0 {
            return Err(Error::InvalidTag);
        }

        Ok(Self {
            ihr_disabled: flags & 0b100 != 0,
            bounce: flags & 0b010 != 0,
            bounced: flags & 0b001 != 0,
            src: ok!(load_opt_addr(slice)),
            dst: ok!(StdAddr::load_from(slice)),
            value: ok!(Tokens::load_from(slice)),
            extra_currencies: ok!(Option::<Cell>::load_from(slice)),
            ihr_fee: ok!(Tokens::load_from(slice)),
            fwd_fee: ok!(Tokens::load_from(slice)),
            created_lt: ok!(slice.load_u64()),
            created_at: ok!(slice.load_u32()),
        })
    }
}

/// Builds a text comment payload.
///
/// ```text
/// text_comment#00000000 text:SnakeData = MsgBody;
/// ```
pub fn comment_body(text: &str) -> Result<Cell, Error> {
    let mut builder = CellBuilder::new();
    ok!(builder.store_u32(0));
    ok!(store_snake_bytes(&mut builder, text.as_bytes()));
    builder.build()
}

/// Parses a text comment payload.
pub fn parse_comment(body: &Cell) -> Result<String, Error> {
    let mut slice = body.as_slice();
    if ok!(slice.load_u32()) != 0 {
        return Err(Error::InvalidTag);
    }

    let mut bytes = Vec::new();
    loop {
        let len = slice.remaining_bits() / 8;
        let mut chunk = [0u8; 128];
        bytes.extend_from_slice(ok!(slice.load_raw(&mut chunk, len * 8)));

        match slice.get_reference(0) {
            Some(child) => slice = child.as_slice(),
            None => break,
        }
    }

    String::from_utf8(bytes).map_err(|_| Error::InvalidData)
}

/// Stores bytes into the builder, continuing in a chain of child cells
/// when they do not fit.
pub fn store_snake_bytes(builder: &mut CellBuilder, bytes: &[u8]) -> Result<(), Error> {
    let fits = (builder.spare_bits_capacity() / 8) as usize;
    let (head, tail) = bytes.split_at(std::cmp::min(fits, bytes.len()));
    ok!(builder.store_raw(head, head.len() as u16 * 8));

    if !tail.is_empty() {
        let mut child = CellBuilder::new();
        ok!(store_snake_bytes(&mut child, tail));
        ok!(builder.store_reference(ok!(child.build())));
    }
    Ok(())
}

fn slice_to_cell(slice: &CellSlice<'_>) -> Result<Cell, Error> {
    let cell = slice.cell();
    if slice.bits_offset() == 0
        && slice.refs_offset() == 0
        && slice.remaining_bits() == cell.bit_len()
        && slice.remaining_refs() == cell.reference_count()
    {
        return Ok(cell.clone());
    }

    let mut builder = CellBuilder::new();
    ok!(builder.store_slice(slice));
    builder.build()
}

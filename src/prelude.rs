//! The `highload-wallet` prelude.
//!
//! This brings into scope a number of traits and commonly used types.

pub use crate::boc::Boc;
pub use crate::cell::{Cell, CellBuilder, CellSlice, HashBytes, Load, Store};
pub use crate::dict::Dict;
pub use crate::error::{Error, TransferError};
pub use crate::models::{
    comment_body, MessageEncoder, OutboundMessage, RelaxedMessageEncoder, SendMode, StateInit,
    StdAddr,
};
pub use crate::num::Tokens;
pub use crate::wallet::{
    HighloadTransfer, HighloadWalletV1, HighloadWalletV2, QueryId, SendError, TransferBuilder,
    TransferV1Config, TransferV2Config, WalletConfig, WalletIdentity, WalletProvider,
    WalletVersion,
};

//! Highload wallet contracts.
//!
//! Wallet address derivation, transfer construction, signing and
//! submission through a [`WalletProvider`].

use crate::models::SendMode;

pub use self::code::{highload_v1_code, highload_v2_code};
pub use self::identity::{
    default_wallet_id, HighloadV1Data, HighloadV2Data, WalletConfig, WalletIdentity,
    WalletVersion,
};
pub use self::messages::{build_messages_dict, parse_messages, HighloadMessage, MessagesDict};
pub use self::provider::{SendError, WalletProvider};
pub use self::query_id::{Clock, FixedClock, QueryId, SystemClock};
pub use self::signer::{SignedBody, UnsignedBody};
pub use self::transfer::{
    HighloadTransfer, HighloadWalletV1, HighloadWalletV2, TransferBuilder, TransferV1,
    TransferV1Config, TransferV2, TransferV2Config,
};

mod code;
mod identity;
mod messages;
mod provider;
mod query_id;
mod signer;
mod transfer;

#[cfg(test)]
mod tests;

/// Default transfer lifetime in seconds.
pub const DEFAULT_TIMEOUT: u32 = 60;

/// Default send mode of transfer messages.
pub const DEFAULT_SEND_MODE: SendMode = SendMode::PAY_FEE_SEPARATELY;

/// Base value of the default wallet id.
pub const WALLET_ID_BASE: u32 = 698983191;

/// Max number of messages in a single transfer.
pub const MAX_MESSAGES: usize = 254;

//! Highload wallet transfers.
//!
//! This crate builds, signs and replay-protects batched external messages for
//! the two generations of highload wallet contracts:
//!
//! - [`HighloadWalletV1`] uses a sequence number and an optional expiration
//!   timestamp as replay protection.
//! - [`HighloadWalletV2`] uses a query id (expiration timestamp and a random
//!   nonce) which is also used as an idempotency token.
//!
//! Both generations put up to [`MAX_MESSAGES`] outbound messages into a
//! dictionary keyed by a message index, sign the representation hash of the
//! payload cell and prepend the signature.
//!
//! ```
//! use ed25519_dalek::SigningKey;
//! use highload_wallet::prelude::*;
//!
//! let key = SigningKey::from_bytes(&[7; 32]);
//! let wallet = HighloadWalletV2::create(0, HashBytes(key.verifying_key().to_bytes()), None)?;
//!
//! let message = RelaxedMessageEncoder.encode(&OutboundMessage {
//!     dst: wallet.address().clone(),
//!     value: Tokens::new(1_000_000_000),
//!     bounce: false,
//!     body: Some(comment_body("hello")?),
//!     init: None,
//! })?;
//!
//! let transfer = wallet.create_transfer(&key, &TransferV2Config::new(vec![message]))?;
//! let boc = Boc::encode(&transfer.body);
//! assert!(!boc.is_empty());
//! # Ok::<_, anyhow::Error>(())
//! ```
//!
//! [`HighloadWalletV1`]: wallet::HighloadWalletV1
//! [`HighloadWalletV2`]: wallet::HighloadWalletV2
//! [`MAX_MESSAGES`]: wallet::MAX_MESSAGES

macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub mod boc;
pub mod cell;
pub mod dict;
pub mod error;
pub mod models;
pub mod num;
pub mod prelude;
pub mod util;
pub mod wallet;

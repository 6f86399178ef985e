//! Common error types.

/// Error type for cell related errors.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// There were not enough bits or refs in the cell slice.
    #[error("cell underflow")]
    CellUnderflow,
    /// There were not enough bits or refs capacity in the cell builder.
    #[error("cell overflow")]
    CellOverflow,
    /// Cell contains invalid descriptor or data.
    #[error("invalid cell")]
    InvalidCell,
    /// Data does not satisfy some constraints.
    #[error("invalid data")]
    InvalidData,
    /// Unknown TLB tag.
    #[error("invalid tag")]
    InvalidTag,
    /// Tree of cells is too deep.
    #[error("cell depth overflow")]
    DepthOverflow,
    /// Signature check failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Public key is not in a ed25519 valid range.
    #[error("invalid public key")]
    InvalidPublicKey,
    /// Underlying integer type does not fit into the target type.
    #[error("underlying integer is too large to fit in target type")]
    IntOverflow,
}

/// Error type for hash bytes parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseHashBytesError {
    /// Failed to parse base64 encoded bytes.
    #[cfg(feature = "base64")]
    #[error("invalid base64 string")]
    InvalidBase64(#[from] base64::DecodeSliceError),
    /// Failed to parse hex encoded bytes.
    #[error("invalid hex string")]
    InvalidHex(#[from] hex::FromHexError),
    /// Error for an unexpected string length.
    #[error("expected string of 44, 64 or 66 bytes")]
    UnexpectedStringLength,
}

/// Error type for address parsing related errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseAddrError {
    /// Tried to parse an empty string.
    #[error("cannot parse address from an empty string")]
    Empty,
    /// Workchain id is too large.
    #[error("workchain id is too large to fit in target type")]
    InvalidWorkchain,
    /// Invalid account id hex.
    #[error("cannot parse account id")]
    InvalidAccountId,
    /// Too many address parts.
    #[error("unexpected address part")]
    UnexpectedPart,
}

/// Error type for highload transfer construction.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Batch exceeds the protocol limit and must be split by the caller.
    #[error("too many messages in one transfer: {count} (max {max})")]
    TooManyMessages {
        /// The number of supplied messages.
        count: usize,
        /// The maximum allowed number of messages.
        max: usize,
    },
    /// Some field value does not fit into its declared width.
    #[error("value of `{field}` is out of range")]
    InvalidInputRange {
        /// Field name.
        field: &'static str,
    },
    /// System clock is unavailable or set before the unix epoch.
    #[error("system clock is unavailable")]
    Clock,
    /// Randomness source failed to produce a nonce.
    #[error("failed to generate a random nonce")]
    Random(#[source] rand::Error),
    /// Failed to build the payload cell.
    #[error("failed to build transfer payload")]
    Cell(#[from] Error),
}

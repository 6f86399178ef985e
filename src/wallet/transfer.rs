use ed25519_dalek::SigningKey;
use rand::RngCore;

use crate::cell::*;
use crate::error::{Error, TransferError};
use crate::models::{SendMode, StateInit, StdAddr};
use crate::wallet::{
    build_messages_dict, Clock, MessagesDict, QueryId, SignedBody, SystemClock, UnsignedBody,
    WalletIdentity, WalletVersion, DEFAULT_SEND_MODE, DEFAULT_TIMEOUT,
};

/// Transfer payload of the highload wallet V1.
///
/// ```text
/// _ wallet_id:uint32 valid_until:uint32 seqno:uint32
///   messages:(HashmapE 16 HighloadMessage) = TransferV1;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferV1 {
    /// Wallet id.
    pub wallet_id: u32,
    /// Expiration timestamp, all ones for the first transfer.
    pub valid_until: u32,
    /// Sequence number of the transfer.
    pub seqno: u32,
    /// Outbound messages.
    pub messages: MessagesDict,
}

impl TransferV1 {
    /// `valid_until` value of the first transfer.
    pub const BOOTSTRAP_VALID_UNTIL: u32 = u32::MAX;
}

impl Store for TransferV1 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.wallet_id));
        ok!(builder.store_u32(self.valid_until));
        ok!(builder.store_u32(self.seqno));
        self.messages.store_into(builder)
    }
}

impl<'a> Load<'a> for TransferV1 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            wallet_id: ok!(slice.load_u32()),
            valid_until: ok!(slice.load_u32()),
            seqno: ok!(slice.load_u32()),
            messages: ok!(MessagesDict::load_from(slice)),
        })
    }
}

/// Transfer payload of the highload wallet V2.
///
/// ```text
/// _ wallet_id:uint32 query_id:uint64
///   messages:(HashmapE 16 HighloadMessage) = TransferV2;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferV2 {
    /// Wallet id.
    pub wallet_id: u32,
    /// Replay protection identifier.
    pub query_id: QueryId,
    /// Outbound messages.
    pub messages: MessagesDict,
}

impl Store for TransferV2 {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.wallet_id));
        ok!(self.query_id.store_into(builder));
        self.messages.store_into(builder)
    }
}

impl<'a> Load<'a> for TransferV2 {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            wallet_id: ok!(slice.load_u32()),
            query_id: ok!(QueryId::load_from(slice)),
            messages: ok!(MessagesDict::load_from(slice)),
        })
    }
}

/// Highload wallet V1 transfer parameters.
#[derive(Debug, Clone)]
pub struct TransferV1Config {
    /// Current sequence number of the wallet.
    pub seqno: u32,
    /// Encoded outbound messages.
    pub messages: Vec<Cell>,
    /// Send mode for all messages.
    pub send_mode: SendMode,
    /// Explicit expiration timestamp.
    ///
    /// `now + DEFAULT_TIMEOUT` is used by default. Ignored for the first transfer.
    pub timeout: Option<u32>,
}

impl TransferV1Config {
    /// Creates transfer parameters with the default send mode and timeout.
    pub fn new(seqno: u32, messages: Vec<Cell>) -> Self {
        Self {
            seqno,
            messages,
            send_mode: DEFAULT_SEND_MODE,
            timeout: None,
        }
    }

    /// Use the specified send mode for all messages.
    #[inline]
    pub fn with_send_mode(mut self, send_mode: SendMode) -> Self {
        self.send_mode = send_mode;
        self
    }

    /// Use the specified expiration timestamp.
    #[inline]
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Highload wallet V2 transfer parameters.
#[derive(Debug, Clone)]
pub struct TransferV2Config {
    /// Encoded outbound messages.
    pub messages: Vec<Cell>,
    /// Send mode for all messages.
    pub send_mode: SendMode,
    /// Query lifetime in seconds.
    ///
    /// [`DEFAULT_TIMEOUT`] is used by default.
    pub timeout: Option<u32>,
    /// Explicit query id nonce, must fit into 30 bits.
    pub random_id: Option<u32>,
}

impl TransferV2Config {
    /// Creates transfer parameters with the default send mode and timeout.
    pub fn new(messages: Vec<Cell>) -> Self {
        Self {
            messages,
            send_mode: DEFAULT_SEND_MODE,
            timeout: None,
            random_id: None,
        }
    }

    /// Use the specified send mode for all messages.
    #[inline]
    pub fn with_send_mode(mut self, send_mode: SendMode) -> Self {
        self.send_mode = send_mode;
        self
    }

    /// Use the specified query lifetime.
    #[inline]
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use the specified query id nonce.
    #[inline]
    pub fn with_random_id(mut self, random_id: u32) -> Self {
        self.random_id = Some(random_id);
        self
    }
}

/// Shared transfer construction of both contract generations.
pub trait TransferBuilder {
    /// Transfer parameters.
    type Config;
    /// Unsigned transfer payload.
    type Payload: Store;

    /// Builds an unsigned transfer payload.
    fn build_payload<C, R>(
        &self,
        config: &Self::Config,
        clock: &C,
        rng: &mut R,
    ) -> Result<Self::Payload, TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized;

    /// Builds and signs a transfer payload.
    ///
    /// Returns the signed body along with the payload.
    fn build_signed<C, R>(
        &self,
        key: &SigningKey,
        config: &Self::Config,
        clock: &C,
        rng: &mut R,
    ) -> Result<(Cell, Self::Payload), TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized,
    {
        let payload = ok!(self.build_payload(config, clock, rng));
        let body = UnsignedBody::new(&payload)?.sign(key)?;
        Ok((body, payload))
    }
}

macro_rules! impl_wallet_identity {
    ($ty:ident, $version:expr) => {
        impl $ty {
            /// Computes the wallet identity.
            ///
            /// [`WALLET_ID_BASE`] plus workchain is used as a default wallet id.
            ///
            /// [`WALLET_ID_BASE`]: crate::wallet::WALLET_ID_BASE
            pub fn create(
                workchain: i8,
                public_key: HashBytes,
                wallet_id: Option<u32>,
            ) -> Result<Self, Error> {
                let identity = ok!(WalletIdentity::new(
                    $version, workchain, public_key, wallet_id
                ));
                Ok(Self { identity })
            }

            /// Returns the wallet identity.
            #[inline]
            pub fn identity(&self) -> &WalletIdentity {
                &self.identity
            }

            /// Wallet account address.
            #[inline]
            pub fn address(&self) -> &StdAddr {
                self.identity.address()
            }

            /// Initial account state (code and data).
            #[inline]
            pub fn state_init(&self) -> &StateInit {
                self.identity.state_init()
            }

            /// Effective wallet id.
            #[inline]
            pub fn wallet_id(&self) -> u32 {
                self.identity.wallet_id()
            }

            /// Ed25519 public key of the wallet owner.
            #[inline]
            pub fn public_key(&self) -> &HashBytes {
                self.identity.public_key()
            }
        }

        impl TryFrom<WalletIdentity> for $ty {
            type Error = Error;

            fn try_from(identity: WalletIdentity) -> Result<Self, Self::Error> {
                if identity.version() == $version {
                    Ok(Self { identity })
                } else {
                    Err(Error::InvalidData)
                }
            }
        }
    };
}

/// Highload wallet with sequence number based replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighloadWalletV1 {
    identity: WalletIdentity,
}

impl_wallet_identity!(HighloadWalletV1, WalletVersion::HighloadV1);

impl HighloadWalletV1 {
    /// Builds a signed transfer body.
    pub fn create_transfer(
        &self,
        key: &SigningKey,
        config: &TransferV1Config,
    ) -> Result<Cell, TransferError> {
        self.create_transfer_ext(key, config, &SystemClock)
    }

    /// Builds a signed transfer body using the specified clock.
    pub fn create_transfer_ext<C>(
        &self,
        key: &SigningKey,
        config: &TransferV1Config,
        clock: &C,
    ) -> Result<Cell, TransferError>
    where
        C: Clock + ?Sized,
    {
        let (body, _) = ok!(self.build_signed(key, config, clock, &mut rand::rngs::OsRng));
        Ok(body)
    }

    /// Checks the signature and the wallet id of a signed transfer body.
    pub fn verify_transfer(&self, body: &Cell) -> Result<TransferV1, Error> {
        let body = ok!(SignedBody::parse(body));
        ok!(body.verify(self.public_key()));

        let transfer = ok!(body.parse_v1());
        if transfer.wallet_id != self.wallet_id() {
            return Err(Error::InvalidData);
        }
        Ok(transfer)
    }
}

impl TransferBuilder for HighloadWalletV1 {
    type Config = TransferV1Config;
    type Payload = TransferV1;

    fn build_payload<C, R>(
        &self,
        config: &Self::Config,
        clock: &C,
        _: &mut R,
    ) -> Result<Self::Payload, TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized,
    {
        let messages = ok!(build_messages_dict(config.send_mode, &config.messages));

        let valid_until = match (config.seqno, config.timeout) {
            (0, _) => TransferV1::BOOTSTRAP_VALID_UNTIL,
            (_, Some(timeout)) => timeout,
            (_, None) => match ok!(clock.now_sec()).checked_add(DEFAULT_TIMEOUT) {
                Some(valid_until) => valid_until,
                None => return Err(TransferError::InvalidInputRange { field: "timeout" }),
            },
        };

        Ok(TransferV1 {
            wallet_id: self.wallet_id(),
            valid_until,
            seqno: config.seqno,
            messages,
        })
    }
}

/// Signed highload wallet V2 transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighloadTransfer {
    /// Signed transfer body.
    pub body: Cell,
    /// Replay protection identifier.
    pub query_id: QueryId,
}

/// Highload wallet with query id based replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighloadWalletV2 {
    identity: WalletIdentity,
}

impl_wallet_identity!(HighloadWalletV2, WalletVersion::HighloadV2);

impl HighloadWalletV2 {
    /// Builds a signed transfer body with a fresh query id.
    pub fn create_transfer(
        &self,
        key: &SigningKey,
        config: &TransferV2Config,
    ) -> Result<HighloadTransfer, TransferError> {
        self.create_transfer_ext(key, config, &SystemClock, &mut rand::rngs::OsRng)
    }

    /// Builds a signed transfer body using the specified clock and randomness source.
    pub fn create_transfer_ext<C, R>(
        &self,
        key: &SigningKey,
        config: &TransferV2Config,
        clock: &C,
        rng: &mut R,
    ) -> Result<HighloadTransfer, TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized,
    {
        let (body, payload) = ok!(self.build_signed(key, config, clock, rng));
        Ok(HighloadTransfer {
            body,
            query_id: payload.query_id,
        })
    }

    /// Checks the signature and the wallet id of a signed transfer body.
    pub fn verify_transfer(&self, body: &Cell) -> Result<TransferV2, Error> {
        let body = ok!(SignedBody::parse(body));
        ok!(body.verify(self.public_key()));

        let transfer = ok!(body.parse_v2());
        if transfer.wallet_id != self.wallet_id() {
            return Err(Error::InvalidData);
        }
        Ok(transfer)
    }
}

impl TransferBuilder for HighloadWalletV2 {
    type Config = TransferV2Config;
    type Payload = TransferV2;

    fn build_payload<C, R>(
        &self,
        config: &Self::Config,
        clock: &C,
        rng: &mut R,
    ) -> Result<Self::Payload, TransferError>
    where
        C: Clock + ?Sized,
        R: RngCore + ?Sized,
    {
        let messages = ok!(build_messages_dict(config.send_mode, &config.messages));

        let query_id = ok!(QueryId::generate(
            config.timeout.unwrap_or(DEFAULT_TIMEOUT),
            config.random_id,
            clock,
            rng,
        ));

        Ok(TransferV2 {
            wallet_id: self.wallet_id(),
            query_id,
            messages,
        })
    }
}

impl SignedBody<'_> {
    /// Loads the highload wallet V1 transfer payload.
    #[inline]
    pub fn parse_v1(&self) -> Result<TransferV1, Error> {
        self.load_payload()
    }

    /// Loads the highload wallet V2 transfer payload.
    #[inline]
    pub fn parse_v2(&self) -> Result<TransferV2, Error> {
        self.load_payload()
    }
}

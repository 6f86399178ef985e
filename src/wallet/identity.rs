use crate::cell::*;
use crate::dict::Dict;
use crate::error::Error;
use crate::models::{StateInit, StdAddr};
use crate::wallet::{highload_v1_code, highload_v2_code, QueryId, WALLET_ID_BASE};

/// Highload wallet contract generation.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WalletVersion {
    /// Sequence number based replay protection.
    HighloadV1,
    /// Query id based replay protection.
    HighloadV2,
}

impl WalletVersion {
    /// Returns the contract code of this version.
    pub fn code(self) -> &'static Cell {
        match self {
            Self::HighloadV1 => highload_v1_code(),
            Self::HighloadV2 => highload_v2_code(),
        }
    }
}

/// Wallet identity parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalletConfig {
    /// Contract generation.
    pub version: WalletVersion,
    /// Workchain of the wallet account.
    #[cfg_attr(feature = "serde", serde(default))]
    pub workchain: i8,
    /// Ed25519 public key of the wallet owner.
    pub public_key: HashBytes,
    /// Explicit wallet id.
    ///
    /// [`WALLET_ID_BASE`] plus workchain is used by default.
    #[cfg_attr(feature = "serde", serde(default))]
    pub wallet_id: Option<u32>,
}

/// Returns the default wallet id for the specified workchain.
#[inline]
pub const fn default_wallet_id(workchain: i8) -> u32 {
    WALLET_ID_BASE.wrapping_add_signed(workchain as i32)
}

/// Deterministic identity of a highload wallet account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletIdentity {
    version: WalletVersion,
    public_key: HashBytes,
    wallet_id: u32,
    state_init: StateInit,
    address: StdAddr,
}

impl WalletIdentity {
    /// Computes the wallet identity.
    pub fn new(
        version: WalletVersion,
        workchain: i8,
        public_key: HashBytes,
        wallet_id: Option<u32>,
    ) -> Result<Self, Error> {
        let wallet_id = wallet_id.unwrap_or(default_wallet_id(workchain));

        let data = ok!(match version {
            WalletVersion::HighloadV1 => CellBuilder::build_from(HighloadV1Data {
                seqno: 0,
                wallet_id,
                public_key,
            }),
            WalletVersion::HighloadV2 => CellBuilder::build_from(HighloadV2Data {
                wallet_id,
                last_cleaned: 0,
                public_key,
                old_queries: Dict::new(),
            }),
        });

        let state_init = StateInit {
            code: Some(version.code().clone()),
            data: Some(data),
        };
        let address = ok!(state_init.compute_address(workchain));

        Ok(Self {
            version,
            public_key,
            wallet_id,
            state_init,
            address,
        })
    }

    /// Computes the wallet identity from config.
    #[inline]
    pub fn from_config(config: &WalletConfig) -> Result<Self, Error> {
        Self::new(
            config.version,
            config.workchain,
            config.public_key,
            config.wallet_id,
        )
    }

    /// Contract generation.
    #[inline]
    pub fn version(&self) -> WalletVersion {
        self.version
    }

    /// Workchain of the wallet account.
    #[inline]
    pub fn workchain(&self) -> i8 {
        self.address.workchain
    }

    /// Ed25519 public key of the wallet owner.
    #[inline]
    pub fn public_key(&self) -> &HashBytes {
        &self.public_key
    }

    /// Effective wallet id.
    #[inline]
    pub fn wallet_id(&self) -> u32 {
        self.wallet_id
    }

    /// Initial account state (code and data).
    #[inline]
    pub fn state_init(&self) -> &StateInit {
        &self.state_init
    }

    /// Wallet account address.
    #[inline]
    pub fn address(&self) -> &StdAddr {
        &self.address
    }

    /// Returns the config from which this identity can be rebuilt.
    pub fn to_config(&self) -> WalletConfig {
        WalletConfig {
            version: self.version,
            workchain: self.workchain(),
            public_key: self.public_key,
            wallet_id: Some(self.wallet_id),
        }
    }
}

/// Persistent data of the highload wallet V1.
///
/// ```text
/// _ seqno:uint32 wallet_id:uint32 public_key:bits256 = HighloadV1Data;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighloadV1Data {
    /// Sequence number of the next transfer.
    pub seqno: u32,
    /// Wallet id.
    pub wallet_id: u32,
    /// Ed25519 public key of the wallet owner.
    pub public_key: HashBytes,
}

impl Store for HighloadV1Data {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.seqno));
        ok!(builder.store_u32(self.wallet_id));
        builder.store_u256(&self.public_key)
    }
}

impl<'a> Load<'a> for HighloadV1Data {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            seqno: ok!(slice.load_u32()),
            wallet_id: ok!(slice.load_u32()),
            public_key: ok!(slice.load_u256()),
        })
    }
}

/// Persistent data of the highload wallet V2.
///
/// ```text
/// _ wallet_id:uint32 last_cleaned:uint64 public_key:bits256
///   old_queries:(HashmapE 64 Cell) = HighloadV2Data;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighloadV2Data {
    /// Wallet id.
    pub wallet_id: u32,
    /// Query id up to which processed queries were removed.
    pub last_cleaned: u64,
    /// Ed25519 public key of the wallet owner.
    pub public_key: HashBytes,
    /// Recently processed queries.
    pub old_queries: Dict<QueryId, ()>,
}

impl HighloadV2Data {
    /// Returns `true` if the query is known to the contract as processed.
    pub fn is_processed(&self, query_id: QueryId) -> Result<bool, Error> {
        if query_id.into_inner() <= self.last_cleaned {
            return Ok(true);
        }
        self.old_queries.contains_key(query_id)
    }
}

impl Store for HighloadV2Data {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        ok!(builder.store_u32(self.wallet_id));
        ok!(builder.store_u64(self.last_cleaned));
        ok!(builder.store_u256(&self.public_key));
        self.old_queries.store_into(builder)
    }
}

impl<'a> Load<'a> for HighloadV2Data {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            wallet_id: ok!(slice.load_u32()),
            last_cleaned: ok!(slice.load_u64()),
            public_key: ok!(slice.load_u256()),
            old_queries: ok!(Dict::load_from(slice)),
        })
    }
}

use std::future::Future;
use std::sync::Mutex;

use ed25519_dalek::SigningKey;
use rand::SeedableRng;

use super::*;
use crate::cell::*;
use crate::error::{Error, TransferError};
use crate::models::{
    comment_body, MessageEncoder, OutboundMessage, RelaxedMessageEncoder, SendMode, StateInit,
    StdAddr,
};
use crate::num::Tokens;

const V1_PUBKEY: &str = "0425bfe16678c365f778fb0367818f00e9f085ea361c1eb909347b35d619ffb6";
const V2_PUBKEY: &str = "719ab79a452932ff301e15765fedb2abdb2eed1b5b802628bde80b536f62374a";

fn make_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

fn public_key(key: &SigningKey) -> HashBytes {
    HashBytes(key.verifying_key().to_bytes())
}

fn make_messages(dst: &StdAddr, count: usize) -> anyhow::Result<Vec<Cell>> {
    let mut messages = Vec::with_capacity(count);
    for i in 0..count {
        messages.push(RelaxedMessageEncoder.encode(&OutboundMessage {
            dst: dst.clone(),
            value: Tokens::new(1_000_000 + i as u128),
            bounce: false,
            body: Some(comment_body(&format!("message #{i}"))?),
            init: None,
        })?);
    }
    Ok(messages)
}

#[test]
fn known_addresses() -> anyhow::Result<()> {
    let v1 = HighloadWalletV1::create(0, V1_PUBKEY.parse()?, None)?;
    assert_eq!(v1.wallet_id(), WALLET_ID_BASE);
    assert_eq!(
        v1.address().to_string(),
        "0:37c0120beed92563cc8194d904ad8d870c8f4e28fe536f1a0b56899848b5f526"
    );

    let v2 = HighloadWalletV2::create(0, V2_PUBKEY.parse()?, None)?;
    assert_eq!(v2.wallet_id(), WALLET_ID_BASE);
    assert_eq!(
        v2.address().to_string(),
        "0:4f8ed86fcea45a8be04a37441849f7ca37131490d4f0cbc7c8ec09d4ba3b9ecf"
    );

    // Same inputs always produce the same identity
    assert_eq!(v2, HighloadWalletV2::create(0, V2_PUBKEY.parse()?, None)?);
    Ok(())
}

#[test]
fn wallet_ids() -> anyhow::Result<()> {
    assert_eq!(default_wallet_id(0), 698983191);
    assert_eq!(default_wallet_id(-1), 698983190);
    assert_eq!(default_wallet_id(1), 698983192);

    let key = public_key(&make_key(1));
    let basechain = HighloadWalletV2::create(0, key, None)?;
    let masterchain = HighloadWalletV2::create(-1, key, None)?;
    assert_eq!(masterchain.wallet_id(), WALLET_ID_BASE - 1);
    assert!(masterchain.address().is_masterchain());
    assert_ne!(basechain.address().address, masterchain.address().address);

    // Explicit wallet id changes the address
    let custom = HighloadWalletV2::create(0, key, Some(123))?;
    assert_eq!(custom.wallet_id(), 123);
    assert_ne!(custom.address(), basechain.address());
    Ok(())
}

#[test]
fn initial_data() -> anyhow::Result<()> {
    let key = public_key(&make_key(2));

    let v1 = HighloadWalletV1::create(0, key, None)?;
    let data = v1.state_init().data.as_ref().unwrap().parse::<HighloadV1Data>()?;
    assert_eq!(data.seqno, 0);
    assert_eq!(data.wallet_id, v1.wallet_id());
    assert_eq!(data.public_key, key);
    assert_eq!(v1.state_init().code.as_ref(), Some(highload_v1_code()));

    let v2 = HighloadWalletV2::create(0, key, None)?;
    let data = v2.state_init().data.as_ref().unwrap().parse::<HighloadV2Data>()?;
    assert_eq!(data.wallet_id, v2.wallet_id());
    assert_eq!(data.last_cleaned, 0);
    assert_eq!(data.public_key, key);
    assert!(data.old_queries.is_empty());
    assert!(!data.is_processed(QueryId::new(100, 1))?);
    assert_eq!(v2.state_init().code.as_ref(), Some(highload_v2_code()));
    Ok(())
}

#[test]
fn identity_conversions() -> anyhow::Result<()> {
    let key = public_key(&make_key(3));
    let identity = WalletIdentity::new(WalletVersion::HighloadV1, 0, key, None)?;

    let wallet = HighloadWalletV1::try_from(identity.clone())?;
    assert_eq!(wallet.identity(), &identity);
    assert_eq!(
        HighloadWalletV2::try_from(identity.clone()).unwrap_err(),
        Error::InvalidData
    );

    let restored = WalletIdentity::from_config(&identity.to_config())?;
    assert_eq!(restored, identity);
    Ok(())
}

#[test]
fn wallet_config_serde() -> anyhow::Result<()> {
    let config = serde_json::from_str::<WalletConfig>(&format!(
        r#"{{"version":"highload_v2","public_key":"{V2_PUBKEY}"}}"#
    ))?;
    assert_eq!(config.version, WalletVersion::HighloadV2);
    assert_eq!(config.workchain, 0);
    assert_eq!(config.wallet_id, None);

    let identity = WalletIdentity::from_config(&config)?;
    assert_eq!(
        identity.address().to_string(),
        "0:4f8ed86fcea45a8be04a37441849f7ca37131490d4f0cbc7c8ec09d4ba3b9ecf"
    );

    let serialized = serde_json::to_string(&identity.to_config())?;
    let parsed = serde_json::from_str::<WalletConfig>(&serialized)?;
    assert_eq!(WalletIdentity::from_config(&parsed)?, identity);
    Ok(())
}

#[test]
fn v1_transfer() -> anyhow::Result<()> {
    let key = make_key(4);
    let wallet = HighloadWalletV1::create(0, public_key(&key), None)?;
    let messages = make_messages(wallet.address(), 3)?;
    let clock = FixedClock(1_700_000_000);

    // First transfer never expires
    let config = TransferV1Config::new(0, messages.clone()).with_timeout(123);
    let body = wallet.create_transfer_ext(&key, &config, &clock)?;
    let transfer = wallet.verify_transfer(&body)?;
    assert_eq!(transfer.wallet_id, wallet.wallet_id());
    assert_eq!(transfer.seqno, 0);
    assert_eq!(transfer.valid_until, u32::MAX);

    // Default timeout
    let config = TransferV1Config::new(5, messages.clone());
    let body = wallet.create_transfer_ext(&key, &config, &clock)?;
    let transfer = wallet.verify_transfer(&body)?;
    assert_eq!(transfer.seqno, 5);
    assert_eq!(transfer.valid_until, 1_700_000_000 + DEFAULT_TIMEOUT);

    // Explicit timeout is an absolute timestamp
    let config = TransferV1Config::new(6, messages.clone())
        .with_timeout(1_800_000_000)
        .with_send_mode(SendMode::PAY_FEE_SEPARATELY | SendMode::IGNORE_ERROR);
    let body = wallet.create_transfer_ext(&key, &config, &clock)?;
    let transfer = wallet.verify_transfer(&body)?;
    assert_eq!(transfer.valid_until, 1_800_000_000);

    let entries = parse_messages(&transfer.messages)?;
    assert_eq!(entries.len(), messages.len());
    for (i, (index, entry)) in entries.into_iter().enumerate() {
        assert_eq!(index as usize, i);
        assert_eq!(entry.mode.bits(), 3);
        assert_eq!(entry.message, messages[i]);
    }
    Ok(())
}

#[test]
fn v1_layout() -> anyhow::Result<()> {
    let key = make_key(5);
    let wallet = HighloadWalletV1::create(0, public_key(&key), None)?;
    let config = TransferV1Config::new(7, make_messages(wallet.address(), 1)?).with_timeout(1000);
    let body = wallet.create_transfer_ext(&key, &config, &FixedClock(0))?;

    // signature + wallet_id + valid_until + seqno + dict flag
    assert_eq!(body.bit_len(), 512 + 32 + 32 + 32 + 1);
    assert_eq!(body.reference_count(), 1);

    let mut slice = body.as_slice();
    slice.skip_first(512, 0)?;
    assert_eq!(slice.load_u32()?, wallet.wallet_id());
    assert_eq!(slice.load_u32()?, 1000);
    assert_eq!(slice.load_u32()?, 7);
    assert!(slice.load_bit()?);
    Ok(())
}

#[test]
fn v2_transfer() -> anyhow::Result<()> {
    let key = make_key(6);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let messages = make_messages(wallet.address(), 4)?;
    let now = 1_700_000_000;

    let config = TransferV2Config::new(messages.clone()).with_random_id(12345);
    let transfer = wallet.create_transfer_ext(
        &key,
        &config,
        &FixedClock(now),
        &mut rand::rngs::OsRng,
    )?;
    assert_eq!(
        transfer.query_id.into_inner(),
        ((now as u64 + 60) << 32) | 12345
    );

    let payload = wallet.verify_transfer(&transfer.body)?;
    assert_eq!(payload.wallet_id, wallet.wallet_id());
    assert_eq!(payload.query_id, transfer.query_id);

    let signed = SignedBody::parse(&transfer.body)?;
    assert_eq!(signed.parse_v2()?, payload);
    assert_eq!(
        signed.payload_hash()?,
        *CellBuilder::build_from(&payload)?.repr_hash()
    );

    let entries = parse_messages(&payload.messages)?;
    assert_eq!(entries.len(), messages.len());
    for (i, (index, entry)) in entries.into_iter().enumerate() {
        assert_eq!(index as usize, i);
        assert_eq!(entry.mode, DEFAULT_SEND_MODE);
        assert_eq!(entry.message, messages[i]);
    }

    // Custom timeout
    let config = config.with_timeout(3600);
    let transfer =
        wallet.create_transfer_ext(&key, &config, &FixedClock(now), &mut rand::rngs::OsRng)?;
    assert_eq!(transfer.query_id.expire_at(), now + 3600);
    assert_eq!(transfer.query_id.nonce(), 12345);
    Ok(())
}

#[test]
fn v2_random_query_ids() -> anyhow::Result<()> {
    let key = make_key(7);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let config = TransferV2Config::new(make_messages(wallet.address(), 1)?);
    let clock = FixedClock(1_000_000);
    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(123);

    let first = wallet.create_transfer_ext(&key, &config, &clock, &mut rng)?;
    let second = wallet.create_transfer_ext(&key, &config, &clock, &mut rng)?;
    for transfer in [&first, &second] {
        assert_eq!(transfer.query_id.expire_at(), 1_000_060);
        assert!(transfer.query_id.nonce() <= QueryId::MAX_NONCE);
    }
    assert_ne!(first.query_id, second.query_id);
    assert_ne!(first.body, second.body);

    // Same inputs produce the same body
    let mut rng = rand_xorshift::XorShiftRng::seed_from_u64(123);
    let repeated = wallet.create_transfer_ext(&key, &config, &clock, &mut rng)?;
    assert_eq!(repeated, first);
    Ok(())
}

#[test]
fn messages_limit() -> anyhow::Result<()> {
    let key = make_key(8);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let messages = make_messages(wallet.address(), MAX_MESSAGES + 1)?;
    let clock = FixedClock(1_000_000);
    let rng = &mut rand::rngs::OsRng;

    let config = TransferV2Config::new(messages[..MAX_MESSAGES].to_vec());
    let transfer = wallet.create_transfer_ext(&key, &config, &clock, rng)?;
    let payload = wallet.verify_transfer(&transfer.body)?;
    assert_eq!(parse_messages(&payload.messages)?.len(), MAX_MESSAGES);

    let config = TransferV2Config::new(messages.clone());
    assert!(matches!(
        wallet.create_transfer_ext(&key, &config, &clock, rng),
        Err(TransferError::TooManyMessages { count: 255, max: 254 })
    ));

    let wallet = HighloadWalletV1::create(0, public_key(&key), None)?;
    let config = TransferV1Config::new(1, messages);
    assert!(matches!(
        wallet.create_transfer_ext(&key, &config, &clock),
        Err(TransferError::TooManyMessages { count: 255, max: 254 })
    ));
    Ok(())
}

#[test]
fn invalid_inputs() -> anyhow::Result<()> {
    let key = make_key(9);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let rng = &mut rand::rngs::OsRng;

    let config = TransferV2Config::new(Vec::new()).with_random_id(1 << 30);
    assert!(matches!(
        wallet.create_transfer_ext(&key, &config, &FixedClock(0), rng),
        Err(TransferError::InvalidInputRange { field: "random_id" })
    ));

    let config = TransferV2Config::new(Vec::new());
    assert!(matches!(
        wallet.create_transfer_ext(&key, &config, &FixedClock(u32::MAX), rng),
        Err(TransferError::InvalidInputRange { field: "timeout" })
    ));

    let wallet = HighloadWalletV1::create(0, public_key(&key), None)?;
    let config = TransferV1Config::new(1, Vec::new());
    assert!(matches!(
        wallet.create_transfer_ext(&key, &config, &FixedClock(u32::MAX - 10)),
        Err(TransferError::InvalidInputRange { field: "timeout" })
    ));
    Ok(())
}

#[test]
fn foreign_transfers() -> anyhow::Result<()> {
    let key = make_key(10);
    let other_key = make_key(11);
    let clock = FixedClock(1_000_000);

    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let config = TransferV2Config::new(make_messages(wallet.address(), 2)?).with_random_id(1);

    // Signed by another key
    let transfer = wallet.create_transfer_ext(&other_key, &config, &clock, &mut rand::rngs::OsRng)?;
    assert_eq!(
        wallet.verify_transfer(&transfer.body).unwrap_err(),
        Error::InvalidSignature
    );

    // Signed for another wallet id
    let other = HighloadWalletV2::create(0, public_key(&key), Some(1))?;
    let transfer = other.create_transfer_ext(&key, &config, &clock, &mut rand::rngs::OsRng)?;
    assert_eq!(
        wallet.verify_transfer(&transfer.body).unwrap_err(),
        Error::InvalidData
    );
    assert!(other.verify_transfer(&transfer.body).is_ok());
    Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("request rejected")]
struct Rejected;

#[derive(Default)]
struct MockProvider {
    seqno: u32,
    public_key: Option<HashBytes>,
    reject: bool,
    processed: Vec<QueryId>,
    sent: Mutex<Vec<(StdAddr, StateInit, Cell)>>,
}

impl WalletProvider for MockProvider {
    type Error = Rejected;

    fn get_balance(
        &self,
        _: &StdAddr,
    ) -> impl Future<Output = Result<Tokens, Self::Error>> + Send {
        std::future::ready(Ok(Tokens::new(10_000_000_000)))
    }

    fn get_seqno(&self, _: &StdAddr) -> impl Future<Output = Result<u32, Self::Error>> + Send {
        std::future::ready(Ok(self.seqno))
    }

    fn get_public_key(
        &self,
        _: &StdAddr,
    ) -> impl Future<Output = Result<HashBytes, Self::Error>> + Send {
        std::future::ready(self.public_key.ok_or(Rejected))
    }

    fn is_processed(
        &self,
        _: &StdAddr,
        query_id: QueryId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send {
        std::future::ready(Ok(self.processed.contains(&query_id)))
    }

    fn send_external(
        &self,
        address: &StdAddr,
        state_init: &StateInit,
        body: Cell,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let res = if self.reject {
            Err(Rejected)
        } else {
            let mut sent = self.sent.lock().unwrap();
            sent.push((address.clone(), state_init.clone(), body));
            Ok(())
        };
        std::future::ready(res)
    }
}

#[tokio::test]
async fn v1_send_transfer() -> anyhow::Result<()> {
    let key = make_key(12);
    let wallet = HighloadWalletV1::create(0, public_key(&key), None)?;
    let provider = MockProvider {
        seqno: 42,
        ..Default::default()
    };

    let config = TransferV1Config::new(0, make_messages(wallet.address(), 2)?);
    let seqno = wallet.send_transfer(&provider, &key, config).await?;
    assert_eq!(seqno, 42);

    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (address, state_init, body) = &sent[0];
    assert_eq!(address, wallet.address());
    assert_eq!(state_init, wallet.state_init());

    let transfer = wallet.verify_transfer(body)?;
    assert_eq!(transfer.seqno, 42);

    assert_eq!(
        wallet.get_balance(&provider).await?,
        Tokens::new(10_000_000_000)
    );
    Ok(())
}

#[tokio::test]
async fn v2_send_transfer() -> anyhow::Result<()> {
    let key = make_key(13);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let config = TransferV2Config::new(make_messages(wallet.address(), 2)?);

    let mut provider = MockProvider::default();
    let query_id = wallet.send_transfer(&provider, &key, &config).await?;
    assert!(!wallet.is_processed(&provider, query_id).await?);

    {
        let sent = provider.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let transfer = wallet.verify_transfer(&sent[0].2)?;
        assert_eq!(transfer.query_id, query_id);
    }

    provider.processed.push(query_id);
    assert!(wallet.is_processed(&provider, query_id).await?);
    Ok(())
}

#[tokio::test]
async fn rejected_submission() -> anyhow::Result<()> {
    let key = make_key(14);
    let wallet = HighloadWalletV2::create(0, public_key(&key), None)?;
    let provider = MockProvider {
        reject: true,
        ..Default::default()
    };

    let config = TransferV2Config::new(make_messages(wallet.address(), 1)?);
    let res = wallet.send_transfer(&provider, &key, &config).await;
    assert!(matches!(res, Err(SendError::Provider(Rejected))));

    let config = TransferV2Config::new(make_messages(wallet.address(), MAX_MESSAGES + 1)?);
    let res = wallet.send_transfer(&provider, &key, &config).await;
    assert!(matches!(
        res,
        Err(SendError::Transfer(TransferError::TooManyMessages { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn wallet_state_queries() -> anyhow::Result<()> {
    let key = make_key(15);
    let v1 = HighloadWalletV1::create(0, public_key(&key), None)?;
    let v2 = HighloadWalletV2::create(0, public_key(&key), None)?;

    // Undeployed account
    let provider = MockProvider::default();
    assert_eq!(v1.get_seqno(&provider).await?, 0);
    assert!(matches!(v1.get_public_key(&provider).await, Err(Rejected)));
    assert!(matches!(v2.get_public_key(&provider).await, Err(Rejected)));

    let provider = MockProvider {
        seqno: 17,
        public_key: Some(public_key(&key)),
        ..Default::default()
    };
    assert_eq!(v1.get_seqno(&provider).await?, 17);
    assert_eq!(v1.get_public_key(&provider).await?, *v1.public_key());
    assert_eq!(v2.get_public_key(&provider).await?, *v2.public_key());
    assert_eq!(
        v2.get_balance(&provider).await?,
        Tokens::new(10_000_000_000)
    );

    // Fetching state does not submit anything
    assert!(provider.sent.lock().unwrap().is_empty());
    Ok(())
}

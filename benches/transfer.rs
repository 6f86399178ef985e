use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ed25519_dalek::SigningKey;
use highload_wallet::prelude::*;
use highload_wallet::wallet::FixedClock;
use rand::SeedableRng;

fn make_messages(dst: &StdAddr, count: usize) -> Vec<Cell> {
    (0..count)
        .map(|i| {
            RelaxedMessageEncoder
                .encode(&OutboundMessage {
                    dst: dst.clone(),
                    value: Tokens::new(1_000_000 + i as u128),
                    bounce: false,
                    body: Some(comment_body("bench").unwrap()),
                    init: None,
                })
                .unwrap()
        })
        .collect()
}

fn transfer_group(c: &mut Criterion) {
    let key = SigningKey::from_bytes(&[1; 32]);
    let public_key = HashBytes(key.verifying_key().to_bytes());
    let v1 = HighloadWalletV1::create(0, public_key, None).unwrap();
    let v2 = HighloadWalletV2::create(0, public_key, None).unwrap();
    let clock = FixedClock(1_700_000_000);

    let mut group = c.benchmark_group("create_transfer");

    for count in [1, 16, 128, 254] {
        let messages = make_messages(v2.address(), count);

        let config = TransferV1Config::new(1, messages.clone());
        group.bench_with_input(BenchmarkId::new("v1", count), &config, |b, config| {
            b.iter(|| {
                let result = v1.create_transfer_ext(&key, config, &clock).unwrap();
                black_box(result);
            });
        });

        let config = TransferV2Config::new(messages);
        let mut rng = rand_xorshift::XorShiftRng::from_seed([0u8; 16]);
        group.bench_with_input(BenchmarkId::new("v2", count), &config, |b, config| {
            b.iter(|| {
                let result = v2
                    .create_transfer_ext(&key, config, &clock, &mut rng)
                    .unwrap();
                black_box(result);
            });
        });
    }
}

fn wallet_address_group(c: &mut Criterion) {
    let public_key = HashBytes([7; 32]);
    c.bench_function("wallet_identity", |b| {
        b.iter(|| {
            let result = HighloadWalletV2::create(0, black_box(public_key), None).unwrap();
            black_box(result);
        });
    });
}

criterion_group!(transfer, transfer_group, wallet_address_group);
criterion_main!(transfer);

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use highload_wallet::cell::*;
use highload_wallet::dict::*;
use rand::distributions::{Distribution, Standard};
use rand::{Rng, SeedableRng};

fn build_dict_impl<K, V>(id: impl Into<String>, sizes: &[usize], c: &mut Criterion)
where
    Standard: Distribution<K> + Distribution<V>,
    K: Store + DictKey + Ord,
    V: Store,
{
    let mut rng = rand_xorshift::XorShiftRng::from_seed([0u8; 16]);

    let mut group = c.benchmark_group(id);

    for size in sizes {
        let mut values = (0..*size)
            .map(|_| (rng.gen::<K>(), rng.gen::<V>()))
            .collect::<Vec<_>>();
        values.sort_by(|(l, _), (r, _)| l.cmp(r));

        group.bench_with_input(BenchmarkId::new("leaves", size), &values, |b, values| {
            b.iter(|| {
                let result = Dict::<K, V>::try_from_sorted_slice(values).unwrap();
                black_box(result);
            });
        });

        let map = values.into_iter().collect::<BTreeMap<_, _>>();
        group.bench_with_input(BenchmarkId::new("btree", size), &map, |b, map| {
            b.iter(|| {
                let result = Dict::<K, V>::try_from_btree(map).unwrap();
                black_box(result);
            });
        });
    }
}

fn build_dict_group(c: &mut Criterion) {
    macro_rules! decl_dict_benches {
        ($(($k:ty, $v:ident): [$($n:literal),+]),*$(,)?) => {
            $({
                let id = format!(
                    "build_dict({},{})",
                    stringify!($k), stringify!($v)
                );
                build_dict_impl::<$k, $v>(id, &[$($n),+], c);
            });*
        };
    }

    decl_dict_benches![
        (i16, u64): [10, 100, 254],
        (u32, u64): [10, 100, 1000, 10000],
        (u64, u64): [10, 100, 1000, 10000],
    ];
}

criterion_group!(build_dict, build_dict_group);
criterion_main!(build_dict);

use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use siphasher::sip::SipHasher;
use swiss_table::HashTable as SwissHashTable;
use swiss_table::hash_table::Entry as SwissEntry;

trait KeyValuePair: Clone {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[(1 << 10), (1 << 11), (1 << 12), (1 << 13), (1 << 14)];

fn fill_swiss<TestItem: KeyValuePair>(
    items: impl IntoIterator<Item = (u64, TestItem)>,
) -> SwissHashTable<TestItem> {
    let mut table = SwissHashTable::<TestItem>::with_capacity(0);
    for (hash, item) in items {
        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            SwissEntry::Vacant(entry) => {
                entry.insert(item);
            }
            SwissEntry::Occupied(_) => unreachable!(),
        }
    }
    table
}

fn fill_hashbrown<TestItem: KeyValuePair>(
    items: impl IntoIterator<Item = (u64, TestItem)>,
) -> HashbrownHashTable<TestItem> {
    let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
    for (hash, item) in items {
        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
            HashbrownEntry::Vacant(entry) => {
                entry.insert(item);
            }
            HashbrownEntry::Occupied(_) => unreachable!(),
        }
    }
    table
}

fn bench_insert_random<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    let mut rng = OsRng;

    for size in SIZES[..=MAX_SIZE].iter() {
        let swiss_capacity = SwissHashTable::<TestItem>::with_capacity(*size).capacity();
        let hashbrown_capacity = HashbrownHashTable::<TestItem>::with_capacity(*size).capacity();

        let hash_and_item = (0..swiss_capacity.max(hashbrown_capacity))
            .map(|_| {
                let key = rng.try_next_u64().unwrap();
                let item = TestItem::new(key);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        group.throughput(Throughput::Elements(swiss_capacity as u64));
        group.bench_function("swiss_table", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = SwissHashTable::<TestItem>::with_capacity(0);
                    for (hash, item) in hash_and_item.into_iter().take(swiss_capacity) {
                        match table.entry(hash, |v| v.eq_key(&item), |v| v.hash_key()) {
                            SwissEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            SwissEntry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.throughput(Throughput::Elements(hashbrown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    let mut table = HashbrownHashTable::with_capacity(0);
                    for (hash, item) in hash_and_item.into_iter().take(hashbrown_capacity) {
                        match table.entry(hash, |v: &TestItem| v.eq_key(&item), |v| v.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert(item));
                            }
                            HashbrownEntry::Occupied(_) => unreachable!(),
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_hit_{}", core::any::type_name::<TestItem>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let swiss_capacity = SwissHashTable::<TestItem>::with_capacity(*size).capacity();
        let hashbrown_capacity = HashbrownHashTable::<TestItem>::with_capacity(*size).capacity();

        let hash_and_item = (0..swiss_capacity.max(hashbrown_capacity))
            .map(|key| {
                let item = TestItem::new(key as u64);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        let swiss = fill_swiss(hash_and_item.iter().take(swiss_capacity).cloned());
        group.throughput(Throughput::Elements(swiss_capacity as u64));
        group.bench_function("swiss_table", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item[..swiss_capacity].to_vec();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    for (hash, item) in hash_and_item.iter() {
                        black_box(swiss.find(*hash, |v| v.eq_key(item)));
                    }
                },
                BatchSize::SmallInput,
            )
        });

        let hashbrown_table =
            fill_hashbrown(hash_and_item.iter().take(hashbrown_capacity).cloned());
        group.throughput(Throughput::Elements(hashbrown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item[..hashbrown_capacity].to_vec();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    hash_and_item
                },
                |hash_and_item| {
                    for (hash, item) in hash_and_item.iter() {
                        black_box(hashbrown_table.find(*hash, |v| v.eq_key(item)));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_miss<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("find_miss_{}", core::any::type_name::<TestItem>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let swiss_capacity = SwissHashTable::<TestItem>::with_capacity(*size).capacity();
        let hashbrown_capacity = HashbrownHashTable::<TestItem>::with_capacity(*size).capacity();

        let hash_and_item = (0..swiss_capacity.max(hashbrown_capacity) * 2)
            .step_by(2)
            .map(|key| {
                let item = TestItem::new(key as u64);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        let misses_hash_and_key = (1..=swiss_capacity.max(hashbrown_capacity) * 2)
            .step_by(2)
            .map(|key| {
                let item = TestItem::new(key as u64);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        let swiss = fill_swiss(hash_and_item.iter().take(swiss_capacity).cloned());
        group.throughput(Throughput::Elements(swiss_capacity as u64));
        group.bench_function("swiss_table", |b| {
            b.iter(|| {
                for (hash, key) in misses_hash_and_key.iter().take(swiss_capacity) {
                    black_box(swiss.find(*hash, |v| v.eq_key(key)));
                }
            })
        });

        let hashbrown_table =
            fill_hashbrown(hash_and_item.iter().take(hashbrown_capacity).cloned());
        group.throughput(Throughput::Elements(hashbrown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for (hash, key) in misses_hash_and_key.iter().take(hashbrown_capacity) {
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(key)));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<TestItem>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let swiss_capacity = SwissHashTable::<TestItem>::with_capacity(*size).capacity();
        let hashbrown_capacity = HashbrownHashTable::<TestItem>::with_capacity(*size).capacity();

        let hash_and_item = (0..swiss_capacity.max(hashbrown_capacity))
            .map(|i| {
                let item = TestItem::new(i as u64);
                let hash = item.hash_key();
                (hash, item)
            })
            .collect::<Vec<(u64, TestItem)>>();

        group.throughput(Throughput::Elements(swiss_capacity as u64));
        group.bench_function("swiss_table", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item[..swiss_capacity].to_vec();
                    let table = fill_swiss(hash_and_item.iter().cloned());
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    (table, hash_and_item)
                },
                |(mut table, hash_and_item)| {
                    for (hash, item) in hash_and_item.iter() {
                        black_box(table.remove(*hash, |v| v.eq_key(item)));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.throughput(Throughput::Elements(hashbrown_capacity as u64));
        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item[..hashbrown_capacity].to_vec();
                    let table = fill_hashbrown(hash_and_item.iter().cloned());
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    (table, hash_and_item)
                },
                |(mut table, hash_and_item)| {
                    for (hash, item) in hash_and_item.iter() {
                        let result = match table.find_entry(*hash, |v| v.eq_key(item)) {
                            Ok(entry) => Some(entry.remove().0),
                            Err(_) => None,
                        };
                        black_box(result);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_mixed_probabilistic<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "mixed_probabilistic_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        // Keys drawn from twice the table size: roughly half of all lookups miss.
        let mut rng = SmallRng::seed_from_u64(*size as u64);
        let operations = (0..*size * 4)
            .map(|_| {
                let item = TestItem::new(rng.random_range(0..(*size as u64) * 2));
                let hash = item.hash_key();
                let op = rng.random_range(0..10u8);
                (op, hash, item)
            })
            .collect::<Vec<(u8, u64, TestItem)>>();

        group.throughput(Throughput::Elements(operations.len() as u64));
        group.bench_function("swiss_table", |b| {
            b.iter(|| {
                let mut table = SwissHashTable::<TestItem>::with_capacity(0);
                for (op, hash, item) in operations.iter() {
                    match op {
                        0..=4 => {
                            black_box(table.find(*hash, |v| v.eq_key(item)));
                        }
                        5..=7 => {
                            table
                                .entry(*hash, |v| v.eq_key(item), |v| v.hash_key())
                                .or_insert_with(|| item.clone());
                        }
                        _ => {
                            black_box(table.remove(*hash, |v| v.eq_key(item)));
                        }
                    }
                }
                black_box(table)
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                let mut table = HashbrownHashTable::<TestItem>::with_capacity(0);
                for (op, hash, item) in operations.iter() {
                    match op {
                        0..=4 => {
                            black_box(table.find(*hash, |v| v.eq_key(item)));
                        }
                        5..=7 => {
                            table
                                .entry(*hash, |v| v.eq_key(item), |v| v.hash_key())
                                .or_insert_with(|| item.clone());
                        }
                        _ => {
                            if let Ok(entry) = table.find_entry(*hash, |v| v.eq_key(item)) {
                                black_box(entry.remove().0);
                            }
                        }
                    }
                }
                black_box(table)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 4>,
    bench_insert_random::<TestItem, 4>,
    bench_find_hit::<SmallTestItem, 4>,
    bench_find_hit::<TestItem, 4>,
    bench_find_miss::<SmallTestItem, 2>,
    bench_find_miss::<TestItem, 2>,
    bench_remove::<SmallTestItem, 4>,
    bench_remove::<TestItem, 4>,
    bench_mixed_probabilistic::<SmallTestItem, 3>,
    bench_mixed_probabilistic::<TestItem, 3>,
);

criterion_main!(benches);

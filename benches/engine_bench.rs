use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tempfile::TempDir;

use rangekv::{Db, Interval, Options, StorageEngine, SyncPolicy, WriteBatch, WriteOptions};

const N: u32 = 10_000;

fn key(i: u32) -> Vec<u8> {
    // Fixed-width keys keep numeric and byte order the same.
    format!("k{:08}", i).into_bytes()
}

fn value(i: u32) -> Vec<u8> {
    format!("v{:08}", i).into_bytes()
}

fn options() -> Options {
    Options {
        sync_policy: SyncPolicy::EveryNWrites(1024),
        write_buffer_size: 64 * 1024 * 1024,
        ..Options::default()
    }
}

fn preload(db: &Db, n: u32) {
    let batch = WriteBatch::new();
    for i in 0..n {
        batch.put(&key(i), &value(i));
    }
    db.write(&batch, WriteOptions::default()).expect("preload");
}

fn open_temp_db() -> (TempDir, Db) {
    let dir = TempDir::new().expect("tempdir");
    let db = Db::open(dir.path(), options()).expect("open");
    (dir, db)
}

fn bench_fill(c: &mut Criterion) {
    c.bench_function("fill/10k single puts", |b| {
        b.iter_batched(
            open_temp_db,
            |(_dir, db)| {
                for i in 0..N {
                    db.put(&key(i), &value(i)).expect("put");
                }
            },
            BatchSize::LargeInput,
        );
    });

    c.bench_function("fill/10k one batch", |b| {
        b.iter_batched(open_temp_db, |(_dir, db)| preload(&db, N), BatchSize::LargeInput);
    });
}

fn bench_point_reads(c: &mut Criterion) {
    let db = Db::open_in_memory(options()).expect("open");
    preload(&db, N);
    let snapshot = db.snapshot();
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("get/random cached", |b| {
        b.iter(|| {
            let i = rng.gen_range(0..N);
            snapshot.get(&key(i)).expect("get")
        })
    });

    let uncached = snapshot.noncaching();
    c.bench_function("get/random noncaching", |b| {
        b.iter(|| {
            let i = rng.gen_range(0..N);
            uncached.get(&key(i)).expect("get")
        })
    });
}

fn bench_scans(c: &mut Criterion) {
    let db = Db::open_in_memory(options()).expect("open");
    preload(&db, N);
    let snapshot = db.snapshot();

    c.bench_function("scan/full forward", |b| {
        b.iter(|| snapshot.cursor().expect("cursor").count())
    });

    c.bench_function("scan/full reversed", |b| {
        let reversed = snapshot.reversed();
        b.iter(|| reversed.cursor().expect("cursor").count())
    });

    let window = snapshot.clamp_to_interval(&Interval::new(key(N / 2), key(N / 2 + 100)));
    c.bench_function("scan/100 key window", |b| {
        b.iter(|| window.keys().expect("keys").len())
    });
}

fn bench_compaction(c: &mut Criterion) {
    c.bench_function("compact/10k overwritten twice", |b| {
        b.iter_batched(
            || {
                let db = Db::open_in_memory(options()).expect("open");
                preload(&db, N);
                preload(&db, N);
                db
            },
            |db| db.compact(&Interval::everything()).expect("compact"),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_fill, bench_point_reads, bench_scans, bench_compaction);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{Block, CancelToken, Transaction};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn sample_block() -> Block {
    let mut rng = StdRng::seed_from_u64(42);
    let txs: Vec<Transaction> = (0..10)
        .map(|i| Transaction::transfer(format!("alice-{i}"), "bob", rng.gen_range(1..10)))
        .collect();
    Block::with_timestamp(1, 1_600_000_000, txs, "0")
}

fn bench_pow(c: &mut Criterion) {
    let block = sample_block();

    c.bench_function("mine_sequential_difficulty_3", |b| {
        b.iter(|| {
            let mut mined = block.clone();
            mined.mine(3);
        });
    });

    c.bench_function("mine_parallel_difficulty_3", |b| {
        let cancel = CancelToken::new();
        b.iter(|| {
            let mut mined = block.clone();
            mined.mine_parallel(3, None, &cancel).unwrap();
        });
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);

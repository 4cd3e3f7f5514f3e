//! # B2DB Ledger Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | b2-02 Proof of Work | nonce search per difficulty |
//! | b2-02 Proof of Work | work estimate from a hash |
//! | b2-01 State Machine | commitment check + insert |
//! | b2-03 Ledger | full scan of a pending mempool |

use b2_01_state_machine::{apply_to_space, ApplyMode, StateSpace};
use b2_02_proof_of_work::{estimated_work_for, mine};
use b2_03_ledger::{Ledger, LedgerConfig};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use shared_types::VerifiedInstruction;
use std::time::Duration;

fn file_tx(i: usize) -> VerifiedInstruction {
    VerifiedInstruction::seal(
        format!("INSERT INTO files (name, sha256_hash) VALUES ('file-{i}','abcd')"),
        0,
    )
}

// ============================================================================
// b2-02: Proof of Work
// ============================================================================

fn bench_mine(c: &mut Criterion) {
    let mut group = c.benchmark_group("b2-02-proof-of-work");
    group.measurement_time(Duration::from_secs(10));

    for difficulty in [1u32, 2, 3] {
        group.bench_with_input(
            BenchmarkId::new("mine", difficulty),
            &difficulty,
            |b, &difficulty| {
                let mut i = 0usize;
                b.iter(|| {
                    i += 1;
                    black_box(mine(&format!("INSERT INTO t (n) VALUES ('{i}')"), difficulty))
                })
            },
        );
    }

    let hash = format!("00000{}", "f".repeat(59));
    group.bench_function("estimated_work_for", |b| {
        b.iter(|| black_box(estimated_work_for(black_box(&hash))))
    });

    group.finish();
}

// ============================================================================
// b2-01: State Machine
// ============================================================================

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("b2-01-state-machine");
    let txs: Vec<_> = (0..1_000).map(file_tx).collect();
    group.throughput(Throughput::Elements(txs.len() as u64));

    group.bench_function("apply_1000_inserts", |b| {
        b.iter(|| {
            let mut space = StateSpace::new();
            for tx in &txs {
                let _ = apply_to_space(&mut space, tx, ApplyMode::Commit);
            }
            black_box(space.row_count())
        })
    });

    group.finish();
}

// ============================================================================
// b2-03: Ledger
// ============================================================================

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("b2-03-ledger");

    for pending in [10usize, 100, 500] {
        group.throughput(Throughput::Elements(pending as u64));
        group.bench_with_input(BenchmarkId::new("scan", pending), &pending, |b, &pending| {
            let mut ledger = Ledger::in_memory(LedgerConfig {
                work_threshold: u64::MAX,
                ..LedgerConfig::default()
            })
            .unwrap_or_else(|e| panic!("ledger: {e}"));
            for i in 0..pending {
                let _ = ledger.store_pending(&file_tx(i));
            }
            b.iter(|| black_box(ledger.scan().map(|report| report.accepted.len())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mine, bench_apply, bench_scan);
criterion_main!(benches);

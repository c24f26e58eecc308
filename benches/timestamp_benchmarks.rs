//! Performance benchmarks for log line scanning and timestamp parsing
//! Every poll rescans a peer's full log, so both paths scale with log size

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use peer_latency::logs::first_matching_line;
use peer_latency::timing::{elapsed, Timestamp};
use std::hint::black_box;

const RECEIVED: &str = "14:03:27.512 - Received transaction 123+rebel_ i*on#yjhkssssssssss";
const CONSENSUS: &str = "14:03:27.731 - \u{1b}[1;32mCONSENSUS\u{1b}[0m reached for block 42";

/// Benchmark parsing a single prefixed line
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp_parse");

    group.bench_function("received_line", |b| {
        b.iter(|| black_box(Timestamp::parse(black_box(RECEIVED))))
    });
    group.bench_function("colored_consensus_line", |b| {
        b.iter(|| black_box(Timestamp::parse(black_box(CONSENSUS))))
    });
    group.bench_function("parse_and_difference", |b| {
        b.iter(|| {
            let start = Timestamp::parse(black_box(RECEIVED)).unwrap();
            let stop = Timestamp::parse(black_box(CONSENSUS)).unwrap();
            black_box(elapsed(&start, &stop))
        })
    });

    group.finish();
}

/// Benchmark locating the consensus marker at the end of growing logs
fn bench_marker_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("marker_scan");

    for lines in [100, 1_000, 10_000] {
        let mut log = String::new();
        for i in 0..lines {
            log.push_str(&format!(
                "14:03:{:02}.{:03} - gossip heartbeat from peer_{}\n",
                (i / 1000) % 60,
                i % 1000,
                i % 4 + 1
            ));
        }
        log.push_str(CONSENSUS);

        group.bench_with_input(BenchmarkId::new("first_matching_line", lines), &log, |b, log| {
            b.iter(|| black_box(first_matching_line(black_box(log), "CONSENSUS")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_marker_scan);
criterion_main!(benches);

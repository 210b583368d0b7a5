use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pyre::chess::*;
use std::time::Duration;

#[derive(Clone, Copy)]
struct BenchCase {
    name: &'static str,
    fen: &'static str,
    expected_nodes: &'static [u64],
}

const CASES: &[BenchCase] = &[
    BenchCase {
        name: "startpos",
        fen: STARTPOS_FEN,
        expected_nodes: &[20, 400, 8902],
    },
    BenchCase {
        name: "kiwipete",
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
        expected_nodes: &[48, 2039],
    },
    BenchCase {
        name: "rook_ending",
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        expected_nodes: &[14, 191, 2812],
    },
];

fn perft(board: &mut Board, depth: u32) -> u64 {
    let moves = generate_moves(board, Filter::All);
    if depth <= 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for m in moves {
        board.apply_move(m);
        nodes += perft(board, depth - 1);
        board.retract_move(m);
    }
    nodes
}

fn bench_perft(c: &mut Criterion) {
    pyre::init();

    let mut group = c.benchmark_group("perft");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(4));
    group.sample_size(20);

    for case in CASES {
        for (depth_idx, expected) in case.expected_nodes.iter().enumerate() {
            let depth = (depth_idx + 1) as u32;

            // Correctness guard before measuring.
            let mut board = Board::from_fen(case.fen).expect("benchmark FEN should parse");
            assert_eq!(perft(&mut board, depth), *expected, "{} depth {depth}", case.name);

            group.throughput(Throughput::Elements(*expected));
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{}_d{}", case.name, depth)),
                expected,
                |b, expected| {
                    b.iter(|| {
                        let mut board = Board::from_fen(case.fen).unwrap();
                        let nodes = perft(black_box(&mut board), black_box(depth));
                        assert_eq!(nodes, *expected);
                        black_box(nodes)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(perft_benches, bench_perft);
criterion_main!(perft_benches);

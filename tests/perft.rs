use pyre::chess::*;

/// Bulk-counting perft: at depth one the move count is the node count.
fn perft(board: &mut Board, depth: u32) -> u64 {
    let moves = generate_moves(board, Filter::All);
    if depth <= 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0u64;
    for m in moves {
        board.apply_move(m);
        debug_assert_eq!(board.key(), board.calculate_key());
        nodes += perft(board, depth - 1);
        board.retract_move(m);
    }
    nodes
}

struct Case {
    fen: &'static str,
    expected: &'static [u64],
}

const CASES: &[Case] = &[
    Case {
        fen: STARTPOS_FEN,
        expected: &[20, 400, 8902, 197_281, 4_865_609],
    },
    Case {
        // Kiwipete.
        fen: "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq -",
        expected: &[48, 2039, 97_862, 4_085_603],
    },
    Case {
        // Rook-and-pawn ending rich in en passant and promotion traps.
        fen: "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        expected: &[14, 191, 2812, 43_238, 674_624],
    },
    Case {
        // Sliding-piece tangle with both sides castled out of the question.
        fen: "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        expected: &[46, 2079, 89_890],
    },
];

#[test]
fn perft_matches_reference_counts() {
    for case in CASES {
        let mut board = Board::from_fen(case.fen).unwrap();
        for (i, &expected) in case.expected.iter().enumerate() {
            let depth = (i + 1) as u32;
            let nodes = perft(&mut board, depth);
            assert_eq!(nodes, expected, "{} at depth {depth}", case.fen);
        }
    }
}

#[test]
fn perft_is_deterministic_across_runs() {
    let mut a = Board::from_fen(CASES[1].fen).unwrap();
    let mut b = Board::from_fen(CASES[1].fen).unwrap();
    assert_eq!(perft(&mut a, 3), perft(&mut b, 3));
    assert_eq!(a.key(), b.key());
}

#[test]
fn stalemated_side_has_no_moves() {
    let board = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert_eq!(generate_moves(&board, Filter::All).len(), 0);
}

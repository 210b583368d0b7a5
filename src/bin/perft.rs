use pyre::chess::*;
use std::time::Instant;

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

/// Per-move subtotals at the root, for narrowing down a disagreement.
fn divide(board: &mut Board, depth: u32) -> u64 {
    let mut nodes = 0u64;
    for m in generate_moves(board, Filter::All) {
        board.apply_move(m);
        let subtree = if depth <= 1 { 1 } else { perft(board, depth - 1) };
        board.retract_move(m);
        println!("{}: {subtree}", m.to_uci());
        nodes += subtree;
    }
    nodes
}

fn run_perft(depth: u32, fen: Option<&str>) -> Result<(), &'static str> {
    let start = Instant::now();
    pyre::init();
    let startup = start.elapsed();

    let mut board = match fen {
        Some(fen) => Board::from_fen(fen)?,
        None => Board::startpos(),
    };

    println!("Starting position:\n{board}");
    println!("startup  - {:.3} seconds", startup.as_secs_f64());

    for d in 1..=depth {
        let start = Instant::now();
        let nodes = perft(&mut board, d);
        let elapsed = start.elapsed();
        println!(
            "perft({d}) - {:.3} seconds - {nodes:>10} nodes visited",
            elapsed.as_secs_f64()
        );
    }
    Ok(())
}

fn run_verify(depth: u32, fen: &str, count: u64, line: &str) -> Result<(), &'static str> {
    pyre::init();
    let mut board = Board::from_fen(fen)?;
    let nodes = perft(&mut board, depth);
    println!("{line} {}", if nodes == count { "passed" } else { "failed" });
    Ok(())
}

fn usage() {
    println!("Usage: perft [\"-p\"|\"-d\"|\"-v\"] [depth] {{FEN}} {{count}} <line>");
    println!();
    println!("-p     : run perft from depth 1 up to the given depth");
    println!("-d     : divide mode, per-move subtotals at the given depth");
    println!("-v     : verification mode (for shell script use)");
    println!("depth  : the perft depth (a positive integer)");
    println!("FEN    : a board in Forsyth-Edwards Notation (optional with -p)");
    println!("count  : the node count to verify");
    println!("line   : a label echoed with the verdict");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let depth = args.get(2).and_then(|d| d.parse::<u32>().ok());

    let result = match (args.get(1).map(String::as_str), depth) {
        (Some("-p"), Some(d)) if d > 0 => run_perft(d, args.get(3).map(String::as_str)),
        (Some("-d"), Some(d)) if d > 0 => {
            pyre::init();
            let board = match args.get(3) {
                Some(fen) => Board::from_fen(fen),
                None => Ok(Board::startpos()),
            };
            board.map(|mut b| {
                let nodes = divide(&mut b, d);
                println!("total: {nodes}");
            })
        }
        (Some("-v"), Some(d)) if d > 0 => match (args.get(3), args.get(4)) {
            (Some(fen), Some(count)) => match count.parse::<u64>() {
                Ok(count) => {
                    let line = args.get(5).map(String::as_str).unwrap_or("-");
                    run_verify(d, fen, count, line)
                }
                Err(_) => Err("count must be an integer"),
            },
            _ => {
                usage();
                return;
            }
        },
        _ => {
            usage();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
    }
}

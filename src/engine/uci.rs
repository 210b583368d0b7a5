use crate::chess::*;
use crate::engine::collector::Collector;
use crate::engine::ordering::MoveList;
use crate::engine::rollout;
use crate::engine::search::Controls;
use crate::engine::transposition::TransTable;
use std::str::SplitWhitespace;

#[macro_export]
macro_rules! send {
    ($($arg:tt)*) => {{
        use std::io::{self, Write};
        println!($($arg)*);
        io::stdout().flush().unwrap();
    }};
}

const DEFAULT_MOVETIME_MS: i64 = 5000;

pub struct Uci {
    board: Board,
    ctl: Controls,
    tt: TransTable,
    gc: Collector,
}

impl Default for Uci {
    fn default() -> Self {
        Uci::new()
    }
}

impl Uci {
    pub fn new() -> Uci {
        Uci {
            board: Board::startpos(),
            ctl: Controls::new(),
            tt: TransTable::new(),
            gc: Collector::new(),
        }
    }

    /// Returns true on `quit`.
    fn execute_command(&mut self, tokens: &mut SplitWhitespace) -> bool {
        match tokens.next() {
            Some("uci") => {
                send!("id name Pyre");
                send!("id author the Pyre authors");
                send!("uciok");
            }
            Some("isready") => send!("readyok"),
            Some("ucinewgame") => {
                self.gc.reset();
                self.board = Board::startpos();
                self.tt.reset();
                self.ctl.clear_history();
            }
            Some("position") => {
                if let Err(e) = self.handle_position(tokens) {
                    eprintln!("position error: {e}");
                }
            }
            Some("go") => self.handle_go(tokens),
            Some("stop") | Some("ponderhit") => {}
            Some("board") => send!("{}", self.board),
            Some("quit") => return true,
            None => {}
            Some(cmd) => eprintln!("unknown command: {cmd}"),
        }
        false
    }

    fn handle_position(&mut self, tokens: &mut SplitWhitespace) -> Result<(), &'static str> {
        match tokens.next() {
            Some("startpos") => {
                self.board = Board::startpos();
            }
            Some("fen") => {
                let fen: String = tokens
                    .by_ref()
                    .take_while(|&t| t != "moves")
                    .collect::<Vec<&str>>()
                    .join(" ");
                self.board = Board::from_fen(&fen)?;
                self.apply_move_tokens(tokens);
                return Ok(());
            }
            _ => return Err("expected startpos or fen"),
        }

        if tokens.next() == Some("moves") {
            self.apply_move_tokens(tokens);
        }
        Ok(())
    }

    /// Applies each listed move by matching it against the generated legal
    /// moves; unknown or illegal tokens are skipped.
    fn apply_move_tokens(&mut self, tokens: &mut SplitWhitespace) {
        for token in tokens {
            let Some(&m) = MoveList::all(&self.board)
                .iter()
                .find(|m| m.to_uci() == token)
            else {
                continue;
            };
            self.board.apply_move(m);
        }
    }

    fn handle_go(&mut self, tokens: &mut SplitWhitespace) {
        let mut time = DEFAULT_MOVETIME_MS;
        match tokens.next() {
            Some("movetime") => {
                if let Some(ms) = tokens.next().and_then(|t| t.parse::<i64>().ok()) {
                    time = ms;
                }
            }
            // Nothing is truly infinite; think for the default budget.
            Some("infinite") | None => {}
            Some(arg) => eprintln!("unknown go argument: {arg}"),
        }

        if MoveList::all(&self.board).is_empty() {
            send!("bestmove 0000");
            return;
        }

        let mut best =
            rollout::search(&self.board, &mut self.gc, &mut self.ctl, &mut self.tt, time);
        if best == NULL_MOVE {
            // Ran out of time before depth one converged; any legal move
            // beats forfeiting.
            best = MoveList::all(&self.board).as_slice()[0];
        }

        send!("info depth {} nodes {}", self.ctl.max_depth - 1, self.gc.total());
        self.board.apply_move(best);
        send!("bestmove {}", best.to_uci());
    }

    pub fn run(&mut self) {
        let stdin = std::io::stdin();
        let mut input = String::new();
        loop {
            input.clear();
            if stdin.read_line(&mut input).is_err() || input.is_empty() {
                break;
            }
            if self.execute_command(&mut input.split_whitespace()) {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_startpos_with_moves() {
        let mut uci = Uci::new();
        let mut tokens = "startpos moves e2e4 e7e5".split_whitespace();
        uci.handle_position(&mut tokens).unwrap();
        // Pawns stand on e4 and e5, White to move, all rights intact, and
        // the en-passant square is the jumped black pawn's square.
        assert_eq!(uci.board.piece_on(27), Piece::Pawn); // e4
        assert_eq!(uci.board.piece_on(35), Piece::Pawn); // e5
        assert_eq!(uci.board.current_player(), Color::White);
        assert_eq!(uci.board.state().castling_rights, Castling::ALL);
        assert_eq!(square_name(uci.board.ep_square()), "e5");
    }

    #[test]
    fn illegal_moves_are_skipped() {
        let mut uci = Uci::new();
        let mut tokens = "startpos moves e2e5 e2e4".split_whitespace();
        uci.handle_position(&mut tokens).unwrap();
        // e2e5 is not legal and must be ignored; e2e4 still applies.
        assert_eq!(uci.board.piece_on(27), Piece::Pawn);
        assert_eq!(uci.board.current_player(), Color::Black);
    }

    #[test]
    fn position_fen_round_trips() {
        let mut uci = Uci::new();
        let mut tokens = "fen r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1 moves e1g1"
            .split_whitespace();
        uci.handle_position(&mut tokens).unwrap();
        // After castling, White's rights are gone and Black's remain.
        assert_eq!(
            uci.board.state().castling_rights,
            Castling::BK | Castling::BQ
        );
        assert_eq!(uci.board.piece_on(1), Piece::King);
        assert_eq!(uci.board.piece_on(2), Piece::Rook);
    }
}

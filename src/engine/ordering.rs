use crate::chess::*;
use crate::engine::search::Controls;

/// MVV-LVA weights indexed `[victim][attacker]`, piece order pawn, rook,
/// knight, bishop, queen, king, none. Bigger victims dominate; within a
/// victim the cheapest attacker scores highest.
const VAL: [[u8; 7]; 7] = [
    [5, 3, 4, 4, 2, 1, 0],       // victim pawn
    [25, 23, 24, 24, 22, 21, 0], // victim rook
    [15, 13, 14, 14, 12, 11, 0], // victim knight
    [15, 13, 14, 14, 12, 11, 0], // victim bishop
    [35, 33, 34, 34, 32, 31, 0], // victim queen
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
];

#[inline(always)]
fn attack_score(board: &Board, m: Move) -> u8 {
    VAL[board.piece_on(m.destination()) as usize][board.piece_on(m.origin()) as usize]
}

// Insertion sorts: the lists are short and mostly ordered already.

fn sort_attacks(board: &Board, moves: &mut [Move]) {
    for i in 1..moves.len() {
        let t = moves[i];
        let score = attack_score(board, t);
        let mut j = i;
        while j > 0 && attack_score(board, moves[j - 1]) < score {
            moves[j] = moves[j - 1];
            j -= 1;
        }
        moves[j] = t;
    }
}

fn sort_quiets(board: &Board, moves: &mut [Move], ctl: &Controls) {
    let us = board.current_player();
    for i in 1..moves.len() {
        let t = moves[i];
        let score = ctl.history(us, t.origin(), t.destination());
        let mut j = i;
        while j > 0
            && ctl.history(us, moves[j - 1].origin(), moves[j - 1].destination()) < score
        {
            moves[j] = moves[j - 1];
            j -= 1;
        }
        moves[j] = t;
    }
}

/// Rotates up to two killers to the front of the quiet segment, keeping
/// their original relative order. Returns how many were lifted.
fn lift_killers(moves: &mut [Move], ctl: &Controls, d: usize) -> usize {
    let limit = moves.len().min(2);
    let mut front = 0;
    for k in 0..moves.len() {
        if front >= limit {
            break;
        }
        if ctl.is_killer(d, moves[k]) {
            moves[front..=k].rotate_right(1);
            front += 1;
        }
    }
    front
}

fn lift_pv_move(moves: &mut [Move], pv: Move) {
    if let Some(pos) = moves.iter().position(|&m| m == pv) {
        moves[..=pos].rotate_right(1);
    }
}

/// A sorted list of legal moves. Construction generates and orders in one
/// step; the ordering depends on the search context.
pub struct MoveList {
    moves: MoveVec,
}

impl MoveList {
    /// Full list for the main search: MVV-LVA attacks, then killers, then
    /// history-sorted quiets, with the PV hint lifted to the very front.
    pub fn for_search(board: &Board, ctl: &Controls, d: usize) -> MoveList {
        let mut moves = generate_moves(board, Filter::Aggressive);
        sort_attacks(board, &mut moves);

        let quiet_base = moves.len();
        moves.extend(generate_moves(board, Filter::Passive));

        {
            let slice: &mut [Move] = &mut moves;
            let lifted = lift_killers(&mut slice[quiet_base..], ctl, d);
            sort_quiets(board, &mut slice[quiet_base + lifted..], ctl);
            if ctl.pv_move != NULL_MOVE {
                lift_pv_move(slice, ctl.pv_move);
            }
        }
        MoveList { moves }
    }

    /// Captures only, MVV-LVA sorted, for quiescence.
    pub fn for_quiescence(board: &Board) -> MoveList {
        let mut moves = generate_moves(board, Filter::Aggressive);
        sort_attacks(board, &mut moves);
        MoveList { moves }
    }

    /// Every legal move, unsorted, for tree expansion and input matching.
    pub fn all(board: &Board) -> MoveList {
        MoveList {
            moves: generate_moves(board, Filter::All),
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[inline(always)]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.moves.iter()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn biggest_victim_comes_first() {
        // White pawn on b6 can take the rook on a7 or the knight on c7.
        let b = Board::from_fen("k7/r1n5/1P6/8/8/8/8/7K w - - 0 1").unwrap();
        let list = MoveList::for_quiescence(&b);
        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].to_uci(), "b6a7");
        assert_eq!(list.as_slice()[1].to_uci(), "b6c7");
    }

    #[test]
    fn cheapest_attacker_breaks_ties() {
        // Queen on d4 and pawn on c4 both attack the rook on d5.
        let b = Board::from_fen("k7/8/8/3r4/2PQ4/8/8/7K w - - 0 1").unwrap();
        let list = MoveList::for_quiescence(&b);
        let captures: Vec<String> =
            list.iter().filter(|m| m.destination() == 36).map(|m| m.to_uci()).collect();
        assert_eq!(captures, vec!["c4d5".to_string(), "d4d5".to_string()]);
    }

    #[test]
    fn killers_lead_the_quiets_and_pv_leads_everything() {
        let b = Board::startpos();
        let mut ctl = Controls::new();
        let killer = Move::make_typed(MoveType::PawnJump, 10, 26); // f2f4
        let pv = Move::make_typed(MoveType::PawnJump, 12, 28); // d2d4
        ctl.add_killer(0, killer);
        ctl.pv_move = pv;
        let list = MoveList::for_search(&b, &ctl, 0);
        assert_eq!(list.as_slice()[0], pv);
        // The killer was generated as a quiet; with no captures available it
        // sits right behind the PV move.
        assert_eq!(list.as_slice()[1].to_uci(), "f2f4");
    }

    #[test]
    fn history_orders_the_remaining_quiets() {
        let b = Board::startpos();
        let mut ctl = Controls::new();
        // Bump history for a2a3 hard.
        for _ in 0..10 {
            ctl.update_history(Color::White, 15, 23, 9);
        }
        let list = MoveList::for_search(&b, &ctl, 0);
        assert_eq!(list.as_slice()[0].to_uci(), "a2a3");
    }
}

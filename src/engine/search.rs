use crate::chess::*;
use crate::engine::evaluation::*;
use crate::engine::ordering::MoveList;
use crate::engine::transposition::{Bound, TransTable};
use std::time::Instant;

/// Hard ceiling on iterative-deepening depth.
pub const MAX_PLY: usize = 65;

/// Depth reduction for null-move searches.
const NULL_R: i32 = 2;
/// Reverse futility maximum remaining depth.
const RFP_RD: i32 = 5;
/// Null-move pruning minimum remaining depth.
const NMP_RD: i32 = 2;
/// Razoring maximum remaining depth.
const RAZ_RD: i32 = 2;
/// Internal iterative deepening minimum remaining depth and reduction.
pub(crate) const IID_RD: i32 = 4;
pub(crate) const IID_R: i32 = 3;
/// Late move pruning maximum remaining depth and margins by depth.
const LMP_RD: i32 = 5;
const LMP_MARGINS: [i32; 6] = [0, 8, 13, 17, 21, 25];
/// Futility pruning maximum remaining depth.
const FUT_RD: i32 = 8;
/// Late move reductions minimum remaining depth.
pub(crate) const LMR_RD: i32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeKind {
    Root,
    Iid,
    Pv,
    NonPv,
}

/// Search controls and ordering tables shared by every search flavor.
pub struct Controls {
    pub epoch: Instant,
    pub time: i64,
    history: Box<[[[u64; 64]; 64]; 2]>,
    pub evals: [i32; MAX_PLY],
    pub nodes: u64,
    pub max_depth: i32,
    pub null_ply: i32,
    pub q_ply: i32,
    killers: [[Move; 2]; MAX_PLY],
    pub pv_move: Move,
    pub best_move: Move,
    pub iid_moves: [Move; MAX_PLY],
}

impl Default for Controls {
    fn default() -> Self {
        Controls::new()
    }
}

impl Controls {
    pub fn new() -> Controls {
        Controls {
            epoch: Instant::now(),
            time: 0,
            history: Box::new([[[0; 64]; 64]; 2]),
            evals: [0; MAX_PLY],
            nodes: 0,
            max_depth: 0,
            null_ply: 0,
            q_ply: MAX_PLY as i32,
            killers: [[NULL_MOVE; 2]; MAX_PLY],
            pv_move: NULL_MOVE,
            best_move: NULL_MOVE,
            iid_moves: [NULL_MOVE; MAX_PLY],
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> i64 {
        self.epoch.elapsed().as_millis() as i64
    }

    #[inline(always)]
    pub fn abort(&self) -> bool {
        self.elapsed() >= self.time
    }

    pub fn clear_history(&mut self) {
        self.history = Box::new([[[0; 64]; 64]; 2]);
        self.killers = [[NULL_MOVE; 2]; MAX_PLY];
        self.iid_moves = [NULL_MOVE; MAX_PLY];
    }

    /// Halves every history entry. Keeping half preserves the ordering
    /// signal across iterations while making room for fresh bonuses.
    pub fn age_history(&mut self) {
        for color in self.history.iter_mut() {
            for from in color.iter_mut() {
                for entry in from.iter_mut() {
                    *entry >>= 1;
                }
            }
        }
    }

    #[inline(always)]
    pub fn history(&self, color: Color, from: Square, to: Square) -> u64 {
        self.history[color as usize][from as usize][to as usize]
    }

    /// Quiet move caused a beta cut: big quadratic bonus.
    pub fn update_history(&mut self, color: Color, from: Square, to: Square, r: i32) {
        let e = &mut self.history[color as usize][from as usize][to as usize];
        *e += (r * r) as u64;
        if *e >= u32::MAX as u64 {
            self.age_history();
        }
    }

    /// Quiet move merely raised alpha: small linear bonus.
    pub fn raise_history(&mut self, color: Color, from: Square, to: Square, r: i32) {
        let e = &mut self.history[color as usize][from as usize][to as usize];
        *e += r as u64;
        if *e >= u32::MAX as u64 {
            self.age_history();
        }
    }

    pub fn add_killer(&mut self, d: usize, m: Move) {
        if d >= MAX_PLY || self.killers[d][0] == m {
            return;
        }
        self.killers[d][1] = self.killers[d][0];
        self.killers[d][0] = m;
    }

    #[inline(always)]
    pub fn is_killer(&self, d: usize, m: Move) -> bool {
        d < MAX_PLY && (self.killers[d][0] == m || self.killers[d][1] == m)
    }
}

/// Classical depth-first alpha-beta, fail-soft, with principal variation
/// search and the usual pruning battery: reverse futility, null move,
/// razoring, futility, late move pruning and reductions, and internal
/// iterative deepening. Evaluates with quiescence at the horizon.
pub fn alpha_beta(
    board: &mut Board,
    nt: NodeKind,
    do_null: bool,
    d: i32,
    r: i32,
    mut a: i32,
    mut o: i32,
    ctl: &mut Controls,
    tt: &mut TransTable,
) -> i32 {
    let el = ctl.elapsed();
    if el >= ctl.time {
        return 0;
    }

    ctl.nodes += 1;

    if nt != NodeKind::Root && (!is_mate_possible(board) || repeating(board)) {
        return contempt(board);
    }

    if r <= 0 {
        return quiescence(board, d, r, a, o, ctl);
    }

    let oa = a;
    let mut tt_move = NULL_MOVE;
    let key = board.key();

    if let Some(entry) = tt.retrieve(key, el) {
        if entry.mv != NULL_MOVE {
            if entry.depth as i32 >= r && nt != NodeKind::Root && nt != NodeKind::Iid {
                let mut score = entry.value;
                if score <= -MATE_VALUE {
                    score += d;
                } else if score >= MATE_VALUE {
                    score -= d;
                }
                match entry.bound {
                    Bound::Exact => return score,
                    Bound::Lower => a = a.max(score),
                    Bound::Upper => o = o.min(score),
                    Bound::Undef => {}
                }
                if a >= o {
                    return score;
                }
            }
            tt_move = entry.mv;
        }
    }

    let pv_node = nt != NodeKind::NonPv;
    let in_check = side_in_check(board);

    let ev = if in_check { -mate_eval(d) } else { eval(board) };
    ctl.evals[d as usize] = ev;
    let improving = d > 2 && ev > ctl.evals[(d - 2) as usize];

    // Reverse futility: the static eval clears beta by a wide margin at low
    // depth, so one of the moves almost certainly fails high.
    let rf_margin = 50 + 100 * (r + improving as i32);
    if !in_check && !pv_node && r <= RFP_RD && o.abs() < MIN_MATE && ev - rf_margin >= o {
        return o;
    }

    // Null move: hand the opponent a free shot; if the reduced search still
    // fails high this node is too good to be on the optimal line.
    if do_null
        && !in_check
        && !pv_node
        && r >= NMP_RD
        && d > ctl.null_ply
        && board.has_major_minor(board.current_player())
    {
        board.apply_null_move();
        let nms = -alpha_beta(board, NodeKind::NonPv, false, d + 1, r - 1 - NULL_R, -o, -o + 1, ctl, tt);
        board.retract_null_move();
        if nms >= o && nms.abs() < MIN_MATE {
            return o;
        }
    }

    // Razoring: hopeless static eval at low depth; if quiescence cannot get
    // close to alpha either, give up on the node.
    let r_margin = r * 300;
    if !in_check && !pv_node && r <= RAZ_RD && ev + r_margin < a {
        let rs = quiescence(board, d, 0, a - 1, a, ctl);
        if rs + r_margin < a {
            return a;
        }
    }

    let f_margin = 100 + (r - 1) * 70;
    let futile =
        r <= FUT_RD && !pv_node && a.abs() < MIN_MATE && o.abs() < MIN_MATE && ev + f_margin < a;

    // Internal iterative deepening for a PV hint when the table has none.
    if r >= IID_RD && pv_node && tt_move == NULL_MOVE {
        ctl.iid_moves[d as usize] = NULL_MOVE;
        alpha_beta(board, NodeKind::Iid, true, d, r - IID_R, a, o, ctl, tt);
        tt_move = ctl.iid_moves[d as usize];
    }

    ctl.pv_move = tt_move;
    let child_nt = if pv_node { NodeKind::Pv } else { NodeKind::NonPv };

    let ml = MoveList::for_search(board, ctl, d as usize);
    if ml.is_empty() {
        return if in_check { -mate_eval(d) } else { 0 };
    }

    let mut high_score = i32::MIN;
    let mut high_move = NULL_MOVE;

    'moves: for (i, &m) in ml.iter().enumerate() {
        board.apply_move(m);

        let give_check = side_in_check(board);
        let is_attack = board.has_attack();
        let concern = is_attack
            || in_check
            || m.is_promotion()
            || give_check
            || ctl.is_killer(d as usize, m);

        let score = 'score: {
            if i == 0 {
                break 'score -alpha_beta(board, child_nt, true, d + 1, r - 1, -o, -a, ctl, tt);
            }

            // Late move pruning: the ordering thinks little of this quiet
            // move and the depth is shallow.
            if r <= LMP_RD && !pv_node && !concern && i as i32 > LMP_MARGINS[r as usize] {
                board.retract_move(m);
                continue 'moves;
            }

            if futile && !concern {
                board.retract_move(m);
                continue 'moves;
            }

            // Late move reductions, with a re-search at full depth when the
            // reduced probe raises alpha after all.
            let mut reduced = false;
            if !concern && r >= LMR_RD {
                let red = if pv_node {
                    1 + i as i32 / 12
                } else {
                    (r / 4).max(2) + i as i32 / 12
                };
                reduced = true;
                let sc =
                    -alpha_beta(board, NodeKind::NonPv, true, d + 1, r - 1 - red, -a - 1, -a, ctl, tt);
                if sc <= a {
                    break 'score sc;
                }
            }

            let sc = -alpha_beta(board, NodeKind::NonPv, true, d + 1, r - 1, -a - 1, -a, ctl, tt);

            if sc > a && (reduced || nt == NodeKind::Root || sc < o) {
                break 'score -alpha_beta(board, child_nt, true, d + 1, r - 1, -o, -a, ctl, tt);
            }
            sc
        };

        board.retract_move(m);

        if score <= high_score {
            continue;
        }
        high_score = score;
        if nt == NodeKind::Iid {
            ctl.iid_moves[d as usize] = m;
        }
        if nt == NodeKind::Root {
            ctl.best_move = m;
        }
        high_move = m;

        if score <= a {
            continue;
        }

        if score >= o {
            if is_attack {
                break;
            }
            let us = board.current_player();
            ctl.update_history(us, m.origin(), m.destination(), r);
            ctl.add_killer(d as usize, m);
            break;
        }

        if !is_attack {
            let us = board.current_player();
            ctl.raise_history(us, m.origin(), m.destination(), r);
        }

        a = score;
    }

    tt.store(
        key,
        high_score,
        if high_score <= oa {
            Bound::Upper
        } else if high_score >= o {
            Bound::Lower
        } else {
            Bound::Exact
        },
        r as u8,
        high_move,
        ctl.elapsed(),
    );

    high_score
}

/// Fail-hard quiescence search. Evades checks with the full move list and
/// otherwise stands pat, trying captures only.
pub fn quiescence(
    board: &mut Board,
    d: i32,
    r: i32,
    mut a: i32,
    o: i32,
    ctl: &mut Controls,
) -> i32 {
    if ctl.abort() {
        return 0;
    }

    ctl.nodes += 1;

    if !is_mate_possible(board) || repeating(board) {
        return 0;
    }

    if side_in_check(board) {
        // Check evasion: every legal move, not just captures.
        ctl.pv_move = NULL_MOVE;
        let ml = MoveList::for_search(board, ctl, d as usize);
        if ml.is_empty() {
            return -mate_eval(d);
        }
        for &m in ml.iter() {
            board.apply_move(m);
            let score = -quiescence(board, d + 1, r - 1, -o, -a, ctl);
            board.retract_move(m);
            if score >= o {
                return o;
            }
            if score > a {
                a = score;
            }
        }
        return a;
    }

    if r <= -ctl.q_ply {
        return eval(board);
    }

    let sp = eval(board);
    if sp >= o {
        return o;
    }
    if a < sp {
        a = sp;
    }

    ctl.pv_move = NULL_MOVE;
    let ml = MoveList::for_quiescence(board);
    for &m in ml.iter() {
        board.apply_move(m);
        let score = -quiescence(board, d + 1, r - 1, -o, -a, ctl);
        board.retract_move(m);
        if score >= o {
            return o;
        }
        if score > a {
            a = score;
        }
    }

    a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh(time: i64) -> (Controls, TransTable) {
        let mut ctl = Controls::new();
        ctl.epoch = Instant::now();
        ctl.time = time;
        ctl.q_ply = MAX_PLY as i32;
        (ctl, TransTable::new())
    }

    #[test]
    fn stalemate_is_a_draw_for_the_search() {
        let mut b = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let (mut ctl, _) = fresh(1000);
        // Not in check, no captures: stand-pat path with a losing eval for
        // the bare king, clamped by the window.
        let score = quiescence(&mut b, 0, 0, -50, 50, &mut ctl);
        assert_eq!(score, -50);
        // The search proper reports stalemate as a draw.
        let (mut ctl, mut tt) = fresh(1000);
        let score = alpha_beta(
            &mut b,
            NodeKind::Root,
            true,
            0,
            3,
            -MATE_VALUE,
            MATE_VALUE,
            &mut ctl,
            &mut tt,
        );
        assert_eq!(score, 0);
    }

    #[test]
    fn checkmate_is_scored_as_mate() {
        // Back-rank mate already delivered; Black to move and mated.
        let mut b = Board::from_fen("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1").unwrap();
        let (mut ctl, mut tt) = fresh(1000);
        let score = alpha_beta(
            &mut b,
            NodeKind::Root,
            true,
            0,
            2,
            -MATE_VALUE,
            MATE_VALUE,
            &mut ctl,
            &mut tt,
        );
        assert_eq!(score, -mate_eval(0));
    }

    #[test]
    fn finds_mate_in_one() {
        let mut b = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1").unwrap();
        let (mut ctl, mut tt) = fresh(5000);
        let score = alpha_beta(
            &mut b,
            NodeKind::Root,
            true,
            0,
            3,
            -MATE_VALUE,
            MATE_VALUE,
            &mut ctl,
            &mut tt,
        );
        assert_eq!(ctl.best_move.to_uci(), "a1a8");
        assert_eq!(score, mate_eval(1));
    }

    #[test]
    fn evading_quiescence_sees_the_mate() {
        // Back-rank mate already on the board; the evasion list is empty.
        let mut b = Board::from_fen("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1").unwrap();
        let (mut ctl, _) = fresh(1000);
        let score = quiescence(&mut b, 0, 0, -MATE_VALUE, MATE_VALUE, &mut ctl);
        assert_eq!(score, -mate_eval(0));
    }
}

//! Rollout-driven principal variation search.
//!
//! Candidate PV lines are walked in depth-limited rollouts over an in-memory
//! tree; everything off the PV is verified with the backtracking search and
//! a null window, and only re-searched by rollout on a fail-high. Bounds
//! back-propagate after every rollout in the minimax fashion.

use crate::chess::*;
use crate::engine::collector::Collector;
use crate::engine::evaluation::*;
use crate::engine::ordering::MoveList;
use crate::engine::search::*;
use crate::engine::transposition::{Bound, TransTable};
use crate::send;
use std::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Terminal {
    Not,
    Draw,
    Win,
}

/// One node of the search tree. Children occupy a contiguous index range in
/// the arena, in move-ordering order; the parent link is an index, never an
/// owner.
pub struct Node {
    pub parent: Option<u32>,
    pub first_child: u32,
    pub child_count: u32,
    pub pv_child: Option<u32>,
    /// Local window, tightened by the parent on every selection.
    pub alpha: i32,
    pub beta: i32,
    /// Lower and upper bounds on the true minimax value of this subtree.
    pub vminus: i32,
    pub vplus: i32,
    /// Minimax value over visited children; `i32::MIN` while unvisited.
    pub score: i32,
    pub mv: Move,
    pub terminal: Terminal,
    pub re_search: bool,
}

impl Node {
    fn new(parent: Option<u32>, mv: Move, terminal: Terminal) -> Node {
        Node {
            parent,
            first_child: 0,
            child_count: 0,
            pv_child: None,
            alpha: -i32::MAX,
            beta: i32::MAX,
            vminus: -i32::MAX,
            vplus: i32::MAX,
            score: i32::MIN,
            mv,
            terminal,
            re_search: false,
        }
    }
}

/// Arena for one iteration's tree. Node 0 is the root; a whole tree is
/// retired to the collector when its iteration converges.
pub struct Tree {
    pub nodes: Vec<Node>,
}

pub const ROOT: u32 = 0;

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Tree {
    pub fn new() -> Tree {
        Tree {
            nodes: vec![Node::new(None, NULL_MOVE, Terminal::Not)],
        }
    }

    fn alloc(&mut self, gc: &mut Collector, parent: u32, mv: Move, terminal: Terminal) -> u32 {
        gc.on_alloc();
        let idx = self.nodes.len() as u32;
        self.nodes.push(Node::new(Some(parent), mv, terminal));
        idx
    }

    #[inline(always)]
    fn set_score(&mut self, n: u32, score: i32) {
        let node = &mut self.nodes[n as usize];
        node.score = score;
        node.vminus = score;
        node.vplus = score;
    }

    #[inline(always)]
    pub fn converged(&self, n: u32) -> bool {
        let node = &self.nodes[n as usize];
        node.vminus >= node.vplus
    }

    #[inline(always)]
    pub fn pv_move(&self, n: u32) -> Move {
        match self.nodes[n as usize].pv_child {
            Some(c) => self.nodes[c as usize].mv,
            None => NULL_MOVE,
        }
    }
}

/// Expands a node into one child per legal move, classifying each child as
/// terminal where the reply position settles it. Returns false when the
/// node cap is hit; the node is then evaluated by backtracking instead.
fn expand(
    board: &mut Board,
    tree: &mut Tree,
    node: u32,
    d: i32,
    r: i32,
    gc: &mut Collector,
    ctl: &mut Controls,
    tt: &mut TransTable,
) -> bool {
    if gc.max_nodes_exceeded() {
        let (a, o) = {
            let n = &tree.nodes[node as usize];
            (n.alpha, n.beta)
        };
        let value = alpha_beta(board, NodeKind::Pv, true, d, r, a, o, ctl, tt);
        tree.set_score(node, value);
        return false;
    }

    let ml = MoveList::for_search(board, ctl, d as usize);
    let first = tree.nodes.len() as u32;

    for &m in ml.iter() {
        board.apply_move(m);
        let in_check = side_in_check(board);
        let replies = MoveList::all(board);
        let terminal = if replies.is_empty() {
            if in_check {
                Terminal::Win
            } else {
                Terminal::Draw
            }
        } else if !is_mate_possible(board) || repeating(board) {
            Terminal::Draw
        } else {
            Terminal::Not
        };
        tree.alloc(gc, node, m, terminal);
        board.retract_move(m);
    }

    let n = &mut tree.nodes[node as usize];
    n.first_child = first;
    n.child_count = ml.len() as u32;
    true
}

/// Leftmost-greedy tree policy. Children keep the move ordering's order;
/// the first `2r` of them are taken leftmost (as the classical search
/// would), after which the child with the best minimax value so far wins.
/// Children whose windows have collapsed are skipped outright.
fn select(tree: &mut Tree, node: u32, r: i32) -> Option<(u32, usize)> {
    let (parent_alpha, parent_beta, first, count, is_root) = {
        let n = &tree.nodes[node as usize];
        (n.alpha, n.beta, n.first_child, n.child_count, n.parent.is_none())
    };
    let margin = (r as usize) << 1;

    let mut choice = None;
    let mut max_score = i32::MIN;
    let mut i = 0usize;

    for ci in 0..count {
        let idx = first + ci;
        let child = &mut tree.nodes[idx as usize];
        child.alpha = (-parent_beta).max(child.vminus);
        child.beta = (-parent_alpha).min(child.vplus);
        if child.alpha >= child.beta {
            i += 1;
            continue;
        }

        if is_root || i < margin || child.score == i32::MIN {
            return Some((idx, i));
        }

        let l = -child.score;
        if l > max_score {
            max_score = l;
            choice = Some(idx);
        }
        i += 1;
    }

    choice.map(|c| (c, i))
}

/// Null-window verification of a non-first child via backtracking, with a
/// conservative late-move reduction. Returns true when the child surprised
/// us and must be re-searched by rollout; otherwise its bounds collapse to
/// the verified score. Expects the child's move to be already applied.
#[allow(clippy::too_many_arguments)]
fn non_pv_verify(
    board: &mut Board,
    tree: &mut Tree,
    node: u32,
    child: u32,
    in_check: bool,
    d: i32,
    r: i32,
    i: usize,
    ctl: &mut Controls,
    tt: &mut TransTable,
) -> bool {
    let give_check = side_in_check(board);
    let mv = tree.nodes[child as usize].mv;
    let concern = board.has_attack()
        || in_check
        || mv.is_promotion()
        || give_check
        || ctl.is_killer(d as usize, mv);

    let (parent_alpha, parent_beta) = {
        let n = &tree.nodes[node as usize];
        (n.alpha, n.beta)
    };

    let mut reduced = false;
    if r >= LMR_RD && !concern {
        // PV parent: reduce gently.
        let red = 1 + i as i32 / 12;
        reduced = true;
        let sc = -alpha_beta(
            board,
            NodeKind::NonPv,
            true,
            d + 1,
            r - 1 - red,
            -parent_alpha - 1,
            -parent_alpha,
            ctl,
            tt,
        );
        if sc <= parent_alpha {
            tree.set_score(child, -sc);
            return false;
        }
    }

    let sc = -alpha_beta(
        board,
        NodeKind::NonPv,
        true,
        d + 1,
        r - 1,
        -parent_alpha - 1,
        -parent_alpha,
        ctl,
        tt,
    );

    if sc > parent_alpha && (reduced || d == 0 || sc < parent_beta) {
        tree.nodes[child as usize].re_search = true;
        return true;
    }

    tree.set_score(child, -sc);
    false
}

/// Recomputes this node's bounds, score and PV child from its children,
/// ignoring the scores of unvisited ones.
fn backprop(tree: &mut Tree, node: u32) {
    let (first, count) = {
        let n = &tree.nodes[node as usize];
        (n.first_child, n.child_count)
    };

    let mut max_vminus = -i32::MAX;
    let mut max_vplus = -i32::MAX;
    let mut max_score = -i32::MAX;
    let mut pv_child = None;

    for ci in 0..count {
        let c = &tree.nodes[(first + ci) as usize];
        max_vminus = max_vminus.max(-c.vplus);
        max_vplus = max_vplus.max(-c.vminus);
        if c.score != i32::MIN && -c.score > max_score {
            max_score = -c.score;
            pv_child = Some(first + ci);
        }
    }

    let n = &mut tree.nodes[node as usize];
    n.vminus = max_vminus;
    n.vplus = max_vplus;
    n.score = max_score;
    n.pv_child = pv_child;
}

/// One rollout: walk down the tree choosing one child per level, descend by
/// rollout on the PV edge (or a verified fail-high), and back-propagate on
/// the way out. Converged nodes are cached in the transposition table.
#[allow(clippy::too_many_arguments)]
fn rollout(
    board: &mut Board,
    tree: &mut Tree,
    node: u32,
    d: i32,
    r: i32,
    gc: &mut Collector,
    ctl: &mut Controls,
    tt: &mut TransTable,
) {
    let el = ctl.elapsed();
    if el >= ctl.time {
        return;
    }

    match tree.nodes[node as usize].terminal {
        Terminal::Win => {
            tree.set_score(node, -mate_eval(d));
            return;
        }
        Terminal::Draw => {
            let score = contempt(board);
            tree.set_score(node, score);
            return;
        }
        Terminal::Not => {}
    }

    // At the horizon, quiescence is the simulation step.
    if r <= 0 {
        let (a, o) = {
            let n = &tree.nodes[node as usize];
            (n.alpha, n.beta)
        };
        let qs = quiescence(board, 0, 0, a, o, ctl);
        tree.set_score(node, qs);
        return;
    }

    let (mut alpha, mut beta) = {
        let n = &tree.nodes[node as usize];
        (n.alpha, n.beta)
    };
    let oa = alpha;

    ctl.pv_move = NULL_MOVE;
    let key = board.key();

    if let Some(entry) = tt.retrieve(key, el) {
        if entry.mv != NULL_MOVE {
            if entry.depth as i32 >= r && tree.nodes[node as usize].parent.is_some() {
                let mut score = entry.value;
                if score <= -MATE_VALUE {
                    score += d;
                } else if score >= MATE_VALUE {
                    score -= d;
                }
                match entry.bound {
                    Bound::Exact => {
                        tree.set_score(node, score);
                        return;
                    }
                    Bound::Lower => alpha = alpha.max(score),
                    Bound::Upper => beta = beta.min(score),
                    Bound::Undef => {}
                }
                if alpha >= beta {
                    tree.set_score(node, score);
                    return;
                }
            }
            ctl.pv_move = entry.mv;
        }
    }

    let in_check = side_in_check(board);

    if tree.nodes[node as usize].child_count == 0 {
        // No PV hint in the table: run a shallow backtracking search for one
        // before paying for an expansion.
        if ctl.pv_move == NULL_MOVE && r >= IID_RD {
            let (a, o) = {
                let n = &tree.nodes[node as usize];
                (n.alpha, n.beta)
            };
            ctl.iid_moves[d as usize] = NULL_MOVE;
            alpha_beta(board, NodeKind::Iid, true, d, r - IID_R, a, o, ctl, tt);
            ctl.pv_move = ctl.iid_moves[d as usize];
        }

        if !expand(board, tree, node, d, r, gc, ctl, tt) {
            return;
        }
    }

    let Some((child, idx)) = select(tree, node, r) else {
        debug_assert!(false, "selection found no viable child");
        return;
    };

    let mv = tree.nodes[child as usize].mv;
    board.apply_move(mv);

    if tree.nodes[child as usize].re_search
        || idx == 0
        || non_pv_verify(board, tree, node, child, in_check, d, r, idx, ctl, tt)
    {
        rollout(board, tree, child, d + 1, r - 1, gc, ctl, tt);
    }

    board.retract_move(mv);

    backprop(tree, node);

    if tree.converged(node) {
        let pv = tree.pv_move(node);
        let high_score = tree.nodes[node as usize].score;
        tt.store(
            key,
            high_score,
            if high_score <= oa {
                Bound::Upper
            } else if high_score >= beta {
                Bound::Lower
            } else {
                Bound::Exact
            },
            r as u8,
            pv,
            ctl.elapsed(),
        );
    }
}

/// Iterative deepening driver. The candidate PV lines differ from depth to
/// depth, so each iteration searches a fresh tree and retires the previous
/// one to the collector; knowledge persists in the transposition table,
/// history and killers.
pub fn search(
    board: &Board,
    gc: &mut Collector,
    ctl: &mut Controls,
    tt: &mut TransTable,
    time: i64,
) -> Move {
    gc.reset();

    let mut b = board.clone();

    ctl.epoch = Instant::now();
    ctl.time = time;
    ctl.max_depth = 1;
    ctl.nodes = 0;
    ctl.q_ply = MAX_PLY as i32;
    ctl.age_history();
    ctl.null_ply = 0;

    let mut best = NULL_MOVE;
    let mut tree = Tree::new();

    while ctl.max_depth < MAX_PLY as i32 && !ctl.abort() {
        rollout(&mut b, &mut tree, ROOT, 0, ctl.max_depth, gc, ctl, tt);

        // Until the root bounds meet, tighten the window and roll out again
        // at the same depth.
        if !tree.converged(ROOT) {
            let root = &mut tree.nodes[ROOT as usize];
            root.alpha = root.alpha.max(root.vminus);
            root.beta = root.beta.min(root.vplus);
            continue;
        }

        best = tree.pv_move(ROOT);
        send!(
            "info depth {} score cp {} nodes {}",
            ctl.max_depth,
            tree.nodes[ROOT as usize].score,
            gc.total()
        );

        ctl.max_depth += 1;
        ctl.null_ply = ctl.max_depth >> 2;

        gc.collect(std::mem::replace(&mut tree, Tree::new()));
        gc.reset();
    }

    gc.collect(tree);
    best
}

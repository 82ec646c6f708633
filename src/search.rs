pub mod pv;

use std::sync::LazyLock;

use arrayvec::ArrayVec;

use crate::{
    movepicker::{MovePicker, Stage},
    nnue::UpdateBuffer,
    searchinfo::SearchInfo,
    see::see,
    shogi::{
        board::{movegen::MoveList, Board},
        shogimove::Move,
    },
    threadlocal::ThreadData,
    transpositiontable::{Bound, TTView},
    util::{is_mate_score, mated_in, INFINITY, MATE_SCORE, MAX_PLY, MINIMUM_MATE_SCORE, VALUE_NONE},
};

use pv::PVariation;

/// One root move, re-scored every iteration; the list is kept sorted so the
/// best move of the last completed iteration leads it.
#[derive(Clone, Debug)]
pub struct RootMove {
    pub mov: Move,
    pub score: i32,
    pub pv: PVariation,
}

#[derive(Clone, Debug)]
pub struct SearchResults {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub pv: PVariation,
}

const ASPIRATION_INITIAL_DELTA: i32 = 12;
const ASPIRATION_MIN_DEPTH: i32 = 4;

const RFP_MAX_DEPTH: i32 = 6;
const RFP_MARGIN: i32 = 80;

const RAZORING_MAX_DEPTH: i32 = 4;
const RAZORING_BASE: i32 = 300;
const RAZORING_SLOPE: i32 = 60;

const NMP_MIN_DEPTH: i32 = 3;

const SEE_QUIET_MARGIN: i32 = -80;
const SEE_NOISY_MARGIN: i32 = -30;
const SEE_PRUNE_MAX_DEPTH: i32 = 8;

static LMR_TABLE: LazyLock<[[i32; 64]; 64]> = LazyLock::new(|| {
    let mut table = [[0; 64]; 64];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (moves, cell) in row.iter_mut().enumerate().skip(1) {
            #[allow(clippy::cast_possible_truncation)]
            {
                *cell = (0.8 + (depth as f64).ln() * (moves as f64).ln() / 2.3) as i32;
            }
        }
    }
    table
});

fn lmr_reduction(depth: i32, moves_made: usize) -> i32 {
    #![allow(clippy::cast_sign_loss)]
    let depth = (depth.clamp(0, 63)) as usize;
    let moves = moves_made.min(63);
    LMR_TABLE[depth][moves]
}

fn lmp_threshold(depth: i32, improving: bool) -> usize {
    #![allow(clippy::cast_sign_loss)]
    ((3 + depth * depth) / (2 - i32::from(improving))).max(1) as usize
}

fn make_move(board: &mut Board, t: &mut ThreadData, m: Move) {
    t.ss[board.height()].current_move = Some(m);
    let mut buffer = UpdateBuffer::default();
    board.make_move_base(m, &mut buffer);
    if t.net.is_some() {
        t.nnue.push(&buffer);
    }
}

fn unmake_move(board: &mut Board, t: &mut ThreadData) {
    board.unmake_move_base();
    if t.net.is_some() {
        t.nnue.pop();
    }
}

/// Iterative deepening with aspiration windows. Returns the best move of
/// the last fully completed iteration.
pub fn iterative_deepening(
    board: &mut Board,
    tt: TTView,
    info: &mut SearchInfo,
    t: &mut ThreadData,
) -> SearchResults {
    board.zero_height();
    t.prepare_for_search(board);

    let mut root_moves: Vec<RootMove> = {
        let mut list = MoveList::new();
        board.generate_all::<false>(&mut list);
        let mut moves: Vec<RootMove> = list
            .iter()
            .map(|entry| entry.mov)
            .filter(|&m| board.is_legal(m))
            .map(|mov| RootMove {
                mov,
                score: -INFINITY,
                pv: PVariation::EMPTY,
            })
            .collect();
        if moves.is_empty() {
            // the search generator skips unlikely moves; make sure the
            // position isn't merely oddly constrained before declaring mate.
            moves = board
                .legal_moves()
                .into_iter()
                .map(|mov| RootMove {
                    mov,
                    score: -INFINITY,
                    pv: PVariation::EMPTY,
                })
                .collect();
        }
        moves
    };

    if root_moves.is_empty() {
        return SearchResults {
            best_move: None,
            score: mated_in(0),
            depth: 0,
            pv: PVariation::EMPTY,
        };
    }

    let mut results = SearchResults {
        best_move: Some(root_moves[0].mov),
        score: -INFINITY,
        depth: 0,
        pv: PVariation::EMPTY,
    };

    let mut prev_score = 0;

    'deepening: for depth in 1..=info.max_depth {
        t.seldepth = 0;

        let mut delta = ASPIRATION_INITIAL_DELTA;
        let (mut alpha, mut beta) = if depth >= ASPIRATION_MIN_DEPTH {
            (
                (prev_score - delta).max(-INFINITY),
                (prev_score + delta).min(INFINITY),
            )
        } else {
            (-INFINITY, INFINITY)
        };

        let score = loop {
            let score = search_root(board, tt, info, t, &mut root_moves, depth, alpha, beta);
            if info.stopped() {
                break score;
            }
            if score <= alpha {
                // fail low: drop the floor, keep searching this depth.
                beta = (alpha + beta) / 2;
                alpha = (score - delta).max(-INFINITY);
            } else if score >= beta {
                beta = (score + delta).min(INFINITY);
            } else {
                break score;
            }
            delta += delta;
        };

        if info.stopped() && depth > 1 {
            // the interrupted iteration is untrustworthy; keep the previous
            // one's answer.
            break 'deepening;
        }

        root_moves.sort_by_key(|rm| -rm.score);
        let best = &root_moves[0];
        prev_score = score;
        results = SearchResults {
            best_move: Some(best.mov),
            score: best.score,
            depth,
            pv: best.pv.clone(),
        };
        t.completed_depth = depth;

        if t.thread_id == 0 && info.print_to_stdout {
            print_info_line(info, t, tt, &results);
        }

        info.limiter.update(depth, best.mov);
        if info.should_stop_iterating(t.nodes.get_global()) {
            break;
        }
    }

    t.nodes.flush();
    results
}

fn print_info_line(info: &SearchInfo, t: &ThreadData, tt: TTView, results: &SearchResults) {
    let nodes = t.nodes.get_global();
    let millis = info.limiter.elapsed_millis();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let nps = (nodes as f64 / (millis.max(1) as f64 / 1000.0)) as u64;
    println!(
        "info depth {} seldepth {} score {} nodes {} nps {} hashfull {} time {} pv {}",
        results.depth,
        t.seldepth,
        format_score(results.score),
        nodes,
        nps,
        tt.hashfull(),
        millis,
        results.pv,
    );
}

/// USI score formatting: centipawns, or moves-to-mate for forced mates.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let plies = MATE_SCORE - score.abs();
        let moves = (plies + 1) / 2;
        if score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {score}")
    }
}

#[allow(clippy::too_many_arguments)]
fn search_root(
    board: &mut Board,
    tt: TTView,
    info: &mut SearchInfo,
    t: &mut ThreadData,
    root_moves: &mut [RootMove],
    depth: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    let mut best_score = -INFINITY;

    for i in 0..root_moves.len() {
        let m = root_moves[i].mov;
        let nodes_before = t.nodes.get_local();

        make_move(board, t, m);
        let score = if i == 0 {
            -alpha_beta::<true>(board, tt, info, t, depth - 1, -beta, -alpha)
        } else {
            let null_window = -alpha_beta::<false>(board, tt, info, t, depth - 1, -alpha - 1, -alpha);
            if null_window > alpha && !info.stopped() {
                -alpha_beta::<true>(board, tt, info, t, depth - 1, -beta, -alpha)
            } else {
                null_window
            }
        };
        unmake_move(board, t);

        info.limiter
            .add_move_nodes(m, t.nodes.get_local() - nodes_before);

        if info.stopped() {
            return 0;
        }

        if score > best_score {
            best_score = score;
            root_moves[i].score = score;
            if score > alpha {
                alpha = score;
                root_moves[i].pv.load_from(m, &t.pvs[1]);
                if score >= beta {
                    break;
                }
            }
        } else {
            // keep stale entries behind everything searched this iteration.
            root_moves[i].score = root_moves[i].score.min(score);
        }
    }

    best_score
}

#[allow(clippy::too_many_lines, clippy::cognitive_complexity)]
fn alpha_beta<const PV: bool>(
    board: &mut Board,
    tt: TTView,
    info: &mut SearchInfo,
    t: &mut ThreadData,
    depth: i32,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let height = board.height();
    let in_check = board.in_check();

    if PV {
        t.pvs[height].moves.clear();
    }

    if depth <= 0 && !in_check {
        return quiescence::<PV>(board, tt, info, t, alpha, beta, 0);
    }
    let depth = depth.max(1);

    t.nodes.increment();
    if info.check_hard_limit(t.nodes.get_local(), t.nodes.get_global()) {
        return 0;
    }

    t.seldepth = t.seldepth.max(height as i32);

    if height != 0 {
        if board.is_repetition_draw() {
            return 0;
        }
        if height >= MAX_PLY - 1 {
            return if in_check { 0 } else { t.corrected_evaluation(board) };
        }
    }

    let key = board.key();
    let tt_hit = tt.probe(key, height);
    if let Some(hit) = tt_hit {
        if !PV
            && hit.depth >= depth
            && match hit.bound {
                Bound::Exact => true,
                Bound::Lower => hit.score >= beta,
                Bound::Upper => hit.score <= alpha,
                Bound::None => false,
            }
        {
            return hit.score;
        }
    }
    let tt_move = tt_hit.and_then(|hit| hit.mov);
    let tt_pv = PV || tt_hit.is_some_and(|hit| hit.was_pv);

    let static_eval = if in_check {
        VALUE_NONE
    } else if let Some(hit) = tt_hit {
        if hit.eval == VALUE_NONE {
            t.corrected_evaluation(board)
        } else {
            hit.eval
        }
    } else {
        t.corrected_evaluation(board)
    };
    t.ss[height].eval = static_eval;

    let improving = !in_check
        && height >= 2
        && t.ss[height - 2].eval != VALUE_NONE
        && static_eval > t.ss[height - 2].eval;

    if !PV && !in_check {
        // reverse futility: far enough above beta that a shallow search is
        // very unlikely to fall back under it.
        if depth <= RFP_MAX_DEPTH && static_eval - RFP_MARGIN * depth >= beta {
            return static_eval;
        }

        // razoring: hopelessly below alpha, just verify with quiescence.
        if depth <= RAZORING_MAX_DEPTH
            && static_eval + RAZORING_BASE + RAZORING_SLOPE * depth * depth <= alpha
        {
            return quiescence::<false>(board, tt, info, t, alpha, beta, 0);
        }

        // null move: hand the opponent a free tempo; if the reduced search
        // still clears beta, a real move surely would.
        let last_was_null = height > 0 && t.ss[height - 1].current_move.is_none();
        if depth >= NMP_MIN_DEPTH
            && static_eval >= beta
            && !last_was_null
            && board.has_non_pawn_material()
        {
            let r = 3 + depth / 4 + ((static_eval - beta) / 256).min(3);
            t.ss[height].current_move = None;
            board.make_nullmove();
            let score =
                -alpha_beta::<false>(board, tt, info, t, depth - r, -beta, -beta + 1);
            board.unmake_nullmove();
            if info.stopped() {
                return 0;
            }
            if score >= beta {
                return if score >= MINIMUM_MATE_SCORE { beta } else { score };
            }
        }
    }

    let killers = t.killers[height];
    let mut picker = MovePicker::new(tt_move, killers, 0);

    let mut best_score = -INFINITY;
    let mut best_move = None;
    let mut moves_made = 0usize;
    let mut quiets_tried = ArrayVec::<Move, 64>::new();
    let mut captures_tried = ArrayVec::<Move, 32>::new();

    while let Some(m) = picker.next(board, t) {
        if !board.is_legal(m) {
            continue;
        }

        let is_capture = board.is_capture(m);

        if !PV && !in_check && best_score > -MINIMUM_MATE_SCORE {
            // late move pruning: deep enough into the list, quiets stop
            // being worth a look at shallow depth.
            if !is_capture && moves_made >= lmp_threshold(depth, improving) {
                picker.skip_quiets = true;
                continue;
            }

            // static exchange pruning at shallow depth.
            if depth <= SEE_PRUNE_MAX_DEPTH && picker.stage > Stage::TTMove {
                let margin = if is_capture {
                    SEE_NOISY_MARGIN * depth * depth
                } else {
                    SEE_QUIET_MARGIN * depth
                };
                if !see(board, m, margin) {
                    continue;
                }
            }
        }

        let history_score = if is_capture {
            0
        } else {
            t.quiet_history_score(board, m)
        };

        make_move(board, t, m);
        moves_made += 1;

        let score = if moves_made == 1 {
            -alpha_beta::<PV>(board, tt, info, t, depth - 1, -beta, -alpha)
        } else {
            // null-window probe, late moves reduced.
            let mut r = 0;
            if !is_capture && depth >= 3 && moves_made >= (2 + usize::from(PV)) {
                r = lmr_reduction(depth, moves_made);
                r += i32::from(!improving);
                r -= i32::from(tt_pv);
                r -= history_score / 8192;
                r = r.clamp(0, depth - 2);
            }
            let reduced = -alpha_beta::<false>(
                board,
                tt,
                info,
                t,
                depth - 1 - r,
                -alpha - 1,
                -alpha,
            );
            let full_depth = if reduced > alpha && r > 0 {
                -alpha_beta::<false>(board, tt, info, t, depth - 1, -alpha - 1, -alpha)
            } else {
                reduced
            };
            if PV && full_depth > alpha && full_depth < beta {
                -alpha_beta::<true>(board, tt, info, t, depth - 1, -beta, -alpha)
            } else {
                full_depth
            }
        };

        unmake_move(board, t);

        if info.stopped() {
            return 0;
        }

        if is_capture {
            if !captures_tried.is_full() {
                captures_tried.push(m);
            }
        } else if !quiets_tried.is_full() {
            quiets_tried.push(m);
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                best_move = Some(m);
                alpha = score;
                if PV {
                    let (line, rest) = t.pvs.split_at_mut(height + 1);
                    line[height].load_from(m, &rest[0]);
                }
            }
            if score >= beta {
                break;
            }
        }
    }

    if moves_made == 0 {
        // no legal move is a loss in shogi whether or not the king is
        // attacked; there is no stalemate.
        return mated_in(height);
    }

    let flag = if best_score >= beta {
        Bound::Lower
    } else if best_move.is_some() {
        Bound::Exact
    } else {
        Bound::Upper
    };

    if best_score >= beta {
        let cutoff_move = best_move.expect("cutoff without a move");
        if board.is_capture(cutoff_move) {
            t.update_capture_history(board, &captures_tried, cutoff_move, depth);
        } else {
            t.insert_killer(height, cutoff_move);
            t.update_quiet_history(board, &quiets_tried, cutoff_move, depth);
            t.update_capture_history(board, &captures_tried, cutoff_move, depth);
        }
    }

    // feed the eval/search gap into the correction history, but only when
    // the node told us something an evaluation could have known.
    if !in_check
        && best_move.map_or(true, |m| !board.is_capture(m))
        && !(flag == Bound::Lower && best_score <= static_eval)
        && !(flag == Bound::Upper && best_score >= static_eval)
        && !is_mate_score(best_score)
    {
        t.update_correction_history(board, depth, best_score, static_eval);
    }

    tt.store(
        key,
        height,
        best_move,
        best_score,
        static_eval,
        flag,
        depth,
        tt_pv,
    );

    best_score
}

#[allow(clippy::too_many_arguments)]
fn quiescence<const PV: bool>(
    board: &mut Board,
    tt: TTView,
    info: &mut SearchInfo,
    t: &mut ThreadData,
    mut alpha: i32,
    beta: i32,
    qdepth: i32,
) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let height = board.height();
    let in_check = board.in_check();

    t.nodes.increment();
    if info.check_hard_limit(t.nodes.get_local(), t.nodes.get_global()) {
        return 0;
    }

    t.seldepth = t.seldepth.max(height as i32);

    if board.is_repetition_draw() {
        return 0;
    }
    if height >= MAX_PLY - 1 {
        return if in_check { 0 } else { t.corrected_evaluation(board) };
    }

    let key = board.key();
    let tt_hit = tt.probe(key, height);
    if let Some(hit) = tt_hit {
        if !PV
            && match hit.bound {
                Bound::Exact => true,
                Bound::Lower => hit.score >= beta,
                Bound::Upper => hit.score <= alpha,
                Bound::None => false,
            }
        {
            return hit.score;
        }
    }
    let tt_move = tt_hit.and_then(|hit| hit.mov);

    let stand_pat = if in_check {
        // no stand-pat when checked: the position must prove itself.
        VALUE_NONE
    } else {
        t.corrected_evaluation(board)
    };
    let mut best_score = if in_check { -INFINITY } else { stand_pat };
    if best_score >= beta {
        return best_score;
    }
    alpha = alpha.max(best_score);

    let mut picker = MovePicker::new(tt_move, [None; 2], 0);
    picker.skip_quiets = !in_check;

    let mut best_move = None;
    let mut moves_made = 0usize;

    while let Some(m) = picker.next(board, t) {
        if !board.is_legal(m) {
            continue;
        }
        make_move(board, t, m);
        moves_made += 1;
        let score = -quiescence::<PV>(board, tt, info, t, -beta, -alpha, qdepth + 1);
        unmake_move(board, t);

        if info.stopped() {
            return 0;
        }

        if score > best_score {
            best_score = score;
            if score > alpha {
                best_move = Some(m);
                alpha = score;
            }
            if score >= beta {
                break;
            }
        }
    }

    // at the quiescence horizon's first ply, quiet checking moves also get
    // a look: mates-in-one hide behind them.
    if qdepth == 0 && !in_check && best_score < beta {
        let mut quiets = MoveList::new();
        board.generate_quiets::<false>(&mut quiets);
        for entry in quiets.iter() {
            let m = entry.mov;
            if !board.gives_direct_check(m) || !board.is_legal(m) {
                continue;
            }
            make_move(board, t, m);
            moves_made += 1;
            let score = -quiescence::<PV>(board, tt, info, t, -beta, -alpha, qdepth + 1);
            unmake_move(board, t);

            if info.stopped() {
                return 0;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    best_move = Some(m);
                    alpha = score;
                }
                if score >= beta {
                    break;
                }
            }
        }
    }

    if in_check && moves_made == 0 {
        return mated_in(height);
    }

    let flag = if best_score >= beta {
        Bound::Lower
    } else if best_move.is_some() {
        Bound::Exact
    } else {
        Bound::Upper
    };
    tt.store(key, height, best_move, best_score, stand_pat, flag, 0, PV);

    best_score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        timemgmt::{SearchLimit, SearchLimiter},
        transpositiontable::TT,
    };
    use std::sync::atomic::{AtomicBool, AtomicU64};

    fn run_search(sfen: &str, depth: i32) -> SearchResults {
        let mut board = Board::from_sfen(sfen).unwrap();
        let mut tt = TT::new();
        tt.resize(16);
        tt.finalize(1);
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let mut info = SearchInfo::new(&stopped, SearchLimiter::new(SearchLimit::Depth(depth)));
        info.print_to_stdout = false;
        let mut t = ThreadData::new(0, None, &nodes);
        iterative_deepening(&mut board, tt.view(), &mut info, &mut t)
    }

    #[test]
    fn finds_mate_in_one() {
        // white king boxed in by its own lances, a black dragon on 4c
        // covering 4b and guarding 5b: the gold drop on 5b is mate.
        let results = run_search("3lkl3/9/5+R3/9/9/9/9/9/4K4 b G 1", 3);
        assert_eq!(results.score, crate::util::mate_in(1));
        assert_eq!(results.best_move.unwrap().to_string(), "G*5b");
    }

    #[test]
    fn mated_position_reports_mate() {
        // black to move, already checkmated in the corner.
        let results = run_search("8k/9/9/9/9/9/9/rr7/K8 b - 1", 2);
        assert!(results.best_move.is_none() || results.score <= -MINIMUM_MATE_SCORE);
    }

    #[test]
    fn depth_one_best_move_is_stable_across_hash_sizes() {
        let sfen = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";
        let a = run_search(sfen, 1);

        // re-run with a different hash size.
        let mut board = Board::from_sfen(sfen).unwrap();
        let mut tt = TT::new();
        tt.resize(64);
        tt.finalize(1);
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let mut info = SearchInfo::new(&stopped, SearchLimiter::new(SearchLimit::Depth(1)));
        info.print_to_stdout = false;
        let mut t = ThreadData::new(0, None, &nodes);
        let b = iterative_deepening(&mut board, tt.view(), &mut info, &mut t);

        assert_eq!(a.score, b.score);
    }

    #[test]
    fn search_is_deterministic_single_threaded() {
        let sfen = "ln1g1gsnl/1r1s2k2/p1pp1p1p1/6p1p/1p7/2P5P/PPS+b1PPP1/2B3K2/LN1GRGSNL w P2p 26";
        let a = run_search(sfen, 5);
        let b = run_search(sfen, 5);
        assert_eq!(a.score, b.score);
        assert_eq!(a.best_move, b.best_move);
    }

    #[test]
    fn stops_at_node_limit() {
        let mut board = Board::startpos();
        let mut tt = TT::new();
        tt.resize(1);
        tt.finalize(1);
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let mut info = SearchInfo::new(&stopped, SearchLimiter::new(SearchLimit::Nodes(20_000)));
        info.print_to_stdout = false;
        let mut t = ThreadData::new(0, None, &nodes);
        let results = iterative_deepening(&mut board, tt.view(), &mut info, &mut t);
        assert!(results.best_move.is_some());
        // the poll interval grants a little overshoot, no more.
        assert!(t.nodes.get_global() < 40_000);
    }
}

use crate::{
    historytable::{
        history_bonus, history_malus, update_history, CorrectionKind, CORRECTION_KINDS,
        CORRECTION_MAX_BONUS,
    },
    shogi::{
        attacks,
        board::Board,
        piece::{Colour, PieceType},
        shogimove::Move,
        zobrist,
    },
    threadlocal::ThreadData,
    util::MINIMUM_MATE_SCORE,
};

const CORRECTION_WEIGHT: i32 = 128;
const CORRECTION_DIVISOR: i32 = 2048;

impl ThreadData<'_> {
    /// The ordering score of a quiet move: its main (or drop) history plus
    /// the continuation components one, two and three plies back.
    pub fn quiet_history_score(&self, board: &Board, m: Move) -> i32 {
        let stm = board.turn();
        let mut score = if m.is_drop() {
            i32::from(self.drop_history.get(stm, m))
        } else {
            i32::from(self.main_history.get(stm, m))
        };

        let key_after = board.key() ^ board.move_key_delta(m);
        score += i32::from(self.cont_history.get(key_after, board.key()));
        for n in 1..=2usize {
            if let Some(prior) = board.prior_key(n) {
                score += i32::from(self.cont_history.get(key_after, prior));
            }
        }
        score
    }

    pub fn capture_history_score(&self, board: &Board, m: Move) -> i32 {
        let captured = board
            .captured_piece(m)
            .expect("capture history asked about a non-capture")
            .piece_type();
        i32::from(self.capture_history.get(board.turn(), m, captured))
    }

    /// Bonus for the cutoff move, malus for every quiet tried before it.
    pub fn update_quiet_history(
        &mut self,
        board: &Board,
        tried: &[Move],
        best_move: Move,
        depth: i32,
    ) {
        for &m in tried {
            let delta = if m == best_move {
                history_bonus(depth)
            } else {
                history_malus(depth)
            };
            self.update_quiet_history_single(board, m, delta);
        }
    }

    fn update_quiet_history_single(&mut self, board: &Board, m: Move, delta: i32) {
        let stm = board.turn();
        if m.is_drop() {
            update_history(self.drop_history.get_mut(stm, m), delta);
        } else {
            update_history(self.main_history.get_mut(stm, m), delta);
        }

        let key_after = board.key() ^ board.move_key_delta(m);
        update_history(self.cont_history.get_mut(key_after, board.key()), delta);
        for n in 1..=2usize {
            if let Some(prior) = board.prior_key(n) {
                update_history(self.cont_history.get_mut(key_after, prior), delta);
            }
        }
    }

    pub fn update_capture_history(
        &mut self,
        board: &Board,
        tried: &[Move],
        best_move: Move,
        depth: i32,
    ) {
        let stm = board.turn();
        for &m in tried {
            let captured = board
                .captured_piece(m)
                .expect("capture history asked about a non-capture")
                .piece_type();
            let delta = if m == best_move {
                history_bonus(depth)
            } else {
                history_malus(depth)
            };
            update_history(self.capture_history.get_mut(stm, m, captured), delta);
        }
    }

    /// Feeds the gap between the search result and the static evaluation
    /// back into every correction table this position projects onto.
    pub fn update_correction_history(
        &mut self,
        board: &Board,
        depth: i32,
        search_score: i32,
        static_eval: i32,
    ) {
        #![allow(
            clippy::cast_possible_truncation,
            clippy::cast_precision_loss,
            clippy::cast_sign_loss
        )]
        let complexity = (search_score - static_eval).abs();
        let factor = 1.0 + f64::from(complexity + 1).log2() / 10.0;
        let bonus = ((search_score - static_eval) * depth / 8) as f64 * factor;
        let bonus = (bonus as i32).clamp(-CORRECTION_MAX_BONUS, CORRECTION_MAX_BONUS);

        let stm = board.turn();
        for kind in CORRECTION_KINDS {
            let key = correction_key(board, kind);
            update_history(self.corr_history.get_mut(stm, kind, key), bonus);
        }
        for n in 1..=2usize {
            if let Some(prior) = board.prior_key(n) {
                update_history(self.corr_history.cont_mut(board.key(), prior), bonus);
            }
        }
    }

    /// The corrected static evaluation: the raw evaluation plus the summed,
    /// scaled correction-history contributions.
    pub fn corrected_evaluation(&mut self, board: &Board) -> i32 {
        let raw = self.raw_evaluate(board);
        let stm = board.turn();

        let mut correction = 0i32;
        for kind in CORRECTION_KINDS {
            let key = correction_key(board, kind);
            correction += CORRECTION_WEIGHT * i32::from(self.corr_history.get(stm, kind, key));
        }
        for n in 1..=2usize {
            if let Some(prior) = board.prior_key(n) {
                correction += CORRECTION_WEIGHT * i32::from(self.corr_history.cont(board.key(), prior));
            }
        }

        (raw + correction / CORRECTION_DIVISOR)
            .clamp(-MINIMUM_MATE_SCORE + 1, MINIMUM_MATE_SCORE - 1)
    }
}

fn correction_key(board: &Board, kind: CorrectionKind) -> u64 {
    match kind {
        CorrectionKind::Castle => board.keys().castle,
        CorrectionKind::Cavalry => board.keys().cavalry,
        CorrectionKind::Hand => board.keys().hand,
        CorrectionKind::KingPawnRook => board.keys().kpr,
        CorrectionKind::BlackAttack => attack_key(board, Colour::Black),
        CorrectionKind::WhiteAttack => attack_key(board, Colour::White),
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

fn hash_squareset(bb: crate::shogi::squareset::SquareSet) -> u64 {
    #[allow(clippy::cast_possible_truncation)]
    let low = bb.inner() as u64;
    let high = (bb.inner() >> 64) as u64;
    splitmix64(high) ^ splitmix64(low)
}

/// The xor of hashes of each of `c`'s bishop and rook attack sets: a
/// projection of the position onto its long-range attack structure.
fn attack_key(board: &Board, c: Colour) -> u64 {
    let occ = board.occupied();
    let mut key = 0u64;

    let bishops = board.state.bbs.piece_bb(PieceType::Bishop, c)
        | board.state.bbs.piece_bb(PieceType::PromotedBishop, c);
    for sq in bishops {
        key ^= hash_squareset(attacks::bishop_attacks(sq, occ));
    }
    let rooks = board.state.bbs.piece_bb(PieceType::Rook, c)
        | board.state.bbs.piece_bb(PieceType::PromotedRook, c);
    for sq in rooks {
        key ^= hash_squareset(attacks::rook_attacks(sq, occ));
    }
    key
}

impl Board {
    /// The zobrist delta a move would apply to the full key, computed
    /// without making the move. Feeds the continuation-history indices,
    /// since `key ^ delta` is exactly the key of the child position.
    pub fn move_key_delta(&self, m: Move) -> u64 {
        let us = self.turn();
        let mut delta = zobrist::SIDE_KEY;

        if m.is_drop() {
            let pt = m.drop_piece();
            let count = self.hand(us).count(pt);
            delta ^= zobrist::piece_square(pt.with(us), m.to());
            delta ^= zobrist::piece_in_hand(us, pt, count);
            delta ^= zobrist::piece_in_hand(us, pt, count - 1);
            return delta;
        }

        let piece = self.piece_at(m.from()).expect("no piece on from-square");
        let arriving = if m.is_promo() { piece.promoted() } else { piece };
        delta ^= zobrist::piece_square(piece, m.from());
        delta ^= zobrist::piece_square(arriving, m.to());

        if let Some(captured) = self.piece_at(m.to()) {
            let base = captured.piece_type().unpromoted();
            let count = self.hand(us).count(base);
            delta ^= zobrist::piece_square(captured, m.to());
            delta ^= zobrist::piece_in_hand(us, base, count);
            delta ^= zobrist::piece_in_hand(us, base, count + 1);
        }

        delta
    }
}

use arrayvec::ArrayVec;

use crate::{
    nnue::{
        hand_feature_index, network::Network, psqt_feature_index, UpdateBuffer, L1,
    },
    shogi::{
        board::Board,
        piece::{Colour, PieceType},
        types::Square,
    },
    util::MAX_PLY,
};

/// One stack slot: finished accumulator halves plus the pending feature
/// updates that produce them from the slot below.
#[derive(Clone)]
pub struct AccumulatorEntry {
    pub values: [[i16; L1]; 2],
    adds: ArrayVec<[usize; 2], 2>,
    subs: ArrayVec<[usize; 2], 2>,
    refresh: [bool; 2],
    correct: [bool; 2],
}

impl Default for AccumulatorEntry {
    fn default() -> Self {
        Self {
            values: [[0; L1]; 2],
            adds: ArrayVec::new(),
            subs: ArrayVec::new(),
            refresh: [false; 2],
            correct: [false; 2],
        }
    }
}

/// The per-thread accumulator stack. Push records updates and marks both
/// perspectives dirty; the work of applying them happens colour-wise and
/// lazily when an evaluation is requested.
#[derive(Clone)]
pub struct AccumulatorStack {
    stack: Vec<AccumulatorEntry>,
    top: usize,
}

impl AccumulatorStack {
    pub fn new() -> Self {
        Self {
            stack: vec![AccumulatorEntry::default(); MAX_PLY + 1],
            top: 0,
        }
    }

    /// Recomputes the bottom slot from the position; the stack restarts.
    pub fn reset(&mut self, board: &Board, net: &Network) {
        self.top = 0;
        let entry = &mut self.stack[0];
        entry.adds.clear();
        entry.subs.clear();
        entry.refresh = [false; 2];
        for colour in Colour::all() {
            refresh_perspective(&mut self.stack[0], colour, board, net);
        }
    }

    /// Translates the move's event stream into feature updates for both
    /// perspectives and pushes them, dirty, onto the stack.
    pub fn push(&mut self, buffer: &UpdateBuffer) {
        self.top += 1;
        debug_assert!(self.top < self.stack.len());
        let kings = buffer.kings();
        let entry = &mut self.stack[self.top];
        entry.adds.clear();
        entry.subs.clear();
        entry.correct = [false; 2];
        entry.refresh = [
            buffer.requires_refresh(Colour::Black),
            buffer.requires_refresh(Colour::White),
        ];

        for &update in buffer.adds() {
            entry.adds.push([
                psqt_feature_index(Colour::Black, kings, update.piece, update.sq),
                psqt_feature_index(Colour::White, kings, update.piece, update.sq),
            ]);
        }
        for &update in buffer.subs() {
            entry.subs.push([
                psqt_feature_index(Colour::Black, kings, update.piece, update.sq),
                psqt_feature_index(Colour::White, kings, update.piece, update.sq),
            ]);
        }
        for &update in buffer.hand_updates() {
            // a hand holding n pieces activates count-slots 0..n.
            if update.new_count > update.old_count {
                entry.adds.push([
                    hand_feature_index(
                        Colour::Black,
                        kings,
                        update.pt,
                        update.colour,
                        update.old_count,
                    ),
                    hand_feature_index(
                        Colour::White,
                        kings,
                        update.pt,
                        update.colour,
                        update.old_count,
                    ),
                ]);
            } else {
                entry.subs.push([
                    hand_feature_index(
                        Colour::Black,
                        kings,
                        update.pt,
                        update.colour,
                        update.new_count,
                    ),
                    hand_feature_index(
                        Colour::White,
                        kings,
                        update.pt,
                        update.colour,
                        update.new_count,
                    ),
                ]);
            }
        }
    }

    pub fn pop(&mut self) {
        debug_assert!(self.top > 0);
        self.top -= 1;
    }

    /// Brings the top slot up to date and returns its halves. For each dirty
    /// perspective: walk down to the nearest clean slot, replaying pending
    /// updates upward, unless a refresh marker interrupts the chain, in
    /// which case the perspective is recomputed from the position outright.
    pub fn materialise(&mut self, board: &Board, net: &Network) -> &[[i16; L1]; 2] {
        for colour in Colour::all() {
            if self.stack[self.top].correct[colour] {
                continue;
            }

            let mut anchor = self.top;
            let needs_refresh = loop {
                if self.stack[anchor].correct[colour] {
                    break false;
                }
                if self.stack[anchor].refresh[colour] {
                    break true;
                }
                debug_assert!(anchor > 0, "the bottom slot is always correct");
                anchor -= 1;
            };

            if needs_refresh {
                refresh_perspective(&mut self.stack[self.top], colour, board, net);
            } else {
                for i in anchor + 1..=self.top {
                    let (below, above) = self.stack.split_at_mut(i);
                    apply_perspective(&below[i - 1], &mut above[0], colour, net);
                }
            }
        }
        &self.stack[self.top].values
    }

    pub fn evaluate(&mut self, board: &Board, net: &Network) -> i32 {
        let stm = board.turn();
        let values = self.materialise(board, net);
        net.evaluate(values, stm)
    }
}

fn apply_perspective(
    below: &AccumulatorEntry,
    entry: &mut AccumulatorEntry,
    colour: Colour,
    net: &Network,
) {
    let (src, dst) = (&below.values[colour], &mut entry.values[colour]);
    dst.copy_from_slice(src);
    for sub in &entry.subs {
        for (v, &w) in dst.iter_mut().zip(net.feature_column(sub[colour])) {
            *v -= w;
        }
    }
    for add in &entry.adds {
        for (v, &w) in dst.iter_mut().zip(net.feature_column(add[colour])) {
            *v += w;
        }
    }
    entry.correct[colour] = true;
}

fn refresh_perspective(
    entry: &mut AccumulatorEntry,
    colour: Colour,
    board: &Board,
    net: &Network,
) {
    let kings = [board.king_sq(Colour::Black), board.king_sq(Colour::White)];
    let values = &mut entry.values[colour];
    values.copy_from_slice(net.ft_bias());

    for sq in Square::all() {
        if let Some(piece) = board.piece_at(sq) {
            add_feature(values, net.feature_column(psqt_feature_index(colour, kings, piece, sq)));
        }
    }
    for owner in Colour::all() {
        let hand = board.hand(owner);
        for pt in PieceType::hand_types() {
            for count in 0..hand.count(pt) {
                add_feature(
                    values,
                    net.feature_column(hand_feature_index(colour, kings, pt, owner, count)),
                );
            }
        }
    }

    entry.correct[colour] = true;
}

fn add_feature(dst: &mut [i16; L1], column: &[i16]) {
    for (v, &w) in dst.iter_mut().zip(column) {
        *v += w;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nnue::UpdateBuffer;

    /// Drives the accumulator through a line with a capture, a promotion,
    /// a drop and a king move, checking the lazily-updated top slot against
    /// a from-scratch recomputation after every ply.
    #[test]
    fn incremental_matches_refresh() {
        let net = Network::test_network();
        let mut board = Board::startpos();
        let mut acc = AccumulatorStack::new();
        acc.reset(&board, &net);

        let line = ["7g7f", "3c3d", "8h2b+", "3a2b", "B*4e", "5a6b", "4e5d", "6b5b"];
        for text in line {
            let m = board.parse_usi(text).unwrap();
            let mut buffer = UpdateBuffer::default();
            board.make_move_base(m, &mut buffer);
            acc.push(&buffer);

            let incremental = *acc.materialise(&board, &net);
            let mut fresh = AccumulatorStack::new();
            fresh.reset(&board, &net);
            let reference = *fresh.materialise(&board, &net);
            assert_eq!(incremental, reference, "divergence after {text}");
        }

        // and popping all the way back down leaves the root intact.
        for _ in line {
            acc.pop();
            board.unmake_move_base();
        }
        let incremental = *acc.materialise(&board, &net);
        let mut fresh = AccumulatorStack::new();
        fresh.reset(&board, &net);
        assert_eq!(incremental, *fresh.materialise(&board, &net));
    }

    #[test]
    fn lazy_evaluation_skips_intermediate_plies() {
        // push several plies without evaluating, then materialise once.
        let net = Network::test_network();
        let mut board = Board::startpos();
        let mut acc = AccumulatorStack::new();
        acc.reset(&board, &net);

        for text in ["2g2f", "8c8d", "2f2e", "8d8e"] {
            let m = board.parse_usi(text).unwrap();
            let mut buffer = UpdateBuffer::default();
            board.make_move_base(m, &mut buffer);
            acc.push(&buffer);
        }

        let incremental = *acc.materialise(&board, &net);
        let mut fresh = AccumulatorStack::new();
        fresh.reset(&board, &net);
        assert_eq!(incremental, *fresh.materialise(&board, &net));
    }
}

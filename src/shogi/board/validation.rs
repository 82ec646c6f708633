#![cfg(debug_assertions)]
#![allow(dead_code)]

use crate::{
    evaluation::piece_value,
    shogi::{
        board::Board,
        piece::{Colour, PieceType},
        squareset::SquareSet,
        types::Square,
    },
};

impl Board {
    /// Checks every structural invariant of the position. Debug builds call
    /// this on entry to and exit from make_move; release builds never do.
    #[cfg(debug_assertions)]
    pub fn check_validity(&self) {
        let state = &self.state;

        // the colour sets partition the occupancy.
        assert_eq!(
            state.bbs.occupied(),
            state.bbs.colours[Colour::Black] | state.bbs.colours[Colour::White],
        );
        assert!(
            (state.bbs.colours[Colour::Black] & state.bbs.colours[Colour::White]).is_empty(),
            "colour sets overlap"
        );

        // piece-type sets partition the occupancy too.
        let mut union = SquareSet::EMPTY;
        let mut total = 0;
        for pt in PieceType::all() {
            let bb = state.bbs.pieces[pt];
            assert!(
                (union & bb).is_empty(),
                "piece-type sets overlap on {pt:?}"
            );
            union |= bb;
            total += bb.count();
        }
        assert_eq!(union, state.bbs.occupied());
        assert_eq!(total, state.bbs.occupied().count());

        // the mailbox mirrors the square-sets.
        for sq in Square::all() {
            match state.mailbox[sq.index()] {
                Some(piece) => {
                    assert!(
                        state.bbs.piece_bb(piece.piece_type(), piece.colour()).contains_square(sq),
                        "mailbox has {piece:?} on {sq} but the square-sets disagree"
                    );
                }
                None => {
                    assert!(!state.bbs.occupied().contains_square(sq));
                }
            }
        }

        // exactly one king per side, where the cache says it is.
        for colour in Colour::all() {
            let kings = state.bbs.piece_bb(PieceType::King, colour);
            assert!(kings.one(), "{colour} must have exactly one king");
            assert_eq!(kings.first(), Some(state.kings[colour]));
        }

        // hand counters within their maxima.
        for colour in Colour::all() {
            for pt in PieceType::hand_types() {
                assert!(state.hands[colour].count(pt) <= pt.hand_limit());
            }
        }

        // material matches a full recount.
        for colour in Colour::all() {
            let mut material = 0;
            for sq in state.bbs.colours[colour] {
                material += piece_value(state.mailbox[sq.index()].unwrap().piece_type());
            }
            assert_eq!(material, state.material[colour]);
        }

        // incremental keys match a full recomputation.
        assert_eq!(state.keys, self.regenerate_keys(), "keys out of sync");
    }
}

use crate::{
    shogi::{board::Board, piece::PieceType},
    util::MINIMUM_MATE_SCORE,
};

/// Piece values for material accounting and the fallback evaluation.
pub const fn piece_value(pt: PieceType) -> i32 {
    match pt {
        PieceType::Pawn => 100,
        PieceType::PromotedPawn => 300,
        PieceType::Lance => 400,
        PieceType::Knight => 500,
        PieceType::PromotedLance => 550,
        PieceType::PromotedKnight => 600,
        PieceType::Silver => 650,
        PieceType::PromotedSilver => 700,
        PieceType::Gold => 800,
        PieceType::Bishop => 1100,
        PieceType::Rook => 1300,
        PieceType::PromotedBishop => 1500,
        PieceType::PromotedRook => 1700,
        PieceType::King => 0,
    }
}

/// Piece values tuned for exchange evaluation, which wants flatter ratios
/// than the material scale.
pub const fn see_value(pt: PieceType) -> i32 {
    match pt {
        PieceType::Pawn => 100,
        PieceType::PromotedPawn => 292,
        PieceType::Lance => 267,
        PieceType::Knight => 374,
        PieceType::PromotedLance => 347,
        PieceType::PromotedKnight => 418,
        PieceType::Silver => 595,
        PieceType::PromotedSilver => 637,
        PieceType::Gold => 759,
        PieceType::Bishop => 825,
        PieceType::Rook => 1033,
        PieceType::PromotedBishop => 999,
        PieceType::PromotedRook => 1294,
        PieceType::King => 0,
    }
}

const TEMPO: i32 = 20;

/// Material-only evaluation from the side to move's perspective, used when
/// no network file is configured. Hands count at full piece value.
pub fn material_eval(board: &Board) -> i32 {
    let us = board.turn();
    let eval = board.material_value(us) - board.material_value(us.flip()) + TEMPO;
    eval.clamp(-MINIMUM_MATE_SCORE + 1, MINIMUM_MATE_SCORE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shogi::board::Board;

    #[test]
    fn startpos_is_balanced() {
        let board = Board::startpos();
        assert_eq!(material_eval(&board), TEMPO);
    }

    #[test]
    fn captures_shift_material() {
        let mut board = Board::startpos();
        for text in ["7g7f", "3c3d", "8h2b+"] {
            let m = board.parse_usi(text).unwrap();
            board.make_move_simple(m);
        }
        // white to move, down a bishop for nothing (black holds one in hand
        // and has a horse on the board).
        assert!(material_eval(&board) < -piece_value(PieceType::Bishop));
    }

    #[test]
    fn king_is_priceless_but_valueless() {
        assert_eq!(piece_value(PieceType::King), 0);
        assert_eq!(see_value(PieceType::King), 0);
    }
}

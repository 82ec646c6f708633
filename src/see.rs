use crate::{
    evaluation::see_value,
    shogi::{
        attacks,
        board::Board,
        piece::{Colour, Piece, PieceType},
        rays::ray_intersecting,
        shogimove::Move,
        squareset::SquareSet,
    },
};

/// Piece types in ascending order of exchange value, the king last; the
/// order a side volunteers its attackers in.
const ATTACKER_ORDER: [PieceType; 14] = [
    PieceType::Pawn,
    PieceType::Lance,
    PieceType::PromotedPawn,
    PieceType::PromotedLance,
    PieceType::Knight,
    PieceType::PromotedKnight,
    PieceType::Silver,
    PieceType::PromotedSilver,
    PieceType::Gold,
    PieceType::Bishop,
    PieceType::PromotedBishop,
    PieceType::Rook,
    PieceType::PromotedRook,
    PieceType::King,
];

/// Exchange values scaled up as the opponent runs out of material, so that
/// simplifying while ahead stays attractive.
fn scaled_piece_value(board: &Board, piece: Piece) -> i32 {
    let material = board.material_value(piece.colour().flip()).max(1);
    see_value(piece.piece_type()) * (material + 128) / material
}

fn initial_gain(board: &Board, m: Move) -> i32 {
    // a drop doesn't change the material balance, so it gains nothing.
    if m.is_drop() {
        return 0;
    }
    board
        .captured_piece(m)
        .map_or(0, |captured| scaled_piece_value(board, captured))
}

fn pop_least_valuable(
    board: &Board,
    occ: &mut SquareSet,
    attackers: SquareSet,
    c: Colour,
) -> Option<Piece> {
    for pt in ATTACKER_ORDER {
        let candidates = attackers & board.state.bbs.piece_bb(pt, c);
        if !candidates.is_empty() {
            *occ ^= candidates.isolate_lsb();
            return Some(pt.with(c));
        }
    }
    None
}

const fn moves_diagonally(pt: PieceType) -> bool {
    pt.is_promoted()
        || matches!(pt, PieceType::Silver | PieceType::Gold | PieceType::Bishop)
}

const fn moves_orthogonally(pt: PieceType) -> bool {
    pt.is_promoted()
        || matches!(
            pt,
            PieceType::Pawn
                | PieceType::Lance
                | PieceType::Silver
                | PieceType::Gold
                | PieceType::Rook
        )
}

/// Whether the exchanges on the destination square of `m` lose no more than
/// `threshold` material for the side to move.
pub fn see(board: &Board, m: Move, threshold: i32) -> bool {
    let stm = board.turn();

    let mut score = initial_gain(board, m) - threshold;
    if score < 0 {
        return false;
    }

    let mut next = if m.is_drop() {
        m.drop_piece().with(stm)
    } else {
        board.piece_at(m.from()).expect("no piece on from-square")
    };

    score -= scaled_piece_value(board, next);
    if score >= 0 {
        return true;
    }

    let sq = m.to();
    let mut occ = board.occupied() ^ SquareSet::from_square(sq);
    if !m.is_drop() {
        occ ^= SquareSet::from_square(m.from());
    }

    let bbs = &board.state.bbs;
    let lances = bbs.pieces[PieceType::Lance];
    let bishops = bbs.pieces[PieceType::Bishop] | bbs.pieces[PieceType::PromotedBishop];
    let rooks = bbs.pieces[PieceType::Rook] | bbs.pieces[PieceType::PromotedRook];

    // pinned pieces may only take part when the exchange square lies on
    // their pin ray.
    let black_pinned = board.state.pinned[Colour::Black];
    let white_pinned = board.state.pinned[Colour::White];
    let black_king_ray = ray_intersecting(board.king_sq(Colour::Black), sq);
    let white_king_ray = ray_intersecting(board.king_sq(Colour::White), sq);
    let allowed = !(black_pinned | white_pinned)
        | (black_pinned & black_king_ray)
        | (white_pinned & white_king_ray);

    let mut attackers = board.attackers_to(sq, occ) & allowed;
    let mut curr = stm.flip();

    loop {
        let curr_attackers = attackers & bbs.colours[curr];
        if curr_attackers.is_empty() {
            break;
        }

        next = match pop_least_valuable(board, &mut occ, curr_attackers, curr) {
            Some(piece) => piece,
            None => break,
        };

        // a vacated square can reveal a new slider behind the attacker.
        if moves_diagonally(next.piece_type()) {
            attackers |= attacks::bishop_attacks(sq, occ) & bishops;
        }
        if moves_orthogonally(next.piece_type()) {
            let rook_rays = attacks::rook_attacks(sq, occ);
            attackers |= rook_rays & SquareSet::FILES[sq.file().index()] & lances;
            attackers |= rook_rays & rooks;
        }
        attackers &= occ;

        score = -score - 1 - scaled_piece_value(board, next);
        curr = curr.flip();

        if score >= 0 {
            // the king can't actually be given away: if it would be captured
            // back, the previous side wins the exchange after all.
            if next.piece_type() == PieceType::King
                && !(attackers & bbs.colours[curr]).is_empty()
            {
                curr = curr.flip();
            }
            break;
        }
    }

    curr != stm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_pawn_capture_is_winning() {
        // black rook takes an undefended pawn. with white nearly bare the
        // material scaling inflates the pawn well past its face value.
        let board = Board::from_sfen("4k4/9/9/9/4p4/9/9/4R4/4K4 b - 1").unwrap();
        let m = board.parse_usi("5h5e").unwrap();
        assert!(see(&board, m, 0));
        assert!(!see(&board, m, 300));
    }

    #[test]
    fn defended_pawn_loses_the_rook() {
        // the pawn on 5e is defended by the gold on 5d: rook takes pawn,
        // gold takes rook.
        let board = Board::from_sfen("4k4/9/9/4g4/4p4/9/9/4R4/4K4 b - 1").unwrap();
        let m = board.parse_usi("5h5e").unwrap();
        assert!(!see(&board, m, 0));
        // but it only loses rook-for-pawn, so a generous threshold passes.
        assert!(see(&board, m, -1200));
    }

    #[test]
    fn rook_for_pawn_with_knight_recapture() {
        // rook takes the pawn on 5e, the white gold on 5d retakes the rook,
        // and the knight on 4g, jumping in from behind the rook, recaptures
        // the gold. trading the rook for pawn plus gold loses a bit over
        // two hundred: too much at threshold zero, fine at minus four
        // hundred.
        let board = Board::from_sfen("4k4/9/9/4g4/4p4/9/5N3/4R4/4K4 b - 1").unwrap();
        let m = board.parse_usi("5h5e").unwrap();
        assert!(!see(&board, m, 0));
        assert!(see(&board, m, -400));
    }

    #[test]
    fn drops_gain_nothing() {
        // a drop doesn't change the material balance: it can never beat a
        // positive threshold, and it risks at most the dropped piece.
        let board = Board::from_sfen("4k4/9/9/9/9/4r4/9/9/3K5 b P 1").unwrap();
        let m = board.parse_usi("P*5e").unwrap();
        assert!(!see(&board, m, 1));
        assert!(see(&board, m, -200));
    }

    #[test]
    fn xray_recapture_through_vacated_square() {
        // two black rooks stacked on the 5-file versus a defended pawn:
        // after the first rook captures, the second sees through it.
        let board = Board::from_sfen("4k4/9/9/4g4/4p4/9/4R4/4R4/4K4 b - 1").unwrap();
        let m = board.parse_usi("5g5e").unwrap();
        // rook takes pawn (100), gold takes rook (-1033), rook takes gold
        // (+759): net loss is small but real; a slack threshold passes.
        assert!(!see(&board, m, 0));
        assert!(see(&board, m, -300));
    }

    #[test]
    fn pinned_defender_is_excluded() {
        // the white silver on 5d would defend 5e, but it is pinned to the
        // white king on 5a by the black rook... along the same file as the
        // exchange square, so it may still defend. use an off-ray pin: the
        // silver on 4d is pinned diagonally and cannot defend 5e.
        let board = Board::from_sfen("2k6/9/2B6/3s5/4p4/9/9/4R4/4K4 b - 1").unwrap();
        let m = board.parse_usi("5h5e").unwrap();
        // silver can't recapture: the rook wins a pawn cleanly.
        assert!(see(&board, m, 0));
    }
}

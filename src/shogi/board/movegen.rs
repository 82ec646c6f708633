use std::ops::{Deref, DerefMut, Index, IndexMut, RangeFrom};

use arrayvec::ArrayVec;

use crate::shogi::{
    attacks,
    board::Board,
    piece::{Colour, PieceType},
    rays::ray_between,
    shogimove::Move,
    squareset::SquareSet,
    types::{Rank, Square},
};

/// An upper bound on the number of pseudo-legal moves in any shogi position.
pub const MAX_POSITION_MOVES: usize = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoveListEntry {
    pub mov: Move,
    pub score: i32,
}

#[derive(Clone, Default)]
pub struct MoveList {
    inner: ArrayVec<MoveListEntry, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            inner: ArrayVec::new(),
        }
    }

    pub fn push(&mut self, mov: Move) {
        self.inner.push(MoveListEntry { mov, score: 0 });
    }
}

impl Deref for MoveList {
    type Target = [MoveListEntry];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for MoveList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Index<usize> for MoveList {
    type Output = MoveListEntry;

    fn index(&self, index: usize) -> &Self::Output {
        &self.inner[index]
    }
}

impl IndexMut<usize> for MoveList {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.inner[index]
    }
}

impl Index<RangeFrom<usize>> for MoveList {
    type Output = [MoveListEntry];

    fn index(&self, index: RangeFrom<usize>) -> &Self::Output {
        &self.inner[index]
    }
}

impl IndexMut<RangeFrom<usize>> for MoveList {
    fn index_mut(&mut self, index: RangeFrom<usize>) -> &mut Self::Output {
        &mut self.inner[index]
    }
}

fn serialize(list: &mut MoveList, from: Square, targets: SquareSet) {
    for to in targets {
        list.push(Move::new(from, to));
    }
}

fn serialize_promotions(list: &mut MoveList, from: Square, targets: SquareSet) {
    for to in targets {
        list.push(Move::new_promotion(from, to));
    }
}

fn serialize_drops(list: &mut MoveList, pt: PieceType, targets: SquareSet) {
    for to in targets {
        list.push(Move::new_drop(pt, to));
    }
}

impl Board {
    /// Generates every pseudo-legal move: the destination mask admits
    /// anything not occupied by the mover's own pieces, drops included.
    ///
    /// With `UNLIKELY` set, non-promoting moves that are legal but almost
    /// never useful (a silverless pawn creeping through the zone, an
    /// unpromoted bishop) are generated too; perft and legality checks need
    /// them, the search does not.
    pub fn generate_all<const UNLIKELY: bool>(&self, list: &mut MoveList) {
        let dst_mask = !self.state.bbs.colours[self.turn()];
        self.generate::<true, UNLIKELY>(list, dst_mask);
    }

    /// Captures only: the destination mask is the opponent's pieces.
    pub fn generate_captures<const UNLIKELY: bool>(&self, list: &mut MoveList) {
        let dst_mask = self.state.bbs.colours[self.turn().flip()];
        self.generate::<false, UNLIKELY>(list, dst_mask);
    }

    /// Non-captures: moves to empty squares, drops included.
    pub fn generate_quiets<const UNLIKELY: bool>(&self, list: &mut MoveList) {
        let dst_mask = !self.occupied();
        self.generate::<true, UNLIKELY>(list, dst_mask);
    }

    fn generate<const DROPS: bool, const UNLIKELY: bool>(
        &self,
        list: &mut MoveList,
        mut dst_mask: SquareSet,
    ) {
        let us = self.turn();
        let bbs = &self.state.bbs;
        let occ = bbs.occupied();
        let checkers = self.checkers();

        // the king always gets its moves: in check it still needs a square.
        let king = self.king_sq(us);
        serialize(list, king, attacks::king_attacks(king) & dst_mask);

        // in double check only the king can move.
        if checkers.many() {
            return;
        }

        let mut drop_mask = dst_mask & !occ;

        if let Some(checker) = checkers.first() {
            let check_ray = ray_between(king, checker);
            dst_mask &= check_ray | SquareSet::from_square(checker);
            drop_mask &= check_ray;
        }

        let zone = SquareSet::promotion_zone(us);
        let last_rank = SquareSet::relative_rank(us, Rank::A);
        let last_two_ranks = last_rank | SquareSet::relative_rank(us, Rank::B);

        // pawns move one square forward, so the whole set shifts at once and
        // the source is recovered by the inverse offset.
        let pawns = bbs.piece_bb(PieceType::Pawn, us);
        let shifted = pawns.north_relative(us) & dst_mask;
        let pawn_offset: i32 = match us {
            Colour::Black => attacks::offsets::NORTH,
            Colour::White => attacks::offsets::SOUTH,
        };
        for to in shifted & zone {
            let from = to.offset(-pawn_offset).expect("pawn came from the board");
            list.push(Move::new_promotion(from, to));
        }
        let non_promo_mask = if UNLIKELY { !last_rank } else { !zone };
        for to in shifted & non_promo_mask {
            let from = to.offset(-pawn_offset).expect("pawn came from the board");
            list.push(Move::new(from, to));
        }

        let lance_non_promo = if UNLIKELY {
            !last_rank
        } else {
            !last_two_ranks
        };
        for from in bbs.piece_bb(PieceType::Lance, us) {
            let targets = attacks::lance_attacks(from, us, occ) & dst_mask;
            self.serialize_promotable(list, from, targets, zone, lance_non_promo);
        }

        for from in bbs.piece_bb(PieceType::Knight, us) {
            let targets = attacks::knight_attacks(from, us) & dst_mask;
            self.serialize_promotable(list, from, targets, zone, !last_two_ranks);
        }

        for from in bbs.piece_bb(PieceType::Silver, us) {
            let targets = attacks::silver_attacks(from, us) & dst_mask;
            self.serialize_promotable(list, from, targets, zone, SquareSet::ALL);
        }

        for from in bbs.gold_movers(us) {
            serialize(list, from, attacks::gold_attacks(from, us) & dst_mask);
        }

        // bishops and rooks promote whenever they touch the zone; declining
        // is legal but pointless, so it's gated behind UNLIKELY.
        for from in bbs.piece_bb(PieceType::Bishop, us) {
            let targets = attacks::bishop_attacks(from, occ) & dst_mask;
            self.serialize_major(list, from, targets, zone, UNLIKELY);
        }
        for from in bbs.piece_bb(PieceType::Rook, us) {
            let targets = attacks::rook_attacks(from, occ) & dst_mask;
            self.serialize_major(list, from, targets, zone, UNLIKELY);
        }

        for from in bbs.piece_bb(PieceType::PromotedBishop, us) {
            serialize(list, from, attacks::promoted_bishop_attacks(from, occ) & dst_mask);
        }
        for from in bbs.piece_bb(PieceType::PromotedRook, us) {
            serialize(list, from, attacks::promoted_rook_attacks(from, occ) & dst_mask);
        }

        if DROPS {
            self.generate_drops(list, drop_mask);
        }
    }

    /// Emits promotions for every target touching the zone (from inside it,
    /// every target), and non-promoting moves where they remain legal.
    fn serialize_promotable(
        &self,
        list: &mut MoveList,
        from: Square,
        targets: SquareSet,
        zone: SquareSet,
        non_promo_mask: SquareSet,
    ) {
        if zone.contains_square(from) {
            serialize_promotions(list, from, targets);
        } else {
            serialize_promotions(list, from, targets & zone);
        }
        serialize(list, from, targets & non_promo_mask);
    }

    fn serialize_major(
        &self,
        list: &mut MoveList,
        from: Square,
        targets: SquareSet,
        zone: SquareSet,
        unlikely: bool,
    ) {
        let in_zone = zone.contains_square(from);
        if in_zone {
            serialize_promotions(list, from, targets);
        } else {
            serialize_promotions(list, from, targets & zone);
        }
        if unlikely {
            serialize(list, from, targets);
        } else if !in_zone {
            serialize(list, from, targets - zone);
        }
    }

    fn generate_drops(&self, list: &mut MoveList, drop_mask: SquareSet) {
        if drop_mask.is_empty() {
            return;
        }

        let us = self.turn();
        let hand = self.hand(us);
        if hand.empty() {
            return;
        }

        let last_rank = SquareSet::relative_rank(us, Rank::A);
        let last_two_ranks = last_rank | SquareSet::relative_rank(us, Rank::B);

        if hand.count(PieceType::Pawn) > 0 {
            // nifu: no file that already carries one of our board pawns.
            let pawn_files = self.state.bbs.piece_bb(PieceType::Pawn, us).fill_file();
            serialize_drops(
                list,
                PieceType::Pawn,
                drop_mask - last_rank - pawn_files,
            );
        }
        if hand.count(PieceType::Lance) > 0 {
            serialize_drops(list, PieceType::Lance, drop_mask - last_rank);
        }
        if hand.count(PieceType::Knight) > 0 {
            serialize_drops(list, PieceType::Knight, drop_mask - last_two_ranks);
        }
        for pt in [
            PieceType::Silver,
            PieceType::Gold,
            PieceType::Bishop,
            PieceType::Rook,
        ] {
            if hand.count(pt) > 0 {
                serialize_drops(list, pt, drop_mask);
            }
        }
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        let mut list = MoveList::new();
        self.generate_all::<true>(&mut list);
        list.iter()
            .map(|entry| entry.mov)
            .filter(|&m| self.is_legal(m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_thirty_legal_moves() {
        let board = Board::startpos();
        assert_eq!(board.legal_moves().len(), 30);
    }

    #[test]
    fn no_duplicate_moves_from_startpos() {
        let board = Board::startpos();
        let mut list = MoveList::new();
        board.generate_all::<true>(&mut list);
        let mut seen = std::collections::HashSet::new();
        for entry in list.iter() {
            assert!(seen.insert(entry.mov.inner()), "duplicate {}", entry.mov);
        }
    }

    #[test]
    fn captures_subset_of_all() {
        let board =
            Board::from_sfen("lnsgkgsnl/1r5b1/ppppppppp/9/9/2P6/PP1PPPPPP/1B5R1/LNSGKGSNL w - 2")
                .unwrap();
        let mut all = MoveList::new();
        board.generate_all::<true>(&mut all);
        let mut captures = MoveList::new();
        board.generate_captures::<true>(&mut captures);
        let all_moves: std::collections::HashSet<u16> =
            all.iter().map(|e| e.mov.inner()).collect();
        for entry in captures.iter() {
            assert!(all_moves.contains(&entry.mov.inner()));
            assert!(board.is_capture(entry.mov));
        }
    }

    #[test]
    fn nifu_drops_not_generated() {
        // black has a pawn in hand and a pawn on the 5th file.
        let board = Board::from_sfen("4k4/9/9/9/9/4P4/9/9/4K4 b P 1").unwrap();
        let mut list = MoveList::new();
        board.generate_all::<true>(&mut list);
        for entry in list.iter() {
            let m = entry.mov;
            if m.is_drop() && m.drop_piece() == PieceType::Pawn {
                assert_ne!(m.to().file().index(), 4, "nifu drop {m} generated");
            }
        }
        // and the drop is also rejected if it arrives via the TT.
        let nifu = Move::new_drop(PieceType::Pawn, "5e".parse().unwrap());
        assert!(!board.is_pseudo_legal(nifu));
    }

    #[test]
    fn forced_promotions() {
        // black pawn on 5b: moving to 5a must promote.
        let board = Board::from_sfen("k8/4P4/9/9/9/9/9/9/4K4 b - 1").unwrap();
        let moves = board.legal_moves();
        let pawn_moves: Vec<_> = moves
            .iter()
            .filter(|m| !m.is_drop() && m.from() == "5b".parse().unwrap())
            .collect();
        assert_eq!(pawn_moves.len(), 1);
        assert!(pawn_moves[0].is_promo());

        // black knight on 5c: both destinations are on rank a, promotion forced.
        let board = Board::from_sfen("4k4/9/4N4/9/9/9/9/9/4K4 b - 1").unwrap();
        let knight_moves: Vec<_> = board
            .legal_moves()
            .into_iter()
            .filter(|m| !m.is_drop() && m.from() == "5c".parse::<Square>().unwrap())
            .collect();
        assert_eq!(knight_moves.len(), 2);
        assert!(knight_moves.iter().all(|m| m.is_promo()));
    }

    #[test]
    fn optional_promotion_generates_both() {
        // black silver on 4d can enter the zone on 3c or 5c or 4c.
        let board = Board::from_sfen("4k4/9/9/5S3/9/9/9/9/4K4 b - 1").unwrap();
        let silver_to_3c: Vec<_> = board
            .legal_moves()
            .into_iter()
            .filter(|m| !m.is_drop() && m.to() == "3c".parse::<Square>().unwrap())
            .collect();
        assert_eq!(silver_to_3c.len(), 2);
        assert!(silver_to_3c.iter().any(|m| m.is_promo()));
        assert!(silver_to_3c.iter().any(|m| !m.is_promo()));
    }

    #[test]
    fn double_check_only_king_moves() {
        // white king on 5e checked by the rook on 5i and the bishop on 1a.
        let board = Board::from_sfen("8B/9/9/9/4k4/9/9/9/4RK3 w - 1").unwrap();
        assert!(board.checkers().many());
        let moves = board.legal_moves();
        assert!(!moves.is_empty());
        for m in &moves {
            assert!(!m.is_drop());
            assert_eq!(m.from(), "5e".parse().unwrap());
        }
    }

    #[test]
    fn check_evasion_includes_interpositions_and_drops() {
        // black king on 5i checked by white rook on 5a; black holds a gold.
        let board = Board::from_sfen("4r4/9/9/9/9/9/9/9/3NKN3 b G 1").unwrap();
        assert!(board.in_check());
        let moves = board.legal_moves();
        // the gold can be dropped anywhere between 5b and 5h, either knight
        // can interpose on 5g, and the king can sidestep to 4h or 6h.
        let drops = moves.iter().filter(|m| m.is_drop()).count();
        assert_eq!(drops, 7);
        let knight_blocks = moves
            .iter()
            .filter(|m| !m.is_drop() && m.to() == "5g".parse::<Square>().unwrap())
            .count();
        assert_eq!(knight_blocks, 2);
        let king_moves = moves
            .iter()
            .filter(|m| !m.is_drop() && m.from() == "5i".parse::<Square>().unwrap())
            .count();
        assert_eq!(king_moves, 2);
        assert_eq!(moves.len(), 11);
    }

    #[test]
    fn drops_only_to_empty_squares() {
        let board = Board::from_sfen("4k4/9/9/9/4p4/9/9/9/4K4 b RBGSNLP 1").unwrap();
        let mut list = MoveList::new();
        board.generate_all::<true>(&mut list);
        for entry in list.iter() {
            if entry.mov.is_drop() {
                assert!(board.piece_at(entry.mov.to()).is_none());
            }
        }
    }

    #[test]
    fn search_movegen_skips_unlikely_moves() {
        // black bishop on 5e can reach the zone; the non-promoting zone
        // entries only appear in the UNLIKELY generator.
        let board = Board::from_sfen("4k4/9/9/9/4B4/9/9/9/4K4 b - 1").unwrap();
        let mut likely = MoveList::new();
        board.generate_all::<false>(&mut likely);
        let mut all = MoveList::new();
        board.generate_all::<true>(&mut all);
        assert!(all.len() > likely.len());
        for entry in likely.iter() {
            let m = entry.mov;
            if !m.is_drop() && !m.is_promo() {
                assert!(
                    !SquareSet::promotion_zone(Colour::Black).contains_square(m.to()),
                    "unpromoting zone entry {m} in search movegen"
                );
            }
        }
    }
}

use crate::{
    macros::cfor,
    shogi::{
        piece::{Colour, PieceType},
        squareset::SquareSet,
        types::Square,
    },
};

// Compass offsets under file*9+rank numbering. North decreases the rank
// index, east decreases the file index; negative offsets run towards bit 0.
pub mod offsets {
    pub const NORTH: i32 = -1;
    pub const SOUTH: i32 = 1;
    pub const EAST: i32 = -9;
    pub const WEST: i32 = 9;
    pub const NORTH_EAST: i32 = -10;
    pub const NORTH_WEST: i32 = 8;
    pub const SOUTH_EAST: i32 = -8;
    pub const SOUTH_WEST: i32 = 10;
}

const fn shift(bb: SquareSet, dir: i32) -> SquareSet {
    match dir {
        offsets::NORTH => bb.north_one(),
        offsets::SOUTH => bb.south_one(),
        offsets::EAST => bb.east_one(),
        offsets::WEST => bb.west_one(),
        offsets::NORTH_EAST => bb.north_east_one(),
        offsets::NORTH_WEST => bb.north_west_one(),
        offsets::SOUTH_EAST => bb.south_east_one(),
        offsets::SOUTH_WEST => bb.south_west_one(),
        _ => panic!("bad direction"),
    }
}

/// The full ray from `sq` in `dir` on an empty board, excluding `sq`.
const fn empty_board_ray(sq: u8, dir: i32) -> SquareSet {
    // SAFETY: callers only pass square indices below 81.
    let mut bit = SquareSet::from_square(unsafe { Square::new_unchecked(sq) });
    let mut out = SquareSet::EMPTY;
    loop {
        bit = shift(bit, dir);
        if bit.is_empty() {
            return out;
        }
        out = out.union(bit);
    }
}

const fn empty_board_rays(sq: u8, dirs: &[i32]) -> SquareSet {
    let mut out = SquareSet::EMPTY;
    cfor!(let mut i = 0; i < dirs.len(); i += 1; {
        out = out.union(empty_board_ray(sq, dirs[i]));
    });
    out
}

/// Per-square ray masks for a slider, split into half-rays that run towards
/// bit 0 (backward) and towards bit 80 (forward).
#[derive(Clone, Copy)]
pub struct SlidingMask {
    backward: [SquareSet; 2],
    forward: [SquareSet; 2],
}

const fn generate_sliding_masks(dirs: [i32; 4]) -> [SlidingMask; 81] {
    let mut out = [SlidingMask {
        backward: [SquareSet::EMPTY; 2],
        forward: [SquareSet::EMPTY; 2],
    }; 81];

    cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
        let mut mask = SlidingMask {
            backward: [SquareSet::EMPTY; 2],
            forward: [SquareSet::EMPTY; 2],
        };
        let mut b_idx = 0;
        let mut f_idx = 0;

        cfor!(let mut i = 0; i < 4; i += 1; {
            let ray = empty_board_ray(sq, dirs[i]);
            if dirs[i] < 0 {
                mask.backward[b_idx] = ray;
                b_idx += 1;
            } else {
                mask.forward[f_idx] = ray;
                f_idx += 1;
            }
        });

        out[sq as usize] = mask;
    });

    out
}

static BISHOP_MASKS: [SlidingMask; 81] = generate_sliding_masks([
    offsets::NORTH_EAST,
    offsets::NORTH_WEST,
    offsets::SOUTH_EAST,
    offsets::SOUTH_WEST,
]);

static ROOK_MASKS: [SlidingMask; 81] = generate_sliding_masks([
    offsets::NORTH,
    offsets::SOUTH,
    offsets::EAST,
    offsets::WEST,
]);

static LANCE_EMPTY_ATTACKS: [[SquareSet; 81]; 2] = {
    let mut out = [[SquareSet::EMPTY; 81]; 2];
    cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
        out[Colour::Black as usize][sq as usize] = empty_board_ray(sq, offsets::NORTH);
        out[Colour::White as usize][sq as usize] = empty_board_ray(sq, offsets::SOUTH);
    });
    out
};

static BISHOP_EMPTY_ATTACKS: [SquareSet; 81] = {
    let mut out = [SquareSet::EMPTY; 81];
    cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
        out[sq as usize] = empty_board_rays(
            sq,
            &[offsets::NORTH_EAST, offsets::NORTH_WEST, offsets::SOUTH_EAST, offsets::SOUTH_WEST],
        );
    });
    out
};

static ROOK_EMPTY_ATTACKS: [SquareSet; 81] = {
    let mut out = [SquareSet::EMPTY; 81];
    cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
        out[sq as usize] = empty_board_rays(
            sq,
            &[offsets::NORTH, offsets::SOUTH, offsets::EAST, offsets::WEST],
        );
    });
    out
};

/// Builds a per-colour leaper table from a const attack generator.
/// (A macro rather than a function parameter: fn pointers aren't callable
/// in const context.)
macro_rules! sided_leaper_table {
    ($gen:ident) => {{
        let mut out = [[SquareSet::EMPTY; 81]; 2];
        cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
            // SAFETY: sq is below 81.
            let bit = SquareSet::from_square(unsafe { Square::new_unchecked(sq) });
            out[Colour::Black as usize][sq as usize] = $gen(bit, Colour::Black);
            out[Colour::White as usize][sq as usize] = $gen(bit, Colour::White);
        });
        out
    }};
}

const fn pawn_gen(bit: SquareSet, c: Colour) -> SquareSet {
    bit.north_relative(c)
}

const fn knight_gen(bit: SquareSet, c: Colour) -> SquareSet {
    bit.north_relative(c)
        .north_east_relative(c)
        .union(bit.north_relative(c).north_west_relative(c))
}

const fn silver_gen(bit: SquareSet, c: Colour) -> SquareSet {
    bit.north_east_one()
        .union(bit.north_west_one())
        .union(bit.south_east_one())
        .union(bit.south_west_one())
        .union(bit.north_relative(c))
}

const fn gold_gen(bit: SquareSet, c: Colour) -> SquareSet {
    bit.north_one()
        .union(bit.south_one())
        .union(bit.east_one())
        .union(bit.west_one())
        .union(bit.north_east_relative(c))
        .union(bit.north_west_relative(c))
}

static PAWN_ATTACKS: [[SquareSet; 81]; 2] = sided_leaper_table!(pawn_gen);
static KNIGHT_ATTACKS: [[SquareSet; 81]; 2] = sided_leaper_table!(knight_gen);
static SILVER_ATTACKS: [[SquareSet; 81]; 2] = sided_leaper_table!(silver_gen);
static GOLD_ATTACKS: [[SquareSet; 81]; 2] = sided_leaper_table!(gold_gen);

static KING_ATTACKS: [SquareSet; 81] = {
    let mut out = [SquareSet::EMPTY; 81];
    cfor!(let mut sq = 0u8; sq < 81; sq += 1; {
        // SAFETY: sq is below 81.
        let bit = SquareSet::from_square(unsafe { Square::new_unchecked(sq) });
        out[sq as usize] = bit
            .north_one()
            .union(bit.south_one())
            .union(bit.east_one())
            .union(bit.west_one())
            .union(bit.north_east_one())
            .union(bit.north_west_one())
            .union(bit.south_east_one())
            .union(bit.south_west_one());
    });
    out
};

/// Attack set of a half-ray running towards bit 80. The sentinel on the last
/// board square keeps the scan branchless when the ray is open; the first
/// blocker is included in the result.
pub const fn sliding_forward(occ: SquareSet, mask: SquareSet) -> SquareSet {
    let blockers = occ.intersection(mask).inner() | (1u128 << Square::S9I.index());
    let t = blockers.trailing_zeros();
    SquareSet::from_inner(mask.inner() & ((1u128 << (t + 1)) - 1))
}

/// Mirror of [`sliding_forward`] for half-rays running towards bit 0, with
/// the sentinel on the first board square.
pub const fn sliding_backward(occ: SquareSet, mask: SquareSet) -> SquareSet {
    let blockers = occ.intersection(mask).inner() | 1u128;
    let msb = 127 - blockers.leading_zeros();
    SquareSet::from_inner(mask.inner() & !((1u128 << msb) - 1))
}

pub fn pawn_attacks(sq: Square, c: Colour) -> SquareSet {
    PAWN_ATTACKS[c.index()][sq.index()]
}

pub fn knight_attacks(sq: Square, c: Colour) -> SquareSet {
    KNIGHT_ATTACKS[c.index()][sq.index()]
}

pub fn silver_attacks(sq: Square, c: Colour) -> SquareSet {
    SILVER_ATTACKS[c.index()][sq.index()]
}

pub fn gold_attacks(sq: Square, c: Colour) -> SquareSet {
    GOLD_ATTACKS[c.index()][sq.index()]
}

pub fn king_attacks(sq: Square) -> SquareSet {
    KING_ATTACKS[sq.index()]
}

pub fn lance_attacks(sq: Square, c: Colour, occ: SquareSet) -> SquareSet {
    let mask = LANCE_EMPTY_ATTACKS[c.index()][sq.index()];
    match c {
        Colour::Black => sliding_backward(occ, mask),
        Colour::White => sliding_forward(occ, mask),
    }
}

pub fn bishop_attacks(sq: Square, occ: SquareSet) -> SquareSet {
    let mask = &BISHOP_MASKS[sq.index()];
    sliding_backward(occ, mask.backward[0])
        | sliding_backward(occ, mask.backward[1])
        | sliding_forward(occ, mask.forward[0])
        | sliding_forward(occ, mask.forward[1])
}

pub fn rook_attacks(sq: Square, occ: SquareSet) -> SquareSet {
    let mask = &ROOK_MASKS[sq.index()];
    sliding_backward(occ, mask.backward[0])
        | sliding_backward(occ, mask.backward[1])
        | sliding_forward(occ, mask.forward[0])
        | sliding_forward(occ, mask.forward[1])
}

pub fn promoted_bishop_attacks(sq: Square, occ: SquareSet) -> SquareSet {
    bishop_attacks(sq, occ) | king_attacks(sq)
}

pub fn promoted_rook_attacks(sq: Square, occ: SquareSet) -> SquareSet {
    rook_attacks(sq, occ) | king_attacks(sq)
}

pub fn lance_empty_attacks(sq: Square, c: Colour) -> SquareSet {
    LANCE_EMPTY_ATTACKS[c.index()][sq.index()]
}

pub fn bishop_empty_attacks(sq: Square) -> SquareSet {
    BISHOP_EMPTY_ATTACKS[sq.index()]
}

pub fn rook_empty_attacks(sq: Square) -> SquareSet {
    ROOK_EMPTY_ATTACKS[sq.index()]
}

pub fn piece_attacks(pt: PieceType, sq: Square, c: Colour, occ: SquareSet) -> SquareSet {
    use PieceType::{
        Bishop, Gold, King, Knight, Lance, Pawn, PromotedBishop, PromotedKnight, PromotedLance,
        PromotedPawn, PromotedRook, PromotedSilver, Rook, Silver,
    };
    match pt {
        Pawn => pawn_attacks(sq, c),
        Lance => lance_attacks(sq, c, occ),
        Knight => knight_attacks(sq, c),
        Silver => silver_attacks(sq, c),
        Gold | PromotedPawn | PromotedLance | PromotedKnight | PromotedSilver => {
            gold_attacks(sq, c)
        }
        Bishop => bishop_attacks(sq, occ),
        Rook => rook_attacks(sq, occ),
        King => king_attacks(sq),
        PromotedBishop => promoted_bishop_attacks(sq, occ),
        PromotedRook => promoted_rook_attacks(sq, occ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn set(names: &[&str]) -> SquareSet {
        names
            .iter()
            .fold(SquareSet::EMPTY, |acc, name| acc.add_square(sq(name)))
    }

    #[test]
    fn pawn_directions() {
        assert_eq!(pawn_attacks(sq("5e"), Colour::Black), set(&["5d"]));
        assert_eq!(pawn_attacks(sq("5e"), Colour::White), set(&["5f"]));
        assert!(pawn_attacks(sq("5a"), Colour::Black).is_empty());
        assert!(pawn_attacks(sq("5i"), Colour::White).is_empty());
    }

    #[test]
    fn knight_shape() {
        assert_eq!(knight_attacks(sq("5e"), Colour::Black), set(&["4c", "6c"]));
        assert_eq!(knight_attacks(sq("5e"), Colour::White), set(&["4g", "6g"]));
        assert_eq!(knight_attacks(sq("1e"), Colour::Black), set(&["2c"]));
        assert!(knight_attacks(sq("5b"), Colour::Black).is_empty());
    }

    #[test]
    fn silver_shape() {
        assert_eq!(
            silver_attacks(sq("5e"), Colour::Black),
            set(&["4d", "6d", "4f", "6f", "5d"])
        );
        assert_eq!(
            silver_attacks(sq("5e"), Colour::White),
            set(&["4d", "6d", "4f", "6f", "5f"])
        );
    }

    #[test]
    fn gold_shape() {
        assert_eq!(
            gold_attacks(sq("5e"), Colour::Black),
            set(&["5d", "5f", "4e", "6e", "4d", "6d"])
        );
        assert_eq!(
            gold_attacks(sq("5e"), Colour::White),
            set(&["5d", "5f", "4e", "6e", "4f", "6f"])
        );
    }

    #[test]
    fn king_shape() {
        assert_eq!(king_attacks(sq("5e")).count(), 8);
        assert_eq!(king_attacks(sq("1a")).count(), 3);
        assert_eq!(king_attacks(sq("9i")).count(), 3);
    }

    #[test]
    fn lance_open_and_blocked() {
        assert_eq!(
            lance_attacks(sq("5g"), Colour::Black, SquareSet::EMPTY),
            set(&["5f", "5e", "5d", "5c", "5b", "5a"])
        );
        let occ = set(&["5d"]);
        assert_eq!(
            lance_attacks(sq("5g"), Colour::Black, occ),
            set(&["5f", "5e", "5d"])
        );
        assert_eq!(
            lance_attacks(sq("5c"), Colour::White, occ),
            set(&["5d"])
        );
    }

    #[test]
    fn rook_open_board() {
        let attacks = rook_attacks(sq("5e"), SquareSet::EMPTY);
        assert_eq!(attacks.count(), 16);
        assert!(attacks.contains_square(sq("5a")));
        assert!(attacks.contains_square(sq("5i")));
        assert!(attacks.contains_square(sq("1e")));
        assert!(attacks.contains_square(sq("9e")));
        assert!(!attacks.contains_square(sq("5e")));
    }

    #[test]
    fn rook_blockers_included() {
        let occ = set(&["5c", "3e"]);
        let attacks = rook_attacks(sq("5e"), occ);
        assert!(attacks.contains_square(sq("5c")));
        assert!(!attacks.contains_square(sq("5b")));
        assert!(attacks.contains_square(sq("3e")));
        assert!(!attacks.contains_square(sq("2e")));
        assert!(attacks.contains_square(sq("5i")));
        assert!(attacks.contains_square(sq("9e")));
    }

    #[test]
    fn bishop_open_and_blocked() {
        let attacks = bishop_attacks(sq("5e"), SquareSet::EMPTY);
        assert_eq!(attacks.count(), 16);
        assert!(attacks.contains_square(sq("1a")));
        assert!(attacks.contains_square(sq("9i")));
        assert!(attacks.contains_square(sq("9a")));
        assert!(attacks.contains_square(sq("1i")));

        let occ = set(&["3c"]);
        let attacks = bishop_attacks(sq("5e"), occ);
        assert!(attacks.contains_square(sq("3c")));
        assert!(!attacks.contains_square(sq("2b")));
    }

    #[test]
    fn promoted_sliders_add_king_ring() {
        let horse = promoted_bishop_attacks(sq("5e"), SquareSet::EMPTY);
        assert!(horse.contains_square(sq("5d")));
        assert!(horse.contains_square(sq("1a")));
        let dragon = promoted_rook_attacks(sq("5e"), SquareSet::EMPTY);
        assert!(dragon.contains_square(sq("4d")));
        assert!(dragon.contains_square(sq("5a")));
    }

    #[test]
    fn promoted_leapers_move_like_gold() {
        for c in Colour::all() {
            for square in Square::all() {
                let gold = gold_attacks(square, c);
                for pt in [
                    PieceType::PromotedPawn,
                    PieceType::PromotedLance,
                    PieceType::PromotedKnight,
                    PieceType::PromotedSilver,
                ] {
                    assert_eq!(piece_attacks(pt, square, c, SquareSet::EMPTY), gold);
                }
            }
        }
    }

    #[test]
    fn sliders_match_walked_rays() {
        // cross-check the branchless scans against a naive walk.
        let occ = set(&["5c", "3e", "7g", "2b", "8d"]);
        for square in Square::all() {
            let expected = walk(square, occ, &[-10, 8, -8, 10]);
            assert_eq!(bishop_attacks(square, occ), expected, "bishop on {square}");
            let expected = walk(square, occ, &[-1, 1, -9, 9]);
            assert_eq!(rook_attacks(square, occ), expected, "rook on {square}");
        }
    }

    fn walk(from: Square, occ: SquareSet, dirs: &[i32]) -> SquareSet {
        let mut out = SquareSet::EMPTY;
        for &dir in dirs {
            let mut bit = SquareSet::from_square(from);
            loop {
                bit = shift(bit, dir);
                if bit.is_empty() {
                    break;
                }
                out |= bit;
                if !(bit & occ).is_empty() {
                    break;
                }
            }
        }
        out
    }
}

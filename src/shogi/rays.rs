use crate::{
    macros::cfor,
    shogi::{attacks::offsets, squareset::SquareSet, types::Square},
};

const DIRS: [i32; 8] = [
    offsets::NORTH,
    offsets::SOUTH,
    offsets::EAST,
    offsets::WEST,
    offsets::NORTH_EAST,
    offsets::NORTH_WEST,
    offsets::SOUTH_EAST,
    offsets::SOUTH_WEST,
];

const fn step(bb: SquareSet, dir: i32) -> SquareSet {
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

const fn ray(from: u8, dir: i32) -> SquareSet {
    // SAFETY: callers only pass square indices below 81.
    let mut bit = SquareSet::from_square(unsafe { Square::new_unchecked(from) });
    let mut out = SquareSet::EMPTY;
    loop {
        bit = step(bit, dir);
        if bit.is_empty() {
            return out;
        }
        out = out.union(bit);
    }
}

/// `RAY_BETWEEN[a][b]`: squares strictly between `a` and `b` when they share
/// a rank, file or diagonal, empty otherwise.
pub static RAY_BETWEEN: [[SquareSet; 81]; 81] = {
    let mut out = [[SquareSet::EMPTY; 81]; 81];
    cfor!(let mut from = 0u8; from < 81; from += 1; {
        cfor!(let mut d = 0; d < 8; d += 1; {
            let dir = DIRS[d];
            // SAFETY: from is below 81.
            let mut bit = SquareSet::from_square(unsafe { Square::new_unchecked(from) });
            let mut between = SquareSet::EMPTY;
            loop {
                bit = step(bit, dir);
                let to = match bit.first() {
                    Some(to) => to,
                    None => break,
                };
                out[from as usize][to.index()] = between;
                between = between.union(bit);
            }
        });
    });
    out
};

/// `RAY_FULL[a][b]`: the whole line through `a` and `b` (both endpoints
/// included, extended to the board edges), empty when they don't share one.
pub static RAY_FULL: [[SquareSet; 81]; 81] = {
    let mut out = [[SquareSet::EMPTY; 81]; 81];
    cfor!(let mut from = 0u8; from < 81; from += 1; {
        cfor!(let mut d = 0; d < 8; d += 1; {
            let dir = DIRS[d];
            let line = ray(from, dir)
                .union(ray(from, -dir))
                .union(SquareSet::from_inner(1u128 << from));
            // SAFETY: from is below 81.
            let mut bit = SquareSet::from_square(unsafe { Square::new_unchecked(from) });
            loop {
                bit = step(bit, dir);
                let to = match bit.first() {
                    Some(to) => to,
                    None => break,
                };
                out[from as usize][to.index()] = line;
            }
        });
    });
    out
};

pub fn ray_between(a: Square, b: Square) -> SquareSet {
    RAY_BETWEEN[a.index()][b.index()]
}

pub fn ray_intersecting(a: Square, b: Square) -> SquareSet {
    RAY_FULL[a.index()][b.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    #[test]
    fn between_on_file() {
        assert_eq!(ray_between(sq("5a"), sq("5a")), SquareSet::EMPTY);
        assert_eq!(ray_between(sq("5a"), sq("5b")), SquareSet::EMPTY);
        assert_eq!(
            ray_between(sq("5a"), sq("5d")),
            SquareSet::from_square(sq("5b")).add_square(sq("5c"))
        );
        assert_eq!(ray_between(sq("5a"), sq("5d")), ray_between(sq("5d"), sq("5a")));
    }

    #[test]
    fn between_on_diagonal() {
        assert_eq!(
            ray_between(sq("2b"), sq("5e")),
            SquareSet::from_square(sq("3c")).add_square(sq("4d"))
        );
    }

    #[test]
    fn unrelated_squares_have_no_ray() {
        assert_eq!(ray_between(sq("1a"), sq("2c")), SquareSet::EMPTY);
        assert_eq!(ray_intersecting(sq("1a"), sq("2c")), SquareSet::EMPTY);
    }

    #[test]
    fn full_line_extends_to_edges() {
        let line = ray_intersecting(sq("5c"), sq("5e"));
        assert!(line.contains_square(sq("5a")));
        assert!(line.contains_square(sq("5i")));
        assert!(line.contains_square(sq("5c")));
        assert!(line.contains_square(sq("5e")));
        assert_eq!(line, SquareSet::FILES[4]);
    }

    #[test]
    fn symmetry() {
        for a in Square::all() {
            for b in Square::all() {
                assert_eq!(
                    RAY_BETWEEN[a.index()][b.index()],
                    RAY_BETWEEN[b.index()][a.index()]
                );
                assert_eq!(
                    RAY_FULL[a.index()][b.index()],
                    RAY_FULL[b.index()][a.index()]
                );
            }
        }
    }
}

use std::time::Instant;

use crate::shogi::board::{movegen::MoveList, Board};

pub fn perft(board: &mut Board, depth: i32) -> u64 {
    if depth <= 0 {
        return 1;
    }

    let mut list = MoveList::new();
    board.generate_all::<true>(&mut list);

    let mut total = 0;
    for i in 0..list.len() {
        let m = list[i].mov;
        if !board.is_legal(m) {
            continue;
        }
        if depth == 1 {
            total += 1;
        } else {
            board.make_move_simple(m);
            total += perft(board, depth - 1);
            board.unmake_move_base();
        }
    }

    total
}

/// Perft with per-root-move counts, USI `perft <depth>`.
pub fn split_perft(board: &mut Board, depth: i32) {
    #![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let depth = depth.max(1);
    let start = Instant::now();

    let mut list = MoveList::new();
    board.generate_all::<true>(&mut list);

    let mut total = 0;
    for i in 0..list.len() {
        let m = list[i].mov;
        if !board.is_legal(m) {
            continue;
        }
        board.make_move_simple(m);
        let count = perft(board, depth - 1);
        board.unmake_move_base();
        total += count;
        println!("{m}\t{count}");
    }

    let elapsed = start.elapsed().as_secs_f64();
    let nps = (total as f64 / elapsed.max(1e-9)) as u64;
    println!();
    println!("total: {total}");
    println!("{nps} nps");
}

/// Published node counts from the standard start position.
pub const START_POSITION_PERFT: [(i32, u64); 5] = [
    (1, 30),
    (2, 900),
    (3, 25_470),
    (4, 719_731),
    (5, 19_861_490),
];

/// Checks the reference counts up to the given depth; the CLI perft
/// subcommand runs this as a self-test.
pub fn gamut(max_depth: i32) -> anyhow::Result<()> {
    let mut board = Board::startpos();
    for &(depth, expected) in &START_POSITION_PERFT {
        if depth > max_depth {
            break;
        }
        let start = Instant::now();
        let count = perft(&mut board, depth);
        println!(
            "perft({depth}) = {count} ({}s)",
            start.elapsed().as_secs_f64()
        );
        anyhow::ensure!(
            count == expected,
            "perft({depth}) returned {count}, expected {expected}"
        );
    }
    println!("all counts match");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_perft_shallow() {
        let mut board = Board::startpos();
        assert_eq!(perft(&mut board, 1), 30);
        assert_eq!(perft(&mut board, 2), 900);
        // the board must be untouched afterwards.
        assert_eq!(board, Board::startpos());
    }

    #[test]
    fn startpos_perft_depth_3() {
        let mut board = Board::startpos();
        assert_eq!(perft(&mut board, 3), 25_470);
    }

    #[test]
    #[cfg_attr(debug_assertions, ignore = "slow without optimisations")]
    fn startpos_perft_depth_4() {
        let mut board = Board::startpos();
        assert_eq!(perft(&mut board, 4), 719_731);
    }

    #[test]
    fn perft_counts_drops() {
        // a bare-kings position with a pawn in hand: 5 king moves, and a
        // pawn drop on every empty square outside rank a (the white king
        // occupies one of the rank-a squares already).
        let mut board = Board::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b P 1").unwrap();
        let king_moves = 5;
        let drop_squares = 81 - 9 - 1;
        let total = perft(&mut board, 1);
        assert_eq!(total as usize, king_moves + drop_squares);
    }
}

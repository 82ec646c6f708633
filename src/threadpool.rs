use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc,
};

use crate::{
    nnue::network::Network,
    search::{self, SearchResults},
    searchinfo::SearchInfo,
    shogi::board::Board,
    threadlocal::ThreadData,
    timemgmt::SearchLimiter,
    transpositiontable::TT,
};

/// Runs one search over a fixed pool of workers sharing the transposition
/// table. Workers coordinate only through the stop flag and the aggregate
/// node counter; the root worker reports and its result is the answer.
#[allow(clippy::too_many_arguments)]
pub fn search_position(
    board: &Board,
    tt: &TT,
    net: Option<&Network>,
    threads: usize,
    limiter: SearchLimiter,
    stopped: &AtomicBool,
    nodes: &AtomicU64,
    stdin_rx: Option<&mpsc::Receiver<String>>,
    print_to_stdout: bool,
) -> (SearchResults, bool) {
    tt.increase_age();
    stopped.store(false, Ordering::SeqCst);
    nodes.store(0, Ordering::Relaxed);

    let view = tt.view();

    std::thread::scope(|s| {
        let mut helpers = Vec::with_capacity(threads.saturating_sub(1));
        for thread_id in 1..threads {
            let mut helper_board = board.clone();
            helpers.push(s.spawn(move || {
                let mut t = ThreadData::new(thread_id, net, nodes);
                let mut info = SearchInfo::new(stopped, SearchLimiter::infinite());
                info.print_to_stdout = false;
                search::iterative_deepening(&mut helper_board, view, &mut info, &mut t);
            }));
        }

        let mut main_board = board.clone();
        let mut t = ThreadData::new(0, net, nodes);
        let mut info = SearchInfo::new(stopped, limiter);
        info.print_to_stdout = print_to_stdout;
        if let Some(rx) = stdin_rx {
            info = info.with_stdin(rx);
        }
        let results = search::iterative_deepening(&mut main_board, view, &mut info, &mut t);

        // the root worker is done: wave the helpers home.
        stopped.store(true, Ordering::SeqCst);
        for helper in helpers {
            helper.join().expect("search worker panicked");
        }

        (results, info.quit)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timemgmt::SearchLimit;

    #[test]
    fn multithreaded_search_terminates_and_agrees_on_legality() {
        let board = Board::startpos();
        let mut tt = TT::new();
        tt.resize(4);
        tt.finalize(2);
        let stopped = AtomicBool::new(false);
        let nodes = AtomicU64::new(0);
        let (results, quit) = search_position(
            &board,
            &tt,
            None,
            2,
            SearchLimiter::new(SearchLimit::Depth(4)),
            &stopped,
            &nodes,
            None,
            false,
        );
        assert!(!quit);
        let best = results.best_move.expect("startpos has legal moves");
        assert!(board.legal_moves().contains(&best));
    }
}

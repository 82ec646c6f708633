use std::sync::atomic::AtomicU64;

use crate::{
    evaluation,
    historytable::{
        CaptureHistory, ContinuationHistory, CorrectionHistory, DropHistory, MainHistory,
    },
    nnue::{accumulator::AccumulatorStack, network::Network},
    search::pv::PVariation,
    shogi::{board::Board, shogimove::Move},
    util::{BatchedAtomicCounter, MAX_PLY},
};

/// Per-ply search stack entry.
#[derive(Clone, Copy, Debug, Default)]
pub struct StackEntry {
    /// The (corrected) static evaluation at this ply.
    pub eval: i32,
    /// The move made to leave this ply, None at a null move.
    pub current_move: Option<Move>,
}

/// Everything a worker thread owns exclusively: histories, killers, the
/// accumulator stack, its slice of the node counter, and its PV lines.
pub struct ThreadData<'a> {
    pub thread_id: usize,

    pub main_history: MainHistory,
    pub drop_history: DropHistory,
    pub capture_history: CaptureHistory,
    pub cont_history: ContinuationHistory,
    pub corr_history: CorrectionHistory,
    pub killers: Vec<[Option<Move>; 2]>,

    pub ss: Vec<StackEntry>,
    pub pvs: Vec<PVariation>,

    pub nnue: AccumulatorStack,
    pub net: Option<&'a Network>,

    pub nodes: BatchedAtomicCounter<'a>,
    pub seldepth: i32,
    pub completed_depth: i32,
}

impl<'a> ThreadData<'a> {
    pub fn new(thread_id: usize, net: Option<&'a Network>, node_counter: &'a AtomicU64) -> Self {
        Self {
            thread_id,
            main_history: MainHistory::new(),
            drop_history: DropHistory::new(),
            capture_history: CaptureHistory::new(),
            cont_history: ContinuationHistory::new(),
            corr_history: CorrectionHistory::new(),
            killers: vec![[None; 2]; MAX_PLY],
            ss: vec![StackEntry::default(); MAX_PLY],
            pvs: vec![PVariation::default(); MAX_PLY],
            nnue: AccumulatorStack::new(),
            net,
            nodes: BatchedAtomicCounter::new(node_counter),
            seldepth: 0,
            completed_depth: 0,
        }
    }

    /// Resets per-game state. Histories survive between searches within a
    /// game but not across `usinewgame`.
    pub fn clear_for_new_game(&mut self) {
        self.main_history.clear();
        self.drop_history.clear();
        self.capture_history.clear();
        self.cont_history.clear();
        self.corr_history.clear();
        self.killers.iter_mut().for_each(|k| *k = [None; 2]);
    }

    pub fn prepare_for_search(&mut self, board: &Board) {
        self.seldepth = 0;
        self.completed_depth = 0;
        self.killers.iter_mut().for_each(|k| *k = [None; 2]);
        if let Some(net) = self.net {
            self.nnue.reset(board, net);
        }
    }

    /// Raw static evaluation: the network if one is loaded, the material
    /// balance otherwise.
    pub fn raw_evaluate(&mut self, board: &Board) -> i32 {
        match self.net {
            Some(net) => self.nnue.evaluate(board, net),
            None => evaluation::material_eval(board),
        }
    }

    pub fn insert_killer(&mut self, height: usize, m: Move) {
        debug_assert!(height < MAX_PLY);
        if self.killers[height][0] == Some(m) {
            return;
        }
        self.killers[height][1] = self.killers[height][0];
        self.killers[height][0] = Some(m);
    }
}

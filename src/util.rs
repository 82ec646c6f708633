use std::sync::atomic::{AtomicU64, Ordering};

pub const MAX_DEPTH: i32 = 128;
pub const MAX_PLY: usize = 256;
pub const MEGABYTE: usize = 1024 * 1024;

pub const INFINITY: i32 = 32001;
pub const VALUE_NONE: i32 = 32002;
pub const MATE_SCORE: i32 = 32000;
/// Scores above this bound encode a forced mate; `MATE_SCORE - |score|` is
/// the distance in plies.
pub const MINIMUM_MATE_SCORE: i32 = MATE_SCORE - 512;

pub const fn is_mate_score(score: i32) -> bool {
    score.abs() >= MINIMUM_MATE_SCORE
}

pub const fn mated_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    -MATE_SCORE + ply as i32
}

pub const fn mate_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    MATE_SCORE - ply as i32
}

/// A node counter that only touches the shared atomic every `GRANULARITY`
/// increments, so workers don't contend on it.
#[derive(Debug, Clone, Copy)]
pub struct BatchedAtomicCounter<'a> {
    buffer: u64,
    global: &'a AtomicU64,
    local: u64,
}

impl<'a> BatchedAtomicCounter<'a> {
    const GRANULARITY: u64 = 1024;

    pub const fn new(global: &'a AtomicU64) -> Self {
        Self {
            buffer: 0,
            global,
            local: 0,
        }
    }

    pub fn increment(&mut self) {
        self.buffer += 1;
        if self.buffer >= Self::GRANULARITY {
            self.global.fetch_add(self.buffer, Ordering::Relaxed);
            self.local += self.buffer;
            self.buffer = 0;
        }
    }

    pub fn get_global(&self) -> u64 {
        self.global.load(Ordering::Relaxed) + self.buffer
    }

    pub const fn get_local(&self) -> u64 {
        self.local + self.buffer
    }

    pub fn flush(&mut self) {
        self.global.fetch_add(self.buffer, Ordering::Relaxed);
        self.local += self.buffer;
        self.buffer = 0;
    }

    pub fn reset(&mut self) {
        self.buffer = 0;
        self.global.store(0, Ordering::Relaxed);
        self.local = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mate_score_encoding() {
        assert!(is_mate_score(mate_in(1)));
        assert!(is_mate_score(mated_in(1)));
        assert!(!is_mate_score(0));
        assert!(!is_mate_score(2500));
        assert_eq!(MATE_SCORE - mate_in(3), 3);
        assert_eq!(mated_in(3), -mate_in(3));
    }

    #[test]
    fn batched_counter() {
        let global = AtomicU64::new(0);
        let mut counter = BatchedAtomicCounter::new(&global);
        for _ in 0..2500 {
            counter.increment();
        }
        assert_eq!(counter.get_global(), 2500);
        assert_eq!(counter.get_local(), 2500);
        // only full batches have been published to the shared atomic.
        assert_eq!(global.load(Ordering::Relaxed), 2048);
        counter.flush();
        assert_eq!(global.load(Ordering::Relaxed), 2500);
    }
}

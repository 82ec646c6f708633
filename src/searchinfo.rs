use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc,
};

use crate::{timemgmt::SearchLimiter, util::MAX_DEPTH};

/// Search control for one worker: the shared cooperative stop flag, this
/// worker's limiter, and (on the root worker) the stdin channel so that a
/// `stop` or `quit` arriving mid-search is honoured.
pub struct SearchInfo<'a> {
    pub stopped: &'a AtomicBool,
    pub limiter: SearchLimiter,
    pub max_depth: i32,
    pub print_to_stdout: bool,
    pub stdin_rx: Option<&'a mpsc::Receiver<String>>,
    pub quit: bool,
}

/// How often the hard limiter and the stdin channel are consulted, in nodes.
pub const HARD_LIMIT_POLL_INTERVAL: u64 = 2048;

impl<'a> SearchInfo<'a> {
    pub fn new(stopped: &'a AtomicBool, limiter: SearchLimiter) -> Self {
        let max_depth = limiter.depth_limit().unwrap_or(MAX_DEPTH).min(MAX_DEPTH);
        Self {
            stopped,
            limiter,
            max_depth,
            print_to_stdout: true,
            stdin_rx: None,
            quit: false,
        }
    }

    pub fn with_stdin(mut self, stdin_rx: &'a mpsc::Receiver<String>) -> Self {
        self.stdin_rx = Some(stdin_rx);
        self
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// The in-search poll. Cheap on most calls: the limiter and the stdin
    /// channel are only consulted every `HARD_LIMIT_POLL_INTERVAL` of this
    /// worker's own nodes.
    pub fn check_hard_limit(&mut self, local_nodes: u64, global_nodes: u64) -> bool {
        if local_nodes % HARD_LIMIT_POLL_INTERVAL == 0 {
            if self.stopped() {
                return true;
            }
            if self.limiter.stop_hard(global_nodes) {
                self.stop();
                return true;
            }
            if let Some(rx) = self.stdin_rx {
                if let Ok(cmd) = rx.try_recv() {
                    match cmd.trim() {
                        "stop" => self.stop(),
                        "quit" => {
                            self.quit = true;
                            self.stop();
                        }
                        // anything else arriving mid-search is dropped.
                        _ => {}
                    }
                }
            }
            self.stopped()
        } else {
            self.stopped()
        }
    }

    /// The between-iterations check.
    pub fn should_stop_iterating(&self, nodes: u64) -> bool {
        self.stopped() || self.limiter.stop_soft(nodes)
    }
}

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Run the fixed-depth benchmark over the internal position set.
    Bench {
        /// Search depth per position.
        #[clap(long, default_value_t = crate::bench::DEFAULT_DEPTH)]
        depth: i32,
        /// Worker threads (the node-count anchor is single-threaded).
        #[clap(long, default_value_t = 1)]
        threads: usize,
    },
    /// Verify move generation against the published perft counts.
    Perft {
        /// Maximum depth to verify.
        #[clap(long, default_value_t = 4)]
        depth: i32,
    },
}

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn, clippy::module_name_repetitions)]
#![deny(clippy::undocumented_unsafe_blocks)]

//! Tokin, a USI shogi engine written in Rust.

mod macros;

#[cfg(feature = "datagen")]
mod datagen;

mod bench;
mod cli;
mod errors;
mod evaluation;
mod history;
mod historytable;
mod movepicker;
mod nnue;
mod perft;
mod rng;
mod search;
mod searchinfo;
mod see;
mod shogi;
mod threadlocal;
mod threadpool;
mod timemgmt;
mod transpositiontable;
mod usi;
mod util;

use cli::Subcommands::{Bench, Perft};

/// The name of the engine.
pub static NAME: &str = "Tokin";
/// The version of the engine.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    if std::env::args_os().len() == 1 {
        // fast path to USI:
        return usi::main_loop();
    }

    let cli = <cli::Cli as clap::Parser>::parse();

    match cli.subcommand {
        Some(Bench { depth, threads }) => {
            bench::run(depth, threads, None);
            Ok(())
        }
        Some(Perft { depth }) => perft::gamut(depth),
        None => usi::main_loop(),
    }
}

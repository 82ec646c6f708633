use std::{
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc,
    },
};

use crate::{
    bench,
    errors::{
        GoParseError, PerftParseError, PositionParseError, SetOptionParseError, UsiError,
    },
    evaluation, perft,
    nnue::network::Network,
    shogi::{board::Board, piece::Colour},
    threadpool,
    timemgmt::{SearchLimit, SearchLimiter, TimeLimits, TimeManager},
    transpositiontable::TT,
    NAME, VERSION,
};

#[derive(Debug)]
pub struct EngineOptions {
    pub hash_mib: usize,
    pub threads: usize,
    pub move_overhead: u64,
    pub eval_file: Option<PathBuf>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            hash_mib: 16,
            threads: 1,
            move_overhead: 10,
            eval_file: None,
        }
    }
}

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

fn stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || stdin_reader_worker(&sender))
        .expect("couldn't start stdin reader thread");
    receiver
}

fn stdin_reader_worker(sender: &mpsc::Sender<String>) {
    let mut linebuf = String::with_capacity(128);
    while std::io::stdin().read_line(&mut linebuf).is_ok() {
        let cmd = linebuf.trim();
        if cmd.is_empty() {
            linebuf.clear();
            continue;
        }
        if sender.send(cmd.to_owned()).is_err() {
            break;
        }
        if !KEEP_RUNNING.load(Ordering::SeqCst) {
            break;
        }
        linebuf.clear();
    }
}

fn print_usi_response() {
    println!("id name {NAME} {VERSION}");
    println!("id author the {NAME} developers");
    println!("option name Hash type spin default 16 min 1 max 1048576");
    println!("option name Threads type spin default 1 min 1 max 256");
    println!("option name MoveOverhead type spin default 10 min 0 max 5000");
    println!("option name EvalFile type string default <empty>");
    println!("usiok");
}

pub fn parse_position(text: &str, board: &mut Board) -> Result<(), PositionParseError> {
    let mut parts = text.split_ascii_whitespace();
    let command = parts.next();
    debug_assert_eq!(command, Some("position"));

    match parts.next() {
        Some("startpos") => {
            *board = Board::startpos();
            match parts.next() {
                Some("moves") | None => {}
                Some(other) => {
                    return Err(PositionParseError::InvalidStartposSuffix(other.to_string()))
                }
            }
        }
        Some("sfen") => {
            let mut sfen = String::new();
            for part in parts.by_ref() {
                if part == "moves" {
                    break;
                }
                if !sfen.is_empty() {
                    sfen.push(' ');
                }
                sfen.push_str(part);
            }
            board.set_from_sfen(&sfen)?;
        }
        Some(other) => return Err(PositionParseError::UnknownPositionSpecifier(other.to_string())),
        None => return Err(PositionParseError::MissingPositionSpecifier),
    }

    for move_text in parts {
        let m = board.parse_usi(move_text)?;
        board.make_move_simple(m);
    }
    board.zero_height();
    Ok(())
}

fn part_parse<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    param: &'static str,
    next: Option<&str>,
) -> Result<T, GoParseError> {
    next.ok_or(GoParseError::MissingValue(param))?
        .parse()
        .map_err(|source| GoParseError::InvalidValue { param, source })
}

pub fn parse_go(
    text: &str,
    board: &Board,
    options: &EngineOptions,
) -> Result<SearchLimiter, GoParseError> {
    #![allow(clippy::cast_precision_loss)]
    let mut depth: Option<i32> = None;
    let mut nodes: Option<u64> = None;
    let mut movetime: Option<u64> = None;
    let mut btime: Option<u64> = None;
    let mut wtime: Option<u64> = None;
    let mut binc: Option<u64> = None;
    let mut winc: Option<u64> = None;
    let mut byoyomi: Option<u64> = None;

    let mut parts = text.split_ascii_whitespace();
    let command = parts.next();
    debug_assert_eq!(command, Some("go"));

    while let Some(part) = parts.next() {
        match part {
            "depth" => depth = Some(part_parse("depth", parts.next())?),
            "nodes" => nodes = Some(part_parse("nodes", parts.next())?),
            "movetime" => movetime = Some(part_parse("movetime", parts.next())?),
            "btime" => btime = Some(part_parse("btime", parts.next())?),
            "wtime" => wtime = Some(part_parse("wtime", parts.next())?),
            "binc" => binc = Some(part_parse("binc", parts.next())?),
            "winc" => winc = Some(part_parse("winc", parts.next())?),
            "byoyomi" => byoyomi = Some(part_parse("byoyomi", parts.next())?),
            "mate" => {
                // mate search is not supported; consume the argument and
                // fall back to an unbounded search.
                parts.next();
            }
            "infinite" | "ponder" => {}
            other => return Err(GoParseError::UnknownSubcommand(other.to_string())),
        }
    }

    let limit = if let Some(depth) = depth {
        SearchLimit::Depth(depth)
    } else if let Some(nodes) = nodes {
        SearchLimit::Nodes(nodes)
    } else if let Some(movetime) = movetime {
        SearchLimit::MoveTime(movetime.saturating_sub(options.move_overhead))
    } else if btime.is_some() || wtime.is_some() || byoyomi.is_some() {
        let (remaining, increment) = match board.turn() {
            Colour::Black => (btime, binc),
            Colour::White => (wtime, winc),
        };
        if remaining.is_none() && byoyomi.is_none() {
            return Err(GoParseError::IncompleteTimeControl);
        }
        let limits = TimeLimits {
            remaining: remaining.unwrap_or(0) as f64 / 1000.0,
            increment: increment.unwrap_or(0) as f64 / 1000.0,
            byoyomi: byoyomi.unwrap_or(0) as f64 / 1000.0,
        };
        SearchLimit::Tournament(TimeManager::new(&limits, options.move_overhead))
    } else {
        SearchLimit::Infinite
    };

    Ok(SearchLimiter::new(limit))
}

fn spin_value(
    name: &str,
    value: &str,
    lo: i64,
    hi: i64,
) -> Result<i64, SetOptionParseError> {
    let parsed: i64 = value
        .parse()
        .map_err(|source| SetOptionParseError::InvalidIntValue {
            name: name.to_string(),
            source,
        })?;
    if parsed < lo || parsed > hi {
        return Err(SetOptionParseError::ValueOutOfRange {
            name: name.to_string(),
            lo,
            hi,
            got: parsed,
        });
    }
    Ok(parsed)
}

pub fn parse_setoption(
    text: &str,
    options: &mut EngineOptions,
    tt: &mut TT,
) -> Result<(), SetOptionParseError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next(); // "setoption"
    match parts.next() {
        Some("name") => {}
        Some(other) => {
            return Err(SetOptionParseError::ExpectedNameKeyword(other.to_string()))
        }
        None => return Err(SetOptionParseError::MissingNameKeyword),
    }
    let name = parts
        .next()
        .ok_or(SetOptionParseError::MissingOptionName)?
        .to_string();
    // "value" keyword, then the value (which may contain spaces for paths).
    let value = match parts.next() {
        Some("value") => parts.collect::<Vec<_>>().join(" "),
        _ => String::new(),
    };
    if value.is_empty() {
        return Err(SetOptionParseError::MissingOptionValue(name));
    }

    match name.as_str() {
        "Hash" | "USI_Hash" => {
            let mib = spin_value(&name, &value, 1, 1_048_576)?;
            options.hash_mib = mib as usize;
            tt.resize(options.hash_mib);
        }
        "Threads" => {
            options.threads = spin_value(&name, &value, 1, 256)? as usize;
        }
        "MoveOverhead" => {
            options.move_overhead = spin_value(&name, &value, 0, 5000)? as u64;
        }
        "EvalFile" => {
            options.eval_file = if value == "<empty>" {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        "USI_Ponder" => {}
        _ => return Err(SetOptionParseError::UnknownOption(name)),
    }
    Ok(())
}

/// The USI protocol loop. Blocks on stdin; searches run inline, with the
/// stdin channel polled from inside the search so `stop` still lands.
pub fn main_loop() -> anyhow::Result<()> {
    let mut board = Board::startpos();
    let mut options = EngineOptions::default();
    let mut tt = TT::new();
    tt.resize(options.hash_mib);
    let mut network: Option<Box<Network>> = None;
    let mut network_loaded_from: Option<PathBuf> = None;

    let stopped = AtomicBool::new(false);
    let nodes = AtomicU64::new(0);

    let stdin = stdin_reader();

    let mut quit = false;
    while !quit {
        std::io::stdout().flush()?;
        let Ok(line) = stdin.recv() else { break };
        let input = line.trim();

        let res: Result<(), UsiError> = match input {
            "usi" => {
                print_usi_response();
                Ok(())
            }
            "isready" => {
                if tt.finalize(options.threads) {
                    println!("info string hash table initialised ({} MiB)", options.hash_mib);
                }
                if options.eval_file != network_loaded_from {
                    network = match &options.eval_file {
                        Some(path) => match Network::load(path) {
                            Ok(net) => Some(net),
                            Err(err) => {
                                eprintln!("info string failed to load EvalFile: {err}");
                                None
                            }
                        },
                        None => None,
                    };
                    network_loaded_from.clone_from(&options.eval_file);
                }
                println!("readyok");
                Ok(())
            }
            "usinewgame" => {
                tt.finalize(options.threads);
                tt.clear(options.threads);
                Ok(())
            }
            "quit" => break,
            "stop" => Ok(()),
            "d" => {
                print!("{board}");
                Ok(())
            }
            "eval" => {
                println!("{}", evaluation::material_eval(&board));
                Ok(())
            }
            "bench" => {
                bench::run(bench::DEFAULT_DEPTH, options.threads, network.as_deref());
                Ok(())
            }
            input if input.starts_with("position") => {
                parse_position(input, &mut board).map_err(UsiError::from)
            }
            input if input.starts_with("setoption") => {
                parse_setoption(input, &mut options, &mut tt).map_err(UsiError::from)
            }
            input if input.starts_with("go") => match parse_go(input, &board, &options) {
                Ok(limiter) => {
                    tt.finalize(options.threads);
                    let (results, quit_requested) = threadpool::search_position(
                        &board,
                        &tt,
                        network.as_deref(),
                        options.threads,
                        limiter,
                        &stopped,
                        &nodes,
                        Some(&stdin),
                        true,
                    );
                    match results.best_move {
                        Some(best) => println!("bestmove {best}"),
                        None => println!("bestmove resign"),
                    }
                    quit = quit_requested;
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            input if input.starts_with("perft") => match parse_perft(input) {
                Ok(depth) => {
                    perft::split_perft(&mut board, depth);
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            other => Err(UsiError::UnknownCommand(other.to_string())),
        };

        if let Err(e) = res {
            eprintln!("info string error: {e}");
        }
    }
    KEEP_RUNNING.store(false, Ordering::SeqCst);
    Ok(())
}

fn parse_perft(text: &str) -> Result<i32, PerftParseError> {
    let mut parts = text.split_ascii_whitespace();
    parts.next(); // "perft"
    let depth_text = parts.next().ok_or(PerftParseError::MissingDepth)?;
    depth_text
        .parse()
        .map_err(|source| PerftParseError::InvalidDepth {
            text: depth_text.to_string(),
            source,
        })
}

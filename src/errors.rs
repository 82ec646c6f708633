use std::num::ParseIntError;

use thiserror::Error;

use crate::shogi::piece::Colour;

/// Errors that can occur when parsing a move in USI notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid file {0}")]
    InvalidFile(char),
    #[error("invalid rank {0}")]
    InvalidRank(char),
    #[error("invalid drop piece {0}")]
    InvalidDropPiece(char),
    #[error("{0} cannot be dropped")]
    IllegalDropPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

/// Errors that can occur when parsing an SFEN position string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SfenParseError {
    #[error("SFEN string is missing board part")]
    MissingBoard,
    #[error("board part of SFEN has {0} ranks, expected 9")]
    BoardRanks(usize),
    #[error("wrong number of files in rank \"{0}\"")]
    BadFilesInRank(String),
    #[error("unexpected character in board: '{0}'")]
    UnexpectedCharacter(char),
    #[error("'+' must be followed by a promotable piece, got '{0}'")]
    InvalidPromotion(char),
    #[error("expected side to be 'b' or 'w', got \"{0}\"")]
    InvalidSide(String),
    #[error("expected side part")]
    MissingSide,
    #[error("expected hand part")]
    MissingHand,
    #[error("invalid hand: \"{0}\"")]
    InvalidHand(String),
    #[error("hand count for {piece} exceeds maximum of {max}")]
    HandCountTooLarge { piece: char, max: u32 },
    #[error("{} king is missing", if *colour == Colour::Black { "black" } else { "white" })]
    MissingKing { colour: Colour },
    #[error("more than one {} king", if *colour == Colour::Black { "black" } else { "white" })]
    DuplicateKings { colour: Colour },
    #[error("invalid move counter: \"{0}\"")]
    InvalidMoveCount(String),
}

/// Errors that can occur when parsing the `position` command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionParseError {
    #[error("failed to parse SFEN: {0}")]
    Sfen(#[from] SfenParseError),
    #[error("failed to parse move: {0}")]
    Move(#[from] MoveParseError),
    #[error("`position` command requires a position specifier (sfen or startpos)")]
    MissingPositionSpecifier,
    #[error("`position startpos` must be followed by `moves` or nothing, got \"{0}\"")]
    InvalidStartposSuffix(String),
    #[error("unknown position specifier \"{0}\", expected sfen or startpos")]
    UnknownPositionSpecifier(String),
}

/// Errors that can occur when parsing the `go` command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GoParseError {
    #[error("unknown go subcommand \"{0}\"")]
    UnknownSubcommand(String),
    #[error("missing value after `{0}`")]
    MissingValue(&'static str),
    #[error("failed to parse value for `{param}`: {source}")]
    InvalidValue {
        param: &'static str,
        source: ParseIntError,
    },
    #[error("incomplete time control: btime and wtime must both be given")]
    IncompleteTimeControl,
}

/// Errors that can occur when parsing the `setoption` command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetOptionParseError {
    #[error("`setoption` must be followed by `name`")]
    MissingNameKeyword,
    #[error("expected `name` after `setoption`, got \"{0}\"")]
    ExpectedNameKeyword(String),
    #[error("missing option name after `setoption name`")]
    MissingOptionName,
    #[error("missing value after `setoption name {0} value`")]
    MissingOptionValue(String),
    #[error("invalid integer value for option `{name}`: {source}")]
    InvalidIntValue { name: String, source: ParseIntError },
    #[error("value {got} out of range for option `{name}`, expected {lo}..={hi}")]
    ValueOutOfRange {
        name: String,
        lo: i64,
        hi: i64,
        got: i64,
    },
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

/// Errors that can occur when parsing a `perft` command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerftParseError {
    #[error("missing depth after `perft`")]
    MissingDepth,
    #[error("failed to parse perft depth \"{text}\": {source}")]
    InvalidDepth { text: String, source: ParseIntError },
}

/// Top-level USI errors.
#[derive(Debug, Error)]
pub enum UsiError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}")]
    Position(#[from] PositionParseError),
    #[error("{0}")]
    Go(#[from] GoParseError),
    #[error("{0}")]
    SetOption(#[from] SetOptionParseError),
    #[error("{0}")]
    Perft(#[from] PerftParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

use crate::{
    errors::SfenParseError,
    shogi::{
        hand::Hand,
        piece::{Colour, Piece, PieceType},
        types::{File, Rank, Square},
    },
};

/// A parsed SFEN string: piece placement, side to move, hands, move counter.
/// Parsing is pure; applying the result to a `Board` happens elsewhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sfen {
    pub board: [Option<Piece>; 81],
    pub side: Colour,
    pub hands: [Hand; 2],
    pub move_count: u32,
}

pub const STARTPOS: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

impl Sfen {
    pub fn parse(text: &str) -> Result<Self, SfenParseError> {
        let mut parts = text.split_ascii_whitespace();

        let board_part = parts.next().ok_or(SfenParseError::MissingBoard)?;
        let board = parse_board(board_part)?;

        let side = match parts.next() {
            Some("b") => Colour::Black,
            Some("w") => Colour::White,
            Some(other) => return Err(SfenParseError::InvalidSide(other.to_string())),
            None => return Err(SfenParseError::MissingSide),
        };

        let hand_part = parts.next().ok_or(SfenParseError::MissingHand)?;
        let hands = parse_hands(hand_part)?;

        // the move counter is optional in the wild; default to 1.
        let move_count = match parts.next() {
            Some(text) => text
                .parse::<u32>()
                .map_err(|_| SfenParseError::InvalidMoveCount(text.to_string()))?
                .max(1),
            None => 1,
        };

        for colour in Colour::all() {
            let kings = board
                .iter()
                .filter(|&&p| p == Some(Piece::new(colour, PieceType::King)))
                .count();
            if kings == 0 {
                return Err(SfenParseError::MissingKing { colour });
            }
            if kings > 1 {
                return Err(SfenParseError::DuplicateKings { colour });
            }
        }

        Ok(Self {
            board,
            side,
            hands,
            move_count,
        })
    }
}

fn parse_board(text: &str) -> Result<[Option<Piece>; 81], SfenParseError> {
    let ranks: Vec<&str> = text.split('/').collect();
    if ranks.len() != 9 {
        return Err(SfenParseError::BoardRanks(ranks.len()));
    }

    let mut board = [None; 81];

    for (rank_idx, rank_text) in ranks.iter().enumerate() {
        let rank = Rank::from_index(rank_idx as u8).unwrap();
        // files are written 9 down to 1.
        let mut file_idx: i32 = 8;
        let mut promoted = false;

        for c in rank_text.chars() {
            if let Some(digit) = c.to_digit(10) {
                if promoted {
                    return Err(SfenParseError::InvalidPromotion(c));
                }
                file_idx -= digit as i32;
                continue;
            }
            if c == '+' {
                if promoted {
                    return Err(SfenParseError::InvalidPromotion(c));
                }
                promoted = true;
                continue;
            }
            let Some(pt) = PieceType::from_sfen_char(c) else {
                return Err(SfenParseError::UnexpectedCharacter(c));
            };
            let pt = if promoted {
                if !pt.can_promote() {
                    return Err(SfenParseError::InvalidPromotion(c));
                }
                pt.promoted()
            } else {
                pt
            };
            promoted = false;
            let colour = if c.is_ascii_uppercase() {
                Colour::Black
            } else {
                Colour::White
            };
            if file_idx < 0 {
                return Err(SfenParseError::BadFilesInRank((*rank_text).to_string()));
            }
            let file = File::from_index(file_idx as u8).unwrap();
            board[Square::from_file_rank(file, rank).index()] = Some(Piece::new(colour, pt));
            file_idx -= 1;
        }

        if file_idx != -1 || promoted {
            return Err(SfenParseError::BadFilesInRank((*rank_text).to_string()));
        }
    }

    Ok(board)
}

fn parse_hands(text: &str) -> Result<[Hand; 2], SfenParseError> {
    let mut hands = [Hand::default(); 2];
    if text == "-" {
        return Ok(hands);
    }

    let mut count: u32 = 0;
    for c in text.chars() {
        if let Some(digit) = c.to_digit(10) {
            count = count * 10 + digit;
            continue;
        }
        let Some(pt) = PieceType::from_sfen_char(c) else {
            return Err(SfenParseError::InvalidHand(text.to_string()));
        };
        if pt == PieceType::King {
            return Err(SfenParseError::InvalidHand(text.to_string()));
        }
        let colour = if c.is_ascii_uppercase() {
            Colour::Black
        } else {
            Colour::White
        };
        let count_here = count.max(1);
        if count_here > pt.hand_limit() {
            return Err(SfenParseError::HandCountTooLarge {
                piece: c,
                max: pt.hand_limit(),
            });
        }
        hands[colour].set(pt, count_here);
        count = 0;
    }
    if count != 0 {
        return Err(SfenParseError::InvalidHand(text.to_string()));
    }

    Ok(hands)
}

/// Formats piece placement / side / hands / counter back into SFEN.
pub fn format_sfen(
    board: &[Option<Piece>; 81],
    side: Colour,
    hands: &[Hand; 2],
    move_count: u32,
) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(80);
    for rank in Rank::all() {
        let mut empties = 0;
        for file in File::all().rev() {
            match board[Square::from_file_rank(file, rank).index()] {
                None => empties += 1,
                Some(piece) => {
                    if empties > 0 {
                        write!(out, "{empties}").unwrap();
                        empties = 0;
                    }
                    write!(out, "{piece}").unwrap();
                }
            }
        }
        if empties > 0 {
            write!(out, "{empties}").unwrap();
        }
        if rank != Rank::I {
            out.push('/');
        }
    }

    out.push(' ');
    out.push(if side == Colour::Black { 'b' } else { 'w' });
    out.push(' ');

    if hands[0].empty() && hands[1].empty() {
        out.push('-');
    } else {
        write!(out, "{}", hands[Colour::Black]).unwrap();
        write!(out, "{}", hands[Colour::White].to_string().to_lowercase()).unwrap();
    }

    write!(out, " {move_count}").unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trip() {
        let sfen = Sfen::parse(STARTPOS).unwrap();
        assert_eq!(sfen.side, Colour::Black);
        assert!(sfen.hands[0].empty() && sfen.hands[1].empty());
        assert_eq!(sfen.move_count, 1);
        assert_eq!(
            format_sfen(&sfen.board, sfen.side, &sfen.hands, sfen.move_count),
            STARTPOS
        );
    }

    #[test]
    fn startpos_piece_placement() {
        let sfen = Sfen::parse(STARTPOS).unwrap();
        let at = |name: &str| sfen.board[name.parse::<Square>().unwrap().index()];
        assert_eq!(at("5i"), Some(Piece::BK));
        assert_eq!(at("5a"), Some(Piece::WK));
        assert_eq!(at("2h"), Some(Piece::BR));
        assert_eq!(at("8h"), Some(Piece::BB));
        assert_eq!(at("8b"), Some(Piece::WR));
        assert_eq!(at("2b"), Some(Piece::WB));
        assert_eq!(at("7g"), Some(Piece::BP));
        assert_eq!(at("5e"), None);
        assert_eq!(at("9i"), Some(Piece::BL));
        assert_eq!(at("1a"), Some(Piece::WL));
    }

    #[test]
    fn hands_parse() {
        let sfen = Sfen::parse("9/9/9/9/4k4/9/9/9/4K4 b S2Pb3p 42").unwrap();
        assert_eq!(sfen.hands[Colour::Black].count(PieceType::Silver), 1);
        assert_eq!(sfen.hands[Colour::Black].count(PieceType::Pawn), 2);
        assert_eq!(sfen.hands[Colour::White].count(PieceType::Bishop), 1);
        assert_eq!(sfen.hands[Colour::White].count(PieceType::Pawn), 3);
        assert_eq!(sfen.move_count, 42);
        assert_eq!(
            format_sfen(&sfen.board, sfen.side, &sfen.hands, sfen.move_count),
            "9/9/9/9/4k4/9/9/9/4K4 b S2Pb3p 42"
        );
    }

    #[test]
    fn promoted_pieces_parse() {
        let sfen = Sfen::parse("9/9/4+P4/9/4k4/9/9/9/4K4 b - 1").unwrap();
        let at = |name: &str| sfen.board[name.parse::<Square>().unwrap().index()];
        assert_eq!(at("5c"), Some(Piece::BPP));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            Sfen::parse(""),
            Err(SfenParseError::MissingBoard)
        ));
        assert!(matches!(
            Sfen::parse("9/9/9/9/9/9/9/9 b - 1"),
            Err(SfenParseError::BoardRanks(8))
        ));
        assert!(matches!(
            Sfen::parse("9/9/9/9/4k4/9/9/9/4K4 x - 1"),
            Err(SfenParseError::InvalidSide(_))
        ));
        assert!(matches!(
            Sfen::parse("9/9/9/9/9/9/9/9/9 b - 1"),
            Err(SfenParseError::MissingKing { .. })
        ));
        assert!(matches!(
            Sfen::parse("9/9/9/9/4k4/9/9/9/4K4 b 19P 1"),
            Err(SfenParseError::HandCountTooLarge { .. })
        ));
        assert!(matches!(
            Sfen::parse("9/9/4+G4/9/4k4/9/9/9/4K4 b - 1"),
            Err(SfenParseError::InvalidPromotion(_))
        ));
    }
}

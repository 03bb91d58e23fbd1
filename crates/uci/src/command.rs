//! Lines the GUI sends to the engine.

use crate::UciError;

/// One parsed GUI line.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiCommand {
    Uci,
    IsReady,
    /// The next position belongs to a different game.
    UciNewGame,
    SetOption { name: String, value: Option<String> },
    /// `fen: None` means the standard start.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoOptions),
    Stop,
    Quit,
    /// Anything else, kept verbatim so the engine can report it.
    Unknown(String),
}

/// Limits carried by `go`. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoOptions {
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    /// Moves left before the next time control.
    pub movestogo: Option<u32>,
    /// Run until `stop`.
    pub infinite: bool,
    /// Count leaf nodes to this depth instead of searching.
    pub perft: Option<u32>,
}

impl GuiCommand {
    /// Parses one line. Unrecognised keywords become [`GuiCommand::Unknown`];
    /// recognised ones with malformed arguments are errors.
    pub fn parse(line: &str) -> Result<Self, UciError> {
        let line = line.trim();
        let mut tokens = line.split_whitespace();

        match tokens.next().unwrap_or("") {
            "uci" => Ok(GuiCommand::Uci),
            "isready" => Ok(GuiCommand::IsReady),
            "ucinewgame" => Ok(GuiCommand::UciNewGame),
            "setoption" => Self::parse_setoption(tokens),
            "stop" => Ok(GuiCommand::Stop),
            "quit" => Ok(GuiCommand::Quit),
            "position" => Self::parse_position(tokens),
            "go" => Self::parse_go(tokens),
            _ => Ok(GuiCommand::Unknown(line.to_string())),
        }
    }

    /// `setoption name <id...> [value <x...>]`; names may contain spaces.
    fn parse_setoption<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        if tokens.next() != Some("name") {
            return Err(UciError::ParseError(
                "setoption: expected 'name'".to_string(),
            ));
        }

        let mut name = Vec::new();
        let mut value = None;
        for token in tokens.by_ref() {
            if token == "value" {
                value = Some(tokens.collect::<Vec<_>>().join(" "));
                break;
            }
            name.push(token);
        }

        if name.is_empty() {
            return Err(UciError::ParseError(
                "setoption: missing option name".to_string(),
            ));
        }
        Ok(GuiCommand::SetOption {
            name: name.join(" "),
            value,
        })
    }

    fn parse_position<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        let fen = match tokens.next() {
            Some("startpos") => {
                match tokens.next() {
                    None | Some("moves") => {}
                    Some(other) => {
                        return Err(UciError::ParseError(format!(
                            "position: expected 'moves', got '{}'",
                            other
                        )))
                    }
                }
                None
            }
            Some("fen") => {
                let fen_fields: Vec<&str> = tokens.by_ref().take_while(|&p| p != "moves").collect();
                if fen_fields.is_empty() {
                    return Err(UciError::ParseError("position: empty FEN".to_string()));
                }
                Some(fen_fields.join(" "))
            }
            Some(other) => {
                return Err(UciError::ParseError(format!(
                    "position: expected 'startpos' or 'fen', got '{}'",
                    other
                )));
            }
            None => {
                return Err(UciError::ParseError(
                    "position: expected 'startpos' or 'fen'".to_string(),
                ));
            }
        };

        let moves = tokens.map(str::to_string).collect();
        Ok(GuiCommand::Position { fen, moves })
    }

    fn parse_go<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Self, UciError> {
        fn value<T: std::str::FromStr>(key: &str, raw: Option<&str>) -> Result<Option<T>, UciError> {
            let raw = raw.ok_or_else(|| UciError::ParseError(format!("go: '{}' needs a value", key)))?;
            raw.parse()
                .map(Some)
                .map_err(|_| UciError::ParseError(format!("go: bad value '{}' for '{}'", raw, key)))
        }

        let mut limits = GoOptions::default();
        let mut tokens = tokens.peekable();

        while let Some(key) = tokens.next() {
            match key {
                "movetime" => limits.movetime = value(key, tokens.next())?,
                "depth" => limits.depth = value(key, tokens.next())?,
                "wtime" => limits.wtime = value(key, tokens.next())?,
                "btime" => limits.btime = value(key, tokens.next())?,
                "winc" => limits.winc = value(key, tokens.next())?,
                "binc" => limits.binc = value(key, tokens.next())?,
                "movestogo" => limits.movestogo = value(key, tokens.next())?,
                "perft" => limits.perft = value(key, tokens.next())?,
                "infinite" => limits.infinite = true,
                // Options this engine ignores, some with a value.
                "nodes" | "mate" => {
                    tokens.next();
                }
                "ponder" => {}
                "searchmoves" => {
                    while tokens.peek().is_some_and(|p| p.len() >= 4 && p.len() <= 5) {
                        tokens.next();
                    }
                }
                other => {
                    return Err(UciError::ParseError(format!("go: unknown option '{}'", other)));
                }
            }
        }

        Ok(GuiCommand::Go(limits))
    }
}

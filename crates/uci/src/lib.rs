//! Text protocol spoken between a chess GUI and an engine.
//!
//! [`GuiCommand`] parses what the GUI sends. [`EngineMessage`] renders what
//! the engine answers. [`UciEngine`] ties both to a reader and writer, and its
//! [`UciSender`] can be cloned into a search thread.
//!
//! Understood from the GUI: `uci`, `isready`, `ucinewgame`,
//! `setoption name <id> [value <x>]`, `position startpos|fen <fen> [moves ...]`,
//! `go` with clock, depth, movetime, infinite or perft limits, `stop`, `quit`.

mod command;
mod info;

pub use command::{GoOptions, GuiCommand};
pub use info::{EngineInfo, InfoBuilder, Score};

use std::fmt;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UciError {
    #[error("malformed command: {0}")]
    ParseError(String),
    #[error("protocol I/O failed: {0}")]
    IoError(#[from] std::io::Error),
    #[error("output writer lock poisoned")]
    Poisoned,
}

/// Type of an option declared in reply to `uci`.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    Spin { default: i64, min: i64, max: i64 },
    Button,
}

/// An `option name ... type ...` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOption {
    pub name: String,
    pub kind: OptionKind,
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "option name {} type ", self.name)?;
        match self.kind {
            OptionKind::Spin { default, min, max } => {
                write!(f, "spin default {} min {} max {}", default, min, max)
            }
            OptionKind::Button => f.write_str("button"),
        }
    }
}

/// Engine to GUI traffic. `Id` renders as two lines, everything else as one.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineMessage {
    Id { name: String, author: String },
    Option(EngineOption),
    UciOk,
    ReadyOk,
    Info(EngineInfo),
    /// `mv` is `0000` when there is no legal move.
    BestMove { mv: String, ponder: Option<String> },
}

impl EngineMessage {
    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EngineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMessage::Id { name, author } => {
                write!(f, "id name {}\nid author {}", name, author)
            }
            EngineMessage::Option(option) => fmt::Display::fmt(option, f),
            EngineMessage::UciOk => f.write_str("uciok"),
            EngineMessage::ReadyOk => f.write_str("readyok"),
            EngineMessage::Info(info) => fmt::Display::fmt(info, f),
            EngineMessage::BestMove { mv, ponder } => {
                write!(f, "bestmove {}", mv)?;
                if let Some(reply) = ponder {
                    write!(f, " ponder {}", reply)?;
                }
                Ok(())
            }
        }
    }
}

/// Output half of a UCI connection.
///
/// Clones share one writer, so a search thread can report `info` and
/// `bestmove` while the main loop keeps answering `isready`. Each message is
/// written and flushed under the lock, so lines never interleave.
pub struct UciSender<W: Write> {
    writer: Arc<Mutex<W>>,
}

impl<W: Write> Clone for UciSender<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W: Write> UciSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Writes one message and flushes.
    pub fn send(&self, msg: &EngineMessage) -> Result<(), UciError> {
        let mut writer = self.writer.lock().map_err(|_| UciError::Poisoned)?;
        writeln!(writer, "{}", msg)?;
        writer.flush()?;
        Ok(())
    }

    pub fn send_id(&self, name: &str, author: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::Id {
            name: name.to_string(),
            author: author.to_string(),
        })
    }

    /// Declare a supported option.
    pub fn send_option(&self, name: &str, kind: OptionKind) -> Result<(), UciError> {
        self.send(&EngineMessage::Option(EngineOption {
            name: name.to_string(),
            kind,
        }))
    }

    pub fn send_uciok(&self) -> Result<(), UciError> {
        self.send(&EngineMessage::UciOk)
    }

    pub fn send_readyok(&self) -> Result<(), UciError> {
        self.send(&EngineMessage::ReadyOk)
    }

    pub fn send_bestmove(&self, mv: &str) -> Result<(), UciError> {
        self.send(&EngineMessage::BestMove {
            mv: mv.to_string(),
            ponder: None,
        })
    }

    pub fn send_info(&self, info: EngineInfo) -> Result<(), UciError> {
        self.send(&EngineMessage::Info(info))
    }

    /// Send a free-text `info string` line.
    pub fn send_string(&self, text: &str) -> Result<(), UciError> {
        self.send_info(InfoBuilder::new().string(text).build())
    }
}

/// UCI engine connection: a command reader plus a shareable sender.
pub struct UciEngine<R: BufRead, W: Write> {
    reader: R,
    sender: UciSender<W>,
}

impl<R: BufRead, W: Write> UciEngine<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            sender: UciSender::new(writer),
        }
    }

    /// Read and parse the next command from the GUI.
    ///
    /// Returns `Ok(None)` once input is exhausted. A line that fails to
    /// parse is returned as an error and does not end the stream.
    pub fn read_command(&mut self) -> Result<Option<GuiCommand>, UciError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        GuiCommand::parse(&line).map(Some)
    }

    /// Handle for writing to the GUI.
    pub fn sender(&self) -> &UciSender<W> {
        &self.sender
    }
}

/// A connection over the process's stdin and stdout.
pub fn stdio_engine() -> UciEngine<std::io::BufReader<std::io::Stdin>, std::io::Stdout> {
    UciEngine::new(std::io::BufReader::new(std::io::stdin()), std::io::stdout())
}

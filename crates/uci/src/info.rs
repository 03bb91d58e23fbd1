//! `info` lines reported while a search runs.

use std::fmt;

/// Evaluation attached to an info line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns from the side to move's point of view.
    Cp(i32),
    /// Full moves to mate; negative when the side to move is being mated.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Cp(cp) => write!(f, "cp {}", cp),
            Score::Mate(moves) => write!(f, "mate {}", moves),
        }
    }
}

/// One `info` report. Unset fields are left off the line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub score: Option<Score>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    /// Milliseconds since the search started.
    pub time: Option<u64>,
    /// Table occupancy in permille.
    pub hashfull: Option<u32>,
    pub pv: Vec<String>,
    /// Free text. It runs to the end of the line, so it is written last.
    pub string: Option<String>,
}

impl EngineInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("info")?;
        let counters = [
            ("depth", self.depth.map(u64::from)),
            ("seldepth", self.seldepth.map(u64::from)),
        ];
        for (key, value) in counters {
            if let Some(value) = value {
                write!(f, " {} {}", key, value)?;
            }
        }
        if let Some(score) = self.score {
            write!(f, " score {}", score)?;
        }
        let counters = [
            ("nodes", self.nodes),
            ("nps", self.nps),
            ("time", self.time),
            ("hashfull", self.hashfull.map(u64::from)),
        ];
        for (key, value) in counters {
            if let Some(value) = value {
                write!(f, " {} {}", key, value)?;
            }
        }
        if !self.pv.is_empty() {
            write!(f, " pv {}", self.pv.join(" "))?;
        }
        if let Some(text) = &self.string {
            write!(f, " string {}", text)?;
        }
        Ok(())
    }
}

/// Chained construction of an [`EngineInfo`].
#[derive(Default)]
pub struct InfoBuilder(EngineInfo);

impl InfoBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(mut self, plies: u32) -> Self {
        self.0.depth = Some(plies);
        self
    }

    pub fn seldepth(mut self, plies: u32) -> Self {
        self.0.seldepth = Some(plies);
        self
    }

    pub fn score(mut self, score: Score) -> Self {
        self.0.score = Some(score);
        self
    }

    pub fn nodes(mut self, nodes: u64) -> Self {
        self.0.nodes = Some(nodes);
        self
    }

    pub fn nps(mut self, nps: u64) -> Self {
        self.0.nps = Some(nps);
        self
    }

    pub fn time(mut self, millis: u64) -> Self {
        self.0.time = Some(millis);
        self
    }

    pub fn hashfull(mut self, permille: u32) -> Self {
        self.0.hashfull = Some(permille);
        self
    }

    pub fn pv<I>(mut self, moves: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.0.pv = moves.into_iter().map(Into::into).collect();
        self
    }

    pub fn string(mut self, text: impl Into<String>) -> Self {
        self.0.string = Some(text.into());
        self
    }

    pub fn build(self) -> EngineInfo {
        self.0
    }
}

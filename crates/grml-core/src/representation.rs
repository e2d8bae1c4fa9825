//! Per-function representation state.
//!
//! Each function carries one entry per representation kind it supports. The
//! entries only hold what must survive serialization (block position and
//! flags, code text); everything derived for display is rebuilt by the
//! renderers in `grml-view`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two ways a function can be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepresentationKind {
    Block,
    Code,
}

impl fmt::Display for RepresentationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepresentationKind::Block => write!(f, "BLOCK"),
            RepresentationKind::Code => write!(f, "CODE"),
        }
    }
}

/// Position and flags of a block in the graphical editor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockState {
    pub x: f64,
    pub y: f64,
    pub protected: bool,
    pub locked: bool,
}

/// Current text of a code snippet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeState {
    pub code: String,
}

impl CodeState {
    /// Lines of the snippet.
    pub fn content(&self) -> Vec<String> {
        self.code.lines().map(str::to_string).collect()
    }

    /// Number of lines the snippet occupies. An empty snippet still takes one.
    pub fn loc(&self) -> usize {
        self.code.lines().count().max(1)
    }
}

/// Stored state of one representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Representation {
    Block(BlockState),
    Code(CodeState),
}

impl Representation {
    pub fn kind(&self) -> RepresentationKind {
        match self {
            Representation::Block(_) => RepresentationKind::Block,
            Representation::Code(_) => RepresentationKind::Code,
        }
    }

    /// A fresh representation of `kind`.
    pub fn empty(kind: RepresentationKind) -> Self {
        match kind {
            RepresentationKind::Block => Representation::Block(BlockState::default()),
            RepresentationKind::Code => Representation::Code(CodeState::default()),
        }
    }
}

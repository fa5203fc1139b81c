//! Error types for each stage of the conversion pipeline
//!
//! Every error is fatal: the pipeline stops at the first one and no output
//! is produced.

use std::path::PathBuf;

/// Tokenizer failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    /// `/*` without a matching `*/` before end of input
    #[error("unterminated block comment starting at line {line}")]
    UnterminatedComment { line: usize },
}

/// Delimiter mismatch in the `.tag ... tag.` block syntax
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed block at line {line} near `{token}`: {reason}")]
pub struct MalformedBlock {
    /// Source line of the offending token
    pub line: usize,
    /// The offending token text
    pub token: String,
    pub reason: String,
}

impl MalformedBlock {
    pub(crate) fn new(line: usize, token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            line,
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Violation of the object/part/frame structure rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("animation data is of type `{found}`; wrap it in `.object ... object.`")]
    NotAnObject { found: String },

    #[error("object must start with its name")]
    MissingObjectName,

    #[error("expected loopStart/loopEnd after the object name")]
    ExpectedLoopBounds,

    #[error("invalid number `{value}` in {context}")]
    InvalidNumber { context: String, value: String },

    #[error("value {value} in {context} does not fit in 16 bits")]
    ValueOutOfRange { context: String, value: i64 },

    #[error("loop start {start} is after loop end {end}")]
    LoopStartAfterEnd { start: u16, end: u16 },

    #[error("part 0 must be a masterpart (found `{found}`)")]
    MasterPartNotFirst { found: String },

    #[error("duplicate masterpart `{part}`")]
    DuplicateMasterPart { part: String },

    #[error("expected part, got node of type `{found}`")]
    ExpectedPart { found: String },

    #[error("part {index} has no name")]
    MissingPartName { index: usize },

    #[error("expected frame in part `{part}`, got node of type `{found}`")]
    ExpectedFrame { part: String, found: String },

    #[error("unnecessary frames after loop end in part `{part}` ({frames} frames, loop end {loop_end})")]
    TooManyFrames {
        part: String,
        frames: usize,
        loop_end: u16,
    },

    #[error("not enough frames for loop in part `{part}` ({frames} frames, loop end {loop_end})")]
    NotEnoughFrames {
        part: String,
        frames: usize,
        loop_end: u16,
    },

    #[error("missing channel `{channel}` in frame {frame} of part `{part}`")]
    MissingChannel {
        part: String,
        frame: usize,
        channel: &'static str,
    },

    #[error("channel `{channel}` in frame {frame} of part `{part}` must hold exactly one value")]
    InvalidChannelValue {
        part: String,
        frame: usize,
        channel: &'static str,
    },

    #[error("value table overflow: {len} entries do not fit a 16-bit index")]
    ValueTableOverflow { len: usize },
}

/// Any failure while converting a single animation source
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] MalformedBlock),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("failed to render tables: {0}")]
    Render(#[from] std::fmt::Error),
}

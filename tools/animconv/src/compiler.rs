//! Animation compiler (node tree -> value table + index table)
//!
//! Walks an `.object` tree, checks its structure and builds the two tables
//! the animation player reads:
//!
//! - a flat value table of 16-bit samples shared by every part, and
//! - one index row per part holding a `(count, offset)` pair per channel.
//!
//! Channels whose samples never change are stored as a single scalar
//! (`count == 1`). Animated channels reuse any identical run already in the
//! table before appending a new one.

use hashbrown::HashMap;

use crate::error::StructureError;
use crate::parser::Node;

/// Number of values per emitted table line; the table is padded to a multiple
pub const TABLE_ROW_WIDTH: usize = 12;

/// Smallest and largest value a `.hword` can hold (signed or unsigned)
const HWORD_MIN: i64 = i16::MIN as i64;
const HWORD_MAX: i64 = u16::MAX as i64;

/// A single animated property of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    X,
    Y,
    Z,
    W,
    P,
    R,
}

impl Channel {
    pub const TRANSLATION_AND_ROTATION: [Channel; 6] = [
        Channel::X,
        Channel::Y,
        Channel::Z,
        Channel::W,
        Channel::P,
        Channel::R,
    ];
    pub const ROTATION: [Channel; 3] = [Channel::W, Channel::P, Channel::R];

    /// Block tag used for this channel inside a frame
    pub fn tag(self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Z => "z",
            Channel::W => "w",
            Channel::P => "p",
            Channel::R => "r",
        }
    }
}

/// Master part (translation + rotation) or ordinary part (rotation only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Master,
    Ordinary,
}

impl PartKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "masterpart" => Some(PartKind::Master),
            "part" => Some(PartKind::Ordinary),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            PartKind::Master => "masterpart",
            PartKind::Ordinary => "part",
        }
    }

    pub fn channels(self) -> &'static [Channel] {
        match self {
            PartKind::Master => &Channel::TRANSLATION_AND_ROTATION,
            PartKind::Ordinary => &Channel::ROTATION,
        }
    }
}

/// `(count, offset)` pair pointing into the value table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// 1 for a constant channel, otherwise the number of samples
    pub count: u16,
    /// Start of the samples in the value table
    pub offset: u16,
}

/// Index table row for one part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub kind: PartKind,
    pub name: String,
    /// One entry per channel, in `PartKind::channels` order
    pub entries: Vec<IndexEntry>,
}

/// Append-only table of samples shared by all parts of an object
///
/// Values are compared as written, so `-1` and `0xFFFF` occupy separate
/// slots even though both assemble to the same `.hword`.
#[derive(Debug, Default)]
pub struct ValueTable {
    values: Vec<i32>,
    /// First position of every distinct value, for scalar reuse
    first_index: HashMap<i32, usize>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }

    /// Offset of the first occurrence of `value`, if present
    pub fn find_scalar(&self, value: i32) -> Option<usize> {
        self.first_index.get(&value).copied()
    }

    /// Offset of the first contiguous run equal to `run`, if present
    pub fn find_run(&self, run: &[i32]) -> Option<usize> {
        if run.is_empty() {
            return None;
        }
        self.values.windows(run.len()).position(|window| window == run)
    }

    /// Offset of `value`, appending it if not already in the table.
    /// The flag is true when an existing entry was reused.
    pub fn intern_scalar(&mut self, value: i32) -> (usize, bool) {
        match self.find_scalar(value) {
            Some(offset) => (offset, true),
            None => (self.push(value), false),
        }
    }

    /// Offset of `run`, appending it if no identical run exists.
    /// The flag is true when an existing run was reused.
    pub fn intern_run(&mut self, run: &[i32]) -> (usize, bool) {
        if let Some(offset) = self.find_run(run) {
            return (offset, true);
        }
        let offset = self.values.len();
        for &value in run {
            self.push(value);
        }
        (offset, false)
    }

    /// Append zeros until the length is a multiple of `width`
    pub fn pad_to_multiple(&mut self, width: usize) {
        while self.values.len() % width != 0 {
            self.push(0);
        }
    }

    pub fn into_inner(self) -> Vec<i32> {
        self.values
    }

    fn push(&mut self, value: i32) -> usize {
        let offset = self.values.len();
        self.values.push(value);
        self.first_index.entry(value).or_insert(offset);
        offset
    }
}

/// Counters describing how much the value table was compacted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileStats {
    /// Value table length before padding
    pub unpadded_len: usize,
    pub constant_channels: usize,
    pub animated_channels: usize,
    /// Constant channels that pointed at an existing value
    pub scalars_reused: usize,
    /// Animated channels that pointed at an existing run
    pub runs_reused: usize,
}

/// Output of a successful compilation, ready for rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledAnimation {
    pub name: String,
    pub loop_start: u16,
    /// Exclusive loop end (last looped frame + 1)
    pub loop_end: u16,
    /// Padded value table
    pub values: Vec<i32>,
    pub index: Vec<IndexRow>,
    pub stats: CompileStats,
}

/// Compile a parsed `.object` tree
pub fn compile(object: &Node) -> Result<CompiledAnimation, StructureError> {
    if !object.is_block("object") {
        return Err(StructureError::NotAnObject {
            found: object.kind().to_string(),
        });
    }

    let children = object.children();
    let name = children
        .first()
        .and_then(Node::as_data)
        .ok_or(StructureError::MissingObjectName)?;

    let (loop_start, loop_end) = match (children.get(1), children.get(2)) {
        (Some(start), Some(end)) if start.is_block("loopStart") && end.is_block("loopEnd") => {
            (loop_bound(start)?, loop_bound(end)?)
        }
        _ => return Err(StructureError::ExpectedLoopBounds),
    };
    if loop_end == u16::MAX {
        return Err(StructureError::ValueOutOfRange {
            context: "loopEnd".to_string(),
            value: i64::from(loop_end),
        });
    }
    if loop_start > loop_end {
        return Err(StructureError::LoopStartAfterEnd {
            start: loop_start,
            end: loop_end,
        });
    }

    let parts = &children[3..];
    match parts.first() {
        Some(first) if first.is_block("masterpart") => {}
        first => {
            return Err(StructureError::MasterPartNotFirst {
                found: first.map(|p| p.kind().to_string()).unwrap_or_default(),
            })
        }
    }

    if let Some(duplicate) = parts[1..].iter().find(|p| p.is_block("masterpart")) {
        let part = duplicate.children().first().and_then(Node::as_data);
        return Err(StructureError::DuplicateMasterPart {
            part: part.unwrap_or_default().to_string(),
        });
    }

    tracing::debug!(
        "Compiling object '{}': {} parts, loop {}..={}",
        name,
        parts.len(),
        loop_start,
        loop_end
    );

    let mut compiler = AnimCompiler::new(loop_end);
    for (index, part) in parts.iter().enumerate() {
        compiler.add_part(index, part)?;
    }

    Ok(compiler.finish(name, loop_start))
}

fn loop_bound(block: &Node) -> Result<u16, StructureError> {
    let [Node::Data(text)] = block.children() else {
        return Err(StructureError::ExpectedLoopBounds);
    };
    let value = parse_number(text).ok_or_else(|| StructureError::InvalidNumber {
        context: block.kind().to_string(),
        value: text.clone(),
    })?;
    u16::try_from(value).map_err(|_| StructureError::ValueOutOfRange {
        context: block.kind().to_string(),
        value,
    })
}

/// Parse a signed decimal or `0x` hex integer
pub fn parse_number(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            digits.parse::<i64>().ok()?
        }
        None => return None,
    };

    Some(if negative { -magnitude } else { magnitude })
}

/// Mutable state for one compilation
struct AnimCompiler {
    loop_end: u16,
    table: ValueTable,
    rows: Vec<IndexRow>,
    stats: CompileStats,
}

impl AnimCompiler {
    fn new(loop_end: u16) -> Self {
        Self {
            loop_end,
            table: ValueTable::new(),
            rows: Vec::new(),
            stats: CompileStats::default(),
        }
    }

    fn add_part(&mut self, index: usize, part: &Node) -> Result<(), StructureError> {
        let kind = match part {
            Node::Block { kind, .. } => PartKind::from_tag(kind),
            Node::Data(_) => None,
        }
        .ok_or_else(|| StructureError::ExpectedPart {
            found: part.kind().to_string(),
        })?;

        let children = part.children();
        let name = children
            .first()
            .and_then(Node::as_data)
            .ok_or(StructureError::MissingPartName { index })?;

        let frames = &children[1..];
        if let Some(bad) = frames.iter().find(|frame| !frame.is_block("frame")) {
            return Err(StructureError::ExpectedFrame {
                part: name.to_string(),
                found: bad.kind().to_string(),
            });
        }

        let wanted = usize::from(self.loop_end) + 1;
        if frames.len() > wanted {
            return Err(StructureError::TooManyFrames {
                part: name.to_string(),
                frames: frames.len(),
                loop_end: self.loop_end,
            });
        }
        if frames.len() < wanted {
            return Err(StructureError::NotEnoughFrames {
                part: name.to_string(),
                frames: frames.len(),
                loop_end: self.loop_end,
            });
        }

        warn_ignored_channels(name, kind, frames);

        let mut entries = Vec::with_capacity(kind.channels().len());
        for &channel in kind.channels() {
            let values = frames
                .iter()
                .enumerate()
                .map(|(frame_index, frame)| channel_value(name, frame_index, frame, channel))
                .collect::<Result<Vec<_>, _>>()?;
            entries.push(self.encode_channel(name, channel, &values)?);
        }

        self.rows.push(IndexRow {
            kind,
            name: name.to_string(),
            entries,
        });
        Ok(())
    }

    fn encode_channel(
        &mut self,
        part: &str,
        channel: Channel,
        values: &[i32],
    ) -> Result<IndexEntry, StructureError> {
        let constant = values.windows(2).all(|pair| pair[0] == pair[1]);

        let (count, offset, reused) = if constant {
            let (offset, reused) = self.table.intern_scalar(values[0]);
            self.stats.constant_channels += 1;
            if reused {
                self.stats.scalars_reused += 1;
            }
            (1, offset, reused)
        } else {
            let (offset, reused) = self.table.intern_run(values);
            self.stats.animated_channels += 1;
            if reused {
                self.stats.runs_reused += 1;
            }
            (values.len(), offset, reused)
        };

        tracing::debug!(
            "  {}.{}: count {} at offset {}{}",
            part,
            channel.tag(),
            count,
            offset,
            if reused { " (reused)" } else { "" }
        );

        // Every sample of the entry, not just the first, must be addressable
        let last = offset + count - 1;
        match (u16::try_from(count), u16::try_from(offset), u16::try_from(last)) {
            (Ok(count), Ok(offset), Ok(_)) => Ok(IndexEntry { count, offset }),
            _ => Err(StructureError::ValueTableOverflow {
                len: self.table.len(),
            }),
        }
    }

    fn finish(mut self, name: &str, loop_start: u16) -> CompiledAnimation {
        self.stats.unpadded_len = self.table.len();
        self.table.pad_to_multiple(TABLE_ROW_WIDTH);

        CompiledAnimation {
            name: name.to_string(),
            loop_start,
            loop_end: self.loop_end + 1,
            values: self.table.into_inner(),
            index: self.rows,
            stats: self.stats,
        }
    }
}

fn channel_value(
    part: &str,
    frame_index: usize,
    frame: &Node,
    channel: Channel,
) -> Result<i32, StructureError> {
    let block = frame
        .find_child(channel.tag())
        .ok_or_else(|| StructureError::MissingChannel {
            part: part.to_string(),
            frame: frame_index,
            channel: channel.tag(),
        })?;

    let [Node::Data(text)] = block.children() else {
        return Err(StructureError::InvalidChannelValue {
            part: part.to_string(),
            frame: frame_index,
            channel: channel.tag(),
        });
    };

    let context = || format!("{}.{} frame {}", part, channel.tag(), frame_index);
    let value = parse_number(text).ok_or_else(|| StructureError::InvalidNumber {
        context: context(),
        value: text.clone(),
    })?;
    if !(HWORD_MIN..=HWORD_MAX).contains(&value) {
        return Err(StructureError::ValueOutOfRange {
            context: context(),
            value,
        });
    }
    Ok(value as i32)
}

fn warn_ignored_channels(part: &str, kind: PartKind, frames: &[Node]) {
    for (frame_index, frame) in frames.iter().enumerate() {
        for child in frame.children() {
            let used = kind
                .channels()
                .iter()
                .any(|channel| child.is_block(channel.tag()));
            if !used {
                tracing::warn!(
                    "Ignoring `{}` in frame {} of {} '{}'",
                    child.kind(),
                    frame_index,
                    kind.tag(),
                    part
                );
            }
        }
    }
}

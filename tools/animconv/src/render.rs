//! Assembly text generator
//!
//! Renders a compiled animation as three labelled blocks of GNU assembler
//! directives: the value table, the index table and the animation header.

use std::fmt::{self, Write as FmtWrite};

use serde::Deserialize;

use crate::compiler::{CompiledAnimation, TABLE_ROW_WIDTH};

const INDENT: &str = "    ";

/// How numbers are written in the generated tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// `0x000F`, `-0x000F`
    #[default]
    Hex,
    /// `15`, `-15`
    Decimal,
}

/// Format a number for emission
///
/// Hex output is uppercase and zero-padded to at least four digits; the sign
/// of negative values goes in front of the `0x` prefix.
pub fn format_number(value: i64, format: NumberFormat) -> String {
    match format {
        NumberFormat::Decimal => value.to_string(),
        NumberFormat::Hex if value < 0 => format!("-0x{:04X}", value.unsigned_abs()),
        NumberFormat::Hex => format!("0x{:04X}", value),
    }
}

/// The three rendered blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub values: String,
    pub index: String,
    pub header: String,
}

impl fmt::Display for RenderedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}\n{}", self.values, self.index, self.header)
    }
}

/// Label names derived from the object name
struct Labels {
    values: String,
    index: String,
    anim: String,
}

impl Labels {
    fn new(object: &str) -> Self {
        Self {
            values: format!("{}_anim_values", object),
            index: format!("{}_anim_index", object),
            anim: format!("{}_anim", object),
        }
    }
}

/// Render a compiled animation
///
/// Each block ends with a newline; `Display` separates them with a blank line.
pub fn render(
    anim: &CompiledAnimation,
    format: NumberFormat,
) -> Result<RenderedOutput, fmt::Error> {
    let labels = Labels::new(&anim.name);
    Ok(RenderedOutput {
        values: render_values(anim, &labels, format)?,
        index: render_index(anim, &labels, format)?,
        header: render_header(anim, &labels, format)?,
    })
}

fn render_values(
    anim: &CompiledAnimation,
    labels: &Labels,
    format: NumberFormat,
) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "{}:", labels.values)?;

    for row in anim.values.chunks(TABLE_ROW_WIDTH) {
        let line: Vec<_> = row
            .iter()
            .map(|&v| format_number(i64::from(v), format))
            .collect();
        writeln!(output, "{}.hword {}", INDENT, line.join(", "))?;
    }

    Ok(output)
}

fn render_index(
    anim: &CompiledAnimation,
    labels: &Labels,
    format: NumberFormat,
) -> Result<String, fmt::Error> {
    let mut output = String::new();
    writeln!(output, "{}:", labels.index)?;

    for row in &anim.index {
        let line: Vec<_> = row
            .entries
            .iter()
            .flat_map(|entry| [entry.count, entry.offset])
            .map(|v| format_number(i64::from(v), format))
            .collect();
        writeln!(
            output,
            "{}.hword {} # {} {} {}",
            INDENT,
            line.join(", "),
            anim.name,
            row.kind.tag(),
            row.name
        )?;
    }

    Ok(output)
}

fn render_header(
    anim: &CompiledAnimation,
    labels: &Labels,
    format: NumberFormat,
) -> Result<String, fmt::Error> {
    let hword = |value: u16| format_number(i64::from(value), format);

    let mut output = String::new();
    writeln!(output, "{}:", labels.anim)?;
    writeln!(output, "{}.hword {} # flags", INDENT, hword(0))?;
    writeln!(output, "{}.hword {} # unk02", INDENT, hword(0))?;
    writeln!(output, "{}.hword {} # starting frame", INDENT, hword(0))?;
    writeln!(output, "{}.hword {} # loop start", INDENT, hword(anim.loop_start))?;
    writeln!(output, "{}.hword {} # loop end", INDENT, hword(anim.loop_end))?;
    writeln!(output, "{}.hword {} # unused0A", INDENT, hword(0))?;
    writeln!(output, "{}.word {} # values", INDENT, labels.values)?;
    writeln!(output, "{}.word {} # index", INDENT, labels.index)?;
    writeln!(output, "{}.word {} # length", INDENT, hword(0))?;
    Ok(output)
}

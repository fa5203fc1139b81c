//! animconv library
//!
//! Converts `.anim` part/frame descriptions into the value table, index table
//! and header an animation player reads, emitted as assembler directives.
//!
//! The pipeline is `lexer` -> `parser` -> `compiler` -> `render`. Each stage is
//! a pure function of its input; a failure at any stage aborts the conversion.

pub mod compiler;
pub mod error;
pub mod lexer;
pub mod manifest;
pub mod parser;
pub mod render;

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

pub use compiler::{compile, CompiledAnimation, IndexEntry, IndexRow, PartKind};
pub use error::{ConvertError, LexError, MalformedBlock, StructureError};
pub use lexer::tokenize;
pub use parser::{parse, Node};
pub use render::{format_number, render, NumberFormat, RenderedOutput};

/// Default extension for generated assembly files
pub const ASM_EXT: &str = "s";

/// Run the whole pipeline on source text
pub fn convert_source(source: &str, format: NumberFormat) -> Result<String, ConvertError> {
    let anim = compile_source(source)?;
    Ok(render(&anim, format)?.to_string())
}

/// Tokenize, parse and compile source text without rendering
pub fn compile_source(source: &str) -> Result<CompiledAnimation, ConvertError> {
    let tokens = tokenize(source)?;
    let tree = parse(&tokens)?;
    Ok(compile(&tree)?)
}

/// Read and compile an animation source file
pub fn compile_file(path: &Path) -> Result<CompiledAnimation, ConvertError> {
    let source = fs::read_to_string(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let anim = compile_source(&source)?;

    tracing::info!(
        "Compiled '{}' from {:?}: {} parts, {} values ({} reused scalars, {} reused runs)",
        anim.name,
        path,
        anim.index.len(),
        anim.stats.unpadded_len,
        anim.stats.scalars_reused,
        anim.stats.runs_reused
    );

    Ok(anim)
}

/// Read, compile and render an animation source file
pub fn convert_file(path: &Path, format: NumberFormat) -> Result<String, ConvertError> {
    let anim = compile_file(path)?;
    Ok(render(&anim, format)?.to_string())
}

/// Write rendered text to `output`, or to stdout when `None`
pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
            fs::write(path, text).with_context(|| format!("Failed to write output: {:?}", path))?;
            tracing::info!("Wrote {:?}", path);
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }
    Ok(())
}

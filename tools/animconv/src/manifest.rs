//! Manifest parsing and batch builds
//!
//! Parses animconv.toml and converts every listed animation.
//!
//! ```toml
//! [output]
//! dir = "build/anims"
//! format = "hex"
//!
//! [animations]
//! walk = "src/walk.anim"
//! run = { path = "src/run.anim", format = "decimal" }
//! ```

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::render::NumberFormat;
use crate::ASM_EXT;

/// Root manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub animations: HashMap<String, AnimationEntry>,
    /// Directory relative source paths resolve against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: NumberFormat,
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: NumberFormat::default(),
            extension: default_extension(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("anims/")
}

fn default_extension() -> String {
    ASM_EXT.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AnimationEntry {
    Simple(PathBuf),
    Detailed {
        path: PathBuf,
        #[serde(default)]
        format: Option<NumberFormat>,
    },
}

impl AnimationEntry {
    pub fn path(&self) -> &Path {
        match self {
            AnimationEntry::Simple(p) => p,
            AnimationEntry::Detailed { path, .. } => path,
        }
    }

    pub fn format(&self) -> Option<NumberFormat> {
        match self {
            AnimationEntry::Simple(_) => None,
            AnimationEntry::Detailed { format, .. } => *format,
        }
    }
}

impl Manifest {
    /// Source path of an entry, resolved against the manifest directory
    pub fn source_path(&self, entry: &AnimationEntry) -> PathBuf {
        self.base_dir.join(entry.path())
    }

    /// Output directory, resolved against the manifest directory
    pub fn output_dir(&self, output_override: Option<&Path>) -> PathBuf {
        match output_override {
            Some(dir) => dir.to_path_buf(),
            None => self.base_dir.join(&self.output.dir),
        }
    }

    /// Entries sorted by name, so builds and diagnostics are deterministic
    pub fn sorted_animations(&self) -> Vec<(&str, &AnimationEntry)> {
        let mut entries: Vec<_> = self
            .animations
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}

/// Load and parse a manifest file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {:?}", path))?;
    let mut manifest = parse_manifest(&content)
        .with_context(|| format!("Failed to parse manifest: {:?}", path))?;
    manifest.base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest)
}

/// Parse manifest text; relative paths resolve against the current directory
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let manifest: Manifest = toml::from_str(content)?;
    Ok(manifest)
}

/// Validate a manifest without writing anything
///
/// Every source must exist and compile.
pub fn validate(manifest: &Manifest) -> Result<()> {
    if manifest.animations.is_empty() {
        anyhow::bail!("Manifest lists no animations");
    }
    for (name, entry) in manifest.sorted_animations() {
        let source = manifest.source_path(entry);
        if !source.exists() {
            anyhow::bail!("Animation '{}' source not found: {:?}", name, source);
        }
        crate::compile_file(&source)
            .with_context(|| format!("Animation '{}' failed to compile", name))?;
    }
    Ok(())
}

/// Build all animations from a manifest
///
/// Sources are converted in parallel. Nothing is written unless every
/// animation converts.
pub fn build_all(manifest: &Manifest, output_override: Option<&Path>) -> Result<Vec<PathBuf>> {
    use rayon::prelude::*;

    let output_dir = manifest.output_dir(output_override);

    let rendered: Result<Vec<_>> = manifest
        .sorted_animations()
        .par_iter()
        .map(|(name, entry)| {
            let source = manifest.source_path(entry);
            let format = entry.format().unwrap_or(manifest.output.format);
            let text = crate::convert_file(&source, format)
                .with_context(|| format!("Failed to convert animation '{}'", name))?;
            let output = output_dir.join(format!("{}.{}", name, manifest.output.extension));
            Ok((output, text))
        })
        .collect();
    let rendered = rendered?;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut written = Vec::with_capacity(rendered.len());
    for (output, text) in rendered {
        tracing::info!("Writing {:?}", output);
        crate::write_output(&text, Some(&output))?;
        written.push(output);
    }

    Ok(written)
}

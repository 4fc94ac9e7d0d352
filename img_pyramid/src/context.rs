//! Per-conversion state
//!
//! Tracks the chain of intermediate files, the dimensions learned along the
//! way, the pyramid levels in the order they were produced, and the warnings
//! collected for the summary.

use crate::engine::ImageInfo;
use crate::error::EngineError;
use crate::params::{Compression, ConversionWarning, OutputSummary};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Intermediate file slots, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Container,
    AlphaStripped,
    GrayCorrected,
    ProfileCorrected,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::Container => 0,
            Slot::AlphaStripped => 1,
            Slot::GrayCorrected => 2,
            Slot::ProfileCorrected => 3,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Slot::Container => ".tif",
            Slot::AlphaStripped => ".noalpha.tif",
            Slot::GrayCorrected => ".grayfixed.tif",
            Slot::ProfileCorrected => ".profilefixed.tif",
        }
    }
}

/// Contents of an assigned slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotFile {
    /// Written by this conversion
    Produced(PathBuf),
    /// Step skipped; refers to the previous slot's file (or the source)
    Alias(PathBuf),
}

impl SlotFile {
    pub fn path(&self) -> &Path {
        match self {
            SlotFile::Produced(p) | SlotFile::Alias(p) => p,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, SlotFile::Alias(_))
    }
}

#[derive(Debug)]
pub struct ConversionContext {
    source: PathBuf,
    prefix: PathBuf,
    slots: Vec<SlotFile>,
    /// Original dimensions and sample depth
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    /// Level 0 dimensions
    pub output_width: u32,
    pub output_height: u32,
    levels: Vec<PathBuf>,
    warnings: Vec<ConversionWarning>,
}

impl ConversionContext {
    /// Context for converting `source`, with intermediates named
    /// `<workspace>/<source stem>*`.
    pub fn new(source: &Path, workspace: &Path) -> Self {
        let stem = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| OsString::from("image"));

        Self {
            source: source.to_path_buf(),
            prefix: workspace.join(stem),
            slots: Vec::with_capacity(4),
            width: 0,
            height: 0,
            bit_depth: 0,
            output_width: 0,
            output_height: 0,
            levels: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.prefix.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Where the step filling `slot` writes its output.
    pub fn slot_target(&self, slot: Slot) -> PathBuf {
        self.with_suffix(slot.suffix())
    }

    /// File the next stage reads: the last assigned slot, or the source.
    pub fn current(&self) -> &Path {
        self.slots
            .last()
            .map(SlotFile::path)
            .unwrap_or(self.source.as_path())
    }

    pub fn slot(&self, slot: Slot) -> Option<&SlotFile> {
        self.slots.get(slot.index())
    }

    fn push_slot(&mut self, slot: Slot, file: SlotFile) {
        debug_assert_eq!(
            slot.index(),
            self.slots.len(),
            "slot {:?} assigned out of pipeline order",
            slot
        );
        self.slots.push(file);
    }

    /// Record that `operation` wrote `slot`'s target. Fails when the file
    /// is not there.
    pub fn assign_produced(&mut self, slot: Slot, operation: &'static str) -> Result<(), EngineError> {
        let path = self.slot_target(slot);
        ensure_produced(&path, operation)?;
        self.push_slot(slot, SlotFile::Produced(path));
        Ok(())
    }

    /// Skip `slot`, aliasing whatever the previous stage produced.
    pub fn assign_alias(&mut self, slot: Slot) {
        let path = self.current().to_path_buf();
        self.push_slot(slot, SlotFile::Alias(path));
    }

    pub fn record_source_info(&mut self, info: &ImageInfo) {
        self.width = info.width;
        self.height = info.height;
        self.bit_depth = info.bit_depth;
    }

    /// File holding pyramid level `depth`.
    pub fn level_path(&self, depth: usize) -> PathBuf {
        self.with_suffix(&format!("_{}.tif", depth))
    }

    /// Record level `depth` as written by `operation`; levels must be
    /// pushed in depth order.
    pub fn push_level(&mut self, depth: usize, operation: &'static str) -> Result<(), EngineError> {
        debug_assert_eq!(depth, self.levels.len(), "level {} pushed out of order", depth);
        let path = self.level_path(depth);
        ensure_produced(&path, operation)?;
        self.levels.push(path);
        Ok(())
    }

    pub fn levels(&self) -> &[PathBuf] {
        &self.levels
    }

    pub fn warn(&mut self, warning: ConversionWarning) {
        tracing::warn!(source = ?self.source, "{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ConversionWarning] {
        &self.warnings
    }

    pub fn into_summary(self, output: &Path, compression: Compression) -> OutputSummary {
        OutputSummary {
            output: output.to_path_buf(),
            input_width: self.width,
            input_height: self.height,
            output_width: self.output_width,
            output_height: self.output_height,
            levels: self.levels.len(),
            compression,
            warnings: self.warnings,
        }
    }
}

/// An engine reporting success must have left its output behind.
pub(crate) fn ensure_produced(path: &Path, operation: &'static str) -> Result<(), EngineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EngineError::MissingOutput {
            operation,
            path: path.to_path_buf(),
        })
    }
}

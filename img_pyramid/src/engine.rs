//! Interfaces of the external image engines
//!
//! The pipeline never touches pixels itself: probing, transforming and tile
//! packing are delegated to the collaborators defined here. Production code
//! drives the command-line tools through [`crate::command_engine`].

use crate::error::EngineError;
use crate::params::Compression;
use crate::tags::Tagger;
use serde::Serialize;
use shared_utils::RenderingIntent;
use std::path::{Path, PathBuf};

/// Properties reported by the metadata probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Container format as named by the probe, e.g. `TIFF`, `JPEG`
    pub format: String,
    /// Raw channel model, e.g. `srgb`, `graya`
    pub channels: String,
    pub bit_depth: u32,
    pub frame_count: u32,
    /// Description of the embedded ICC profile, empty when there is none
    pub profile_description: String,
}

impl ImageInfo {
    /// Already a TIFF holding exactly one frame.
    pub fn is_single_frame_tiff(&self) -> bool {
        self.format.eq_ignore_ascii_case("tiff") && self.frame_count == 1
    }

    pub fn channel_model(&self) -> Option<ChannelModel> {
        ChannelModel::parse(&self.channels)
    }

    pub fn has_profile(&self) -> bool {
        !self.profile_description.is_empty()
    }
}

/// Channel models the pipeline can normalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelModel {
    Srgb,
    Gray,
    Cmyk,
    Srgba,
    Graya,
}

impl ChannelModel {
    pub fn parse(channels: &str) -> Option<Self> {
        match channels {
            "srgb" => Some(ChannelModel::Srgb),
            "gray" => Some(ChannelModel::Gray),
            "cmyk" => Some(ChannelModel::Cmyk),
            "srgba" => Some(ChannelModel::Srgba),
            "graya" => Some(ChannelModel::Graya),
            _ => None,
        }
    }

    /// `(band_start, band_count)` of the color bands to keep, for models
    /// carrying an alpha band.
    pub fn color_bands(&self) -> Option<(u32, u32)> {
        match self {
            ChannelModel::Srgba => Some((0, 3)),
            ChannelModel::Graya => Some((0, 1)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

pub const DEFAULT_TILE: TileSize = TileSize {
    width: 256,
    height: 256,
};

pub trait MetadataProbe: Send + Sync {
    /// Inspect the first frame of `path`. `magick_temp_dir` is the scratch
    /// directory for the probe's own temporary files.
    fn probe(&self, path: &Path, magick_temp_dir: Option<&Path>) -> Result<ImageInfo, EngineError>;
}

/// Pixel operations; each call reads `input` and writes a new `output`.
pub trait TransformEngine: Send + Sync {
    /// Re-encode the first frame as a single-frame TIFF.
    fn to_container_format(&self, input: &Path, output: &Path) -> Result<(), EngineError>;

    fn strip_alpha(
        &self,
        input: &Path,
        output: &Path,
        band_start: u32,
        band_count: u32,
    ) -> Result<(), EngineError>;

    /// Non-proportional resize to exactly `width` x `height`.
    fn resize_exact(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError>;

    /// Re-export at `width` x `height` while assigning `profile`.
    fn export_with_profile(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
        profile: &Path,
        intent: RenderingIntent,
    ) -> Result<(), EngineError>;

    /// Convert pixels from the embedded profile to `target_profile`.
    fn icc_transform(
        &self,
        input: &Path,
        output: &Path,
        target_profile: &Path,
        intent: RenderingIntent,
    ) -> Result<(), EngineError>;

    /// Convert the pixel data itself to sRGB truecolor.
    fn convert_to_srgb(&self, input: &Path, output: &Path) -> Result<(), EngineError>;

    fn copy_verbatim(&self, input: &Path, output: &Path) -> Result<(), EngineError>;
}

pub trait TilePacker: Send + Sync {
    /// Pack `levels` (level 0 first) into one tiled multi-resolution file.
    fn pack(
        &self,
        levels: &[PathBuf],
        output: &Path,
        compression: Compression,
        tile: TileSize,
    ) -> Result<(), EngineError>;
}

/// The engine capabilities one conversion runs against.
#[derive(Clone, Copy)]
pub struct Toolkit<'a> {
    pub probe: &'a dyn MetadataProbe,
    pub transform: &'a dyn TransformEngine,
    pub packer: &'a dyn TilePacker,
    pub tagger: &'a dyn Tagger,
}

impl<'a> Toolkit<'a> {
    /// All capabilities served by one engine.
    pub fn from_engine<E>(engine: &'a E) -> Self
    where
        E: MetadataProbe + TransformEngine + TilePacker + Tagger,
    {
        Self {
            probe: engine,
            transform: engine,
            packer: engine,
            tagger: engine,
        }
    }
}

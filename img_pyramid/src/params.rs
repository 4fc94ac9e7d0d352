//! Conversion parameters and results

use crate::tags::TagsInput;
use serde::Serialize;
use shared_utils::{check_input_output_conflict, validate_paths, PathValidationError};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Compression applied to the tiles of the packed pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Compression {
    #[default]
    None,
    Jpeg {
        quality: u8,
    },
    Lzw,
}

impl Compression {
    /// JPEG with `quality` clamped to 1..=100.
    pub fn jpeg(quality: u8) -> Self {
        Compression::Jpeg {
            quality: quality.clamp(1, 100),
        }
    }

    /// `tiffcp -c` argument, `None` when tiles stay uncompressed.
    pub fn directive(&self) -> Option<String> {
        match self {
            Compression::None => None,
            Compression::Jpeg { quality } => Some(format!("jpeg:{}", quality)),
            Compression::Lzw => Some("lzw".to_string()),
        }
    }

    /// Whether the codec can store samples of `bit_depth` bits.
    pub fn supports_bit_depth(&self, bit_depth: u32) -> bool {
        match self {
            Compression::None => true,
            _ => bit_depth <= 8,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.directive() {
            Some(d) => f.write_str(&d),
            None => f.write_str("none"),
        }
    }
}

/// What to do after converting a gray image tagged "Adobe RGB (1998)" to sRGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdobeGrayPolicy {
    /// Treat the converted image as corrected; no ICC transform follows.
    #[default]
    SkipIccTransform,
    /// Also run the generic ICC transform to the target profile.
    ApplyIccTransform,
}

/// Non-fatal conditions met during a conversion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    /// No embedded ICC profile; colors pass through unconverted
    ProfileNotAvailable { path: PathBuf },
    /// Requested compression cannot hold the source bit depth
    CompressionDisabledForBitDepth {
        bit_depth: u32,
        requested: Compression,
    },
    /// Gray image tagged with an RGB profile was converted to sRGB
    AdobeRgbGrayConverted { policy: AdobeGrayPolicy },
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionWarning::ProfileNotAvailable { path } => write!(
                f,
                "ICC profile not available for {}; profile won't be converted",
                path.display()
            ),
            ConversionWarning::CompressionDisabledForBitDepth {
                bit_depth,
                requested,
            } => write!(
                f,
                "{} compression can't handle {}-bit samples; no compression applied",
                requested, bit_depth
            ),
            ConversionWarning::AdobeRgbGrayConverted { policy } => write!(
                f,
                "gray image tagged Adobe RGB (1998) converted to sRGB ({:?})",
                policy
            ),
        }
    }
}

/// Caller-supplied description of one conversion.
#[derive(Debug, Clone)]
pub struct ConvertParams {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Long-edge bound of the top level, 0 = unbounded
    pub max_size: u32,
    pub compression: Compression,
    /// `None` uses the process-wide IIIF target profile
    pub target_icc_profile: Option<PathBuf>,
    /// Workspace for intermediate files
    pub temp_dir: PathBuf,
    /// Remove the workspace after a successful conversion
    pub delete_temp: bool,
    /// Scratch directory handed to ImageMagick
    pub magick_temp_dir: Option<PathBuf>,
    pub tags: Option<TagsInput>,
    pub adobe_gray_policy: AdobeGrayPolicy,
}

impl ConvertParams {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            max_size: 0,
            compression: Compression::jpeg(DEFAULT_JPEG_QUALITY),
            target_icc_profile: None,
            temp_dir: temp_dir.into(),
            delete_temp: false,
            magick_temp_dir: None,
            tags: None,
            adobe_gray_policy: AdobeGrayPolicy::default(),
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_target_icc_profile(mut self, profile: impl Into<PathBuf>) -> Self {
        self.target_icc_profile = Some(profile.into());
        self
    }

    pub fn with_delete_temp(mut self, delete: bool) -> Self {
        self.delete_temp = delete;
        self
    }

    pub fn with_magick_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.magick_temp_dir = Some(dir.into());
        self
    }

    pub fn with_tags(mut self, tags: TagsInput) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_adobe_gray_policy(mut self, policy: AdobeGrayPolicy) -> Self {
        self.adobe_gray_policy = policy;
        self
    }

    /// Reject paths the engines would misparse, and in-place conversions.
    pub fn validate(&self) -> Result<(), PathValidationError> {
        let mut paths: Vec<&Path> = vec![
            self.input.as_path(),
            self.output.as_path(),
            self.temp_dir.as_path(),
        ];
        if let Some(profile) = &self.target_icc_profile {
            paths.push(profile.as_path());
        }
        validate_paths(&paths)?;
        check_input_output_conflict(&self.input, &self.output)
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSummary {
    pub output: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub levels: usize,
    /// Compression actually applied, after the bit-depth override
    pub compression: Compression,
    pub warnings: Vec<ConversionWarning>,
}

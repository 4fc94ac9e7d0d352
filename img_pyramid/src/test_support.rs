//! Recording engine for tests
//!
//! Implements every engine trait, records each call with its arguments, and
//! writes a small placeholder file wherever a real engine would write output.

use crate::engine::{ImageInfo, MetadataProbe, TilePacker, TileSize, TransformEngine};
use crate::error::EngineError;
use crate::params::Compression;
use crate::tags::{Tagger, TagsInput};
use shared_utils::RenderingIntent;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe(PathBuf),
    ToContainerFormat {
        input: PathBuf,
        output: PathBuf,
    },
    StripAlpha {
        input: PathBuf,
        output: PathBuf,
        band_start: u32,
        band_count: u32,
    },
    ResizeExact {
        input: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
    },
    ExportWithProfile {
        input: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
        profile: PathBuf,
        intent: RenderingIntent,
    },
    IccTransform {
        input: PathBuf,
        output: PathBuf,
        target_profile: PathBuf,
        intent: RenderingIntent,
    },
    ConvertToSrgb {
        input: PathBuf,
        output: PathBuf,
    },
    CopyVerbatim {
        input: PathBuf,
        output: PathBuf,
    },
    Pack {
        levels: Vec<PathBuf>,
        output: PathBuf,
        compression: Compression,
        tile: TileSize,
    },
    AddTags {
        path: PathBuf,
        tags: TagsInput,
    },
    GetTag {
        path: PathBuf,
        name: String,
    },
}

impl Call {
    pub fn operation(&self) -> &'static str {
        match self {
            Call::Probe(_) => "probe",
            Call::ToContainerFormat { .. } => "to_container_format",
            Call::StripAlpha { .. } => "strip_alpha",
            Call::ResizeExact { .. } => "resize_exact",
            Call::ExportWithProfile { .. } => "export_with_profile",
            Call::IccTransform { .. } => "icc_transform",
            Call::ConvertToSrgb { .. } => "convert_to_srgb",
            Call::CopyVerbatim { .. } => "copy_verbatim",
            Call::Pack { .. } => "pack",
            Call::AddTags { .. } => "add_tags",
            Call::GetTag { .. } => "get_tag",
        }
    }
}

/// Probe result for a source image.
pub fn image(width: u32, height: u32, format: &str, channels: &str, bit_depth: u32, profile: &str) -> ImageInfo {
    ImageInfo {
        width,
        height,
        format: format.to_string(),
        channels: channels.to_string(),
        bit_depth,
        frame_count: 1,
        profile_description: profile.to_string(),
    }
}

pub struct RecordingEngine {
    source_info: ImageInfo,
    probes: Mutex<usize>,
    calls: Mutex<Vec<Call>>,
    fail_on: Option<&'static str>,
    no_output_on: Option<&'static str>,
    tags: HashMap<String, String>,
}

impl RecordingEngine {
    /// The first probe reports `source_info`; later probes report the same
    /// image as a single-frame TIFF.
    pub fn new(source_info: ImageInfo) -> Self {
        Self {
            source_info,
            probes: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
            fail_on: None,
            no_output_on: None,
            tags: HashMap::new(),
        }
    }

    /// Make `operation` return an error.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Make `operation` report success without writing its output.
    pub fn without_output_on(mut self, operation: &'static str) -> Self {
        self.no_output_on = Some(operation);
        self
    }

    /// Value `get_tag` reports for `name`.
    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::operation).collect()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.operations().iter().filter(|op| **op == operation).count()
    }

    fn record(&self, call: Call, output: Option<&Path>) -> Result<(), EngineError> {
        let operation = call.operation();
        self.calls.lock().unwrap().push(call);

        if self.fail_on == Some(operation) {
            return Err(EngineError::Failed {
                command: format!("mock {}", operation),
                exit_code: Some(1),
                stderr: "mock failure".to_string(),
            });
        }
        if let Some(path) = output {
            if self.no_output_on != Some(operation) {
                fs::write(path, operation).map_err(|source| EngineError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            }
        }
        Ok(())
    }
}

impl MetadataProbe for RecordingEngine {
    fn probe(&self, path: &Path, _magick_temp_dir: Option<&Path>) -> Result<ImageInfo, EngineError> {
        self.record(Call::Probe(path.to_path_buf()), None)?;

        let mut probes = self.probes.lock().unwrap();
        *probes += 1;
        if *probes == 1 {
            Ok(self.source_info.clone())
        } else {
            Ok(ImageInfo {
                format: "TIFF".to_string(),
                frame_count: 1,
                ..self.source_info.clone()
            })
        }
    }
}

impl TransformEngine for RecordingEngine {
    fn to_container_format(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        self.record(
            Call::ToContainerFormat {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            },
            Some(output),
        )
    }

    fn strip_alpha(
        &self,
        input: &Path,
        output: &Path,
        band_start: u32,
        band_count: u32,
    ) -> Result<(), EngineError> {
        self.record(
            Call::StripAlpha {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                band_start,
                band_count,
            },
            Some(output),
        )
    }

    fn resize_exact(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        self.record(
            Call::ResizeExact {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                width,
                height,
            },
            Some(output),
        )
    }

    fn export_with_profile(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
        profile: &Path,
        intent: RenderingIntent,
    ) -> Result<(), EngineError> {
        self.record(
            Call::ExportWithProfile {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                width,
                height,
                profile: profile.to_path_buf(),
                intent,
            },
            Some(output),
        )
    }

    fn icc_transform(
        &self,
        input: &Path,
        output: &Path,
        target_profile: &Path,
        intent: RenderingIntent,
    ) -> Result<(), EngineError> {
        self.record(
            Call::IccTransform {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
                target_profile: target_profile.to_path_buf(),
                intent,
            },
            Some(output),
        )
    }

    fn convert_to_srgb(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        self.record(
            Call::ConvertToSrgb {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            },
            Some(output),
        )
    }

    fn copy_verbatim(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        self.record(
            Call::CopyVerbatim {
                input: input.to_path_buf(),
                output: output.to_path_buf(),
            },
            Some(output),
        )
    }
}

impl TilePacker for RecordingEngine {
    fn pack(
        &self,
        levels: &[PathBuf],
        output: &Path,
        compression: Compression,
        tile: TileSize,
    ) -> Result<(), EngineError> {
        self.record(
            Call::Pack {
                levels: levels.to_vec(),
                output: output.to_path_buf(),
                compression,
                tile,
            },
            Some(output),
        )
    }
}

impl Tagger for RecordingEngine {
    fn add_tags(&self, path: &Path, tags: &TagsInput) -> Result<String, EngineError> {
        self.record(
            Call::AddTags {
                path: path.to_path_buf(),
                tags: tags.clone(),
            },
            None,
        )?;
        Ok("1 image files updated".to_string())
    }

    fn get_tag(&self, path: &Path, name: &str) -> Result<Option<String>, EngineError> {
        self.record(
            Call::GetTag {
                path: path.to_path_buf(),
                name: name.to_string(),
            },
            None,
        )?;
        Ok(self.tags.get(name).cloned())
    }
}

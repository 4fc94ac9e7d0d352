//! Conversion error types
//!
//! Every failure is reported as a [`PyramidError`] naming the pipeline stage
//! that failed; the underlying engine or I/O error stays reachable through
//! `source()`.

use shared_utils::PathValidationError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validation,
    Workspace,
    ContainerFormat,
    Probe,
    ColorspaceCheck,
    AlphaStrip,
    GrayCorrection,
    ProfileCorrection,
    InitialResize,
    LevelGeneration,
    Packing,
    Tagging,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::Workspace => "workspace",
            Stage::ContainerFormat => "container-format",
            Stage::Probe => "probe",
            Stage::ColorspaceCheck => "colorspace-check",
            Stage::AlphaStrip => "alpha-strip",
            Stage::GrayCorrection => "gray-correction",
            Stage::ProfileCorrection => "profile-correction",
            Stage::InitialResize => "initial-resize",
            Stage::LevelGeneration => "level-generation",
            Stage::Packing => "packing",
            Stage::Tagging => "tagging",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of one external engine call
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("external tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("failed to start {tool}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("unexpected output from {tool}: {detail}")]
    UnexpectedOutput { tool: String, detail: String },

    #[error("invalid {operation} request: {detail}")]
    InvalidArgument {
        operation: &'static str,
        detail: String,
    },

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{operation} reported success but {} was not produced", .path.display())]
    MissingOutput {
        operation: &'static str,
        path: PathBuf,
    },
}

/// What went wrong, independent of where
#[derive(Error, Debug)]
pub enum FailureKind {
    #[error("invalid conversion parameters")]
    InvalidPath(#[source] PathValidationError),

    #[error("metadata probe failed")]
    Probe(#[source] EngineError),

    #[error("unsupported colorspace: {channels}")]
    UnsupportedColorspace { channels: String },

    #[error("image transform failed")]
    Transform(#[source] EngineError),

    #[error("tile packing failed")]
    Pack(#[source] EngineError),

    #[error("workspace error at {}", .path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("tagging failed")]
    Tagging(#[source] EngineError),
}

/// A failed conversion: the stage that failed and why.
#[derive(Error, Debug)]
#[error("{stage} stage failed")]
pub struct PyramidError {
    pub stage: Stage,
    #[source]
    pub kind: FailureKind,
}

impl PyramidError {
    pub fn new(stage: Stage, kind: FailureKind) -> Self {
        Self { stage, kind }
    }

    pub fn transform(stage: Stage, source: EngineError) -> Self {
        Self::new(stage, FailureKind::Transform(source))
    }

    pub fn probe(source: EngineError) -> Self {
        Self::new(Stage::Probe, FailureKind::Probe(source))
    }

    pub fn pack(source: EngineError) -> Self {
        Self::new(Stage::Packing, FailureKind::Pack(source))
    }

    pub fn unsupported_colorspace(channels: impl Into<String>) -> Self {
        Self::new(
            Stage::ColorspaceCheck,
            FailureKind::UnsupportedColorspace {
                channels: channels.into(),
            },
        )
    }

    pub fn workspace(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::new(
            Stage::Workspace,
            FailureKind::Workspace {
                path: path.into(),
                source,
            },
        )
    }

    pub fn is_unsupported_colorspace(&self) -> bool {
        matches!(self.kind, FailureKind::UnsupportedColorspace { .. })
    }
}

pub type Result<T> = std::result::Result<T, PyramidError>;

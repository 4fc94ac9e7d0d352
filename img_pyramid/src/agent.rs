//! Conversion agent
//!
//! Public entry point: sets up the workspace, runs normalization and the
//! pyramid builder, tags the result and cleans up.

use crate::context::ConversionContext;
use crate::engine::Toolkit;
use crate::error::{FailureKind, PyramidError, Result, Stage};
use crate::normalize::{normalize, NormalizeOptions};
use crate::params::{ConvertParams, OutputSummary};
use crate::pyramid::build_pyramid;
use shared_utils::{log_operation_end, read_profile_description, ToolConfig};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, warn};

/// Converts images to pyramidal TIFF against one set of engines.
///
/// Holds no per-conversion state, so one agent may serve concurrent
/// conversions as long as they use distinct workspaces.
pub struct PyramidAgent<'a> {
    toolkit: Toolkit<'a>,
    config: &'a ToolConfig,
}

impl<'a> PyramidAgent<'a> {
    pub fn new(toolkit: Toolkit<'a>, config: &'a ToolConfig) -> Self {
        Self { toolkit, config }
    }

    pub fn toolkit(&self) -> &Toolkit<'a> {
        &self.toolkit
    }

    pub fn convert(&self, params: &ConvertParams) -> Result<OutputSummary> {
        let start = Instant::now();
        info!(input = ?params.input, output = ?params.output, max_size = params.max_size, "BEGIN conversion");

        let result = self.run(params);
        log_operation_end("pyramid conversion", start.elapsed(), result.is_ok());

        let summary = result?;
        if params.delete_temp {
            remove_workspace(&params.temp_dir);
        }
        Ok(summary)
    }

    fn run(&self, params: &ConvertParams) -> Result<OutputSummary> {
        params
            .validate()
            .map_err(|e| PyramidError::new(Stage::Validation, FailureKind::InvalidPath(e)))?;

        create_private_dir(&params.temp_dir)
            .map_err(|e| PyramidError::workspace(&params.temp_dir, e))?;
        if let Some(dir) = &params.magick_temp_dir {
            create_private_dir(dir).map_err(|e| PyramidError::workspace(dir, e))?;
        }

        let options = self.normalize_options(params);
        let mut ctx = ConversionContext::new(&params.input, &params.temp_dir);

        let normalized = normalize(&mut ctx, &self.toolkit, &options)?;
        let compression = build_pyramid(
            &mut ctx,
            &self.toolkit,
            &normalized,
            params.max_size,
            &params.output,
            params.compression,
        )?;

        if let Some(tags) = params.tags.as_ref().filter(|t| !t.is_empty()) {
            let report = self
                .toolkit
                .tagger
                .add_tags(&params.output, tags)
                .map_err(|e| PyramidError::new(Stage::Tagging, FailureKind::Tagging(e)))?;
            info!(output = ?params.output, report = %report, "Tags applied");
        }

        let summary = ctx.into_summary(&params.output, compression);
        info!(
            input = ?params.input,
            input_width = summary.input_width,
            input_height = summary.input_height,
            output_width = summary.output_width,
            output_height = summary.output_height,
            levels = summary.levels,
            "END conversion"
        );
        Ok(summary)
    }

    fn normalize_options(&self, params: &ConvertParams) -> NormalizeOptions {
        let target_profile = params
            .target_icc_profile
            .clone()
            .unwrap_or_else(|| self.config.target_icc_profile_iiif.clone());
        log_profile_description(&target_profile);

        NormalizeOptions {
            target_profile,
            intent: self.config.intent,
            adobe_gray_policy: params.adobe_gray_policy,
            magick_temp_dir: params.magick_temp_dir.clone(),
        }
    }
}

fn log_profile_description(profile: &Path) {
    match read_profile_description(profile) {
        Ok(Some(desc)) => info!(profile = ?profile, description = %desc, "Target ICC profile"),
        Ok(None) => warn!(profile = ?profile, "Target ICC profile has no description"),
        Err(e) => warn!(profile = ?profile, error = %e, "Cannot read target ICC profile"),
    }
}

/// Create `dir` and its parents, owner-only on unix. Existing directories are fine.
fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Best effort; a failed removal never fails the conversion.
fn remove_workspace(dir: &Path) {
    match fs::remove_dir_all(dir) {
        Ok(()) => info!(dir = ?dir, "Removed workspace"),
        Err(e) => error!(dir = ?dir, error = %e, "Failed to delete temp dir"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_private_dir_is_idempotent() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("a/b/work");

        create_private_dir(&dir).unwrap();
        create_private_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_private_dir_mode() {
        use std::os::unix::fs::PermissionsExt;

        let root = TempDir::new().unwrap();
        let dir = root.path().join("work");
        create_private_dir(&dir).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_remove_missing_workspace_does_not_panic() {
        let root = TempDir::new().unwrap();
        remove_workspace(&root.path().join("never-created"));
    }
}

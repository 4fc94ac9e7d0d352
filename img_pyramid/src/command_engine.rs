//! Engine implementation over the command-line tools
//!
//! `identify` probes, `vips`/`vipsthumbnail`/`convert` transform, `tiffcp`
//! packs and `exiftool` tags. Tool locations come from [`ToolConfig`].

use crate::engine::{ImageInfo, MetadataProbe, TilePacker, TileSize, TransformEngine};
use crate::error::EngineError;
use crate::params::Compression;
use crate::tags::{parse_tag_output, tag_args, Tagger, TagsInput};
use shared_utils::{
    execute_external_command, execute_external_command_with_env, first_frame_arg,
    is_tool_available, safe_path_arg, with_save_options, ExternalCommandResult, RenderingIntent,
    ToolConfig,
};
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// `identify` format string; one line per frame, profile description last
/// since it may itself contain `|`.
pub const IDENTIFY_FORMAT: &str =
    "%w|%h|%m|%[channels]|%[bit-depth]|%n|%[profile:icc]\n";

const MAGICK_TEMPORARY_PATH: &str = "MAGICK_TEMPORARY_PATH";

/// Handle on the external tools for a run.
///
/// Acquired once before the first conversion (failing if a required tool is
/// missing) and released after the last. Shareable across threads.
#[derive(Debug)]
pub struct CommandToolkit {
    config: ToolConfig,
}

impl CommandToolkit {
    pub fn acquire(config: &ToolConfig) -> Result<Self, EngineError> {
        let missing = config.missing_tools();
        if !missing.is_empty() {
            return Err(EngineError::ToolNotFound {
                tool: missing.join(", "),
            });
        }
        info!(
            vips = ?config.vips,
            tiffcp = ?config.tiffcp,
            identify = ?config.identify,
            "External tools acquired"
        );
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn release(self) {
        debug!("External tools released");
    }

    fn run(&self, tool: &Path, args: &[String]) -> Result<ExternalCommandResult, EngineError> {
        checked(tool, execute_external_command(tool, args))
    }

    fn run_with_env(
        &self,
        tool: &Path,
        args: &[String],
        envs: &[(&str, &OsStr)],
    ) -> Result<ExternalCommandResult, EngineError> {
        checked(tool, execute_external_command_with_env(tool, args, envs))
    }
}

/// Map a spawn failure or a non-zero exit to an [`EngineError`].
fn checked(
    tool: &Path,
    result: io::Result<ExternalCommandResult>,
) -> Result<ExternalCommandResult, EngineError> {
    let result = result.map_err(|e| spawn_error(tool, e))?;
    if !result.success() {
        return Err(EngineError::Failed {
            command: result.command,
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        });
    }
    Ok(result)
}

fn spawn_error(tool: &Path, err: io::Error) -> EngineError {
    let tool = tool.display().to_string();
    if err.kind() == io::ErrorKind::NotFound {
        EngineError::ToolNotFound { tool }
    } else {
        EngineError::Spawn { tool, source: err }
    }
}

fn path_arg(path: &Path) -> String {
    safe_path_arg(path).into_owned()
}

fn size_arg(width: u32, height: u32) -> String {
    format!("{}x{}", width, height)
}

/// Parse the first line of `identify -format IDENTIFY_FORMAT` output.
pub fn parse_identify_output(output: &str) -> Result<ImageInfo, EngineError> {
    let unexpected = |detail: String| EngineError::UnexpectedOutput {
        tool: "identify".to_string(),
        detail,
    };

    let line = output
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| unexpected("empty output".to_string()))?;

    let fields: Vec<&str> = line.splitn(7, '|').collect();
    if fields.len() < 6 {
        return Err(unexpected(format!("malformed line: {}", line)));
    }

    let number = |name: &str, value: &str| -> Result<u32, EngineError> {
        value
            .trim()
            .parse::<u32>()
            .map_err(|_| unexpected(format!("invalid {}: {:?}", name, value)))
    };

    // ImageMagick 7 appends the channel count ("srgb  3.0")
    let channels = fields[3]
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    let frame_count = match fields[5].trim() {
        "" => 1,
        n => number("frame count", n)?,
    };

    Ok(ImageInfo {
        width: number("width", fields[0])?,
        height: number("height", fields[1])?,
        format: fields[2].trim().to_string(),
        channels,
        bit_depth: number("bit depth", fields[4])?,
        frame_count,
        profile_description: fields.get(6).map(|p| p.trim().to_string()).unwrap_or_default(),
    })
}

/// `tiffcp` arguments packing `levels` into `output`.
pub fn tiffcp_args(
    levels: &[PathBuf],
    output: &Path,
    compression: Compression,
    tile: TileSize,
) -> Vec<String> {
    let mut args = Vec::with_capacity(levels.len() + 8);
    if let Some(directive) = compression.directive() {
        args.push("-c".to_string());
        args.push(directive);
    }
    args.push("-t".to_string());
    args.push("-w".to_string());
    args.push(tile.width.to_string());
    args.push("-l".to_string());
    args.push(tile.height.to_string());
    args.extend(levels.iter().map(|p| path_arg(p)));
    args.push(path_arg(output));
    args
}

impl MetadataProbe for CommandToolkit {
    fn probe(&self, path: &Path, magick_temp_dir: Option<&Path>) -> Result<ImageInfo, EngineError> {
        let args = vec![
            "-format".to_string(),
            IDENTIFY_FORMAT.to_string(),
            path_arg(path),
        ];
        let envs: Vec<(&str, &OsStr)> = magick_temp_dir
            .map(|dir| vec![(MAGICK_TEMPORARY_PATH, dir.as_os_str())])
            .unwrap_or_default();

        let result = self.run_with_env(&self.config.identify, &args, &envs)?;
        parse_identify_output(&result.stdout)
    }
}

impl TransformEngine for CommandToolkit {
    fn to_container_format(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        let args = vec!["tiffsave".to_string(), first_frame_arg(input), path_arg(output)];
        self.run(&self.config.vips, &args).map(|_| ())
    }

    fn strip_alpha(
        &self,
        input: &Path,
        output: &Path,
        band_start: u32,
        band_count: u32,
    ) -> Result<(), EngineError> {
        let args = vec![
            "extract_band".to_string(),
            path_arg(input),
            path_arg(output),
            band_start.to_string(),
            "--n".to_string(),
            band_count.to_string(),
        ];
        self.run(&self.config.vips, &args).map(|_| ())
    }

    fn resize_exact(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), EngineError> {
        let args = vec![
            path_arg(input),
            "--size".to_string(),
            format!("{}!", size_arg(width, height)),
            "-o".to_string(),
            with_save_options(output, "compression=none"),
        ];
        self.run(&self.config.vips_thumbnail, &args).map(|_| ())
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
        let args = vec![
            path_arg(input),
            format!("--eprofile={}", profile.display()),
            "--size".to_string(),
            size_arg(width, height),
            "--intent".to_string(),
            intent.as_vips_arg().to_string(),
            "-o".to_string(),
            with_save_options(output, "compression=none,strip"),
        ];
        self.run(&self.config.vips_thumbnail, &args).map(|_| ())
    }

    fn icc_transform(
        &self,
        input: &Path,
        output: &Path,
        target_profile: &Path,
        intent: RenderingIntent,
    ) -> Result<(), EngineError> {
        let args = vec![
            "icc_transform".to_string(),
            first_frame_arg(input),
            with_save_options(output, "compression=none"),
            path_arg(target_profile),
            "--embedded".to_string(),
            "--intent".to_string(),
            intent.as_vips_arg().to_string(),
        ];
        self.run(&self.config.vips, &args).map(|_| ())
    }

    fn convert_to_srgb(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        let args = vec![
            "-colorspace".to_string(),
            "srgb".to_string(),
            "-type".to_string(),
            "truecolor".to_string(),
            path_arg(input),
            path_arg(output),
        ];
        self.run(&self.config.convert, &args).map(|_| ())
    }

    fn copy_verbatim(&self, input: &Path, output: &Path) -> Result<(), EngineError> {
        std::fs::copy(input, output)
            .map(|bytes| debug!(from = ?input, to = ?output, bytes, "Copied verbatim"))
            .map_err(|source| EngineError::Io {
                path: output.to_path_buf(),
                source,
            })
    }
}

impl TilePacker for CommandToolkit {
    fn pack(
        &self,
        levels: &[PathBuf],
        output: &Path,
        compression: Compression,
        tile: TileSize,
    ) -> Result<(), EngineError> {
        if levels.is_empty() {
            return Err(EngineError::InvalidArgument {
                operation: "pack",
                detail: "no level files".to_string(),
            });
        }
        let args = tiffcp_args(levels, output, compression, tile);
        self.run(&self.config.tiffcp, &args).map(|_| ())
    }
}

impl Tagger for CommandToolkit {
    fn add_tags(&self, path: &Path, tags: &TagsInput) -> Result<String, EngineError> {
        if !is_tool_available(&self.config.exiftool) {
            return Err(EngineError::ToolNotFound {
                tool: self.config.exiftool.display().to_string(),
            });
        }
        let mut args = tag_args(tags);
        args.push("-overwrite_original".to_string());
        args.push(path_arg(path));

        let result = self.run(&self.config.exiftool, &args)?;
        Ok(result.stdout.trim().to_string())
    }

    fn get_tag(&self, path: &Path, name: &str) -> Result<Option<String>, EngineError> {
        let args = vec![format!("-{}", name), path_arg(path)];
        let result = self.run(&self.config.exiftool, &args)?;
        Ok(parse_tag_output(&result.stdout))
    }
}

//! External Tools Module
//!
//! Locations of the external programs the pyramid pipeline drives, and the
//! process-wide defaults that go with them. Built once at startup, then only
//! read.
//!
//! Every value can be overridden through an environment variable; an unset or
//! empty variable falls back to the default.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_TEMP_DIR: &str = "PYRAMID_TEMP_DIR";
pub const ENV_IDENTIFY: &str = "IDENTIFY";
pub const ENV_CONVERT: &str = "CONVERT";
pub const ENV_TIFFCP: &str = "TIFFCP";
pub const ENV_VIPS: &str = "VIPS";
pub const ENV_VIPS_THUMBNAIL: &str = "VIPS_THUMBNAIL";
pub const ENV_EXIFTOOL: &str = "EXIFTOOL";
pub const ENV_TARGET_ICC_PROFILE_IIIF: &str = "TARGET_ICC_PROFILE_IIIF";
pub const ENV_TARGET_ICC_PROFILE_TIFF: &str = "TARGET_ICC_PROFILE_TIFF";
pub const ENV_ICC_INTENT: &str = "PYRAMID_ICC_INTENT";

/// ICC rendering intent, fixed per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingIntent {
    #[default]
    Perceptual,
    Relative,
}

impl RenderingIntent {
    /// Value understood by `vips --intent` / `vipsthumbnail --intent`
    pub fn as_vips_arg(&self) -> &'static str {
        match self {
            RenderingIntent::Perceptual => "perceptual",
            RenderingIntent::Relative => "relative",
        }
    }
}

impl fmt::Display for RenderingIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_vips_arg())
    }
}

impl FromStr for RenderingIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perceptual" => Ok(RenderingIntent::Perceptual),
            "relative" | "relative-colorimetric" => Ok(RenderingIntent::Relative),
            other => Err(format!("unknown rendering intent: {}", other)),
        }
    }
}

/// Tool locations and process-wide defaults.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Default workspace for temporary files
    pub temp_dir: PathBuf,
    /// ImageMagick `identify`
    pub identify: PathBuf,
    /// ImageMagick `convert`
    pub convert: PathBuf,
    /// libtiff `tiffcp`
    pub tiffcp: PathBuf,
    pub vips: PathBuf,
    pub vips_thumbnail: PathBuf,
    pub exiftool: PathBuf,
    /// Target profile for pyramidal TIFFs served over IIIF
    pub target_icc_profile_iiif: PathBuf,
    /// Target profile for downloadable TIFFs
    pub target_icc_profile_tiff: PathBuf,
    pub intent: RenderingIntent,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("img-pyramid"),
            identify: PathBuf::from("identify"),
            convert: PathBuf::from("convert"),
            tiffcp: PathBuf::from("tiffcp"),
            vips: PathBuf::from("vips"),
            vips_thumbnail: PathBuf::from("vipsthumbnail"),
            exiftool: PathBuf::from("exiftool"),
            target_icc_profile_iiif: PathBuf::from("/opt/shared/img-pyramid/sRGBProfile.icc"),
            target_icc_profile_tiff: PathBuf::from("/opt/shared/img-pyramid/AdobeRGB1998.icc"),
            intent: RenderingIntent::Perceptual,
        }
    }
}

impl ToolConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let path_or = |name: &str, default: PathBuf| get(name).map(PathBuf::from).unwrap_or(default);

        let intent = match get(ENV_ICC_INTENT) {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                tracing::warn!(value = %raw, error = %e, "Ignoring invalid rendering intent");
                defaults.intent
            }),
            None => defaults.intent,
        };

        Self {
            temp_dir: path_or(ENV_TEMP_DIR, defaults.temp_dir),
            identify: path_or(ENV_IDENTIFY, defaults.identify),
            convert: path_or(ENV_CONVERT, defaults.convert),
            tiffcp: path_or(ENV_TIFFCP, defaults.tiffcp),
            vips: path_or(ENV_VIPS, defaults.vips),
            vips_thumbnail: path_or(ENV_VIPS_THUMBNAIL, defaults.vips_thumbnail),
            exiftool: path_or(ENV_EXIFTOOL, defaults.exiftool),
            target_icc_profile_iiif: path_or(
                ENV_TARGET_ICC_PROFILE_IIIF,
                defaults.target_icc_profile_iiif,
            ),
            target_icc_profile_tiff: path_or(
                ENV_TARGET_ICC_PROFILE_TIFF,
                defaults.target_icc_profile_tiff,
            ),
            intent,
        }
    }

    /// The programs the conversion pipeline cannot run without.
    pub fn required_tools(&self) -> [(&'static str, &Path); 5] {
        [
            ("identify", self.identify.as_path()),
            ("convert", self.convert.as_path()),
            ("tiffcp", self.tiffcp.as_path()),
            ("vips", self.vips.as_path()),
            ("vipsthumbnail", self.vips_thumbnail.as_path()),
        ]
    }

    /// Names of required tools that cannot be located.
    pub fn missing_tools(&self) -> Vec<String> {
        self.required_tools()
            .iter()
            .filter(|(_, path)| !is_tool_available(path))
            .map(|(name, path)| format!("{} ({})", name, path.display()))
            .collect()
    }
}

/// Whether `tool` resolves to an executable, either as an explicit path or
/// through `PATH`.
pub fn is_tool_available(tool: &Path) -> bool {
    if tool.components().count() > 1 {
        tool.is_file()
    } else {
        which::which(tool).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = ToolConfig::from_lookup(|_| None);
        assert_eq!(config.vips, PathBuf::from("vips"));
        assert_eq!(config.tiffcp, PathBuf::from("tiffcp"));
        assert_eq!(config.intent, RenderingIntent::Perceptual);
    }

    #[test]
    fn test_environment_overrides() {
        let config = ToolConfig::from_lookup(lookup_from(&[
            (ENV_VIPS, "/opt/vips/bin/vips"),
            (ENV_TARGET_ICC_PROFILE_IIIF, "/etc/icc/sRGB.icc"),
            (ENV_ICC_INTENT, "relative"),
        ]));
        assert_eq!(config.vips, PathBuf::from("/opt/vips/bin/vips"));
        assert_eq!(
            config.target_icc_profile_iiif,
            PathBuf::from("/etc/icc/sRGB.icc")
        );
        assert_eq!(config.intent, RenderingIntent::Relative);
    }

    #[test]
    fn test_empty_values_fall_back() {
        let config = ToolConfig::from_lookup(lookup_from(&[(ENV_TIFFCP, "  ")]));
        assert_eq!(config.tiffcp, PathBuf::from("tiffcp"));
    }

    #[test]
    fn test_invalid_intent_falls_back() {
        let config = ToolConfig::from_lookup(lookup_from(&[(ENV_ICC_INTENT, "saturation!")]));
        assert_eq!(config.intent, RenderingIntent::Perceptual);
    }

    #[test]
    fn test_intent_parsing() {
        assert_eq!(
            "Perceptual".parse::<RenderingIntent>().unwrap(),
            RenderingIntent::Perceptual
        );
        assert_eq!(
            "relative-colorimetric".parse::<RenderingIntent>().unwrap(),
            RenderingIntent::Relative
        );
        assert!("absolute".parse::<RenderingIntent>().is_err());
    }

    #[test]
    fn test_missing_explicit_tool_path() {
        assert!(!is_tool_available(Path::new("/nonexistent/bin/tiffcp")));
    }
}

//! Normalization decision engine
//!
//! Brings an arbitrary input to a single-frame TIFF with a supported,
//! alpha-free channel model whose colors are in the target profile. Each
//! corrective step either produces its slot's file or aliases the previous
//! one.

use crate::context::{ConversionContext, Slot};
use crate::engine::{ChannelModel, ImageInfo, Toolkit};
use crate::error::{PyramidError, Result, Stage};
use crate::params::{AdobeGrayPolicy, ConversionWarning};
use shared_utils::RenderingIntent;
use std::path::PathBuf;
use tracing::{debug, info};

/// Description of the generic sRGB profile some gray scans carry by mistake
pub const SRGB_PROFILE_DESCRIPTION: &str = "sRGB Profile";
pub const ADOBE_RGB_DESCRIPTION: &str = "Adobe RGB (1998)";

#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub target_profile: PathBuf,
    pub intent: RenderingIntent,
    pub adobe_gray_policy: AdobeGrayPolicy,
    pub magick_temp_dir: Option<PathBuf>,
}

/// Correction applied to gray images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrayCorrection {
    /// Re-export while assigning the target profile
    ExportWithTargetProfile,
    /// Convert the pixel data to sRGB
    ConvertToSrgb,
    None,
}

pub fn gray_correction(model: ChannelModel, profile_description: &str) -> GrayCorrection {
    if model != ChannelModel::Gray {
        return GrayCorrection::None;
    }
    match profile_description {
        "" | SRGB_PROFILE_DESCRIPTION => GrayCorrection::ExportWithTargetProfile,
        ADOBE_RGB_DESCRIPTION => GrayCorrection::ConvertToSrgb,
        _ => GrayCorrection::None,
    }
}

/// Generic profile step, for images the gray step did not already correct
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileAction {
    Transform,
    AlreadySrgb,
    NoProfile,
}

pub fn profile_action(profile_description: &str) -> ProfileAction {
    if profile_description.is_empty() {
        ProfileAction::NoProfile
    } else if profile_description.to_lowercase().starts_with("srgb") {
        ProfileAction::AlreadySrgb
    } else {
        ProfileAction::Transform
    }
}

/// Run the normalization steps; returns the file the pyramid is built from.
pub fn normalize(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    options: &NormalizeOptions,
) -> Result<PathBuf> {
    let info = ensure_container_format(ctx, toolkit, options)?;
    ctx.record_source_info(&info);

    info!(
        format = %info.format,
        channels = %info.channels,
        bit_depth = info.bit_depth,
        profile = %info.profile_description,
        file = ?ctx.current(),
        "Probed image"
    );

    let model = info
        .channel_model()
        .ok_or_else(|| PyramidError::unsupported_colorspace(info.channels.as_str()))?;

    strip_alpha(ctx, toolkit, model)?;
    let corrected = correct_gray(ctx, toolkit, options, model, &info.profile_description)?;

    if !info.has_profile() {
        let path = ctx.current().to_path_buf();
        ctx.warn(ConversionWarning::ProfileNotAvailable { path });
    }

    if corrected {
        ctx.assign_alias(Slot::ProfileCorrected);
    } else {
        correct_profile(ctx, toolkit, options, &info.profile_description)?;
    }

    Ok(ctx.current().to_path_buf())
}

/// Make sure a single-frame TIFF sits in the container slot and return its
/// probe results.
fn ensure_container_format(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    options: &NormalizeOptions,
) -> Result<ImageInfo> {
    let magick_tmp = options.magick_temp_dir.as_deref();
    let source_info = toolkit
        .probe
        .probe(ctx.source(), magick_tmp)
        .map_err(PyramidError::probe)?;

    if source_info.is_single_frame_tiff() {
        debug!(source = ?ctx.source(), "Source is already a single-frame TIFF");
        ctx.assign_alias(Slot::Container);
        return Ok(source_info);
    }

    let target = ctx.slot_target(Slot::Container);
    toolkit
        .transform
        .to_container_format(ctx.source(), &target)
        .map_err(|e| PyramidError::transform(Stage::ContainerFormat, e))?;
    ctx.assign_produced(Slot::Container, "to_container_format")
        .map_err(|e| PyramidError::transform(Stage::ContainerFormat, e))?;

    toolkit
        .probe
        .probe(ctx.current(), magick_tmp)
        .map_err(PyramidError::probe)
}

fn strip_alpha(ctx: &mut ConversionContext, toolkit: &Toolkit<'_>, model: ChannelModel) -> Result<()> {
    let Some((band_start, band_count)) = model.color_bands() else {
        ctx.assign_alias(Slot::AlphaStripped);
        return Ok(());
    };

    let target = ctx.slot_target(Slot::AlphaStripped);
    toolkit
        .transform
        .strip_alpha(ctx.current(), &target, band_start, band_count)
        .and_then(|_| ctx.assign_produced(Slot::AlphaStripped, "strip_alpha"))
        .map_err(|e| PyramidError::transform(Stage::AlphaStrip, e))
}

/// Returns whether the image now carries the target profile.
fn correct_gray(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    options: &NormalizeOptions,
    model: ChannelModel,
    profile_description: &str,
) -> Result<bool> {
    let target = ctx.slot_target(Slot::GrayCorrected);

    let (operation, corrected) = match gray_correction(model, profile_description) {
        GrayCorrection::None => {
            ctx.assign_alias(Slot::GrayCorrected);
            return Ok(false);
        }
        GrayCorrection::ExportWithTargetProfile => {
            info!(
                file = ?ctx.current(),
                profile = %profile_description,
                "Re-exporting gray image with target profile"
            );
            toolkit
                .transform
                .export_with_profile(
                    ctx.current(),
                    &target,
                    ctx.width,
                    ctx.height,
                    &options.target_profile,
                    options.intent,
                )
                .map_err(|e| PyramidError::transform(Stage::GrayCorrection, e))?;
            ("export_with_profile", true)
        }
        GrayCorrection::ConvertToSrgb => {
            info!(file = ?ctx.current(), "Converting gray image tagged Adobe RGB (1998) to sRGB");
            toolkit
                .transform
                .convert_to_srgb(ctx.current(), &target)
                .map_err(|e| PyramidError::transform(Stage::GrayCorrection, e))?;
            ctx.warn(ConversionWarning::AdobeRgbGrayConverted {
                policy: options.adobe_gray_policy,
            });
            (
                "convert_to_srgb",
                options.adobe_gray_policy == AdobeGrayPolicy::SkipIccTransform,
            )
        }
    };

    ctx.assign_produced(Slot::GrayCorrected, operation)
        .map_err(|e| PyramidError::transform(Stage::GrayCorrection, e))?;
    Ok(corrected)
}

fn correct_profile(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    options: &NormalizeOptions,
    profile_description: &str,
) -> Result<()> {
    if profile_action(profile_description) != ProfileAction::Transform {
        ctx.assign_alias(Slot::ProfileCorrected);
        return Ok(());
    }

    info!(
        file = ?ctx.current(),
        from = %profile_description,
        to = ?options.target_profile,
        intent = %options.intent,
        "Applying ICC transform"
    );
    let target = ctx.slot_target(Slot::ProfileCorrected);
    toolkit
        .transform
        .icc_transform(ctx.current(), &target, &options.target_profile, options.intent)
        .and_then(|_| ctx.assign_produced(Slot::ProfileCorrected, "icc_transform"))
        .map_err(|e| PyramidError::transform(Stage::ProfileCorrection, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_without_profile_is_reexported() {
        assert_eq!(
            gray_correction(ChannelModel::Gray, ""),
            GrayCorrection::ExportWithTargetProfile
        );
        assert_eq!(
            gray_correction(ChannelModel::Gray, "sRGB Profile"),
            GrayCorrection::ExportWithTargetProfile
        );
    }

    #[test]
    fn test_gray_match_is_exact() {
        assert_eq!(
            gray_correction(ChannelModel::Gray, "Adobe RGB (1998)"),
            GrayCorrection::ConvertToSrgb
        );
        assert_eq!(
            gray_correction(ChannelModel::Gray, "srgb profile"),
            GrayCorrection::None
        );
        assert_eq!(
            gray_correction(ChannelModel::Gray, "Dot Gain 20%"),
            GrayCorrection::None
        );
    }

    #[test]
    fn test_gray_correction_only_for_gray() {
        for model in [
            ChannelModel::Srgb,
            ChannelModel::Srgba,
            ChannelModel::Graya,
            ChannelModel::Cmyk,
        ] {
            assert_eq!(gray_correction(model, ""), GrayCorrection::None);
            assert_eq!(gray_correction(model, "Adobe RGB (1998)"), GrayCorrection::None);
        }
    }

    #[test]
    fn test_profile_action() {
        assert_eq!(profile_action(""), ProfileAction::NoProfile);
        assert_eq!(profile_action("sRGB IEC61966-2.1"), ProfileAction::AlreadySrgb);
        assert_eq!(profile_action("SRGB.icc"), ProfileAction::AlreadySrgb);
        assert_eq!(profile_action("Adobe RGB (1998)"), ProfileAction::Transform);
        assert_eq!(profile_action("U.S. Web Coated (SWOP) v2"), ProfileAction::Transform);
    }
}

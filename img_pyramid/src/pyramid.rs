//! Pyramid builder
//!
//! Level 0 is the normalized image bounded by `max_size`; every further level
//! is resized from the one before it at half the size, until both sides fit
//! in [`LEVEL_STOP_SIZE`] pixels. The levels are then packed into one tiled
//! TIFF.

use crate::context::{ensure_produced, ConversionContext};
use crate::engine::{Toolkit, DEFAULT_TILE};
use crate::error::{EngineError, PyramidError, Result, Stage};
use crate::params::{Compression, ConversionWarning};
use shared_utils::thumbnail_size_by_long_side;
use std::path::Path;
use tracing::{debug, info};

/// Levels are generated until both sides are at most this many pixels.
pub const LEVEL_STOP_SIZE: u32 = 127;

/// Level 0 dimensions for an image of `width` x `height` whose long edge is
/// bounded by `max_size` (0 = unbounded).
pub fn initial_dimensions(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if max_size == 0 {
        return (width, height);
    }
    thumbnail_size_by_long_side(width, height, max_size).unwrap_or((width, height))
}

/// Dimensions of every level, level 0 first.
pub fn level_ladder(width: u32, height: u32) -> Vec<(u32, u32)> {
    let mut levels = vec![(width, height)];
    let (mut w, mut h) = (width, height);

    while w > LEVEL_STOP_SIZE || h > LEVEL_STOP_SIZE {
        let (next_w, next_h) = (w / 2, h / 2);
        if next_w == 0 || next_h == 0 {
            break;
        }
        levels.push((next_w, next_h));
        w = next_w;
        h = next_h;
    }

    levels
}

/// Compression to pack with: `requested`, unless the codec cannot hold
/// `bit_depth`-bit samples.
pub fn effective_compression(requested: Compression, bit_depth: u32) -> Compression {
    if requested.supports_bit_depth(bit_depth) {
        requested
    } else {
        Compression::None
    }
}

/// Level 0 is a byte copy of the normalized image only when neither side
/// changes.
pub fn is_verbatim_level(source: (u32, u32), target: (u32, u32)) -> bool {
    source == target
}

/// Write level 0 from `input`; returns its dimensions.
pub fn initial_resize(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    input: &Path,
    max_size: u32,
) -> Result<(u32, u32)> {
    let (w, h) = initial_dimensions(ctx.width, ctx.height, max_size);
    info!(width = w, height = h, max_size, "Level 0 dimensions");

    let top = ctx.level_path(0);
    let operation = if is_verbatim_level((ctx.width, ctx.height), (w, h)) {
        toolkit.transform.copy_verbatim(input, &top).map(|_| "copy_verbatim")
    } else {
        toolkit
            .transform
            .resize_exact(input, &top, w, h)
            .map(|_| "resize_exact")
    };

    operation
        .and_then(|op| ctx.push_level(0, op))
        .map_err(|e| PyramidError::transform(Stage::InitialResize, e))?;

    ctx.output_width = w;
    ctx.output_height = h;
    Ok((w, h))
}

/// Write levels 1.. from level 0 of `width` x `height`, each from its
/// predecessor.
pub fn generate_levels(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    width: u32,
    height: u32,
) -> Result<()> {
    for (depth, (w, h)) in level_ladder(width, height).into_iter().enumerate().skip(1) {
        let input = ctx.level_path(depth - 1);
        let output = ctx.level_path(depth);
        debug!(depth, width = w, height = h, "Generating level");

        toolkit
            .transform
            .resize_exact(&input, &output, w, h)
            .and_then(|_| ctx.push_level(depth, "resize_exact"))
            .map_err(|e| PyramidError::transform(Stage::LevelGeneration, e))?;
    }
    Ok(())
}

/// Pack the generated levels into `output`; returns the compression applied.
pub fn pack_levels(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    output: &Path,
    requested: Compression,
) -> Result<Compression> {
    if ctx.levels().is_empty() {
        return Err(PyramidError::pack(EngineError::InvalidArgument {
            operation: "pack",
            detail: "no pyramid levels to pack".to_string(),
        }));
    }

    let compression = effective_compression(requested, ctx.bit_depth);
    if compression != requested {
        ctx.warn(ConversionWarning::CompressionDisabledForBitDepth {
            bit_depth: ctx.bit_depth,
            requested,
        });
    }

    info!(
        levels = ctx.levels().len(),
        compression = %compression,
        output = ?output,
        "Packing pyramid"
    );

    toolkit
        .packer
        .pack(ctx.levels(), output, compression, DEFAULT_TILE)
        .and_then(|_| ensure_produced(output, "pack"))
        .map_err(PyramidError::pack)?;

    Ok(compression)
}

/// Build and pack the whole pyramid from the normalized image `input`.
pub fn build_pyramid(
    ctx: &mut ConversionContext,
    toolkit: &Toolkit<'_>,
    input: &Path,
    max_size: u32,
    output: &Path,
    compression: Compression,
) -> Result<Compression> {
    let (w, h) = initial_resize(ctx, toolkit, input, max_size)?;
    generate_levels(ctx, toolkit, w, h)?;
    pack_levels(ctx, toolkit, output, compression)
}

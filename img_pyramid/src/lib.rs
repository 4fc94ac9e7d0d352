//! img-pyramid: converts raster images into pyramidal TIFFs
//!
//! An input image is normalized to a single-frame, alpha-free TIFF in the
//! target color profile, scaled into a ladder of power-of-two levels, and the
//! levels are packed into one tiled file for IIIF image servers. The pixel
//! work is done by external engines behind the traits in [`engine`].

pub mod agent;
pub mod batch;
pub mod command_engine;
pub mod context;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod params;
pub mod pyramid;
pub mod tags;

#[cfg(test)]
mod test_support;

pub use agent::PyramidAgent;
pub use batch::{convert_directory, BatchOptions};
pub use command_engine::CommandToolkit;
pub use engine::{
    ChannelModel, ImageInfo, MetadataProbe, TilePacker, TileSize, Toolkit, TransformEngine,
    DEFAULT_TILE,
};
pub use error::{EngineError, FailureKind, PyramidError, Stage};
pub use params::{
    AdobeGrayPolicy, Compression, ConversionWarning, ConvertParams, OutputSummary,
    DEFAULT_JPEG_QUALITY,
};
pub use tags::{read_tags, Tagger, TagsInput};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use img_pyramid::{
    convert_directory, AdobeGrayPolicy, BatchOptions, CommandToolkit, Compression, ConvertParams,
    read_tags, MetadataProbe, OutputSummary, PyramidAgent, TagsInput, Toolkit,
    DEFAULT_JPEG_QUALITY,
};
use serde_json::json;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{
    collect_files, install_panic_handler, print_summary_report, report_error, ToolConfig,
    IMAGE_EXTENSIONS,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;

#[derive(Parser)]
#[command(name = "img-pyramid")]
#[command(version, about = "Convert raster images into tiled pyramidal TIFFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for the rotated log files
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one image
    Convert {
        #[command(flatten)]
        common: CommonArgs,

        /// Print the conversion summary as JSON
        #[arg(long)]
        json: bool,

        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Convert every image under a directory
    Batch {
        #[command(flatten)]
        common: CommonArgs,

        /// Worker threads (0 = number of CPUs)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,

        #[arg(short, long)]
        recursive: bool,

        /// Skip images whose output already exists
        #[arg(long)]
        skip_existing: bool,

        /// Print the per-image summaries as JSON
        #[arg(long)]
        json: bool,

        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        #[arg(value_name = "OUTPUT_DIR")]
        output: PathBuf,
    },

    /// Report what the probe sees in an image
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_enum, default_value = "human")]
        output: OutputFormat,

        /// Scratch directory for ImageMagick
        #[arg(long, value_name = "DIR")]
        magick_temp_dir: Option<PathBuf>,

        /// Also read this exiftool tag (repeatable)
        #[arg(long = "tag", value_name = "NAME")]
        tags: Vec<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Long-edge bound of the top level (0 = keep the source size)
    #[arg(short, long, default_value_t = 0)]
    max_size: u32,

    #[arg(short, long, value_enum, default_value = "jpeg")]
    compression: CompressionArg,

    /// JPEG quality
    #[arg(short, long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Target ICC profile (defaults to TARGET_ICC_PROFILE_IIIF)
    #[arg(short = 'p', long, value_name = "PROFILE")]
    profile: Option<PathBuf>,

    /// Workspace for intermediate files (defaults to PYRAMID_TEMP_DIR)
    #[arg(short = 't', long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Remove the workspace after a successful conversion
    #[arg(long)]
    delete_temp: bool,

    #[arg(long, value_enum, default_value = "skip-icc-transform")]
    adobe_gray_policy: AdobeGrayPolicyArg,

    /// Scratch directory for ImageMagick
    #[arg(long, value_name = "DIR")]
    magick_temp_dir: Option<PathBuf>,

    #[command(flatten)]
    tags: TagArgs,
}

#[derive(Args)]
struct TagArgs {
    #[arg(long)]
    copyright_notice: Option<String>,

    #[arg(long)]
    image_credit: Option<String>,

    #[arg(long)]
    web_rights_statement: Option<String>,

    #[arg(long)]
    usage_terms: Option<String>,

    #[arg(long)]
    caption: Option<String>,

    /// XMP rights "marked" flag, e.g. True or False
    #[arg(long)]
    copyright_status: Option<String>,

    #[arg(long)]
    source: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    Jpeg,
    Lzw,
    #[value(name = "none")]
    Uncompressed,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum AdobeGrayPolicyArg {
    SkipIccTransform,
    ApplyIccTransform,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

impl CommonArgs {
    fn compression(&self) -> Compression {
        match self.compression {
            CompressionArg::Jpeg => Compression::jpeg(self.quality),
            CompressionArg::Lzw => Compression::Lzw,
            CompressionArg::Uncompressed => Compression::None,
        }
    }

    fn params(&self, input: PathBuf, output: PathBuf, config: &ToolConfig) -> ConvertParams {
        let temp_dir = self
            .temp_dir
            .clone()
            .unwrap_or_else(|| config.temp_dir.clone());
        let policy = match self.adobe_gray_policy {
            AdobeGrayPolicyArg::SkipIccTransform => AdobeGrayPolicy::SkipIccTransform,
            AdobeGrayPolicyArg::ApplyIccTransform => AdobeGrayPolicy::ApplyIccTransform,
        };

        let mut params = ConvertParams::new(input, output, temp_dir)
            .with_max_size(self.max_size)
            .with_compression(self.compression())
            .with_delete_temp(self.delete_temp)
            .with_adobe_gray_policy(policy);
        if let Some(profile) = &self.profile {
            params = params.with_target_icc_profile(profile);
        }
        if let Some(dir) = &self.magick_temp_dir {
            params = params.with_magick_temp_dir(dir);
        }
        let tags = self.tags.to_input();
        if !tags.is_empty() {
            params = params.with_tags(tags);
        }
        params
    }
}

impl TagArgs {
    fn to_input(&self) -> TagsInput {
        TagsInput {
            copyright_notice: self.copyright_notice.clone(),
            image_credit: self.image_credit.clone(),
            web_rights_statement: self.web_rights_statement.clone(),
            usage_terms: self.usage_terms.clone(),
            caption: self.caption.clone(),
            copyright_status: self.copyright_status.clone(),
            source: self.source.clone(),
        }
    }
}

fn main() {
    install_panic_handler();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        report_error(&*e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut log_config = LogConfig::new().with_level(if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    // a second subscriber is not fatal
    if let Err(e) = init_logging("img_pyramid", log_config) {
        eprintln!("⚠️  Logging not initialized: {:#}", e);
    }

    let config = ToolConfig::from_env();
    let toolkit = CommandToolkit::acquire(&config).context("External tools unavailable")?;

    let result = {
        let agent = PyramidAgent::new(Toolkit::from_engine(&toolkit), &config);
        match cli.command {
            Commands::Convert {
                common,
                json,
                input,
                output,
            } => convert_single(&agent, common.params(input, output, &config), json),
            Commands::Batch {
                common,
                jobs,
                recursive,
                skip_existing,
                json,
                input,
                output,
            } => {
                let options = BatchOptions {
                    input_dir: input,
                    output_dir: output,
                    recursive,
                    jobs,
                    skip_existing,
                    quiet: json,
                };
                let template = common.params(PathBuf::new(), PathBuf::new(), &config);
                convert_batch(&agent, &template, &options, json)
            }
            Commands::Info {
                file,
                output,
                magick_temp_dir,
                tags,
            } => show_info(&toolkit, &file, magick_temp_dir.as_deref(), &tags, output),
        }
    };

    toolkit.release();
    result
}

fn convert_single(agent: &PyramidAgent<'_>, params: ConvertParams, json: bool) -> anyhow::Result<()> {
    let summary = agent.convert(&params)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &OutputSummary) {
    println!("✅ {}", summary.output.display());
    println!(
        "   {}x{} → {}x{}, {} levels, compression {}",
        summary.input_width,
        summary.input_height,
        summary.output_width,
        summary.output_height,
        summary.levels,
        summary.compression
    );
    for warning in &summary.warnings {
        println!("   ⚠️  {}", warning);
    }
}

fn convert_batch(
    agent: &PyramidAgent<'_>,
    template: &ConvertParams,
    options: &BatchOptions,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        options.input_dir.is_dir(),
        "Input path is not a directory: {}",
        options.input_dir.display()
    );

    let start = Instant::now();
    let (result, summaries) = convert_directory(agent, template, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        let input_bytes = total_size(
            &collect_files(&options.input_dir, IMAGE_EXTENSIONS, options.recursive),
        );
        let outputs: Vec<PathBuf> = summaries.iter().map(|s| s.output.clone()).collect();
        print_summary_report(
            &result,
            start.elapsed(),
            input_bytes,
            total_size(&outputs),
            "Pyramid",
        );
        for (path, reason) in &result.errors {
            eprintln!("❌ {}: {}", path.display(), reason);
        }
    }

    anyhow::ensure!(result.failed == 0, "{} of {} conversions failed", result.failed, result.total);
    Ok(())
}

fn total_size(paths: &[PathBuf]) -> u64 {
    paths
        .iter()
        .filter_map(|p| fs::metadata(p).ok())
        .map(|m| m.len())
        .sum()
}

fn show_info(
    toolkit: &CommandToolkit,
    file: &Path,
    magick_temp_dir: Option<&Path>,
    tag_names: &[String],
    output: OutputFormat,
) -> anyhow::Result<()> {
    let info = toolkit
        .probe(file, magick_temp_dir)
        .with_context(|| format!("Failed to probe {}", file.display()))?;
    let tags = read_tags(toolkit, file, tag_names)
        .with_context(|| format!("Failed to read tags of {}", file.display()))?;

    match output {
        OutputFormat::Json if tags.is_empty() => {
            println!("{}", serde_json::to_string_pretty(&info)?)
        }
        OutputFormat::Json => {
            let tags: serde_json::Map<String, serde_json::Value> = tags
                .into_iter()
                .map(|(name, value)| (name, json!(value)))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "image": info, "tags": tags }))?
            );
        }
        OutputFormat::Human => {
            println!("📷 {}", file.display());
            println!("   Format:     {}", info.format);
            println!("   Size:       {}x{}", info.width, info.height);
            println!("   Channels:   {}", info.channels);
            println!("   Bit depth:  {}", info.bit_depth);
            println!("   Frames:     {}", info.frame_count);
            if info.has_profile() {
                println!("   Profile:    {}", info.profile_description);
            } else {
                println!("   Profile:    (none)");
            }
            for (name, value) in &tags {
                println!("   {}: {}", name, value.as_deref().unwrap_or("(not set)"));
            }
        }
    }
    Ok(())
}

use clap::{Parser, Subcommand};
use rasterpress::batch::{self, BatchEvent};
use rasterpress::config::{self, AppConfig};
use rasterpress::imaging::RustBackend;
use rasterpress::naming::single_download_name;
use rasterpress::packaging::{Package, ZipArchive, package_results};
use rasterpress::pipeline::{self, CancelToken, ExecutionStrategy};
use rasterpress::settings::{EncoderSpec, OutputFormat, Quality, ResizeMethod, Rotation};
use rasterpress::types::SourceFile;
use rasterpress::worker::OffloadWorker;
use rasterpress::output;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

fn version_string() -> &'static str {
    let on_tag = env!("RASTERPRESS_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("RASTERPRESS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "rasterpress")]
#[command(about = "Rotate, resize and re-encode images")]
#[command(long_about = "\
Rotate, resize and re-encode images

Single images get the full set of controls: rotation, resize with aspect
ratio handling, and per-format encoder options. Batches share one format,
quality and optional maximum width, and are converted one file at a time.

Pipeline (fixed order):

  decode → rotate → resize → encode

Resize sizes refer to the image after rotation.

Output names:
  convert   photo.PNG → photo-jpeg.jpg
  batch     photo.PNG → photo.jpg  (inside compressed-images-<ms>.zip)

Run 'rasterpress gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Output directory
    #[arg(long, default_value = "compressed", global = true)]
    output: PathBuf,

    /// Run transform + encode on a dedicated worker thread
    #[arg(long, global = true)]
    worker: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Image to convert
    file: PathBuf,

    /// Output format: jpeg (or jpg), png, webp, avif
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Quality (0-100) for the selected format
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    quality: Option<u32>,

    /// Clockwise rotation: 0, 90, 180 or 270
    #[arg(long, value_parser = parse_rotation)]
    rotate: Option<Rotation>,

    /// Target width in pixels (enables resize)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    width: Option<u32>,

    /// Target height in pixels (enables resize)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    height: Option<u32>,

    /// Resize interpolation: high, medium, low, pixelated
    #[arg(long, value_parser = parse_method)]
    method: Option<ResizeMethod>,

    /// Do not derive the missing side from the aspect ratio
    #[arg(long)]
    no_aspect: bool,

    /// Encode WebP losslessly
    #[arg(long)]
    lossless: bool,
}

#[derive(clap::Args)]
struct BatchArgs {
    /// Files and/or directories (walked recursively)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output format for every file: jpeg (or jpg), png, webp, avif
    #[arg(long, value_parser = parse_format)]
    format: Option<OutputFormat>,

    /// Quality (0-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    quality: Option<u32>,

    /// Maximum output width in pixels
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_width: Option<u32>,

    /// Write individual files instead of a ZIP archive
    #[arg(long)]
    no_archive: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert one image with the full set of controls
    Convert(ConvertArgs),
    /// Convert many images with one format and quality
    Batch(BatchArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let degrees: u16 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    Rotation::try_from(degrees)
}

/// Case-insensitive format names with `jpg` accepted for `jpeg`. Anything
/// else is passed through and gets the encoder's fallback.
fn parse_format(s: &str) -> Result<OutputFormat, String> {
    let name = s.trim().to_ascii_lowercase();
    Ok(match name.as_str() {
        "jpg" => OutputFormat::Jpeg,
        known => OutputFormat::parse(known),
    })
}

fn parse_method(s: &str) -> Result<ResizeMethod, String> {
    match s {
        "high" => Ok(ResizeMethod::High),
        "medium" => Ok(ResizeMethod::Medium),
        "low" => Ok(ResizeMethod::Low),
        "pixelated" => Ok(ResizeMethod::Pixelated),
        other => Err(format!("unknown resize method: {other}")),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert(ref args) => {
            let config = config::load_config(&cli.config_dir)?;
            let use_worker = cli.worker || config.processing.use_worker;
            convert(args, config, use_worker, &cli.output)?;
        }
        Command::Batch(ref args) => {
            let config = config::load_config(&cli.config_dir)?;
            let use_worker = cli.worker || config.processing.use_worker;
            run_batch(args, config, use_worker, &cli.output)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Set the quality of the active format's option block.
fn apply_quality(encoder: &mut EncoderSpec, quality: Quality) {
    match encoder.format {
        OutputFormat::Jpeg => encoder.jpeg.quality = quality,
        OutputFormat::Png => encoder.png.quality = quality,
        OutputFormat::Webp => encoder.webp.quality = quality,
        OutputFormat::Avif => encoder.avif.quality = quality,
        OutputFormat::Unrecognized(_) => {}
    }
}

fn convert(
    args: &ConvertArgs,
    config: AppConfig,
    use_worker: bool,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.settings;
    if let Some(format) = &args.format {
        settings = settings.with_format(format.clone());
    }
    if let Some(quality) = args.quality {
        apply_quality(&mut settings.encoder, Quality::new(quality));
    }
    if let Some(rotation) = args.rotate {
        settings = settings.with_rotation(rotation);
    }
    if args.width.is_some() || args.height.is_some() {
        settings.resize.enabled = true;
        settings.resize.width = args.width;
        settings.resize.height = args.height;
    }
    if let Some(method) = args.method {
        settings.resize.method = method;
    }
    if args.no_aspect {
        settings.resize.maintain_aspect = false;
    }
    if args.lossless {
        settings.encoder.webp.lossless = true;
    }
    debug!(?settings, "convert settings");

    let source = SourceFile::read(&args.file)?;
    let backend = RustBackend::new();
    let worker = if use_worker {
        Some(OffloadWorker::spawn(RustBackend::new())?)
    } else {
        None
    };
    let strategy = match &worker {
        Some(worker) => ExecutionStrategy::Offload(worker),
        None => ExecutionStrategy::Inline,
    };

    let compressed = pipeline::run(
        &backend,
        &source,
        &settings,
        &strategy,
        &CancelToken::new(),
    )?;

    std::fs::create_dir_all(output_dir)?;
    let output_name = single_download_name(&source.name, &settings.encoder.format);
    std::fs::write(output_dir.join(&output_name), &compressed.result.bytes)?;
    output::print_single_result(&source.name, &output_name, &compressed);
    Ok(())
}

/// Expand directories (recursively, sorted by name) into their image files.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<SourceFile>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry?;
                let name = entry.file_name().to_string_lossy();
                if entry.file_type().is_file() && batch::is_supported_input(&name) {
                    files.push(SourceFile::read(entry.path())?);
                }
            }
        } else {
            files.push(SourceFile::read(path)?);
        }
    }
    Ok(batch::accept_files(files))
}

fn run_batch(
    args: &BatchArgs,
    config: AppConfig,
    use_worker: bool,
    output_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = config.batch;
    if let Some(format) = &args.format {
        settings.format = format.clone();
    }
    if let Some(quality) = args.quality {
        settings.quality = Quality::new(quality);
    }
    if args.max_width.is_some() {
        settings.max_width = args.max_width;
    }

    let files = collect_inputs(&args.paths)?;
    info!(files = files.len(), "inputs collected");

    let backend = RustBackend::new();
    let worker = if use_worker {
        Some(OffloadWorker::spawn(RustBackend::new())?)
    } else {
        None
    };
    let strategy = match &worker {
        Some(worker) => ExecutionStrategy::Offload(worker),
        None => ExecutionStrategy::Inline,
    };

    let (tx, rx) = std::sync::mpsc::channel::<BatchEvent>();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    let run = batch::run_batch(
        &backend,
        files,
        &settings,
        &strategy,
        Some(tx),
        &CancelToken::new(),
    );
    printer
        .join()
        .map_err(|_| "output printer thread panicked")?;

    std::fs::create_dir_all(output_dir)?;
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let archive = (!args.no_archive).then(ZipArchive::new);
    match package_results(&run, archive, timestamp_ms)? {
        Package::Archive { name, bytes } => {
            std::fs::write(output_dir.join(&name), bytes)?;
            println!("==> Archive: {}", output_dir.join(&name).display());
        }
        Package::Individual(downloads) => {
            for download in &downloads {
                std::fs::write(output_dir.join(&download.name), &download.bytes)?;
            }
            println!(
                "==> {} files written to {}",
                downloads.len(),
                output_dir.display()
            );
        }
    }

    let report = serde_json::to_string_pretty(&run.report())?;
    std::fs::write(output_dir.join("report.json"), report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_accepts_aliases_and_case() {
        assert_eq!(parse_format("jpg"), Ok(OutputFormat::Jpeg));
        assert_eq!(parse_format("JPEG"), Ok(OutputFormat::Jpeg));
        assert_eq!(parse_format(" WebP "), Ok(OutputFormat::Webp));
        assert_eq!(
            parse_format("heic"),
            Ok(OutputFormat::Unrecognized("heic".into()))
        );
    }

    #[test]
    fn cli_parses_batch_format() {
        let cli = Cli::try_parse_from(["rasterpress", "batch", "--format", "JPG", "in"]).unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.format, Some(OutputFormat::Jpeg));
    }
}

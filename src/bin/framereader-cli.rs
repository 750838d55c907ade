use std::{
    fs,
    io::Write,
    ops::ControlFlow,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use framereader::{
    DecodeService, FfmpegLogLevel, FrameReader, FrameReaderError, FrameView, PixelFormat,
    ReaderOptions, ScalingAlgorithm, StreamMetadata,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framereader input.mp4\n  framereader input.mp4 --metadata --json\n  framereader input.mp4 --save-every 25 --out frames --progress\n  framereader rtsp://camera.local/stream --limit 100 --verbose\n  framereader --completions zsh > _framereader";

const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

#[derive(Debug, Parser)]
#[command(
    name = "framereader",
    version,
    about = "Decode every frame of a video's primary stream",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video path or URL.
    input: Option<String>,

    /// Stop after this many frames.
    #[arg(long)]
    limit: Option<u64>,

    /// Save every Nth frame as an image into --out.
    #[arg(long)]
    save_every: Option<u64>,

    /// Output directory for saved frames.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Image extension for saved frames (png, jpg, jpeg, bmp, tiff).
    #[arg(long, default_value = "png")]
    ext: String,

    /// Allow overwriting existing frame images.
    #[arg(long)]
    overwrite: bool,

    /// Print stream metadata before reading.
    #[arg(long)]
    metadata: bool,

    /// Print metadata as JSON (implies --metadata).
    #[arg(long)]
    json: bool,

    /// Output channel order (bgr24, rgb24).
    #[arg(long)]
    pixel_format: Option<String>,

    /// Scaler interpolation (bicubic, bilinear, fast-bilinear, point, area, lanczos).
    #[arg(long)]
    scaling: Option<String>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,

    /// Show debug logging from the reader.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar instead of a running count.
    #[arg(long)]
    progress: bool,

    /// Print shell completions and exit.
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

/// Where and how often frames are written to disk.
struct SavePlan {
    every: u64,
    directory: PathBuf,
    extension: String,
    overwrite: bool,
}

impl SavePlan {
    fn from_cli(cli: &Cli) -> Result<Option<Self>, Box<dyn std::error::Error>> {
        let Some(every) = cli.save_every else {
            return Ok(None);
        };
        if every == 0 {
            return Err("--save-every must be greater than 0".into());
        }
        let directory = cli.out.clone().ok_or("--save-every requires --out")?;
        let extension = normalize_extension(&cli.ext)
            .ok_or(format!("unsupported image extension: {}", cli.ext))?;

        fs::create_dir_all(&directory)?;
        Ok(Some(Self {
            every,
            directory,
            extension,
            overwrite: cli.overwrite,
        }))
    }

    fn save(&self, frame: &FrameView<'_>) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
        if frame.index() % self.every != 0 {
            return Ok(None);
        }
        let path = self
            .directory
            .join(frame_file_name(frame.index(), &self.extension));
        ensure_writable_path(&path, self.overwrite)?;
        frame.save(&path)?;
        Ok(Some(path))
    }
}

fn normalize_extension(value: &str) -> Option<String> {
    let cleaned = value.trim_start_matches('.').to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&cleaned.as_str())
        .then_some(cleaned)
}

fn frame_file_name(index: u64, extension: &str) -> String {
    format!("frame_{index:06}.{extension}")
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !overwrite {
        return Err(format!(
            "output already exists: {} (use --overwrite to replace)",
            path.display()
        )
        .into());
    }
    Ok(())
}

fn parse_reader_options(
    pixel_format: Option<&str>,
    scaling: Option<&str>,
) -> Result<ReaderOptions, String> {
    let mut options = ReaderOptions::new();
    if let Some(value) = pixel_format {
        options = options.with_pixel_format(value.parse::<PixelFormat>()?);
    }
    if let Some(value) = scaling {
        options = options.with_scaling(value.parse::<ScalingAlgorithm>()?);
    }
    Ok(options)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn print_metadata(
    metadata: &StreamMetadata,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "width": metadata.width,
            "height": metadata.height,
            "fps": metadata.frames_per_second,
            "frame_count": metadata.frame_count,
            "codec": metadata.codec,
            "stream_index": metadata.stream_index,
            "duration_seconds": metadata.duration.as_secs_f64(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!(
            "Video: {}x{} @ {:.2} fps [{}], stream {}",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.codec,
            metadata.stream_index,
        );
        println!("Duration: {:?}", metadata.duration);
        println!("Estimated frames: {}", metadata.frame_count);
    }
    Ok(())
}

fn progress_bar(total: u64) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    if total == 0 {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {pos} frames {msg}")?);
        return Ok(bar);
    }
    let bar = ProgressBar::new(total);
    let style =
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(bar)
}

/// Feed frames to `on_frame` until the stream ends, `on_frame` breaks, or
/// `limit` frames have been handled. Returns the number of frames handled
/// alongside the read outcome, so a count is available even after an error.
fn process_frames<S, F>(
    reader: &mut FrameReader<S>,
    limit: Option<u64>,
    mut on_frame: F,
) -> (u64, Result<(), FrameReaderError>)
where
    S: DecodeService,
    F: FnMut(FrameView<'_>) -> ControlFlow<()>,
{
    if limit == Some(0) {
        return (0, Ok(()));
    }

    let mut processed = 0_u64;
    let outcome = reader.for_each_frame(|frame| {
        if on_frame(frame).is_break() {
            return ControlFlow::Break(());
        }
        processed += 1;
        if limit.is_some_and(|limit| processed >= limit) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    (processed, outcome.map(|_| ()))
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &cli.log_level {
        let level = level.parse::<FfmpegLogLevel>()?;
        framereader::set_ffmpeg_log_level(level);
    }

    let Some(input) = cli.input.as_deref() else {
        return Err(format!("{}", Cli::command().render_usage()).into());
    };

    let options = parse_reader_options(cli.pixel_format.as_deref(), cli.scaling.as_deref())?;
    let save_plan = SavePlan::from_cli(&cli)?;

    let mut reader = FrameReader::new();
    reader
        .open_with_options(input, &options)
        .map_err(|error| format!("Unable to open video from \"{input}\": {error}"))?;

    let metadata = reader.metadata().cloned().ok_or("reader has no open source")?;
    if cli.metadata || cli.json {
        print_metadata(&metadata, cli.json)?;
    }

    let bar = if cli.progress {
        Some(progress_bar(metadata.frame_count)?)
    } else {
        None
    };

    let mut save_error = None;
    let (processed, outcome) = process_frames(&mut reader, cli.limit, |frame| {
        if let Some(plan) = &save_plan {
            match plan.save(&frame) {
                Ok(Some(path)) => {
                    log::debug!("saved frame {} -> {}", frame.index(), path.display());
                }
                Ok(None) => {}
                Err(error) => {
                    save_error = Some(error);
                    return ControlFlow::Break(());
                }
            }
        }

        match &bar {
            Some(bar) => bar.inc(1),
            None => {
                print!("{}\r", frame.index() + 1);
                let _ = std::io::stdout().flush();
            }
        }
        ControlFlow::Continue(())
    });

    if let Some(bar) = bar {
        bar.finish_with_message("done");
    }

    if let Some(error) = save_error {
        return Err(error);
    }
    match outcome {
        Ok(()) => {}
        Err(error) if error.is_recoverable() => {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("stopped early: {error}").yellow()
            );
        }
        Err(error) => return Err(error.into()),
    }

    println!("Number of frames processed: {processed}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "framereader", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

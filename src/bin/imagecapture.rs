use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use imagecapture::{
    CaptureConfig, Decoder, DecoderBackend, FfmpegLogLevel, FrameRequest, Orientation, PluginLogger,
    PluginOutput, StashProgress, VideoStreamMetadata, extract_frame, generate_output_path,
    naming::existing_captures_on_disk, plugin, resolve_rotation,
};
use log::LevelFilter;
use serde_json::{Value, json};

const CLI_AFTER_HELP: &str = "Without a subcommand, reads a plugin task from stdin and answers on stdout.\n\nExamples:\n  imagecapture extract clip.mp4 --frame 240\n  imagecapture probe phone.mov --json\n  imagecapture completions zsh > _imagecapture";

#[derive(Debug, Parser)]
#[command(
    name = "imagecapture",
    version,
    about = "Capture still frames from videos as library images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Most verbose log level emitted (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    /// Also write log lines to this file (truncated on start).
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    ffmpeg_log_level: Option<FfmpegLogLevel>,

    /// Decoder backend (library, subprocess).
    #[arg(long, global = true, default_value = "library")]
    decoder: DecoderBackend,

    /// `ffprobe` executable used by the subprocess backend.
    #[arg(long, global = true, default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// `ffmpeg` executable used by the subprocess backend.
    #[arg(long, global = true, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// JPEG quality of written frames (1-100).
    #[arg(long, global = true, default_value_t = imagecapture::config::DEFAULT_JPEG_QUALITY)]
    quality: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract one frame next to the video, or to --out.
    #[command(
        about = "Extract a video frame",
        after_help = "Examples:\n  imagecapture extract clip.mp4 --frame 240\n  imagecapture extract clip.mp4 --frame 0 --out poster.jpg --no-clobber"
    )]
    Extract {
        /// Input video path.
        video: PathBuf,
        /// Zero-based frame index.
        #[arg(long, default_value_t = 0)]
        frame: u64,
        /// Output image path. Defaults to the next free `<video>_NNN.jpg`.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fail instead of replacing an existing output file.
        #[arg(long)]
        no_clobber: bool,
    },

    /// Print stream metadata and the resolved rotation.
    #[command(
        about = "Print rotation metadata",
        after_help = "Examples:\n  imagecapture probe phone.mov\n  imagecapture probe phone.mov --json"
    )]
    Probe {
        /// Input video path.
        video: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn build_config(global: &GlobalOptions) -> CaptureConfig {
    CaptureConfig::new()
        .with_decoder(global.decoder)
        .with_tool_paths(&global.ffprobe, &global.ffmpeg)
        .with_jpeg_quality(global.quality)
        .with_log_level(global.log_level)
        .with_log_file(global.log_file.clone())
}

fn install_logger(config: &CaptureConfig) {
    let logger = match PluginLogger::from_config(config) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("cannot open log file: {error}").yellow()
            );
            PluginLogger::new(config.log_level())
        }
    };
    if let Err(error) = logger.install() {
        eprintln!("{} {error}", "warning:".yellow().bold());
    }
}

fn default_output_path(video: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let video = video
        .to_str()
        .ok_or_else(|| format!("video path is not valid UTF-8: {}", video.display()))?;
    let existing = existing_captures_on_disk(video)?;
    Ok(PathBuf::from(generate_output_path(&existing, video)?))
}

fn probe_payload(metadata: &VideoStreamMetadata, rotation: i32) -> Value {
    json!({
        "codec_type": metadata.codec_type,
        "codec_name": metadata.codec_name,
        "width": metadata.width,
        "height": metadata.height,
        "rotate_tag": metadata.rotation_tag,
        "side_data_rotation": metadata.side_data_rotation,
        "display_aspect_ratio": metadata.display_aspect_ratio.map(|ratio| ratio.to_string()),
        "orientation": Orientation::of(metadata.width, metadata.height).to_string(),
        "rotation": rotation,
    })
}

fn render_output(output: &PluginOutput) -> String {
    serde_json::to_string(output).unwrap_or_else(|error| json!({ "error": error.to_string() }).to_string())
}

fn run_plugin(config: CaptureConfig) -> PluginOutput {
    let mut input = String::new();
    if let Err(error) = io::stdin().read_to_string(&mut input) {
        log::error!("Cannot read plugin input: {error}");
        return PluginOutput::failed(error.to_string());
    }

    match plugin::parse_input(&input) {
        Ok(request) => plugin::run_task(&request, config),
        Err(error) => {
            log::error!("{error}");
            PluginOutput::failed(error.to_string())
        }
    }
}

fn run(command: Commands, config: &CaptureConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Extract {
            video,
            frame,
            out,
            no_clobber,
        } => {
            let output = match out {
                Some(out) => out,
                None => default_output_path(&video)?,
            };
            let config = config.clone().with_overwrite(!no_clobber);
            let decoder = config.build_decoder();
            let request = FrameRequest::new(&video, frame, &output);
            let result = extract_frame(decoder.as_ref(), &request, &config);
            match result.output_path {
                Some(path) if result.success => {
                    println!("{} {}", "saved".green().bold(), path.display());
                }
                _ => return Err(format!("could not extract frame {frame} of {}", video.display()).into()),
            }
        }
        Commands::Probe { video, json } => {
            let decoder = config.build_decoder();
            let metadata = decoder.probe(&video)?;
            let rotation = resolve_rotation(&metadata);
            if json {
                println!("{}", serde_json::to_string_pretty(&probe_payload(&metadata, rotation))?);
            } else {
                println!(
                    "Video: {}x{} [{}] ({})",
                    metadata.width,
                    metadata.height,
                    metadata.codec_name.as_deref().unwrap_or("unknown"),
                    Orientation::of(metadata.width, metadata.height),
                );
                if let Some(tag) = metadata.rotation_tag {
                    println!("Rotate tag: {tag}");
                }
                if let Some(side_data) = metadata.side_data_rotation {
                    println!("Display matrix: {side_data}");
                }
                if let Some(ratio) = metadata.display_aspect_ratio {
                    println!("Display aspect ratio: {ratio}");
                }
                println!("{} {rotation}", "Rotation:".cyan().bold());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "imagecapture", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let config = build_config(&cli.global);
    install_logger(&config);
    if let Some(level) = cli.global.ffmpeg_log_level {
        imagecapture::set_ffmpeg_log_level(level);
    }

    match cli.command {
        None => {
            let output = run_plugin(config.with_progress(Arc::new(StashProgress)));
            println!("{}", render_output(&output));
        }
        Some(command) => {
            if let Err(error) = run(command, &config) {
                eprintln!("{} {error}", "error:".red().bold());
                std::process::exit(1);
            }
        }
    }
}

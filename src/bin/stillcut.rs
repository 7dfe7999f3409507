use std::{error::Error, path::PathBuf, sync::Arc, time::Duration};

use clap::{CommandFactory, Parser, Subcommand, error::ErrorKind};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use stillcut::{
    ExtractOptions, ExtractionReport, ExtractionStatus, FfmpegExtractor, KeyframeJob, LogLevel,
    ProgressCallback, ProgressEvent, ProgressRange, SamplingOptions,
};

const CLI_AFTER_HELP: &str = "Examples:\n  stillcut extract --video-path input.mp4 --subtitle-keyframe-match match.json --output-dir keyframes\n  stillcut extract --video-path input.mp4 --subtitle-keyframe-match match.json --output-dir keyframes --sequential --log-level debug\n  stillcut extract --video-path input.mp4 --subtitle-keyframe-match match.json --output-dir keyframes --interval-seconds 2 --max-frames 10 --progress\n  stillcut completions zsh > _stillcut\n\nExit codes: 0 all keyframes extracted, 1 none extracted or invalid input, 2 partial success";

#[derive(Debug, Parser)]
#[command(
    name = "stillcut",
    version,
    about = "Extract subtitle-aligned keyframes from a video",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract the keyframes listed in a match file.
    #[command(about = "Extract keyframes")]
    Extract(ExtractArgs),

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Parser)]
struct ExtractArgs {
    /// Source video file.
    #[arg(long, alias = "video_path")]
    video_path: PathBuf,

    /// JSON match file listing extraction times per segment.
    #[arg(long, alias = "subtitle_keyframe_match")]
    subtitle_keyframe_match: PathBuf,

    /// Directory keyframes are written to (created if absent).
    #[arg(long, alias = "output_dir")]
    output_dir: PathBuf,

    /// Worker threads in parallel mode.
    #[arg(long, alias = "max_workers", default_value_t = 4)]
    max_workers: usize,

    /// Extract one keyframe at a time, in order.
    #[arg(long)]
    sequential: bool,

    /// Log level (DEBUG, INFO, WARN, ERROR).
    #[arg(long, alias = "log_level", default_value = "INFO")]
    log_level: LogLevel,

    /// Re-sample each segment every N seconds instead of using the listed times.
    #[arg(long, alias = "interval_seconds")]
    interval_seconds: Option<f64>,

    /// Maximum keyframes per segment when re-sampling (-1 for no limit).
    #[arg(long, alias = "max_frames", default_value_t = -1, allow_negative_numbers = true)]
    max_frames: i64,

    /// Seconds to wait for extraction before reconciling anyway.
    #[arg(long, default_value_t = 3000)]
    timeout: u64,

    /// Seconds between output-directory progress samples.
    #[arg(long, alias = "poll_interval", default_value_t = 2.0)]
    poll_interval: f64,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,

    /// Percentage reported before the first keyframe.
    #[arg(long, default_value_t = 0.0)]
    progress_from: f32,

    /// Percentage reported once every keyframe exists.
    #[arg(long, default_value_t = 100.0)]
    progress_to: f32,

    /// Write the pruned match data to this path.
    #[arg(long)]
    result: Option<PathBuf>,

    /// Print the final report as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Build sampling options from the re-sampling flags.
///
/// Sampling is enabled when an interval is given or the frame cap is not
/// `-1`; otherwise the match file's own times are used.
fn sampling_options(
    interval_seconds: Option<f64>,
    max_frames: i64,
) -> Result<Option<SamplingOptions>, Box<dyn Error>> {
    if interval_seconds.is_none() && max_frames == -1 {
        return Ok(None);
    }

    let mut sampling = SamplingOptions::new();
    if let Some(seconds) = interval_seconds {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err("--interval-seconds must be greater than 0".into());
        }
        sampling = sampling.with_interval(Duration::from_secs_f64(seconds));
    }
    match max_frames {
        -1 => {}
        n if n > 0 => sampling = sampling.with_max_frames(usize::try_from(n)?),
        _ => return Err("--max-frames must be -1 (no limit) or greater than 0".into()),
    }
    Ok(Some(sampling))
}

fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_secs()
        .init();
    stillcut::set_ffmpeg_log_level(level);
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_length(event.total_expected as u64);
        self.bar.set_position(event.completed as u64);
        self.bar.set_message(format!("{:.1}%", event.percentage));
    }
}

fn print_status(report: &ExtractionReport) {
    let line = format!(
        "{}/{} keyframe(s) extracted, {} failed",
        report.successful_extractions, report.total_expected, report.failed_extractions
    );
    match report.status {
        ExtractionStatus::Success => eprintln!("{} {}", "success:".green().bold(), line.green()),
        ExtractionStatus::PartialSuccess => {
            eprintln!("{} {}", "partial:".yellow().bold(), line.yellow());
        }
        ExtractionStatus::Failure => eprintln!("{} {}", "failure:".red().bold(), line.red()),
    }
}

fn extract(args: ExtractArgs) -> Result<i32, Box<dyn Error>> {
    init_logging(args.log_level);

    let sampling = sampling_options(args.interval_seconds, args.max_frames)?;
    if !args.poll_interval.is_finite() || args.poll_interval <= 0.0 {
        return Err("--poll-interval must be greater than 0".into());
    }

    let mut options = ExtractOptions::new()
        .with_max_workers(args.max_workers)
        .with_sequential(args.sequential)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_poll_interval(Duration::from_secs_f64(args.poll_interval))
        .with_progress_range(ProgressRange::new(args.progress_from, args.progress_to));
    if let Some(sampling) = sampling {
        options = options.with_sampling(sampling);
    }

    let progress = if args.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    if args.sequential {
        log::info!("Using sequential mode");
    } else {
        log::info!("Using parallel mode with {} worker(s)", args.max_workers);
    }

    let extractor = Arc::new(FfmpegExtractor::new()?);
    let report = KeyframeJob::from_match_file(
        &args.video_path,
        &args.subtitle_keyframe_match,
        &args.output_dir,
    )?
    .with_options(options)
    .run(extractor)?;

    if let Some(progress) = progress {
        progress.bar.finish_with_message("done");
    }

    if let Some(path) = &args.result {
        stillcut::save_match_data(path, &report.segments)?;
        log::info!("Match data written to {}", path.display());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    print_status(&report);
    Ok(report.exit_code())
}

/// Exit code for a command line clap refused to parse.
///
/// Help and version requests succeed; anything else is invalid input (1),
/// keeping 2 reserved for partial success.
fn usage_exit_code(error: &clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn run() -> Result<i32, Box<dyn Error>> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            error.print()?;
            return Ok(usage_exit_code(&error));
        }
    };

    match cli.command {
        Commands::Extract(args) => extract(args),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "stillcut", &mut std::io::stdout());
            Ok(0)
        }
    }
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::{CommandFactory, Parser};
    use stillcut::LogLevel;

    use super::{Cli, Commands, sampling_options, usage_exit_code};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_accepts_underscore_flags() {
        let cli = Cli::try_parse_from([
            "stillcut",
            "extract",
            "--video_path",
            "input.mp4",
            "--subtitle_keyframe_match",
            "match.json",
            "--output_dir",
            "out",
            "--max_workers",
            "20",
            "--log_level",
            "DEBUG",
        ])
        .unwrap();

        let Commands::Extract(args) = cli.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(args.max_workers, 20);
        assert_eq!(args.log_level, LogLevel::Debug);
        assert!(!args.sequential);
    }

    #[test]
    fn extract_defaults() {
        let cli = Cli::try_parse_from([
            "stillcut",
            "extract",
            "--video-path",
            "input.mp4",
            "--subtitle-keyframe-match",
            "match.json",
            "--output-dir",
            "out",
            "--sequential",
        ])
        .unwrap();

        let Commands::Extract(args) = cli.command else {
            panic!("expected extract subcommand");
        };
        assert_eq!(args.max_workers, 4);
        assert_eq!(args.max_frames, -1);
        assert_eq!(args.log_level, LogLevel::Info);
        assert!(args.sequential);
    }

    #[test]
    fn usage_errors_exit_with_one() {
        let missing = Cli::try_parse_from(["stillcut", "extract"]).unwrap_err();
        assert_eq!(usage_exit_code(&missing), 1);

        let bad_number = Cli::try_parse_from([
            "stillcut",
            "extract",
            "--video-path",
            "input.mp4",
            "--subtitle-keyframe-match",
            "match.json",
            "--output-dir",
            "out",
            "--max-workers",
            "many",
        ])
        .unwrap_err();
        assert_eq!(usage_exit_code(&bad_number), 1);

        let no_subcommand = Cli::try_parse_from(["stillcut"]).unwrap_err();
        assert_eq!(usage_exit_code(&no_subcommand), 1);
    }

    #[test]
    fn help_and_version_exit_with_zero() {
        let help = Cli::try_parse_from(["stillcut", "--help"]).unwrap_err();
        assert_eq!(usage_exit_code(&help), 0);

        let version = Cli::try_parse_from(["stillcut", "--version"]).unwrap_err();
        assert_eq!(usage_exit_code(&version), 0);
    }

    #[test]
    fn sampling_disabled_without_flags() {
        assert!(sampling_options(None, -1).unwrap().is_none());
    }

    #[test]
    fn sampling_from_flags() {
        let sampling = sampling_options(Some(2.0), 10).unwrap().unwrap();
        assert_eq!(sampling.interval, Some(Duration::from_secs(2)));
        assert_eq!(sampling.max_frames, Some(10));

        let capped_only = sampling_options(None, 3).unwrap().unwrap();
        assert_eq!(capped_only.interval, None);
        assert_eq!(capped_only.max_frames, Some(3));
    }

    #[test]
    fn sampling_rejects_bad_values() {
        assert!(sampling_options(Some(0.0), -1).is_err());
        assert!(sampling_options(Some(-1.5), -1).is_err());
        assert!(sampling_options(None, 0).is_err());
        assert!(sampling_options(None, -2).is_err());
    }
}

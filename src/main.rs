// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;

use subtitle_forge::app_config::{Config, LogLevel};
use subtitle_forge::app_controller::{Controller, FileReport};
use subtitle_forge::file_utils::{FileManager, FileType};
use subtitle_forge::language_utils::parse_language_hint;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert audio to SRT subtitles (default command)
    Convert(ConvertArgs),

    /// Generate shell completions for subtitle-forge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug, Clone)]
struct ConvertArgs {
    /// Input audio file or directory to process
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[command(flatten)]
    options: ConvertOptions,
}

#[derive(clap::Args, Debug, Clone)]
struct ConvertOptions {
    /// Output file (single input) or directory (folder input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Words per subtitle cue
    #[arg(short, long)]
    words_per_cue: Option<usize>,

    /// Frame rate recorded with each job
    #[arg(short, long)]
    frame_rate: Option<f64>,

    /// Keep the engine's natural segments instead of counting words
    #[arg(long)]
    natural: bool,

    /// Spoken language ("auto" or an ISO 639 code such as 'en', 'fra')
    #[arg(short, long)]
    language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Overwrite existing subtitle files
    #[arg(long)]
    force: bool,
}

/// subtitle-forge - audio to SRT subtitle converter
#[derive(Parser, Debug)]
#[command(name = "subtitle-forge")]
#[command(version)]
#[command(about = "Convert audio recordings to SRT subtitles")]
#[command(long_about = "subtitle-forge transcribes audio with whisper and writes timed SRT subtitles.

EXAMPLES:
    subtitle-forge talk.m4a                      # Write talk.srt next to the input
    subtitle-forge talk.m4a -o subs/talk.srt     # Choose the output file
    subtitle-forge -w 5 talk.m4a                 # Five words per cue
    subtitle-forge --natural -l fr talk.m4a      # French, natural segments
    subtitle-forge --force recordings/           # Convert a whole folder again
    subtitle-forge completions bash > sf.bash    # Generate bash completions

CONFIGURATION:
    Settings are stored in conf.json by default. You can specify a different
    file with --config-path. If the file doesn't exist, a default one is
    created automatically.

REQUIREMENTS:
    ffmpeg   - audio normalization
    whisper  - transcription (openai-whisper command line)")]
#[command(args_conflicts_with_subcommands = true)]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input audio file or directory to process
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    #[command(flatten)]
    options: ConvertOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // Filtering is left to log::max_level so it can change after init
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    // Info until the config or the command line says otherwise
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "subtitle-forge", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Convert(args)) => run_convert(args).await,
        None => match cli.input {
            Some(input) => {
                run_convert(ConvertArgs {
                    input,
                    options: cli.options,
                })
                .await
            }
            None => Err(anyhow!("INPUT is required when no subcommand is specified")),
        },
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run_convert(args: ConvertArgs) -> Result<()> {
    // A command line log level applies before the config is even read
    if let Some(level) = &args.options.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    let (mut config, created) = Config::load_or_create(&args.options.config_path)?;
    if created {
        warn!("Config file not found at {:?}, created a default one.", args.options.config_path);
    }
    apply_overrides(&mut config, &args)?;
    config.validate()?;

    if args.options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let controller = Controller::with_config(config)?;

    match FileManager::detect_file_type(&args.input)? {
        FileType::Directory => {
            let summary = controller.run_folder(args.input.clone(), args.options.output.clone(), args.options.force).await?;
            if summary.failed > 0 {
                return Err(anyhow!("{} file(s) failed to convert", summary.failed));
            }
        }
        FileType::Audio => {
            match controller.run(args.input.clone(), args.options.output.clone(), args.options.force).await? {
                FileReport::Converted { output, cue_count } => {
                    println!("{} cues written to {}", cue_count, output.display());
                }
                FileReport::Skipped { output } => {
                    info!("Nothing to do, {} already exists", output.display());
                }
            }
        }
        FileType::Subtitle => {
            return Err(anyhow!("{:?} is already a subtitle file", args.input));
        }
        FileType::Unknown => {
            return Err(anyhow!("Unsupported input file: {:?}", args.input));
        }
    }

    Ok(())
}

// @applies: Command line values on top of the loaded config
fn apply_overrides(config: &mut Config, args: &ConvertArgs) -> Result<()> {
    if let Some(words) = args.options.words_per_cue {
        config.conversion.words_per_cue = words;
    }
    if let Some(rate) = args.options.frame_rate {
        config.conversion.frame_rate = rate;
    }
    if args.options.natural {
        config.conversion.natural_segmentation = true;
    }
    if let Some(language) = &args.options.language {
        config.conversion.input_language = parse_language_hint(language)?;
    }
    if let Some(level) = &args.options.log_level {
        config.log_level = level.clone().into();
    }
    Ok(())
}

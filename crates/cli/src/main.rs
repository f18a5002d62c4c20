// photokit CLI - compare a bucket with a local tree, build contact sheets,
// plan capture-time renames

mod compare;
mod config;
mod exit_codes;
mod rename;
mod sheet;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use photokit_config::{ConfigError, ConfigSource, Settings};

use exit_codes::{EXIT_CONFIG, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "photokit")]
#[command(about = "Personal photo tools: inventory compare, contact sheets, EXIF renames")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: $PHOTOKIT_CONFIG, then ~/.config/photokit/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a bucket prefix with a local directory by name and EXIF
    #[command(after_help = "\
Examples:
  photokit compare ~/Pictures/2024 --bucket family-photos --prefix 2024/
  photokit compare ~/Pictures/2024 --json -o report.json
  photokit compare ~/Pictures/2024 --fail-on-diff

Credentials come from AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY and
AWS_SESSION_TOKEN.")]
    Compare(compare::CompareArgs),

    /// Build a contact sheet (PDF or JPEG pages) from a folder of JPEGs
    #[command(after_help = "\
Examples:
  photokit sheet ~/Pictures/India
  photokit sheet ~/Pictures/India -o india.pdf --columns 5 --rows 7
  photokit sheet ~/Pictures/India --format jpeg -o pages/
  photokit sheet --remote --bucket family-photos --prefix 2024/India/")]
    Sheet(sheet::SheetArgs),

    /// Write a shell script that renames photos by EXIF capture time
    #[command(after_help = "\
Examples:
  photokit rename ~/Pictures/import
  photokit rename ~/Pictures/import --script rename.sh --target ~/Pictures

Nothing is moved. Review the script, then run it.")]
    Rename(rename::RenameArgs),

    /// Inspect the settings file
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_flag = cli.config.as_deref();
    let result = match cli.command {
        Commands::Compare(args) => load_settings(config_flag).and_then(|s| compare::cmd_compare(args, &s)),
        Commands::Sheet(args) => load_settings(config_flag).and_then(|s| sheet::cmd_sheet(args, &s)),
        Commands::Rename(args) => load_settings(config_flag).and_then(|s| rename::cmd_rename(args, &s)),
        Commands::Config(cmd) => config::cmd_config(cmd, config_flag),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn load_settings(flag: Option<&Path>) -> Result<Settings, CliError> {
    let (settings, source) = Settings::load(flag).map_err(CliError::config)?;
    match source.path() {
        Some(path) => log::info!("settings: {}", path.display()),
        None => log::info!("settings: built-in defaults"),
    }
    Ok(settings)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Missing(_) => Some("check --config and PHOTOKIT_CONFIG".to_string()),
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => {
                Some("run `photokit config show` to see the expected layout".to_string())
            }
            ConfigError::Read { .. } => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    pub fn source(err: photokit_io::SourceError) -> Self {
        let hint = match &err {
            photokit_io::SourceError::Auth(_) => {
                Some("set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY".to_string())
            }
            photokit_io::SourceError::Rejected { .. } => {
                Some("check the bucket, region and endpoint".to_string())
            }
            _ => None,
        };
        Self { code: exit_codes::source_exit_code(&err), message: err.to_string(), hint }
    }
}

/// Where the settings come from, for `config path`.
pub fn resolve_config_source(flag: Option<&Path>) -> ConfigSource {
    Settings::resolve_source(
        flag,
        std::env::var(photokit_config::CONFIG_ENV).ok(),
        Settings::default_path(),
    )
}

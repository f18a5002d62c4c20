//! `photokit config`: where settings come from and what they resolve to.

use std::path::Path;

use clap::Subcommand;
use photokit_config::{ConfigSource, Settings};

use crate::exit_codes::EXIT_CONFIG;
use crate::{resolve_config_source, CliError};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the settings file in effect
    Path,

    /// Print the effective settings (defaults filled in)
    #[command(after_help = "\
Examples:
  photokit config show > ~/.config/photokit/config.toml
  photokit config show --json")]
    Show {
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_config(cmd: ConfigCommands, flag: Option<&Path>) -> Result<(), CliError> {
    let source = resolve_config_source(flag);
    match cmd {
        ConfigCommands::Path => {
            match &source {
                ConfigSource::BuiltIn => match Settings::default_path() {
                    Some(path) => {
                        println!("{}", path.display());
                        eprintln!("(not present, using built-in defaults)");
                    }
                    None => eprintln!("no config directory on this system; using built-in defaults"),
                },
                other => {
                    if let Some(path) = other.path() {
                        println!("{}", path.display());
                    }
                }
            }
            Ok(())
        }
        ConfigCommands::Show { json } => {
            let settings = Settings::load_from(&source).map_err(CliError::config)?;
            let text = if json {
                serde_json::to_string_pretty(&settings)
                    .map_err(|e| CliError::new(EXIT_CONFIG, format!("JSON serialization error: {e}")))?
            } else {
                settings.to_toml().map_err(CliError::config)?
            };
            println!("{}", text.trim_end());
            Ok(())
        }
    }
}

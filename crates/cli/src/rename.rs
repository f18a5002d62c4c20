//! `photokit rename`: capture-time rename script.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use photokit_config::Settings;
use photokit_io::{capture_time, existing_names, walk_files, write_script, SourceError};
use photokit_rename::{plan_renames, render_script, Photo};

use crate::exit_codes::{EXIT_RENAME_SCRIPT, EXIT_RENAME_TARGET};
use crate::CliError;

#[derive(Args)]
pub struct RenameArgs {
    /// Folder of photos, searched recursively
    pub directory: PathBuf,

    /// Script to write (overrides [rename] script)
    #[arg(long, short = 's')]
    pub script: Option<PathBuf>,

    /// Folder the renamed files move to (default: parent of DIRECTORY)
    #[arg(long, short = 't')]
    pub target: Option<PathBuf>,

    /// Print the plan as JSON to stdout
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_rename(args: RenameArgs, settings: &Settings) -> Result<(), CliError> {
    let directory = fs::canonicalize(&args.directory).map_err(|e| {
        CliError::source(SourceError::LocalWalk {
            path: args.directory.clone(),
            message: e.to_string(),
        })
    })?;
    let target = match args.target {
        Some(target) => target,
        None => directory.parent().map(PathBuf::from).ok_or_else(|| {
            CliError::usage(format!("{} has no parent folder", directory.display()))
                .with_hint("pass --target")
        })?,
    };

    let files = walk_files(&directory, &settings.rename.extensions).map_err(CliError::source)?;
    let photos: Vec<Photo> = files
        .into_iter()
        .map(|f| {
            let captured = capture_time(&f.full_path);
            Photo { path: f.full_path, captured }
        })
        .collect();

    let existing = existing_names(&target).map_err(|e| CliError::new(EXIT_RENAME_TARGET, e.to_string()))?;
    let plan = plan_renames(&photos, &target, &existing, BTreeMap::new());

    let script = args
        .script
        .unwrap_or_else(|| PathBuf::from(&settings.rename.script));
    write_script(&script, &render_script(&plan)).map_err(|e| {
        CliError::new(EXIT_RENAME_SCRIPT, format!("cannot write {}: {}", script.display(), e))
    })?;

    if args.json {
        let json_str = serde_json::to_string_pretty(&plan)
            .map_err(|e| CliError::new(EXIT_RENAME_SCRIPT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    eprintln!(
        "planned {} renames into {}, skipped {}",
        plan.moves.len(),
        target.display(),
        plan.skipped.len()
    );
    eprintln!("rename commands written to {}", script.display());
    Ok(())
}

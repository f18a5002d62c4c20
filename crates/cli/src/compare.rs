//! `photokit compare`: bucket prefix vs. local tree.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use photokit_config::Settings;
use photokit_io::{
    exif_fingerprint, file_fingerprint, has_extension, walk_files, write_report, Credentials, ReportFormat,
    S3Client, SourceError,
};
use photokit_recon::{reconcile, DuplicateNames, Fingerprint, FingerprintError, Item, ReconOptions, Side};

use crate::exit_codes::{EXIT_DIFFS, EXIT_REPORT_WRITE};
use crate::CliError;

#[derive(Args)]
pub struct CompareArgs {
    /// Local directory to compare
    pub local: PathBuf,

    /// Bucket name (overrides [remote] bucket)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket (overrides [remote] prefix)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Bucket region (overrides [remote] region)
    #[arg(long)]
    pub region: Option<String>,

    /// S3-compatible endpoint URL, path-style (overrides [remote] endpoint)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Policy for two files with the same name on one side
    #[arg(long, value_enum)]
    pub duplicate_names: Option<DuplicateNamesArg>,

    /// Skip the EXIF pass for files without a name match
    #[arg(long)]
    pub no_content_fallback: bool,

    /// Output JSON instead of the text report
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Exit 1 when either side has files the other lacks
    #[arg(long)]
    pub fail_on_diff: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DuplicateNamesArg {
    LastWins,
    Retain,
}

impl From<DuplicateNamesArg> for DuplicateNames {
    fn from(arg: DuplicateNamesArg) -> Self {
        match arg {
            DuplicateNamesArg::LastWins => DuplicateNames::LastWins,
            DuplicateNamesArg::Retain => DuplicateNames::Retain,
        }
    }
}

/// Bucket coordinates after flags are laid over the settings file.
pub(crate) struct RemoteTarget {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub prefix: String,
}

impl RemoteTarget {
    pub(crate) fn resolve(
        settings: &Settings,
        bucket: Option<String>,
        prefix: Option<String>,
        region: Option<String>,
        endpoint: Option<String>,
    ) -> Result<Self, CliError> {
        let remote = &settings.remote;
        let bucket = bucket.or_else(|| remote.bucket.clone()).ok_or_else(|| {
            CliError::usage("no bucket given")
                .with_hint("pass --bucket or set `bucket` under [remote] in the settings file")
        })?;
        Ok(Self {
            bucket,
            region: region.unwrap_or_else(|| remote.region.clone()),
            endpoint: endpoint.or_else(|| remote.endpoint.clone()),
            prefix: prefix.unwrap_or_else(|| remote.prefix.clone()),
        })
    }

    pub(crate) fn client(&self) -> Result<S3Client, CliError> {
        let credentials = Credentials::from_env().map_err(CliError::source)?;
        S3Client::new(&self.bucket, &self.region, self.endpoint.as_deref(), credentials).map_err(CliError::source)
    }
}

pub fn cmd_compare(args: CompareArgs, settings: &Settings) -> Result<(), CliError> {
    let target = RemoteTarget::resolve(
        settings,
        args.bucket,
        args.prefix,
        args.region,
        args.endpoint,
    )?;
    let compare = &settings.compare;
    let mut options: ReconOptions = compare.recon_options();
    if let Some(policy) = args.duplicate_names {
        options.duplicate_names = policy.into();
    }
    if args.no_content_fallback {
        options.content_fallback = false;
    }

    // Both listings complete before any fingerprinting starts.
    let client = target.client()?;
    let objects = client.list_objects(&target.prefix).map_err(CliError::source)?;
    let mut remote_keys: HashMap<String, String> = HashMap::new();
    let remote: Vec<Item> = objects
        .iter()
        .filter(|o| has_extension(o.name(), &compare.extensions))
        .map(|o| {
            let location = client.object_url(&o.key);
            remote_keys.insert(location.clone(), o.key.clone());
            Item::new(o.name(), location)
        })
        .collect();

    let files = walk_files(&args.local, &compare.extensions).map_err(CliError::source)?;
    let mut local_paths: HashMap<String, PathBuf> = HashMap::new();
    let local: Vec<Item> = files
        .iter()
        .map(|f| {
            let location = f.full_path.display().to_string();
            local_paths.insert(location.clone(), f.full_path.clone());
            Item::new(f.file_name(), location)
        })
        .collect();

    log::info!("listed {} remote and {} local files", remote.len(), local.len());

    // A fatal remote failure during fingerprinting cannot abort the engine
    // from inside the callback; it is parked here and every later remote
    // lookup short-circuits.
    let mut fatal: Option<SourceError> = None;
    let head_bytes = compare.fingerprint_bytes;
    let mut fingerprints = |side: Side, item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
        match side {
            Side::Remote => {
                if fatal.is_some() {
                    return Err(FingerprintError::new(&item.location, "remote unavailable"));
                }
                let key = remote_keys
                    .get(&item.location)
                    .ok_or_else(|| FingerprintError::new(&item.location, "unknown object"))?;
                let head = match client.get_object(key, Some(0..head_bytes)) {
                    Ok(bytes) => bytes,
                    Err(e) if e.is_fatal() => {
                        let message = e.to_string();
                        fatal = Some(e);
                        return Err(FingerprintError::new(&item.location, message));
                    }
                    Err(e) => return Err(FingerprintError::new(&item.location, e.to_string())),
                };
                exif_fingerprint(&head).map_err(|e| FingerprintError::new(&item.location, e))
            }
            Side::Local => {
                let path = local_paths
                    .get(&item.location)
                    .ok_or_else(|| FingerprintError::new(&item.location, "unknown file"))?;
                file_fingerprint(path).map_err(|e| FingerprintError::new(&item.location, e))
            }
        }
    };

    let result = reconcile(&remote, &local, &mut fingerprints, &options);
    if let Some(err) = fatal {
        return Err(CliError::source(err));
    }

    let format = if args.json { ReportFormat::Json } else { ReportFormat::Text };
    write_report(args.output.as_deref(), &result, format).map_err(|e| {
        let target = args
            .output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".to_string());
        CliError::new(EXIT_REPORT_WRITE, format!("cannot write report to {}: {}", target, e))
    })?;
    if let Some(ref path) = args.output {
        eprintln!("wrote {}", path.display());
    }

    let s = &result.summary;
    eprintln!(
        "compared {} remote and {} local files: {} same name, {} renamed, {} only in remote, {} only in local",
        s.remote_items, s.local_items, s.matched_by_name, s.matched_by_content, s.remote_only, s.local_only,
    );
    if s.warnings > 0 {
        eprintln!("{} files could not be read (see report)", s.warnings);
    }

    if args.fail_on_diff && !result.is_in_sync() {
        return Err(CliError::new(EXIT_DIFFS, ""));
    }
    Ok(())
}

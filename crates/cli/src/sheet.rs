//! `photokit sheet`: contact sheets from a local folder or a bucket prefix.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use photokit_config::{Settings, SheetFormat};
use photokit_io::{probe_image, walk_files, JpegPageRenderer, PdfRenderer, S3Client};
use photokit_sheet::{pack, render, ImageSource, Layout, Paper, RenderError, RenderReport, SheetWarning};
use serde::Serialize;

use crate::compare::RemoteTarget;
use crate::exit_codes::{EXIT_SHEET_EMPTY, EXIT_SHEET_LAYOUT, EXIT_SHEET_OUTPUT};
use crate::CliError;

/// Leading bytes fetched from a remote object to read its dimensions.
const REMOTE_PROBE_BYTES: u64 = 128 * 1024;

#[derive(Args)]
pub struct SheetArgs {
    /// Folder of JPEGs. Subfolders become groups.
    pub source: Option<PathBuf>,

    /// Read images from the bucket prefix instead of a folder
    #[arg(long, conflicts_with = "source")]
    pub remote: bool,

    /// Bucket name (with --remote)
    #[arg(long, requires = "remote")]
    pub bucket: Option<String>,

    /// Key prefix (with --remote)
    #[arg(long, requires = "remote")]
    pub prefix: Option<String>,

    /// Bucket region (with --remote)
    #[arg(long, requires = "remote")]
    pub region: Option<String>,

    /// S3-compatible endpoint URL (with --remote)
    #[arg(long, value_name = "URL", requires = "remote")]
    pub endpoint: Option<String>,

    /// PDF file, or output directory for --format jpeg
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, short = 'f', value_enum)]
    pub format: Option<FormatArg>,

    #[arg(long)]
    pub columns: Option<u32>,

    #[arg(long)]
    pub rows: Option<u32>,

    #[arg(long, value_enum)]
    pub paper: Option<PaperArg>,

    /// Page header title
    #[arg(long)]
    pub title: Option<String>,

    /// Keep filling pages across folder boundaries
    #[arg(long)]
    pub no_group_breaks: bool,

    /// JPEG quality 1-100
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Print a JSON summary to stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Pdf,
    Jpeg,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PaperArg {
    A4,
    Letter,
}

impl From<PaperArg> for Paper {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A4 => Paper::A4,
            PaperArg::Letter => Paper::Letter,
        }
    }
}

#[derive(Serialize)]
struct SheetSummary<'a> {
    outputs: Vec<String>,
    pages: usize,
    images: usize,
    placeholders: usize,
    warnings: &'a [SheetWarning],
}

/// Where image bytes come from once the plan exists.
enum Source {
    Local(HashMap<String, PathBuf>),
    Remote(S3Client),
}

impl Source {
    fn read(&self, key: &str) -> Result<Vec<u8>, RenderError> {
        match self {
            Self::Local(paths) => {
                let path = paths
                    .get(key)
                    .ok_or_else(|| RenderError::image(key, "unknown file"))?;
                fs::read(path).map_err(|e| RenderError::image(key, e.to_string()))
            }
            Self::Remote(client) => client.get_object(key, None).map_err(|e| {
                if e.is_fatal() {
                    RenderError::Output(e.to_string())
                } else {
                    RenderError::image(key, e.to_string())
                }
            }),
        }
    }
}

pub fn cmd_sheet(args: SheetArgs, settings: &Settings) -> Result<(), CliError> {
    let sheet = &settings.sheet;
    let layout = effective_layout(&args, settings)?;
    let format = match args.format {
        Some(FormatArg::Pdf) => SheetFormat::Pdf,
        Some(FormatArg::Jpeg) => SheetFormat::Jpeg,
        None => sheet.format,
    };
    let quality = args.quality.unwrap_or(sheet.quality);

    let (images, mut warnings, source, stem) = if args.remote {
        let target = RemoteTarget::resolve(settings, args.bucket, args.prefix, args.region, args.endpoint)?;
        let client = target.client()?;
        let (images, warnings) = list_remote(&client, &target.prefix, &sheet.extensions)?;
        let stem = stem_of(&target.prefix).unwrap_or_else(|| target.bucket.clone());
        (images, warnings, Source::Remote(client), stem)
    } else {
        let dir = args.source.as_deref().ok_or_else(|| {
            CliError::usage("no source folder given").with_hint("pass a folder, or --remote to read the bucket")
        })?;
        let (images, warnings, paths) = list_local(dir, &sheet.extensions)?;
        let stem = stem_of(&dir.to_string_lossy()).unwrap_or_else(|| "contact_sheet".to_string());
        (images, warnings, Source::Local(paths), stem)
    };
    let title = args.title.clone().or_else(|| sheet.title.clone()).unwrap_or_else(|| stem.clone());

    let mut plan = pack(&images, &layout).map_err(|e| CliError::new(EXIT_SHEET_LAYOUT, e.to_string()))?;
    plan.merge_warnings(std::mem::take(&mut warnings));
    if plan.pages.is_empty() {
        for w in &plan.warnings {
            eprintln!("warning: {}", w);
        }
        return Err(CliError::new(EXIT_SHEET_EMPTY, "no readable JPEG images found"));
    }

    let mut bytes = |key: &str| source.read(key);
    let output_err = |e: RenderError| CliError::new(EXIT_SHEET_OUTPUT, e.to_string());
    let (report, outputs) = match format {
        SheetFormat::Pdf => {
            let path = args.output.clone().unwrap_or_else(|| PathBuf::from(format!("{}.pdf", stem)));
            let mut pdf = PdfRenderer::new(layout.page_width, layout.page_height).with_quality(quality);
            let report = render(&plan, &layout, &title, &mut bytes, &mut pdf).map_err(output_err)?;
            pdf.save(&path).map_err(output_err)?;
            (report, vec![path])
        }
        SheetFormat::Jpeg => {
            let dir = args.output.clone().unwrap_or_else(|| PathBuf::from("."));
            fs::create_dir_all(&dir).map_err(|e| {
                CliError::new(EXIT_SHEET_OUTPUT, format!("cannot create {}: {}", dir.display(), e))
            })?;
            let mut pages = JpegPageRenderer::new(&dir, &stem, layout.page_width, layout.page_height)
                .with_dpi(sheet.dpi, layout.page_width, layout.page_height)
                .with_quality(quality);
            let report = render(&plan, &layout, &title, &mut bytes, &mut pages).map_err(output_err)?;
            (report, pages.written().to_vec())
        }
    };

    print_summary(&plan.warnings, &report, &outputs, args.json)
}

fn effective_layout(args: &SheetArgs, settings: &Settings) -> Result<Layout, CliError> {
    let mut layout = match args.paper {
        Some(paper) => settings.sheet.layout.clone().with_paper(paper.into()),
        None => settings.sheet.effective_layout(),
    };
    if let Some(columns) = args.columns {
        layout.columns = columns;
    }
    if let Some(rows) = args.rows {
        layout.rows = rows;
    }
    if args.no_group_breaks {
        layout.break_on_group = false;
    }
    layout
        .validate()
        .map_err(|e| CliError::new(EXIT_SHEET_LAYOUT, e.to_string()))?;
    Ok(layout)
}

/// Output file stem from a folder path or key prefix.
fn stem_of(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    match last {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

/// Folder of `key` below `prefix`, or None for objects directly under it.
/// `prefix` may name a folder with or without the trailing slash.
fn remote_group<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let folder = prefix.trim_end_matches('/');
    let relative = if folder.is_empty() {
        key
    } else {
        key.strip_prefix(folder)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
    };
    relative.rsplit_once('/').map(|(group, _)| group).filter(|g| !g.is_empty())
}

fn list_local(
    dir: &Path,
    extensions: &[String],
) -> Result<(Vec<ImageSource>, Vec<SheetWarning>, HashMap<String, PathBuf>), CliError> {
    let files = walk_files(dir, extensions).map_err(CliError::source)?;
    let mut images = Vec::with_capacity(files.len());
    let mut warnings = Vec::new();
    let mut paths = HashMap::new();

    for file in files {
        let key = file.relative_name.clone();
        let probed = fs::read(&file.full_path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| probe_image(&bytes).map_err(|e| e.to_string()));
        match probed {
            Ok(info) if info.is_jpeg() => {
                let mut image = ImageSource::new(&key, info.width as f64, info.height as f64);
                if let Some(folder) = file.folder() {
                    image = image.in_group(folder);
                }
                images.push(image);
                paths.insert(key, file.full_path);
            }
            Ok(info) => {
                log::warn!("{} is {:?}, not JPEG; skipped", key, info.format);
                warnings.push(SheetWarning::unreadable(key, format!("not a JPEG ({:?})", info.format)));
            }
            Err(message) => {
                log::warn!("cannot read {}: {}", key, message);
                warnings.push(SheetWarning::unreadable(key, message));
            }
        }
    }
    Ok((images, warnings, paths))
}

fn list_remote(
    client: &S3Client,
    prefix: &str,
    extensions: &[String],
) -> Result<(Vec<ImageSource>, Vec<SheetWarning>), CliError> {
    let objects = client.list_objects(prefix).map_err(CliError::source)?;
    let mut images = Vec::new();
    let mut warnings = Vec::new();

    for object in objects.iter().filter(|o| photokit_io::has_extension(o.name(), extensions)) {
        let key = object.key.as_str();
        // Whole object when the frame header lies past the probe window.
        let probed = match client.get_object(key, Some(0..REMOTE_PROBE_BYTES)) {
            Ok(head) => match probe_image(&head) {
                Ok(info) => Ok(info),
                Err(_) => client
                    .get_object(key, None)
                    .map_err(|e| e.to_string())
                    .and_then(|full| probe_image(&full).map_err(|e| e.to_string())),
            },
            Err(e) if e.is_fatal() => return Err(CliError::source(e)),
            Err(e) => Err(e.to_string()),
        };
        match probed {
            Ok(info) if info.is_jpeg() => {
                let mut image = ImageSource::new(key, info.width as f64, info.height as f64);
                if let Some(folder) = remote_group(key, prefix) {
                    image = image.in_group(folder);
                }
                images.push(image);
            }
            Ok(info) => warnings.push(SheetWarning::unreadable(key, format!("not a JPEG ({:?})", info.format))),
            Err(message) => {
                log::warn!("cannot read {}: {}", client.object_url(key), message);
                warnings.push(SheetWarning::unreadable(key, message));
            }
        }
    }
    Ok((images, warnings))
}

fn print_summary(
    plan_warnings: &[SheetWarning],
    report: &RenderReport,
    outputs: &[PathBuf],
    json: bool,
) -> Result<(), CliError> {
    let mut warnings = plan_warnings.to_vec();
    warnings.extend(report.warnings.iter().cloned());

    if json {
        let summary = SheetSummary {
            outputs: outputs.iter().map(|p| p.display().to_string()).collect(),
            pages: report.pages,
            images: report.images,
            placeholders: report.placeholders,
            warnings: &warnings,
        };
        let json_str = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::new(EXIT_SHEET_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    for path in outputs {
        eprintln!("wrote {}", path.display());
    }
    eprintln!(
        "{} pages, {} images, {} placeholders, {} skipped",
        report.pages,
        report.images,
        report.placeholders,
        plan_warnings.len(),
    );
    Ok(())
}

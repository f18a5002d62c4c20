//! Collaborators for the photokit engines: where items, bytes, and pages
//! come from and go to.

pub mod error;
pub mod local;
pub mod metadata;
pub mod pdf;
pub mod probe;
pub mod raster;
pub mod report;
pub mod s3;
pub mod script;

pub use error::{ProbeError, SourceError};
pub use local::{existing_names, has_extension, walk_files, LocalFile};
pub use metadata::{capture_time, exif_fingerprint, file_fingerprint};
pub use pdf::PdfRenderer;
pub use probe::{probe_image, ImageInfo};
pub use raster::JpegPageRenderer;
pub use report::{format_text_report, write_report, write_report_to, ReportFormat};
pub use s3::{Credentials, RemoteObject, S3Client};
pub use script::write_script;

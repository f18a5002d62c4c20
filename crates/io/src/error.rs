use std::fmt;
use std::path::PathBuf;

/// Failure talking to a listing source (S3 bucket or local tree).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Missing credentials or a 401/403 from the remote.
    Auth(String),
    /// The remote could not be reached or kept failing after retries.
    Unavailable(String),
    /// The remote rejected the request itself (bad bucket, bad prefix).
    Rejected { status: u16, message: String },
    /// The local root cannot be walked.
    LocalWalk { path: PathBuf, message: String },
    /// A single object or file could not be read. Never fatal.
    ItemUnreadable { location: String, message: String },
}

impl SourceError {
    pub fn unreadable(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ItemUnreadable {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ItemUnreadable { .. })
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth(msg) => write!(f, "authentication failed: {}", msg),
            Self::Unavailable(msg) => write!(f, "source unavailable: {}", msg),
            Self::Rejected { status, message } => {
                write!(f, "request rejected ({}): {}", status, message)
            }
            Self::LocalWalk { path, message } => {
                write!(f, "cannot walk {}: {}", path.display(), message)
            }
            Self::ItemUnreadable { location, message } => {
                write!(f, "cannot read {}: {}", location, message)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Image bytes that are not a decodable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeError(pub String);

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a readable image: {}", self.0)
    }
}

impl std::error::Error for ProbeError {}

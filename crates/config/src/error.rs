use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// An explicitly named config file does not exist.
    Missing(PathBuf),
    Read { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    /// Parsed fine but a value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "config file not found: {}", path.display()),
            Self::Read { path, message } => write!(f, "cannot read {}: {}", path.display(), message),
            Self::Parse { path, message } => write!(f, "invalid config {}: {}", path.display(), message),
            Self::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

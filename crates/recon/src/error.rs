use std::fmt;

/// A single item could not be fingerprinted (unreadable or corrupt source).
///
/// Never fatal: the engine records it as a warning and treats the item as
/// having no fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintError {
    pub location: String,
    pub message: String,
}

impl FingerprintError {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FingerprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot fingerprint '{}': {}", self.location, self.message)
    }
}

impl std::error::Error for FingerprintError {}

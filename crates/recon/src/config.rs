use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconOptions {
    pub duplicate_names: DuplicateNames,
    /// Run the fingerprint pass for items without a name match.
    pub content_fallback: bool,
}

impl Default for ReconOptions {
    fn default() -> Self {
        Self {
            duplicate_names: DuplicateNames::LastWins,
            content_fallback: true,
        }
    }
}

/// What to do when two items on one side share a name.
///
/// Listings are keyed by basename, so `2002/a/IMG_01.JPG` and
/// `2002/b/IMG_01.JPG` collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNames {
    /// The later-listed item replaces the earlier one; the earlier one is
    /// reported as shadowed and takes no part in matching.
    #[default]
    LastWins,
    /// The later-listed item takes the name slot; earlier ones skip the name
    /// pass but still join the content pass.
    Retain,
}

impl std::fmt::Display for DuplicateNames {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LastWins => write!(f, "last_wins"),
            Self::Retain => write!(f, "retain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ReconOptions::default();
        assert_eq!(opts.duplicate_names, DuplicateNames::LastWins);
        assert!(opts.content_fallback);
    }

    #[test]
    fn policy_names_match_serde() {
        for policy in [DuplicateNames::LastWins, DuplicateNames::Retain] {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{policy}\""));
        }
    }
}

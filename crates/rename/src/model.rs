use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

/// A candidate file and what was learned about its capture time.
///
/// `captured` is `Ok(None)` when the file carries no date tag at all and
/// `Err` when the metadata could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub path: PathBuf,
    pub captured: Result<Option<NaiveDateTime>, String>,
}

impl Photo {
    pub fn taken_at(path: impl Into<PathBuf>, at: NaiveDateTime) -> Self {
        Self {
            path: path.into(),
            captured: Ok(Some(at)),
        }
    }

    pub fn undated(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            captured: Ok(None),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            captured: Err(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedMove {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenamePlan {
    pub moves: Vec<PlannedMove>,
    pub skipped: Vec<SkippedFile>,
    /// Next free counter per base name. Feed back into the next call to
    /// continue numbering.
    pub counters: BTreeMap<String, u32>,
}

impl RenamePlan {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

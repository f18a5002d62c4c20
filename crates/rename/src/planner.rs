use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::model::{Photo, PlannedMove, RenamePlan, SkippedFile};

/// strftime pattern for the name stem. Minute resolution; the counter
/// separates shots taken within the same minute.
pub const BASE_FORMAT: &str = "%Y-%m-%d-%H-%M";

/// Plan a move for every dated photo into `target_dir`.
///
/// Photos are taken in path order. A name is never reused: names already
/// in `existing` and names planned earlier in this call are skipped over.
/// `counters` carries numbering across calls and comes back in the plan.
pub fn plan_renames(
    photos: &[Photo],
    target_dir: &Path,
    existing: &HashSet<String>,
    counters: BTreeMap<String, u32>,
) -> RenamePlan {
    let mut ordered: Vec<&Photo> = photos.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut plan = RenamePlan {
        counters,
        ..RenamePlan::default()
    };
    let mut planned: HashSet<String> = HashSet::new();

    for photo in ordered {
        let at = match &photo.captured {
            Ok(Some(at)) => at,
            Ok(None) => {
                log::warn!("no capture time in {}, skipping", photo.path.display());
                plan.skipped.push(SkippedFile {
                    path: photo.path.clone(),
                    reason: "no EXIF date/time".to_string(),
                });
                continue;
            }
            Err(reason) => {
                log::warn!("cannot read {}: {}, skipping", photo.path.display(), reason);
                plan.skipped.push(SkippedFile {
                    path: photo.path.clone(),
                    reason: reason.clone(),
                });
                continue;
            }
        };

        let base = at.format(BASE_FORMAT).to_string();
        let mut counter = plan.counters.get(&base).copied().unwrap_or(0);
        let mut name = candidate(&base, counter);
        while existing.contains(&name) || planned.contains(&name) {
            counter += 1;
            name = candidate(&base, counter);
        }
        plan.counters.insert(base, counter + 1);

        log::debug!("{} -> {}", photo.path.display(), name);
        plan.moves.push(PlannedMove {
            from: photo.path.clone(),
            to: target_dir.join(&name),
        });
        planned.insert(name);
    }

    plan
}

fn candidate(base: &str, counter: u32) -> String {
    format!("{base}-{counter:02}.JPG")
}

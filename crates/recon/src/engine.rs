use crate::config::ReconOptions;
use crate::evidence::compute_summary;
use crate::matcher::{match_by_content, match_by_name, sort_by_name, working_set, PassOutput};
use crate::model::{
    Item, MatchedPair, ReconMeta, ReconResult, ReconSummary, ShadowedItem, Side,
};
use crate::resolve::{FingerprintSource, Resolver};

/// Classify `remote` and `local` into matched-by-name, matched-by-content,
/// remote-only and local-only buckets.
///
/// Inputs are never mutated; buckets are built from index partitions and
/// cloned out at the end. Output items carry whatever fingerprint was
/// resolved for them during the run.
pub fn reconcile(
    remote: &[Item],
    local: &[Item],
    fingerprints: &mut dyn FingerprintSource,
    options: &ReconOptions,
) -> ReconResult {
    let mut resolver = Resolver::new(fingerprints);

    let remote_set = working_set(remote, options.duplicate_names);
    let local_set = working_set(local, options.duplicate_names);

    let by_name = match_by_name(remote, local, &remote_set, &local_set, &mut resolver);

    // Content pool: names with no counterpart on the other side, plus any
    // retained duplicates. Name collisions stay out.
    let mut remote_pool: Vec<usize> = remote_set
        .by_name
        .iter()
        .filter(|(name, _)| !local_set.by_name.contains_key(*name))
        .map(|(_, &i)| i)
        .chain(remote_set.retained.iter().copied())
        .collect();
    let mut local_pool: Vec<usize> = local_set
        .by_name
        .iter()
        .filter(|(name, _)| !remote_set.by_name.contains_key(*name))
        .map(|(_, &i)| i)
        .chain(local_set.retained.iter().copied())
        .collect();
    sort_by_name(&mut remote_pool, remote);
    sort_by_name(&mut local_pool, local);

    let by_content = if options.content_fallback {
        match_by_content(remote, local, &remote_pool, &local_pool, &mut resolver)
    } else {
        PassOutput {
            matched: Vec::new(),
            remote_unmatched: remote_pool,
            local_unmatched: local_pool,
        }
    };

    let mut remote_only: Vec<usize> = by_name
        .remote_unmatched
        .iter()
        .chain(&by_content.remote_unmatched)
        .copied()
        .collect();
    let mut local_only: Vec<usize> = by_name
        .local_unmatched
        .iter()
        .chain(&by_content.local_unmatched)
        .copied()
        .collect();
    sort_by_name(&mut remote_only, remote);
    sort_by_name(&mut local_only, local);

    let resolved = |resolver: &Resolver<'_>, side: Side, index: usize, items: &[Item]| -> Item {
        let mut item = items[index].clone();
        item.fingerprint = resolver.known(side, index, &items[index]);
        item
    };
    let pairs = |resolver: &Resolver<'_>, matched: &[(usize, usize)]| -> Vec<MatchedPair> {
        matched
            .iter()
            .map(|&(ri, li)| MatchedPair {
                remote: resolved(resolver, Side::Remote, ri, remote),
                local: resolved(resolver, Side::Local, li, local),
            })
            .collect()
    };

    let matched_by_name = pairs(&resolver, &by_name.matched);
    let matched_by_content = pairs(&resolver, &by_content.matched);
    let remote_only: Vec<Item> = remote_only
        .into_iter()
        .map(|i| resolved(&resolver, Side::Remote, i, remote))
        .collect();
    let local_only: Vec<Item> = local_only
        .into_iter()
        .map(|i| resolved(&resolver, Side::Local, i, local))
        .collect();

    let mut shadowed: Vec<ShadowedItem> = Vec::new();
    for (side, items, set) in [(Side::Remote, remote, &remote_set), (Side::Local, local, &local_set)] {
        for &(displaced, by) in &set.shadowed {
            log::info!(
                "{side} '{}' shadowed by later item with the same name: {}",
                items[displaced].location,
                items[by].location
            );
            shadowed.push(ShadowedItem {
                side,
                item: items[displaced].clone(),
                shadowed_by: items[by].location.clone(),
            });
        }
    }

    let mut result = ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            duplicate_names: options.duplicate_names,
        },
        summary: ReconSummary::default(),
        matched_by_name,
        matched_by_content,
        remote_only,
        local_only,
        shadowed,
        warnings: resolver.into_warnings(),
    };
    result.summary = compute_summary(remote.len(), local.len(), &result);

    log::info!(
        "reconciled {} remote / {} local: {} by name, {} by content, {} remote-only, {} local-only",
        result.summary.remote_items,
        result.summary.local_items,
        result.summary.matched_by_name,
        result.summary.matched_by_content,
        result.summary.remote_only,
        result.summary.local_only,
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DuplicateNames;
    use crate::error::FingerprintError;
    use crate::model::{Fingerprint, WarningKind};
    use crate::resolve::Precomputed;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::from_bytes([n; 32])
    }

    fn remote(name: &str, content: u8) -> Item {
        Item::new(name, format!("s3://photos/2002/{name}")).with_fingerprint(fp(content))
    }

    fn local(name: &str, content: u8) -> Item {
        Item::new(name, format!("/pics/2002/{name}")).with_fingerprint(fp(content))
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn empty_inputs() {
        let result = reconcile(&[], &[], &mut Precomputed, &ReconOptions::default());
        assert_eq!(result.summary, ReconSummary::default());
        assert!(result.is_in_sync());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn four_buckets() {
        let r = vec![remote("a.jpg", 1), remote("b.jpg", 2), remote("c.jpg", 3), remote("d.jpg", 4)];
        let l = vec![local("a.jpg", 1), local("b.jpg", 9), local("renamed.jpg", 3), local("e.jpg", 5)];
        let result = reconcile(&r, &l, &mut Precomputed, &ReconOptions::default());

        assert_eq!(result.matched_by_name.len(), 1);
        assert_eq!(result.matched_by_name[0].remote.name, "a.jpg");

        assert_eq!(result.matched_by_content.len(), 1);
        assert_eq!(result.matched_by_content[0].remote.name, "c.jpg");
        assert_eq!(result.matched_by_content[0].local.name, "renamed.jpg");

        // b.jpg collided by name with different content: both sides unmatched
        assert_eq!(names(&result.remote_only), vec!["b.jpg", "d.jpg"]);
        assert_eq!(names(&result.local_only), vec!["b.jpg", "e.jpg"]);
        assert!(result.summary.is_balanced());
    }

    #[test]
    fn name_collision_does_not_enter_content_pass() {
        // Remote b.jpg has the same content as local x.jpg, but its name is
        // taken by a local b.jpg with other content.
        let r = vec![remote("b.jpg", 7)];
        let l = vec![local("b.jpg", 8), local("x.jpg", 7)];
        let result = reconcile(&r, &l, &mut Precomputed, &ReconOptions::default());
        assert!(result.matched_by_content.is_empty());
        assert_eq!(names(&result.remote_only), vec!["b.jpg"]);
        assert_eq!(names(&result.local_only), vec!["b.jpg", "x.jpg"]);
    }

    #[test]
    fn duplicate_remote_name_last_wins() {
        // Two remote IMG_01.JPG under the same prefix with different content:
        // only the later-listed one takes part in matching.
        let r = vec![
            Item::new("IMG_01.JPG", "s3://photos/2002/a/IMG_01.JPG").with_fingerprint(fp(1)),
            Item::new("IMG_01.JPG", "s3://photos/2002/b/IMG_01.JPG").with_fingerprint(fp(2)),
        ];
        let l = vec![local("IMG_01.JPG", 1)];
        let result = reconcile(&r, &l, &mut Precomputed, &ReconOptions::default());

        assert!(result.matched_by_name.is_empty());
        assert_eq!(result.remote_only.len(), 1);
        assert_eq!(result.remote_only[0].location, "s3://photos/2002/b/IMG_01.JPG");
        assert_eq!(result.local_only.len(), 1);
        assert_eq!(result.shadowed.len(), 1);
        assert_eq!(result.shadowed[0].item.location, "s3://photos/2002/a/IMG_01.JPG");
        assert_eq!(result.shadowed[0].shadowed_by, "s3://photos/2002/b/IMG_01.JPG");
        assert!(result.summary.is_balanced());
    }

    #[test]
    fn duplicate_remote_name_retain_joins_content_pass() {
        let r = vec![
            Item::new("IMG_01.JPG", "s3://photos/2002/a/IMG_01.JPG").with_fingerprint(fp(1)),
            Item::new("IMG_01.JPG", "s3://photos/2002/b/IMG_01.JPG").with_fingerprint(fp(2)),
        ];
        let l = vec![local("IMG_01.JPG", 2), local("copy.jpg", 1)];
        let options = ReconOptions {
            duplicate_names: DuplicateNames::Retain,
            ..ReconOptions::default()
        };
        let result = reconcile(&r, &l, &mut Precomputed, &options);

        assert_eq!(result.matched_by_name.len(), 1);
        assert_eq!(result.matched_by_name[0].remote.location, "s3://photos/2002/b/IMG_01.JPG");
        assert_eq!(result.matched_by_content.len(), 1);
        assert_eq!(result.matched_by_content[0].remote.location, "s3://photos/2002/a/IMG_01.JPG");
        assert_eq!(result.matched_by_content[0].local.name, "copy.jpg");
        assert!(result.shadowed.is_empty());
        assert!(result.is_in_sync());
    }

    #[test]
    fn unreadable_item_only_in_its_only_bucket() {
        let r = vec![Item::new("broken.jpg", "s3://photos/broken.jpg")];
        let l = vec![Item::new("other.jpg", "/pics/other.jpg")];
        let mut source = |side: Side, item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            match side {
                Side::Remote => Err(FingerprintError::new(&item.location, "corrupt JPEG header")),
                Side::Local => Ok(Some(fp(3))),
            }
        };
        let result = reconcile(&r, &l, &mut source, &ReconOptions::default());

        assert!(result.matched_by_content.is_empty());
        assert_eq!(names(&result.remote_only), vec!["broken.jpg"]);
        assert_eq!(names(&result.local_only), vec!["other.jpg"]);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::ItemUnreadable);
        assert_eq!(result.warnings[0].side, Side::Remote);
        assert_eq!(result.summary.warnings, 1);
    }

    #[test]
    fn exif_less_files_match_by_name() {
        // Scans without EXIF on both sides are the same file, not a collision.
        let r = vec![Item::new("scan.jpg", "s3://photos/scan.jpg"), Item::new("bad.jpg", "s3://photos/bad.jpg")];
        let l = vec![Item::new("scan.jpg", "/pics/scan.jpg"), Item::new("bad.jpg", "/pics/bad.jpg")];
        let mut source = |side: Side, item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            match (side, item.name.as_str()) {
                (Side::Local, "bad.jpg") => Err(FingerprintError::new(&item.location, "truncated")),
                _ => Ok(None),
            }
        };
        let result = reconcile(&r, &l, &mut source, &ReconOptions::default());

        assert_eq!(result.matched_by_name.len(), 1);
        assert_eq!(result.matched_by_name[0].remote.name, "scan.jpg");
        assert_eq!(result.matched_by_name[0].remote.fingerprint, None);
        assert!(result.matched_by_content.is_empty());
        assert_eq!(names(&result.remote_only), vec!["bad.jpg"]);
        assert_eq!(names(&result.local_only), vec!["bad.jpg"]);
        assert_eq!(result.summary.warnings, 1);
        assert!(result.summary.is_balanced());
    }

    #[test]
    fn lazy_fingerprints_filled_into_output() {
        let r = vec![Item::new("a.jpg", "s3://p/a.jpg")];
        let l = vec![Item::new("a.jpg", "/p/a.jpg")];
        let mut calls = 0;
        let mut source = |_side: Side, _item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            calls += 1;
            Ok(Some(fp(4)))
        };
        let result = reconcile(&r, &l, &mut source, &ReconOptions::default());
        assert_eq!(calls, 2);
        assert_eq!(result.matched_by_name[0].remote.fingerprint, Some(fp(4)));
        assert_eq!(result.matched_by_name[0].local.fingerprint, Some(fp(4)));
    }

    #[test]
    fn content_fallback_disabled() {
        let r = vec![remote("c.jpg", 3)];
        let l = vec![local("renamed.jpg", 3)];
        let options = ReconOptions {
            content_fallback: false,
            ..ReconOptions::default()
        };
        let result = reconcile(&r, &l, &mut Precomputed, &options);
        assert!(result.matched_by_content.is_empty());
        assert_eq!(result.summary.remote_only, 1);
        assert_eq!(result.summary.local_only, 1);
    }
}

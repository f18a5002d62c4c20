use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::config::DuplicateNames;
use crate::model::{Fingerprint, Item, Side};
use crate::resolve::{Resolved, Resolver};

// ---------------------------------------------------------------------------
// Working sets
// ---------------------------------------------------------------------------

/// One side's items keyed by name. Holds input indices, never copies.
#[derive(Debug, Default)]
pub struct WorkingSet<'a> {
    pub by_name: BTreeMap<&'a str, usize>,
    /// Displaced from their name slot but still eligible for the content pass
    /// (`DuplicateNames::Retain`).
    pub retained: Vec<usize>,
    /// `(displaced, displaced_by)` pairs (`DuplicateNames::LastWins`).
    pub shadowed: Vec<(usize, usize)>,
}

/// Key items by name; on a repeated name the later item takes the slot.
pub fn working_set(items: &[Item], policy: DuplicateNames) -> WorkingSet<'_> {
    let mut set = WorkingSet::default();

    for (index, item) in items.iter().enumerate() {
        if let Some(previous) = set.by_name.insert(item.name.as_str(), index) {
            match policy {
                DuplicateNames::LastWins => set.shadowed.push((previous, index)),
                DuplicateNames::Retain => set.retained.push(previous),
            }
        }
    }

    set
}

/// Sort input indices by (name, index) for a deterministic walk order.
pub fn sort_by_name(indices: &mut [usize], items: &[Item]) {
    indices.sort_by(|a, b| items[*a].name.cmp(&items[*b].name).then(a.cmp(b)));
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PassOutput {
    /// `(remote_index, local_index)`
    pub matched: Vec<(usize, usize)>,
    pub remote_unmatched: Vec<usize>,
    pub local_unmatched: Vec<usize>,
}

/// Pair items whose names appear on both sides, provided their fingerprints
/// agree or neither side has EXIF to fingerprint. A shared name with
/// differing content, or with an unreadable item on either side, is not a
/// match: both items come back unmatched.
pub(crate) fn match_by_name(
    remote: &[Item],
    local: &[Item],
    remote_set: &WorkingSet<'_>,
    local_set: &WorkingSet<'_>,
    resolver: &mut Resolver<'_>,
) -> PassOutput {
    let mut out = PassOutput::default();

    for (name, &ri) in &remote_set.by_name {
        let Some(&li) = local_set.by_name.get(name) else {
            continue;
        };

        // Local side is only fingerprinted when the remote one was readable.
        let same = match resolver.lookup(Side::Remote, ri, &remote[ri]) {
            Resolved::Unreadable => false,
            remote_state => resolver.lookup(Side::Local, li, &local[li]) == remote_state,
        };

        if same {
            out.matched.push((ri, li));
        } else {
            log::debug!("name collision with differing content: {name}");
            out.remote_unmatched.push(ri);
            out.local_unmatched.push(li);
        }
    }

    out
}

/// Pair leftover items by fingerprint alone.
///
/// Remote candidates are walked in the given order; each takes the first
/// still-free local candidate (in the given order) with an equal
/// fingerprint. A fingerprint index keeps this linear while preserving the
/// first-match tie-break. Items without a fingerprint never pair.
pub(crate) fn match_by_content(
    remote: &[Item],
    local: &[Item],
    remote_pool: &[usize],
    local_pool: &[usize],
    resolver: &mut Resolver<'_>,
) -> PassOutput {
    if remote_pool.is_empty() || local_pool.is_empty() {
        return PassOutput {
            matched: Vec::new(),
            remote_unmatched: remote_pool.to_vec(),
            local_unmatched: local_pool.to_vec(),
        };
    }

    let mut index: HashMap<Fingerprint, VecDeque<usize>> = HashMap::new();
    for &li in local_pool {
        if let Some(fp) = resolver.resolve(Side::Local, li, &local[li]) {
            index.entry(fp).or_default().push_back(li);
        }
    }

    let mut out = PassOutput::default();
    let mut local_used = vec![false; local.len()];

    for &ri in remote_pool {
        let hit = resolver
            .resolve(Side::Remote, ri, &remote[ri])
            .and_then(|fp| index.get_mut(&fp))
            .and_then(|queue| queue.pop_front());

        match hit {
            Some(li) => {
                local_used[li] = true;
                out.matched.push((ri, li));
            }
            None => out.remote_unmatched.push(ri),
        }
    }

    out.local_unmatched = local_pool
        .iter()
        .copied()
        .filter(|li| !local_used[*li])
        .collect();

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Precomputed;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::from_bytes([n; 32])
    }

    fn item(name: &str, dir: &str, content: Option<u8>) -> Item {
        let it = Item::new(name, format!("{dir}/{name}"));
        match content {
            Some(n) => it.with_fingerprint(fp(n)),
            None => it,
        }
    }

    #[test]
    fn working_set_last_wins() {
        let items = vec![
            item("IMG_01.JPG", "a", Some(1)),
            item("IMG_02.JPG", "a", Some(2)),
            item("IMG_01.JPG", "b", Some(3)),
        ];
        let set = working_set(&items, DuplicateNames::LastWins);
        assert_eq!(set.by_name.len(), 2);
        assert_eq!(set.by_name["IMG_01.JPG"], 2);
        assert_eq!(set.shadowed, vec![(0, 2)]);
        assert!(set.retained.is_empty());
    }

    #[test]
    fn working_set_retain() {
        let items = vec![item("x.jpg", "a", None), item("x.jpg", "b", None), item("x.jpg", "c", None)];
        let set = working_set(&items, DuplicateNames::Retain);
        assert_eq!(set.by_name["x.jpg"], 2);
        assert_eq!(set.retained, vec![0, 1]);
        assert!(set.shadowed.is_empty());
    }

    #[test]
    fn name_pass_requires_equal_content() {
        let remote = vec![item("a.jpg", "r", Some(1)), item("b.jpg", "r", Some(2))];
        let local = vec![item("a.jpg", "l", Some(1)), item("b.jpg", "l", Some(9))];
        let rs = working_set(&remote, DuplicateNames::LastWins);
        let ls = working_set(&local, DuplicateNames::LastWins);
        let mut source = Precomputed;
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_name(&remote, &local, &rs, &ls, &mut resolver);
        assert_eq!(out.matched, vec![(0, 0)]);
        assert_eq!(out.remote_unmatched, vec![1]);
        assert_eq!(out.local_unmatched, vec![1]);
    }

    #[test]
    fn name_pass_matches_when_neither_side_has_exif() {
        let remote = vec![item("a.jpg", "r", None), item("b.jpg", "r", None)];
        let local = vec![item("a.jpg", "l", None), item("b.jpg", "l", Some(2))];
        let rs = working_set(&remote, DuplicateNames::LastWins);
        let ls = working_set(&local, DuplicateNames::LastWins);
        let mut source = Precomputed;
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_name(&remote, &local, &rs, &ls, &mut resolver);
        assert_eq!(out.matched, vec![(0, 0)]);
        assert_eq!(out.remote_unmatched, vec![1]);
        assert_eq!(out.local_unmatched, vec![1]);
    }

    #[test]
    fn name_pass_unreadable_is_not_a_match() {
        let remote = vec![item("a.jpg", "r", None)];
        let local = vec![item("a.jpg", "l", None)];
        let rs = working_set(&remote, DuplicateNames::LastWins);
        let ls = working_set(&local, DuplicateNames::LastWins);
        let mut source = |side: Side, it: &Item| -> Result<Option<Fingerprint>, crate::FingerprintError> {
            match side {
                Side::Remote => Ok(None),
                Side::Local => Err(crate::FingerprintError::new(&it.location, "truncated")),
            }
        };
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_name(&remote, &local, &rs, &ls, &mut resolver);
        assert!(out.matched.is_empty());
        assert_eq!(out.remote_unmatched, vec![0]);
        assert_eq!(out.local_unmatched, vec![0]);
    }

    #[test]
    fn content_pass_first_match_in_pool_order() {
        let remote = vec![item("r1.jpg", "r", Some(5))];
        let local = vec![item("z.jpg", "l", Some(5)), item("m.jpg", "l", Some(5))];
        let mut pool = vec![0, 1];
        sort_by_name(&mut pool, &local);
        assert_eq!(pool, vec![1, 0]);

        let mut source = Precomputed;
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_content(&remote, &local, &[0], &pool, &mut resolver);
        assert_eq!(out.matched, vec![(0, 1)]); // m.jpg sorts before z.jpg
        assert_eq!(out.local_unmatched, vec![0]);
        assert!(out.remote_unmatched.is_empty());
    }

    #[test]
    fn content_pass_each_local_used_once() {
        let remote = vec![item("a.jpg", "r", Some(5)), item("b.jpg", "r", Some(5))];
        let local = vec![item("c.jpg", "l", Some(5))];
        let mut source = Precomputed;
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_content(&remote, &local, &[0, 1], &[0], &mut resolver);
        assert_eq!(out.matched, vec![(0, 0)]);
        assert_eq!(out.remote_unmatched, vec![1]);
        assert!(out.local_unmatched.is_empty());
    }

    #[test]
    fn content_pass_skips_extraction_when_other_side_empty() {
        let remote = vec![item("a.jpg", "r", None)];
        let mut source = |_s: Side, _i: &Item| -> Result<Option<Fingerprint>, crate::FingerprintError> {
            panic!("no extraction expected")
        };
        let mut resolver = Resolver::new(&mut source);
        let out = match_by_content(&remote, &[], &[0], &[], &mut resolver);
        assert_eq!(out.remote_unmatched, vec![0]);
    }
}

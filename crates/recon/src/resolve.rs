use std::collections::HashMap;

use crate::error::FingerprintError;
use crate::model::{Fingerprint, Item, Side, Warning, WarningKind};

/// Supplies content fingerprints on demand.
///
/// Extraction is assumed expensive (it may mean a ranged download), so the
/// engine only asks for items that actually need comparing, and at most once
/// per item per run.
pub trait FingerprintSource {
    /// `Ok(None)` means the item has nothing to fingerprint (e.g. no EXIF
    /// block). `Err` means the item could not be read at all.
    fn fingerprint(&mut self, side: Side, item: &Item) -> Result<Option<Fingerprint>, FingerprintError>;
}

/// Uses only the fingerprints already present on the items.
#[derive(Debug, Default, Clone, Copy)]
pub struct Precomputed;

impl FingerprintSource for Precomputed {
    fn fingerprint(&mut self, _side: Side, _item: &Item) -> Result<Option<Fingerprint>, FingerprintError> {
        Ok(None)
    }
}

impl<F> FingerprintSource for F
where
    F: FnMut(Side, &Item) -> Result<Option<Fingerprint>, FingerprintError>,
{
    fn fingerprint(&mut self, side: Side, item: &Item) -> Result<Option<Fingerprint>, FingerprintError> {
        self(side, item)
    }
}

/// What extraction produced for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolved {
    Fingerprint(Fingerprint),
    /// Readable, but nothing to fingerprint (no EXIF block).
    Absent,
    Unreadable,
}

impl Resolved {
    pub(crate) fn fingerprint(self) -> Option<Fingerprint> {
        match self {
            Self::Fingerprint(fp) => Some(fp),
            Self::Absent | Self::Unreadable => None,
        }
    }
}

/// Memoizing front for a [`FingerprintSource`], keyed by (side, input index).
pub(crate) struct Resolver<'a> {
    source: &'a mut dyn FingerprintSource,
    cache: HashMap<(Side, usize), Resolved>,
    warnings: Vec<Warning>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(source: &'a mut dyn FingerprintSource) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn resolve(&mut self, side: Side, index: usize, item: &Item) -> Option<Fingerprint> {
        self.lookup(side, index, item).fingerprint()
    }

    pub(crate) fn lookup(&mut self, side: Side, index: usize, item: &Item) -> Resolved {
        if let Some(fp) = item.fingerprint {
            return Resolved::Fingerprint(fp);
        }
        if let Some(cached) = self.cache.get(&(side, index)) {
            return *cached;
        }

        let resolved = match self.source.fingerprint(side, item) {
            Ok(Some(fp)) => Resolved::Fingerprint(fp),
            Ok(None) => Resolved::Absent,
            Err(e) => {
                log::warn!("{side} item unreadable, excluded from content matching: {e}");
                self.warnings.push(Warning {
                    kind: WarningKind::ItemUnreadable,
                    side,
                    location: item.location.clone(),
                    message: e.message,
                });
                Resolved::Unreadable
            }
        };
        self.cache.insert((side, index), resolved);
        resolved
    }

    /// Fingerprint already resolved for this item, without triggering extraction.
    pub(crate) fn known(&self, side: Side, index: usize, item: &Item) -> Option<Fingerprint> {
        item.fingerprint
            .or_else(|| self.cache.get(&(side, index)).and_then(|r| r.fingerprint()))
    }

    pub(crate) fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(n: u8) -> Fingerprint {
        Fingerprint::from_bytes([n; 32])
    }

    #[test]
    fn resolves_once_per_item() {
        let mut calls = 0;
        let mut source = |_side: Side, _item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            calls += 1;
            Ok(Some(fp(1)))
        };
        let item = Item::new("a.jpg", "/a.jpg");
        {
            let mut r = Resolver::new(&mut source);
            assert_eq!(r.resolve(Side::Local, 0, &item), Some(fp(1)));
            assert_eq!(r.resolve(Side::Local, 0, &item), Some(fp(1)));
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn embedded_fingerprint_skips_source() {
        let mut source = |_side: Side, _item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            panic!("source must not be called")
        };
        let item = Item::new("a.jpg", "/a.jpg").with_fingerprint(fp(7));
        let mut r = Resolver::new(&mut source);
        assert_eq!(r.resolve(Side::Remote, 3, &item), Some(fp(7)));
    }

    #[test]
    fn failure_becomes_warning() {
        let mut source = |_side: Side, item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            Err(FingerprintError::new(&item.location, "truncated"))
        };
        let item = Item::new("a.jpg", "s3://b/a.jpg");
        let mut r = Resolver::new(&mut source);
        assert_eq!(r.resolve(Side::Remote, 0, &item), None);
        assert_eq!(r.resolve(Side::Remote, 0, &item), None);
        let warnings = r.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ItemUnreadable);
        assert_eq!(warnings[0].location, "s3://b/a.jpg");
        assert_eq!(warnings[0].message, "truncated");
    }

    #[test]
    fn missing_exif_is_not_unreadable() {
        let mut source = |side: Side, item: &Item| -> Result<Option<Fingerprint>, FingerprintError> {
            match side {
                Side::Remote => Ok(None),
                Side::Local => Err(FingerprintError::new(&item.location, "permission denied")),
            }
        };
        let item = Item::new("scan.jpg", "/scan.jpg");
        let mut r = Resolver::new(&mut source);
        assert_eq!(r.lookup(Side::Remote, 0, &item), Resolved::Absent);
        assert_eq!(r.lookup(Side::Local, 0, &item), Resolved::Unreadable);
        assert_eq!(r.into_warnings().len(), 1);
    }
}

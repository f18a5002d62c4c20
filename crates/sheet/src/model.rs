use std::fmt;

use serde::Serialize;

/// One image to place on the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSource {
    /// Sort key, usually the path relative to the scanned root.
    pub key: String,
    /// Folder the image came from. Drives page breaks when enabled.
    pub group: Option<String>,
    pub natural_width: f64,
    pub natural_height: f64,
}

impl ImageSource {
    pub fn new(key: impl Into<String>, natural_width: f64, natural_height: f64) -> Self {
        Self {
            key: key.into(),
            group: None,
            natural_width,
            natural_height,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Filename part of the key, used as the caption.
    pub fn caption(&self) -> &str {
        self.key.rsplit(['/', '\\']).next().unwrap_or(&self.key)
    }

    pub(crate) fn has_usable_size(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        ok(self.natural_width) && ok(self.natural_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GridSlot {
    pub page: usize,
    pub row: u32,
    pub column: u32,
}

/// Where to draw one image. Page coordinates in points, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawInstruction {
    pub slot: GridSlot,
    pub scaled_width: f64,
    pub scaled_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Top-left of the caption band.
    pub caption_x: f64,
    pub caption_y: f64,
    pub cell_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placement {
    pub key: String,
    pub caption: String,
    pub instruction: DrawInstruction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PagePlan {
    pub index: usize,
    pub group: Option<String>,
    pub placements: Vec<Placement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetWarningKind {
    /// Source could not be decoded or has unusable dimensions. No slot used.
    ItemUnreadable,
    /// Image could not be drawn. Its slot holds a placeholder.
    RenderFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetWarning {
    pub kind: SheetWarningKind,
    pub key: String,
    pub message: String,
}

impl SheetWarning {
    pub fn unreadable(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: SheetWarningKind::ItemUnreadable,
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn render_failure(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: SheetWarningKind::RenderFailure,
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SheetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            SheetWarningKind::ItemUnreadable => "unreadable",
            SheetWarningKind::RenderFailure => "render failed",
        };
        write!(f, "{}: {} ({})", label, self.key, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetPlan {
    pub pages: Vec<PagePlan>,
    pub warnings: Vec<SheetWarning>,
}

impl SheetPlan {
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.placements.len()).sum()
    }

    /// Prepend warnings gathered before packing (decode failures).
    pub fn merge_warnings(&mut self, earlier: Vec<SheetWarning>) {
        let later = std::mem::replace(&mut self.warnings, earlier);
        self.warnings.extend(later);
    }
}

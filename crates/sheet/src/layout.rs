use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::model::{DrawInstruction, GridSlot};

// ---------------------------------------------------------------------------
// Paper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    #[default]
    A4,
    Letter,
}

impl Paper {
    /// (width, height) in PostScript points, portrait.
    pub fn size_points(&self) -> (f64, f64) {
        match self {
            Self::A4 => (595.28, 841.89),
            Self::Letter => (612.0, 792.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Upper bound on columns x rows. A 32x32 sheet is already thumbnail-sized.
pub const MAX_SLOTS_PER_PAGE: usize = 1024;

/// Grid and page geometry, all lengths in points.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Layout {
    pub columns: u32,
    pub rows: u32,
    pub margin: f64,
    pub page_width: f64,
    pub page_height: f64,
    /// Band at the top of every page reserved for the page header.
    pub header_height: f64,
    /// Band below every image reserved for its filename.
    pub caption_height: f64,
    /// Start a new page whenever the image group (parent folder) changes.
    pub break_on_group: bool,
}

impl Default for Layout {
    fn default() -> Self {
        let (page_width, page_height) = Paper::A4.size_points();
        Self {
            columns: 4,
            rows: 6,
            margin: 28.0,
            page_width,
            page_height,
            header_height: 20.0,
            caption_height: 12.0,
            break_on_group: true,
        }
    }
}

/// Validated cell geometry derived from a [`Layout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub columns: u32,
    pub rows: u32,
    pub cell_width: f64,
    pub cell_height: f64,
    origin_x: f64,
    origin_y: f64,
    caption_height: f64,
}

impl Layout {
    pub fn with_paper(mut self, paper: Paper) -> Self {
        let (w, h) = paper.size_points();
        self.page_width = w;
        self.page_height = h;
        self
    }

    pub fn slots_per_page(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        self.grid().map(|_| ())
    }

    pub fn grid(&self) -> Result<Grid, LayoutError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(LayoutError::EmptyGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self.slots_per_page() > MAX_SLOTS_PER_PAGE {
            return Err(LayoutError::TooManySlots {
                columns: self.columns,
                rows: self.rows,
                max: MAX_SLOTS_PER_PAGE,
            });
        }

        for (field, value) in [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("margin", self.margin),
            ("header_height", self.header_height),
            ("caption_height", self.caption_height),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidDimension { field, value });
            }
        }

        let cell_width = (self.page_width - 2.0 * self.margin) / self.columns as f64;
        let cell_height =
            (self.page_height - 2.0 * self.margin - self.header_height) / self.rows as f64;

        if cell_width <= 0.0 || cell_height <= 0.0 {
            return Err(LayoutError::CellTooSmall { cell_width, cell_height });
        }
        if self.caption_height >= cell_height {
            return Err(LayoutError::CaptionTooTall {
                caption_height: self.caption_height,
                cell_height,
            });
        }

        Ok(Grid {
            columns: self.columns,
            rows: self.rows,
            cell_width,
            cell_height,
            origin_x: self.margin,
            origin_y: self.margin + self.header_height,
            caption_height: self.caption_height,
        })
    }
}

impl Grid {
    pub fn slots_per_page(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Slot for the `n`th placement (0-based) on a page, row-major.
    pub fn slot(&self, page: usize, n: usize) -> GridSlot {
        GridSlot {
            page,
            row: (n / self.columns as usize) as u32,
            column: (n % self.columns as usize) as u32,
        }
    }

    /// Height left for the image once the caption band is reserved.
    pub fn image_height(&self) -> f64 {
        self.cell_height - self.caption_height
    }

    /// Scale factor for an image of the given natural size. Never above 1.0.
    pub fn fit_scale(&self, natural_width: f64, natural_height: f64) -> f64 {
        (self.cell_width / natural_width)
            .min(self.image_height() / natural_height)
            .min(1.0)
    }

    /// Geometry for one image: centered horizontally, bottom edge resting on
    /// the caption band. Offsets are page coordinates from the top-left.
    pub fn place(&self, slot: GridSlot, natural_width: f64, natural_height: f64) -> DrawInstruction {
        let scale = self.fit_scale(natural_width, natural_height);
        let scaled_width = natural_width * scale;
        let scaled_height = natural_height * scale;

        let cell_x = self.origin_x + slot.column as f64 * self.cell_width;
        let cell_y = self.origin_y + slot.row as f64 * self.cell_height;

        DrawInstruction {
            slot,
            scaled_width,
            scaled_height,
            offset_x: cell_x + (self.cell_width - scaled_width) / 2.0,
            offset_y: cell_y + (self.image_height() - scaled_height),
            caption_x: cell_x,
            caption_y: cell_y + self.image_height(),
            cell_width: self.cell_width,
        }
    }
}

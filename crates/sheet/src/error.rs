use std::fmt;

/// Invalid layout settings. Fatal: nothing is packed.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// Columns or rows set to zero.
    EmptyGrid { columns: u32, rows: u32 },
    /// More cells per page than [`MAX_SLOTS_PER_PAGE`](crate::layout::MAX_SLOTS_PER_PAGE).
    TooManySlots { columns: u32, rows: u32, max: usize },
    /// Page dimensions, margin, or band heights not finite / negative.
    InvalidDimension { field: &'static str, value: f64 },
    /// Margins and header leave no room for a cell.
    CellTooSmall { cell_width: f64, cell_height: f64 },
    /// Caption band swallows the whole cell height.
    CaptionTooTall { caption_height: f64, cell_height: f64 },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid { columns, rows } => {
                write!(f, "grid must have at least one column and row (got {columns}x{rows})")
            }
            Self::TooManySlots { columns, rows, max } => {
                write!(f, "grid {columns}x{rows} exceeds {max} cells per page")
            }
            Self::InvalidDimension { field, value } => {
                write!(f, "layout {field} must be a non-negative number, got {value}")
            }
            Self::CellTooSmall { cell_width, cell_height } => {
                write!(f, "margins leave no room for cells ({cell_width:.1} x {cell_height:.1} pt)")
            }
            Self::CaptionTooTall { caption_height, cell_height } => write!(
                f,
                "caption band ({caption_height:.1} pt) must be smaller than the cell height ({cell_height:.1} pt)"
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// One image could not be fetched or drawn. The slot gets a placeholder.
    Image { key: String, message: String },
    /// The output itself could not be produced. Aborts the run.
    Output(String),
}

impl RenderError {
    pub fn image(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Image {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { key, message } => write!(f, "cannot draw '{key}': {message}"),
            Self::Output(msg) => write!(f, "cannot write sheet: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

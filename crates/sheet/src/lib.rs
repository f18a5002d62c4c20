//! `photokit-sheet`: contact sheet layout.
//!
//! [`pack`] places an ordered run of images into a fixed grid spread over
//! as many pages as needed. [`render`] walks the resulting plan and drives
//! any [`PageRenderer`] (PDF, JPEG pages, test recorders).

pub mod error;
pub mod layout;
pub mod model;
pub mod packer;
pub mod render;

pub use error::{LayoutError, RenderError};
pub use layout::{Layout, Paper};
pub use model::{DrawInstruction, GridSlot, ImageSource, PagePlan, Placement, SheetPlan, SheetWarning, SheetWarningKind};
pub use packer::pack;
pub use render::{render, ImageBytes, PageRenderer, RenderReport};

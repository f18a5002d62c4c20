//! `photokit-rename`: plan capture-time renames.
//!
//! Nothing here touches the filesystem. [`plan_renames`] turns a list of
//! photos with their capture times into a move list, and
//! [`render_script`] turns that list into a bash script for the user to
//! review and run.

pub mod model;
pub mod planner;
pub mod script;

pub use model::{Photo, PlannedMove, RenamePlan, SkippedFile};
pub use planner::{plan_renames, BASE_FORMAT};
pub use script::{render_script, shell_quote};

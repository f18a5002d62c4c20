//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                 |
//! |---------|-----------|---------------------------------------------|
//! | 0       | Universal | Success                                     |
//! | 1       | Universal | Differences found (`compare --fail-on-diff`)|
//! | 2       | Universal | CLI usage error (bad args, missing option)  |
//! | 3       | Universal | Settings file missing or invalid            |
//! | 10-19   | compare   | Remote and local listing failures           |
//! | 20-29   | sheet     | Layout and output failures                  |
//! | 30-39   | rename    | Rename planning and script output           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use photokit_io::SourceError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Compare found items on one side only.
/// Like `diff(1)`, exit 1 means "inventories differ." Only with `--fail-on-diff`.
pub const EXIT_DIFFS: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Settings file missing, unreadable, or invalid.
pub const EXIT_CONFIG: u8 = 3;

// =============================================================================
// Compare (10-19)
// =============================================================================

/// Remote could not be reached, or kept failing after retries.
pub const EXIT_REMOTE_UNAVAILABLE: u8 = 10;

/// Missing credentials, or the remote answered 401/403.
pub const EXIT_REMOTE_AUTH: u8 = 11;

/// Local root missing or not a directory.
pub const EXIT_LOCAL_WALK: u8 = 12;

/// Remote rejected the request (bad bucket, bad endpoint).
pub const EXIT_REMOTE_REJECTED: u8 = 13;

/// Report could not be written.
pub const EXIT_REPORT_WRITE: u8 = 14;

// =============================================================================
// Sheet (20-29)
// =============================================================================

/// Layout leaves no room for a cell (zero grid, margins too large).
pub const EXIT_SHEET_LAYOUT: u8 = 20;

/// PDF or page images could not be written.
pub const EXIT_SHEET_OUTPUT: u8 = 21;

/// No readable image found in the source.
pub const EXIT_SHEET_EMPTY: u8 = 22;

// =============================================================================
// Rename (30-39)
// =============================================================================

/// Rename script could not be written.
pub const EXIT_RENAME_SCRIPT: u8 = 30;

/// Target directory could not be listed.
pub const EXIT_RENAME_TARGET: u8 = 31;

/// Map a listing failure to its exit code.
pub fn source_exit_code(err: &SourceError) -> u8 {
    match err {
        SourceError::Auth(_) => EXIT_REMOTE_AUTH,
        SourceError::Unavailable(_) => EXIT_REMOTE_UNAVAILABLE,
        SourceError::Rejected { .. } => EXIT_REMOTE_REJECTED,
        SourceError::LocalWalk { .. } => EXIT_LOCAL_WALK,
        SourceError::ItemUnreadable { .. } => EXIT_REMOTE_UNAVAILABLE,
    }
}

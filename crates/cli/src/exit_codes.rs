//! CLI exit code registry.
//!
//! Single source of truth for every exit code. Exit codes are part of the
//! shell contract — scripts branch on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, missing file)                 |
//! | 3    | Validation overall status FAIL                            |
//! | 4    | Accuracy comparison found discrepancies or one-sided keys |
//! | 5    | Reconciliation outside tolerance                          |
//! | 6    | I/O error (unreadable input, database open failure)       |
//! | 7    | Parse error (malformed CSV, bad config)                   |
//!
//! A WARN validation outcome exits 0: warnings are advisory and must not
//! break pipelines.

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// General error. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Validation ran to completion and the overall status is FAIL.
pub const EXIT_VALIDATION_FAILED: u8 = 3;

/// Accuracy comparison found at least one non-MATCH key.
pub const EXIT_COMPARE_MISMATCH: u8 = 4;

/// Reconciliation produced a variance outside tolerance.
pub const EXIT_RECON_BREACH: u8 = 5;

/// I/O error reading input or opening the database.
pub const EXIT_IO_ERROR: u8 = 6;

/// Parse error in CSV input or config file.
pub const EXIT_PARSE_ERROR: u8 = 7;

//! CLI Exit Code Registry
//!
//! Single source of truth for the `insights` exit codes. Scripts and
//! schedulers rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (QA failures included, unless `--strict`)         |
//! | 2    | Usage or configuration error                              |
//! | 3    | Artifacts could not be written                            |
//! | 10   | No country master data from any registry                  |
//! | 11   | Quality gate failed (only with `--strict`)                |
//!
//! Partial indicator coverage is never a failure exit: the run still writes
//! every artifact and records the failed indicators in `qa_status.json`.

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, unreadable or invalid config.
pub const EXIT_USAGE: u8 = 2;

/// Output directory or artifact file could not be written.
pub const EXIT_IO: u8 = 3;

/// Every registry failed or returned nothing.
pub const EXIT_NO_MASTER_DATA: u8 = 10;

/// Quality gate reported `passed: false` and `--strict` was given.
pub const EXIT_QA_FAILED: u8 = 11;

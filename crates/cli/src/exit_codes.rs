//! CLI Exit Code Registry
//!
//! Single source of truth for `stockmerge` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                               |
//! |------|-------------------------------------------------------|
//! | 0    | Success (warnings do not change the exit code)        |
//! | 1    | Unexpected failure                                    |
//! | 2    | Usage error (bad arguments, unreadable job file path) |
//! | 3    | Input error (unreadable file, missing column)         |
//! | 4    | Invalid job file                                      |
//! | 5    | Report could not be written                           |

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// Unexpected failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error: bad arguments or a job file path that cannot be read.
pub const EXIT_USAGE: u8 = 2;

/// An input file is missing, unreadable, or lacks a required column.
pub const EXIT_INPUT: u8 = 3;

/// The job file does not parse or fails validation.
pub const EXIT_INVALID_JOB: u8 = 4;

/// The report could not be rendered or written.
pub const EXIT_OUTPUT: u8 = 5;

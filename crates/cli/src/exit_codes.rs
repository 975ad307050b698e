//! CLI Exit Code Registry
//!
//! Single source of truth for `shipvoid` exit codes. Scheduled jobs and
//! wrapper scripts branch on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (output could not be written, etc.)   |
//! | 2    | Usage error (bad arguments)                          |
//! | 3    | An extract could not be loaded                       |
//! | 4    | Config file unreadable or invalid                    |
//! | 5    | No extract found by discovery                        |
//! | 6    | Discrepancies found and `--strict` was given         |

use shipvoid_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// Load error - extract missing, unreadable, or lacking a required column.
pub const EXIT_LOAD: u8 = 3;

/// Config error - TOML parse or validation failure.
pub const EXIT_CONFIG: u8 = 4;

/// No Shipvoid or Legacy extract matched the discovery patterns.
pub const EXIT_NO_INPUT: u8 = 5;

/// Reconciliation found shipvoid-only, legacy-only, duplicate, invalid or
/// mismatched-quantity records (only with `--strict`).
pub const EXIT_DISCREPANCIES: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::Config(_) => EXIT_CONFIG,
        ReconError::Load(_) => EXIT_LOAD,
        ReconError::NoInput { .. } => EXIT_NO_INPUT,
        ReconError::Discovery { .. } => EXIT_CONFIG,
    }
}

//! CLI exit code handling.
//!
//! Exit codes:
//! - 0: Success (output on stdout)
//! - 1: Input or configuration error (nothing published)
//! - 2: Anonymity could not be guaranteed (nothing published)

use std::process::ExitCode;

use pad_core::PadError;

/// Exit codes for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    /// Success
    Success = 0,
    /// Malformed dataset, invalid config, unreadable file
    InputError = 1,
    /// k-anonymity unattainable for this input
    AnonymityFailure = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<CliExitCode> for i32 {
    fn from(code: CliExitCode) -> Self {
        code as i32
    }
}

impl From<&PadError> for CliExitCode {
    fn from(err: &PadError) -> Self {
        if err.is_anonymity_failure() {
            CliExitCode::AnonymityFailure
        } else {
            CliExitCode::InputError
        }
    }
}

/// Determine the exit code for any command error.
///
/// Errors that wrap a `PadError` are classified by it; everything else
/// (file access, JSON decoding) is an input error.
pub fn exit_code_for_error(err: &anyhow::Error) -> CliExitCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PadError>())
        .map_or(CliExitCode::InputError, CliExitCode::from)
}

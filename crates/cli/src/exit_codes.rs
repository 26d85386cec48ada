//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes of `shopmerge`. Scripts rely on
//! them, so existing values never change meaning.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments)                          |
//! | 3    | Source directory missing                             |
//! | 4    | Country mapping missing or unreadable                |
//! | 5    | Settings file unreadable or invalid                  |
//! | 6    | Output directory or artifact could not be written    |
//! | 7    | Run finished but one or more categories failed       |

use shopmerge_merge::MergeError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// The source directory does not exist.
pub const EXIT_SOURCE_MISSING: u8 = 3;

/// Amazon settlement requested without a loadable country mapping.
pub const EXIT_MAPPING: u8 = 4;

/// Settings file could not be read or parsed.
pub const EXIT_SETTINGS: u8 = 5;

/// Output directory could not be created, or a workbook could not be written.
pub const EXIT_OUTPUT: u8 = 6;

/// At least one category stopped early. Other categories were still written.
pub const EXIT_PARTIAL: u8 = 7;

/// Map a run-level merge error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::SourceRootMissing(_) => EXIT_SOURCE_MISSING,
        MergeError::MappingRequired => EXIT_MAPPING,
        MergeError::OutputDir { .. } | MergeError::Write(_) | MergeError::Rename { .. } => EXIT_OUTPUT,
        MergeError::Scan { .. } | MergeError::Glob(_) | MergeError::Pattern { .. } => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn fatal_errors_have_distinct_codes() {
        assert_eq!(
            merge_exit_code(&MergeError::SourceRootMissing(PathBuf::from("x"))),
            EXIT_SOURCE_MISSING
        );
        assert_eq!(merge_exit_code(&MergeError::MappingRequired), EXIT_MAPPING);
        assert_ne!(EXIT_SOURCE_MISSING, EXIT_MAPPING);
    }
}

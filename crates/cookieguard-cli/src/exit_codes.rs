//! Process exit codes of the `cookieguard` binary.
//!
//! Errors from the consent layer keep their own code (see
//! `ConsentError::exit_code`); anything else is a configuration error.

use cookieguard_core::ConsentError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_BLOCKED: i32 = 1; // Cookie not allowed or not in the catalog
pub const EXIT_CONFIG_ERROR: i32 = 2;

pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ConsentError>())
        .map_or(EXIT_CONFIG_ERROR, ConsentError::exit_code)
}

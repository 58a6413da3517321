//! Detection of files that were already post-processed.

use tracing::debug;

use crate::error::Result;
use crate::store::GridFile;

/// Decision taken by [`check_processed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// The derived field is absent; the pair can be processed.
    Proceed,
    /// The derived field already exists; the pair must be left alone.
    Skip,
}

/// Check whether `file` already carries the derived field `derived_name`.
///
/// Only a definite "not found" lets processing continue. Any other failure
/// from the lookup is returned as an error.
pub fn check_processed<F: GridFile>(file: &F, derived_name: &str) -> Result<GuardDecision> {
    if file.has_variable(derived_name)? {
        debug!(file = %file.path().display(), variable = derived_name, "Derived field present");
        Ok(GuardDecision::Skip)
    } else {
        Ok(GuardDecision::Proceed)
    }
}

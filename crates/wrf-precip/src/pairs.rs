//! Pairing of consecutive output files.

use std::path::{Path, PathBuf};

use crate::config::{OutputMode, WRF_OUTPUT_PREFIX};

/// Consecutive `(previous, current)` pairs of a chronologically ordered list.
///
/// Element `i` is paired with element `i + 1`, so `N` paths give `N - 1`
/// pairs and fewer than two paths give none.
pub fn file_pairs<P: AsRef<Path>>(paths: &[P]) -> impl Iterator<Item = (&Path, &Path)> + '_ {
    paths
        .windows(2)
        .map(|pair| (pair[0].as_ref(), pair[1].as_ref()))
}

/// Path that receives the derived field for `current`.
///
/// In copy mode a leading `wrfout` in the file name is replaced by the
/// prefix (`wrfout_d01_...` becomes `pwrfout_d01_...`); other names get the
/// prefix and an underscore prepended.
pub fn output_path(current: &Path, mode: &OutputMode) -> PathBuf {
    match mode {
        OutputMode::InPlace => current.to_path_buf(),
        OutputMode::Copy { prefix } => {
            let name = current
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let renamed = match name.strip_prefix(WRF_OUTPUT_PREFIX) {
                Some(rest) => format!("{}{}", prefix, rest),
                None => format!("{}_{}", prefix, name),
            };
            current.with_file_name(renamed)
        }
    }
}

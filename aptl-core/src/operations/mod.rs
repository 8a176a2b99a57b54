pub mod fetch;
pub mod install;
pub mod show;
pub mod update;

pub use fetch::{fetch, fetch_packages};
pub use install::{DefaultsPolicy, InstallOptions, install, plan};
pub use show::{render_template, show, show_packages};
pub use update::{UpdateSummary, bootstrap, update};

use crate::{AptlError, Result};
use std::io::Write;
use std::path::Path;

/// Writes through a temporary file in the same directory so readers never
/// see a partial file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| AptlError::WriteFile {
        path: path.to_path_buf(),
        source,
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(bytes).map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;

    Ok(())
}

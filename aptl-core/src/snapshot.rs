use crate::filter::{MarkedInstall, PackageFilter};
use crate::index::PackageIndex;
use crate::{AptlError, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub version: String,
}

/// The packages selected for installation with their candidate versions,
/// sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSnapshot {
    entries: Vec<SnapshotEntry>,
}

impl InstallSnapshot {
    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
            .ok()
            .map(|index| self.entries[index].version.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.entries).map_err(|err| AptlError::SerializeJson {
            reason: err.to_string(),
        })
    }

    pub fn write_to(&self, path: &Path, json: bool) -> Result<()> {
        let data = if json {
            format!("{}\n", self.to_json()?)
        } else {
            self.to_string()
        };

        fs::write(path, data).map_err(|source| AptlError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl fmt::Display for InstallSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries.iter() {
            writeln!(f, "{}={}", entry.name, entry.version)?;
        }
        Ok(())
    }
}

pub fn snapshot<I: PackageIndex>(index: &I) -> InstallSnapshot {
    snapshot_with(index, &MarkedInstall)
}

pub fn snapshot_with<I, F>(index: &I, filter: &F) -> InstallSnapshot
where
    I: PackageIndex,
    F: PackageFilter + ?Sized,
{
    let mut entries: Vec<SnapshotEntry> = index
        .packages()
        .into_iter()
        .filter(|package| filter.matches(package))
        .filter_map(|package| {
            let candidate = package.candidate()?;
            Some(SnapshotEntry {
                name: package.name().to_string(),
                version: candidate.as_str().to_string(),
            })
        })
        .collect();

    entries.sort();
    InstallSnapshot { entries }
}

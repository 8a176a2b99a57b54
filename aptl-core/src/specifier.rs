use crate::index::{Package, PackageIndex};
use crate::{AptlError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// A package reference as typed by the user: `name`, `name=version` or
/// `name_version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageSpecifier {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpecifier {
    /// Checked in this order; the first one present splits the token.
    pub const DELIMITERS: [char; 2] = ['=', '_'];

    pub fn parse(token: &str) -> Self {
        let token = token.trim();

        for delimiter in Self::DELIMITERS {
            if let Some((name, version)) = token.split_once(delimiter) {
                let version = version.trim();
                return PackageSpecifier {
                    name: name.trim().to_string(),
                    version: (!version.is_empty()).then(|| version.to_string()),
                };
            }
        }

        PackageSpecifier {
            name: token.to_string(),
            version: None,
        }
    }

    pub fn resolve<'a, I: PackageIndex>(&self, index: &'a I) -> Result<&'a Package> {
        index.lookup(&self.name)
    }

    /// Fails when the package, or the pinned version of it, is not in
    /// `index`. Nothing is modified.
    pub fn check<I: PackageIndex>(&self, index: &I) -> Result<()> {
        let package = self.resolve(index)?;

        if let Some(version) = self.version.as_deref() {
            if package.version(version).is_none() {
                return Err(AptlError::UnknownVersion {
                    name: self.name.clone(),
                    version: version.to_string(),
                    available: package.available_versions(),
                });
            }
        }

        Ok(())
    }

    /// Looks the package up and, when a version was given, makes it the
    /// candidate.
    pub fn apply<I: PackageIndex>(&self, index: &mut I) -> Result<()> {
        self.resolve(index)?;

        if let Some(version) = self.version.as_deref() {
            index.set_candidate(&self.name, version)?;
        }

        Ok(())
    }
}

impl From<&str> for PackageSpecifier {
    fn from(token: &str) -> Self {
        PackageSpecifier::parse(token)
    }
}

impl fmt::Display for PackageSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}={}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// One specifier per line; blank lines and `#` comments are skipped.
pub fn parse_list(text: &str) -> Vec<PackageSpecifier> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PackageSpecifier::parse)
        .collect()
}

pub fn read_list(path: &Path) -> Result<Vec<PackageSpecifier>> {
    let text = fs::read_to_string(path).map_err(|source| AptlError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_list(&text))
}

/// Keeps the last occurrence of every package name, ordered by where that
/// last occurrence appeared.
pub fn dedup_last_wins(specifiers: &[PackageSpecifier]) -> Vec<PackageSpecifier> {
    let mut last: BTreeMap<&str, usize> = BTreeMap::new();
    for (position, specifier) in specifiers.iter().enumerate() {
        last.insert(specifier.name.as_str(), position);
    }

    specifiers
        .iter()
        .enumerate()
        .filter(|(position, specifier)| last.get(specifier.name.as_str()) == Some(position))
        .map(|(_, specifier)| specifier.clone())
        .collect()
}

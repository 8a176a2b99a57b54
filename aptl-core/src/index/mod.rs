pub mod apt;
pub mod control;

pub use apt::{AptCache, AptCheckpoint};
pub use control::{Stanza, parse_stanzas};

use crate::{AptlError, Result};
use aptl_debver::{Alternative, DependencyGroup, Version, parse_dependencies};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Required,
    Important,
    Standard,
    Optional,
    Extra,
    Unknown,
}

impl Priority {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "required" => Priority::Required,
            "important" => Priority::Important,
            "standard" => Priority::Standard,
            "optional" => Priority::Optional,
            "extra" => Priority::Extra,
            _ => Priority::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Required => "required",
            Priority::Important => "important",
            Priority::Standard => "standard",
            Priority::Optional => "optional",
            Priority::Extra => "extra",
            Priority::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReason {
    Manual,
    Automatic,
}

/// One installable version of a package, as described by a control stanza.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    pub version: Version,
    pub architecture: String,
    pub priority: Priority,
    pub essential: bool,
    pub pre_depends: Vec<DependencyGroup>,
    pub depends: Vec<DependencyGroup>,
    pub recommends: Vec<DependencyGroup>,
    pub provides: Vec<Alternative>,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub sha256: Option<String>,
    pub base_uri: Option<String>,
    pub record: Stanza,
}

impl PackageVersion {
    pub fn from_stanza(path: &Path, stanza: Stanza, base_uri: Option<&str>) -> Result<Self> {
        let invalid = |reason: String| AptlError::InvalidRecord {
            path: path.to_path_buf(),
            reason,
        };

        let name = stanza
            .get("Package")
            .ok_or_else(|| invalid("record without Package field".into()))?;
        let raw_version = stanza
            .get("Version")
            .ok_or_else(|| invalid(format!("{} has no Version field", name)))?;
        let version = Version::parse(raw_version)
            .map_err(|err| invalid(format!("{}: {}", name, err)))?;

        let relations = |field: &str| -> Result<Vec<DependencyGroup>> {
            match stanza.get(field) {
                Some(value) => parse_dependencies(value)
                    .map_err(|err| invalid(format!("{} {}: {}", name, field, err))),
                None => Ok(Vec::new()),
            }
        };

        let pre_depends = relations("Pre-Depends")?;
        let depends = relations("Depends")?;
        let recommends = relations("Recommends")?;
        let provides = relations("Provides")?
            .into_iter()
            .flat_map(|group| group.alternatives)
            .collect();

        Ok(PackageVersion {
            version,
            architecture: stanza.get("Architecture").unwrap_or("all").to_string(),
            priority: stanza
                .get("Priority")
                .map(Priority::parse)
                .unwrap_or(Priority::Unknown),
            essential: stanza
                .get("Essential")
                .is_some_and(|v| v.eq_ignore_ascii_case("yes")),
            pre_depends,
            depends,
            recommends,
            provides,
            filename: stanza.get("Filename").map(str::to_string),
            size: stanza.get("Size").and_then(|s| s.parse().ok()),
            sha256: stanza.get("SHA256").map(|s| s.to_ascii_lowercase()),
            base_uri: base_uri.map(str::to_string),
            record: stanza,
        })
    }

    pub fn as_str(&self) -> &str {
        self.version.as_str()
    }

    pub fn download_url(&self) -> Option<String> {
        let base = self.base_uri.as_deref()?;
        let filename = self.filename.as_deref()?;
        Some(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            filename.trim_start_matches("./")
        ))
    }

    /// Whether this version's `Provides` satisfies `alternative`. Unversioned
    /// provides only satisfy unversioned dependencies.
    pub fn provides_for(&self, alternative: &Alternative) -> bool {
        self.provides.iter().any(|provided| {
            provided.name == alternative.name
                && match (&alternative.constraint, &provided.constraint) {
                    (None, _) => true,
                    (Some(_), None) => false,
                    (Some(_), Some(given)) => alternative.accepts(&given.version),
                }
        })
    }
}

#[derive(Debug, Clone)]
pub struct Package {
    pub(crate) name: String,
    pub(crate) versions: BTreeMap<String, PackageVersion>,
    pub(crate) candidate: Option<String>,
    pub(crate) installed: Option<String>,
    pub(crate) marked: Option<MarkReason>,
}

impl Package {
    pub(crate) fn new(name: &str) -> Self {
        Package {
            name: name.to_string(),
            versions: BTreeMap::new(),
            candidate: None,
            installed: None,
            marked: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn versions(&self) -> &BTreeMap<String, PackageVersion> {
        &self.versions
    }

    pub fn version(&self, version: &str) -> Option<&PackageVersion> {
        self.versions.get(version)
    }

    pub fn candidate(&self) -> Option<&PackageVersion> {
        self.candidate.as_ref().and_then(|key| self.versions.get(key))
    }

    pub fn installed(&self) -> Option<&PackageVersion> {
        self.installed.as_ref().and_then(|key| self.versions.get(key))
    }

    pub fn essential(&self) -> bool {
        self.candidate().is_some_and(|c| c.essential)
    }

    pub fn priority(&self) -> Priority {
        self.candidate()
            .map(|c| c.priority)
            .unwrap_or(Priority::Unknown)
    }

    pub fn marked_install(&self) -> bool {
        self.marked.is_some()
    }

    pub fn mark_reason(&self) -> Option<MarkReason> {
        self.marked
    }

    /// The version that will be on the system once marks are applied.
    pub fn effective(&self) -> Option<&PackageVersion> {
        if self.marked.is_some() {
            self.candidate()
        } else {
            self.installed()
        }
    }

    pub(crate) fn available_versions(&self) -> String {
        let mut versions: Vec<&PackageVersion> = self.versions.values().collect();
        versions.sort_by(|a, b| a.version.cmp(&b.version));
        versions
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The package index capability the planner works against.
///
/// `mark_install` owns dependency closure: once it returns `Ok`, every
/// package needed to satisfy the marked package's dependencies is marked too.
pub trait PackageIndex {
    type Checkpoint;

    fn package_names(&self) -> Vec<String>;

    fn package(&self, name: &str) -> Option<&Package>;

    fn set_candidate(&mut self, name: &str, version: &str) -> Result<()>;

    fn mark_install(&mut self, name: &str, reason: MarkReason) -> Result<()>;

    fn checkpoint(&self) -> Self::Checkpoint;

    fn restore(&mut self, checkpoint: Self::Checkpoint);

    fn lookup(&self, name: &str) -> Result<&Package> {
        self.package(name)
            .ok_or_else(|| AptlError::UnknownPackage {
                name: name.to_string(),
            })
    }

    fn packages(&self) -> Vec<&Package> {
        self.package_names()
            .iter()
            .filter_map(|name| self.package(name))
            .collect()
    }
}

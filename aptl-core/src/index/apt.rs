use super::control::parse_stanzas;
use super::{MarkReason, Package, PackageIndex, PackageVersion};
use crate::sources::{self, IndexTarget};
use crate::{AptlConfig, AptlError, Architecture, Result, console};
use aptl_debver::{Alternative, DependencyGroup};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// The Debian package index of one local cache: every `Packages` list of the
/// configured architecture plus the dpkg status file.
#[derive(Debug, Clone)]
pub struct AptCache {
    architecture: Architecture,
    install_recommends: bool,
    packages: BTreeMap<String, Package>,
    providers: BTreeMap<String, BTreeSet<String>>,
}

/// Candidates and marks of every package, as captured by `checkpoint`.
#[derive(Debug, Clone)]
pub struct AptCheckpoint {
    state: Vec<(String, Option<String>, Option<MarkReason>)>,
}

impl AptCache {
    pub fn new(architecture: Architecture, install_recommends: bool) -> Self {
        AptCache {
            architecture,
            install_recommends,
            packages: BTreeMap::new(),
            providers: BTreeMap::new(),
        }
    }

    pub fn load(config: &AptlConfig) -> Result<Self> {
        let started = Instant::now();
        let mut cache = AptCache::new(config.architecture, config.install_recommends);

        let entries = sources::read_sources(config)?;
        let targets = sources::targets_for(&entries, config.architecture);
        let lists_dir = config.lists_dir();

        for target in targets.iter() {
            let path = lists_dir.join(&target.list_name);
            if !path.is_file() {
                console::warn(&format!(
                    "no package list for {}; run `apt-local update`",
                    target.url
                ));
                continue;
            }
            cache.load_list(&path, target)?;
        }

        let status = config.status_path();
        if status.is_file() {
            let text = fs::read_to_string(&status).map_err(|source| AptlError::ReadFile {
                path: status.clone(),
                source,
            })?;
            cache.add_status(&status, &text)?;
        }

        if console::is_logging_enabled() {
            console::verbose(&format!(
                "loaded {} packages from {} lists in {:.3}s",
                cache.len(),
                targets.len(),
                started.elapsed().as_secs_f64()
            ));
        }

        Ok(cache)
    }

    fn load_list(&mut self, path: &Path, target: &IndexTarget) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|source| AptlError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let added = self.add_list(path, &text, Some(&target.base_uri))?;

        tracing::debug!(list = %path.display(), records = added, "read package list");
        Ok(())
    }

    /// Adds the records of a `Packages` file. Records for other
    /// architectures are skipped; returns the number of records kept.
    pub fn add_list(&mut self, path: &Path, text: &str, base_uri: Option<&str>) -> Result<usize> {
        let mut added = 0;

        for stanza in parse_stanzas(path, text)? {
            let version = PackageVersion::from_stanza(path, stanza, base_uri)?;
            if !self.accepts_architecture(&version.architecture) {
                continue;
            }

            let name = version
                .record
                .get("Package")
                .unwrap_or_default()
                .to_string();
            self.insert(&name, version, false);
            added += 1;
        }

        Ok(added)
    }

    /// Adds the installed packages of a dpkg status file.
    pub fn add_status(&mut self, path: &Path, text: &str) -> Result<usize> {
        let mut added = 0;

        for stanza in parse_stanzas(path, text)? {
            let installed = stanza
                .get("Status")
                .and_then(|status| status.split_whitespace().last())
                .is_some_and(|state| state == "installed");
            if !installed {
                continue;
            }

            let version = PackageVersion::from_stanza(path, stanza, None)?;
            if !self.accepts_architecture(&version.architecture) {
                continue;
            }

            let name = version
                .record
                .get("Package")
                .unwrap_or_default()
                .to_string();
            self.insert(&name, version, true);
            added += 1;
        }

        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn marked_count(&self) -> usize {
        self.packages.values().filter(|p| p.marked_install()).count()
    }

    fn accepts_architecture(&self, arch: &str) -> bool {
        arch == "all" || arch == self.architecture.as_str()
    }

    // The first record seen for a version wins; the candidate is the highest
    // version overall.
    fn insert(&mut self, name: &str, version: PackageVersion, installed: bool) {
        for provided in version.provides.iter() {
            self.providers
                .entry(provided.name.clone())
                .or_default()
                .insert(name.to_string());
        }

        let package = self
            .packages
            .entry(name.to_string())
            .or_insert_with(|| Package::new(name));

        let key = version.as_str().to_string();

        let better = package
            .candidate()
            .is_none_or(|current| version.version > current.version);
        if better {
            package.candidate = Some(key.clone());
        }

        if installed {
            package.installed = Some(key.clone());
        }

        package.versions.entry(key).or_insert(version);
    }

    // A package installed at its candidate version is kept rather than
    // marked.
    fn is_kept(package: &Package) -> bool {
        package.installed.is_some() && package.installed == package.candidate
    }

    // Only qualifiers that resolve to the configured architecture can be
    // satisfied; there is no multiarch.
    fn alternative_usable(&self, alternative: &Alternative) -> bool {
        match alternative.arch_qualifier.as_deref() {
            None | Some("any") | Some("native") => true,
            Some(arch) => arch == self.architecture.as_str(),
        }
    }

    fn satisfied(&self, group: &DependencyGroup) -> bool {
        group.alternatives.iter().any(|alternative| {
            if !self.alternative_usable(alternative) {
                return false;
            }

            let direct = self
                .packages
                .get(&alternative.name)
                .and_then(|p| p.effective())
                .is_some_and(|v| alternative.accepts(&v.version));

            direct
                || self
                    .providers
                    .get(&alternative.name)
                    .into_iter()
                    .flatten()
                    .filter_map(|provider| self.packages.get(provider))
                    .filter_map(|p| p.effective())
                    .any(|v| v.provides_for(alternative))
        })
    }

    fn choose(&self, group: &DependencyGroup) -> Option<String> {
        for alternative in group.alternatives.iter() {
            if !self.alternative_usable(alternative) {
                continue;
            }

            if let Some(package) = self.packages.get(&alternative.name)
                && package
                    .candidate()
                    .is_some_and(|c| alternative.accepts(&c.version))
            {
                return Some(package.name.clone());
            }

            let provider = self
                .providers
                .get(&alternative.name)
                .into_iter()
                .flatten()
                .filter_map(|provider| self.packages.get(provider))
                .find(|p| p.candidate().is_some_and(|c| c.provides_for(alternative)));

            if let Some(provider) = provider {
                return Some(provider.name.clone());
            }
        }

        None
    }

    // Returns true when the package's dependencies still need walking.
    fn mark(&mut self, name: &str, reason: MarkReason) -> bool {
        let Some(package) = self.packages.get_mut(name) else {
            return false;
        };

        if Self::is_kept(package) {
            return false;
        }

        package.marked = match (package.marked, reason) {
            (Some(MarkReason::Manual), _) => Some(MarkReason::Manual),
            (_, reason) => Some(reason),
        };

        true
    }

    fn dependency_groups(&self, name: &str) -> Vec<(DependencyGroup, bool)> {
        let Some(candidate) = self.packages.get(name).and_then(|p| p.candidate()) else {
            return Vec::new();
        };

        let mut groups: Vec<(DependencyGroup, bool)> = candidate
            .pre_depends
            .iter()
            .chain(candidate.depends.iter())
            .cloned()
            .map(|group| (group, true))
            .collect();

        if self.install_recommends {
            groups.extend(candidate.recommends.iter().cloned().map(|g| (g, false)));
        }

        groups
    }
}

impl PackageIndex for AptCache {
    type Checkpoint = AptCheckpoint;

    fn package_names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    fn set_candidate(&mut self, name: &str, version: &str) -> Result<()> {
        let package = self
            .packages
            .get_mut(name)
            .ok_or_else(|| AptlError::UnknownPackage {
                name: name.to_string(),
            })?;

        if !package.versions.contains_key(version) {
            return Err(AptlError::UnknownVersion {
                name: name.to_string(),
                version: version.to_string(),
                available: package.available_versions(),
            });
        }

        package.candidate = Some(version.to_string());
        Ok(())
    }

    fn mark_install(&mut self, name: &str, reason: MarkReason) -> Result<()> {
        if !self.packages.contains_key(name) {
            return Err(AptlError::UnknownPackage {
                name: name.to_string(),
            });
        }

        if !self.mark(name, reason) {
            return Ok(());
        }

        let mut queue = VecDeque::from([name.to_string()]);
        let mut visited = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }

            for (group, hard) in self.dependency_groups(&current) {
                if self.satisfied(&group) {
                    continue;
                }

                match self.choose(&group) {
                    Some(target) => {
                        if self.mark(&target, MarkReason::Automatic) {
                            queue.push_back(target);
                        }
                    }
                    None if hard => {
                        return Err(AptlError::UnsatisfiableDependency {
                            package: current,
                            dependency: group.to_string(),
                        });
                    }
                    None => {
                        if console::is_logging_enabled() {
                            console::verbose(&format!(
                                "skipping unsatisfiable recommendation {} of {}",
                                group, current
                            ));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn checkpoint(&self) -> AptCheckpoint {
        AptCheckpoint {
            state: self
                .packages
                .values()
                .map(|p| (p.name.clone(), p.candidate.clone(), p.marked))
                .collect(),
        }
    }

    fn restore(&mut self, checkpoint: AptCheckpoint) {
        for (name, candidate, marked) in checkpoint.state {
            if let Some(package) = self.packages.get_mut(&name) {
                package.candidate = candidate;
                package.marked = marked;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES: &str = "\
Package: app
Version: 1.0
Architecture: amd64
Priority: optional
Depends: libfoo (>= 2), mail-transport-agent, editor | vim
Recommends: docs, missing-recommend

Package: libfoo
Version: 1.5
Architecture: amd64

Package: libfoo
Version: 2.1
Architecture: amd64
Pre-Depends: libc

Package: libc
Version: 2.36
Architecture: amd64
Priority: required

Package: postfix
Version: 3.7
Architecture: amd64
Provides: mail-transport-agent

Package: exim
Version: 4.96
Architecture: amd64
Provides: mail-transport-agent

Package: vim
Version: 9.0
Architecture: amd64

Package: docs
Version: 1.0
Architecture: all

Package: foreign
Version: 1.0
Architecture: armhf
";

    fn cache(install_recommends: bool) -> AptCache {
        let mut cache = AptCache::new(Architecture::Amd64, install_recommends);
        cache
            .add_list(Path::new("Packages"), PACKAGES, Some("http://x/debian"))
            .unwrap();
        cache
    }

    fn marked(cache: &AptCache) -> Vec<String> {
        cache
            .packages()
            .into_iter()
            .filter(|p| p.marked_install())
            .map(|p| p.name().to_string())
            .collect()
    }

    #[test]
    fn picks_highest_version_as_candidate_and_skips_foreign_arch() {
        let cache = cache(true);
        assert_eq!(cache.lookup("libfoo").unwrap().candidate().unwrap().as_str(), "2.1");
        assert!(cache.package("foreign").is_none());
        assert!(matches!(
            cache.lookup("nope"),
            Err(AptlError::UnknownPackage { .. })
        ));
    }

    #[test]
    fn marks_transitive_closure() {
        let mut cache = cache(false);
        cache.mark_install("app", MarkReason::Manual).unwrap();

        // exim sorts before postfix among the providers.
        assert_eq!(marked(&cache), vec!["app", "exim", "libc", "libfoo", "vim"]);
        assert_eq!(
            cache.lookup("app").unwrap().mark_reason(),
            Some(MarkReason::Manual)
        );
        assert_eq!(
            cache.lookup("libc").unwrap().mark_reason(),
            Some(MarkReason::Automatic)
        );
    }

    #[test]
    fn recommends_are_optional() {
        let mut cache = cache(true);
        cache.mark_install("app", MarkReason::Manual).unwrap();
        assert!(cache.lookup("docs").unwrap().marked_install());
    }

    #[test]
    fn pinned_candidate_must_satisfy_dependencies() {
        let mut cache = cache(false);
        cache.set_candidate("libfoo", "1.5").unwrap();

        let err = cache.mark_install("app", MarkReason::Manual).unwrap_err();
        assert!(matches!(err, AptlError::UnsatisfiableDependency { .. }));
    }

    #[test]
    fn unknown_version_lists_available() {
        let mut cache = cache(false);
        match cache.set_candidate("libfoo", "9") {
            Err(AptlError::UnknownVersion { available, .. }) => {
                assert_eq!(available, "1.5, 2.1")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn own_architecture_qualifier_is_satisfiable() {
        let mut cache = AptCache::new(Architecture::Amd64, false);
        cache
            .add_list(
                Path::new("Packages"),
                "Package: a\nVersion: 1\nArchitecture: amd64\n\nPackage: b\nVersion: 1\nArchitecture: amd64\nDepends: a:amd64\n\nPackage: c\nVersion: 1\nArchitecture: amd64\nDepends: a:armhf\n",
                None,
            )
            .unwrap();

        cache.mark_install("b", MarkReason::Manual).unwrap();
        assert!(cache.lookup("a").unwrap().marked_install());

        let err = cache.mark_install("c", MarkReason::Manual).unwrap_err();
        assert!(matches!(err, AptlError::UnsatisfiableDependency { .. }));
    }

    #[test]
    fn automatic_mark_never_downgrades_manual() {
        let mut cache = cache(false);
        cache.mark_install("libc", MarkReason::Manual).unwrap();
        cache.mark_install("libfoo", MarkReason::Automatic).unwrap();

        assert_eq!(
            cache.lookup("libc").unwrap().mark_reason(),
            Some(MarkReason::Manual)
        );
    }

    #[test]
    fn installed_packages_are_kept() {
        let mut cache = cache(false);
        cache
            .add_status(
                Path::new("status"),
                "Package: libc\nStatus: install ok installed\nVersion: 2.36\nArchitecture: amd64\n\nPackage: vim\nStatus: deinstall ok config-files\nVersion: 9.0\nArchitecture: amd64\n",
            )
            .unwrap();

        cache.mark_install("libfoo", MarkReason::Manual).unwrap();

        assert!(!cache.lookup("libc").unwrap().marked_install());
        assert!(cache.lookup("libc").unwrap().installed().is_some());
        assert!(cache.lookup("vim").unwrap().installed().is_none());
    }

    #[test]
    fn restore_rolls_back_marks_and_candidates() {
        let mut cache = cache(false);
        let saved = cache.checkpoint();

        cache.set_candidate("libfoo", "1.5").unwrap();
        cache.mark_install("libfoo", MarkReason::Manual).unwrap();
        cache.restore(saved);

        assert_eq!(cache.marked_count(), 0);
        assert_eq!(cache.lookup("libfoo").unwrap().candidate().unwrap().as_str(), "2.1");
    }
}

use crate::console;
use crate::index::{AptCache, MarkReason, Package, PackageIndex, Priority};
use crate::snapshot::{InstallSnapshot, snapshot};
use crate::specifier::{self, PackageSpecifier};
use crate::{AptlConfig, Result};
use std::collections::BTreeSet;
use std::time::Instant;

/// Which packages are selected before any explicit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultsPolicy {
    pub essential: bool,
    pub priorities: BTreeSet<Priority>,
}

impl Default for DefaultsPolicy {
    fn default() -> Self {
        DefaultsPolicy {
            essential: true,
            priorities: BTreeSet::from([Priority::Required]),
        }
    }
}

impl DefaultsPolicy {
    pub fn none() -> Self {
        DefaultsPolicy {
            essential: false,
            priorities: BTreeSet::new(),
        }
    }

    pub fn selects(&self, package: &Package) -> bool {
        (self.essential && package.essential()) || self.priorities.contains(&package.priority())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub requested: Vec<PackageSpecifier>,
    pub defaults: DefaultsPolicy,
}

/// Marks the default packages, then every request, on `index`. On error the
/// index is restored to the state it had before the call.
pub fn plan<I: PackageIndex>(
    index: &mut I,
    policy: &DefaultsPolicy,
    requests: &[PackageSpecifier],
) -> Result<()> {
    let checkpoint = index.checkpoint();

    match mark_all(index, policy, requests) {
        Ok(()) => Ok(()),
        Err(err) => {
            index.restore(checkpoint);
            Err(err)
        }
    }
}

fn mark_all<I: PackageIndex>(
    index: &mut I,
    policy: &DefaultsPolicy,
    requests: &[PackageSpecifier],
) -> Result<()> {
    let defaults: Vec<String> = index
        .packages()
        .into_iter()
        .filter(|package| policy.selects(package))
        .map(|package| package.name().to_string())
        .collect();

    tracing::debug!(count = defaults.len(), "marking default packages");

    for name in defaults.iter() {
        index.mark_install(name, MarkReason::Automatic)?;
    }

    // A request shadowed by a later one for the same package must still name
    // something that exists.
    for request in requests {
        request.check(index)?;
    }

    for request in specifier::dedup_last_wins(requests) {
        request.apply(index)?;
        index.mark_install(&request.name, MarkReason::Manual)?;
        tracing::debug!(package = %request, "marked for install");
    }

    Ok(())
}

pub fn install(config: &AptlConfig, options: &InstallOptions) -> Result<InstallSnapshot> {
    let started = Instant::now();

    console::verbose(&format!(
        "install start: cache={} arch={} requested=[{}] recommends={}",
        config.cache_dir.display(),
        config.architecture,
        options
            .requested
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        config.install_recommends,
    ));

    console::step("Reading package lists");
    let mut cache = AptCache::load(config)?;

    console::step("Building dependency tree");
    plan(&mut cache, &options.defaults, &options.requested)?;

    let selected = snapshot(&cache);

    console::summary(
        selected.len(),
        ("package", "packages"),
        "selected",
        started.elapsed().as_secs_f32(),
    );

    Ok(selected)
}

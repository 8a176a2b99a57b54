use crate::index::{MarkReason, Package};

/// Decides whether a package belongs in a filtered view of the index.
pub trait PackageFilter {
    fn matches(&self, package: &Package) -> bool;
}

impl<F> PackageFilter for F
where
    F: Fn(&Package) -> bool,
{
    fn matches(&self, package: &Package) -> bool {
        self(package)
    }
}

/// Packages selected for installation, manually or automatically.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkedInstall;

impl PackageFilter for MarkedInstall {
    fn matches(&self, package: &Package) -> bool {
        package.marked_install()
    }
}

/// Packages the user asked for by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkedManual;

impl PackageFilter for MarkedManual {
    fn matches(&self, package: &Package) -> bool {
        package.mark_reason() == Some(MarkReason::Manual)
    }
}

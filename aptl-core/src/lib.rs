pub mod config;
pub mod console;
pub mod error;
pub mod filter;
pub mod index;
pub mod net;
pub mod operations;
pub mod snapshot;
pub mod sources;
pub mod specifier;

pub use config::{AptlConfig, Architecture};
pub use error::AptlError;
pub use filter::{MarkedInstall, MarkedManual, PackageFilter};
pub use index::{AptCache, MarkReason, Package, PackageIndex, PackageVersion, Priority};
pub use snapshot::{InstallSnapshot, SnapshotEntry, snapshot, snapshot_with};
pub use specifier::PackageSpecifier;

pub type Result<T> = std::result::Result<T, AptlError>;

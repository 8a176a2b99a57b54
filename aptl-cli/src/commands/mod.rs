pub mod config;
pub mod fetch;
pub mod install;
pub mod show;
pub mod update;

use anyhow::Result;
use aptl_core::PackageSpecifier;
use aptl_core::specifier;
use std::path::Path;

pub(crate) fn parse_specifiers(tokens: &[String]) -> Vec<PackageSpecifier> {
    tokens.iter().map(|t| PackageSpecifier::parse(t)).collect()
}

pub(crate) fn read_specifiers(path: &Path) -> Result<Vec<PackageSpecifier>> {
    Ok(specifier::read_list(path)?)
}

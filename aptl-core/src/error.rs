use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AptlError {
    #[error("Unable to locate package {name}")]
    UnknownPackage { name: String },

    #[error("Version {version} for package {name} was not found (available: {available})")]
    UnknownVersion {
        name: String,
        version: String,
        available: String,
    },

    #[error("Package {package} depends on {dependency}, which cannot be satisfied")]
    UnsatisfiableDependency { package: String, dependency: String },

    #[error("Failed to build HTTP client: {source}")]
    HttpClient { source: reqwest::Error },

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("Failed to fetch {url}: server returned {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to decompress {url}: {source}")]
    Decompress { url: String, source: std::io::Error },

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Package {name} has no Filename field; it cannot be fetched")]
    MissingFilename { name: String },

    #[error("Failed to prepare cache path {path:?}: {source}")]
    Environment { path: PathBuf, source: std::io::Error },

    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("Invalid source entry in {path:?} line {line}: {reason}")]
    InvalidSource {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Invalid package record in {path:?}: {reason}")]
    InvalidRecord { path: PathBuf, reason: String },

    #[error("Record has no field {field}")]
    MissingField { field: String },

    #[error("Invalid format template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("Failed to serialize JSON: {reason}")]
    SerializeJson { reason: String },
}

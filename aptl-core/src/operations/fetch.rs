use crate::console;
use crate::index::{AptCache, PackageIndex, PackageVersion};
use crate::net::Fetcher;
use crate::operations::write_atomic;
use crate::specifier::PackageSpecifier;
use crate::{AptlConfig, AptlError, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub fn fetch(
    config: &AptlConfig,
    specifiers: &[PackageSpecifier],
    destination: &Path,
) -> Result<Vec<PathBuf>> {
    let started = Instant::now();

    let mut cache = AptCache::load(config)?;
    let fetcher = Fetcher::new(config)?;
    let paths = fetch_packages(&mut cache, &fetcher, specifiers, destination)?;

    console::summary(
        paths.len(),
        ("package", "packages"),
        "fetched",
        started.elapsed().as_secs_f32(),
    );

    Ok(paths)
}

/// Downloads the candidate `.deb` of every specifier into `destination`.
/// Dependencies are not followed.
pub fn fetch_packages<I: PackageIndex>(
    index: &mut I,
    fetcher: &Fetcher,
    specifiers: &[PackageSpecifier],
    destination: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(destination).map_err(|source| AptlError::Environment {
        path: destination.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::with_capacity(specifiers.len());

    for (position, specifier) in specifiers.iter().enumerate() {
        specifier.apply(index)?;

        let package = index.lookup(&specifier.name)?;
        let candidate = package
            .candidate()
            .ok_or_else(|| AptlError::MissingFilename {
                name: specifier.name.clone(),
            })?;

        console::progress("Fetching", position + 1, specifiers.len());
        let (path, reused) = fetch_binary(fetcher, package.name(), candidate, destination)?;
        console::fetched(package.name(), candidate.as_str(), reused);

        paths.push(path);
    }

    Ok(paths)
}

fn fetch_binary(
    fetcher: &Fetcher,
    name: &str,
    version: &PackageVersion,
    destination: &Path,
) -> Result<(PathBuf, bool)> {
    let missing = || AptlError::MissingFilename {
        name: name.to_string(),
    };

    let filename = version.filename.as_deref().ok_or_else(missing)?;
    let url = version.download_url().ok_or_else(missing)?;
    let basename = filename.rsplit('/').next().unwrap_or(filename);
    let path = destination.join(basename);

    if is_current(&path, version)? {
        tracing::debug!(path = %path.display(), "reusing downloaded package");
        return Ok((path, true));
    }

    let bytes = fetcher.get(&url)?;

    if let Some(expected) = version.sha256.as_deref() {
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(AptlError::ChecksumMismatch {
                path,
                expected: expected.to_string(),
                actual,
            });
        }
    }

    write_atomic(&path, &bytes)?;
    Ok((path, false))
}

// An existing file is only trusted when it matches the record's checksum,
// or its size when the record carries no checksum.
fn is_current(path: &Path, version: &PackageVersion) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }

    if let Some(expected) = version.sha256.as_deref() {
        let bytes = fs::read(path).map_err(|source| AptlError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(sha256_hex(&bytes) == expected);
    }

    match version.size {
        Some(size) => Ok(fs::metadata(path).is_ok_and(|meta| meta.len() == size)),
        None => Ok(false),
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::seeded_cache;

    fn repo_with(dir: &Path, name: &str, body: &[u8]) {
        let pool = dir.join("pool/main");
        fs::create_dir_all(&pool).unwrap();
        fs::write(pool.join(name), body).unwrap();
    }

    fn record(name: &str, version: &str, body: &[u8]) -> String {
        format!(
            "Package: {name}\nVersion: {version}\nArchitecture: amd64\nFilename: pool/main/{name}_{version}_amd64.deb\nSize: {}\nSHA256: {}\n\n",
            body.len(),
            sha256_hex(body)
        )
    }

    #[test]
    fn downloads_pinned_candidates_without_dependencies() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("repo");
        repo_with(&repo, "hello_1.0_amd64.deb", b"old");
        repo_with(&repo, "hello_2.0_amd64.deb", b"new");

        let mut packages = record("hello", "1.0", b"old");
        packages.push_str(&record("hello", "2.0", b"new"));
        packages.push_str("Package: world\nVersion: 1\nDepends: hello\nFilename: pool/main/world.deb\n");

        let config = seeded_cache(tmp.path(), &repo, &packages);
        let dest = tmp.path().join("debs");

        let paths = fetch(&config, &[PackageSpecifier::parse("hello=1.0")], &dest).unwrap();

        assert_eq!(paths, vec![dest.join("hello_1.0_amd64.deb")]);
        assert_eq!(fs::read(&paths[0]).unwrap(), b"old");
        assert_eq!(fs::read_dir(&dest).unwrap().count(), 1);
    }

    #[test]
    fn reuses_matching_file_and_rejects_bad_checksum() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("repo");
        repo_with(&repo, "hello_1.0_amd64.deb", b"tampered");

        let config = seeded_cache(tmp.path(), &repo, &record("hello", "1.0", b"genuine"));
        let dest = tmp.path().join("debs");
        let specs = [PackageSpecifier::parse("hello")];

        let err = fetch(&config, &specs, &dest).unwrap_err();
        assert!(matches!(err, AptlError::ChecksumMismatch { .. }));
        assert!(!dest.join("hello_1.0_amd64.deb").exists());

        fs::write(dest.join("hello_1.0_amd64.deb"), b"genuine").unwrap();
        let paths = fetch(&config, &specs, &dest).unwrap();
        assert_eq!(fs::read(&paths[0]).unwrap(), b"genuine");
    }

    #[test]
    fn record_without_filename_cannot_be_fetched() {
        let tmp = tempfile::tempdir().unwrap();
        let config = seeded_cache(
            tmp.path(),
            &tmp.path().join("repo"),
            "Package: meta\nVersion: 1\n",
        );

        let err = fetch(
            &config,
            &[PackageSpecifier::parse("meta")],
            &tmp.path().join("debs"),
        )
        .unwrap_err();
        assert!(matches!(err, AptlError::MissingFilename { .. }));
    }
}

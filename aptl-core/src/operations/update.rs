use crate::console;
use crate::net::Fetcher;
use crate::operations::write_atomic;
use crate::sources::{self, IndexTarget};
use crate::{AptlConfig, AptlError, Result};
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub lists: Vec<String>,
    pub bytes: u64,
    pub removed: Vec<String>,
}

/// Lays out the cache directory tree, resets the status file and installs
/// `sourcelist` as the cache's sources.list.
pub fn bootstrap(config: &AptlConfig, sourcelist: &str) -> Result<()> {
    for dir in [
        config.sourceparts_dir(),
        config.lists_dir(),
        config.mirrors_dir(),
        config.archives_dir(),
    ] {
        fs::create_dir_all(&dir).map_err(|source| AptlError::Environment {
            path: dir.clone(),
            source,
        })?;
    }

    write_file(&config.status_path(), "")?;

    let mut text = sourcelist.to_string();
    if !text.is_empty() {
        text.push('\n');
    }
    write_file(&config.sourcelist_path(), &text)?;

    tracing::debug!(cache = %config.cache_dir.display(), "cache layout ready");
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| AptlError::Environment {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(path, contents).map_err(|source| AptlError::Environment {
        path: path.to_path_buf(),
        source,
    })
}

/// Bootstraps the cache and downloads every package list its sources name.
pub fn update(config: &AptlConfig, sourcelist: &str) -> Result<UpdateSummary> {
    let started = Instant::now();

    bootstrap(config, sourcelist)?;

    let entries = sources::read_sources(config)?;
    let targets = sources::targets_for(&entries, config.architecture);
    let fetcher = Fetcher::new(config)?;
    let lists_dir = config.lists_dir();

    let mut summary = UpdateSummary::default();

    for (position, target) in targets.iter().enumerate() {
        console::progress("Fetching package lists", position + 1, targets.len());

        let data = download_list(&fetcher, target)?;
        write_atomic(&lists_dir.join(&target.list_name), &data)?;

        console::clear_line();
        console::step(&format!("Get:{} {}", position + 1, target.url));

        summary.bytes += data.len() as u64;
        summary.lists.push(target.list_name.clone());
    }

    let keep: BTreeSet<&str> = targets.iter().map(|t| t.list_name.as_str()).collect();
    summary.removed = remove_stale_lists(&lists_dir, &keep)?;

    console::summary(
        summary.lists.len(),
        ("list", "lists"),
        "updated",
        started.elapsed().as_secs_f32(),
    );

    Ok(summary)
}

// Prefers the compressed index and falls back to the plain one.
fn download_list(fetcher: &Fetcher, target: &IndexTarget) -> Result<Vec<u8>> {
    let gz_url = format!("{}.gz", target.url);

    if let Some(compressed) = fetcher.get_optional(&gz_url)? {
        let mut data = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut data)
            .map_err(|source| AptlError::Decompress {
                url: gz_url.clone(),
                source,
            })?;

        tracing::debug!(url = %gz_url, bytes = data.len(), "fetched compressed list");
        return Ok(data);
    }

    let data = fetcher.get(&target.url)?;
    tracing::debug!(url = %target.url, bytes = data.len(), "fetched list");
    Ok(data)
}

fn remove_stale_lists(lists_dir: &Path, keep: &BTreeSet<&str>) -> Result<Vec<String>> {
    let read_error = |source: std::io::Error| AptlError::ReadFile {
        path: lists_dir.to_path_buf(),
        source,
    };

    let mut removed = Vec::new();

    for entry in fs::read_dir(lists_dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if keep.contains(name) || name == "lock" {
            continue;
        }

        fs::remove_file(&path).map_err(|source| AptlError::WriteFile {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(list = name, "removed stale list");
        removed.push(name.to_string());
    }

    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{AptCache, PackageIndex};
    use crate::Architecture;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn bootstrap_creates_layout_and_resets_status() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AptlConfig::new(tmp.path().join("cache"), Architecture::Armhf);

        bootstrap(&config, "deb http://x/debian stable main").unwrap();
        fs::write(config.status_path(), "Package: stale\n").unwrap();
        bootstrap(&config, "").unwrap();

        assert!(config.sourceparts_dir().is_dir());
        assert!(config.lists_dir().is_dir());
        assert!(config.mirrors_dir().is_dir());
        assert!(config.archives_dir().is_dir());
        assert_eq!(fs::read_to_string(config.status_path()).unwrap(), "");
        assert_eq!(fs::read_to_string(config.sourcelist_path()).unwrap(), "");

        bootstrap(&config, "deb http://x/debian stable main").unwrap();
        assert_eq!(
            fs::read_to_string(config.sourcelist_path()).unwrap(),
            "deb http://x/debian stable main\n"
        );
    }

    #[test]
    fn downloads_lists_and_prunes_stale_ones() {
        let tmp = tempfile::tempdir().unwrap();

        let archive = tmp.path().join("archive");
        let binary = archive.join("dists/stable/main/binary-amd64");
        fs::create_dir_all(&binary).unwrap();
        fs::write(binary.join("Packages.gz"), gzip("Package: hello\nVersion: 1.0\n")).unwrap();

        let flat = tmp.path().join("flat");
        fs::create_dir_all(&flat).unwrap();
        fs::write(flat.join("Packages"), "Package: extra\nVersion: 0.1\n").unwrap();

        let config = AptlConfig::new(tmp.path().join("cache"), Architecture::Amd64);
        fs::create_dir_all(config.lists_dir()).unwrap();
        fs::write(config.lists_dir().join("old_Packages"), "").unwrap();

        let sources_text = format!(
            "deb file://{} stable main\ndeb file://{} ./",
            archive.display(),
            flat.display()
        );
        let summary = update(&config, &sources_text).unwrap();

        assert_eq!(summary.lists.len(), 2);
        assert_eq!(summary.removed, vec!["old_Packages".to_string()]);

        let cache = AptCache::load(&config).unwrap();
        assert_eq!(cache.lookup("hello").unwrap().candidate().unwrap().as_str(), "1.0");
        assert!(cache.lookup("extra").is_ok());
    }

    #[test]
    fn missing_list_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AptlConfig::new(tmp.path().join("cache"), Architecture::Amd64);
        let sources_text = format!("deb file://{} stable main", tmp.path().join("nowhere").display());

        assert!(matches!(
            update(&config, &sources_text),
            Err(AptlError::HttpStatus { status: 404, .. })
        ));
    }

    #[test]
    fn corrupt_archive_reports_decompress_error() {
        let tmp = tempfile::tempdir().unwrap();
        let flat = tmp.path().join("flat");
        fs::create_dir_all(&flat).unwrap();
        fs::write(flat.join("Packages.gz"), b"not gzip").unwrap();

        let config = AptlConfig::new(tmp.path().join("cache"), Architecture::Amd64);
        let sources_text = format!("deb file://{} ./", flat.display());

        assert!(matches!(
            update(&config, &sources_text),
            Err(AptlError::Decompress { .. })
        ));
    }
}

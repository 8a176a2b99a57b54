use crate::{AptlConfig, AptlError, Architecture, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One `deb` line of a sources.list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub uri: String,
    pub suite: String,
    pub components: Vec<String>,
    pub architectures: Vec<String>,
}

/// The location of one `Packages` index and the list file it is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTarget {
    pub base_uri: String,
    pub url: String,
    pub list_name: String,
}

impl SourceEntry {
    pub fn is_flat(&self) -> bool {
        self.suite.ends_with('/')
    }

    pub fn applies_to(&self, arch: Architecture) -> bool {
        self.architectures.is_empty() || self.architectures.iter().any(|a| a == arch.as_str())
    }

    pub fn targets(&self, arch: Architecture) -> Vec<IndexTarget> {
        if !self.applies_to(arch) {
            return Vec::new();
        }

        let base = self.uri.trim_end_matches('/');

        if self.is_flat() {
            let dir = self.suite.trim_start_matches("./");
            let base_uri = if dir.is_empty() {
                base.to_string()
            } else {
                format!("{}/{}", base, dir.trim_end_matches('/'))
            };
            let url = format!("{}/Packages", base_uri);
            return vec![IndexTarget {
                list_name: uri_to_filename(&url),
                base_uri,
                url,
            }];
        }

        self.components
            .iter()
            .map(|component| {
                let url = format!(
                    "{}/dists/{}/{}/binary-{}/Packages",
                    base,
                    self.suite,
                    component,
                    arch.as_str()
                );
                IndexTarget {
                    list_name: uri_to_filename(&url),
                    base_uri: base.to_string(),
                    url,
                }
            })
            .collect()
    }
}

pub fn parse_source_list(path: &Path, text: &str) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let invalid = |reason: &str| AptlError::InvalidSource {
            path: path.to_path_buf(),
            line: line_no,
            reason: reason.to_string(),
        };

        let mut tokens = line.split_whitespace().peekable();

        match tokens.next() {
            Some("deb") => {}
            Some("deb-src") => continue,
            Some(other) => return Err(invalid(&format!("unknown type '{}'", other))),
            None => continue,
        }

        let mut architectures = Vec::new();

        if tokens.peek().is_some_and(|t| t.starts_with('[')) {
            let mut options = String::new();
            for token in tokens.by_ref() {
                options.push(' ');
                options.push_str(token);
                if token.ends_with(']') {
                    break;
                }
            }

            let options = options.trim();
            let Some(inner) = options
                .strip_prefix('[')
                .and_then(|o| o.strip_suffix(']'))
            else {
                return Err(invalid("unterminated option list"));
            };

            for option in inner.split_whitespace() {
                if let Some(values) = option.strip_prefix("arch=") {
                    architectures.extend(
                        values
                            .split(',')
                            .filter(|v| !v.is_empty())
                            .map(str::to_string),
                    );
                }
            }
        }

        let uri = tokens.next().ok_or_else(|| invalid("missing URI"))?;
        let suite = tokens.next().ok_or_else(|| invalid("missing suite"))?;
        let components: Vec<String> = tokens.map(str::to_string).collect();

        if suite.ends_with('/') && !components.is_empty() {
            return Err(invalid("flat repository entries cannot list components"));
        }
        if !suite.ends_with('/') && components.is_empty() {
            return Err(invalid("missing component"));
        }

        entries.push(SourceEntry {
            uri: uri.to_string(),
            suite: suite.to_string(),
            components,
            architectures,
        });
    }

    Ok(entries)
}

/// Reads sources.list followed by every `*.list` file in sources.list.d,
/// in file name order.
pub fn read_sources(config: &AptlConfig) -> Result<Vec<SourceEntry>> {
    let mut files = Vec::new();

    let main = config.sourcelist_path();
    if main.is_file() {
        files.push(main);
    }

    let parts_dir = config.sourceparts_dir();
    if parts_dir.is_dir() {
        let mut parts: Vec<PathBuf> = fs::read_dir(&parts_dir)
            .map_err(|source| AptlError::ReadFile {
                path: parts_dir.clone(),
                source,
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "list"))
            .collect();
        parts.sort();
        files.extend(parts);
    }

    let mut entries = Vec::new();
    for file in files {
        let text = fs::read_to_string(&file).map_err(|source| AptlError::ReadFile {
            path: file.clone(),
            source,
        })?;
        entries.extend(parse_source_list(&file, &text)?);
    }

    Ok(entries)
}

pub fn targets_for(entries: &[SourceEntry], arch: Architecture) -> Vec<IndexTarget> {
    let mut targets: Vec<IndexTarget> = Vec::new();

    for entry in entries {
        for target in entry.targets(arch) {
            if !targets.iter().any(|t| t.list_name == target.list_name) {
                targets.push(target);
            }
        }
    }

    targets
}

/// apt's flattening of a URI into a single file name: the scheme and any
/// credentials are dropped, unsafe characters are percent-quoted and `/`
/// becomes `_`.
pub fn uri_to_filename(uri: &str) -> String {
    let without_scheme = match uri.find("://") {
        Some(pos) => &uri[pos + 3..],
        None => uri,
    };

    let without_credentials = match without_scheme.split_once('/') {
        Some((authority, rest)) => match authority.rsplit_once('@') {
            Some((_, host)) => format!("{}/{}", host, rest),
            None => without_scheme.to_string(),
        },
        None => without_scheme.to_string(),
    };

    let mut out = String::with_capacity(without_credentials.len());
    for c in without_credentials.chars() {
        if c == '/' {
            out.push('_');
        } else if "\\|{}[]<>\"^~_=!@#$%^&*".contains(c) || c.is_whitespace() || !c.is_ascii() {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{:02x}", byte));
            }
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<SourceEntry> {
        parse_source_list(Path::new("sources.list"), text).unwrap()
    }

    #[test]
    fn parses_entries_with_options_and_comments() {
        let entries = parse(
            "# main archive\n\
             deb [arch=amd64 trusted=yes] http://deb.debian.org/debian bookworm main contrib\n\
             deb-src http://deb.debian.org/debian bookworm main\n\
             \n\
             deb http://security.debian.org/ bookworm-security main # trailing\n",
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].architectures, vec!["amd64".to_string()]);
        assert_eq!(entries[0].components, vec!["main", "contrib"]);
        assert_eq!(entries[1].suite, "bookworm-security");
    }

    #[test]
    fn computes_apt_style_targets() {
        let entries = parse("deb [arch=amd64] http://x/debian bookworm main contrib\n");
        let targets = entries[0].targets(Architecture::Amd64);

        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets[0].url,
            "http://x/debian/dists/bookworm/main/binary-amd64/Packages"
        );
        assert_eq!(
            targets[0].list_name,
            "x_debian_dists_bookworm_main_binary-amd64_Packages"
        );
        assert_eq!(targets[1].base_uri, "http://x/debian");
        assert!(entries[0].targets(Architecture::Armhf).is_empty());
    }

    #[test]
    fn flat_repositories_have_one_target() {
        let entries = parse("deb http://example.org/repo/ ./\ndeb http://example.org/r sub/\n");

        let root = entries[0].targets(Architecture::Armhf);
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].url, "http://example.org/repo/Packages");
        assert_eq!(root[0].base_uri, "http://example.org/repo");

        let nested = entries[1].targets(Architecture::Armhf);
        assert_eq!(nested[0].url, "http://example.org/r/sub/Packages");
    }

    #[test]
    fn rejects_malformed_lines() {
        let path = Path::new("s.list");
        assert!(parse_source_list(path, "rpm http://x y z\n").is_err());
        assert!(parse_source_list(path, "deb http://x bookworm\n").is_err());
        assert!(parse_source_list(path, "deb http://x ./ main\n").is_err());
        assert!(parse_source_list(path, "deb [arch=amd64 http://x a b\n").is_err());
    }

    #[test]
    fn filename_quoting_matches_apt() {
        assert_eq!(
            uri_to_filename("http://user:pw@mirror/deb_ian/~x/Packages"),
            "mirror_deb%5fian_%7ex_Packages"
        );
    }

    #[test]
    fn duplicate_targets_are_collapsed() {
        let entries = parse("deb http://x/d s main\ndeb http://x/d/ s main\n");
        assert_eq!(targets_for(&entries, Architecture::Amd64).len(), 1);
    }
}

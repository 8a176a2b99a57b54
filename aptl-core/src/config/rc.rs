use super::Architecture;
use std::path::{Path, PathBuf};
use std::{env, fs};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RcConfig {
    pub cache_dir: Option<PathBuf>,
    pub architecture: Option<Architecture>,
    pub install_recommends: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
}

pub fn expand_env_vars(text: &str) -> String {
    let mut out = String::new();
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] != b'$' {
            let ch = text[i..].chars().next().unwrap_or_default();
            out.push(ch);
            i += ch.len_utf8().max(1);
            continue;
        }

        if i + 1 < bytes.len()
            && bytes[i + 1] == b'{'
            && let Some(end) = text[i + 2..].find('}')
        {
            let var = &text[i + 2..i + 2 + end];
            out.push_str(&env::var(var).unwrap_or_default());
            i += 2 + end + 1;
            continue;
        }

        let mut j = i + 1;
        while j < bytes.len() && (bytes[j] == b'_' || bytes[j].is_ascii_alphanumeric()) {
            j += 1;
        }

        let var = &text[i + 1..j];
        if var.is_empty() {
            out.push('$');
            i += 1;
        } else {
            out.push_str(&env::var(var).unwrap_or_default());
            i = j;
        }
    }

    out
}

pub fn expand_home(value: &str, home: Option<&Path>) -> PathBuf {
    match (value.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if value == "~" && home.is_some() => home.map(Path::to_path_buf).unwrap_or_default(),
        _ => PathBuf::from(value),
    }
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Reads `~/.apt-localrc`, then the file named by `APT_LOCAL_CONFIG`; later
/// files win.
pub fn read_rc_config(home: Option<&Path>) -> RcConfig {
    let mut rc = RcConfig::default();

    if let Some(home) = home {
        apply_rc_file(&home.join(".apt-localrc"), home, &mut rc);
    }

    if let Ok(path) = env::var("APT_LOCAL_CONFIG") {
        let path = PathBuf::from(path.trim());
        apply_rc_file(&path, home.unwrap_or(Path::new("")), &mut rc);
    }

    rc
}

pub fn apply_rc_file(path: &Path, home: &Path, rc: &mut RcConfig) {
    if !path.is_file() {
        return;
    }

    let Ok(data) = fs::read_to_string(path) else {
        return;
    };

    for line in data.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = expand_env_vars(value.trim());

        match key.as_str() {
            "cache" | "cache-dir" | "cache_dir" => {
                if !value.is_empty() {
                    let home = (!home.as_os_str().is_empty()).then_some(home);
                    rc.cache_dir = Some(expand_home(&value, home));
                }
            }
            "arch" | "architecture" => {
                if let Some(arch) = Architecture::parse(&value) {
                    rc.architecture = Some(arch);
                }
            }
            "install-recommends" | "install_recommends" => {
                if let Some(flag) = parse_flag(&value) {
                    rc.install_recommends = Some(flag);
                }
            }
            "connect-timeout" | "connect_timeout" => {
                if let Ok(secs) = value.parse::<u64>()
                    && secs > 0
                {
                    rc.connect_timeout_secs = Some(secs);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rc_file_sets_known_keys() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join(".apt-localrc");
        fs::write(
            &path,
            "# comment\narch = armhf\ncache = ~/mirror\ninstall-recommends = no\nconnect-timeout = 5\nunknown = 1\n",
        )
        .unwrap();

        let mut rc = RcConfig::default();
        apply_rc_file(&path, tmp.path(), &mut rc);

        assert_eq!(rc.architecture, Some(Architecture::Armhf));
        assert_eq!(rc.cache_dir, Some(tmp.path().join("mirror")));
        assert_eq!(rc.install_recommends, Some(false));
        assert_eq!(rc.connect_timeout_secs, Some(5));
    }

    #[test]
    fn invalid_values_are_ignored() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("rc");
        fs::write(&path, "arch = sparc\nconnect-timeout = 0\n").unwrap();

        let mut rc = RcConfig::default();
        apply_rc_file(&path, tmp.path(), &mut rc);

        assert_eq!(rc, RcConfig::default());
    }

    #[test]
    fn dollar_without_name_is_literal() {
        assert_eq!(expand_env_vars("cost $ 5"), "cost $ 5");
        assert_eq!(
            expand_env_vars("${APT_LOCAL_SURELY_UNSET_VAR}x"),
            "x"
        );
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

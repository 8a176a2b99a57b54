use directories::BaseDirs;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub mod rc;
pub use self::rc::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Architecture {
    Amd64,
    Armhf,
}

impl Architecture {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Some(Architecture::Amd64),
            "armhf" | "arm" | "armv7" | "armv7l" => Some(Architecture::Armhf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Armhf => "armhf",
        }
    }

    /// The Debian architecture matching the running host, falling back to
    /// amd64 when the host has no supported counterpart.
    pub fn host() -> Self {
        Architecture::parse(env::consts::ARCH).unwrap_or(Architecture::Amd64)
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything an invocation needs to know about its private apt tree.
///
/// The value is built once and handed to each operation; nothing reads a
/// process-wide package configuration.
#[derive(Debug, Clone)]
pub struct AptlConfig {
    pub cache_dir: PathBuf,
    pub architecture: Architecture,
    pub install_recommends: bool,
    pub connect_timeout_secs: u64,
    pub verbose: bool,
}

impl AptlConfig {
    pub fn from_env() -> Self {
        let home = BaseDirs::new().map(|base| base.home_dir().to_path_buf());

        let rc = read_rc_config(home.as_deref());

        let mut cache_dir = rc.cache_dir.unwrap_or_else(|| match home.as_ref() {
            Some(home) => home.join(".cache").join("apt-local"),
            None => PathBuf::from(".apt-local"),
        });
        let mut architecture = rc.architecture.unwrap_or_else(Architecture::host);
        let mut install_recommends = rc.install_recommends.unwrap_or(true);
        let mut connect_timeout_secs = rc.connect_timeout_secs.unwrap_or(30);

        if let Ok(value) = env::var("APT_LOCAL_CACHE") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                cache_dir = expand_home(trimmed, home.as_deref());
            }
        }

        if let Ok(value) = env::var("APT_LOCAL_ARCH")
            && let Some(arch) = Architecture::parse(&value)
        {
            architecture = arch;
        }

        if let Ok(value) = env::var("APT_LOCAL_INSTALL_RECOMMENDS")
            && let Some(flag) = parse_flag(&value)
        {
            install_recommends = flag;
        }

        if let Ok(value) = env::var("APT_LOCAL_CONNECT_TIMEOUT")
            && let Ok(parsed) = value.trim().parse::<u64>()
            && parsed > 0
        {
            connect_timeout_secs = parsed;
        }

        let verbose = env::var("APT_LOCAL_VERBOSE")
            .ok()
            .and_then(|value| parse_flag(&value))
            .unwrap_or(false);

        AptlConfig {
            cache_dir,
            architecture,
            install_recommends,
            connect_timeout_secs,
            verbose,
        }
    }

    /// A configuration rooted at `cache_dir` with built-in defaults only.
    pub fn new(cache_dir: impl Into<PathBuf>, architecture: Architecture) -> Self {
        AptlConfig {
            cache_dir: cache_dir.into(),
            architecture,
            install_recommends: true,
            connect_timeout_secs: 30,
            verbose: false,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_install_recommends(mut self, install_recommends: bool) -> Self {
        self.install_recommends = install_recommends;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.cache_dir.join("etc").join("apt")
    }

    pub fn sourcelist_path(&self) -> PathBuf {
        self.etc_dir().join("sources.list")
    }

    pub fn sourceparts_dir(&self) -> PathBuf {
        self.etc_dir().join("sources.list.d")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.cache_dir.join("var").join("lib").join("apt")
    }

    pub fn lists_dir(&self) -> PathBuf {
        self.state_dir().join("lists")
    }

    pub fn mirrors_dir(&self) -> PathBuf {
        self.state_dir().join("mirrors")
    }

    pub fn status_path(&self) -> PathBuf {
        self.state_dir().join("dpkg.status")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.cache_dir
            .join("var")
            .join("cache")
            .join("apt")
            .join("archives")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_lives_under_cache_dir() {
        let config = AptlConfig::new("/tmp/aptl", Architecture::Armhf);

        assert_eq!(
            config.sourcelist_path(),
            PathBuf::from("/tmp/aptl/etc/apt/sources.list")
        );
        assert_eq!(
            config.lists_dir(),
            PathBuf::from("/tmp/aptl/var/lib/apt/lists")
        );
        assert_eq!(
            config.status_path(),
            PathBuf::from("/tmp/aptl/var/lib/apt/dpkg.status")
        );
        assert_eq!(
            config.archives_dir(),
            PathBuf::from("/tmp/aptl/var/cache/apt/archives")
        );
    }

    #[test]
    fn architecture_aliases() {
        assert_eq!(Architecture::parse("AMD64"), Some(Architecture::Amd64));
        assert_eq!(Architecture::parse("x86_64"), Some(Architecture::Amd64));
        assert_eq!(Architecture::parse("armhf"), Some(Architecture::Armhf));
        assert_eq!(Architecture::parse("mips"), None);
    }

    #[test]
    fn builders_override_fields() {
        let config = AptlConfig::new("/a", Architecture::Amd64)
            .with_cache_dir("/b")
            .with_architecture(Architecture::Armhf)
            .with_install_recommends(false);

        assert_eq!(config.cache_dir, PathBuf::from("/b"));
        assert_eq!(config.architecture, Architecture::Armhf);
        assert!(!config.install_recommends);
    }
}

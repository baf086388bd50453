//! Mirror configuration file parsing (TOML)

use std::path::{Path, PathBuf};

use color_eyre::eyre::WrapErr as _;

/// How entry names are compared between the source and replica trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameMatching {
    /// Names match only if they are byte-for-byte identical
    Exact,
    /// Names match if they are equal after lower-casing
    IgnoreCase,
}

impl NameMatching {
    /// The policy matching the usual filesystem behaviour of the host platform.
    #[must_use]
    pub fn platform_default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::IgnoreCase
        } else {
            Self::Exact
        }
    }

    /// Normalize a name (or path) for comparison under this policy.
    #[must_use]
    pub fn normalize(self, name: &str) -> String {
        match self {
            Self::Exact => name.to_string(),
            Self::IgnoreCase => name.to_lowercase(),
        }
    }
}

impl Default for NameMatching {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Contents of a mirror configuration file.
///
/// Every field is optional so that command-line arguments can fill the gaps.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Directory to mirror from
    pub source: Option<PathBuf>,
    /// Directory to mirror into
    pub replica: Option<PathBuf>,
    /// Log file receiving one line per action
    pub log_file: Option<PathBuf>,
    /// Seconds between two cycles
    pub interval_secs: Option<u64>,
    /// Name comparison policy
    pub name_matching: Option<NameMatching>,
}

impl MirrorConfig {
    /// Load a config file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
source = "/data/source"
replica = "/data/replica"
log_file = "/var/log/treemirror.log"
interval_secs = 30
name_matching = "ignore-case"
"#;

        let config: MirrorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source, Some(PathBuf::from("/data/source")));
        assert_eq!(config.replica, Some(PathBuf::from("/data/replica")));
        assert_eq!(
            config.log_file,
            Some(PathBuf::from("/var/log/treemirror.log"))
        );
        assert_eq!(config.interval_secs, Some(30));
        assert_eq!(config.name_matching, Some(NameMatching::IgnoreCase));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: MirrorConfig = toml::from_str("").unwrap();
        assert!(config.source.is_none());
        assert!(config.interval_secs.is_none());
        assert!(config.name_matching.is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result: Result<MirrorConfig, _> = toml::from_str("sauce = \"/x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("mirror.toml");
        std::fs::write(&path, "interval_secs = 5\nname_matching = \"exact\"\n").unwrap();

        let config = MirrorConfig::load(&path).unwrap();
        assert_eq!(config.interval_secs, Some(5));
        assert_eq!(config.name_matching, Some(NameMatching::Exact));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(NameMatching::Exact.normalize("ReadMe.TXT"), "ReadMe.TXT");
        assert_eq!(NameMatching::IgnoreCase.normalize("ReadMe.TXT"), "readme.txt");
    }
}

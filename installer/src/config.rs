use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use std::{
    env, fmt, fs, io,
    path::{Path, PathBuf},
};

/// The repository that hosts the Moderne CLI releases when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://repo1.maven.org/maven2/io/moderne/moderne-cli";

/// The name of the config file looked for next to the executable and in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Installer configuration. Use [`Config::load`] to get the defaults merged with the first config
/// file that can be found.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub download: DownloadConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
#[allow(clippy::module_name_repetitions)]
pub struct DownloadConfig {
    pub base_url: String,
    pub proxy: Option<ProxyConfig>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        DownloadConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            proxy: None,
        }
    }
}

impl DownloadConfig {
    /// Returns the proxy settings if a proxy with a non-empty URL is configured.
    #[must_use]
    pub fn active_proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref().filter(|p| p.has_proxy())
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
#[allow(clippy::module_name_repetitions)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Hosts (or host suffixes like `.internal.domain`) that are requested without the proxy. In
    /// the config file this may be a comma-separated string or a list of strings.
    #[serde(deserialize_with = "deserialize_no_proxy")]
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    #[must_use]
    pub fn has_proxy(&self) -> bool {
        !self.url.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NoProxyHelper {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_no_proxy<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NoProxyHelper::deserialize(deserializer)? {
        NoProxyHelper::Joined(s) => s.split(',').map(String::from).collect(),
        NoProxyHelper::List(l) => l,
    })
}

/// Where the effective configuration came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(p) => write!(f, "{}", p.display()),
            ConfigSource::Defaults => f.write_str("defaults"),
        }
    }
}

impl Config {
    /// Looks for `config.yaml` next to the running executable and then in the current working
    /// directory. The first file that can be read and parsed is merged over the defaults.
    #[must_use]
    pub fn load() -> (Config, ConfigSource) {
        Self::load_from(&candidate_paths(CONFIG_FILE_NAME))
    }

    /// Like [`Config::load`], but with an explicit list of candidate files, tried in order. Files
    /// that do not exist are skipped silently. Files that cannot be read or parsed are skipped
    /// with a warning.
    #[must_use]
    pub fn load_from(candidates: &[PathBuf]) -> (Config, ConfigSource) {
        for path in candidates {
            match read_config_file(path) {
                Ok(Some(loaded)) => {
                    debug!("loaded config from {}", path.display());
                    return (
                        Config::default().merge(loaded),
                        ConfigSource::File(path.clone()),
                    );
                }
                Ok(None) => debug!("no config file at {}", path.display()),
                Err(e) => warn!("Ignoring config file {}: {e:#}", path.display()),
            }
        }

        (Config::default(), ConfigSource::Defaults)
    }

    /// Non-empty values from `loaded` override the values in `self`.
    #[must_use]
    pub fn merge(mut self, loaded: Config) -> Config {
        if !loaded.download.base_url.is_empty() {
            self.download.base_url = loaded.download.base_url;
        }
        if loaded.download.proxy.is_some() {
            self.download.proxy = loaded.download.proxy;
        }
        self
    }
}

fn read_config_file(path: &Path) -> Result<Option<Config>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    let config =
        parse_config(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(config))
}

// A file with no YAML document in it, or only comments, counts as an empty config.
fn parse_config(content: &str) -> Result<Config, serde_yaml::Error> {
    match serde_yaml::from_str::<Option<Config>>(content)? {
        Some(config) => Ok(config),
        None => Ok(Config {
            download: DownloadConfig {
                base_url: String::new(),
                proxy: None,
            },
        }),
    }
}

/// Returns `<dir of current exe>/<name>` followed by `<cwd>/<name>`, leaving out whichever of the
/// two directories cannot be determined.
pub(crate) fn candidate_paths(name: &str) -> Vec<PathBuf> {
    let mut paths = vec![];
    if let Some(dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir.join(name));
    }
    if let Ok(cwd) = env::current_dir() {
        paths.push(cwd.join(name));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.download.base_url, DEFAULT_BASE_URL);
        assert!(config.download.proxy.is_none());
        assert!(config.download.active_proxy().is_none());
    }

    #[rstest]
    #[case::no_proxy_section(None, false)]
    #[case::empty_url(Some(""), false)]
    #[case::with_url(Some("http://proxy:8080"), true)]
    fn active_proxy(#[case] url: Option<&str>, #[case] expect: bool) {
        let config = DownloadConfig {
            base_url: "http://example.com".to_string(),
            proxy: url.map(|u| ProxyConfig {
                url: u.to_string(),
                ..Default::default()
            }),
        };
        assert_eq!(config.active_proxy().is_some(), expect);
    }

    #[test]
    fn parse_full_config() -> Result<()> {
        let config = parse_config(
            r#"
download:
  baseUrl: "https://custom.repo.com/maven2/io/moderne/moderne-cli"
  proxy:
    url: "http://proxy.example.com:8080"
    username: "user"
    password: "pass"
    noProxy: "localhost,.internal.domain"
"#,
        )?;
        assert_eq!(
            config.download.base_url,
            "https://custom.repo.com/maven2/io/moderne/moderne-cli",
        );
        let proxy = config.download.proxy.expect("proxy section was parsed");
        assert_eq!(proxy.url, "http://proxy.example.com:8080");
        assert_eq!(proxy.username.as_deref(), Some("user"));
        assert_eq!(proxy.password.as_deref(), Some("pass"));
        assert_eq!(proxy.no_proxy, vec!["localhost", ".internal.domain"]);
        Ok(())
    }

    #[test]
    fn parse_no_proxy_list() -> Result<()> {
        let config = parse_config(
            r"
download:
  proxy:
    url: http://proxy:8080
    noProxy:
      - localhost
      - .corp
",
        )?;
        assert_eq!(config.download.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            config.download.proxy.map(|p| p.no_proxy),
            Some(vec!["localhost".to_string(), ".corp".to_string()]),
        );
        Ok(())
    }

    #[rstest]
    #[case::empty("")]
    #[case::comments_only("# nothing configured yet\n")]
    #[case::empty_download_section("download: {}\n")]
    fn parse_empty_config(#[case] content: &str) -> Result<()> {
        let loaded = parse_config(content)?;
        assert!(loaded.download.proxy.is_none());
        assert_eq!(Config::default().merge(loaded), Config::default());
        Ok(())
    }

    #[test]
    fn parse_invalid_yaml() {
        assert!(parse_config("invalid: yaml: content: [[[").is_err());
    }

    #[test]
    fn merge_keeps_defaults_for_empty_values() {
        let loaded = Config {
            download: DownloadConfig {
                base_url: String::new(),
                proxy: None,
            },
        };
        assert_eq!(Config::default().merge(loaded), Config::default());
    }

    #[test]
    fn load_from_uses_first_parseable_file() -> Result<()> {
        let td = tempdir()?;
        let missing = td.path().join("missing.yaml");
        let broken = td.path().join("broken.yaml");
        fs::write(&broken, "invalid: yaml: content: [[[")?;
        let good = td.path().join("good.yaml");
        fs::write(&good, "download:\n  baseUrl: http://localhost:1234/repo\n")?;

        let (config, source) = Config::load_from(&[missing, broken, good.clone()]);
        assert_eq!(config.download.base_url, "http://localhost:1234/repo");
        assert_eq!(source, ConfigSource::File(good));
        Ok(())
    }

    #[test]
    fn load_from_falls_back_to_defaults() -> Result<()> {
        let td = tempdir()?;
        let (config, source) = Config::load_from(&[td.path().join(CONFIG_FILE_NAME)]);
        assert_eq!(config, Config::default());
        assert_eq!(source, ConfigSource::Defaults);
        assert_eq!(source.to_string(), "defaults");
        Ok(())
    }

    // Changes the process working directory.
    #[test]
    #[serial]
    fn load_finds_file_in_working_directory() -> Result<()> {
        let td = tempdir()?;
        fs::write(
            td.path().join(CONFIG_FILE_NAME),
            "download:\n  baseUrl: http://localhost:4321/repo\n",
        )?;

        let prev = env::current_dir()?;
        env::set_current_dir(td.path())?;
        let (config, source) = Config::load();
        env::set_current_dir(prev)?;

        assert_eq!(config.download.base_url, "http://localhost:4321/repo");
        match source {
            ConfigSource::File(p) => assert!(p.ends_with(CONFIG_FILE_NAME), "{}", p.display()),
            ConfigSource::Defaults => panic!("expected the config file to be found"),
        }
        Ok(())
    }

    #[test]
    #[serial]
    fn candidate_paths_are_exe_dir_then_cwd() -> Result<()> {
        let paths = candidate_paths(CONFIG_FILE_NAME);
        let exe_dir = env::current_exe()?
            .parent()
            .map(Path::to_path_buf)
            .expect("the test executable has a parent directory");
        assert_eq!(
            paths,
            vec![
                exe_dir.join(CONFIG_FILE_NAME),
                env::current_dir()?.join(CONFIG_FILE_NAME),
            ],
        );
        Ok(())
    }
}

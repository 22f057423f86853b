/// The `builder` module contains the `InstallerBuilder` struct which is used to create an
/// `Installer` instance.
use crate::{
    client::http_client, commands::PostInstallCommands, config::Config, installer::Installer,
    shell::ShellFlavor,
};
use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// `InstallerBuilder` is used to create an [`Installer`] instance.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct InstallerBuilder<'a> {
    version: Option<&'a str>,
    base_url: Option<&'a str>,
    config: Option<Config>,
    home_dir: Option<PathBuf>,
    shell_flavor: Option<ShellFlavor>,
    post_install_commands: Option<PostInstallCommands>,
    hide_progress: bool,
}

impl<'a> InstallerBuilder<'a> {
    /// Returns a new empty `InstallerBuilder`.
    #[must_use]
    pub fn new() -> Self {
        InstallerBuilder::default()
    }

    /// Set the version to install, like `3.57.9`. If this is not set, or is set to an empty
    /// string, the version is looked up in the repository's `maven-metadata.xml` when
    /// [`Installer::install`] runs.
    #[must_use]
    pub fn version(mut self, version: &'a str) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the base URL of the repository to download from. This takes precedence over the base
    /// URL in the config. An empty string is ignored.
    #[must_use]
    pub fn base_url(mut self, base_url: &'a str) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the configuration to use. If this is not set, [`Config::default`] is used.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the home directory under which `.moderne/bin` is created and in which shell
    /// configuration files are looked for. Defaults to the current user's home directory.
    #[must_use]
    pub fn home_dir<P: AsRef<Path>>(mut self, home_dir: P) -> Self {
        self.home_dir = Some(home_dir.as_ref().to_path_buf());
        self
    }

    /// Set the kind of shell to configure. Defaults to the one for the platform the installer is
    /// running on.
    #[must_use]
    pub fn shell_flavor(mut self, flavor: ShellFlavor) -> Self {
        self.shell_flavor = Some(flavor);
        self
    }

    /// Set the commands to run after installing. If this is not set, they are loaded with
    /// [`PostInstallCommands::discover`].
    #[must_use]
    pub fn post_install_commands(mut self, commands: PostInstallCommands) -> Self {
        self.post_install_commands = Some(commands);
        self
    }

    /// Do not draw a progress bar while downloading.
    #[must_use]
    pub fn hide_progress(mut self) -> Self {
        self.hide_progress = true;
        self
    }

    /// Builds a new [`Installer`] instance and returns it.
    ///
    /// # Errors
    ///
    /// This returns an error if the HTTP client cannot be created, most notably when the
    /// configured proxy URL is not valid.
    pub fn build(self) -> Result<Installer> {
        let config = self.config.unwrap_or_default();
        let base_url = self
            .base_url
            .filter(|u| !u.is_empty())
            .map_or_else(|| config.download.base_url.clone(), String::from);
        debug!("base URL = {base_url}");

        let client = http_client(config.download.active_proxy())?;

        let home_dir = self.home_dir.unwrap_or_else(home_dir);
        let shell_flavor = self.shell_flavor.unwrap_or_else(ShellFlavor::current);
        let post_install_commands = self
            .post_install_commands
            .unwrap_or_else(PostInstallCommands::discover);

        Ok(Installer::new(
            self.version.filter(|v| !v.is_empty()).map(String::from),
            base_url,
            home_dir,
            shell_flavor,
            post_install_commands,
            client,
            !self.hide_progress,
        ))
    }
}

fn home_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        return home;
    }
    warn!("Could not determine your home directory, installing under the current directory");
    PathBuf::from(".")
}

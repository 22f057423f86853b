use crate::commands::launch_command;
use std::path::{Path, PathBuf};

pub(crate) const INSTALL_DIR_NAME: &str = ".moderne";
pub(crate) const BIN_DIR_NAME: &str = "bin";
pub(crate) const ARTIFACT_PREFIX: &str = "moderne-cli-";
pub(crate) const ARTIFACT_SUFFIX: &str = ".jar";

/// Where a particular version of the CLI comes from and where it goes. All paths are derived from
/// the version and the home directory, so this never changes once it is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallTarget {
    version: String,
    base_url: String,
    install_dir: PathBuf,
    bin_dir: PathBuf,
    artifact_path: PathBuf,
    artifact_file_name: String,
}

impl InstallTarget {
    #[must_use]
    pub fn new(version: &str, base_url: &str, home: &Path) -> Self {
        let install_dir = home.join(INSTALL_DIR_NAME);
        let bin_dir = install_dir.join(BIN_DIR_NAME);
        let artifact_file_name = format!("{ARTIFACT_PREFIX}{version}{ARTIFACT_SUFFIX}");
        let artifact_path = bin_dir.join(&artifact_file_name);

        InstallTarget {
            version: version.to_string(),
            base_url: base_url.to_string(),
            install_dir,
            bin_dir,
            artifact_path,
            artifact_file_name,
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    #[must_use]
    pub fn artifact_file_name(&self) -> &str {
        &self.artifact_file_name
    }

    /// The download URL, in Maven repository layout: `{base}/{version}/{artifact file name}`.
    #[must_use]
    pub fn artifact_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.base_url, self.version, self.artifact_file_name
        )
    }

    /// The command that runs the installed CLI.
    #[must_use]
    pub fn launch_command(&self) -> String {
        launch_command(&self.artifact_path)
    }
}

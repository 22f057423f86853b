use crate::{
    commands::{run_command, PostInstallCommands},
    error::InstallerError,
    fetcher::{fetch, Progress},
    shell::{upsert_block, ShellFlavor, Upsert, ALIAS_MARKER, ALIAS_NAME},
    target::InstallTarget,
    version::resolve_latest,
};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use reqwest::Client;
use std::{
    fs,
    path::{Path, PathBuf},
};

const RULE_WIDTH: usize = 60;

/// The steps of an installation, in the order they run. The first three are fatal when they
/// fail. Failures in the others are logged and the installation carries on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
enum Step {
    #[strum(serialize = "resolve the version to install")]
    ResolveVersion,
    #[strum(serialize = "create the installation directories")]
    CreateDirectories,
    #[strum(serialize = "download the Moderne CLI")]
    Download,
    #[strum(serialize = "configure the shell alias")]
    ConfigureAlias,
    #[strum(serialize = "run the post-installation commands")]
    RunCommands,
}

/// Installs the Moderne CLI. Create one with [`crate::InstallerBuilder`].
#[derive(Debug)]
pub struct Installer {
    version: Option<String>,
    base_url: String,
    home_dir: PathBuf,
    shell_flavor: ShellFlavor,
    post_install_commands: PostInstallCommands,
    client: Client,
    show_progress: bool,
}

impl Installer {
    pub(crate) fn new(
        version: Option<String>,
        base_url: String,
        home_dir: PathBuf,
        shell_flavor: ShellFlavor,
        post_install_commands: PostInstallCommands,
        client: Client,
        show_progress: bool,
    ) -> Self {
        Installer {
            version,
            base_url,
            home_dir,
            shell_flavor,
            post_install_commands,
            client,
            show_progress,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The version passed to the builder, if any. `None` means the latest version is resolved
    /// when installing.
    #[must_use]
    pub fn requested_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Installs the CLI jar under `<home>/.moderne/bin`, points the `mod` alias at it, and runs
    /// the post-install commands. Returns the target that was installed.
    ///
    /// # Errors
    ///
    /// This returns an error if the version cannot be resolved, the installation directory cannot
    /// be created, or the download fails. Problems updating shell configuration files and failing
    /// post-install commands are logged as warnings and do not cause an error.
    pub async fn install(&self) -> Result<InstallTarget> {
        let version = self.version().await?;
        let target = InstallTarget::new(&version, &self.base_url, &self.home_dir);

        info!("Starting Moderne CLI installation");
        info!("Version: {}", target.version());
        info!("Install directory: {}", target.install_dir().display());

        log_step(Step::CreateDirectories);
        create_directories(&target)
            .with_context(|| format!("failed to {}", Step::CreateDirectories))?;

        log_step(Step::Download);
        self.download(&target)
            .await
            .with_context(|| format!("failed to {}", Step::Download))?;

        log_step(Step::ConfigureAlias);
        self.configure_alias(&target);

        self.run_post_install_commands(&target);

        check_java();

        print!("{}", completion_message(&target, self.shell_flavor));

        Ok(target)
    }

    async fn version(&self) -> Result<String> {
        if let Some(v) = &self.version {
            return Ok(v.clone());
        }

        log_step(Step::ResolveVersion);
        let version = resolve_latest(&self.base_url, &self.client)
            .await
            .with_context(|| format!("failed to {}", Step::ResolveVersion))?;
        info!("Latest version: {version}");

        Ok(version)
    }

    async fn download(&self, target: &InstallTarget) -> Result<u64> {
        let bar = self.progress_bar();
        let bytes_style = ProgressStyle::with_template(
            "    Downloading: [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
        )
        .context("invalid progress bar template")?
        .progress_chars("=> ");

        let on_progress = |p: Progress| {
            if let Some(total) = p.total {
                if bar.length() != Some(total) {
                    bar.set_style(bytes_style.clone());
                    bar.set_length(total);
                }
            }
            bar.set_position(p.downloaded);
        };
        let res = fetch(
            &target.artifact_url(),
            target.artifact_path(),
            &self.client,
            on_progress,
        )
        .await;
        bar.finish_and_clear();

        Ok(res?)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::no_length();
        match ProgressStyle::with_template("    Downloading: {spinner} {bytes}") {
            Ok(style) => bar.with_style(style),
            Err(e) => {
                debug!("using the default progress style: {e}");
                bar
            }
        }
    }

    fn configure_alias(&self, target: &InstallTarget) {
        let alias = self.shell_flavor.alias_line(target.artifact_path());
        for file in self.shell_flavor.config_files(&self.home_dir) {
            match update_shell_config(&file, &alias) {
                Ok(Upsert::Replaced) => {
                    info!("Replaced the '{ALIAS_NAME}' alias in {}", file.display());
                }
                Ok(Upsert::Inserted) => {
                    info!("Added the '{ALIAS_NAME}' alias to {}", file.display());
                }
                Err(e) => warn!("Failed to update {}: {e}", file.display()),
            }
        }

        if let Some((path, script)) = self
            .shell_flavor
            .launcher(target.bin_dir(), target.artifact_path())
        {
            match fs::write(&path, script) {
                Ok(()) => info!("Created {}", path.display()),
                Err(e) => warn!("Failed to create {}: {e}", path.display()),
            }
        }
    }

    fn run_post_install_commands(&self, target: &InstallTarget) {
        let PostInstallCommands { commands, source } = &self.post_install_commands;
        if commands.is_empty() {
            debug!("no post-installation commands to run");
            return;
        }

        log_step(Step::RunCommands);
        info!("Loaded {} command(s) from {source}", commands.len());

        let launch = target.launch_command();
        let mut failed = 0;
        for command in commands {
            info!("Running: {command}");
            if let Err(e) = run_command(command, self.shell_flavor, &launch) {
                warn!("{e}");
                failed += 1;
            }
        }
        if failed > 0 {
            warn!("{failed} of {} command(s) failed", commands.len());
        }
    }
}

fn log_step(step: Step) {
    let desc = step.to_string();
    let mut chars = desc.chars();
    if let Some(first) = chars.next() {
        info!("[*] {}{}", first.to_uppercase(), chars.as_str());
    }
}

fn check_java() {
    match which::which("java") {
        Ok(java) => debug!("found java at {}", java.display()),
        Err(_) => warn!(
            "Could not find `java` in your PATH. The '{ALIAS_NAME}' command needs a Java runtime."
        ),
    }
}

fn create_directories(target: &InstallTarget) -> Result<(), InstallerError> {
    fs::create_dir_all(target.bin_dir())
        .map_err(|e| InstallerError::filesystem("failed to create", target.bin_dir(), e))?;
    debug!("created {}", target.bin_dir().display());
    Ok(())
}

// The PowerShell profile lives in a directory that may not exist yet.
fn update_shell_config(file: &Path, alias: &str) -> Result<Upsert, InstallerError> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| InstallerError::filesystem("failed to create", parent, e))?;
    }
    upsert_block(file, ALIAS_MARKER, alias)
}

fn completion_message(target: &InstallTarget, flavor: ShellFlavor) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        "Moderne CLI installation completed".to_string(),
        rule,
        String::new(),
        format!("JAR location: {}", target.artifact_path().display()),
        String::new(),
    ];
    lines.extend(flavor.activation_hints(target.bin_dir()));
    lines.extend([
        String::new(),
        "Then verify the installation with:".to_string(),
        format!("  {ALIAS_NAME} --version"),
        String::new(),
    ]);
    lines.join("\n")
}

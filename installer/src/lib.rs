//! A library for installing the Moderne CLI.
//!
//! The Moderne CLI is distributed as a single jar in a Maven repository. This crate downloads that
//! jar into `~/.moderne/bin`, adds a `mod` alias for it to the user's shell configuration, and then
//! runs any post-install commands. It also ships a CLI tool named `moderne-cli-installer`.
//!
//! The main entry point for programmatic use is the [`InstallerBuilder`] struct. Here is an example
//! of its usage:
//!
//! ```ignore
//! use moderne_installer::{Config, InstallerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (config, _source) = Config::load();
//!     let installer = InstallerBuilder::new()
//!         .version("3.57.9")
//!         .config(config)
//!         .build()?;
//!
//!     installer.install().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Which Version Gets Installed
//!
//! If no version is given, the installer reads `maven-metadata.xml` from the repository and
//! installs the version in its `<latest>` element, falling back to `<release>`.
//!
//! ## Configuration
//!
//! A `config.yaml` file next to the installer executable or in the current directory can change
//! the repository and set up a proxy:
//!
//! ```yaml
//! download:
//!   baseUrl: https://artifacts.example.com/maven2/io/moderne/moderne-cli
//!   proxy:
//!     url: http://proxy.example.com:8080
//!     username: user
//!     password: secret
//!     noProxy: localhost,.internal.example.com
//! ```
//!
//! ## Post-install Commands
//!
//! A `commands.txt` file, looked for in the same places, lists shell commands to run once the jar
//! is installed, one per line. Blank lines and lines starting with `#` are ignored. The command
//! that runs the CLI is available to them in the `MOD` environment variable, so
//! `$MOD config license <key>` works in bash.
//!
//! ## Features
//!
//! This crate offers several features to control the TLS dependency used by `reqwest`:
//!
#![doc = document_features::document_features!()]

mod builder;
mod client;
mod commands;
mod config;
mod error;
mod fetcher;
mod installer;
mod shell;
mod target;
mod version;

pub use crate::{
    builder::InstallerBuilder,
    client::{bypasses_proxy, http_client},
    commands::{
        parse_commands, run_command, CommandSource, PostInstallCommands, COMMANDS_FILE_NAME,
        MOD_ENV_VAR,
    },
    config::{
        Config, ConfigSource, DownloadConfig, ProxyConfig, CONFIG_FILE_NAME, DEFAULT_BASE_URL,
    },
    error::InstallerError,
    fetcher::{fetch, Progress},
    installer::Installer,
    shell::{upsert_block, ShellFlavor, Upsert, ALIAS_MARKER, ALIAS_NAME},
    target::InstallTarget,
    version::resolve_latest,
};

// The version of the `moderne-installer` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(feature = "logging")]
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};

/// Sets up logging to stderr for the `moderne-cli-installer` binary. Informational messages are
/// the installer's progress report, so they are printed plainly, while warnings and errors are
/// colored. At the debug level each line is prefixed with the module that logged it.
///
/// # Errors
///
/// This can return a `log::SetLoggerError` error.
#[cfg(feature = "logging")]
pub fn init_logger(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::White)
        .debug(Color::BrightBlack)
        .trace(Color::BrightBlack);
    let show_target = level >= log::LevelFilter::Debug;

    Dispatch::new()
        .format(move |out, message, record| {
            let color = format!("\x1B[{}m", colors.get_color(&record.level()).to_fg_str());
            if show_target {
                out.finish(format_args!(
                    "{color}[{}][{}] {message}\x1B[0m",
                    record.target(),
                    record.level(),
                ));
            } else if record.level() <= log::Level::Warn {
                out.finish(format_args!("{color}{}: {message}\x1B[0m", record.level()));
            } else {
                out.finish(format_args!("{message}"));
            }
        })
        .level(level)
        // These are very noisy.
        .level_for("hyper", log::LevelFilter::Error)
        .level_for("hyper_util", log::LevelFilter::Error)
        .level_for("reqwest", log::LevelFilter::Error)
        .chain(std::io::stderr())
        .apply()
}

use crate::{config::candidate_paths, error::InstallerError, shell::ShellFlavor};
use log::debug;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    process::Command,
};

/// The name of the file that post-install commands are read from.
pub const COMMANDS_FILE_NAME: &str = "commands.txt";

/// The command list bundled into the installer, used when no `commands.txt` file is found.
pub const EMBEDDED_COMMANDS: &str = include_str!("../commands.txt");

/// The environment variable that holds the command which runs the installed CLI.
pub const MOD_ENV_VAR: &str = "MOD";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandSource {
    File(PathBuf),
    Embedded,
}

impl fmt::Display for CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSource::File(p) => write!(f, "{}", p.display()),
            CommandSource::Embedded => f.write_str("embedded"),
        }
    }
}

/// The shell commands to run once the CLI is installed, along with where they were loaded from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostInstallCommands {
    pub commands: Vec<String>,
    pub source: CommandSource,
}

impl PostInstallCommands {
    /// Looks for `commands.txt` next to the running executable and then in the current working
    /// directory. The first file that contains at least one command wins. Otherwise the embedded
    /// list is used.
    #[must_use]
    pub fn discover() -> Self {
        Self::discover_from(&candidate_paths(COMMANDS_FILE_NAME), EMBEDDED_COMMANDS)
    }

    #[must_use]
    pub fn discover_from(candidates: &[PathBuf], embedded: &str) -> Self {
        for path in candidates {
            match fs::read_to_string(path) {
                Ok(text) => {
                    let commands = parse_commands(&text);
                    if !commands.is_empty() {
                        return PostInstallCommands {
                            commands,
                            source: CommandSource::File(path.clone()),
                        };
                    }
                    debug!("{} has no commands", path.display());
                }
                Err(e) => debug!("could not read {}: {e}", path.display()),
            }
        }

        PostInstallCommands {
            commands: parse_commands(embedded),
            source: CommandSource::Embedded,
        }
    }

    /// An empty command list.
    #[must_use]
    pub fn none() -> Self {
        PostInstallCommands {
            commands: vec![],
            source: CommandSource::Embedded,
        }
    }
}

/// Returns one command per line, skipping blank lines and lines starting with `#`. Lines are
/// trimmed.
#[must_use]
pub fn parse_commands(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Runs `command_line` through the shell for `flavor`, with [`MOD_ENV_VAR`] set to `launch`. The
/// command's stdout and stderr go to the installer's.
///
/// # Errors
///
/// Returns [`InstallerError::CommandExecution`] if the shell cannot be started or the command
/// exits unsuccessfully.
pub fn run_command(
    command_line: &str,
    flavor: ShellFlavor,
    launch: &str,
) -> Result<(), InstallerError> {
    let mut cmd = shell_command(flavor, command_line);
    cmd.env(MOD_ENV_VAR, launch);
    debug!("running {cmd:?}");

    let failed = |message: String| InstallerError::CommandExecution {
        command: command_line.to_string(),
        message,
    };
    let status = cmd.status().map_err(|e| failed(e.to_string()))?;
    if !status.success() {
        return Err(failed(format!("exited with {status}")));
    }

    Ok(())
}

fn shell_command(flavor: ShellFlavor, command_line: &str) -> Command {
    match flavor {
        ShellFlavor::Posix => {
            let mut cmd = Command::new("bash");
            cmd.arg("-c").arg(command_line);
            cmd
        }
        ShellFlavor::Windows => {
            let mut cmd = Command::new("powershell");
            cmd.args(["-NoProfile", "-Command", command_line]);
            cmd
        }
    }
}

pub(crate) fn launch_command(jar: &Path) -> String {
    format!("java -jar {}", jar.display())
}

//! Maintains the `mod` alias in the user's shell configuration.
//!
//! Each configured file gets one marker block at its end: a marker comment followed by exactly one
//! line of shell code. On every run the existing block is removed and a fresh one is appended, so
//! re-running the installer with a different artifact path just moves the alias.
//!
//! The removal is deliberately simple. Any line containing the marker is dropped along with the
//! line right after it, whatever that line contains. If a user edits the line after the marker by
//! hand, their edit is lost on the next run.

use crate::error::InstallerError;
use log::debug;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// The comment line that marks the block managed by the installer.
pub const ALIAS_MARKER: &str = "# Moderne CLI alias (managed by installer)";

/// The name of the shell command that runs the installed CLI.
pub const ALIAS_NAME: &str = "mod";

/// The outcome of [`upsert_block`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// At least one existing marker block was removed before the new one was added.
    Replaced,
    Inserted,
}

/// Replaces the marker block in `path` with `marker` followed by `content`, or appends one if the
/// file has none. A missing file is treated as empty and is created.
///
/// The file is rewritten in place, so an interruption part-way through the write can leave it
/// truncated.
///
/// # Errors
///
/// Returns [`InstallerError::Filesystem`] if the file exists but cannot be read, or if it cannot
/// be written.
pub fn upsert_block(path: &Path, marker: &str, content: &str) -> Result<Upsert, InstallerError> {
    let existing = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("{} does not exist yet", path.display());
            String::new()
        }
        Err(e) => return Err(InstallerError::filesystem("failed to read", path, e)),
    };

    let (new_content, upsert) = rewrite_block(&existing, marker, content);
    fs::write(path, new_content)
        .map_err(|e| InstallerError::filesystem("failed to write", path, e))?;

    Ok(upsert)
}

fn rewrite_block(existing: &str, marker: &str, content: &str) -> (String, Upsert) {
    let mut kept: Vec<&str> = vec![];
    let mut found = false;
    let mut lines = existing.split('\n');
    while let Some(line) = lines.next() {
        if line.contains(marker) {
            found = true;
            // The line after the marker belongs to the block, no matter what it is.
            lines.next();
            continue;
        }
        kept.push(line);
    }

    while kept.last().is_some_and(|l| l.is_empty()) {
        kept.pop();
    }
    kept.extend(["", marker, content, ""]);

    (
        kept.join("\n"),
        if found {
            Upsert::Replaced
        } else {
            Upsert::Inserted
        },
    )
}

/// The shell environments the installer knows how to configure.
#[derive(strum::AsRefStr, Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum ShellFlavor {
    /// bash and zsh, configured through their rc files.
    #[strum(serialize = "posix")]
    Posix,
    /// PowerShell, configured through the user's profile script, plus a batch launcher for CMD.
    #[strum(serialize = "windows")]
    Windows,
}

impl ShellFlavor {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            ShellFlavor::Windows
        } else {
            ShellFlavor::Posix
        }
    }

    /// The files that should carry the marker block. For POSIX shells this is `.bashrc` and
    /// `.zshrc` when they exist, or `.bashrc` alone when neither does.
    #[must_use]
    pub fn config_files(self, home: &Path) -> Vec<PathBuf> {
        match self {
            ShellFlavor::Posix => {
                let bashrc = home.join(".bashrc");
                let zshrc = home.join(".zshrc");
                let existing = [&bashrc, &zshrc]
                    .into_iter()
                    .filter(|p| p.exists())
                    .cloned()
                    .collect::<Vec<_>>();
                if existing.is_empty() {
                    vec![bashrc]
                } else {
                    existing
                }
            }
            ShellFlavor::Windows => vec![home
                .join("Documents")
                .join("WindowsPowerShell")
                .join("Microsoft.PowerShell_profile.ps1")],
        }
    }

    /// The line placed after the marker, which makes `mod` run the given jar.
    #[must_use]
    pub fn alias_line(self, jar: &Path) -> String {
        match self {
            ShellFlavor::Posix => format!(r#"alias {ALIAS_NAME}="java -jar {}""#, jar.display()),
            ShellFlavor::Windows => {
                format!(
                    r#"function {ALIAS_NAME} {{ java -jar "{}" $args }}"#,
                    jar.display()
                )
            }
        }
    }

    /// A launcher script to write next to the jar, if this flavor needs one.
    #[must_use]
    pub fn launcher(self, bin_dir: &Path, jar: &Path) -> Option<(PathBuf, String)> {
        match self {
            ShellFlavor::Posix => None,
            ShellFlavor::Windows => Some((
                bin_dir.join(format!("{ALIAS_NAME}.bat")),
                format!("@echo off\njava -jar \"{}\" %*\n", jar.display()),
            )),
        }
    }

    /// Hints printed at the end of the installation about how to start using `mod`.
    #[must_use]
    pub fn activation_hints(self, bin_dir: &Path) -> Vec<String> {
        match self {
            ShellFlavor::Posix => vec![
                format!("To use the '{ALIAS_NAME}' command, restart your shell or run:"),
                "  source ~/.bashrc".to_string(),
                "  # or".to_string(),
                "  source ~/.zshrc".to_string(),
            ],
            ShellFlavor::Windows => vec![
                format!("To use the '{ALIAS_NAME}' command:"),
                "  - In PowerShell: Restart PowerShell or run:".to_string(),
                "    . $PROFILE".to_string(),
                "  - In CMD: Add the following to your PATH:".to_string(),
                format!("    {}", bin_dir.display()),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use rstest::rstest;
    use tempfile::tempdir;

    const CONTENT: &str = r#"alias mod="java -jar /home/user/.moderne/bin/moderne-cli-1.0.0.jar""#;

    #[test]
    fn upsert_into_missing_file() -> Result<()> {
        let td = tempdir()?;
        let rc = td.path().join(".bashrc");

        let upsert = upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        assert_eq!(upsert, Upsert::Inserted);
        assert_eq!(
            fs::read_to_string(&rc)?,
            format!("\n{ALIAS_MARKER}\n{CONTENT}\n"),
        );

        Ok(())
    }

    #[test]
    fn upsert_is_idempotent() -> Result<()> {
        let td = tempdir()?;
        let rc = td.path().join(".zshrc");
        fs::write(&rc, "export PATH=\"$HOME/bin:$PATH\"\n")?;

        upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        let first = fs::read_to_string(&rc)?;
        let upsert = upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        let second = fs::read_to_string(&rc)?;

        assert_eq!(upsert, Upsert::Replaced);
        assert_eq!(first, second);
        assert_eq!(second.matches(ALIAS_MARKER).count(), 1);
        assert_eq!(
            second,
            format!("export PATH=\"$HOME/bin:$PATH\"\n\n{ALIAS_MARKER}\n{CONTENT}\n"),
        );

        Ok(())
    }

    #[test]
    fn upsert_keeps_trailing_whitespace_lines() -> Result<()> {
        let td = tempdir()?;
        let rc = td.path().join(".bashrc");
        fs::write(&rc, "export EDITOR=vim\n  \n")?;

        upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        let first = fs::read_to_string(&rc)?;
        assert_eq!(
            first,
            format!("export EDITOR=vim\n  \n\n{ALIAS_MARKER}\n{CONTENT}\n"),
        );

        upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        assert_eq!(fs::read_to_string(&rc)?, first);

        Ok(())
    }

    #[test]
    fn upsert_replaces_old_block() -> Result<()> {
        let td = tempdir()?;
        let rc = td.path().join(".bashrc");
        fs::write(
            &rc,
            format!(
                "# my settings\nexport EDITOR=vim\n{ALIAS_MARKER}\nalias mod=\"java -jar /old/moderne-cli-0.9.0.jar\"\nalias ll='ls -l'\n"
            ),
        )?;

        let upsert = upsert_block(&rc, ALIAS_MARKER, CONTENT)?;
        assert_eq!(upsert, Upsert::Replaced);

        let got = fs::read_to_string(&rc)?;
        assert_eq!(got.matches(ALIAS_MARKER).count(), 1);
        assert!(got.contains(CONTENT));
        assert!(!got.contains("moderne-cli-0.9.0.jar"));
        assert!(got.starts_with("# my settings\nexport EDITOR=vim\nalias ll='ls -l'\n"));

        Ok(())
    }

    #[rstest]
    #[case::no_marker("a\nb", "a\nb\n\nM\nnew\n", Upsert::Inserted)]
    #[case::empty("", "\nM\nnew\n", Upsert::Inserted)]
    #[case::block_in_the_middle("a\nM\nold\nb\n", "a\nb\n\nM\nnew\n", Upsert::Replaced)]
    #[case::next_line_is_removed_whatever_it_is("M\nkeep me?\nb", "b\n\nM\nnew\n", Upsert::Replaced)]
    #[case::every_marker_is_removed("M\nx\na\nM\ny\nb", "a\nb\n\nM\nnew\n", Upsert::Replaced)]
    #[case::marker_as_last_line("a\nM", "a\n\nM\nnew\n", Upsert::Replaced)]
    #[case::marker_substring_match("a\n  M (old) \nx\nb", "a\nb\n\nM\nnew\n", Upsert::Replaced)]
    #[case::trailing_blank_lines_collapse("a\n\n\n", "a\n\nM\nnew\n", Upsert::Inserted)]
    #[case::whitespace_only_lines_are_kept(
        "a\n   \n\t\n",
        "a\n   \n\t\n\nM\nnew\n",
        Upsert::Inserted
    )]
    fn rewrite(#[case] existing: &str, #[case] expect: &str, #[case] expect_upsert: Upsert) {
        let (got, upsert) = rewrite_block(existing, "M", "new");
        assert_eq!(got, expect);
        assert_eq!(upsert, expect_upsert);
    }

    #[test]
    fn posix_config_files_default_to_bashrc() -> Result<()> {
        let td = tempdir()?;
        assert_eq!(
            ShellFlavor::Posix.config_files(td.path()),
            vec![td.path().join(".bashrc")],
        );
        Ok(())
    }

    #[test]
    fn posix_config_files_uses_existing_files() -> Result<()> {
        let td = tempdir()?;
        fs::write(td.path().join(".zshrc"), "")?;
        assert_eq!(
            ShellFlavor::Posix.config_files(td.path()),
            vec![td.path().join(".zshrc")],
        );

        fs::write(td.path().join(".bashrc"), "")?;
        assert_eq!(
            ShellFlavor::Posix.config_files(td.path()),
            vec![td.path().join(".bashrc"), td.path().join(".zshrc")],
        );
        Ok(())
    }

    #[test]
    fn windows_alias_and_launcher() {
        let jar = Path::new("C:/Users/u/.moderne/bin/moderne-cli-1.0.0.jar");
        assert_eq!(
            ShellFlavor::Windows.alias_line(jar),
            r#"function mod { java -jar "C:/Users/u/.moderne/bin/moderne-cli-1.0.0.jar" $args }"#,
        );

        let bin = Path::new("C:/Users/u/.moderne/bin");
        let (path, script) = ShellFlavor::Windows
            .launcher(bin, jar)
            .expect("windows has a launcher");
        assert_eq!(path, bin.join("mod.bat"));
        assert_eq!(
            script,
            "@echo off\njava -jar \"C:/Users/u/.moderne/bin/moderne-cli-1.0.0.jar\" %*\n",
        );
        assert!(ShellFlavor::Posix.launcher(bin, jar).is_none());
    }

    #[test]
    fn posix_alias_line() {
        let jar = Path::new("/home/user/.moderne/bin/moderne-cli-1.0.0.jar");
        assert_eq!(ShellFlavor::Posix.alias_line(jar), CONTENT);
    }
}

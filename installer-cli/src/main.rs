use anyhow::{Error, Result};
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use log::{debug, error};
use moderne_installer::{Config, Installer, InstallerBuilder};
use std::{env, ffi::OsString};
use thiserror::Error;

#[derive(Debug, Error)]
enum CliError {
    #[error("{0:}")]
    InvalidArgsError(String),
}

// Long flags that may also be written with a single dash, like `-version 1.2.3`.
const SINGLE_DASH_FLAGS: &[&str] = &["version", "url", "debug", "quiet"];
const VALUE_FLAGS: &[&str] = &["version", "url"];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let matches = cmd().get_matches_from(normalize_args(env::args_os()));
    let res = init_logger_from_matches(&matches);
    if let Err(e) = res {
        eprintln!("Error creating logger: {e}");
        std::process::exit(126);
    }

    let status = match make_installer(&matches) {
        Ok(installer) => match installer.install().await {
            Ok(target) => {
                debug!("installed {}", target.artifact_path().display());
                0
            }
            Err(e) => {
                print_err(&e);
                1
            }
        },
        Err(e) => {
            print_err(&e);
            127
        }
    };
    std::process::exit(status);
}

const MAX_TERM_WIDTH: usize = 100;

fn cmd() -> Command {
    Command::new("moderne-cli-installer")
        .version(env!("CARGO_PKG_VERSION"))
        // `--version` selects the version of the Moderne CLI to install.
        .disable_version_flag(true)
        .about("Installs the Moderne CLI and sets up the `mod` command")
        .arg(Arg::new("version").long("version").help(concat!(
            "The version of the Moderne CLI to install, like 3.57.9. Defaults to the latest",
            " version listed in the repository's maven-metadata.xml.",
        )))
        .arg(Arg::new("url").long("url").help(concat!(
            "The base URL of the Maven repository directory that holds the Moderne CLI releases.",
            " This overrides the baseUrl from config.yaml.",
        )))
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Enable debugging output."),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppresses most output."),
        )
        .group(ArgGroup::new("log-level").args(["debug", "quiet"]))
        .max_term_width(MAX_TERM_WIDTH)
}

/// Rewrites single-dash long flags like `-version` and `-url=...` to their `--` form so clap
/// accepts them. The program name and the value following a flag are left alone.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut value_follows = false;
    for arg in args {
        if std::mem::take(&mut value_follows) {
            normalized.push(arg);
            continue;
        }
        let Some(s) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };

        let rest = s.trim_start_matches('-');
        let (name, has_value) = rest
            .split_once('=')
            .map_or((rest, false), |(n, _)| (n, true));
        if !s.starts_with('-') || !SINGLE_DASH_FLAGS.contains(&name) {
            normalized.push(arg);
            continue;
        }

        value_follows = !has_value && VALUE_FLAGS.contains(&name);
        normalized.push(OsString::from(format!("--{rest}")));
    }
    normalized
}

pub(crate) fn init_logger_from_matches(matches: &ArgMatches) -> Result<(), log::SetLoggerError> {
    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else if matches.get_flag("quiet") {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Info
    };

    moderne_installer::init_logger(level)
}

fn make_installer(matches: &ArgMatches) -> Result<Installer> {
    validate_args(matches)?;

    let (config, source) = Config::load();
    debug!("using config from {source}");

    let mut builder = InstallerBuilder::new().config(config);
    if let Some(v) = matches.get_one::<String>("version") {
        builder = builder.version(v);
    }
    if let Some(u) = matches.get_one::<String>("url") {
        builder = builder.base_url(u.trim_end_matches('/'));
    }

    builder.build()
}

fn validate_args(matches: &ArgMatches) -> Result<()> {
    if let Some(v) = matches.get_one::<String>("version") {
        if v.contains(['/', '\\']) || v.chars().any(char::is_whitespace) {
            return Err(CliError::InvalidArgsError(format!(
                "The --version value `{v}` is not a valid version"
            ))
            .into());
        }
    }

    if let Some(u) = matches.get_one::<String>("url") {
        if !(u.is_empty() || u.starts_with("http://") || u.starts_with("https://")) {
            return Err(CliError::InvalidArgsError(format!(
                "The --url value `{u}` must start with http:// or https://"
            ))
            .into());
        }
    }

    Ok(())
}

fn print_err(e: &Error) {
    error!("{e:#}");
    if let Some(ce) = e.downcast_ref::<CliError>() {
        match ce {
            CliError::InvalidArgsError(_) => {
                println!();
                if let Err(e) = cmd().print_help() {
                    eprintln!("Could not print help: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::go_style(&["x", "-version", "1.0.0"], &["x", "--version", "1.0.0"])]
    #[case::go_style_with_equals(&["x", "-url=http://h/p"], &["x", "--url=http://h/p"])]
    #[case::already_double_dash(&["x", "--version", "1.0.0"], &["x", "--version", "1.0.0"])]
    #[case::short_flags_untouched(&["x", "-d"], &["x", "-d"])]
    #[case::unknown_flag_untouched(&["x", "-verbose"], &["x", "-verbose"])]
    #[case::value_untouched(&["x", "-url", "-quiet"], &["x", "--url", "-quiet"])]
    #[case::value_after_equals_form(&["x", "-url=h", "-quiet"], &["x", "--url=h", "--quiet"])]
    #[case::program_name_untouched(&["-version"], &["-version"])]
    fn normalize(#[case] input: &[&str], #[case] expect: &[&str]) {
        assert_eq!(normalize_args(args(input)), args(expect));
    }

    #[test]
    fn go_style_flags_parse() -> Result<()> {
        let matches = cmd().try_get_matches_from(normalize_args(args(&[
            "moderne-cli-installer",
            "-version",
            "3.57.9",
            "-url=http://127.0.0.1:1234",
            "-quiet",
        ])))?;
        assert_eq!(
            matches.get_one::<String>("version").map(String::as_str),
            Some("3.57.9"),
        );
        assert_eq!(
            matches.get_one::<String>("url").map(String::as_str),
            Some("http://127.0.0.1:1234"),
        );
        assert!(matches.get_flag("quiet"));
        Ok(())
    }

    #[test]
    fn debug_and_quiet_conflict() {
        let res = cmd().try_get_matches_from(["moderne-cli-installer", "--debug", "--quiet"]);
        assert!(res.is_err());
    }

    #[rstest]
    #[case::ok(&["x", "--version", "1.0.0", "--url", "https://repo.example.com"], true)]
    #[case::empty_version_resolves_latest(&["x", "--version", ""], true)]
    #[case::path_in_version(&["x", "--version", "../1.0.0"], false)]
    #[case::space_in_version(&["x", "--version", "1.0 .0"], false)]
    #[case::url_without_scheme(&["x", "--url", "repo.example.com"], false)]
    fn validate(#[case] input: &[&str], #[case] ok: bool) -> Result<()> {
        let matches = cmd().try_get_matches_from(input.iter().copied())?;
        assert_eq!(validate_args(&matches).is_ok(), ok);
        Ok(())
    }
}

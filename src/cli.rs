use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};

use crate::build::{BuildOptions, build_project};
use crate::console::{Console, TerminalConsole, Tone};
use crate::executor::ShellRunner;

#[derive(Debug, Parser)]
#[command(name = "omnibus", version, about = "Build Omnibus projects")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the given Omnibus project
    Build {
        #[command(subcommand)]
        target: BuildTarget,
    },
    /// Display version information
    Version,
}

#[derive(Debug, Subcommand)]
enum BuildTarget {
    /// Build a project defined under config/projects
    Project {
        /// Name of the project to build
        name: String,
        /// Append timestamp information to the version identifier. Add a
        /// timestamp for nightly releases; leave it off for release and
        /// prerelease builds
        #[arg(
            short,
            long,
            default_value_t = true,
            num_args = 0..=1,
            default_missing_value = "true",
            action = ArgAction::Set,
            overrides_with = "no_timestamp"
        )]
        timestamp: bool,
        /// Leave the timestamp off the version identifier
        #[arg(long, overrides_with = "timestamp")]
        no_timestamp: bool,
        /// Path to the Omnibus project root (defaults to the current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

impl BuildTarget {
    fn into_options(self) -> anyhow::Result<BuildOptions> {
        let BuildTarget::Project {
            name,
            timestamp,
            no_timestamp,
            path,
        } = self;
        let path = match path {
            Some(path) => path,
            None => std::env::current_dir().context("resolving current directory")?,
        };
        let mut options = BuildOptions::new(name, path);
        options.timestamp = timestamp && !no_timestamp;
        Ok(options)
    }
}

/// Parses the command line, runs the command and returns the exit code.
pub fn run() -> i32 {
    let cli = Cli::parse();
    let console = TerminalConsole;
    exit_code(execute(cli, &console), &console)
}

fn exit_code(result: anyhow::Result<()>, console: &dyn Console) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            console.say(&format!("error: {err:#}"), Tone::Error);
            1
        }
    }
}

fn execute(cli: Cli, console: &dyn Console) -> anyhow::Result<()> {
    match cli.command {
        Commands::Build { target } => {
            let options = target.into_options()?;
            build_project(&options, console, &ShellRunner)?;
        }
        Commands::Version => {
            console.say(
                &format!("Omnibus: {}", env!("CARGO_PKG_VERSION")),
                Tone::Warning,
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, execute, exit_code};
    use crate::build::BuildOptions;
    use crate::console::{RecordingConsole, Tone};
    use clap::{CommandFactory, Parser};

    fn build_options(args: &[&str]) -> BuildOptions {
        let mut argv = vec!["omnibus", "build", "project", "demo"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        let Commands::Build { target } = cli.command else {
            panic!("expected build command");
        };
        target.into_options().expect("options should resolve")
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn timestamp_defaults_to_true() {
        let options = build_options(&[]);
        assert_eq!(options.project, "demo");
        assert!(options.timestamp);
        assert_eq!(options.path, std::env::current_dir().unwrap());
    }

    #[test]
    fn bare_timestamp_flag_means_true() {
        assert!(build_options(&["--timestamp"]).timestamp);
        assert!(build_options(&["-t", "--path", "/srv/omnibus"]).timestamp);
    }

    #[test]
    fn no_timestamp_turns_it_off() {
        assert!(!build_options(&["--no-timestamp"]).timestamp);
    }

    #[test]
    fn last_timestamp_flag_wins() {
        assert!(build_options(&["--no-timestamp", "--timestamp"]).timestamp);
        assert!(!build_options(&["--timestamp", "--no-timestamp"]).timestamp);
    }

    #[test]
    fn parses_explicit_timestamp_value_and_path() {
        let options = build_options(&["-t", "false", "--path", "/srv/omnibus"]);
        assert!(!options.timestamp);
        assert_eq!(options.path, std::path::Path::new("/srv/omnibus"));
    }

    #[test]
    fn errors_are_reported_with_their_context_chain() {
        let console = RecordingConsole::new();
        let err = anyhow::anyhow!("rake exited with status 2").context("building project demo");

        assert_eq!(exit_code(Err(err), &console), 1);
        assert_eq!(
            console.lines(),
            vec![(
                Tone::Error,
                "error: building project demo: rake exited with status 2".to_string()
            )]
        );
        assert_eq!(exit_code(Ok(()), &console), 0);
    }

    #[test]
    fn version_command_reports_crate_version() {
        let console = RecordingConsole::new();
        execute(Cli::parse_from(["omnibus", "version"]), &console).expect("version should succeed");

        assert_eq!(
            console.lines(),
            vec![(
                Tone::Warning,
                format!("Omnibus: {}", env!("CARGO_PKG_VERSION"))
            )]
        );
    }
}

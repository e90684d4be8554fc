use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use crate::console::{Console, Tone};
use crate::executor::{BuildCommand, BuildRunner, DEFAULT_BUILD_TIMEOUT};
use crate::migrate::{ConfigMigrator, MigrationResult};
use crate::project::ensure_project;

/// Configuration file checked and migrated before every build.
pub const CONFIG_FILE: &str = "omnibus.rb";

/// Tells the build whether to add a timestamp to the version identifier.
pub const APPEND_TIMESTAMP_ENV: &str = "OMNIBUS_APPEND_TIMESTAMP";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub project: String,
    pub path: PathBuf,
    pub timestamp: bool,
    pub timeout: Duration,
}

impl BuildOptions {
    pub fn new(project: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            path: path.into(),
            timestamp: true,
            timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }

    pub fn command(&self) -> BuildCommand {
        let mut env = BTreeMap::new();
        env.insert(APPEND_TIMESTAMP_ENV.to_string(), self.timestamp.to_string());
        BuildCommand {
            command: format!("rake projects:{}", self.project),
            env,
            cwd: self.path.clone(),
            timeout: self.timeout,
        }
    }
}

pub fn build_project(
    options: &BuildOptions,
    console: &dyn Console,
    runner: &dyn BuildRunner,
) -> anyhow::Result<()> {
    ensure_project(&options.path)?;

    console.say(&format!("Building {}", options.project), Tone::Success);
    let banner = "*".repeat(50);
    console.say(&banner, Tone::Warning);
    console.say("Andra Compatibility Mode", Tone::Warning);
    console.say(&banner, Tone::Warning);
    console.say(
        &format!("Checking {CONFIG_FILE} for compatibility..."),
        Tone::Warning,
    );

    let config_path = options.path.join(CONFIG_FILE);
    let outcome = ConfigMigrator::new()
        .migrate(&config_path)
        .with_context(|| format!("migrating {}", config_path.display()))?;
    match outcome {
        MigrationResult::AlreadyCompatible => console.say(
            &format!("{CONFIG_FILE} is compatible, continuing..."),
            Tone::Warning,
        ),
        MigrationResult::Migrated { backup } => {
            console.say(
                &format!("{CONFIG_FILE} is incompatible, updated it to the block format."),
                Tone::Warning,
            );
            console.say(
                &format!("Backed up {CONFIG_FILE} to {}", backup.display()),
                Tone::Warning,
            );
        }
    }
    console.say(&banner, Tone::Warning);

    if !options.timestamp {
        console.say(
            "I won't append a timestamp to the version identifier.",
            Tone::Warning,
        );
    }

    let command = options.command();
    runner
        .run(&command)
        .with_context(|| format!("building project {}", options.project))?;
    Ok(())
}

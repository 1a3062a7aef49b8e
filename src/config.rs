use crate::cli::Cli;
use crate::error::{DepbumpError, Result};
use crate::schema::DependencySchema;
use jiff::Timestamp;
use std::path::PathBuf;

const FALLBACK_NPMRC_PATH: &str = "/home/app/.npmrc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Production,
    Test,
}

impl RunMode {
    /// Only `test` selects test mode; any other value runs in production.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "test" => RunMode::Test,
            "" | "production" => RunMode::Production,
            other => {
                log::warn!("Unknown mode '{}', running in production mode", other);
                RunMode::Production
            }
        }
    }

    /// Test runs never push to the remote.
    pub fn pushes(self) -> bool {
        self == RunMode::Production
    }
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repo_path: PathBuf,
    pub mode: RunMode,
    pub actor_id: String,
    pub git_sha: Option<String>,
    pub npmrc: Option<String>,
    pub npmrc_path: PathBuf,
    pub batch_mode: bool,
    pub batch_bootstrap: bool,
    pub root_install_command: Option<String>,
    pub bootstrap_command: Option<String>,
    pub schema: DependencySchema,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let mode = RunMode::parse(&cli.mode);
        let batch_mode = parse_flag("SETTING_BATCH_MODE", &cli.batch_mode)?;
        let batch_bootstrap = parse_flag("SETTING_BATCH_BOOTSTRAP", &cli.batch_bootstrap)?;
        let schema = DependencySchema::from_json(&cli.dependencies)?;

        let git_sha = non_empty(cli.git_sha);
        if !batch_mode && git_sha.is_none() {
            return Err(DepbumpError::Config(
                "GIT_SHA is required when not running in batch mode".into(),
            ));
        }

        let actor_id = non_empty(cli.actor_id).unwrap_or_else(|| {
            let generated = Timestamp::now().strftime("%Y%m%d%H%M%S").to_string();
            log::warn!("ACTOR_ID not set, using generated id {}", generated);
            generated
        });

        let npmrc_path = cli.npmrc_path.unwrap_or_else(default_npmrc_path);

        Ok(Self {
            repo_path: cli.repo_path,
            mode,
            actor_id,
            git_sha,
            npmrc: non_empty(cli.npmrc),
            npmrc_path,
            batch_mode,
            batch_bootstrap,
            root_install_command: non_empty(cli.root_install_command),
            bootstrap_command: non_empty(cli.bootstrap_command),
            schema,
        })
    }
}

/// Boolean settings arrive JSON encoded (`true`/`false`).
fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(false);
    }

    serde_json::from_str::<bool>(raw).map_err(|_| {
        DepbumpError::Config(format!("{} must be true or false, got '{}'", name, raw))
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_npmrc_path() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".npmrc"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_NPMRC_PATH))
}

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Every option falls back to the environment variable the automation
/// host sets, so the binary runs unchanged inside the update container.
#[derive(Parser, Debug)]
#[command(
    name = "depbump",
    about = "Bump outdated dependencies in a JavaScript monorepo and open pull requests",
    version,
    author
)]
pub struct Cli {
    /// Path to the checked-out repository
    #[arg(long = "repo", env = "REPO_PATH", default_value = "/repo")]
    pub repo_path: PathBuf,

    /// Execution mode: "production" or "test" (test skips git push)
    #[arg(long = "env", env = "DEPENDENCIES_ENV", default_value = "production")]
    pub mode: String,

    /// Identifier of this run, used to keep branch names unique
    #[arg(long, env = "ACTOR_ID")]
    pub actor_id: Option<String>,

    /// Commit every per-dependency branch is created from
    #[arg(long, env = "GIT_SHA")]
    pub git_sha: Option<String>,

    /// Raw .npmrc contents to install before running the package manager
    #[arg(long, env = "SETTING_NPMRC", hide_env_values = true)]
    pub npmrc: Option<String>,

    /// Where the .npmrc contents are written
    #[arg(long, env = "NPMRC_PATH")]
    pub npmrc_path: Option<PathBuf>,

    /// Put every update on one branch with a single pull request
    #[arg(
        long,
        env = "SETTING_BATCH_MODE",
        default_value = "false",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub batch_mode: String,

    /// In batch mode, reinstall once after all manifests are patched
    #[arg(
        long,
        env = "SETTING_BATCH_BOOTSTRAP",
        default_value = "false",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub batch_bootstrap: String,

    /// Command replacing the lockfile-based root install
    #[arg(long, env = "SETTING_ROOT_INSTALL_COMMAND")]
    pub root_install_command: Option<String>,

    /// Command replacing `lerna bootstrap --concurrency 1`
    #[arg(long, env = "SETTING_BOOTSTRAP_COMMAND")]
    pub bootstrap_command: Option<String>,

    /// Dependencies to update as JSON: {"dependencies": [...]}
    #[arg(long, env = "DEPENDENCIES", hide_env_values = true)]
    pub dependencies: String,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}

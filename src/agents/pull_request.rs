use crate::agents::command_runner::{CommandRunner, CommandSpec};
use crate::error::{DepbumpError, Result};
use std::path::{Path, PathBuf};

const PULL_REQUEST_TOOL: &str = "pullrequest";

/// Hands a pushed branch to the pull request tool, which derives the title
/// and body from the dependency schema.
pub struct PullRequestAgent<'a> {
    runner: &'a dyn CommandRunner,
    repo_path: PathBuf,
}

impl<'a> PullRequestAgent<'a> {
    pub fn new<P: AsRef<Path>>(runner: &'a dyn CommandRunner, repo_path: P) -> Self {
        Self {
            runner,
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    pub fn open(&self, branch_name: &str, schema_json: &str) -> Result<()> {
        let spec = CommandSpec::program(
            &self.repo_path,
            PULL_REQUEST_TOOL,
            &[
                "--branch",
                branch_name,
                "--dependencies-schema",
                schema_json,
                "--title-from-schema",
                "--body-from-schema",
            ],
        );

        let output = self.runner.run(&spec)?;
        if !output.success() {
            return Err(DepbumpError::PullRequest(format!(
                "{} exited with status {} for branch {}: {}",
                PULL_REQUEST_TOOL,
                output.status,
                branch_name,
                output.stderr.trim()
            )));
        }
        Ok(())
    }
}

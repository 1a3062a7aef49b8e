use crate::agents::command_runner::{CommandOutput, CommandRunner, CommandSpec};
use crate::error::{DepbumpError, Result};
use crate::schema::Dependency;
use std::path::{Path, PathBuf};

const BATCH_BRANCH_PREFIX: &str = "dependencies.io-update-build-";

/// VersionControlAgent drives git inside the repository checkout.
pub struct VersionControlAgent<'a> {
    runner: &'a dyn CommandRunner,
    repo_path: PathBuf,
}

impl<'a> VersionControlAgent<'a> {
    pub fn new<P: AsRef<Path>>(runner: &'a dyn CommandRunner, repo_path: P) -> Self {
        Self {
            runner,
            repo_path: repo_path.as_ref().to_path_buf(),
        }
    }

    /// Check out an existing revision (detached when it is a commit).
    pub fn checkout(&self, revision: &str) -> Result<()> {
        self.run_git(&["checkout", revision], "git checkout")?;
        Ok(())
    }

    /// Create a branch from the current HEAD and switch to it.
    pub fn create_branch(&self, branch_name: &str) -> Result<()> {
        self.run_git(&["checkout", "-b", branch_name], "git checkout -b")?;
        Ok(())
    }

    /// Working tree status, already echoed to the console by the runner.
    pub fn status(&self) -> Result<String> {
        let output = self.run_git(&["status"], "git status")?;
        Ok(output.stdout)
    }

    /// Stage every change in the working tree.
    pub fn stage_all(&self) -> Result<()> {
        self.run_git(&["add", "."], "git add")?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_git(&["commit", "-m", message], "git commit")?;
        Ok(())
    }

    pub fn push(&self, branch_name: &str) -> Result<()> {
        self.run_git(
            &["push", "--set-upstream", "origin", branch_name],
            "git push",
        )?;
        Ok(())
    }

    fn run_git(&self, args: &[&str], command: &str) -> Result<CommandOutput> {
        let spec = CommandSpec::program(&self.repo_path, "git", args);
        let output = self.runner.run(&spec)?;
        Self::ensure_success(output, command)
    }

    fn ensure_success(output: CommandOutput, command: &str) -> Result<CommandOutput> {
        if output.success() {
            return Ok(output);
        }

        Err(DepbumpError::GitOperation(format!(
            "{} failed: {}",
            command,
            output.stderr.trim()
        )))
    }
}

/// Branch for a single dependency update.
///
/// The first `/` of a non-root manifest path becomes `--`, so
/// `/packages/app` yields a `---packages/app` suffix.
pub fn branch_name(dependency: &Dependency, actor_id: &str) -> String {
    let mut branch = format!(
        "{}-{}-{}",
        dependency.name, dependency.target_version, actor_id
    );
    if !dependency.is_root() {
        branch.push('-');
        branch.push_str(&dependency.path.replacen('/', "--", 1));
    }
    branch
}

/// Shared branch used when every update goes into one pull request.
pub fn batch_branch_name(actor_id: &str) -> String {
    format!("{BATCH_BRANCH_PREFIX}{actor_id}")
}

pub fn commit_message(dependency: &Dependency) -> String {
    format!(
        "Update {} from {} to {} in {}",
        dependency.name, dependency.installed_version, dependency.target_version, dependency.path
    )
}

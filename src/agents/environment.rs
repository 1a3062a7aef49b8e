use crate::agents::command_runner::{CommandRunner, CommandSpec};
use crate::config::Settings;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Package manager install selected for the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPlan {
    Custom(String),
    Yarn,
    NpmWithLockfile,
    NpmWithoutLockfile,
    Nothing,
}

impl InstallPlan {
    /// Picks the install command from the override or the files present.
    pub fn detect(repo_path: &Path, override_command: Option<&str>) -> Self {
        if let Some(command) = override_command {
            return InstallPlan::Custom(command.to_string());
        }

        if repo_path.join("yarn.lock").exists() {
            InstallPlan::Yarn
        } else if repo_path.join("package-lock.json").exists() {
            InstallPlan::NpmWithLockfile
        } else if repo_path.join("package.json").exists() {
            InstallPlan::NpmWithoutLockfile
        } else {
            InstallPlan::Nothing
        }
    }

    pub fn command(&self, repo_path: &Path) -> Option<CommandSpec> {
        match self {
            InstallPlan::Custom(command) => Some(CommandSpec::shell(repo_path, command)),
            InstallPlan::Yarn => Some(CommandSpec::program(
                repo_path,
                "yarn",
                &["install", "--ignore-scripts", "--frozen-lockfile", "--non-interactive"],
            )),
            InstallPlan::NpmWithLockfile => Some(CommandSpec::program(
                repo_path,
                "npm",
                &["install", "--ignore-scripts", "--quiet"],
            )),
            InstallPlan::NpmWithoutLockfile => Some(CommandSpec::program(
                repo_path,
                "npm",
                &["install", "--ignore-scripts", "--quiet", "--no-package-lock"],
            )),
            InstallPlan::Nothing => None,
        }
    }
}

/// Prepares the checkout: registry credentials first, then the root install
/// so the repository's own lerna is available.
pub struct EnvironmentBootstrapper<'a> {
    runner: &'a dyn CommandRunner,
    repo_path: PathBuf,
    npmrc: Option<String>,
    npmrc_path: PathBuf,
    root_install_command: Option<String>,
}

impl<'a> EnvironmentBootstrapper<'a> {
    pub fn new(settings: &Settings, runner: &'a dyn CommandRunner) -> Self {
        Self {
            runner,
            repo_path: settings.repo_path.clone(),
            npmrc: settings.npmrc.clone(),
            npmrc_path: settings.npmrc_path.clone(),
            root_install_command: settings.root_install_command.clone(),
        }
    }

    pub fn prepare(&self) -> Result<InstallPlan> {
        self.write_npmrc()?;
        self.install_root()
    }

    /// Writes the configured .npmrc, returning whether anything was written.
    pub fn write_npmrc(&self) -> Result<bool> {
        let Some(contents) = &self.npmrc else {
            return Ok(false);
        };

        println!(
            ".npmrc contents found in settings, writing to {}...",
            self.npmrc_path.display()
        );
        if let Some(parent) = self.npmrc_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.npmrc_path, contents)?;
        log::debug!("Wrote {} bytes of .npmrc", contents.len());
        Ok(true)
    }

    pub fn install_root(&self) -> Result<InstallPlan> {
        let plan = InstallPlan::detect(&self.repo_path, self.root_install_command.as_deref());
        match plan.command(&self.repo_path) {
            Some(spec) => {
                self.runner.run_checked(&spec)?;
            }
            None => log::info!(
                "No package manifest found in {}, skipping root install",
                self.repo_path.display()
            ),
        }
        Ok(plan)
    }
}

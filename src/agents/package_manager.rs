use crate::agents::command_runner::{CommandRunner, CommandSpec};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Cleans and relinks the monorepo packages after a manifest change.
pub struct PackageManagerAgent<'a> {
    runner: &'a dyn CommandRunner,
    repo_path: PathBuf,
    bootstrap_command: Option<String>,
}

impl<'a> PackageManagerAgent<'a> {
    pub fn new<P: AsRef<Path>>(
        runner: &'a dyn CommandRunner,
        repo_path: P,
        bootstrap_command: Option<String>,
    ) -> Self {
        Self {
            runner,
            repo_path: repo_path.as_ref().to_path_buf(),
            bootstrap_command,
        }
    }

    /// Reinstall, optionally cleaning old artifacts first.
    ///
    /// A failing clean is only logged; a failing reinstall aborts the run.
    pub fn bootstrap(&self, clean_first: bool) -> Result<()> {
        if clean_first {
            self.clean();
        }

        let spec = match &self.bootstrap_command {
            Some(command) => CommandSpec::shell(&self.repo_path, command),
            None => CommandSpec::program(&self.repo_path, "lerna", &["bootstrap", "--concurrency", "1"]),
        };
        self.runner.run_checked(&spec)?;
        Ok(())
    }

    fn clean(&self) {
        let spec = CommandSpec::program(&self.repo_path, "lerna", &["clean", "--yes"]);
        if let Err(e) = self.runner.run_checked(&spec) {
            log::warn!("Unable to run `lerna clean`, check output. ({})", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command_runner::testing::RecordingRunner;
    use crate::error::DepbumpError;

    #[test]
    fn bootstrap_cleans_then_reinstalls() {
        let runner = RecordingRunner::new();
        PackageManagerAgent::new(&runner, "/repo", None)
            .bootstrap(true)
            .unwrap();

        assert_eq!(
            runner.rendered(),
            vec!["lerna clean --yes", "lerna bootstrap --concurrency 1"]
        );
    }

    #[test]
    fn clean_failure_is_swallowed() {
        let runner = RecordingRunner::new().failing_on("lerna clean");
        PackageManagerAgent::new(&runner, "/repo", None)
            .bootstrap(true)
            .unwrap();
        assert_eq!(runner.count_starting_with("lerna bootstrap"), 1);
    }

    #[test]
    fn missing_lerna_for_clean_is_swallowed() {
        let runner = RecordingRunner::new().unspawnable("lerna clean");
        PackageManagerAgent::new(&runner, "/repo", Some("yarn bootstrap".into()))
            .bootstrap(true)
            .unwrap();
        assert_eq!(runner.rendered(), vec!["lerna clean --yes", "yarn bootstrap"]);
    }

    #[test]
    fn reinstall_failure_is_fatal() {
        let runner = RecordingRunner::new().failing_on("yarn bootstrap");
        let err = PackageManagerAgent::new(&runner, "/repo", Some("yarn bootstrap".into()))
            .bootstrap(false)
            .unwrap_err();

        assert!(matches!(err, DepbumpError::CommandFailed { .. }));
        assert_eq!(runner.rendered(), vec!["yarn bootstrap"]);
    }
}

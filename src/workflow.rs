use crate::agents::version_control::{batch_branch_name, branch_name, commit_message};
use crate::agents::{
    CommandRunner, EnvironmentBootstrapper, ManifestEditor, PackageManagerAgent, PullRequestAgent,
    VersionControlAgent,
};
use crate::config::Settings;
use crate::error::{DepbumpError, Result};
use crate::schema::{Dependency, DependencySchema, schema_output_line};
use crate::utils::path_validator::PathValidator;
use colored::Colorize;
use std::io::Write;
use std::path::Path;

/// A pull request handed to the pull request tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    pub branch: String,
    pub schema_json: String,
}

/// What a run did, in the order it happened.
#[derive(Debug, Clone, Default)]
pub struct UpdateSummary {
    pub branches: Vec<String>,
    pub commits: Vec<String>,
    pub pull_requests: Vec<OpenedPullRequest>,
}

/// Runs the whole update: environment preparation, then either one branch
/// per dependency or a single batched branch.
///
/// Every step is fail-fast. Commits already made stay in place when a
/// later step errors.
pub struct UpdateWorkflow<'a, W: Write> {
    settings: &'a Settings,
    runner: &'a dyn CommandRunner,
    out: W,
    summary: UpdateSummary,
}

impl<'a, W: Write> UpdateWorkflow<'a, W> {
    pub fn new(settings: &'a Settings, runner: &'a dyn CommandRunner, out: W) -> Self {
        Self {
            settings,
            runner,
            out,
            summary: UpdateSummary::default(),
        }
    }

    pub fn execute(mut self) -> Result<UpdateSummary> {
        let dependency_count = self.settings.schema.dependencies.len();
        println!("{}", "Starting dependency update process...".cyan().bold());

        println!("\n{}", "1. Preparing environment...".yellow());
        let repo_path = PathValidator::validate_repo_path(&self.settings.repo_path)?;
        let plan = EnvironmentBootstrapper::new(self.settings, self.runner).prepare()?;
        log::debug!("Root install plan: {:?}", plan);
        println!("{}", "✓ Environment is ready".green());

        let mode = if self.settings.batch_mode {
            "batch"
        } else {
            "per-dependency"
        };
        println!(
            "\n{}",
            format!("2. Updating {} dependencies ({} mode)...", dependency_count, mode).yellow()
        );

        if self.settings.batch_mode {
            self.run_batch(&repo_path)?;
        } else {
            self.run_per_dependency(&repo_path)?;
        }

        for pull_request in &self.summary.pull_requests {
            log::debug!(
                "Pull request for {}: {}",
                pull_request.branch,
                pull_request.schema_json
            );
        }

        println!(
            "\n{}",
            format!(
                "✨ {} commits on {} branches, {} pull requests opened",
                self.summary.commits.len(),
                self.summary.branches.len(),
                self.summary.pull_requests.len()
            )
            .green()
            .bold()
        );
        Ok(self.summary)
    }

    fn run_per_dependency(&mut self, repo_path: &Path) -> Result<()> {
        let settings = self.settings;
        let base = settings.git_sha.as_deref().ok_or_else(|| {
            DepbumpError::Config("GIT_SHA is required when not running in batch mode".into())
        })?;
        if settings.batch_bootstrap {
            log::warn!("SETTING_BATCH_BOOTSTRAP is set, skipping clean and reinstall for every update");
        }

        let git = VersionControlAgent::new(self.runner, repo_path);
        let packages = self.package_manager(repo_path);

        for dependency in &settings.schema.dependencies {
            announce(dependency);

            let branch = branch_name(dependency, &settings.actor_id);
            git.checkout(base)?;
            git.create_branch(&branch)?;
            self.summary.branches.push(branch.clone());

            self.patch_manifest(repo_path, dependency)?;
            if !settings.batch_bootstrap {
                packages.bootstrap(true)?;
            }
            self.commit(&git, dependency)?;

            let schema = DependencySchema::new(vec![dependency.clone()]);
            self.publish(&git, repo_path, &branch, &schema)?;
        }

        Ok(())
    }

    fn run_batch(&mut self, repo_path: &Path) -> Result<()> {
        let settings = self.settings;
        let git = VersionControlAgent::new(self.runner, repo_path);
        let packages = self.package_manager(repo_path);

        let branch = batch_branch_name(&settings.actor_id);
        git.create_branch(&branch)?;
        self.summary.branches.push(branch.clone());

        for dependency in &settings.schema.dependencies {
            announce(dependency);
            self.patch_manifest(repo_path, dependency)?;
            if !settings.batch_bootstrap {
                packages.bootstrap(false)?;
            }
            self.commit(&git, dependency)?;
        }

        if settings.batch_bootstrap {
            println!("\n{}", "Bootstrapping packages once for the batch...".yellow());
            packages.bootstrap(false)?;
        }

        self.publish(&git, repo_path, &branch, &settings.schema)
    }

    fn package_manager(&self, repo_path: &Path) -> PackageManagerAgent<'a> {
        PackageManagerAgent::new(
            self.runner,
            repo_path,
            self.settings.bootstrap_command.clone(),
        )
    }

    fn patch_manifest(&self, repo_path: &Path, dependency: &Dependency) -> Result<()> {
        let editor = ManifestEditor::for_dependency(repo_path, dependency)?;
        editor.update_dependency(&dependency.name, &dependency.target_version)?;
        Ok(())
    }

    fn commit(&mut self, git: &VersionControlAgent<'_>, dependency: &Dependency) -> Result<()> {
        println!("This is the git status after performing the update:");
        git.status()?;

        let message = commit_message(dependency);
        git.stage_all()?;
        git.commit(&message)?;
        println!("{}", format!("✓ {}", message).green());
        self.summary.commits.push(message);
        Ok(())
    }

    /// Push (production only), open the pull request and report the schema
    /// back to the host.
    fn publish(
        &mut self,
        git: &VersionControlAgent<'_>,
        repo_path: &Path,
        branch: &str,
        schema: &DependencySchema,
    ) -> Result<()> {
        if self.settings.mode.pushes() {
            git.push(branch)?;
        } else {
            log::info!("Test mode, not pushing {}", branch);
        }

        let schema_json = schema.to_json()?;
        PullRequestAgent::new(self.runner, repo_path).open(branch, &schema_json)?;
        writeln!(self.out, "{}", schema_output_line(&schema_json))?;
        self.out.flush()?;

        self.summary.pull_requests.push(OpenedPullRequest {
            branch: branch.to_string(),
            schema_json,
        });
        Ok(())
    }
}

fn announce(dependency: &Dependency) {
    println!(
        "\n{} {} {} {} ({})",
        "•".bright_cyan(),
        dependency.name.bold(),
        dependency.installed_version.dimmed(),
        format!("→ {}", dependency.target_version).green(),
        dependency.path
    );
    log::debug!("{:?}", dependency);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::command_runner::testing::RecordingRunner;
    use crate::config::RunMode;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    const DEPENDENCIES: &str = r#"{"dependencies":[
        {"name":"lodash","path":"/","installed":{"version":"4.17.0"},"available":[{"version":"4.17.21"}]},
        {"name":"react","path":"/packages/web","installed":{"version":"16.0.0"},"available":[{"version":"16.8.0"},{"version":"16.7.0"}]}
    ]}"#;

    fn repo() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            "{\n  \"name\": \"root\",\n  \"devDependencies\": {\n    \"lodash\": \"^4.17.0\"\n  }\n}\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("packages/web")).unwrap();
        fs::write(
            dir.path().join("packages/web/package.json"),
            "{\n    \"name\": \"web\",\n    \"dependencies\": {\n        \"react\": \"~16.0.0\"\n    },\n    \"peerDependencies\": {\n        \"react\": \"16.0.0\"\n    }\n}\n",
        )
        .unwrap();
        dir
    }

    fn settings(repo: &Path, batch_mode: bool, mode: RunMode) -> Settings {
        Settings {
            repo_path: repo.to_path_buf(),
            mode,
            actor_id: "99".into(),
            git_sha: Some("abc123".into()),
            npmrc: None,
            npmrc_path: repo.join(".npmrc"),
            batch_mode,
            batch_bootstrap: false,
            root_install_command: None,
            bootstrap_command: None,
            schema: DependencySchema::from_json(DEPENDENCIES).unwrap(),
        }
    }

    fn output_lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn entries(schema_json: &str) -> usize {
        DependencySchema::from_json(schema_json)
            .unwrap()
            .dependencies
            .len()
    }

    #[test]
    fn per_dependency_mode_opens_one_branch_and_pr_per_dependency() {
        let dir = repo();
        let settings = settings(dir.path(), false, RunMode::Production);
        let runner = RecordingRunner::new();
        let mut out = Vec::new();

        let summary = UpdateWorkflow::new(&settings, &runner, &mut out)
            .execute()
            .unwrap();

        assert_eq!(
            summary.branches,
            vec!["lodash-4.17.21-99", "react-16.8.0-99---packages/web"]
        );
        assert_eq!(summary.commits.len(), 2);
        assert_eq!(summary.pull_requests.len(), 2);
        assert!(summary.pull_requests.iter().all(|pr| entries(&pr.schema_json) == 1));

        assert_eq!(runner.count_starting_with("git checkout abc123"), 2);
        assert_eq!(runner.count_starting_with("git checkout -b"), 2);
        assert_eq!(runner.count_starting_with("git commit"), 2);
        assert_eq!(runner.count_starting_with("git push"), 2);
        assert_eq!(runner.count_starting_with("pullrequest"), 2);
        assert_eq!(runner.count_starting_with("lerna clean --yes"), 2);
        assert_eq!(runner.count_starting_with("lerna bootstrap"), 2);

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("BEGIN_DEPENDENCIES_SCHEMA_OUTPUT>"));
        assert!(lines[0].contains("\"lodash\""));
        assert!(lines[1].contains("\"react\""));
    }

    #[test]
    fn per_dependency_mode_runs_steps_in_order() {
        let dir = repo();
        let mut settings = settings(dir.path(), false, RunMode::Production);
        settings.schema.dependencies.truncate(1);
        let runner = RecordingRunner::new();

        UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap();

        let rendered = runner.rendered();
        assert_eq!(rendered.len(), 10);
        assert_eq!(rendered[0], "npm install --ignore-scripts --quiet --no-package-lock");
        assert_eq!(rendered[1], "git checkout abc123");
        assert_eq!(rendered[2], "git checkout -b lodash-4.17.21-99");
        assert_eq!(rendered[3], "lerna clean --yes");
        assert_eq!(rendered[4], "lerna bootstrap --concurrency 1");
        assert_eq!(rendered[5], "git status");
        assert_eq!(rendered[6], "git add .");
        assert_eq!(
            rendered[7],
            "git commit -m Update lodash from 4.17.0 to 4.17.21 in /"
        );
        assert_eq!(rendered[8], "git push --set-upstream origin lodash-4.17.21-99");
        assert!(rendered[9].starts_with("pullrequest --branch lodash-4.17.21-99"));
    }

    #[test]
    fn batch_mode_opens_single_branch_and_pr() {
        let dir = repo();
        let settings = settings(dir.path(), true, RunMode::Production);
        let runner = RecordingRunner::new();
        let mut out = Vec::new();

        let summary = UpdateWorkflow::new(&settings, &runner, &mut out)
            .execute()
            .unwrap();

        assert_eq!(summary.branches, vec!["dependencies.io-update-build-99"]);
        assert_eq!(summary.commits.len(), 2);
        assert_eq!(summary.pull_requests.len(), 1);
        assert_eq!(entries(&summary.pull_requests[0].schema_json), 2);

        assert_eq!(runner.count_starting_with("git checkout abc123"), 0);
        assert_eq!(runner.count_starting_with("git checkout -b"), 1);
        assert_eq!(runner.count_starting_with("git commit"), 2);
        assert_eq!(runner.count_starting_with("pullrequest"), 1);
        assert_eq!(runner.count_starting_with("lerna clean"), 0);
        assert_eq!(runner.count_starting_with("lerna bootstrap"), 2);

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            schema_output_line(&settings.schema.to_json().unwrap())
        );
    }

    #[test]
    fn batch_bootstrap_defers_reinstall_until_after_all_commits() {
        let dir = repo();
        let mut settings = settings(dir.path(), true, RunMode::Test);
        settings.batch_bootstrap = true;
        let runner = RecordingRunner::new();

        UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap();

        let rendered = runner.rendered();
        let bootstraps: Vec<usize> = rendered
            .iter()
            .enumerate()
            .filter(|(_, line)| line.starts_with("lerna bootstrap"))
            .map(|(index, _)| index)
            .collect();
        let last_commit = rendered
            .iter()
            .rposition(|line| line.starts_with("git commit"))
            .unwrap();

        assert_eq!(bootstraps.len(), 1);
        assert!(bootstraps[0] > last_commit);
    }

    #[test]
    fn batch_bootstrap_skips_reinstall_in_per_dependency_mode() {
        let dir = repo();
        let mut settings = settings(dir.path(), false, RunMode::Test);
        settings.batch_bootstrap = true;
        let runner = RecordingRunner::new();

        let summary = UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap();

        assert_eq!(runner.count_starting_with("lerna"), 0);
        assert_eq!(summary.commits.len(), 2);
        assert_eq!(summary.pull_requests.len(), 2);
    }

    #[test]
    fn test_mode_skips_push_but_still_commits_and_patches() {
        let dir = repo();
        let settings = settings(dir.path(), false, RunMode::Test);
        let runner = RecordingRunner::new();

        let summary = UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap();

        assert_eq!(runner.count_starting_with("git push"), 0);
        assert_eq!(runner.count_starting_with("git commit"), 2);
        assert_eq!(summary.pull_requests.len(), 2);

        let root = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(root.contains("\"lodash\": \"^4.17.21\""));
        let web = fs::read_to_string(dir.path().join("packages/web/package.json")).unwrap();
        assert_eq!(
            web,
            "{\n    \"name\": \"web\",\n    \"dependencies\": {\n        \"react\": \"~16.8.0\"\n    },\n    \"peerDependencies\": {\n        \"react\": \"16.8.0\"\n    }\n}\n"
        );
    }

    #[test]
    fn custom_commands_override_defaults() {
        let dir = repo();
        let mut settings = settings(dir.path(), true, RunMode::Test);
        settings.root_install_command = Some("yarn --frozen-lockfile".into());
        settings.bootstrap_command = Some("yarn lerna bootstrap".into());
        let runner = RecordingRunner::new();

        UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap();

        let rendered = runner.rendered();
        assert_eq!(rendered[0], "yarn --frozen-lockfile");
        assert_eq!(runner.count_starting_with("yarn lerna bootstrap"), 2);
        assert_eq!(runner.count_starting_with("lerna bootstrap --concurrency"), 0);
    }

    #[test]
    fn failing_commit_aborts_before_pull_request() {
        let dir = repo();
        let settings = settings(dir.path(), false, RunMode::Production);
        let runner = RecordingRunner::new().failing_on("git commit");
        let mut out = Vec::new();

        let err = UpdateWorkflow::new(&settings, &runner, &mut out)
            .execute()
            .unwrap_err();

        assert!(matches!(err, DepbumpError::GitOperation(_)));
        assert_eq!(runner.count_starting_with("git commit"), 1);
        assert_eq!(runner.count_starting_with("pullrequest"), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn failing_install_aborts_before_any_git_step() {
        let dir = repo();
        let settings = settings(dir.path(), true, RunMode::Production);
        let runner = RecordingRunner::new().failing_on("npm install");

        let err = UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap_err();

        assert!(matches!(err, DepbumpError::CommandFailed { .. }));
        assert_eq!(runner.rendered().len(), 1);
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let dir = repo();
        fs::remove_file(dir.path().join("packages/web/package.json")).unwrap();
        let settings = settings(dir.path(), true, RunMode::Test);
        let runner = RecordingRunner::new();

        let err = UpdateWorkflow::new(&settings, &runner, Vec::new())
            .execute()
            .unwrap_err();

        assert!(matches!(err, DepbumpError::ManifestParsing(_)));
        assert_eq!(runner.count_starting_with("git commit"), 1);
        assert_eq!(runner.count_starting_with("pullrequest"), 0);
    }
}

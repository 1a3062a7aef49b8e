pub mod command_runner;
pub mod environment;
pub mod manifest_editor;
pub mod package_manager;
pub mod pull_request;
pub mod version_control;

pub use command_runner::{CommandRunner, SystemCommandRunner};
pub use environment::EnvironmentBootstrapper;
pub use manifest_editor::ManifestEditor;
pub use package_manager::PackageManagerAgent;
pub use pull_request::PullRequestAgent;
pub use version_control::VersionControlAgent;

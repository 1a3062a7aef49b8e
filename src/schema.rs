use crate::error::{DepbumpError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const SCHEMA_OUTPUT_BEGIN: &str = "BEGIN_DEPENDENCIES_SCHEMA_OUTPUT>";
pub const SCHEMA_OUTPUT_END: &str = "<END_DEPENDENCIES_SCHEMA_OUTPUT";

const MANIFEST_FILE: &str = "package.json";

/// A single outdated dependency as handed over by the automation host.
///
/// The raw object is kept alongside the extracted fields so the payload
/// written back to the host carries every key it sent, in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Dependency {
    pub name: String,
    pub path: String,
    pub installed_version: String,
    pub target_version: String,
    raw: Map<String, Value>,
}

impl Dependency {
    /// True when the manifest lives at the repository root.
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Location of the `package.json` this dependency is declared in.
    pub fn manifest_path(&self, repo_path: &Path) -> PathBuf {
        let relative = self.path.trim_start_matches('/');
        if relative.is_empty() {
            repo_path.join(MANIFEST_FILE)
        } else {
            repo_path.join(relative).join(MANIFEST_FILE)
        }
    }
}

impl TryFrom<Map<String, Value>> for Dependency {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "dependency is missing a string 'name'".to_string())?
            .to_string();

        let path = raw
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("dependency '{name}' is missing a string 'path'"))?
            .to_string();

        let installed_version = raw
            .get("installed")
            .and_then(|installed| installed.get("version"))
            .and_then(Value::as_str)
            .ok_or_else(|| format!("dependency '{name}' is missing 'installed.version'"))?
            .to_string();

        let target_version = raw
            .get("available")
            .and_then(Value::as_array)
            .and_then(|available| available.first())
            .and_then(|first| first.get("version"))
            .and_then(Value::as_str)
            .ok_or_else(|| format!("dependency '{name}' has no available versions"))?
            .to_string();

        Ok(Self {
            name,
            path,
            installed_version,
            target_version,
            raw,
        })
    }
}

impl From<Dependency> for Map<String, Value> {
    fn from(dependency: Dependency) -> Self {
        dependency.raw
    }
}

/// The `{"dependencies": [...]}` document exchanged with the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencySchema {
    pub dependencies: Vec<Dependency>,
}

impl DependencySchema {
    pub fn new(dependencies: Vec<Dependency>) -> Self {
        Self { dependencies }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| DepbumpError::Config(format!("Invalid dependencies JSON: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Wraps a schema payload in the markers the host scans stdout for.
pub fn schema_output_line(schema_json: &str) -> String {
    format!("{SCHEMA_OUTPUT_BEGIN}{schema_json}{SCHEMA_OUTPUT_END}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"dependencies":[{"name":"lodash","source":"npm","path":"/packages/app","installed":{"version":"4.17.0"},"available":[{"version":"4.17.21"},{"version":"4.17.20"}]}]}"#;

    #[test]
    fn parses_dependency_fields() {
        let schema = DependencySchema::from_json(SAMPLE).unwrap();
        let dependency = &schema.dependencies[0];
        assert_eq!(dependency.name, "lodash");
        assert_eq!(dependency.path, "/packages/app");
        assert_eq!(dependency.installed_version, "4.17.0");
        assert_eq!(dependency.target_version, "4.17.21");
        assert!(!dependency.is_root());
    }

    #[test]
    fn serializes_back_with_original_keys_and_order() {
        let schema = DependencySchema::from_json(SAMPLE).unwrap();
        assert_eq!(schema.to_json().unwrap(), SAMPLE);
    }

    #[test]
    fn rejects_dependency_without_available_versions() {
        let json = r#"{"dependencies":[{"name":"a","path":"/","installed":{"version":"1.0.0"},"available":[]}]}"#;
        let err = DependencySchema::from_json(json).unwrap_err();
        assert!(matches!(err, DepbumpError::Config(_)));
        assert!(err.to_string().contains("no available versions"));
    }

    #[test]
    fn manifest_path_joins_relative_to_repo() {
        let json = r#"{"dependencies":[
            {"name":"a","path":"/","installed":{"version":"1"},"available":[{"version":"2"}]},
            {"name":"b","path":"/packages/b","installed":{"version":"1"},"available":[{"version":"2"}]}
        ]}"#;
        let schema = DependencySchema::from_json(json).unwrap();
        let repo = Path::new("/repo");
        assert_eq!(
            schema.dependencies[0].manifest_path(repo),
            PathBuf::from("/repo/package.json")
        );
        assert_eq!(
            schema.dependencies[1].manifest_path(repo),
            PathBuf::from("/repo/packages/b/package.json")
        );
    }

    #[test]
    fn output_line_is_wrapped_in_markers() {
        let line = schema_output_line(r#"{"dependencies":[]}"#);
        assert_eq!(
            line,
            r#"BEGIN_DEPENDENCIES_SCHEMA_OUTPUT>{"dependencies":[]}<END_DEPENDENCIES_SCHEMA_OUTPUT"#
        );
    }
}

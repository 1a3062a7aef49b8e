use crate::error::{DepbumpError, Result};
use crate::schema::Dependency;
use crate::utils::path_validator::PathValidator;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Sections of a `package.json` that map dependency names to ranges.
pub const DEPENDENCY_SECTIONS: [&str; 5] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
    "bundledDependencies",
];

const DEFAULT_INDENT: &str = "  ";

static LEADING_INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:( +)|(\t+))").expect("indent pattern is valid"));

/// One rewritten range inside a manifest section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionUpdate {
    pub section: String,
    pub old_range: String,
    pub new_range: String,
}

/// Edits a single `package.json` in place.
pub struct ManifestEditor {
    manifest_path: PathBuf,
}

impl ManifestEditor {
    pub fn new<P: AsRef<Path>>(manifest_path: P) -> Self {
        Self {
            manifest_path: manifest_path.as_ref().to_path_buf(),
        }
    }

    /// Editor for the manifest a dependency is declared in, refusing paths
    /// that resolve outside the repository.
    pub fn for_dependency(repo_path: &Path, dependency: &Dependency) -> Result<Self> {
        let manifest_path =
            PathValidator::validate_file_path(dependency.manifest_path(repo_path), repo_path)?;
        Ok(Self::new(manifest_path))
    }

    /// Point every declaration of `name` at `version`, keeping the range
    /// operator each section already used, and write the file back.
    pub fn update_dependency(&self, name: &str, version: &str) -> Result<Vec<SectionUpdate>> {
        let content = fs::read_to_string(&self.manifest_path).map_err(|e| {
            DepbumpError::ManifestParsing(format!(
                "Failed to read {}: {e}",
                self.manifest_path.display()
            ))
        })?;

        let indent = detect_indent(&content).unwrap_or_else(|| DEFAULT_INDENT.to_string());

        let mut manifest: Value = serde_json::from_str(&content).map_err(|e| {
            DepbumpError::ManifestParsing(format!(
                "Failed to parse {}: {e}",
                self.manifest_path.display()
            ))
        })?;

        let updates = rewrite_dependency(&mut manifest, name, version);
        for update in &updates {
            log::debug!("{} was {} in {}", name, update.old_range, update.section);
            println!(
                "Updating {} to {} in {} of {}",
                name,
                update.new_range,
                update.section,
                self.manifest_path.display()
            );
        }
        if updates.is_empty() {
            log::warn!(
                "{} is not declared in any dependency section of {}",
                name,
                self.manifest_path.display()
            );
        }

        fs::write(&self.manifest_path, render_manifest(&manifest, &indent)?)?;
        Ok(updates)
    }
}

/// Rewrites `name` in every dependency section of `manifest`.
pub fn rewrite_dependency(manifest: &mut Value, name: &str, version: &str) -> Vec<SectionUpdate> {
    let mut updates = Vec::new();

    for section in DEPENDENCY_SECTIONS {
        let Some(entry) = manifest
            .get_mut(section)
            .and_then(Value::as_object_mut)
            .and_then(|deps| deps.get_mut(name))
        else {
            continue;
        };

        let Some(current) = entry.as_str() else {
            log::warn!("Skipping non-string range for {} in {}", name, section);
            continue;
        };

        let new_range = format!("{}{}", range_prefix(current), version);
        updates.push(SectionUpdate {
            section: section.to_string(),
            old_range: current.to_string(),
            new_range: new_range.clone(),
        });
        *entry = Value::String(new_range);
    }

    updates
}

/// The range operator a constraint starts with, if it is one we carry over.
pub fn range_prefix(range: &str) -> &'static str {
    if range.starts_with('^') {
        "^"
    } else if range.starts_with('~') {
        "~"
    } else {
        ""
    }
}

/// Serialises `manifest` with the given indent unit and a trailing newline.
pub fn render_manifest(manifest: &Value, indent: &str) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    manifest.serialize(&mut serializer)?;
    buffer.push(b'\n');

    String::from_utf8(buffer)
        .map_err(|e| DepbumpError::ManifestParsing(format!("Rendered manifest is not UTF-8: {e}")))
}

/// Guesses the indent unit of a text document.
///
/// Counts the positive indentation steps between consecutive indented
/// lines and returns the most frequent one. Ties go to the unit seen
/// first. `None` when nothing in the document is indented.
pub fn detect_indent(text: &str) -> Option<String> {
    // (unit character, width, occurrences) in first-seen order
    let mut tally: Vec<(char, usize, usize)> = Vec::new();
    let mut previous: Option<(char, usize)> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let current = LEADING_INDENT.captures(line).and_then(|caps| {
            caps.get(1)
                .map(|spaces| (' ', spaces.as_str().len()))
                .or_else(|| caps.get(2).map(|tabs| ('\t', tabs.as_str().len())))
        });

        let Some((unit, width)) = current else {
            previous = None;
            continue;
        };

        let base = match previous {
            Some((prev_unit, prev_width)) if prev_unit == unit => prev_width,
            _ => 0,
        };

        if width > base {
            let step = width - base;
            match tally.iter_mut().find(|(u, w, _)| *u == unit && *w == step) {
                Some(entry) => entry.2 += 1,
                None => tally.push((unit, step, 1)),
            }
        }

        previous = Some((unit, width));
    }

    let mut best: Option<&(char, usize, usize)> = None;
    for entry in &tally {
        if best.is_none_or(|current| entry.2 > current.2) {
            best = Some(entry);
        }
    }

    best.map(|(unit, width, _)| unit.to_string().repeat(*width))
}

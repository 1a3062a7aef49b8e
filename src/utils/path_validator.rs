use crate::error::{DepbumpError, Result};
use std::path::{Component, Path, PathBuf};

/// Path checks keeping manifest edits inside the checked-out repository.
pub struct PathValidator;

impl PathValidator {
    /// Validates and canonicalises the repository root.
    pub fn validate_repo_path(path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();

        let canonical = path.canonicalize().map_err(|e| {
            DepbumpError::ProjectValidation(format!("Invalid repository path '{}': {e}", path.display()))
        })?;

        if !canonical.is_dir() {
            return Err(DepbumpError::ProjectValidation(format!(
                "Repository path '{}' is not a directory",
                canonical.display()
            )));
        }

        Ok(canonical)
    }

    /// Ensures the file path stays inside the base directory.
    ///
    /// The check is lexical: `..` may not climb above `base_dir`, but
    /// symlinks inside the repository are followed wherever they point,
    /// so workspace packages linked in from elsewhere remain editable.
    pub fn validate_file_path(
        file_path: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let file_path = file_path.as_ref();
        let base_dir = base_dir.as_ref();

        let outside = || {
            DepbumpError::ProjectValidation(format!(
                "Manifest '{}' is outside the repository",
                file_path.display()
            ))
        };

        let relative = file_path.strip_prefix(base_dir).map_err(|_| outside())?;

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(outside());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }

        Ok(base_dir.join(normalized))
    }
}

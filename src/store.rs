//! Location of the tool's persistent state, which is where the error log lives.

use crate::error::StoreError;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const README: &str = "This directory is maintained by the {tool} project.\n\
Learn more: run `{tool} --help`.\n\
{tool}.log holds the full report of every failure {tool} could not recover from.\n";

/// Supplies a writable directory, creating it if needed.
pub trait StorageDirectory {
    fn directory(&self) -> Result<PathBuf, StoreError>;
}

impl<S: StorageDirectory + ?Sized> StorageDirectory for &S {
    fn directory(&self) -> Result<PathBuf, StoreError> {
        (**self).directory()
    }
}

/// The tool's cache directory.
#[derive(Debug, Clone)]
pub struct Store {
    tool: String,
    root: Option<PathBuf>,
}

impl Store {
    /// Resolves the directory for `tool`.
    ///
    /// Order: `override_dir`, `<TOOL>_HOME`, `$XDG_CACHE_HOME/<tool>`, the
    /// platform cache directory, `~/.cache/<tool>`.
    pub fn for_tool(tool: &str, override_dir: Option<PathBuf>) -> Self {
        let root = override_dir
            .or_else(|| non_empty_var(&home_var(tool)).map(PathBuf::from))
            .or_else(|| non_empty_var("XDG_CACHE_HOME").map(|dir| Path::new(&dir).join(tool)))
            .or_else(|| dirs::cache_dir().map(|dir| dir.join(tool)))
            .or_else(|| dirs::home_dir().map(|dir| dir.join(".cache").join(tool)));

        Self {
            tool: tool.to_string(),
            root,
        }
    }

    /// A store rooted at a fixed directory.
    pub fn at(tool: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.to_string(),
            root: Some(root.into()),
        }
    }

    /// The directory the log will be written to, without creating it. `None`
    /// when no candidate location exists; writing a report then fails with
    /// [`StoreError::NoDirectory`].
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn create(&self, root: &Path) -> Result<(), StoreError> {
        fs::create_dir_all(root).map_err(|source| StoreError::Create {
            path: root.to_path_buf(),
            source,
        })?;

        let readme = root.join("README");
        if !readme.exists() {
            match fs::write(&readme, README.replace("{tool}", &self.tool)) {
                Ok(()) => tracing::debug!(path = %root.display(), "created store"),
                Err(err) => tracing::warn!(path = %readme.display(), error = %err, "could not write store README"),
            }
        }
        Ok(())
    }
}

impl StorageDirectory for Store {
    fn directory(&self) -> Result<PathBuf, StoreError> {
        let root = self.root.clone().ok_or_else(|| StoreError::NoDirectory {
            env_var: home_var(&self.tool),
        })?;
        self.create(&root)?;
        Ok(root)
    }
}

/// `pre-commit` becomes `PRE_COMMIT_HOME`.
fn home_var(tool: &str) -> String {
    let stem: String = tool
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{stem}_HOME")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

//! Ordered, prefix-aware collections of file paths.
//!
//! A [`FileSet`] keeps paths in insertion order (duplicates included) and
//! applies an optional shared prefix only when the set is read back with
//! [`FileSet::resolve`].
//!
//! ```rust
//! use kiln::fileset::FileSet;
//!
//! let files = FileSet::new()
//!     .with_prefix("src/")
//!     .append("main.cpp")
//!     .append("src/util.cpp");
//! assert_eq!(files.resolve(), vec!["src/main.cpp", "src/util.cpp"]);
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Source extensions picked up by [`FileSet::from_dir`].
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<String>,
    prefix: String,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path` to the end of the set. Nothing is validated.
    pub fn append(mut self, path: impl Into<String>) -> Self {
        self.push(path);
        self
    }

    pub fn push(&mut self, path: impl Into<String>) {
        self.files.push(path.into());
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.set_prefix(prefix);
        self
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the stored paths with the prefix applied.
    ///
    /// Each entry is normalized to the host separator, stripped of the prefix
    /// if it already starts with it, and then every entry gets the prefix
    /// prepended. An entry therefore carries the prefix exactly once, even if
    /// it was stored without it.
    pub fn resolve(&self) -> Vec<String> {
        let stripped = self.files.iter().map(|file| {
            let file = to_host_separators(file);
            if !self.prefix.is_empty() && file.starts_with(&self.prefix) {
                file[self.prefix.len()..].to_string()
            } else {
                file
            }
        });

        if self.prefix.is_empty() {
            stripped.collect()
        } else {
            stripped.map(|file| format!("{}{}", self.prefix, file)).collect()
        }
    }

    /// Collects every C/C++ source under `dir`, sorted for a stable order.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(anyhow::anyhow!(
                "source directory '{}' does not exist",
                dir.display()
            ));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry =
                entry.with_context(|| format!("Failed to scan '{}'", dir.display()))?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(ext) = path.extension() {
                let ext = ext.to_string_lossy();
                if SOURCE_EXTENSIONS.contains(&ext.as_ref()) {
                    found.push(path.to_string_lossy().to_string());
                }
            }
        }
        found.sort();

        Ok(Self {
            files: found,
            prefix: String::new(),
        })
    }
}

impl Extend<String> for FileSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.files.extend(iter);
    }
}

impl<S: Into<String>> FromIterator<S> for FileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(Into::into).collect(),
            prefix: String::new(),
        }
    }
}

/// Rewrites `/` to the host separator. A no-op outside Windows.
pub fn to_host_separators(path: &str) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.to_string()
    }
}

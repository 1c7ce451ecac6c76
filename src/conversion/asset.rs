use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Characters that are replaced when a name becomes a file name.
const RESERVED_CHARACTERS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

/// The contents of a file along with its path.
pub struct Asset {
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Asset {
    pub fn new(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Self {
        Self {
            bytes,
            path: path.into(),
        }
    }

    /// Reads the asset file at the given path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read \"{}\"", path.display()))?;

        Ok(Self::new(bytes, path))
    }

    /// Get a reference to the asset's path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name of the asset, without the extension.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    /// Returns the extension of the asset, without the period.
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
    }

    /// Returns the directory that contains the asset.
    pub fn parent_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Writes the asset to its path, creating the parent directories.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(self.parent_dir()).with_context(|| {
            format!(
                "Failed to create the directory \"{}\"",
                self.parent_dir().display()
            )
        })?;
        fs::write(&self.path, &self.bytes)
            .with_context(|| format!("Failed to write \"{}\"", self.path.display()))
    }
}

/// Replaces the characters that are not allowed in file names with underscores.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if RESERVED_CHARACTERS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

//! Read-only sample files (fonts, images, documents, token sets)

use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone)]
pub struct Fixtures {
    root: PathBuf,
}

impl Fixtures {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.fixtures_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `name` under the fixtures dir.
    ///
    /// Absolute paths, `..` components and symlinks leading outside the
    /// fixtures dir are refused.
    pub fn path(&self, name: &str) -> E2eResult<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(E2eError::Fixture(format!(
                "fixture path must stay inside {}: {}",
                self.root.display(),
                name
            )));
        }

        let path = self.root.join(relative);
        if !path.is_file() {
            return Err(E2eError::Fixture(format!("missing fixture {}", path.display())));
        }
        let root = self.root.canonicalize()?;
        if !path.canonicalize()?.starts_with(&root) {
            return Err(E2eError::Fixture(format!(
                "fixture {} resolves outside {}",
                name,
                root.display()
            )));
        }
        Ok(path)
    }

    pub fn read(&self, name: &str) -> E2eResult<Vec<u8>> {
        Ok(std::fs::read(self.path(name)?)?)
    }

    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> E2eResult<T> {
        Ok(serde_json::from_slice(&self.read(name)?)?)
    }

    /// Files under `dir`, relative to the fixtures root and sorted
    pub fn list(&self, dir: &str) -> E2eResult<Vec<String>> {
        let base = self.root.join(dir);
        if !base.is_dir() {
            return Err(E2eError::Fixture(format!(
                "missing fixture directory {}",
                base.display()
            )));
        }
        let mut names: Vec<String> = WalkDir::new(&base)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

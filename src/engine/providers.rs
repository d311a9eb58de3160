//! Where imported compilation units come from.
//!
//! A `use PATH` statement asks the engine's instance providers first, then its source providers,
//! each in registration order. The first provider that answers wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::definition::RootAndDefinition;
use crate::errors::{AmongError, Result};
use crate::syntax::Source;

/// Supplies source text to be compiled for a path.
///
/// `Ok(None)` means the path is not this provider's; `Err` is reported and the search goes on.
pub trait SourceProvider: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Option<Source>>;
}

/// Supplies an already-built root and definition for a path, such as the default library.
pub trait InstanceProvider: Send + Sync {
    fn resolve(&self, path: &str) -> Result<Option<RootAndDefinition>>;
}

/// Resolves `PATH` to `<root>/PATH.among`.
#[derive(Debug, Clone)]
pub struct FileSourceProvider {
    root: PathBuf,
}

impl FileSourceProvider {
    pub const EXTENSION: &'static str = "among";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file_for(&self, path: &str) -> PathBuf {
        self.root.join(format!("{path}.{}", Self::EXTENSION))
    }
}

impl SourceProvider for FileSourceProvider {
    fn resolve(&self, path: &str) -> Result<Option<Source>> {
        let file = self.file_for(path);
        if !file.is_file() {
            return Ok(None);
        }
        trace!(file = %file.display(), "reading source");
        let text = fs::read_to_string(&file).map_err(|source| AmongError::Io {
            path: file.display().to_string(),
            source,
        })?;
        Ok(Some(Source::of(&text)))
    }
}

/// Sources kept in memory, keyed by path. Handy for hosts that embed scripts.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceProvider {
    sources: HashMap<String, String>,
}

impl MemorySourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.sources.insert(path.into(), text.into());
        self
    }

    pub fn with(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl SourceProvider for MemorySourceProvider {
    fn resolve(&self, path: &str) -> Result<Option<Source>> {
        Ok(self.sources.get(path).map(|text| Source::of(text)))
    }
}

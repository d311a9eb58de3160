//! Engine: configuration, providers and the compile entry points.
//!
//! ```rust
//! use among::engine::AmongEngine;
//! use among::syntax::Source;
//!
//! let engine = AmongEngine::new();
//! let result = engine.read(Source::of("use default_operators\n(1 + 2 * 3)"));
//! assert!(result.is_success());
//! assert_eq!(result.root().to_string(), "+(1,*(2,3))");
//! ```

mod config;
mod providers;
mod result;
mod session;

pub use config::{EngineConfig, InvalidUnicodeHandling};
pub use providers::{FileSourceProvider, InstanceProvider, MemorySourceProvider, SourceProvider};
pub use result::{CompileResult, ReadResult};
pub use session::ImportSession;

use crate::definition::AmongDefinition;
use crate::library::LibraryProvider;
use crate::syntax::Source;

/// Compiles sources and resolves their imports through registered providers.
///
/// The default library is always the first instance provider.
pub struct AmongEngine {
    config: EngineConfig,
    instance_providers: Vec<Box<dyn InstanceProvider>>,
    source_providers: Vec<Box<dyn SourceProvider>>,
}

impl Default for AmongEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AmongEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            instance_providers: vec![Box::new(LibraryProvider)],
            source_providers: Vec::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }

    pub fn add_source_provider(&mut self, provider: impl SourceProvider + 'static) -> &mut Self {
        self.source_providers.push(Box::new(provider));
        self
    }

    pub fn add_instance_provider(
        &mut self,
        provider: impl InstanceProvider + 'static,
    ) -> &mut Self {
        self.instance_providers.push(Box::new(provider));
        self
    }

    /// A fresh import cache. Reuse one session to share imports between compilations.
    pub fn session(&self) -> ImportSession<'_> {
        ImportSession::new(self)
    }

    /// Compiles `source` in a fresh session.
    pub fn read(&self, source: Source) -> CompileResult {
        self.session().read(source)
    }

    /// Compiles `source` in a fresh session with `import_definition` already in scope.
    pub fn read_with(&self, source: Source, import_definition: AmongDefinition) -> CompileResult {
        self.session().read_with(source, import_definition)
    }
}

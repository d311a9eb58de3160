//! Import resolution state for one batch of compilations.

use std::collections::HashMap;

use indexmap::IndexSet;
use tracing::{debug, error, info, warn};

use super::result::{CompileResult, ReadResult};
use super::AmongEngine;
use crate::definition::AmongDefinition;
use crate::diagnostics::{ReportHandler, ReportKind};
use crate::syntax::{ImportResolver, Parser, Source};

/// Caches resolved import paths and tracks the ones being resolved to detect cycles.
///
/// Every compilation started from a session resolves its `use` statements through the session,
/// so a path imported by many scripts is compiled once. Sessions borrow the engine immutably;
/// several can run side by side.
pub struct ImportSession<'e> {
    engine: &'e AmongEngine,
    cache: HashMap<String, ReadResult>,
    /// Paths currently being resolved, in the order resolution started.
    resolving: IndexSet<String>,
}

impl<'e> ImportSession<'e> {
    pub fn new(engine: &'e AmongEngine) -> Self {
        Self {
            engine,
            cache: HashMap::new(),
            resolving: IndexSet::new(),
        }
    }

    pub fn engine(&self) -> &'e AmongEngine {
        self.engine
    }

    /// Compiles `source` with an empty import definition.
    pub fn read(&mut self, source: Source) -> CompileResult {
        self.read_with(source, AmongDefinition::new())
    }

    /// Compiles `source` with `import_definition` visible from the first statement.
    pub fn read_with(
        &mut self,
        source: Source,
        import_definition: AmongDefinition,
    ) -> CompileResult {
        let engine = self.engine;
        let output = Parser::new(&source, &engine.config, import_definition, self).parse();
        CompileResult::new(source, output.root, output.definition, output.reports)
    }

    /// The cached result for `path`, resolving it first if needed.
    pub fn get_or_read_from(&mut self, path: &str, reports: &mut dyn ReportHandler) -> &ReadResult {
        if self.cache.contains_key(path) {
            debug!(path, "import served from cache");
        } else {
            let result = self.resolve(path, reports);
            self.cache.insert(path.to_string(), result);
        }
        &self.cache[path]
    }

    /// Resolves `path` again, replacing any cached result.
    pub fn read_from(&mut self, path: &str, reports: &mut dyn ReportHandler) -> &ReadResult {
        let result = self.resolve(path, reports);
        self.cache.insert(path.to_string(), result);
        &self.cache[path]
    }

    pub fn clear_instances(&mut self) {
        self.cache.clear();
    }

    fn resolve(&mut self, path: &str, reports: &mut dyn ReportHandler) -> ReadResult {
        if !self.resolving.insert(path.to_string()) {
            reports.error(&self.cycle_message(path));
            return ReadResult::Failure {
                path: path.to_string(),
            };
        }
        debug!(path, "resolving import");
        let result = self.resolve_uncached(path, reports);
        self.resolving.shift_remove(path);
        result
    }

    fn cycle_message(&self, path: &str) -> String {
        let prefix = format!("Cannot resolve definitions from path '{path}'");
        let trace: Vec<&String> = self
            .resolving
            .iter()
            .skip_while(|resolving| resolving.as_str() != path)
            .collect();
        match trace.as_slice() {
            [] | [_] => format!("{prefix}: Self-reference"),
            [.., last] => {
                let mut message = format!("{prefix}: Circular reference detected");
                for pair in trace.windows(2) {
                    message.push_str(&format!("\n  '{}' references '{}'", pair[0], pair[1]));
                }
                message.push_str(&format!("\n  and '{last}' references '{path}'"));
                message
            }
        }
    }

    fn resolve_uncached(&mut self, path: &str, reports: &mut dyn ReportHandler) -> ReadResult {
        let engine = self.engine;
        let mut failed = false;
        for provider in &engine.instance_providers {
            match provider.resolve(path) {
                Ok(Some(value)) => {
                    return ReadResult::Provided {
                        path: path.to_string(),
                        value,
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    error!(path, %err, "instance provider failed");
                    failed = true;
                }
            }
        }
        for provider in &engine.source_providers {
            match provider.resolve(path) {
                Ok(Some(source)) => {
                    let result = self.read(source);
                    replay_reports(path, &result);
                    if !result.is_success() {
                        reports.error(&format!(
                            "Cannot resolve definitions from path '{path}': Error in script"
                        ));
                    }
                    // Failed compilations are cached too, so their reports stay inspectable.
                    return ReadResult::Compiled {
                        path: path.to_string(),
                        result,
                    };
                }
                Ok(None) => {}
                Err(err) => {
                    error!(path, %err, "source provider failed");
                    failed = true;
                }
            }
        }
        let reason = if failed {
            "Error in script"
        } else {
            "No script corresponding to path"
        };
        reports.error(&format!("Cannot resolve definitions from path '{path}': {reason}"));
        ReadResult::Failure {
            path: path.to_string(),
        }
    }
}

impl ImportResolver for ImportSession<'_> {
    fn resolve_definition(
        &mut self,
        path: &str,
        reports: &mut dyn ReportHandler,
    ) -> Option<AmongDefinition> {
        let result = self.get_or_read_from(path, reports);
        if result.is_success() {
            result.definition().cloned()
        } else {
            None
        }
    }
}

/// Surfaces an imported unit's reports through `tracing`, since they belong to another source.
fn replay_reports(path: &str, result: &CompileResult) {
    for report in result.reports().iter() {
        let rendered = report.render(result.source());
        match report.kind {
            ReportKind::Error => error!(path, "{rendered}"),
            ReportKind::Warn => warn!(path, "{rendered}"),
            ReportKind::Info => info!(path, "{rendered}"),
        }
    }
}

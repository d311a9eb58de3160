//! Shared helpers for the integration tests.

#![allow(dead_code)]

use among::diagnostics::ReportKind;
use among::engine::{AmongEngine, CompileResult, EngineConfig, MemorySourceProvider};
use among::syntax::Source;

/// Compiles `text` with a default engine.
pub fn compile(text: &str) -> CompileResult {
    AmongEngine::new().read(Source::of(text))
}

pub fn compile_with_config(text: &str, config: EngineConfig) -> CompileResult {
    AmongEngine::with_config(config).read(Source::of(text))
}

/// Compiles `text` with `modules` available to `use` statements.
pub fn compile_with_modules(text: &str, modules: &[(&str, &str)]) -> CompileResult {
    engine_with_modules(modules).read(Source::of(text))
}

pub fn engine_with_modules(modules: &[(&str, &str)]) -> AmongEngine {
    let mut provider = MemorySourceProvider::new();
    for (path, text) in modules {
        provider.insert(*path, *text);
    }
    let mut engine = AmongEngine::new();
    engine.add_source_provider(provider);
    engine
}

/// Root values rendered in compact syntax, one string per value.
pub fn values(result: &CompileResult) -> Vec<String> {
    result.root().iter().map(ToString::to_string).collect()
}

pub fn messages(result: &CompileResult, kind: ReportKind) -> Vec<String> {
    result
        .reports()
        .iter()
        .filter(|r| r.kind == kind)
        .map(|r| r.message.clone())
        .collect()
}

pub fn errors(result: &CompileResult) -> Vec<String> {
    messages(result, ReportKind::Error)
}

pub fn warnings(result: &CompileResult) -> Vec<String> {
    messages(result, ReportKind::Warn)
}

/// Panics with the rendered reports unless compilation produced none at all.
pub fn assert_clean(result: &CompileResult) {
    assert!(
        result.reports().is_empty(),
        "unexpected reports:\n{}",
        result.render_reports(None)
    );
}

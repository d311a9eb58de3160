//! # among
//!
//! Front end of a compiler for Among, a small configuration and expression language.
//!
//! A script is tokenized and parsed into a sequence of [`ast::Among`] values: primitives, objects
//! and lists. Scripts can define *macros* (templates applied at parse time) and *operators*
//! (prefix, postfix and binary syntax over lists), and import the definitions of other scripts
//! with `use`.
//!
//! ## Module layout
//!
//! - [`ast`]: the value model, node paths and compact rendering.
//! - [`syntax`]: source text, tokenizer and parser.
//! - [`macros`] and [`operators`]: the registries a script reads from and writes to.
//! - [`definition`]: macros and operators bundled together.
//! - [`engine`]: compilation entry point, import resolution and providers.
//! - [`library`]: the built-in definitions reachable with `use default_operators` and friends.
//! - [`diagnostics`] and [`errors`]: script reports and host errors.
//! - [`cli`]: the `among` binary.
//!
//! ```rust
//! use among::engine::AmongEngine;
//! use among::syntax::Source;
//!
//! let engine = AmongEngine::new();
//! let result = engine.read(Source::of("point{x: 1, y: 2}"));
//! assert!(result.is_success());
//! assert_eq!(result.root().to_string(), "point{x:1,y:2}");
//! ```

pub mod ast;
pub mod cli;
pub mod definition;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod library;
pub mod macros;
pub mod operators;
pub mod syntax;

pub use crate::ast::{Among, AmongList, AmongObject, AmongPrimitive, AmongRoot};
pub use crate::definition::{AmongDefinition, RootAndDefinition};
pub use crate::engine::{AmongEngine, CompileResult, EngineConfig};
pub use crate::errors::{AmongError, Result};

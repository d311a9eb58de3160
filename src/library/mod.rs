//! The default library every engine can import without a source provider.
//!
//! | path | contents |
//! |---|---|
//! | `default_operators`, `default_operator` | operator set, see [`operators::default_operators`] |
//! | `eval` | default operators plus the `eval(expr)` macro |
//! | `collection`, `collections` | `.` accessor and collection function macros |
//! | `format` | `%` operator and the `format` macro |

pub mod collection;
pub mod eval;
pub mod format;
pub mod operators;

use tracing::debug;

use crate::definition::RootAndDefinition;
use crate::engine::InstanceProvider;
use crate::errors::Result;

pub const DEFAULT_OPERATOR: &str = "default_operator";
pub const DEFAULT_OPERATORS: &str = "default_operators";
pub const EVAL: &str = "eval";
pub const COLLECTION: &str = "collection";
pub const COLLECTIONS: &str = "collections";
pub const FORMAT: &str = "format";

/// Serves the default library paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryProvider;

impl InstanceProvider for LibraryProvider {
    fn resolve(&self, path: &str) -> Result<Option<RootAndDefinition>> {
        let definition = match path {
            DEFAULT_OPERATOR | DEFAULT_OPERATORS => operators::default_operators()?,
            EVAL => eval::eval_definition()?,
            COLLECTION | COLLECTIONS => collection::collection()?,
            FORMAT => format::format_definition()?,
            _ => return Ok(None),
        };
        debug!(path, "serving library definition");
        Ok(Some(RootAndDefinition::of_definition(definition)))
    }
}

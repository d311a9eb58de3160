//! Macro and operator definitions carried between compilation units.

use std::fmt;

use crate::ast::AmongRoot;
use crate::macros::MacroRegistry;
use crate::operators::OperatorRegistry;

/// Macros and operators, either defined by a script or made available to it.
///
/// Both registries are persistent maps, so cloning a definition to seed another compilation is
/// cheap and the copies evolve independently.
#[derive(Debug, Clone, Default)]
pub struct AmongDefinition {
    pub macros: MacroRegistry,
    pub operators: OperatorRegistry,
}

impl AmongDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty() && self.operators.is_empty()
    }

    pub fn clear(&mut self) {
        self.macros.clear();
        self.operators.clear();
    }
}

impl fmt::Display for AmongDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for operator in self.operators.all_operators() {
            writeln!(f, "{operator}")?;
        }
        for m in self.macros.all_macros() {
            writeln!(f, "{m}")?;
        }
        Ok(())
    }
}

/// A root paired with the definition that came with it; what an instance provider supplies.
#[derive(Debug, Clone, Default)]
pub struct RootAndDefinition {
    pub root: AmongRoot,
    pub definition: AmongDefinition,
}

impl RootAndDefinition {
    pub fn new(root: AmongRoot, definition: AmongDefinition) -> Self {
        Self { root, definition }
    }

    /// A definition-only unit, the usual shape of a library.
    pub fn of_definition(definition: AmongDefinition) -> Self {
        Self {
            root: AmongRoot::new(),
            definition,
        }
    }
}

//! Replacement operations of template macros, and [`MacroBuilder`] for code-defined macros.

use std::fmt;
use std::sync::Arc;

use super::types::{MacroKind, MacroParameter, MacroParameterList, MacroSignature, TypeFlags};
use super::{Macro, MacroBody, NativeMacroFn};
use crate::ast::{Among, NodePath};
use crate::diagnostics::ReportHandler;
use crate::errors::{AmongError, Result};

// ============================================================================
// REPLACEMENTS
// ============================================================================

/// What to put at a [`MacroReplacement`]'s path.
#[derive(Debug, Clone)]
pub enum MacroOp {
    /// Replace the node with the argument at the index.
    Value(usize),
    /// Rename the node with the primitive argument at the index.
    Name(usize),
    /// Apply a macro selected when the template was built to the node.
    Call(Arc<Macro>),
}

impl fmt::Display for MacroOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroOp::Value(i) => write!(f, "value replacement of parameter #{i}"),
            MacroOp::Name(i) => write!(f, "name replacement of parameter #{i}"),
            MacroOp::Call(m) => write!(f, "call to macro {}", m.signature()),
        }
    }
}

/// One step of applying a template macro; replacements run in recorded (post-order) order.
#[derive(Debug, Clone)]
pub struct MacroReplacement {
    path: NodePath,
    op: MacroOp,
}

impl MacroReplacement {
    pub fn new(path: NodePath, op: MacroOp) -> Self {
        Self { path, op }
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn op(&self) -> &MacroOp {
        &self.op
    }

    /// Rewrites `target` in place. `Ok(false)` means a failure that has been reported.
    pub(crate) fn apply(
        &self,
        args: &[Among],
        target: &mut Among,
        copy_constant: bool,
        reports: &mut dyn ReportHandler,
    ) -> Result<bool> {
        let slot = self
            .path
            .resolve_mut(target)
            .ok_or_else(|| AmongError::InvalidPath {
                path: self.path.to_string(),
            })?;
        match &self.op {
            MacroOp::Value(i) => {
                *slot = argument(args, *i)?.clone();
            }
            MacroOp::Name(i) => match argument(args, *i)? {
                Among::Primitive(p) => {
                    slot.set_name(p.value());
                }
                other => {
                    reports.error(&format!(
                        "Cannot use {} as a name; expected primitive",
                        other.shape_name()
                    ));
                    return Ok(false);
                }
            },
            MacroOp::Call(m) => match m.apply(slot, copy_constant, reports)? {
                Some(result) => *slot = result,
                None => return Ok(false),
            },
        }
        Ok(true)
    }
}

fn argument(args: &[Among], index: usize) -> Result<&Among> {
    args.get(index).ok_or_else(|| {
        AmongError::macro_fault("<template>", format!("no argument at index {index}"))
    })
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builds macros from code.
///
/// ```rust
/// use among::ast::Among;
/// use among::macros::{MacroBuilder, MacroKind, TypeFlags};
///
/// let size = MacroBuilder::new("size", MacroKind::Access)
///     .infer_self_type(TypeFlags::NAMEABLE)
///     .build_native(|args, _, _| {
///         let n = args[0].as_list().map_or(0, |l| l.len());
///         Ok(Some(Among::value(n)))
///     })
///     .unwrap();
/// assert_eq!(size.signature().to_string(), "fn size");
/// ```
#[derive(Debug)]
pub struct MacroBuilder {
    name: String,
    kind: MacroKind,
    parameters: Vec<MacroParameter>,
    type_inferences: Option<Vec<TypeFlags>>,
    error: Option<AmongError>,
}

impl MacroBuilder {
    pub fn new(name: impl Into<String>, kind: MacroKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parameters: Vec::new(),
            type_inferences: None,
            error: None,
        }
    }

    pub fn param(self, name: &str) -> Self {
        self.param_full(name, None, TypeFlags::ANY)
    }

    pub fn param_with_default(self, name: &str, default_value: impl Into<Among>) -> Self {
        self.param_full(name, Some(default_value.into()), TypeFlags::ANY)
    }

    pub fn param_typed(self, name: &str, flags: TypeFlags) -> Self {
        self.param_full(name, None, flags)
    }

    pub fn param_full(
        mut self,
        name: &str,
        default_value: Option<Among>,
        flags: TypeFlags,
    ) -> Self {
        let flags = flags.normalize();
        if flags.is_empty() {
            return self.fail(format!("Type inference of parameter '{name}' has no valid input"));
        }
        if flags != TypeFlags::ANY {
            self.create_type_inference();
        }
        self.parameters.push(MacroParameter::new(name, default_value));
        if let Some(inferences) = &mut self.type_inferences {
            inferences.push(flags);
        }
        self
    }

    pub fn infer_self_type(mut self, flags: TypeFlags) -> Self {
        if !self.kind.is_function() {
            return self.fail("Cannot infer self type of non-function macros".to_string());
        }
        let flags = flags.normalize();
        if flags.is_empty() {
            return self.fail("Type inference of self has no valid input".to_string());
        }
        self.create_type_inference();
        if let Some(first) = self.type_inferences.as_mut().and_then(|t| t.first_mut()) {
            *first = flags;
        }
        self
    }

    fn create_type_inference(&mut self) {
        if self.type_inferences.is_none() {
            let slots = self.parameters.len() + usize::from(self.kind.is_function());
            self.type_inferences = Some(vec![TypeFlags::ANY; slots]);
        }
    }

    fn fail(mut self, reason: String) -> Self {
        if self.error.is_none() {
            self.error = Some(AmongError::InvalidMacro {
                name: self.name.clone(),
                reason,
            });
        }
        self
    }

    fn finish(self, body: MacroBody) -> Result<Macro> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Macro::new(
            MacroSignature::new(self.name, self.kind),
            MacroParameterList::new(self.parameters)?,
            self.type_inferences,
            body,
        )
    }

    /// A replacement-based macro, the same kind a script defines.
    pub fn build_template(
        self,
        template: Among,
        replacements: Vec<MacroReplacement>,
    ) -> Result<Macro> {
        self.finish(MacroBody::Template {
            template,
            replacements,
        })
    }

    /// A code-defined macro. Function macros receive `self` as the first argument.
    pub fn build_native(self, function: NativeMacroFn) -> Result<Macro> {
        self.finish(MacroBody::Native(function))
    }
}

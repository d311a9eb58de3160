//! Macros: template rewriting and code-defined transformations keyed by signature.
//!
//! A [`Macro`] is applied to the node the parser just produced (a primitive, a named collection, or
//! the call shape built by an accessor operator). Application has three stages:
//!
//! 1. **Binding**: the argument is decoded into a flat argument array according to the
//!    [`MacroKind`]. Missing required arguments are errors; surplus ones are warnings.
//! 2. **Type check**: when the macro carries type inferences, every argument must match its
//!    [`TypeFlags`]. This runs after overload selection, never during it.
//! 3. **Body**: a template is cloned and its [`MacroReplacement`]s run in order, or a native
//!    function is called.
//!
//! Expected failures are reported and yield `Ok(None)`. `Err` is reserved for faults, which the
//! parser reports once as an unexpected error.

use std::fmt::{self, Write};

use crate::ast::Among;
use crate::diagnostics::ReportHandler;
use crate::errors::{AmongError, Result};

pub mod definition;
pub mod registry;
pub mod types;

pub use definition::{MacroBuilder, MacroOp, MacroReplacement};
pub use registry::{MacroGroup, MacroRegistry};
pub use types::{MacroKind, MacroParameter, MacroParameterList, MacroSignature, TypeFlags};

/// Code-defined macro body: `(args, copy_constant, reports)`.
///
/// For function macros `args[0]` is `self`, followed by the declared parameters in order.
pub type NativeMacroFn = fn(&[Among], bool, &mut dyn ReportHandler) -> Result<Option<Among>>;

#[derive(Debug, Clone)]
pub enum MacroBody {
    Template {
        template: Among,
        replacements: Vec<MacroReplacement>,
    },
    Native(NativeMacroFn),
}

#[derive(Debug, Clone)]
pub struct Macro {
    signature: MacroSignature,
    parameters: MacroParameterList,
    type_inferences: Option<Vec<TypeFlags>>,
    body: MacroBody,
}

impl Macro {
    pub fn new(
        signature: MacroSignature,
        parameters: MacroParameterList,
        type_inferences: Option<Vec<TypeFlags>>,
        body: MacroBody,
    ) -> Result<Self> {
        let kind = signature.kind();
        let invalid = |reason: String| AmongError::InvalidMacro {
            name: signature.name().to_string(),
            reason,
        };
        if !kind.takes_parameters() && !parameters.is_empty() {
            return Err(invalid("Constant definitions cannot have parameter".to_string()));
        }
        if kind.is_positional() && !parameters.has_consecutive_optional_params() {
            return Err(invalid(format!(
                "Optional parameters of {} macro should be consecutive, \
                 placed at end of the parameter list",
                kind.friendly_name()
            )));
        }
        Ok(Self {
            signature,
            parameters,
            type_inferences,
            body,
        })
    }

    pub fn signature(&self) -> &MacroSignature {
        &self.signature
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn kind(&self) -> MacroKind {
        self.signature.kind()
    }

    pub fn parameters(&self) -> &MacroParameterList {
        &self.parameters
    }

    pub fn type_inferences(&self) -> Option<&[TypeFlags]> {
        self.type_inferences.as_deref()
    }

    pub fn body(&self) -> &MacroBody {
        &self.body
    }

    /// A template without replacements; its result never depends on the argument.
    pub fn is_constant(&self) -> bool {
        matches!(&self.body, MacroBody::Template { replacements, .. } if replacements.is_empty())
    }

    /// Applies the macro to `argument`. See the module docs for the failure contract.
    pub fn apply(
        &self,
        argument: &Among,
        copy_constant: bool,
        reports: &mut dyn ReportHandler,
    ) -> Result<Option<Among>> {
        let Some(args) = self.to_args(argument, reports) else {
            return Ok(None);
        };
        if !self.check_types(&args, reports) {
            return Ok(None);
        }
        match &self.body {
            MacroBody::Template {
                template,
                replacements,
            } => {
                let mut result = template.clone();
                for replacement in replacements {
                    if !replacement.apply(&args, &mut result, copy_constant, reports)? {
                        return Ok(None);
                    }
                }
                Ok(Some(result))
            }
            MacroBody::Native(function) => function(&args, copy_constant, reports),
        }
    }

    fn check_types(&self, args: &[Among], reports: &mut dyn ReportHandler) -> bool {
        let Some(inferences) = &self.type_inferences else {
            return true;
        };
        let mut valid = true;
        for (i, (flags, arg)) in inferences.iter().zip(args).enumerate() {
            if flags.matches(arg) {
                continue;
            }
            let param_index = if self.kind().is_function() { i.checked_sub(1) } else { Some(i) };
            let param_name = param_index
                .and_then(|i| self.parameters.get(i))
                .map_or("self", MacroParameter::name);
            reports.error(&format!(
                "Type of argument '{param_name}' does not match its inferred type.\n  \
                 Expected type: {flags}\n  \
                 Supplied argument: {}",
                TypeFlags::of(arg)
            ));
            valid = false;
        }
        valid
    }

    // ------------------------------------------------------------------------
    // Argument binding
    // ------------------------------------------------------------------------

    fn to_args(&self, argument: &Among, reports: &mut dyn ReportHandler) -> Option<Vec<Among>> {
        match self.kind() {
            MacroKind::Const => Some(Vec::new()),
            MacroKind::Object => self.object_args(argument, None, reports),
            MacroKind::List | MacroKind::Operation => self.list_args(argument, None, reports),
            kind => {
                let required = if kind == MacroKind::Access { 1 } else { 2 };
                let list = argument.as_list().filter(|l| l.len() >= required);
                let Some(list) = list else {
                    reports.error(if kind == MacroKind::Access {
                        "Expected 'self' as argument"
                    } else {
                        "Expected pair of 'self' and 'args' as argument"
                    });
                    return None;
                };
                if list.len() > required {
                    reports.warn(&format!("Unused function parameters: {} provided", list.len()));
                }
                let this = list.get(0)?;
                match (kind, list.get(1)) {
                    (MacroKind::Access, _) => Some(vec![this.clone()]),
                    (MacroKind::ObjectFn, Some(rest)) => {
                        self.object_args(rest, Some(this), reports)
                    }
                    (_, Some(rest)) => self.list_args(rest, Some(this), reports),
                    (_, None) => None,
                }
            }
        }
    }

    fn object_args(
        &self,
        argument: &Among,
        this: Option<&Among>,
        reports: &mut dyn ReportHandler,
    ) -> Option<Vec<Among>> {
        let Some(object) = argument.as_object() else {
            reports.error("Expected object as argument");
            return None;
        };
        let mut args: Vec<Among> = this.into_iter().cloned().collect();
        let mut missing = false;
        for param in &self.parameters {
            match object.get(param.name()).or(param.default_value()) {
                Some(value) => args.push(value.clone()),
                None => {
                    reports.error(&format!("Missing argument '{}'", param.name()));
                    missing = true;
                }
            }
        }
        for key in object.properties().keys() {
            if self.parameters.index_of(key).is_none() {
                reports.warn(&format!("Unused argument '{key}'"));
            }
        }
        (!missing).then_some(args)
    }

    fn list_args(
        &self,
        argument: &Among,
        this: Option<&Among>,
        reports: &mut dyn ReportHandler,
    ) -> Option<Vec<Among>> {
        let Some(list) = argument.as_list() else {
            reports.error("Expected list as argument");
            return None;
        };
        let required = self.parameters.required_count();
        if list.len() < required {
            reports.error(&format!(
                "Not enough parameters: minimum of {required} expected, {} provided",
                list.len()
            ));
            return None;
        }
        if list.len() > self.parameters.len() {
            reports.warn(&format!(
                "Unused parameters: maximum of {} expected, {} provided",
                self.parameters.len(),
                list.len()
            ));
        }
        let mut args: Vec<Among> = this.into_iter().cloned().collect();
        for (i, param) in self.parameters.iter().enumerate() {
            let value = list.get(i).or(param.default_value())?;
            args.push(value.clone());
        }
        Some(args)
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// `name[a, b = /* default */]` style rendering used in overload diagnostics.
    pub fn signature_and_parameters(&self, stub_defaults: bool) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_signature_and_parameters(&mut out, stub_defaults);
        out
    }

    fn write_signature_and_parameters(
        &self,
        out: &mut impl Write,
        stub_defaults: bool,
    ) -> fmt::Result {
        crate::ast::format::write_name(out, self.name())?;
        if let Some((open, close)) = self.kind().brackets() {
            out.write_char(open)?;
            self.parameters.write(out, stub_defaults)?;
            out.write_char(close)?;
        }
        Ok(())
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.kind().is_function() { "fn " } else { "macro " })?;
        self.write_signature_and_parameters(f, false)?;
        f.write_str(" : ")?;
        match &self.body {
            MacroBody::Template { template, .. } => write!(f, "{template}"),
            MacroBody::Native(_) => f.write_str("/* native */"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodePath;
    use crate::diagnostics::{ReportKind, ReportList};

    fn pair_macro() -> Macro {
        // macro pair[a, b = 0] : [a, b]
        MacroBuilder::new("pair", MacroKind::List)
            .param("a")
            .param_with_default("b", "0")
            .build_template(
                Among::list().with("a").with("b").into(),
                vec![
                    MacroReplacement::new(NodePath::root().index(0), MacroOp::Value(0)),
                    MacroReplacement::new(NodePath::root().index(1), MacroOp::Value(1)),
                ],
            )
            .unwrap()
    }

    #[test]
    fn template_fills_defaults() {
        let mut reports = ReportList::new();
        let arg: Among = Among::named_list("pair").with("x").into();
        let result = pair_macro().apply(&arg, true, &mut reports).unwrap().unwrap();
        assert_eq!(result, Among::list().with("x").with("0").into());
        assert!(reports.is_empty());
    }

    #[test]
    fn surplus_is_a_warning_and_shortage_an_error() {
        let mut reports = ReportList::new();
        let arg: Among = Among::named_list("pair").with("1").with("2").with("3").into();
        assert!(pair_macro().apply(&arg, true, &mut reports).unwrap().is_some());
        assert_eq!(reports.count(ReportKind::Warn), 1);

        let mut reports = ReportList::new();
        let empty: Among = Among::named_list("pair").into();
        assert!(pair_macro().apply(&empty, true, &mut reports).unwrap().is_none());
        assert_eq!(
            reports.reports()[0].message,
            "Not enough parameters: minimum of 1 expected, 0 provided"
        );
    }

    #[test]
    fn object_macro_reports_every_missing_argument() {
        let m = MacroBuilder::new("point", MacroKind::Object)
            .param("x")
            .param("y")
            .build_template(Among::value("p"), Vec::new())
            .unwrap();
        let mut reports = ReportList::new();
        let arg: Among = Among::named_object("point").with_property("z", "1").into();
        assert!(m.apply(&arg, true, &mut reports).unwrap().is_none());
        let messages: Vec<&str> = reports.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(
            messages,
            ["Missing argument 'x'", "Missing argument 'y'", "Unused argument 'z'"]
        );
    }

    #[test]
    fn type_mismatch_names_the_parameter() {
        let m = MacroBuilder::new("concat", MacroKind::OperationFn)
            .param_typed("other", TypeFlags::LIST | TypeFlags::OPERATION)
            .infer_self_type(TypeFlags::LIST)
            .build_native(|args, _, _| Ok(Some(args[0].clone())))
            .unwrap();
        let mut reports = ReportList::new();
        let call: Among = Among::named_list("concat")
            .with(Among::list())
            .with(Among::operation().with(Among::operation().with("x")))
            .into();
        assert!(m.apply(&call, true, &mut reports).unwrap().is_some());

        let bad: Among = Among::named_list("concat")
            .with("self")
            .with(Among::operation().with(Among::operation().with("y")))
            .into();
        assert!(m.apply(&bad, true, &mut reports).unwrap().is_none());
        assert_eq!(
            reports.reports().last().map(|r| r.message.as_str()),
            Some(
                "Type of argument 'self' does not match its inferred type.\n  \
                 Expected type: List\n  \
                 Supplied argument: Primitive"
            )
        );
    }

    #[test]
    fn constant_definitions_reject_parameters() {
        let err = MacroBuilder::new("c", MacroKind::Const)
            .param("x")
            .build_template(Among::value("1"), Vec::new());
        assert!(err.is_err());
    }

    #[test]
    fn display_shows_signature_and_template() {
        assert_eq!(pair_macro().to_string(), "macro pair[a, b = 0] : [a,b]");
        assert_eq!(pair_macro().signature_and_parameters(true), "pair[a, b = /* default */]");
    }
}

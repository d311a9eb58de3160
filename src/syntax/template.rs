//! Builds a template macro while the parser reads its body.
//!
//! The parser hands every node that refers to a parameter, and every macro call it leaves
//! unexpanded, to the [`TemplateBuilder`]. The builder tags the node with a mark. When the body is
//! complete, [`TemplateBuilder::finish`] walks it in post-order and turns each mark into a
//! [`MacroReplacement`] at the node's path. Post-order guarantees that replacements inside a
//! call's argument run before the call itself.

use std::sync::Arc;

use crate::ast::{Among, MarkId, NodePath};
use crate::diagnostics::ReportHandler;
use crate::macros::{
    Macro, MacroBody, MacroKind, MacroOp, MacroParameter, MacroParameterList, MacroReplacement,
    MacroSignature, TypeFlags,
};

pub(crate) struct TemplateBuilder {
    start: usize,
    name: String,
    kind: MacroKind,
    /// Includes `self` at index 0 for function macros.
    params: Vec<MacroParameter>,
    pending: Vec<(MarkId, MacroOp)>,
    next_mark: MarkId,
    type_inferences: Option<Vec<TypeFlags>>,
    optional_seen: bool,
    invalid: bool,
}

impl TemplateBuilder {
    pub(crate) fn new(start: usize, name: impl Into<String>, kind: MacroKind) -> Self {
        let params = if kind.is_function() {
            vec![MacroParameter::required("self")]
        } else {
            Vec::new()
        };
        Self {
            start,
            name: name.into(),
            kind,
            params,
            pending: Vec::new(),
            next_mark: 0,
            type_inferences: None,
            optional_seen: false,
            invalid: false,
        }
    }

    pub(crate) fn mark_invalid(&mut self) {
        self.invalid = true;
    }

    pub(crate) fn new_param(
        &mut self,
        name: &str,
        default_value: Option<Among>,
        position: usize,
        reports: &mut dyn ReportHandler,
    ) {
        match self.kind {
            MacroKind::Const => {
                reports.error("Constant macros cannot have parameters");
                self.mark_invalid();
                return;
            }
            MacroKind::Access => {
                reports.error("Access macros cannot have parameters");
                self.mark_invalid();
                return;
            }
            _ => {}
        }
        if self.param_index(name).is_some() {
            let message = if self.kind.is_function() && name == "self" {
                "Cannot define parameter named 'self' in function macros".to_string()
            } else {
                format!("Duplicated parameter '{name}'.")
            };
            reports.error_at(&message, Some(position));
            self.mark_invalid();
            return;
        }
        if self.kind.is_positional() {
            if default_value.is_some() {
                self.optional_seen = true;
            } else if self.optional_seen {
                reports.error_at(
                    &format!(
                        "Optional parameters of {} macro should be consecutive, \
                         placed at end of the parameter list",
                        self.kind.friendly_name()
                    ),
                    Some(position),
                );
                self.mark_invalid();
            }
        }
        self.params.push(MacroParameter::new(name, default_value));
    }

    fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    /// Narrows what parameter `index` accepts, warning when nothing or not its default fits.
    fn infer_type_as(&mut self, index: usize, flags: TypeFlags, reports: &mut dyn ReportHandler) {
        let slots = self.params.len();
        let inferences = self.type_inferences.get_or_insert_with(Vec::new);
        if inferences.len() < slots {
            inferences.resize(slots, TypeFlags::ANY);
        }
        let current = inferences[index];
        if current.is_empty() || current == flags {
            return;
        }
        let narrowed = current & flags;
        inferences[index] = narrowed;

        let param = &self.params[index];
        if narrowed.is_empty() {
            reports.warn(&format!(
                "Parameter '{}' has no valid input: needs to satisfy both {current} AND {flags}",
                param.name()
            ));
        } else if param.default_value().is_some_and(|d| !narrowed.matches(d)) {
            reports.warn(&format!("Default value of the parameter '{}' is invalid", param.name()));
        }
    }

    fn mark(&mut self, target: &mut Among, op: MacroOp) {
        let mark = self.next_mark;
        self.next_mark += 1;
        target.set_mark(Some(mark));
        self.pending.push((mark, op));
    }

    /// Records a replacement if `target` names a parameter. Returns whether it did.
    ///
    /// A primitive is replaced by the argument; a named collection is renamed by it, which
    /// requires the argument to be a primitive.
    pub(crate) fn resolve_param_ref(
        &mut self,
        target: &mut Among,
        reports: &mut dyn ReportHandler,
    ) -> bool {
        let name = match target {
            Among::Primitive(p) => p.value(),
            Among::Object(o) => o.name(),
            Among::List(l) => l.name(),
        };
        let Some(index) = self.param_index(name) else {
            return false;
        };
        let op = if target.is_primitive() {
            MacroOp::Value(index)
        } else {
            self.infer_type_as(index, TypeFlags::PRIMITIVE, reports);
            MacroOp::Name(index)
        };
        if !self.invalid {
            self.mark(target, op);
        }
        true
    }

    /// Defers a call to `m` on `target` until the template is applied.
    pub(crate) fn resolve_macro_call(&mut self, m: Arc<Macro>, target: &mut Among) {
        self.mark(target, MacroOp::Call(m));
    }

    /// Produces the macro, or `None` if anything about the definition was invalid.
    pub(crate) fn finish(
        self,
        mut template: Among,
        reports: &mut dyn ReportHandler,
    ) -> Option<Macro> {
        if self.invalid {
            return None;
        }
        let mut pending = self.pending;
        let mut replacements = Vec::with_capacity(pending.len());
        NodePath::walk_post_order(&template, &mut |node, path| {
            let Some(mark) = node.mark() else { return };
            if let Some(i) = pending.iter().position(|(m, _)| *m == mark) {
                let (_, op) = pending.remove(i);
                replacements.push(MacroReplacement::new(path.clone(), op));
            }
        });
        if !pending.is_empty() {
            let unresolved: Vec<String> = pending.iter().map(|(_, op)| op.to_string()).collect();
            reports.error_at(
                &format!("Unresolved macro operation: {}", unresolved.join(", ")),
                Some(self.start),
            );
            return None;
        }
        template.clear_marks();

        let type_inferences = self.type_inferences.map(|mut t| {
            t.resize(self.params.len(), TypeFlags::ANY);
            t
        });
        let mut params = self.params;
        if self.kind.is_function() && !params.is_empty() {
            params.remove(0);
        }
        let parameters = match MacroParameterList::new(params) {
            Ok(parameters) => parameters,
            Err(err) => {
                reports.error_at(&err.to_string(), Some(self.start));
                return None;
            }
        };
        let body = MacroBody::Template {
            template,
            replacements,
        };
        let signature = MacroSignature::new(self.name, self.kind);
        match Macro::new(signature, parameters, type_inferences, body) {
            Ok(m) => Some(m),
            Err(err) => {
                reports.error_at(&err.to_string(), Some(self.start));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ReportList;

    #[test]
    fn parameter_references_become_replacements() {
        let mut reports = ReportList::new();
        let mut builder = TemplateBuilder::new(0, "wrap", MacroKind::List);
        builder.new_param("a", None, 0, &mut reports);
        builder.new_param("n", None, 0, &mut reports);

        let mut a = Among::value("a");
        assert!(builder.resolve_param_ref(&mut a, &mut reports));
        let mut named = Among::named_list("n").into();
        assert!(builder.resolve_param_ref(&mut named, &mut reports));
        let mut plain = Among::value("b");
        assert!(!builder.resolve_param_ref(&mut plain, &mut reports));

        let mut list = Among::list();
        list.push(a);
        list.push(named);
        list.push(plain);
        let m = builder.finish(list.into(), &mut reports).unwrap();
        assert!(reports.is_empty());

        let arg: Among = Among::named_list("wrap").with("x").with("tag").into();
        let out = m.apply(&arg, true, &mut reports).unwrap().unwrap();
        assert_eq!(out.to_string(), "[x,tag[],b]");
    }

    #[test]
    fn optional_parameters_must_be_trailing() {
        let mut reports = ReportList::new();
        let mut builder = TemplateBuilder::new(0, "m", MacroKind::List);
        builder.new_param("a", Some(Among::value("1")), 0, &mut reports);
        builder.new_param("b", None, 5, &mut reports);
        assert!(builder.finish(Among::value("x"), &mut reports).is_none());
        assert_eq!(reports.reports()[0].source_position, Some(5));
    }

    #[test]
    fn self_is_reserved_in_function_macros() {
        let mut reports = ReportList::new();
        let mut builder = TemplateBuilder::new(0, "f", MacroKind::ListFn);
        builder.new_param("self", None, 3, &mut reports);
        assert_eq!(
            reports.reports()[0].message,
            "Cannot define parameter named 'self' in function macros"
        );
    }

    #[test]
    fn renaming_with_a_collection_default_warns() {
        let mut reports = ReportList::new();
        let mut builder = TemplateBuilder::new(0, "m", MacroKind::Object);
        builder.new_param("n", Some(Among::list().into()), 0, &mut reports);
        let mut named: Among = Among::named_object("n").into();
        builder.resolve_param_ref(&mut named, &mut reports);
        assert_eq!(reports.reports()[0].message, "Default value of the parameter 'n' is invalid");
    }
}

//! String formatting, imported with `use format`.
//!
//! `("{} + {} = {sum}" % {sum: 3})` style formatting through the `%` operator, which produces an
//! operation named `format`. Placeholders:
//!
//! - `{}` takes the next positional argument,
//! - `{n}` takes the argument at index `n`,
//! - `{key}` takes the property `key` of an object argument,
//! - `{{` and `}}` are literal braces.
//!
//! Placeholders that cannot be filled are left in the output unchanged.

use indexmap::IndexMap;

use crate::ast::Among;
use crate::definition::AmongDefinition;
use crate::diagnostics::{ReportHandler, Silent};
use crate::errors::Result;
use crate::macros::{MacroBuilder, MacroKind, TypeFlags};
use crate::operators::{OperatorProperty, OperatorType};

/// Just above assignment, so `a = "x{}" % b` formats before assigning.
pub const FORMAT_PRIORITY: f64 = 0.5;

pub fn format_definition() -> Result<AmongDefinition> {
    let mut definition = AmongDefinition::new();
    definition.operators.add_operator(
        "%",
        OperatorType::Binary,
        OperatorProperty::None,
        Some("format"),
        FORMAT_PRIORITY,
    )?;
    let m = MacroBuilder::new("format", MacroKind::Operation)
        .param_typed("format", TypeFlags::PRIMITIVE)
        .param_with_default("argument", Among::list())
        .build_native(format_macro)?;
    definition.macros.add(m, &mut Silent);
    Ok(definition)
}

fn format_macro(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let pattern = args[0].expect_primitive()?;
    let arguments = match &args[1] {
        Among::Primitive(p) => FormatArgs::Single(p.value()),
        Among::List(l) => FormatArgs::List(l.elements()),
        Among::Object(o) => FormatArgs::Object(o.properties()),
    };
    Ok(Some(Among::value(format(pattern, &arguments))))
}

/// What placeholders are filled from.
#[derive(Debug, Clone, Copy)]
pub enum FormatArgs<'a> {
    Single(&'a str),
    List(&'a [Among]),
    Object(&'a IndexMap<String, Among>),
}

impl FormatArgs<'_> {
    fn index(&self, index: usize) -> Option<String> {
        match self {
            FormatArgs::Single(text) => (index == 0).then(|| text.to_string()),
            FormatArgs::List(items) => items.get(index).map(text_of),
            FormatArgs::Object(properties) => properties.get_index(index).map(|(_, v)| text_of(v)),
        }
    }

    fn key(&self, key: &str) -> Option<String> {
        match self {
            FormatArgs::Object(properties) => properties.get(key).map(text_of),
            _ => None,
        }
    }
}

fn text_of(value: &Among) -> String {
    match value {
        Among::Primitive(p) => p.value().to_string(),
        other => other.to_string(),
    }
}

pub fn format(pattern: &str, args: &FormatArgs<'_>) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut next_positional = 0;
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(c);
                }
                if !closed {
                    out.push('{');
                    out.push_str(&placeholder);
                    break;
                }
                let value = if placeholder.is_empty() {
                    next_positional += 1;
                    args.index(next_positional - 1)
                } else if let Ok(index) = placeholder.parse::<usize>() {
                    args.index(index)
                } else {
                    args.key(&placeholder)
                };
                match value {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('{');
                        out.push_str(&placeholder);
                        out.push('}');
                    }
                }
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_positional_indexed_and_named() {
        let items: Vec<Among> = vec!["a".into(), "b".into()];
        assert_eq!(format("{} {} {0}", &FormatArgs::List(&items)), "a b a");

        let object = Among::object().with_property("name", "x");
        assert_eq!(format("hi {name}!", &FormatArgs::Object(object.properties())), "hi x!");
        assert_eq!(format("{}", &FormatArgs::Single("solo")), "solo");
    }

    #[test]
    fn keeps_unfilled_placeholders_and_escapes() {
        assert_eq!(format("{{}} {missing} {", &FormatArgs::List(&[])), "{} {missing} {");
    }
}

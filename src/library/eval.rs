//! Constant folding for operator trees, imported with `use eval`.
//!
//! `eval(1 + 2 * 3)` becomes `7`. Operands are numbers, booleans (`true`/`false`) or text; text
//! only takes part in `==` and `!=`. Anything else is reported and the call fails.

use std::fmt;

use crate::ast::Among;
use crate::definition::AmongDefinition;
use crate::diagnostics::{ReportHandler, Silent};
use crate::errors::Result;
use crate::macros::{MacroBuilder, MacroKind};

use super::operators::default_operators;

/// The default operators plus the `eval` operation macro.
pub fn eval_definition() -> Result<AmongDefinition> {
    let mut definition = default_operators()?;
    let m = MacroBuilder::new("eval", MacroKind::Operation)
        .param("expr")
        .build_native(eval_macro)?;
    definition.macros.add(m, &mut Silent);
    Ok(definition)
}

fn eval_macro(args: &[Among], _: bool, reports: &mut dyn ReportHandler) -> Result<Option<Among>> {
    Ok(eval(&args[0], reports))
}

/// Folds `expr` into a primitive, or reports why it cannot.
pub fn eval(expr: &Among, reports: &mut dyn ReportHandler) -> Option<Among> {
    evaluate(expr, reports).map(|value| Among::value(value))
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    fn parse(text: &str) -> Value {
        if let Ok(n) = text.trim().parse::<f64>() {
            if !n.is_nan() {
                return Value::Number(n);
            }
        }
        match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(text.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(t) => f.write_str(t),
        }
    }
}

fn evaluate(expr: &Among, reports: &mut dyn ReportHandler) -> Option<Value> {
    let operation = match expr {
        Among::Primitive(p) => return Some(Value::parse(p.value())),
        Among::List(l) if l.is_operation() => l,
        other => {
            reports.error_at(
                &format!("Cannot evaluate {} '{other}'", other.shape_name()),
                other.source_position(),
            );
            return None;
        }
    };
    let position = expr.source_position();
    match (operation.name(), operation.elements()) {
        ("", [single]) => evaluate(single, reports),
        (op, [operand]) => {
            let operand = evaluate(operand, reports)?;
            unary(op, operand, position, reports)
        }
        (op, [a, b]) if !op.is_empty() => {
            let a = evaluate(a, reports)?;
            let b = evaluate(b, reports)?;
            binary(op, a, b, position, reports)
        }
        _ => {
            reports.error_at(&format!("Cannot evaluate operation '{expr}'"), position);
            None
        }
    }
}

fn unary(
    op: &str,
    operand: Value,
    position: Option<usize>,
    reports: &mut dyn ReportHandler,
) -> Option<Value> {
    match (op, operand) {
        ("!", Value::Bool(b)) => Some(Value::Bool(!b)),
        ("-", Value::Number(n)) => Some(Value::Number(-n)),
        ("+", Value::Number(n)) => Some(Value::Number(n)),
        (op @ ("!" | "-" | "+"), operand) => {
            reports.error_at(&format!("Cannot apply '{op}' to '{operand}'"), position);
            None
        }
        (op, _) => {
            reports.error_at(&format!("Unknown operator '{op}'"), position);
            None
        }
    }
}

fn binary(
    op: &str,
    a: Value,
    b: Value,
    position: Option<usize>,
    reports: &mut dyn ReportHandler,
) -> Option<Value> {
    use Value::{Bool, Number};

    let result = match (op, &a, &b) {
        ("==", _, _) => Some(Bool(a == b)),
        ("!=", _, _) => Some(Bool(a != b)),
        ("+", Number(x), Number(y)) => Some(Number(x + y)),
        ("-", Number(x), Number(y)) => Some(Number(x - y)),
        ("*", Number(x), Number(y)) => Some(Number(x * y)),
        ("/", Number(_), Number(y)) if *y == 0.0 => {
            reports.error_at("Division by zero", position);
            return None;
        }
        ("/", Number(x), Number(y)) => Some(Number(x / y)),
        ("^" | "**", Number(x), Number(y)) => Some(Number(x.powf(*y))),
        (">", Number(x), Number(y)) => Some(Bool(x > y)),
        ("<", Number(x), Number(y)) => Some(Bool(x < y)),
        (">=", Number(x), Number(y)) => Some(Bool(x >= y)),
        ("<=", Number(x), Number(y)) => Some(Bool(x <= y)),
        ("&&", Bool(x), Bool(y)) => Some(Bool(*x && *y)),
        ("||", Bool(x), Bool(y)) => Some(Bool(*x || *y)),
        ("&", Bool(x), Bool(y)) => Some(Bool(x & y)),
        ("|", Bool(x), Bool(y)) => Some(Bool(x | y)),
        ("&", Number(x), Number(y)) if is_integer(*x) && is_integer(*y) => {
            Some(Number(((*x as i64) & (*y as i64)) as f64))
        }
        ("|", Number(x), Number(y)) if is_integer(*x) && is_integer(*y) => {
            Some(Number(((*x as i64) | (*y as i64)) as f64))
        }
        (
            "+" | "-" | "*" | "/" | "^" | "**" | ">" | "<" | ">=" | "<=" | "&&" | "||" | "&" | "|",
            _,
            _,
        ) => None,
        (op, _, _) => {
            reports.error_at(&format!("Unknown operator '{op}'"), position);
            return None;
        }
    };
    if result.is_none() {
        reports.error_at(&format!("Cannot apply '{op}' to '{a}' and '{b}'"), position);
    }
    result
}

fn is_integer(n: f64) -> bool {
    n.fract() == 0.0 && n.abs() < 1e15
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ReportList;

    fn op(name: &str, args: &[Among]) -> Among {
        let mut list = Among::named_operation(name);
        for a in args {
            list.push(a.clone());
        }
        list.into()
    }

    #[test]
    fn folds_arithmetic_and_comparison() {
        let mut reports = ReportList::new();
        let sum = op("+", &["1".into(), op("*", &["2".into(), "3".into()])]);
        assert_eq!(eval(&sum, &mut reports).unwrap().to_string(), "7");
        let cmp = op(">=", &["2.5".into(), "2".into()]);
        assert_eq!(eval(&cmp, &mut reports).unwrap().to_string(), "true");
        assert_eq!(eval(&op("-", &["4".into()]), &mut reports).unwrap().to_string(), "-4");
        assert!(reports.is_empty());
    }

    #[test]
    fn text_only_compares() {
        let mut reports = ReportList::new();
        let equal = eval(&op("==", &["a".into(), "a".into()]), &mut reports).unwrap();
        assert_eq!(equal.to_string(), "true");
        assert!(eval(&op("+", &["a".into(), "1".into()]), &mut reports).is_none());
        assert_eq!(reports.reports()[0].message, "Cannot apply '+' to 'a' and '1'");
    }

    #[test]
    fn lists_are_not_evaluated() {
        let mut reports = ReportList::new();
        assert!(eval(&Among::list().with("1").into(), &mut reports).is_none());
        assert!(reports.has_error());
    }
}

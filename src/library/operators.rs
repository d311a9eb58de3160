//! The stock operator set imported with `use default_operators`.

use crate::definition::AmongDefinition;
use crate::errors::Result;
use crate::operators::{priority, OperatorProperty, OperatorRegistry, OperatorType};

/// Binary operators as `(spelling, priority)`, loosest first.
const BINARY: &[(&str, f64)] = &[
    ("||", priority::LOGICAL_OR),
    ("&&", priority::LOGICAL_AND),
    ("==", priority::EQUALITY),
    ("!=", priority::EQUALITY),
    (">", priority::COMPARE),
    ("<", priority::COMPARE),
    (">=", priority::COMPARE),
    ("<=", priority::COMPARE),
    ("|", priority::BITWISE),
    ("&", priority::BITWISE),
    ("+", priority::ADDITION),
    ("-", priority::ADDITION),
    ("*", priority::PRODUCT),
    ("/", priority::PRODUCT),
    ("^", priority::POWER),
    ("**", priority::POWER),
];

const PREFIX: &[&str] = &["!", "-", "+"];

/// Assignment, logic, comparison, arithmetic, the three prefix signs and the `.` accessor.
pub fn default_operators() -> Result<AmongDefinition> {
    let mut definition = AmongDefinition::new();
    add_default_operators(&mut definition.operators)?;
    Ok(definition)
}

pub(crate) fn add_default_operators(operators: &mut OperatorRegistry) -> Result<()> {
    operators.add_operator(
        "=",
        OperatorType::Binary,
        OperatorProperty::RightAssociative,
        None,
        priority::ASSIGN,
    )?;
    for &(name, p) in BINARY {
        operators.add_operator(name, OperatorType::Binary, OperatorProperty::None, None, p)?;
    }
    for &name in PREFIX {
        operators.add_operator(
            name,
            OperatorType::Prefix,
            OperatorProperty::None,
            None,
            priority::PREFIX,
        )?;
    }
    add_accessor(operators)
}

/// `.` as an accessor with an empty alias, so `a.f[x]` calls the function macro `f`.
pub(crate) fn add_accessor(operators: &mut OperatorRegistry) -> Result<()> {
    operators.add_operator(
        ".",
        OperatorType::Binary,
        OperatorProperty::Accessor,
        Some(""),
        priority::ACCESS,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_is_both_binary_and_prefix() {
        let definition = default_operators().unwrap();
        let operators = &definition.operators;
        assert!(operators.get("-", false, OperatorType::Binary).is_some());
        assert!(operators.get("-", false, OperatorType::Prefix).is_some());
        assert!(operators.get(".", false, OperatorType::Binary).unwrap().is_accessor());
    }

    #[test]
    fn groups_run_from_assignment_to_access() {
        let groups = default_operators().unwrap().operators.priority_groups();
        assert_eq!(groups.first().map(|g| g.priority()), Some(priority::ASSIGN));
        assert!(groups[0].is_right_associative());
        assert_eq!(groups.last().map(|g| g.priority()), Some(priority::ACCESS));
    }
}

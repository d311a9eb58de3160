//! User-definable operators and keywords.
//!
//! An operator is a punctuation spelling (`+`, `**`, `.`) and a keyword is a word spelling
//! (`x`, `sus`). Both are registered with a fixity ([`OperatorType`]), an optional alias used as
//! the name of the produced operation, an associativity/accessor property and a priority.
//!
//! The parser consumes the registry through [`OperatorRegistry::priority_groups`], which orders
//! groups from the loosest binding to the tightest one. The tokenizer consumes it through
//! [`OperatorRegistry::match_operator`] and [`OperatorRegistry::is_keyword`].

use std::cmp::Ordering;
use std::fmt;

use im::OrdMap;
use serde::Serialize;
use tracing::trace;

use crate::ast::format::{is_simple_value, write_quoted};
use crate::errors::{AmongError, Result};

/// Built-in priority levels. Higher binds tighter.
pub mod priority {
    pub const ASSIGN: f64 = 0.0;
    pub const LOGICAL_OR: f64 = 1.0;
    pub const LOGICAL_AND: f64 = 2.0;
    pub const EQUALITY: f64 = 3.0;
    pub const COMPARE: f64 = 4.0;
    pub const BITWISE: f64 = 5.0;
    pub const ADDITION: f64 = 6.0;
    pub const PRODUCT: f64 = 7.0;
    pub const POWER: f64 = 8.0;
    pub const PREFIX: f64 = 9.0;
    pub const POSTFIX: f64 = 10.0;
    pub const ACCESS: f64 = 11.0;
}

// ============================================================================
// DEFINITION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorType {
    Binary,
    Prefix,
    Postfix,
}

impl OperatorType {
    pub const fn default_priority(self) -> f64 {
        match self {
            OperatorType::Binary => priority::ADDITION,
            OperatorType::Prefix => priority::PREFIX,
            OperatorType::Postfix => priority::POSTFIX,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OperatorType::Binary => "binary",
            OperatorType::Prefix => "prefix",
            OperatorType::Postfix => "postfix",
        }
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra behavior of a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorProperty {
    #[default]
    None,
    RightAssociative,
    /// `a OP b` desugars into a function macro call instead of a binary operation.
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorDefinition {
    name: String,
    keyword: bool,
    #[serde(rename = "type")]
    operator_type: OperatorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    property: OperatorProperty,
    priority: f64,
}

impl OperatorDefinition {
    /// Validates and creates a definition. A missing or NaN priority falls back to the type's
    /// default.
    pub fn new(
        name: impl Into<String>,
        keyword: bool,
        operator_type: OperatorType,
        alias: Option<String>,
        property: OperatorProperty,
        priority: Option<f64>,
    ) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: &str| AmongError::InvalidOperator {
            name: name.clone(),
            reason: reason.to_string(),
        };
        if name.is_empty() {
            return Err(invalid("operator names cannot be empty"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("operator names cannot contain whitespace"));
        }
        if operator_type != OperatorType::Binary && property != OperatorProperty::None {
            return Err(invalid("prefix and postfix operators cannot have additional properties"));
        }
        let priority = priority
            .filter(|p| !p.is_nan())
            .unwrap_or_else(|| operator_type.default_priority());
        Ok(Self {
            name,
            keyword,
            operator_type,
            alias,
            property,
            priority,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword
    }

    pub fn operator_type(&self) -> OperatorType {
        self.operator_type
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name given to the operation produced by this operator.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn property(&self) -> OperatorProperty {
        self.property
    }

    pub fn is_right_associative(&self) -> bool {
        self.property == OperatorProperty::RightAssociative
    }

    pub fn is_accessor(&self) -> bool {
        self.property == OperatorProperty::Accessor
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn key(&self) -> OperatorName {
        OperatorName {
            name: self.name.clone(),
            keyword: self.keyword,
        }
    }
}

impl fmt::Display for OperatorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.keyword { "keyword " } else { "operator " })?;
        write_spelling(f, &self.name)?;
        write!(f, " as {}", self.operator_type)?;
        match self.property {
            OperatorProperty::None => {}
            OperatorProperty::RightAssociative => f.write_str(" right-associative")?,
            OperatorProperty::Accessor => f.write_str(" accessor")?,
        }
        if self.priority != self.operator_type.default_priority() {
            write!(f, " ({})", self.priority)?;
        }
        if let Some(alias) = &self.alias {
            f.write_str(" : ")?;
            write_spelling(f, alias)?;
        }
        Ok(())
    }
}

fn write_spelling(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    if is_simple_value(text) {
        f.write_str(text)
    } else {
        write_quoted(f, text)
    }
}

/// Registry key: the spelling plus whether it is a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperatorName {
    name: String,
    keyword: bool,
}

impl OperatorName {
    pub fn new(name: impl Into<String>, keyword: bool) -> Self {
        Self {
            name: name.into(),
            keyword,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword
    }
}

// ============================================================================
// REGISTRATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationResult {
    Success,
    /// An equal definition is already registered; nothing changed.
    IdenticalDuplicate,
    /// Another definition with the same spelling and type exists.
    TypeConflict { existing: OperatorDefinition },
    /// A spelling cannot be both binary and postfix.
    BinaryPostfixConflict { existing: OperatorDefinition },
}

impl RegistrationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RegistrationResult::Success)
    }

    /// Success or identical duplicate; the registry holds `operator` either way.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            RegistrationResult::Success | RegistrationResult::IdenticalDuplicate
        )
    }

    pub fn message(&self, operator: &OperatorDefinition) -> String {
        match self {
            RegistrationResult::Success => "Success".to_string(),
            RegistrationResult::IdenticalDuplicate => {
                format!("Identical definition of '{operator}' already exists")
            }
            RegistrationResult::TypeConflict { existing } => format!(
                "'{operator}' conflicts with preexisting definition '{existing}'"
            ),
            RegistrationResult::BinaryPostfixConflict { existing } => format!(
                "'{operator}' conflicts with '{existing}'; a name cannot be both binary and postfix"
            ),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
struct OperatorEntry {
    binary: Option<OperatorDefinition>,
    prefix: Option<OperatorDefinition>,
    postfix: Option<OperatorDefinition>,
}

impl OperatorEntry {
    fn slot(&self, operator_type: OperatorType) -> Option<&OperatorDefinition> {
        match operator_type {
            OperatorType::Binary => self.binary.as_ref(),
            OperatorType::Prefix => self.prefix.as_ref(),
            OperatorType::Postfix => self.postfix.as_ref(),
        }
    }

    fn slot_mut(&mut self, operator_type: OperatorType) -> &mut Option<OperatorDefinition> {
        match operator_type {
            OperatorType::Binary => &mut self.binary,
            OperatorType::Prefix => &mut self.prefix,
            OperatorType::Postfix => &mut self.postfix,
        }
    }

    /// The slot that may not coexist with `operator_type`.
    fn exclusive_with(operator_type: OperatorType) -> Option<OperatorType> {
        match operator_type {
            OperatorType::Binary => Some(OperatorType::Postfix),
            OperatorType::Postfix => Some(OperatorType::Binary),
            OperatorType::Prefix => None,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &OperatorDefinition> {
        self.binary
            .iter()
            .chain(self.prefix.iter())
            .chain(self.postfix.iter())
    }

    fn is_empty(&self) -> bool {
        self.binary.is_none() && self.prefix.is_none() && self.postfix.is_none()
    }
}

/// Operators and keywords keyed by `(name, keyword)`, one definition per type.
///
/// Cloning is cheap; registries are copied whenever a compilation unit imports another.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    entries: OrdMap<OperatorName, OperatorEntry>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Adds `operator` unless it conflicts with an existing definition.
    pub fn add(&mut self, operator: OperatorDefinition) -> RegistrationResult {
        let key = operator.key();
        if let Some(entry) = self.entries.get(&key) {
            if let Some(existing) = entry.slot(operator.operator_type) {
                return if *existing == operator {
                    RegistrationResult::IdenticalDuplicate
                } else {
                    RegistrationResult::TypeConflict {
                        existing: existing.clone(),
                    }
                };
            }
            if let Some(existing) =
                OperatorEntry::exclusive_with(operator.operator_type).and_then(|t| entry.slot(t))
            {
                return RegistrationResult::BinaryPostfixConflict {
                    existing: existing.clone(),
                };
            }
        }
        trace!(operator = %operator, "registering operator");
        let operator_type = operator.operator_type;
        let mut entry = self.entries.get(&key).cloned().unwrap_or_default();
        *entry.slot_mut(operator_type) = Some(operator);
        self.entries.insert(key, entry);
        RegistrationResult::Success
    }

    /// Registers `operator`, dropping whatever it conflicts with.
    pub fn replace(&mut self, operator: OperatorDefinition) {
        trace!(operator = %operator, "replacing operator");
        let key = operator.key();
        let mut entry = self.entries.get(&key).cloned().unwrap_or_default();
        if let Some(exclusive) = OperatorEntry::exclusive_with(operator.operator_type) {
            *entry.slot_mut(exclusive) = None;
        }
        let operator_type = operator.operator_type;
        *entry.slot_mut(operator_type) = Some(operator);
        self.entries.insert(key, entry);
    }

    /// Convenience for code-defined operator sets.
    pub fn add_operator(
        &mut self,
        name: &str,
        operator_type: OperatorType,
        property: OperatorProperty,
        alias: Option<&str>,
        priority: f64,
    ) -> Result<RegistrationResult> {
        let operator = OperatorDefinition::new(
            name,
            false,
            operator_type,
            alias.map(str::to_string),
            property,
            Some(priority),
        )?;
        Ok(self.add(operator))
    }

    pub fn add_keyword(
        &mut self,
        name: &str,
        operator_type: OperatorType,
        priority: Option<f64>,
    ) -> Result<RegistrationResult> {
        let operator = OperatorDefinition::new(
            name,
            true,
            operator_type,
            None,
            OperatorProperty::None,
            priority,
        )?;
        Ok(self.add(operator))
    }

    /// Removes every type registered under the spelling. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str, keyword: bool) -> bool {
        self.entries.remove(&OperatorName::new(name, keyword)).is_some()
    }

    pub fn get(
        &self,
        name: &str,
        keyword: bool,
        operator_type: OperatorType,
    ) -> Option<&OperatorDefinition> {
        self.entries
            .get(&OperatorName::new(name, keyword))
            .and_then(|e| e.slot(operator_type))
    }

    pub fn contains(&self, name: &str, keyword: bool) -> bool {
        self.entries
            .get(&OperatorName::new(name, keyword))
            .is_some_and(|e| !e.is_empty())
    }

    pub fn all_operators(&self) -> impl Iterator<Item = &OperatorDefinition> {
        self.entries.values().flat_map(OperatorEntry::iter)
    }

    pub fn all_operator_names(&self) -> impl Iterator<Item = &OperatorName> {
        self.entries.keys()
    }

    /// Length in code points of the longest operator spelling that `text` starts with.
    pub fn match_operator(&self, text: &[char]) -> Option<usize> {
        self.entries
            .keys()
            .filter(|k| !k.keyword)
            .filter_map(|k| {
                let len = k.name.chars().count();
                (len <= text.len() && k.name.chars().zip(text).all(|(a, b)| a == *b)).then_some(len)
            })
            .max()
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.contains(word, true)
    }

    /// Groups of same-type, same-priority operators, loosest binding first.
    pub fn priority_groups(&self) -> Vec<PriorityGroup> {
        let mut operators: Vec<&OperatorDefinition> = self.all_operators().collect();
        operators.sort_by(|a, b| PriorityGroup::order(a, b));

        let mut groups: Vec<PriorityGroup> = Vec::new();
        for operator in operators {
            match groups.last_mut() {
                Some(group) if group.accepts(operator) => group.operators.push(operator.clone()),
                _ => groups.push(PriorityGroup {
                    operator_type: operator.operator_type,
                    priority: operator.priority,
                    right_associative: operator.is_right_associative(),
                    operators: vec![operator.clone()],
                }),
            }
        }
        groups
    }
}

// ============================================================================
// PRIORITY GROUP
// ============================================================================

/// Operators parsed at the same level of the precedence climb.
#[derive(Debug, Clone)]
pub struct PriorityGroup {
    operator_type: OperatorType,
    priority: f64,
    right_associative: bool,
    operators: Vec<OperatorDefinition>,
}

impl PriorityGroup {
    fn order(a: &OperatorDefinition, b: &OperatorDefinition) -> Ordering {
        a.priority
            .total_cmp(&b.priority)
            .then(a.operator_type.cmp(&b.operator_type))
            .then(a.is_right_associative().cmp(&b.is_right_associative()))
    }

    fn accepts(&self, operator: &OperatorDefinition) -> bool {
        self.operator_type == operator.operator_type
            && self.priority.total_cmp(&operator.priority) == Ordering::Equal
            && self.right_associative == operator.is_right_associative()
    }

    pub fn operator_type(&self) -> OperatorType {
        self.operator_type
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn is_right_associative(&self) -> bool {
        self.right_associative
    }

    pub fn operators(&self) -> &[OperatorDefinition] {
        &self.operators
    }

    pub fn get(&self, name: &str, keyword: bool) -> Option<&OperatorDefinition> {
        self.operators
            .iter()
            .find(|o| o.keyword == keyword && o.name == name)
    }
}

//! Foundation types of the macro system: kinds, signatures, parameters and shape flags.
//!
//! This module has no dependencies on the other macro modules.
//!
//! ## Kinds
//!
//! | Kind          | Written as             | Argument               |
//! |---------------|------------------------|------------------------|
//! | `Const`       | `macro m : ...`        | none                   |
//! | `Object`      | `macro m{a, b} : ...`  | object, bound by key   |
//! | `List`        | `macro m[a, b] : ...`  | list, bound by index   |
//! | `Operation`   | `macro m(a, b) : ...`  | operation, by index    |
//! | `Access`      | `fn m : ...`           | `[self]`               |
//! | `ObjectFn`    | `fn m{a} : ...`        | `[self, {..}]`         |
//! | `ListFn`      | `fn m[a] : ...`        | `[self, [..]]`         |
//! | `OperationFn` | `fn m(a) : ...`        | `[self, (..)]`         |

use std::fmt::{self, Write};
use std::ops::{BitAnd, BitOr};

use serde::Serialize;

use crate::ast::format::write_name;
use crate::ast::Among;
use crate::errors::{AmongError, Result};

// ============================================================================
// KIND AND SIGNATURE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroKind {
    Const,
    Object,
    List,
    Operation,
    Access,
    ObjectFn,
    ListFn,
    OperationFn,
}

impl MacroKind {
    /// Function macros receive the value on the left side of an accessor as `self`.
    pub const fn is_function(self) -> bool {
        matches!(
            self,
            MacroKind::Access | MacroKind::ObjectFn | MacroKind::ListFn | MacroKind::OperationFn
        )
    }

    /// List-like kinds bind parameters by position.
    pub const fn is_positional(self) -> bool {
        matches!(
            self,
            MacroKind::List | MacroKind::Operation | MacroKind::ListFn | MacroKind::OperationFn
        )
    }

    pub const fn takes_parameters(self) -> bool {
        !matches!(self, MacroKind::Const | MacroKind::Access)
    }

    /// The function counterpart of a plain kind, or the kind itself.
    pub const fn as_function(self) -> MacroKind {
        match self {
            MacroKind::Const => MacroKind::Access,
            MacroKind::Object => MacroKind::ObjectFn,
            MacroKind::List => MacroKind::ListFn,
            MacroKind::Operation => MacroKind::OperationFn,
            other => other,
        }
    }

    pub const fn friendly_name(self) -> &'static str {
        match self {
            MacroKind::Const => "constant",
            MacroKind::Object => "object",
            MacroKind::List => "list",
            MacroKind::Operation => "operation",
            MacroKind::Access => "access",
            MacroKind::ObjectFn => "object function",
            MacroKind::ListFn => "list function",
            MacroKind::OperationFn => "operation function",
        }
    }

    /// Brackets around the parameter list, if the kind has one.
    pub const fn brackets(self) -> Option<(char, char)> {
        match self {
            MacroKind::Object | MacroKind::ObjectFn => Some(('{', '}')),
            MacroKind::List | MacroKind::ListFn => Some(('[', ']')),
            MacroKind::Operation | MacroKind::OperationFn => Some(('(', ')')),
            MacroKind::Const | MacroKind::Access => None,
        }
    }
}

/// Name plus kind; macros are looked up and overloaded per signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MacroSignature {
    name: String,
    kind: MacroKind,
}

impl MacroSignature {
    pub fn new(name: impl Into<String>, kind: MacroKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MacroKind {
        self.kind
    }
}

impl fmt::Display for MacroSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_function() {
            f.write_str("fn ")?;
        }
        write_name(f, &self.name)?;
        if let Some((open, close)) = self.kind.brackets() {
            f.write_char(open)?;
            f.write_char(close)?;
        }
        Ok(())
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MacroParameter {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_value: Option<Among>,
}

impl MacroParameter {
    pub fn new(name: impl Into<String>, default_value: Option<Among>) -> Self {
        Self {
            name: name.into(),
            default_value,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&Among> {
        self.default_value.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.default_value.is_some()
    }

    /// `name` or `name = default`; with `stub`, the default is elided.
    pub fn write(&self, out: &mut impl Write, stub: bool) -> fmt::Result {
        write_name(out, &self.name)?;
        match &self.default_value {
            Some(_) if stub => out.write_str(" = /* default */"),
            Some(value) => write!(out, " = {value}"),
            None => Ok(()),
        }
    }
}

/// Ordered parameters with unique names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct MacroParameterList {
    params: Vec<MacroParameter>,
}

impl MacroParameterList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fails on a duplicated name.
    pub fn new(params: Vec<MacroParameter>) -> Result<Self> {
        for (i, p) in params.iter().enumerate() {
            if params[..i].iter().any(|q| q.name == p.name) {
                return Err(AmongError::InvalidMacro {
                    name: p.name.clone(),
                    reason: format!("Duplicated parameter '{}'", p.name),
                });
            }
        }
        Ok(Self { params })
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MacroParameter> {
        self.params.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MacroParameter> {
        self.params.iter()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &MacroParameter> {
        self.params.iter().filter(|p| !p.is_optional())
    }

    pub fn required_count(&self) -> usize {
        self.required().count()
    }

    pub fn has_optional_params(&self) -> bool {
        self.params.iter().any(MacroParameter::is_optional)
    }

    /// Whether every optional parameter comes after every required one.
    pub fn has_consecutive_optional_params(&self) -> bool {
        let first_optional = self.params.iter().position(MacroParameter::is_optional);
        first_optional.map_or(true, |i| self.params[i..].iter().all(MacroParameter::is_optional))
    }

    /// Same names at the same positions, defaults ignored.
    pub fn same_names(&self, other: &MacroParameterList) -> bool {
        self.params.len() == other.params.len()
            && self.params.iter().zip(&other.params).all(|(a, b)| a.name == b.name)
    }

    pub fn write(&self, out: &mut impl Write, stub: bool) -> fmt::Result {
        for (i, p) in self.params.iter().enumerate() {
            if i != 0 {
                out.write_str(", ")?;
            }
            p.write(out, stub)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a MacroParameterList {
    type Item = &'a MacroParameter;
    type IntoIter = std::slice::Iter<'a, MacroParameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

// ============================================================================
// TYPE FLAGS
// ============================================================================

/// Bit set over the seven value shapes, used to check macro arguments before application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TypeFlags(u8);

impl TypeFlags {
    pub const NONE: TypeFlags = TypeFlags(0);
    pub const PRIMITIVE: TypeFlags = TypeFlags(1);
    pub const UNNAMED_OBJECT: TypeFlags = TypeFlags(2);
    pub const UNNAMED_LIST: TypeFlags = TypeFlags(4);
    pub const UNNAMED_OPERATION: TypeFlags = TypeFlags(8);
    pub const NAMED_OBJECT: TypeFlags = TypeFlags(16);
    pub const NAMED_LIST: TypeFlags = TypeFlags(32);
    pub const NAMED_OPERATION: TypeFlags = TypeFlags(64);

    pub const OBJECT: TypeFlags = TypeFlags(2 | 16);
    pub const LIST: TypeFlags = TypeFlags(4 | 32);
    pub const OPERATION: TypeFlags = TypeFlags(8 | 64);
    pub const UNNAMED: TypeFlags = TypeFlags(2 | 4 | 8);
    pub const NAMED: TypeFlags = TypeFlags(16 | 32 | 64);
    pub const COLLECTION: TypeFlags = TypeFlags(2 | 4 | 8 | 16 | 32 | 64);
    pub const NAMEABLE: TypeFlags = TypeFlags::COLLECTION;
    pub const ANY: TypeFlags = TypeFlags(127);

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Drops bits outside [`TypeFlags::ANY`].
    pub const fn normalize(self) -> TypeFlags {
        TypeFlags(self.0 & Self::ANY.0)
    }

    pub const fn is_empty(self) -> bool {
        self.normalize().0 == 0
    }

    pub const fn contains(self, other: TypeFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// The single flag describing `value`'s shape.
    pub fn of(value: &Among) -> TypeFlags {
        match value {
            Among::Primitive(_) => Self::PRIMITIVE,
            Among::Object(o) if o.has_name() => Self::NAMED_OBJECT,
            Among::Object(_) => Self::UNNAMED_OBJECT,
            Among::List(l) => match (l.has_name(), l.is_operation()) {
                (true, true) => Self::NAMED_OPERATION,
                (false, true) => Self::UNNAMED_OPERATION,
                (true, false) => Self::NAMED_LIST,
                (false, false) => Self::UNNAMED_LIST,
            },
        }
    }

    pub fn matches(self, value: &Among) -> bool {
        self.normalize() == Self::ANY || self.0 & Self::of(value).0 != 0
    }

    fn describe(self) -> String {
        let exact = match self.normalize() {
            Self::ANY => Some("Anything"),
            Self::PRIMITIVE => Some("Primitive"),
            Self::UNNAMED_OBJECT => Some("Unnamed Object"),
            Self::UNNAMED_LIST => Some("Unnamed List"),
            Self::UNNAMED_OPERATION => Some("Unnamed Operation"),
            Self::NAMED_OBJECT => Some("Named Object"),
            Self::NAMED_LIST => Some("Named List"),
            Self::NAMED_OPERATION => Some("Named Operation"),
            Self::OBJECT => Some("Object"),
            Self::LIST => Some("List"),
            Self::OPERATION => Some("Operation"),
            Self::UNNAMED => Some("Unnamed Collection"),
            Self::NAMED => Some("Named Collection"),
            Self::COLLECTION => Some("Collection"),
            _ => None,
        };
        if let Some(exact) = exact {
            return exact.to_string();
        }

        let mut flag = self.normalize();
        let mut parts = Vec::new();
        if flag.contains(Self::PRIMITIVE) {
            parts.push("Primitive");
        }
        if flag.contains(Self::COLLECTION) {
            parts.push("Collection");
        } else {
            if flag.contains(Self::NAMED) {
                parts.push("Named Collection");
                flag = TypeFlags(flag.0 ^ Self::NAMED.0);
            } else if flag.contains(Self::UNNAMED) {
                parts.push("Unnamed Collection");
                flag = TypeFlags(flag.0 ^ Self::UNNAMED.0);
            }
            for (both, unnamed, named, [both_name, unnamed_name, named_name]) in [
                (
                    Self::OBJECT,
                    Self::UNNAMED_OBJECT,
                    Self::NAMED_OBJECT,
                    ["Object", "Unnamed Object", "Named Object"],
                ),
                (
                    Self::LIST,
                    Self::UNNAMED_LIST,
                    Self::NAMED_LIST,
                    ["List", "Unnamed List", "Named List"],
                ),
                (
                    Self::OPERATION,
                    Self::UNNAMED_OPERATION,
                    Self::NAMED_OPERATION,
                    ["Operation", "Unnamed Operation", "Named Operation"],
                ),
            ] {
                if flag.contains(both) {
                    parts.push(both_name);
                } else if flag.contains(unnamed) {
                    parts.push(unnamed_name);
                } else if flag.contains(named) {
                    parts.push(named_name);
                }
            }
        }
        match parts.len() {
            0 => "Invalid".to_string(),
            _ => parts.join(" or "),
        }
    }
}

impl BitOr for TypeFlags {
    type Output = TypeFlags;

    fn bitor(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | rhs.0)
    }
}

impl BitAnd for TypeFlags {
    type Output = TypeFlags;

    fn bitand(self, rhs: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for TypeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_describe_shapes() {
        assert_eq!(TypeFlags::ANY.to_string(), "Anything");
        assert_eq!(TypeFlags::OBJECT.to_string(), "Object");
        assert_eq!((TypeFlags::PRIMITIVE | TypeFlags::LIST).to_string(), "Primitive or List");
        assert_eq!(
            (TypeFlags::NAMED | TypeFlags::UNNAMED_LIST).to_string(),
            "Named Collection or Unnamed List"
        );
        assert_eq!(TypeFlags::NONE.to_string(), "Invalid");
    }

    #[test]
    fn flags_match_values() {
        let named_op: Among = Among::named_operation("f").into();
        assert!(TypeFlags::OPERATION.matches(&named_op));
        assert!(!TypeFlags::UNNAMED.matches(&named_op));
        assert!(TypeFlags::PRIMITIVE.matches(&Among::value("1")));
        assert_eq!(TypeFlags::of(&Among::list().into()), TypeFlags::UNNAMED_LIST);
    }

    #[test]
    fn optional_parameters_must_trail() {
        let ok = MacroParameterList::new(vec![
            MacroParameter::required("a"),
            MacroParameter::new("b", Some(Among::value("1"))),
        ])
        .unwrap();
        assert!(ok.has_consecutive_optional_params());
        assert_eq!(ok.required_count(), 1);

        let bad = MacroParameterList::new(vec![
            MacroParameter::new("a", Some(Among::value("1"))),
            MacroParameter::required("b"),
        ])
        .unwrap();
        assert!(!bad.has_consecutive_optional_params());
    }

    #[test]
    fn duplicated_parameter_is_rejected() {
        let err = MacroParameterList::new(vec![
            MacroParameter::required("a"),
            MacroParameter::required("a"),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn signatures_render_kind() {
        assert_eq!(MacroSignature::new("m", MacroKind::List).to_string(), "m[]");
        assert_eq!(MacroSignature::new("size", MacroKind::Access).to_string(), "fn size");
        assert_eq!(MacroSignature::new("a b", MacroKind::Object).to_string(), "\"a b\"{}");
    }
}

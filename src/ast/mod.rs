//! The Among value model.
//!
//! Every compiled script is a sequence of [`Among`] values. A value is one of three shapes:
//!
//! - [`AmongPrimitive`]: an opaque string leaf. Numbers and booleans are parsed on demand.
//! - [`AmongObject`]: an optionally named, insertion-ordered map of unique keys.
//! - [`AmongList`]: an optionally named sequence. A list built from `( ... )` syntax is flagged as
//!   an *operation*; both kinds share one representation.
//!
//! Objects and lists are *nameable*. An empty name means "unnamed".
//!
//! Nodes also carry metadata (source position, and a template mark used while a macro body is
//! being built). Metadata never takes part in equality.
//!
//! ```rust
//! use among::ast::Among;
//!
//! let a = Among::named_object("point").with_property("x", "1").with_property("y", "2");
//! let b = a.clone();
//! assert_eq!(Among::from(a), Among::from(b));
//! ```

// ============================================================================
// IMPORTS
// ============================================================================

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::errors::{AmongError, Result};

pub mod format;
pub mod path;

pub use path::{NodePath, PathStep};

// ============================================================================
// NODE METADATA
// ============================================================================

/// Identifier attached to a node while a macro template is under construction.
pub(crate) type MarkId = u32;

/// Per-node data excluded from equality.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NodeMeta {
    pub(crate) source_position: Option<usize>,
    pub(crate) mark: Option<MarkId>,
}

impl PartialEq for NodeMeta {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for NodeMeta {}

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A node of a compiled Among tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Among {
    Primitive(AmongPrimitive),
    Object(AmongObject),
    List(AmongList),
}

/// String leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AmongPrimitive {
    value: String,
    #[serde(skip)]
    meta: NodeMeta,
}

/// Named or unnamed map of properties, keys unique, insertion order preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AmongObject {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    properties: IndexMap<String, Among>,
    #[serde(skip)]
    meta: NodeMeta,
}

/// Named or unnamed sequence; `operation` marks lists written with parentheses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AmongList {
    #[serde(skip_serializing_if = "String::is_empty")]
    name: String,
    elements: Vec<Among>,
    #[serde(skip_serializing_if = "is_false")]
    operation: bool,
    #[serde(skip)]
    meta: NodeMeta,
}

fn is_false(b: &bool) -> bool {
    !*b
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

impl Among {
    /// Creates a primitive from anything with a string form.
    pub fn value(value: impl ToString) -> Among {
        Among::Primitive(AmongPrimitive::new(value.to_string()))
    }

    pub fn object() -> AmongObject {
        AmongObject::default()
    }

    pub fn named_object(name: impl Into<String>) -> AmongObject {
        AmongObject {
            name: name.into(),
            ..AmongObject::default()
        }
    }

    pub fn list() -> AmongList {
        AmongList::default()
    }

    pub fn named_list(name: impl Into<String>) -> AmongList {
        AmongList {
            name: name.into(),
            ..AmongList::default()
        }
    }

    pub fn operation() -> AmongList {
        AmongList {
            operation: true,
            ..AmongList::default()
        }
    }

    pub fn named_operation(name: impl Into<String>) -> AmongList {
        AmongList {
            name: name.into(),
            operation: true,
            ..AmongList::default()
        }
    }

    /// The sentinel value left in place of a construct that failed to compile.
    pub fn error_sentinel() -> Among {
        Among::value("ERROR")
    }
}

// ============================================================================
// SHAPE QUERIES
// ============================================================================

impl Among {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Among::Primitive(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Among::Object(_))
    }

    /// True for both plain lists and operations.
    pub fn is_list(&self) -> bool {
        matches!(self, Among::List(_))
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, Among::List(l) if l.operation)
    }

    pub fn is_nameable(&self) -> bool {
        !self.is_primitive()
    }

    pub fn as_primitive(&self) -> Option<&AmongPrimitive> {
        match self {
            Among::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&AmongObject> {
        match self {
            Among::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&AmongList> {
        match self {
            Among::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut AmongObject> {
        match self {
            Among::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut AmongList> {
        match self {
            Among::List(l) => Some(l),
            _ => None,
        }
    }

    /// Primitive text, or an error naming the actual shape.
    pub fn expect_primitive(&self) -> Result<&str> {
        self.as_primitive()
            .map(AmongPrimitive::value)
            .ok_or_else(|| self.unexpected("primitive"))
    }

    pub fn expect_object(&self) -> Result<&AmongObject> {
        self.as_object().ok_or_else(|| self.unexpected("object"))
    }

    pub fn expect_list(&self) -> Result<&AmongList> {
        self.as_list().ok_or_else(|| self.unexpected("list"))
    }

    fn unexpected(&self, expected: &'static str) -> AmongError {
        AmongError::UnexpectedNode {
            expected,
            found: self.shape_name().to_string(),
        }
    }

    /// Human readable shape, e.g. `"named operation"`.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Among::Primitive(_) => "primitive",
            Among::Object(o) if o.has_name() => "named object",
            Among::Object(_) => "object",
            Among::List(l) => match (l.has_name(), l.operation) {
                (true, true) => "named operation",
                (false, true) => "operation",
                (true, false) => "named list",
                (false, false) => "list",
            },
        }
    }
}

// ============================================================================
// NAMES AND METADATA
// ============================================================================

impl Among {
    /// Name of a nameable node; `None` for primitives. Unnamed collections return `Some("")`.
    pub fn name(&self) -> Option<&str> {
        match self {
            Among::Primitive(_) => None,
            Among::Object(o) => Some(o.name()),
            Among::List(l) => Some(l.name()),
        }
    }

    /// Renames a nameable node. Returns `false` for primitives, which cannot carry a name.
    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        match self {
            Among::Primitive(_) => false,
            Among::Object(o) => {
                o.set_name(name);
                true
            }
            Among::List(l) => {
                l.set_name(name);
                true
            }
        }
    }

    pub fn has_name(&self) -> bool {
        self.name().is_some_and(|n| !n.is_empty())
    }

    pub fn source_position(&self) -> Option<usize> {
        self.meta().source_position
    }

    pub fn set_source_position(&mut self, position: Option<usize>) {
        self.meta_mut().source_position = position;
    }

    pub fn with_source_position(mut self, position: usize) -> Self {
        self.set_source_position(Some(position));
        self
    }

    pub(crate) fn mark(&self) -> Option<MarkId> {
        self.meta().mark
    }

    pub(crate) fn set_mark(&mut self, mark: Option<MarkId>) {
        self.meta_mut().mark = mark;
    }

    fn meta(&self) -> &NodeMeta {
        match self {
            Among::Primitive(p) => &p.meta,
            Among::Object(o) => &o.meta,
            Among::List(l) => &l.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut NodeMeta {
        match self {
            Among::Primitive(p) => &mut p.meta,
            Among::Object(o) => &mut o.meta,
            Among::List(l) => &mut l.meta,
        }
    }

    /// Removes every template mark in this subtree.
    pub(crate) fn clear_marks(&mut self) {
        self.set_mark(None);
        match self {
            Among::Primitive(_) => {}
            Among::Object(o) => o.properties.values_mut().for_each(Among::clear_marks),
            Among::List(l) => l.elements.iter_mut().for_each(Among::clear_marks),
        }
    }
}

// ============================================================================
// PRIMITIVE
// ============================================================================

impl AmongPrimitive {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            meta: NodeMeta::default(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn as_f64(&self) -> Result<f64> {
        self.value
            .trim()
            .parse::<f64>()
            .map_err(|_| AmongError::NotANumber {
                value: self.value.clone(),
            })
    }

    pub fn as_i64(&self) -> Result<i64> {
        self.value
            .parse::<i64>()
            .map_err(|_| AmongError::NotAnInteger {
                value: self.value.clone(),
            })
    }

    /// `true`/`false`, compared case-insensitively.
    pub fn as_bool(&self) -> Result<bool> {
        if self.value.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if self.value.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(AmongError::NotABoolean {
                value: self.value.clone(),
            })
        }
    }
}

// ============================================================================
// OBJECT
// ============================================================================

impl AmongObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn properties(&self) -> &IndexMap<String, Among> {
        &self.properties
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Among> {
        self.properties.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Among> {
        self.properties.get_mut(key)
    }

    /// Inserts or replaces a property; a replaced key keeps its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Among>) -> Option<Among> {
        self.properties.insert(key.into(), value.into())
    }

    /// Removes a property, preserving the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Among> {
        self.properties.shift_remove(key)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Among>) -> Self {
        self.set(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn source_position(&self) -> Option<usize> {
        self.meta.source_position
    }

    pub fn set_source_position(&mut self, position: Option<usize>) {
        self.meta.source_position = position;
    }
}

// ============================================================================
// LIST
// ============================================================================

impl AmongList {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn has_name(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn is_operation(&self) -> bool {
        self.operation
    }

    pub fn set_operation(&mut self, operation: bool) {
        self.operation = operation;
    }

    pub fn elements(&self) -> &[Among] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<&Among> {
        self.elements.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Among> {
        self.elements.get_mut(index)
    }

    pub fn push(&mut self, value: impl Into<Among>) {
        self.elements.push(value.into());
    }

    /// Replaces the element at `index`, returning the old one. Out of range indices do nothing.
    pub fn set(&mut self, index: usize, value: impl Into<Among>) -> Option<Among> {
        self.elements
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value.into()))
    }

    pub fn remove(&mut self, index: usize) -> Option<Among> {
        (index < self.elements.len()).then(|| self.elements.remove(index))
    }

    pub fn with(mut self, value: impl Into<Among>) -> Self {
        self.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Among> {
        self.elements.iter()
    }

    pub fn into_elements(self) -> Vec<Among> {
        self.elements
    }

    pub fn source_position(&self) -> Option<usize> {
        self.meta.source_position
    }

    pub fn set_source_position(&mut self, position: Option<usize>) {
        self.meta.source_position = position;
    }
}

impl<'a> IntoIterator for &'a AmongList {
    type Item = &'a Among;
    type IntoIter = std::slice::Iter<'a, Among>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

impl From<AmongPrimitive> for Among {
    fn from(p: AmongPrimitive) -> Self {
        Among::Primitive(p)
    }
}

impl From<AmongObject> for Among {
    fn from(o: AmongObject) -> Self {
        Among::Object(o)
    }
}

impl From<AmongList> for Among {
    fn from(l: AmongList) -> Self {
        Among::List(l)
    }
}

impl From<&str> for Among {
    fn from(s: &str) -> Self {
        Among::value(s)
    }
}

impl From<String> for Among {
    fn from(s: String) -> Self {
        Among::Primitive(AmongPrimitive::new(s))
    }
}

impl fmt::Display for Among {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format::write_among(f, self)
    }
}

// ============================================================================
// ROOT
// ============================================================================

/// Top-level values of a compiled script, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AmongRoot {
    objects: Vec<Among>,
}

impl AmongRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Among) {
        self.objects.push(value);
    }

    pub fn objects(&self) -> &[Among] {
        &self.objects
    }

    pub fn get(&self, index: usize) -> Option<&Among> {
        self.objects.get(index)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Among> {
        self.objects.iter()
    }
}

impl fmt::Display for AmongRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.objects.iter().enumerate() {
            if i != 0 {
                writeln!(f)?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

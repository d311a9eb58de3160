//! Collection helpers imported with `use collection`.
//!
//! All of them are function macros reached through the `.` accessor, for example
//! `obj.keys`, `list.get(0)` or `obj.set(key, value)`. They never modify their input; each returns
//! an updated copy.

use crate::ast::{Among, AmongList};
use crate::definition::AmongDefinition;
use crate::diagnostics::{ReportHandler, Silent};
use crate::errors::Result;
use crate::macros::{MacroBuilder, MacroKind, TypeFlags};

use super::operators::add_accessor;

pub fn collection() -> Result<AmongDefinition> {
    let mut definition = AmongDefinition::new();
    add_accessor(&mut definition.operators)?;

    let list_like = TypeFlags::LIST | TypeFlags::OPERATION;
    let macros = [
        MacroBuilder::new("named", MacroKind::OperationFn)
            .param_typed("name", TypeFlags::PRIMITIVE)
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(named)?,
        MacroBuilder::new("name", MacroKind::Access)
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(name)?,
        MacroBuilder::new("size", MacroKind::Access)
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(size)?,
        MacroBuilder::new("keys", MacroKind::Access)
            .infer_self_type(TypeFlags::OBJECT)
            .build_native(keys)?,
        MacroBuilder::new("values", MacroKind::Access)
            .infer_self_type(TypeFlags::OBJECT)
            .build_native(values)?,
        MacroBuilder::new("properties", MacroKind::Access)
            .infer_self_type(TypeFlags::OBJECT)
            .build_native(properties)?,
        MacroBuilder::new("concat", MacroKind::OperationFn)
            .param_typed("other", list_like)
            .infer_self_type(list_like)
            .build_native(concat)?,
        MacroBuilder::new("merge", MacroKind::OperationFn)
            .param_typed("other", TypeFlags::OBJECT)
            .infer_self_type(TypeFlags::OBJECT)
            .build_native(merge)?,
        MacroBuilder::new("get", MacroKind::OperationFn)
            .param_typed("index", TypeFlags::PRIMITIVE)
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(get)?,
        MacroBuilder::new("getOrDefault", MacroKind::OperationFn)
            .param_typed("index", TypeFlags::PRIMITIVE)
            .param("default")
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(get_or_default)?,
        MacroBuilder::new("add", MacroKind::OperationFn)
            .param("value")
            .infer_self_type(list_like)
            .build_native(add)?,
        MacroBuilder::new("set", MacroKind::OperationFn)
            .param_typed("index", TypeFlags::PRIMITIVE)
            .param("value")
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(set)?,
        MacroBuilder::new("remove", MacroKind::OperationFn)
            .param_typed("index", TypeFlags::PRIMITIVE)
            .infer_self_type(TypeFlags::NAMEABLE)
            .build_native(remove)?,
    ];
    for m in macros {
        definition.macros.add(m, &mut Silent);
    }
    Ok(definition)
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn list_arg(value: &Among) -> Result<&AmongList> {
    value.expect_list()
}

/// Parses an index argument, reporting `Expected int` at the argument when it is not one.
fn index_arg(value: &Among, reports: &mut dyn ReportHandler) -> Result<Option<i64>> {
    let text = value.expect_primitive()?;
    match text.parse::<i64>() {
        Ok(i) => Ok(Some(i)),
        Err(_) => {
            reports.error_at("Expected int", value.source_position());
            Ok(None)
        }
    }
}

fn in_bounds(index: i64, list: &AmongList) -> Option<usize> {
    usize::try_from(index).ok().filter(|&i| i < list.len())
}

fn out_of_range(index: i64, list: &AmongList, reports: &mut dyn ReportHandler) {
    reports.error(&format!("Index out of range ({index}, size = {})", list.len()));
}

// ============================================================================
// MACROS
// ============================================================================

fn named(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let mut copy = args[0].clone();
    copy.set_name(args[1].expect_primitive()?);
    Ok(Some(copy))
}

fn name(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    Ok(args[0].name().map(Among::value))
}

fn size(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let size = match &args[0] {
        Among::Object(o) => o.len(),
        other => list_arg(other)?.len(),
    };
    Ok(Some(Among::value(size)))
}

fn keys(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let object = args[0].expect_object()?;
    let mut list = Among::list();
    for key in object.properties().keys() {
        list.push(key.as_str());
    }
    Ok(Some(list.into()))
}

fn values(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let object = args[0].expect_object()?;
    let mut list = Among::list();
    for value in object.properties().values() {
        list.push(value.clone());
    }
    Ok(Some(list.into()))
}

fn properties(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let object = args[0].expect_object()?;
    let mut list = Among::list();
    for (key, value) in object.properties() {
        list.push(Among::list().with(key.as_str()).with(value.clone()));
    }
    Ok(Some(list.into()))
}

fn concat(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let mut copy = list_arg(&args[0])?.clone();
    for value in list_arg(&args[1])? {
        copy.push(value.clone());
    }
    Ok(Some(copy.into()))
}

/// Properties of `other` fill in keys missing from `self`; existing keys win.
fn merge(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let mut copy = args[0].expect_object()?.clone();
    for (key, value) in args[1].expect_object()?.properties() {
        if !copy.has_property(key) {
            copy.set(key.as_str(), value.clone());
        }
    }
    Ok(Some(copy.into()))
}

fn get(args: &[Among], _: bool, reports: &mut dyn ReportHandler) -> Result<Option<Among>> {
    if let Among::Object(object) = &args[0] {
        let key = args[1].expect_primitive()?;
        let value = object.get(key).cloned();
        if value.is_none() {
            reports.error(&format!("No property '{key}' in object"));
        }
        return Ok(value);
    }
    let list = list_arg(&args[0])?;
    let Some(index) = index_arg(&args[1], reports)? else {
        return Ok(None);
    };
    match in_bounds(index, list) {
        Some(i) => Ok(list.get(i).cloned()),
        None => {
            out_of_range(index, list, reports);
            Ok(None)
        }
    }
}

fn get_or_default(
    args: &[Among],
    _: bool,
    reports: &mut dyn ReportHandler,
) -> Result<Option<Among>> {
    if let Among::Object(object) = &args[0] {
        let key = args[1].expect_primitive()?;
        return Ok(Some(object.get(key).unwrap_or(&args[2]).clone()));
    }
    let list = list_arg(&args[0])?;
    let Some(index) = index_arg(&args[1], reports)? else {
        return Ok(None);
    };
    let value = in_bounds(index, list).and_then(|i| list.get(i)).unwrap_or(&args[2]);
    Ok(Some(value.clone()))
}

fn add(args: &[Among], _: bool, _: &mut dyn ReportHandler) -> Result<Option<Among>> {
    let mut copy = list_arg(&args[0])?.clone();
    copy.push(args[1].clone());
    Ok(Some(copy.into()))
}

fn set(args: &[Among], _: bool, reports: &mut dyn ReportHandler) -> Result<Option<Among>> {
    if let Among::Object(object) = &args[0] {
        let mut copy = object.clone();
        copy.set(args[1].expect_primitive()?, args[2].clone());
        return Ok(Some(copy.into()));
    }
    let list = list_arg(&args[0])?;
    let Some(index) = index_arg(&args[1], reports)? else {
        return Ok(None);
    };
    let Some(i) = in_bounds(index, list) else {
        out_of_range(index, list, reports);
        return Ok(None);
    };
    let mut copy = list.clone();
    copy.set(i, args[2].clone());
    Ok(Some(copy.into()))
}

fn remove(args: &[Among], _: bool, reports: &mut dyn ReportHandler) -> Result<Option<Among>> {
    if let Among::Object(object) = &args[0] {
        let key = args[1].expect_primitive()?;
        if !object.has_property(key) {
            return Ok(Some(args[0].clone()));
        }
        let mut copy = object.clone();
        copy.remove(key);
        return Ok(Some(copy.into()));
    }
    let list = list_arg(&args[0])?;
    let Some(index) = index_arg(&args[1], reports)? else {
        return Ok(None);
    };
    let Some(i) = in_bounds(index, list) else {
        out_of_range(index, list, reports);
        return Ok(None);
    };
    let mut copy = list.clone();
    copy.remove(i);
    Ok(Some(copy.into()))
}

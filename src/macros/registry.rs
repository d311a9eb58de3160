//! Macro storage and overload resolution.
//!
//! Macros are grouped by [`MacroSignature`]. A group holds every overload of one signature and
//! picks the best one for a call site:
//!
//! | Group kind              | Overloads | Match score                                      |
//! |-------------------------|-----------|--------------------------------------------------|
//! | constant, access        | one       | always matches                                   |
//! | list, operation (+ fn)  | many      | surplus elements; `-1` if too few                |
//! | object (+ fn)           | many      | surplus keys; `-1` if a required key is missing  |
//!
//! The lowest non-negative score wins. A tie is an error, never a silent pick.
//!
//! Registries are persistent maps (`im::OrdMap`), so cloning one to seed an import scope is cheap
//! and never aliases mutations.

use std::collections::BTreeSet;
use std::sync::Arc;

use im::OrdMap;
use tracing::trace;

use super::types::{MacroKind, MacroSignature};
use super::Macro;
use crate::ast::Among;
use crate::diagnostics::{ReportHandler, ReportKind};

// ============================================================================
// GROUPS
// ============================================================================

/// Every registered overload of a single signature.
#[derive(Debug, Clone)]
pub enum MacroGroup {
    /// Constant and access macros: at most one definition, replaced on redefinition.
    Single(Arc<Macro>),
    /// Parameterized macros, kept in registration order.
    Overloads {
        kind: MacroKind,
        macros: Vec<Arc<Macro>>,
    },
}

impl MacroGroup {
    fn new(kind: MacroKind) -> Option<Self> {
        kind.takes_parameters().then(|| MacroGroup::Overloads {
            kind,
            macros: Vec::new(),
        })
    }

    pub fn macros(&self) -> Vec<Arc<Macro>> {
        match self {
            MacroGroup::Single(m) => vec![m.clone()],
            MacroGroup::Overloads { macros, .. } => macros.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MacroGroup::Single(_) => 1,
            MacroGroup::Overloads { macros, .. } => macros.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&mut self, new: Arc<Macro>, reports: &mut dyn ReportHandler) {
        match self {
            MacroGroup::Single(existing) => {
                report_replaced(reports, ReportKind::Warn, "overwrites", &new, &[existing.clone()]);
                *existing = new;
            }
            MacroGroup::Overloads { kind, macros } => {
                let object = matches!(kind, MacroKind::Object | MacroKind::ObjectFn);
                let (overwritten, kept): (Vec<_>, Vec<_>) = macros
                    .drain(..)
                    .partition(|m| {
                        if object {
                            overwrites_object(&new, m)
                        } else {
                            overwrites_list(&new, m)
                        }
                    });
                let overlapping: Vec<_> = kept
                    .iter()
                    .filter(|m| {
                        if object {
                            overlaps_object(&new, m)
                        } else {
                            overlaps_list(&new, m)
                        }
                    })
                    .cloned()
                    .collect();
                if !overwritten.is_empty() {
                    report_replaced(reports, ReportKind::Warn, "overwrites", &new, &overwritten);
                }
                if !overlapping.is_empty() {
                    report_replaced(
                        reports,
                        ReportKind::Info,
                        "possibly overlaps with",
                        &new,
                        &overlapping,
                    );
                }
                *macros = kept;
                macros.push(new);
            }
        }
    }

    /// Selects the overload for `argument`, reporting no-match and ambiguity.
    pub fn search(&self, argument: &Among, reports: &mut dyn ReportHandler) -> Option<Arc<Macro>> {
        let (kind, macros) = match self {
            MacroGroup::Single(m) => return Some(m.clone()),
            MacroGroup::Overloads { kind, macros } => (*kind, macros),
        };
        let target = if kind.is_function() {
            match argument.as_list().and_then(|l| l.get(1)) {
                Some(args) => args,
                None => {
                    reports.error("Expected pair of 'self' and 'args' as argument");
                    return None;
                }
            }
        } else {
            argument
        };
        let score = |m: &Macro| -> Option<usize> {
            match kind {
                MacroKind::Object | MacroKind::ObjectFn => target.as_object().and_then(|o| {
                    let params = m.parameters();
                    if o.len() < params.required_count() {
                        return None;
                    }
                    let mut defaults_provided = 0;
                    for p in params {
                        match (p.is_optional(), o.has_property(p.name())) {
                            (false, false) => return None,
                            (true, true) => defaults_provided += 1,
                            _ => {}
                        }
                    }
                    Some(o.len().saturating_sub(params.required_count() + defaults_provided))
                }),
                _ => target.as_list().and_then(|l| {
                    let params = m.parameters();
                    (l.len() >= params.required_count())
                        .then(|| l.len().saturating_sub(params.len()))
                }),
            }
        };

        let mut best: Option<usize> = None;
        let mut winners: Vec<&Arc<Macro>> = Vec::new();
        for m in macros {
            let Some(s) = score(m) else { continue };
            match best {
                Some(b) if b < s => {}
                Some(b) if b == s => winners.push(m),
                _ => {
                    best = Some(s);
                    winners.clear();
                    winners.push(m);
                }
            }
        }
        match winners.as_slice() {
            [single] => Some(Arc::clone(single)),
            [] => {
                if macros.is_empty() {
                    reports.error("No macro defined, this shouldn't happen");
                } else {
                    reports.error(&candidate_list(
                        "Wrong usage, expected:".to_string(),
                        macros.iter(),
                    ));
                }
                None
            }
            tied => {
                let header = format!("Ambiguous usage of macro {}:", tied[0].signature());
                reports.error(&candidate_list(header, tied.iter().copied()));
                None
            }
        }
    }
}

fn overwrites_list(new: &Macro, existing: &Macro) -> bool {
    new.parameters().len() == existing.parameters().len()
        && new.parameters().required_count() == existing.parameters().required_count()
}

fn overlaps_list(new: &Macro, existing: &Macro) -> bool {
    let (a_min, a_max) = (new.parameters().required_count(), new.parameters().len());
    let (b_min, b_max) = (existing.parameters().required_count(), existing.parameters().len());
    a_max >= b_min && b_max >= a_min
}

fn overwrites_object(new: &Macro, existing: &Macro) -> bool {
    new.parameters() == existing.parameters()
}

fn overlaps_object(new: &Macro, existing: &Macro) -> bool {
    let names = |m: &Macro| {
        m.parameters()
            .required()
            .map(|p| p.name().to_string())
            .collect::<BTreeSet<_>>()
    };
    names(new) == names(existing)
}

fn candidate_list<'a>(mut header: String, macros: impl Iterator<Item = &'a Arc<Macro>>) -> String {
    for m in macros {
        header.push_str("\n  ");
        header.push_str(&m.signature_and_parameters(true));
    }
    header
}

fn report_replaced(
    reports: &mut dyn ReportHandler,
    kind: ReportKind,
    verb: &str,
    new: &Macro,
    existing: &[Arc<Macro>],
) {
    let mut message = format!(
        "New macro {} {verb} {} preexisting macro(s).\n  Preexisting macro(s):",
        new.signature(),
        existing.len()
    );
    for m in existing {
        message.push_str("\n    ");
        message.push_str(&m.signature_and_parameters(true));
    }
    message.push_str("\n  New macro:\n    ");
    message.push_str(&new.signature_and_parameters(true));
    reports.report(kind, &message, None, &[]);
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Macros visible to a compilation, keyed by signature.
#[derive(Debug, Clone, Default)]
pub struct MacroRegistry {
    groups: OrdMap<MacroSignature, MacroGroup>,
}

impl MacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of signatures with at least one macro.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Registers a macro. Always succeeds; replaced and overlapping overloads are reported.
    pub fn add(&mut self, m: impl Into<Arc<Macro>>, reports: &mut dyn ReportHandler) {
        let m: Arc<Macro> = m.into();
        let signature = m.signature().clone();
        trace!(signature = %signature, "registering macro");
        let group = match self.groups.get(&signature).cloned() {
            Some(mut group) => {
                group.add(m, reports);
                group
            }
            None => match MacroGroup::new(signature.kind()) {
                Some(mut group) => {
                    group.add(m, reports);
                    group
                }
                None => MacroGroup::Single(m),
            },
        };
        self.groups.insert(signature, group);
    }

    pub fn remove(&mut self, signature: &MacroSignature) -> bool {
        self.groups.remove(signature).is_some()
    }

    pub fn remove_named(&mut self, name: &str, kind: MacroKind) -> bool {
        self.remove(&MacroSignature::new(name, kind))
    }

    pub fn group(&self, signature: &MacroSignature) -> Option<&MacroGroup> {
        self.groups.get(signature)
    }

    pub fn group_for(&self, name: &str, kind: MacroKind) -> Option<&MacroGroup> {
        self.group(&MacroSignature::new(name, kind))
    }

    pub fn contains(&self, signature: &MacroSignature) -> bool {
        self.groups.contains_key(signature)
    }

    pub fn all_macros(&self) -> impl Iterator<Item = Arc<Macro>> + '_ {
        self.groups.values().flat_map(MacroGroup::macros)
    }

    pub fn all_signatures(&self) -> impl Iterator<Item = &MacroSignature> + '_ {
        self.groups.keys()
    }
}

//! Addresses of nodes inside an [`Among`] tree.

use std::fmt;

use super::Among;
use crate::errors::{AmongError, Result};

/// One step of a [`NodePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    Property(String),
    Index(usize),
}

impl PathStep {
    fn resolve<'a>(&self, among: &'a Among) -> Option<&'a Among> {
        match (self, among) {
            (PathStep::Property(key), Among::Object(o)) => o.get(key),
            (PathStep::Index(i), Among::List(l)) => l.get(*i),
            _ => None,
        }
    }

    fn resolve_mut<'a>(&self, among: &'a mut Among) -> Option<&'a mut Among> {
        match (self, among) {
            (PathStep::Property(key), Among::Object(o)) => o.get_mut(key),
            (PathStep::Index(i), Among::List(l)) => l.get_mut(*i),
            _ => None,
        }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Property(key) => write!(f, ".{key}"),
            PathStep::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// Sequence of property/index steps from a root node. The empty path is the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<PathStep>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn property(&self, key: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.0.push(PathStep::Property(key.into()));
        path
    }

    pub fn index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(PathStep::Index(index));
        path
    }

    /// Walks the path from `root`; stops at the first step that does not apply.
    pub fn resolve<'a>(&self, root: &'a Among) -> Option<&'a Among> {
        self.0.iter().try_fold(root, |node, step| step.resolve(node))
    }

    pub fn resolve_mut<'a>(&self, root: &'a mut Among) -> Option<&'a mut Among> {
        self.0.iter().try_fold(root, |node, step| step.resolve_mut(node))
    }

    /// Overwrites the node this path points at. The empty path replaces `root` itself.
    pub fn replace(&self, root: &mut Among, value: Among) -> Result<()> {
        match self.resolve_mut(root) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(AmongError::InvalidPath {
                path: self.to_string(),
            }),
        }
    }

    /// Visits every node of `root` in post-order (children before their parent), with its path.
    pub fn walk_post_order(root: &Among, visit: &mut impl FnMut(&Among, &NodePath)) {
        fn walk(node: &Among, path: &mut NodePath, visit: &mut impl FnMut(&Among, &NodePath)) {
            match node {
                Among::Primitive(_) => {}
                Among::Object(o) => {
                    for (key, child) in o.properties() {
                        path.0.push(PathStep::Property(key.clone()));
                        walk(child, path, visit);
                        path.0.pop();
                    }
                }
                Among::List(l) => {
                    for (i, child) in l.iter().enumerate() {
                        path.0.push(PathStep::Index(i));
                        walk(child, path, visit);
                        path.0.pop();
                    }
                }
            }
            visit(node, path);
        }
        walk(root, &mut NodePath::root(), visit);
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        self.0.iter().try_for_each(|step| write!(f, "{step}"))
    }
}

impl FromIterator<PathStep> for NodePath {
    fn from_iter<T: IntoIterator<Item = PathStep>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

//! Cycle detection for property references.
//!
//! Every nested `$<TARGET_PROPERTY:...>` evaluation pushes a frame naming the
//! target and property being read. Frames form a linked list through the
//! stack, so checking for a cycle walks the ancestors.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::core::{Prop, TargetId};

/// Outcome of checking a new frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DagStatus {
    /// No cycle.
    Dag,
    /// The property reads itself directly. Reported as an error.
    SelfReference,
    /// An older ancestor is the same frame. Evaluates to empty.
    CyclicReference,
    /// This transitive property was already expanded under the same root.
    AlreadySeen,
}

pub struct DagChecker<'a> {
    target: TargetId,
    property: Prop,
    parent: Option<&'a DagChecker<'a>>,
    seen: RefCell<HashSet<(TargetId, Prop)>>,
}

impl<'a> DagChecker<'a> {
    pub fn root(target: TargetId, property: Prop) -> Self {
        DagChecker {
            target,
            property,
            parent: None,
            seen: RefCell::new(HashSet::new()),
        }
    }

    pub fn child(&'a self, target: TargetId, property: Prop) -> DagChecker<'a> {
        DagChecker {
            target,
            property,
            parent: Some(self),
            seen: RefCell::new(HashSet::new()),
        }
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn property(&self) -> Prop {
        self.property
    }

    fn top(&self) -> &DagChecker<'a> {
        let mut current = self;
        while let Some(parent) = current.parent {
            current = parent;
        }
        current
    }

    /// Property the outermost evaluation is resolving.
    pub fn top_property(&self) -> Prop {
        self.top().property
    }

    /// The outermost evaluation is resolving link libraries.
    pub fn evaluating_link_libraries(&self) -> bool {
        matches!(
            self.top_property(),
            Prop::LinkLibraries
                | Prop::InterfaceLinkLibraries
                | Prop::LinkInterfaceLibraries
                | Prop::ImportedLinkInterfaceLibraries
        )
    }

    pub fn check(&self) -> DagStatus {
        let Some(parent) = self.parent else {
            return DagStatus::Dag;
        };

        if parent.target == self.target && parent.property == self.property {
            return DagStatus::SelfReference;
        }

        let mut ancestor = parent.parent;
        while let Some(frame) = ancestor {
            if frame.target == self.target && frame.property == self.property {
                return DagStatus::CyclicReference;
            }
            ancestor = frame.parent;
        }

        if self.property.is_transitive_usage_requirement()
            && !self
                .top()
                .seen
                .borrow_mut()
                .insert((self.target, self.property))
        {
            return DagStatus::AlreadySeen;
        }

        DagStatus::Dag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_self_reference() {
        let a = TargetId(0);
        let root = DagChecker::root(a, Prop::IncludeDirectories);
        let first = root.child(a, Prop::InterfaceIncludeDirectories);
        assert_eq!(first.check(), DagStatus::Dag);
        let again = first.child(a, Prop::InterfaceIncludeDirectories);
        assert_eq!(again.check(), DagStatus::SelfReference);
    }

    #[test]
    fn test_indirect_cycle_is_not_an_error() {
        let (a, b) = (TargetId(0), TargetId(1));
        let root = DagChecker::root(a, Prop::IncludeDirectories);
        let via_a = root.child(a, Prop::custom("P"));
        let via_b = via_a.child(b, Prop::custom("P"));
        let back = via_b.child(a, Prop::custom("P"));
        assert_eq!(back.check(), DagStatus::CyclicReference);
    }

    #[test]
    fn test_transitive_property_seen_once_per_root() {
        let (a, d) = (TargetId(0), TargetId(3));
        let root = DagChecker::root(a, Prop::IncludeDirectories);
        let first = root.child(d, Prop::InterfaceIncludeDirectories);
        assert_eq!(first.check(), DagStatus::Dag);
        let second = root.child(d, Prop::InterfaceIncludeDirectories);
        assert_eq!(second.check(), DagStatus::AlreadySeen);
    }

    #[test]
    fn test_link_library_root() {
        let root = DagChecker::root(TargetId(0), Prop::LinkLibraries);
        let child = root.child(TargetId(1), Prop::custom("X"));
        assert!(child.evaluating_link_libraries());
        assert!(!DagChecker::root(TargetId(0), Prop::Sources).evaluating_link_libraries());
    }
}

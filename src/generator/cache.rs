//! Per-target memoization.
//!
//! Every target owns one [`TargetCache`]. Values are handed out as `Rc`s so a
//! cache hit returns the very same object; callers compare with
//! [`Rc::ptr_eq`] when identity matters.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use crate::core::{Artifact, ConfigId, EntryKind, TargetId};
use crate::util::InternedString;

use super::closure::LinkClosure;
use super::compat::CompatibleInterfaces;
use super::link_iface::LinkInterface;
use super::link_impl::{LinkImplementation, LinkImplementationLibraries};
use super::trace::TraceSummary;

/// State of a memoized computation.
///
/// An absent key is the empty state.
#[derive(Debug)]
pub enum CacheSlot<T> {
    InProgress,
    Done(Rc<T>),
}

impl<T> Clone for CacheSlot<T> {
    fn clone(&self) -> Self {
        match self {
            CacheSlot::InProgress => CacheSlot::InProgress,
            CacheSlot::Done(value) => CacheSlot::Done(Rc::clone(value)),
        }
    }
}

/// Values that know whether they depended on the head target.
pub trait HeadSensitive {
    fn head_sensitive(&self) -> bool;
}

/// Slots for one configuration, keyed by head target.
///
/// When the first completed value is head independent it answers for every
/// head from then on.
#[derive(Debug)]
pub struct HeadMap<T> {
    entries: Vec<(TargetId, CacheSlot<T>)>,
}

impl<T> Default for HeadMap<T> {
    fn default() -> Self {
        HeadMap {
            entries: Vec::new(),
        }
    }
}

impl<T: HeadSensitive> HeadMap<T> {
    pub fn get(&self, head: TargetId) -> Option<CacheSlot<T>> {
        if let Some((_, CacheSlot::Done(first))) = self.entries.first() {
            if !first.head_sensitive() {
                return Some(CacheSlot::Done(Rc::clone(first)));
            }
        }
        self.entries
            .iter()
            .find(|(h, _)| *h == head)
            .map(|(_, slot)| slot.clone())
    }

    pub fn set(&mut self, head: TargetId, slot: CacheSlot<T>) {
        match self.entries.iter_mut().find(|(h, _)| *h == head) {
            Some(entry) => entry.1 = slot,
            None => self.entries.push((head, slot)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Memoized results for one target.
#[derive(Debug, Default)]
pub struct TargetCache {
    /// Usage requirements per (property, config, compile language)
    pub usage: RefCell<HashMap<(EntryKind, ConfigId, Option<InternedString>), Rc<Vec<String>>>>,

    pub sources: RefCell<HashMap<ConfigId, Rc<Vec<PathBuf>>>>,
    /// Set once a source computation proved configuration independent
    pub frozen_sources: RefCell<Option<Rc<Vec<PathBuf>>>>,

    pub link_impl_libs: RefCell<HashMap<ConfigId, HeadMap<LinkImplementationLibraries>>>,
    pub link_impl: RefCell<HashMap<ConfigId, Rc<LinkImplementation>>>,
    pub languages: RefCell<HashMap<ConfigId, Rc<Vec<String>>>>,

    pub link_iface: RefCell<HashMap<ConfigId, HeadMap<LinkInterface>>>,
    pub link_iface_usage: RefCell<HashMap<ConfigId, HeadMap<LinkInterface>>>,

    pub impl_closure: RefCell<HashMap<ConfigId, Rc<Vec<TargetId>>>>,
    pub link_closure: RefCell<HashMap<ConfigId, CacheSlot<LinkClosure>>>,
    pub compatible: RefCell<HashMap<ConfigId, CacheSlot<CompatibleInterfaces>>>,

    pub output_names: RefCell<HashMap<(ConfigId, Artifact), CacheSlot<String>>>,
    pub output_dirs: RefCell<HashMap<(ConfigId, Artifact), CacheSlot<PathBuf>>>,

    /// Properties read while computing link libraries that the target never set
    pub implied_null: RefCell<BTreeSet<String>>,

    /// Debug-traced values already logged, per property
    pub debug_logged: RefCell<HashMap<EntryKind, HashSet<String>>>,
    /// Compatible properties whose origin report was already logged
    pub compat_logged: RefCell<HashSet<String>>,

    pub interface_mismatch_warned: Cell<bool>,

    pub trace: Option<Rc<TraceSummary>>,
}

impl TargetCache {
    /// Drop everything derived from the target's source list.
    pub fn invalidate_sources(&mut self) {
        self.sources.get_mut().clear();
        *self.frozen_sources.get_mut() = None;
        self.languages.get_mut().clear();
        self.link_impl.get_mut().clear();
        self.link_iface.get_mut().clear();
        self.link_iface_usage.get_mut().clear();
        self.link_closure.get_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Value {
        sensitive: bool,
    }

    impl HeadSensitive for Value {
        fn head_sensitive(&self) -> bool {
            self.sensitive
        }
    }

    #[test]
    fn test_head_independent_value_is_shared() {
        let mut map = HeadMap::default();
        let value = Rc::new(Value { sensitive: false });
        map.set(TargetId(0), CacheSlot::Done(Rc::clone(&value)));

        match map.get(TargetId(7)) {
            Some(CacheSlot::Done(hit)) => assert!(Rc::ptr_eq(&hit, &value)),
            _ => panic!("expected a shared hit"),
        }
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_head_sensitive_value_is_per_head() {
        let mut map = HeadMap::default();
        map.set(TargetId(0), CacheSlot::Done(Rc::new(Value { sensitive: true })));
        assert!(map.get(TargetId(1)).is_none());
        assert!(matches!(map.get(TargetId(0)), Some(CacheSlot::Done(_))));
    }

    #[test]
    fn test_in_progress_is_visible() {
        let mut map: HeadMap<Value> = HeadMap::default();
        map.set(TargetId(2), CacheSlot::InProgress);
        assert!(matches!(map.get(TargetId(2)), Some(CacheSlot::InProgress)));
    }
}

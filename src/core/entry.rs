//! Raw list-valued property fragments.
//!
//! Each target keeps one ordered list of unevaluated fragments per usage
//! requirement. Fragments remember where they came from so diagnostics can
//! point at the declaration and name the dependency that contributed them.

use std::fmt;

use crate::core::property::Prop;
use crate::core::target::TargetId;
use crate::util::diagnostic::Backtrace;

/// Where an entry's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Authored on the target itself.
    Direct,
    /// Synthesized from a dependency's `INTERFACE_*` property.
    Inherited {
        from: TargetId,
        /// The dependency is an imported target.
        imported: bool,
        /// The link item that pulled the dependency in came from an expression.
        from_genex: bool,
    },
}

impl Provenance {
    pub fn dependency(&self) -> Option<TargetId> {
        match self {
            Provenance::Direct => None,
            Provenance::Inherited { from, .. } => Some(*from),
        }
    }

    pub fn is_inherited(&self) -> bool {
        matches!(self, Provenance::Inherited { .. })
    }
}

/// One unevaluated fragment of a list-valued property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    pub text: String,
    pub backtrace: Backtrace,
    pub provenance: Provenance,
}

impl PropertyEntry {
    pub fn direct(text: impl Into<String>, backtrace: Backtrace) -> Self {
        PropertyEntry {
            text: text.into(),
            backtrace,
            provenance: Provenance::Direct,
        }
    }

    pub fn inherited(
        text: impl Into<String>,
        backtrace: Backtrace,
        from: TargetId,
        imported: bool,
        from_genex: bool,
    ) -> Self {
        PropertyEntry {
            text: text.into(),
            backtrace,
            provenance: Provenance::Inherited {
                from,
                imported,
                from_genex,
            },
        }
    }
}

/// The usage requirements stored as entry lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    IncludeDirectories,
    CompileOptions,
    CompileFeatures,
    CompileDefinitions,
    Sources,
    LinkLibraries,
}

impl EntryKind {
    pub const ALL: [EntryKind; 6] = [
        EntryKind::IncludeDirectories,
        EntryKind::CompileOptions,
        EntryKind::CompileFeatures,
        EntryKind::CompileDefinitions,
        EntryKind::Sources,
        EntryKind::LinkLibraries,
    ];

    pub fn prop(&self) -> Prop {
        match self {
            EntryKind::IncludeDirectories => Prop::IncludeDirectories,
            EntryKind::CompileOptions => Prop::CompileOptions,
            EntryKind::CompileFeatures => Prop::CompileFeatures,
            EntryKind::CompileDefinitions => Prop::CompileDefinitions,
            EntryKind::Sources => Prop::Sources,
            EntryKind::LinkLibraries => Prop::LinkLibraries,
        }
    }

    pub fn from_prop(prop: Prop) -> Option<EntryKind> {
        EntryKind::ALL.into_iter().find(|kind| kind.prop() == prop)
    }

    /// Short label used in debug logging.
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::IncludeDirectories => "include directories",
            EntryKind::CompileOptions => "compile options",
            EntryKind::CompileFeatures => "compile features",
            EntryKind::CompileDefinitions => "compile definitions",
            EntryKind::Sources => "sources",
            EntryKind::LinkLibraries => "link libraries",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prop().name())
    }
}

/// Per-target storage of raw entries, one list per [`EntryKind`].
#[derive(Debug, Clone, Default)]
pub struct PropertyEntryStore {
    lists: [Vec<PropertyEntry>; 6],
}

impl PropertyEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(kind: EntryKind) -> usize {
        kind as usize
    }

    pub fn entries(&self, kind: EntryKind) -> &[PropertyEntry] {
        &self.lists[Self::index(kind)]
    }

    pub fn push(&mut self, kind: EntryKind, entry: PropertyEntry) {
        self.lists[Self::index(kind)].push(entry);
    }

    /// The raw fragments joined the way a property read sees them.
    pub fn raw_value(&self, kind: EntryKind) -> Option<String> {
        let entries = self.entries(kind);
        if entries.is_empty() {
            return None;
        }
        Some(
            entries
                .iter()
                .map(|e| e.text.as_str())
                .collect::<Vec<_>>()
                .join(";"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_kept_per_kind_in_order() {
        let mut store = PropertyEntryStore::new();
        store.push(
            EntryKind::CompileDefinitions,
            PropertyEntry::direct("A", Backtrace::empty()),
        );
        store.push(
            EntryKind::CompileDefinitions,
            PropertyEntry::direct("B;C", Backtrace::empty()),
        );
        store.push(
            EntryKind::Sources,
            PropertyEntry::direct("main.c", Backtrace::empty()),
        );

        assert_eq!(store.entries(EntryKind::CompileDefinitions).len(), 2);
        assert_eq!(
            store.raw_value(EntryKind::CompileDefinitions).as_deref(),
            Some("A;B;C")
        );
        assert_eq!(store.raw_value(EntryKind::CompileOptions), None);
    }

    #[test]
    fn test_entry_kind_prop_mapping() {
        for kind in EntryKind::ALL {
            assert_eq!(EntryKind::from_prop(kind.prop()), Some(kind));
        }
        assert_eq!(EntryKind::from_prop(Prop::OutputName), None);
    }
}

//! Source dependency tracing.
//!
//! Starting from a target's sources and build-event commands, follow every
//! file that some custom command generates: through `OBJECT_DEPENDS`, the
//! source's own path, programmatic depends and the depends of custom
//! commands. Generated files not yet listed become new sources of the
//! target; executables named by commands become utility dependencies.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;

use crate::core::entry::{EntryKind, PropertyEntry};
use crate::core::{ConfigId, CustomCommand, TargetId, TargetKind};
use crate::genex::EvalContext;
use crate::util::InternedString;

use super::link_impl::LinkItem;
use super::properties::is_full_path;
use super::Engine;

/// What tracing found for one target.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceSummary {
    /// Generated files each source depends on
    pub source_depends: BTreeMap<PathBuf, Vec<PathBuf>>,
    /// Targets that must be built before this one
    pub utilities: BTreeSet<String>,
    /// Generated files that were added to the target's sources
    pub new_sources: Vec<PathBuf>,
}

struct Tracer<'e> {
    engine: &'e Engine,
    id: TargetId,
    queue: VecDeque<PathBuf>,
    queued: HashSet<PathBuf>,
    current: Option<PathBuf>,
    seeding: bool,
    summary: TraceSummary,
}

impl<'e> Tracer<'e> {
    fn new(engine: &'e Engine, id: TargetId) -> Self {
        Tracer {
            engine,
            id,
            queue: VecDeque::new(),
            queued: HashSet::new(),
            current: None,
            seeding: true,
            summary: TraceSummary::default(),
        }
    }

    fn run(mut self) -> TraceSummary {
        let engine = self.engine;
        let target = engine.target(self.id);

        for config in engine.project.configurations() {
            for source in engine.sources(self.id, &config).iter() {
                self.queue_source(source.clone());
            }
        }
        for command in target
            .pre_build
            .iter()
            .chain(&target.pre_link)
            .chain(&target.post_build)
        {
            self.check_custom_command(command);
        }
        self.seeding = false;

        while let Some(path) = self.queue.pop_front() {
            tracing::debug!("tracing `{}`", path.display());
            self.current = Some(path.clone());

            let source = engine.project.source(&path);
            if let Some(source) = source {
                for dep in &source.object_depends {
                    self.follow_name(Path::new(dep));
                }
            }

            self.follow_name(&path);

            if let Some(source) = source {
                for dep in &source.depends {
                    self.follow_name(dep);
                }
                if let Some(command) = &source.command {
                    self.check_custom_command(command);
                }
            }
        }

        self.summary
    }

    fn queue_source(&mut self, path: PathBuf) {
        if !self.queued.insert(path.clone()) {
            return;
        }
        if !self.seeding {
            self.summary.new_sources.push(path.clone());
        }
        self.queue.push_back(path);
    }

    /// Queue the source whose command generates `name`, if any.
    fn follow_name(&mut self, name: &Path) {
        let Some(generator) = self.engine.project.source_with_output(name) else {
            return;
        };
        let generator = generator.path.clone();
        if let Some(current) = &self.current {
            if *current != generator {
                self.summary
                    .source_depends
                    .entry(current.clone())
                    .or_default()
                    .push(generator.clone());
            }
        }
        self.queue_source(generator);
    }

    fn check_custom_command(&mut self, command: &CustomCommand) {
        let engine = self.engine;
        let no_config = ConfigId::none();

        for line in &command.command {
            let Some(program) = line.first() else {
                continue;
            };
            if let Some(tool) = engine.find_target(program) {
                if engine.target(tool).kind == TargetKind::Executable {
                    self.summary.utilities.insert(engine.target(tool).name.to_string());
                }
            }
            // The program itself may be an expression such as `$<TARGET_FILE:tool>`.
            for fragment in line {
                let ctx = EvalContext::new(no_config, self.id, self.id, &command.backtrace);
                let evaluation = engine.evaluate(fragment, &ctx);
                for referenced in evaluation.targets {
                    self.summary
                        .utilities
                        .insert(engine.target(referenced).name.to_string());
                }
            }
        }

        let binary_dir = engine.target(self.id).binary_dir.clone();
        let mut emitted = BTreeSet::new();
        for config in engine.project.configurations() {
            for dep in &command.depends {
                let ctx = EvalContext::new(config, self.id, self.id, &command.backtrace);
                emitted.extend(engine.evaluate(dep, &ctx).values);
            }
        }
        for dep in emitted {
            if self.is_utility(&dep) {
                continue;
            }
            let path = if is_full_path(&dep) {
                PathBuf::from(dep)
            } else {
                binary_dir.join(dep)
            };
            self.follow_name(&path);
        }
    }

    /// Whether a command dependency names a target rather than a file.
    ///
    /// A bare name (`.exe` stripped) naming a target is a utility. A full
    /// path only counts when it points into that target's output directory.
    fn is_utility(&mut self, dep: &str) -> bool {
        let engine = self.engine;
        let file_name = Path::new(dep)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(dep);
        let util = match file_name.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case("exe") => stem,
            _ => file_name,
        };

        let Some(tool) = engine.find_target(util) else {
            return false;
        };

        if is_full_path(dep) {
            let tool_target = engine.target(tool);
            if !tool_target.kind.is_executable_like() || tool_target.imported {
                return false;
            }
            let artifact = tool_target
                .kind
                .artifact(engine.project.settings.is_dll_platform(), false);
            let tool_dir = engine.output_directory(tool, &ConfigId::none(), artifact);
            let dep_dir = Path::new(dep).parent().map(super::output::normalize_path);
            if dep_dir.as_deref() != Some(tool_dir.as_path()) {
                return false;
            }
        }

        self.summary.utilities.insert(util.to_string());
        true
    }
}

impl Engine {
    /// Trace the generated-file dependencies of `id`.
    ///
    /// Newly found generated sources are appended to the target and every
    /// cached value derived from its sources is dropped. Tracing twice
    /// returns the first result.
    pub fn trace_dependencies(&mut self, id: TargetId) -> Rc<TraceSummary> {
        if let Some(done) = &self.cache(id).trace {
            return Rc::clone(done);
        }

        let summary = Tracer::new(self, id).run();
        tracing::debug!(
            "traced `{}`: {} new sources, {} utilities",
            self.target(id).name,
            summary.new_sources.len(),
            summary.utilities.len()
        );

        let target = self.project.target_mut(id);
        if !summary.new_sources.is_empty() {
            let joined = summary
                .new_sources
                .iter()
                .map(|p| p.to_string_lossy())
                .collect::<Vec<_>>()
                .join(";");
            let backtrace = target.backtrace.push(format!("{}.traced-sources", target.name));
            target
                .entries
                .push(EntryKind::Sources, PropertyEntry::direct(joined, backtrace));
        }
        target
            .utilities
            .extend(summary.utilities.iter().map(InternedString::new));

        let summary = Rc::new(summary);
        if !summary.new_sources.is_empty() {
            // Link closures of dependents carry the languages of this target.
            for cache in &mut self.caches {
                cache.link_closure.get_mut().clear();
            }
        }
        let cache = self.cache_mut(id);
        cache.invalidate_sources();
        cache.trace = Some(Rc::clone(&summary));
        summary
    }

    /// Generated files `path` depends on, as found by the last trace of `id`.
    pub fn source_depends(&self, id: TargetId, path: &Path) -> Vec<PathBuf> {
        self.cache(id)
            .trace
            .as_ref()
            .and_then(|trace| trace.source_depends.get(path).cloned())
            .unwrap_or_default()
    }

    /// Utility dependencies of `id` as link items, resolved where possible.
    pub fn utility_items(&self, id: TargetId) -> Vec<LinkItem> {
        let target = self.target(id);
        target
            .utilities
            .iter()
            .map(|name| LinkItem::new(name.as_str(), self.project.find_target(name), target.backtrace.clone()))
            .collect()
    }
}

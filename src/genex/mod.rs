//! Generator expressions.
//!
//! Property fragments may contain `$<...>` expressions whose value depends on
//! the configuration being resolved, the *head* target asking for the value
//! and the *current* target that owns the property. The resolvers consume an
//! [`ExpressionEvaluator`] through this module's traits and know nothing of
//! the grammar; [`GenexEvaluator`] is the evaluator keel ships with.
//!
//! The evaluator reaches back into the project through [`ExpressionHost`],
//! which the engine implements. Property-reference cycles are caught by the
//! [`DagChecker`] threaded through every nested evaluation.

pub mod dag;
pub mod eval;
pub mod parser;

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::core::{ConfigId, Prop, TargetId, TargetKind};
use crate::util::diagnostic::{Backtrace, Diagnostic};
use crate::util::InternedString;

pub use dag::{DagChecker, DagStatus};
pub use eval::GenexEvaluator;

/// Everything an evaluation depends on.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub config: ConfigId,
    /// Target whose perspective the value is computed from
    pub head: TargetId,
    /// Target that owns the fragment
    pub current: TargetId,
    /// Compile language, for per-language usage requirements
    pub language: Option<&'a str>,
    pub dag: Option<&'a DagChecker<'a>>,
    /// Evaluating usage requirements only: `$<LINK_ONLY:...>` is dropped
    pub usage_requirements_only: bool,
    pub backtrace: &'a Backtrace,
}

impl<'a> EvalContext<'a> {
    pub fn new(config: ConfigId, head: TargetId, current: TargetId, backtrace: &'a Backtrace) -> Self {
        EvalContext {
            config,
            head,
            current,
            language: None,
            dag: None,
            usage_requirements_only: false,
            backtrace,
        }
    }

    pub fn with_dag(mut self, dag: &'a DagChecker<'a>) -> Self {
        self.dag = Some(dag);
        self
    }

    pub fn with_language(mut self, language: Option<&'a str>) -> Self {
        self.language = language;
        self
    }

    pub fn usage_requirements_only(mut self, only: bool) -> Self {
        self.usage_requirements_only = only;
        self
    }
}

/// Result of evaluating one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Flattened list value
    pub values: Vec<String>,
    /// The value depends on the configuration or other context
    pub context_sensitive: bool,
    /// The value depends on which head target asked
    pub head_sensitive: bool,
    /// Targets the expression referred to
    pub targets: BTreeSet<TargetId>,
    /// Target property names read during evaluation
    pub seen_properties: BTreeSet<String>,
    /// An error was reported and the value is empty
    pub had_error: bool,
}

/// Project access needed while evaluating.
pub trait ExpressionHost {
    fn find_target(&self, name: &str) -> Option<TargetId>;

    fn target_name(&self, id: TargetId) -> InternedString;

    fn target_kind(&self, id: TargetId) -> TargetKind;

    /// Raw, unevaluated value of a property.
    fn raw_property(&self, id: TargetId, prop: Prop, config: &ConfigId) -> Option<String>;

    /// Targets in `id`'s usage-requirements link interface as seen by `head`.
    fn usage_interface_libraries(&self, id: TargetId, config: &ConfigId, head: TargetId) -> Vec<TargetId>;

    /// Agreed value of a compatible interface property, if `name` is one for `id`.
    fn compatible_value(&self, id: TargetId, name: &str, config: &ConfigId) -> Option<String>;

    fn linker_language(&self, id: TargetId, config: &ConfigId) -> String;

    fn target_file(&self, id: TargetId, config: &ConfigId) -> Option<PathBuf>;

    fn report(&self, diagnostic: Diagnostic);
}

/// Evaluates fragments against a context.
pub trait ExpressionEvaluator {
    fn evaluate(&self, host: &dyn ExpressionHost, fragment: &str, ctx: &EvalContext<'_>) -> Evaluation;
}

/// Whether `text` contains an expression at all.
pub fn has_genex(text: &str) -> bool {
    text.contains("$<")
}

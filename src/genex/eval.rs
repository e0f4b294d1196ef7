//! The bundled expression evaluator.

use crate::core::property::{expand_list, is_off, parse_integer};
use crate::core::{Prop, TargetId};
use crate::util::diagnostic::Diagnostic;

use super::dag::{DagChecker, DagStatus};
use super::parser::{parse, Node};
use super::{EvalContext, Evaluation, ExpressionEvaluator, ExpressionHost};

/// Evaluator for the expression subset keel supports.
///
/// Supported forms:
/// - logic: `0`, `1`, `BOOL`, `NOT`, `AND`, `OR`, `STREQUAL`, `EQUAL`
/// - context: `CONFIG`, `COMPILE_LANGUAGE`
/// - targets: `TARGET_PROPERTY`, `TARGET_FILE`, `TARGET_FILE_DIR`,
///   `TARGET_FILE_NAME`, `TARGET_NAME`
/// - usage: `LINK_ONLY`, `BUILD_INTERFACE`, `INSTALL_INTERFACE`
/// - text: `LOWER_CASE`, `UPPER_CASE`, `COMMA`, `SEMICOLON`, `ANGLE-R`
#[derive(Debug, Clone, Copy, Default)]
pub struct GenexEvaluator;

impl ExpressionEvaluator for GenexEvaluator {
    fn evaluate(&self, host: &dyn ExpressionHost, fragment: &str, ctx: &EvalContext<'_>) -> Evaluation {
        if !super::has_genex(fragment) {
            return Evaluation {
                values: expand_list(fragment),
                ..Default::default()
            };
        }

        let mut run = Run {
            host,
            fragment,
            result: Evaluation::default(),
        };
        let nodes = parse(fragment);
        let text = run.nodes(&nodes, ctx);

        let mut result = run.result;
        if !result.had_error {
            result.values = expand_list(&text);
        }
        result
    }
}

/// State of one top-level evaluation.
struct Run<'h> {
    host: &'h dyn ExpressionHost,
    fragment: &'h str,
    result: Evaluation,
}

/// Expressions whose parameters form one free-text value.
fn accepts_arbitrary_content(name: &str) -> bool {
    matches!(
        name,
        "0" | "1" | "BUILD_INTERFACE" | "INSTALL_INTERFACE" | "LINK_ONLY"
    )
}

impl Run<'_> {
    fn error(&mut self, ctx: &EvalContext<'_>, message: impl Into<String>) -> String {
        if !self.result.had_error {
            self.result.had_error = true;
            self.host.report(
                Diagnostic::error(format!(
                    "Error evaluating generator expression:\n  {}\n{}",
                    self.fragment,
                    message.into()
                ))
                .with_code("keel::genex::invalid")
                .with_backtrace(ctx.backtrace.clone()),
            );
        }
        String::new()
    }

    fn nodes(&mut self, nodes: &[Node], ctx: &EvalContext<'_>) -> String {
        let mut out = String::new();
        for node in nodes {
            if self.result.had_error {
                break;
            }
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Expr { identifier, params } => {
                    let value = self.expression(identifier, params.as_deref(), ctx);
                    out.push_str(&value);
                }
            }
        }
        out
    }

    fn expression(&mut self, identifier: &[Node], params: Option<&[Vec<Node>]>, ctx: &EvalContext<'_>) -> String {
        let name = self.nodes(identifier, ctx);
        if self.result.had_error {
            return String::new();
        }

        if accepts_arbitrary_content(&name) {
            let Some(params) = params else {
                return self.error(ctx, format!("$<{}> expression requires a parameter.", name));
            };
            return match name.as_str() {
                "0" | "INSTALL_INTERFACE" => String::new(),
                "LINK_ONLY" if ctx.usage_requirements_only => String::new(),
                _ => {
                    let parts: Vec<String> = params.iter().map(|p| self.nodes(p, ctx)).collect();
                    parts.join(",")
                }
            };
        }

        let args: Vec<String> = match params {
            Some(params) => params.iter().map(|p| self.nodes(p, ctx)).collect(),
            None => Vec::new(),
        };
        if self.result.had_error {
            return String::new();
        }
        let has_params = params.is_some();

        match name.as_str() {
            "COMMA" if !has_params => ",".to_string(),
            "SEMICOLON" if !has_params => ";".to_string(),
            "ANGLE-R" if !has_params => ">".to_string(),
            "BOOL" => match args.as_slice() {
                [value] => bool_str(!is_off(value)),
                _ => self.exactly_one(ctx, &name),
            },
            "NOT" => match args.as_slice() {
                [value] => match value.as_str() {
                    "0" => "1".to_string(),
                    "1" => "0".to_string(),
                    _ => self.error(
                        ctx,
                        "$<NOT> parameter must resolve to exactly one '0' or '1' value.",
                    ),
                },
                _ => self.exactly_one(ctx, &name),
            },
            "AND" | "OR" => self.logic(ctx, &name, &args),
            "STREQUAL" => match args.as_slice() {
                [a, b] => bool_str(a == b),
                _ => self.error(ctx, "$<STREQUAL> expression requires 2 comma separated parameters."),
            },
            "EQUAL" => match args.as_slice() {
                [a, b] => match (parse_integer(a), parse_integer(b)) {
                    (Some(x), Some(y)) => bool_str(x == y),
                    _ => self.error(ctx, "$<EQUAL> parameters must be valid integers."),
                },
                _ => self.error(ctx, "$<EQUAL> expression requires 2 comma separated parameters."),
            },
            "CONFIG" => {
                self.result.context_sensitive = true;
                match args.as_slice() {
                    [] if !has_params => ctx.config.name().to_string(),
                    [wanted] => bool_str(ctx.config.matches(wanted)),
                    _ => self.exactly_one(ctx, &name),
                }
            }
            "COMPILE_LANGUAGE" => {
                self.result.context_sensitive = true;
                let language = ctx.language.unwrap_or("");
                match args.as_slice() {
                    [] if !has_params => language.to_string(),
                    [wanted] => bool_str(!language.is_empty() && language == wanted),
                    _ => self.exactly_one(ctx, &name),
                }
            }
            "LOWER_CASE" | "UPPER_CASE" => match args.as_slice() {
                [value] if name == "LOWER_CASE" => value.to_lowercase(),
                [value] => value.to_uppercase(),
                _ => self.exactly_one(ctx, &name),
            },
            "TARGET_NAME" => match args.as_slice() {
                [value] => value.clone(),
                _ => self.exactly_one(ctx, &name),
            },
            "TARGET_FILE" | "TARGET_FILE_DIR" | "TARGET_FILE_NAME" => self.target_file(ctx, &name, &args),
            "TARGET_PROPERTY" => self.target_property(ctx, &args),
            _ => self.error(
                ctx,
                "Expression did not evaluate to a known generator expression",
            ),
        }
    }

    fn exactly_one(&mut self, ctx: &EvalContext<'_>, name: &str) -> String {
        self.error(ctx, format!("$<{}> expression requires exactly one parameter.", name))
    }

    fn logic(&mut self, ctx: &EvalContext<'_>, name: &str, args: &[String]) -> String {
        if args.is_empty() {
            return self.error(ctx, format!("$<{}> expression requires at least one parameter.", name));
        }
        let mut bits = Vec::with_capacity(args.len());
        for arg in args {
            match arg.as_str() {
                "0" => bits.push(false),
                "1" => bits.push(true),
                _ => {
                    return self.error(
                        ctx,
                        format!("Parameters to $<{}> must resolve to either '0' or '1'.", name),
                    )
                }
            }
        }
        if name == "AND" {
            bool_str(bits.iter().all(|b| *b))
        } else {
            bool_str(bits.iter().any(|b| *b))
        }
    }

    fn lookup_target(&mut self, ctx: &EvalContext<'_>, name: &str) -> Option<TargetId> {
        if name.is_empty() {
            self.error(ctx, "Expression requires a non-empty target name.");
            return None;
        }
        match self.host.find_target(name) {
            Some(id) => Some(id),
            None => {
                self.error(ctx, format!("No target \"{}\"", name));
                None
            }
        }
    }

    fn target_file(&mut self, ctx: &EvalContext<'_>, name: &str, args: &[String]) -> String {
        let [target_name] = args else {
            return self.exactly_one(ctx, name);
        };
        let Some(target) = self.lookup_target(ctx, target_name) else {
            return String::new();
        };
        if !self.host.target_kind(target).is_executable_like() {
            return self.error(
                ctx,
                format!(
                    "Target \"{}\" is not an executable or library.",
                    target_name
                ),
            );
        }
        if let Some(dag) = ctx.dag {
            if dag.evaluating_link_libraries() {
                return self.error(
                    ctx,
                    "Expressions which require the linker language may not be used while evaluating link libraries",
                );
            }
        }

        self.result.context_sensitive = true;
        self.result.targets.insert(target);

        let Some(path) = self.host.target_file(target, &ctx.config) else {
            return String::new();
        };
        match name {
            "TARGET_FILE_DIR" => path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "TARGET_FILE_NAME" => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
            _ => path.to_string_lossy().into_owned(),
        }
    }

    fn target_property(&mut self, ctx: &EvalContext<'_>, args: &[String]) -> String {
        let (target, property) = match args {
            [property] => {
                self.result.head_sensitive = true;
                (ctx.head, property.as_str())
            }
            [target_name, property] => match self.lookup_target(ctx, target_name) {
                Some(id) => (id, property.as_str()),
                None => return String::new(),
            },
            _ => {
                return self.error(
                    ctx,
                    "$<TARGET_PROPERTY:...> expression requires one or two parameters",
                )
            }
        };
        if property.is_empty() {
            return self.error(
                ctx,
                "$<TARGET_PROPERTY:...> expression requires a non-empty property name.",
            );
        }

        self.result.targets.insert(target);
        self.result.seen_properties.insert(property.to_string());

        match property {
            "NAME" => return self.host.target_name(target).to_string(),
            "TYPE" => return self.host.target_kind(target).name().to_string(),
            _ => {}
        }

        let prop = Prop::from_name(property);
        let root;
        let dag = match ctx.dag {
            Some(parent) => parent.child(target, prop),
            None => {
                root = DagChecker::root(ctx.current, Prop::custom("TARGET_PROPERTY"));
                root.child(target, prop)
            }
        };
        match dag.check() {
            DagStatus::Dag => {}
            DagStatus::SelfReference => {
                return self.error(
                    ctx,
                    format!(
                        "Self reference on target \"{}\".",
                        self.host.target_name(target)
                    ),
                )
            }
            DagStatus::CyclicReference | DagStatus::AlreadySeen => return String::new(),
        }

        self.read_property(ctx, target, prop, &dag)
    }

    fn read_property(&mut self, ctx: &EvalContext<'_>, target: TargetId, prop: Prop, dag: &DagChecker<'_>) -> String {
        let in_link_libraries = dag.evaluating_link_libraries();

        if prop == Prop::LinkerLanguage && self.host.raw_property(target, prop, &ctx.config).is_none() {
            if in_link_libraries {
                return self.error(
                    ctx,
                    "LINKER_LANGUAGE target property can not be used while evaluating link libraries",
                );
            }
            return self.host.linker_language(target, &ctx.config);
        }

        let raw = self.host.raw_property(target, prop, &ctx.config);

        if raw.is_none() && !prop.is_transitive_usage_requirement() {
            if let Some(value) = self.host.compatible_value(target, prop.name(), &ctx.config) {
                self.result.context_sensitive = true;
                return value;
            }
        }

        let nested = EvalContext {
            current: target,
            dag: Some(dag),
            ..*ctx
        };

        let mut value = match raw {
            Some(text) if super::has_genex(&text) => {
                let nodes = parse(&text);
                self.nodes(&nodes, &nested)
            }
            Some(text) => text,
            None => String::new(),
        };

        if prop.is_transitive_usage_requirement() && !in_link_libraries {
            for dep in self
                .host
                .usage_interface_libraries(target, &ctx.config, ctx.head)
            {
                if dep == target || self.result.had_error {
                    continue;
                }
                self.result.targets.insert(dep);
                let child = dag.child(dep, prop);
                let part = match child.check() {
                    DagStatus::Dag => self.read_property(&nested, dep, prop, &child),
                    DagStatus::SelfReference => self.error(
                        ctx,
                        format!("Self reference on target \"{}\".", self.host.target_name(dep)),
                    ),
                    DagStatus::CyclicReference | DagStatus::AlreadySeen => String::new(),
                };
                if !part.is_empty() {
                    if !value.is_empty() {
                        value.push(';');
                    }
                    value.push_str(&part);
                }
            }
        }

        value
    }
}

fn bool_str(b: bool) -> String {
    if b { "1" } else { "0" }.to_string()
}

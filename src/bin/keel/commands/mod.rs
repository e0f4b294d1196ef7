//! Command implementations

pub mod check;
pub mod closure;
pub mod graph;
pub mod link;
pub mod properties;
pub mod targets;
pub mod trace;

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Result};
use serde::Serialize;

use keel::core::{ConfigId, PolicyMap, TargetId};
use keel::generator::Engine;
use keel::manifest::Manifest;
use keel::util::config::{global_config_path, load_config, project_config_path};
use keel::util::diagnostic::{emit, Diagnostic, DiagnosticSink, Severity};

/// Prints diagnostics as they are reported and counts them.
#[derive(Debug, Default)]
pub struct ReportingSink {
    color: bool,
    errors: Cell<usize>,
    warnings: Cell<usize>,
}

impl ReportingSink {
    pub fn new(color: bool) -> Self {
        ReportingSink {
            color,
            ..Default::default()
        }
    }

    pub fn errors(&self) -> usize {
        self.errors.get()
    }

    pub fn warnings(&self) -> usize {
        self.warnings.get()
    }
}

impl DiagnosticSink for ReportingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.errors.set(self.errors.get() + 1),
            Severity::Warning => self.warnings.set(self.warnings.get() + 1),
            Severity::Note => {}
        }
        emit(&diagnostic, self.color);
    }
}

/// A loaded project and the engine resolving it.
pub struct Session {
    pub engine: Engine,
    pub sink: Rc<ReportingSink>,
}

impl Session {
    /// Load `Keel.toml` and the merged configuration.
    pub fn open(manifest_path: Option<&Path>, color: bool) -> Result<Self> {
        let manifest = match manifest_path {
            Some(path) => Manifest::load(path)?,
            None => {
                let cwd = std::env::current_dir()?;
                Manifest::discover(&cwd).map_err(|e| {
                    anyhow::anyhow!(
                        "{:#}\n\
                         help: Pass --manifest-path or run keel from the project directory",
                        e
                    )
                })?
            }
        };

        let config = load_config(
            global_config_path().as_deref(),
            &project_config_path(&manifest.root),
        );

        // The description's own policies override configured defaults.
        let mut policies: PolicyMap = config.policies.clone();
        policies.merge(&manifest.policies);

        let sink = Rc::new(ReportingSink::new(color));
        let engine = Engine::new(manifest.project, policies, Rc::clone(&sink)).with_config(config);

        Ok(Session { engine, sink })
    }

    /// Look up a target by name or alias.
    pub fn target(&self, name: &str) -> Result<TargetId> {
        self.engine.find_target(name).ok_or_else(|| {
            anyhow::anyhow!(
                "target `{}` not found\n\
                 help: Run `keel targets` to see available targets",
                name
            )
        })
    }

    /// The configuration named on the command line, or the first one.
    pub fn config(&self, name: Option<&str>) -> Result<ConfigId> {
        let configs = self.engine.project().configurations();
        match name {
            None => Ok(configs.first().copied().unwrap_or_default()),
            Some(name) => {
                let config = ConfigId::new(name);
                if self.engine.project().settings.configurations.is_empty() || configs.contains(&config) {
                    Ok(config)
                } else {
                    let known: Vec<&str> = configs.iter().map(|c| c.name()).collect();
                    bail!(
                        "unknown configuration `{}`\n\
                         help: The project defines: {}",
                        name,
                        known.join(", ")
                    )
                }
            }
        }
    }

    /// Fail when any error was reported during the run.
    pub fn finish(&self) -> Result<()> {
        match self.sink.errors() {
            0 => Ok(()),
            1 => bail!("resolution reported 1 error"),
            n => bail!("resolution reported {} errors", n),
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

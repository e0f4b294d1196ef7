//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod interning;

pub use config::Config;
pub use diagnostic::{Backtrace, CollectingSink, Diagnostic, DiagnosticSink, Severity};
pub use interning::InternedString;

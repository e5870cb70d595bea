//! Rendering of type errors for tools and terminals.
//!
//! `Diagnostic` is the plain, serializable form of a `TypeError`;
//! `render_diagnostic` draws one error against its source text with
//! ariadne. Output is colorless so it can be compared in tests.

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use quill_common::span::{LineIndex, Span};
use serde::Serialize;

use crate::error::{Severity, TypeError};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    /// 1-based, when the source text was available.
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn from_error(error: &TypeError) -> Self {
        Diagnostic {
            code: error.code(),
            severity: error.severity(),
            message: error.to_string(),
            span: error.span(),
            line: None,
            column: None,
        }
    }

    /// Fill in the line and column of the span start.
    pub fn with_position(mut self, index: &LineIndex) -> Self {
        let (line, column) = index.line_col(self.span.start);
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

/// Diagnostics for `errors` in order, positioned against `source`.
pub fn to_diagnostics(errors: &[TypeError], source: &str) -> Vec<Diagnostic> {
    let index = LineIndex::new(source);
    errors
        .iter()
        .map(|e| Diagnostic::from_error(e).with_position(&index))
        .collect()
}

/// A JSON array of `diagnostics`.
pub fn render_json(diagnostics: &[Diagnostic]) -> String {
    serde_json::to_string_pretty(diagnostics).expect("diagnostics serialize to JSON")
}

fn label_message(error: &TypeError) -> String {
    match error {
        TypeError::UndefinedPred { .. } | TypeError::UndefinedFunctor { .. } => "not defined here".to_string(),
        TypeError::UndefinedEvent { .. } => "no such event".to_string(),
        TypeError::EventArity { expected, .. } => format!("expected {} argument(s)", expected),
        TypeError::WrongVarType { var, .. } => format!("`{}` used with the wrong type", var),
        TypeError::WrongFunctorType { functor, .. } => format!("`{}` cannot have this type", functor),
        TypeError::WrongArgType { arg, .. } => format!("argument {} has the wrong type", arg),
        TypeError::OverloadingWarning { count, .. } | TypeError::TooMuchOverloading { count, .. } => {
            format!("{} possible typings here", count)
        }
        TypeError::Ambiguity { .. } => "types are ambiguous".to_string(),
        TypeError::InvalidFieldUpdate { field, .. } => format!("update of `{}`", field),
        TypeError::UnsatisfiableCoercion { .. } | TypeError::UndeterminedCoercion { .. } => {
            "coercion here".to_string()
        }
        TypeError::UnsatisfiedConstraint { .. } => "constraint arises here".to_string(),
    }
}

fn help(error: &TypeError) -> Option<&'static str> {
    match error {
        TypeError::OverloadingWarning { .. } | TypeError::TooMuchOverloading { .. } => {
            Some("add type declarations or module qualifiers to reduce overloading")
        }
        TypeError::Ambiguity { .. } => Some("add a type declaration or an explicit type qualification"),
        TypeError::UndeterminedCoercion { .. } => Some("give the coerced term a known type"),
        _ => None,
    }
}

/// Render `error` against `source` as a labeled report.
pub fn render_diagnostic(error: &TypeError, source: &str, _filename: &str) -> String {
    let config = Config::default().with_color(false);
    let range = error.span().to_range(source.len());
    let kind = match error.severity() {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let color = match error.severity() {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };

    let mut builder = Report::build(kind, range.clone())
        .with_code(error.code())
        .with_message(error.to_string())
        .with_config(config)
        .with_label(
            Label::new(range)
                .with_message(label_message(error))
                .with_color(color),
        );
    if let Some(help) = help(error) {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write(Source::from(source), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

//! Type errors and warnings.
//!
//! Errors are accumulated, never thrown: a failing goal prunes
//! hypotheses or rolls back to the set it started from, and checking
//! continues so one mistake does not hide the next. Types inside errors
//! are already rendered, since they only mean something relative to the
//! hypothesis they were found in.

use std::fmt;

use quill_common::span::Span;
use quill_common::sym::SymName;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A variable whose type differs between the surviving hypotheses.
#[derive(Clone, Debug, PartialEq)]
pub struct AmbiguousVar {
    pub name: String,
    pub types: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// A call names no predicate or function of that arity.
    UndefinedPred {
        name: SymName,
        arity: usize,
        span: Span,
    },
    /// A functor matches no constructor, field, function or predicate.
    UndefinedFunctor {
        name: SymName,
        arity: usize,
        span: Span,
    },
    UndefinedEvent {
        name: String,
        span: Span,
    },
    EventArity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },
    /// A variable's established type clashes with a required one.
    WrongVarType {
        var: String,
        actual: Vec<String>,
        expected: Vec<String>,
        span: Span,
    },
    /// `X = f(...)` where no type of `X` agrees with any type of `f`.
    WrongFunctorType {
        var: String,
        functor: String,
        var_types: Vec<String>,
        functor_types: Vec<String>,
        span: Span,
    },
    /// A call argument clashes with every candidate's declared type.
    WrongArgType {
        callee: String,
        arg: usize,
        var: String,
        actual: Vec<String>,
        expected: Vec<String>,
        span: Span,
    },
    OverloadingWarning {
        count: usize,
        symbols: Vec<String>,
        span: Span,
    },
    /// Checking of the offending goal was skipped.
    TooMuchOverloading {
        count: usize,
        symbols: Vec<String>,
        span: Span,
    },
    Ambiguity {
        pred: String,
        vars: Vec<AmbiguousVar>,
        span: Span,
    },
    InvalidFieldUpdate {
        field: String,
        cons: SymName,
        span: Span,
    },
    UnsatisfiableCoercion {
        from: String,
        to: String,
        span: Span,
    },
    UndeterminedCoercion {
        from: String,
        to: String,
        span: Span,
    },
    UnsatisfiedConstraint {
        constraint: String,
        span: Span,
    },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::UndefinedPred { span, .. }
            | TypeError::UndefinedFunctor { span, .. }
            | TypeError::UndefinedEvent { span, .. }
            | TypeError::EventArity { span, .. }
            | TypeError::WrongVarType { span, .. }
            | TypeError::WrongFunctorType { span, .. }
            | TypeError::WrongArgType { span, .. }
            | TypeError::OverloadingWarning { span, .. }
            | TypeError::TooMuchOverloading { span, .. }
            | TypeError::Ambiguity { span, .. }
            | TypeError::InvalidFieldUpdate { span, .. }
            | TypeError::UnsatisfiableCoercion { span, .. }
            | TypeError::UndeterminedCoercion { span, .. }
            | TypeError::UnsatisfiedConstraint { span, .. } => *span,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            TypeError::OverloadingWarning { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    /// Stable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::UndefinedPred { .. } => "E0001",
            TypeError::UndefinedFunctor { .. } => "E0002",
            TypeError::UndefinedEvent { .. } => "E0003",
            TypeError::EventArity { .. } => "E0004",
            TypeError::WrongVarType { .. } => "E0005",
            TypeError::WrongFunctorType { .. } => "E0006",
            TypeError::WrongArgType { .. } => "E0007",
            TypeError::TooMuchOverloading { .. } => "E0008",
            TypeError::Ambiguity { .. } => "E0009",
            TypeError::InvalidFieldUpdate { .. } => "E0010",
            TypeError::UnsatisfiableCoercion { .. } => "E0011",
            TypeError::UndeterminedCoercion { .. } => "E0012",
            TypeError::UnsatisfiedConstraint { .. } => "E0013",
            TypeError::OverloadingWarning { .. } => "W0001",
        }
    }
}

/// `` `int` `` or `` one of `int`, `float` ``.
fn types(tys: &[String]) -> String {
    match tys {
        [one] => format!("`{}`", one),
        _ => {
            let quoted: Vec<String> = tys.iter().map(|t| format!("`{}`", t)).collect();
            format!("one of {}", quoted.join(", "))
        }
    }
}

fn symbols(syms: &[String]) -> String {
    syms.iter()
        .map(|s| format!("`{}`", s))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::UndefinedPred { name, arity, .. } => {
                write!(f, "undefined predicate or function `{}/{}`", name, arity)
            }
            TypeError::UndefinedFunctor { name, arity, .. } => {
                write!(f, "undefined symbol `{}/{}`", name, arity)
            }
            TypeError::UndefinedEvent { name, .. } => {
                write!(f, "undefined event `{}`", name)
            }
            TypeError::EventArity {
                name,
                expected,
                found,
                ..
            } => write!(
                f,
                "event `{}` expects {} argument(s), found {}",
                name, expected, found
            ),
            TypeError::WrongVarType {
                var,
                actual,
                expected,
                ..
            } => write!(
                f,
                "type error: variable `{}` has type {}, expected {}",
                var,
                types(actual),
                types(expected)
            ),
            TypeError::WrongFunctorType {
                var,
                functor,
                var_types,
                functor_types,
                ..
            } => write!(
                f,
                "type error in unification of `{}` and `{}`: `{}` has type {}, `{}` has type {}",
                var,
                functor,
                var,
                types(var_types),
                functor,
                types(functor_types)
            ),
            TypeError::WrongArgType {
                callee,
                arg,
                var,
                actual,
                expected,
                ..
            } => write!(
                f,
                "type error in argument {} of call to {}: `{}` has type {}, expected {}",
                arg,
                callee,
                var,
                types(actual),
                types(expected)
            ),
            TypeError::OverloadingWarning { count, symbols: s, .. } => write!(
                f,
                "highly ambiguous overloading ({} possible typings); overloaded symbols: {}",
                count,
                symbols(s)
            ),
            TypeError::TooMuchOverloading { count, symbols: s, .. } => write!(
                f,
                "too much overloading ({} possible typings), goal not checked; overloaded symbols: {}",
                count,
                symbols(s)
            ),
            TypeError::Ambiguity { pred, vars, .. } => {
                write!(f, "ambiguous overloading in {}", pred)?;
                for (i, v) in vars.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{}`{}` may have type {}", sep, v.name, types(&v.types))?;
                }
                Ok(())
            }
            TypeError::InvalidFieldUpdate { field, cons, .. } => write!(
                f,
                "invalid update of field `{}` of constructor `{}`: it shares an existentially quantified type with another field",
                field, cons
            ),
            TypeError::UnsatisfiableCoercion { from, to, .. } => {
                write!(f, "cannot coerce from `{}` to `{}`", from, to)
            }
            TypeError::UndeterminedCoercion { from, to, .. } => write!(
                f,
                "cannot decide coercion from `{}` to `{}`: types are not sufficiently known",
                from, to
            ),
            TypeError::UnsatisfiedConstraint { constraint, .. } => {
                write!(f, "unsatisfied typeclass constraint `{}`", constraint)
            }
        }
    }
}

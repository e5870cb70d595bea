//! Bound on the number of live hypotheses.

use quill_common::span::Span;
use tracing::debug;

use crate::config::TypeckOptions;
use crate::error::TypeError;
use crate::resolve::OverloadedSymbols;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    /// Pass the hypothesis set through the goal unchanged.
    Skip,
}

/// Watches the hypothesis count before each goal. Each threshold is
/// reported at most once per predicate.
#[derive(Clone, Debug)]
pub struct AmbiguityGuard {
    warn: usize,
    error: usize,
    warned: bool,
    errored: bool,
}

impl AmbiguityGuard {
    pub fn new(opts: &TypeckOptions) -> Self {
        AmbiguityGuard {
            warn: opts.warn_threshold,
            error: opts.error_threshold,
            warned: false,
            errored: false,
        }
    }

    pub fn check(
        &mut self,
        size: usize,
        span: Span,
        overloaded: &OverloadedSymbols,
        errors: &mut Vec<TypeError>,
    ) -> Verdict {
        if size > self.warn && !self.warned {
            self.warned = true;
            debug!(size, threshold = self.warn, "overloading warning threshold exceeded");
            errors.push(TypeError::OverloadingWarning {
                count: size,
                symbols: overloaded.keys().cloned().collect(),
                span,
            });
        }
        if size > self.error {
            if !self.errored {
                self.errored = true;
                debug!(size, threshold = self.error, "overloading error threshold exceeded");
                errors.push(TypeError::TooMuchOverloading {
                    count: size,
                    symbols: overloaded.keys().cloned().collect(),
                    span,
                });
            }
            return Verdict::Skip;
        }
        Verdict::Proceed
    }
}

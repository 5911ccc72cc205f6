//! Error catalog support
//!
//! An [`ErrDef`] is a static description of a business error category. It can build
//! problems directly, or be attached to a matcher so the resolver uses it for every
//! error that matcher accepts.

use crate::DynError;
use crate::context::RequestCtx;
use crate::factory::{DetailedProblemFactory, ProblemFactory, ProblemMatcher};
use crate::matcher::ErrorMatcher;
use crate::problem::Problem;

/// Static error definition from catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    /// Convert this error definition into a Problem with the given detail
    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        Problem::new(self.status, detail)
            .with_title(self.title)
            .with_code(self.code)
            .with_type(self.type_url)
    }

    /// Register this definition for every error accepted by `matcher`.
    ///
    /// The definition builds the whole problem, so it wins over any status the
    /// resolver would otherwise apply.
    pub fn matcher(self, matcher: impl ErrorMatcher + 'static) -> ProblemMatcher {
        ProblemMatcher::new(matcher).factory(self)
    }
}

impl ProblemFactory for ErrDef {
    fn new_problem(&self, ctx: &RequestCtx, err: &DynError) -> Problem {
        DetailedProblemFactory::annotate(ctx, self.as_problem(err.to_string()))
    }
}

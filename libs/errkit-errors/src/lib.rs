//! Core error types for the errkit framework
//!
//! This crate knows nothing about transports. It provides:
//! - RFC 9457 Problem Details (`Problem`)
//! - Error predicates (`ErrorMatcher`)
//! - The matcher-driven problem resolution engine (`ProblemResolver`)
//! - Error catalog support (`ErrDef`)
//! - Request metadata shared by every pipeline stage (`RequestCtx`)
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod config;
pub mod context;
pub mod factory;
pub mod matcher;
pub mod problem;

use std::error::Error;

/// Borrowed view of an opaque error as seen by matchers and factories.
pub type DynError = dyn Error + Send + Sync + 'static;

/// Owned opaque error returned by endpoints.
pub type BoxError = Box<DynError>;

// Re-export commonly used types
pub use catalog::ErrDef;
pub use config::{ConfigError, FallbackProblemConfig, ProblemsConfig};
pub use context::RequestCtx;
pub use factory::{
    DetailedProblemFactory, GENERIC_DETAIL, ProblemFactory, ProblemFactoryConfig, ProblemMatcher,
    ProblemResolver, StatusProblemFactory, problem_factory_fn, status_problem_factory_fn,
};
pub use matcher::{ErrorMatcher, ErrorMatcherFn, IsError, find_cause, is_error, matcher_fn};
pub use problem::{ABOUT_BLANK, APPLICATION_PROBLEM_JSON, APPLICATION_PROBLEM_XML, Problem};

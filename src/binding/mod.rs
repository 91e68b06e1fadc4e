//! Binding advice parameters to join point roles.
//!
//! An advice method declares parameters; a pointcut declares variables. Before the advice can
//! run, each parameter must be assigned a [`Role`]: the join point, its static part, a
//! pointcut variable, the return value or the raised failure. This module works that out once
//! per advice ([`ArgumentBinder::calculate_bindings`]) and then produces the argument vector for
//! every call ([`ArgumentBinder::bind`]).
//!
//! Parameter names come from the first source that can name them:
//!
//! 1. Names spelled out on the advice declaration ([`ArgNamesDiscoverer`])
//! 2. Names recorded on the advice method ([`DeclaredNamesDiscoverer`])
//! 3. The heuristic over the pointcut text ([`AdviceParameterNameDiscoverer`])
//!
//! The [`scanner`] helpers split pointcut text into the tokens the heuristic inspects.

mod binder;
mod chain;
mod discoverer;
pub mod scanner;

pub use binder::{ArgumentBinder, Role, RoleMap};
pub use chain::{
    ArgNamesDiscoverer, DeclaredNamesDiscoverer, ParameterNameDiscoverer, PrioritizedDiscoverer,
};
pub use discoverer::{
    AdviceParameterNameDiscoverer, BindingStage, THIS_JOIN_POINT, THIS_JOIN_POINT_STATIC_PART,
};
pub use scanner::DesignatorBody;

//! # aspectscope Prelude
//!
//! This module provides the types most interception setups need, so a single glob import
//! covers describing a program, declaring advice and running calls through it.
//!
//! ```rust
//! use aspectscope::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all aspectscope operations
pub use crate::Error;

/// The result type used throughout aspectscope
pub use crate::Result;

/// Engine switches for discovery strictness, fallback and prefiltering
pub use crate::AspectConfig;

// ================================================================================================
// Program Model
// ================================================================================================

/// Type registry, builders and tokens
pub use crate::model::{
    Builtin, LoaderId, MethodBuilder, MethodDescriptor, MethodId, MethodModifiers, TypeBuilder,
    TypeRegistry, TypeToken,
};

/// Runtime values passed through intercepted calls
pub use crate::model::{AnnotationInstance, Fault, Instance, Value};

// ================================================================================================
// Pointcuts
// ================================================================================================

pub use crate::pointcut::{
    CallContext, ExpressionPointcut, JoinPointMatch, NamedPointcut, PointcutLibrary, ShadowMatch,
};

// ================================================================================================
// Binding
// ================================================================================================

pub use crate::binding::{
    AdviceParameterNameDiscoverer, ArgumentBinder, ParameterNameDiscoverer, Role, RoleMap,
};

// ================================================================================================
// Advice
// ================================================================================================

/// Advice declaration and ordering
pub use crate::advice::{
    AdviceArg, AdviceBuilder, AdviceKind, Advisor, AdvisorChainFactory, AspectInstanceFactory,
    SingletonAspectInstanceFactory,
};

/// Call execution and the join point views handed to advice
pub use crate::advice::{JoinPoint, MethodInvocation, ProceedingJoinPoint, StaticPart, TargetFn};

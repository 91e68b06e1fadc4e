//! Pointcut expressions: parsing, compilation and matching.
//!
//! An expression such as `execution(* app..*Service.set*(..)) && args(value)` goes through
//! three stages before it can decide anything:
//!
//! - **Parsing** ([`parse`]) turns the text into a [`PointcutAst`]. Unsupported designators
//!   (`call`, `cflow`, ...) are rejected here.
//! - **Compilation** resolves type names against a code loading context, inlines named
//!   pointcut references from a [`PointcutLibrary`] and checks that every declared parameter
//!   is bound exactly once.
//! - **Matching** evaluates the compiled tree at three phases. Per type, as a prefilter. Per
//!   method, producing a cached [`ShadowMatch`] whose verdict is `Always`, `Never` or `Maybe`
//!   plus a [`Residue`] of runtime tests. Per call, where the residue is evaluated against the
//!   call's actual objects and the bound variables are captured into a [`CallContext`].
//!
//! [`ExpressionPointcut`] is the entry point that drives all of this.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use aspectscope::{
//!     config::AspectConfig,
//!     model::{Builtin, MethodBuilder, TypeBuilder, TypeRegistry, Value},
//!     pointcut::{CallContext, ExpressionPointcut},
//! };
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let service = TypeBuilder::class("app.Service").build(&registry)?;
//! let set_name = MethodBuilder::new(service, "setName")
//!     .param(Builtin::String.token())
//!     .build(&registry)?;
//!
//! let pointcut = ExpressionPointcut::new(registry.clone(), AspectConfig::default())
//!     .with_expression("execution(* set*(..)) && args(name)");
//! pointcut.set_parameters(&["name".to_string()], &[Builtin::String.token()])?;
//!
//! let mut context = CallContext::new();
//! assert!(pointcut.matches_at_runtime(set_name, service, &[Value::from("a")], &mut context)?);
//! let captured = context.join_point_match("execution(* set*(..)) && args(name)");
//! assert_eq!(captured.and_then(|m| m.value("name")), Some(&Value::from("a")));
//! # Ok::<(), aspectscope::Error>(())
//! ```

mod ast;
mod compiler;
mod context;
mod expression;
mod lexer;
mod library;
mod parser;
mod patterns;
mod residue;
mod shadow;

pub use ast::{DesignatorAst, DesignatorKind, MethodPatternAst, ModifierAst, PointcutAst};
pub use compiler::CompiledExpression;
pub use context::{CallContext, JoinPointMatch, PointcutParameter};
pub use expression::{BuildObserver, ExpressionPointcut};
pub use library::{NamedPointcut, PointcutLibrary};
pub use parser::parse;
pub use patterns::{MethodPattern, NamePattern, ParameterPattern, TypeNamePattern, TypePattern};
pub use residue::{
    bean_matches, Binding, BindingSource, FuzzyBool, Residue, Test, TestEnvironment, Var,
};
pub use shadow::{JoinPointView, MatchOutcome, ShadowMatch, Verdict};

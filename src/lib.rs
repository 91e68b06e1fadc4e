// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # aspectscope
//!
//! A concurrent engine for aspect-oriented call interception. `aspectscope` decides which
//! advice applies to a method call, works out how the advice's parameters map onto the call,
//! and runs the advice in the right shape around the call.
//!
//! ## Features
//!
//! - **Pointcut expressions** - `execution`, `within`, `this`, `target`, `args`, the
//!   `@`-annotation designators, `bean(..)` and named pointcut references, combined with
//!   `&&`, `||` and `!`
//! - **Shadow match cache** - One static match per method and target type, built once even
//!   under concurrent first calls
//! - **Loader fallback** - Expressions that can not resolve a type are retried against the
//!   target's code loading context
//! - **Parameter name discovery** - Advice parameters are named from the pointcut text when
//!   the author did not spell them out
//! - **Five advice shapes** - Before, after, after returning, after throwing and around
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use aspectscope::prelude::*;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let service = TypeBuilder::class("app.Service").build(&registry)?;
//! let aspect = TypeBuilder::class("app.Audit").build(&registry)?;
//! let set_name = MethodBuilder::new(service, "setName")
//!     .param(Builtin::String.token())
//!     .build(&registry)?;
//! let record = MethodBuilder::new(aspect, "record")
//!     .param(Builtin::String.token())
//!     .build(&registry)?;
//!
//! let pointcut = Arc::new(
//!     ExpressionPointcut::new(registry.clone(), AspectConfig::default())
//!         .with_expression("execution(* set*(..)) && args(name)")
//!         .with_scope(aspect),
//! );
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = seen.clone();
//! let factory = Arc::new(SingletonAspectInstanceFactory::new(Arc::new(Instance::new(aspect))));
//! let advice = AdviceBuilder::new(AdviceKind::Before, pointcut, record, factory, move |_, args| {
//!     log.lock().unwrap().push(args[0].value().cloned());
//!     Ok(Value::Void)
//! })
//! .build()?;
//!
//! let advisors = vec![Arc::new(Advisor::new(advice))];
//! let chain = AdvisorChainFactory::new(AspectConfig::default())
//!     .interceptors_for(&advisors, set_name, service, false)?;
//! let target: TargetFn = Arc::new(|_: &[Value]| Ok(Value::Void));
//! MethodInvocation::new(registry, set_name, service, vec![Value::from("a")], chain, target)?
//!     .proceed()?;
//!
//! assert_eq!(*seen.lock().unwrap(), vec![Some(Value::from("a"))]);
//! # Ok::<(), aspectscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`model`] - The reflective description of the intercepted program
//! - [`pointcut`] - Parsing, compiling and matching pointcut expressions
//! - [`binding`] - Naming advice parameters and binding them to call values
//! - [`advice`] - The advice shapes, advisor ordering and the interceptor chain
//! - [`config`] - Engine switches
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Misdeclared aspects surface as
//! [`Error::Configuration`], failures raised by intercepted code travel as [`Error::Thrown`].

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use aspectscope::prelude::*;
///
/// let registry = TypeRegistry::new();
/// let service = TypeBuilder::class("app.Service").build(&registry)?;
/// assert_eq!(registry.type_name(service), "app.Service");
/// # Ok::<(), aspectscope::Error>(())
/// ```
pub mod prelude;

/// Engine configuration
pub mod config;

/// Types, methods, loaders and runtime values of the intercepted program
///
/// Every other module resolves names and checks assignability through the
/// [`model::TypeRegistry`].
pub mod model;

/// Pointcut expressions and their matching
///
/// # Key Types
///
/// - [`pointcut::ExpressionPointcut`] - A pointcut with its compiled form and shadow cache
/// - [`pointcut::PointcutLibrary`] - Named pointcuts that expressions may reference
/// - [`pointcut::ShadowMatch`] - The cached static verdict for a method
pub mod pointcut;

/// Advice parameter naming and argument binding
pub mod binding;

/// Advice shapes, advisors and the interceptor chain
pub mod advice;

/// `aspectscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `aspectscope` Error type
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use aspectscope::{config::AspectConfig, model::TypeRegistry, pointcut::ExpressionPointcut, Error};
///
/// let pointcut = ExpressionPointcut::new(Arc::new(TypeRegistry::new()), AspectConfig::default())
///     .with_expression("execution(* *(..)");
/// match pointcut.obtain_compiled() {
///     Err(Error::Configuration { message, .. }) => println!("Bad pointcut: {message}"),
///     Err(e) => println!("Error: {e}"),
///     Ok(_) => {}
/// }
/// ```
pub use error::Error;

pub use config::AspectConfig;

//! Runtime type model.
//!
//! Pointcuts are matched against an explicit, reflective description of the program: types
//! with their hierarchy, annotations and defining loader, methods with their signatures, and
//! the runtime values passed through intercepted calls.
//!
//! # Key Components
//!
//! - [`TypeRegistry`] - Concurrent storage of all types, methods and loaders
//! - [`TypeInfo`] / [`MethodDescriptor`] - Type and method descriptors
//! - [`Builtin`] - The primitive and core types every registry starts with
//! - [`Value`] - Runtime values, including object instances and failures
//! - [`TypeBuilder`] / [`MethodBuilder`] - Fluent population of the registry

mod builder;
mod method;
mod registry;
mod token;
mod types;
mod value;

pub use builder::{MethodBuilder, TypeBuilder};
pub use method::{MethodDescriptor, MethodDescriptorRc, MethodModifiers};
pub use registry::{LoaderInfo, TypeRegistry};
pub use token::{LoaderId, MethodId, TypeToken};
pub use types::{Builtin, TypeFlags, TypeInfo, TypeInfoRc, TypeKind};
pub use value::{AnnotationInstance, Fault, Instance, Value};

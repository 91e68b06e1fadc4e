//! Type registry and hierarchy queries.
//!
//! The [`TypeRegistry`] is the single source of truth for the types, methods and loaders that
//! pointcuts are matched against. It is populated once during setup (usually through
//! [`crate::model::TypeBuilder`] and [`crate::model::MethodBuilder`]) and queried concurrently
//! afterwards.
//!
//! # Storage
//!
//! - Types live in a `SkipMap` keyed by [`TypeToken`], with a `DashMap` secondary index by
//!   full name. Several loaders may define types of the same name.
//! - Methods and loaders live in append-only `boxcar` arenas; their ids equal their arena index.
//!
//! # Visibility
//!
//! Loaders form a tree. Resolving a name from a loader delegates to the ancestors first, so a
//! type defined by a parent shadows a same-named type of a child.
//!
//! # Examples
//!
//! ```rust
//! use aspectscope::model::{Builtin, LoaderId, TypeBuilder, TypeRegistry};
//!
//! let registry = TypeRegistry::new();
//! let service = TypeBuilder::class("com.example.Service").build(&registry)?;
//!
//! assert_eq!(registry.resolve("com.example.Service", LoaderId::BOOTSTRAP), Some(service));
//! assert!(registry.is_assignable(Builtin::Object.token(), service));
//! # Ok::<(), aspectscope::Error>(())
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    model::{
        AnnotationInstance, Builtin, LoaderId, MethodDescriptor, MethodDescriptorRc, MethodId,
        TypeInfo, TypeInfoRc, TypeToken, Value,
    },
    pointcut::FuzzyBool,
    Error, Result,
};

/// A code loading context
#[derive(Debug, Clone)]
pub struct LoaderInfo {
    /// Id of this loader
    pub id: LoaderId,
    /// Descriptive name
    pub name: String,
    /// The loader resolution delegates to, `None` only for the bootstrap loader
    pub parent: Option<LoaderId>,
}

/// Registry of all types, methods and loaders
pub struct TypeRegistry {
    /// Primary type storage
    types: SkipMap<TypeToken, TypeInfoRc>,
    /// Counter for the next type token
    next_token: AtomicU32,
    /// Secondary index: full name to every type of that name, across loaders
    types_by_fullname: DashMap<String, Vec<TypeToken>>,
    /// Method arena, indexed by `MethodId`
    methods: boxcar::Vec<MethodDescriptorRc>,
    /// Loader arena, indexed by `LoaderId`
    loaders: boxcar::Vec<LoaderInfo>,
    /// Serializes arena appends so that index and id agree
    arena_lock: Mutex<()>,
}

impl TypeRegistry {
    /// Create a new registry with the bootstrap loader and all [`Builtin`] types
    #[must_use]
    pub fn new() -> Self {
        let registry = TypeRegistry {
            types: SkipMap::new(),
            next_token: AtomicU32::new(Builtin::COUNT as u32),
            types_by_fullname: DashMap::new(),
            methods: boxcar::Vec::new(),
            loaders: boxcar::Vec::new(),
            arena_lock: Mutex::new(()),
        };

        registry.loaders.push(LoaderInfo {
            id: LoaderId::BOOTSTRAP,
            name: "bootstrap".to_string(),
            parent: None,
        });
        registry.initialize_builtins();
        registry
    }

    fn initialize_builtins(&self) {
        for builtin in Builtin::iter() {
            let info = Arc::new(TypeInfo::new(
                builtin.token(),
                builtin.namespace(),
                builtin.name(),
                builtin.kind(),
                builtin.flags(),
                LoaderId::BOOTSTRAP,
            ));
            if let Some(base) = builtin.base() {
                let _ = info.base.set(base.token());
            }
            for interface in builtin.interfaces() {
                info.interfaces.push(interface.token());
            }
            self.register_type_internal(info);
        }
    }

    fn register_type_internal(&self, info: TypeInfoRc) {
        self.types_by_fullname
            .entry(info.fullname())
            .or_default()
            .push(info.token);
        self.types.insert(info.token, info);
    }

    /// Reserve the token for a new type
    pub(crate) fn next_token(&self) -> TypeToken {
        TypeToken::new(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    /// Insert a fully built type
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the loader already defines a type of the same
    /// name, or if the loader is unknown.
    pub fn insert(&self, info: TypeInfo) -> Result<TypeToken> {
        let _guard = lock!(self.arena_lock);
        if self.loader(info.loader).is_none() {
            return Err(config_error!("Unknown loader {}", info.loader));
        }

        let fullname = info.fullname();
        if let Some(existing) = self.types_by_fullname.get(&fullname) {
            if existing
                .iter()
                .filter_map(|token| self.get(*token))
                .any(|other| other.loader == info.loader)
            {
                return Err(config_error!(
                    "Type '{}' is already defined by {}",
                    fullname,
                    info.loader
                ));
            }
        }

        let token = info.token;
        self.register_type_internal(Arc::new(info));
        Ok(token)
    }

    /// Create a new loader below `parent`
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the parent is unknown.
    pub fn create_loader(&self, name: &str, parent: LoaderId) -> Result<LoaderId> {
        let _guard = lock!(self.arena_lock);
        if self.loader(parent).is_none() {
            return Err(config_error!("Unknown parent loader {}", parent));
        }

        let id = LoaderId::new(self.loaders.count() as u32);
        let index = self.loaders.push(LoaderInfo {
            id,
            name: name.to_string(),
            parent: Some(parent),
        });
        debug_assert_eq!(index, id.index());
        Ok(id)
    }

    /// Add a method descriptor; the descriptor's id is assigned here
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if the declaring type does not exist.
    pub(crate) fn insert_method(
        &self,
        build: impl FnOnce(MethodId) -> MethodDescriptor,
    ) -> Result<MethodId> {
        let _guard = lock!(self.arena_lock);
        let id = MethodId::new(self.methods.count() as u32);
        let descriptor = build(id);
        let declaring = self
            .get(descriptor.declaring_type)
            .ok_or(Error::TypeNotFound(descriptor.declaring_type))?;

        let index = self.methods.push(Arc::new(descriptor));
        debug_assert_eq!(index, id.index());
        declaring.methods.push(id);
        Ok(id)
    }

    /// Get a type by token
    #[must_use]
    pub fn get(&self, token: TypeToken) -> Option<TypeInfoRc> {
        self.types.get(&token).map(|entry| entry.value().clone())
    }

    /// Get a type by token, failing if it does not exist
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] for unknown tokens.
    pub fn require(&self, token: TypeToken) -> Result<TypeInfoRc> {
        self.get(token).ok_or(Error::TypeNotFound(token))
    }

    /// Get a method descriptor by id
    #[must_use]
    pub fn method(&self, id: MethodId) -> Option<MethodDescriptorRc> {
        self.methods.get(id.index()).cloned()
    }

    /// Get a method descriptor by id, failing if it does not exist
    ///
    /// # Errors
    /// Returns [`crate::Error::MethodNotFound`] for unknown ids.
    pub fn require_method(&self, id: MethodId) -> Result<MethodDescriptorRc> {
        self.method(id).ok_or(Error::MethodNotFound(id))
    }

    /// Get a loader by id
    #[must_use]
    pub fn loader(&self, id: LoaderId) -> Option<&LoaderInfo> {
        self.loaders.get(id.index())
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the registry holds no types, which never happens after construction
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Number of registered methods
    #[must_use]
    pub fn method_count(&self) -> usize {
        self.methods.count()
    }

    /// The full name of a type, or its token if the type is unknown
    #[must_use]
    pub fn type_name(&self, token: TypeToken) -> String {
        self.get(token)
            .map_or_else(|| token.to_string(), |info| info.fullname())
    }

    /// The loader followed by all its ancestors, nearest first
    #[must_use]
    pub fn loader_chain(&self, loader: LoaderId) -> Vec<LoaderId> {
        let mut chain = Vec::new();
        let mut current = Some(loader);
        while let Some(id) = current {
            if chain.contains(&id) {
                break;
            }
            chain.push(id);
            current = self.loader(id).and_then(|info| info.parent);
        }
        chain
    }

    /// Resolve a full type name from a loader, parent-first
    #[must_use]
    pub fn resolve(&self, fullname: &str, loader: LoaderId) -> Option<TypeToken> {
        let candidates = self.types_by_fullname.get(fullname)?;
        self.loader_chain(loader).iter().rev().find_map(|id| {
            candidates.iter().copied().find(|token| {
                self.get(*token)
                    .is_some_and(|info| info.loader == *id)
            })
        })
    }

    /// Returns true if any loader defines a type of this name
    #[must_use]
    pub fn is_defined_anywhere(&self, fullname: &str) -> bool {
        self.types_by_fullname
            .get(fullname)
            .is_some_and(|tokens| !tokens.is_empty())
    }

    /// Returns true if the type's defining loader is `loader` or one of its ancestors
    #[must_use]
    pub fn is_visible(&self, token: TypeToken, loader: LoaderId) -> bool {
        match self.get(token) {
            Some(info) => self.loader_chain(loader).contains(&info.loader),
            None => false,
        }
    }

    /// Fail with [`crate::Error::Resolution`] unless the type is visible from `loader`
    ///
    /// # Errors
    /// Returns [`crate::Error::Resolution`] for types that are not visible.
    pub fn ensure_visible(&self, token: TypeToken, loader: LoaderId) -> Result<()> {
        if self.is_visible(token, loader) {
            Ok(())
        } else {
            Err(Error::Resolution {
                type_name: self.type_name(token),
                loader,
            })
        }
    }

    /// All supertypes of a type in breadth-first order, excluding the type itself
    #[must_use]
    pub fn supertypes(&self, token: TypeToken) -> Vec<TypeToken> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        let mut result = Vec::new();

        seen.insert(token);
        queue.push_back(token);
        while let Some(current) = queue.pop_front() {
            let Some(info) = self.get(current) else {
                continue;
            };

            let parents = info
                .base()
                .into_iter()
                .chain(info.interfaces.iter().map(|(_, interface)| *interface));
            for parent in parents {
                if seen.insert(parent) {
                    result.push(parent);
                    queue.push_back(parent);
                }
            }
        }
        result
    }

    /// Returns true if a value of type `from` can be used where `to` is expected
    ///
    /// Primitives are only assignable to themselves. `Object` accepts every other type.
    #[must_use]
    pub fn is_assignable(&self, to: TypeToken, from: TypeToken) -> bool {
        if to == from {
            return true;
        }

        let (Some(to_info), Some(from_info)) = (self.get(to), self.get(from)) else {
            return false;
        };
        if to_info.is_primitive() || from_info.is_primitive() {
            return false;
        }
        if to == Builtin::Object.token() {
            return true;
        }

        self.supertypes(from).contains(&to)
    }

    /// Returns true if `value` can be used where `to` is expected
    ///
    /// Primitive values box into `Object` and, when numeric, into `Number`. `Null` fits any
    /// reference type.
    #[must_use]
    pub fn is_assignable_value(&self, to: TypeToken, value: &Value) -> bool {
        let Some(runtime_type) = value.runtime_type() else {
            return self.get(to).is_some_and(|info| !info.is_primitive());
        };

        if to == Builtin::Object.token() {
            return true;
        }
        if to == Builtin::Number.token() && Builtin::is_numeric(runtime_type) {
            return true;
        }
        self.is_assignable(to, runtime_type)
    }

    /// Decide whether a value statically typed `static_type` could be an instance of
    /// `test_type`
    ///
    /// `Yes` if every such value is, `No` if none can be, `Maybe` if it depends on the runtime
    /// type.
    #[must_use]
    pub fn could_be_instance(&self, static_type: TypeToken, test_type: TypeToken) -> FuzzyBool {
        let (Some(static_info), Some(test_info)) = (self.get(static_type), self.get(test_type))
        else {
            return FuzzyBool::No;
        };

        let object = Builtin::Object.token();
        let number = Builtin::Number.token();
        match (static_info.is_primitive(), test_info.is_primitive()) {
            (true, true) => FuzzyBool::from(static_type == test_type),
            (true, false) => FuzzyBool::from(
                test_type == object || (test_type == number && Builtin::is_numeric(static_type)),
            ),
            (false, true) => {
                if static_type == object || (static_type == number && Builtin::is_numeric(test_type))
                {
                    FuzzyBool::Maybe
                } else {
                    FuzzyBool::No
                }
            }
            (false, false) => {
                if self.is_assignable(test_type, static_type) {
                    FuzzyBool::Yes
                } else if self.is_assignable(static_type, test_type) {
                    FuzzyBool::Maybe
                } else if (test_info.is_interface() && !static_info.is_final())
                    || (static_info.is_interface() && !test_info.is_final())
                {
                    FuzzyBool::Maybe
                } else {
                    FuzzyBool::No
                }
            }
        }
    }

    /// Find a method by name and parameter types, searching the type and then its supertypes
    #[must_use]
    pub fn find_method(
        &self,
        token: TypeToken,
        name: &str,
        parameter_types: &[TypeToken],
    ) -> Option<MethodId> {
        std::iter::once(token)
            .chain(self.supertypes(token))
            .find_map(|candidate| self.declared_method(candidate, name, parameter_types))
    }

    /// Find a method declared directly on `token`
    #[must_use]
    pub fn declared_method(
        &self,
        token: TypeToken,
        name: &str,
        parameter_types: &[TypeToken],
    ) -> Option<MethodId> {
        let info = self.get(token)?;
        info.methods
            .iter()
            .map(|(_, id)| *id)
            .find(|id| {
                self.method(*id).is_some_and(|method| {
                    method.name == name && method.parameter_types == parameter_types
                })
            })
    }

    /// Resolve the implementation of `method` that a call on `target_type` would execute
    ///
    /// Returns `method` unchanged if the target type does not derive from the declaring type or
    /// does not override it.
    #[must_use]
    pub fn most_specific_method(&self, method: MethodId, target_type: TypeToken) -> MethodId {
        let Some(descriptor) = self.method(method) else {
            return method;
        };
        if target_type == descriptor.declaring_type
            || !self.is_assignable(descriptor.declaring_type, target_type)
        {
            return method;
        }

        self.find_method(
            target_type,
            &descriptor.name,
            &descriptor.parameter_types,
        )
        .unwrap_or(method)
    }

    /// The declaring type of `method` and every supertype that declares the same signature
    #[must_use]
    pub fn types_declaring_signature(&self, method: &MethodDescriptor) -> Vec<TypeToken> {
        std::iter::once(method.declaring_type)
            .chain(self.supertypes(method.declaring_type))
            .filter(|candidate| {
                self.declared_method(*candidate, &method.name, &method.parameter_types)
                    .is_some()
            })
            .collect()
    }

    /// Find an annotation on a type
    ///
    /// Annotations whose type carries [`crate::model::TypeFlags::INHERITED_ANNOTATION`] are
    /// also found on base classes.
    #[must_use]
    pub fn type_annotation(
        &self,
        token: TypeToken,
        annotation_type: TypeToken,
    ) -> Option<Arc<AnnotationInstance>> {
        let info = self.get(token)?;
        if let Some(found) = info.annotation(annotation_type) {
            return Some(found);
        }

        let inherited = self.get(annotation_type).is_some_and(|annotation| {
            annotation
                .flags
                .contains(crate::model::TypeFlags::INHERITED_ANNOTATION)
        });
        if !inherited {
            return None;
        }

        let mut current = info.base();
        while let Some(base) = current {
            let base_info = self.get(base)?;
            if let Some(found) = base_info.annotation(annotation_type) {
                return Some(found);
            }
            current = base_info.base();
        }
        None
    }

    /// Iterate over all types
    pub fn iter(&self) -> impl Iterator<Item = TypeInfoRc> + '_ {
        self.types.iter().map(|entry| entry.value().clone())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.types.len())
            .field("methods", &self.methods.count())
            .field("loaders", &self.loaders.count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodBuilder, TypeBuilder, TypeFlags};
    use crate::binding::AdviceParameterNameDiscoverer;

    #[test]
    fn test_debug_summary() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        MethodBuilder::new(service, "run").build(&registry)?;

        let summary = format!("{registry:?}");
        assert!(summary.starts_with("TypeRegistry {"));
        assert!(summary.contains("methods: 1"));
        assert!(summary.contains("loaders: 1"));

        let discoverer = AdviceParameterNameDiscoverer::new(registry, Some("args(x)"));
        assert!(format!("{discoverer:?}").contains("TypeRegistry"));
        Ok(())
    }

    #[test]
    fn test_builtins_registered() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.len(), Builtin::COUNT);
        assert_eq!(
            registry.resolve("JoinPoint.StaticPart", LoaderId::BOOTSTRAP),
            Some(Builtin::StaticPart.token())
        );
        assert_eq!(
            registry.resolve("int", LoaderId::BOOTSTRAP),
            Some(Builtin::Int.token())
        );
    }

    #[test]
    fn test_assignability() {
        let registry = TypeRegistry::new();
        let object = Builtin::Object.token();
        assert!(registry.is_assignable(object, Builtin::String.token()));
        assert!(registry.is_assignable(
            Builtin::Throwable.token(),
            Builtin::RuntimeException.token()
        ));
        assert!(!registry.is_assignable(
            Builtin::RuntimeException.token(),
            Builtin::Throwable.token()
        ));
        assert!(!registry.is_assignable(object, Builtin::Int.token()));
        assert!(registry.is_assignable(
            Builtin::JoinPoint.token(),
            Builtin::ProceedingJoinPoint.token()
        ));
    }

    #[test]
    fn test_value_assignability() {
        let registry = TypeRegistry::new();
        assert!(registry.is_assignable_value(Builtin::Object.token(), &Value::Int(1)));
        assert!(registry.is_assignable_value(Builtin::Number.token(), &Value::Long(1)));
        assert!(registry.is_assignable_value(Builtin::Int.token(), &Value::Int(1)));
        assert!(!registry.is_assignable_value(Builtin::String.token(), &Value::Int(1)));
        assert!(registry.is_assignable_value(Builtin::String.token(), &Value::Null));
        assert!(!registry.is_assignable_value(Builtin::Int.token(), &Value::Null));
    }

    #[test]
    fn test_parent_first_resolution() -> Result<()> {
        let registry = TypeRegistry::new();
        let child = registry.create_loader("child", LoaderId::BOOTSTRAP)?;
        let sibling = registry.create_loader("sibling", LoaderId::BOOTSTRAP)?;

        let parent_type = TypeBuilder::class("app.Shared").build(&registry)?;
        let child_type = TypeBuilder::class("app.Local").loader(child).build(&registry)?;

        assert_eq!(registry.resolve("app.Shared", child), Some(parent_type));
        assert_eq!(registry.resolve("app.Local", child), Some(child_type));
        assert_eq!(registry.resolve("app.Local", sibling), None);
        assert!(registry.is_defined_anywhere("app.Local"));
        assert!(registry.is_visible(parent_type, sibling));
        assert!(!registry.is_visible(child_type, sibling));
        assert!(registry.ensure_visible(child_type, sibling).is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_type_rejected() -> Result<()> {
        let registry = TypeRegistry::new();
        TypeBuilder::class("app.Service").build(&registry)?;
        assert!(TypeBuilder::class("app.Service").build(&registry).is_err());

        let other = registry.create_loader("other", LoaderId::BOOTSTRAP)?;
        assert!(TypeBuilder::class("app.Service").loader(other).build(&registry).is_ok());
        Ok(())
    }

    #[test]
    fn test_could_be_instance() -> Result<()> {
        let registry = TypeRegistry::new();
        let base = TypeBuilder::class("app.Base").build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;
        let unrelated = TypeBuilder::class("app.Unrelated").build(&registry)?;
        let sealed = TypeBuilder::class("app.Sealed")
            .flags(TypeFlags::FINAL)
            .build(&registry)?;
        let marker = TypeBuilder::interface("app.Marker").build(&registry)?;

        assert_eq!(registry.could_be_instance(derived, base), FuzzyBool::Yes);
        assert_eq!(registry.could_be_instance(base, derived), FuzzyBool::Maybe);
        assert_eq!(registry.could_be_instance(base, unrelated), FuzzyBool::No);
        assert_eq!(registry.could_be_instance(base, marker), FuzzyBool::Maybe);
        assert_eq!(registry.could_be_instance(sealed, marker), FuzzyBool::No);
        assert_eq!(
            registry.could_be_instance(Builtin::Int.token(), Builtin::Object.token()),
            FuzzyBool::Yes
        );
        assert_eq!(
            registry.could_be_instance(Builtin::Object.token(), Builtin::Int.token()),
            FuzzyBool::Maybe
        );
        Ok(())
    }

    #[test]
    fn test_most_specific_method() -> Result<()> {
        let registry = TypeRegistry::new();
        let base = TypeBuilder::class("app.Base").build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;
        let other = TypeBuilder::class("app.Other").build(&registry)?;

        let run = MethodBuilder::new(base, "run").build(&registry)?;
        let stop = MethodBuilder::new(base, "stop").build(&registry)?;
        let run_override = MethodBuilder::new(derived, "run").build(&registry)?;

        assert_eq!(registry.most_specific_method(run, derived), run_override);
        assert_eq!(registry.most_specific_method(stop, derived), stop);
        assert_eq!(registry.most_specific_method(run, other), run);
        assert_eq!(
            registry.types_declaring_signature(&*registry.require_method(run_override)?),
            vec![derived, base]
        );
        Ok(())
    }

    #[test]
    fn test_inherited_annotations() -> Result<()> {
        let registry = TypeRegistry::new();
        let inherited = TypeBuilder::annotation("app.Inherited")
            .flags(TypeFlags::INHERITED_ANNOTATION)
            .build(&registry)?;
        let plain = TypeBuilder::annotation("app.Plain").build(&registry)?;
        let base = TypeBuilder::class("app.Base")
            .annotated(AnnotationInstance::new(inherited))
            .annotated(AnnotationInstance::new(plain))
            .build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;

        assert!(registry.type_annotation(derived, inherited).is_some());
        assert!(registry.type_annotation(derived, plain).is_none());
        assert!(registry.type_annotation(base, plain).is_some());
        assert!(registry.is_assignable(Builtin::Annotation.token(), plain));
        Ok(())
    }
}

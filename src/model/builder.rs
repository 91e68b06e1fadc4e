//! Fluent builders for populating a [`TypeRegistry`].

use std::sync::Arc;

use crate::{
    model::{
        AnnotationInstance, Builtin, LoaderId, MethodDescriptor, MethodId, MethodModifiers,
        TypeFlags, TypeInfo, TypeKind, TypeRegistry, TypeToken,
    },
    Result,
};

/// Builder for a new type
///
/// Classes extend `Object` unless [`TypeBuilder::extends`] is used. Annotation types
/// implicitly implement `Annotation`.
///
/// ```rust
/// use aspectscope::model::{TypeBuilder, TypeFlags, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let repository = TypeBuilder::interface("app.Repository").build(&registry)?;
/// let jdbc = TypeBuilder::class("app.JdbcRepository")
///     .implements(repository)
///     .flags(TypeFlags::FINAL)
///     .build(&registry)?;
/// assert!(registry.is_assignable(repository, jdbc));
/// # Ok::<(), aspectscope::Error>(())
/// ```
pub struct TypeBuilder {
    namespace: String,
    name: String,
    kind: TypeKind,
    flags: TypeFlags,
    loader: LoaderId,
    base: Option<TypeToken>,
    interfaces: Vec<TypeToken>,
    annotations: Vec<Arc<AnnotationInstance>>,
}

impl TypeBuilder {
    fn new(fullname: &str, kind: TypeKind) -> Self {
        let (namespace, name) = match fullname.rfind('.') {
            Some(split) => (&fullname[..split], &fullname[split + 1..]),
            None => ("", fullname),
        };

        TypeBuilder {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            flags: TypeFlags::empty(),
            loader: LoaderId::BOOTSTRAP,
            base: None,
            interfaces: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Start a class
    #[must_use]
    pub fn class(fullname: &str) -> Self {
        Self::new(fullname, TypeKind::Class)
    }

    /// Start an interface
    #[must_use]
    pub fn interface(fullname: &str) -> Self {
        Self::new(fullname, TypeKind::Interface)
    }

    /// Start an annotation type
    #[must_use]
    pub fn annotation(fullname: &str) -> Self {
        Self::new(fullname, TypeKind::Annotation)
    }

    /// Set the base class
    #[must_use]
    pub fn extends(mut self, base: TypeToken) -> Self {
        self.base = Some(base);
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: TypeToken) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Add type flags
    #[must_use]
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Set the defining loader
    #[must_use]
    pub fn loader(mut self, loader: LoaderId) -> Self {
        self.loader = loader;
        self
    }

    /// Place an annotation on the type
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(Arc::new(annotation));
        self
    }

    /// Register the type
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] for unknown base or interface tokens and
    /// [`crate::Error::Configuration`] if the loader already defines a type of this name.
    pub fn build(self, registry: &TypeRegistry) -> Result<TypeToken> {
        for referenced in self.base.iter().chain(self.interfaces.iter()) {
            registry.require(*referenced)?;
        }

        let info = TypeInfo::new(
            registry.next_token(),
            &self.namespace,
            &self.name,
            self.kind,
            self.flags,
            self.loader,
        );

        match (self.kind, self.base) {
            (_, Some(base)) => {
                let _ = info.base.set(base);
            }
            (TypeKind::Class, None) => {
                let _ = info.base.set(Builtin::Object.token());
            }
            _ => {}
        }
        if self.kind == TypeKind::Annotation {
            info.interfaces.push(Builtin::Annotation.token());
        }
        for interface in self.interfaces {
            info.interfaces.push(interface);
        }
        for annotation in self.annotations {
            info.annotations.push(annotation);
        }

        registry.insert(info)
    }
}

/// Builder for a new method
///
/// ```rust
/// use aspectscope::model::{Builtin, MethodBuilder, TypeBuilder, TypeRegistry};
///
/// let registry = TypeRegistry::new();
/// let service = TypeBuilder::class("app.Service").build(&registry)?;
/// let set_name = MethodBuilder::new(service, "setName")
///     .param(Builtin::String.token())
///     .build(&registry)?;
/// assert_eq!(registry.require_method(set_name)?.arity(), 1);
/// # Ok::<(), aspectscope::Error>(())
/// ```
pub struct MethodBuilder {
    declaring_type: TypeToken,
    name: String,
    parameter_types: Vec<TypeToken>,
    return_type: TypeToken,
    modifiers: MethodModifiers,
    throws: Vec<TypeToken>,
    annotations: Vec<Arc<AnnotationInstance>>,
    parameter_names: Option<Vec<String>>,
}

impl MethodBuilder {
    /// Start a public `void` method without parameters
    #[must_use]
    pub fn new(declaring_type: TypeToken, name: &str) -> Self {
        MethodBuilder {
            declaring_type,
            name: name.to_string(),
            parameter_types: Vec::new(),
            return_type: Builtin::Void.token(),
            modifiers: MethodModifiers::PUBLIC,
            throws: Vec::new(),
            annotations: Vec::new(),
            parameter_names: None,
        }
    }

    /// Append a parameter
    #[must_use]
    pub fn param(mut self, parameter_type: TypeToken) -> Self {
        self.parameter_types.push(parameter_type);
        self
    }

    /// Append several parameters
    #[must_use]
    pub fn params(mut self, parameter_types: &[TypeToken]) -> Self {
        self.parameter_types.extend_from_slice(parameter_types);
        self
    }

    /// Set the return type
    #[must_use]
    pub fn returns(mut self, return_type: TypeToken) -> Self {
        self.return_type = return_type;
        self
    }

    /// Replace the modifiers
    #[must_use]
    pub fn modifiers(mut self, modifiers: MethodModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Declare a failure type
    #[must_use]
    pub fn throws(mut self, fault_type: TypeToken) -> Self {
        self.throws.push(fault_type);
        self
    }

    /// Place an annotation on the method
    #[must_use]
    pub fn annotated(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(Arc::new(annotation));
        self
    }

    /// Record the parameter names
    #[must_use]
    pub fn parameter_names(mut self, names: &[&str]) -> Self {
        self.parameter_names = Some(names.iter().map(ToString::to_string).collect());
        self
    }

    /// Register the method on its declaring type
    ///
    /// # Errors
    /// Returns [`crate::Error::TypeNotFound`] if the declaring type or any referenced type is
    /// unknown, and [`crate::Error::Configuration`] if the recorded names do not match the
    /// parameter count.
    pub fn build(self, registry: &TypeRegistry) -> Result<MethodId> {
        for referenced in self
            .parameter_types
            .iter()
            .chain(self.throws.iter())
            .chain(std::iter::once(&self.return_type))
        {
            registry.require(*referenced)?;
        }
        if let Some(names) = &self.parameter_names {
            if names.len() != self.parameter_types.len() {
                return Err(config_error!(
                    "Method '{}' records {} parameter names for {} parameters",
                    self.name,
                    names.len(),
                    self.parameter_types.len()
                ));
            }
        }

        registry.insert_method(|id| MethodDescriptor {
            id,
            declaring_type: self.declaring_type,
            name: self.name,
            parameter_types: self.parameter_types,
            return_type: self.return_type,
            modifiers: self.modifiers,
            throws: self.throws,
            annotations: self.annotations,
            parameter_names: self.parameter_names,
        })
    }
}

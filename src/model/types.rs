//! Type descriptors and the builtin type set.

use std::sync::{Arc, OnceLock};

use bitflags::bitflags;
use strum::{EnumCount, EnumIter};

use crate::model::{AnnotationInstance, LoaderId, MethodId, TypeToken};

/// A reference counted `TypeInfo`
pub type TypeInfoRc = Arc<TypeInfo>;

/// The broad category of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A concrete or abstract class with a single base
    Class,
    /// An interface, which has no base but may extend other interfaces
    Interface,
    /// A primitive value type (`int`, `boolean`, ...)
    Primitive,
    /// An annotation type; every annotation type implements `Annotation`
    Annotation,
}

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Attributes of a type that influence matching
    pub struct TypeFlags: u32 {
        /// The type can not be subclassed
        const FINAL = 0x0001;
        /// The type can not be instantiated
        const ABSTRACT = 0x0002;
        /// The type has been woven by a foreign aspect compiler
        const ASPECT_COMPILED = 0x0004;
        /// The type is an interception proxy
        const PROXY = 0x0008;
        /// For annotation types: the annotation is inherited by subclasses
        const INHERITED_ANNOTATION = 0x0010;
    }
}

/// A type known to the registry
///
/// Types are created once and only grow afterwards: interfaces, annotations and methods are
/// stored in append-only arenas so that concurrent readers never observe a partially
/// initialized list.
pub struct TypeInfo {
    /// The token of this type
    pub token: TypeToken,
    /// Dotted namespace, empty for builtins
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Category of this type
    pub kind: TypeKind,
    /// Matching related attributes
    pub flags: TypeFlags,
    /// The loader that defined this type
    pub loader: LoaderId,
    /// The base class, if any
    pub base: OnceLock<TypeToken>,
    /// Directly implemented interfaces
    pub interfaces: boxcar::Vec<TypeToken>,
    /// Annotations placed on the type
    pub annotations: boxcar::Vec<Arc<AnnotationInstance>>,
    /// Methods declared by this type
    pub methods: boxcar::Vec<MethodId>,
}

impl TypeInfo {
    /// Create a new type without base, interfaces or members
    #[must_use]
    pub fn new(
        token: TypeToken,
        namespace: &str,
        name: &str,
        kind: TypeKind,
        flags: TypeFlags,
        loader: LoaderId,
    ) -> Self {
        TypeInfo {
            token,
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind,
            flags,
            loader,
            base: OnceLock::new(),
            interfaces: boxcar::Vec::new(),
            annotations: boxcar::Vec::new(),
            methods: boxcar::Vec::new(),
        }
    }

    /// The full name of this type, `namespace.name`
    #[must_use]
    pub fn fullname(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Returns the base class, if one was set
    #[must_use]
    pub fn base(&self) -> Option<TypeToken> {
        self.base.get().copied()
    }

    /// Returns true for primitive value types
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    /// Returns true for interfaces and annotation types
    #[must_use]
    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface | TypeKind::Annotation)
    }

    /// Returns true if this type can not be subclassed
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.flags.contains(TypeFlags::FINAL) || self.is_primitive()
    }

    /// Find an annotation of the given type placed directly on this type
    #[must_use]
    pub fn annotation(&self, annotation_type: TypeToken) -> Option<Arc<AnnotationInstance>> {
        self.annotations
            .iter()
            .find(|(_, annotation)| annotation.annotation_type == annotation_type)
            .map(|(_, annotation)| annotation.clone())
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("token", &self.token)
            .field("fullname", &self.fullname())
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

/// The types every registry starts with. Their tokens equal their discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount)]
pub enum Builtin {
    /// The root of all reference types, also used as the 'any' type
    Object,
    /// The absence of a value
    Void,
    /// `boolean`
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 64-bit float
    Double,
    /// Character
    Char,
    /// Immutable text
    String,
    /// The base of boxed numeric values
    Number,
    /// The root of all failure types
    Throwable,
    /// Checked failures
    Exception,
    /// Unchecked failures
    RuntimeException,
    /// Unrecoverable failures
    Error,
    /// The root interface of all annotation types
    Annotation,
    /// The reflective view of the current join point
    JoinPoint,
    /// A join point that can be resumed from around advice
    ProceedingJoinPoint,
    /// The static part of a join point
    StaticPart,
}

impl Builtin {
    /// The fixed token of this builtin
    #[must_use]
    pub fn token(self) -> TypeToken {
        TypeToken(self as u32)
    }

    /// The namespace this builtin is registered under
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Builtin::StaticPart => "JoinPoint",
            _ => "",
        }
    }

    /// The simple name of this builtin
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Object => "Object",
            Builtin::Void => "void",
            Builtin::Boolean => "boolean",
            Builtin::Int => "int",
            Builtin::Long => "long",
            Builtin::Double => "double",
            Builtin::Char => "char",
            Builtin::String => "String",
            Builtin::Number => "Number",
            Builtin::Throwable => "Throwable",
            Builtin::Exception => "Exception",
            Builtin::RuntimeException => "RuntimeException",
            Builtin::Error => "Error",
            Builtin::Annotation => "Annotation",
            Builtin::JoinPoint => "JoinPoint",
            Builtin::ProceedingJoinPoint => "ProceedingJoinPoint",
            Builtin::StaticPart => "StaticPart",
        }
    }

    /// The category of this builtin
    #[must_use]
    pub fn kind(self) -> TypeKind {
        match self {
            Builtin::Void
            | Builtin::Boolean
            | Builtin::Int
            | Builtin::Long
            | Builtin::Double
            | Builtin::Char => TypeKind::Primitive,
            Builtin::Annotation
            | Builtin::JoinPoint
            | Builtin::ProceedingJoinPoint
            | Builtin::StaticPart => TypeKind::Interface,
            _ => TypeKind::Class,
        }
    }

    /// The flags of this builtin
    #[must_use]
    pub fn flags(self) -> TypeFlags {
        match self {
            Builtin::String => TypeFlags::FINAL,
            Builtin::Number => TypeFlags::ABSTRACT,
            _ => TypeFlags::empty(),
        }
    }

    /// The base class of this builtin, if any
    #[must_use]
    pub fn base(self) -> Option<Builtin> {
        match self.kind() {
            TypeKind::Class => match self {
                Builtin::Object => None,
                Builtin::Exception | Builtin::Error => Some(Builtin::Throwable),
                Builtin::RuntimeException => Some(Builtin::Exception),
                _ => Some(Builtin::Object),
            },
            _ => None,
        }
    }

    /// The interfaces this builtin implements
    #[must_use]
    pub fn interfaces(self) -> &'static [Builtin] {
        match self {
            Builtin::ProceedingJoinPoint => &[Builtin::JoinPoint],
            _ => &[],
        }
    }

    /// Returns true for the numeric primitives that box into `Number`
    #[must_use]
    pub fn is_numeric(token: TypeToken) -> bool {
        token == Builtin::Int.token()
            || token == Builtin::Long.token()
            || token == Builtin::Double.token()
    }

    /// Returns true if the token denotes one of the join point types
    #[must_use]
    pub fn is_join_point(token: TypeToken) -> bool {
        token == Builtin::JoinPoint.token() || token == Builtin::ProceedingJoinPoint.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_builtin_tokens_are_dense() {
        for (index, builtin) in Builtin::iter().enumerate() {
            assert_eq!(builtin.token().index(), index);
        }
        assert_eq!(Builtin::iter().count(), Builtin::COUNT);
    }

    #[test]
    fn test_builtin_hierarchy() {
        assert_eq!(Builtin::RuntimeException.base(), Some(Builtin::Exception));
        assert_eq!(Builtin::Int.base(), None);
        assert_eq!(Builtin::Object.base(), None);
        assert_eq!(Builtin::ProceedingJoinPoint.interfaces(), &[Builtin::JoinPoint]);
    }

    #[test]
    fn test_fullname() {
        let info = TypeInfo::new(
            TypeToken::new(99),
            "com.example",
            "Service",
            TypeKind::Class,
            TypeFlags::empty(),
            LoaderId::BOOTSTRAP,
        );
        assert_eq!(info.fullname(), "com.example.Service");

        let static_part = TypeInfo::new(
            Builtin::StaticPart.token(),
            Builtin::StaticPart.namespace(),
            Builtin::StaticPart.name(),
            Builtin::StaticPart.kind(),
            Builtin::StaticPart.flags(),
            LoaderId::BOOTSTRAP,
        );
        assert_eq!(static_part.fullname(), "JoinPoint.StaticPart");
    }
}

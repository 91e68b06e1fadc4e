use std::sync::Arc;

use bitflags::bitflags;

use crate::model::{AnnotationInstance, MethodId, TypeToken};

/// A reference counted `MethodDescriptor`
pub type MethodDescriptorRc = Arc<MethodDescriptor>;

bitflags! {
    #[derive(PartialEq, Eq, Debug, Clone, Copy)]
    /// Method modifiers that can be tested by a method pattern
    pub struct MethodModifiers: u32 {
        /// Accessible from everywhere
        const PUBLIC = 0x0001;
        /// Accessible from subclasses
        const PROTECTED = 0x0002;
        /// Accessible from the declaring type only
        const PRIVATE = 0x0004;
        /// Not bound to an instance
        const STATIC = 0x0008;
        /// Can not be overridden
        const FINAL = 0x0010;
        /// Has no body
        const ABSTRACT = 0x0020;
        /// Runs under the receiver's monitor
        const SYNCHRONIZED = 0x0040;
    }
}

impl MethodModifiers {
    /// Look up a single modifier by its keyword
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<MethodModifiers> {
        match keyword {
            "public" => Some(MethodModifiers::PUBLIC),
            "protected" => Some(MethodModifiers::PROTECTED),
            "private" => Some(MethodModifiers::PRIVATE),
            "static" => Some(MethodModifiers::STATIC),
            "final" => Some(MethodModifiers::FINAL),
            "abstract" => Some(MethodModifiers::ABSTRACT),
            "synchronized" => Some(MethodModifiers::SYNCHRONIZED),
            _ => None,
        }
    }
}

/// An executable member of a type
#[derive(Debug)]
pub struct MethodDescriptor {
    /// Index of this descriptor in the method arena
    pub id: MethodId,
    /// The type that declares this method
    pub declaring_type: TypeToken,
    /// Simple method name
    pub name: String,
    /// Ordered parameter types
    pub parameter_types: Vec<TypeToken>,
    /// Return type, `void` if the method produces nothing
    pub return_type: TypeToken,
    /// Modifiers
    pub modifiers: MethodModifiers,
    /// Declared failure types
    pub throws: Vec<TypeToken>,
    /// Annotations placed on the method
    pub annotations: Vec<Arc<AnnotationInstance>>,
    /// Parameter names, if they were retained when the method was defined
    pub parameter_names: Option<Vec<String>>,
}

impl MethodDescriptor {
    /// Number of declared parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Returns true if `other` has the same name and parameter types
    #[must_use]
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name && self.parameter_types == other.parameter_types
    }

    /// Find an annotation of the given type placed on this method
    #[must_use]
    pub fn annotation(&self, annotation_type: TypeToken) -> Option<Arc<AnnotationInstance>> {
        self.annotations
            .iter()
            .find(|annotation| annotation.annotation_type == annotation_type)
            .cloned()
    }
}

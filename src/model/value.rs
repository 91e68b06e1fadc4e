//! Runtime values flowing through intercepted calls.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::model::{Builtin, TypeToken};

/// An object instance with a mutable field map
#[derive(Debug)]
pub struct Instance {
    /// The exact runtime type of this instance
    pub instance_type: TypeToken,
    fields: RwLock<HashMap<String, Value>>,
}

impl Instance {
    /// Create a new instance without fields
    #[must_use]
    pub fn new(instance_type: TypeToken) -> Self {
        Instance {
            instance_type,
            fields: RwLock::new(HashMap::new()),
        }
    }

    /// Read a field, `Value::Null` if the field was never written
    #[must_use]
    pub fn get(&self, field: &str) -> Value {
        with_read!(self.fields, |fields: &HashMap<String, Value>| fields
            .get(field)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Write a field
    pub fn set(&self, field: &str, value: Value) {
        with_write!(self.fields, |fields: &mut HashMap<String, Value>| {
            fields.insert(field.to_string(), value);
        });
    }
}

/// A concrete annotation placed on a type or method
#[derive(Debug, PartialEq)]
pub struct AnnotationInstance {
    /// The annotation type
    pub annotation_type: TypeToken,
    /// Attribute values
    pub attributes: HashMap<String, Value>,
}

impl AnnotationInstance {
    /// Create an annotation without attributes
    #[must_use]
    pub fn new(annotation_type: TypeToken) -> Self {
        AnnotationInstance {
            annotation_type,
            attributes: HashMap::new(),
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Read an attribute
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// A failure raised by an intercepted operation or an advice body
#[derive(Debug, PartialEq)]
pub struct Fault {
    /// The failure type, assignable to `Throwable`
    pub fault_type: TypeToken,
    /// Human readable description
    pub message: String,
    /// The failure that caused this one
    pub cause: Option<Arc<Fault>>,
}

impl Fault {
    /// Create a new fault
    #[must_use]
    pub fn new(fault_type: TypeToken, message: &str) -> Self {
        Fault {
            fault_type,
            message: message.to_string(),
            cause: None,
        }
    }

    /// Attach a cause
    #[must_use]
    pub fn caused_by(mut self, cause: Arc<Fault>) -> Self {
        self.cause = Some(cause);
        self
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.fault_type)?;
        if let Some(cause) = &self.cause {
            write!(f, " caused by {cause}")?;
        }
        Ok(())
    }
}

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    /// The null reference
    Null,
    /// The result of a `void` operation
    Void,
    /// `boolean`
    Bool(bool),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `double`
    Double(f64),
    /// `char`
    Char(char),
    /// `String`
    Str(Arc<str>),
    /// An object instance, compared by identity
    Object(Arc<Instance>),
    /// An annotation instance
    Annotation(Arc<AnnotationInstance>),
    /// A failure object
    Fault(Arc<Fault>),
}

impl Value {
    /// The exact runtime type of this value, `None` for `Null`
    #[must_use]
    pub fn runtime_type(&self) -> Option<TypeToken> {
        match self {
            Value::Null => None,
            Value::Void => Some(Builtin::Void.token()),
            Value::Bool(_) => Some(Builtin::Boolean.token()),
            Value::Int(_) => Some(Builtin::Int.token()),
            Value::Long(_) => Some(Builtin::Long.token()),
            Value::Double(_) => Some(Builtin::Double.token()),
            Value::Char(_) => Some(Builtin::Char.token()),
            Value::Str(_) => Some(Builtin::String.token()),
            Value::Object(instance) => Some(instance.instance_type),
            Value::Annotation(annotation) => Some(annotation.annotation_type),
            Value::Fault(fault) => Some(fault.fault_type),
        }
    }

    /// Returns true for `Null`
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the instance if this is an object
    #[must_use]
    pub fn as_instance(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// Returns the text if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the integer if this is an `int`
    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Annotation(a), Value::Annotation(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Fault(a), Value::Fault(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Void => write!(f, "void"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Long(value) => write!(f, "{value}L"),
            Value::Double(value) => write!(f, "{value}"),
            Value::Char(value) => write!(f, "'{value}'"),
            Value::Str(value) => write!(f, "\"{value}\""),
            Value::Object(instance) => write!(f, "<{}>", instance.instance_type),
            Value::Annotation(annotation) => write!(f, "@{}", annotation.annotation_type),
            Value::Fault(fault) => write!(f, "{fault}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<Arc<Instance>> for Value {
    fn from(value: Arc<Instance>) -> Self {
        Value::Object(value)
    }
}

impl From<Arc<Fault>> for Value {
    fn from(value: Arc<Fault>) -> Self {
        Value::Fault(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_types() {
        assert_eq!(Value::Null.runtime_type(), None);
        assert_eq!(Value::from(5).runtime_type(), Some(Builtin::Int.token()));
        assert_eq!(Value::from("a").runtime_type(), Some(Builtin::String.token()));
        assert_eq!(
            Value::from(Arc::new(Instance::new(TypeToken::new(40)))).runtime_type(),
            Some(TypeToken::new(40))
        );
    }

    #[test]
    fn test_object_identity() {
        let instance = Arc::new(Instance::new(TypeToken::new(40)));
        let same = Value::Object(instance.clone());
        let other = Value::Object(Arc::new(Instance::new(TypeToken::new(40))));
        assert_eq!(Value::Object(instance), same);
        assert_ne!(same, other);
    }

    #[test]
    fn test_instance_fields() {
        let instance = Instance::new(TypeToken::new(40));
        assert!(instance.get("name").is_null());
        instance.set("name", Value::from("a"));
        assert_eq!(instance.get("name"), Value::from("a"));
    }

    #[test]
    fn test_fault_display() {
        let cause = Arc::new(Fault::new(Builtin::Error.token(), "disk"));
        let fault = Fault::new(Builtin::RuntimeException.token(), "boom").caused_by(cause);
        assert_eq!(fault.to_string(), "boom (type#11) caused by disk (type#12)");
    }
}

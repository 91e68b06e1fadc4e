//! Named pointcut definitions that expressions can reference.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;

use crate::model::TypeToken;

/// A reusable, named pointcut
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedPointcut {
    /// Qualified name, `DeclaringType.pointcutName`
    pub name: String,
    /// Formal parameter names
    pub parameter_names: Vec<String>,
    /// Formal parameter types
    pub parameter_types: Vec<TypeToken>,
    /// The expression the name stands for
    pub expression: String,
}

/// A concurrent library of named pointcuts
///
/// ```rust
/// use aspectscope::pointcut::PointcutLibrary;
///
/// let library = PointcutLibrary::new();
/// library.define("app.Pointcuts.services", "within(app.service..*)", &[]);
///
/// assert!(library.lookup("services", Some("app.Pointcuts")).is_some());
/// assert!(library.lookup("app.Pointcuts.services", None).is_some());
/// assert!(library.lookup("services", None).is_none());
/// ```
#[derive(Default)]
pub struct PointcutLibrary {
    definitions: SkipMap<String, Arc<NamedPointcut>>,
}

impl PointcutLibrary {
    /// Create an empty library
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or replace a named pointcut
    pub fn define(&self, name: &str, expression: &str, parameters: &[(&str, TypeToken)]) {
        let definition = NamedPointcut {
            name: name.to_string(),
            parameter_names: parameters.iter().map(|(name, _)| name.to_string()).collect(),
            parameter_types: parameters.iter().map(|(_, ty)| *ty).collect(),
            expression: expression.to_string(),
        };
        self.definitions
            .insert(name.to_string(), Arc::new(definition));
    }

    /// Get a definition by its qualified name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<NamedPointcut>> {
        self.definitions
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Resolve a reference as written in an expression
    ///
    /// Qualified names are looked up as they are. Simple names are first qualified with the
    /// scope the referencing expression was declared in.
    #[must_use]
    pub fn lookup(&self, name: &str, scope: Option<&str>) -> Option<Arc<NamedPointcut>> {
        if let Some(scope) = scope {
            if let Some(found) = self.get(&format!("{scope}.{name}")) {
                return Some(found);
            }
        }
        if name.contains('.') {
            return self.get(name);
        }
        None
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if nothing has been defined
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

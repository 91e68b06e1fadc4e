//! Chain of parameter name sources.
//!
//! Names can come from the advice declaration itself, from names recorded on the method
//! descriptor, or from the heuristic [`AdviceParameterNameDiscoverer`]. A
//! [`PrioritizedDiscoverer`] asks each source in turn and takes the first answer.
//!
//! [`AdviceParameterNameDiscoverer`]: crate::binding::AdviceParameterNameDiscoverer

use crate::{
    binding::{
        discoverer::{THIS_JOIN_POINT, THIS_JOIN_POINT_STATIC_PART},
        scanner::is_identifier,
    },
    model::{Builtin, MethodDescriptor},
    Result,
};

/// A source of parameter names for a method
pub trait ParameterNameDiscoverer: Send + Sync {
    /// One name per parameter of `method`, or `None` if this source has no answer
    ///
    /// # Errors
    /// Discoverers may fail instead of answering `None` when the method can not be bound.
    fn parameter_names(&self, method: &MethodDescriptor) -> Result<Option<Vec<String>>>;
}

/// Asks a list of discoverers in order, the first `Some` wins
#[derive(Default)]
pub struct PrioritizedDiscoverer {
    discoverers: Vec<Box<dyn ParameterNameDiscoverer>>,
}

impl PrioritizedDiscoverer {
    /// Create an empty chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a discoverer
    #[must_use]
    pub fn with(mut self, discoverer: impl ParameterNameDiscoverer + 'static) -> Self {
        self.discoverers.push(Box::new(discoverer));
        self
    }

    /// Number of discoverers in the chain
    #[must_use]
    pub fn len(&self) -> usize {
        self.discoverers.len()
    }

    /// Returns true if the chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discoverers.is_empty()
    }
}

impl ParameterNameDiscoverer for PrioritizedDiscoverer {
    fn parameter_names(&self, method: &MethodDescriptor) -> Result<Option<Vec<String>>> {
        for discoverer in &self.discoverers {
            if let Some(names) = discoverer.parameter_names(method)? {
                return Ok(Some(names));
            }
        }
        Ok(None)
    }
}

/// Names recorded on the method descriptor
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredNamesDiscoverer;

impl ParameterNameDiscoverer for DeclaredNamesDiscoverer {
    fn parameter_names(&self, method: &MethodDescriptor) -> Result<Option<Vec<String>>> {
        Ok(method.parameter_names.clone())
    }
}

/// Names spelled out on the advice declaration, as in `argNames = "name, value"`
#[derive(Debug, Clone)]
pub struct ArgNamesDiscoverer {
    names: Vec<String>,
}

impl ArgNamesDiscoverer {
    /// Parse a comma-separated name list
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if an entry is not a valid identifier.
    pub fn parse(names: &str) -> Result<Self> {
        let names: Vec<String> = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(invalid) = names.iter().find(|name| !is_identifier(name)) {
            return Err(config_error!(
                "Argument names contain '{}', which is not a valid identifier",
                invalid
            ));
        }
        Ok(ArgNamesDiscoverer { names })
    }

    /// The configured names
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl ParameterNameDiscoverer for ArgNamesDiscoverer {
    fn parameter_names(&self, method: &MethodDescriptor) -> Result<Option<Vec<String>>> {
        let mut names = self.names.clone();
        // The join point parameter may be left out of the list
        if method.arity() == names.len() + 1 {
            let first = method.parameter_types[0];
            if Builtin::is_join_point(first) {
                names.insert(0, THIS_JOIN_POINT.to_string());
            } else if first == Builtin::StaticPart.token() {
                names.insert(0, THIS_JOIN_POINT_STATIC_PART.to_string());
            }
        }
        Ok(Some(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodBuilder, TypeBuilder, TypeRegistry};
    use crate::Error;

    struct Silent;

    impl ParameterNameDiscoverer for Silent {
        fn parameter_names(&self, _method: &MethodDescriptor) -> Result<Option<Vec<String>>> {
            Ok(None)
        }
    }

    #[test]
    fn test_first_answer_wins() -> Result<()> {
        let registry = TypeRegistry::new();
        let aspect = TypeBuilder::class("app.Aspect").build(&registry)?;
        let advice = MethodBuilder::new(aspect, "log")
            .param(Builtin::String.token())
            .parameter_names(&["declared"])
            .build(&registry)?;
        let method = registry.require_method(advice)?;

        let chain = PrioritizedDiscoverer::new()
            .with(Silent)
            .with(DeclaredNamesDiscoverer)
            .with(ArgNamesDiscoverer::parse("explicit")?);
        assert_eq!(chain.len(), 3);
        assert_eq!(
            chain.parameter_names(&method)?,
            Some(vec!["declared".to_string()])
        );

        let empty = PrioritizedDiscoverer::new().with(Silent);
        assert_eq!(empty.parameter_names(&method)?, None);
        Ok(())
    }

    #[test]
    fn test_arg_names_accept_implicit_join_point() -> Result<()> {
        let registry = TypeRegistry::new();
        let aspect = TypeBuilder::class("app.Aspect").build(&registry)?;
        let advice = MethodBuilder::new(aspect, "around")
            .params(&[Builtin::ProceedingJoinPoint.token(), Builtin::String.token()])
            .build(&registry)?;
        let method = registry.require_method(advice)?;

        let names = ArgNamesDiscoverer::parse(" name ")?.parameter_names(&method)?;
        assert_eq!(
            names,
            Some(vec![THIS_JOIN_POINT.to_string(), "name".to_string()])
        );

        let names = ArgNamesDiscoverer::parse("jp, name")?.parameter_names(&method)?;
        assert_eq!(names, Some(vec!["jp".to_string(), "name".to_string()]));
        Ok(())
    }

    #[test]
    fn test_arg_names_rejects_invalid_identifier() {
        assert!(matches!(
            ArgNamesDiscoverer::parse("name, 1st"),
            Err(Error::Configuration { .. })
        ));
    }
}

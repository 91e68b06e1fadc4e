use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{TypeToken, Value};

/// A pointcut parameter captured by a successful runtime match
#[derive(Debug, Clone, PartialEq)]
pub struct PointcutParameter {
    /// Declared parameter name
    pub name: String,
    /// Declared parameter type
    pub parameter_type: TypeToken,
    /// Captured value
    pub value: Value,
}

/// The variables a pointcut captured at one join point
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPointMatch {
    expression: Arc<str>,
    parameters: Vec<PointcutParameter>,
}

impl JoinPointMatch {
    /// Create a match result
    #[must_use]
    pub fn new(expression: Arc<str>, parameters: Vec<PointcutParameter>) -> Self {
        JoinPointMatch {
            expression,
            parameters,
        }
    }

    /// The expression that produced this match
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Captured parameters, in binding order
    #[must_use]
    pub fn parameters(&self) -> &[PointcutParameter] {
        &self.parameters
    }

    /// Look up a captured value by parameter name
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| &parameter.value)
    }
}

/// State of one intercepted call
///
/// A context belongs to exactly one method invocation. Dynamic matches record the variables
/// they captured here, keyed by expression text, so that the advice bound to that expression
/// can pick them up.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    proxy: Option<Value>,
    target: Option<Value>,
    construction_name: Option<String>,
    matches: HashMap<Arc<str>, JoinPointMatch>,
}

impl CallContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target object
    #[must_use]
    pub fn with_target(mut self, target: Value) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the proxy the call went through
    #[must_use]
    pub fn with_proxy(mut self, proxy: Value) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set the name the target was registered under
    #[must_use]
    pub fn with_construction_name(mut self, name: &str) -> Self {
        self.construction_name = Some(name.to_string());
        self
    }

    /// The currently executing object as seen by callers, the proxy if there is one
    #[must_use]
    pub fn this(&self) -> Option<&Value> {
        self.proxy.as_ref().or(self.target.as_ref())
    }

    /// The proxy, if known
    #[must_use]
    pub fn proxy(&self) -> Option<&Value> {
        self.proxy.as_ref()
    }

    /// The target object
    #[must_use]
    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    /// The name the target was registered under
    #[must_use]
    pub fn construction_name(&self) -> Option<&str> {
        self.construction_name.as_deref()
    }

    /// Record the variables captured by a successful match
    pub fn record_match(&mut self, join_point_match: JoinPointMatch) {
        self.matches
            .insert(join_point_match.expression.clone(), join_point_match);
    }

    /// The variables captured by the expression, if it matched this call
    #[must_use]
    pub fn join_point_match(&self, expression: &str) -> Option<&JoinPointMatch> {
        self.matches.get(expression)
    }
}

//! Heuristic discovery of advice parameter names from pointcut text.
//!
//! The discoverer assigns a name to every parameter of an advice method without the author
//! spelling them out. It runs a fixed sequence of [`BindingStage`]s over a shared pool of
//! unbound parameter slots. Each stage binds at most what it can prove unambiguous from the
//! parameter types, the declared `returning`/`throwing` names and the designators found in
//! the expression text.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use aspectscope::{
//!     binding::AdviceParameterNameDiscoverer,
//!     model::{Builtin, TypeRegistry},
//! };
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let discoverer = AdviceParameterNameDiscoverer::new(registry, Some("execution(* *(..)) && args(name)"));
//!
//! let names = discoverer.discover(&[Builtin::JoinPoint.token(), Builtin::String.token()])?;
//! assert_eq!(names, Some(vec!["thisJoinPoint".to_string(), "name".to_string()]));
//! # Ok::<(), aspectscope::Error>(())
//! ```

use std::sync::Arc;

use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

use crate::{
    binding::{
        chain::ParameterNameDiscoverer,
        scanner::{designator_body, designator_keyword, is_variable_name, tokenize, variable_names},
    },
    model::{Builtin, MethodDescriptor, TypeRegistry, TypeToken},
    pointcut::DesignatorKind,
    Error, Result,
};

/// Name bound to a `JoinPoint` or `ProceedingJoinPoint` first parameter
pub const THIS_JOIN_POINT: &str = "thisJoinPoint";

/// Name bound to a `JoinPoint.StaticPart` first parameter
pub const THIS_JOIN_POINT_STATIC_PART: &str = "thisJoinPointStaticPart";

const SINGLE_VALUED_ANNOTATION_DESIGNATORS: [&str; 5] =
    ["@this", "@target", "@within", "@withincode", "@annotation"];

const COMBINATORS: [&str; 3] = ["and", "or", "not"];

/// The stages of parameter name discovery, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumCount, Display)]
pub enum BindingStage {
    /// A join point first parameter
    JoinPoint,
    /// The declared throwing name
    Throwing,
    /// Variables of annotation binding designators
    Annotation,
    /// The declared returning name
    Returning,
    /// A single primitive parameter bound through `args`
    PrimitiveArgs,
    /// Variables of `this`, `target` and `args`
    ThisTargetArgs,
    /// Variables passed to named pointcut references
    ReferencePointcut,
}

/// Discovers advice parameter names from the pointcut expression and the parameter types
#[derive(Debug, Clone)]
pub struct AdviceParameterNameDiscoverer {
    registry: Arc<TypeRegistry>,
    expression: Option<String>,
    returning_name: Option<String>,
    throwing_name: Option<String>,
    raise_errors: bool,
}

impl AdviceParameterNameDiscoverer {
    /// Create a discoverer for an advice bound to `expression`
    ///
    /// The discoverer is lenient by default and reports ambiguity as "no result".
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>, expression: Option<&str>) -> Self {
        AdviceParameterNameDiscoverer {
            registry,
            expression: expression.map(str::to_string),
            returning_name: None,
            throwing_name: None,
            raise_errors: false,
        }
    }

    /// Declare the name the return value binds to
    #[must_use]
    pub fn with_returning_name(mut self, name: Option<&str>) -> Self {
        self.returning_name = name.map(str::to_string);
        self
    }

    /// Declare the name the raised failure binds to
    #[must_use]
    pub fn with_throwing_name(mut self, name: Option<&str>) -> Self {
        self.throwing_name = name.map(str::to_string);
        self
    }

    /// Raise ambiguous and incomplete bindings instead of returning `None`
    #[must_use]
    pub fn with_raise_errors(mut self, raise_errors: bool) -> Self {
        self.raise_errors = raise_errors;
        self
    }

    /// Discover one name per parameter type
    ///
    /// Returns `Ok(None)` when the parameters can not be bound and the discoverer is lenient.
    ///
    /// # Errors
    /// Returns [`Error::AmbiguousBinding`] or [`Error::IncompleteBinding`] when strict, and
    /// [`Error::Configuration`] when the parameter list can not satisfy the declared
    /// returning and throwing names.
    pub fn discover(&self, parameter_types: &[TypeToken]) -> Result<Option<Vec<String>>> {
        let required = usize::from(self.returning_name.is_some())
            + usize::from(self.throwing_name.is_some());
        if parameter_types.len() < required {
            return Err(config_error!(
                "Not enough arguments in method to satisfy binding of returning and throwing variables"
            ));
        }

        let tokens = self.expression.as_deref().map(tokenize).unwrap_or_default();
        let mut pool = BindingPool {
            registry: &self.registry,
            tokens: &tokens,
            returning_name: self.returning_name.as_deref(),
            throwing_name: self.throwing_name.as_deref(),
            types: parameter_types,
            names: vec![None; parameter_types.len()],
            unbound: parameter_types.len(),
        };

        for stage in BindingStage::iter() {
            if pool.unbound == 0 {
                break;
            }
            match pool.run(stage) {
                Ok(()) => {}
                Err(error) if error.is_binding_failure() => return self.give_up(stage, error),
                Err(error) => return Err(error),
            }
        }

        if pool.unbound > 0 {
            let error = Error::IncompleteBinding(format!(
                "Failed to bind all argument names: {} argument(s) could not be bound",
                pool.unbound
            ));
            return self.give_up(BindingStage::ReferencePointcut, error);
        }

        Ok(Some(pool.names.into_iter().flatten().collect()))
    }

    fn give_up(&self, stage: BindingStage, error: Error) -> Result<Option<Vec<String>>> {
        if self.raise_errors {
            return Err(error);
        }
        log::debug!(
            "Parameter name discovery for '{}' gave up at {} stage: {}",
            self.expression.as_deref().unwrap_or_default(),
            stage,
            error
        );
        Ok(None)
    }
}

impl ParameterNameDiscoverer for AdviceParameterNameDiscoverer {
    fn parameter_names(&self, method: &MethodDescriptor) -> Result<Option<Vec<String>>> {
        self.discover(&method.parameter_types)
    }
}

struct BindingPool<'a> {
    registry: &'a TypeRegistry,
    tokens: &'a [&'a str],
    returning_name: Option<&'a str>,
    throwing_name: Option<&'a str>,
    types: &'a [TypeToken],
    names: Vec<Option<String>>,
    unbound: usize,
}

impl BindingPool<'_> {
    fn run(&mut self, stage: BindingStage) -> Result<()> {
        match stage {
            BindingStage::JoinPoint => {
                self.bind_join_point();
                Ok(())
            }
            BindingStage::Throwing => self.bind_throwing(),
            BindingStage::Annotation => self.bind_annotations(),
            BindingStage::Returning => self.bind_returning(),
            BindingStage::PrimitiveArgs => self.bind_primitive_args(),
            BindingStage::ThisTargetArgs => self.bind_this_target_args(),
            BindingStage::ReferencePointcut => self.bind_reference_pointcut(),
        }
    }

    fn bind(&mut self, index: usize, name: &str) {
        self.names[index] = Some(name.to_string());
        self.unbound -= 1;
    }

    fn is_unbound(&self, index: usize) -> bool {
        self.names[index].is_none()
    }

    fn is_bound_name(&self, name: &str) -> bool {
        self.names.iter().flatten().any(|bound| bound == name)
    }

    fn first_unbound(&self) -> Option<usize> {
        self.names.iter().position(Option::is_none)
    }

    fn unbound_assignable_to(&self, ty: TypeToken) -> Vec<usize> {
        (0..self.types.len())
            .filter(|index| self.is_unbound(*index) && self.registry.is_assignable(ty, self.types[*index]))
            .collect()
    }

    fn unbound_primitives(&self) -> Vec<usize> {
        (0..self.types.len())
            .filter(|index| {
                self.is_unbound(*index)
                    && self
                        .registry
                        .get(self.types[*index])
                        .is_some_and(|info| info.is_primitive())
            })
            .collect()
    }

    /// Walk the tokens, collecting variables from every designator `select` accepts
    fn scan(&self, mut select: impl FnMut(&str) -> Option<ScanMode>) -> Vec<String> {
        let mut found = Vec::new();
        let mut index = 0;
        while index < self.tokens.len() {
            let token = self.tokens[index];
            if let Some(mode) = select(token) {
                let body = designator_body(self.tokens, index);
                index += body.tokens_consumed;
                if let Some(text) = body.text {
                    match mode {
                        ScanMode::Single => {
                            if is_variable_name(&text) {
                                found.push(text);
                            }
                        }
                        ScanMode::List => found.extend(variable_names(&text)),
                    }
                }
            }
            index += 1;
        }
        found
    }

    fn bind_join_point(&mut self) {
        let first = self.types[0];
        if Builtin::is_join_point(first) {
            self.bind(0, THIS_JOIN_POINT);
        } else if first == Builtin::StaticPart.token() {
            self.bind(0, THIS_JOIN_POINT_STATIC_PART);
        }
    }

    fn bind_throwing(&mut self) -> Result<()> {
        let Some(throwing) = self.throwing_name else {
            return Ok(());
        };

        match self.unbound_assignable_to(Builtin::Throwable.token()).as_slice() {
            [] => Err(config_error!(
                "Binding of throwing parameter '{}' could not be completed as no available arguments are a subtype of Throwable",
                throwing
            )),
            [index] => {
                self.bind(*index, throwing);
                Ok(())
            }
            [first, second, ..] => Err(Error::AmbiguousBinding(format!(
                "Binding of throwing parameter '{throwing}' is ambiguous: could be bound to argument {first} or {second}"
            ))),
        }
    }

    fn bind_annotations(&mut self) -> Result<()> {
        let candidates = self.scan(|token| {
            if SINGLE_VALUED_ANNOTATION_DESIGNATORS.contains(&designator_keyword(token)) {
                Some(ScanMode::Single)
            } else if token == "@args" || token.starts_with("@args(") {
                Some(ScanMode::List)
            } else {
                None
            }
        });
        if candidates.is_empty() {
            return Ok(());
        }

        let slots = self.unbound_assignable_to(Builtin::Annotation.token());
        match (slots.as_slice(), candidates.as_slice()) {
            ([], _) => Ok(()),
            ([slot], [name]) => {
                self.bind(*slot, name);
                Ok(())
            }
            ([_], _) => Err(Error::AmbiguousBinding(format!(
                "Found {} candidate annotation binding variables but only one potential argument binding slot",
                candidates.len()
            ))),
            (_, _) => Err(Error::AmbiguousBinding(format!(
                "Found {} potential annotation variable(s) and {} potential argument slots",
                candidates.len(),
                slots.len()
            ))),
        }
    }

    fn bind_returning(&mut self) -> Result<()> {
        let Some(returning) = self.returning_name else {
            return Ok(());
        };
        if self.unbound > 1 {
            return Err(Error::AmbiguousBinding(format!(
                "Binding of returning parameter '{returning}' is ambiguous: there are {} candidates",
                self.unbound
            )));
        }
        if let Some(index) = self.first_unbound() {
            self.bind(index, returning);
        }
        Ok(())
    }

    fn bind_primitive_args(&mut self) -> Result<()> {
        let primitives = self.unbound_primitives();
        let slot = match primitives.as_slice() {
            [] => return Ok(()),
            [slot] => *slot,
            _ => {
                return Err(Error::AmbiguousBinding(format!(
                    "Found {} unbound primitive arguments with no way to distinguish between them",
                    primitives.len()
                )))
            }
        };

        let candidates = self.scan(|token| is_args(token).then_some(ScanMode::List));
        match candidates.as_slice() {
            [] => Ok(()),
            [name] => {
                self.bind(slot, name);
                Ok(())
            }
            _ => Err(Error::AmbiguousBinding(format!(
                "Found {} candidate variable names but only one candidate binding slot when matching primitive args",
                candidates.len()
            ))),
        }
    }

    fn bind_this_target_args(&mut self) -> Result<()> {
        if self.unbound > 1 {
            return Err(Error::AmbiguousBinding(format!(
                "Still {} unbound args at this, target, args binding stage, with no way to determine between them",
                self.unbound
            )));
        }

        let candidates: Vec<String> = self
            .scan(|token| {
                let keyword = designator_keyword(token);
                if keyword == "this" || keyword == "target" {
                    Some(ScanMode::Single)
                } else if is_args(token) {
                    Some(ScanMode::List)
                } else {
                    None
                }
            })
            .into_iter()
            .filter(|name| !self.is_bound_name(name))
            .collect();

        self.bind_single_candidate(&candidates, "this, target or args")
    }

    fn bind_reference_pointcut(&mut self) -> Result<()> {
        if self.unbound > 1 {
            return Err(Error::AmbiguousBinding(format!(
                "Still {} unbound args at reference pointcut binding stage, with no way to determine between them",
                self.unbound
            )));
        }

        let mut candidates = Vec::new();
        let mut index = 0;
        while index < self.tokens.len() {
            let token = self.tokens[index];
            let stripped = token.strip_prefix('!').unwrap_or(token);
            let is_call = stripped.contains('(')
                || self
                    .tokens
                    .get(index + 1)
                    .is_some_and(|next| next.starts_with('('));
            if !is_call {
                index += 1;
                continue;
            }

            let body = designator_body(self.tokens, index);
            index += body.tokens_consumed;
            if !is_builtin_keyword(designator_keyword(stripped)) {
                if let Some(text) = body.text.filter(|text| is_variable_name(text)) {
                    candidates.push(text);
                }
            }
            index += 1;
        }

        self.bind_single_candidate(&candidates, "reference pointcut")
    }

    fn bind_single_candidate(&mut self, candidates: &[String], origin: &str) -> Result<()> {
        match candidates {
            [] => Ok(()),
            [name] => {
                if let Some(slot) = self.first_unbound() {
                    self.bind(slot, name);
                }
                Ok(())
            }
            _ => Err(Error::AmbiguousBinding(format!(
                "Found {} candidate {} variables but only one unbound argument slot",
                candidates.len(),
                origin
            ))),
        }
    }
}

#[derive(Clone, Copy)]
enum ScanMode {
    Single,
    List,
}

fn is_args(token: &str) -> bool {
    token == "args" || token.starts_with("args(")
}

fn is_builtin_keyword(keyword: &str) -> bool {
    COMBINATORS.contains(&keyword)
        || DesignatorKind::iter().any(|kind| kind.keyword() == keyword)
}

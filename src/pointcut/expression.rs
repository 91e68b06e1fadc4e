//! The matcher that ties expression text to concrete call sites.
//!
//! [`ExpressionPointcut`] answers the three questions an interception layer asks, each at a
//! different phase:
//!
//! 1. [`ExpressionPointcut::type_could_match`] - when deciding whether a type needs a proxy
//! 2. [`ExpressionPointcut::method_matches_statically`] - when assembling a method's chain
//! 3. [`ExpressionPointcut::matches_at_runtime`] - on every call through a dynamic interceptor
//!
//! The compiled expression is built lazily and shared. Per-method match results are cached
//! and built at most once per method, even under concurrent first use.
//!
//! # Code loading contexts
//!
//! Type names are resolved from the pointcut's loader (its declaration scope's loader, or
//! the aspect instance provider's). When a method's signature types are not visible from
//! there, matching retries with a fallback expression compiled against the declaring type's
//! loader.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;

use crate::{
    config::AspectConfig,
    model::{
        LoaderId, MethodDescriptor, MethodId, TypeFlags, TypeRegistry, TypeToken, Value,
    },
    pointcut::{
        compiler::{compile, CompileRequest, CompiledExpression},
        context::CallContext,
        library::PointcutLibrary,
        shadow::{could_match_type, JoinPointView, MatchOutcome, ShadowMatch, Verdict},
    },
    Error, Result,
};

/// Called once for every shadow match that is built and published
pub type BuildObserver = Arc<dyn Fn(MethodId) + Send + Sync>;

#[derive(Debug, Default, Clone, PartialEq)]
struct PointcutState {
    expression: Option<Arc<str>>,
    parameter_names: Vec<String>,
    parameter_types: Vec<TypeToken>,
    declaration_scope: Option<TypeToken>,
}

/// A pointcut defined by an expression
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use aspectscope::{
///     config::AspectConfig,
///     model::{Builtin, MethodBuilder, TypeBuilder, TypeRegistry},
///     pointcut::ExpressionPointcut,
/// };
///
/// let registry = Arc::new(TypeRegistry::new());
/// let service = TypeBuilder::class("app.Service").build(&registry)?;
/// let set_name = MethodBuilder::new(service, "setName")
///     .param(Builtin::String.token())
///     .build(&registry)?;
///
/// let pointcut = ExpressionPointcut::new(registry.clone(), AspectConfig::default())
///     .with_expression("execution(* set*(..))");
/// assert!(pointcut.type_could_match(service));
/// assert!(pointcut.method_matches_statically(set_name, service, false)?);
/// # Ok::<(), aspectscope::Error>(())
/// ```
pub struct ExpressionPointcut {
    registry: Arc<TypeRegistry>,
    config: AspectConfig,
    library: Option<Arc<PointcutLibrary>>,
    loader_override: Option<LoaderId>,
    observer: Option<BuildObserver>,
    state: RwLock<PointcutState>,
    compiled: RwLock<Option<Arc<CompiledExpression>>>,
    parsing_failed: AtomicBool,
    shadow_cache: DashMap<MethodId, Arc<ShadowMatch>>,
    build_lock: Mutex<()>,
}

impl ExpressionPointcut {
    /// Create a pointcut without expression
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>, config: AspectConfig) -> Self {
        ExpressionPointcut {
            registry,
            config,
            library: None,
            loader_override: None,
            observer: None,
            state: RwLock::new(PointcutState::default()),
            compiled: RwLock::new(None),
            parsing_failed: AtomicBool::new(false),
            shadow_cache: DashMap::new(),
            build_lock: Mutex::new(()),
        }
    }

    /// Set the expression text
    #[must_use]
    pub fn with_expression(self, expression: &str) -> Self {
        self.set_expression(expression);
        self
    }

    /// Set the type the expression was declared in
    #[must_use]
    pub fn with_scope(self, scope: TypeToken) -> Self {
        self.set_declaration_scope(scope);
        self
    }

    /// Resolve named pointcut references from `library`
    #[must_use]
    pub fn with_library(mut self, library: Arc<PointcutLibrary>) -> Self {
        self.library = Some(library);
        self
    }

    /// Resolve type names from `loader` instead of the declaration scope's loader
    #[must_use]
    pub fn with_loader(mut self, loader: LoaderId) -> Self {
        self.loader_override = Some(loader);
        self
    }

    /// Notify `observer` whenever a shadow match is built
    #[must_use]
    pub fn with_observer(mut self, observer: BuildObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The registry this pointcut matches against
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The configuration in effect
    #[must_use]
    pub fn config(&self) -> &AspectConfig {
        &self.config
    }

    /// The expression text, if set
    #[must_use]
    pub fn expression(&self) -> Option<Arc<str>> {
        read_lock!(self.state).expression.clone()
    }

    /// The declared parameter names
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        read_lock!(self.state).parameter_names.clone()
    }

    /// The declared parameter types
    #[must_use]
    pub fn parameter_types(&self) -> Vec<TypeToken> {
        read_lock!(self.state).parameter_types.clone()
    }

    /// The type the expression was declared in
    #[must_use]
    pub fn declaration_scope(&self) -> Option<TypeToken> {
        read_lock!(self.state).declaration_scope
    }

    /// The loader type names are resolved from
    #[must_use]
    pub fn loader(&self) -> LoaderId {
        self.loader_override
            .or_else(|| {
                self.declaration_scope()
                    .and_then(|scope| self.registry.get(scope))
                    .map(|info| info.loader)
            })
            .unwrap_or(LoaderId::BOOTSTRAP)
    }

    /// Replace the expression text
    pub fn set_expression(&self, expression: &str) {
        self.update(|state| {
            if state.expression.as_deref() == Some(expression) {
                return false;
            }
            state.expression = Some(Arc::from(expression));
            true
        });
    }

    /// Replace the declared parameters
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if names and types differ in length.
    pub fn set_parameters(&self, names: &[String], types: &[TypeToken]) -> Result<()> {
        if names.len() != types.len() {
            return Err(config_error!(
                "Number of pointcut parameter names ({}) must match number of parameter types ({})",
                names.len(),
                types.len()
            ));
        }

        self.update(|state| {
            if state.parameter_names == names && state.parameter_types == types {
                return false;
            }
            state.parameter_names = names.to_vec();
            state.parameter_types = types.to_vec();
            true
        });
        Ok(())
    }

    /// Replace the declaration scope
    pub fn set_declaration_scope(&self, scope: TypeToken) {
        self.update(|state| {
            if state.declaration_scope == Some(scope) {
                return false;
            }
            state.declaration_scope = Some(scope);
            true
        });
    }

    /// Apply a state change and drop everything derived from the old state if it changed
    fn update(&self, change: impl FnOnce(&mut PointcutState) -> bool) {
        let changed = with_write!(self.state, change);
        if changed {
            let _guard = lock!(self.build_lock);
            *write_lock!(self.compiled) = None;
            self.shadow_cache.clear();
            self.parsing_failed.store(false, Ordering::Release);
        }
    }

    /// Number of cached shadow matches
    #[must_use]
    pub fn cached_shadow_matches(&self) -> usize {
        self.shadow_cache.len()
    }

    /// Returns true once compilation failed irrecoverably
    #[must_use]
    pub fn has_parsing_failed(&self) -> bool {
        self.parsing_failed.load(Ordering::Acquire)
    }

    fn compile_for(&self, loader: LoaderId) -> Result<CompiledExpression> {
        let state = read_lock!(self.state);
        let Some(expression) = state.expression.clone() else {
            return Err(config_error!(
                "Must set property 'expression' before attempting to match"
            ));
        };

        let request = CompileRequest {
            registry: &self.registry,
            library: self.library.as_deref(),
            scope: state
                .declaration_scope
                .map(|scope| self.registry.type_name(scope)),
            loader,
            parameter_names: &state.parameter_names,
            parameter_types: &state.parameter_types,
            max_reference_depth: self.config.max_reference_depth,
        };
        compile(&expression, &request)
    }

    /// The expression compiled against the pointcut's own loader
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the expression is missing or malformed and
    /// [`crate::Error::Resolution`] if it names types the loader can not see.
    pub fn obtain_compiled(&self) -> Result<Arc<CompiledExpression>> {
        if let Some(compiled) = read_lock!(self.compiled).as_ref() {
            return Ok(compiled.clone());
        }

        let mut slot = write_lock!(self.compiled);
        if let Some(compiled) = slot.as_ref() {
            return Ok(compiled.clone());
        }
        let compiled = Arc::new(self.compile_for(self.loader())?);
        *slot = Some(compiled.clone());
        Ok(compiled)
    }

    /// Compile a fallback expression for `loader`, if fallbacks apply
    fn fallback_for(&self, loader: LoaderId) -> Result<Option<Arc<CompiledExpression>>> {
        if !self.config.enable_fallback_expression || loader == self.loader() {
            return Ok(None);
        }

        log::debug!(
            "Compiling fallback expression for '{}' against {}",
            self.expression().as_deref().unwrap_or_default(),
            loader
        );
        Ok(Some(Arc::new(self.compile_for(loader)?)))
    }

    fn ensure_parsable(&self) -> Result<()> {
        if self.has_parsing_failed() {
            return Err(config_error!(
                "Pointcut expression '{}' previously failed to compile",
                self.expression().as_deref().unwrap_or_default()
            ));
        }
        Ok(())
    }

    fn is_aspect_compiled(&self) -> bool {
        self.declaration_scope()
            .and_then(|scope| self.registry.get(scope))
            .is_some_and(|info| info.flags.contains(TypeFlags::ASPECT_COMPILED))
    }

    /// Returns true if matching can depend on call-time values
    ///
    /// An expression that names types its own loader can not see counts as dynamic, so that
    /// calls are re-checked against the fallback expression.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] if the expression is missing or malformed.
    pub fn is_dynamic(&self) -> Result<bool> {
        match self.obtain_compiled() {
            Ok(compiled) => Ok(compiled.is_dynamic()),
            Err(error) if error.is_resolution_failure() => {
                log::debug!(
                    "Treating unresolvable expression '{}' as dynamic: {}",
                    self.expression().as_deref().unwrap_or_default(),
                    error
                );
                Ok(true)
            }
            Err(error) => Err(error),
        }
    }

    /// Structural prefilter: could any method of `candidate` match?
    ///
    /// Never fails. A malformed expression makes this, and every later call, return `false`.
    #[must_use]
    pub fn type_could_match(&self, candidate: TypeToken) -> bool {
        self.type_could_match_with(candidate, None)
    }

    /// Like [`ExpressionPointcut::type_could_match`], with the name the candidate is being
    /// registered under
    #[must_use]
    pub fn type_could_match_with(&self, candidate: TypeToken, construction_name: Option<&str>) -> bool {
        if self.has_parsing_failed() {
            return false;
        }
        if self.is_aspect_compiled()
            && self
                .registry
                .get(candidate)
                .is_some_and(|info| info.flags.contains(TypeFlags::ASPECT_COMPILED))
        {
            return false;
        }

        match self.could_match_type_inner(candidate, construction_name) {
            Ok(result) => result,
            Err(error @ Error::Configuration { .. }) => {
                self.parsing_failed.store(true, Ordering::Release);
                log::debug!(
                    "Pointcut parser rejected expression '{}': {}",
                    self.expression().as_deref().unwrap_or_default(),
                    error
                );
                false
            }
            Err(error) => {
                log::debug!(
                    "Pointcut matching rejected target type {}: {}",
                    self.registry.type_name(candidate),
                    error
                );
                false
            }
        }
    }

    fn could_match_type_inner(&self, candidate: TypeToken, construction_name: Option<&str>) -> Result<bool> {
        let attempt = self
            .obtain_compiled()
            .and_then(|compiled| self.could_match_compiled(&compiled, candidate, construction_name));

        match attempt {
            Err(error) if error.is_resolution_failure() => {
                log::debug!(
                    "Pointcut matching rejected target type {}, trying fallback expression: {}",
                    self.registry.type_name(candidate),
                    error
                );
                let loader = self.registry.require(candidate)?.loader;
                match self.fallback_for(loader)? {
                    Some(fallback) => self.could_match_compiled(&fallback, candidate, construction_name),
                    None => Err(error),
                }
            }
            other => other,
        }
    }

    fn could_match_compiled(
        &self,
        compiled: &CompiledExpression,
        candidate: TypeToken,
        construction_name: Option<&str>,
    ) -> Result<bool> {
        self.registry.ensure_visible(candidate, compiled.loader)?;
        Ok(could_match_type(&compiled.root, &self.registry, candidate, construction_name).maybe_true())
    }

    /// Static match of a method invoked on `target_type`
    ///
    /// `MAYBE` verdicts whose residue inspects `this` or `target` are refined against the exact
    /// target type. Other residual tests are left to [`ExpressionPointcut::matches_at_runtime`]
    /// and count as a match here.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] for malformed expressions.
    pub fn method_matches_statically(
        &self,
        method: MethodId,
        target_type: TypeToken,
        has_introductions: bool,
    ) -> Result<bool> {
        self.ensure_parsable()?;
        let shadow = self.shadow_match_for(method, target_type)?;
        Ok(match shadow.verdict() {
            Verdict::Always => true,
            Verdict::Never => false,
            Verdict::Maybe if has_introductions => true,
            Verdict::Maybe => {
                let primary = shadow.primary();
                !primary.residue.test.tests_subtype_sensitive_vars()
                    || primary
                        .evaluate_against_type(&self.registry, target_type)
                        .maybe_true()
            }
        })
    }

    /// Runtime match of a concrete call
    ///
    /// On success the captured variables are recorded in `context` under the expression text.
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] for malformed expressions. Resolution failures
    /// are treated as a non-match.
    pub fn matches_at_runtime(
        &self,
        method: MethodId,
        target_type: TypeToken,
        arguments: &[Value],
        context: &mut CallContext,
    ) -> Result<bool> {
        self.ensure_parsable()?;
        let shadow = self.shadow_match_for(method, target_type)?;
        if shadow.verdict() == Verdict::Never {
            return Ok(false);
        }

        let found = {
            let view = JoinPointView {
                this: context.proxy(),
                target: context.target(),
                args: arguments,
                construction_name: context.construction_name(),
            };
            shadow.matches_join_point(&self.registry, &view)?
        };

        match found {
            Some(join_point_match) => {
                context.record_match(join_point_match);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The cached shadow match for `method` on `target_type`, built on first use
    ///
    /// # Errors
    /// Returns [`crate::Error::Configuration`] for malformed expressions and
    /// [`crate::Error::MethodNotFound`] for unknown methods.
    pub fn shadow_match_for(&self, method: MethodId, target_type: TypeToken) -> Result<Arc<ShadowMatch>> {
        let specific = self.registry.most_specific_method(method, target_type);
        if let Some(hit) = self.shadow_cache.get(&specific) {
            log::trace!("Shadow match cache hit for {specific}");
            return Ok(hit.value().clone());
        }

        let _guard = lock!(self.build_lock);
        if let Some(hit) = self.shadow_cache.get(&specific) {
            return Ok(hit.value().clone());
        }

        let built = Arc::new(self.build_shadow(specific, method)?);
        log::debug!(
            "Built {:?} shadow match for {} against '{}'",
            built.verdict(),
            specific,
            built.primary().compiled.expression
        );
        self.shadow_cache.insert(specific, built.clone());
        if let Some(observer) = &self.observer {
            observer(specific);
        }
        Ok(built)
    }

    fn build_shadow(&self, specific: MethodId, original: MethodId) -> Result<ShadowMatch> {
        let descriptor = self.registry.require_method(specific)?;
        let declaring = self.registry.require(descriptor.declaring_type)?;
        let primary = match self.obtain_compiled() {
            Ok(compiled) => Some(compiled),
            Err(error) if error.is_resolution_failure() => {
                log::debug!(
                    "Pointcut expression does not compile against {}, matching {} with fallback expressions: {}",
                    self.loader(),
                    specific,
                    error
                );
                None
            }
            Err(error) => return Err(error),
        };

        if self.is_aspect_compiled() && declaring.flags.contains(TypeFlags::ASPECT_COMPILED) {
            return Ok(ShadowMatch::Resolved(self.never_outcome(primary)));
        }

        let (mut outcome, mut fallback) =
            self.match_with_fallback(primary.as_ref(), &descriptor, declaring.loader)?;

        if specific != original {
            let retry = match &outcome {
                None => true,
                Some(found) => {
                    found.verdict == Verdict::Never && declaring.flags.contains(TypeFlags::PROXY)
                }
            };
            if retry {
                let original_descriptor = self.registry.require_method(original)?;
                let original_loader = self
                    .registry
                    .require(original_descriptor.declaring_type)?
                    .loader;
                let (retried, retried_fallback) =
                    self.match_with_fallback(primary.as_ref(), &original_descriptor, original_loader)?;
                if retried.is_some() {
                    outcome = retried;
                    fallback = retried_fallback;
                }
            }
        }

        Ok(match (outcome, fallback) {
            (None, _) => ShadowMatch::Resolved(self.never_outcome(primary)),
            (Some(outcome), Some(fallback)) if outcome.verdict == Verdict::Maybe => {
                ShadowMatch::Defensive {
                    primary: outcome,
                    fallback,
                }
            }
            (Some(outcome), _) => ShadowMatch::Resolved(outcome),
        })
    }

    fn never_outcome(&self, primary: Option<Arc<CompiledExpression>>) -> MatchOutcome {
        let compiled = primary.unwrap_or_else(|| {
            let expression = self.expression().unwrap_or_else(|| Arc::from(""));
            Arc::new(CompiledExpression::unresolved(expression, self.loader()))
        });
        MatchOutcome::never(compiled)
    }

    /// Match the primary expression, falling back to `loader` on resolution failures
    ///
    /// Returns the outcome (if any expression could resolve the method) and, for undecided
    /// outcomes, a second outcome of the fallback expression to retry at call time.
    fn match_with_fallback(
        &self,
        primary: Option<&Arc<CompiledExpression>>,
        descriptor: &MethodDescriptor,
        loader: LoaderId,
    ) -> Result<(Option<MatchOutcome>, Option<MatchOutcome>)> {
        if let Some(primary) = primary {
            match MatchOutcome::for_method(primary.clone(), &self.registry, descriptor) {
                Ok(outcome) => {
                    let companion = if outcome.verdict == Verdict::Maybe {
                        self.companion_outcome(descriptor, loader)
                    } else {
                        None
                    };
                    return Ok((Some(outcome), companion));
                }
                Err(error) if error.is_resolution_failure() => {
                    log::debug!(
                        "Shadow match for {} failed against {}, trying fallback expression: {}",
                        descriptor.id,
                        primary.loader,
                        error
                    );
                }
                Err(error) => return Err(error),
            }
        }

        let fallback = match self.fallback_for(loader) {
            Ok(Some(fallback)) => fallback,
            Ok(None) => return Ok((None, None)),
            Err(error) if error.is_resolution_failure() => {
                log::debug!("Fallback expression for {} does not compile: {}", descriptor.id, error);
                return Ok((None, None));
            }
            Err(error) => return Err(error),
        };
        match MatchOutcome::for_method(fallback.clone(), &self.registry, descriptor) {
            Ok(outcome) if outcome.verdict == Verdict::Maybe => {
                let retained = MatchOutcome::for_method(fallback, &self.registry, descriptor).ok();
                Ok((Some(outcome), retained))
            }
            Ok(outcome) => Ok((Some(outcome), None)),
            Err(error) if error.is_resolution_failure() => Ok((None, None)),
            Err(error) => Err(error),
        }
    }

    fn companion_outcome(&self, descriptor: &MethodDescriptor, loader: LoaderId) -> Option<MatchOutcome> {
        match self.fallback_for(loader) {
            Ok(Some(fallback)) => MatchOutcome::for_method(fallback, &self.registry, descriptor).ok(),
            Ok(None) => None,
            Err(error) => {
                log::debug!("No fallback expression for {}: {}", descriptor.id, error);
                None
            }
        }
    }
}

impl fmt::Display for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read_lock!(self.state);
        write!(f, "ExpressionPointcut: (")?;
        for (index, (name, ty)) in state
            .parameter_names
            .iter()
            .zip(state.parameter_types.iter())
            .enumerate()
        {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", self.registry.type_name(*ty), name)?;
        }
        write!(f, ") {}", state.expression.as_deref().unwrap_or("<pointcut expression not set>"))
    }
}

impl fmt::Debug for ExpressionPointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionPointcut")
            .field("state", &*read_lock!(self.state))
            .field("parsing_failed", &self.has_parsing_failed())
            .field("cached_shadow_matches", &self.shadow_cache.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Builtin, MethodBuilder, TypeBuilder};
    use std::sync::atomic::AtomicUsize;

    fn counting_observer() -> (BuildObserver, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let observer: BuildObserver = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (observer, count)
    }

    #[test]
    fn test_sticky_parse_failure() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let run = MethodBuilder::new(service, "run").build(&registry)?;

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* *(..)");
        assert!(!pointcut.type_could_match(service));
        assert!(pointcut.has_parsing_failed());
        assert!(!pointcut.type_could_match(service));
        assert!(matches!(
            pointcut.method_matches_statically(run, service, false),
            Err(Error::Configuration { .. })
        ));

        pointcut.set_expression("execution(* run())");
        assert!(!pointcut.has_parsing_failed());
        assert!(pointcut.type_could_match(service));
        Ok(())
    }

    #[test]
    fn test_missing_expression() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let run = MethodBuilder::new(service, "run").build(&registry)?;

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default());
        assert!(matches!(
            pointcut.method_matches_statically(run, service, false),
            Err(Error::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_shadow_built_once() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let run = MethodBuilder::new(service, "run").build(&registry)?;
        let (observer, count) = counting_observer();

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* run())")
            .with_observer(observer);
        assert!(pointcut.method_matches_statically(run, service, false)?);
        assert!(pointcut.method_matches_statically(run, service, false)?);
        let mut context = CallContext::new();
        assert!(pointcut.matches_at_runtime(run, service, &[], &mut context)?);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(pointcut.cached_shadow_matches(), 1);
        Ok(())
    }

    #[test]
    fn test_setter_invalidates_only_on_change() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let run = MethodBuilder::new(service, "run").build(&registry)?;

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* run())");
        pointcut.method_matches_statically(run, service, false)?;
        assert_eq!(pointcut.cached_shadow_matches(), 1);

        pointcut.set_expression("execution(* run())");
        pointcut.set_parameters(&[], &[])?;
        assert_eq!(pointcut.cached_shadow_matches(), 1);

        pointcut.set_expression("execution(* stop())");
        assert_eq!(pointcut.cached_shadow_matches(), 0);
        assert!(!pointcut.method_matches_statically(run, service, false)?);
        Ok(())
    }

    #[test]
    fn test_parameter_count_checked() {
        let registry = Arc::new(TypeRegistry::new());
        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default());
        assert!(pointcut
            .set_parameters(&["x".to_string()], &[])
            .is_err());
    }

    #[test]
    fn test_overridden_method_uses_specific_shadow() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let base = TypeBuilder::class("app.Base").build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;
        let run = MethodBuilder::new(base, "run").build(&registry)?;
        let run_override = MethodBuilder::new(derived, "run").build(&registry)?;
        let (observer, count) = counting_observer();

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("within(app.Derived)")
            .with_observer(observer);
        assert!(pointcut.method_matches_statically(run, derived, false)?);
        assert!(pointcut.method_matches_statically(run_override, derived, false)?);
        assert!(!pointcut.method_matches_statically(run, base, false)?);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn test_aspect_compiled_is_not_intercepted_twice() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let aspect = TypeBuilder::class("app.Aspect")
            .flags(TypeFlags::ASPECT_COMPILED)
            .build(&registry)?;
        let woven = TypeBuilder::class("app.Woven")
            .flags(TypeFlags::ASPECT_COMPILED)
            .build(&registry)?;
        let plain = TypeBuilder::class("app.Plain").build(&registry)?;
        let run = MethodBuilder::new(woven, "run").build(&registry)?;

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* *(..))")
            .with_scope(aspect);
        assert!(!pointcut.type_could_match(woven));
        assert!(pointcut.type_could_match(plain));
        assert!(!pointcut.method_matches_statically(run, woven, false)?);
        Ok(())
    }

    #[test]
    fn test_target_refinement_and_introductions() -> Result<()> {
        let registry = Arc::new(TypeRegistry::new());
        let base = TypeBuilder::class("app.Base").build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;
        let run = MethodBuilder::new(base, "run").build(&registry)?;

        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default())
            .with_expression("execution(* run()) && target(app.Derived)");
        assert!(pointcut.method_matches_statically(run, derived, false)?);
        assert!(!pointcut.method_matches_statically(run, base, false)?);
        assert!(pointcut.method_matches_statically(run, base, true)?);
        assert!(pointcut.is_dynamic()?);

        let accept = MethodBuilder::new(base, "accept")
            .param(Builtin::Object.token())
            .build(pointcut.registry())?;
        let arguments = ExpressionPointcut::new(pointcut.registry().clone(), AspectConfig::default())
            .with_expression("execution(* accept(..)) && args(app.Derived)");
        let shadow = arguments.shadow_match_for(accept, base)?;
        assert_eq!(shadow.verdict(), Verdict::Maybe);
        assert!(!shadow.primary().residue.test.tests_subtype_sensitive_vars());
        assert!(arguments.method_matches_statically(accept, base, false)?);
        Ok(())
    }

    #[test]
    fn test_display() {
        let registry = Arc::new(TypeRegistry::new());
        let pointcut = ExpressionPointcut::new(registry, AspectConfig::default());
        assert_eq!(
            pointcut.to_string(),
            "ExpressionPointcut: () <pointcut expression not set>"
        );
        pointcut.set_expression("args(x)");
        assert!(pointcut
            .set_parameters(&["x".to_string()], &[Builtin::String.token()])
            .is_ok());
        assert_eq!(pointcut.to_string(), "ExpressionPointcut: (String x) args(x)");
    }
}

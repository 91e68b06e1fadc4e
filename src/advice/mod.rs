//! Advice and its five invocation shapes.
//!
//! An [`Advice`] pairs an advice body with the pointcut that selects its join points and the
//! [`ArgumentBinder`] that feeds it. Which shape it has decides when the body runs relative
//! to the intercepted call:
//!
//! | Shape | Runs | Outcome of the call |
//! |-------|------|---------------------|
//! | [`Advice::Before`] | before proceeding | unchanged, the chain always continues |
//! | [`Advice::After`] | after proceeding, on success and failure | unchanged unless the body fails |
//! | [`Advice::AfterReturning`] | after a compatible return value | unchanged |
//! | [`Advice::AfterThrowing`] | after a compatible failure | the failure is always re-raised |
//! | [`Advice::Around`] | instead of the call | whatever the body returns |
//!
//! Advice is chained by an [`AdvisorChainFactory`] and executed by [`MethodInvocation`].
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use aspectscope::{
//!     advice::{AdviceBuilder, AdviceKind, Advisor, AdvisorChainFactory,
//!              MethodInvocation, SingletonAspectInstanceFactory, TargetFn},
//!     config::AspectConfig,
//!     model::{Builtin, Instance, MethodBuilder, TypeBuilder, TypeRegistry, Value},
//!     pointcut::ExpressionPointcut,
//! };
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let service = TypeBuilder::class("app.Service").build(&registry)?;
//! let aspect = TypeBuilder::class("app.Tracing").build(&registry)?;
//! let greet = MethodBuilder::new(service, "greet")
//!     .param(Builtin::String.token())
//!     .returns(Builtin::String.token())
//!     .build(&registry)?;
//! let shout = MethodBuilder::new(aspect, "shout")
//!     .param(Builtin::ProceedingJoinPoint.token())
//!     .returns(Builtin::Object.token())
//!     .build(&registry)?;
//!
//! let pointcut = Arc::new(
//!     ExpressionPointcut::new(registry.clone(), AspectConfig::default())
//!         .with_expression("execution(* greet(..))")
//!         .with_scope(aspect),
//! );
//! let factory = Arc::new(SingletonAspectInstanceFactory::new(Arc::new(Instance::new(aspect))));
//! let advice = AdviceBuilder::new(AdviceKind::Around, pointcut, shout, factory, |_, args| {
//!     let proceeding = args[0].proceeding().expect("around advice gets a proceeding join point");
//!     let name = proceeding.args()[0].as_str().unwrap_or_default().to_uppercase();
//!     proceeding.proceed_with(vec![Value::from(name)])
//! })
//! .build()?;
//!
//! let advisors = vec![Arc::new(Advisor::new(advice))];
//! let chain = AdvisorChainFactory::new(AspectConfig::default())
//!     .interceptors_for(&advisors, greet, service, false)?;
//! let target: TargetFn = Arc::new(|args: &[Value]| Ok(args[0].clone()));
//! let mut invocation = MethodInvocation::new(registry, greet, service, vec![Value::from("bob")], chain, target)?;
//! assert_eq!(invocation.proceed()?, Value::from("BOB"));
//! # Ok::<(), aspectscope::Error>(())
//! ```

mod advisor;
mod instance;
mod invocation;
mod joinpoint;

use std::fmt;
use std::sync::Arc;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
    binding::ArgumentBinder,
    model::{
        Builtin, Fault, Instance, MethodDescriptor, MethodDescriptorRc, MethodId, TypeRegistry,
        TypeToken, Value,
    },
    pointcut::ExpressionPointcut,
    Error, Result,
};

pub use advisor::{sort_advisors, Advisor, AdvisorChainFactory};
pub use instance::{
    AspectInstanceFactory, LazySingletonAspectInstanceFactory, SingletonAspectInstanceFactory,
};
pub use invocation::{Interceptor, MethodInvocation, TargetFn};
pub use joinpoint::{JoinPoint, ProceedingJoinPoint, StaticPart, METHOD_EXECUTION};

/// The five advice shapes, in their precedence order within one aspect
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, AsRefStr, Display,
)]
#[strum(serialize_all = "camelCase")]
pub enum AdviceKind {
    /// Runs instead of the call
    Around,
    /// Runs before the call
    Before,
    /// Runs after the call, whatever its outcome
    After,
    /// Runs after the call returned
    AfterReturning,
    /// Runs after the call failed
    AfterThrowing,
}

impl AdviceKind {
    /// Rank among advice of the same aspect and order, lower runs first
    #[must_use]
    pub fn precedence(self) -> u8 {
        self as u8
    }
}

/// One argument passed to an advice body
#[derive(Debug, Clone)]
pub enum AdviceArg {
    /// The join point
    JoinPoint(JoinPoint),
    /// The proceeding join point of around advice
    ProceedingJoinPoint(ProceedingJoinPoint),
    /// The static part of the join point
    StaticPart(StaticPart),
    /// A captured variable, the return value or the raised failure
    Value(Value),
}

impl AdviceArg {
    /// The value, for value arguments
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            AdviceArg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The join point view, for both plain and proceeding join points
    #[must_use]
    pub fn join_point(&self) -> Option<&JoinPoint> {
        match self {
            AdviceArg::JoinPoint(join_point) => Some(join_point),
            AdviceArg::ProceedingJoinPoint(proceeding) => Some(proceeding.join_point()),
            _ => None,
        }
    }

    /// The proceeding join point
    #[must_use]
    pub fn proceeding(&self) -> Option<&ProceedingJoinPoint> {
        match self {
            AdviceArg::ProceedingJoinPoint(proceeding) => Some(proceeding),
            _ => None,
        }
    }

    /// The static part of the join point this argument carries
    #[must_use]
    pub fn static_part(&self) -> Option<StaticPart> {
        match self {
            AdviceArg::StaticPart(static_part) => Some(static_part.clone()),
            _ => self.join_point().map(|join_point| join_point.static_part().clone()),
        }
    }
}

/// The code of an advice, invoked on the aspect object with the bound arguments
pub type AdviceBody = Arc<dyn Fn(&Instance, &[AdviceArg]) -> Result<Value> + Send + Sync>;

/// What every advice shape shares
pub struct AspectAdvice {
    pointcut: Arc<ExpressionPointcut>,
    method: MethodDescriptorRc,
    body: AdviceBody,
    instance_factory: Arc<dyn AspectInstanceFactory>,
    binder: ArgumentBinder,
    declaration_order: usize,
    aspect_name: String,
}

impl AspectAdvice {
    /// The pointcut selecting the join points
    #[must_use]
    pub fn pointcut(&self) -> &Arc<ExpressionPointcut> {
        &self.pointcut
    }

    /// The advice method
    #[must_use]
    pub fn method(&self) -> &MethodDescriptorRc {
        &self.method
    }

    /// The binder feeding the body
    #[must_use]
    pub fn binder(&self) -> &ArgumentBinder {
        &self.binder
    }

    /// The provider of the aspect object
    #[must_use]
    pub fn instance_factory(&self) -> &Arc<dyn AspectInstanceFactory> {
        &self.instance_factory
    }

    /// Position of the advice in its aspect
    #[must_use]
    pub fn declaration_order(&self) -> usize {
        self.declaration_order
    }

    /// Full name of the declaring aspect
    #[must_use]
    pub fn aspect_name(&self) -> &str {
        &self.aspect_name
    }

    fn invoke_with_binding(
        &self,
        invocation: &MethodInvocation,
        join_point: AdviceArg,
        return_value: Option<Value>,
        fault: Option<Arc<Fault>>,
    ) -> Result<Value> {
        let expression = self.pointcut.expression();
        let join_point_match = expression
            .as_deref()
            .and_then(|expression| invocation.context().join_point_match(expression));
        let args = self.binder.bind(
            &self.pointcut,
            Some(join_point),
            join_point_match,
            return_value,
            fault,
        )?;

        let instance = self.instance_factory.instance()?;
        log::trace!(
            "Invoking advice {}.{} for {}",
            self.aspect_name,
            self.method.name,
            invocation.method().name
        );
        (self.body)(&instance, &args)
    }

    fn invoke_plain(
        &self,
        invocation: &MethodInvocation,
        return_value: Option<Value>,
        fault: Option<Arc<Fault>>,
    ) -> Result<Value> {
        let join_point = AdviceArg::JoinPoint(JoinPoint::from_invocation(invocation));
        self.invoke_with_binding(invocation, join_point, return_value, fault)
    }
}

/// Advice of one of the five shapes
pub enum Advice {
    /// Runs before the call
    Before(AspectAdvice),
    /// Runs after the call, whatever its outcome
    After(AspectAdvice),
    /// Runs after the call returned a compatible value
    AfterReturning(AspectAdvice),
    /// Runs after the call raised a compatible failure
    AfterThrowing(AspectAdvice),
    /// Runs instead of the call
    Around(AspectAdvice),
}

impl Advice {
    fn wrap(kind: AdviceKind, core: AspectAdvice) -> Self {
        match kind {
            AdviceKind::Before => Advice::Before(core),
            AdviceKind::After => Advice::After(core),
            AdviceKind::AfterReturning => Advice::AfterReturning(core),
            AdviceKind::AfterThrowing => Advice::AfterThrowing(core),
            AdviceKind::Around => Advice::Around(core),
        }
    }

    /// The shape of this advice
    #[must_use]
    pub fn kind(&self) -> AdviceKind {
        match self {
            Advice::Before(_) => AdviceKind::Before,
            Advice::After(_) => AdviceKind::After,
            Advice::AfterReturning(_) => AdviceKind::AfterReturning,
            Advice::AfterThrowing(_) => AdviceKind::AfterThrowing,
            Advice::Around(_) => AdviceKind::Around,
        }
    }

    /// The shared advice state
    #[must_use]
    pub fn core(&self) -> &AspectAdvice {
        match self {
            Advice::Before(core)
            | Advice::After(core)
            | Advice::AfterReturning(core)
            | Advice::AfterThrowing(core)
            | Advice::Around(core) => core,
        }
    }

    /// The pointcut selecting the join points
    #[must_use]
    pub fn pointcut(&self) -> &Arc<ExpressionPointcut> {
        self.core().pointcut()
    }

    /// Run the advice around the rest of the invocation
    ///
    /// # Errors
    /// Propagates failures of the body and of the remaining chain. [`Error::Thrown`] failures
    /// of the call pass through after and after-throwing advice unchanged.
    pub fn invoke(&self, invocation: &mut MethodInvocation) -> Result<Value> {
        match self {
            Advice::Before(core) => {
                core.invoke_plain(invocation, None, None)?;
                invocation.proceed()
            }
            Advice::After(core) => {
                let outcome = invocation.proceed();
                core.invoke_plain(invocation, None, None)?;
                outcome
            }
            Advice::AfterReturning(core) => {
                let value = invocation.proceed()?;
                let returning_type = core.binder.calculate_bindings(&core.pointcut)?.returning_type();
                if matches_return_value(invocation.registry(), returning_type, invocation.method(), &value) {
                    core.invoke_plain(invocation, Some(value.clone()), None)?;
                }
                Ok(value)
            }
            Advice::AfterThrowing(core) => match invocation.proceed() {
                Err(Error::Thrown(fault)) => {
                    let throwing_type = core.binder.calculate_bindings(&core.pointcut)?.throwing_type();
                    if invocation.registry().is_assignable(throwing_type, fault.fault_type) {
                        core.invoke_plain(invocation, None, Some(fault.clone()))?;
                    }
                    Err(Error::Thrown(fault))
                }
                outcome => outcome,
            },
            Advice::Around(core) => {
                let proceeding = ProceedingJoinPoint::new(invocation);
                core.invoke_with_binding(
                    invocation,
                    AdviceArg::ProceedingJoinPoint(proceeding),
                    None,
                    None,
                )
            }
        }
    }
}

/// Decide whether after-returning advice applies to `value`
///
/// Present values must be assignable to the returning type. Without a value the declared
/// return type decides, and an `Object` returning type also accepts `void` methods.
fn matches_return_value(
    registry: &TypeRegistry,
    returning_type: TypeToken,
    method: &MethodDescriptor,
    value: &Value,
) -> bool {
    match value {
        Value::Null | Value::Void => {
            (returning_type == Builtin::Object.token() && method.return_type == Builtin::Void.token())
                || registry.is_assignable(returning_type, method.return_type)
        }
        value => registry.is_assignable_value(returning_type, value),
    }
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core();
        write!(
            f,
            "{} advice {}.{} for '{}'",
            self.kind(),
            core.aspect_name,
            core.method.name,
            core.pointcut.expression().as_deref().unwrap_or_default()
        )
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Assembles an [`Advice`]
///
/// Building computes the argument bindings eagerly, so a misdeclared advice fails here
/// rather than at its first call.
pub struct AdviceBuilder {
    kind: AdviceKind,
    pointcut: Arc<ExpressionPointcut>,
    method: MethodId,
    instance_factory: Arc<dyn AspectInstanceFactory>,
    body: AdviceBody,
    returning_name: Option<String>,
    throwing_name: Option<String>,
    arg_names: Option<String>,
    declaration_order: usize,
}

impl AdviceBuilder {
    /// Start an advice of `kind` for the advice method `method`
    pub fn new(
        kind: AdviceKind,
        pointcut: Arc<ExpressionPointcut>,
        method: MethodId,
        instance_factory: Arc<dyn AspectInstanceFactory>,
        body: impl Fn(&Instance, &[AdviceArg]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        AdviceBuilder {
            kind,
            pointcut,
            method,
            instance_factory,
            body: Arc::new(body),
            returning_name: None,
            throwing_name: None,
            arg_names: None,
            declaration_order: 0,
        }
    }

    /// Bind the return value to the parameter called `name`
    #[must_use]
    pub fn returning(mut self, name: &str) -> Self {
        self.returning_name = Some(name.to_string());
        self
    }

    /// Bind the raised failure to the parameter called `name`
    #[must_use]
    pub fn throwing(mut self, name: &str) -> Self {
        self.throwing_name = Some(name.to_string());
        self
    }

    /// Spell out the parameter names, comma separated
    #[must_use]
    pub fn arg_names(mut self, names: &str) -> Self {
        self.arg_names = Some(names.to_string());
        self
    }

    /// Position of the advice in its aspect
    #[must_use]
    pub fn declaration_order(mut self, order: usize) -> Self {
        self.declaration_order = order;
        self
    }

    /// Build the advice
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the advice method is unknown, if a returning or
    /// throwing name is declared on the wrong shape, or if the parameters can not be bound.
    pub fn build(self) -> Result<Advice> {
        if self.returning_name.is_some() && self.kind != AdviceKind::AfterReturning {
            return Err(config_error!(
                "Only after returning advice can bind the return value, not {} advice",
                self.kind
            ));
        }
        if self.throwing_name.is_some() && self.kind != AdviceKind::AfterThrowing {
            return Err(config_error!(
                "Only after throwing advice can bind the raised failure, not {} advice",
                self.kind
            ));
        }

        let registry = self.pointcut.registry().clone();
        let method = registry.require_method(self.method)?;
        let mut binder = ArgumentBinder::new(
            registry.clone(),
            *self.pointcut.config(),
            method.clone(),
            self.kind,
        )
        .with_returning_name(self.returning_name.as_deref())
        .with_throwing_name(self.throwing_name.as_deref());
        if let Some(names) = &self.arg_names {
            binder = binder.with_arg_names(names)?;
        }
        binder.calculate_bindings(&self.pointcut)?;

        let core = AspectAdvice {
            aspect_name: registry.type_name(method.declaring_type),
            pointcut: self.pointcut,
            method,
            body: self.body,
            instance_factory: self.instance_factory,
            binder,
            declaration_order: self.declaration_order,
        };
        Ok(Advice::wrap(self.kind, core))
    }
}

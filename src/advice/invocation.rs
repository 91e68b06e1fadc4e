//! The interceptor chain executor.

use std::fmt;
use std::sync::Arc;

use crate::{
    advice::Advisor,
    model::{MethodDescriptorRc, MethodId, TypeRegistry, TypeToken, Value},
    pointcut::CallContext,
    Result,
};

/// The intercepted operation itself, called once the chain is exhausted
pub type TargetFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// One element of an interceptor chain
#[derive(Clone)]
pub enum Interceptor {
    /// Runs its advice unconditionally
    Static(Arc<Advisor>),
    /// Re-checks its pointcut against the call before running its advice
    Dynamic(Arc<Advisor>),
}

impl Interceptor {
    /// The advisor behind this interceptor
    #[must_use]
    pub fn advisor(&self) -> &Arc<Advisor> {
        match self {
            Interceptor::Static(advisor) | Interceptor::Dynamic(advisor) => advisor,
        }
    }

    /// Returns true if the pointcut is re-checked per call
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Interceptor::Dynamic(_))
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dynamic() { "Dynamic" } else { "Static" };
        write!(f, "{kind}({})", self.advisor())
    }
}

/// A call travelling through its interceptor chain
///
/// Every [`MethodInvocation::proceed`] runs the next interceptor, or the target once all of
/// them ran. Cloning an invocation captures its position, so a clone proceeds from the same
/// point; around advice relies on this to proceed more than once.
#[derive(Clone)]
pub struct MethodInvocation {
    registry: Arc<TypeRegistry>,
    method: MethodDescriptorRc,
    target_type: TypeToken,
    arguments: Vec<Value>,
    interceptors: Arc<[Interceptor]>,
    cursor: usize,
    target_fn: TargetFn,
    context: CallContext,
}

impl MethodInvocation {
    /// Create an invocation of `method` on an object of `target_type`
    ///
    /// # Errors
    /// Returns [`crate::Error::MethodNotFound`] if `method` is not registered.
    pub fn new(
        registry: Arc<TypeRegistry>,
        method: MethodId,
        target_type: TypeToken,
        arguments: Vec<Value>,
        interceptors: Arc<[Interceptor]>,
        target_fn: TargetFn,
    ) -> Result<Self> {
        let method = registry.require_method(method)?;
        Ok(MethodInvocation {
            registry,
            method,
            target_type,
            arguments,
            interceptors,
            cursor: 0,
            target_fn,
            context: CallContext::new(),
        })
    }

    /// Replace the call context
    #[must_use]
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    /// The registry the call is resolved against
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// The invoked method
    #[must_use]
    pub fn method(&self) -> &MethodDescriptorRc {
        &self.method
    }

    /// The exact type of the target object
    #[must_use]
    pub fn target_type(&self) -> TypeToken {
        self.target_type
    }

    /// The current arguments
    #[must_use]
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// The per-call context
    #[must_use]
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Number of interceptors in the chain
    #[must_use]
    pub fn chain_len(&self) -> usize {
        self.interceptors.len()
    }

    /// Run the rest of the chain and then the target
    ///
    /// # Errors
    /// Propagates failures of advice bodies, of the target and of runtime matching.
    pub fn proceed(&mut self) -> Result<Value> {
        let Some(interceptor) = self.interceptors.get(self.cursor).cloned() else {
            return (self.target_fn)(&self.arguments);
        };
        self.cursor += 1;

        match interceptor {
            Interceptor::Static(advisor) => advisor.advice().invoke(self),
            Interceptor::Dynamic(advisor) => {
                let matched = advisor.advice().pointcut().matches_at_runtime(
                    self.method.id,
                    self.target_type,
                    &self.arguments,
                    &mut self.context,
                )?;
                if matched {
                    advisor.advice().invoke(self)
                } else {
                    log::trace!("Skipping {} for {}", advisor, self.method.name);
                    self.proceed()
                }
            }
        }
    }

    /// A copy that proceeds from the current position
    #[must_use]
    pub fn invocable_clone(&self) -> Self {
        self.clone()
    }

    /// A copy that proceeds from the current position with different arguments
    #[must_use]
    pub fn invocable_clone_with(&self, arguments: Vec<Value>) -> Self {
        MethodInvocation {
            arguments,
            ..self.clone()
        }
    }
}

impl fmt::Debug for MethodInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("method", &self.method.name)
            .field("target_type", &self.target_type)
            .field("arguments", &self.arguments)
            .field("cursor", &self.cursor)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

//! What advice sees of the intercepted call.

use std::fmt;
use std::sync::Arc;

use crate::{
    advice::MethodInvocation,
    model::{MethodDescriptorRc, MethodId, MethodModifiers, TypeRegistry, Value},
    Error, Result,
};

/// The kind of every join point this engine intercepts
pub const METHOD_EXECUTION: &str = "method-execution";

/// The part of a join point that is the same for every call of the method
#[derive(Debug, Clone)]
pub struct StaticPart {
    method: MethodDescriptorRc,
}

impl StaticPart {
    /// Create the static part for a method
    #[must_use]
    pub fn new(method: MethodDescriptorRc) -> Self {
        StaticPart { method }
    }

    /// The intercepted method
    #[must_use]
    pub fn method_id(&self) -> MethodId {
        self.method.id
    }

    /// The intercepted method's descriptor
    #[must_use]
    pub fn signature(&self) -> &MethodDescriptorRc {
        &self.method
    }

    /// The join point kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        METHOD_EXECUTION
    }
}

impl PartialEq for StaticPart {
    fn eq(&self, other: &Self) -> bool {
        self.method.id == other.method.id
    }
}

/// A call as seen from advice
#[derive(Clone)]
pub struct JoinPoint {
    registry: Arc<TypeRegistry>,
    static_part: StaticPart,
    this: Option<Value>,
    target: Option<Value>,
    args: Vec<Value>,
}

impl JoinPoint {
    /// Capture the current state of an invocation
    #[must_use]
    pub fn from_invocation(invocation: &MethodInvocation) -> Self {
        JoinPoint {
            registry: invocation.registry().clone(),
            static_part: StaticPart::new(invocation.method().clone()),
            this: invocation.context().this().cloned(),
            target: invocation.context().target().cloned(),
            args: invocation.arguments().to_vec(),
        }
    }

    /// The call arguments
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The currently executing object, the proxy if there is one
    #[must_use]
    pub fn this(&self) -> Option<&Value> {
        self.this.as_ref()
    }

    /// The target object
    #[must_use]
    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    /// The intercepted method's descriptor
    #[must_use]
    pub fn signature(&self) -> &MethodDescriptorRc {
        self.static_part.signature()
    }

    /// The join point kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.static_part.kind()
    }

    /// The static part
    #[must_use]
    pub fn static_part(&self) -> &StaticPart {
        &self.static_part
    }

    /// `execution(Service.setName(..))`
    #[must_use]
    pub fn to_short_string(&self) -> String {
        let method = self.signature();
        let declaring = self
            .registry
            .get(method.declaring_type)
            .map(|info| info.name.clone())
            .unwrap_or_default();
        format!("execution({declaring}.{}(..))", method.name)
    }

    /// `execution(public void app.Service.setName(String))`
    #[must_use]
    pub fn to_long_string(&self) -> String {
        let modifiers = modifier_keywords(self.signature().modifiers);
        if modifiers.is_empty() {
            format!("execution({})", self.describe())
        } else {
            format!("execution({modifiers} {})", self.describe())
        }
    }

    fn describe(&self) -> String {
        let method = self.signature();
        let parameters: Vec<String> = method
            .parameter_types
            .iter()
            .map(|ty| self.registry.type_name(*ty))
            .collect();
        format!(
            "{} {}.{}({})",
            self.registry.type_name(method.return_type),
            self.registry.type_name(method.declaring_type),
            method.name,
            parameters.join(",")
        )
    }
}

fn modifier_keywords(modifiers: MethodModifiers) -> String {
    const KEYWORDS: [(MethodModifiers, &str); 7] = [
        (MethodModifiers::PUBLIC, "public"),
        (MethodModifiers::PROTECTED, "protected"),
        (MethodModifiers::PRIVATE, "private"),
        (MethodModifiers::ABSTRACT, "abstract"),
        (MethodModifiers::STATIC, "static"),
        (MethodModifiers::FINAL, "final"),
        (MethodModifiers::SYNCHRONIZED, "synchronized"),
    ];
    KEYWORDS
        .iter()
        .filter(|(flag, _)| modifiers.contains(*flag))
        .map(|(_, keyword)| *keyword)
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution({})", self.describe())
    }
}

impl fmt::Debug for JoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature().name)
            .field("this", &self.this)
            .field("target", &self.target)
            .field("args", &self.args)
            .finish()
    }
}

/// A join point that around advice can proceed
///
/// Each proceed runs the rest of the interceptor chain and the target from the position the
/// around advice was invoked at.
#[derive(Clone)]
pub struct ProceedingJoinPoint {
    join_point: JoinPoint,
    invocation: MethodInvocation,
}

impl ProceedingJoinPoint {
    /// Wrap the invocation at its current position
    #[must_use]
    pub fn new(invocation: &MethodInvocation) -> Self {
        ProceedingJoinPoint {
            join_point: JoinPoint::from_invocation(invocation),
            invocation: invocation.invocable_clone(),
        }
    }

    /// The plain join point view
    #[must_use]
    pub fn join_point(&self) -> &JoinPoint {
        &self.join_point
    }

    /// The call arguments
    #[must_use]
    pub fn args(&self) -> &[Value] {
        self.join_point.args()
    }

    /// Continue with the original arguments
    ///
    /// # Errors
    /// Propagates failures of the remaining chain and the target.
    pub fn proceed(&self) -> Result<Value> {
        self.invocation.invocable_clone().proceed()
    }

    /// Continue with replaced arguments
    ///
    /// # Errors
    /// Returns [`Error::InvalidArguments`] if `arguments` differs in length from the original
    /// arguments, and propagates failures of the remaining chain and the target.
    pub fn proceed_with(&self, arguments: Vec<Value>) -> Result<Value> {
        let expected = self.invocation.arguments().len();
        if arguments.len() != expected {
            return Err(Error::InvalidArguments(format!(
                "Expecting {} arguments to proceed, but was passed {} arguments",
                expected,
                arguments.len()
            )));
        }
        self.invocation.invocable_clone_with(arguments).proceed()
    }
}

impl fmt::Debug for ProceedingJoinPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProceedingJoinPoint")
            .field(&self.join_point)
            .finish()
    }
}

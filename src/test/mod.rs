//! Shared fixtures for unit tests

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use crate::{
    advice::{
        AdviceArg, AdviceBuilder, AdviceKind, Advisor, AdvisorChainFactory, AspectInstanceFactory,
        MethodInvocation, SingletonAspectInstanceFactory, TargetFn,
    },
    config::AspectConfig,
    model::{Builtin, Fault, Instance, MethodBuilder, MethodId, TypeBuilder, TypeRegistry, TypeToken, Value},
    pointcut::{CallContext, ExpressionPointcut},
    Error, Result,
};

/// Records every invocation of the advice bodies it backs
#[derive(Debug, Default)]
pub struct Recorder {
    invocations: Mutex<Vec<Vec<Value>>>,
}

impl Recorder {
    pub fn new() -> Arc<Recorder> {
        Arc::new(Recorder::default())
    }

    /// Value arguments of every invocation, in call order
    pub fn values(&self) -> Vec<Vec<Value>> {
        lock!(self.invocations).clone()
    }

    pub fn count(&self) -> usize {
        lock!(self.invocations).len()
    }

    // Around advice proceeds, everything else returns null
    fn record(&self, args: &[AdviceArg]) -> Result<Value> {
        let values = args.iter().filter_map(AdviceArg::value).cloned().collect();
        lock!(self.invocations).push(values);
        match args.iter().find_map(AdviceArg::proceeding) {
            Some(proceeding) => proceeding.proceed(),
            None => Ok(Value::Null),
        }
    }
}

/// A small program: one service, one aspect and two failure types
pub struct Fixture {
    pub registry: Arc<TypeRegistry>,
    pub service: TypeToken,
    pub aspect: TypeToken,
    pub illegal_state: TypeToken,
    pub illegal_argument: TypeToken,
    pub set_name: MethodId,
    pub set_age: MethodId,
    pub get_name: MethodId,
    pub fail: MethodId,
    target_calls: Arc<AtomicUsize>,
    advice_methods: AtomicUsize,
}

/// Build the fixture program
///
/// `app.Service` declares `setName(String)`, `setAge(int)`, `getName()` returning "stored" and
/// `fail()` raising `app.IllegalStateException`.
pub fn fixture() -> Fixture {
    let registry = Arc::new(TypeRegistry::new());
    let runtime_exception = Builtin::RuntimeException.token();
    let illegal_state = TypeBuilder::class("app.IllegalStateException")
        .extends(runtime_exception)
        .build(&registry)
        .unwrap();
    let illegal_argument = TypeBuilder::class("app.IllegalArgumentException")
        .extends(runtime_exception)
        .build(&registry)
        .unwrap();

    let service = TypeBuilder::class("app.Service").build(&registry).unwrap();
    let aspect = TypeBuilder::class("app.Tracing").build(&registry).unwrap();

    let set_name = MethodBuilder::new(service, "setName")
        .param(Builtin::String.token())
        .build(&registry)
        .unwrap();
    let set_age = MethodBuilder::new(service, "setAge")
        .param(Builtin::Int.token())
        .build(&registry)
        .unwrap();
    let get_name = MethodBuilder::new(service, "getName")
        .returns(Builtin::String.token())
        .build(&registry)
        .unwrap();
    let fail = MethodBuilder::new(service, "fail")
        .throws(illegal_state)
        .build(&registry)
        .unwrap();

    Fixture {
        registry,
        service,
        aspect,
        illegal_state,
        illegal_argument,
        set_name,
        set_age,
        get_name,
        fail,
        target_calls: Arc::new(AtomicUsize::new(0)),
        advice_methods: AtomicUsize::new(0),
    }
}

impl Fixture {
    /// Declare a method on the aspect
    pub fn advice_method(&self, name: &str, parameter_types: &[TypeToken]) -> MethodId {
        MethodBuilder::new(self.aspect, name)
            .params(parameter_types)
            .build(&self.registry)
            .unwrap()
    }

    /// A pointcut declared in the aspect
    pub fn pointcut(&self, expression: &str) -> Arc<ExpressionPointcut> {
        Arc::new(
            ExpressionPointcut::new(self.registry.clone(), AspectConfig::default())
                .with_expression(expression)
                .with_scope(self.aspect),
        )
    }

    pub fn aspect_factory(&self) -> Arc<dyn AspectInstanceFactory> {
        Arc::new(SingletonAspectInstanceFactory::new(Arc::new(Instance::new(
            self.aspect,
        ))))
    }

    /// An advisor whose body reports to `recorder`
    ///
    /// The advice method gets a fresh name and the given parameter types. `customize` may set
    /// returning or throwing names before the advice is built.
    pub fn advisor(
        &self,
        kind: AdviceKind,
        expression: &str,
        parameter_types: &[TypeToken],
        recorder: &Arc<Recorder>,
        customize: impl FnOnce(AdviceBuilder) -> AdviceBuilder,
    ) -> Result<Arc<Advisor>> {
        let index = self.advice_methods.fetch_add(1, Ordering::SeqCst);
        let method = self.advice_method(&format!("advice{index}"), parameter_types);
        let recorder = recorder.clone();
        let builder = AdviceBuilder::new(
            kind,
            self.pointcut(expression),
            method,
            self.aspect_factory(),
            move |_, args| recorder.record(args),
        );
        Ok(Arc::new(Advisor::new(customize(builder).build()?)))
    }

    /// Call `method` on a service object through the advisors that apply to it
    pub fn call(&self, advisors: &[Arc<Advisor>], method: MethodId, arguments: Vec<Value>) -> Result<Value> {
        let chain = AdvisorChainFactory::new(AspectConfig::default()).interceptors_for(
            advisors,
            method,
            self.service,
            false,
        )?;

        let calls = self.target_calls.clone();
        let (get_name, fail, illegal_state) = (self.get_name, self.fail, self.illegal_state);
        let target: TargetFn = Arc::new(move |_: &[Value]| {
            calls.fetch_add(1, Ordering::SeqCst);
            if method == get_name {
                Ok(Value::from("stored"))
            } else if method == fail {
                Err(Error::Thrown(Arc::new(Fault::new(illegal_state, "failed"))))
            } else {
                Ok(Value::Void)
            }
        });

        let object = Value::from(Arc::new(Instance::new(self.service)));
        let context = CallContext::new()
            .with_target(object.clone())
            .with_proxy(object);
        MethodInvocation::new(self.registry.clone(), method, self.service, arguments, chain, target)?
            .with_context(context)
            .proceed()
    }

    /// Number of times the service itself ran
    pub fn target_calls(&self) -> usize {
        self.target_calls.load(Ordering::SeqCst)
    }
}

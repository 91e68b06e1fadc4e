use std::sync::{Arc, OnceLock};

use crate::{
    advice::{AdviceArg, AdviceKind},
    binding::{
        chain::{
            ArgNamesDiscoverer, DeclaredNamesDiscoverer, ParameterNameDiscoverer,
            PrioritizedDiscoverer,
        },
        discoverer::AdviceParameterNameDiscoverer,
    },
    config::AspectConfig,
    model::{Builtin, Fault, MethodDescriptorRc, TypeRegistry, TypeToken, Value},
    pointcut::{ExpressionPointcut, JoinPointMatch},
    Error, Result,
};

/// What an advice parameter receives at call time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// The join point, or the proceeding join point for around advice
    JoinPoint,
    /// The static part of the join point
    JoinPointStaticPart,
    /// A variable captured by the pointcut
    Variable(String),
    /// The return value
    Returning,
    /// The raised failure
    Throwing,
}

/// The role of every parameter of one advice method
#[derive(Debug, Clone, PartialEq)]
pub struct RoleMap {
    roles: Vec<Role>,
    returning_type: TypeToken,
    throwing_type: TypeToken,
}

impl RoleMap {
    /// Roles in parameter order
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns true for advice without parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// The type of the returning parameter, `Object` if there is none
    #[must_use]
    pub fn returning_type(&self) -> TypeToken {
        self.returning_type
    }

    /// The type of the throwing parameter, `Object` if there is none
    #[must_use]
    pub fn throwing_type(&self) -> TypeToken {
        self.throwing_type
    }

    /// Parameter index of the given role
    #[must_use]
    pub fn index_of(&self, role: &Role) -> Option<usize> {
        self.roles.iter().position(|candidate| candidate == role)
    }

    /// Parameter index of a captured variable
    #[must_use]
    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.roles
            .iter()
            .position(|role| matches!(role, Role::Variable(variable) if variable == name))
    }

    /// Captured variables with their parameter indices
    pub fn variables(&self) -> impl Iterator<Item = (usize, &str)> {
        self.roles
            .iter()
            .enumerate()
            .filter_map(|(index, role)| match role {
                Role::Variable(name) => Some((index, name.as_str())),
                _ => None,
            })
    }

    fn has_bindings(&self) -> bool {
        self.roles
            .iter()
            .any(|role| matches!(role, Role::Variable(_) | Role::Returning | Role::Throwing))
    }
}

/// Maps an advice method's parameters to the values available at a join point
///
/// The [`RoleMap`] is computed on first use and kept for the lifetime of the binder.
/// Computing it also declares the captured variables as parameters of the pointcut.
pub struct ArgumentBinder {
    registry: Arc<TypeRegistry>,
    config: AspectConfig,
    method: MethodDescriptorRc,
    kind: AdviceKind,
    returning_name: Option<String>,
    throwing_name: Option<String>,
    arg_names: Option<ArgNamesDiscoverer>,
    roles: OnceLock<RoleMap>,
}

impl ArgumentBinder {
    /// Create a binder for an advice method of the given kind
    #[must_use]
    pub fn new(
        registry: Arc<TypeRegistry>,
        config: AspectConfig,
        method: MethodDescriptorRc,
        kind: AdviceKind,
    ) -> Self {
        ArgumentBinder {
            registry,
            config,
            method,
            kind,
            returning_name: None,
            throwing_name: None,
            arg_names: None,
            roles: OnceLock::new(),
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

    /// Spell out the parameter names instead of discovering them
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if a name is not a valid identifier.
    pub fn with_arg_names(mut self, names: &str) -> Result<Self> {
        self.arg_names = Some(ArgNamesDiscoverer::parse(names)?);
        Ok(self)
    }

    /// The advice method
    #[must_use]
    pub fn method(&self) -> &MethodDescriptorRc {
        &self.method
    }

    /// The advice kind
    #[must_use]
    pub fn kind(&self) -> AdviceKind {
        self.kind
    }

    /// The declared returning name
    #[must_use]
    pub fn returning_name(&self) -> Option<&str> {
        self.returning_name.as_deref()
    }

    /// The declared throwing name
    #[must_use]
    pub fn throwing_name(&self) -> Option<&str> {
        self.throwing_name.as_deref()
    }

    /// The role map, if already computed
    #[must_use]
    pub fn role_map(&self) -> Option<&RoleMap> {
        self.roles.get()
    }

    fn discovery_chain(&self, expression: Option<&str>) -> PrioritizedDiscoverer {
        if let Some(explicit) = &self.arg_names {
            return PrioritizedDiscoverer::new().with(explicit.clone());
        }

        let mut chain = PrioritizedDiscoverer::new();
        if self.config.use_declared_parameter_names {
            chain = chain.with(DeclaredNamesDiscoverer);
        }
        chain.with(
            AdviceParameterNameDiscoverer::new(self.registry.clone(), expression)
                .with_returning_name(self.returning_name.as_deref())
                .with_throwing_name(self.throwing_name.as_deref())
                .with_raise_errors(self.config.strict_parameter_discovery),
        )
    }

    /// Compute the role map and declare the captured variables on `pointcut`
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if the parameters can not be bound, and the
    /// discoverer's errors when it runs in strict mode.
    pub fn calculate_bindings(&self, pointcut: &ExpressionPointcut) -> Result<&RoleMap> {
        if let Some(roles) = self.roles.get() {
            return Ok(roles);
        }
        let computed = self.compute(pointcut)?;
        Ok(self.roles.get_or_init(|| computed))
    }

    fn compute(&self, pointcut: &ExpressionPointcut) -> Result<RoleMap> {
        let types = &self.method.parameter_types;
        let object = Builtin::Object.token();
        let mut roles = Vec::with_capacity(types.len());

        if let Some(first) = types.first().copied() {
            if first == Builtin::ProceedingJoinPoint.token() {
                if self.kind != AdviceKind::Around {
                    return Err(config_error!(
                        "ProceedingJoinPoint is only supported for around advice"
                    ));
                }
                roles.push(Role::JoinPoint);
            } else if first == Builtin::JoinPoint.token() {
                roles.push(Role::JoinPoint);
            } else if first == Builtin::StaticPart.token() {
                roles.push(Role::JoinPointStaticPart);
            }
        }

        let offset = roles.len();
        let mut variable_names = Vec::new();
        let mut variable_types = Vec::new();
        if offset < types.len() {
            let expression = pointcut.expression();
            let names = self
                .discovery_chain(expression.as_deref())
                .parameter_names(&self.method)?
                .ok_or_else(|| {
                    config_error!(
                        "Advice method [{}] requires {} arguments to be bound by name, but the argument names were not specified and could not be discovered",
                        self.method.name,
                        types.len() - offset
                    )
                })?;
            if names.len() != types.len() {
                return Err(config_error!(
                    "Expecting to find {} arguments to bind by name in advice, but actually found {} arguments",
                    types.len(),
                    names.len()
                ));
            }

            for (name, ty) in names.into_iter().zip(types.iter()).skip(offset) {
                if self.returning_name.as_deref() == Some(name.as_str()) {
                    roles.push(Role::Returning);
                } else if self.throwing_name.as_deref() == Some(name.as_str()) {
                    roles.push(Role::Throwing);
                } else {
                    variable_names.push(name.clone());
                    variable_types.push(*ty);
                    roles.push(Role::Variable(name));
                }
            }
        }

        let returning_type = match &self.returning_name {
            Some(name) => {
                let index = roles.iter().position(|role| *role == Role::Returning).ok_or_else(|| {
                    config_error!(
                        "Returning argument name '{}' was not bound in advice arguments",
                        name
                    )
                })?;
                types[index]
            }
            None => object,
        };
        let throwing_type = match &self.throwing_name {
            Some(name) => {
                let index = roles.iter().position(|role| *role == Role::Throwing).ok_or_else(|| {
                    config_error!(
                        "Throwing argument name '{}' was not bound in advice arguments",
                        name
                    )
                })?;
                types[index]
            }
            None => object,
        };

        pointcut.set_parameters(&variable_names, &variable_types)?;
        log::debug!(
            "Bound {} parameter(s) of advice method {} as {:?}",
            roles.len(),
            self.method.name,
            roles
        );

        Ok(RoleMap {
            roles,
            returning_type,
            throwing_type,
        })
    }

    /// Assemble the advice arguments for one call
    ///
    /// `join_point` fills a join point slot (a static part slot takes its static part), the
    /// captured variables of `join_point_match` fill the variable slots, and `return_value`
    /// and `fault` fill the returning and throwing slots.
    ///
    /// # Errors
    /// Returns [`Error::InvocationMismatch`] if not every parameter could be filled.
    pub fn bind(
        &self,
        pointcut: &ExpressionPointcut,
        join_point: Option<AdviceArg>,
        join_point_match: Option<&JoinPointMatch>,
        return_value: Option<Value>,
        fault: Option<Arc<Fault>>,
    ) -> Result<Vec<AdviceArg>> {
        let roles = self.calculate_bindings(pointcut)?;
        let mut slots: Vec<Option<AdviceArg>> = (0..roles.len()).map(|_| None).collect();
        let mut bound = 0;

        if let Some(join_point) = join_point {
            if let Some(index) = roles.index_of(&Role::JoinPoint) {
                slots[index] = Some(join_point);
                bound += 1;
            } else if let Some(index) = roles.index_of(&Role::JoinPointStaticPart) {
                if let Some(static_part) = join_point.static_part() {
                    slots[index] = Some(AdviceArg::StaticPart(static_part));
                    bound += 1;
                }
            }
        }

        if roles.has_bindings() {
            if let Some(found) = join_point_match {
                for parameter in found.parameters() {
                    if let Some(index) = roles.variable_index(&parameter.name) {
                        slots[index] = Some(AdviceArg::Value(parameter.value.clone()));
                        bound += 1;
                    }
                }
            }
            if let Some(index) = roles.index_of(&Role::Returning) {
                slots[index] = Some(AdviceArg::Value(return_value.unwrap_or(Value::Null)));
                bound += 1;
            }
            if let Some(index) = roles.index_of(&Role::Throwing) {
                slots[index] = Some(AdviceArg::Value(fault.map_or(Value::Null, Value::Fault)));
                bound += 1;
            }
        }

        if bound != roles.len() {
            return Err(Error::InvocationMismatch {
                expected: roles.len(),
                bound,
                matched: join_point_match.is_some(),
            });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MethodBuilder, TypeBuilder};
    use crate::pointcut::PointcutParameter;

    struct Fixture {
        registry: Arc<TypeRegistry>,
        aspect: TypeToken,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(TypeRegistry::new());
        let aspect = TypeBuilder::class("app.Aspect").build(&registry).unwrap();
        Fixture { registry, aspect }
    }

    fn advice(fixture: &Fixture, builder: MethodBuilder) -> MethodDescriptorRc {
        let id = builder.build(&fixture.registry).unwrap();
        fixture.registry.require_method(id).unwrap()
    }

    fn pointcut(fixture: &Fixture, expression: &str) -> ExpressionPointcut {
        ExpressionPointcut::new(fixture.registry.clone(), AspectConfig::default())
            .with_expression(expression)
    }

    #[test]
    fn test_variables_configure_pointcut() -> Result<()> {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "before")
                .params(&[Builtin::JoinPoint.token(), Builtin::String.token()]),
        );
        let pointcut = pointcut(&fixture, "execution(* set*(..)) && args(x)");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::Before,
        );

        let roles = binder.calculate_bindings(&pointcut)?;
        assert_eq!(roles.roles(), &[Role::JoinPoint, Role::Variable("x".to_string())]);
        assert_eq!(pointcut.parameter_names(), vec!["x".to_string()]);
        assert_eq!(pointcut.parameter_types(), vec![Builtin::String.token()]);
        assert!(binder.role_map().is_some());
        Ok(())
    }

    #[test]
    fn test_proceeding_join_point_requires_around() {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "before").param(Builtin::ProceedingJoinPoint.token()),
        );
        let pointcut = pointcut(&fixture, "execution(* *(..))");

        let before = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method.clone(),
            AdviceKind::Before,
        );
        assert!(matches!(
            before.calculate_bindings(&pointcut),
            Err(Error::Configuration { .. })
        ));

        let around = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::Around,
        );
        assert!(around.calculate_bindings(&pointcut).is_ok());
    }

    #[test]
    fn test_returning_type_discovered() -> Result<()> {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "afterReturning")
                .params(&[Builtin::JoinPoint.token(), Builtin::String.token()]),
        );
        let pointcut = pointcut(&fixture, "execution(* get*(..))");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::AfterReturning,
        )
        .with_returning_name(Some("result"));

        let roles = binder.calculate_bindings(&pointcut)?;
        assert_eq!(roles.returning_type(), Builtin::String.token());
        assert_eq!(roles.throwing_type(), Builtin::Object.token());
        assert!(pointcut.parameter_names().is_empty());
        Ok(())
    }

    #[test]
    fn test_explicit_names_must_cover_returning() -> Result<()> {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "afterReturning").param(Builtin::Object.token()),
        );
        let pointcut = pointcut(&fixture, "execution(* get*(..))");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::AfterReturning,
        )
        .with_returning_name(Some("result"))
        .with_arg_names("value")?;

        assert!(matches!(
            binder.calculate_bindings(&pointcut),
            Err(Error::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_declared_names_and_count_mismatch() -> Result<()> {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "before")
                .params(&[Builtin::String.token(), Builtin::Int.token()])
                .parameter_names(&["name", "age"]),
        );
        let pointcut = pointcut(&fixture, "args(name, age)");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method.clone(),
            AdviceKind::Before,
        );
        assert_eq!(binder.calculate_bindings(&pointcut)?.len(), 2);

        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::Before,
        )
        .with_arg_names("name")?;
        assert!(matches!(
            binder.calculate_bindings(&pointcut),
            Err(Error::Configuration { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_undiscoverable_names() {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "before").param(Builtin::String.token()),
        );
        let pointcut = pointcut(&fixture, "execution(* *(..))");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::lenient(),
            method,
            AdviceKind::Before,
        );
        assert!(matches!(
            binder.calculate_bindings(&pointcut),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_bind_fills_every_slot() -> Result<()> {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "afterThrowing")
                .params(&[Builtin::String.token(), Builtin::Throwable.token()]),
        );
        let pointcut = pointcut(&fixture, "execution(* *(..)) && args(name)");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::AfterThrowing,
        )
        .with_throwing_name(Some("ex"));

        let found = JoinPointMatch::new(
            Arc::from("execution(* *(..)) && args(name)"),
            vec![PointcutParameter {
                name: "name".to_string(),
                parameter_type: Builtin::String.token(),
                value: Value::from("a"),
            }],
        );
        let fault = Arc::new(Fault::new(Builtin::RuntimeException.token(), "boom"));
        let args = binder.bind(&pointcut, None, Some(&found), None, Some(fault.clone()))?;
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].value(), Some(&Value::from("a")));
        assert_eq!(args[1].value(), Some(&Value::Fault(fault)));
        Ok(())
    }

    #[test]
    fn test_missing_capture_is_mismatch() {
        let fixture = fixture();
        let method = advice(
            &fixture,
            MethodBuilder::new(fixture.aspect, "before").param(Builtin::String.token()),
        );
        let pointcut = pointcut(&fixture, "args(name)");
        let binder = ArgumentBinder::new(
            fixture.registry.clone(),
            AspectConfig::default(),
            method,
            AdviceKind::Before,
        );

        let result = binder.bind(&pointcut, None, None, None, None);
        assert!(matches!(
            result,
            Err(Error::InvocationMismatch {
                expected: 1,
                bound: 0,
                matched: false
            })
        ));
    }
}

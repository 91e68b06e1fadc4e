//! Shadow matching: static verdicts for concrete methods and their runtime residue.
//!
//! A shadow is the place in the program where a join point can occur, here the execution of
//! one method. Matching a compiled expression against a shadow yields a [`Verdict`] plus the
//! [`Residue`] that has to be checked once the actual receiver and arguments are known.

use std::sync::Arc;

use crate::{
    model::{
        LoaderId, MethodDescriptor, MethodModifiers, TypeRegistry, TypeToken, Value,
    },
    pointcut::{
        compiler::{ArgPattern, CompiledExpression, Node, TypeRef},
        context::{JoinPointMatch, PointcutParameter},
        residue::{
            bean_matches, Binding, BindingSource, FuzzyBool, Residue, TargetTypeEnvironment,
            Test, TestEnvironment, Var,
        },
    },
    Result,
};

/// The static verdict of a shadow match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every join point at the shadow matches
    Always,
    /// No join point at the shadow matches
    Never,
    /// The residue decides at call time
    Maybe,
}

impl From<FuzzyBool> for Verdict {
    fn from(value: FuzzyBool) -> Self {
        match value {
            FuzzyBool::Yes => Verdict::Always,
            FuzzyBool::No => Verdict::Never,
            FuzzyBool::Maybe => Verdict::Maybe,
        }
    }
}

/// The receivers and arguments of one call
#[derive(Debug, Clone, Copy)]
pub struct JoinPointView<'a> {
    /// The proxy the call went through, `this` falls back to the target if absent
    pub this: Option<&'a Value>,
    /// The target object
    pub target: Option<&'a Value>,
    /// The call arguments
    pub args: &'a [Value],
    /// Name of the object the call is made on, as registered with the container
    pub construction_name: Option<&'a str>,
}

/// The result of matching one compiled expression against one method
#[derive(Debug)]
pub struct MatchOutcome {
    /// Static verdict
    pub verdict: Verdict,
    /// Remaining runtime test and bindings
    pub residue: Residue,
    /// The expression this outcome was produced by
    pub compiled: Arc<CompiledExpression>,
}

impl MatchOutcome {
    /// An outcome that never matches
    #[must_use]
    pub fn never(compiled: Arc<CompiledExpression>) -> Self {
        MatchOutcome {
            verdict: Verdict::Never,
            residue: Residue::never(),
            compiled,
        }
    }

    /// Match a compiled expression against a method execution shadow
    ///
    /// # Errors
    /// Returns [`crate::Error::Resolution`] if a parameter or return type of the method is not
    /// visible from the expression's loader.
    pub fn for_method(
        compiled: Arc<CompiledExpression>,
        registry: &TypeRegistry,
        method: &MethodDescriptor,
    ) -> Result<Self> {
        for referenced in method
            .parameter_types
            .iter()
            .chain(std::iter::once(&method.return_type))
        {
            registry.ensure_visible(*referenced, compiled.loader)?;
        }

        let shadow = ShadowContext { registry, method };
        let mut bindings = Vec::new();
        let (verdict, test) = shadow.evaluate(&compiled.root, &mut bindings);
        let verdict = Verdict::from(verdict);
        let residue = match verdict {
            Verdict::Never => Residue::never(),
            _ => Residue { test, bindings },
        };

        Ok(MatchOutcome {
            verdict,
            residue,
            compiled,
        })
    }

    /// Decide the residue against the exact target type
    ///
    /// Only `target` tests can be decided this way; every other test stays undecided.
    #[must_use]
    pub fn evaluate_against_type(&self, registry: &TypeRegistry, target_type: TypeToken) -> FuzzyBool {
        match self.verdict {
            Verdict::Always => FuzzyBool::Yes,
            Verdict::Never => FuzzyBool::No,
            Verdict::Maybe => {
                let environment = TargetTypeEnvironment {
                    registry,
                    target_type,
                };
                self.residue
                    .test
                    .evaluate(&environment)
                    .unwrap_or(FuzzyBool::Maybe)
            }
        }
    }

    /// Evaluate the residue for a concrete call
    ///
    /// Returns the captured parameters if and only if the join point definitely matches.
    ///
    /// # Errors
    /// Returns [`crate::Error::Resolution`] if an inspected value's type is not visible from
    /// the expression's loader.
    pub fn matches_join_point(
        &self,
        registry: &TypeRegistry,
        view: &JoinPointView<'_>,
    ) -> Result<Option<JoinPointMatch>> {
        let environment = RuntimeEnvironment {
            registry,
            loader: self.compiled.loader,
            view,
        };

        let verdict = match self.verdict {
            Verdict::Never => return Ok(None),
            Verdict::Always => FuzzyBool::Yes,
            Verdict::Maybe => self.residue.test.evaluate(&environment)?,
        };
        log::trace!(
            "Runtime verdict {:?} for '{}'",
            verdict,
            self.compiled.expression
        );
        if !verdict.always_true() {
            return Ok(None);
        }

        let mut parameters = Vec::with_capacity(self.residue.bindings.len());
        for binding in &self.residue.bindings {
            let value = match &binding.source {
                BindingSource::Var(var) => environment.value(*var).cloned().unwrap_or(Value::Null),
                BindingSource::Constant(value) => value.clone(),
                BindingSource::VarAnnotation { var, ty } => environment
                    .value(*var)
                    .and_then(Value::runtime_type)
                    .and_then(|runtime_type| registry.type_annotation(runtime_type, *ty))
                    .map_or(Value::Null, Value::Annotation),
            };
            parameters.push(PointcutParameter {
                name: self.compiled.parameter_names[binding.slot].clone(),
                parameter_type: self.compiled.parameter_types[binding.slot],
                value,
            });
        }

        Ok(Some(JoinPointMatch::new(
            self.compiled.expression.clone(),
            parameters,
        )))
    }
}

/// A published shadow match
#[derive(Debug)]
pub enum ShadowMatch {
    /// A single outcome
    Resolved(MatchOutcome),
    /// An outcome whose runtime checks fall back to a second expression if the first one can
    /// not resolve the inspected types
    Defensive {
        /// Outcome of the expression compiled against the pointcut's own loader
        primary: MatchOutcome,
        /// Outcome of the expression compiled against the declaring type's loader
        fallback: MatchOutcome,
    },
}

impl ShadowMatch {
    /// The outcome whose static verdict governs this shadow
    #[must_use]
    pub fn primary(&self) -> &MatchOutcome {
        match self {
            ShadowMatch::Resolved(outcome) => outcome,
            ShadowMatch::Defensive { primary, .. } => primary,
        }
    }

    /// The static verdict
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.primary().verdict
    }

    /// Returns true for the defensive composite
    #[must_use]
    pub fn is_defensive(&self) -> bool {
        matches!(self, ShadowMatch::Defensive { .. })
    }

    /// Evaluate the shadow for a concrete call
    ///
    /// A resolution failure in the primary residue switches to the fallback. A resolution
    /// failure in the fallback is a non-match.
    ///
    /// # Errors
    /// Propagates everything but resolution failures.
    pub fn matches_join_point(
        &self,
        registry: &TypeRegistry,
        view: &JoinPointView<'_>,
    ) -> Result<Option<JoinPointMatch>> {
        let (primary, fallback) = match self {
            ShadowMatch::Resolved(outcome) => (outcome, None),
            ShadowMatch::Defensive { primary, fallback } => (primary, Some(fallback)),
        };

        match primary.matches_join_point(registry, view) {
            Err(error) if error.is_resolution_failure() => {
                let Some(fallback) = fallback else {
                    log::debug!("Runtime match rejected: {error}");
                    return Ok(None);
                };
                log::debug!("Runtime match failed on primary expression, trying fallback: {error}");
                match fallback.matches_join_point(registry, view) {
                    Err(error) if error.is_resolution_failure() => {
                        log::debug!("Runtime match rejected by fallback expression: {error}");
                        Ok(None)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }
}

struct ShadowContext<'a> {
    registry: &'a TypeRegistry,
    method: &'a MethodDescriptor,
}

impl ShadowContext<'_> {
    fn declaring(&self) -> TypeToken {
        self.method.declaring_type
    }

    fn is_static(&self) -> bool {
        self.method.modifiers.contains(MethodModifiers::STATIC)
    }

    fn evaluate(&self, node: &Node, bindings: &mut Vec<Binding>) -> (FuzzyBool, Test) {
        match node {
            Node::And(left, right) => {
                let (left, left_test) = self.evaluate(left, bindings);
                if left == FuzzyBool::No {
                    return (FuzzyBool::No, Test::False);
                }
                let (right, right_test) = self.evaluate(right, bindings);
                let verdict = left.and(right);
                (verdict, Test::from_verdict(verdict, Test::and(left_test, right_test)))
            }
            Node::Or(left, right) => {
                let (left, left_test) = self.evaluate(left, bindings);
                let (right, right_test) = self.evaluate(right, bindings);
                let verdict = left.or(right);
                (verdict, Test::from_verdict(verdict, Test::or(left_test, right_test)))
            }
            Node::Not(inner) => {
                let (inner, inner_test) = self.evaluate(inner, bindings);
                let verdict = inner.not();
                (verdict, Test::from_verdict(verdict, Test::negate(inner_test)))
            }
            Node::Execution(pattern) | Node::WithinCode(pattern) => {
                Self::decided(pattern.matches(self.registry, self.method))
            }
            Node::Within(pattern) => Self::decided(pattern.matches(self.registry, self.declaring())),
            Node::This(reference) => self.receiver_type(Var::This, reference, bindings),
            Node::Target(reference) => self.receiver_type(Var::Target, reference, bindings),
            Node::Args(patterns) => self.arguments(patterns, bindings, false),
            Node::AtArgs(patterns) => self.arguments(patterns, bindings, true),
            Node::AtAnnotation(reference) | Node::AtWithinCode(reference) => {
                let found = self.method.annotation(reference.ty);
                Self::constant_annotation(found, reference, bindings)
            }
            Node::AtWithin(reference) => {
                let found = self.registry.type_annotation(self.declaring(), reference.ty);
                Self::constant_annotation(found, reference, bindings)
            }
            Node::AtThis(reference) => self.receiver_annotation(Var::This, reference, bindings),
            Node::AtTarget(reference) => self.receiver_annotation(Var::Target, reference, bindings),
            Node::Bean(pattern) => (FuzzyBool::Maybe, Test::Bean(pattern.clone())),
        }
    }

    fn decided(value: bool) -> (FuzzyBool, Test) {
        let verdict = FuzzyBool::from(value);
        (verdict, Test::from_verdict(verdict, Test::True))
    }

    fn constant_annotation(
        found: Option<Arc<crate::model::AnnotationInstance>>,
        reference: &TypeRef,
        bindings: &mut Vec<Binding>,
    ) -> (FuzzyBool, Test) {
        match found {
            Some(annotation) => {
                if let Some(slot) = reference.binding {
                    bindings.push(Binding {
                        slot,
                        source: BindingSource::Constant(Value::Annotation(annotation)),
                    });
                }
                (FuzzyBool::Yes, Test::True)
            }
            None => (FuzzyBool::No, Test::False),
        }
    }

    fn receiver_type(
        &self,
        var: Var,
        reference: &TypeRef,
        bindings: &mut Vec<Binding>,
    ) -> (FuzzyBool, Test) {
        if self.is_static() {
            return (FuzzyBool::No, Test::False);
        }

        let verdict = self.registry.could_be_instance(self.declaring(), reference.ty);
        if verdict != FuzzyBool::No {
            if let Some(slot) = reference.binding {
                bindings.push(Binding {
                    slot,
                    source: BindingSource::Var(var),
                });
            }
        }
        (
            verdict,
            Test::from_verdict(verdict, Test::InstanceOf { var, ty: reference.ty }),
        )
    }

    fn receiver_annotation(
        &self,
        var: Var,
        reference: &TypeRef,
        bindings: &mut Vec<Binding>,
    ) -> (FuzzyBool, Test) {
        if self.is_static() {
            return (FuzzyBool::No, Test::False);
        }

        let declaring_is_final = self
            .registry
            .get(self.declaring())
            .is_some_and(|info| info.is_final());
        if declaring_is_final {
            let found = self.registry.type_annotation(self.declaring(), reference.ty);
            return Self::constant_annotation(found, reference, bindings);
        }

        if let Some(slot) = reference.binding {
            bindings.push(Binding {
                slot,
                source: BindingSource::VarAnnotation {
                    var,
                    ty: reference.ty,
                },
            });
        }
        (
            FuzzyBool::Maybe,
            Test::HasAnnotation { var, ty: reference.ty },
        )
    }

    /// Align argument patterns with the method's parameters
    fn align(patterns: &[ArgPattern], arity: usize) -> Option<Vec<(usize, TypeRef)>> {
        let ellipsis = patterns
            .iter()
            .position(|pattern| *pattern == ArgPattern::Ellipsis);

        let positioned: Vec<(usize, &ArgPattern)> = match ellipsis {
            None => {
                if patterns.len() != arity {
                    return None;
                }
                patterns.iter().enumerate().collect()
            }
            Some(split) => {
                let trailing = patterns.len() - split - 1;
                if split + trailing > arity {
                    return None;
                }
                patterns[..split]
                    .iter()
                    .enumerate()
                    .chain(
                        patterns[split + 1..]
                            .iter()
                            .enumerate()
                            .map(|(offset, pattern)| (arity - trailing + offset, pattern)),
                    )
                    .collect()
            }
        };

        Some(
            positioned
                .into_iter()
                .filter_map(|(position, pattern)| match pattern {
                    ArgPattern::Type(reference) => Some((position, *reference)),
                    _ => None,
                })
                .collect(),
        )
    }

    fn arguments(
        &self,
        patterns: &[ArgPattern],
        bindings: &mut Vec<Binding>,
        annotations: bool,
    ) -> (FuzzyBool, Test) {
        let Some(aligned) = Self::align(patterns, self.method.arity()) else {
            return (FuzzyBool::No, Test::False);
        };

        let mut verdict = FuzzyBool::Yes;
        let mut test = Test::True;
        let mut captured = Vec::new();
        for (position, reference) in aligned {
            let parameter_type = self.method.parameter_types[position];
            let var = Var::Arg(position);

            let (arg_verdict, arg_test, source) = if annotations {
                self.argument_annotation(var, parameter_type, reference.ty)
            } else {
                let arg_verdict = self.registry.could_be_instance(parameter_type, reference.ty);
                (
                    arg_verdict,
                    Test::from_verdict(arg_verdict, Test::InstanceOf { var, ty: reference.ty }),
                    BindingSource::Var(var),
                )
            };

            verdict = verdict.and(arg_verdict);
            if verdict == FuzzyBool::No {
                return (FuzzyBool::No, Test::False);
            }
            test = Test::and(test, arg_test);
            if let Some(slot) = reference.binding {
                captured.push(Binding { slot, source });
            }
        }

        bindings.extend(captured);
        (verdict, Test::from_verdict(verdict, test))
    }

    fn argument_annotation(
        &self,
        var: Var,
        parameter_type: TypeToken,
        annotation_type: TypeToken,
    ) -> (FuzzyBool, Test, BindingSource) {
        let Some(info) = self.registry.get(parameter_type) else {
            return (FuzzyBool::No, Test::False, BindingSource::Constant(Value::Null));
        };
        if info.is_primitive() {
            return (FuzzyBool::No, Test::False, BindingSource::Constant(Value::Null));
        }
        if info.is_final() {
            return match self.registry.type_annotation(parameter_type, annotation_type) {
                Some(annotation) => (
                    FuzzyBool::Yes,
                    Test::True,
                    BindingSource::Constant(Value::Annotation(annotation)),
                ),
                None => (FuzzyBool::No, Test::False, BindingSource::Constant(Value::Null)),
            };
        }
        (
            FuzzyBool::Maybe,
            Test::HasAnnotation {
                var,
                ty: annotation_type,
            },
            BindingSource::VarAnnotation {
                var,
                ty: annotation_type,
            },
        )
    }
}

/// Decide whether any join point in `candidate` could match
///
/// Leaves only return `Yes` when the answer holds for every method of the type, so that
/// negation stays sound.
pub(crate) fn could_match_type(
    node: &Node,
    registry: &TypeRegistry,
    candidate: TypeToken,
    construction_name: Option<&str>,
) -> FuzzyBool {
    let recurse = |inner: &Node| could_match_type(inner, registry, candidate, construction_name);
    match node {
        Node::And(left, right) => {
            let left = recurse(left);
            if left == FuzzyBool::No {
                return FuzzyBool::No;
            }
            left.and(recurse(right))
        }
        Node::Or(left, right) => recurse(left).or(recurse(right)),
        Node::Not(inner) => match recurse(inner) {
            FuzzyBool::Yes => FuzzyBool::No,
            _ => FuzzyBool::Maybe,
        },
        Node::Execution(pattern) | Node::WithinCode(pattern) => {
            if pattern.could_match_type(registry, candidate) {
                FuzzyBool::Maybe
            } else {
                FuzzyBool::No
            }
        }
        Node::Within(pattern) => {
            let hierarchy_matches = std::iter::once(candidate)
                .chain(registry.supertypes(candidate))
                .any(|ty| pattern.matches(registry, ty));
            if hierarchy_matches {
                FuzzyBool::Maybe
            } else {
                FuzzyBool::No
            }
        }
        Node::This(reference) | Node::Target(reference) => {
            registry.could_be_instance(candidate, reference.ty)
        }
        Node::AtWithin(reference) => {
            let hierarchy_annotated = std::iter::once(candidate)
                .chain(registry.supertypes(candidate))
                .any(|ty| registry.type_annotation(ty, reference.ty).is_some());
            if hierarchy_annotated {
                FuzzyBool::Maybe
            } else {
                FuzzyBool::No
            }
        }
        Node::AtThis(reference) | Node::AtTarget(reference) => {
            if registry.type_annotation(candidate, reference.ty).is_some() {
                FuzzyBool::Yes
            } else if registry.get(candidate).is_some_and(|info| info.is_final()) {
                FuzzyBool::No
            } else {
                FuzzyBool::Maybe
            }
        }
        Node::Args(_) | Node::AtArgs(_) | Node::AtAnnotation(_) | Node::AtWithinCode(_) => {
            FuzzyBool::Maybe
        }
        Node::Bean(pattern) => bean_matches(pattern, construction_name),
    }
}

struct RuntimeEnvironment<'a> {
    registry: &'a TypeRegistry,
    loader: LoaderId,
    view: &'a JoinPointView<'a>,
}

impl RuntimeEnvironment<'_> {
    fn value(&self, var: Var) -> Option<&Value> {
        match var {
            Var::This => self.view.this.or(self.view.target),
            Var::Target => self.view.target,
            Var::Arg(position) => self.view.args.get(position),
        }
    }

    fn inspect(&self, var: Var) -> Result<Option<(&Value, TypeToken)>> {
        let Some(value) = self.value(var) else {
            return Ok(None);
        };
        let Some(runtime_type) = value.runtime_type() else {
            return Ok(None);
        };
        self.registry.ensure_visible(runtime_type, self.loader)?;
        Ok(Some((value, runtime_type)))
    }
}

impl TestEnvironment for RuntimeEnvironment<'_> {
    fn instance_of(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool> {
        Ok(match self.inspect(var)? {
            Some((value, _)) => FuzzyBool::from(self.registry.is_assignable_value(ty, value)),
            None => FuzzyBool::No,
        })
    }

    fn has_annotation(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool> {
        Ok(match self.inspect(var)? {
            Some((_, runtime_type)) => {
                FuzzyBool::from(self.registry.type_annotation(runtime_type, ty).is_some())
            }
            None => FuzzyBool::No,
        })
    }

    fn construction_name(&self) -> Option<&str> {
        self.view.construction_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Builtin, MethodBuilder, TypeBuilder};
    use crate::pointcut::compiler::{compile, CompileRequest};

    fn compiled(
        registry: &TypeRegistry,
        expression: &str,
        names: &[String],
        types: &[TypeToken],
    ) -> Result<Arc<CompiledExpression>> {
        let request = CompileRequest {
            registry,
            library: None,
            scope: None,
            loader: LoaderId::BOOTSTRAP,
            parameter_names: names,
            parameter_types: types,
            max_reference_depth: 8,
        };
        Ok(Arc::new(compile(expression, &request)?))
    }

    #[test]
    fn test_static_verdicts() -> Result<()> {
        let registry = TypeRegistry::new();
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let set_name = MethodBuilder::new(service, "setName")
            .param(Builtin::String.token())
            .build(&registry)?;
        let get_name = MethodBuilder::new(service, "getName")
            .returns(Builtin::String.token())
            .build(&registry)?;

        let expression = compiled(&registry, "execution(* set*(..))", &[], &[])?;
        let set = MatchOutcome::for_method(expression.clone(), &registry, &*registry.require_method(set_name)?)?;
        let get = MatchOutcome::for_method(expression, &registry, &*registry.require_method(get_name)?)?;
        assert_eq!(set.verdict, Verdict::Always);
        assert_eq!(get.verdict, Verdict::Never);
        Ok(())
    }

    #[test]
    fn test_args_residue() -> Result<()> {
        let registry = TypeRegistry::new();
        let service = TypeBuilder::class("app.Service").build(&registry)?;
        let handle = MethodBuilder::new(service, "handle")
            .param(Builtin::Object.token())
            .build(&registry)?;

        let names = vec!["text".to_string()];
        let types = vec![Builtin::String.token()];
        let expression = compiled(&registry, "args(text)", &names, &types)?;
        let outcome = MatchOutcome::for_method(expression, &registry, &*registry.require_method(handle)?)?;
        assert_eq!(outcome.verdict, Verdict::Maybe);

        let matching = [Value::from("hello")];
        let view = JoinPointView {
            this: None,
            target: None,
            args: &matching,
            construction_name: None,
        };
        let captured = outcome.matches_join_point(&registry, &view)?;
        assert_eq!(
            captured.and_then(|found| found.value("text").cloned()),
            Some(Value::from("hello"))
        );

        let other = [Value::Int(3)];
        let view = JoinPointView { args: &other, ..view };
        assert!(outcome.matches_join_point(&registry, &view)?.is_none());
        Ok(())
    }

    #[test]
    fn test_alignment_with_ellipsis() {
        let reference = TypeRef {
            ty: Builtin::String.token(),
            binding: None,
        };
        let patterns = [ArgPattern::Ellipsis, ArgPattern::Type(reference)];
        assert_eq!(
            ShadowContext::align(&patterns, 3),
            Some(vec![(2, reference)])
        );
        assert_eq!(ShadowContext::align(&patterns, 0), None);
        assert_eq!(
            ShadowContext::align(&[ArgPattern::Any, ArgPattern::Type(reference)], 2),
            Some(vec![(1, reference)])
        );
        assert_eq!(ShadowContext::align(&[ArgPattern::Any], 2), None);
    }

    #[test]
    fn test_target_residue_decided_against_type() -> Result<()> {
        let registry = TypeRegistry::new();
        let base = TypeBuilder::class("app.Base").build(&registry)?;
        let derived = TypeBuilder::class("app.Derived").extends(base).build(&registry)?;
        let run = MethodBuilder::new(base, "run").build(&registry)?;

        let expression = compiled(&registry, "target(app.Derived)", &[], &[])?;
        let outcome = MatchOutcome::for_method(expression, &registry, &*registry.require_method(run)?)?;
        assert_eq!(outcome.verdict, Verdict::Maybe);
        assert_eq!(outcome.evaluate_against_type(&registry, derived), FuzzyBool::Yes);
        assert_eq!(outcome.evaluate_against_type(&registry, base), FuzzyBool::No);
        Ok(())
    }

    #[test]
    fn test_type_level_negation_is_conservative() -> Result<()> {
        let registry = TypeRegistry::new();
        let service = TypeBuilder::class("app.Service").build(&registry)?;

        let within = compiled(&registry, "!within(app.Service)", &[], &[])?;
        assert_eq!(
            could_match_type(&within.root, &registry, service, None),
            FuzzyBool::Maybe
        );

        let bean = compiled(&registry, "!bean(orders)", &[], &[])?;
        assert_eq!(
            could_match_type(&bean.root, &registry, service, Some("orders")),
            FuzzyBool::No
        );
        assert_eq!(
            could_match_type(&bean.root, &registry, service, None),
            FuzzyBool::Maybe
        );
        Ok(())
    }

    #[test]
    fn test_invisible_signature_type() -> Result<()> {
        let registry = TypeRegistry::new();
        let other = registry.create_loader("other", LoaderId::BOOTSTRAP)?;
        let order = TypeBuilder::class("app.Order").loader(other).build(&registry)?;
        let service = TypeBuilder::class("app.Service").loader(other).build(&registry)?;
        let place = MethodBuilder::new(service, "place").param(order).build(&registry)?;

        let expression = compiled(&registry, "execution(* place(..))", &[], &[])?;
        let result = MatchOutcome::for_method(expression, &registry, &*registry.require_method(place)?);
        assert!(matches!(result, Err(crate::Error::Resolution { .. })));
        Ok(())
    }
}

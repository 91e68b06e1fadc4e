//! Three-valued verdicts and the runtime tests left over from static matching.

use crate::{
    model::{TypeRegistry, TypeToken, Value},
    pointcut::patterns::NamePattern,
    Result,
};

/// A three-valued truth value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzyBool {
    /// Definitely true
    Yes,
    /// Definitely false
    No,
    /// Can only be decided with more information
    Maybe,
}

impl FuzzyBool {
    /// Three-valued conjunction
    #[must_use]
    pub fn and(self, other: FuzzyBool) -> FuzzyBool {
        match (self, other) {
            (FuzzyBool::No, _) | (_, FuzzyBool::No) => FuzzyBool::No,
            (FuzzyBool::Yes, FuzzyBool::Yes) => FuzzyBool::Yes,
            _ => FuzzyBool::Maybe,
        }
    }

    /// Three-valued disjunction
    #[must_use]
    pub fn or(self, other: FuzzyBool) -> FuzzyBool {
        match (self, other) {
            (FuzzyBool::Yes, _) | (_, FuzzyBool::Yes) => FuzzyBool::Yes,
            (FuzzyBool::No, FuzzyBool::No) => FuzzyBool::No,
            _ => FuzzyBool::Maybe,
        }
    }

    /// Three-valued negation; `Maybe` stays `Maybe`
    #[must_use]
    pub fn not(self) -> FuzzyBool {
        match self {
            FuzzyBool::Yes => FuzzyBool::No,
            FuzzyBool::No => FuzzyBool::Yes,
            FuzzyBool::Maybe => FuzzyBool::Maybe,
        }
    }

    /// Returns true unless definitely false
    #[must_use]
    pub fn maybe_true(self) -> bool {
        self != FuzzyBool::No
    }

    /// Returns true only if definitely true
    #[must_use]
    pub fn always_true(self) -> bool {
        self == FuzzyBool::Yes
    }
}

impl From<bool> for FuzzyBool {
    fn from(value: bool) -> Self {
        if value {
            FuzzyBool::Yes
        } else {
            FuzzyBool::No
        }
    }
}

/// A call-time value a residue can inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Var {
    /// The proxy (or the target, if no proxy is known)
    This,
    /// The target object
    Target,
    /// The argument at the given position
    Arg(usize),
}

/// A runtime test
#[derive(Debug, Clone)]
pub enum Test {
    /// Always passes
    True,
    /// Never passes
    False,
    /// The variable's runtime value is an instance of the type
    InstanceOf {
        /// Inspected variable
        var: Var,
        /// Required type
        ty: TypeToken,
    },
    /// The variable's runtime type carries the annotation
    HasAnnotation {
        /// Inspected variable
        var: Var,
        /// Annotation type
        ty: TypeToken,
    },
    /// The current construction name matches the pattern
    Bean(NamePattern),
    /// Both tests pass
    And(Box<Test>, Box<Test>),
    /// Either test passes
    Or(Box<Test>, Box<Test>),
    /// The test does not pass
    Not(Box<Test>),
}

impl Test {
    /// Conjunction with constant folding
    #[must_use]
    pub fn and(left: Test, right: Test) -> Test {
        match (left, right) {
            (Test::False, _) | (_, Test::False) => Test::False,
            (Test::True, other) | (other, Test::True) => other,
            (left, right) => Test::And(Box::new(left), Box::new(right)),
        }
    }

    /// Disjunction with constant folding
    #[must_use]
    pub fn or(left: Test, right: Test) -> Test {
        match (left, right) {
            (Test::True, _) | (_, Test::True) => Test::True,
            (Test::False, other) | (other, Test::False) => other,
            (left, right) => Test::Or(Box::new(left), Box::new(right)),
        }
    }

    /// Negation with constant folding
    #[must_use]
    pub fn negate(test: Test) -> Test {
        match test {
            Test::True => Test::False,
            Test::False => Test::True,
            Test::Not(inner) => *inner,
            other => Test::Not(Box::new(other)),
        }
    }

    /// The test implied by a static verdict, `residual` if undecided
    #[must_use]
    pub fn from_verdict(verdict: FuzzyBool, residual: Test) -> Test {
        match verdict {
            FuzzyBool::Yes => Test::True,
            FuzzyBool::No => Test::False,
            FuzzyBool::Maybe => residual,
        }
    }

    /// Returns true if the test inspects `this` or `target` by type or annotation
    #[must_use]
    pub fn tests_subtype_sensitive_vars(&self) -> bool {
        match self {
            Test::InstanceOf { var, .. } | Test::HasAnnotation { var, .. } => {
                matches!(var, Var::This | Var::Target)
            }
            Test::And(left, right) | Test::Or(left, right) => {
                left.tests_subtype_sensitive_vars() || right.tests_subtype_sensitive_vars()
            }
            Test::Not(inner) => inner.tests_subtype_sensitive_vars(),
            _ => false,
        }
    }

    /// Evaluate the test against whatever the environment can tell
    ///
    /// # Errors
    /// Propagates errors from the environment, most notably [`crate::Error::Resolution`].
    pub fn evaluate(&self, env: &dyn TestEnvironment) -> Result<FuzzyBool> {
        Ok(match self {
            Test::True => FuzzyBool::Yes,
            Test::False => FuzzyBool::No,
            Test::InstanceOf { var, ty } => env.instance_of(*var, *ty)?,
            Test::HasAnnotation { var, ty } => env.has_annotation(*var, *ty)?,
            Test::Bean(pattern) => bean_matches(pattern, env.construction_name()),
            Test::And(left, right) => {
                let left = left.evaluate(env)?;
                if left == FuzzyBool::No {
                    return Ok(FuzzyBool::No);
                }
                left.and(right.evaluate(env)?)
            }
            Test::Or(left, right) => {
                let left = left.evaluate(env)?;
                if left == FuzzyBool::Yes {
                    return Ok(FuzzyBool::Yes);
                }
                left.or(right.evaluate(env)?)
            }
            Test::Not(inner) => inner.evaluate(env)?.not(),
        })
    }
}

/// Match a construction name against a `bean(..)` pattern
///
/// Without a construction name the result is undecided. Generated names, which contain `#`,
/// never match.
#[must_use]
pub fn bean_matches(pattern: &NamePattern, construction_name: Option<&str>) -> FuzzyBool {
    match construction_name {
        None => FuzzyBool::Maybe,
        Some(name) if name.contains('#') => FuzzyBool::No,
        Some(name) => FuzzyBool::from(pattern.matches(name)),
    }
}

/// The information a [`Test`] is evaluated against
pub trait TestEnvironment {
    /// Is the variable an instance of `ty`?
    ///
    /// # Errors
    /// Returns [`crate::Error::Resolution`] if the value's type is not visible.
    fn instance_of(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool>;

    /// Does the variable's runtime type carry the annotation `ty`?
    ///
    /// # Errors
    /// Returns [`crate::Error::Resolution`] if the value's type is not visible.
    fn has_annotation(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool>;

    /// The name of the object under construction, if known
    fn construction_name(&self) -> Option<&str>;
}

/// Where a bound pointcut parameter takes its value from
#[derive(Debug, Clone)]
pub enum BindingSource {
    /// The runtime value of a variable
    Var(Var),
    /// A value fixed at match time, such as a method annotation
    Constant(Value),
    /// The annotation on the runtime type of a variable
    VarAnnotation {
        /// Inspected variable
        var: Var,
        /// Annotation type
        ty: TypeToken,
    },
}

/// Binds one pointcut parameter
#[derive(Debug, Clone)]
pub struct Binding {
    /// Index into the pointcut's declared parameters
    pub slot: usize,
    /// Value source
    pub source: BindingSource,
}

/// The part of a match that can only be decided at call time
#[derive(Debug, Clone)]
pub struct Residue {
    /// Test to evaluate
    pub test: Test,
    /// Values to capture once the test passes
    pub bindings: Vec<Binding>,
}

impl Residue {
    /// A residue that never passes
    #[must_use]
    pub fn never() -> Self {
        Residue {
            test: Test::False,
            bindings: Vec::new(),
        }
    }
}

/// Static evaluation against the exact target type
///
/// Used once no further subclassing can happen: `target` tests are decided, everything else
/// stays undecided.
pub(crate) struct TargetTypeEnvironment<'a> {
    pub registry: &'a TypeRegistry,
    pub target_type: TypeToken,
}

impl TestEnvironment for TargetTypeEnvironment<'_> {
    fn instance_of(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool> {
        Ok(match var {
            Var::Target => FuzzyBool::from(self.registry.is_assignable(ty, self.target_type)),
            _ => FuzzyBool::Maybe,
        })
    }

    fn has_annotation(&self, var: Var, ty: TypeToken) -> Result<FuzzyBool> {
        Ok(match var {
            Var::Target => {
                FuzzyBool::from(self.registry.type_annotation(self.target_type, ty).is_some())
            }
            _ => FuzzyBool::Maybe,
        })
    }

    fn construction_name(&self) -> Option<&str> {
        None
    }
}

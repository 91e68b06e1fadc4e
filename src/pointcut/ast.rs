//! Syntax tree of a parsed pointcut expression.

use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// The designator keywords of the pointcut language
///
/// Only method-execution join points exist in a proxy based interception layer. Designators
/// for other join point kinds are recognised so that they can be rejected with a clear error.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
pub enum DesignatorKind {
    /// `execution(method-pattern)`
    #[strum(serialize = "execution")]
    Execution,
    /// `within(type-pattern)`
    #[strum(serialize = "within")]
    Within,
    /// `withincode(method-pattern)`
    #[strum(serialize = "withincode")]
    WithinCode,
    /// `this(type-or-var)`
    #[strum(serialize = "this")]
    This,
    /// `target(type-or-var)`
    #[strum(serialize = "target")]
    Target,
    /// `args(arg-patterns)`
    #[strum(serialize = "args")]
    Args,
    /// `@annotation(type-or-var)`
    #[strum(serialize = "@annotation")]
    AtAnnotation,
    /// `@this(type-or-var)`
    #[strum(serialize = "@this")]
    AtThis,
    /// `@target(type-or-var)`
    #[strum(serialize = "@target")]
    AtTarget,
    /// `@within(type-or-var)`
    #[strum(serialize = "@within")]
    AtWithin,
    /// `@withincode(type-or-var)`
    #[strum(serialize = "@withincode")]
    AtWithinCode,
    /// `@args(arg-patterns)`
    #[strum(serialize = "@args")]
    AtArgs,
    /// `bean(name-pattern)`
    #[strum(serialize = "bean")]
    Bean,
    /// Unsupported: `call`
    #[strum(serialize = "call")]
    Call,
    /// Unsupported: `get`
    #[strum(serialize = "get")]
    Get,
    /// Unsupported: `set`
    #[strum(serialize = "set")]
    Set,
    /// Unsupported: `handler`
    #[strum(serialize = "handler")]
    Handler,
    /// Unsupported: `cflow`
    #[strum(serialize = "cflow")]
    Cflow,
    /// Unsupported: `cflowbelow`
    #[strum(serialize = "cflowbelow")]
    CflowBelow,
    /// Unsupported: `if`
    #[strum(serialize = "if")]
    If,
    /// Unsupported: `initialization`
    #[strum(serialize = "initialization")]
    Initialization,
    /// Unsupported: `preinitialization`
    #[strum(serialize = "preinitialization")]
    PreInitialization,
    /// Unsupported: `staticinitialization`
    #[strum(serialize = "staticinitialization")]
    StaticInitialization,
    /// Unsupported: `adviceexecution`
    #[strum(serialize = "adviceexecution")]
    AdviceExecution,
}

impl DesignatorKind {
    /// Returns true for designators that can be matched against method executions
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            DesignatorKind::Call
                | DesignatorKind::Get
                | DesignatorKind::Set
                | DesignatorKind::Handler
                | DesignatorKind::Cflow
                | DesignatorKind::CflowBelow
                | DesignatorKind::If
                | DesignatorKind::Initialization
                | DesignatorKind::PreInitialization
                | DesignatorKind::StaticInitialization
                | DesignatorKind::AdviceExecution
        )
    }

    /// The keyword as written in an expression
    #[must_use]
    pub fn keyword(self) -> &'static str {
        self.into()
    }
}

/// A method modifier in a method pattern, possibly negated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierAst {
    /// `!public` rather than `public`
    pub negated: bool,
    /// The modifier keyword
    pub keyword: String,
}

/// A method pattern as written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPatternAst {
    /// Modifier constraints
    pub modifiers: Vec<ModifierAst>,
    /// Return type pattern
    pub return_type: String,
    /// Declaring type pattern, if the name was qualified
    pub declaring_type: Option<String>,
    /// Method name pattern
    pub name: String,
    /// Parameter patterns, including `*` and `..`
    pub parameters: Vec<String>,
    /// Declared failure type patterns
    pub throws: Vec<String>,
}

/// A single designator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignatorAst {
    /// `execution(..)`
    Execution(MethodPatternAst),
    /// `within(..)`
    Within(String),
    /// `withincode(..)`
    WithinCode(MethodPatternAst),
    /// `this(..)`
    This(String),
    /// `target(..)`
    Target(String),
    /// `args(..)`
    Args(Vec<String>),
    /// `@annotation(..)`
    AtAnnotation(String),
    /// `@this(..)`
    AtThis(String),
    /// `@target(..)`
    AtTarget(String),
    /// `@within(..)`
    AtWithin(String),
    /// `@withincode(..)`
    AtWithinCode(String),
    /// `@args(..)`
    AtArgs(Vec<String>),
    /// `bean(..)`
    Bean(String),
    /// A named pointcut reference with its argument names
    Reference {
        /// Simple or qualified name of the referenced pointcut
        name: String,
        /// Argument identifiers
        arguments: Vec<String>,
    },
}

/// A parsed pointcut expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointcutAst {
    /// `a && b`
    And(Box<PointcutAst>, Box<PointcutAst>),
    /// `a || b`
    Or(Box<PointcutAst>, Box<PointcutAst>),
    /// `!a`
    Not(Box<PointcutAst>),
    /// A designator
    Designator(DesignatorAst),
}

//! Resolution of a parsed expression against a type registry.
//!
//! Compilation turns the syntax tree into a [`Node`] tree in which every type name has been
//! resolved from a single code loading context and every identifier has been classified as
//! either a type or one of the declared pointcut parameters.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    model::{Builtin, LoaderId, MethodModifiers, TypeKind, TypeRegistry, TypeToken},
    pointcut::{
        ast::{DesignatorAst, MethodPatternAst, PointcutAst},
        library::PointcutLibrary,
        parser::parse,
        patterns::{MethodPattern, NamePattern, ParameterPattern, TypePattern, TypeNamePattern},
    },
    Error, Result,
};

/// A type test that may also bind a pointcut parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TypeRef {
    /// The type or annotation type to test for
    pub ty: TypeToken,
    /// The pointcut parameter bound by this reference
    pub binding: Option<usize>,
}

/// One element of an `args` or `@args` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArgPattern {
    /// `*`
    Any,
    /// `..`
    Ellipsis,
    /// A type (for `args`) or annotation type (for `@args`)
    Type(TypeRef),
}

/// A compiled pointcut node
#[derive(Debug, Clone)]
pub(crate) enum Node {
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Not(Box<Node>),
    Execution(MethodPattern),
    Within(TypePattern),
    WithinCode(MethodPattern),
    This(TypeRef),
    Target(TypeRef),
    Args(Vec<ArgPattern>),
    AtAnnotation(TypeRef),
    AtThis(TypeRef),
    AtTarget(TypeRef),
    AtWithin(TypeRef),
    AtWithinCode(TypeRef),
    AtArgs(Vec<ArgPattern>),
    Bean(NamePattern),
}

impl Node {
    /// Returns true if the node's verdict can depend on call-time values
    fn is_dynamic(&self) -> bool {
        match self {
            Node::And(left, right) | Node::Or(left, right) => {
                left.is_dynamic() || right.is_dynamic()
            }
            Node::Not(inner) => inner.is_dynamic(),
            Node::This(_)
            | Node::Target(_)
            | Node::Args(_)
            | Node::AtThis(_)
            | Node::AtTarget(_)
            | Node::AtArgs(_)
            | Node::Bean(_) => true,
            _ => false,
        }
    }
}

/// A pointcut expression compiled against one code loading context
#[derive(Debug)]
pub struct CompiledExpression {
    pub(crate) root: Node,
    /// The expression text
    pub expression: Arc<str>,
    /// Declared parameter names
    pub parameter_names: Arc<[String]>,
    /// Declared parameter types
    pub parameter_types: Arc<[TypeToken]>,
    /// The loader all type names were resolved from
    pub loader: LoaderId,
    dynamic: bool,
}

impl CompiledExpression {
    /// Stand-in for an expression no loader could compile, matching nothing
    pub(crate) fn unresolved(expression: Arc<str>, loader: LoaderId) -> Self {
        CompiledExpression {
            root: Node::Not(Box::new(Node::Within(TypePattern::Any))),
            expression,
            parameter_names: Arc::from(Vec::new()),
            parameter_types: Arc::from(Vec::new()),
            loader,
            dynamic: false,
        }
    }

    /// Returns true if matching can depend on call-time values
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Everything compilation needs besides the expression text
pub(crate) struct CompileRequest<'a> {
    pub registry: &'a TypeRegistry,
    pub library: Option<&'a PointcutLibrary>,
    pub scope: Option<String>,
    pub loader: LoaderId,
    pub parameter_names: &'a [String],
    pub parameter_types: &'a [TypeToken],
    pub max_reference_depth: usize,
}

/// Lexical context of the node being compiled
struct Scope<'s> {
    /// Formal parameter of a referenced pointcut to the identifier it was called with
    substitutions: Option<&'s HashMap<String, String>>,
    /// Bindings below `||` and `!` are ambiguous
    may_bind: bool,
    /// Nesting of named pointcut references
    depth: usize,
    /// Qualifier for unqualified references
    declaring_scope: Option<String>,
}

impl Scope<'_> {
    fn substitute<'t>(&'t self, identifier: &'t str) -> &'t str {
        self.substitutions
            .and_then(|map| map.get(identifier))
            .map_or(identifier, String::as_str)
    }

    fn nested(&self) -> Scope<'_> {
        Scope {
            substitutions: self.substitutions,
            may_bind: false,
            depth: self.depth,
            declaring_scope: self.declaring_scope.clone(),
        }
    }
}

/// Parse and compile an expression
///
/// # Errors
/// - [`crate::Error::Configuration`] for malformed expressions, unknown type names in binding
///   designators, invalid bindings and unbound formals
/// - [`crate::Error::Resolution`] if a type the expression names exists, but not in the
///   requested loader's view
pub(crate) fn compile(expression: &str, request: &CompileRequest<'_>) -> Result<CompiledExpression> {
    let ast = parse(expression)?;

    let mut compiler = Compiler {
        request,
        bound: vec![false; request.parameter_names.len()],
    };
    let scope = Scope {
        substitutions: None,
        may_bind: true,
        depth: 0,
        declaring_scope: request.scope.clone(),
    };
    let root = compiler.compile_node(&ast, &scope)?;

    if let Some(unbound) = compiler
        .bound
        .iter()
        .position(|bound| !bound)
        .map(|slot| &request.parameter_names[slot])
    {
        return Err(config_error!(
            "Formal unbound in pointcut '{}': '{}'",
            expression,
            unbound
        ));
    }

    let dynamic = root.is_dynamic() || !request.parameter_names.is_empty();
    Ok(CompiledExpression {
        root,
        expression: Arc::from(expression),
        parameter_names: request.parameter_names.to_vec().into(),
        parameter_types: request.parameter_types.to_vec().into(),
        loader: request.loader,
        dynamic,
    })
}

struct Compiler<'a> {
    request: &'a CompileRequest<'a>,
    bound: Vec<bool>,
}

impl Compiler<'_> {
    fn compile_node(&mut self, ast: &PointcutAst, scope: &Scope<'_>) -> Result<Node> {
        Ok(match ast {
            PointcutAst::And(left, right) => Node::And(
                Box::new(self.compile_node(left, scope)?),
                Box::new(self.compile_node(right, scope)?),
            ),
            PointcutAst::Or(left, right) => {
                let nested = scope.nested();
                Node::Or(
                    Box::new(self.compile_node(left, &nested)?),
                    Box::new(self.compile_node(right, &nested)?),
                )
            }
            PointcutAst::Not(inner) => {
                Node::Not(Box::new(self.compile_node(inner, &scope.nested())?))
            }
            PointcutAst::Designator(designator) => self.compile_designator(designator, scope)?,
        })
    }

    fn compile_designator(&mut self, designator: &DesignatorAst, scope: &Scope<'_>) -> Result<Node> {
        Ok(match designator {
            DesignatorAst::Execution(pattern) => Node::Execution(self.method_pattern(pattern)?),
            DesignatorAst::WithinCode(pattern) => Node::WithinCode(self.method_pattern(pattern)?),
            DesignatorAst::Within(pattern) => Node::Within(self.type_pattern(pattern)),
            DesignatorAst::This(identifier) => {
                Node::This(self.type_or_var(identifier, scope, "this")?)
            }
            DesignatorAst::Target(identifier) => {
                Node::Target(self.type_or_var(identifier, scope, "target")?)
            }
            DesignatorAst::Args(patterns) => Node::Args(self.arg_patterns(patterns, scope, false)?),
            DesignatorAst::AtAnnotation(identifier) => {
                Node::AtAnnotation(self.annotation_or_var(identifier, scope, "@annotation")?)
            }
            DesignatorAst::AtThis(identifier) => {
                Node::AtThis(self.annotation_or_var(identifier, scope, "@this")?)
            }
            DesignatorAst::AtTarget(identifier) => {
                Node::AtTarget(self.annotation_or_var(identifier, scope, "@target")?)
            }
            DesignatorAst::AtWithin(identifier) => {
                Node::AtWithin(self.annotation_or_var(identifier, scope, "@within")?)
            }
            DesignatorAst::AtWithinCode(identifier) => {
                Node::AtWithinCode(self.annotation_or_var(identifier, scope, "@withincode")?)
            }
            DesignatorAst::AtArgs(patterns) => {
                Node::AtArgs(self.arg_patterns(patterns, scope, true)?)
            }
            DesignatorAst::Bean(pattern) => Node::Bean(NamePattern::parse(pattern)),
            DesignatorAst::Reference { name, arguments } => {
                self.inline_reference(name, arguments, scope)?
            }
        })
    }

    fn type_pattern(&self, text: &str) -> TypePattern {
        TypePattern::compile(text, self.request.registry, self.request.loader)
    }

    fn method_pattern(&self, ast: &MethodPatternAst) -> Result<MethodPattern> {
        let mut required_modifiers = MethodModifiers::empty();
        let mut forbidden_modifiers = MethodModifiers::empty();
        for modifier in &ast.modifiers {
            let Some(flag) = MethodModifiers::from_keyword(&modifier.keyword) else {
                return Err(config_error!(
                    "Unknown modifier '{}' in method pattern",
                    modifier.keyword
                ));
            };
            if modifier.negated {
                forbidden_modifiers |= flag;
            } else {
                required_modifiers |= flag;
            }
        }

        let parameters = ast
            .parameters
            .iter()
            .map(|parameter| match parameter.as_str() {
                ".." => ParameterPattern::Ellipsis,
                other => ParameterPattern::Type(self.type_pattern(other)),
            })
            .collect();

        Ok(MethodPattern {
            required_modifiers,
            forbidden_modifiers,
            return_type: self.type_pattern(&ast.return_type),
            declaring_type: ast
                .declaring_type
                .as_deref()
                .map(|declaring| self.type_pattern(declaring)),
            name: NamePattern::parse(&ast.name),
            parameters,
            throws: ast
                .throws
                .iter()
                .map(|pattern| self.type_pattern(pattern))
                .collect(),
        })
    }

    /// Resolve an exact type name used by a binding designator
    fn resolve_exact(&self, name: &str, designator: &str) -> Result<TypeToken> {
        if TypeNamePattern::parse(name).is_wildcard() || name.ends_with('+') {
            return Err(config_error!(
                "Type patterns are not allowed in '{}': '{}'",
                designator,
                name
            ));
        }

        if let Some(ty) = self.request.registry.resolve(name, self.request.loader) {
            return Ok(ty);
        }
        if self.request.registry.is_defined_anywhere(name) {
            return Err(Error::Resolution {
                type_name: name.to_string(),
                loader: self.request.loader,
            });
        }
        Err(config_error!(
            "Can not resolve type '{}' in '{}'; it is neither a known type nor a declared parameter",
            name,
            designator
        ))
    }

    fn bind(&mut self, identifier: &str, scope: &Scope<'_>) -> Result<Option<(usize, TypeToken)>> {
        let Some(slot) = self
            .request
            .parameter_names
            .iter()
            .position(|name| name == identifier)
        else {
            return Ok(None);
        };

        if !scope.may_bind {
            return Err(config_error!(
                "Ambiguous binding of '{}': variables can not be bound under '||' or '!'",
                identifier
            ));
        }
        if self.bound[slot] {
            return Err(config_error!(
                "Variable '{}' is bound more than once",
                identifier
            ));
        }

        self.bound[slot] = true;
        let ty = self
            .request
            .parameter_types
            .get(slot)
            .copied()
            .unwrap_or(Builtin::Object.token());
        Ok(Some((slot, ty)))
    }

    fn type_or_var(&mut self, identifier: &str, scope: &Scope<'_>, designator: &str) -> Result<TypeRef> {
        let identifier = scope.substitute(identifier);
        if let Some((slot, ty)) = self.bind(identifier, scope)? {
            return Ok(TypeRef {
                ty,
                binding: Some(slot),
            });
        }

        Ok(TypeRef {
            ty: self.resolve_exact(identifier, designator)?,
            binding: None,
        })
    }

    fn annotation_or_var(
        &mut self,
        identifier: &str,
        scope: &Scope<'_>,
        designator: &str,
    ) -> Result<TypeRef> {
        let reference = self.type_or_var(identifier, scope, designator)?;
        let is_annotation = self
            .request
            .registry
            .get(reference.ty)
            .is_some_and(|info| info.kind == TypeKind::Annotation);
        if !is_annotation {
            return Err(config_error!(
                "'{}' in '{}' is not an annotation type",
                self.request.registry.type_name(reference.ty),
                designator
            ));
        }
        Ok(reference)
    }

    fn arg_patterns(
        &mut self,
        patterns: &[String],
        scope: &Scope<'_>,
        annotations: bool,
    ) -> Result<Vec<ArgPattern>> {
        let designator = if annotations { "@args" } else { "args" };
        if patterns.iter().filter(|pattern| *pattern == "..").count() > 1 {
            return Err(config_error!(
                "Only one '..' is allowed in '{}'",
                designator
            ));
        }

        patterns
            .iter()
            .map(|pattern| {
                Ok(match scope.substitute(pattern) {
                    "*" => ArgPattern::Any,
                    ".." => ArgPattern::Ellipsis,
                    other if annotations => {
                        ArgPattern::Type(self.annotation_or_var(other, scope, designator)?)
                    }
                    other => ArgPattern::Type(self.type_or_var(other, scope, designator)?),
                })
            })
            .collect()
    }

    fn inline_reference(
        &mut self,
        name: &str,
        arguments: &[String],
        scope: &Scope<'_>,
    ) -> Result<Node> {
        if scope.depth >= self.request.max_reference_depth {
            return Err(config_error!(
                "Pointcut reference '{}' exceeds the maximum nesting depth of {}",
                name,
                self.request.max_reference_depth
            ));
        }

        let definition = self
            .request
            .library
            .and_then(|library| library.lookup(name, scope.declaring_scope.as_deref()))
            .ok_or_else(|| config_error!("Can not find referenced pointcut '{}'", name))?;

        if definition.parameter_names.len() != arguments.len() {
            return Err(config_error!(
                "Pointcut '{}' expects {} arguments, but {} were given",
                definition.name,
                definition.parameter_names.len(),
                arguments.len()
            ));
        }

        let substitutions: HashMap<String, String> = definition
            .parameter_names
            .iter()
            .zip(arguments)
            .map(|(formal, actual)| (formal.clone(), scope.substitute(actual).to_string()))
            .collect();

        let body = parse(&definition.expression)?;
        let declaring_scope = definition
            .name
            .rfind('.')
            .map(|split| definition.name[..split].to_string());
        let inner = Scope {
            substitutions: Some(&substitutions),
            may_bind: scope.may_bind,
            depth: scope.depth + 1,
            declaring_scope,
        };
        self.compile_node(&body, &inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeBuilder;

    fn request<'a>(
        registry: &'a TypeRegistry,
        library: Option<&'a PointcutLibrary>,
        names: &'a [String],
        types: &'a [TypeToken],
    ) -> CompileRequest<'a> {
        CompileRequest {
            registry,
            library,
            scope: Some("app.Aspect".to_string()),
            loader: LoaderId::BOOTSTRAP,
            parameter_names: names,
            parameter_types: types,
            max_reference_depth: 8,
        }
    }

    #[test]
    fn test_static_expression() -> Result<()> {
        let registry = TypeRegistry::new();
        let compiled = compile("execution(* *(..)) && within(app..*)", &request(&registry, None, &[], &[]))?;
        assert!(!compiled.is_dynamic());
        assert!(matches!(compiled.root, Node::And(_, _)));
        Ok(())
    }

    #[test]
    fn test_binding_classification() -> Result<()> {
        let registry = TypeRegistry::new();
        let names = vec!["x".to_string()];
        let types = vec![Builtin::String.token()];
        let compiled = compile("args(x, ..)", &request(&registry, None, &names, &types))?;
        assert!(compiled.is_dynamic());
        let Node::Args(patterns) = &compiled.root else {
            panic!("expected args");
        };
        assert_eq!(
            patterns[0],
            ArgPattern::Type(TypeRef {
                ty: Builtin::String.token(),
                binding: Some(0)
            })
        );
        assert_eq!(patterns[1], ArgPattern::Ellipsis);
        Ok(())
    }

    #[test]
    fn test_unbound_formal() {
        let registry = TypeRegistry::new();
        let names = vec!["x".to_string()];
        let types = vec![Builtin::String.token()];
        let result = compile("execution(* *(..))", &request(&registry, None, &names, &types));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_binding_rules() {
        let registry = TypeRegistry::new();
        let names = vec!["x".to_string()];
        let types = vec![Builtin::String.token()];
        let request = request(&registry, None, &names, &types);

        assert!(compile("args(x) || within(a.*)", &request).is_err());
        assert!(compile("!args(x)", &request).is_err());
        assert!(compile("args(x) && this(x)", &request).is_err());
        assert!(compile("args(.., x, ..)", &request).is_err());
    }

    #[test]
    fn test_unknown_type_in_binding_designator() {
        let registry = TypeRegistry::new();
        let result = compile("target(app.Missing)", &request(&registry, None, &[], &[]));
        assert!(matches!(result, Err(Error::Configuration { .. })));
        let result = compile("this(app.*)", &request(&registry, None, &[], &[]));
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_type_defined_in_other_loader() -> Result<()> {
        let registry = TypeRegistry::new();
        let other = registry.create_loader("other", LoaderId::BOOTSTRAP)?;
        TypeBuilder::class("app.Hidden").loader(other).build(&registry)?;

        let result = compile("target(app.Hidden)", &request(&registry, None, &[], &[]));
        assert!(matches!(result, Err(Error::Resolution { .. })));
        Ok(())
    }

    #[test]
    fn test_annotation_designator_requires_annotation_type() -> Result<()> {
        let registry = TypeRegistry::new();
        TypeBuilder::annotation("app.Audited").build(&registry)?;
        TypeBuilder::class("app.Plain").build(&registry)?;

        assert!(compile("@annotation(app.Audited)", &request(&registry, None, &[], &[])).is_ok());
        assert!(compile("@annotation(app.Plain)", &request(&registry, None, &[], &[])).is_err());
        Ok(())
    }

    #[test]
    fn test_reference_inlining() -> Result<()> {
        let registry = TypeRegistry::new();
        let library = PointcutLibrary::new();
        library.define(
            "app.Aspect.named",
            "args(value) && within(app..*)",
            &[("value", Builtin::String.token())],
        );
        library.define("app.Aspect.outer", "named(v)", &[("v", Builtin::String.token())]);

        let names = vec!["x".to_string()];
        let types = vec![Builtin::String.token()];
        let compiled = compile(
            "execution(* *(..)) && outer(x)",
            &request(&registry, Some(&library), &names, &types),
        )?;
        assert!(compiled.is_dynamic());
        Ok(())
    }

    #[test]
    fn test_cyclic_reference() {
        let registry = TypeRegistry::new();
        let library = PointcutLibrary::new();
        library.define("app.Aspect.a", "b()", &[]);
        library.define("app.Aspect.b", "a()", &[]);

        let result = compile("a()", &request(&registry, Some(&library), &[], &[]));
        assert!(matches!(result, Err(Error::Configuration { .. })));
        let missing = compile("missing()", &request(&registry, Some(&library), &[], &[]));
        assert!(matches!(missing, Err(Error::Configuration { .. })));
    }
}

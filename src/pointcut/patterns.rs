//! Name, type and method patterns.
//!
//! Wildcard rules:
//! - In name patterns `*` matches any sequence of characters.
//! - In type name patterns `*` matches any sequence of characters except `.`, and `..` matches
//!   any number of intermediate namespace segments.
//! - A trailing `+` on a type pattern also accepts every subtype of a matching type.

use crate::model::{LoaderId, MethodDescriptor, MethodModifiers, TypeRegistry, TypeToken};

/// A simple `*` glob over a flat name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// `*`
    Any,
    /// A name without wildcards
    Exact(String),
    /// A name with at least one `*`
    Glob(String),
}

impl NamePattern {
    /// Parse a name pattern
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text == "*" {
            NamePattern::Any
        } else if text.contains('*') {
            NamePattern::Glob(text.to_string())
        } else {
            NamePattern::Exact(text.to_string())
        }
    }

    /// Match a name
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Any => true,
            NamePattern::Exact(exact) => exact == name,
            NamePattern::Glob(glob) => glob_matches(glob.as_bytes(), name.as_bytes()),
        }
    }
}

fn glob_matches(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|skip| glob_matches(rest, &text[skip..])),
        Some((expected, rest)) => text
            .split_first()
            .is_some_and(|(actual, remaining)| actual == expected && glob_matches(rest, remaining)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TypeNamePart {
    Char(u8),
    Star,
    Ellipsis,
}

/// A wildcard pattern over dotted type names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeNamePattern {
    text: String,
    parts: Vec<TypeNamePart>,
}

impl TypeNamePattern {
    /// Parse a dotted type name pattern
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut parts = Vec::with_capacity(bytes.len());
        let mut index = 0;
        while index < bytes.len() {
            match bytes[index] {
                b'.' if bytes.get(index + 1) == Some(&b'.') => {
                    parts.push(TypeNamePart::Ellipsis);
                    index += 2;
                }
                b'*' => {
                    parts.push(TypeNamePart::Star);
                    index += 1;
                }
                other => {
                    parts.push(TypeNamePart::Char(other));
                    index += 1;
                }
            }
        }

        TypeNamePattern {
            text: text.to_string(),
            parts,
        }
    }

    /// The original text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns true if the pattern contains a wildcard
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TypeNamePart::Star | TypeNamePart::Ellipsis))
    }

    /// Match a full type name
    #[must_use]
    pub fn matches(&self, fullname: &str) -> bool {
        Self::match_parts(&self.parts, fullname.as_bytes())
    }

    fn match_parts(parts: &[TypeNamePart], text: &[u8]) -> bool {
        match parts.split_first() {
            None => text.is_empty(),
            Some((TypeNamePart::Star, rest)) => {
                let segment = text.iter().take_while(|byte| **byte != b'.').count();
                (0..=segment).any(|skip| Self::match_parts(rest, &text[skip..]))
            }
            // `..` stands for a dot, optionally followed by whole segments, each ending in a dot
            Some((TypeNamePart::Ellipsis, rest)) => {
                if text.first() != Some(&b'.') {
                    return false;
                }
                (1..=text.len())
                    .filter(|end| text[end - 1] == b'.')
                    .any(|end| Self::match_parts(rest, &text[end..]))
            }
            Some((TypeNamePart::Char(expected), rest)) => {
                text.split_first().is_some_and(|(actual, remaining)| {
                    actual == expected && Self::match_parts(rest, remaining)
                })
            }
        }
    }
}

/// A compiled type pattern
#[derive(Debug, Clone)]
pub enum TypePattern {
    /// `*`, matches every type
    Any,
    /// A resolved type
    Exact {
        /// The resolved type
        ty: TypeToken,
        /// Also accept subtypes
        subtypes: bool,
    },
    /// A wildcard pattern, or a name that could not be resolved
    Named {
        /// The name pattern, matched against full names
        pattern: TypeNamePattern,
        /// Also accept types with a matching supertype
        subtypes: bool,
    },
}

impl TypePattern {
    /// Compile a type pattern, resolving exact names from `loader`
    ///
    /// Names that can not be resolved are kept as literal name patterns, so that they still
    /// match a same-named type defined by any loader.
    #[must_use]
    pub fn compile(text: &str, registry: &TypeRegistry, loader: LoaderId) -> Self {
        let (body, subtypes) = match text.strip_suffix('+') {
            Some(body) => (body, true),
            None => (text, false),
        };

        if body == "*" {
            return TypePattern::Any;
        }

        let pattern = TypeNamePattern::parse(body);
        if !pattern.is_wildcard() {
            if let Some(ty) = registry.resolve(body, loader) {
                return TypePattern::Exact { ty, subtypes };
            }
        }
        TypePattern::Named { pattern, subtypes }
    }

    /// Returns true if the pattern is a resolved type without `+`
    #[must_use]
    pub fn exact_type(&self) -> Option<TypeToken> {
        match self {
            TypePattern::Exact {
                ty,
                subtypes: false,
            } => Some(*ty),
            _ => None,
        }
    }

    /// Match a type
    #[must_use]
    pub fn matches(&self, registry: &TypeRegistry, candidate: TypeToken) -> bool {
        match self {
            TypePattern::Any => true,
            TypePattern::Exact { ty, subtypes } => {
                candidate == *ty || (*subtypes && registry.is_assignable(*ty, candidate))
            }
            TypePattern::Named { pattern, subtypes } => {
                let matches_name = |token: TypeToken| {
                    registry
                        .get(token)
                        .is_some_and(|info| pattern.matches(&info.fullname()))
                };
                matches_name(candidate)
                    || (*subtypes && registry.supertypes(candidate).into_iter().any(matches_name))
            }
        }
    }
}

/// One element of a parameter list pattern
#[derive(Debug, Clone)]
pub enum ParameterPattern {
    /// `..`, any number of parameters
    Ellipsis,
    /// A single parameter of matching type, `*` compiles to [`TypePattern::Any`]
    Type(TypePattern),
}

impl ParameterPattern {
    /// Match a parameter list
    #[must_use]
    pub fn matches_all(
        patterns: &[ParameterPattern],
        registry: &TypeRegistry,
        parameters: &[TypeToken],
    ) -> bool {
        match patterns.split_first() {
            None => parameters.is_empty(),
            Some((ParameterPattern::Ellipsis, rest)) => (0..=parameters.len())
                .any(|skip| Self::matches_all(rest, registry, &parameters[skip..])),
            Some((ParameterPattern::Type(pattern), rest)) => {
                parameters.split_first().is_some_and(|(first, remaining)| {
                    pattern.matches(registry, *first) && Self::matches_all(rest, registry, remaining)
                })
            }
        }
    }
}

/// A compiled method pattern, as used by `execution` and `withincode`
#[derive(Debug, Clone)]
pub struct MethodPattern {
    /// Modifiers the method must carry
    pub required_modifiers: MethodModifiers,
    /// Modifiers the method must not carry
    pub forbidden_modifiers: MethodModifiers,
    /// Return type pattern
    pub return_type: TypePattern,
    /// Declaring type pattern, any type if absent
    pub declaring_type: Option<TypePattern>,
    /// Method name pattern
    pub name: NamePattern,
    /// Parameter list pattern
    pub parameters: Vec<ParameterPattern>,
    /// Failure types the method must declare
    pub throws: Vec<TypePattern>,
}

impl MethodPattern {
    /// Returns true if any method declared by `candidate` or its supertypes could match
    ///
    /// Only the declaring type pattern is consulted.
    #[must_use]
    pub fn could_match_type(&self, registry: &TypeRegistry, candidate: TypeToken) -> bool {
        match &self.declaring_type {
            None => true,
            Some(pattern) => std::iter::once(candidate)
                .chain(registry.supertypes(candidate))
                .any(|ty| pattern.matches(registry, ty)),
        }
    }

    /// Match a method
    #[must_use]
    pub fn matches(&self, registry: &TypeRegistry, method: &MethodDescriptor) -> bool {
        if !method.modifiers.contains(self.required_modifiers)
            || method.modifiers.intersects(self.forbidden_modifiers)
        {
            return false;
        }
        if !self.name.matches(&method.name) {
            return false;
        }
        if !self.return_type.matches(registry, method.return_type) {
            return false;
        }
        if !ParameterPattern::matches_all(&self.parameters, registry, &method.parameter_types) {
            return false;
        }
        if !self.throws.iter().all(|pattern| {
            method
                .throws
                .iter()
                .any(|declared| pattern.matches(registry, *declared))
        }) {
            return false;
        }

        match &self.declaring_type {
            None => true,
            Some(pattern) => registry
                .types_declaring_signature(method)
                .into_iter()
                .any(|ty| pattern.matches(registry, ty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Builtin, TypeBuilder};
    use crate::Result;

    #[test]
    fn test_name_patterns() {
        assert!(NamePattern::parse("set*").matches("setName"));
        assert!(NamePattern::parse("set*").matches("set"));
        assert!(!NamePattern::parse("set*").matches("getName"));
        assert!(NamePattern::parse("*Service").matches("orderService"));
        assert!(NamePattern::parse("*").matches("anything"));
        assert!(NamePattern::parse("a*b*c").matches("aXbYc"));
        assert!(!NamePattern::parse("a*b*c").matches("aXbY"));
    }

    #[test]
    fn test_type_name_star_stays_in_segment() {
        let pattern = TypeNamePattern::parse("com.example.*");
        assert!(pattern.matches("com.example.Service"));
        assert!(!pattern.matches("com.example.impl.Service"));
        assert!(TypeNamePattern::parse("com.*.Service").matches("com.example.Service"));
    }

    #[test]
    fn test_type_name_ellipsis() {
        let pattern = TypeNamePattern::parse("com..Service");
        assert!(pattern.matches("com.Service"));
        assert!(pattern.matches("com.example.Service"));
        assert!(pattern.matches("com.example.impl.Service"));
        assert!(!pattern.matches("org.example.Service"));
        assert!(!pattern.matches("comx.Service"));

        let any_below = TypeNamePattern::parse("com.example..*");
        assert!(any_below.matches("com.example.Service"));
        assert!(any_below.matches("com.example.impl.ServiceImpl"));
        assert!(!any_below.matches("com.other.Service"));
    }

    #[test]
    fn test_type_pattern_subtypes() -> Result<()> {
        let registry = TypeRegistry::new();
        let repository = TypeBuilder::interface("app.Repository").build(&registry)?;
        let jdbc = TypeBuilder::class("app.impl.JdbcStore")
            .implements(repository)
            .build(&registry)?;

        let exact = TypePattern::compile("app.Repository", &registry, LoaderId::BOOTSTRAP);
        assert!(exact.exact_type().is_some());
        assert!(!exact.matches(&registry, jdbc));

        let plus = TypePattern::compile("app.Repository+", &registry, LoaderId::BOOTSTRAP);
        assert!(plus.matches(&registry, jdbc));

        let named_plus = TypePattern::compile("app.*+", &registry, LoaderId::BOOTSTRAP);
        assert!(named_plus.matches(&registry, jdbc));
        let named = TypePattern::compile("app.*", &registry, LoaderId::BOOTSTRAP);
        assert!(!named.matches(&registry, jdbc));
        Ok(())
    }

    #[test]
    fn test_unresolved_name_matches_by_name() -> Result<()> {
        let registry = TypeRegistry::new();
        let other = registry.create_loader("other", LoaderId::BOOTSTRAP)?;
        let hidden = TypeBuilder::class("app.Hidden").loader(other).build(&registry)?;

        let pattern = TypePattern::compile("app.Hidden", &registry, LoaderId::BOOTSTRAP);
        assert!(pattern.exact_type().is_none());
        assert!(pattern.matches(&registry, hidden));
        Ok(())
    }

    #[test]
    fn test_parameter_patterns() {
        let registry = TypeRegistry::new();
        let string = TypePattern::compile("String", &registry, LoaderId::BOOTSTRAP);
        let int = Builtin::Int.token();
        let text = Builtin::String.token();

        let leading = vec![
            ParameterPattern::Type(string.clone()),
            ParameterPattern::Ellipsis,
        ];
        assert!(ParameterPattern::matches_all(&leading, &registry, &[text]));
        assert!(ParameterPattern::matches_all(&leading, &registry, &[text, int, int]));
        assert!(!ParameterPattern::matches_all(&leading, &registry, &[int, text]));

        let middle = vec![
            ParameterPattern::Ellipsis,
            ParameterPattern::Type(string),
            ParameterPattern::Ellipsis,
        ];
        assert!(ParameterPattern::matches_all(&middle, &registry, &[int, text, int]));
        assert!(!ParameterPattern::matches_all(&middle, &registry, &[int, int]));
        assert!(ParameterPattern::matches_all(&[], &registry, &[]));
    }
}
